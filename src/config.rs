//! Engine settings.
//!
//! Settings are read once from a JSON file. Every field is optional:
//!
//! ```json
//! {
//!   "errorAdjustment": 0.15,
//!   "threshold": 0.6,
//!   "dictionaries": {
//!     "punctuation": [".", ",", "!"],
//!     "synonyms": [{ "canonical": "crash", "variants": ["crashes"], "mode": "wholeWord" }],
//!     "excluded": ["the", "a"]
//!   }
//! }
//! ```
//!
//! A missing `dictionaries` object falls back to the built-in tables.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{DupeError, DupeResult};
use crate::similarity::DEFAULT_ERROR_ADJUSTMENT;
use crate::similarity::dictionary::Dictionaries;

/// Threshold at or above which a candidate counts as a potential duplicate.
pub const DEFAULT_THRESHOLD: f64 = 0.60;

/// Tunable scoring constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Penalty per token the longer phrase has over the shorter one.
    pub error_adjustment: f64,
    /// Inclusive lower bound on the adjusted score.
    pub threshold: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            error_adjustment: DEFAULT_ERROR_ADJUSTMENT,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl EngineConfig {
    /// Check value ranges. The engine itself never validates these.
    ///
    /// # Errors
    ///
    /// Returns a human-readable reason when a value is out of range.
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(format!(
                "threshold must be within [0, 1], got {}",
                self.threshold
            ));
        }
        if !self.error_adjustment.is_finite() || self.error_adjustment < 0.0 {
            return Err(format!(
                "errorAdjustment must be a finite, non-negative number, got {}",
                self.error_adjustment
            ));
        }
        Ok(())
    }
}

/// Everything needed to build a duplicate matcher.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(flatten)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub dictionaries: Dictionaries,
}

impl Settings {
    /// Load and validate settings from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// carries out-of-range values or malformed dictionaries.
    pub fn load(path: &Path) -> DupeResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| DupeError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let settings: Self = serde_json::from_str(&raw)?;
        settings
            .engine
            .validate()
            .map_err(|reason| DupeError::Config {
                path: path.to_path_buf(),
                reason,
            })?;
        settings.dictionaries.validate()?;

        info!(
            path = %path.display(),
            threshold = settings.engine.threshold,
            error_adjustment = settings.engine.error_adjustment,
            synonym_groups = settings.dictionaries.synonyms.len(),
            excluded = settings.dictionaries.excluded.len(),
            "settings loaded"
        );

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_settings(json: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!((config.error_adjustment - 0.15).abs() < f64::EPSILON);
        assert!((config.threshold - 0.60).abs() < f64::EPSILON);
        assert_eq!(Settings::default().dictionaries, Dictionaries::builtin());
    }

    #[test]
    fn test_load_empty_object() {
        let file = write_settings("{}");
        let settings = Settings::load(file.path()).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_load_overrides() {
        let file = write_settings(
            r#"{
                "threshold": 0.75,
                "dictionaries": { "punctuation": ["!"], "excluded": ["the"] }
            }"#,
        );
        let settings = Settings::load(file.path()).unwrap();
        assert!((settings.engine.threshold - 0.75).abs() < f64::EPSILON);
        assert!((settings.engine.error_adjustment - 0.15).abs() < f64::EPSILON);
        assert_eq!(settings.dictionaries.punctuation, vec!['!']);
        assert!(settings.dictionaries.synonyms.is_empty());
    }

    #[test]
    fn test_load_rejects_threshold_out_of_range() {
        let file = write_settings(r#"{ "threshold": 1.5 }"#);
        let err = Settings::load(file.path()).unwrap_err();
        assert!(matches!(err, DupeError::Config { .. }));
        assert!(err.to_string().contains("threshold"));
    }

    #[test]
    fn test_load_rejects_negative_adjustment() {
        let file = write_settings(r#"{ "errorAdjustment": -0.1 }"#);
        assert!(matches!(
            Settings::load(file.path()),
            Err(DupeError::Config { .. })
        ));
    }

    #[test]
    fn test_load_rejects_malformed_dictionary() {
        let file = write_settings(
            r#"{ "dictionaries": { "synonyms": [{ "canonical": "crash", "variants": [] }] } }"#,
        );
        assert!(matches!(
            Settings::load(file.path()),
            Err(DupeError::Dictionary(_))
        ));
    }

    #[test]
    fn test_load_invalid_json() {
        let file = write_settings("{ not json");
        assert!(matches!(Settings::load(file.path()), Err(DupeError::Json(_))));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Settings::load(Path::new("/nonexistent/title-dupes.json")).unwrap_err();
        assert!(matches!(err, DupeError::Io { .. }));
    }
}
