//! Lexical dictionaries driving normalization.
//!
//! Three read-only tables: punctuation symbols, synonym groups and exclusion
//! words (stopwords). They are plain values handed to the
//! [`Normalizer`](super::normalize::Normalizer) at construction time.

use serde::{Deserialize, Serialize};

use crate::error::{DupeError, DupeResult};

/// Punctuation replaced by a space when no dictionary is configured.
const BUILTIN_PUNCTUATION: &[char] = &[
    '.', ',', ';', ':', '!', '?', '\'', '"', '`', '(', ')', '[', ']', '{', '}', '<', '>', '/',
    '\\', '|', '-', '_', '+', '=', '*', '&', '^', '%', '$', '#', '@', '~',
];

/// Stopwords removed when no dictionary is configured.
const BUILTIN_EXCLUDED: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "if", "of", "on", "in", "at", "to", "for", "by",
    "with", "from", "is", "are", "was", "were", "be", "been", "it", "its", "this", "that",
    "there", "s", "not", "no", "when", "while", "after", "before", "can", "cannot", "does",
    "doesn", "don", "t", "i", "my", "me", "we", "you",
];

/// Synonym groups applied when no dictionary is configured.
const BUILTIN_SYNONYMS: &[(&str, &[&str])] = &[
    ("crash", &["crashes", "crashed", "crashing"]),
    ("error", &["exception", "failure"]),
    ("fail", &["failed", "fails", "failing"]),
    ("freeze", &["freezes", "frozen", "hangs", "hang"]),
    ("open", &["opening", "opens", "opened"]),
    ("repository", &["repo"]),
];

/// How a synonym variant is matched inside a phrase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchMode {
    /// Variant is rewritten wherever it occurs, even inside a longer word.
    #[default]
    Substring,
    /// Variant is rewritten only when it forms a whole word.
    WholeWord,
}

/// A canonical word and the variants that collapse onto it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynonymGroup {
    pub canonical: String,
    pub variants: Vec<String>,
    #[serde(default)]
    pub mode: MatchMode,
}

impl SynonymGroup {
    pub fn new(canonical: impl Into<String>, variants: &[&str]) -> Self {
        Self {
            canonical: canonical.into(),
            variants: variants.iter().map(|&v| v.to_owned()).collect(),
            mode: MatchMode::Substring,
        }
    }

    #[must_use]
    pub fn with_mode(mut self, mode: MatchMode) -> Self {
        self.mode = mode;
        self
    }
}

/// The full set of lexical tables used by one normalizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dictionaries {
    #[serde(default)]
    pub punctuation: Vec<char>,
    #[serde(default)]
    pub synonyms: Vec<SynonymGroup>,
    #[serde(default)]
    pub excluded: Vec<String>,
}

impl Default for Dictionaries {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Dictionaries {
    /// Tables with no entries: normalization only lower-cases and splits.
    pub fn empty() -> Self {
        Self {
            punctuation: Vec::new(),
            synonyms: Vec::new(),
            excluded: Vec::new(),
        }
    }

    /// Built-in English tables tuned for issue titles.
    pub fn builtin() -> Self {
        Self {
            punctuation: BUILTIN_PUNCTUATION.to_vec(),
            synonyms: BUILTIN_SYNONYMS
                .iter()
                .map(|&(canonical, variants)| {
                    SynonymGroup::new(canonical, variants).with_mode(MatchMode::WholeWord)
                })
                .collect(),
            excluded: BUILTIN_EXCLUDED.iter().map(|&w| w.to_owned()).collect(),
        }
    }

    /// Reject entries the normalizer cannot use.
    ///
    /// # Errors
    ///
    /// Returns [`DupeError::Dictionary`] for whitespace punctuation, empty
    /// synonym groups or variants, and exclusion words that are not a single
    /// token.
    pub fn validate(&self) -> DupeResult<()> {
        if let Some(c) = self.punctuation.iter().find(|c| c.is_whitespace()) {
            return Err(DupeError::Dictionary(format!(
                "punctuation entry {c:?} is whitespace"
            )));
        }

        for group in &self.synonyms {
            if group.canonical.trim().is_empty() {
                return Err(DupeError::Dictionary(
                    "synonym group has an empty canonical word".to_owned(),
                ));
            }
            if group.variants.is_empty() {
                return Err(DupeError::Dictionary(format!(
                    "synonym group `{}` has no variants",
                    group.canonical
                )));
            }
            if group.variants.iter().any(|v| v.is_empty()) {
                return Err(DupeError::Dictionary(format!(
                    "synonym group `{}` contains an empty variant",
                    group.canonical
                )));
            }
        }

        for word in &self.excluded {
            if word.is_empty() || word.split_whitespace().count() != 1 {
                return Err(DupeError::Dictionary(format!(
                    "exclusion word {word:?} must be a single token"
                )));
            }
        }

        Ok(())
    }
}
