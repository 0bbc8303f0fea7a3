//! Phrase similarity engine.
//!
//! # Pipeline
//!
//! ```text
//! Dictionaries → Normalizer → tokens ─┐
//!                                     ├→ greedy best match (Damerau–Levenshtein)
//! Dictionaries → Normalizer → tokens ─┘        ↓
//!                                     direct score − length penalty
//! ```
//!
//! The shorter token sequence is the *query*, the longer one the *reference*.
//! Every query token is scored against every reference token and keeps its
//! best similarity; a reference token may be the best match for several
//! query tokens. The mean of those best matches is the direct score, from
//! which `(reference - query) * error_adjustment` is subtracted.
//!
//! The result is intentionally not clamped: a short title against a long one
//! can score below zero.

pub mod damerau;
pub mod dictionary;
pub mod normalize;

use serde::Serialize;

use crate::config::EngineConfig;
use crate::error::DupeResult;
use dictionary::Dictionaries;
use normalize::{NormalizedPhrase, Normalizer};

/// Per-missing-word penalty applied when no configuration says otherwise.
pub const DEFAULT_ERROR_ADJUSTMENT: f64 = 0.15;

/// Full breakdown of one phrase comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Score {
    /// Mean best-match similarity of the query tokens.
    pub direct_score: f64,
    /// Penalty subtracted for the excess reference tokens.
    pub adjustment: f64,
    pub query_tokens: usize,
    pub reference_tokens: usize,
}

impl Score {
    const EMPTY: Self = Self {
        direct_score: 0.0,
        adjustment: 0.0,
        query_tokens: 0,
        reference_tokens: 0,
    };

    /// Adjusted score: direct score minus the length penalty.
    pub fn value(&self) -> f64 {
        self.direct_score - self.adjustment
    }
}

/// Integer percentage shown to users, truncated and clamped to `0..=100`.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn accuracy_percent(score: f64) -> u8 {
    (score * 100.0).floor().clamp(0.0, 100.0) as u8
}

/// Compares phrases using a fixed set of dictionaries.
#[derive(Debug)]
pub struct PhraseComparator {
    normalizer: Normalizer,
    error_adjustment: f64,
}

impl PhraseComparator {
    /// # Errors
    ///
    /// Returns an error if a synonym group cannot be compiled.
    pub fn new(dictionaries: &Dictionaries, config: &EngineConfig) -> DupeResult<Self> {
        Ok(Self::with_normalizer(
            Normalizer::new(dictionaries)?,
            config.error_adjustment,
        ))
    }

    pub fn with_normalizer(normalizer: Normalizer, error_adjustment: f64) -> Self {
        Self {
            normalizer,
            error_adjustment,
        }
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn error_adjustment(&self) -> f64 {
        self.error_adjustment
    }

    /// Normalize a phrase with this comparator's dictionaries.
    pub fn normalize(&self, phrase: &str) -> NormalizedPhrase {
        self.normalizer.normalize(phrase)
    }

    /// Adjusted similarity between two raw phrases.
    ///
    /// Returns `0.0` when either phrase normalizes to nothing.
    pub fn compare(&self, phrase_a: &str, phrase_b: &str) -> f64 {
        self.score_breakdown(phrase_a, phrase_b).value()
    }

    /// Like [`compare`](Self::compare) but returns every intermediate value.
    pub fn score_breakdown(&self, phrase_a: &str, phrase_b: &str) -> Score {
        let a = self.normalizer.normalize(phrase_a);
        let b = self.normalizer.normalize(phrase_b);
        self.score_normalized(&a, &b)
    }

    /// Adjusted similarity between two already-normalized phrases.
    pub fn compare_normalized(&self, a: &NormalizedPhrase, b: &NormalizedPhrase) -> f64 {
        self.score_normalized(a, b).value()
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn score_normalized(&self, a: &NormalizedPhrase, b: &NormalizedPhrase) -> Score {
        let (query, reference) = if a.len() > b.len() {
            (b.tokens(), a.tokens())
        } else {
            (a.tokens(), b.tokens())
        };

        if query.is_empty() {
            return Score::EMPTY;
        }

        let total: f64 = query
            .iter()
            .map(|q| {
                reference
                    .iter()
                    .map(|r| damerau::similarity(q, r))
                    .fold(0.0, f64::max)
            })
            .sum();

        let missing = reference.len() - query.len();

        Score {
            direct_score: total / query.len() as f64,
            adjustment: missing as f64 * self.error_adjustment,
            query_tokens: query.len(),
            reference_tokens: reference.len(),
        }
    }
}
