//! Duplicate matcher.
//!
//! Scores a batch of candidate records against a target title and keeps the
//! ones at or above the threshold. Candidate scoring is independent per
//! record and runs on the rayon pool for larger batches; the result is always
//! sorted by identifier afterwards, so the output never depends on scheduling.

use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::{EngineConfig, Settings};
use crate::error::{DupeError, DupeResult};
use crate::similarity::dictionary::Dictionaries;
use crate::similarity::normalize::NormalizedPhrase;
use crate::similarity::{PhraseComparator, accuracy_percent};

/// Batches smaller than this are scored on the calling thread.
const PARALLEL_THRESHOLD: usize = 64;

/// A previously seen record that may duplicate the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate<I, M = ()> {
    pub id: I,
    pub title: String,
    /// Opaque data carried through to the [`MatchResult`] unchanged.
    pub metadata: M,
}

impl<I> Candidate<I> {
    pub fn new(id: I, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            metadata: (),
        }
    }
}

impl<I, M> Candidate<I, M> {
    pub fn with_metadata(id: I, title: impl Into<String>, metadata: M) -> Self {
        Self {
            id,
            title: title.into(),
            metadata,
        }
    }
}

/// A candidate that met the threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult<I, M = ()> {
    pub id: I,
    pub title: String,
    /// Raw adjusted score; may exceed the `[0, 1]` range in principle.
    pub score: f64,
    /// `floor(score * 100)`, clamped to `0..=100`.
    pub accuracy: u8,
    pub metadata: M,
}

/// The record whose duplicates are being searched for.
#[derive(Debug)]
pub struct Target<'a, I> {
    /// Identifier of the target record, if it may appear among candidates.
    pub id: Option<&'a I>,
    pub title: &'a str,
}

impl<I> Clone for Target<'_, I> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<I> Copy for Target<'_, I> {}

impl<'a, I> Target<'a, I> {
    pub fn new(id: &'a I, title: &'a str) -> Self {
        Self {
            id: Some(id),
            title,
        }
    }

    /// A target that is not itself part of the candidate corpus.
    pub fn untracked(title: &'a str) -> Self {
        Self { id: None, title }
    }
}

/// Ranks candidates by phrase similarity against a target title.
#[derive(Debug)]
pub struct DuplicateMatcher {
    comparator: PhraseComparator,
    threshold: f64,
}

impl DuplicateMatcher {
    /// # Errors
    ///
    /// Returns an error if a synonym group cannot be compiled.
    pub fn new(dictionaries: &Dictionaries, config: &EngineConfig) -> DupeResult<Self> {
        Ok(Self::with_comparator(
            PhraseComparator::new(dictionaries, config)?,
            config.threshold,
        ))
    }

    /// # Errors
    ///
    /// Returns an error if a synonym group cannot be compiled.
    pub fn from_settings(settings: &Settings) -> DupeResult<Self> {
        Self::new(&settings.dictionaries, &settings.engine)
    }

    pub fn with_comparator(comparator: PhraseComparator, threshold: f64) -> Self {
        Self {
            comparator,
            threshold,
        }
    }

    pub fn comparator(&self) -> &PhraseComparator {
        &self.comparator
    }

    /// Configured default threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Find duplicates of `target` using the configured threshold.
    pub fn find_duplicates<I, M>(
        &self,
        target: Target<'_, I>,
        candidates: Vec<Candidate<I, M>>,
    ) -> Vec<MatchResult<I, M>>
    where
        I: Ord + Send + Sync,
        M: Send,
    {
        self.find_duplicates_with_threshold(target, candidates, self.threshold)
    }

    /// Find duplicates of `target` scoring at least `threshold`.
    ///
    /// The candidate carrying the target's own identifier is never returned.
    /// Results are sorted ascending by identifier.
    pub fn find_duplicates_with_threshold<I, M>(
        &self,
        target: Target<'_, I>,
        candidates: Vec<Candidate<I, M>>,
        threshold: f64,
    ) -> Vec<MatchResult<I, M>>
    where
        I: Ord + Send + Sync,
        M: Send,
    {
        let Ok(matches) = self.run(target, candidates, threshold, || Ok::<(), Infallible>(()));
        matches
    }

    /// Like [`find_duplicates_with_threshold`](Self::find_duplicates_with_threshold),
    /// but stops as soon as `cancel` is observed set.
    ///
    /// The flag is checked once per candidate.
    ///
    /// # Errors
    ///
    /// Returns [`DupeError::Cancelled`] if the flag was set before every
    /// candidate had been scored. No partial result is returned.
    pub fn find_duplicates_cancellable<I, M>(
        &self,
        target: Target<'_, I>,
        candidates: Vec<Candidate<I, M>>,
        threshold: f64,
        cancel: &AtomicBool,
    ) -> DupeResult<Vec<MatchResult<I, M>>>
    where
        I: Ord + Send + Sync,
        M: Send,
    {
        let total = candidates.len();
        self.run(target, candidates, threshold, || {
            if cancel.load(Ordering::Acquire) {
                Err(DupeError::Cancelled)
            } else {
                Ok(())
            }
        })
        .inspect_err(|_| debug!(candidates = total, "duplicate search cancelled"))
    }

    /// Score every candidate, calling `gate` before each one. The first
    /// `Err` from `gate` aborts the whole search.
    fn run<I, M, E>(
        &self,
        target: Target<'_, I>,
        candidates: Vec<Candidate<I, M>>,
        threshold: f64,
        gate: impl Fn() -> Result<(), E> + Sync,
    ) -> Result<Vec<MatchResult<I, M>>, E>
    where
        I: Ord + Send + Sync,
        M: Send,
        E: Send,
    {
        let total = candidates.len();
        let target_tokens = self.comparator.normalize(target.title);

        let score_one = |candidate: Candidate<I, M>| -> Result<Option<MatchResult<I, M>>, E> {
            gate()?;
            if target.id.is_some_and(|id| *id == candidate.id) {
                return Ok(None);
            }
            Ok(self.score_candidate(&target_tokens, candidate, threshold))
        };

        let scored: Vec<Option<MatchResult<I, M>>> = if total >= PARALLEL_THRESHOLD {
            candidates.into_par_iter().map(score_one).collect::<Result<_, E>>()?
        } else {
            candidates.into_iter().map(score_one).collect::<Result<_, E>>()?
        };

        let mut matches: Vec<MatchResult<I, M>> = scored.into_iter().flatten().collect();

        matches.sort_by(|a, b| a.id.cmp(&b.id));

        debug!(
            candidates = total,
            matches = matches.len(),
            threshold,
            "duplicate search finished"
        );

        Ok(matches)
    }

    fn score_candidate<I, M>(
        &self,
        target_tokens: &NormalizedPhrase,
        candidate: Candidate<I, M>,
        threshold: f64,
    ) -> Option<MatchResult<I, M>> {
        let candidate_tokens = self.comparator.normalize(&candidate.title);
        let score = self
            .comparator
            .compare_normalized(&candidate_tokens, target_tokens);

        if score < threshold {
            return None;
        }

        Some(MatchResult {
            id: candidate.id,
            title: candidate.title,
            score,
            accuracy: accuracy_percent(score),
            metadata: candidate.metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::similarity::normalize::{Normalizer, Rewrite};

    /// Counts normalizations and raises the shared flag on the `trip_at`-th.
    #[derive(Debug)]
    struct TripRule {
        seen: Arc<AtomicUsize>,
        cancel: Arc<AtomicBool>,
        trip_at: usize,
    }

    impl Rewrite for TripRule {
        fn name(&self) -> &str {
            "trip"
        }

        fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
            if self.seen.fetch_add(1, Ordering::SeqCst) + 1 == self.trip_at {
                self.cancel.store(true, Ordering::SeqCst);
            }
            Cow::Borrowed(text)
        }
    }

    fn tripping_matcher(trip_at: usize) -> (DuplicateMatcher, Arc<AtomicUsize>, Arc<AtomicBool>) {
        let seen = Arc::new(AtomicUsize::new(0));
        let cancel = Arc::new(AtomicBool::new(false));
        let rule = TripRule {
            seen: Arc::clone(&seen),
            cancel: Arc::clone(&cancel),
            trip_at,
        };
        let normalizer = Normalizer::with_rules(vec![Box::new(rule)], HashSet::new());
        let comparator = PhraseComparator::with_normalizer(normalizer, 0.15);
        (DuplicateMatcher::with_comparator(comparator, 0.6), seen, cancel)
    }

    fn matcher() -> DuplicateMatcher {
        DuplicateMatcher::new(&Dictionaries::builtin(), &EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_excludes_target_id() {
        let m = matcher();
        let title = "[NBug] Crash when opening settings";
        let candidates = vec![
            Candidate::new(7u64, title),
            Candidate::new(3u64, title),
        ];
        let results = m.find_duplicates(Target::new(&7, title), candidates);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, 3);
        assert_eq!(results[0].accuracy, 100);
    }

    #[test]
    fn test_untracked_target_keeps_all() {
        let m = matcher();
        let title = "Crash when opening settings";
        let candidates = vec![Candidate::new(1u32, title), Candidate::new(2u32, title)];
        let results = m.find_duplicates(Target::untracked(title), candidates);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_sorted_by_id_not_score() {
        let m = matcher();
        let target = "memory leak in module";
        let candidates = vec![
            Candidate::new(30u64, "memory leak in module"),
            Candidate::new(10u64, "memory leaks in module"),
            Candidate::new(20u64, "memory leak in modules"),
            Candidate::new(5u64, "totally unrelated title about fonts"),
        ];
        let results = m.find_duplicates(Target::untracked(target), candidates);
        let ids: Vec<u64> = results.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![10, 20, 30]);
    }

    #[test]
    fn test_inclusive_threshold() {
        let m = DuplicateMatcher::new(&Dictionaries::empty(), &EngineConfig::default()).unwrap();
        let results = m.find_duplicates(Target::untracked("abcde"), vec![Candidate::new(1u8, "abcxy")]);
        assert_eq!(results.len(), 1);
        assert!((results[0].score - 0.60).abs() < f64::EPSILON);
        assert_eq!(results[0].accuracy, 60);

        let results = m.find_duplicates_with_threshold(
            Target::untracked("abcde"),
            vec![Candidate::new(1u8, "abcxy")],
            0.61,
        );
        assert!(results.is_empty());
    }

    #[test]
    fn test_negative_scores_never_match() {
        let m = matcher();
        let results = m.find_duplicates_with_threshold(
            Target::untracked("foo"),
            vec![Candidate::new(1u8, "alpha beta gamma delta epsilon zeta eta")],
            -10.0,
        );
        assert_eq!(results.len(), 1);
        assert!(results[0].score < 0.0);
        assert_eq!(results[0].accuracy, 0);

        let results = m.find_duplicates(
            Target::untracked("foo"),
            vec![Candidate::new(1u8, "alpha beta gamma delta epsilon zeta eta")],
        );
        assert!(results.is_empty());
    }

    #[test]
    fn test_metadata_passes_through() {
        let m = matcher();
        let title = "Crash on startup";
        let candidates = vec![Candidate::with_metadata(4u64, title, "comments=12")];
        let results = m.find_duplicates(Target::untracked(title), candidates);
        assert_eq!(results[0].metadata, "comments=12");
        assert_eq!(results[0].title, title);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let m = matcher();
        let target = "Crash when opening repository settings";
        let titles = [
            "Crash when opening repository settings",
            "Crashed while opening repo settings",
            "Settings dialog is slow",
            "Crash opening settings",
            "Font rendering broken",
        ];
        let batch = |n: u64| -> Vec<Candidate<u64>> {
            (0..n)
                .rev()
                .map(|i| Candidate::new(i, titles[(i % 5) as usize]))
                .collect()
        };

        let large = m.find_duplicates(Target::untracked(target), batch(200));
        let mut small: Vec<_> = batch(200)
            .chunks(10)
            .flat_map(|chunk| m.find_duplicates(Target::untracked(target), chunk.to_vec()))
            .collect();
        small.sort_by_key(|r| r.id);

        assert!(!large.is_empty());
        assert_eq!(large, small);
        assert!(large.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[test]
    fn test_cancelled_returns_error() {
        let m = matcher();
        let cancel = AtomicBool::new(true);
        let candidates: Vec<Candidate<u64>> =
            (0..100).map(|i| Candidate::new(i, "Crash on startup")).collect();
        let result = m.find_duplicates_cancellable(
            Target::untracked("Crash on startup"),
            candidates,
            0.6,
            &cancel,
        );
        assert!(matches!(result, Err(DupeError::Cancelled)));
    }

    #[test]
    fn test_not_cancelled_completes() {
        let m = matcher();
        let cancel = AtomicBool::new(false);
        let candidates = vec![Candidate::new(2u64, "Crash on startup")];
        let result = m
            .find_duplicates_cancellable(Target::untracked("Crash on startup"), candidates, 0.6, &cancel)
            .unwrap();
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_cancelled_mid_batch_sequential() {
        // Target is normalization 1; the flag goes up while scoring candidate 2.
        let (m, seen, cancel) = tripping_matcher(3);
        let candidates: Vec<Candidate<u64>> =
            (0..10).map(|i| Candidate::new(i, "Crash on startup")).collect();
        let result = m.find_duplicates_cancellable(
            Target::untracked("Crash on startup"),
            candidates,
            0.6,
            &cancel,
        );
        assert!(matches!(result, Err(DupeError::Cancelled)));
        assert_eq!(seen.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_cancelled_mid_batch_parallel() {
        let (m, seen, cancel) = tripping_matcher(2);
        let total = 2_000u64;
        let candidates: Vec<Candidate<u64>> =
            (0..total).map(|i| Candidate::new(i, "Crash on startup")).collect();
        let result = m.find_duplicates_cancellable(
            Target::untracked("Crash on startup"),
            candidates,
            0.6,
            &cancel,
        );
        assert!(matches!(result, Err(DupeError::Cancelled)));
        assert!(seen.load(Ordering::SeqCst) < 1 + total as usize);
    }
}
