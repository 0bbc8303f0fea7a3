//! Phrase normalization.
//!
//! A phrase is lower-cased, passed through an ordered chain of rewrite rules
//! (punctuation first, then one rule per synonym group), split on whitespace
//! and stripped of exclusion words. Each rule implements [`Rewrite`], so the
//! chain does not care which pattern engine backs an individual rule.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;

use regex::{NoExpand, Regex};
use serde::Serialize;
use tracing::trace;

use crate::error::{DupeError, DupeResult};
use crate::similarity::dictionary::{Dictionaries, MatchMode, SynonymGroup};

/// A single rewriting stage of the normalization chain.
///
/// Returns `Cow::Borrowed` when the rule left the text untouched.
pub trait Rewrite: fmt::Debug + Send + Sync {
    /// Short label used in trace output.
    fn name(&self) -> &str;

    fn apply<'a>(&self, text: &'a str) -> Cow<'a, str>;
}

/// Replaces each configured punctuation symbol with a single space.
#[derive(Debug, Clone)]
pub struct PunctuationRule {
    symbols: Vec<char>,
}

impl PunctuationRule {
    pub fn new(symbols: &[char]) -> Self {
        Self {
            symbols: symbols.to_vec(),
        }
    }
}

impl Rewrite for PunctuationRule {
    fn name(&self) -> &str {
        "punctuation"
    }

    fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
        if !text.contains(self.symbols.as_slice()) {
            return Cow::Borrowed(text);
        }
        Cow::Owned(
            text.chars()
                .map(|c| if self.symbols.contains(&c) { ' ' } else { c })
                .collect(),
        )
    }
}

/// Collapses every variant of a synonym group onto its canonical word.
#[derive(Debug, Clone)]
pub struct SynonymRule {
    canonical: String,
    pattern: Regex,
}

impl SynonymRule {
    /// Compile a synonym group into a case-insensitive alternation.
    ///
    /// Variants are matched literally, in the order they are listed.
    ///
    /// # Errors
    ///
    /// Returns [`DupeError::InvalidPattern`] if the alternation cannot be
    /// compiled (e.g. it exceeds the regex size limit).
    pub fn new(group: &SynonymGroup) -> DupeResult<Self> {
        let alternation = group
            .variants
            .iter()
            .map(|v| regex::escape(&v.to_lowercase()))
            .collect::<Vec<_>>()
            .join("|");

        let source = match group.mode {
            MatchMode::Substring => format!("(?i)(?:{alternation})"),
            MatchMode::WholeWord => format!(r"(?i)\b(?:{alternation})\b"),
        };

        let pattern = Regex::new(&source).map_err(|e| DupeError::InvalidPattern {
            pattern: source.clone(),
            source: e,
        })?;

        Ok(Self {
            canonical: group.canonical.to_lowercase(),
            pattern,
        })
    }
}

impl Rewrite for SynonymRule {
    fn name(&self) -> &str {
        &self.canonical
    }

    fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
        self.pattern.replace_all(text, NoExpand(&self.canonical))
    }
}

/// Ordered token sequence produced by [`Normalizer::normalize`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct NormalizedPhrase(Vec<String>);

impl NormalizedPhrase {
    pub fn tokens(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_tokens(self) -> Vec<String> {
        self.0
    }
}

impl<S: Into<String>> FromIterator<S> for NormalizedPhrase {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Turns raw phrases into comparable token sequences.
#[derive(Debug)]
pub struct Normalizer {
    rules: Vec<Box<dyn Rewrite>>,
    excluded: HashSet<String>,
}

impl Normalizer {
    /// Build the rule chain for a set of dictionaries.
    ///
    /// Dictionaries are assumed to be validated already; synonym groups with
    /// no variants are skipped rather than compiled into an empty pattern.
    ///
    /// # Errors
    ///
    /// Returns [`DupeError::InvalidPattern`] if a synonym group fails to
    /// compile.
    pub fn new(dictionaries: &Dictionaries) -> DupeResult<Self> {
        let mut rules: Vec<Box<dyn Rewrite>> = Vec::with_capacity(dictionaries.synonyms.len() + 1);

        if !dictionaries.punctuation.is_empty() {
            rules.push(Box::new(PunctuationRule::new(&dictionaries.punctuation)));
        }

        for group in dictionaries.synonyms.iter().filter(|g| !g.variants.is_empty()) {
            rules.push(Box::new(SynonymRule::new(group)?));
        }

        let excluded = dictionaries
            .excluded
            .iter()
            .map(|w| w.to_lowercase())
            .collect();

        Ok(Self { rules, excluded })
    }

    /// Build a normalizer from an explicit rule chain.
    pub fn with_rules(rules: Vec<Box<dyn Rewrite>>, excluded: HashSet<String>) -> Self {
        Self { rules, excluded }
    }

    /// Number of rewrite rules in the chain.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Normalize `phrase` into its token sequence.
    pub fn normalize(&self, phrase: &str) -> NormalizedPhrase {
        let mut text = phrase.to_lowercase();

        for rule in &self.rules {
            let rewritten = match rule.apply(&text) {
                Cow::Borrowed(_) => continue,
                Cow::Owned(s) => s,
            };
            trace!(rule = rule.name(), before = %text, after = %rewritten, "rewrite applied");
            text = rewritten;
        }

        text.split_whitespace()
            .filter(|token| !self.excluded.contains(*token))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(normalizer: &Normalizer, phrase: &str) -> Vec<String> {
        normalizer.normalize(phrase).into_tokens()
    }

    #[test]
    fn test_lowercase_and_split() {
        let n = Normalizer::new(&Dictionaries::empty()).unwrap();
        assert_eq!(tokens(&n, "  Crash  On   STARTUP "), ["crash", "on", "startup"]);
    }

    #[test]
    fn test_punctuation_becomes_space() {
        let mut dict = Dictionaries::empty();
        dict.punctuation = vec!['.', '\'', ':'];
        let n = Normalizer::new(&dict).unwrap();
        assert_eq!(
            tokens(&n, "[NBug] can't open: file.txt"),
            ["[nbug]", "can", "t", "open", "file", "txt"]
        );
    }

    #[test]
    fn test_synonym_substring() {
        let mut dict = Dictionaries::empty();
        dict.synonyms.push(SynonymGroup::new("crash", &["CRASHES", "crashed"]));
        let n = Normalizer::new(&dict).unwrap();
        assert_eq!(tokens(&n, "App crashes, it crashed"), ["app", "crash,", "it", "crash"]);
    }

    #[test]
    fn test_synonym_whole_word() {
        let mut dict = Dictionaries::empty();
        dict.synonyms
            .push(SynonymGroup::new("repository", &["repo"]).with_mode(MatchMode::WholeWord));
        let n = Normalizer::new(&dict).unwrap();
        assert_eq!(tokens(&n, "repo report"), ["repository", "report"]);
    }

    #[test]
    fn test_synonym_variants_matched_literally() {
        let mut dict = Dictionaries::empty();
        dict.synonyms.push(SynonymGroup::new("cpp", &["c++"]));
        let n = Normalizer::new(&dict).unwrap();
        assert_eq!(tokens(&n, "c++ build cc"), ["cpp", "build", "cc"]);
    }

    #[test]
    fn test_excluded_words_removed() {
        let mut dict = Dictionaries::empty();
        dict.excluded = vec!["the".to_owned(), "in".to_owned()];
        let n = Normalizer::new(&dict).unwrap();
        assert_eq!(
            tokens(&n, "The leak in the thing inside"),
            ["leak", "thing", "inside"]
        );
    }

    #[test]
    fn test_synonym_can_produce_excluded_word() {
        let mut dict = Dictionaries::empty();
        dict.synonyms.push(SynonymGroup::new("the", &["teh"]));
        dict.excluded = vec!["the".to_owned()];
        let n = Normalizer::new(&dict).unwrap();
        assert_eq!(tokens(&n, "teh bug"), ["bug"]);
    }

    #[test]
    fn test_empty_and_stopword_only() {
        let n = Normalizer::new(&Dictionaries::builtin()).unwrap();
        assert!(n.normalize("").is_empty());
        assert!(n.normalize("?!... ---").is_empty());
        assert!(n.normalize("the of and").is_empty());
    }

    #[test]
    fn test_deterministic() {
        let n = Normalizer::new(&Dictionaries::builtin()).unwrap();
        let phrase = "[NBug] Crashed while opening the repo!";
        assert_eq!(n.normalize(phrase), n.normalize(phrase));
        assert_eq!(tokens(&n, phrase), ["nbug", "crash", "open", "repository"]);
    }

    #[test]
    fn test_custom_rule_chain() {
        #[derive(Debug)]
        struct Strip;
        impl Rewrite for Strip {
            fn name(&self) -> &str {
                "strip-digits"
            }
            fn apply<'a>(&self, text: &'a str) -> Cow<'a, str> {
                Cow::Owned(text.chars().filter(|c| !c.is_ascii_digit()).collect())
            }
        }

        let n = Normalizer::with_rules(vec![Box::new(Strip)], HashSet::new());
        assert_eq!(n.rule_count(), 1);
        assert_eq!(tokens(&n, "v3 build 42"), ["v", "build"]);
    }
}
