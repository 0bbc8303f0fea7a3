//! `title-dupes` — fuzzy near-duplicate detection for issue titles.
//!
//! Compares a target title against a batch of previously seen titles and
//! reports the ones similar enough to be potential duplicates. Can be used
//! as a library or run as an MCP server over stdio.
//!
//! # Architecture
//!
//! ```text
//! Dictionaries → Normalizer → Damerau–Levenshtein → PhraseComparator → DuplicateMatcher
//!                                                                           ↑
//!                               stdin (JSON-RPC) → McpServer → ToolRouter ──┘
//! ```
//!
//! # Example
//!
//! ```
//! use title_dupes::{Candidate, DuplicateMatcher, Settings, Target};
//!
//! let matcher = DuplicateMatcher::from_settings(&Settings::default()).unwrap();
//! let matches = matcher.find_duplicates(
//!     Target::new(&3, "Crash when opening the repository"),
//!     vec![
//!         Candidate::new(1, "Crashed while opening repo"),
//!         Candidate::new(2, "Dark theme colors are off"),
//!     ],
//! );
//! assert_eq!(matches.len(), 1);
//! assert_eq!(matches[0].id, 1);
//! ```

pub mod config;
pub mod error;
pub mod matcher;
pub mod server;
pub mod similarity;
pub mod tools;

pub use config::{EngineConfig, Settings};
pub use error::{DupeError, DupeResult};
pub use matcher::{Candidate, DuplicateMatcher, MatchResult, Target};
pub use server::run_mcp_server;
pub use similarity::PhraseComparator;
pub use similarity::damerau::{distance, similarity};
pub use similarity::dictionary::{Dictionaries, MatchMode, SynonymGroup};
pub use similarity::normalize::{NormalizedPhrase, Normalizer};
