//! Find-duplicates tool — ranks candidate records against a target title.
//!
//! The caller supplies the candidate batch. Two pre-filters run here before
//! the engine sees the batch: the target's own record is dropped (via
//! `targetId`) and, when `titlePrefix` is set, only candidates whose title
//! starts with that prefix are compared. Any extra candidate fields (e.g.
//! `comments`) come back untouched in each match's `metadata`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::matcher::{Candidate, DuplicateMatcher, MatchResult, Target};
use crate::server::{ToolCallResult, ToolDefinition};
use crate::tools::title_too_long;

/// One candidate record as received over the wire.
#[derive(Debug, Deserialize)]
pub struct CandidateParam {
    pub id: u64,
    pub title: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Parameters for the find_duplicates tool.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindDuplicatesParams {
    /// Title of the record being checked.
    pub title: String,
    /// Identifier of the record being checked, excluded from the results.
    #[serde(default)]
    pub target_id: Option<u64>,
    pub candidates: Vec<CandidateParam>,
    /// Overrides the configured threshold.
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub title_prefix: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FindDuplicatesOutput {
    threshold: f64,
    compared: usize,
    matches: Vec<MatchResult<u64, Map<String, Value>>>,
}

/// Return the MCP tool definition for `find_duplicates`.
pub fn tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: "find_duplicates".to_owned(),
        description: "Find potential duplicates of a title among candidate records. Returns \
            matches scoring at or above the threshold, sorted by candidate id, each with an \
            integer accuracy percentage."
            .to_owned(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "title": {
                    "type": "string",
                    "description": "Title to check for duplicates"
                },
                "targetId": {
                    "type": "integer",
                    "description": "Id of the record being checked; never reported as its own duplicate"
                },
                "candidates": {
                    "type": "array",
                    "description": "Records to compare against. Extra fields are returned as metadata.",
                    "items": {
                        "type": "object",
                        "properties": {
                            "id": { "type": "integer" },
                            "title": { "type": "string" }
                        },
                        "required": ["id", "title"]
                    }
                },
                "threshold": {
                    "type": "number",
                    "minimum": 0,
                    "maximum": 1,
                    "description": "Minimum score (inclusive); defaults to the configured threshold"
                },
                "titlePrefix": {
                    "type": "string",
                    "description": "Only compare candidates whose title starts with this prefix"
                }
            },
            "required": ["title", "candidates"]
        }),
    }
}

/// Execute the find_duplicates tool.
///
/// # Errors
///
/// Returns an error if the arguments are invalid or the output cannot be
/// serialized.
pub fn execute(matcher: &DuplicateMatcher, arguments: serde_json::Value) -> Result<ToolCallResult> {
    let params: FindDuplicatesParams =
        serde_json::from_value(arguments).context("invalid find_duplicates parameters")?;

    let threshold = params.threshold.unwrap_or_else(|| matcher.threshold());
    if !(0.0..=1.0).contains(&threshold) {
        return Ok(ToolCallResult::error(format!(
            "threshold must be within [0, 1], got {threshold}"
        )));
    }

    if let Some(rejected) = title_too_long("title", &params.title) {
        return Ok(rejected);
    }
    if let Some(rejected) = params
        .candidates
        .iter()
        .find_map(|c| title_too_long(&format!("title of candidate {}", c.id), &c.title))
    {
        return Ok(rejected);
    }

    let received = params.candidates.len();
    let candidates: Vec<Candidate<u64, Map<String, Value>>> = params
        .candidates
        .into_iter()
        .filter(|c| {
            params
                .title_prefix
                .as_deref()
                .is_none_or(|prefix| c.title.starts_with(prefix))
        })
        .map(|c| Candidate::with_metadata(c.id, c.title, c.extra))
        .collect();
    let compared = candidates.len();

    debug!(received, compared, threshold, "find_duplicates request");

    let target = match params.target_id.as_ref() {
        Some(id) => Target::new(id, &params.title),
        None => Target::untracked(&params.title),
    };
    let matches = matcher.find_duplicates_with_threshold(target, candidates, threshold);

    let output = FindDuplicatesOutput {
        threshold,
        compared,
        matches,
    };
    let text = serde_json::to_string_pretty(&output).context("failed to serialize matches")?;
    Ok(ToolCallResult::text(text))
}
