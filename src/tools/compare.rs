//! Compare tool — scores two phrases against each other.
//!
//! Reports the direct score, the length penalty and the adjusted score so a
//! caller can see why two titles did or did not reach the threshold.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::matcher::DuplicateMatcher;
use crate::server::{ToolCallResult, ToolDefinition};
use crate::similarity::accuracy_percent;
use crate::tools::title_too_long;

/// Parameters for the compare tool.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareParams {
    pub phrase_a: String,
    pub phrase_b: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CompareOutput {
    score: f64,
    direct_score: f64,
    adjustment: f64,
    query_tokens: usize,
    reference_tokens: usize,
    accuracy: u8,
    /// Whether the score reaches the configured threshold.
    duplicate: bool,
}

/// Return the MCP tool definition for `compare`.
pub fn tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: "compare".to_owned(),
        description: "Compare two phrases and return their similarity score. The score is the \
            mean best-match token similarity minus a penalty per extra word in the longer phrase; \
            it may fall below 0."
            .to_owned(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "phraseA": {
                    "type": "string",
                    "description": "First phrase"
                },
                "phraseB": {
                    "type": "string",
                    "description": "Second phrase"
                }
            },
            "required": ["phraseA", "phraseB"]
        }),
    }
}

/// Execute the compare tool.
///
/// # Errors
///
/// Returns an error if the arguments are invalid. Over-long phrases produce
/// an error result rather than an `Err`.
pub fn execute(matcher: &DuplicateMatcher, arguments: serde_json::Value) -> Result<ToolCallResult> {
    let params: CompareParams =
        serde_json::from_value(arguments).context("invalid compare parameters")?;

    if let Some(rejected) = title_too_long("phraseA", &params.phrase_a)
        .or_else(|| title_too_long("phraseB", &params.phrase_b))
    {
        return Ok(rejected);
    }

    let breakdown = matcher
        .comparator()
        .score_breakdown(&params.phrase_a, &params.phrase_b);
    let score = breakdown.value();

    let output = CompareOutput {
        score,
        direct_score: breakdown.direct_score,
        adjustment: breakdown.adjustment,
        query_tokens: breakdown.query_tokens,
        reference_tokens: breakdown.reference_tokens,
        accuracy: accuracy_percent(score),
        duplicate: score >= matcher.threshold(),
    };

    let text = serde_json::to_string_pretty(&output).context("failed to serialize score")?;
    Ok(ToolCallResult::text(text))
}
