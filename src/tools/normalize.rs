//! Normalize tool — shows the tokens a phrase reduces to.

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::matcher::DuplicateMatcher;
use crate::server::{ToolCallResult, ToolDefinition};

/// Parameters for the normalize tool.
#[derive(Debug, Deserialize)]
pub struct NormalizeParams {
    pub phrase: String,
}

/// Return the MCP tool definition for `normalize`.
pub fn tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: "normalize".to_owned(),
        description: "Normalize a phrase: lower-case, strip punctuation, canonicalize synonyms \
            and drop stopwords. Returns the resulting tokens as a JSON array."
            .to_owned(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "phrase": {
                    "type": "string",
                    "description": "The phrase to normalize"
                }
            },
            "required": ["phrase"]
        }),
    }
}

/// Execute the normalize tool.
///
/// # Errors
///
/// Returns an error if the arguments are invalid.
pub fn execute(matcher: &DuplicateMatcher, arguments: serde_json::Value) -> Result<ToolCallResult> {
    let params: NormalizeParams =
        serde_json::from_value(arguments).context("invalid normalize parameters")?;

    let tokens = matcher.comparator().normalize(&params.phrase);
    let text = serde_json::to_string(&tokens).context("failed to serialize tokens")?;

    Ok(ToolCallResult::text(text))
}
