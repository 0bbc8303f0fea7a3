//! Tool router — registers and dispatches MCP tool calls.
//!
//! Every tool is a pair of functions: `tool_definition()` describing its
//! JSON Schema, and `execute()` taking the JSON arguments and returning a
//! [`ToolCallResult`]. All tools share one [`DuplicateMatcher`].

pub mod compare;
pub mod duplicates;
pub mod normalize;

use anyhow::Result;
use tracing::debug;

use crate::matcher::DuplicateMatcher;
use crate::server::{ToolCallResult, ToolDefinition};

/// Longest title, in characters, the scoring tools accept.
pub const MAX_TITLE_CHARS: usize = 1_024;

/// Error result for a title over [`MAX_TITLE_CHARS`], or `None` if it fits.
fn title_too_long(field: &str, title: &str) -> Option<ToolCallResult> {
    let chars = title.chars().count();
    (chars > MAX_TITLE_CHARS).then(|| {
        ToolCallResult::error(format!(
            "{field} is {chars} characters long; the limit is {MAX_TITLE_CHARS}"
        ))
    })
}

/// Tool router that dispatches MCP tool calls to implementations.
pub struct ToolRouter {
    matcher: DuplicateMatcher,
}

impl ToolRouter {
    pub fn new(matcher: DuplicateMatcher) -> Self {
        Self { matcher }
    }

    pub fn matcher(&self) -> &DuplicateMatcher {
        &self.matcher
    }

    /// List all available tools with their JSON Schema definitions.
    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        vec![
            normalize::tool_definition(),
            compare::tool_definition(),
            duplicates::tool_definition(),
        ]
    }

    /// Call a tool by name with the given JSON arguments.
    ///
    /// Unknown tools produce an error result rather than an `Err`.
    ///
    /// # Errors
    ///
    /// Returns an error if the arguments do not match the tool's schema or
    /// the result cannot be serialized.
    pub fn call_tool(&self, name: &str, arguments: serde_json::Value) -> Result<ToolCallResult> {
        debug!(tool = name, "dispatching tool call");

        match name {
            "normalize" => normalize::execute(&self.matcher, arguments),
            "compare" => compare::execute(&self.matcher, arguments),
            "find_duplicates" => duplicates::execute(&self.matcher, arguments),
            _ => Ok(ToolCallResult::error(format!("unknown tool: {name}"))),
        }
    }
}
