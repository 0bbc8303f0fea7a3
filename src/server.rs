//! MCP server exposing the duplicate engine over stdio.
//!
//! JSON-RPC 2.0, one message per line on stdin, one response per line on
//! stdout. Supported methods: `initialize`, `notifications/initialized`,
//! `tools/list`, `tools/call` and `ping`. The session ends when stdin closes.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::config::Settings;
use crate::matcher::DuplicateMatcher;
use crate::tools::ToolRouter;

/// Longest accepted request line (10 MiB).
const MAX_LINE_BYTES: usize = 10 * 1024 * 1024;

const PROTOCOL_VERSION: &str = "2025-06-18";

// JSON-RPC 2.0 error codes.
const PARSE_ERROR: i64 = -32700;
const INVALID_REQUEST: i64 = -32600;
const METHOD_NOT_FOUND: i64 = -32601;
const INVALID_PARAMS: i64 = -32602;
const INTERNAL_ERROR: i64 = -32603;

// ---------------------------------------------------------------------------
// JSON-RPC 2.0 types
// ---------------------------------------------------------------------------

/// JSON-RPC 2.0 request.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// JSON-RPC 2.0 response.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    fn success(id: Option<Value>, result: &impl Serialize) -> Self {
        match serde_json::to_value(result) {
            Ok(v) => Self {
                jsonrpc: "2.0".to_owned(),
                id,
                result: Some(v),
                error: None,
            },
            Err(e) => {
                error!(error = %e, "failed to serialize result");
                Self::failure(
                    id,
                    INTERNAL_ERROR,
                    &format!("internal error: failed to serialize result: {e}"),
                )
            }
        }
    }

    fn failure(id: Option<Value>, code: i64, message: &str) -> Self {
        Self {
            jsonrpc: "2.0".to_owned(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.to_owned(),
                data: None,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// MCP protocol types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InitializeResult {
    protocol_version: &'static str,
    capabilities: Value,
    server_info: ServerInfo,
}

#[derive(Debug, Serialize)]
struct ServerInfo {
    name: &'static str,
    version: &'static str,
}

/// MCP tool definition for tools/list.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

#[derive(Debug, Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// MCP content item in tools/call response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

/// MCP tools/call result.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    pub content: Vec<ContentItem>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolCallResult {
    /// Successful result carrying a single text item.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ContentItem {
                content_type: "text".to_owned(),
                text: text.into(),
            }],
            is_error: false,
        }
    }

    /// Failed result; the message is prefixed with `Error: `.
    pub fn error(message: impl std::fmt::Display) -> Self {
        Self {
            is_error: true,
            ..Self::text(format!("Error: {message}"))
        }
    }
}

// ---------------------------------------------------------------------------
// Server configuration
// ---------------------------------------------------------------------------

/// Configuration for the MCP server.
#[derive(Debug, Clone, Default)]
pub struct McpServerConfig {
    /// Scoring constants and dictionaries for the engine.
    pub settings: Settings,
}

// ---------------------------------------------------------------------------
// Server main loop
// ---------------------------------------------------------------------------

/// Serve MCP requests on stdin/stdout until stdin is closed.
///
/// # Errors
///
/// Returns an error if the engine cannot be built from the settings or if
/// stdin/stdout I/O fails fatally.
pub fn run_mcp_server(config: McpServerConfig) -> Result<()> {
    info!(
        threshold = config.settings.engine.threshold,
        error_adjustment = config.settings.engine.error_adjustment,
        "title-dupes MCP server starting"
    );

    let matcher = DuplicateMatcher::from_settings(&config.settings)
        .context("failed to build duplicate matcher")?;
    let router = ToolRouter::new(matcher);

    let stdin = std::io::stdin();
    let mut reader = std::io::BufReader::new(stdin.lock());
    let mut stdout = std::io::stdout().lock();

    serve(&router, &mut reader, &mut stdout)?;

    info!("title-dupes MCP server stopped");
    Ok(())
}

/// Request/response loop over arbitrary streams.
///
/// Oversized or non-UTF-8 lines are answered with a JSON-RPC error and the
/// loop carries on with the next line.
///
/// # Errors
///
/// Returns an error only if reading or writing the streams fails.
pub fn serve(router: &ToolRouter, reader: &mut impl BufRead, out: &mut impl Write) -> Result<()> {
    serve_with_limit(router, reader, out, MAX_LINE_BYTES)
}

/// [`serve`] with an explicit per-line byte limit.
///
/// # Errors
///
/// Returns an error only if reading or writing the streams fails.
pub fn serve_with_limit(
    router: &ToolRouter,
    reader: &mut impl BufRead,
    out: &mut impl Write,
    max_line_bytes: usize,
) -> Result<()> {
    let mut line_buf = Vec::new();

    loop {
        line_buf.clear();
        let outcome = read_line_limited(reader, &mut line_buf, max_line_bytes)
            .context("failed to read request")?;

        match outcome {
            LineRead::Eof => {
                info!("input closed, shutting down");
                return Ok(());
            }
            LineRead::TooLong => {
                warn!(max_line_bytes, "request line too long, skipped");
                let resp = JsonRpcResponse::failure(
                    None,
                    INVALID_REQUEST,
                    &format!("invalid request: line exceeds maximum size ({max_line_bytes} bytes)"),
                );
                write_response(out, &resp)?;
                continue;
            }
            LineRead::Line => {}
        }

        let line = match std::str::from_utf8(&line_buf) {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "non-UTF-8 request line");
                let resp =
                    JsonRpcResponse::failure(None, PARSE_ERROR, &format!("parse error: {e}"));
                write_response(out, &resp)?;
                continue;
            }
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        debug!(raw = trimmed, "received request");

        if let Some(resp) = handle_line(router, trimmed) {
            write_response(out, &resp)?;
        }
    }
}

/// Parse and dispatch a single request line.
///
/// Returns `None` for notifications, which never receive a response.
pub fn handle_line(router: &ToolRouter, line: &str) -> Option<JsonRpcResponse> {
    let request: JsonRpcRequest = match serde_json::from_str(line) {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "invalid JSON-RPC request");
            return Some(JsonRpcResponse::failure(
                None,
                PARSE_ERROR,
                &format!("parse error: {e}"),
            ));
        }
    };

    if request.jsonrpc != "2.0" {
        warn!(version = request.jsonrpc, "invalid JSON-RPC version");
        return Some(JsonRpcResponse::failure(
            request.id.clone(),
            INVALID_REQUEST,
            &format!(
                "invalid request: jsonrpc version must be \"2.0\", got \"{}\"",
                request.jsonrpc
            ),
        ));
    }

    let response = dispatch(router, &request);

    if request.id.is_none() {
        debug!(method = request.method, "notification handled");
        return None;
    }

    response
}

fn dispatch(router: &ToolRouter, req: &JsonRpcRequest) -> Option<JsonRpcResponse> {
    let id = req.id.clone();
    match req.method.as_str() {
        "initialize" => Some(JsonRpcResponse::success(
            id,
            &InitializeResult {
                protocol_version: PROTOCOL_VERSION,
                capabilities: serde_json::json!({ "tools": { "listChanged": false } }),
                server_info: ServerInfo {
                    name: "title-dupes",
                    version: env!("CARGO_PKG_VERSION"),
                },
            },
        )),
        "notifications/initialized" => {
            info!("client initialized");
            None
        }
        "tools/list" => Some(JsonRpcResponse::success(
            id,
            &serde_json::json!({ "tools": router.list_tools() }),
        )),
        "tools/call" => Some(handle_tools_call(router, req)),
        "ping" => Some(JsonRpcResponse::success(id, &serde_json::json!({}))),
        _ => {
            warn!(method = req.method, "unknown method");
            Some(JsonRpcResponse::failure(
                id,
                METHOD_NOT_FOUND,
                &format!("method not found: {}", req.method),
            ))
        }
    }
}

fn handle_tools_call(router: &ToolRouter, req: &JsonRpcRequest) -> JsonRpcResponse {
    let params: ToolCallParams = match serde_json::from_value(req.params.clone()) {
        Ok(p) => p,
        Err(e) => {
            return JsonRpcResponse::failure(
                req.id.clone(),
                INVALID_PARAMS,
                &format!("invalid tools/call params: {e}"),
            );
        }
    };

    let result = router.call_tool(&params.name, params.arguments).unwrap_or_else(|e| {
        error!(tool = params.name, error = %e, "tool call failed");
        ToolCallResult::error(format!("{e:#}"))
    });

    JsonRpcResponse::success(req.id.clone(), &result)
}

fn write_response(out: &mut impl Write, resp: &JsonRpcResponse) -> Result<()> {
    let json = serde_json::to_string(resp).context("failed to serialize response")?;
    debug!(response = json, "sending response");
    out.write_all(json.as_bytes())
        .context("failed to write response")?;
    out.write_all(b"\n").context("failed to write newline")?;
    out.flush().context("failed to flush output")?;
    Ok(())
}

/// Outcome of reading one request line.
#[derive(Debug, PartialEq, Eq)]
enum LineRead {
    /// A complete line (or the unterminated tail of the stream) is in the buffer.
    Line,
    /// The line exceeded the limit and was discarded up to its newline.
    TooLong,
    Eof,
}

/// Read one line of raw bytes into `buf`, refusing lines longer than `max_bytes`.
///
/// Bytes are collected across `fill_buf` chunks and decoded by the caller,
/// so a multibyte character split between two chunks stays intact.
fn read_line_limited(
    reader: &mut impl BufRead,
    buf: &mut Vec<u8>,
    max_bytes: usize,
) -> std::io::Result<LineRead> {
    let mut total = 0usize;
    loop {
        let available = reader.fill_buf()?;
        if available.is_empty() {
            return Ok(if total == 0 { LineRead::Eof } else { LineRead::Line });
        }
        let (consumed, found_newline) = match available.iter().position(|&b| b == b'\n') {
            Some(pos) => (pos + 1, true),
            None => (available.len(), false),
        };
        if total + consumed > max_bytes {
            reader.consume(consumed);
            if !found_newline {
                skip_to_newline(reader)?;
            }
            buf.clear();
            return Ok(LineRead::TooLong);
        }
        buf.extend_from_slice(&available[..consumed]);
        total += consumed;
        reader.consume(consumed);
        if found_newline {
            return Ok(LineRead::Line);
        }
    }
}

fn skip_to_newline(reader: &mut impl BufRead) -> std::io::Result<()> {
    loop {
        let rest = reader.fill_buf()?;
        if rest.is_empty() {
            return Ok(());
        }
        if let Some(pos) = rest.iter().position(|&b| b == b'\n') {
            reader.consume(pos + 1);
            return Ok(());
        }
        let len = rest.len();
        reader.consume(len);
    }
}
