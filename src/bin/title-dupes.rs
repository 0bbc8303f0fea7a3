//! title-dupes -- standalone MCP duplicate-title checker.
//!
//! Usage: title-dupes [--config <settings.json>]

use anyhow::Context;

fn main() -> anyhow::Result<()> {
    // Log to stderr; stdout carries the JSON-RPC stream.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path = std::env::args().skip_while(|a| a != "--config").nth(1);

    let settings = match config_path {
        Some(path) => title_dupes::Settings::load(std::path::Path::new(&path))
            .with_context(|| format!("failed to load settings from {path}"))?,
        None => title_dupes::Settings::default(),
    };

    title_dupes::run_mcp_server(title_dupes::server::McpServerConfig { settings })
}
