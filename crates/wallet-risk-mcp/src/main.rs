//! Wallet Risk MCP Server
//!
//! Model Context Protocol server exposing the wallet risk engine to AI agents
//! over stdio. Agents pass a normalized wallet snapshot and get back a scored
//! assessment with recommendations.
//!
//! # Modes
//!
//! - **Hybrid**: when `GEMINI_API_KEY` is set, rule-based scores are blended
//!   with a Gemini assessment
//! - **Rule-only**: without a key, or when a call passes `rule_only`

mod cache;
mod config;
mod error;
mod gemini;
mod tools;

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use tokio::runtime::Runtime;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use wallet_risk_core::RiskEngine;

use crate::cache::AssessmentCache;
use crate::config::AppConfig;
use crate::gemini::GeminiClient;
use crate::tools::{handle_request, JsonRpcRequest, RiskTools};

fn main() -> anyhow::Result<()> {
    // Initialize logging to stderr (stdout is for MCP protocol)
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("wallet_risk_mcp=info,wallet_risk_core=info")
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting Wallet Risk MCP Server");

    let rt = Runtime::new()?;

    // A config file or environment value that fails to parse is fatal
    let config = rt.block_on(AppConfig::load())?;

    // Weights that parse but do not validate are fatal too
    let mut engine = RiskEngine::new(config.scoring.clone())?;

    if config.gemini.enabled() {
        match GeminiClient::new(&config.gemini, config.scoring.ai.timeout_seconds) {
            Ok(client) => {
                engine = engine.with_ai_provider(Arc::new(client));
                tracing::info!(model = %config.scoring.ai.model, "Gemini scoring enabled");
            }
            Err(e) => {
                tracing::warn!(error = %e, "Gemini client unavailable - running rule-only");
            }
        }
    } else {
        tracing::info!("GEMINI_API_KEY not set - running rule-only");
    }

    tracing::info!(
        ai_enabled = engine.ai_enabled(),
        cache_capacity = config.cache.max_capacity,
        cache_ttl_seconds = config.cache.ttl_seconds,
        "Configuration loaded"
    );

    let tools = Arc::new(RiskTools::new(
        Arc::new(engine),
        AssessmentCache::new(&config.cache),
    ));

    tracing::info!("MCP server ready, listening on stdio");

    // Main loop: read JSON-RPC requests from stdin, write responses to stdout
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                tracing::error!(error = %e, "Error reading stdin");
                continue;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let request: JsonRpcRequest = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(error = %e, "Error parsing request");
                continue;
            }
        };

        tracing::debug!(method = %request.method, "Received request");

        let tools_clone = Arc::clone(&tools);
        let response = rt.block_on(async move { handle_request(&tools_clone, request).await });

        // Notifications produce no response
        if let Some(response) = response {
            let response_str = serde_json::to_string(&response).unwrap_or_default();
            if let Err(e) = writeln!(stdout, "{}", response_str) {
                tracing::error!(error = %e, "Error writing response");
            }
            if let Err(e) = stdout.flush() {
                tracing::error!(error = %e, "Error flushing stdout");
            }
        }
    }

    tracing::info!("MCP server shutting down");
    Ok(())
}
