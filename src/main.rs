//! PediBrief · Pediatric Discharge Companion Backend
//!
//! - Axum HTTP API (summaries, quiz grading/scoring, PDF export, doctor email)
//! - Optional OpenAI-compatible summarizer/grader (via environment variables)
//! - Optional Gmail transport for doctor emails
//! - Static SPA fallback (./static/index.html)
//!
//! Important env variables:
//!   PORT                  : u16 (default 3000)
//!   OPENAI_API_KEY        : enables summarization and model grading if present
//!   OPENAI_BASE_URL       : default "https://api.openai.com/v1"
//!   OPENAI_FAST_MODEL     : default "gpt-4o-mini" (grading)
//!   OPENAI_STRONG_MODEL   : default "gpt-4o" (summaries)
//!   GMAIL_CLIENT_ID, GMAIL_CLIENT_SECRET,
//!   GMAIL_REFRESH_TOKEN, GMAIL_USER_EMAIL : enable doctor emails when all set
//!   AGENT_CONFIG_PATH     : path to TOML config (prompts + policies)
//!   LOG_LEVEL             : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT            : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod error;
mod config;
mod seeds;
mod state;
mod protocol;
mod intake;
mod quiz;
mod grading;
mod patient_id;
mod openai;
mod gmail;
mod email;
mod pdf;
mod logic;
mod routes;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument, warn};

use crate::routes::build_router;
use crate::state::AppState;

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!(target: "pedibrief_backend", error = %e, "Could not listen for ctrl-c");
    std::future::pending::<()>().await;
  }
  info!(target: "pedibrief_backend", "Shutdown requested");
}

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Prompts, policies and optional OpenAI/Gmail clients. No patient data is kept.
  let state = Arc::new(AppState::new());

  let app = build_router(state.clone());

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "pedibrief_backend", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;
  Ok(())
}
