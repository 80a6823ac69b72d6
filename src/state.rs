//! Application state: prompts, policies and the optional external clients.
//!
//! This module owns:
//!   - the prompts struct (from TOML or defaults)
//!   - grading, scoring, intake and ID policies
//!   - optional OpenAI client (summarization + grading)
//!   - optional Gmail transport (doctor emails)
//!
//! It holds no patient data: every request carries its own session.

use tracing::{info, instrument, warn};

use crate::config::{load_agent_config_from_env, AgentConfig, IdCfg, IntakeCfg, Prompts};
use crate::gmail::Gmail;
use crate::grading::FallbackPolicy;
use crate::openai::OpenAI;
use crate::quiz::UnansweredPolicy;

#[derive(Clone)]
pub struct AppState {
  pub openai: Option<OpenAI>,
  pub gmail: Option<Gmail>,
  pub prompts: Prompts,
  pub grading: FallbackPolicy,
  pub unanswered: UnansweredPolicy,
  pub intake: IntakeCfg,
  pub ids: IdCfg,
}

impl AppState {
  /// Build state from env: load config, init OpenAI and Gmail when configured.
  #[instrument(level = "info", skip_all)]
  pub fn new() -> Self {
    let cfg = load_agent_config_from_env().unwrap_or_default();

    let openai = OpenAI::from_env();
    if let Some(oa) = &openai {
      info!(target: "pedibrief_backend", base_url = %oa.base_url, fast_model = %oa.fast_model, strong_model = %oa.strong_model, "OpenAI enabled.");
    } else {
      warn!(target: "pedibrief_backend", "OpenAI disabled (no OPENAI_API_KEY). Summaries unavailable; grading uses the local fallback.");
    }

    let gmail = Gmail::from_env();
    if gmail.is_some() {
      info!(target: "pedibrief_backend", "Gmail transport enabled.");
    } else {
      warn!(target: "pedibrief_backend", "Gmail disabled (GMAIL_* variables incomplete). Doctor emails unavailable.");
    }

    info!(
      target: "pedibrief_backend",
      unanswered = ?cfg.scoring.unanswered,
      min_text_chars = cfg.intake.min_text_chars,
      max_document_bytes = cfg.intake.max_document_bytes,
      "Policies loaded"
    );

    Self::with_clients(cfg, openai, gmail)
  }

  pub fn with_clients(cfg: AgentConfig, openai: Option<OpenAI>, gmail: Option<Gmail>) -> Self {
    Self {
      openai,
      gmail,
      prompts: cfg.prompts,
      grading: cfg.grading,
      unanswered: cfg.scoring.unanswered,
      intake: cfg.intake,
      ids: cfg.ids,
    }
  }

  /// No external integrations: used by tests and offline runs.
  #[allow(dead_code)]
  pub fn offline(cfg: AgentConfig) -> Self {
    Self::with_clients(cfg, None, None)
  }
}
