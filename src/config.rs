//! Loading service configuration (prompts + policies) from TOML.
//!
//! Every section is optional; missing keys fall back to defaults.
//! See `AgentConfig` for the expected schema.

use serde::Deserialize;
use tracing::{error, info};

use crate::grading::FallbackPolicy;
use crate::patient_id::DEFAULT_PREFIX;
use crate::quiz::UnansweredPolicy;

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AgentConfig {
  #[serde(default)]
  pub prompts: Prompts,
  #[serde(default)]
  pub grading: FallbackPolicy,
  #[serde(default)]
  pub scoring: ScoringCfg,
  #[serde(default)]
  pub intake: IntakeCfg,
  #[serde(default)]
  pub ids: IdCfg,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct ScoringCfg {
  #[serde(default)]
  pub unanswered: UnansweredPolicy,
}

/// Limits on what the summarizer accepts.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct IntakeCfg {
  pub min_text_chars: usize,
  pub max_document_bytes: usize,
}

impl Default for IntakeCfg {
  fn default() -> Self {
    Self { min_text_chars: 50, max_document_bytes: 10 * 1024 * 1024 }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct IdCfg {
  pub prefix: String,
}

impl Default for IdCfg {
  fn default() -> Self {
    Self { prefix: DEFAULT_PREFIX.into() }
  }
}

/// Prompts used by the model client. Override in TOML to tune tone or structure.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  pub summarize_system: String,
  pub summarize_user_template: String,
  pub summarize_document_instruction: String,
  pub grade_system: String,
  pub grade_user_template: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      summarize_system: concat!(
        "You turn pediatric hospital discharge summaries into plain-language guidance for parents. ",
        "Write at a 6th-grade reading level, warm and calm. Remove all names, dates of birth, record numbers and other identifiers. ",
        "Respond ONLY with strict JSON."
      ).into(),
      summarize_user_template: concat!(
        "Discharge summary:\n{text}\n\n",
        "Return JSON with fields: simpleExplanation (string), redFlags (string[]), whatToDo (string[]), ",
        "whatNotToDo (string[]), medications ({name, dose, timing, notes?}[]), expectedCourse (string), ",
        "followUp (string[]), quizQuestions ({id, question, options: string[], correctOptionIndexes: number[], explanation}[]). ",
        "Write 4-6 quiz questions about red flags, medications and home care. Use ids q1, q2, ... ",
        "correctOptionIndexes are 0-based indexes into options; a question may have several correct options."
      ).into(),
      summarize_document_instruction: concat!(
        "The attached document is a pediatric discharge summary. Read it and follow the same rules. ",
        "Return JSON with fields: simpleExplanation, redFlags, whatToDo, whatNotToDo, medications ({name, dose, timing, notes?}), ",
        "expectedCourse, followUp, quizQuestions ({id, question, options, correctOptionIndexes, explanation})."
      ).into(),
      grade_system: "You grade a parent's understanding of their child's discharge instructions. Be kind and brief. Output JSON only.".into(),
      grade_user_template: concat!(
        "Question: {question}\nReference answer: {reference}\nParent's answer: {answer}\n\nContext:\n{context}\n\n",
        "Return JSON {\"isCorrect\": boolean, \"feedback\": string}. Accept paraphrases; the answer is correct when it covers the safety-critical points. ",
        "Feedback is one or two encouraging sentences."
      ).into(),
    }
  }
}

/// Parse a TOML config document.
pub fn parse_agent_config(s: &str) -> Result<AgentConfig, toml::de::Error> {
  toml::from_str::<AgentConfig>(s)
}

/// Attempt to load `AgentConfig` from AGENT_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_agent_config_from_env() -> Option<AgentConfig> {
  let path = std::env::var("AGENT_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match parse_agent_config(&s) {
      Ok(cfg) => {
        info!(target: "pedibrief_backend", %path, "Loaded agent config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "pedibrief_backend", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "pedibrief_backend", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_document_gives_defaults() {
    let cfg = parse_agent_config("").expect("empty toml");
    assert_eq!(cfg.grading, FallbackPolicy::default());
    assert_eq!(cfg.scoring.unanswered, UnansweredPolicy::Skip);
    assert_eq!(cfg.intake.min_text_chars, 50);
    assert_eq!(cfg.ids.prefix, "PEDI");
    assert!(cfg.prompts.grade_user_template.contains("{reference}"));
  }

  #[test]
  fn partial_sections_override_only_given_keys() {
    let cfg = parse_agent_config(
      r#"
        [grading]
        max_required = 2

        [scoring]
        unanswered = "count_as_zero"

        [intake]
        max_document_bytes = 1024

        [prompts]
        grade_system = "Be strict."
      "#,
    )
    .expect("toml");
    assert_eq!(cfg.grading.max_required, 2);
    assert_eq!(cfg.grading.divisor, 3);
    assert_eq!(cfg.scoring.unanswered, UnansweredPolicy::CountAsZero);
    assert_eq!(cfg.intake.max_document_bytes, 1024);
    assert_eq!(cfg.intake.min_text_chars, 50);
    assert_eq!(cfg.prompts.grade_system, "Be strict.");
    assert!(!cfg.prompts.summarize_system.is_empty());
  }

  #[test]
  fn rejects_unknown_policy() {
    assert!(parse_agent_config("[scoring]\nunanswered = \"halve\"").is_err());
  }
}
