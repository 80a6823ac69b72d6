//! Public request/response structs for the HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};

use crate::domain::{FreeTextAnswer, PediatricSummary, QuizAnswer};
use crate::quiz::ReconciliationRecord;

#[derive(Serialize)]
pub struct HealthOut {
  pub ok: bool,
  pub summarizer: bool,
  pub email: bool,
}

#[derive(Serialize)]
pub struct SampleNoteOut {
  pub text: &'static str,
}

#[derive(Deserialize)]
pub struct SummarizeIn {
  pub text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeDocumentIn {
  #[serde(default)]
  pub filename: String,
  #[serde(default)]
  pub mime: String,
  pub data_base64: String,
}

/// Free-text grading request. `summary` supplies the grading context.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeIn {
  pub question: String,
  pub correct_answer: String,
  pub answer: String,
  #[serde(default)]
  pub summary: Option<PediatricSummary>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeOut {
  pub is_correct: bool,
  pub feedback: String,
  /// "model" or "fallback".
  pub graded_by: &'static str,
}

/// The quiz state the browser holds for its session.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizSubmission {
  pub summary: PediatricSummary,
  #[serde(default)]
  pub answers: Vec<QuizAnswer>,
  #[serde(default)]
  pub free_text: Vec<FreeTextAnswer>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreOut {
  pub score: u8,
  pub answered: usize,
  pub records: Vec<ReconciliationRecord>,
  pub answers: Vec<QuizAnswer>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailIn {
  pub doctor_email: String,
  #[serde(default)]
  pub consent: bool,
  #[serde(flatten)]
  pub quiz: QuizSubmission,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailOut {
  pub success: bool,
  pub message: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub patient_id: Option<String>,
}
