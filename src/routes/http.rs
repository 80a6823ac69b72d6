//! HTTP endpoint handlers. These are thin wrappers that forward to core logic.
//! Each handler is instrumented and logs sizes and outcomes, never note contents.

use std::sync::Arc;
use axum::{
  extract::State,
  http::{header, StatusCode},
  response::IntoResponse,
  Json,
};
use tracing::{info, instrument};

use crate::error::ApiError;
use crate::logic::*;
use crate::pdf::PDF_FILENAME;
use crate::protocol::*;
use crate::seeds::SAMPLE_DISCHARGE_NOTE;
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, summarizer: state.openai.is_some(), email: state.gmail.is_some() })
}

#[instrument(level = "info")]
pub async fn http_sample_note() -> impl IntoResponse {
  Json(SampleNoteOut { text: SAMPLE_DISCHARGE_NOTE })
}

#[instrument(level = "info", skip(state, body), fields(text_len = body.text.len()))]
pub async fn http_post_summarize(
  State(state): State<Arc<AppState>>,
  Json(body): Json<SummarizeIn>,
) -> Result<impl IntoResponse, ApiError> {
  let summary = summarize_text(&state, &body.text).await?;
  info!(target: "pedibrief_backend", questions = summary.quiz_questions.len(), red_flags = summary.red_flags.len(), "HTTP summary produced");
  Ok(Json(summary))
}

#[instrument(level = "info", skip(state, body), fields(mime = %body.mime))]
pub async fn http_post_summarize_document(
  State(state): State<Arc<AppState>>,
  Json(body): Json<SummarizeDocumentIn>,
) -> Result<impl IntoResponse, ApiError> {
  let summary = summarize_document(&state, &body).await?;
  info!(target: "pedibrief_backend", questions = summary.quiz_questions.len(), "HTTP document summary produced");
  Ok(Json(summary))
}

#[instrument(level = "info", skip(state, body), fields(answer_len = body.answer.len()))]
pub async fn http_post_grade(
  State(state): State<Arc<AppState>>,
  Json(body): Json<GradeIn>,
) -> impl IntoResponse {
  Json(grade_free_text(&state, &body).await)
}

#[instrument(level = "info", skip(state, body), fields(answers = body.answers.len()))]
pub async fn http_post_score(
  State(state): State<Arc<AppState>>,
  Json(body): Json<QuizSubmission>,
) -> Result<impl IntoResponse, ApiError> {
  Ok(Json(score_quiz(&state, &body)?))
}

#[instrument(level = "info", skip(state, body))]
pub async fn http_post_export_pdf(
  State(state): State<Arc<AppState>>,
  Json(body): Json<QuizSubmission>,
) -> Result<impl IntoResponse, ApiError> {
  let bytes = export_pdf(&state, &body)?;
  info!(target: "pedibrief_backend", bytes = bytes.len(), "HTTP PDF exported");
  Ok((
    StatusCode::OK,
    [
      (header::CONTENT_TYPE, "application/pdf".to_string()),
      (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{PDF_FILENAME}\"")),
    ],
    bytes,
  ))
}

#[instrument(level = "info", skip(state, body), fields(consent = body.consent))]
pub async fn http_post_send_doctor_email(
  State(state): State<Arc<AppState>>,
  Json(body): Json<SendEmailIn>,
) -> Result<impl IntoResponse, ApiError> {
  let (status, out) = send_doctor_email(&state, &body).await?;
  Ok((status, Json(out)))
}
