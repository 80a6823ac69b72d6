//! Core behaviors behind the HTTP handlers.
//!
//! This includes:
//!   - Summarizing pasted text or uploaded documents
//!   - Grading free-text answers (model first, local keyword fallback)
//!   - Reconciling and scoring a quiz session
//!   - Exporting the PDF and emailing de-identified results

use axum::http::StatusCode;
use chrono::Utc;
use tracing::{error, info, instrument, warn};

use crate::domain::PediatricSummary;
use crate::email;
use crate::error::ApiError;
use crate::grading::grade_locally;
use crate::intake::{decode_document, validate_text};
use crate::patient_id::generate_deidentified_id;
use crate::pdf::generate_summary_pdf;
use crate::protocol::*;
use crate::quiz::QuizSession;
use crate::state::AppState;
use crate::util::trunc_for_log;

fn accept_summary(mut summary: PediatricSummary) -> Result<PediatricSummary, ApiError> {
  let dropped = summary.sanitize_quiz();
  if dropped > 0 {
    warn!(target: "quiz", dropped, kept = summary.quiz_questions.len(), "Summary quiz sanitized");
  }
  if summary.simple_explanation.trim().is_empty() {
    return Err(ApiError::upstream("summarizer", "model returned an empty explanation"));
  }
  Ok(summary)
}

#[instrument(level = "info", skip(state, text), fields(text_len = text.len()))]
pub async fn summarize_text(state: &AppState, text: &str) -> Result<PediatricSummary, ApiError> {
  validate_text(text, &state.intake)?;
  let oa = state.openai.as_ref().ok_or(ApiError::Unavailable("summarization"))?;
  let summary = oa
    .summarize_text(&state.prompts, text.trim())
    .await
    .map_err(|e| ApiError::upstream("summarizer", e))?;
  accept_summary(summary)
}

#[instrument(level = "info", skip(state, body), fields(mime = %body.mime, encoded_len = body.data_base64.len()))]
pub async fn summarize_document(state: &AppState, body: &SummarizeDocumentIn) -> Result<PediatricSummary, ApiError> {
  let doc = decode_document(&body.mime, &body.filename, &body.data_base64, &state.intake)?;
  let oa = state.openai.as_ref().ok_or(ApiError::Unavailable("summarization"))?;
  let summary = oa
    .summarize_document(&state.prompts, &doc)
    .await
    .map_err(|e| ApiError::upstream("summarizer", e))?;
  accept_summary(summary)
}

/// Grade a free-text answer. Never fails: any model problem falls back to
/// local keyword matching.
#[instrument(level = "info", skip(state, body), fields(answer_len = body.answer.len()))]
pub async fn grade_free_text(state: &AppState, body: &GradeIn) -> GradeOut {
  if let Some(oa) = &state.openai {
    let context = body.summary.as_ref().map(|s| s.grading_context()).unwrap_or_default();
    match oa
      .grade_answer(&state.prompts, &body.question, &body.correct_answer, &body.answer, &context)
      .await
    {
      Ok(g) => {
        info!(target: "quiz", is_correct = g.is_correct, "Graded by model");
        return GradeOut { is_correct: g.is_correct, feedback: g.feedback, graded_by: "model" };
      }
      Err(e) => {
        error!(target: "quiz", error = %trunc_for_log(&e, 300), "Model grading failed; using keyword fallback.");
      }
    }
  }
  let g = grade_locally(&body.correct_answer, &body.answer, &state.grading);
  info!(target: "quiz", is_correct = g.is_correct, "Graded by keyword fallback");
  GradeOut { is_correct: g.is_correct, feedback: g.feedback, graded_by: "fallback" }
}

fn session_from(sub: &QuizSubmission) -> Result<QuizSession, ApiError> {
  if let Some(defect) = sub.summary.quiz_defect() {
    return Err(ApiError::validation(format!("Malformed quiz: {defect}")));
  }
  Ok(QuizSession::replay(sub.summary.clone(), &sub.answers, &sub.free_text)?)
}

#[instrument(level = "info", skip(state, sub), fields(questions = sub.summary.quiz_questions.len(), answers = sub.answers.len()))]
pub fn score_quiz(state: &AppState, sub: &QuizSubmission) -> Result<ScoreOut, ApiError> {
  let session = session_from(sub)?;
  let score = session.score(state.unanswered);
  info!(target: "quiz", score, answered = session.answered(), "Quiz reconciled");
  Ok(ScoreOut {
    score,
    answered: session.answered(),
    records: session.reconcile(),
    answers: session.answers(),
  })
}

#[instrument(level = "info", skip(state, sub))]
pub fn export_pdf(state: &AppState, sub: &QuizSubmission) -> Result<Vec<u8>, ApiError> {
  let session = session_from(sub)?;
  let score = session.score(state.unanswered);
  Ok(generate_summary_pdf(session.summary(), score, Utc::now())?)
}

/// Validate, reconcile, mint a de-identified ID and hand the email to Gmail.
/// Transport problems come back as `success: false` with a matching status.
#[instrument(level = "info", skip(state, body), fields(answers = body.quiz.answers.len()))]
pub async fn send_doctor_email(state: &AppState, body: &SendEmailIn) -> Result<(StatusCode, SendEmailOut), ApiError> {
  email::validate_request(&body.doctor_email, body.consent)?;
  let session = session_from(&body.quiz)?;

  let Some(gmail) = &state.gmail else {
    return Ok((
      StatusCode::SERVICE_UNAVAILABLE,
      SendEmailOut { success: false, message: "Email service is not configured on this server.".into(), patient_id: None },
    ));
  };

  let patient_id = generate_deidentified_id(&state.ids.prefix);
  let payload = email::build_payload(&body.doctor_email, &session, state.unanswered, patient_id.clone());
  let rendered = email::render(&payload).map_err(|e| ApiError::Internal(format!("email template: {e}")))?;

  match gmail.send_html(&payload.doctor_email, &rendered.subject, &rendered.html).await {
    Ok(_) => {
      info!(target: "pedibrief_backend", %patient_id, score = payload.quiz_score, records = payload.quiz_data.len(), "Doctor email sent");
      Ok((
        StatusCode::OK,
        SendEmailOut { success: true, message: "Email sent successfully".into(), patient_id: Some(patient_id) },
      ))
    }
    Err(e) => {
      error!(target: "pedibrief_backend", %patient_id, error = %trunc_for_log(&e, 300), "Doctor email failed");
      Ok((
        StatusCode::BAD_GATEWAY,
        SendEmailOut { success: false, message: format!("Failed to send email: {e}"), patient_id: Some(patient_id) },
      ))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::AgentConfig;
  use crate::domain::{FreeTextAnswer, QuizAnswer, QuizQuestion};

  fn state() -> AppState {
    AppState::offline(AgentConfig::default())
  }

  fn submission(selected: Vec<usize>) -> QuizSubmission {
    QuizSubmission {
      summary: PediatricSummary {
        simple_explanation: "Stomach bug.".into(),
        quiz_questions: vec![QuizQuestion {
          id: "q1".into(),
          question: "When should you come back?".into(),
          options: vec!["Never".into(), "Bloody stools".into(), "Hungry".into(), "Sleeping well".into()],
          correct_option_indexes: vec![1],
          explanation: None,
          correct_answer: None,
        }],
        ..Default::default()
      },
      answers: vec![QuizAnswer { question_id: "q1".into(), selected_option_indexes: selected, score_fraction: 0.0 }],
      free_text: vec![],
    }
  }

  #[tokio::test]
  async fn grading_falls_back_without_model() {
    let out = grade_free_text(&state(), &GradeIn {
      question: "What should you watch for?".into(),
      correct_answer: "fever; dehydration; lethargy".into(),
      answer: "fever and if she is dehydrated".into(),
      summary: None,
    }).await;
    assert!(out.is_correct);
    assert_eq!(out.graded_by, "fallback");
  }

  #[tokio::test]
  async fn summarization_needs_valid_text_then_a_model() {
    let s = state();
    assert!(matches!(summarize_text(&s, "short").await, Err(ApiError::Validation(_))));
    let long = crate::seeds::SAMPLE_DISCHARGE_NOTE;
    assert!(matches!(summarize_text(&s, long).await, Err(ApiError::Unavailable(_))));
  }

  #[test]
  fn end_to_end_scores() {
    assert_eq!(score_quiz(&state(), &submission(vec![1])).unwrap().score, 100);
    assert_eq!(score_quiz(&state(), &submission(vec![])).unwrap().score, 0);
  }

  #[test]
  fn score_rejects_malformed_quiz_and_answers() {
    let mut bad_key = submission(vec![1]);
    bad_key.summary.quiz_questions[0].correct_option_indexes = vec![9];
    assert!(matches!(score_quiz(&state(), &bad_key), Err(ApiError::Validation(_))));

    let bad_answer = submission(vec![7]);
    assert!(matches!(score_quiz(&state(), &bad_answer), Err(ApiError::Validation(_))));

    let mut free_on_mc = submission(vec![1]);
    free_on_mc.free_text.push(FreeTextAnswer { question_id: "q1".into(), answer: "x".into(), is_correct: true, feedback: String::new() });
    assert!(matches!(score_quiz(&state(), &free_on_mc), Err(ApiError::Validation(_))));
  }

  #[test]
  fn exports_pdf_bytes() {
    let bytes = export_pdf(&state(), &submission(vec![1])).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
  }

  #[tokio::test]
  async fn email_validates_before_transport() {
    let s = state();
    let mut body = SendEmailIn { doctor_email: "not-an-email".into(), consent: true, quiz: submission(vec![1]) };
    assert!(matches!(send_doctor_email(&s, &body).await, Err(ApiError::Validation(_))));

    body.doctor_email = "dr@clinic.org".into();
    body.consent = false;
    assert!(matches!(send_doctor_email(&s, &body).await, Err(ApiError::Validation(_))));

    body.consent = true;
    let (status, out) = send_doctor_email(&s, &body).await.unwrap();
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(!out.success);
    assert!(out.patient_id.is_none());
  }
}
