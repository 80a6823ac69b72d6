//! Minimal OpenAI-compatible client for summarization and grading.
//!
//! We only call chat.completions in JSON-object mode. Calls are instrumented and
//! log model names, latencies, and response sizes (not contents).
//!
//! NOTE: We never log the API key or patient text.

use std::time::{Duration, Instant};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use crate::config::Prompts;
use crate::domain::PediatricSummary;
use crate::grading::GradeOutcome;
use crate::intake::Document;
use crate::util::fill_template;

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub fast_model: String,
  pub strong_model: String,
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env() -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok()?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let fast_model =
      std::env::var("OPENAI_FAST_MODEL").unwrap_or_else(|_| "gpt-4o-mini".into());
    let strong_model =
      std::env::var("OPENAI_STRONG_MODEL").unwrap_or_else(|_| "gpt-4o".into());

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(20))
      .build()
      .ok()?;

    Some(Self { client, api_key, base_url, fast_model, strong_model })
  }

  /// JSON-object chat completion. Generic over the target type T.
  #[instrument(level = "info", skip(self, messages), fields(model = %model, messages = messages.len()))]
  async fn chat_json<T: for<'a> Deserialize<'a>>(
    &self,
    model: &str,
    messages: Vec<ChatMessageReq>,
    temperature: f32,
  ) -> Result<T, String> {
    let url = format!("{}/chat/completions", self.base_url);
    let req = ChatCompletionRequest {
      model: model.to_string(),
      messages,
      temperature,
      response_format: Some(ResponseFormat { r#type: "json_object".into() }),
      max_tokens: None,
    };

    let res = self.client.post(&url)
      .header(USER_AGENT, "pedibrief-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&req).send().await.map_err(|e| e.to_string())?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_openai_error(&body).unwrap_or(body);
      return Err(format!("OpenAI HTTP {}: {}", status, msg));
    }

    let body: ChatCompletionResponse = res.json().await.map_err(|e| e.to_string())?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = body.choices.first()
      .and_then(|c| c.message.content.clone())
      .unwrap_or_default();
    info!(response_len = text.len(), "OpenAI response received");

    serde_json::from_str::<T>(&text).map_err(|e| format!("JSON parse error: {}", e))
  }

  async fn summarize(&self, messages: Vec<ChatMessageReq>) -> Result<PediatricSummary, String> {
    let start = Instant::now();
    let result = self.chat_json::<PediatricSummary>(&self.strong_model, messages, 0.3).await;
    let elapsed = start.elapsed();
    match &result {
      Ok(s) => info!(?elapsed, questions = s.quiz_questions.len(), medications = s.medications.len(), "Summary generated"),
      Err(e) => error!(?elapsed, error = %e, "Model call failed during summarization"),
    }
    result
  }

  // --- High-level helpers (domain-specialized) ---

  #[instrument(level = "info", skip(self, prompts, text), fields(text_len = text.len(), model = %self.strong_model))]
  pub async fn summarize_text(&self, prompts: &Prompts, text: &str) -> Result<PediatricSummary, String> {
    let user = fill_template(&prompts.summarize_user_template, &[("text", text)]);
    self.summarize(vec![
      ChatMessageReq::text("system", &prompts.summarize_system),
      ChatMessageReq::text("user", &user),
    ]).await
  }

  #[instrument(level = "info", skip(self, prompts, doc), fields(mime = %doc.mime, doc_len = doc.bytes.len(), model = %self.strong_model))]
  pub async fn summarize_document(&self, prompts: &Prompts, doc: &Document) -> Result<PediatricSummary, String> {
    self.summarize(vec![
      ChatMessageReq::text("system", &prompts.summarize_system),
      ChatMessageReq::with_document("user", &prompts.summarize_document_instruction, doc),
    ]).await
  }

  #[instrument(level = "info", skip_all, fields(question_len = question.len(), answer_len = answer.len(), model = %self.fast_model))]
  pub async fn grade_answer(
    &self,
    prompts: &Prompts,
    question: &str,
    reference: &str,
    answer: &str,
    context: &str,
  ) -> Result<GradeOutcome, String> {
    let user = fill_template(
      &prompts.grade_user_template,
      &[("question", question), ("reference", reference), ("answer", answer), ("context", context)],
    );
    self.chat_json(&self.fast_model, vec![
      ChatMessageReq::text("system", &prompts.grade_system),
      ChatMessageReq::text("user", &user),
    ], 0.2).await
  }
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
  #[serde(skip_serializing_if = "Option::is_none")]
  max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessageReq { role: String, content: ChatContent }

impl ChatMessageReq {
  fn text(role: &str, content: &str) -> Self {
    Self { role: role.into(), content: ChatContent::Text(content.into()) }
  }

  /// A text instruction followed by the document, inlined as a data URL.
  /// Images go in `image_url` parts, PDFs in `file` parts.
  fn with_document(role: &str, instruction: &str, doc: &Document) -> Self {
    let data_url = format!("data:{};base64,{}", doc.mime, STANDARD.encode(&doc.bytes));
    let attachment = if doc.is_pdf() {
      ContentPart::File { file: FilePart { filename: doc.filename.clone(), file_data: data_url } }
    } else {
      ContentPart::ImageUrl { image_url: ImageUrl { url: data_url } }
    };
    Self {
      role: role.into(),
      content: ChatContent::Parts(vec![ContentPart::Text { text: instruction.into() }, attachment]),
    }
  }
}

#[derive(Serialize)]
#[serde(untagged)]
enum ChatContent {
  Text(String),
  Parts(Vec<ContentPart>),
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart {
  Text { text: String },
  ImageUrl { image_url: ImageUrl },
  File { file: FilePart },
}
#[derive(Serialize)]
struct ImageUrl { url: String }
#[derive(Serialize)]
struct FilePart { filename: String, file_data: String }

#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}

/// Try to extract a clean error message from OpenAI error body.
fn extract_openai_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  match serde_json::from_str::<EWrap>(body) {
    Ok(w) => Some(w.error.message),
    Err(_) => None,
  }
}
