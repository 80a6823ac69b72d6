//! Gmail REST transport: refresh-token exchange, then `users/me/messages/send`
//! with a base64url-encoded RFC 2822 message.
//!
//! Single attempt per send. Success means Gmail accepted the message, not that it
//! was delivered.

use std::time::Duration;

use base64::{
  engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD},
  Engine as _,
};
use reqwest::header::USER_AGENT;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";

#[derive(Clone)]
pub struct Gmail {
  pub client: reqwest::Client,
  client_id: String,
  client_secret: String,
  refresh_token: String,
  pub user_email: String,
  pub token_url: String,
  pub api_base: String,
}

#[derive(Deserialize)]
struct TokenResponse {
  access_token: String,
}

#[derive(Deserialize)]
struct SendResponse {
  #[serde(default)]
  id: Option<String>,
}

impl Gmail {
  /// Construct the transport when all OAuth variables are present; otherwise None.
  pub fn from_env() -> Option<Self> {
    let var = |k: &str| std::env::var(k).ok().filter(|v| !v.trim().is_empty());
    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(20))
      .build()
      .ok()?;
    Some(Self {
      client,
      client_id: var("GMAIL_CLIENT_ID")?,
      client_secret: var("GMAIL_CLIENT_SECRET")?,
      refresh_token: var("GMAIL_REFRESH_TOKEN")?,
      user_email: var("GMAIL_USER_EMAIL")?,
      token_url: TOKEN_URL.into(),
      api_base: API_BASE.into(),
    })
  }

  #[instrument(level = "info", skip(self))]
  async fn access_token(&self) -> Result<String, String> {
    let res = self.client.post(&self.token_url)
      .header(USER_AGENT, "pedibrief-backend/0.1")
      .form(&[
        ("client_id", self.client_id.as_str()),
        ("client_secret", self.client_secret.as_str()),
        ("refresh_token", self.refresh_token.as_str()),
        ("grant_type", "refresh_token"),
      ])
      .send().await.map_err(|e| e.to_string())?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      return Err(format!("OAuth token refresh failed ({}): {}", status, extract_google_error(&body).unwrap_or(body)));
    }
    let token: TokenResponse = res.json().await.map_err(|e| e.to_string())?;
    Ok(token.access_token)
  }

  /// Send an HTML email. Returns Gmail's message id.
  #[instrument(level = "info", skip_all, fields(subject_len = subject.len(), body_len = html_body.len()))]
  pub async fn send_html(&self, to: &str, subject: &str, html_body: &str) -> Result<String, String> {
    let token = self.access_token().await?;
    let raw = build_raw_message(&self.user_email, to, subject, html_body);

    let url = format!("{}/users/me/messages/send", self.api_base);
    let res = self.client.post(&url)
      .header(USER_AGENT, "pedibrief-backend/0.1")
      .bearer_auth(token)
      .json(&json!({ "raw": raw }))
      .send().await.map_err(|e| e.to_string())?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      return Err(format!("Gmail HTTP {}: {}", status, extract_google_error(&body).unwrap_or(body)));
    }
    let sent: SendResponse = res.json().await.map_err(|e| e.to_string())?;
    let id = sent.id.unwrap_or_else(|| "unknown".into());
    info!(message_id = %id, "Gmail accepted message");
    Ok(id)
  }
}

/// Header values never carry line breaks.
fn header_value(s: &str) -> String {
  s.chars().filter(|c| *c != '\r' && *c != '\n').collect()
}

/// RFC 2047 encoded-word for non-ASCII header text.
fn encode_subject(subject: &str) -> String {
  let subject = header_value(subject);
  if subject.is_ascii() {
    subject
  } else {
    format!("=?UTF-8?B?{}?=", STANDARD.encode(subject.as_bytes()))
  }
}

/// RFC 2822 message, base64url without padding as the Gmail API expects.
pub fn build_raw_message(from: &str, to: &str, subject: &str, html_body: &str) -> String {
  let message = [
    format!("To: {}", header_value(to)),
    format!("From: {}", header_value(from)),
    format!("Subject: {}", encode_subject(subject)),
    "MIME-Version: 1.0".to_string(),
    "Content-Type: text/html; charset=utf-8".to_string(),
    String::new(),
    html_body.to_string(),
  ]
  .join("\r\n");
  URL_SAFE_NO_PAD.encode(message.as_bytes())
}

fn extract_google_error(body: &str) -> Option<String> {
  let v: serde_json::Value = serde_json::from_str(body).ok()?;
  // Token endpoint: {"error": "invalid_grant", "error_description": "..."}
  // REST API:       {"error": {"message": "..."}}
  v["error"]["message"]
    .as_str()
    .or_else(|| v["error_description"].as_str())
    .or_else(|| v["error"].as_str())
    .map(str::to_string)
}
