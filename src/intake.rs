//! Validation of what parents submit for summarization: pasted text or an
//! uploaded PDF/image carried as base64 in JSON.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::config::IntakeCfg;
use crate::error::ApiError;

const ACCEPTED_MIME: &[&str] = &["application/pdf", "image/png", "image/jpeg", "image/jpg", "image/webp"];
const ACCEPTED_EXT: &[(&str, &str)] = &[
  (".pdf", "application/pdf"),
  (".png", "image/png"),
  (".jpg", "image/jpeg"),
  (".jpeg", "image/jpeg"),
  (".webp", "image/webp"),
];

/// A decoded upload, ready to hand to the summarizer.
#[derive(Clone, Debug)]
pub struct Document {
  pub mime: String,
  pub filename: String,
  pub bytes: Vec<u8>,
}

impl Document {
  pub fn is_pdf(&self) -> bool {
    self.mime == "application/pdf"
  }
}

pub fn validate_text(text: &str, cfg: &IntakeCfg) -> Result<(), ApiError> {
  if text.trim().chars().count() < cfg.min_text_chars {
    return Err(ApiError::validation(format!(
      "Please paste a complete discharge summary (at least {} characters)",
      cfg.min_text_chars
    )));
  }
  Ok(())
}

/// Resolve the effective mime type from the declared type or, failing that, the extension.
fn resolve_mime(mime: &str, filename: &str) -> Option<String> {
  let mime = mime.trim().to_ascii_lowercase();
  if ACCEPTED_MIME.contains(&mime.as_str()) {
    // Some browsers report the non-standard "image/jpg".
    return Some(if mime == "image/jpg" { "image/jpeg".into() } else { mime });
  }
  let name = filename.to_ascii_lowercase();
  ACCEPTED_EXT
    .iter()
    .find(|(ext, _)| name.ends_with(ext))
    .map(|(_, m)| m.to_string())
}

pub fn decode_document(mime: &str, filename: &str, data_base64: &str, cfg: &IntakeCfg) -> Result<Document, ApiError> {
  let mime = resolve_mime(mime, filename)
    .ok_or_else(|| ApiError::validation("Please select a PDF or image file (PNG, JPG, JPEG, or WEBP)"))?;

  // Cheap pre-check on the encoded length before allocating.
  if data_base64.len() / 4 * 3 > cfg.max_document_bytes + 3 {
    return Err(too_large(cfg));
  }
  let bytes = STANDARD
    .decode(data_base64.trim())
    .map_err(|e| ApiError::validation(format!("Document is not valid base64: {e}")))?;
  if bytes.is_empty() {
    return Err(ApiError::validation("The uploaded document is empty"));
  }
  if bytes.len() > cfg.max_document_bytes {
    return Err(too_large(cfg));
  }

  Ok(Document { mime, filename: filename.to_string(), bytes })
}

fn too_large(cfg: &IntakeCfg) -> ApiError {
  ApiError::validation(format!("File size must be less than {} MB", cfg.max_document_bytes / (1024 * 1024)))
}
