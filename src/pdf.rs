//! Print-ready PDF of the care summary, built with `printpdf`.
//!
//! Section order: branding, score badge, explanation, red flags, do's, don'ts,
//! medications, follow-up, expected course, then a dated footer on the last page.

use std::io::BufWriter;

use chrono::{DateTime, Utc};
use printpdf::*;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::domain::PediatricSummary;

pub const PDF_FILENAME: &str = "pedibrief-summary.pdf";

const PAGE_W: f32 = 210.0;
const PAGE_H: f32 = 297.0;
const MARGIN: f32 = 20.0;
const TOP: f32 = 277.0;
const BOTTOM: f32 = 22.0;
const WRAP_CHARS: usize = 90;

const TEAL: (u8, u8, u8) = (45, 127, 120);
const GREY: (u8, u8, u8) = (100, 100, 100);
const INK: (u8, u8, u8) = (50, 50, 50);
const RED: (u8, u8, u8) = (220, 53, 69);
const GREEN: (u8, u8, u8) = (34, 197, 94);
const AMBER: (u8, u8, u8) = (245, 158, 11);
const FAINT: (u8, u8, u8) = (150, 150, 150);

#[derive(Debug, Error)]
pub enum ExportError {
  #[error("PDF font error: {0}")]
  Font(String),

  #[error("PDF save error: {0}")]
  Save(String),
}

fn rgb((r, g, b): (u8, u8, u8)) -> Color {
  Color::Rgb(Rgb::new(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0, None))
}

/// Greedy word wrap on character count.
fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
  let mut lines = Vec::new();
  let mut current = String::new();
  for word in text.split_whitespace() {
    let needed = if current.is_empty() { word.chars().count() } else { current.chars().count() + 1 + word.chars().count() };
    if needed > max_chars && !current.is_empty() {
      lines.push(std::mem::take(&mut current));
    }
    if !current.is_empty() {
      current.push(' ');
    }
    current.push_str(word);
  }
  if !current.is_empty() {
    lines.push(current);
  }
  lines
}

/// Cursor over the document; adds pages as text runs past the bottom margin.
struct Layout {
  doc: PdfDocumentReference,
  layer: PdfLayerReference,
  regular: IndirectFontRef,
  bold: IndirectFontRef,
  y: f32,
  pages: usize,
}

impl Layout {
  fn new(title: &str) -> Result<Self, ExportError> {
    let (doc, page1, layer1) = PdfDocument::new(title, Mm(PAGE_W), Mm(PAGE_H), "Layer 1");
    let layer = doc.get_page(page1).get_layer(layer1);
    let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(|e| ExportError::Font(e.to_string()))?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(|e| ExportError::Font(e.to_string()))?;
    Ok(Self { doc, layer, regular, bold, y: TOP, pages: 1 })
  }

  fn ensure_space(&mut self, mm: f32) {
    if self.y - mm < BOTTOM {
      let (page, layer) = self.doc.add_page(Mm(PAGE_W), Mm(PAGE_H), format!("Layer {}", self.pages + 1));
      self.layer = self.doc.get_page(page).get_layer(layer);
      self.pages += 1;
      self.y = TOP;
    }
  }

  fn line(&mut self, text: &str, size: f32, indent: f32, bold: bool, color: (u8, u8, u8)) {
    let step = size * 0.45;
    self.ensure_space(step);
    self.layer.set_fill_color(rgb(color));
    let font = if bold { &self.bold } else { &self.regular };
    self.layer.use_text(text, size, Mm(MARGIN + indent), Mm(self.y), font);
    self.y -= step;
  }

  fn paragraph(&mut self, text: &str, size: f32, indent: f32, bold: bool) {
    let width = WRAP_CHARS - (indent / 2.0) as usize;
    for l in wrap_text(text, width) {
      self.line(&l, size, indent, bold, INK);
    }
  }

  fn heading(&mut self, text: &str, color: (u8, u8, u8)) {
    self.ensure_space(14.0);
    self.line(text, 14.0, 0.0, true, color);
    self.y -= 2.0;
  }

  fn bullets(&mut self, items: &[String]) {
    for item in items {
      self.paragraph(&format!("- {}", item), 11.0, 5.0, false);
      self.y -= 1.5;
    }
    self.y -= 6.0;
  }

  fn finish(self) -> Result<(Vec<u8>, usize), ExportError> {
    let mut buf = BufWriter::new(Vec::new());
    self.doc.save(&mut buf).map_err(|e| ExportError::Save(e.to_string()))?;
    let bytes = buf.into_inner().map_err(|e| ExportError::Save(e.to_string()))?;
    Ok((bytes, self.pages))
  }
}

fn render(summary: &PediatricSummary, score: u8, generated_at: DateTime<Utc>) -> Result<(Vec<u8>, usize), ExportError> {
  let mut l = Layout::new("PediBrief - Your Child's Care Summary")?;

  l.line("PediBrief", 24.0, 0.0, true, TEAL);
  l.y -= 2.0;
  l.line("Your Child's Care Summary", 14.0, 0.0, false, GREY);
  l.y -= 6.0;

  let badge = if score >= 70 { GREEN } else { AMBER };
  l.line(&format!("Quiz Score: {}/100", score), 13.0, 0.0, true, badge);
  l.y -= 8.0;

  l.heading("What Happened", INK);
  l.paragraph(&summary.simple_explanation, 11.0, 0.0, false);
  l.y -= 8.0;

  l.heading("Return to ER Immediately If:", RED);
  l.bullets(&summary.red_flags);

  l.heading("What To Do", GREEN);
  l.bullets(&summary.what_to_do);

  l.heading("What To Avoid", INK);
  l.bullets(&summary.what_not_to_do);

  if !summary.medications.is_empty() {
    l.heading("Medications", TEAL);
    for med in &summary.medications {
      l.paragraph(&format!("{} - {}", med.name, med.dose), 11.0, 5.0, true);
      l.paragraph(&format!("Timing: {}", med.timing), 11.0, 5.0, false);
      if let Some(notes) = med.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        l.paragraph(&format!("Note: {}", notes), 10.0, 5.0, false);
      }
      l.y -= 4.0;
    }
    l.y -= 4.0;
  }

  l.heading("Follow-Up Tasks", INK);
  l.bullets(&summary.follow_up);

  l.heading("What to Expect", INK);
  l.paragraph(&summary.expected_course, 11.0, 0.0, false);

  let footer = format!(
    "Generated by PediBrief on {} - For reference only, always consult your healthcare provider",
    generated_at.format("%Y-%m-%d %H:%M UTC")
  );
  l.layer.set_fill_color(rgb(FAINT));
  l.layer.use_text(footer, 9.0, Mm(MARGIN), Mm(10.0), &l.regular);

  l.finish()
}

/// Render the summary and score into PDF bytes.
#[instrument(level = "info", skip(summary))]
pub fn generate_summary_pdf(summary: &PediatricSummary, score: u8, generated_at: DateTime<Utc>) -> Result<Vec<u8>, ExportError> {
  let (bytes, pages) = render(summary, score, generated_at)?;
  debug!(target: "pedibrief_backend", pages, bytes = bytes.len(), "PDF rendered");
  Ok(bytes)
}
