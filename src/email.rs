//! Doctor notification: validates the request, assembles the de-identified
//! payload from a quiz session and renders it as an HTML email.

use serde::Serialize;
use tera::{Context, Tera};

use crate::domain::{FreeTextAnswer, PediatricSummary};
use crate::error::ApiError;
use crate::quiz::{QuizSession, ReconciliationRecord, UnansweredPolicy};
use crate::util::looks_like_email;

/// Everything the doctor receives. Contains no patient identity beyond `patient_id`.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailPayload {
  pub doctor_email: String,
  pub quiz_score: u8,
  pub quiz_data: Vec<ReconciliationRecord>,
  pub free_text: Vec<FreeTextRow>,
  pub summary: PediatricSummary,
  pub patient_id: String,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeTextRow {
  pub question: String,
  pub answer: String,
  pub is_correct: bool,
  pub feedback: String,
}

impl From<(String, FreeTextAnswer)> for FreeTextRow {
  fn from((question, a): (String, FreeTextAnswer)) -> Self {
    Self { question, answer: a.answer, is_correct: a.is_correct, feedback: a.feedback }
  }
}

pub struct RenderedEmail {
  pub subject: String,
  pub html: String,
}

pub fn validate_request(doctor_email: &str, consent: bool) -> Result<(), ApiError> {
  if !looks_like_email(doctor_email) {
    return Err(ApiError::validation("Please enter a valid doctor email address"));
  }
  if !consent {
    return Err(ApiError::validation(
      "Please confirm that you consent to share quiz results with your doctor",
    ));
  }
  Ok(())
}

/// Build the payload. Unanswered questions are left out of `quiz_data`.
pub fn build_payload(
  doctor_email: &str,
  session: &QuizSession,
  policy: UnansweredPolicy,
  patient_id: String,
) -> EmailPayload {
  EmailPayload {
    doctor_email: doctor_email.trim().to_string(),
    quiz_score: session.score(policy),
    quiz_data: session.reconcile(),
    free_text: session.free_text_results().into_iter().map(FreeTextRow::from).collect(),
    summary: session.summary().clone(),
    patient_id,
  }
}

const EMAIL_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<body style="font-family: Helvetica, Arial, sans-serif; color: #323232; max-width: 640px;">
  <h1 style="color: #2d7f78;">PediBrief quiz results</h1>
  <p>A parent completed the PediBrief comprehension quiz for their child's discharge instructions and chose to share the results with you.</p>
  <p><strong>De-identified patient ID:</strong> {{ patientId }}<br>
     <strong>Quiz score:</strong> {{ quizScore }}/100</p>

  {% if quizData | length > 0 %}
  <h2>Multiple-choice answers</h2>
  {% for q in quizData %}
  <div style="margin-bottom: 16px;">
    <p><strong>{{ loop.index }}. {{ q.question }}</strong> {% if q.isCorrect %}<span style="color: #22c55e;">&#10003; correct</span>{% else %}<span style="color: #dc3545;">&#10007; incorrect</span>{% endif %}</p>
    <ul>
    {% for opt in q.options %}
      <li>{{ opt }}{% if loop.index0 in q.correctOptions %} <em>(correct)</em>{% endif %}{% if loop.index0 in q.patientSelected %} <strong>[selected]</strong>{% endif %}</li>
    {% endfor %}
    </ul>
    {% if q.explanation %}<p style="color: #646464;">{{ q.explanation }}</p>{% endif %}
  </div>
  {% endfor %}
  {% endif %}

  {% if freeText | length > 0 %}
  <h2>Written answers</h2>
  {% for f in freeText %}
  <div style="margin-bottom: 16px;">
    <p><strong>{{ f.question }}</strong> {% if f.isCorrect %}<span style="color: #22c55e;">&#10003;</span>{% else %}<span style="color: #dc3545;">&#10007;</span>{% endif %}</p>
    <p>&ldquo;{{ f.answer }}&rdquo;</p>
    <p style="color: #646464;">{{ f.feedback }}</p>
  </div>
  {% endfor %}
  {% endif %}

  <h2>Summary given to the family</h2>
  <p>{{ summary.simpleExplanation }}</p>
  <h3 style="color: #dc3545;">Return to ER immediately if</h3>
  <ul>{% for f in summary.redFlags %}<li>{{ f }}</li>{% endfor %}</ul>
  <h3>What to do</h3>
  <ul>{% for f in summary.whatToDo %}<li>{{ f }}</li>{% endfor %}</ul>
  <h3>What to avoid</h3>
  <ul>{% for f in summary.whatNotToDo %}<li>{{ f }}</li>{% endfor %}</ul>
  {% if summary.medications | length > 0 %}
  <h3>Medications</h3>
  <ul>{% for m in summary.medications %}<li><strong>{{ m.name }}</strong> - {{ m.dose }}, {{ m.timing }}{% if m.notes %} ({{ m.notes }}){% endif %}</li>{% endfor %}</ul>
  {% endif %}
  <h3>Follow-up</h3>
  <ul>{% for f in summary.followUp %}<li>{{ f }}</li>{% endfor %}</ul>
  <h3>Expected course</h3>
  <p>{{ summary.expectedCourse }}</p>

  <p style="font-size: 12px; color: #969696;">Sent by PediBrief. No protected health information is included and nothing from this session is stored.</p>
</body>
</html>
"#;

pub fn render(payload: &EmailPayload) -> Result<RenderedEmail, tera::Error> {
  let context = Context::from_serialize(payload)?;
  // Autoescape: every value here is model or parent text.
  let html = Tera::one_off(EMAIL_TEMPLATE, &context, true)?;
  Ok(RenderedEmail {
    subject: format!("PediBrief quiz results - {}", payload.patient_id),
    html,
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{Medication, QuizQuestion};

  fn session() -> QuizSession {
    let q = |id: &str, correct: Vec<usize>| QuizQuestion {
      id: id.into(),
      question: format!("Question {id}?"),
      options: vec!["Fever <39".into(), "Bloody stools".into(), "Sleepy".into()],
      correct_option_indexes: correct,
      explanation: Some("Blood means <b>come back</b>.".into()),
      correct_answer: None,
    };
    let summary = PediatricSummary {
      simple_explanation: "Stomach bug.".into(),
      red_flags: vec!["Bloody stools".into()],
      medications: vec![Medication { name: "Paracetamol".into(), dose: "15 mg/kg".into(), timing: "q6h".into(), notes: None }],
      quiz_questions: vec![q("q1", vec![1, 2]), q("q2", vec![0]), q("q3", vec![2])],
      ..Default::default()
    };
    let mut s = QuizSession::new(summary);
    s.submit_choice("q1", &[1, 2]).unwrap();
    s.submit_choice("q3", &[0]).unwrap();
    s
  }

  #[test]
  fn validates_email_and_consent() {
    assert!(validate_request("dr@clinic.org", true).is_ok());
    let e = validate_request("doctor", true).unwrap_err();
    assert!(e.to_string().contains("valid doctor email"));
    let e = validate_request("dr@clinic.org", false).unwrap_err();
    assert!(e.to_string().contains("consent"));
  }

  #[test]
  fn payload_omits_unanswered_questions() {
    let p = build_payload("dr@clinic.org", &session(), UnansweredPolicy::Skip, "PEDI-2025-01-01-ABCDEFGH".into());
    assert_eq!(p.quiz_data.len(), 2);
    assert_eq!(p.quiz_data[0].question, "Question q1?");
    assert!(p.quiz_data[0].is_correct);
    assert_eq!(p.quiz_data[1].question, "Question q3?");
    assert!(!p.quiz_data[1].is_correct);
    assert_eq!(p.quiz_score, 50);
  }

  #[test]
  fn payload_serializes_with_wire_names() {
    let p = build_payload("dr@clinic.org", &session(), UnansweredPolicy::Skip, "PEDI-2025-01-01-ABCDEFGH".into());
    let v = serde_json::to_value(&p).unwrap();
    assert_eq!(v["doctorEmail"], "dr@clinic.org");
    assert_eq!(v["quizScore"], 50);
    assert_eq!(v["patientId"], "PEDI-2025-01-01-ABCDEFGH");
    assert_eq!(v["quizData"][0]["correctOptions"], serde_json::json!([1, 2]));
    assert_eq!(v["quizData"][0]["patientSelected"], serde_json::json!([1, 2]));
  }

  #[test]
  fn renders_escaped_html() {
    let p = build_payload("dr@clinic.org", &session(), UnansweredPolicy::Skip, "PEDI-2025-01-01-ABCDEFGH".into());
    let email = render(&p).expect("render");
    assert_eq!(email.subject, "PediBrief quiz results - PEDI-2025-01-01-ABCDEFGH");
    assert!(email.html.contains("PEDI-2025-01-01-ABCDEFGH"));
    assert!(email.html.contains("50/100"));
    assert!(email.html.contains("Fever &lt;39"));
    assert!(!email.html.contains("<b>come back</b>"));
    assert!(email.html.contains("Paracetamol"));
    assert!(!email.html.contains("Question q2?"));
  }
}
