//! Domain models shared by every view: the pediatric summary produced by the
//! summarizer, its embedded quiz, and the answers a parent gives during a session.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// One medication line from the discharge plan.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
  pub name: String,
  pub dose: String,
  pub timing: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub notes: Option<String>,
}

/// A comprehension question. Multiple-choice questions carry `options` and
/// `correct_option_indexes`; free-text questions carry `correct_answer` instead.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
  pub id: String,
  pub question: String,
  #[serde(default)]
  pub options: Vec<String>,
  #[serde(default)]
  pub correct_option_indexes: Vec<usize>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub explanation: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub correct_answer: Option<String>,
}

impl QuizQuestion {
  pub fn is_multiple_choice(&self) -> bool {
    !self.options.is_empty()
  }

  /// Why this question violates the quiz invariants, if it does.
  pub fn defect(&self) -> Option<String> {
    if self.id.trim().is_empty() {
      return Some("empty id".into());
    }
    if self.is_multiple_choice() {
      if self.correct_option_indexes.is_empty() {
        return Some("no correct option".into());
      }
      if let Some(bad) = self.correct_option_indexes.iter().find(|&&i| i >= self.options.len()) {
        return Some(format!("correct index {} out of range ({} options)", bad, self.options.len()));
      }
      None
    } else {
      match &self.correct_answer {
        Some(a) if !a.trim().is_empty() => None,
        _ => Some("neither options nor a reference answer".into()),
      }
    }
  }
}

/// The parent-friendly summary. Treated as immutable once received.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PediatricSummary {
  #[serde(default)] pub simple_explanation: String,
  #[serde(default)] pub red_flags: Vec<String>,
  #[serde(default)] pub what_to_do: Vec<String>,
  #[serde(default)] pub what_not_to_do: Vec<String>,
  #[serde(default)] pub medications: Vec<Medication>,
  #[serde(default)] pub expected_course: String,
  #[serde(default)] pub follow_up: Vec<String>,
  #[serde(default)] pub quiz_questions: Vec<QuizQuestion>,
}

impl PediatricSummary {
  pub fn question(&self, id: &str) -> Option<&QuizQuestion> {
    self.quiz_questions.iter().find(|q| q.id == id)
  }

  /// Drop quiz questions that break the invariants (bad indexes, duplicate ids,
  /// nothing to grade against). Returns how many were dropped.
  pub fn sanitize_quiz(&mut self) -> usize {
    let before = self.quiz_questions.len();
    let mut seen = HashSet::new();
    self.quiz_questions.retain(|q| {
      if let Some(reason) = q.defect() {
        warn!(target: "quiz", id = %q.id, %reason, "Dropping malformed quiz question");
        return false;
      }
      if !seen.insert(q.id.clone()) {
        warn!(target: "quiz", id = %q.id, "Dropping duplicate quiz question id");
        return false;
      }
      true
    });
    before - self.quiz_questions.len()
  }

  /// First quiz invariant violation, if any.
  pub fn quiz_defect(&self) -> Option<String> {
    let mut seen = HashSet::new();
    for q in &self.quiz_questions {
      if let Some(reason) = q.defect() {
        return Some(format!("question {}: {}", q.id, reason));
      }
      if !seen.insert(q.id.as_str()) {
        return Some(format!("question {}: duplicate id", q.id));
      }
    }
    None
  }

  /// Condensed context handed to the grader alongside a free-text answer.
  pub fn grading_context(&self) -> String {
    let meds = self
      .medications
      .iter()
      .map(|m| format!("{} - {}, {}", m.name, m.dose, m.timing))
      .collect::<Vec<_>>()
      .join("; ");
    format!(
      "Summary: {}\nWhat To Do: {}\nRed Flags: {}\nMedications: {}",
      self.simple_explanation,
      self.what_to_do.join("; "),
      self.red_flags.join("; "),
      meds
    )
  }
}

/// A parent's answer to a multiple-choice question.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAnswer {
  pub question_id: String,
  pub selected_option_indexes: Vec<usize>,
  #[serde(default)]
  pub score_fraction: f32,
}

/// A graded answer to a free-text question.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeTextAnswer {
  pub question_id: String,
  pub answer: String,
  pub is_correct: bool,
  #[serde(default)]
  pub feedback: String,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn mc(id: &str, options: usize, correct: Vec<usize>) -> QuizQuestion {
    QuizQuestion {
      id: id.into(),
      question: format!("question {id}"),
      options: (0..options).map(|i| format!("option {i}")).collect(),
      correct_option_indexes: correct,
      explanation: None,
      correct_answer: None,
    }
  }

  #[test]
  fn deserializes_camel_case_summary() {
    let json = r#"{
      "simpleExplanation": "Your child had a stomach bug.",
      "redFlags": ["Bloody stools"],
      "whatToDo": ["Offer fluids"],
      "whatNotToDo": ["No juice"],
      "medications": [{"name": "Paracetamol", "dose": "15 mg/kg", "timing": "every 6 hours"}],
      "expectedCourse": "Loose stools for 2-3 days.",
      "followUp": ["See GP in 2-3 days"],
      "quizQuestions": [{"id": "q1", "question": "When to return?", "options": ["a", "b"], "correctOptionIndexes": [1]}]
    }"#;
    let s: PediatricSummary = serde_json::from_str(json).expect("summary");
    assert_eq!(s.medications[0].notes, None);
    assert_eq!(s.quiz_questions[0].correct_option_indexes, vec![1]);
    assert!(s.question("q1").is_some_and(|q| q.is_multiple_choice()));
  }

  #[test]
  fn sanitize_drops_out_of_range_and_duplicates() {
    let mut s = PediatricSummary {
      quiz_questions: vec![mc("q1", 3, vec![0, 2]), mc("q2", 2, vec![2]), mc("q1", 2, vec![0]), mc("q3", 2, vec![])],
      ..Default::default()
    };
    assert!(s.quiz_defect().is_some_and(|d| d.contains("q2")));
    assert_eq!(s.sanitize_quiz(), 3);
    assert_eq!(s.quiz_defect(), None);
    assert_eq!(s.quiz_questions.len(), 1);
    assert_eq!(s.quiz_questions[0].id, "q1");
    assert_eq!(s.quiz_questions[0].options.len(), 3);
  }

  #[test]
  fn free_text_question_needs_reference() {
    let mut q = mc("ft", 0, vec![]);
    assert!(q.defect().is_some());
    q.correct_answer = Some("fever; dehydration".into());
    assert!(q.defect().is_none());
    assert!(!q.is_multiple_choice());
  }

  #[test]
  fn grading_context_lists_medications() {
    let s = PediatricSummary {
      simple_explanation: "Gastroenteritis".into(),
      medications: vec![Medication { name: "ORS".into(), dose: "50 ml".into(), timing: "after each stool".into(), notes: None }],
      ..Default::default()
    };
    let ctx = s.grading_context();
    assert!(ctx.starts_with("Summary: Gastroenteritis"));
    assert!(ctx.contains("ORS - 50 ml, after each stool"));
  }
}
