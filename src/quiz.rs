//! Quiz reconciliation: compares a parent's selections with the answer key
//! embedded in the summary and derives per-question records and the aggregate score.
//!
//! A `QuizSession` is an explicit, caller-owned value. The server rebuilds one
//! per request from the payload the browser sends and drops it afterwards.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::domain::{FreeTextAnswer, PediatricSummary, QuizAnswer, QuizQuestion};

#[derive(Debug, Error, PartialEq)]
pub enum QuizError {
  #[error("unknown quiz question: {0}")]
  UnknownQuestion(String),

  #[error("question {question_id} has no option {index} ({options} options)")]
  OptionOutOfRange { question_id: String, index: usize, options: usize },

  #[error("question {0} is free-text and cannot take selected options")]
  NotMultipleChoice(String),

  #[error("question {0} is multiple-choice and cannot take a free-text answer")]
  NotFreeText(String),
}

/// How questions without an answer weigh on the aggregate score.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnansweredPolicy {
  /// Left out of numerator and denominator.
  #[default]
  Skip,
  /// Counted as an incorrect answer.
  CountAsZero,
}

/// Per-question comparison of the parent's answer against the key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationRecord {
  pub question: String,
  pub options: Vec<String>,
  pub correct_options: Vec<usize>,
  pub patient_selected: Vec<usize>,
  pub is_correct: bool,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub explanation: Option<String>,
}

/// Exact set equality: every correct index selected, nothing extra.
/// An empty key never matches.
pub fn is_exact_match(correct: &[usize], selected: &[usize]) -> bool {
  let correct: BTreeSet<usize> = correct.iter().copied().collect();
  let selected: BTreeSet<usize> = selected.iter().copied().collect();
  !correct.is_empty() && correct == selected
}

/// Partial credit: |selected ∩ correct| / max(|correct|, 1).
pub fn score_fraction(correct: &[usize], selected: &[usize]) -> f32 {
  let correct: BTreeSet<usize> = correct.iter().copied().collect();
  let selected: BTreeSet<usize> = selected.iter().copied().collect();
  let hits = correct.intersection(&selected).count();
  hits as f32 / correct.len().max(1) as f32
}

pub struct QuizSession {
  summary: PediatricSummary,
  choices: Vec<QuizAnswer>,
  free_text: Vec<FreeTextAnswer>,
}

impl QuizSession {
  pub fn new(summary: PediatricSummary) -> Self {
    Self { summary, choices: Vec::new(), free_text: Vec::new() }
  }

  /// Rebuild a session from answers submitted in one go.
  pub fn replay(
    summary: PediatricSummary,
    choices: &[QuizAnswer],
    free_text: &[FreeTextAnswer],
  ) -> Result<Self, QuizError> {
    let mut session = Self::new(summary);
    for a in choices {
      session.submit_choice(&a.question_id, &a.selected_option_indexes)?;
    }
    for a in free_text {
      session.record_free_text(a.clone())?;
    }
    Ok(session)
  }

  pub fn summary(&self) -> &PediatricSummary {
    &self.summary
  }

  fn question(&self, id: &str) -> Result<&QuizQuestion, QuizError> {
    self.summary.question(id).ok_or_else(|| QuizError::UnknownQuestion(id.to_string()))
  }

  /// Record the selection for a multiple-choice question. A later submission
  /// for the same question replaces the earlier one.
  pub fn submit_choice(&mut self, question_id: &str, selected: &[usize]) -> Result<QuizAnswer, QuizError> {
    let q = self.question(question_id)?;
    if !q.is_multiple_choice() {
      return Err(QuizError::NotMultipleChoice(question_id.to_string()));
    }
    if let Some(&index) = selected.iter().find(|&&i| i >= q.options.len()) {
      return Err(QuizError::OptionOutOfRange {
        question_id: question_id.to_string(),
        index,
        options: q.options.len(),
      });
    }

    let mut selected = selected.to_vec();
    selected.sort_unstable();
    selected.dedup();
    let answer = QuizAnswer {
      question_id: question_id.to_string(),
      score_fraction: score_fraction(&q.correct_option_indexes, &selected),
      selected_option_indexes: selected,
    };

    self.choices.retain(|a| a.question_id != question_id);
    self.choices.push(answer.clone());
    Ok(answer)
  }

  /// Record an already graded free-text answer.
  pub fn record_free_text(&mut self, answer: FreeTextAnswer) -> Result<(), QuizError> {
    let q = self.question(&answer.question_id)?;
    if q.is_multiple_choice() {
      return Err(QuizError::NotFreeText(answer.question_id));
    }
    self.free_text.retain(|a| a.question_id != answer.question_id);
    self.free_text.push(answer);
    Ok(())
  }

  fn choice_for(&self, id: &str) -> Option<&QuizAnswer> {
    self.choices.iter().find(|a| a.question_id == id)
  }

  fn free_text_for(&self, id: &str) -> Option<&FreeTextAnswer> {
    self.free_text.iter().find(|a| a.question_id == id)
  }

  /// Multiple-choice answers in quiz order, with derived score fractions.
  pub fn answers(&self) -> Vec<QuizAnswer> {
    self
      .summary
      .quiz_questions
      .iter()
      .filter_map(|q| self.choice_for(&q.id).cloned())
      .collect()
  }

  pub fn answered(&self) -> usize {
    self.choices.len() + self.free_text.len()
  }

  /// Records for answered multiple-choice questions, in quiz order.
  pub fn reconcile(&self) -> Vec<ReconciliationRecord> {
    self
      .summary
      .quiz_questions
      .iter()
      .filter_map(|q| {
        let answer = self.choice_for(&q.id)?;
        Some(ReconciliationRecord {
          question: q.question.clone(),
          options: q.options.clone(),
          correct_options: q.correct_option_indexes.clone(),
          patient_selected: answer.selected_option_indexes.clone(),
          is_correct: is_exact_match(&q.correct_option_indexes, &answer.selected_option_indexes),
          explanation: q.explanation.clone(),
        })
      })
      .collect()
  }

  /// Graded free-text answers, in quiz order, paired with their question text.
  pub fn free_text_results(&self) -> Vec<(String, FreeTextAnswer)> {
    self
      .summary
      .quiz_questions
      .iter()
      .filter_map(|q| self.free_text_for(&q.id).map(|a| (q.question.clone(), a.clone())))
      .collect()
  }

  /// Aggregate score in [0, 100]: mean of per-question correctness, rounded.
  #[instrument(level = "debug", skip(self), fields(questions = self.summary.quiz_questions.len()))]
  pub fn score(&self, policy: UnansweredPolicy) -> u8 {
    let mut answered = 0usize;
    let mut counted = 0usize;
    let mut correct = 0usize;

    for q in &self.summary.quiz_questions {
      let outcome = if let Some(a) = self.choice_for(&q.id) {
        Some(is_exact_match(&q.correct_option_indexes, &a.selected_option_indexes))
      } else {
        self.free_text_for(&q.id).map(|a| a.is_correct)
      };
      match outcome {
        Some(ok) => {
          answered += 1;
          counted += 1;
          if ok { correct += 1; }
        }
        None if policy == UnansweredPolicy::CountAsZero => counted += 1,
        None => {}
      }
    }

    let score = if counted == 0 { 0 } else { ((correct as f64 / counted as f64) * 100.0).round() as u8 };
    debug!(target: "quiz", answered, counted, correct, score, ?policy, "Quiz scored");
    score
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn mc(id: &str, options: usize, correct: Vec<usize>) -> QuizQuestion {
    QuizQuestion {
      id: id.into(),
      question: format!("Question {id}?"),
      options: (0..options).map(|i| format!("Option {i}")).collect(),
      correct_option_indexes: correct,
      explanation: Some(format!("Because {id}")),
      correct_answer: None,
    }
  }

  fn free(id: &str, reference: &str) -> QuizQuestion {
    QuizQuestion {
      id: id.into(),
      question: format!("Describe {id}"),
      options: vec![],
      correct_option_indexes: vec![],
      explanation: None,
      correct_answer: Some(reference.into()),
    }
  }

  fn summary(questions: Vec<QuizQuestion>) -> PediatricSummary {
    PediatricSummary { quiz_questions: questions, ..Default::default() }
  }

  #[test]
  fn exact_match_requires_set_equality() {
    assert!(is_exact_match(&[0, 2], &[0, 2]));
    assert!(is_exact_match(&[0, 2], &[2, 0]));
    assert!(!is_exact_match(&[0, 2], &[0]));
    assert!(!is_exact_match(&[0, 2], &[0, 1, 2]));
    assert!(!is_exact_match(&[], &[]));
  }

  #[test]
  fn partial_credit_fraction() {
    assert_eq!(score_fraction(&[0, 2], &[0]), 0.5);
    assert_eq!(score_fraction(&[0, 2], &[0, 1, 2]), 1.0);
    assert_eq!(score_fraction(&[], &[1]), 0.0);
  }

  #[test]
  fn single_question_scores_full_or_nothing() {
    let s = summary(vec![mc("q1", 4, vec![1])]);
    let mut session = QuizSession::new(s.clone());
    session.submit_choice("q1", &[1]).unwrap();
    assert_eq!(session.score(UnansweredPolicy::Skip), 100);

    let mut session = QuizSession::new(s);
    session.submit_choice("q1", &[]).unwrap();
    assert_eq!(session.score(UnansweredPolicy::Skip), 0);
  }

  #[test]
  fn records_follow_quiz_order_and_skip_unanswered() {
    let s = summary(vec![mc("q1", 3, vec![0, 2]), mc("q2", 2, vec![1]), mc("q3", 2, vec![0])]);
    let mut session = QuizSession::new(s);
    session.submit_choice("q3", &[0]).unwrap();
    session.submit_choice("q1", &[0]).unwrap();

    let records = session.reconcile();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].question, "Question q1?");
    assert!(!records[0].is_correct);
    assert_eq!(records[1].question, "Question q3?");
    assert!(records[1].is_correct);
    assert_eq!(records[1].explanation.as_deref(), Some("Because q3"));
  }

  #[test]
  fn reconcile_is_idempotent() {
    let s = summary(vec![mc("q1", 3, vec![0, 2]), mc("q2", 2, vec![1])]);
    let answers = vec![
      QuizAnswer { question_id: "q2".into(), selected_option_indexes: vec![1], score_fraction: 0.0 },
      QuizAnswer { question_id: "q1".into(), selected_option_indexes: vec![2, 0], score_fraction: 0.0 },
    ];
    let a = QuizSession::replay(s.clone(), &answers, &[]).unwrap();
    let b = QuizSession::replay(s, &answers, &[]).unwrap();
    assert_eq!(a.reconcile(), b.reconcile());
    assert_eq!(a.reconcile(), a.reconcile());
    assert_eq!(a.score(UnansweredPolicy::Skip), 100);
    let ordered = a.answers();
    assert_eq!(ordered[0].question_id, "q1");
    assert_eq!(ordered[0].selected_option_indexes, vec![0, 2]);
    assert_eq!(ordered[0].score_fraction, 1.0);
    assert_eq!(a.answered(), 2);
  }

  #[test]
  fn unanswered_policy_changes_denominator() {
    let s = summary(vec![mc("q1", 2, vec![0]), mc("q2", 2, vec![1])]);
    let mut session = QuizSession::new(s);
    session.submit_choice("q1", &[0]).unwrap();
    assert_eq!(session.score(UnansweredPolicy::Skip), 100);
    assert_eq!(session.score(UnansweredPolicy::CountAsZero), 50);
  }

  #[test]
  fn no_answers_scores_zero() {
    let session = QuizSession::new(summary(vec![mc("q1", 2, vec![0])]));
    assert_eq!(session.score(UnansweredPolicy::Skip), 0);
    assert!(session.reconcile().is_empty());
  }

  #[test]
  fn resubmission_replaces_previous_answer() {
    let mut session = QuizSession::new(summary(vec![mc("q1", 3, vec![2])]));
    session.submit_choice("q1", &[0]).unwrap();
    let a = session.submit_choice("q1", &[2, 2]).unwrap();
    assert_eq!(a.selected_option_indexes, vec![2]);
    assert_eq!(a.score_fraction, 1.0);
    assert_eq!(session.reconcile().len(), 1);
    assert_eq!(session.score(UnansweredPolicy::Skip), 100);
  }

  #[test]
  fn rejects_bad_submissions() {
    let mut session = QuizSession::new(summary(vec![mc("q1", 2, vec![0]), free("f1", "fever; fluids")]));
    assert_eq!(session.submit_choice("nope", &[0]), Err(QuizError::UnknownQuestion("nope".into())));
    assert!(matches!(session.submit_choice("q1", &[5]), Err(QuizError::OptionOutOfRange { index: 5, .. })));
    assert_eq!(session.submit_choice("f1", &[0]), Err(QuizError::NotMultipleChoice("f1".into())));
    let ft = FreeTextAnswer { question_id: "q1".into(), answer: "x".into(), is_correct: true, feedback: String::new() };
    assert_eq!(session.record_free_text(ft), Err(QuizError::NotFreeText("q1".into())));
  }

  #[test]
  fn free_text_outcomes_count_toward_score() {
    let s = summary(vec![mc("q1", 2, vec![0]), free("f1", "fever; fluids"), free("f2", "rash")]);
    let mut session = QuizSession::new(s);
    session.submit_choice("q1", &[1]).unwrap();
    session
      .record_free_text(FreeTextAnswer { question_id: "f1".into(), answer: "fever".into(), is_correct: true, feedback: "ok".into() })
      .unwrap();
    assert_eq!(session.score(UnansweredPolicy::Skip), 50);
    assert_eq!(session.score(UnansweredPolicy::CountAsZero), 33);

    let results = session.free_text_results();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0, "Describe f1");
    // Free-text answers never show up as option records.
    assert_eq!(session.reconcile().len(), 1);
  }
}
