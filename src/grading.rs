//! Local free-text grading used when the model grader is unreachable.
//!
//! Keyword overlap against the reference answer. This path never fails: on
//! degenerate input it reports "incorrect" with a generic message.

use serde::{Deserialize, Serialize};

const CORRECT_FEEDBACK: &str = "Great! You've correctly identified the key points.";
const GENERIC_FEEDBACK: &str = "We couldn't check this answer automatically. Please review the summary with your care team.";

/// Outcome of grading one free-text answer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeOutcome {
  pub is_correct: bool,
  pub feedback: String,
}

/// Thresholds for the keyword heuristic.
///
/// An answer passes when it contains at least
/// `max(min_required, min(max_required, tokens / divisor))` significant
/// reference tokens, where a token is significant if longer than `min_token_len`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackPolicy {
  pub min_token_len: usize,
  pub max_required: usize,
  pub divisor: usize,
  pub min_required: usize,
}

impl Default for FallbackPolicy {
  fn default() -> Self {
    Self { min_token_len: 3, max_required: 3, divisor: 3, min_required: 1 }
  }
}

impl FallbackPolicy {
  fn required(&self, tokens: usize) -> usize {
    let share = tokens / self.divisor.max(1);
    share.min(self.max_required).max(self.min_required)
  }
}

fn significant_tokens(reference: &str, min_len: usize) -> Vec<String> {
  reference
    .to_lowercase()
    .split(|c: char| c == ';' || c == ',' || c.is_whitespace())
    .filter(|t| t.chars().count() > min_len)
    .map(str::to_string)
    .collect()
}

/// First two `;`-separated segments of the reference, for corrective feedback.
fn key_points(reference: &str) -> String {
  reference
    .split(';')
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .take(2)
    .collect::<Vec<_>>()
    .join(", ")
}

pub fn grade_locally(reference: &str, answer: &str, policy: &FallbackPolicy) -> GradeOutcome {
  let tokens = significant_tokens(reference, policy.min_token_len);
  if tokens.is_empty() {
    return GradeOutcome { is_correct: false, feedback: GENERIC_FEEDBACK.into() };
  }

  let answer = answer.to_lowercase();
  let matched = tokens.iter().filter(|t| answer.contains(t.as_str())).count();
  let is_correct = matched >= policy.required(tokens.len());

  let feedback = if is_correct {
    CORRECT_FEEDBACK.to_string()
  } else {
    format!(
      "The key points to remember are: {}. Try to include these in your answer.",
      key_points(reference)
    )
  };
  GradeOutcome { is_correct, feedback }
}
