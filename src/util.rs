//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Log-safe truncation for large strings, cut on a char boundary.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut end = max;
  while !s.is_char_boundary(end) {
    end -= 1;
  }
  format!("{}… ({} bytes total)", &s[..end], s.len())
}

/// Loose address check: something before the `@`, a dotted domain after it.
pub fn looks_like_email(s: &str) -> bool {
  let s = s.trim();
  match s.split_once('@') {
    Some((local, domain)) => {
      !local.is_empty()
        && !domain.contains('@')
        && !s.chars().any(char::is_whitespace)
        && domain.split('.').count() >= 2
        && domain.split('.').all(|p| !p.is_empty())
    }
    None => false,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fills_placeholders() {
    let out = fill_template("Q: {question}\nA: {answer}", &[("question", "why?"), ("answer", "because")]);
    assert_eq!(out, "Q: why?\nA: because");
  }

  #[test]
  fn truncation_respects_char_boundaries() {
    assert_eq!(trunc_for_log("short", 10), "short");
    let t = trunc_for_log("ééééé", 3);
    assert!(t.starts_with('é'));
    assert!(t.ends_with("(10 bytes total)"));
  }

  #[test]
  fn email_shapes() {
    assert!(looks_like_email("dr.smith@clinic.org"));
    assert!(looks_like_email("  a@b.co "));
    assert!(!looks_like_email("doctor"));
    assert!(!looks_like_email("@clinic.org"));
    assert!(!looks_like_email("dr@clinic"));
    assert!(!looks_like_email("dr@@clinic.org"));
    assert!(!looks_like_email("dr smith@clinic.org"));
    assert!(!looks_like_email("dr@clinic..org"));
  }
}
