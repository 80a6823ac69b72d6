//! De-identified correlation IDs: `PREFIX-YYYY-MM-DD-XXXXXXXX`.
//!
//! Built only from the current UTC date and randomness, never from patient data.
//! Not a security token: the RNG is not cryptographic and collisions are not checked.

use chrono::{NaiveDate, Utc};
use rand::{seq::SliceRandom, Rng};

pub const DEFAULT_PREFIX: &str = "PEDI";
const TOKEN_LEN: usize = 8;
const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub fn generate_deidentified_id(prefix: &str) -> String {
  generate_with(prefix, Utc::now().date_naive(), &mut rand::thread_rng())
}

pub fn generate_with<R: Rng + ?Sized>(prefix: &str, date: NaiveDate, rng: &mut R) -> String {
  let token: String = (0..TOKEN_LEN)
    .filter_map(|_| ALPHABET.choose(&mut *rng).map(|&b| b as char))
    .collect();
  format!("{}-{}-{}", prefix, date.format("%Y-%m-%d"), token)
}

#[cfg(test)]
mod tests {
  use super::*;
  use rand::{rngs::StdRng, SeedableRng};

  fn well_formed(id: &str) -> bool {
    let parts: Vec<&str> = id.split('-').collect();
    parts.len() == 5
      && parts[0] == "PEDI"
      && parts[1].len() == 4
      && parts[2].len() == 2
      && parts[3].len() == 2
      && parts[1..4].iter().all(|p| p.chars().all(|c| c.is_ascii_digit()))
      && parts[4].len() == 8
      && parts[4].chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
  }

  #[test]
  fn format_matches_prefix_date_token() {
    for _ in 0..50 {
      let id = generate_deidentified_id(DEFAULT_PREFIX);
      assert!(well_formed(&id), "malformed id: {id}");
    }
  }

  #[test]
  fn embeds_the_given_date() {
    let date = NaiveDate::from_ymd_opt(2025, 3, 7).unwrap();
    let id = generate_with("PEDI", date, &mut StdRng::seed_from_u64(7));
    assert!(id.starts_with("PEDI-2025-03-07-"));
    assert!(well_formed(&id));
  }

  #[test]
  fn two_calls_differ() {
    let a = generate_deidentified_id(DEFAULT_PREFIX);
    let b = generate_deidentified_id(DEFAULT_PREFIX);
    assert_ne!(a, b);
  }
}
