//! Work with DICOM unique identifiers (UIDs).

use rand::Rng;
use regex::Regex;
use std::sync::LazyLock;

/// Valid UIDs are 1-64 characters long and are made up of sequences of digits
/// separated by the period character. Leading zeros are not permitted in a
/// digit sequence unless the zero is the only digit in the sequence.
///
static UID_REGEX: LazyLock<Regex> =
  LazyLock::new(|| Regex::new("^(0|[1-9][0-9]*)(\\.(0|[1-9][0-9]*))*$").unwrap());

/// Returns whether the given string is a valid UID.
///
pub fn is_valid(uid: &str) -> bool {
  if uid.is_empty() || uid.len() > 64 {
    return false;
  }

  UID_REGEX.is_match(uid)
}

/// Strips leading zeros from a numeric UID component, e.g. `"093012"` becomes
/// `"93012"`. An all-zero component becomes `"0"`.
///
pub fn strip_leading_zeros(component: &str) -> &str {
  match component.trim_start_matches('0') {
    "" => "0",
    stripped => stripped,
  }
}

/// Returns a random integer in the range 1 to 99999 inclusive, for use as the
/// final component of a generated UID.
///
pub fn random_component() -> u32 {
  rand::thread_rng().gen_range(1..=99999)
}
