//! The audit trail keeps anonymization replacements stable across runs by
//! persisting the mapping from original to replacement values.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use dcmlite_core::DataElementTag;

use crate::AnonymizeError;

/// A persistent map of `tag → [(original, replacement)]` records that have
/// been applied by the anonymizer. Records for a tag are kept in the order
/// they were first created, which is what makes enumerated replacements
/// stable: the index of a new replacement is the number of records already
/// held for its tag.
///
/// The audit trail serializes to a JSON object whose keys are tag strings and
/// whose values are ordered arrays of two-element `[original, replacement]`
/// records.
///
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
pub struct AuditTrail(BTreeMap<String, Vec<(String, String)>>);

impl AuditTrail {
  /// Creates a new empty audit trail.
  ///
  pub fn new() -> Self {
    Self(BTreeMap::new())
  }

  /// Loads an audit trail from a JSON file. A file that doesn't exist, or
  /// that is no larger than two bytes (i.e. holds at most an empty JSON
  /// object), yields an empty audit trail.
  ///
  pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AnonymizeError> {
    let path = path.as_ref();

    match std::fs::metadata(path) {
      Ok(metadata) if metadata.len() > 2 => (),
      _ => return Ok(Self::new()),
    }

    let content =
      std::fs::read_to_string(path).map_err(|e| AnonymizeError::FileError {
        when: format!("Reading audit trail file '{}'", path.display()),
        details: e.to_string(),
      })?;

    serde_json::from_str(&content).map_err(|e| {
      AnonymizeError::AuditTrailInvalid {
        details: e.to_string(),
      }
    })
  }

  /// Saves an audit trail to a JSON file. The file is written to a temporary
  /// path and then renamed into place so a crash mid-write can't corrupt an
  /// existing audit trail.
  ///
  pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), AnonymizeError> {
    let path = path.as_ref();

    let content = serde_json::to_string_pretty(self).map_err(|e| {
      AnonymizeError::AuditTrailInvalid {
        details: e.to_string(),
      }
    })?;

    let temporary_path = path.with_extension("tmp");

    std::fs::write(&temporary_path, content).map_err(|e| {
      AnonymizeError::FileError {
        when: format!(
          "Writing audit trail file '{}'",
          temporary_path.display()
        ),
        details: e.to_string(),
      }
    })?;

    std::fs::rename(&temporary_path, path).map_err(|e| {
      AnonymizeError::FileError {
        when: format!("Writing audit trail file '{}'", path.display()),
        details: e.to_string(),
      }
    })
  }

  /// Returns the existing replacement for the given tag and original value,
  /// if one has been recorded.
  ///
  pub fn replacement_for(
    &self,
    tag: DataElementTag,
    original: &str,
  ) -> Option<&str> {
    self
      .0
      .get(&tag.to_string())?
      .iter()
      .find(|(recorded_original, _)| recorded_original == original)
      .map(|(_, replacement)| replacement.as_str())
  }

  /// Returns the number of records held for the given tag.
  ///
  pub fn record_count(&self, tag: DataElementTag) -> usize {
    self
      .0
      .get(&tag.to_string())
      .map(|records| records.len())
      .unwrap_or(0)
  }

  /// Records a new replacement for the given tag and original value.
  ///
  pub fn add(&mut self, tag: DataElementTag, original: &str, replacement: &str) {
    self
      .0
      .entry(tag.to_string())
      .or_default()
      .push((original.to_string(), replacement.to_string()));
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  use dcmlite_core::dictionary;

  #[test]
  fn replacement_lookup_test() {
    let mut audit_trail = AuditTrail::new();
    let tag = dictionary::PATIENT_NAME.tag;

    assert_eq!(audit_trail.replacement_for(tag, "Alice"), None);
    assert_eq!(audit_trail.record_count(tag), 0);

    audit_trail.add(tag, "Alice", "Patient1");
    audit_trail.add(tag, "Bob", "Patient2");

    assert_eq!(audit_trail.replacement_for(tag, "Alice"), Some("Patient1"));
    assert_eq!(audit_trail.replacement_for(tag, "Bob"), Some("Patient2"));
    assert_eq!(audit_trail.record_count(tag), 2);
  }

  #[test]
  fn json_round_trip_test() {
    let mut audit_trail = AuditTrail::new();
    audit_trail.add(dictionary::PATIENT_NAME.tag, "Alice", "Patient1");
    audit_trail.add(dictionary::PATIENT_NAME.tag, "Bob", "Patient2");
    audit_trail.add(dictionary::STUDY_INSTANCE_UID.tag, "1.2.3", "1.9.8.7");

    let json = serde_json::to_string(&audit_trail).unwrap();

    assert_eq!(
      json,
      r#"{"0010,0010":[["Alice","Patient1"],["Bob","Patient2"]],"0020,000D":[["1.2.3","1.9.8.7"]]}"#
    );

    assert_eq!(
      serde_json::from_str::<AuditTrail>(&json).unwrap(),
      audit_trail
    );
  }

  #[test]
  fn load_and_save_test() {
    let directory = tempfile::tempdir().unwrap();
    let path = directory.path().join("audit_trail.json");

    assert_eq!(AuditTrail::load(&path), Ok(AuditTrail::new()));

    let mut audit_trail = AuditTrail::new();
    audit_trail.add(dictionary::PATIENT_NAME.tag, "Alice", "Patient1");
    audit_trail.save(&path).unwrap();

    assert_eq!(AuditTrail::load(&path), Ok(audit_trail));

    // Files of two or fewer bytes are treated as empty
    std::fs::write(&path, "{}").unwrap();
    assert_eq!(AuditTrail::load(&path), Ok(AuditTrail::new()));
  }
}
