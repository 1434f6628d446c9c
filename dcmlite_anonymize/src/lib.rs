//! Anonymization of DICOM files by rewriting data elements that identify the
//! patient, or potentially contribute to identification of the patient.
//!
//! The [`Anonymizer`] is a batch driver: it parses each input file, applies
//! its configured tag rewrites, enumeration, UID remapping and deletions to
//! the data set, and writes the result back out. Replacements are recorded in
//! a persistent [`AuditTrail`] so that re-running the anonymizer, or running
//! it over related files, keeps identifiers consistent.

pub mod audit_trail;

use std::path::{Component, Path, PathBuf};

use dcmlite_core::{
  DataElementTag, DataElementValue, DataSet, DcmliteError,
  ValueRepresentation, dictionary, uid,
};

pub use audit_trail::AuditTrail;

/// An error that occurred during anonymization, outside of the per-file
/// read/write failures which are recorded in the [`AnonymizeReport`].
///
#[derive(Clone, Debug, PartialEq)]
pub enum AnonymizeError {
  /// The audit trail file could not be parsed or serialized.
  AuditTrailInvalid { details: String },

  /// There was an error with an underlying file.
  FileError { when: String, details: String },
}

impl core::fmt::Display for AnonymizeError {
  fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
    write!(f, "DICOM anonymize error: {}", self.name())
  }
}

impl AnonymizeError {
  /// Returns the name of the error as a human-readable string.
  ///
  pub fn name(&self) -> &str {
    match self {
      Self::AuditTrailInvalid { .. } => "Audit trail invalid",
      Self::FileError { .. } => "File I/O failure",
    }
  }
}

impl DcmliteError for AnonymizeError {
  fn to_lines(&self, task_description: &str) -> Vec<String> {
    let mut lines = vec![
      format!("DICOM anonymize error {task_description}"),
      "".to_string(),
      format!("  Error: {}", self.name()),
    ];

    match self {
      Self::AuditTrailInvalid { details } => {
        lines.push(format!("  Details: {details}"));
      }
      Self::FileError { when, details } => {
        lines.push(format!("  When: {when}"));
        lines.push(format!("  Details: {details}"));
      }
    }

    lines
  }
}

/// A single entry in the anonymizer's tag rewrite table: the data element to
/// rewrite, the replacement value, and whether distinct original values
/// should instead be enumerated as `replacement1`, `replacement2`, etc. when
/// enumeration is enabled.
///
#[derive(Clone, Debug, PartialEq)]
pub struct TagRewrite {
  pub tag: DataElementTag,
  pub replacement: String,
  pub enumerate: bool,
}

impl TagRewrite {
  pub fn new(tag: DataElementTag, replacement: &str, enumerate: bool) -> Self {
    Self {
      tag,
      replacement: replacement.to_string(),
      enumerate,
    }
  }
}

/// The UID data elements that are remapped when UID remapping is enabled,
/// with the category number used in generated replacement UIDs.
///
const UID_CATEGORIES: [(DataElementTag, u32); 4] = [
  (dictionary::STUDY_INSTANCE_UID.tag, 1),
  (dictionary::SERIES_INSTANCE_UID.tag, 2),
  (dictionary::SOP_INSTANCE_UID.tag, 3),
  (dictionary::FRAME_OF_REFERENCE_UID.tag, 9),
];

/// The default tag rewrite table, covering dates, times, institution,
/// physician, station, operator, patient identity, and image comments.
///
fn default_rewrites() -> Vec<TagRewrite> {
  vec![
    TagRewrite::new(dictionary::STUDY_DATE.tag, "19000101", false),
    TagRewrite::new(dictionary::SERIES_DATE.tag, "19000101", false),
    TagRewrite::new(dictionary::ACQUISITION_DATE.tag, "19000101", false),
    TagRewrite::new(dictionary::CONTENT_DATE.tag, "19000101", false),
    TagRewrite::new(dictionary::STUDY_TIME.tag, "000000.00", false),
    TagRewrite::new(dictionary::SERIES_TIME.tag, "000000.00", false),
    TagRewrite::new(dictionary::ACQUISITION_TIME.tag, "000000.00", false),
    TagRewrite::new(dictionary::CONTENT_TIME.tag, "000000.00", false),
    TagRewrite::new(dictionary::ACCESSION_NUMBER.tag, "", true),
    TagRewrite::new(dictionary::INSTITUTION_NAME.tag, "Institution", true),
    TagRewrite::new(
      dictionary::REFERRING_PHYSICIAN_NAME.tag,
      "Physician",
      true,
    ),
    TagRewrite::new(dictionary::STATION_NAME.tag, "Station", true),
    TagRewrite::new(dictionary::OPERATORS_NAME.tag, "Operator", true),
    TagRewrite::new(dictionary::PATIENT_NAME.tag, "Patient", true),
    TagRewrite::new(dictionary::PATIENT_ID.tag, "ID", true),
    TagRewrite::new(dictionary::PATIENT_BIRTH_DATE.tag, "19000101", false),
    TagRewrite::new(dictionary::PATIENT_SEX.tag, "N", false),
    TagRewrite::new(dictionary::IMAGE_COMMENTS.tag, "", false),
  ]
}

/// The result of an anonymization run: aggregate counts of the files that
/// were read and written, plus per-file failure messages.
///
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnonymizeReport {
  pub read_successful: usize,
  pub read_failed: usize,
  pub write_successful: usize,
  pub write_failed: usize,
  pub messages: Vec<String>,
}

/// Anonymizes batches of DICOM files.
///
#[derive(Clone, Debug, PartialEq)]
pub struct Anonymizer {
  rewrites: Vec<TagRewrite>,
  blank: bool,
  enumeration: bool,
  delete_private: bool,
  remap_uids: bool,
  uid_root: String,
  write_dir: Option<PathBuf>,
  audit_trail_path: Option<PathBuf>,
  delete_tags: Vec<DataElementTag>,
  audit_trail: AuditTrail,
}

impl Default for Anonymizer {
  fn default() -> Self {
    Self::new()
  }
}

impl Anonymizer {
  /// Creates a new anonymizer with the default tag rewrite table and all
  /// optional behaviors disabled.
  ///
  pub fn new() -> Self {
    Self {
      rewrites: default_rewrites(),
      blank: false,
      enumeration: false,
      delete_private: false,
      remap_uids: false,
      uid_root: dcmlite_p10::uids::DCMLITE_IMPLEMENTATION_CLASS_UID
        .to_string(),
      write_dir: None,
      audit_trail_path: None,
      delete_tags: vec![],
      audit_trail: AuditTrail::new(),
    }
  }

  /// When enabled, every rewritten data element is set to an empty value,
  /// regardless of the configured replacement values.
  ///
  pub fn blank(mut self, value: bool) -> Self {
    self.blank = value;
    self
  }

  /// When enabled, rewrite table entries marked for enumeration replace each
  /// distinct original value with the replacement value followed by a running
  /// index, keeping equal originals equal across files.
  ///
  pub fn enumeration(mut self, value: bool) -> Self {
    self.enumeration = value;
    self
  }

  /// When enabled, all data elements with an odd group number are removed, at
  /// every depth of the data set.
  ///
  pub fn delete_private(mut self, value: bool) -> Self {
    self.delete_private = value;
    self
  }

  /// When enabled, study, series, SOP instance and frame of reference UIDs
  /// are replaced with generated UIDs, consistently across files.
  ///
  pub fn remap_uids(mut self, value: bool) -> Self {
    self.remap_uids = value;
    self
  }

  /// The organizational root under which replacement UIDs are generated.
  ///
  pub fn uid_root(mut self, value: &str) -> Self {
    self.uid_root = value.to_string();
    self
  }

  /// The directory anonymized files are written to. When not set, each input
  /// file is overwritten in place.
  ///
  pub fn write_dir<P: AsRef<Path>>(mut self, value: P) -> Self {
    self.write_dir = Some(value.as_ref().to_path_buf());
    self
  }

  /// The path of the JSON audit trail file. It is read before a run starts
  /// and rewritten when the run completes.
  ///
  pub fn audit_trail_path<P: AsRef<Path>>(mut self, value: P) -> Self {
    self.audit_trail_path = Some(value.as_ref().to_path_buf());
    self
  }

  /// Adds or replaces an entry in the tag rewrite table.
  ///
  pub fn set_rewrite(
    mut self,
    tag: DataElementTag,
    replacement: &str,
    enumerate: bool,
  ) -> Self {
    match self.rewrites.iter_mut().find(|rewrite| rewrite.tag == tag) {
      Some(rewrite) => {
        rewrite.replacement = replacement.to_string();
        rewrite.enumerate = enumerate;
      }
      None => {
        self
          .rewrites
          .push(TagRewrite::new(tag, replacement, enumerate));
      }
    }

    self
  }

  /// Adds a data element to be deleted entirely from every file.
  ///
  pub fn add_deletion(mut self, tag: DataElementTag) -> Self {
    self.delete_tags.push(tag);
    self
  }

  /// Returns the audit trail accumulated by this anonymizer.
  ///
  pub fn audit_trail(&self) -> &AuditTrail {
    &self.audit_trail
  }

  /// Anonymizes the given input files. The audit trail is loaded from its
  /// configured path before any file is processed and written back once all
  /// files are done. Per-file read and write failures don't stop the run;
  /// they are recorded in the returned report.
  ///
  pub fn run(
    &mut self,
    input_files: &[PathBuf],
  ) -> Result<AnonymizeReport, AnonymizeError> {
    if let Some(path) = &self.audit_trail_path {
      self.audit_trail = AuditTrail::load(path)?;
    }

    let write_paths = derive_write_paths(input_files, self.write_dir.as_deref());

    let mut report = AnonymizeReport::default();

    for (input_file, write_path) in input_files.iter().zip(write_paths.iter()) {
      let mut data_set = match dcmlite_p10::read_file(input_file, None) {
        Ok(data_set) => {
          report.read_successful += 1;
          data_set
        }

        Err(e) => {
          report.read_failed += 1;
          report.messages.push(format!(
            "Failed reading '{}': {}, {}",
            input_file.display(),
            e.name(),
            e.details(),
          ));
          continue;
        }
      };

      self.anonymize_data_set(&mut data_set);

      if let Some(parent) = write_path.parent() {
        let _ = std::fs::create_dir_all(parent);
      }

      match dcmlite_p10::write_file(write_path, &data_set, None) {
        Ok(()) => {
          report.write_successful += 1;
          tracing::info!(
            "Anonymized '{}' to '{}'",
            input_file.display(),
            write_path.display(),
          );
        }

        Err(e) => {
          report.write_failed += 1;
          report.messages.push(format!(
            "Failed writing '{}': {}, {}",
            write_path.display(),
            e.name(),
            e.details(),
          ));
        }
      }
    }

    if let Some(path) = &self.audit_trail_path {
      self.audit_trail.save(path)?;
    }

    Ok(report)
  }

  /// Applies this anonymizer's tag rewrites, UID remapping and deletions to a
  /// data set in place.
  ///
  pub fn anonymize_data_set(&mut self, data_set: &mut DataSet) {
    self.apply_rewrites(data_set);

    if self.remap_uids {
      self.apply_uid_remapping(data_set);
    }

    if self.delete_private {
      data_set.delete_private_elements();
    }

    for tag in self.delete_tags.iter() {
      data_set.delete(*tag);
    }
  }

  fn apply_rewrites(&mut self, data_set: &mut DataSet) {
    for rewrite in self.rewrites.iter() {
      let Ok(value) = data_set.get_value(rewrite.tag) else {
        continue;
      };

      // Only leaf data elements are rewritten
      if value.bytes().is_err() {
        continue;
      }

      let vr = value.value_representation();

      let original = value
        .get_strings()
        .map(|strings| strings.join("\\"))
        .unwrap_or_default();

      let replacement = if self.blank {
        String::new()
      } else if self.enumeration && rewrite.enumerate && !original.is_empty() {
        match self.audit_trail.replacement_for(rewrite.tag, &original) {
          Some(replacement) => replacement.to_string(),

          None => {
            let index = self.audit_trail.record_count(rewrite.tag) + 1;
            let replacement = format!("{}{}", rewrite.replacement, index);

            self.audit_trail.add(rewrite.tag, &original, &replacement);

            replacement
          }
        }
      } else {
        rewrite.replacement.clone()
      };

      set_leaf_value(data_set, rewrite.tag, vr, &replacement);
    }
  }

  fn apply_uid_remapping(&mut self, data_set: &mut DataSet) {
    for (tag, category) in UID_CATEGORIES {
      let Ok(original) = data_set.get_string(tag) else {
        continue;
      };

      if original.is_empty() {
        continue;
      }

      let original = original.to_string();

      let replacement =
        match self.audit_trail.replacement_for(tag, &original) {
          Some(replacement) => replacement.to_string(),

          None => {
            let replacement = self.generate_uid(category);
            self.audit_trail.add(tag, &original, &replacement);
            replacement
          }
        };

      set_leaf_value(
        data_set,
        tag,
        ValueRepresentation::UniqueIdentifier,
        &replacement,
      );

      // A rewritten SOP Instance UID is mirrored into the Media Storage SOP
      // Instance UID so the File Meta Information stays consistent
      if tag == dictionary::SOP_INSTANCE_UID.tag
        && data_set.has(dictionary::MEDIA_STORAGE_SOP_INSTANCE_UID.tag)
      {
        set_leaf_value(
          data_set,
          dictionary::MEDIA_STORAGE_SOP_INSTANCE_UID.tag,
          ValueRepresentation::UniqueIdentifier,
          &replacement,
        );
      }
    }
  }

  /// Generates a replacement UID of the form
  /// `<uid_root>.<category>.<date>.<time>.<random>`. DICOM forbids leading
  /// zeros in UID components, so every generated numeric component has them
  /// stripped.
  ///
  fn generate_uid(&self, category: u32) -> String {
    let now = chrono::Local::now();

    let date = now.format("%Y%m%d").to_string();
    let time = now.format("%H%M%S").to_string();

    let generated_uid = format!(
      "{}.{}.{}.{}.{}",
      self.uid_root,
      category,
      uid::strip_leading_zeros(&date),
      uid::strip_leading_zeros(&time),
      uid::random_component(),
    );

    debug_assert!(uid::is_valid(&generated_uid));

    generated_uid
  }
}

/// Sets the value of a leaf data element, preserving its VR. Replacement
/// values that aren't valid for the VR are stored as raw padded bytes so the
/// rewrite still takes effect.
///
fn set_leaf_value(
  data_set: &mut DataSet,
  tag: DataElementTag,
  vr: ValueRepresentation,
  value: &str,
) {
  let new_value = if vr.is_string() && !value.is_empty() {
    DataElementValue::new_string(vr, &[value])
  } else {
    DataElementValue::new_binary(vr, value.as_bytes().to_vec())
  };

  match new_value {
    Ok(new_value) => data_set.insert(tag, new_value),
    Err(e) => {
      tracing::warn!(
        "Unable to rewrite '{}': {}",
        dictionary::tag_with_name(tag),
        e,
      );
    }
  }
}

/// Derives the write path for each input file. With no write directory
/// configured, files are overwritten in place. With a write directory, a
/// single input keeps just its file name, and multiple inputs keep their
/// paths relative to their longest common directory prefix. Inputs outside
/// that prefix (or when no common prefix exists) keep their full path,
/// re-rooted under the write directory.
///
fn derive_write_paths(
  input_files: &[PathBuf],
  write_dir: Option<&Path>,
) -> Vec<PathBuf> {
  let Some(write_dir) = write_dir else {
    return input_files.to_vec();
  };

  if let [input_file] = input_files {
    let file_name = input_file
      .file_name()
      .map(PathBuf::from)
      .unwrap_or_else(|| relative_components(input_file));

    return vec![write_dir.join(file_name)];
  }

  let common_prefix = longest_common_directory_prefix(input_files);

  input_files
    .iter()
    .map(|input_file| {
      let residue = match input_file.strip_prefix(&common_prefix) {
        Ok(residue) => relative_components(residue),
        Err(_) => relative_components(input_file),
      };

      write_dir.join(residue)
    })
    .collect()
}

/// Returns the longest directory prefix shared by all of the given paths.
///
fn longest_common_directory_prefix(paths: &[PathBuf]) -> PathBuf {
  let Some(first) = paths.first() else {
    return PathBuf::new();
  };

  let mut prefix: Vec<Component> = first
    .parent()
    .unwrap_or_else(|| Path::new(""))
    .components()
    .collect();

  for path in paths[1..].iter() {
    let components: Vec<Component> = path
      .parent()
      .unwrap_or_else(|| Path::new(""))
      .components()
      .collect();

    let common_length = prefix
      .iter()
      .zip(components.iter())
      .take_while(|(a, b)| a == b)
      .count();

    prefix.truncate(common_length);
  }

  prefix.iter().collect()
}

/// Strips any root or drive prefix components from a path so it can be
/// appended to a directory.
///
fn relative_components(path: &Path) -> PathBuf {
  path
    .components()
    .filter(|component| {
      !matches!(component, Component::RootDir | Component::Prefix(_))
    })
    .collect()
}

/// Adds functions to [`DataSet`] to perform anonymization.
///
pub trait DataSetAnonymizeExtensions {
  /// Applies the given anonymizer's rewrites, UID remapping and deletions to
  /// this data set.
  ///
  fn anonymize(&mut self, anonymizer: &mut Anonymizer);
}

impl DataSetAnonymizeExtensions for DataSet {
  fn anonymize(&mut self, anonymizer: &mut Anonymizer) {
    anonymizer.anonymize_data_set(self);
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn data_set_with_patient_name(name: &str) -> DataSet {
    let mut data_set = DataSet::new();
    data_set
      .insert_string_value(&dictionary::PATIENT_NAME, &[name])
      .unwrap();
    data_set
      .insert_string_value(&dictionary::PATIENT_SEX, &["F"])
      .unwrap();
    data_set
  }

  #[test]
  fn rewrites_use_literal_replacements_test() {
    let mut anonymizer = Anonymizer::new();

    let mut data_set = data_set_with_patient_name("Doe^Jane");
    data_set
      .insert_string_value(&dictionary::STUDY_DATE, &["20260801"])
      .unwrap();

    anonymizer.anonymize_data_set(&mut data_set);

    assert_eq!(
      data_set.get_string(dictionary::PATIENT_NAME.tag),
      Ok("Patient")
    );
    assert_eq!(data_set.get_string(dictionary::PATIENT_SEX.tag), Ok("N"));
    assert_eq!(
      data_set.get_string(dictionary::STUDY_DATE.tag),
      Ok("19000101")
    );
  }

  #[test]
  fn blank_overrides_replacements_test() {
    let mut anonymizer = Anonymizer::new().blank(true).enumeration(true);

    let mut data_set = data_set_with_patient_name("Doe^Jane");
    anonymizer.anonymize_data_set(&mut data_set);

    assert_eq!(data_set.get_string(dictionary::PATIENT_NAME.tag), Ok(""));
  }

  #[test]
  fn enumeration_keeps_equal_originals_equal_test() {
    let mut anonymizer = Anonymizer::new().enumeration(true);

    let mut first = data_set_with_patient_name("Alice");
    let mut second = data_set_with_patient_name("Bob");
    let mut third = data_set_with_patient_name("Alice");

    anonymizer.anonymize_data_set(&mut first);
    anonymizer.anonymize_data_set(&mut second);
    anonymizer.anonymize_data_set(&mut third);

    assert_eq!(first.get_string(dictionary::PATIENT_NAME.tag), Ok("Patient1"));
    assert_eq!(
      second.get_string(dictionary::PATIENT_NAME.tag),
      Ok("Patient2")
    );
    assert_eq!(third.get_string(dictionary::PATIENT_NAME.tag), Ok("Patient1"));

    let audit_trail = anonymizer.audit_trail();
    assert_eq!(
      audit_trail.replacement_for(dictionary::PATIENT_NAME.tag, "Alice"),
      Some("Patient1")
    );
    assert_eq!(
      audit_trail.replacement_for(dictionary::PATIENT_NAME.tag, "Bob"),
      Some("Patient2")
    );
    assert_eq!(audit_trail.record_count(dictionary::PATIENT_NAME.tag), 2);
  }

  #[test]
  fn uid_remapping_test() {
    let mut anonymizer =
      Anonymizer::new().remap_uids(true).uid_root("1.2.840.99999");

    let mut data_set = DataSet::new();
    data_set
      .insert_string_value(&dictionary::STUDY_INSTANCE_UID, &["1.2.3"])
      .unwrap();
    data_set
      .insert_string_value(&dictionary::SOP_INSTANCE_UID, &["1.2.3.4"])
      .unwrap();
    data_set
      .insert_string_value(
        &dictionary::MEDIA_STORAGE_SOP_INSTANCE_UID,
        &["1.2.3.4"],
      )
      .unwrap();

    anonymizer.anonymize_data_set(&mut data_set);

    let study_uid = data_set
      .get_string(dictionary::STUDY_INSTANCE_UID.tag)
      .unwrap()
      .to_string();

    assert!(study_uid.starts_with("1.2.840.99999.1."));
    assert!(uid::is_valid(&study_uid));

    // The Media Storage SOP Instance UID follows the SOP Instance UID
    let sop_instance_uid = data_set
      .get_string(dictionary::SOP_INSTANCE_UID.tag)
      .unwrap()
      .to_string();

    assert!(sop_instance_uid.starts_with("1.2.840.99999.3."));
    assert_eq!(
      data_set.get_string(dictionary::MEDIA_STORAGE_SOP_INSTANCE_UID.tag),
      Ok(sop_instance_uid.as_str())
    );

    // Anonymizing a fresh data set with the same original values reuses the
    // replacements recorded in the audit trail
    let mut second = DataSet::new();
    second
      .insert_string_value(&dictionary::STUDY_INSTANCE_UID, &["1.2.3"])
      .unwrap();

    anonymizer.anonymize_data_set(&mut second);

    assert_eq!(
      second.get_string(dictionary::STUDY_INSTANCE_UID.tag),
      Ok(study_uid.as_str())
    );
  }

  #[test]
  fn delete_private_and_delete_list_test() {
    let mut anonymizer = Anonymizer::new()
      .delete_private(true)
      .add_deletion(dictionary::INSTITUTION_NAME.tag);

    let mut data_set = data_set_with_patient_name("Doe^Jane");
    data_set
      .insert_string_value(&dictionary::INSTITUTION_NAME, &["General Hospital"])
      .unwrap();
    data_set.insert(
      DataElementTag::new(0x0009, 0x0010),
      DataElementValue::new_binary(ValueRepresentation::LongString, b"ACME".to_vec())
        .unwrap(),
    );

    anonymizer.anonymize_data_set(&mut data_set);

    assert!(!data_set.has(DataElementTag::new(0x0009, 0x0010)));
    assert!(!data_set.has(dictionary::INSTITUTION_NAME.tag));
  }

  #[test]
  fn derive_write_paths_test() {
    // No write directory overwrites in place
    assert_eq!(
      derive_write_paths(&[PathBuf::from("/data/a.dcm")], None),
      vec![PathBuf::from("/data/a.dcm")]
    );

    // A single input keeps just its file name
    assert_eq!(
      derive_write_paths(
        &[PathBuf::from("/data/study/a.dcm")],
        Some(Path::new("/out"))
      ),
      vec![PathBuf::from("/out/a.dcm")]
    );

    // Multiple inputs keep their paths below the longest common directory
    // prefix
    assert_eq!(
      derive_write_paths(
        &[
          PathBuf::from("/data/study1/a.dcm"),
          PathBuf::from("/data/study2/b.dcm"),
        ],
        Some(Path::new("/out"))
      ),
      vec![
        PathBuf::from("/out/study1/a.dcm"),
        PathBuf::from("/out/study2/b.dcm"),
      ]
    );

    // Inputs with no common prefix keep their full path
    assert_eq!(
      derive_write_paths(
        &[PathBuf::from("/data/a.dcm"), PathBuf::from("b.dcm")],
        Some(Path::new("/out"))
      ),
      vec![PathBuf::from("/out/data/a.dcm"), PathBuf::from("/out/b.dcm")]
    );
  }

  #[test]
  fn run_is_deterministic_with_audit_trail_test() {
    use dcmlite_p10::DataSetP10Extensions;

    let directory = tempfile::tempdir().unwrap();
    let input_dir = directory.path().join("input");
    let output_dir = directory.path().join("output");
    let audit_trail_path = directory.path().join("audit_trail.json");

    std::fs::create_dir_all(&input_dir).unwrap();

    let mut input_files = vec![];
    for (index, name) in ["Alice", "Bob", "Alice"].iter().enumerate() {
      let mut data_set = data_set_with_patient_name(name);
      data_set
        .insert_string_value(&dictionary::STUDY_INSTANCE_UID, &["1.2.3"])
        .unwrap();

      let path = input_dir.join(format!("{index}.dcm"));
      data_set.write_p10_file(&path, None).unwrap();
      input_files.push(path);
    }

    let run = || -> Vec<Vec<u8>> {
      let mut anonymizer = Anonymizer::new()
        .enumeration(true)
        .remap_uids(true)
        .write_dir(&output_dir)
        .audit_trail_path(&audit_trail_path);

      let report = anonymizer.run(&input_files).unwrap();

      assert_eq!(report.read_successful, 3);
      assert_eq!(report.write_successful, 3);
      assert_eq!(report.read_failed, 0);
      assert_eq!(report.messages, Vec::<String>::new());

      input_files
        .iter()
        .map(|input_file| {
          let output_file =
            output_dir.join(input_file.file_name().unwrap());
          std::fs::read(output_file).unwrap()
        })
        .collect()
    };

    let first_outputs = run();

    let data_set =
      DataSet::read_p10_bytes(first_outputs[0].clone()).unwrap();
    assert_eq!(
      data_set.get_string(dictionary::PATIENT_NAME.tag),
      Ok("Patient1")
    );

    let second = DataSet::read_p10_bytes(first_outputs[1].clone()).unwrap();
    assert_eq!(
      second.get_string(dictionary::PATIENT_NAME.tag),
      Ok("Patient2")
    );

    let third = DataSet::read_p10_bytes(first_outputs[2].clone()).unwrap();
    assert_eq!(
      third.get_string(dictionary::PATIENT_NAME.tag),
      Ok("Patient1")
    );

    // Re-running with the persisted audit trail produces identical outputs
    let second_outputs = run();
    assert_eq!(first_outputs, second_outputs);
  }

  #[test]
  fn run_records_read_failures_test() {
    let directory = tempfile::tempdir().unwrap();

    let missing = directory.path().join("missing.dcm");

    let mut anonymizer = Anonymizer::new();
    let report = anonymizer.run(&[missing]).unwrap();

    assert_eq!(report.read_successful, 0);
    assert_eq!(report.read_failed, 1);
    assert_eq!(report.messages.len(), 1);
    assert!(report.messages[0].contains("missing.dcm"));
  }
}
