//! A dictionary of the DICOM data elements and UIDs known to this library.
//!
//! The dictionary is loaded once on first use from two tab-separated tables
//! embedded in this crate: `data/elements.tsv` and `data/uids.tsv`. Repeater
//! tags are stored as patterns containing `x` characters, e.g. `60xx,3000`,
//! and are consulted when no exact match exists for a tag.

use std::collections::HashMap;
use std::sync::LazyLock;

use crate::{DataElementTag, ValueMultiplicity, ValueRepresentation};

/// A well-known data element usable in const context. These cover the tags
/// that this library manipulates directly; the full dictionary is consulted
/// via [`find`] and [`lookup`].
///
#[derive(Clone, Debug, PartialEq)]
pub struct Item {
  pub tag: DataElementTag,
  pub name: &'static str,
  pub vrs: &'static [ValueRepresentation],
  pub multiplicity: ValueMultiplicity,
}

/// An entry in the data element dictionary.
///
#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
  pub name: String,
  pub vrs: Vec<ValueRepresentation>,
  pub multiplicity: ValueMultiplicity,
  pub retired: bool,
}

impl Entry {
  /// The primary VR for this entry. Entries with multiple possible VRs, e.g.
  /// `US,SS`, report the first one.
  ///
  pub fn vr(&self) -> ValueRepresentation {
    self.vrs[0]
  }
}

/// An entry in the UID dictionary.
///
#[derive(Clone, Debug, PartialEq)]
pub struct UidEntry {
  pub uid: String,
  pub name: String,
  pub kind: UidKind,
  pub retired: bool,
}

/// The type of a registered UID.
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum UidKind {
  TransferSyntax,
  SopClass,
  WellKnown,
}

/// A repeater pattern such as `60xx,3000`, stored as a mask/value pair over
/// the tag's 32-bit form.
///
struct Repeater {
  mask: u32,
  value: u32,
  entry: Entry,
}

struct Dictionary {
  elements: HashMap<u32, Entry>,
  repeaters: Vec<Repeater>,
  uids: HashMap<String, UidEntry>,
}

static DICTIONARY: LazyLock<Dictionary> = LazyLock::new(|| {
  Dictionary {
    elements: parse_elements_table(include_str!("../data/elements.tsv")),
    repeaters: parse_repeaters_table(include_str!("../data/elements.tsv")),
    uids: parse_uids_table(include_str!("../data/uids.tsv")),
  }
});

/// Finds the dictionary entry for the given tag, if there is one. Exact
/// matches are preferred, then repeater patterns in table order.
///
pub fn find(tag: DataElementTag) -> Option<&'static Entry> {
  if let Some(entry) = DICTIONARY.elements.get(&tag.to_int()) {
    return Some(entry);
  }

  DICTIONARY
    .repeaters
    .iter()
    .find(|repeater| tag.to_int() & repeater.mask == repeater.value)
    .map(|repeater| &repeater.entry)
}

/// Looks up the dictionary entry for the given tag. Tags with no entry have
/// one synthesized: group length tags report `"Group Length"` with the `UL`
/// VR, private tags report `"Private"` with the `UN` VR, and everything else
/// reports `"Unknown"` with the `UN` VR.
///
pub fn lookup(tag: DataElementTag) -> Entry {
  if let Some(entry) = find(tag) {
    return entry.clone();
  }

  if tag.is_group_length() {
    return Entry {
      name: "Group Length".to_string(),
      vrs: vec![ValueRepresentation::UnsignedLong],
      multiplicity: ValueMultiplicity::ONE,
      retired: false,
    };
  }

  if tag.is_private() {
    return Entry {
      name: "Private".to_string(),
      vrs: vec![ValueRepresentation::Unknown],
      multiplicity: ValueMultiplicity::ONE,
      retired: false,
    };
  }

  Entry {
    name: "Unknown".to_string(),
    vrs: vec![ValueRepresentation::Unknown],
    multiplicity: ValueMultiplicity::ONE,
    retired: false,
  }
}

/// Returns the display name for the given tag, or `"Unknown"`/`"Private"`/
/// `"Group Length"` when it has no dictionary entry.
///
pub fn tag_name(tag: DataElementTag) -> &'static str {
  match find(tag) {
    Some(entry) => &entry.name,
    None => {
      if tag.is_group_length() {
        "Group Length"
      } else if tag.is_private() {
        "Private"
      } else {
        "Unknown"
      }
    }
  }
}

/// Returns `"$TAG $NAME"` for the given tag, e.g.
/// `"0008,0020 Study Date"`.
///
pub fn tag_with_name(tag: DataElementTag) -> String {
  format!("{} {}", tag, tag_name(tag))
}

/// Finds the UID dictionary entry for the given UID value.
///
pub fn uid(value: &str) -> Option<&'static UidEntry> {
  DICTIONARY.uids.get(value.trim_end_matches('\0'))
}

/// Returns whether the given UID is a registered transfer syntax.
///
pub fn is_transfer_syntax(value: &str) -> bool {
  uid(value).map(|e| e.kind == UidKind::TransferSyntax) == Some(true)
}

/// Returns whether the given UID is a registered SOP class.
///
pub fn is_sop_class(value: &str) -> bool {
  uid(value).map(|e| e.kind == UidKind::SopClass) == Some(true)
}

fn parse_entry(line: &str) -> Option<(String, Entry)> {
  let mut columns = line.split('\t');

  let tag = columns.next()?;
  let name = columns.next()?;
  let vrs = columns.next()?;
  let multiplicity = columns.next()?;
  let retired = columns.next()? == "true";

  let vrs: Vec<ValueRepresentation> = vrs
    .split(',')
    .map(|vr| ValueRepresentation::from_bytes(vr.as_bytes()))
    .collect::<Result<_, _>>()
    .ok()?;

  let entry = Entry {
    name: name.to_string(),
    vrs,
    multiplicity: ValueMultiplicity::from_string(multiplicity).ok()?,
    retired,
  };

  Some((tag.to_string(), entry))
}

fn tag_column_is_repeater(line: &str) -> bool {
  line.split('\t').next().is_some_and(|tag| tag.contains('x'))
}

fn parse_elements_table(table: &str) -> HashMap<u32, Entry> {
  table
    .lines()
    .filter(|line| !line.is_empty() && !tag_column_is_repeater(line))
    .map(|line| {
      let (tag, entry) =
        parse_entry(line).expect("Element dictionary table is malformed");

      let tag = DataElementTag::from_string(&tag)
        .expect("Element dictionary table has an invalid tag");

      (tag.to_int(), entry)
    })
    .collect()
}

fn parse_repeaters_table(table: &str) -> Vec<Repeater> {
  table
    .lines()
    .filter(|line| !line.is_empty() && tag_column_is_repeater(line))
    .map(|line| {
      let (tag, entry) =
        parse_entry(line).expect("Element dictionary table is malformed");

      let digits: Vec<char> =
        tag.chars().filter(|c| *c != ',').collect();
      assert_eq!(digits.len(), 8, "Repeater pattern has an invalid tag");

      let mut mask = 0u32;
      let mut value = 0u32;

      for digit in digits {
        mask <<= 4;
        value <<= 4;

        if digit != 'x' {
          mask |= 0xF;
          value |= digit.to_digit(16).expect("Repeater pattern is malformed");
        }
      }

      Repeater { mask, value, entry }
    })
    .collect()
}

fn parse_uids_table(table: &str) -> HashMap<String, UidEntry> {
  table
    .lines()
    .filter(|line| !line.is_empty())
    .map(|line| {
      let mut columns = line.split('\t');

      let uid = columns.next().expect("UID table is malformed").to_string();
      let name = columns.next().expect("UID table is malformed").to_string();
      let kind = match columns.next().expect("UID table is malformed") {
        "Transfer Syntax" => UidKind::TransferSyntax,
        "SOP Class" => UidKind::SopClass,
        _ => UidKind::WellKnown,
      };
      let retired = columns.next() == Some("true");

      (
        uid.clone(),
        UidEntry {
          uid,
          name,
          kind,
          retired,
        },
      )
    })
    .collect()
}

const VM_ONE: ValueMultiplicity = ValueMultiplicity::ONE;

const VM_ONE_TO_MANY: ValueMultiplicity = ValueMultiplicity::ONE_TO_MANY;

macro_rules! item {
  ($ident:ident, $group:literal, $element:literal, $name:literal, $vr:ident,
   $multiplicity:ident) => {
    pub const $ident: Item = Item {
      tag: DataElementTag {
        group: $group,
        element: $element,
      },
      name: $name,
      vrs: &[ValueRepresentation::$vr],
      multiplicity: $multiplicity,
    };
  };
}

item!(
  FILE_META_INFORMATION_GROUP_LENGTH,
  0x0002,
  0x0000,
  "File Meta Information Group Length",
  UnsignedLong,
  VM_ONE
);
item!(
  FILE_META_INFORMATION_VERSION,
  0x0002,
  0x0001,
  "File Meta Information Version",
  OtherByteString,
  VM_ONE
);
item!(
  MEDIA_STORAGE_SOP_CLASS_UID,
  0x0002,
  0x0002,
  "Media Storage SOP Class UID",
  UniqueIdentifier,
  VM_ONE
);
item!(
  MEDIA_STORAGE_SOP_INSTANCE_UID,
  0x0002,
  0x0003,
  "Media Storage SOP Instance UID",
  UniqueIdentifier,
  VM_ONE
);
item!(
  TRANSFER_SYNTAX_UID,
  0x0002,
  0x0010,
  "Transfer Syntax UID",
  UniqueIdentifier,
  VM_ONE
);
item!(
  IMPLEMENTATION_CLASS_UID,
  0x0002,
  0x0012,
  "Implementation Class UID",
  UniqueIdentifier,
  VM_ONE
);
item!(
  IMPLEMENTATION_VERSION_NAME,
  0x0002,
  0x0013,
  "Implementation Version Name",
  ShortString,
  VM_ONE
);
item!(
  SOURCE_APPLICATION_ENTITY_TITLE,
  0x0002,
  0x0016,
  "Source Application Entity Title",
  ApplicationEntity,
  VM_ONE
);
item!(
  SPECIFIC_CHARACTER_SET,
  0x0008,
  0x0005,
  "Specific Character Set",
  CodeString,
  VM_ONE_TO_MANY
);
item!(
  SOP_CLASS_UID,
  0x0008,
  0x0016,
  "SOP Class UID",
  UniqueIdentifier,
  VM_ONE
);
item!(
  SOP_INSTANCE_UID,
  0x0008,
  0x0018,
  "SOP Instance UID",
  UniqueIdentifier,
  VM_ONE
);
item!(STUDY_DATE, 0x0008, 0x0020, "Study Date", Date, VM_ONE);
item!(SERIES_DATE, 0x0008, 0x0021, "Series Date", Date, VM_ONE);
item!(
  ACQUISITION_DATE,
  0x0008,
  0x0022,
  "Acquisition Date",
  Date,
  VM_ONE
);
item!(CONTENT_DATE, 0x0008, 0x0023, "Content Date", Date, VM_ONE);
item!(STUDY_TIME, 0x0008, 0x0030, "Study Time", Time, VM_ONE);
item!(SERIES_TIME, 0x0008, 0x0031, "Series Time", Time, VM_ONE);
item!(
  ACQUISITION_TIME,
  0x0008,
  0x0032,
  "Acquisition Time",
  Time,
  VM_ONE
);
item!(CONTENT_TIME, 0x0008, 0x0033, "Content Time", Time, VM_ONE);
item!(
  ACCESSION_NUMBER,
  0x0008,
  0x0050,
  "Accession Number",
  ShortString,
  VM_ONE
);
item!(
  INSTITUTION_NAME,
  0x0008,
  0x0080,
  "Institution Name",
  LongString,
  VM_ONE
);
item!(
  REFERRING_PHYSICIAN_NAME,
  0x0008,
  0x0090,
  "Referring Physician's Name",
  PersonName,
  VM_ONE
);
item!(
  STATION_NAME,
  0x0008,
  0x1010,
  "Station Name",
  ShortString,
  VM_ONE
);
item!(
  OPERATORS_NAME,
  0x0008,
  0x1070,
  "Operators' Name",
  PersonName,
  VM_ONE_TO_MANY
);
item!(
  PATIENT_NAME,
  0x0010,
  0x0010,
  "Patient's Name",
  PersonName,
  VM_ONE
);
item!(PATIENT_ID, 0x0010, 0x0020, "Patient ID", LongString, VM_ONE);
item!(
  PATIENT_BIRTH_DATE,
  0x0010,
  0x0030,
  "Patient's Birth Date",
  Date,
  VM_ONE
);
item!(
  PATIENT_SEX,
  0x0010,
  0x0040,
  "Patient's Sex",
  CodeString,
  VM_ONE
);
item!(
  STUDY_INSTANCE_UID,
  0x0020,
  0x000D,
  "Study Instance UID",
  UniqueIdentifier,
  VM_ONE
);
item!(
  SERIES_INSTANCE_UID,
  0x0020,
  0x000E,
  "Series Instance UID",
  UniqueIdentifier,
  VM_ONE
);
item!(
  FRAME_OF_REFERENCE_UID,
  0x0020,
  0x0052,
  "Frame of Reference UID",
  UniqueIdentifier,
  VM_ONE
);
item!(
  IMAGE_COMMENTS,
  0x0020,
  0x4000,
  "Image Comments",
  LongText,
  VM_ONE
);
item!(
  PIXEL_DATA,
  0x7FE0,
  0x0010,
  "Pixel Data",
  OtherWordString,
  VM_ONE
);
item!(ITEM, 0xFFFE, 0xE000, "Item", Unknown, VM_ONE);
item!(
  ITEM_DELIMITATION_ITEM,
  0xFFFE,
  0xE00D,
  "Item Delimitation Item",
  Unknown,
  VM_ONE
);
item!(
  SEQUENCE_DELIMITATION_ITEM,
  0xFFFE,
  0xE0DD,
  "Sequence Delimitation Item",
  Unknown,
  VM_ONE
);
item!(
  DATA_SET_TRAILING_PADDING,
  0xFFFC,
  0xFFFC,
  "Data Set Trailing Padding",
  OtherByteString,
  VM_ONE
);

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn find_test() {
    let entry = find(PATIENT_NAME.tag).unwrap();
    assert_eq!(entry.name, "Patient's Name");
    assert_eq!(entry.vr(), ValueRepresentation::PersonName);

    assert_eq!(find(DataElementTag::new(0x0009, 0x0001)), None);
  }

  #[test]
  fn find_repeater_test() {
    let entry = find(DataElementTag::new(0x6004, 0x3000)).unwrap();
    assert_eq!(entry.name, "Overlay Data");
    assert_eq!(entry.vr(), ValueRepresentation::OtherWordString);

    let entry = find(DataElementTag::new(0x5012, 0x1234)).unwrap();
    assert_eq!(entry.name, "Curve Data");
    assert!(entry.retired);
  }

  #[test]
  fn lookup_synthesizes_group_length_test() {
    let entry = lookup(DataElementTag::new(0x0018, 0x0000));
    assert_eq!(entry.name, "Group Length");
    assert_eq!(entry.vr(), ValueRepresentation::UnsignedLong);
  }

  #[test]
  fn lookup_synthesizes_private_test() {
    let entry = lookup(DataElementTag::new(0x0009, 0x0002));
    assert_eq!(entry.name, "Private");
    assert_eq!(entry.vr(), ValueRepresentation::Unknown);
  }

  #[test]
  fn lookup_synthesizes_unknown_test() {
    let entry = lookup(DataElementTag::new(0x0006, 0x0002));
    assert_eq!(entry.name, "Unknown");
    assert_eq!(entry.vr(), ValueRepresentation::Unknown);
  }

  #[test]
  fn tag_name_test() {
    assert_eq!(tag_name(STUDY_DATE.tag), "Study Date");
    assert_eq!(tag_name(DataElementTag::new(0x0009, 0x0002)), "Private");
  }

  #[test]
  fn tag_with_name_test() {
    assert_eq!(tag_with_name(STUDY_DATE.tag), "0008,0020 Study Date");
  }

  #[test]
  fn uid_test() {
    let entry = uid("1.2.840.10008.1.2").unwrap();
    assert_eq!(entry.name, "Implicit VR Little Endian");
    assert_eq!(entry.kind, UidKind::TransferSyntax);

    assert!(is_transfer_syntax("1.2.840.10008.1.2.1"));
    assert!(!is_transfer_syntax("1.2.840.10008.5.1.4.1.1.2"));

    assert!(is_sop_class("1.2.840.10008.5.1.4.1.1.2"));
    assert!(!is_sop_class("1.2.840.10008.1.2.1"));

    assert_eq!(uid("9.9.9"), None);
  }
}
