//! A path in a data set that specifies the precise location of a specific data
//! element or sequence item.

use crate::{DataElementTag, dictionary};

/// A path in a data set that specifies the precise location of a specific data
/// element or sequence item. Entries in a data set path are separated by a
/// forward slash when a path is represented as a string.
///
/// Examples:
///
/// - `""`: Path to the root data set.
/// - `"0010,0010"`: Path to the *'(0010,0010) Patient's Name'* data element.
/// - `"0008,1111/[0]"`: Path to the first item in the *'(0008,1111) Referenced
///   Performed Procedure Step Sequence'* data element.
/// - `"0008,1111/[1]/0008,1150"`: Path to the *'(0008,1150) Referenced SOP
///   Class UID'* data element in the second item of the *'(0008,1111)
///   Referenced Performed Procedure Step Sequence'* sequence.
///
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DataSetPath(Vec<DataSetPathEntry>);

/// An individual entry in a [`DataSetPath`].
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DataSetPathEntry {
  DataElement { tag: DataElementTag },
  SequenceItem { index: usize },
}

impl DataSetPath {
  /// Constructs a new data set path with no entries. An empty path is a path
  /// to the root data set.
  ///
  pub fn new() -> Self {
    Self(vec![])
  }

  /// Constructs a new data set path with an initial entry for the specified
  /// data element.
  ///
  pub fn new_with_data_element(tag: DataElementTag) -> Self {
    Self(vec![DataSetPathEntry::DataElement { tag }])
  }

  /// Returns the entries for a data set path.
  ///
  pub fn entries(&self) -> &Vec<DataSetPathEntry> {
    &self.0
  }

  /// Returns the number of entries in a data set path.
  ///
  #[allow(clippy::len_without_is_empty)]
  pub fn len(&self) -> usize {
    self.0.len()
  }

  /// Returns whether a data set path is currently empty or pointing to a
  /// root-level data element.
  ///
  pub fn is_root(&self) -> bool {
    matches!(
      self.0.as_slice(),
      [] | [DataSetPathEntry::DataElement { .. }]
    )
  }

  /// Returns the final data element entry in a data set path. Returns an error
  /// if the last entry in the data set path is not a data element.
  ///
  #[allow(clippy::result_unit_err)]
  pub fn final_data_element(&self) -> Result<DataElementTag, ()> {
    match self.0.last() {
      Some(DataSetPathEntry::DataElement { tag }) => Ok(*tag),
      _ => Err(()),
    }
  }

  /// Adds a new entry onto a data set path that specifies the given data
  /// element tag. This is only valid when the current path is empty or ends
  /// with a sequence item.
  ///
  pub fn add_data_element(
    &mut self,
    tag: DataElementTag,
  ) -> Result<(), String> {
    match self.0.last() {
      None | Some(DataSetPathEntry::SequenceItem { .. }) => {
        self.0.push(DataSetPathEntry::DataElement { tag });
        Ok(())
      }

      _ => Err(format!("Invalid data set path entry: {tag}")),
    }
  }

  /// Adds a new entry onto a data set path that specifies a sequence item
  /// index. This is only valid when the current path ends with a data element.
  ///
  pub fn add_sequence_item(&mut self, index: usize) -> Result<(), String> {
    match self.0.last() {
      Some(DataSetPathEntry::DataElement { .. }) => {
        self.0.push(DataSetPathEntry::SequenceItem { index });
        Ok(())
      }

      _ => Err(format!("Invalid data set path entry: [{index}]")),
    }
  }

  /// Removes the last entry from a data set path.
  ///
  pub fn pop(&mut self) -> Result<(), String> {
    match self.0.pop() {
      Some(_) => Ok(()),
      None => Err("Data set path is empty".to_string()),
    }
  }

  /// Parses a data set path from a string, e.g. `"0008,1111/[0]/0010,0010"`.
  ///
  pub fn from_string(s: &str) -> Result<Self, String> {
    let mut path = DataSetPath::new();

    if s.is_empty() {
      return Ok(path);
    }

    for entry in s.split('/') {
      if let Some(index) = entry.strip_prefix('[') {
        let index = index
          .strip_suffix(']')
          .and_then(|index| index.parse::<usize>().ok())
          .ok_or_else(|| format!("Invalid data set path entry: {entry}"))?;

        path.add_sequence_item(index)?;
      } else {
        let tag = DataElementTag::from_string(entry)
          .map_err(|_| format!("Invalid data set path entry: {entry}"))?;

        path.add_data_element(tag)?;
      }
    }

    Ok(path)
  }

  /// Returns a detailed human-readable string for a data set path that
  /// includes data element names.
  ///
  pub fn to_detailed_string(&self) -> String {
    if self.0.is_empty() {
      return "<root data set>".to_string();
    }

    self
      .0
      .iter()
      .map(|entry| match entry {
        DataSetPathEntry::DataElement { tag } => {
          format!("{} {}", tag, dictionary::tag_name(*tag))
        }
        DataSetPathEntry::SequenceItem { index } => {
          format!("Item {index}")
        }
      })
      .collect::<Vec<String>>()
      .join(" / ")
  }
}

impl core::fmt::Display for DataSetPath {
  fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
    let s = self
      .0
      .iter()
      .map(|entry| match entry {
        DataSetPathEntry::DataElement { tag } => tag.to_string(),
        DataSetPathEntry::SequenceItem { index } => format!("[{index}]"),
      })
      .collect::<Vec<String>>()
      .join("/");

    write!(f, "{s}")
  }
}
