//! A location used by a DICOM P10 read context to track where in the
//! hierarchy of sequences and items the DICOM P10 read is up to.
//!
//! The following are tracked in the location during a DICOM P10 read:
//!
//! 1. The end offset of defined-length sequences and items that need to have
//!    a delimiter emitted. This allows defined lengths to be changed to
//!    undefined lengths.
//!
//! 2. Sequences read under forced 'Implicit VR Little Endian' because they
//!    were declared with an explicit VR of `UN` (Unknown) and an undefined
//!    length. Ref: DICOM Correction Proposal CP-246.

use dcmlite_core::DataElementTag;

use crate::P10Token;
use crate::internal::value_length::ValueLength;

/// A P10 location is a list of location entries, with the current/most
/// recently added one at the end of the vector.
///
#[derive(Debug)]
pub struct P10Location {
  entries: Vec<LocationEntry>,
}

/// An entry in a P10 location. A root data set entry always appears exactly
/// once at the start, and can then be followed by sequences, each containing
/// nested lists of items that can themselves contain sequences.
///
#[derive(Debug)]
enum LocationEntry {
  RootDataSet,
  Sequence {
    tag: DataElementTag,
    is_implicit_vr: bool,
    ends_at: Option<u64>,
    item_count: usize,
  },
  Item {
    ends_at: Option<u64>,
  },
}

impl P10Location {
  /// Creates a new P10 location with an initial entry for the root data set.
  ///
  pub fn new() -> Self {
    Self {
      entries: vec![LocationEntry::RootDataSet],
    }
  }

  /// Returns the current sequence/item nesting depth.
  ///
  pub fn sequence_depth(&self) -> usize {
    self
      .entries
      .iter()
      .filter(|entry| matches!(entry, LocationEntry::Sequence { .. }))
      .count()
  }

  /// Returns whether there is a sequence in the location that has forced the
  /// use of the 'Implicit VR Little Endian' transfer syntax. This occurs when
  /// there is an explicit VR of `UN` (Unknown) that has an undefined length.
  ///
  /// Ref: DICOM Correction Proposal CP-246.
  ///
  pub fn is_implicit_vr_forced(&self) -> bool {
    self.entries.iter().any(|l| {
      matches!(
        l,
        LocationEntry::Sequence {
          is_implicit_vr: true,
          ..
        }
      )
    })
  }

  /// Returns the next delimiter token for a location. This checks the
  /// `ends_at` value of the entry at the head of the location to see if the
  /// bytes read has met or exceeded it, and if it has then the relevant
  /// delimiter token is returned.
  ///
  /// This is part of the conversion of defined-length sequences and items to
  /// use undefined lengths.
  ///
  #[allow(clippy::result_unit_err)]
  pub fn next_delimiter_token(
    &mut self,
    bytes_read: u64,
  ) -> Result<P10Token, ()> {
    match self.entries.last() {
      Some(LocationEntry::Sequence {
        tag,
        ends_at: Some(ends_at),
        ..
      }) if *ends_at <= bytes_read => {
        let tag = *tag;
        self.entries.pop();
        Ok(P10Token::SequenceDelimiter { tag })
      }

      Some(LocationEntry::Item {
        ends_at: Some(ends_at),
      }) if *ends_at <= bytes_read => {
        self.entries.pop();
        Ok(P10Token::SequenceItemDelimiter)
      }

      _ => Err(()),
    }
  }

  /// Returns all pending delimiter tokens for a location, regardless of
  /// whether their `ends_at` offset has been reached. Used to close out any
  /// active sequences and items when the end of the stream is reached.
  ///
  pub fn pending_delimiter_tokens(&self) -> Vec<P10Token> {
    self
      .entries
      .iter()
      .rev()
      .map(|entry| match entry {
        LocationEntry::Sequence { tag, .. } => {
          P10Token::SequenceDelimiter { tag: *tag }
        }
        LocationEntry::Item { .. } => P10Token::SequenceItemDelimiter,
        LocationEntry::RootDataSet => P10Token::End,
      })
      .collect()
  }

  /// Adds a new sequence to a P10 location.
  ///
  pub fn add_sequence(
    &mut self,
    tag: DataElementTag,
    is_implicit_vr: bool,
    ends_at: Option<u64>,
  ) -> Result<(), String> {
    match self.entries.last() {
      Some(LocationEntry::RootDataSet) | Some(LocationEntry::Item { .. }) => {
        self.entries.push(LocationEntry::Sequence {
          tag,
          is_implicit_vr,
          ends_at,
          item_count: 0,
        });

        Ok(())
      }

      _ => Err(format!(
        "Sequence data element '{tag}' encountered outside of the root data \
         set or an item"
      )),
    }
  }

  /// Ends the current sequence for a P10 location.
  ///
  pub fn end_sequence(&mut self) -> Result<DataElementTag, String> {
    match self.entries.last() {
      Some(LocationEntry::Sequence { tag, .. }) => {
        let tag = *tag;
        self.entries.pop();
        Ok(tag)
      }

      _ => {
        Err("Sequence delimiter encountered outside of a sequence".to_string())
      }
    }
  }

  /// Adds a new item to a P10 location. The index of the new item is
  /// returned.
  ///
  pub fn add_item(
    &mut self,
    ends_at: Option<u64>,
    length: ValueLength,
  ) -> Result<usize, String> {
    match self.entries.last_mut() {
      Some(LocationEntry::Sequence { item_count, .. }) => {
        let index = *item_count;

        *item_count += 1;

        self.entries.push(LocationEntry::Item { ends_at });

        Ok(index)
      }

      _ => Err(format!(
        "Item encountered outside of a sequence, length: {length}",
      )),
    }
  }

  /// Ends the current item for a P10 location.
  ///
  pub fn end_item(&mut self) -> Result<(), String> {
    match self.entries.last() {
      Some(LocationEntry::Item { .. }) => {
        self.entries.pop();
        Ok(())
      }

      _ => Err("Item delimiter encountered outside of an item".to_string()),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn sequence_and_item_nesting_test() {
    let mut location = P10Location::new();
    let tag = DataElementTag::new(0x0008, 0x1111);

    assert_eq!(location.add_sequence(tag, false, None), Ok(()));
    assert_eq!(location.sequence_depth(), 1);

    assert_eq!(location.add_item(None, ValueLength::Undefined), Ok(0));
    assert!(location.add_item(None, ValueLength::Undefined).is_err());

    assert_eq!(location.end_item(), Ok(()));
    assert_eq!(location.add_item(None, ValueLength::Undefined), Ok(1));
    assert_eq!(location.end_item(), Ok(()));

    assert_eq!(location.end_sequence(), Ok(tag));
    assert!(location.end_sequence().is_err());
  }

  #[test]
  fn implicit_vr_forced_test() {
    let mut location = P10Location::new();

    location
      .add_sequence(DataElementTag::new(0x0008, 0x1111), true, None)
      .unwrap();

    assert!(location.is_implicit_vr_forced());

    location.end_sequence().unwrap();

    assert!(!location.is_implicit_vr_forced());
  }

  #[test]
  fn next_delimiter_token_test() {
    let mut location = P10Location::new();
    let tag = DataElementTag::new(0x0008, 0x1111);

    location.add_sequence(tag, false, Some(100)).unwrap();

    assert_eq!(location.next_delimiter_token(99), Err(()));
    assert_eq!(
      location.next_delimiter_token(100),
      Ok(P10Token::SequenceDelimiter { tag })
    );
  }

  #[test]
  fn pending_delimiter_tokens_test() {
    let mut location = P10Location::new();
    let tag = DataElementTag::new(0x0008, 0x1111);

    location.add_sequence(tag, false, None).unwrap();
    location.add_item(None, ValueLength::Undefined).unwrap();

    assert_eq!(
      location.pending_delimiter_tokens(),
      vec![
        P10Token::SequenceItemDelimiter,
        P10Token::SequenceDelimiter { tag },
        P10Token::End,
      ]
    );
  }
}
