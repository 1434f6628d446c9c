use dcmlite_core::{DataElementTag, ValueRepresentation, dictionary};

use crate::internal::value_length::ValueLength;

/// Describes the header for a single DICOM data element, specifically its tag,
/// VR, and length. The VR is optional because some data elements, e.g.
/// sequence delimiters and sequence item delimiters, don't have a VR.
///
pub struct DataElementHeader {
  pub tag: DataElementTag,
  pub vr: Option<ValueRepresentation>,
  pub length: ValueLength,
}

impl core::fmt::Display for DataElementHeader {
  /// Converts a data element header to a human-readable string in the format
  /// "GROUP,ELEMENT VR NAME", e.g. `"0008,0020 DA Study Date"`.
  ///
  fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
    let tag_name = dictionary::tag_name(self.tag);

    match self.vr {
      Some(vr) => write!(f, "{} {} {}", self.tag, vr, tag_name),
      _ => write!(f, "{} {}", self.tag, tag_name),
    }
  }
}

/// The two possibilities for the size of the value length for a VR stored in
/// the DICOM P10 format.
///
pub enum ValueLengthSize {
  U16,
  U32,
}

impl DataElementHeader {
  /// Returns the size of the value length for a VR stored in the DICOM P10
  /// format. The `OB`, `OF`, `OW`, `SQ`, `UN`, and `UT` VRs use a 32-bit
  /// length preceded by two reserved bytes; all other VRs use a 16-bit
  /// length.
  ///
  pub fn value_length_size(vr: ValueRepresentation) -> ValueLengthSize {
    match vr {
      ValueRepresentation::OtherByteString
      | ValueRepresentation::OtherFloatString
      | ValueRepresentation::OtherWordString
      | ValueRepresentation::Sequence
      | ValueRepresentation::Unknown
      | ValueRepresentation::UnlimitedText => ValueLengthSize::U32,

      _ => ValueLengthSize::U16,
    }
  }
}
