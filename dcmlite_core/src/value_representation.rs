//! DICOM value representations (VRs).
//!
//! See [section 6.2](https://dicom.nema.org/medical/dicom/current/output/chtml/part05/sect_6.2.html)
//! of the DICOM specification for VR definitions.

/// All DICOM value representations (VRs) supported by this library.
///
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ValueRepresentation {
  AgeString,
  ApplicationEntity,
  AttributeTag,
  CodeString,
  Date,
  DateTime,
  DecimalString,
  FloatingPointDouble,
  FloatingPointSingle,
  IntegerString,
  LongString,
  LongText,
  OtherByteString,
  OtherFloatString,
  OtherWordString,
  PersonName,
  Sequence,
  ShortString,
  ShortText,
  SignedLong,
  SignedShort,
  Time,
  UniqueIdentifier,
  Unknown,
  UnlimitedText,
  UnsignedLong,
  UnsignedShort,
}

/// The restrictions that apply to the length of a value representation's data.
/// These restrictions are defined by the DICOM specification, and are only
/// enforced when creating new values.
///
#[derive(Debug, PartialEq)]
pub struct LengthRequirements {
  pub bytes_max: usize,
  pub bytes_multiple_of: Option<usize>,
}

impl std::fmt::Display for ValueRepresentation {
  fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
    let bytes = self.to_bytes();
    f.write_str(unsafe { std::str::from_utf8_unchecked(&bytes) })
  }
}

impl ValueRepresentation {
  /// Converts a two-character string, e.g. "DA", into a value representation.
  ///
  #[allow(clippy::result_unit_err)]
  pub fn from_bytes(bytes: &[u8]) -> Result<Self, ()> {
    match bytes {
      b"AE" => Ok(ValueRepresentation::ApplicationEntity),
      b"AS" => Ok(ValueRepresentation::AgeString),
      b"AT" => Ok(ValueRepresentation::AttributeTag),
      b"CS" => Ok(ValueRepresentation::CodeString),
      b"DA" => Ok(ValueRepresentation::Date),
      b"DS" => Ok(ValueRepresentation::DecimalString),
      b"DT" => Ok(ValueRepresentation::DateTime),
      b"FD" => Ok(ValueRepresentation::FloatingPointDouble),
      b"FL" => Ok(ValueRepresentation::FloatingPointSingle),
      b"IS" => Ok(ValueRepresentation::IntegerString),
      b"LO" => Ok(ValueRepresentation::LongString),
      b"LT" => Ok(ValueRepresentation::LongText),
      b"OB" => Ok(ValueRepresentation::OtherByteString),
      b"OF" => Ok(ValueRepresentation::OtherFloatString),
      b"OW" => Ok(ValueRepresentation::OtherWordString),
      b"PN" => Ok(ValueRepresentation::PersonName),
      b"SH" => Ok(ValueRepresentation::ShortString),
      b"SL" => Ok(ValueRepresentation::SignedLong),
      b"SQ" => Ok(ValueRepresentation::Sequence),
      b"SS" => Ok(ValueRepresentation::SignedShort),
      b"ST" => Ok(ValueRepresentation::ShortText),
      b"TM" => Ok(ValueRepresentation::Time),
      b"UI" => Ok(ValueRepresentation::UniqueIdentifier),
      b"UL" => Ok(ValueRepresentation::UnsignedLong),
      b"UN" => Ok(ValueRepresentation::Unknown),
      b"US" => Ok(ValueRepresentation::UnsignedShort),
      b"UT" => Ok(ValueRepresentation::UnlimitedText),

      _ => Err(()),
    }
  }

  /// Converts a value representation to its two-byte character representation.
  ///
  pub fn to_bytes(&self) -> [u8; 2] {
    *match self {
      ValueRepresentation::AgeString => b"AS",
      ValueRepresentation::ApplicationEntity => b"AE",
      ValueRepresentation::AttributeTag => b"AT",
      ValueRepresentation::CodeString => b"CS",
      ValueRepresentation::Date => b"DA",
      ValueRepresentation::DateTime => b"DT",
      ValueRepresentation::DecimalString => b"DS",
      ValueRepresentation::FloatingPointDouble => b"FD",
      ValueRepresentation::FloatingPointSingle => b"FL",
      ValueRepresentation::IntegerString => b"IS",
      ValueRepresentation::LongString => b"LO",
      ValueRepresentation::LongText => b"LT",
      ValueRepresentation::OtherByteString => b"OB",
      ValueRepresentation::OtherFloatString => b"OF",
      ValueRepresentation::OtherWordString => b"OW",
      ValueRepresentation::PersonName => b"PN",
      ValueRepresentation::Sequence => b"SQ",
      ValueRepresentation::ShortString => b"SH",
      ValueRepresentation::ShortText => b"ST",
      ValueRepresentation::SignedLong => b"SL",
      ValueRepresentation::SignedShort => b"SS",
      ValueRepresentation::Time => b"TM",
      ValueRepresentation::UniqueIdentifier => b"UI",
      ValueRepresentation::Unknown => b"UN",
      ValueRepresentation::UnlimitedText => b"UT",
      ValueRepresentation::UnsignedLong => b"UL",
      ValueRepresentation::UnsignedShort => b"US",
    }
  }

  /// Returns the human-readable name of a value representation, e.g.
  /// `CodeString`, `AttributeTag`.
  ///
  pub fn name(&self) -> &str {
    match self {
      ValueRepresentation::AgeString => "AgeString",
      ValueRepresentation::ApplicationEntity => "ApplicationEntity",
      ValueRepresentation::AttributeTag => "AttributeTag",
      ValueRepresentation::CodeString => "CodeString",
      ValueRepresentation::Date => "Date",
      ValueRepresentation::DateTime => "DateTime",
      ValueRepresentation::DecimalString => "DecimalString",
      ValueRepresentation::FloatingPointDouble => "FloatingPointDouble",
      ValueRepresentation::FloatingPointSingle => "FloatingPointSingle",
      ValueRepresentation::IntegerString => "IntegerString",
      ValueRepresentation::LongString => "LongString",
      ValueRepresentation::LongText => "LongText",
      ValueRepresentation::OtherByteString => "OtherByteString",
      ValueRepresentation::OtherFloatString => "OtherFloatString",
      ValueRepresentation::OtherWordString => "OtherWordString",
      ValueRepresentation::PersonName => "PersonName",
      ValueRepresentation::Sequence => "Sequence",
      ValueRepresentation::ShortString => "ShortString",
      ValueRepresentation::ShortText => "ShortText",
      ValueRepresentation::SignedLong => "SignedLong",
      ValueRepresentation::SignedShort => "SignedShort",
      ValueRepresentation::Time => "Time",
      ValueRepresentation::UniqueIdentifier => "UniqueIdentifier",
      ValueRepresentation::Unknown => "Unknown",
      ValueRepresentation::UnlimitedText => "UnlimitedText",
      ValueRepresentation::UnsignedLong => "UnsignedLong",
      ValueRepresentation::UnsignedShort => "UnsignedShort",
    }
  }

  /// Returns whether a value representation stores string data.
  ///
  pub fn is_string(self) -> bool {
    self == ValueRepresentation::AgeString
      || self == ValueRepresentation::ApplicationEntity
      || self == ValueRepresentation::CodeString
      || self == ValueRepresentation::Date
      || self == ValueRepresentation::DateTime
      || self == ValueRepresentation::DecimalString
      || self == ValueRepresentation::IntegerString
      || self == ValueRepresentation::LongString
      || self == ValueRepresentation::LongText
      || self == ValueRepresentation::PersonName
      || self == ValueRepresentation::ShortString
      || self == ValueRepresentation::ShortText
      || self == ValueRepresentation::Time
      || self == ValueRepresentation::UniqueIdentifier
      || self == ValueRepresentation::UnlimitedText
  }

  /// Returns whether a value representation stores string data that allows
  /// multiple values separated by the backslash character.
  ///
  pub fn is_multi_valued_string(self) -> bool {
    self == ValueRepresentation::AgeString
      || self == ValueRepresentation::ApplicationEntity
      || self == ValueRepresentation::CodeString
      || self == ValueRepresentation::Date
      || self == ValueRepresentation::DateTime
      || self == ValueRepresentation::DecimalString
      || self == ValueRepresentation::IntegerString
      || self == ValueRepresentation::LongString
      || self == ValueRepresentation::PersonName
      || self == ValueRepresentation::ShortString
      || self == ValueRepresentation::Time
      || self == ValueRepresentation::UniqueIdentifier
  }

  /// The byte used to pad values of this VR to an even length: a space for
  /// string data, a zero byte for everything else, including
  /// `UniqueIdentifier`.
  ///
  pub fn pad_byte(self) -> u8 {
    if self.is_string() && self != ValueRepresentation::UniqueIdentifier {
      0x20
    } else {
      0x00
    }
  }

  /// Appends the correct padding byte for the given value representation if
  /// the bytes are not of even length.
  ///
  pub fn pad_bytes_to_even_length(self, bytes: &mut Vec<u8>) {
    if bytes.len() % 2 == 1 {
      bytes.push(self.pad_byte());
    }
  }

  /// Returns the length requirements for a value representation.
  ///
  pub fn length_requirements(self) -> LengthRequirements {
    match self {
      ValueRepresentation::AgeString => LengthRequirements {
        bytes_max: 4,
        bytes_multiple_of: None,
      },
      ValueRepresentation::ApplicationEntity => LengthRequirements {
        bytes_max: 16,
        bytes_multiple_of: None,
      },
      ValueRepresentation::AttributeTag => LengthRequirements {
        bytes_max: 0xFFFC,
        bytes_multiple_of: Some(4),
      },
      ValueRepresentation::CodeString
      | ValueRepresentation::DecimalString
      | ValueRepresentation::IntegerString
      | ValueRepresentation::LongString
      | ValueRepresentation::LongText
      | ValueRepresentation::PersonName
      | ValueRepresentation::ShortString
      | ValueRepresentation::ShortText
      | ValueRepresentation::UniqueIdentifier => LengthRequirements {
        bytes_max: 0xFFFE,
        bytes_multiple_of: None,
      },
      ValueRepresentation::Date => LengthRequirements {
        bytes_max: 8,
        bytes_multiple_of: None,
      },
      ValueRepresentation::DateTime => LengthRequirements {
        bytes_max: 26,
        bytes_multiple_of: None,
      },
      ValueRepresentation::FloatingPointDouble => LengthRequirements {
        bytes_max: 0xFFF8,
        bytes_multiple_of: Some(8),
      },
      ValueRepresentation::FloatingPointSingle => LengthRequirements {
        bytes_max: 0xFFFC,
        bytes_multiple_of: Some(4),
      },
      ValueRepresentation::OtherByteString
      | ValueRepresentation::OtherWordString => LengthRequirements {
        bytes_max: 0xFFFFFFFE,
        bytes_multiple_of: Some(2),
      },
      ValueRepresentation::OtherFloatString => LengthRequirements {
        bytes_max: 0xFFFFFFFC,
        bytes_multiple_of: Some(4),
      },
      ValueRepresentation::Sequence => LengthRequirements {
        bytes_max: 0,
        bytes_multiple_of: None,
      },
      ValueRepresentation::SignedLong => LengthRequirements {
        bytes_max: 0xFFFC,
        bytes_multiple_of: Some(4),
      },
      ValueRepresentation::SignedShort => LengthRequirements {
        bytes_max: 0xFFFE,
        bytes_multiple_of: Some(2),
      },
      ValueRepresentation::Time => LengthRequirements {
        bytes_max: 14,
        bytes_multiple_of: None,
      },
      ValueRepresentation::Unknown | ValueRepresentation::UnlimitedText => {
        LengthRequirements {
          bytes_max: 0xFFFFFFFE,
          bytes_multiple_of: None,
        }
      }
      ValueRepresentation::UnsignedLong => LengthRequirements {
        bytes_max: 0xFFFC,
        bytes_multiple_of: Some(4),
      },
      ValueRepresentation::UnsignedShort => LengthRequirements {
        bytes_max: 0xFFFE,
        bytes_multiple_of: Some(2),
      },
    }
  }

  /// Swaps the endianness of data for a value representation.
  ///
  pub fn swap_endianness(self, bytes: &mut [u8]) {
    match self {
      ValueRepresentation::AttributeTag
      | ValueRepresentation::OtherWordString
      | ValueRepresentation::SignedShort
      | ValueRepresentation::UnsignedShort => {
        for i in 0..(bytes.len() / 2) {
          bytes.swap(i * 2, i * 2 + 1);
        }
      }

      ValueRepresentation::FloatingPointSingle
      | ValueRepresentation::OtherFloatString
      | ValueRepresentation::SignedLong
      | ValueRepresentation::UnsignedLong => {
        for i in 0..(bytes.len() / 4) {
          bytes.swap(i * 4, i * 4 + 3);
          bytes.swap(i * 4 + 1, i * 4 + 2);
        }
      }

      ValueRepresentation::FloatingPointDouble => {
        for i in 0..(bytes.len() / 8) {
          bytes.swap(i * 8, i * 8 + 7);
          bytes.swap(i * 8 + 1, i * 8 + 6);
          bytes.swap(i * 8 + 2, i * 8 + 5);
          bytes.swap(i * 8 + 3, i * 8 + 4);
        }
      }

      _ => (),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const ALL_VRS: [(ValueRepresentation, &'static str, &'static str); 27] = [
    (ValueRepresentation::AgeString, "AS", "AgeString"),
    (
      ValueRepresentation::ApplicationEntity,
      "AE",
      "ApplicationEntity",
    ),
    (ValueRepresentation::AttributeTag, "AT", "AttributeTag"),
    (ValueRepresentation::CodeString, "CS", "CodeString"),
    (ValueRepresentation::Date, "DA", "Date"),
    (ValueRepresentation::DateTime, "DT", "DateTime"),
    (ValueRepresentation::DecimalString, "DS", "DecimalString"),
    (
      ValueRepresentation::FloatingPointDouble,
      "FD",
      "FloatingPointDouble",
    ),
    (
      ValueRepresentation::FloatingPointSingle,
      "FL",
      "FloatingPointSingle",
    ),
    (ValueRepresentation::IntegerString, "IS", "IntegerString"),
    (ValueRepresentation::LongString, "LO", "LongString"),
    (ValueRepresentation::LongText, "LT", "LongText"),
    (
      ValueRepresentation::OtherByteString,
      "OB",
      "OtherByteString",
    ),
    (
      ValueRepresentation::OtherFloatString,
      "OF",
      "OtherFloatString",
    ),
    (
      ValueRepresentation::OtherWordString,
      "OW",
      "OtherWordString",
    ),
    (ValueRepresentation::PersonName, "PN", "PersonName"),
    (ValueRepresentation::Sequence, "SQ", "Sequence"),
    (ValueRepresentation::ShortString, "SH", "ShortString"),
    (ValueRepresentation::ShortText, "ST", "ShortText"),
    (ValueRepresentation::SignedLong, "SL", "SignedLong"),
    (ValueRepresentation::SignedShort, "SS", "SignedShort"),
    (ValueRepresentation::Time, "TM", "Time"),
    (
      ValueRepresentation::UniqueIdentifier,
      "UI",
      "UniqueIdentifier",
    ),
    (ValueRepresentation::Unknown, "UN", "Unknown"),
    (ValueRepresentation::UnlimitedText, "UT", "UnlimitedText"),
    (ValueRepresentation::UnsignedLong, "UL", "UnsignedLong"),
    (ValueRepresentation::UnsignedShort, "US", "UnsignedShort"),
  ];

  #[test]
  fn from_bytes_test() {
    for (vr, s, _) in ALL_VRS {
      assert_eq!(ValueRepresentation::from_bytes(s.as_bytes()), Ok(vr));
    }

    assert_eq!(ValueRepresentation::from_bytes(b"XY"), Err(()));
  }

  #[test]
  fn to_string_test() {
    for (vr, s, _) in ALL_VRS {
      assert_eq!(vr.to_string(), s);
    }
  }

  #[test]
  fn name_test() {
    for (vr, _, name) in ALL_VRS {
      assert_eq!(vr.name(), name);
    }
  }

  #[test]
  fn pad_bytes_to_even_length_test() {
    let mut bytes = vec![];
    ValueRepresentation::LongText.pad_bytes_to_even_length(&mut bytes);
    assert_eq!(bytes, vec![]);

    let mut bytes = vec![0x41];
    ValueRepresentation::LongText.pad_bytes_to_even_length(&mut bytes);
    assert_eq!(bytes, vec![0x41, 0x20]);

    let mut bytes = vec![0x41];
    ValueRepresentation::UniqueIdentifier.pad_bytes_to_even_length(&mut bytes);
    assert_eq!(bytes, vec![0x41, 0x00]);

    let mut bytes = vec![0x41];
    ValueRepresentation::OtherByteString.pad_bytes_to_even_length(&mut bytes);
    assert_eq!(bytes, vec![0x41, 0x00]);

    let mut bytes = vec![0x41, 0x42];
    ValueRepresentation::LongText.pad_bytes_to_even_length(&mut bytes);
    assert_eq!(bytes, vec![0x41, 0x42]);
  }

  #[test]
  fn swap_endianness_test() {
    let mut bytes = [0, 1, 2, 3];
    ValueRepresentation::SignedShort.swap_endianness(&mut bytes);
    assert_eq!(bytes, [1, 0, 3, 2]);

    let mut bytes = [0, 1, 2, 3, 4, 5, 6, 7];
    ValueRepresentation::SignedLong.swap_endianness(&mut bytes);
    assert_eq!(bytes, [3, 2, 1, 0, 7, 6, 5, 4]);

    let mut bytes = [0, 1, 2, 3, 4, 5, 6, 7];
    ValueRepresentation::FloatingPointDouble.swap_endianness(&mut bytes);
    assert_eq!(bytes, [7, 6, 5, 4, 3, 2, 1, 0]);

    let mut bytes = [0, 1, 2, 3];
    ValueRepresentation::OtherByteString.swap_endianness(&mut bytes);
    assert_eq!(bytes, [0, 1, 2, 3]);
  }
}
