//! The value length field of a DICOM data element header.

/// The length of a data element value, which is either a defined number of
/// bytes or undefined. Undefined lengths are stored on the wire as
/// `0xFFFFFFFF` and are terminated by a delimitation item.
///
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValueLength {
  Defined { length: u32 },
  Undefined,
}

impl ValueLength {
  /// A defined value length of zero.
  ///
  pub const ZERO: ValueLength = ValueLength::Defined { length: 0 };

  /// Creates a value length from the raw `u32` stored in a data element
  /// header.
  ///
  pub fn new(length: u32) -> Self {
    match length {
      0xFFFFFFFF => ValueLength::Undefined,
      length => ValueLength::Defined { length },
    }
  }

  /// Returns the raw `u32` for this value length as stored in a data element
  /// header.
  ///
  pub fn to_u32(&self) -> u32 {
    match self {
      ValueLength::Defined { length } => *length,
      ValueLength::Undefined => 0xFFFFFFFF,
    }
  }
}

impl core::fmt::Display for ValueLength {
  fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
    match self {
      ValueLength::Defined { length } => write!(f, "{length} bytes"),
      ValueLength::Undefined => write!(f, "undefined"),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn new_test() {
    assert_eq!(
      ValueLength::new(0x1234),
      ValueLength::Defined { length: 0x1234 }
    );

    assert_eq!(ValueLength::new(0xFFFFFFFF), ValueLength::Undefined);
  }

  #[test]
  fn to_u32_test() {
    assert_eq!(ValueLength::new(0x1234).to_u32(), 0x1234);

    assert_eq!(ValueLength::Undefined.to_u32(), 0xFFFFFFFF);
  }
}
