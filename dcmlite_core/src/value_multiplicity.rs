//! DICOM value multiplicity (VM).

/// Describes DICOM value multiplicity, i.e. the number of values that are
/// allowed to be present in a data element. The `min` value is always at least
/// 1, and the maximum (if applicable) will always be greater than or equal to
/// `min`.
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ValueMultiplicity {
  pub min: u32,
  pub max: Option<u32>,
}

impl ValueMultiplicity {
  /// A value multiplicity of exactly one.
  ///
  pub const ONE: ValueMultiplicity = ValueMultiplicity {
    min: 1,
    max: Some(1),
  };

  /// A value multiplicity of one or more.
  ///
  pub const ONE_TO_MANY: ValueMultiplicity =
    ValueMultiplicity { min: 1, max: None };

  /// Returns whether the given value lies in the range specified by this value
  /// multiplicity.
  ///
  pub fn contains(&self, n: usize) -> bool {
    n >= self.min as usize && n <= self.max.unwrap_or(u32::MAX) as usize
  }

  /// Parses a value multiplicity from its dictionary string form, e.g. `"1"`,
  /// `"1-3"`, `"2-n"`.
  ///
  #[allow(clippy::result_unit_err)]
  pub fn from_string(s: &str) -> Result<Self, ()> {
    match s.split_once('-') {
      None => {
        let n = s.parse::<u32>().map_err(|_| ())?;
        Ok(ValueMultiplicity {
          min: n,
          max: Some(n),
        })
      }

      Some((min, max)) => {
        let min = min.parse::<u32>().map_err(|_| ())?;

        let max = if max == "n" || max.ends_with('n') {
          None
        } else {
          Some(max.parse::<u32>().map_err(|_| ())?)
        };

        Ok(ValueMultiplicity { min, max })
      }
    }
  }
}

impl core::fmt::Display for ValueMultiplicity {
  /// Returns a value multiplicity as a human-readable string, e.g. "1-3", or
  /// "2-n".
  ///
  fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
    if self.min == 1 && self.max == Some(1) {
      return write!(f, "1");
    }

    let max = match self.max {
      Some(max) => max.to_string(),
      None => "n".to_string(),
    };

    write!(f, "{}-{}", self.min, max)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn from_string_test() {
    assert_eq!(
      ValueMultiplicity::from_string("1"),
      Ok(ValueMultiplicity::ONE)
    );

    assert_eq!(
      ValueMultiplicity::from_string("1-3"),
      Ok(ValueMultiplicity {
        min: 1,
        max: Some(3)
      })
    );

    assert_eq!(
      ValueMultiplicity::from_string("2-n"),
      Ok(ValueMultiplicity { min: 2, max: None })
    );

    assert_eq!(
      ValueMultiplicity::from_string("2-2n"),
      Ok(ValueMultiplicity { min: 2, max: None })
    );

    assert_eq!(ValueMultiplicity::from_string("x"), Err(()));
  }

  #[test]
  fn to_string_test() {
    assert_eq!(ValueMultiplicity::ONE.to_string(), "1");

    assert_eq!(
      ValueMultiplicity {
        min: 1,
        max: Some(3)
      }
      .to_string(),
      "1-3"
    );

    assert_eq!(ValueMultiplicity::ONE_TO_MANY.to_string(), "1-n");
  }
}
