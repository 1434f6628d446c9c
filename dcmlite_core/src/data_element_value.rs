//! A data element value that can hold any of the DICOM value representations.
//! Data element values are usually stored in a [`DataSet`] which maps data
//! element tags to data element values.

use std::sync::Arc;

use byteorder::ByteOrder;

use crate::{DataError, DataSet, ValueRepresentation};

/// A DICOM data element value that holds one of the following types of data:
///
/// 1. Binary value. A data element value that holds raw bytes for a specific
///    VR. This is the most common case. The bytes of multi-valued string VRs
///    contain the individual values separated by the backslash character. The
///    data is always little endian and is always of even length.
///
/// 2. Encapsulated pixel data value. A data element value that holds the raw
///    items for an encapsulated pixel data sequence. The first item is the
///    basic offset table, which is allowed to be empty, and each following
///    item holds one compressed fragment. The VR must be either
///    [`ValueRepresentation::OtherByteString`] or
///    [`ValueRepresentation::OtherWordString`]. Fragments are never decoded.
///
/// 3. Sequence value. A data element value that holds a sequence, which is a
///    list of nested data sets used to create hierarchies of data elements in
///    a DICOM data set.
///
/// Binary data is stored in an [`Arc<Vec<u8>>`] and parsed into a more usable
/// type on request. This keeps clones cheap, allows data sets to move between
/// threads, and allows non-conformant data to be passed through unaltered,
/// which is a common occurrence.
///
/// Ref: PS3.5 6.2.
///
#[derive(Clone, Debug, PartialEq)]
pub struct DataElementValue(RawDataElementValue);

#[derive(Clone, Debug, PartialEq)]
#[allow(clippy::enum_variant_names)]
enum RawDataElementValue {
  BinaryValue {
    vr: ValueRepresentation,
    bytes: Arc<Vec<u8>>,
  },
  EncapsulatedPixelDataValue {
    vr: ValueRepresentation,
    items: Vec<Arc<Vec<u8>>>,
  },
  SequenceValue {
    items: Vec<DataSet>,
  },
}

impl DataElementValue {
  /// Creates a new binary data element value with the given VR. The bytes are
  /// padded to an even length with the VR's pad byte, and are validated
  /// against the VR's length requirements.
  ///
  pub fn new_binary(
    vr: ValueRepresentation,
    mut bytes: Vec<u8>,
  ) -> Result<Self, DataError> {
    if vr == ValueRepresentation::Sequence {
      return Err(DataError::new_value_invalid(
        "Binary value must not have the SQ VR".to_string(),
      ));
    }

    vr.pad_bytes_to_even_length(&mut bytes);

    let length_requirements = vr.length_requirements();

    if bytes.len() > length_requirements.bytes_max {
      return Err(DataError::new_value_length_invalid(
        vr,
        bytes.len() as u64,
        format!(
          "Must not exceed {} bytes",
          length_requirements.bytes_max
        ),
      ));
    }

    if let Some(multiple_of) = length_requirements.bytes_multiple_of {
      if bytes.len() % multiple_of != 0 {
        return Err(DataError::new_value_length_invalid(
          vr,
          bytes.len() as u64,
          format!("Must be a multiple of {multiple_of} bytes"),
        ));
      }
    }

    Ok(Self::new_binary_unchecked(vr, Arc::new(bytes)))
  }

  /// Creates a new binary data element value with the given VR, without any
  /// validation of the bytes. Used when the bytes come off an incoming stream
  /// and must be passed through exactly as they are.
  ///
  pub fn new_binary_unchecked(
    vr: ValueRepresentation,
    bytes: Arc<Vec<u8>>,
  ) -> Self {
    Self(RawDataElementValue::BinaryValue { vr, bytes })
  }

  /// Creates a new string data element value with the given VR. Multiple
  /// values are joined with the backslash character, which is only valid for
  /// VRs that support multiplicity.
  ///
  pub fn new_string(
    vr: ValueRepresentation,
    values: &[&str],
  ) -> Result<Self, DataError> {
    if !vr.is_string() {
      return Err(DataError::new_value_invalid(format!(
        "String value is not valid for the {vr} VR"
      )));
    }

    if values.len() > 1 && !vr.is_multi_valued_string() {
      return Err(DataError::new_multiplicity_mismatch());
    }

    if values.iter().any(|value| value.contains('\\')) {
      return Err(DataError::new_value_invalid(
        "String value contains backslashes".to_string(),
      ));
    }

    Self::new_binary(vr, values.join("\\").into_bytes())
  }

  /// Creates a new data element value holding a sequence of items.
  ///
  pub fn new_sequence(items: Vec<DataSet>) -> Self {
    Self(RawDataElementValue::SequenceValue { items })
  }

  /// Creates a new data element value holding encapsulated pixel data items.
  /// The VR must be `OB` or `OW` and every item must be of even length.
  ///
  pub fn new_encapsulated_pixel_data(
    vr: ValueRepresentation,
    items: Vec<Vec<u8>>,
  ) -> Result<Self, DataError> {
    if vr != ValueRepresentation::OtherByteString
      && vr != ValueRepresentation::OtherWordString
    {
      return Err(DataError::new_value_invalid(format!(
        "Encapsulated pixel data is not valid for the {vr} VR"
      )));
    }

    for item in items.iter() {
      if item.len() % 2 == 1 {
        return Err(DataError::new_value_length_invalid(
          vr,
          item.len() as u64,
          "Encapsulated pixel data item has odd length".to_string(),
        ));
      }
    }

    Ok(Self::new_encapsulated_pixel_data_unchecked(
      vr,
      items.into_iter().map(Arc::new).collect(),
    ))
  }

  /// Creates a new data element value holding encapsulated pixel data items,
  /// without any validation of the items.
  ///
  pub fn new_encapsulated_pixel_data_unchecked(
    vr: ValueRepresentation,
    items: Vec<Arc<Vec<u8>>>,
  ) -> Self {
    Self(RawDataElementValue::EncapsulatedPixelDataValue { vr, items })
  }

  /// Returns the value representation of a data element value.
  ///
  pub fn value_representation(&self) -> ValueRepresentation {
    match &self.0 {
      RawDataElementValue::BinaryValue { vr, .. }
      | RawDataElementValue::EncapsulatedPixelDataValue { vr, .. } => *vr,
      RawDataElementValue::SequenceValue { .. } => {
        ValueRepresentation::Sequence
      }
    }
  }

  /// Returns the raw bytes of a binary data element value. Returns an error
  /// for sequences and encapsulated pixel data.
  ///
  pub fn bytes(&self) -> Result<&Arc<Vec<u8>>, DataError> {
    match &self.0 {
      RawDataElementValue::BinaryValue { bytes, .. } => Ok(bytes),
      _ => Err(DataError::new_value_not_present()),
    }
  }

  /// Returns the items of an encapsulated pixel data value, in order. The
  /// first item is the basic offset table, which may be empty.
  ///
  pub fn encapsulated_pixel_data(
    &self,
  ) -> Result<&Vec<Arc<Vec<u8>>>, DataError> {
    match &self.0 {
      RawDataElementValue::EncapsulatedPixelDataValue { items, .. } => {
        Ok(items)
      }
      _ => Err(DataError::new_value_not_present()),
    }
  }

  /// Returns the compressed fragments of an encapsulated pixel data value,
  /// i.e. all items following the leading basic offset table.
  ///
  pub fn fragments(&self) -> Result<&[Arc<Vec<u8>>], DataError> {
    let items = self.encapsulated_pixel_data()?;

    match items.as_slice() {
      [] => Ok(&[]),
      [_offset_table, fragments @ ..] => Ok(fragments),
    }
  }

  /// Returns the items of a sequence value.
  ///
  pub fn sequence_items(&self) -> Result<&[DataSet], DataError> {
    match &self.0 {
      RawDataElementValue::SequenceValue { items } => Ok(items),
      _ => Err(DataError::new_value_not_present()),
    }
  }

  /// Returns the items of a sequence value for mutation.
  ///
  pub fn sequence_items_mut(&mut self) -> Result<&mut Vec<DataSet>, DataError> {
    match &mut self.0 {
      RawDataElementValue::SequenceValue { items } => Ok(items),
      _ => Err(DataError::new_value_not_present()),
    }
  }

  /// Returns the singular string value of a data element value. Errors if the
  /// value is not a string or holds multiple strings.
  ///
  pub fn get_string(&self) -> Result<&str, DataError> {
    match self.get_strings()?.as_slice() {
      [value] => Ok(*value),
      _ => Err(DataError::new_multiplicity_mismatch()),
    }
  }

  /// Returns all of the string values of a data element value, with trailing
  /// padding removed.
  ///
  pub fn get_strings(&self) -> Result<Vec<&str>, DataError> {
    match &self.0 {
      RawDataElementValue::BinaryValue { vr, bytes } if vr.is_string() => {
        let s = core::str::from_utf8(bytes).map_err(|_| {
          DataError::new_value_invalid("String is invalid UTF-8".to_string())
        })?;

        let s = s.trim_end_matches(['\u{0}', '\u{20}']);

        if vr.is_multi_valued_string() {
          Ok(s.split('\\').collect())
        } else {
          Ok(vec![s])
        }
      }

      _ => Err(DataError::new_value_not_present()),
    }
  }

  /// Returns the singular integer value of a data element value. Errors if
  /// the value is not of an integer type or holds multiple integers.
  ///
  pub fn get_int(&self) -> Result<i64, DataError> {
    match self.get_ints()?.as_slice() {
      [value] => Ok(*value),
      _ => Err(DataError::new_multiplicity_mismatch()),
    }
  }

  /// Returns all of the integer values of a data element value. Supported for
  /// the `IS`, `SL`, `SS`, `UL`, and `US` VRs.
  ///
  pub fn get_ints(&self) -> Result<Vec<i64>, DataError> {
    match &self.0 {
      RawDataElementValue::BinaryValue { vr, bytes } => match vr {
        ValueRepresentation::IntegerString => self
          .get_strings()?
          .iter()
          .filter(|s| !s.trim().is_empty())
          .map(|s| {
            s.trim().parse::<i64>().map_err(|_| {
              DataError::new_value_invalid(format!(
                "Integer string is invalid: {s}"
              ))
            })
          })
          .collect(),

        ValueRepresentation::SignedLong => Ok(
          decode_binary_values(bytes, 4)?
            .chunks_exact(4)
            .map(|chunk| byteorder::LittleEndian::read_i32(chunk) as i64)
            .collect(),
        ),

        ValueRepresentation::SignedShort => Ok(
          decode_binary_values(bytes, 2)?
            .chunks_exact(2)
            .map(|chunk| byteorder::LittleEndian::read_i16(chunk) as i64)
            .collect(),
        ),

        ValueRepresentation::UnsignedLong => Ok(
          decode_binary_values(bytes, 4)?
            .chunks_exact(4)
            .map(|chunk| byteorder::LittleEndian::read_u32(chunk) as i64)
            .collect(),
        ),

        ValueRepresentation::UnsignedShort => Ok(
          decode_binary_values(bytes, 2)?
            .chunks_exact(2)
            .map(|chunk| byteorder::LittleEndian::read_u16(chunk) as i64)
            .collect(),
        ),

        _ => Err(DataError::new_value_not_present()),
      },

      _ => Err(DataError::new_value_not_present()),
    }
  }

  /// Returns the singular floating point value of a data element value.
  ///
  pub fn get_float(&self) -> Result<f64, DataError> {
    match self.get_floats()?.as_slice() {
      [value] => Ok(*value),
      _ => Err(DataError::new_multiplicity_mismatch()),
    }
  }

  /// Returns all of the floating point values of a data element value.
  /// Supported for the `DS`, `FD`, and `FL` VRs.
  ///
  pub fn get_floats(&self) -> Result<Vec<f64>, DataError> {
    match &self.0 {
      RawDataElementValue::BinaryValue { vr, bytes } => match vr {
        ValueRepresentation::DecimalString => self
          .get_strings()?
          .iter()
          .filter(|s| !s.trim().is_empty())
          .map(|s| {
            s.trim().parse::<f64>().map_err(|_| {
              DataError::new_value_invalid(format!(
                "Decimal string is invalid: {s}"
              ))
            })
          })
          .collect(),

        ValueRepresentation::FloatingPointDouble => Ok(
          decode_binary_values(bytes, 8)?
            .chunks_exact(8)
            .map(byteorder::LittleEndian::read_f64)
            .collect(),
        ),

        ValueRepresentation::FloatingPointSingle => Ok(
          decode_binary_values(bytes, 4)?
            .chunks_exact(4)
            .map(|chunk| byteorder::LittleEndian::read_f32(chunk) as f64)
            .collect(),
        ),

        _ => Err(DataError::new_value_not_present()),
      },

      _ => Err(DataError::new_value_not_present()),
    }
  }

  /// Formats a data element value as a human-readable single line of text.
  /// Values longer than the output width are truncated with a trailing
  /// ellipsis.
  ///
  pub fn to_string(&self, output_width: usize) -> String {
    let result = match &self.0 {
      RawDataElementValue::BinaryValue { vr, bytes } if vr.is_string() => {
        match core::str::from_utf8(bytes) {
          Ok(value) => {
            format!("{:?}", value.trim_end_matches(['\u{0}', '\u{20}']))
          }
          Err(_) => "!! Invalid UTF-8 data".to_string(),
        }
      }

      RawDataElementValue::BinaryValue { .. } => {
        match (self.get_ints(), self.get_floats()) {
          (Ok(ints), _) => ints
            .iter()
            .map(|i| i.to_string())
            .collect::<Vec<String>>()
            .join("\\"),
          (_, Ok(floats)) => floats
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<String>>()
            .join("\\"),
          _ => {
            let bytes = self.bytes().unwrap();
            format!("{} bytes of binary data", bytes.len())
          }
        }
      }

      RawDataElementValue::EncapsulatedPixelDataValue { items, .. } => {
        format!("{} encapsulated pixel data items", items.len())
      }

      RawDataElementValue::SequenceValue { items } => {
        format!("{} sequence items", items.len())
      }
    };

    if result.len() > output_width {
      let mut truncated: String =
        result.chars().take(output_width.saturating_sub(2)).collect();
      truncated.push('…');
      truncated
    } else {
      result
    }
  }
}

/// Validates that binary value bytes are an exact multiple of the given value
/// size before they are decoded.
///
fn decode_binary_values(
  bytes: &Arc<Vec<u8>>,
  value_size: usize,
) -> Result<&[u8], DataError> {
  if bytes.len() % value_size != 0 {
    return Err(DataError::new_value_invalid(format!(
      "Binary value of {} bytes is not a multiple of {} bytes",
      bytes.len(),
      value_size
    )));
  }

  Ok(bytes)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn new_binary_pads_to_even_length_test() {
    let value =
      DataElementValue::new_binary(ValueRepresentation::LongString, b"ABC".to_vec())
        .unwrap();

    assert_eq!(value.bytes().unwrap().as_slice(), b"ABC ");

    let value = DataElementValue::new_binary(
      ValueRepresentation::UniqueIdentifier,
      b"1.2.3".to_vec(),
    )
    .unwrap();

    assert_eq!(value.bytes().unwrap().as_slice(), b"1.2.3\0");
  }

  #[test]
  fn new_binary_validates_length_test() {
    assert_eq!(
      DataElementValue::new_binary(
        ValueRepresentation::UnsignedShort,
        vec![0u8; 6]
      )
      .unwrap()
      .get_ints(),
      Ok(vec![0, 0, 0])
    );

    assert!(
      DataElementValue::new_binary(ValueRepresentation::Date, vec![0u8; 10])
        .is_err()
    );

    assert!(
      DataElementValue::new_binary(ValueRepresentation::Sequence, vec![])
        .is_err()
    );
  }

  #[test]
  fn new_string_test() {
    let value = DataElementValue::new_string(
      ValueRepresentation::CodeString,
      &["DERIVED", "SECONDARY"],
    )
    .unwrap();

    assert_eq!(value.bytes().unwrap().as_slice(), b"DERIVED\\SECONDARY ");
    assert_eq!(value.get_strings(), Ok(vec!["DERIVED", "SECONDARY"]));

    assert!(
      DataElementValue::new_string(ValueRepresentation::LongText, &["A", "B"])
        .is_err()
    );

    assert!(
      DataElementValue::new_string(ValueRepresentation::UnsignedShort, &["1"])
        .is_err()
    );
  }

  #[test]
  fn get_string_test() {
    let value = DataElementValue::new_string(
      ValueRepresentation::PersonName,
      &["Doe^John"],
    )
    .unwrap();

    assert_eq!(value.get_string(), Ok("Doe^John"));

    let value = DataElementValue::new_string(
      ValueRepresentation::CodeString,
      &["A", "B"],
    )
    .unwrap();

    assert_eq!(value.get_string(), Err(DataError::new_multiplicity_mismatch()));
  }

  #[test]
  fn get_ints_test() {
    let value = DataElementValue::new_binary(
      ValueRepresentation::UnsignedShort,
      vec![0x34, 0x12, 0x78, 0x56],
    )
    .unwrap();

    assert_eq!(value.get_ints(), Ok(vec![0x1234, 0x5678]));
    assert_eq!(value.get_int(), Err(DataError::new_multiplicity_mismatch()));

    let value = DataElementValue::new_string(
      ValueRepresentation::IntegerString,
      &["42"],
    )
    .unwrap();

    assert_eq!(value.get_int(), Ok(42));
  }

  #[test]
  fn get_floats_test() {
    let value = DataElementValue::new_string(
      ValueRepresentation::DecimalString,
      &["1.5", "-2.25"],
    )
    .unwrap();

    assert_eq!(value.get_floats(), Ok(vec![1.5, -2.25]));
  }

  #[test]
  fn encapsulated_pixel_data_test() {
    let value = DataElementValue::new_encapsulated_pixel_data(
      ValueRepresentation::OtherByteString,
      vec![vec![], vec![1, 2, 3, 4], vec![5, 6]],
    )
    .unwrap();

    assert_eq!(value.encapsulated_pixel_data().unwrap().len(), 3);

    let fragments = value.fragments().unwrap();
    assert_eq!(fragments.len(), 2);
    assert_eq!(fragments[0].as_slice(), &[1, 2, 3, 4]);
    assert_eq!(fragments[1].as_slice(), &[5, 6]);

    assert!(
      DataElementValue::new_encapsulated_pixel_data(
        ValueRepresentation::UnsignedShort,
        vec![],
      )
      .is_err()
    );

    assert!(
      DataElementValue::new_encapsulated_pixel_data(
        ValueRepresentation::OtherByteString,
        vec![vec![1, 2, 3]],
      )
      .is_err()
    );
  }

  #[test]
  fn to_string_test() {
    let value = DataElementValue::new_string(
      ValueRepresentation::PersonName,
      &["Doe^John"],
    )
    .unwrap();

    assert_eq!(value.to_string(80), "\"Doe^John\"");

    let value = DataElementValue::new_sequence(vec![DataSet::new()]);
    assert_eq!(value.to_string(80), "1 sequence items");
  }
}
