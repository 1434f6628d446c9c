#[cfg(test)]
mod tests {
  use dcmlite_core::*;
  use dcmlite_p10::*;

  /// A dataset starting directly with an implicit VR little endian data
  /// element, with no File Preamble, parses and re-encodes byte-identically.
  ///
  #[test]
  fn implicit_little_endian_round_trip_test() {
    let bytes = vec![
      0x10, 0x00, 0x10, 0x00, // Tag: (0010,0010) Patient's Name
      0x04, 0x00, 0x00, 0x00, // Length: 4
      b'J', b'o', b'h', b'n',
    ];

    let data_set = DataSet::read_p10_bytes(bytes.clone()).unwrap();

    assert_eq!(
      data_set.get_string(dictionary::PATIENT_NAME.tag),
      Ok("John")
    );

    // Re-encoding the data set portion in its transfer syntax, which
    // defaults to implicit VR little endian, reproduces the input exactly
    assert_eq!(data_set.to_p10_chunks(usize::MAX), Ok(vec![bytes]));
  }

  /// File Meta Information declaring the big endian transfer syntax causes
  /// the first data set tag to be rewound and redecoded in the new byte
  /// order.
  ///
  #[test]
  fn transfer_syntax_switch_to_big_endian_test() {
    let mut bytes = vec![0u8; 128];
    bytes.extend_from_slice(b"DICM");

    // (0002,0010) Transfer Syntax UID, explicit VR little endian
    bytes.extend_from_slice(&[0x02, 0x00, 0x10, 0x00]);
    bytes.extend_from_slice(b"UI");
    bytes.extend_from_slice(&20u16.to_le_bytes());
    bytes.extend_from_slice(b"1.2.840.10008.1.2.2\0");

    // (0010,0010) Patient's Name in explicit VR big endian
    bytes.extend_from_slice(&[0x00, 0x10, 0x00, 0x10]);
    bytes.extend_from_slice(b"PN");
    bytes.extend_from_slice(&4u16.to_be_bytes());
    bytes.extend_from_slice(b"John");

    let data_set = DataSet::read_p10_bytes(bytes).unwrap();

    assert_eq!(
      data_set.get_transfer_syntax(),
      Ok(&transfer_syntax::EXPLICIT_VR_BIG_ENDIAN)
    );
    assert_eq!(
      data_set.get_string(dictionary::PATIENT_NAME.tag),
      Ok("John")
    );
  }

  /// An undefined-length sequence holding one item with one data element
  /// materializes as a nested data set, with no delimiter elements present.
  ///
  #[test]
  fn undefined_length_sequence_test() {
    let sequence_tag = DataElementTag::new(0x0008, 0x1111);

    let bytes = vec![
      0x08, 0x00, 0x11, 0x11, // Tag: (0008,1111)
      0xFF, 0xFF, 0xFF, 0xFF, // Length: undefined
      0xFE, 0xFF, 0x00, 0xE0, // Tag: (FFFE,E000) Item
      0xFF, 0xFF, 0xFF, 0xFF, // Length: undefined
      0x10, 0x00, 0x10, 0x00, // Tag: (0010,0010) Patient's Name
      0x02, 0x00, 0x00, 0x00, // Length: 2
      b'A', b' ', //
      0xFE, 0xFF, 0x0D, 0xE0, // Tag: (FFFE,E00D) Item Delimitation Item
      0x00, 0x00, 0x00, 0x00, // Length: 0
      0xFE, 0xFF, 0xDD, 0xE0, // Tag: (FFFE,E0DD) Sequence Delimitation Item
      0x00, 0x00, 0x00, 0x00, // Length: 0
    ];

    let data_set = DataSet::read_p10_bytes(bytes).unwrap();

    assert_eq!(data_set.tags(), vec![sequence_tag]);

    let items = data_set
      .get_value(sequence_tag)
      .unwrap()
      .sequence_items()
      .unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].tags(), vec![dictionary::PATIENT_NAME.tag]);
    assert_eq!(items[0].get_string(dictionary::PATIENT_NAME.tag), Ok("A"));
  }

  /// Encapsulated pixel data exposes its fragments in order, with the
  /// leading basic offset table item preserved.
  ///
  #[test]
  fn encapsulated_pixel_data_test() {
    let mut bytes = vec![];

    // (7FE0,0010) Pixel Data, OB, undefined length
    bytes.extend_from_slice(&[0xE0, 0x7F, 0x10, 0x00]);
    bytes.extend_from_slice(b"OB");
    bytes.extend_from_slice(&[0x00, 0x00]);
    bytes.extend_from_slice(&[0xFF, 0xFF, 0xFF, 0xFF]);

    // Empty basic offset table item
    bytes.extend_from_slice(&[0xFE, 0xFF, 0x00, 0xE0]);
    bytes.extend_from_slice(&0u32.to_le_bytes());

    // Two fragment items of 16 and 24 bytes
    bytes.extend_from_slice(&[0xFE, 0xFF, 0x00, 0xE0]);
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&[1u8; 16]);

    bytes.extend_from_slice(&[0xFE, 0xFF, 0x00, 0xE0]);
    bytes.extend_from_slice(&24u32.to_le_bytes());
    bytes.extend_from_slice(&[2u8; 24]);

    // Sequence delimitation item
    bytes.extend_from_slice(&[0xFE, 0xFF, 0xDD, 0xE0]);
    bytes.extend_from_slice(&0u32.to_le_bytes());

    let config = P10ReadConfig::default()
      .fallback_transfer_syntax(&transfer_syntax::EXPLICIT_VR_LITTLE_ENDIAN);

    let data_set = read_bytes(bytes, Some(config)).map_err(|e| e.0).unwrap();

    let pixel_data = data_set.get_value(dictionary::PIXEL_DATA.tag).unwrap();

    // A plain single-leaf read is not possible for encapsulated pixel data
    assert!(pixel_data.bytes().is_err());

    let items = pixel_data.encapsulated_pixel_data().unwrap();
    assert_eq!(items.len(), 3);
    assert!(items[0].is_empty());

    let fragments = pixel_data.fragments().unwrap();
    assert_eq!(fragments.len(), 2);
    assert_eq!(fragments[0].as_slice(), &[1u8; 16]);
    assert_eq!(fragments[1].as_slice(), &[2u8; 24]);
  }

  /// A data set written to P10 bytes and read back is unchanged, and writing
  /// it a second time produces identical bytes.
  ///
  #[test]
  fn write_read_round_trip_test() {
    let data_set = test_data_set("1.2.840.10008.1.2.1");

    let bytes = data_set.to_p10_bytes(None).unwrap();
    assert!(is_valid_bytes(&bytes));

    let read_back = DataSet::read_p10_bytes(bytes.clone()).unwrap();

    assert_eq!(
      read_back.get_string(dictionary::PATIENT_NAME.tag),
      Ok("Doe^Jane")
    );
    assert_eq!(
      read_back.get_int(DataElementTag::new(0x0028, 0x0010)),
      Ok(512)
    );

    let items = read_back
      .get_value(DataElementTag::new(0x0008, 0x1111))
      .unwrap()
      .sequence_items()
      .unwrap();
    assert_eq!(
      items[0].get_string(dictionary::SOP_INSTANCE_UID.tag),
      Ok("1.2.3.4.5")
    );

    assert_eq!(read_back.to_p10_bytes(None), Ok(bytes));
  }

  /// Switching a data set to big endian and back leaves in-memory value
  /// bytes untouched, and values survive a round trip through big endian
  /// serialization.
  ///
  #[test]
  fn endian_switch_idempotence_test() {
    let mut data_set = test_data_set("1.2.840.10008.1.2.1");

    let rows_tag = DataElementTag::new(0x0028, 0x0010);
    let original_bytes = data_set
      .get_value_bytes(rows_tag, ValueRepresentation::UnsignedShort)
      .unwrap()
      .clone();

    data_set.set_transfer_syntax("1.2.840.10008.1.2.2").unwrap();
    data_set.set_transfer_syntax("1.2.840.10008.1.2.1").unwrap();

    assert_eq!(
      data_set
        .get_value_bytes(rows_tag, ValueRepresentation::UnsignedShort)
        .unwrap(),
      &original_bytes
    );

    // Serialize as big endian and read back: numeric values are unchanged
    // and the on-wire bytes for the Rows element are byte-swapped
    data_set.set_transfer_syntax("1.2.840.10008.1.2.2").unwrap();

    let bytes = data_set.to_p10_bytes(None).unwrap();
    let read_back = DataSet::read_p10_bytes(bytes).unwrap();

    assert_eq!(read_back.get_int(rows_tag), Ok(512));
    assert_eq!(
      read_back
        .get_value_bytes(rows_tag, ValueRepresentation::UnsignedShort)
        .unwrap(),
      &original_bytes
    );
  }

  /// The File Meta Information group length declares exactly the number of
  /// bytes in the group 0x0002 data elements that follow it.
  ///
  #[test]
  fn file_meta_information_group_length_test() {
    let data_set = test_data_set("1.2.840.10008.1.2.1");

    let bytes = data_set.to_p10_bytes(None).unwrap();

    // The group length element starts at offset 132 and its 32-bit value
    // starts at offset 140
    assert_eq!(
      bytes[132..140],
      [0x02, 0x00, 0x00, 0x00, 0x55, 0x4C, 0x04, 0x00]
    );
    let group_length =
      u32::from_le_bytes(bytes[140..144].try_into().unwrap()) as usize;

    // The data element following the group 0x0002 elements is not in group
    // 0x0002
    let data_set_start = 144 + group_length;
    let group =
      u16::from_le_bytes(bytes[data_set_start..data_set_start + 2].try_into().unwrap());
    assert_ne!(group, 0x0002);

    // Every element within the declared range is in group 0x0002
    let mut offset = 144;
    while offset < data_set_start {
      let group =
        u16::from_le_bytes(bytes[offset..offset + 2].try_into().unwrap());
      assert_eq!(group, 0x0002);

      let vr = &bytes[offset + 4..offset + 6];
      let length = if matches!(vr, b"OB" | b"OW" | b"OF" | b"SQ" | b"UN" | b"UT")
      {
        offset += 12;
        u32::from_le_bytes(bytes[offset - 4..offset].try_into().unwrap())
          as usize
      } else {
        offset += 8;
        u16::from_le_bytes(bytes[offset - 2..offset].try_into().unwrap())
          as usize
      };

      offset += length;
    }

    assert_eq!(offset, data_set_start);
  }

  /// Data sets written with the deflated transfer syntax inflate back to the
  /// same content.
  ///
  #[test]
  fn deflated_transfer_syntax_round_trip_test() {
    let data_set = test_data_set("1.2.840.10008.1.2.1.99");

    let bytes = data_set.to_p10_bytes(None).unwrap();
    let read_back = DataSet::read_p10_bytes(bytes).unwrap();

    assert_eq!(
      read_back.get_string(dictionary::PATIENT_NAME.tag),
      Ok("Doe^Jane")
    );
    assert_eq!(
      read_back.get_transfer_syntax(),
      Ok(&transfer_syntax::DEFLATED_EXPLICIT_VR_LITTLE_ENDIAN)
    );
  }

  /// A parse failure partway through the data leaves the previously
  /// materialized data elements retrievable.
  ///
  #[test]
  fn partial_parse_recovery_test() {
    let mut bytes = vec![
      0x10, 0x00, 0x10, 0x00, // Tag: (0010,0010) Patient's Name
      0x04, 0x00, 0x00, 0x00, // Length: 4
      b'J', b'o', b'h', b'n',
    ];

    // A data element declaring an odd length is malformed
    bytes.extend_from_slice(&[
      0x10, 0x00, 0x20, 0x00, // Tag: (0010,0020) Patient ID
      0x03, 0x00, 0x00, 0x00, // Length: 3
      b'1', b'2', b'3',
    ]);

    let (error, mut builder) = read_bytes(bytes, None).unwrap_err();

    assert!(matches!(error, P10Error::DataInvalid { .. }));

    builder.force_end();
    let data_set = builder.final_data_set().unwrap();

    assert_eq!(
      data_set.get_string(dictionary::PATIENT_NAME.tag),
      Ok("John")
    );
    assert!(!data_set.has(dictionary::PATIENT_ID.tag));
  }

  fn test_data_set(transfer_syntax_uid: &str) -> DataSet {
    let mut item = DataSet::new();
    item
      .insert_string_value(&dictionary::SOP_INSTANCE_UID, &["1.2.3.4.5"])
      .unwrap();

    let mut data_set = DataSet::new();
    data_set
      .insert_string_value(&dictionary::TRANSFER_SYNTAX_UID, &[transfer_syntax_uid])
      .unwrap();
    data_set
      .insert_string_value(&dictionary::SOP_CLASS_UID, &["1.2.840.10008.5.1.4.1.1.7"])
      .unwrap();
    data_set
      .insert_string_value(&dictionary::SOP_INSTANCE_UID, &["1.2.3.4"])
      .unwrap();
    data_set
      .insert_string_value(&dictionary::PATIENT_NAME, &["Doe^Jane"])
      .unwrap();
    data_set
      .insert_binary_value(
        DataElementTag::new(0x0028, 0x0010),
        ValueRepresentation::UnsignedShort,
        512u16.to_le_bytes().to_vec(),
      )
      .unwrap();
    data_set
      .insert_sequence_value(
        &REFERENCED_PERFORMED_PROCEDURE_STEP_SEQUENCE,
        vec![item],
      )
      .unwrap();

    data_set
  }

  const REFERENCED_PERFORMED_PROCEDURE_STEP_SEQUENCE: dictionary::Item =
    dictionary::Item {
      tag: DataElementTag {
        group: 0x0008,
        element: 0x1111,
      },
      name: "Referenced Performed Procedure Step Sequence",
      vrs: &[ValueRepresentation::Sequence],
      multiplicity: ValueMultiplicity::ONE,
    };
}
