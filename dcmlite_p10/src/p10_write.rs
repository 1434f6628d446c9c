//! Functionality for serializing data sets and streams of DICOM P10 tokens
//! into DICOM P10 bytes.

use byteorder::ByteOrder;

use dcmlite_core::{
  DataElementValue, DataSet, TransferSyntax, ValueRepresentation, dictionary,
  transfer_syntax,
  transfer_syntax::{Endianness, VrSerialization},
};

use crate::{
  P10Error, P10Token, P10WriteConfig,
  internal::{
    data_element_header::{DataElementHeader, ValueLengthSize},
    value_length::ValueLength,
  },
  p10_token, uids,
};

/// Data is compressed into chunks of this size when writing deflated transfer
/// syntaxes.
///
const ZLIB_DEFLATE_CHUNK_SIZE: usize = 64 * 1024;

/// A write context holds the current state of an in-progress DICOM P10
/// write. DICOM P10 tokens are written to a write context with
/// [`Self::write_token()`], and the generated P10 bytes are then returned by
/// [`Self::read_bytes()`].
///
pub struct P10WriteContext {
  config: P10WriteConfig,
  p10_bytes: Vec<Vec<u8>>,
  p10_total_byte_count: u64,
  is_ended: bool,
  transfer_syntax: &'static TransferSyntax,
  zlib_stream: Option<flate2::Compress>,
}

impl P10WriteContext {
  /// Creates a new write context for writing DICOM P10 data.
  ///
  pub fn new(config: Option<P10WriteConfig>) -> Self {
    Self {
      config: config.unwrap_or_default(),
      p10_bytes: vec![],
      p10_total_byte_count: 0,
      is_ended: false,
      transfer_syntax: &transfer_syntax::IMPLICIT_VR_LITTLE_ENDIAN,
      zlib_stream: None,
    }
  }

  /// Reads the current DICOM P10 bytes available out of a write context.
  /// These are the bytes generated by recent calls to [`Self::write_token()`].
  ///
  pub fn read_bytes(&mut self) -> Vec<Vec<u8>> {
    std::mem::take(&mut self.p10_bytes)
  }

  /// Writes a DICOM P10 token to a write context. Use [`Self::read_bytes()`]
  /// to get the new DICOM P10 bytes generated as a result of writing this
  /// token.
  ///
  pub fn write_token(&mut self, token: &P10Token) -> Result<(), P10Error> {
    if self.is_ended {
      return Err(P10Error::TokenStreamInvalid {
        when: "Writing DICOM P10 token".to_string(),
        details: "Received a further DICOM P10 token after the write was \
            completed"
          .to_string(),
        token: token.clone(),
      });
    }

    match token {
      // When the File Meta Information token is received, check it for a
      // transfer syntax value that should be put onto the write context, fix
      // up its content, and start a zlib compressor if the transfer syntax is
      // deflated
      P10Token::FileMetaInformation { data_set } => {
        let transfer_syntax_uid = data_set
          .get_string(dictionary::TRANSFER_SYNTAX_UID.tag)
          .unwrap_or(transfer_syntax::IMPLICIT_VR_LITTLE_ENDIAN.uid);

        self.transfer_syntax = TransferSyntax::from_uid(transfer_syntax_uid)
          .map_err(|_| P10Error::TransferSyntaxNotSupported {
            transfer_syntax_uid: transfer_syntax_uid.to_string(),
          })?;

        // If this is a deflated transfer syntax then start a zlib compressor
        // that all data set bytes will pass through. The File Meta
        // Information itself is never deflated.
        if self.transfer_syntax.is_deflated {
          self.zlib_stream = Some(flate2::Compress::new(
            flate2::Compression::new(self.config.zlib_compression_level),
            false,
          ));
        }

        let fmi_bytes = self.file_meta_information_to_bytes(data_set);

        self.p10_total_byte_count += fmi_bytes.len() as u64;
        self.p10_bytes.push(fmi_bytes);

        Ok(())
      }

      // When the end token is received, update the flag on the write context
      // and flush all remaining data out of the zlib stream if one is in use
      P10Token::End => {
        if let Some(zlib_stream) = self.zlib_stream.as_mut() {
          loop {
            let mut output = vec![0u8; ZLIB_DEFLATE_CHUNK_SIZE];

            let total_out = zlib_stream.total_out();
            let status = zlib_stream
              .compress(&[], output.as_mut_slice(), flate2::FlushCompress::Finish)
              .unwrap();
            output.truncate((zlib_stream.total_out() - total_out) as usize);

            if !output.is_empty() {
              self.p10_total_byte_count += output.len() as u64;
              self.p10_bytes.push(output);
            }

            if status == flate2::Status::StreamEnd {
              break;
            }
          }

          self.zlib_stream = None;
        }

        self.is_ended = true;

        Ok(())
      }

      token => {
        let token_bytes = self.token_to_bytes(token)?;

        // If a zlib stream is active then pass the P10 bytes through it
        if let Some(zlib_stream) = self.zlib_stream.as_mut() {
          let mut token_bytes_remaining = &token_bytes[..];

          while !token_bytes_remaining.is_empty() {
            let mut output = vec![0u8; ZLIB_DEFLATE_CHUNK_SIZE];

            let total_in = zlib_stream.total_in();
            let total_out = zlib_stream.total_out();
            zlib_stream
              .compress(
                token_bytes_remaining,
                &mut output,
                flate2::FlushCompress::None,
              )
              .unwrap();
            output.truncate((zlib_stream.total_out() - total_out) as usize);

            if !output.is_empty() {
              self.p10_total_byte_count += output.len() as u64;
              self.p10_bytes.push(output);
            }

            let input_bytes_consumed =
              (zlib_stream.total_in() - total_in) as usize;

            token_bytes_remaining = &token_bytes_remaining[input_bytes_consumed..];
          }
        } else {
          self.p10_total_byte_count += token_bytes.len() as u64;
          self.p10_bytes.push(token_bytes);
        }

        Ok(())
      }
    }
  }

  /// Converts a single DICOM P10 token to raw DICOM P10 bytes.
  ///
  fn token_to_bytes(&self, token: &P10Token) -> Result<Vec<u8>, P10Error> {
    match token {
      P10Token::FilePreambleAndDicmPrefix { preamble } => {
        let mut data = Vec::with_capacity(132);

        data.extend_from_slice(preamble.as_ref());
        data.extend_from_slice(b"DICM");

        Ok(data)
      }

      P10Token::DataElementHeader { tag, vr, length } => {
        let vr = match self.transfer_syntax.vr_serialization {
          VrSerialization::VrExplicit => Some(*vr),
          VrSerialization::VrImplicit => None,
        };

        self.data_element_header_to_bytes(
          &DataElementHeader {
            tag: *tag,
            vr,
            length: ValueLength::new(*length),
          },
          self.transfer_syntax.endianness,
        )
      }

      P10Token::DataElementValueBytes { vr, data, .. } => {
        // In-memory values are little endian, so writing a big endian
        // transfer syntax means the bytes have to be swapped
        if self.transfer_syntax.endianness.is_big() {
          let mut data = (**data).clone();
          vr.swap_endianness(&mut data);
          Ok(data)
        } else {
          Ok((**data).clone())
        }
      }

      P10Token::SequenceStart { tag, vr } => {
        let vr = match self.transfer_syntax.vr_serialization {
          VrSerialization::VrExplicit => Some(*vr),
          VrSerialization::VrImplicit => None,
        };

        self.data_element_header_to_bytes(
          &DataElementHeader {
            tag: *tag,
            vr,
            length: ValueLength::Undefined,
          },
          self.transfer_syntax.endianness,
        )
      }

      P10Token::SequenceDelimiter { .. } => self.data_element_header_to_bytes(
        &DataElementHeader {
          tag: dictionary::SEQUENCE_DELIMITATION_ITEM.tag,
          vr: None,
          length: ValueLength::ZERO,
        },
        self.transfer_syntax.endianness,
      ),

      P10Token::SequenceItemStart { .. } => self.data_element_header_to_bytes(
        &DataElementHeader {
          tag: dictionary::ITEM.tag,
          vr: None,
          length: ValueLength::Undefined,
        },
        self.transfer_syntax.endianness,
      ),

      P10Token::SequenceItemDelimiter => self.data_element_header_to_bytes(
        &DataElementHeader {
          tag: dictionary::ITEM_DELIMITATION_ITEM.tag,
          vr: None,
          length: ValueLength::ZERO,
        },
        self.transfer_syntax.endianness,
      ),

      P10Token::PixelDataItem { length, .. } => self
        .data_element_header_to_bytes(
          &DataElementHeader {
            tag: dictionary::ITEM.tag,
            vr: None,
            length: ValueLength::new(*length),
          },
          self.transfer_syntax.endianness,
        ),

      P10Token::FileMetaInformation { .. } | P10Token::End => Ok(vec![]),
    }
  }

  /// Fixes up and serializes File Meta Information to bytes using explicit VR
  /// little endian, the only encoding File Meta Information is allowed to
  /// use.
  ///
  /// The fixup inserts the mandatory data elements that are missing: the File
  /// Meta Information Version, the Source Application Entity Title, the
  /// Transfer Syntax UID (always set to the transfer syntax being written),
  /// and the implementation class UID and version name when both are absent.
  /// Any incoming group length is discarded and a correct *'(0002,0000) File
  /// Meta Information Group Length'* is computed over the serialized group.
  ///
  fn file_meta_information_to_bytes(&self, data_set: &DataSet) -> Vec<u8> {
    let mut fmi = data_set.clone();

    fmi.delete(dictionary::FILE_META_INFORMATION_GROUP_LENGTH.tag);

    if !fmi.has(dictionary::FILE_META_INFORMATION_VERSION.tag) {
      fmi.insert(
        dictionary::FILE_META_INFORMATION_VERSION.tag,
        DataElementValue::new_binary(
          ValueRepresentation::OtherByteString,
          vec![0x00, 0x01],
        )
        .unwrap(),
      );
    }

    if !fmi.has(dictionary::IMPLEMENTATION_CLASS_UID.tag)
      && !fmi.has(dictionary::IMPLEMENTATION_VERSION_NAME.tag)
    {
      fmi
        .insert_string_value(
          &dictionary::IMPLEMENTATION_CLASS_UID,
          &[uids::DCMLITE_IMPLEMENTATION_CLASS_UID],
        )
        .unwrap();
      fmi
        .insert_string_value(
          &dictionary::IMPLEMENTATION_VERSION_NAME,
          &[uids::DCMLITE_IMPLEMENTATION_VERSION_NAME],
        )
        .unwrap();
    }

    if !fmi.has(dictionary::SOURCE_APPLICATION_ENTITY_TITLE.tag) {
      fmi
        .insert_string_value(
          &dictionary::SOURCE_APPLICATION_ENTITY_TITLE,
          &[self.config.source_application_entity_title.as_str()],
        )
        .unwrap();
    }

    fmi
      .insert_string_value(
        &dictionary::TRANSFER_SYNTAX_UID,
        &[self.transfer_syntax.uid],
      )
      .unwrap();

    // Serialize the group with a placeholder for the 32-bit group length
    // value, which is filled in once the rest of the group's bytes exist
    let mut fmi_bytes = Vec::with_capacity(256);
    fmi_bytes
      .extend_from_slice(&[0x02, 0x00, 0x00, 0x00, 0x55, 0x4C, 0x04, 0x00]);
    fmi_bytes.extend_from_slice(&[0, 0, 0, 0]);

    for (tag, value) in fmi.into_iter() {
      let vr = value.value_representation();
      let value_bytes = value.bytes().unwrap();

      let header_bytes = self
        .data_element_header_to_bytes(
          &DataElementHeader {
            tag,
            vr: Some(vr),
            length: ValueLength::new(value_bytes.len() as u32),
          },
          Endianness::LittleEndian,
        )
        .unwrap();

      fmi_bytes.extend_from_slice(&header_bytes);
      fmi_bytes.extend_from_slice(value_bytes);
    }

    // Set the final File Meta Information Group Length value
    let fmi_length = (fmi_bytes.len() - 12) as u32;
    byteorder::LittleEndian::write_u32(&mut fmi_bytes[8..12], fmi_length);

    fmi_bytes
  }

  /// Serializes a data element header to bytes. If the VR is not specified
  /// then the header is written in its implicit VR form.
  ///
  fn data_element_header_to_bytes(
    &self,
    header: &DataElementHeader,
    endianness: Endianness,
  ) -> Result<Vec<u8>, P10Error> {
    let length = header.length.to_u32();

    let mut bytes = Vec::with_capacity(12);

    match endianness {
      Endianness::LittleEndian => {
        bytes.extend_from_slice(header.tag.group.to_le_bytes().as_slice());
        bytes.extend_from_slice(header.tag.element.to_le_bytes().as_slice());
      }
      Endianness::BigEndian => {
        bytes.extend_from_slice(header.tag.group.to_be_bytes().as_slice());
        bytes.extend_from_slice(header.tag.element.to_be_bytes().as_slice());
      }
    };

    match header.vr {
      // Write with implicit VR
      None => match endianness {
        Endianness::LittleEndian => {
          bytes.extend_from_slice(length.to_le_bytes().as_slice())
        }
        Endianness::BigEndian => {
          bytes.extend_from_slice(length.to_be_bytes().as_slice())
        }
      },

      // Write with explicit VR
      Some(vr) => {
        bytes.extend_from_slice(&vr.to_bytes());

        match DataElementHeader::value_length_size(vr) {
          // Short-form VRs use a 16-bit length. Check that the data length
          // fits inside this constraint.
          ValueLengthSize::U16 => {
            if length > u16::MAX as u32 {
              return Err(P10Error::DataInvalid {
                when: "Serializing data element header".to_string(),
                details: format!(
                  "Length 0x{:X} exceeds the maximum of 0xFFFF",
                  header.length.to_u32(),
                ),
                path: dcmlite_core::DataSetPath::new_with_data_element(
                  header.tag,
                ),
                offset: self.p10_total_byte_count,
              });
            }

            match endianness {
              Endianness::LittleEndian => bytes
                .extend_from_slice((length as u16).to_le_bytes().as_slice()),
              Endianness::BigEndian => bytes
                .extend_from_slice((length as u16).to_be_bytes().as_slice()),
            }
          }

          // Long-form VRs use a 32-bit length preceded by two reserved bytes
          ValueLengthSize::U32 => {
            bytes.extend_from_slice([0, 0].as_slice());

            match endianness {
              Endianness::LittleEndian => {
                bytes.extend_from_slice(length.to_le_bytes().as_slice())
              }
              Endianness::BigEndian => {
                bytes.extend_from_slice(length.to_be_bytes().as_slice())
              }
            }
          }
        };
      }
    }

    Ok(bytes)
  }
}

/// Converts a data set to DICOM P10 tokens: the File Preamble, the fixed-up
/// File Meta Information, all non-meta data elements in the data set's
/// transfer syntax, and the end token. The generated tokens are returned via
/// a callback.
///
pub fn data_set_to_tokens<E>(
  data_set: &DataSet,
  token_callback: &mut impl FnMut(&P10Token) -> Result<(), E>,
) -> Result<(), E> {
  token_callback(&P10Token::FilePreambleAndDicmPrefix {
    preamble: Box::new([0; 128]),
  })?;

  token_callback(&P10Token::FileMetaInformation {
    data_set: data_set.file_meta_information(),
  })?;

  for (tag, value) in data_set.iter() {
    if tag.is_file_meta_information() {
      continue;
    }

    p10_token::data_element_to_tokens(*tag, value, token_callback)?;
  }

  token_callback(&P10Token::End)
}

/// Converts a data set to DICOM P10 bytes. The generated P10 bytes are
/// returned via a callback.
///
pub fn data_set_to_bytes(
  data_set: &DataSet,
  bytes_callback: &mut impl FnMut(Vec<u8>) -> Result<(), P10Error>,
  config: Option<P10WriteConfig>,
) -> Result<(), P10Error> {
  let mut context = P10WriteContext::new(config);

  let mut token_callback = |token: &P10Token| -> Result<(), P10Error> {
    context.write_token(token)?;

    for bytes in context.read_bytes() {
      bytes_callback(bytes)?;
    }

    Ok(())
  };

  data_set_to_tokens(data_set, &mut token_callback)
}

/// Serializes only the data set portion of a DICOM object, i.e. no File
/// Preamble and no File Meta Information, using the data set's transfer
/// syntax, and returns the bytes split into chunks that are each no larger
/// than `max_chunk_size`. This is the framing used when sending a data set
/// over a network association.
///
pub fn data_set_to_chunks(
  data_set: &DataSet,
  max_chunk_size: usize,
) -> Result<Vec<Vec<u8>>, P10Error> {
  let transfer_syntax = data_set.get_transfer_syntax().map_err(|e| {
    P10Error::TransferSyntaxNotSupported {
      transfer_syntax_uid: e.to_string(),
    }
  })?;

  let mut context = P10WriteContext::new(None);
  context.transfer_syntax = transfer_syntax;

  let mut bytes: Vec<u8> = vec![];

  let mut token_callback = |token: &P10Token| -> Result<(), P10Error> {
    context.write_token(token)?;

    for data in context.read_bytes() {
      bytes.extend_from_slice(&data);
    }

    Ok(())
  };

  for (tag, value) in data_set.iter() {
    if tag.is_file_meta_information() {
      continue;
    }

    p10_token::data_element_to_tokens(*tag, value, &mut token_callback)?;
  }

  let chunks = bytes
    .chunks(max_chunk_size.max(1))
    .map(|chunk| chunk.to_vec())
    .collect();

  Ok(chunks)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn data_element_header_to_bytes_test() {
    let context = P10WriteContext::new(None);

    assert_eq!(
      context.data_element_header_to_bytes(
        &DataElementHeader {
          tag: dictionary::PIXEL_DATA.tag,
          vr: None,
          length: ValueLength::new(0x12345678),
        },
        Endianness::LittleEndian,
      ),
      Ok(vec![0xE0, 0x7F, 0x10, 0x00, 0x78, 0x56, 0x34, 0x12])
    );

    assert_eq!(
      context.data_element_header_to_bytes(
        &DataElementHeader {
          tag: dictionary::PIXEL_DATA.tag,
          vr: None,
          length: ValueLength::new(0x12345678),
        },
        Endianness::BigEndian,
      ),
      Ok(vec![0x7F, 0xE0, 0x00, 0x10, 0x12, 0x34, 0x56, 0x78])
    );

    assert_eq!(
      context.data_element_header_to_bytes(
        &DataElementHeader {
          tag: dictionary::PIXEL_DATA.tag,
          vr: Some(ValueRepresentation::OtherWordString),
          length: ValueLength::new(0x12345678),
        },
        Endianness::LittleEndian,
      ),
      Ok(vec![
        0xE0, 0x7F, 0x10, 0x00, 0x4F, 0x57, 0x00, 0x00, 0x78, 0x56, 0x34, 0x12
      ])
    );

    assert_eq!(
      context.data_element_header_to_bytes(
        &DataElementHeader {
          tag: dictionary::STUDY_DATE.tag,
          vr: Some(ValueRepresentation::Date),
          length: ValueLength::new(8),
        },
        Endianness::LittleEndian,
      ),
      Ok(vec![0x08, 0x00, 0x20, 0x00, 0x44, 0x41, 0x08, 0x00])
    );

    assert_eq!(
      context.data_element_header_to_bytes(
        &DataElementHeader {
          tag: dictionary::STUDY_DATE.tag,
          vr: Some(ValueRepresentation::Date),
          length: ValueLength::new(8),
        },
        Endianness::BigEndian,
      ),
      Ok(vec![0x00, 0x08, 0x00, 0x20, 0x44, 0x41, 0x00, 0x08])
    );

    assert!(
      context
        .data_element_header_to_bytes(
          &DataElementHeader {
            tag: dictionary::STUDY_DATE.tag,
            vr: Some(ValueRepresentation::Date),
            length: ValueLength::new(0x12345),
          },
          Endianness::LittleEndian,
        )
        .is_err()
    );
  }

  #[test]
  fn file_meta_information_fixup_test() {
    let mut context = P10WriteContext::new(None);
    context.transfer_syntax = &transfer_syntax::EXPLICIT_VR_LITTLE_ENDIAN;

    let mut fmi = DataSet::new();
    fmi
      .insert_binary_value(
        dictionary::FILE_META_INFORMATION_GROUP_LENGTH.tag,
        ValueRepresentation::UnsignedLong,
        vec![9, 9, 9, 9],
      )
      .unwrap();

    let bytes = context.file_meta_information_to_bytes(&fmi);

    // Check the group length element covers exactly the bytes that follow it
    let group_length = byteorder::LittleEndian::read_u32(&bytes[8..12]);
    assert_eq!(group_length as usize, bytes.len() - 12);

    // The fixed-up group carries the File Meta Information Version, the
    // implementation identifiers, the source AE title, and the transfer
    // syntax UID
    let mut context = crate::P10ReadContext::new(
      {
        let mut data = vec![0u8; 128];
        data.extend_from_slice(b"DICM");
        data.extend_from_slice(&bytes);
        data
      },
      None,
    );

    let tokens = context.read_tokens().unwrap();
    assert!(matches!(
      tokens.as_slice(),
      [P10Token::FilePreambleAndDicmPrefix { .. }]
    ));

    let tokens = context.read_tokens().unwrap();
    let P10Token::FileMetaInformation { data_set: fmi } = &tokens[0] else {
      panic!("Expected File Meta Information token");
    };

    assert_eq!(
      fmi.get_value_bytes(
        dictionary::FILE_META_INFORMATION_VERSION.tag,
        ValueRepresentation::OtherByteString
      )
      .unwrap()
      .as_slice(),
      &[0x00, 0x01]
    );
    assert_eq!(
      fmi.get_string(dictionary::TRANSFER_SYNTAX_UID.tag),
      Ok("1.2.840.10008.1.2.1")
    );
    assert_eq!(
      fmi.get_string(dictionary::IMPLEMENTATION_CLASS_UID.tag),
      Ok(uids::DCMLITE_IMPLEMENTATION_CLASS_UID)
    );
    assert_eq!(
      fmi.get_string(dictionary::SOURCE_APPLICATION_ENTITY_TITLE.tag),
      Ok("DCMLITE")
    );
    assert!(!fmi.has(dictionary::FILE_META_INFORMATION_GROUP_LENGTH.tag));
  }

  #[test]
  fn data_set_to_chunks_test() {
    let mut data_set = DataSet::new();
    data_set
      .insert_string_value(&dictionary::PATIENT_NAME, &["Doe^John"])
      .unwrap();
    data_set
      .insert_string_value(&dictionary::PATIENT_ID, &["12345678"])
      .unwrap();

    let chunks = data_set_to_chunks(&data_set, 10).unwrap();

    assert!(chunks.iter().all(|chunk| chunk.len() <= 10));

    let total_size: usize = chunks.iter().map(|chunk| chunk.len()).sum();
    assert_eq!(total_size, 16 * 2);
  }
}
