//! Converts in-memory binary DICOM P10 data into a stream of DICOM P10
//! tokens.
//!
//! A read context is created over a complete buffer of DICOM P10 bytes, and
//! DICOM P10 tokens are then read out one batch at a time with
//! [`P10ReadContext::read_tokens`]. See the [`P10Token`] type for details on
//! the different tokens that are emitted.

use std::sync::Arc;

use byteorder::ByteOrder;

use dcmlite_core::{
  DataElementTag, DataElementValue, DataSet, DataSetPath, TransferSyntax,
  ValueRepresentation, dictionary, transfer_syntax,
  transfer_syntax::{Endianness, VrSerialization},
};

use crate::internal::byte_stream::{ByteStream, ByteStreamError};
use crate::internal::data_element_header::{
  DataElementHeader, ValueLengthSize,
};
use crate::internal::p10_location::P10Location;
use crate::internal::value_length::ValueLength;
use crate::{P10Error, P10ReadConfig, P10Token};

/// A read context holds the current state of an in-progress DICOM P10 read.
/// It is created over a complete in-memory buffer of DICOM P10 data, and
/// DICOM P10 tokens are then read out with [`Self::read_tokens`] until a
/// [`P10Token::End`] token is returned.
///
#[derive(Debug)]
pub struct P10ReadContext {
  config: P10ReadConfig,
  stream: ByteStream,
  next_action: NextAction,
  transfer_syntax: &'static TransferSyntax,
  data_set_transfer_syntax: &'static TransferSyntax,
  transfer_syntax_switch_done: bool,
  path: DataSetPath,
  location: P10Location,
}

/// The next action specifies what will be attempted to be read next from a
/// read context by `read_tokens`.
///
#[derive(Debug)]
#[allow(clippy::enum_variant_names)]
enum NextAction {
  ReadFilePreambleAndDicmPrefix,
  ReadFileMetaInformation {
    starts_at: u64,
    ends_at: Option<u64>,
    data_set: DataSet,
  },
  ReadDataElementHeader,
  ReadDataElementValueBytes {
    tag: DataElementTag,
    vr: ValueRepresentation,
    length: u32,
    emit_tokens: bool,
  },
  ReadPixelDataItem {
    vr: ValueRepresentation,
  },
}

impl P10ReadContext {
  /// Creates a new read context over the given DICOM P10 bytes.
  ///
  pub fn new(bytes: Vec<u8>, config: Option<P10ReadConfig>) -> P10ReadContext {
    let config = config.unwrap_or_default();

    P10ReadContext {
      config,
      stream: ByteStream::new(bytes),
      next_action: NextAction::ReadFilePreambleAndDicmPrefix,
      transfer_syntax: config.fallback_transfer_syntax,
      data_set_transfer_syntax: config.fallback_transfer_syntax,
      transfer_syntax_switch_done: false,
      path: DataSetPath::new(),
      location: P10Location::new(),
    }
  }

  /// Returns the transfer syntax of the main data set. This defaults to the
  /// configured fallback and is updated when a transfer syntax is read from
  /// the File Meta Information.
  ///
  pub fn transfer_syntax(&self) -> &'static TransferSyntax {
    self.data_set_transfer_syntax
  }

  /// Reads the next DICOM P10 tokens from a read context. On success, one or
  /// more tokens are returned and the function can be called again to read
  /// further tokens, until a [`P10Token::End`] token is returned.
  ///
  pub fn read_tokens(&mut self) -> Result<Vec<P10Token>, P10Error> {
    match self.next_action {
      NextAction::ReadFilePreambleAndDicmPrefix => {
        self.read_file_preamble_and_dicm_prefix_token()
      }

      NextAction::ReadFileMetaInformation { .. } => {
        self.read_file_meta_information_token()
      }

      NextAction::ReadDataElementHeader => {
        // If there is a delimiter token for a defined-length sequence or item
        // that needs to be emitted then return that as the next token
        let delimiter_tokens = self.next_delimiter_token();
        if !delimiter_tokens.is_empty() {
          return Ok(delimiter_tokens);
        }

        // Detect the end of the DICOM data
        if self.stream.is_fully_consumed() {
          // Return the tokens required to end any active sequences and items.
          //
          // This means there is no check that all items and sequences have
          // been ended as should occur in well-formed P10 data, i.e. P10 data
          // can be truncated on a data element boundary and no error will be
          // thrown.
          Ok(self.location.pending_delimiter_tokens())
        } else {
          self.read_data_element_header_token()
        }
      }

      NextAction::ReadDataElementValueBytes {
        tag,
        vr,
        length,
        emit_tokens,
      } => self.read_data_element_value_bytes_token(
        tag,
        vr,
        length,
        emit_tokens,
      ),

      NextAction::ReadPixelDataItem { vr } => {
        self.read_pixel_data_item_token(vr)
      }
    }
  }

  /// Checks whether there is a delimiter token that needs to be emitted, and
  /// if so then returns it.
  ///
  fn next_delimiter_token(&mut self) -> Vec<P10Token> {
    let bytes_read = self.stream.bytes_read();

    match self.location.next_delimiter_token(bytes_read) {
      Ok(token) => {
        if matches!(token, P10Token::SequenceDelimiter { .. })
          || token == P10Token::SequenceItemDelimiter
        {
          self.path.pop().unwrap();
        }

        vec![token]
      }

      Err(()) => vec![],
    }
  }

  /// Reads the 128-byte File Preamble and the 4-byte `DICM` prefix following
  /// it. If the `DICM` bytes aren't present at the expected offset then it is
  /// assumed that the File Preamble is not present in the input, and a File
  /// Preamble containing all zero bytes is returned.
  ///
  fn read_file_preamble_and_dicm_prefix_token(
    &mut self,
  ) -> Result<Vec<P10Token>, P10Error> {
    let preamble = match self.stream.peek(132) {
      Ok(data) if &data[128..132] == b"DICM" => {
        let mut preamble = [0u8; 128];
        preamble.copy_from_slice(&data[0..128]);

        self.stream.skip(132).unwrap();

        Ok(Box::new(preamble))
      }

      // The 'DICM' prefix is absent, either because the data is shorter than
      // the signature length or because other content is at offset 128, so
      // parsing starts at offset 0 unless the prefix is configured as
      // required
      Ok(_) | Err(ByteStreamError::DataEnd) => {
        if self.config.require_dicm_prefix {
          Err(P10Error::DicmPrefixNotPresent)
        } else {
          Ok(Box::new([0u8; 128]))
        }
      }

      Err(e) => Err(self.map_byte_stream_error(e, "Reading file header")),
    }?;

    // The next action after reading or skipping the File Preamble is to read
    // the File Meta Information
    self.next_action = NextAction::ReadFileMetaInformation {
      starts_at: self.stream.bytes_read(),
      ends_at: None,
      data_set: DataSet::new(),
    };

    Ok(vec![P10Token::FilePreambleAndDicmPrefix { preamble }])
  }

  /// Reads the File Meta Information into a data set and returns the relevant
  /// P10 token once complete. If there is a *'(0002,0000) File Meta
  /// Information Group Length'* data element present then it is used to
  /// specify where the File Meta Information ends. If it is not present then
  /// data elements are read until one with a group other than 0x0002 is
  /// encountered.
  ///
  /// The File Meta Information is always encoded in explicit VR little
  /// endian, regardless of the transfer syntax of the main data set.
  ///
  fn read_file_meta_information_token(
    &mut self,
  ) -> Result<Vec<P10Token>, P10Error> {
    let NextAction::ReadFileMetaInformation {
      starts_at,
      ends_at,
      data_set: fmi_data_set,
    } = &mut self.next_action
    else {
      unreachable!();
    };

    let mut transfer_syntax = self.config.fallback_transfer_syntax;

    loop {
      // Check if the end of the File Meta Information has been reached
      if let Some(ends_at) = ends_at {
        if self.stream.bytes_read() >= *ends_at {
          break;
        }
      }

      // Peek the next 8 bytes that contain the group, element, VR, and two
      // bytes that contain the value length if the VR has a 16-bit length
      // field
      let data = match self.stream.peek(8) {
        Ok(data) => data,

        // Data that ends on a data element boundary before the declared group
        // length is reached is malformed. Without a declared group length the
        // end of the data ends the File Meta Information.
        Err(ByteStreamError::DataEnd) if ends_at.is_none() => break,

        Err(e) => {
          return Err(map_byte_stream_error(
            e,
            "Reading File Meta Information",
            &self.stream,
            &self.path,
          ));
        }
      };

      let group = byteorder::LittleEndian::read_u16(&data[0..2]);
      let element = byteorder::LittleEndian::read_u16(&data[2..4]);
      let tag = DataElementTag::new(group, element);

      // If the FMI length isn't known and the group isn't 0x0002 then this is
      // the end of the File Meta Information
      if tag.group != 0x0002 && ends_at.is_none() {
        break;
      }

      // If a data element is encountered in the File Meta Information that
      // doesn't have a group of 0x0002 then the File Meta Information is
      // invalid
      if tag.group != 0x0002 && ends_at.is_some() {
        return Err(P10Error::DataInvalid {
          when: "Reading File Meta Information".to_string(),
          details: "Data element in File Meta Information does not have the \
              group 0x0002"
            .to_string(),
          path: DataSetPath::new_with_data_element(tag),
          offset: self.stream.bytes_read(),
        });
      }

      // Get the VR for the data element
      let vr = ValueRepresentation::from_bytes(&data[4..6]).map_err(|_| {
        P10Error::DataInvalid {
          when: "Reading File Meta Information".to_string(),
          details: "Data element has invalid VR".to_string(),
          path: DataSetPath::new_with_data_element(tag),
          offset: self.stream.bytes_read(),
        }
      })?;

      // Check the VR isn't a sequence as these aren't allowed in the File
      // Meta Information
      if vr == ValueRepresentation::Sequence {
        return Err(P10Error::DataInvalid {
          when: "Reading File Meta Information".to_string(),
          details: "Data element in File Meta Information is a sequence"
            .to_string(),
          path: DataSetPath::new_with_data_element(tag),
          offset: self.stream.bytes_read(),
        });
      }

      // Read the value length based on whether the VR has a 16-bit or 32-bit
      // length stored
      let (value_offset, value_length) =
        match DataElementHeader::value_length_size(vr) {
          // 16-bit lengths are read out of the 8 bytes already peeked
          ValueLengthSize::U16 => (
            8usize,
            usize::from(byteorder::LittleEndian::read_u16(&data[6..8])),
          ),

          // 32-bit lengths require another 4 bytes to be peeked
          ValueLengthSize::U32 => {
            let data = self.stream.peek(12).map_err(|e| {
              map_byte_stream_error(
                e,
                "Reading File Meta Information",
                &self.stream,
                &self.path,
              )
            })?;

            (
              12usize,
              byteorder::LittleEndian::read_u32(&data[8..12]) as usize,
            )
          }
        };

      // Read the data element, including its header
      let data = self
        .stream
        .read(value_offset + value_length)
        .map_err(|e| {
          map_byte_stream_error(
            e,
            "Reading File Meta Information data element value",
            &self.stream,
            &self.path,
          )
        })?;

      let value = DataElementValue::new_binary_unchecked(
        vr,
        Arc::new(data[value_offset..].to_vec()),
      );

      // If this data element specifies the File Meta Information group's
      // length then use it to calculate its end offset
      if tag == dictionary::FILE_META_INFORMATION_GROUP_LENGTH.tag {
        if ends_at.is_none() && fmi_data_set.is_empty() {
          match value.get_int() {
            Ok(i) => *ends_at = Some(*starts_at + 12 + i as u64),
            Err(_) => {
              return Err(P10Error::DataInvalid {
                when: "Reading File Meta Information".to_string(),
                details: "Group length is invalid".to_string(),
                path: DataSetPath::new_with_data_element(tag),
                offset: self.stream.bytes_read(),
              });
            }
          }
        }

        continue;
      }

      // If this data element specifies the transfer syntax of the main data
      // set then resolve it. Unrecognized transfer syntax UIDs default to
      // 'Explicit VR Little Endian' with a warning, and the data element is
      // passed through unaltered.
      if tag == dictionary::TRANSFER_SYNTAX_UID.tag {
        if let Ok(uid) = value.get_string() {
          transfer_syntax = match TransferSyntax::from_uid(uid) {
            Ok(transfer_syntax) => transfer_syntax,
            Err(()) => {
              tracing::warn!(
                "Unrecognized transfer syntax UID '{uid}', assuming \
                 'Explicit VR Little Endian'"
              );

              &transfer_syntax::EXPLICIT_VR_LITTLE_ENDIAN
            }
          };
        }
      }

      fmi_data_set.insert(tag, value);
    }

    // A configured forced transfer syntax overrides whatever the File Meta
    // Information declared
    if let Some(forced_transfer_syntax) = self.config.forced_transfer_syntax {
      transfer_syntax = forced_transfer_syntax;
    }

    self.data_set_transfer_syntax = transfer_syntax;

    let token = P10Token::FileMetaInformation {
      data_set: core::mem::take(fmi_data_set),
    };

    // If the transfer syntax is deflated then all data following the File
    // Meta Information needs to pass through zlib inflate before reading
    if transfer_syntax.is_deflated
      && self.stream.start_zlib_inflate().is_err()
    {
      return Err(P10Error::DataInvalid {
        when: "Starting zlib decompression for deflated transfer syntax"
          .to_string(),
        details: "Zlib data is invalid".to_string(),
        path: DataSetPath::new(),
        offset: self.stream.bytes_read(),
      });
    }

    self.next_action = NextAction::ReadDataElementHeader;

    Ok(vec![token])
  }

  fn read_data_element_header_token(
    &mut self,
  ) -> Result<Vec<P10Token>, P10Error> {
    let header = self.read_data_element_header()?;

    // Odd lengths other than zero are malformed and are rejected outright
    if let ValueLength::Defined { length } = header.length {
      if length % 2 == 1 {
        return Err(P10Error::DataInvalid {
          when: "Reading data element header".to_string(),
          details: format!(
            "Data element '{header}' has odd length {length}"
          ),
          path: self.path.clone(),
          offset: self.stream.bytes_read(),
        });
      }
    }

    match (header.tag, header.vr, header.length) {
      // If this is an encapsulated pixel data sequence then add it to the
      // current location and update the next action to read its items
      (tag, Some(vr), ValueLength::Undefined)
        if tag == dictionary::PIXEL_DATA.tag
          && (vr == ValueRepresentation::OtherByteString
            || vr == ValueRepresentation::OtherWordString) =>
      {
        self
          .location
          .add_sequence(tag, false, None)
          .map_err(|details| P10Error::DataInvalid {
            when: "Reading data element header".to_string(),
            details,
            path: self.path.clone(),
            offset: self.stream.bytes_read(),
          })?;

        self.path.add_data_element(tag).unwrap();

        self.next_action = NextAction::ReadPixelDataItem { vr };

        Ok(vec![P10Token::SequenceStart { tag, vr }])
      }

      // If this is the start of a new sequence then add it to the location.
      // An explicit VR of UN (Unknown) with undefined length is also read as
      // a sequence, and such sequences force 'Implicit VR Little Endian' for
      // their content. Ref: DICOM Correction Proposal CP-246.
      (tag, Some(ValueRepresentation::Sequence), _)
      | (tag, Some(ValueRepresentation::Unknown), ValueLength::Undefined) => {
        let ends_at = match header.length {
          ValueLength::Defined { length } => {
            Some(self.stream.bytes_read() + u64::from(length))
          }
          ValueLength::Undefined => None,
        };

        let is_implicit_vr =
          header.vr == Some(ValueRepresentation::Unknown);

        self
          .location
          .add_sequence(tag, is_implicit_vr, ends_at)
          .map_err(|details| P10Error::DataInvalid {
            when: "Reading data element header".to_string(),
            details,
            path: self.path.clone(),
            offset: self.stream.bytes_read(),
          })?;

        if self.location.sequence_depth() > self.config.max_sequence_depth {
          return Err(P10Error::MaximumExceeded {
            details: "Maximum allowed sequence depth reached".to_string(),
            path: self.path.clone(),
            offset: self.stream.bytes_read(),
          });
        }

        self.path.add_data_element(tag).unwrap();

        Ok(vec![P10Token::SequenceStart {
          tag,
          vr: ValueRepresentation::Sequence,
        }])
      }

      // If this is the start of a new sequence item then add it to the
      // location
      (tag, None, _) if tag == dictionary::ITEM.tag => {
        let ends_at = match header.length {
          ValueLength::Defined { length } => {
            Some(self.stream.bytes_read() + u64::from(length))
          }
          ValueLength::Undefined => None,
        };

        let index = self.location.add_item(ends_at, header.length).map_err(
          |details| P10Error::DataInvalid {
            when: "Reading data element header".to_string(),
            details,
            path: self.path.clone(),
            offset: self.stream.bytes_read(),
          },
        )?;

        self.path.add_sequence_item(index).unwrap();

        Ok(vec![P10Token::SequenceItemStart { index }])
      }

      // If this is a sequence delimitation item then remove the current
      // sequence from the current location
      (tag, None, ValueLength::ZERO)
        if tag == dictionary::SEQUENCE_DELIMITATION_ITEM.tag =>
      {
        let tokens = if let Ok(tag) = self.location.end_sequence() {
          self.path.pop().unwrap();

          vec![P10Token::SequenceDelimiter { tag }]
        } else {
          // If a sequence delimiter occurs outside of a sequence then no
          // error is returned and parsing continues. Rogue sequence
          // delimiters have been observed in DICOM P10 data in the wild.
          vec![]
        };

        Ok(tokens)
      }

      // If this is an item delimitation item then remove the latest item from
      // the location
      (tag, None, ValueLength::ZERO)
        if tag == dictionary::ITEM_DELIMITATION_ITEM.tag =>
      {
        self
          .location
          .end_item()
          .map_err(|details| P10Error::DataInvalid {
            when: "Reading data element header".to_string(),
            details,
            path: self.path.clone(),
            offset: self.stream.bytes_read(),
          })?;

        self.path.pop().unwrap();

        Ok(vec![P10Token::SequenceItemDelimiter])
      }

      // For all other cases this is a standard data element that needs to
      // have its value bytes read
      (tag, Some(vr), ValueLength::Defined { length }) => {
        self
          .path
          .add_data_element(tag)
          .map_err(|_| P10Error::DataInvalid {
            when: "Reading data element header".to_string(),
            details: format!(
              "Data element '{header}' is not valid for the current path"
            ),
            path: self.path.clone(),
            offset: self.stream.bytes_read(),
          })?;

        // Swallow the '(FFFC,FFFC) Data Set Trailing Padding' data element
        // and group length elements, which have an element of 0x0000. No
        // tokens are emitted for them. Ref: PS3.10 7.2, PS3.5 7.2.
        let emit_tokens = tag != dictionary::DATA_SET_TRAILING_PADDING.tag
          && !tag.is_group_length();

        let tokens = if emit_tokens {
          vec![P10Token::DataElementHeader { tag, vr, length }]
        } else {
          vec![]
        };

        self.next_action = NextAction::ReadDataElementValueBytes {
          tag,
          vr,
          length,
          emit_tokens,
        };

        Ok(tokens)
      }

      (_, _, _) => Err(P10Error::DataInvalid {
        when: "Reading data element header".to_string(),
        details: format!("Invalid data element '{header}'"),
        path: self.path.clone(),
        offset: self.stream.bytes_read(),
      }),
    }
  }

  /// Reads a data element header. Depending on the transfer syntax and the
  /// specific VR (for explicit VR transfer syntaxes), this reads between 8
  /// and 12 bytes in total.
  ///
  fn read_data_element_header(
    &mut self,
  ) -> Result<DataElementHeader, P10Error> {
    let tag = self.read_data_element_tag()?;

    // File Meta Information data elements aren't allowed in the main data
    // set's root
    if tag.group == 0x0002 && self.path.is_root() {
      return Err(P10Error::DataInvalid {
        when: "Reading data element header".to_string(),
        details: format!(
          "File Meta Information data element '{tag}' found in the main data \
           set"
        ),
        path: DataSetPath::new_with_data_element(tag),
        offset: self.stream.bytes_read(),
      });
    }

    // The item and delimitation tags have no VR and always use a 4-byte
    // length, in both explicit and implicit VR transfer syntaxes
    if tag == dictionary::ITEM.tag
      || tag == dictionary::ITEM_DELIMITATION_ITEM.tag
      || tag == dictionary::SEQUENCE_DELIMITATION_ITEM.tag
    {
      let data = self.stream.read(4).map_err(|e| {
        self.map_byte_stream_error(e, "Reading data element header")
      })?;

      return Ok(DataElementHeader {
        tag,
        vr: None,
        length: ValueLength::new(self.read_u32(&data)),
      });
    }

    match self.active_transfer_syntax().vr_serialization {
      VrSerialization::VrExplicit => self.read_explicit_vr_and_length(tag),
      VrSerialization::VrImplicit => self.read_implicit_vr_and_length(tag),
    }
  }

  /// Reads the next data element tag, handling the transfer syntax switch at
  /// the File Meta Information boundary: the first tag that isn't in the
  /// file-meta group is initially decoded in the active (little endian)
  /// transfer syntax, and if the data set's transfer syntax turns out to be
  /// big endian the stream is rewound four bytes and the tag redecoded in the
  /// new byte order.
  ///
  fn read_data_element_tag(&mut self) -> Result<DataElementTag, P10Error> {
    let data = self.stream.read(4).map_err(|e| {
      self.map_byte_stream_error(e, "Reading data element header")
    })?;

    let mut tag = self.decode_tag(&data);

    if !self.transfer_syntax_switch_done && tag.group != 0x0002 {
      let endian_flipped = self.transfer_syntax.endianness
        != self.data_set_transfer_syntax.endianness;

      self.transfer_syntax = self.data_set_transfer_syntax;
      self.transfer_syntax_switch_done = true;

      if endian_flipped {
        self.stream.rewind(4);

        let data = self.stream.read(4).unwrap();
        tag = self.decode_tag(&data);
      }
    }

    Ok(tag)
  }

  fn decode_tag(&self, data: &[u8]) -> DataElementTag {
    match self.active_transfer_syntax().endianness {
      Endianness::LittleEndian => DataElementTag::new(
        byteorder::LittleEndian::read_u16(&data[0..2]),
        byteorder::LittleEndian::read_u16(&data[2..4]),
      ),

      Endianness::BigEndian => DataElementTag::new(
        byteorder::BigEndian::read_u16(&data[0..2]),
        byteorder::BigEndian::read_u16(&data[2..4]),
      ),
    }
  }

  fn read_u16(&self, data: &[u8]) -> u16 {
    match self.active_transfer_syntax().endianness {
      Endianness::LittleEndian => byteorder::LittleEndian::read_u16(data),
      Endianness::BigEndian => byteorder::BigEndian::read_u16(data),
    }
  }

  fn read_u32(&self, data: &[u8]) -> u32 {
    match self.active_transfer_syntax().endianness {
      Endianness::LittleEndian => byteorder::LittleEndian::read_u32(data),
      Endianness::BigEndian => byteorder::BigEndian::read_u32(data),
    }
  }

  /// Returns the transfer syntax that should be used to decode the current
  /// data. This is the active transfer syntax, except when a sequence with an
  /// explicit VR of `UN` (Unknown) and undefined length is open, which forces
  /// 'Implicit VR Little Endian'.
  ///
  /// Ref: DICOM Correction Proposal CP-246.
  ///
  fn active_transfer_syntax(&self) -> &'static TransferSyntax {
    if self.location.is_implicit_vr_forced() {
      &transfer_syntax::IMPLICIT_VR_LITTLE_ENDIAN
    } else {
      self.transfer_syntax
    }
  }

  /// Reads the value length following a data element tag when the transfer
  /// syntax is 'Implicit VR Little Endian'. The VR is provisional and comes
  /// from the dictionary.
  ///
  fn read_implicit_vr_and_length(
    &mut self,
    tag: DataElementTag,
  ) -> Result<DataElementHeader, P10Error> {
    let data = self.stream.read(4).map_err(|e| {
      self.map_byte_stream_error(e, "Reading data element header")
    })?;

    let length = ValueLength::new(self.read_u32(&data));

    Ok(DataElementHeader {
      tag,
      vr: Some(dictionary::lookup(tag).vr()),
      length,
    })
  }

  /// Reads the explicit VR and value length following a data element tag when
  /// the transfer syntax is not 'Implicit VR Little Endian'.
  ///
  fn read_explicit_vr_and_length(
    &mut self,
    tag: DataElementTag,
  ) -> Result<DataElementHeader, P10Error> {
    let vr_bytes = self.stream.read(2).map_err(|e| {
      self.map_byte_stream_error(e, "Reading explicit VR data element header")
    })?;

    let vr = match ValueRepresentation::from_bytes(&vr_bytes) {
      Ok(vr) => vr,

      // Unrecognized VRs are treated as UN (Unknown) with a warning and the
      // value is carried through as raw bytes
      Err(()) => {
        tracing::warn!(
          "Unrecognized VR {:?} for data element '{}', treating as UN",
          vr_bytes,
          dictionary::tag_with_name(tag),
        );

        ValueRepresentation::Unknown
      }
    };

    let length = match DataElementHeader::value_length_size(vr) {
      ValueLengthSize::U16 => {
        let data = self.stream.read(2).map_err(|e| {
          self
            .map_byte_stream_error(e, "Reading explicit VR data element header")
        })?;

        ValueLength::new(self.read_u16(&data).into())
      }

      // 32-bit lengths are preceded by two reserved bytes
      ValueLengthSize::U32 => {
        let data = self.stream.read(6).map_err(|e| {
          self
            .map_byte_stream_error(e, "Reading explicit VR data element header")
        })?;

        ValueLength::new(self.read_u32(&data[2..6]))
      }
    };

    Ok(DataElementHeader {
      tag,
      vr: Some(vr),
      length,
    })
  }

  fn read_data_element_value_bytes_token(
    &mut self,
    tag: DataElementTag,
    vr: ValueRepresentation,
    length: u32,
    emit_tokens: bool,
  ) -> Result<Vec<P10Token>, P10Error> {
    let mut data = match self.stream.read(length as usize) {
      Ok(data) => data,

      Err(e) => {
        let when = format!(
          "Reading {length} data element value bytes, VR: {vr}"
        );

        return Err(self.map_byte_stream_error(e, &when));
      }
    };

    // Data element values are always stored in little endian, so if this is a
    // big endian transfer syntax then convert to little endian
    if self.active_transfer_syntax().endianness.is_big() {
      vr.swap_endianness(&mut data);
    }

    let tokens = if emit_tokens {
      vec![P10Token::DataElementValueBytes {
        tag,
        vr,
        data: Arc::new(data),
      }]
    } else {
      vec![]
    };

    self.path.pop().unwrap();

    // This data element is complete, so the next action is either to read the
    // next pixel data item if currently reading pixel data items, or to read
    // the header for the next data element
    self.next_action = if tag == dictionary::ITEM.tag {
      NextAction::ReadPixelDataItem { vr }
    } else {
      NextAction::ReadDataElementHeader
    };

    Ok(tokens)
  }

  fn read_pixel_data_item_token(
    &mut self,
    vr: ValueRepresentation,
  ) -> Result<Vec<P10Token>, P10Error> {
    match self.read_data_element_header()? {
      // Pixel data items must have no VR and a defined length
      DataElementHeader {
        tag,
        vr: None,
        length: ValueLength::Defined { length },
      } if tag == dictionary::ITEM.tag => {
        if length % 2 == 1 {
          return Err(P10Error::DataInvalid {
            when: "Reading encapsulated pixel data item".to_string(),
            details: format!("Item has odd length {length}"),
            path: self.path.clone(),
            offset: self.stream.bytes_read(),
          });
        }

        // Count the item against the enclosing pixel data sequence. Pixel
        // data items hold a raw fragment rather than nested data elements,
        // so the item is closed in the location straight away.
        let index = self
          .location
          .add_item(None, ValueLength::Defined { length })
          .map_err(|details| P10Error::DataInvalid {
            when: "Reading encapsulated pixel data item".to_string(),
            details,
            path: self.path.clone(),
            offset: self.stream.bytes_read(),
          })?;
        self.location.end_item().unwrap();

        self.next_action = NextAction::ReadDataElementValueBytes {
          tag: dictionary::ITEM.tag,
          vr,
          length,
          emit_tokens: true,
        };

        self.path.add_sequence_item(index).unwrap();

        Ok(vec![P10Token::PixelDataItem { index, length }])
      }

      DataElementHeader {
        tag,
        vr: None,
        length: ValueLength::ZERO,
      } if tag == dictionary::SEQUENCE_DELIMITATION_ITEM.tag => {
        self.location.end_sequence().map_err(|details| {
          P10Error::DataInvalid {
            when: "Reading encapsulated pixel data item".to_string(),
            details,
            path: self.path.clone(),
            offset: self.stream.bytes_read(),
          }
        })?;

        self.path.pop().unwrap();

        self.next_action = NextAction::ReadDataElementHeader;

        Ok(vec![P10Token::SequenceDelimiter {
          tag: dictionary::PIXEL_DATA.tag,
        }])
      }

      header => Err(P10Error::DataInvalid {
        when: "Reading encapsulated pixel data item".to_string(),
        details: format!("Invalid data element '{header}'"),
        path: self.path.clone(),
        offset: self.stream.bytes_read(),
      }),
    }
  }

  /// Takes an error from the byte stream and maps it through to a P10 error.
  ///
  fn map_byte_stream_error(
    &self,
    error: ByteStreamError,
    when: &str,
  ) -> P10Error {
    map_byte_stream_error(error, when, &self.stream, &self.path)
  }
}

/// Takes an error from the byte stream and maps it through to a P10 error.
///
fn map_byte_stream_error(
  error: ByteStreamError,
  when: &str,
  stream: &ByteStream,
  path: &DataSetPath,
) -> P10Error {
  let offset = stream.bytes_read();

  match error {
    ByteStreamError::DataEnd => P10Error::DataEndedUnexpectedly {
      when: when.to_string(),
      path: path.clone(),
      offset,
    },

    ByteStreamError::ZlibDataError => P10Error::DataInvalid {
      when: when.to_string(),
      details: "Zlib data is invalid".to_string(),
      path: path.clone(),
      offset,
    },
  }
}
