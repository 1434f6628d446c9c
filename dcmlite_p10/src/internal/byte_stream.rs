//! A byte stream over an in-memory buffer of DICOM P10 data, with a cursor
//! that supports reading, peeking, skipping and rewinding.
//!
//! The remainder of the buffer can be passed through zlib inflate when a
//! deflated transfer syntax is encountered, after which the cursor continues
//! over the inflated bytes.

#[derive(Debug)]
pub struct ByteStream {
  bytes: Vec<u8>,
  cursor: usize,
  bytes_read: u64,
}

#[derive(Debug, PartialEq)]
pub enum ByteStreamError {
  /// Data was not read because it would go past the end of the byte stream.
  DataEnd,

  /// The remaining data could not be inflated because it is not valid
  /// deflated data.
  ZlibDataError,
}

/// Zlib data is inflated in chunks of this size.
///
const ZLIB_INFLATE_CHUNK_SIZE: usize = 64 * 1024;

impl ByteStream {
  /// Creates a new byte stream over the given bytes.
  ///
  pub fn new(bytes: Vec<u8>) -> ByteStream {
    ByteStream {
      bytes,
      cursor: 0,
      bytes_read: 0,
    }
  }

  /// Returns the total number of bytes that have been successfully read out
  /// of a byte stream. Rewinding moves this count back.
  ///
  pub fn bytes_read(&self) -> u64 {
    self.bytes_read
  }

  /// Returns the number of unread bytes remaining.
  ///
  pub fn remaining(&self) -> usize {
    self.bytes.len() - self.cursor
  }

  /// Returns whether all bytes in the stream have been read.
  ///
  pub fn is_fully_consumed(&self) -> bool {
    self.remaining() == 0
  }

  /// Reads bytes out of a byte stream, advancing the cursor.
  ///
  pub fn read(&mut self, byte_count: usize) -> Result<Vec<u8>, ByteStreamError> {
    if byte_count > self.remaining() {
      return Err(ByteStreamError::DataEnd);
    }

    let data = self.bytes[self.cursor..self.cursor + byte_count].to_vec();

    self.cursor += byte_count;
    self.bytes_read += byte_count as u64;

    Ok(data)
  }

  /// Peeks at the next bytes that will be read out of a byte stream without
  /// consuming them.
  ///
  pub fn peek(&self, byte_count: usize) -> Result<&[u8], ByteStreamError> {
    if byte_count > self.remaining() {
      return Err(ByteStreamError::DataEnd);
    }

    Ok(&self.bytes[self.cursor..self.cursor + byte_count])
  }

  /// Skips over the specified number of bytes.
  ///
  pub fn skip(&mut self, byte_count: usize) -> Result<(), ByteStreamError> {
    if byte_count > self.remaining() {
      return Err(ByteStreamError::DataEnd);
    }

    self.cursor += byte_count;
    self.bytes_read += byte_count as u64;

    Ok(())
  }

  /// Moves the cursor back by the specified number of bytes so they can be
  /// read again. Used when the first data set tag has to be redecoded after
  /// an endianness change at the File Meta Information boundary.
  ///
  pub fn rewind(&mut self, byte_count: usize) {
    assert!(byte_count <= self.cursor, "Rewind past the start of the stream");

    self.cursor -= byte_count;
    self.bytes_read -= byte_count as u64;
  }

  /// Passes all remaining unread bytes through zlib inflate and continues the
  /// stream over the inflated bytes. This is used when reading DICOM P10 data
  /// that uses a deflated transfer syntax.
  ///
  pub fn start_zlib_inflate(&mut self) -> Result<(), ByteStreamError> {
    let mut zlib_stream = flate2::Decompress::new(false);

    let deflated = &self.bytes[self.cursor..];
    let mut inflated = Vec::with_capacity(deflated.len() * 2);

    loop {
      let total_in = zlib_stream.total_in() as usize;
      let total_out = zlib_stream.total_out();

      let mut output_buffer = vec![0u8; ZLIB_INFLATE_CHUNK_SIZE];

      let status = zlib_stream
        .decompress(
          &deflated[total_in..],
          &mut output_buffer,
          flate2::FlushDecompress::Finish,
        )
        .map_err(|_| ByteStreamError::ZlibDataError)?;

      let bytes_produced = (zlib_stream.total_out() - total_out) as usize;
      output_buffer.truncate(bytes_produced);
      inflated.append(&mut output_buffer);

      match status {
        flate2::Status::StreamEnd => break,

        _ => {
          let has_input_remaining =
            (zlib_stream.total_in() as usize) < deflated.len();

          if !has_input_remaining && bytes_produced == 0 {
            break;
          }
        }
      }
    }

    self.bytes = inflated;
    self.cursor = 0;

    Ok(())
  }
}
