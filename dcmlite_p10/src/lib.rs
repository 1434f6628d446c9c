//! Reads and writes the DICOM Part 10 (P10) binary format used to store and
//! transmit DICOM-based medical imaging information.

pub mod data_set_builder;
pub mod p10_error;
pub mod p10_read;
pub mod p10_read_config;
pub mod p10_token;
pub mod p10_write;
pub mod p10_write_config;
pub mod uids;

mod internal;

use std::{fs::File, io::Read, io::Write, path::Path};

use dcmlite_core::DataSet;

pub use data_set_builder::DataSetBuilder;
pub use p10_error::P10Error;
pub use p10_read::P10ReadContext;
pub use p10_read_config::P10ReadConfig;
pub use p10_token::P10Token;
pub use p10_write::P10WriteContext;
pub use p10_write_config::P10WriteConfig;

/// Returns whether a file contains DICOM P10 data by checking for the
/// presence of the 'DICM' prefix at offset 128.
///
pub fn is_valid_file<P: AsRef<Path>>(filename: P) -> bool {
  match File::open(filename) {
    Ok(mut file) => {
      let mut buffer = [0u8; 132];
      match file.read_exact(&mut buffer) {
        Ok(_) => is_valid_bytes(&buffer),
        Err(_) => false,
      }
    }
    Err(_) => false,
  }
}

/// Returns whether the given bytes contain DICOM P10 data by checking for the
/// presence of the 'DICM' prefix at offset 128.
///
pub fn is_valid_bytes(bytes: &[u8]) -> bool {
  bytes.len() >= 132 && bytes[128..132] == *b"DICM".as_slice()
}

/// Reads DICOM P10 data from a file into an in-memory data set.
///
pub fn read_file<P: AsRef<Path>>(
  filename: P,
  config: Option<P10ReadConfig>,
) -> Result<DataSet, P10Error> {
  match read_file_returning_builder_on_error(filename, config) {
    Ok(data_set) => Ok(data_set),
    Err((e, _)) => Err(e),
  }
}

/// Reads DICOM P10 data from a file into an in-memory data set. In the case
/// of an error occurring during the read both the error and the data set
/// builder at the time of the error are returned.
///
/// This allows for the data that was successfully read prior to the error to
/// be converted into a partially-complete data set via
/// [`DataSetBuilder::force_end`].
///
pub fn read_file_returning_builder_on_error<P: AsRef<Path>>(
  filename: P,
  config: Option<P10ReadConfig>,
) -> Result<DataSet, (P10Error, Box<DataSetBuilder>)> {
  let bytes = std::fs::read(filename).map_err(|e| {
    (
      P10Error::FileError {
        when: "Opening file".to_string(),
        details: e.to_string(),
      },
      Box::new(DataSetBuilder::new()),
    )
  })?;

  read_bytes(bytes, config)
}

/// Reads DICOM P10 data from a read stream into an in-memory data set. This
/// consumes all data available in the read stream.
///
pub fn read_stream(
  stream: &mut dyn Read,
  config: Option<P10ReadConfig>,
) -> Result<DataSet, (P10Error, Box<DataSetBuilder>)> {
  let mut bytes = vec![];

  stream.read_to_end(&mut bytes).map_err(|e| {
    (
      P10Error::FileError {
        when: "Reading from stream".to_string(),
        details: e.to_string(),
      },
      Box::new(DataSetBuilder::new()),
    )
  })?;

  read_bytes(bytes, config)
}

/// Reads DICOM P10 data from a vector of bytes into a data set. In the case
/// of an error occurring during the read both the error and the data set
/// builder at the time of the error are returned, allowing the partially
/// built data set to be recovered.
///
pub fn read_bytes(
  bytes: Vec<u8>,
  config: Option<P10ReadConfig>,
) -> Result<DataSet, (P10Error, Box<DataSetBuilder>)> {
  let mut builder = if config.is_some_and(|c| c.overwrite_duplicates) {
    Box::new(DataSetBuilder::new_with_overwrite())
  } else {
    Box::new(DataSetBuilder::new())
  };

  let mut context = P10ReadContext::new(bytes, config);

  loop {
    // Read the next tokens from the context
    let tokens = match context.read_tokens() {
      Ok(tokens) => tokens,
      Err(e) => return Err((e, builder)),
    };

    // Add the new tokens to the data set builder
    for token in tokens.iter() {
      match builder.add_token(token) {
        Ok(_) => (),
        Err(e) => return Err((e, builder)),
      };
    }

    // If the data set builder is now complete then return the final data set
    if let Ok(final_data_set) = builder.final_data_set() {
      return Ok(final_data_set);
    }
  }
}

/// Writes a data set to a DICOM P10 file. This will overwrite any existing
/// file with the given name.
///
pub fn write_file<P: AsRef<Path>>(
  filename: P,
  data_set: &DataSet,
  config: Option<P10WriteConfig>,
) -> Result<(), P10Error> {
  match File::create(filename) {
    Ok(mut file) => write_stream(&mut file, data_set, config),
    Err(e) => Err(P10Error::FileError {
      when: "Opening file".to_string(),
      details: e.to_string(),
    }),
  }
}

/// Writes a data set as DICOM P10 bytes directly to a write stream.
///
pub fn write_stream(
  stream: &mut dyn Write,
  data_set: &DataSet,
  config: Option<P10WriteConfig>,
) -> Result<(), P10Error> {
  let mut bytes_callback = |p10_bytes: Vec<u8>| -> Result<(), P10Error> {
    stream
      .write_all(&p10_bytes)
      .map_err(|e| P10Error::FileError {
        when: "Writing DICOM P10 data to stream".to_string(),
        details: e.to_string(),
      })
  };

  p10_write::data_set_to_bytes(data_set, &mut bytes_callback, config)?;

  stream.flush().map_err(|e| P10Error::FileError {
    when: "Writing DICOM P10 data to stream".to_string(),
    details: e.to_string(),
  })
}

/// Writes a data set to an in-memory vector of DICOM P10 bytes.
///
pub fn write_bytes(
  data_set: &DataSet,
  config: Option<P10WriteConfig>,
) -> Result<Vec<u8>, P10Error> {
  let mut bytes = vec![];

  let mut bytes_callback = |p10_bytes: Vec<u8>| -> Result<(), P10Error> {
    bytes.extend_from_slice(&p10_bytes);
    Ok(())
  };

  p10_write::data_set_to_bytes(data_set, &mut bytes_callback, config)?;

  Ok(bytes)
}

/// Adds functions to [`DataSet`] for converting to and from the DICOM P10
/// format.
///
pub trait DataSetP10Extensions
where
  Self: Sized,
{
  /// Reads DICOM P10 data from a file into an in-memory data set.
  ///
  fn read_p10_file<P: AsRef<Path>>(filename: P) -> Result<Self, P10Error>;

  /// Reads DICOM P10 data from a vector of bytes into a data set.
  ///
  fn read_p10_bytes(bytes: Vec<u8>) -> Result<Self, P10Error>;

  /// Writes a data set to a DICOM P10 file. This will overwrite any existing
  /// file with the given name.
  ///
  fn write_p10_file<P: AsRef<Path>>(
    &self,
    filename: P,
    config: Option<P10WriteConfig>,
  ) -> Result<(), P10Error>;

  /// Writes a data set to an in-memory vector of DICOM P10 bytes.
  ///
  fn to_p10_bytes(
    &self,
    config: Option<P10WriteConfig>,
  ) -> Result<Vec<u8>, P10Error>;

  /// Serializes only the data set portion of a DICOM object into chunks that
  /// are each no larger than `max_chunk_size`.
  ///
  fn to_p10_chunks(
    &self,
    max_chunk_size: usize,
  ) -> Result<Vec<Vec<u8>>, P10Error>;
}

impl DataSetP10Extensions for DataSet {
  fn read_p10_file<P: AsRef<Path>>(filename: P) -> Result<Self, P10Error> {
    read_file(filename, None)
  }

  fn read_p10_bytes(bytes: Vec<u8>) -> Result<Self, P10Error> {
    read_bytes(bytes, None).map_err(|e| e.0)
  }

  fn write_p10_file<P: AsRef<Path>>(
    &self,
    filename: P,
    config: Option<P10WriteConfig>,
  ) -> Result<(), P10Error> {
    write_file(filename, self, config)
  }

  fn to_p10_bytes(
    &self,
    config: Option<P10WriteConfig>,
  ) -> Result<Vec<u8>, P10Error> {
    write_bytes(self, config)
  }

  fn to_p10_chunks(
    &self,
    max_chunk_size: usize,
  ) -> Result<Vec<Vec<u8>>, P10Error> {
    p10_write::data_set_to_chunks(self, max_chunk_size)
  }
}
