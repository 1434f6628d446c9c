//! Configuration used when writing DICOM P10 data.

/// Configuration used when writing DICOM P10 data.
///
#[derive(Clone, Debug, PartialEq)]
pub struct P10WriteConfig {
  pub(crate) zlib_compression_level: u32,
  pub(crate) source_application_entity_title: String,
}

impl Default for P10WriteConfig {
  fn default() -> Self {
    Self {
      zlib_compression_level: 6,
      source_application_entity_title: "DCMLITE".to_string(),
    }
  }
}

impl P10WriteConfig {
  /// The zlib compression level to use when the transfer syntax being written
  /// is deflated. The level ranges from 0, meaning no compression, through to
  /// 9, which gives the best compression at the cost of speed.
  ///
  /// Default: 6.
  ///
  pub fn zlib_compression_level(mut self, value: u32) -> Self {
    self.zlib_compression_level = value.clamp(0, 9);
    self
  }

  /// The value inserted into the *'(0002,0016) Source Application Entity
  /// Title'* data element of the File Meta Information when it doesn't
  /// already specify one.
  ///
  /// Default: `"DCMLITE"`.
  ///
  pub fn source_application_entity_title(mut self, value: &str) -> Self {
    self.source_application_entity_title = value.to_string();
    self
  }
}
