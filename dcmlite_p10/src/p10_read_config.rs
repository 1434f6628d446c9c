//! Configuration used when reading DICOM P10 data.

use dcmlite_core::TransferSyntax;

/// Configuration used when reading DICOM P10 data.
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct P10ReadConfig {
  pub(crate) require_dicm_prefix: bool,
  pub(crate) max_sequence_depth: usize,
  pub(crate) fallback_transfer_syntax: &'static TransferSyntax,
  pub(crate) forced_transfer_syntax: Option<&'static TransferSyntax>,
  pub(crate) overwrite_duplicates: bool,
}

impl Default for P10ReadConfig {
  fn default() -> Self {
    Self {
      require_dicm_prefix: false,
      max_sequence_depth: 10_000,
      fallback_transfer_syntax:
        &dcmlite_core::transfer_syntax::IMPLICIT_VR_LITTLE_ENDIAN,
      forced_transfer_syntax: None,
      overwrite_duplicates: false,
    }
  }
}

impl P10ReadConfig {
  /// Whether the 'DICM' prefix at offset 128 is required to be present.
  /// When not required, data without the prefix is read from offset 0 using
  /// the fallback transfer syntax.
  ///
  /// Default: false.
  ///
  pub fn require_dicm_prefix(mut self, value: bool) -> Self {
    self.require_dicm_prefix = value;
    self
  }

  /// The maximum sequence depth that can be read. This can be used to reject
  /// malformed data that would otherwise consume unbounded resources.
  ///
  /// Default: 10,000.
  ///
  pub fn max_sequence_depth(mut self, value: usize) -> Self {
    self.max_sequence_depth = value;
    self
  }

  /// The transfer syntax to use when the data doesn't specify one in its File
  /// Meta Information, or doesn't have any File Meta Information.
  ///
  /// Default: 'Implicit VR Little Endian'.
  ///
  pub fn fallback_transfer_syntax(
    mut self,
    value: &'static TransferSyntax,
  ) -> Self {
    self.fallback_transfer_syntax = value;
    self
  }

  /// A transfer syntax that overrides whatever the File Meta Information
  /// specifies. The main data set is then always read using this transfer
  /// syntax.
  ///
  /// Default: none.
  ///
  pub fn forced_transfer_syntax(
    mut self,
    value: &'static TransferSyntax,
  ) -> Self {
    self.forced_transfer_syntax = Some(value);
    self
  }

  /// Whether duplicate data elements replace the previously read value.
  /// When disabled, the first value is kept and a warning is logged for the
  /// duplicate.
  ///
  /// Default: false.
  ///
  pub fn overwrite_duplicates(mut self, value: bool) -> Self {
    self.overwrite_duplicates = value;
    self
  }
}
