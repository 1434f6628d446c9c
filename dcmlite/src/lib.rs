//! dcmlite is a library for working with the DICOM standard, the
//! international standard for medical images and related information. It
//! reads and writes the DICOM Part 10 binary format into an in-memory data
//! set model, and anonymizes batches of DICOM files with a persistent audit
//! trail.

mod integration_tests;

/// Anonymization of DICOM files by rewriting data elements that identify the
/// patient.
///
/// This module is a re-export of the `dcmlite_anonymize` crate.
///
pub mod anonymize {
  pub use dcmlite_anonymize::*;
}

/// Provides core DICOM concepts including data sets, data elements, value
/// representations, transfer syntaxes, and the data element dictionary.
///
/// This module is a re-export of the `dcmlite_core` crate.
///
pub mod core {
  pub use dcmlite_core::*;
}

/// Reads and writes the DICOM Part 10 (P10) binary format used to store and
/// transmit DICOM-based medical imaging information.
///
/// This module is a re-export of the `dcmlite_p10` crate.
///
pub mod p10 {
  pub use dcmlite_p10::*;
}
