//! UIDs specific to this library.

/// The implementation class UID written into the File Meta Information of
/// serialized DICOM P10 data when none is present.
///
pub const DCMLITE_IMPLEMENTATION_CLASS_UID: &str =
  "1.2.826.0.1.3680043.10.1691.1";

/// The implementation version name that accompanies
/// [`DCMLITE_IMPLEMENTATION_CLASS_UID`].
///
pub const DCMLITE_IMPLEMENTATION_VERSION_NAME: &str = "DCMLITE_0.1.0";
