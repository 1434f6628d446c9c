//! Provides core DICOM concepts including data sets, data elements, value
//! representations, transfer syntaxes, and a dictionary of the data elements
//! defined in DICOM PS3.6.

pub mod data_element_tag;
pub mod data_element_value;
pub mod data_error;
pub mod data_set;
pub mod data_set_path;
pub mod dictionary;
pub mod error;
pub mod transfer_syntax;
pub mod uid;
pub mod value_multiplicity;
pub mod value_representation;

pub use data_element_tag::DataElementTag;
pub use data_element_value::DataElementValue;
pub use data_error::DataError;
pub use data_set::DataSet;
pub use data_set_path::DataSetPath;
pub use error::DcmliteError;
pub use transfer_syntax::TransferSyntax;
pub use value_multiplicity::ValueMultiplicity;
pub use value_representation::ValueRepresentation;
