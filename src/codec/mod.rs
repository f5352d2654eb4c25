//! Fixed-width batch file codec
//!
//! Layouts are declarative: a [`Layout`] lists record types and their
//! positional [`FieldDescriptor`]s, and [`decode`]/[`encode`] interpret any
//! layout generically. Adding a bank layout is a data change.

pub mod cnab240;
pub mod fixed_width;
pub mod layout;
pub mod record;

pub use cnab240::*;
pub use fixed_width::*;
pub use layout::*;
pub use record::*;

/// Hard codec failures
///
/// Per-line decode problems are reported as [`LineError`] values instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("Field '{field}' overflows its width of {width}: {value}")]
    FieldOverflow {
        field: String,
        width: usize,
        value: String,
    },
    #[error("Unknown record type: {0}")]
    UnknownRecordType(String),
    #[error("Unknown field '{field}' for record type '{record_type}'")]
    UnknownField { record_type: String, field: String },
    #[error("Invalid value for field '{field}': {message}")]
    InvalidValue { field: String, message: String },
    #[error("Invalid layout: {0}")]
    InvalidLayout(String),
}

/// Result type for codec operations
pub type CodecResult<T> = Result<T, CodecError>;
