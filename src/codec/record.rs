//! Decoded record values and per-line errors

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Typed value of one positional field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldValue {
    Decimal(BigDecimal),
    Integer(u64),
    Date(Option<NaiveDate>),
    Text(String),
}

impl FieldValue {
    pub fn as_decimal(&self) -> Option<&BigDecimal> {
        match self {
            FieldValue::Decimal(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<u64> {
        match self {
            FieldValue::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(value) => *value,
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(value) => Some(value),
            _ => None,
        }
    }

    /// Blank text or an absent date
    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Text(value) => value.trim().is_empty(),
            FieldValue::Date(value) => value.is_none(),
            FieldValue::Decimal(_) | FieldValue::Integer(_) => false,
        }
    }
}

/// A record independent of its position in a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub record_type: String,
    pub fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new(record_type: &str) -> Self {
        Self {
            record_type: record_type.to_string(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field setter
    pub fn with(mut self, name: &str, value: FieldValue) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}

/// One line resolved into a structured record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedLine {
    /// 1-based physical line number
    pub line_index: usize,
    pub raw_length: usize,
    pub record: Record,
}

impl ParsedLine {
    pub fn record_type(&self) -> &str {
        &self.record.record_type
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.record.get(name)
    }

    pub fn into_record(self) -> Record {
        self.record
    }
}

/// Why a single line was rejected
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum LineErrorReason {
    #[error("line length {actual} does not match the expected {expected}")]
    LineLengthMismatch { expected: usize, actual: usize },
    #[error("no record type matches the line")]
    UnknownRecordType,
    #[error("field '{field}' is invalid: {message}")]
    InvalidField { field: String, message: String },
    #[error("required field '{0}' is empty")]
    MissingField(String),
    #[error("field '{0}' is negative")]
    NegativeValue(String),
    #[error("{0}")]
    Rejected(String),
}

/// Per-line error descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineError {
    /// 1-based physical line number
    pub line_index: usize,
    pub reason: LineErrorReason,
}

impl LineError {
    pub fn new(line_index: usize, reason: LineErrorReason) -> Self {
        Self { line_index, reason }
    }
}

impl std::fmt::Display for LineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line_index, self.reason)
    }
}

/// Outcome of decoding one non-blank line
pub type DecodedLine = Result<ParsedLine, LineError>;
