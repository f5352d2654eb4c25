//! Declarative fixed-width layout descriptors

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::{CodecError, CodecResult};

/// Width of a `DDMMYYYY` date field
pub const DATE_FIELD_WIDTH: usize = 8;

/// Widest integer field that always fits in a `u64`
pub const MAX_INTEGER_WIDTH: usize = 19;

/// Positional field types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldType {
    /// Zero-padded digits with `scale` implied decimal places
    Decimal { scale: u32 },
    /// Zero-padded unsigned integer
    Integer,
    /// `DDMMYYYY`; all zeros or blanks mean "no date"
    Date,
    /// Space-padded text, trimmed on decode
    Text,
}

/// One positional field of a record type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    /// Zero-based byte offset
    pub start: usize,
    pub length: usize,
    pub field_type: FieldType,
    /// Required fields must be non-blank for a detail line to be accepted
    pub required: bool,
}

impl FieldDescriptor {
    pub fn new(name: &str, start: usize, length: usize, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            start,
            length,
            field_type,
            required: false,
        }
    }

    pub fn text(name: &str, start: usize, length: usize) -> Self {
        Self::new(name, start, length, FieldType::Text)
    }

    pub fn integer(name: &str, start: usize, length: usize) -> Self {
        Self::new(name, start, length, FieldType::Integer)
    }

    pub fn decimal(name: &str, start: usize, length: usize, scale: u32) -> Self {
        Self::new(name, start, length, FieldType::Decimal { scale })
    }

    pub fn date(name: &str, start: usize) -> Self {
        Self::new(name, start, DATE_FIELD_WIDTH, FieldType::Date)
    }

    /// Mark the field as required
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Exclusive end offset
    pub fn end(&self) -> usize {
        self.start + self.length
    }
}

/// Fixed code identifying a record type at a known offset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discriminant {
    pub offset: usize,
    pub code: String,
}

impl Discriminant {
    pub fn end(&self) -> usize {
        self.offset + self.code.len()
    }
}

/// Layout of one record type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordLayout {
    pub name: String,
    /// Exact byte length every line of this type must have
    pub line_length: usize,
    pub discriminant: Option<Discriminant>,
    pub fields: Vec<FieldDescriptor>,
}

impl RecordLayout {
    pub fn new(name: &str, line_length: usize) -> Self {
        Self {
            name: name.to_string(),
            line_length,
            discriminant: None,
            fields: Vec::new(),
        }
    }

    /// Discriminate this record type by a fixed code at `offset`
    pub fn with_discriminant(mut self, offset: usize, code: &str) -> Self {
        self.discriminant = Some(Discriminant {
            offset,
            code: code.to_string(),
        });
        self
    }

    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether the line carries this record type's discriminant
    ///
    /// Record types without a discriminant match every line.
    pub fn matches_discriminant(&self, line: &[u8]) -> bool {
        match &self.discriminant {
            None => true,
            Some(d) => line.get(d.offset..d.end()) == Some(d.code.as_bytes()),
        }
    }

    /// Check names, widths, bounds and overlaps of this record type
    pub fn validate(&self) -> CodecResult<()> {
        if self.name.trim().is_empty() {
            return Err(CodecError::InvalidLayout(
                "Record type name cannot be empty".to_string(),
            ));
        }

        if let Some(d) = &self.discriminant {
            if d.code.is_empty() || d.end() > self.line_length {
                return Err(CodecError::InvalidLayout(format!(
                    "Discriminant of '{}' must be non-empty and fit in {} bytes",
                    self.name, self.line_length
                )));
            }
        }

        let mut names = HashSet::new();
        for field in &self.fields {
            if !names.insert(field.name.as_str()) {
                return Err(CodecError::InvalidLayout(format!(
                    "Field '{}' is declared twice in '{}'",
                    field.name, self.name
                )));
            }
            if field.length == 0 || field.end() > self.line_length {
                return Err(CodecError::InvalidLayout(format!(
                    "Field '{}' of '{}' does not fit in {} bytes",
                    field.name, self.name, self.line_length
                )));
            }
            match field.field_type {
                FieldType::Date if field.length != DATE_FIELD_WIDTH => {
                    return Err(CodecError::InvalidLayout(format!(
                        "Date field '{}' must be {} bytes wide",
                        field.name, DATE_FIELD_WIDTH
                    )));
                }
                FieldType::Integer if field.length > MAX_INTEGER_WIDTH => {
                    return Err(CodecError::InvalidLayout(format!(
                        "Integer field '{}' cannot exceed {} digits",
                        field.name, MAX_INTEGER_WIDTH
                    )));
                }
                _ => {}
            }
        }

        let mut spans: Vec<(usize, usize, &str)> = self
            .fields
            .iter()
            .map(|f| (f.start, f.end(), f.name.as_str()))
            .collect();
        if let Some(d) = &self.discriminant {
            spans.push((d.offset, d.end(), "<discriminant>"));
        }
        spans.sort();
        for pair in spans.windows(2) {
            if pair[1].0 < pair[0].1 {
                return Err(CodecError::InvalidLayout(format!(
                    "Fields '{}' and '{}' overlap in '{}'",
                    pair[0].2, pair[1].2, self.name
                )));
            }
        }

        Ok(())
    }
}

/// Trailer fields used to cross-check a reconciled batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrailerControl {
    pub record: String,
    pub count_field: String,
    pub total_field: String,
}

/// Complete layout of a bank batch file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub id: String,
    /// Record types in match priority order
    pub records: Vec<RecordLayout>,
    /// Record type holding the instructions being reconciled
    pub detail_record: String,
    /// Decimal field of the detail record summed by reconciliation
    pub value_field: String,
    pub trailer: Option<TrailerControl>,
}

impl Layout {
    pub fn record(&self, name: &str) -> Option<&RecordLayout> {
        self.records.iter().find(|r| r.name == name)
    }

    pub fn detail(&self) -> Option<&RecordLayout> {
        self.record(&self.detail_record)
    }

    /// Check the layout is internally consistent
    pub fn validate(&self) -> CodecResult<()> {
        if self.records.is_empty() {
            return Err(CodecError::InvalidLayout(format!(
                "Layout '{}' declares no record types",
                self.id
            )));
        }

        let mut names = HashSet::new();
        for record in &self.records {
            record.validate()?;
            if !names.insert(record.name.as_str()) {
                return Err(CodecError::InvalidLayout(format!(
                    "Record type '{}' is declared twice",
                    record.name
                )));
            }
        }

        // Same-length record types must be told apart by distinct discriminants
        for (i, a) in self.records.iter().enumerate() {
            for b in &self.records[i + 1..] {
                if a.line_length != b.line_length {
                    continue;
                }
                let distinct = match (&a.discriminant, &b.discriminant) {
                    (Some(da), Some(db)) => da.offset != db.offset || da.code != db.code,
                    _ => false,
                };
                if !distinct {
                    return Err(CodecError::InvalidLayout(format!(
                        "Record types '{}' and '{}' share length {} without distinct discriminants",
                        a.name, b.name, a.line_length
                    )));
                }
            }
        }

        let detail = self.detail().ok_or_else(|| {
            CodecError::InvalidLayout(format!(
                "Detail record '{}' is not declared",
                self.detail_record
            ))
        })?;
        match detail.field(&self.value_field).map(|f| f.field_type) {
            Some(FieldType::Decimal { .. }) => {}
            _ => {
                return Err(CodecError::InvalidLayout(format!(
                    "Value field '{}' must be a decimal field of '{}'",
                    self.value_field, self.detail_record
                )))
            }
        }

        if let Some(trailer) = &self.trailer {
            let record = self.record(&trailer.record).ok_or_else(|| {
                CodecError::InvalidLayout(format!(
                    "Trailer record '{}' is not declared",
                    trailer.record
                ))
            })?;
            let count_ok = matches!(
                record.field(&trailer.count_field).map(|f| f.field_type),
                Some(FieldType::Integer)
            );
            let total_ok = matches!(
                record.field(&trailer.total_field).map(|f| f.field_type),
                Some(FieldType::Decimal { .. })
            );
            if !count_ok || !total_ok {
                return Err(CodecError::InvalidLayout(format!(
                    "Trailer '{}' needs an integer count and a decimal total",
                    trailer.record
                )));
            }
        }

        Ok(())
    }
}

/// Layouts by identifier
#[derive(Debug, Clone, Default)]
pub struct LayoutRegistry {
    layouts: HashMap<String, Arc<Layout>>,
}

impl LayoutRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the reference layouts
    pub fn with_defaults() -> CodecResult<Self> {
        let mut registry = Self::new();
        registry.register(super::cnab240_reference())?;
        Ok(registry)
    }

    /// Validate and register a layout, replacing any with the same id
    pub fn register(&mut self, layout: Layout) -> CodecResult<()> {
        layout.validate()?;
        self.layouts.insert(layout.id.clone(), Arc::new(layout));
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<Layout>> {
        self.layouts.get(id).cloned()
    }
}
