//! Return file reconciliation
//!
//! The engine walks decoded lines in physical order, validates detail
//! records, sums accepted values with fixed-point arithmetic and folds
//! decode and semantic failures into one ordered error list.

use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::codec::{DecodedLine, Layout, LineError, ParsedLine};
use crate::traits::{DefaultDetailValidator, DetailValidator};

/// Trailer totals compared against the reconciled figures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrailerCheck {
    pub line_index: usize,
    pub declared_count: u64,
    pub declared_total: BigDecimal,
    pub count_matches: bool,
    pub total_matches: bool,
}

impl TrailerCheck {
    pub fn is_consistent(&self) -> bool {
        self.count_matches && self.total_matches
    }
}

/// Aggregate over one batch file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    pub layout_id: String,
    /// Lines that decoded structurally, of any record type
    pub candidate_lines: u64,
    /// Decoded lines of the detail record type
    pub detail_lines: u64,
    pub accepted: u64,
    pub rejected: u64,
    /// Sum of accepted detail values
    pub total_value: BigDecimal,
    /// Decode and semantic errors in physical line order
    pub errors: Vec<LineError>,
    pub trailer: Option<TrailerCheck>,
}

impl ReconciliationSummary {
    fn empty(layout_id: &str) -> Self {
        Self {
            layout_id: layout_id.to_string(),
            candidate_lines: 0,
            detail_lines: 0,
            accepted: 0,
            rejected: 0,
            total_value: BigDecimal::from(0),
            errors: Vec::new(),
            trailer: None,
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Human-readable error report, one line per rejected line
    pub fn error_report(&self) -> String {
        self.errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Classifies and totals decoded lines
///
/// The engine keeps no state between runs, so reconciling the same input
/// twice yields identical summaries.
pub struct ReconciliationEngine {
    validator: Box<dyn DetailValidator>,
}

impl Default for ReconciliationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconciliationEngine {
    pub fn new() -> Self {
        Self {
            validator: Box::new(DefaultDetailValidator),
        }
    }

    /// Create an engine with a custom detail validator
    pub fn with_validator(validator: Box<dyn DetailValidator>) -> Self {
        Self { validator }
    }

    /// Reconcile a sequence of decoded lines
    pub fn reconcile<I>(&self, lines: I, layout: &Layout) -> ReconciliationSummary
    where
        I: IntoIterator<Item = DecodedLine>,
    {
        let mut summary = ReconciliationSummary::empty(&layout.id);
        let mut trailer_line = None;

        for decoded in lines {
            let line = match decoded {
                Ok(line) => line,
                Err(error) => {
                    summary.rejected += 1;
                    summary.errors.push(error);
                    continue;
                }
            };
            summary.candidate_lines += 1;

            if line.record_type() == layout.detail_record {
                summary.detail_lines += 1;
                match self.validator.validate_detail(&line, layout) {
                    Ok(value) => {
                        summary.accepted += 1;
                        summary.total_value += value;
                    }
                    Err(reason) => {
                        summary.rejected += 1;
                        summary.errors.push(LineError::new(line.line_index, reason));
                    }
                }
            } else if layout
                .trailer
                .as_ref()
                .is_some_and(|t| t.record == line.record_type())
            {
                trailer_line = Some(line);
            }
        }

        if let Some(line) = trailer_line {
            summary.trailer = trailer_check(&line, layout, &summary);
        }

        summary
    }
}

fn trailer_check(
    line: &ParsedLine,
    layout: &Layout,
    summary: &ReconciliationSummary,
) -> Option<TrailerCheck> {
    let control = layout.trailer.as_ref()?;
    let declared_count = line.field(&control.count_field)?.as_integer()?;
    let declared_total = line.field(&control.total_field)?.as_decimal()?.clone();

    Some(TrailerCheck {
        line_index: line.line_index,
        declared_count,
        count_matches: declared_count == summary.detail_lines,
        total_matches: declared_total == summary.total_value,
        declared_total,
    })
}
