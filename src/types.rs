//! Core types and data structures for the remittance lifecycle

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::codec::CodecError;
use crate::reconciliation::ReconciliationSummary;

/// Direction of a remittance file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemittanceKind {
    /// Outbound batch of payment/collection instructions sent to a bank
    Outbound,
    /// Inbound return file reporting outcomes of previous instructions
    Inbound,
}

impl RemittanceKind {
    /// Prefix used when generating record codes
    pub fn code_prefix(&self) -> &'static str {
        match self {
            RemittanceKind::Outbound => "REM",
            RemittanceKind::Inbound => "RET",
        }
    }
}

/// Business type of an outbound remittance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemittanceType {
    /// Collection slips (cobrança)
    Collection,
    /// Supplier/payroll payments
    Payment,
    /// Same-day electronic transfer
    Ted,
    /// Next-day transfer document
    Doc,
}

/// Lifecycle status of a remittance or return record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemittanceStatus {
    Created,
    Validated,
    DispatchedToGateway,
    DispatchedToBank,
    Confirmed,
    Reconciled,
    Notified,
    Failed,
}

impl RemittanceStatus {
    /// Terminal statuses accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RemittanceStatus::Confirmed | RemittanceStatus::Notified | RemittanceStatus::Failed
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RemittanceStatus::Created => "created",
            RemittanceStatus::Validated => "validated",
            RemittanceStatus::DispatchedToGateway => "dispatched_to_gateway",
            RemittanceStatus::DispatchedToBank => "dispatched_to_bank",
            RemittanceStatus::Confirmed => "confirmed",
            RemittanceStatus::Reconciled => "reconciled",
            RemittanceStatus::Notified => "notified",
            RemittanceStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for RemittanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reason attached to a `failed` record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureReason {
    /// File failed structural checks; the user must resubmit
    InvalidFile,
    /// Bank code has no profile in the record store
    UnknownBank,
    /// Bank code has no submission target or the bank is inactive
    UnsupportedBank,
    /// Gateway rejected the submission or stayed unreachable
    GatewayRejected,
    /// Bank rejected the submission after the gateway acknowledged it
    BankRejected,
    /// Operator cancelled before gateway submission
    Cancelled,
    /// Persistence or other local failure
    Internal,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureReason::InvalidFile => "InvalidFile",
            FailureReason::UnknownBank => "UnknownBank",
            FailureReason::UnsupportedBank => "UnsupportedBank",
            FailureReason::GatewayRejected => "GatewayRejected",
            FailureReason::BankRejected => "BankRejected",
            FailureReason::Cancelled => "Cancelled",
            FailureReason::Internal => "Internal",
        };
        f.write_str(name)
    }
}

/// Failure details kept on the record for operators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureDetail {
    pub reason: FailureReason,
    pub message: String,
    /// Status the record was in when it failed
    pub failed_from: RemittanceStatus,
}

/// One entry of the record's audit trail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChange {
    pub from: RemittanceStatus,
    pub to: RemittanceStatus,
    pub at: NaiveDateTime,
    pub note: Option<String>,
}

/// Remittance or return record
///
/// `kind` never changes after creation and `status` only moves through
/// [`crate::remittance::RemittanceLifecycle`]. Records are never deleted;
/// failures end in the terminal `failed` status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemittanceRecord {
    /// Generated code (`REM<millis>` or `RET<millis>`)
    pub code: String,
    /// Bank the file belongs to
    pub bank_code: String,
    kind: RemittanceKind,
    /// Business type (outbound only)
    pub remittance_type: Option<RemittanceType>,
    pub(crate) status: RemittanceStatus,
    pub(crate) failure: Option<FailureDetail>,
    /// Original filename as submitted
    pub file_name: String,
    /// Reference returned by the blob store
    pub stored_file: Option<String>,
    pub(crate) total_value: BigDecimal,
    pub(crate) record_count: u64,
    /// Due date (outbound only)
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub dispatched_at: Option<NaiveDateTime>,
    pub processed_at: Option<NaiveDateTime>,
    /// Protocol reference returned by the gateway
    pub(crate) gateway_protocol: Option<String>,
    /// Protocol reference returned by the bank
    pub(crate) bank_protocol: Option<String>,
    /// Reconciliation summary (inbound only)
    pub(crate) summary: Option<ReconciliationSummary>,
    pub(crate) history: Vec<StatusChange>,
}

impl RemittanceRecord {
    /// Create a new record in the `created` status
    pub fn new(code: String, bank_code: String, kind: RemittanceKind, file_name: String) -> Self {
        Self {
            code,
            bank_code,
            kind,
            remittance_type: None,
            status: RemittanceStatus::Created,
            failure: None,
            file_name,
            stored_file: None,
            total_value: BigDecimal::from(0),
            record_count: 0,
            due_date: None,
            notes: None,
            created_at: chrono::Utc::now().naive_utc(),
            dispatched_at: None,
            processed_at: None,
            gateway_protocol: None,
            bank_protocol: None,
            summary: None,
            history: Vec::new(),
        }
    }

    /// Create an outbound remittance record
    pub fn outbound(
        code: String,
        bank_code: String,
        file_name: String,
        remittance_type: RemittanceType,
    ) -> Self {
        let mut record = Self::new(code, bank_code, RemittanceKind::Outbound, file_name);
        record.remittance_type = Some(remittance_type);
        record
    }

    /// Create an inbound return record
    pub fn inbound(code: String, bank_code: String, file_name: String) -> Self {
        Self::new(code, bank_code, RemittanceKind::Inbound, file_name)
    }

    pub fn kind(&self) -> RemittanceKind {
        self.kind
    }

    pub fn status(&self) -> RemittanceStatus {
        self.status
    }

    pub fn failure(&self) -> Option<&FailureDetail> {
        self.failure.as_ref()
    }

    pub fn total_value(&self) -> &BigDecimal {
        &self.total_value
    }

    pub fn record_count(&self) -> u64 {
        self.record_count
    }

    pub fn gateway_protocol(&self) -> Option<&str> {
        self.gateway_protocol.as_deref()
    }

    pub fn bank_protocol(&self) -> Option<&str> {
        self.bank_protocol.as_deref()
    }

    pub fn summary(&self) -> Option<&ReconciliationSummary> {
        self.summary.as_ref()
    }

    /// Audit trail of every applied transition, oldest first
    pub fn history(&self) -> &[StatusChange] {
        &self.history
    }

    /// Set the batch totals; the value must not be negative
    pub fn set_totals(&mut self, total_value: BigDecimal, record_count: u64) -> RemittanceResult<()> {
        if total_value < BigDecimal::from(0) {
            return Err(RemittanceError::Validation(format!(
                "Total value cannot be negative: {}",
                total_value
            )));
        }
        self.total_value = total_value;
        self.record_count = record_count;
        Ok(())
    }
}

/// Bank reference data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankProfile {
    /// Three-digit bank code (e.g. "033")
    pub code: String,
    pub name: String,
    /// Identifier of the file layout the bank exchanges
    pub layout_id: String,
    /// Bank-specific submission endpoint
    pub endpoint: String,
    /// Agreement (convênio) code forwarded on submission
    pub agreement: String,
    pub branch: String,
    pub account: String,
    /// Inactive banks reject dispatch as unsupported
    pub active: bool,
}

/// Idempotency key carried by every outbound call
///
/// Derived deterministically from the remittance code and the dispatch step so
/// a retried call reuses the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdempotencyKey(String);

/// Outbound call a key is derived for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DispatchStep {
    GatewaySubmission,
    BankSubmission,
    ReturnNotification,
    StatusQuery,
}

impl DispatchStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchStep::GatewaySubmission => "gateway-submission",
            DispatchStep::BankSubmission => "bank-submission",
            DispatchStep::ReturnNotification => "return-notification",
            DispatchStep::StatusQuery => "status-query",
        }
    }
}

impl IdempotencyKey {
    pub fn derive(code: &str, step: DispatchStep) -> Self {
        let name = format!("{}:{}", code, step.as_str());
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Errors that can occur while dispatching or reconciling remittances
#[derive(Debug, thiserror::Error)]
pub enum RemittanceError {
    #[error("Invalid file: {0}")]
    InvalidFile(String),
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
    #[error("Unknown bank: {0}")]
    UnknownBank(String),
    #[error("Unsupported bank: {0}")]
    UnsupportedBank(String),
    #[error("Gateway rejected {code}: {message}")]
    GatewayRejected { code: String, message: String },
    #[error("Bank rejected {code}: {message}")]
    BankRejected { code: String, message: String },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Invalid transition for {code}: {event} is not allowed from {from}")]
    InvalidTransition {
        code: String,
        from: RemittanceStatus,
        event: String,
    },
    #[error("Protocol mismatch for {code}: expected {expected}, got {actual}")]
    ProtocolMismatch {
        code: String,
        expected: String,
        actual: String,
    },
    #[error("Cancellation rejected for {code}: status is {status}")]
    CancellationRejected {
        code: String,
        status: RemittanceStatus,
    },
    #[error("Remittance not found: {0}")]
    RecordNotFound(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RemittanceError {
    /// Failure reason to record when this error ends a lifecycle
    pub fn failure_reason(&self) -> FailureReason {
        match self {
            RemittanceError::InvalidFile(_) | RemittanceError::Codec(_) => {
                FailureReason::InvalidFile
            }
            RemittanceError::UnknownBank(_) => FailureReason::UnknownBank,
            RemittanceError::UnsupportedBank(_) => FailureReason::UnsupportedBank,
            RemittanceError::GatewayRejected { .. } | RemittanceError::Transport(_) => {
                FailureReason::GatewayRejected
            }
            RemittanceError::BankRejected { .. } => FailureReason::BankRejected,
            _ => FailureReason::Internal,
        }
    }
}

/// Result type for remittance operations
pub type RemittanceResult<T> = Result<T, RemittanceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        assert!(RemittanceStatus::Confirmed.is_terminal());
        assert!(RemittanceStatus::Notified.is_terminal());
        assert!(RemittanceStatus::Failed.is_terminal());
        assert!(!RemittanceStatus::Reconciled.is_terminal());
        assert!(!RemittanceStatus::DispatchedToBank.is_terminal());
    }

    #[test]
    fn test_idempotency_key_is_stable_per_step() {
        let first = IdempotencyKey::derive("REM1700000000000", DispatchStep::GatewaySubmission);
        let again = IdempotencyKey::derive("REM1700000000000", DispatchStep::GatewaySubmission);
        let bank = IdempotencyKey::derive("REM1700000000000", DispatchStep::BankSubmission);

        assert_eq!(first, again);
        assert_ne!(first, bank);
    }

    #[test]
    fn test_set_totals_rejects_negative_value() {
        let mut record = RemittanceRecord::inbound(
            "RET1".to_string(),
            "033".to_string(),
            "retorno.ret".to_string(),
        );
        assert!(record.set_totals(BigDecimal::from(-1), 1).is_err());
        assert!(record.set_totals(BigDecimal::from(10), 1).is_ok());
        assert_eq!(record.total_value(), &BigDecimal::from(10));
    }
}
