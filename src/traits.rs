//! Traits for storage, remote collaborators and extensibility

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::codec::{Layout, LineErrorReason, ParsedLine};
use crate::remittance::BankOperation;
use crate::types::*;

/// Persistence for remittance records and bank reference data
///
/// Implementations must serialize writes per record code; the dispatcher
/// already holds that record's update lock when it calls `save`.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert or replace a record, returning the persisted copy
    async fn save(&self, record: &RemittanceRecord) -> RemittanceResult<RemittanceRecord>;

    /// Get a record by code
    async fn find_by_code(&self, code: &str) -> RemittanceResult<Option<RemittanceRecord>>;

    /// Get a bank profile by bank code
    async fn find_bank_by_code(&self, code: &str) -> RemittanceResult<Option<BankProfile>>;

    /// List records currently in `status`
    async fn list_by_status(
        &self,
        status: RemittanceStatus,
    ) -> RemittanceResult<Vec<RemittanceRecord>>;
}

/// Storage for submitted file bytes
///
/// `fetch` must observe every completed `store` for the same reference.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes and return a reference to them
    async fn store(&self, bytes: &[u8], suggested_name: &str) -> RemittanceResult<String>;

    /// Load previously stored bytes
    async fn fetch(&self, stored_ref: &str) -> RemittanceResult<Vec<u8>>;
}

/// Failure of a remote call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// Network failure or timeout; the call may be retried
    #[error("transport error: {0}")]
    Transport(String),
    /// The remote side processed and refused the request
    #[error("rejected ({code}): {message}")]
    Rejected { code: String, message: String },
}

impl ClientError {
    pub fn is_transient(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }
}

/// Outbound remittance summary sent to the gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayRemittance {
    pub idempotency_key: IdempotencyKey,
    pub remittance_id: String,
    pub bank_code: String,
    pub total_value: BigDecimal,
    pub record_count: u64,
}

/// Reconciled return summary sent to the gateway
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayReturn {
    pub idempotency_key: IdempotencyKey,
    pub return_id: String,
    pub bank_code: String,
    pub processed: u64,
    pub rejected: u64,
    pub total_value: BigDecimal,
}

/// Gateway acknowledgment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayAck {
    pub protocol: String,
}

/// Remote status of a remittance as the gateway reports it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayStatus {
    pub status: String,
    pub detail: HashMap<String, serde_json::Value>,
}

impl GatewayStatus {
    /// Remote statuses that settle a dispatched remittance
    pub fn is_confirmation(&self) -> bool {
        matches!(
            self.status.to_lowercase().as_str(),
            "processada" | "confirmada" | "processed" | "confirmed"
        )
    }
}

/// Client for the financial processing gateway
#[async_trait]
pub trait GatewayClient: Send + Sync {
    /// Register an outbound remittance; returns the gateway protocol
    async fn submit_remittance(
        &self,
        submission: &GatewayRemittance,
    ) -> Result<GatewayAck, ClientError>;

    /// Report a reconciled return
    async fn submit_return(&self, submission: &GatewayReturn) -> Result<GatewayAck, ClientError>;

    /// Query the remote status of a remittance
    async fn query_status(&self, remittance_id: &str) -> Result<GatewayStatus, ClientError>;

    /// Returns the gateway API version
    async fn health_check(&self) -> Result<String, ClientError>;
}

/// Bank-specific submission payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BankSubmission {
    pub idempotency_key: IdempotencyKey,
    pub endpoint: String,
    pub operation: BankOperation,
    pub remittance_id: String,
    pub record_count: u64,
    pub total_value: BigDecimal,
    pub agreement: String,
    pub stored_file: Option<String>,
}

/// Bank acknowledgment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAck {
    pub protocol: String,
    pub status: String,
    pub message: Option<String>,
}

/// Return file a bank has ready for download
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableReturn {
    pub file_name: String,
    pub generated_at: NaiveDateTime,
    pub record_count: u64,
}

/// Client for direct bank submission
#[async_trait]
pub trait BankClient: Send + Sync {
    /// Submit a remittance to the bank; returns the bank protocol
    async fn submit(&self, bank_code: &str, submission: &BankSubmission)
        -> Result<BankAck, ClientError>;

    /// List return files the bank has available
    async fn available_returns(&self, bank_code: &str)
        -> Result<Vec<AvailableReturn>, ClientError>;
}

/// Semantic validation of a decoded detail line
pub trait DetailValidator: Send + Sync {
    /// Validate the line and return its monetary value
    fn validate_detail(&self, line: &ParsedLine, layout: &Layout)
        -> Result<BigDecimal, LineErrorReason>;
}

/// Default detail validator: required fields present, value non-negative
pub struct DefaultDetailValidator;

impl DetailValidator for DefaultDetailValidator {
    fn validate_detail(
        &self,
        line: &ParsedLine,
        layout: &Layout,
    ) -> Result<BigDecimal, LineErrorReason> {
        if let Some(detail) = layout.detail() {
            for field in detail.fields.iter().filter(|f| f.required) {
                match line.field(&field.name) {
                    Some(value) if !value.is_blank() => {}
                    _ => return Err(LineErrorReason::MissingField(field.name.clone())),
                }
            }
        }

        let value = line
            .field(&layout.value_field)
            .and_then(|v| v.as_decimal())
            .ok_or_else(|| LineErrorReason::MissingField(layout.value_field.clone()))?;

        if *value < BigDecimal::from(0) {
            return Err(LineErrorReason::NegativeValue(layout.value_field.clone()));
        }

        Ok(value.clone())
    }
}
