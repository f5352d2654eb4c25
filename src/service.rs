//! Public operation surface
//!
//! Every operation returns an [`OperationResponse`]; errors are turned into
//! a failed response with a message instead of propagating.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::Arc;
use tracing::error;

use crate::remittance::{
    DispatchReceipt, RemittanceDispatcher, RemittanceRequest, ReturnReceipt, ReturnRequest,
    StatusReport,
};
use crate::traits::AvailableReturn;
use crate::types::{RemittanceRecord, RemittanceResult, RemittanceStatus};

/// Uniform result of a public operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResponse<T> {
    pub success: bool,
    pub message: String,
    pub payload: Option<T>,
}

impl<T> OperationResponse<T> {
    pub fn ok(message: impl Into<String>, payload: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            payload: Some(payload),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            payload: None,
        }
    }

    fn from_result<E: Display>(
        operation: &str,
        result: Result<T, E>,
        message: impl FnOnce(&T) -> String,
    ) -> Self {
        match result {
            Ok(payload) => Self::ok(message(&payload), payload),
            Err(e) => {
                error!("{} failed: {}", operation, e);
                Self::failed(e.to_string())
            }
        }
    }
}

/// Remittance service facade
#[derive(Clone)]
pub struct RemittanceService {
    dispatcher: Arc<RemittanceDispatcher>,
}

impl RemittanceService {
    pub fn new(dispatcher: Arc<RemittanceDispatcher>) -> Self {
        Self { dispatcher }
    }

    pub fn dispatcher(&self) -> &RemittanceDispatcher {
        &self.dispatcher
    }

    /// Accept and dispatch an outbound remittance
    pub async fn accept_remittance(
        &self,
        request: RemittanceRequest,
    ) -> OperationResponse<DispatchReceipt> {
        let result = self.dispatcher.accept_remittance(request).await;
        OperationResponse::from_result("accept-remittance", result, |receipt| {
            format!(
                "Remittance {} sent to bank (protocol {})",
                receipt.code,
                receipt.bank_protocol.as_deref().unwrap_or("-")
            )
        })
    }

    /// Accept and reconcile a bank return file
    pub async fn accept_return(&self, request: ReturnRequest) -> OperationResponse<ReturnReceipt> {
        let result = self.dispatcher.accept_return(request).await;
        OperationResponse::from_result("accept-return", result, |receipt| {
            format!(
                "Return {} processed: {} accepted, {} rejected",
                receipt.code, receipt.summary.accepted, receipt.summary.rejected
            )
        })
    }

    /// Query the gateway status of a remittance
    pub async fn query_status(&self, code: &str) -> OperationResponse<StatusReport> {
        let result = self.dispatcher.query_status(code).await;
        OperationResponse::from_result("query-status", result, |report| {
            format!("Remittance {} is {}", report.code, report.status)
        })
    }

    /// Check gateway connectivity
    pub async fn health_check(&self) -> OperationResponse<String> {
        let result = self.dispatcher.health_check().await;
        OperationResponse::from_result("health-check", result, |version| {
            format!("Gateway reachable (version {})", version)
        })
    }

    /// Get a record by code
    pub async fn find(&self, code: &str) -> OperationResponse<RemittanceRecord> {
        let result = self.dispatcher.find(code).await;
        OperationResponse::from_result("find", result, |record| {
            format!("Remittance {} is {}", record.code, record.status())
        })
    }

    /// Cancel a remittance before gateway submission
    pub async fn cancel(&self, code: &str) -> OperationResponse<RemittanceStatus> {
        let result = self.dispatcher.cancel(code).await;
        status_response("cancel", code, result)
    }

    /// Apply a pushed confirmation
    pub async fn confirm(&self, code: &str, protocol: &str) -> OperationResponse<RemittanceStatus> {
        let result = self.dispatcher.confirm(code, protocol).await;
        status_response("confirm", code, result)
    }

    /// Retry the notification of a reconciled return
    pub async fn retry_notification(&self, code: &str) -> OperationResponse<RemittanceStatus> {
        let result = self.dispatcher.retry_notification(code).await;
        status_response("retry-notification", code, result)
    }

    /// Return files a bank has ready for download
    pub async fn available_returns(&self, bank_code: &str) -> OperationResponse<Vec<AvailableReturn>> {
        let result = self.dispatcher.available_returns(bank_code).await;
        OperationResponse::from_result("available-returns", result, |returns| {
            format!("{} return file(s) available for bank {}", returns.len(), bank_code)
        })
    }

    /// Records currently in `status`
    pub async fn list_by_status(
        &self,
        status: RemittanceStatus,
    ) -> OperationResponse<Vec<RemittanceRecord>> {
        let result = self.dispatcher.list_by_status(status).await;
        OperationResponse::from_result("list", result, |records| {
            format!("{} remittance(s) in {}", records.len(), status)
        })
    }
}

fn status_response(
    operation: &str,
    code: &str,
    result: RemittanceResult<RemittanceStatus>,
) -> OperationResponse<RemittanceStatus> {
    OperationResponse::from_result(operation, result, |status| {
        format!("Remittance {} is {}", code, status)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RemittanceError;

    #[test]
    fn test_error_becomes_failed_response() {
        let response: OperationResponse<String> = OperationResponse::from_result(
            "health-check",
            Err(RemittanceError::Transport("connection refused".to_string())),
            |v: &String| v.clone(),
        );
        assert!(!response.success);
        assert!(response.payload.is_none());
        assert!(response.message.contains("connection refused"));
    }

    #[test]
    fn test_success_carries_payload() {
        let response = OperationResponse::from_result(
            "health-check",
            Ok::<_, RemittanceError>("2.1".to_string()),
            |v| format!("version {}", v),
        );
        assert!(response.success);
        assert_eq!(response.payload.as_deref(), Some("2.1"));
        assert_eq!(response.message, "version 2.1");
    }
}
