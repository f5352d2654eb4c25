//! Dispatch orchestrator
//!
//! Sequences codec validation, gateway submission and bank submission for
//! outbound remittances, and validation, reconciliation and gateway
//! notification for returns. Every status change goes through
//! [`RemittanceLifecycle`] while the record's update lock is held.

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::{
    BankHandler, BankOperation, BankRegistry, CodeGenerator, KeyedLocks, RemittanceEvent,
    RemittanceLifecycle, RetryFailure, RetryPolicy, TransitionOutcome,
};
use crate::codec::{decode, Layout, LayoutRegistry};
use crate::config::IntegrationConfig;
use crate::reconciliation::{ReconciliationEngine, ReconciliationSummary};
use crate::traits::*;
use crate::types::*;
use crate::utils::{validate_file_name, validate_non_negative, validate_remittance_code};

/// Outbound remittance submitted for dispatch
#[derive(Debug, Clone, PartialEq)]
pub struct RemittanceRequest {
    pub bank_code: String,
    pub remittance_type: RemittanceType,
    pub file_name: String,
    pub content: Vec<u8>,
    /// Total the submitter expects the file to carry
    pub declared_total: Option<BigDecimal>,
    /// Detail count the submitter expects the file to carry
    pub declared_count: Option<u64>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl RemittanceRequest {
    pub fn new(
        bank_code: &str,
        remittance_type: RemittanceType,
        file_name: &str,
        content: Vec<u8>,
    ) -> Self {
        Self {
            bank_code: bank_code.to_string(),
            remittance_type,
            file_name: file_name.to_string(),
            content,
            declared_total: None,
            declared_count: None,
            due_date: None,
            notes: None,
        }
    }
}

/// Outcome of an outbound dispatch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchReceipt {
    pub code: String,
    pub status: RemittanceStatus,
    pub total_value: BigDecimal,
    pub record_count: u64,
    pub gateway_protocol: Option<String>,
    pub bank_protocol: Option<String>,
}

impl DispatchReceipt {
    fn from_record(record: &RemittanceRecord) -> Self {
        Self {
            code: record.code.clone(),
            status: record.status(),
            total_value: record.total_value().clone(),
            record_count: record.record_count(),
            gateway_protocol: record.gateway_protocol().map(str::to_string),
            bank_protocol: record.bank_protocol().map(str::to_string),
        }
    }
}

/// Return file submitted for reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnRequest {
    pub bank_code: String,
    pub file_name: String,
    pub content: Vec<u8>,
}

impl ReturnRequest {
    pub fn new(bank_code: &str, file_name: &str, content: Vec<u8>) -> Self {
        Self {
            bank_code: bank_code.to_string(),
            file_name: file_name.to_string(),
            content,
        }
    }
}

/// Outcome of a return reconciliation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnReceipt {
    pub code: String,
    pub status: RemittanceStatus,
    pub summary: ReconciliationSummary,
    /// Whether the gateway acknowledged the summary inline
    pub notified: bool,
}

/// Local and remote view of one remittance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub code: String,
    pub status: RemittanceStatus,
    pub remote_status: String,
    pub detail: HashMap<String, serde_json::Value>,
}

/// Orchestrates remittance dispatch and return reconciliation
pub struct RemittanceDispatcher {
    config: Arc<IntegrationConfig>,
    records: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
    gateway: Arc<dyn GatewayClient>,
    bank: Arc<dyn BankClient>,
    banks: BankRegistry,
    layouts: LayoutRegistry,
    engine: ReconciliationEngine,
    locks: KeyedLocks,
    codes: CodeGenerator,
}

impl RemittanceDispatcher {
    /// Create a new dispatcher
    ///
    /// The bank table is built from the configured banks and the layout
    /// registry starts with the reference layouts.
    pub fn new(
        config: Arc<IntegrationConfig>,
        records: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
        gateway: Arc<dyn GatewayClient>,
        bank: Arc<dyn BankClient>,
    ) -> RemittanceResult<Self> {
        config.validate()?;
        Ok(Self {
            banks: BankRegistry::from_config(&config.banks),
            layouts: LayoutRegistry::with_defaults()?,
            engine: ReconciliationEngine::new(),
            locks: KeyedLocks::new(),
            codes: CodeGenerator::new(),
            config,
            records,
            blobs,
            gateway,
            bank,
        })
    }

    /// Register an additional bank submission target
    pub fn register_bank(&mut self, handler: BankHandler) {
        self.banks.register(handler);
    }

    /// Register an additional file layout
    pub fn register_layout(&mut self, layout: Layout) -> RemittanceResult<()> {
        Ok(self.layouts.register(layout)?)
    }

    /// Replace the reconciliation engine
    pub fn with_engine(mut self, engine: ReconciliationEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn config(&self) -> &IntegrationConfig {
        &self.config
    }

    /// Get a record by code
    pub async fn find(&self, code: &str) -> RemittanceResult<RemittanceRecord> {
        validate_remittance_code(code)?;
        self.records
            .find_by_code(code)
            .await?
            .ok_or_else(|| RemittanceError::RecordNotFound(code.to_string()))
    }

    /// List records currently in `status`
    pub async fn list_by_status(
        &self,
        status: RemittanceStatus,
    ) -> RemittanceResult<Vec<RemittanceRecord>> {
        self.records.list_by_status(status).await
    }

    /// Validate and dispatch an outbound remittance
    pub async fn accept_remittance(
        &self,
        request: RemittanceRequest,
    ) -> RemittanceResult<DispatchReceipt> {
        let record = self.register_remittance(request).await?;
        self.dispatch(&record.code).await
    }

    /// Create and validate an outbound record without dispatching it
    ///
    /// Bank selection runs before any I/O. Once a record exists, every
    /// failure leaves it `failed` in the record store.
    pub async fn register_remittance(
        &self,
        request: RemittanceRequest,
    ) -> RemittanceResult<RemittanceRecord> {
        self.banks.resolve(&request.bank_code)?;
        if let Some(declared) = &request.declared_total {
            validate_non_negative(declared)?;
        }
        let profile = self.active_profile(&request.bank_code).await?;
        let layout = self.layout_for(&profile)?;

        let code = self.codes.next(RemittanceKind::Outbound);
        let _guard = self.locks.lock(&code).await;

        let mut record = RemittanceRecord::outbound(
            code.clone(),
            request.bank_code.clone(),
            request.file_name.clone(),
            request.remittance_type,
        );
        record.due_date = request.due_date;
        record.notes = request.notes.clone();
        let mut record = self.records.save(&record).await?;
        info!(
            "Accepted remittance {} for bank {} ({})",
            code, request.bank_code, request.file_name
        );

        let validated = self
            .validate_outbound(&mut record, &request, &layout)
            .await;
        let (total_value, record_count) = match validated {
            Ok(totals) => totals,
            Err(e) => return Err(self.fail(&mut record, e).await),
        };

        self.transition(
            &mut record,
            RemittanceEvent::FileValidated {
                total_value,
                record_count,
            },
        )
        .await?;
        Ok(record)
    }

    /// Submit a validated remittance to the gateway, then to its bank
    ///
    /// The bank is only called after the gateway acknowledged the
    /// remittance. Both calls retry transport errors a bounded number of
    /// times and carry an idempotency key derived from the record code.
    pub async fn dispatch(&self, code: &str) -> RemittanceResult<DispatchReceipt> {
        let _guard = self.locks.lock(code).await;
        let mut record = self.find(code).await?;

        match record.status() {
            RemittanceStatus::Validated if record.kind() == RemittanceKind::Outbound => {}
            RemittanceStatus::Failed => {
                return Err(RemittanceError::Validation(format!(
                    "Remittance {} failed before dispatch",
                    code
                )))
            }
            status => {
                return Err(RemittanceError::InvalidTransition {
                    code: code.to_string(),
                    from: status,
                    event: "dispatch".to_string(),
                })
            }
        }

        let bank_code = record.bank_code.clone();
        let handler = match self.banks.resolve(&bank_code) {
            Ok(handler) => handler.clone(),
            Err(e) => return Err(self.fail(&mut record, e).await),
        };
        let profile = match self.active_profile(&bank_code).await {
            Ok(profile) => profile,
            Err(e) => return Err(self.fail(&mut record, e).await),
        };

        let policy = RetryPolicy::dispatch(&self.config.retry);

        let submission = GatewayRemittance {
            idempotency_key: IdempotencyKey::derive(code, DispatchStep::GatewaySubmission),
            remittance_id: code.to_string(),
            bank_code,
            total_value: record.total_value().clone(),
            record_count: record.record_count(),
        };
        let operation = format!("Gateway submission for {}", code);
        let ack = match policy
            .run(&operation, |_| self.gateway.submit_remittance(&submission))
            .await
        {
            Ok(ack) => ack,
            Err(failure) => {
                error!("Gateway submission failed for {}: {}", code, failure.last_error);
                let e = RemittanceError::GatewayRejected {
                    code: code.to_string(),
                    message: describe_failure(&failure),
                };
                return Err(self.fail(&mut record, e).await);
            }
        };
        self.transition(
            &mut record,
            RemittanceEvent::GatewayAcknowledged {
                protocol: ack.protocol,
            },
        )
        .await?;

        let operation_kind = record
            .remittance_type
            .map(BankOperation::from)
            .unwrap_or(BankOperation::PaymentRemittance);
        let submission = BankSubmission {
            idempotency_key: IdempotencyKey::derive(code, DispatchStep::BankSubmission),
            endpoint: handler.endpoint.clone(),
            operation: operation_kind,
            remittance_id: code.to_string(),
            record_count: record.record_count(),
            total_value: record.total_value().clone(),
            agreement: profile.agreement.clone(),
            stored_file: record.stored_file.clone(),
        };
        let operation = format!("{} submission to {} for {}", operation_kind, handler.name, code);
        let ack = match policy
            .run(&operation, |_| self.bank.submit(&handler.bank_code, &submission))
            .await
        {
            Ok(ack) => ack,
            Err(failure) => {
                error!(
                    "Bank submission failed for {} at {}: {}",
                    code, handler.name, failure.last_error
                );
                let e = RemittanceError::BankRejected {
                    code: code.to_string(),
                    message: describe_failure(&failure),
                };
                return Err(self.fail(&mut record, e).await);
            }
        };
        self.transition(
            &mut record,
            RemittanceEvent::BankAccepted {
                protocol: ack.protocol,
            },
        )
        .await?;

        Ok(DispatchReceipt::from_record(&record))
    }

    /// Validate, reconcile and report a bank return file
    ///
    /// Partially defective files still end `reconciled`; only a file with no
    /// readable line fails. A failed inline notification leaves the record
    /// `reconciled` for a later retry.
    pub async fn accept_return(&self, request: ReturnRequest) -> RemittanceResult<ReturnReceipt> {
        let profile = self
            .records
            .find_bank_by_code(&request.bank_code)
            .await?
            .ok_or_else(|| RemittanceError::UnknownBank(request.bank_code.clone()))?;
        let layout = self.layout_for(&profile)?;

        let code = self.codes.next(RemittanceKind::Inbound);
        let _guard = self.locks.lock(&code).await;

        let record = RemittanceRecord::inbound(
            code.clone(),
            request.bank_code.clone(),
            request.file_name.clone(),
        );
        let mut record = self.records.save(&record).await?;
        info!(
            "Accepted return {} for bank {} ({})",
            code, request.bank_code, request.file_name
        );

        let reconciled = self.reconcile_inbound(&mut record, &request, &layout).await;
        let summary = match reconciled {
            Ok(summary) => summary,
            Err(e) => return Err(self.fail(&mut record, e).await),
        };

        self.transition(
            &mut record,
            RemittanceEvent::FileValidated {
                total_value: summary.total_value.clone(),
                record_count: summary.accepted,
            },
        )
        .await?;
        self.transition(
            &mut record,
            RemittanceEvent::Reconciled {
                summary: summary.clone(),
            },
        )
        .await?;

        let policy = RetryPolicy::inline_notification(&self.config.retry);
        let notified = match self.notify_gateway(&record, &policy).await {
            Ok(()) => {
                self.transition(&mut record, RemittanceEvent::GatewayNotified)
                    .await?;
                true
            }
            Err(failure) => {
                warn!(
                    "Return {} stays reconciled; notification failed: {}",
                    code,
                    describe_failure(&failure)
                );
                false
            }
        };

        Ok(ReturnReceipt {
            code,
            status: record.status(),
            summary,
            notified,
        })
    }

    /// Retry the gateway notification of a reconciled return
    ///
    /// Transport errors are retried indefinitely with back-off. The update
    /// lock is only held to read the record and to apply the transition.
    pub async fn retry_notification(&self, code: &str) -> RemittanceResult<RemittanceStatus> {
        let policy = RetryPolicy::idempotent(&self.config.retry);
        self.notify_pending(code, &policy).await
    }

    /// Make one bounded notification attempt for every reconciled return
    ///
    /// Returns that still fail stay `reconciled` for the next sweep. Returns
    /// the codes that reached `notified`.
    pub async fn retry_pending_notifications(&self) -> RemittanceResult<Vec<String>> {
        let pending = self.records.list_by_status(RemittanceStatus::Reconciled).await?;
        let policy = RetryPolicy::inline_notification(&self.config.retry);
        let mut notified = Vec::new();

        for record in pending {
            match self.notify_pending(&record.code, &policy).await {
                Ok(RemittanceStatus::Notified) => notified.push(record.code),
                Ok(status) => debug!("Return {} left in {}", record.code, status),
                Err(e) => warn!("Notification still pending for {}: {}", record.code, e),
            }
        }

        info!("Notification sweep delivered {} returns", notified.len());
        Ok(notified)
    }

    async fn notify_pending(
        &self,
        code: &str,
        policy: &RetryPolicy,
    ) -> RemittanceResult<RemittanceStatus> {
        let record = {
            let _guard = self.locks.lock(code).await;
            let record = self.find(code).await?;
            match record.status() {
                RemittanceStatus::Reconciled => record,
                RemittanceStatus::Notified => return Ok(RemittanceStatus::Notified),
                status => {
                    return Err(RemittanceError::InvalidTransition {
                        code: code.to_string(),
                        from: status,
                        event: RemittanceEvent::GatewayNotified.name().to_string(),
                    })
                }
            }
        };

        if let Err(failure) = self.notify_gateway(&record, policy).await {
            return Err(RemittanceError::GatewayRejected {
                code: code.to_string(),
                message: describe_failure(&failure),
            });
        }

        let _guard = self.locks.lock(code).await;
        let mut record = self.find(code).await?;
        Ok(self
            .transition(&mut record, RemittanceEvent::GatewayNotified)
            .await?
            .status())
    }

    /// Query the gateway for a remittance and apply a confirmation
    pub async fn query_status(&self, code: &str) -> RemittanceResult<StatusReport> {
        let record = self.find(code).await?;
        let remote = self
            .gateway
            .query_status(code)
            .await
            .map_err(|e| client_error(code, e, false))?;
        debug!("Gateway reports {} for {}", remote.status, code);

        let mut status = record.status();
        if remote.is_confirmation() && status == RemittanceStatus::DispatchedToBank {
            let protocol = remote_protocol(&remote)
                .or_else(|| record.bank_protocol().map(str::to_string))
                .or_else(|| record.gateway_protocol().map(str::to_string))
                .unwrap_or_default();
            status = self.confirm(code, &protocol).await?;
        }

        Ok(StatusReport {
            code: code.to_string(),
            status,
            remote_status: remote.status,
            detail: remote.detail,
        })
    }

    /// Poll the gateway until a dispatched remittance is confirmed
    ///
    /// Polling backs off like any idempotent retry and never gives up on
    /// transport errors.
    pub async fn await_confirmation(&self, code: &str) -> RemittanceResult<RemittanceStatus> {
        let policy = RetryPolicy::idempotent(&self.config.retry);
        let mut attempt = 1;

        loop {
            let record = self.find(code).await?;
            match record.status() {
                RemittanceStatus::DispatchedToBank => {}
                status if status.is_terminal() => return Ok(status),
                status => {
                    return Err(RemittanceError::InvalidTransition {
                        code: code.to_string(),
                        from: status,
                        event: "await_confirmation".to_string(),
                    })
                }
            }

            match self.query_status(code).await {
                Ok(report) if report.status.is_terminal() => return Ok(report.status),
                Ok(report) => debug!(
                    "{} not confirmed yet (remote status {})",
                    code, report.remote_status
                ),
                Err(RemittanceError::Transport(message)) => {
                    warn!("Status query for {} failed: {}", code, message)
                }
                Err(e) => return Err(e),
            }

            tokio::time::sleep(policy.delay_for(attempt)).await;
            attempt += 1;
        }
    }

    /// Apply a pushed status confirmation
    pub async fn confirm(&self, code: &str, protocol: &str) -> RemittanceResult<RemittanceStatus> {
        let _guard = self.locks.lock(code).await;
        let mut record = self.find(code).await?;
        let outcome = self
            .transition(
                &mut record,
                RemittanceEvent::Confirmed {
                    protocol: protocol.to_string(),
                },
            )
            .await?;
        Ok(outcome.status())
    }

    /// Cancel a remittance that has not reached the gateway
    pub async fn cancel(&self, code: &str) -> RemittanceResult<RemittanceStatus> {
        let _guard = self.locks.lock(code).await;
        let mut record = self.find(code).await?;

        if record.status().is_terminal() {
            let cancelled = record
                .failure()
                .is_some_and(|f| f.reason == FailureReason::Cancelled);
            if cancelled {
                return Ok(RemittanceStatus::Failed);
            }
            return Err(RemittanceError::CancellationRejected {
                code: code.to_string(),
                status: record.status(),
            });
        }

        let outcome = self
            .transition(&mut record, RemittanceEvent::Cancelled)
            .await?;
        info!("Remittance {} cancelled", code);
        Ok(outcome.status())
    }

    /// Gateway API version
    pub async fn health_check(&self) -> RemittanceResult<String> {
        self.gateway
            .health_check()
            .await
            .map_err(|e| client_error("health-check", e, false))
    }

    /// Return files a bank has ready for download
    pub async fn available_returns(&self, bank_code: &str) -> RemittanceResult<Vec<AvailableReturn>> {
        let handler = self.banks.resolve(bank_code)?;
        self.bank
            .available_returns(&handler.bank_code)
            .await
            .map_err(|e| client_error(bank_code, e, true))
    }

    async fn active_profile(&self, bank_code: &str) -> RemittanceResult<BankProfile> {
        let profile = self
            .records
            .find_bank_by_code(bank_code)
            .await?
            .ok_or_else(|| RemittanceError::UnknownBank(bank_code.to_string()))?;
        if !profile.active {
            return Err(RemittanceError::UnsupportedBank(format!(
                "{} is inactive",
                bank_code
            )));
        }
        Ok(profile)
    }

    fn layout_for(&self, profile: &BankProfile) -> RemittanceResult<Arc<Layout>> {
        self.layouts.get(&profile.layout_id).ok_or_else(|| {
            RemittanceError::Config(format!(
                "Bank {} uses unknown layout {}",
                profile.code, profile.layout_id
            ))
        })
    }

    async fn store_file(
        &self,
        record: &mut RemittanceRecord,
        file_name: &str,
        content: &[u8],
        extensions: &[String],
    ) -> RemittanceResult<()> {
        validate_file_name(file_name, extensions)?;
        if content.iter().all(u8::is_ascii_whitespace) {
            return Err(RemittanceError::InvalidFile(format!("{} is empty", file_name)));
        }

        let stored = self.blobs.store(content, file_name).await?;
        debug!("Stored {} as {}", file_name, stored);
        record.stored_file = Some(stored);
        *record = self.records.save(record).await?;
        Ok(())
    }

    async fn validate_outbound(
        &self,
        record: &mut RemittanceRecord,
        request: &RemittanceRequest,
        layout: &Layout,
    ) -> RemittanceResult<(BigDecimal, u64)> {
        self.store_file(
            record,
            &request.file_name,
            &request.content,
            &self.config.files.outbound_extensions,
        )
        .await?;

        let summary = self
            .engine
            .reconcile(decode(&request.content, layout), layout);
        if summary.has_errors() {
            return Err(RemittanceError::InvalidFile(summary.error_report()));
        }
        if summary.accepted == 0 {
            return Err(RemittanceError::InvalidFile(format!(
                "{} has no detail records",
                request.file_name
            )));
        }

        if let Some(declared) = &request.declared_total {
            if *declared != summary.total_value {
                return Err(RemittanceError::InvalidFile(format!(
                    "declared total {} does not match file total {}",
                    declared, summary.total_value
                )));
            }
        }
        if let Some(declared) = request.declared_count {
            if declared != summary.accepted {
                return Err(RemittanceError::InvalidFile(format!(
                    "declared count {} does not match file count {}",
                    declared, summary.accepted
                )));
            }
        }

        Ok((summary.total_value, summary.accepted))
    }

    async fn reconcile_inbound(
        &self,
        record: &mut RemittanceRecord,
        request: &ReturnRequest,
        layout: &Layout,
    ) -> RemittanceResult<ReconciliationSummary> {
        self.store_file(
            record,
            &request.file_name,
            &request.content,
            &self.config.files.inbound_extensions,
        )
        .await?;

        let summary = self
            .engine
            .reconcile(decode(&request.content, layout), layout);
        if summary.candidate_lines == 0 {
            return Err(RemittanceError::InvalidFile(format!(
                "{} has no readable lines:\n{}",
                request.file_name,
                summary.error_report()
            )));
        }

        info!(
            "Reconciled {}: {} accepted, {} rejected, total {}",
            record.code, summary.accepted, summary.rejected, summary.total_value
        );
        if let Some(trailer) = summary.trailer.as_ref().filter(|t| !t.is_consistent()) {
            warn!(
                "Trailer of {} declares {} records totalling {}",
                record.code, trailer.declared_count, trailer.declared_total
            );
        }
        Ok(summary)
    }

    async fn notify_gateway(
        &self,
        record: &RemittanceRecord,
        policy: &RetryPolicy,
    ) -> Result<(), RetryFailure> {
        let (processed, rejected) = record
            .summary()
            .map(|s| (s.accepted, s.rejected))
            .unwrap_or_default();
        let submission = GatewayReturn {
            idempotency_key: IdempotencyKey::derive(&record.code, DispatchStep::ReturnNotification),
            return_id: record.code.clone(),
            bank_code: record.bank_code.clone(),
            processed,
            rejected,
            total_value: record.total_value().clone(),
        };
        let operation = format!("Return notification for {}", record.code);
        policy
            .run(&operation, |_| self.gateway.submit_return(&submission))
            .await?;
        Ok(())
    }

    async fn transition(
        &self,
        record: &mut RemittanceRecord,
        event: RemittanceEvent,
    ) -> RemittanceResult<TransitionOutcome> {
        let outcome = RemittanceLifecycle::apply(record, event)?;
        if outcome.is_applied() {
            *record = self.records.save(record).await?;
        }
        Ok(outcome)
    }

    /// Move the record to `failed` for `cause` and hand the cause back
    async fn fail(&self, record: &mut RemittanceRecord, cause: RemittanceError) -> RemittanceError {
        let event = RemittanceEvent::Failed {
            reason: cause.failure_reason(),
            message: cause.to_string(),
        };
        if let Err(e) = self.transition(record, event).await {
            error!("Could not record failure of {}: {}", record.code, e);
        }
        cause
    }
}

fn describe_failure(failure: &RetryFailure) -> String {
    format!("{} after {} attempt(s)", failure.last_error, failure.attempts)
}

fn client_error(code: &str, error: ClientError, bank_side: bool) -> RemittanceError {
    match error {
        ClientError::Transport(message) => RemittanceError::Transport(message),
        ClientError::Rejected {
            code: remote,
            message,
        } => {
            let message = format!("{} ({})", message, remote);
            if bank_side {
                RemittanceError::BankRejected {
                    code: code.to_string(),
                    message,
                }
            } else {
                RemittanceError::GatewayRejected {
                    code: code.to_string(),
                    message,
                }
            }
        }
    }
}

fn remote_protocol(status: &GatewayStatus) -> Option<String> {
    ["protocol", "protocolo"]
        .iter()
        .find_map(|key| status.detail.get(*key))
        .and_then(|value| value.as_str())
        .map(str::to_string)
}
