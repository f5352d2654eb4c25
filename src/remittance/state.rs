//! Remittance lifecycle state machine

use bigdecimal::BigDecimal;
use tracing::{debug, info, warn};

use crate::reconciliation::ReconciliationSummary;
use crate::types::*;

/// Input that drives a record through its lifecycle
#[derive(Debug, Clone, PartialEq)]
pub enum RemittanceEvent {
    /// The codec accepted the file
    FileValidated {
        total_value: BigDecimal,
        record_count: u64,
    },
    /// The gateway returned a protocol reference
    GatewayAcknowledged { protocol: String },
    /// The bank accepted the submission
    BankAccepted { protocol: String },
    /// Status confirmation, polled or pushed
    Confirmed { protocol: String },
    /// The reconciliation engine produced a summary
    Reconciled { summary: ReconciliationSummary },
    /// The gateway acknowledged the reconciliation summary
    GatewayNotified,
    /// Operator cancellation
    Cancelled,
    /// Any failure; always moves a live record to `failed`
    Failed {
        reason: FailureReason,
        message: String,
    },
}

impl RemittanceEvent {
    pub fn name(&self) -> &'static str {
        match self {
            RemittanceEvent::FileValidated { .. } => "file_validated",
            RemittanceEvent::GatewayAcknowledged { .. } => "gateway_acknowledged",
            RemittanceEvent::BankAccepted { .. } => "bank_accepted",
            RemittanceEvent::Confirmed { .. } => "confirmed",
            RemittanceEvent::Reconciled { .. } => "reconciled",
            RemittanceEvent::GatewayNotified => "gateway_notified",
            RemittanceEvent::Cancelled => "cancelled",
            RemittanceEvent::Failed { .. } => "failed",
        }
    }

    /// Status this event leads to and the status it must start from
    fn edge(&self) -> (Option<RemittanceStatus>, RemittanceStatus, Option<RemittanceKind>) {
        use RemittanceStatus::*;
        match self {
            RemittanceEvent::FileValidated { .. } => (Some(Created), Validated, None),
            RemittanceEvent::GatewayAcknowledged { .. } => {
                (Some(Validated), DispatchedToGateway, Some(RemittanceKind::Outbound))
            }
            RemittanceEvent::BankAccepted { .. } => (
                Some(DispatchedToGateway),
                DispatchedToBank,
                Some(RemittanceKind::Outbound),
            ),
            RemittanceEvent::Confirmed { .. } => {
                (Some(DispatchedToBank), Confirmed, Some(RemittanceKind::Outbound))
            }
            RemittanceEvent::Reconciled { .. } => {
                (Some(Validated), Reconciled, Some(RemittanceKind::Inbound))
            }
            RemittanceEvent::GatewayNotified => {
                (Some(Reconciled), Notified, Some(RemittanceKind::Inbound))
            }
            RemittanceEvent::Cancelled | RemittanceEvent::Failed { .. } => (None, Failed, None),
        }
    }
}

/// Result of applying an event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    Applied {
        from: RemittanceStatus,
        to: RemittanceStatus,
    },
    /// Terminal or re-entrant: nothing changed
    Unchanged(RemittanceStatus),
}

impl TransitionOutcome {
    pub fn status(&self) -> RemittanceStatus {
        match self {
            TransitionOutcome::Applied { to, .. } => *to,
            TransitionOutcome::Unchanged(status) => *status,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, TransitionOutcome::Applied { .. })
    }
}

/// The only writer of a record's status
///
/// Outbound: `created -> validated -> dispatched_to_gateway ->
/// dispatched_to_bank -> confirmed`. Inbound: `created -> validated ->
/// reconciled -> notified`. Any live status may move to `failed`.
pub struct RemittanceLifecycle;

impl RemittanceLifecycle {
    /// Apply an event to a record
    ///
    /// Terminal records and events whose target equals the current status
    /// return [`TransitionOutcome::Unchanged`].
    pub fn apply(
        record: &mut RemittanceRecord,
        event: RemittanceEvent,
    ) -> RemittanceResult<TransitionOutcome> {
        let current = record.status;

        if current.is_terminal() {
            debug!(
                "Ignoring {} for {}: status {} is terminal",
                event.name(),
                record.code,
                current
            );
            return Ok(TransitionOutcome::Unchanged(current));
        }

        let (required, target, kind) = event.edge();

        if target == current {
            debug!("Re-entrant {} for {} ignored", event.name(), record.code);
            return Ok(TransitionOutcome::Unchanged(current));
        }

        if let RemittanceEvent::Cancelled = event {
            if !matches!(current, RemittanceStatus::Created | RemittanceStatus::Validated) {
                return Err(RemittanceError::CancellationRejected {
                    code: record.code.clone(),
                    status: current,
                });
            }
        }

        let wrong_status = required.is_some_and(|r| r != current);
        let wrong_kind = kind.is_some_and(|k| k != record.kind());
        if wrong_status || wrong_kind {
            return Err(RemittanceError::InvalidTransition {
                code: record.code.clone(),
                from: current,
                event: event.name().to_string(),
            });
        }

        let now = chrono::Utc::now().naive_utc();
        let note = match event {
            RemittanceEvent::FileValidated {
                total_value,
                record_count,
            } => {
                record.set_totals(total_value, record_count)?;
                None
            }
            RemittanceEvent::GatewayAcknowledged { protocol } => {
                record.gateway_protocol = Some(protocol.clone());
                record.dispatched_at = Some(now);
                Some(format!("gateway protocol {}", protocol))
            }
            RemittanceEvent::BankAccepted { protocol } => {
                record.bank_protocol = Some(protocol.clone());
                Some(format!("bank protocol {}", protocol))
            }
            RemittanceEvent::Confirmed { protocol } => {
                let known = [record.bank_protocol(), record.gateway_protocol()];
                if !known.iter().flatten().any(|p| *p == protocol) {
                    return Err(RemittanceError::ProtocolMismatch {
                        code: record.code.clone(),
                        expected: record
                            .bank_protocol()
                            .or(record.gateway_protocol())
                            .unwrap_or_default()
                            .to_string(),
                        actual: protocol,
                    });
                }
                record.processed_at = Some(now);
                Some(format!("confirmed with protocol {}", protocol))
            }
            RemittanceEvent::Reconciled { summary } => {
                record.set_totals(summary.total_value.clone(), summary.accepted)?;
                let note = format!(
                    "{} accepted, {} rejected",
                    summary.accepted, summary.rejected
                );
                record.summary = Some(summary);
                record.processed_at = Some(now);
                Some(note)
            }
            RemittanceEvent::GatewayNotified => None,
            RemittanceEvent::Cancelled => {
                record.failure = Some(FailureDetail {
                    reason: FailureReason::Cancelled,
                    message: "cancelled before gateway submission".to_string(),
                    failed_from: current,
                });
                Some(FailureReason::Cancelled.to_string())
            }
            RemittanceEvent::Failed { reason, message } => {
                warn!(
                    "Remittance {} failed from {}: {} ({})",
                    record.code, current, reason, message
                );
                let note = format!("{}: {}", reason, message);
                record.failure = Some(FailureDetail {
                    reason,
                    message,
                    failed_from: current,
                });
                Some(note)
            }
        };

        record.status = target;
        record.history.push(StatusChange {
            from: current,
            to: target,
            at: now,
            note,
        });
        info!("Remittance {} moved {} -> {}", record.code, current, target);

        Ok(TransitionOutcome::Applied {
            from: current,
            to: target,
        })
    }
}
