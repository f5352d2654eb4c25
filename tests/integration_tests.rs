//! Integration tests for banking-remittance

use banking_remittance::{
    detail_line, header_line, trailer_line,
    utils::{MemoryStore, RemoteCall, SimulatedBank, SimulatedGateway},
    AvailableReturn, BankOperation, ClientError, DispatchStep, FailureReason, GatewayStatus,
    IdempotencyKey, IntegrationConfig, LineErrorReason, RecordStore, RemittanceDispatcher,
    RemittanceError, RemittanceRequest, RemittanceService, RemittanceStatus, RemittanceType,
    ReturnRequest,
};
use bigdecimal::BigDecimal;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    store: Arc<MemoryStore>,
    gateway: Arc<SimulatedGateway>,
    bank: Arc<SimulatedBank>,
    dispatcher: Arc<RemittanceDispatcher>,
}

fn fast_config() -> IntegrationConfig {
    let mut config = IntegrationConfig::default();
    config.retry.base_delay_ms = 1;
    config.retry.max_delay_ms = 5;
    config
}

fn harness() -> Harness {
    let config = Arc::new(fast_config());
    let store = Arc::new(MemoryStore::with_banks(config.bank_profiles()));
    let gateway = Arc::new(SimulatedGateway::new());
    let bank = Arc::new(SimulatedBank::new());
    let dispatcher = RemittanceDispatcher::new(
        config,
        store.clone(),
        store.clone(),
        gateway.clone(),
        bank.clone(),
    )
    .unwrap();

    Harness {
        store,
        gateway,
        bank,
        dispatcher: Arc::new(dispatcher),
    }
}

/// Header, one detail per value and a matching trailer
fn outbound_file(values: &[&str]) -> Vec<u8> {
    let mut lines = vec![header_line("123456")];
    let mut total_cents = 0;
    for (i, value) in values.iter().enumerate() {
        lines.push(detail_line(i as u64 + 1, value));
        total_cents += value.parse::<u64>().unwrap();
    }
    lines.push(trailer_line(values.len() as u64, total_cents));
    lines.join("\r\n").into_bytes()
}

fn request(bank_code: &str, values: &[&str]) -> RemittanceRequest {
    RemittanceRequest::new(
        bank_code,
        RemittanceType::Collection,
        "lote_0001.rem",
        outbound_file(values),
    )
}

fn decimal(value: &str) -> BigDecimal {
    BigDecimal::from_str(value).unwrap()
}

#[tokio::test]
async fn test_outbound_dispatch_reaches_bank() {
    let h = harness();

    let receipt = h
        .dispatcher
        .accept_remittance(request("033", &["000000010050", "000000002000"]))
        .await
        .unwrap();

    assert_eq!(receipt.status, RemittanceStatus::DispatchedToBank);
    assert_eq!(receipt.total_value, decimal("120.50"));
    assert_eq!(receipt.record_count, 2);
    assert!(receipt.gateway_protocol.as_deref().unwrap().starts_with("GW"));
    assert!(receipt.bank_protocol.as_deref().unwrap().starts_with("SANT"));

    let submissions = h.bank.submissions();
    assert_eq!(submissions.len(), 1);
    let (bank_code, submission) = &submissions[0];
    assert_eq!(bank_code, "033");
    assert_eq!(submission.operation, BankOperation::CollectionRemittance);
    assert_eq!(submission.endpoint, "/api/bancos/santander");
    assert_eq!(submission.agreement, "123456");
    assert_eq!(
        submission.idempotency_key,
        IdempotencyKey::derive(&receipt.code, DispatchStep::BankSubmission)
    );
    assert_eq!(
        h.gateway.submissions()[0].idempotency_key,
        IdempotencyKey::derive(&receipt.code, DispatchStep::GatewaySubmission)
    );

    let record = h.dispatcher.find(&receipt.code).await.unwrap();
    assert!(record.stored_file.as_deref().unwrap().ends_with("_lote_0001.rem"));
    assert!(record.dispatched_at.is_some());
    let path: Vec<_> = record.history().iter().map(|c| c.to).collect();
    assert_eq!(
        path,
        vec![
            RemittanceStatus::Validated,
            RemittanceStatus::DispatchedToGateway,
            RemittanceStatus::DispatchedToBank,
        ]
    );
}

#[tokio::test]
async fn test_payment_types_use_payment_operation() {
    let h = harness();
    let mut req = request("001", &["000000000100"]);
    req.remittance_type = RemittanceType::Ted;

    let receipt = h.dispatcher.accept_remittance(req).await.unwrap();

    assert!(receipt.bank_protocol.as_deref().unwrap().starts_with("BB"));
    assert_eq!(
        h.bank.submissions()[0].1.operation,
        BankOperation::PaymentRemittance
    );
}

#[tokio::test]
async fn test_unmapped_bank_makes_no_network_calls() {
    let h = harness();

    let err = h
        .dispatcher
        .accept_remittance(request("999", &["000000010050"]))
        .await
        .unwrap_err();

    assert!(matches!(err, RemittanceError::UnsupportedBank(ref code) if code == "999"));
    assert_eq!(h.gateway.calls(RemoteCall::SubmitRemittance), 0);
    assert_eq!(h.bank.calls(RemoteCall::BankSubmit), 0);
    assert_eq!(h.store.record_count(), 0);
}

#[tokio::test]
async fn test_inactive_bank_is_unsupported() {
    let h = harness();
    let mut profile = fast_config().bank_profiles().remove(0);
    profile.active = false;
    h.store.add_bank(profile).unwrap();

    let err = h
        .dispatcher
        .accept_remittance(request("033", &["000000010050"]))
        .await
        .unwrap_err();

    assert!(matches!(err, RemittanceError::UnsupportedBank(_)));
    assert_eq!(h.gateway.calls(RemoteCall::SubmitRemittance), 0);
}

#[tokio::test]
async fn test_gateway_transport_failure_never_reaches_bank() {
    let h = harness();
    h.gateway.fail_always(
        RemoteCall::SubmitRemittance,
        ClientError::Transport("connection timed out".to_string()),
    );

    let err = h
        .dispatcher
        .accept_remittance(request("033", &["000000010050"]))
        .await
        .unwrap_err();

    assert!(matches!(err, RemittanceError::GatewayRejected { .. }));
    assert_eq!(
        h.gateway.calls(RemoteCall::SubmitRemittance),
        fast_config().retry.dispatch_max_attempts
    );
    assert_eq!(h.bank.calls(RemoteCall::BankSubmit), 0);

    let failed = h.store.list_by_status(RemittanceStatus::Failed).await.unwrap();
    assert_eq!(failed.len(), 1);
    let failure = failed[0].failure().unwrap();
    assert_eq!(failure.reason, FailureReason::GatewayRejected);
    assert_eq!(failure.failed_from, RemittanceStatus::Validated);
    assert!(failed[0].gateway_protocol().is_none());
}

#[tokio::test]
async fn test_transient_gateway_failure_is_retried() {
    let h = harness();
    h.gateway.fail_next(
        RemoteCall::SubmitRemittance,
        ClientError::Transport("connection reset".to_string()),
    );

    let receipt = h
        .dispatcher
        .accept_remittance(request("033", &["000000010050"]))
        .await
        .unwrap();

    assert_eq!(receipt.status, RemittanceStatus::DispatchedToBank);
    assert_eq!(h.gateway.calls(RemoteCall::SubmitRemittance), 2);
    assert_eq!(h.gateway.submissions().len(), 1);
}

#[tokio::test]
async fn test_gateway_rejection_is_not_retried() {
    let h = harness();
    h.gateway.fail_next(
        RemoteCall::SubmitRemittance,
        ClientError::Rejected {
            code: "400".to_string(),
            message: "duplicate remittance".to_string(),
        },
    );

    let err = h
        .dispatcher
        .accept_remittance(request("033", &["000000010050"]))
        .await
        .unwrap_err();

    assert!(matches!(err, RemittanceError::GatewayRejected { ref message, .. } if message.contains("duplicate remittance")));
    assert_eq!(h.gateway.calls(RemoteCall::SubmitRemittance), 1);
    assert_eq!(h.bank.calls(RemoteCall::BankSubmit), 0);
}

#[tokio::test]
async fn test_bank_rejection_keeps_gateway_side_visible() {
    let h = harness();
    h.bank.fail_next(
        RemoteCall::BankSubmit,
        ClientError::Rejected {
            code: "AG01".to_string(),
            message: "agreement suspended".to_string(),
        },
    );

    let err = h
        .dispatcher
        .accept_remittance(request("033", &["000000010050"]))
        .await
        .unwrap_err();
    assert!(matches!(err, RemittanceError::BankRejected { .. }));

    let failed = h.store.list_by_status(RemittanceStatus::Failed).await.unwrap();
    let record = &failed[0];
    assert_eq!(record.failure().unwrap().reason, FailureReason::BankRejected);
    assert_eq!(
        record.failure().unwrap().failed_from,
        RemittanceStatus::DispatchedToGateway
    );
    assert!(record.gateway_protocol().is_some());
    assert_eq!(h.bank.calls(RemoteCall::BankSubmit), 1);
}

#[tokio::test]
async fn test_invalid_files_leave_failed_audit_record() {
    let h = harness();

    let wrong_extension = RemittanceRequest::new(
        "033",
        RemittanceType::Payment,
        "lote.pdf",
        outbound_file(&["000000010050"]),
    );
    let empty = RemittanceRequest::new("033", RemittanceType::Payment, "lote.rem", Vec::new());
    let mut short = request("033", &["000000010050"]);
    short.content.truncate(300);

    for req in [wrong_extension, empty, short] {
        let err = h.dispatcher.accept_remittance(req).await.unwrap_err();
        assert!(matches!(err, RemittanceError::InvalidFile(_)), "{:?}", err);
    }

    let failed = h.store.list_by_status(RemittanceStatus::Failed).await.unwrap();
    assert_eq!(failed.len(), 3);
    assert!(failed
        .iter()
        .all(|r| r.failure().unwrap().reason == FailureReason::InvalidFile));
    assert_eq!(h.gateway.calls(RemoteCall::SubmitRemittance), 0);
}

#[tokio::test]
async fn test_declared_totals_must_match_file() {
    let h = harness();
    let mut req = request("033", &["000000010050"]);
    req.declared_total = Some(decimal("100.00"));

    let err = h.dispatcher.accept_remittance(req).await.unwrap_err();
    assert!(matches!(err, RemittanceError::InvalidFile(ref m) if m.contains("declared total")));

    let mut req = request("033", &["000000010050"]);
    req.declared_total = Some(decimal("100.5"));
    req.declared_count = Some(1);
    assert!(h.dispatcher.accept_remittance(req).await.is_ok());
}

#[tokio::test]
async fn test_return_with_short_line_is_reconciled() {
    let h = harness();
    let good = detail_line(1, "000000010050");
    let short = detail_line(2, "000000000100")[..230].to_string();
    let content = format!("{}\n{}\n", good, short).into_bytes();

    let receipt = h
        .dispatcher
        .accept_return(ReturnRequest::new("033", "retorno.ret", content))
        .await
        .unwrap();

    assert_eq!(receipt.status, RemittanceStatus::Notified);
    assert!(receipt.notified);
    assert!(receipt.code.starts_with("RET"));
    assert_eq!(receipt.summary.accepted, 1);
    assert_eq!(receipt.summary.total_value, decimal("100.50"));
    assert_eq!(receipt.summary.errors.len(), 1);
    assert_eq!(receipt.summary.errors[0].line_index, 2);
    assert!(matches!(
        receipt.summary.errors[0].reason,
        LineErrorReason::LineLengthMismatch {
            expected: 240,
            actual: 230
        }
    ));

    let reported = h.gateway.returns();
    assert_eq!(reported.len(), 1);
    assert_eq!(reported[0].processed, 1);
    assert_eq!(reported[0].rejected, 1);
    assert_eq!(reported[0].total_value, decimal("100.50"));

    let record = h.dispatcher.find(&receipt.code).await.unwrap();
    assert_eq!(record.summary(), Some(&receipt.summary));
    assert_eq!(record.record_count(), 1);
}

#[tokio::test]
async fn test_ten_thousand_cent_lines_total_exactly() {
    let h = harness();
    let content: String = (1..=10_000u64)
        .map(|i| format!("{}\r\n", detail_line(i, "000000000001")))
        .collect();

    let receipt = h
        .dispatcher
        .accept_return(ReturnRequest::new("001", "retorno.txt", content.into_bytes()))
        .await
        .unwrap();

    assert_eq!(receipt.summary.accepted, 10_000);
    assert_eq!(receipt.summary.total_value, decimal("100.00"));
}

#[tokio::test]
async fn test_unreadable_return_fails() {
    let h = harness();

    let err = h
        .dispatcher
        .accept_return(ReturnRequest::new(
            "033",
            "retorno.ret",
            b"not a bank file\nstill not\n".to_vec(),
        ))
        .await
        .unwrap_err();

    assert!(matches!(err, RemittanceError::InvalidFile(_)));
    let failed = h.store.list_by_status(RemittanceStatus::Failed).await.unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(h.gateway.calls(RemoteCall::SubmitReturn), 0);
}

#[tokio::test]
async fn test_return_for_unknown_bank() {
    let h = harness();
    let content = detail_line(1, "000000000100").into_bytes();

    let err = h
        .dispatcher
        .accept_return(ReturnRequest::new("999", "retorno.ret", content))
        .await
        .unwrap_err();

    assert!(matches!(err, RemittanceError::UnknownBank(_)));
}

#[tokio::test]
async fn test_failed_notification_stays_reconciled_until_sweep() {
    let h = harness();
    h.gateway.fail_always(
        RemoteCall::SubmitReturn,
        ClientError::Transport("gateway offline".to_string()),
    );
    let content = detail_line(1, "000000000250").into_bytes();

    let receipt = h
        .dispatcher
        .accept_return(ReturnRequest::new("033", "retorno.ret", content))
        .await
        .unwrap();

    assert_eq!(receipt.status, RemittanceStatus::Reconciled);
    assert!(!receipt.notified);
    assert_eq!(
        h.gateway.calls(RemoteCall::SubmitReturn),
        fast_config().retry.inline_notification_attempts
    );

    h.gateway.recover(RemoteCall::SubmitReturn);
    let notified = h.dispatcher.retry_pending_notifications().await.unwrap();

    assert_eq!(notified, vec![receipt.code.clone()]);
    let record = h.dispatcher.find(&receipt.code).await.unwrap();
    assert_eq!(record.status(), RemittanceStatus::Notified);
    assert_eq!(
        h.dispatcher.retry_notification(&receipt.code).await.unwrap(),
        RemittanceStatus::Notified
    );
}

#[tokio::test]
async fn test_sweep_finishes_while_gateway_is_down() {
    let h = harness();
    h.gateway.fail_always(
        RemoteCall::SubmitReturn,
        ClientError::Transport("gateway offline".to_string()),
    );

    let mut codes = Vec::new();
    for name in ["retorno_a.ret", "retorno_b.ret"] {
        let receipt = h
            .dispatcher
            .accept_return(ReturnRequest::new(
                "033",
                name,
                detail_line(1, "000000000250").into_bytes(),
            ))
            .await
            .unwrap();
        codes.push(receipt.code);
    }
    let calls_before = h.gateway.calls(RemoteCall::SubmitReturn);

    let notified = tokio::time::timeout(
        Duration::from_secs(5),
        h.dispatcher.retry_pending_notifications(),
    )
    .await
    .expect("sweep should finish during an outage")
    .unwrap();

    assert!(notified.is_empty());
    let attempts = fast_config().retry.inline_notification_attempts;
    assert_eq!(
        h.gateway.calls(RemoteCall::SubmitReturn) - calls_before,
        2 * attempts
    );
    for code in &codes {
        let record = h.dispatcher.find(code).await.unwrap();
        assert_eq!(record.status(), RemittanceStatus::Reconciled);
    }
}

#[tokio::test]
async fn test_notification_retry_does_not_hold_the_record_lock() {
    let h = harness();
    h.gateway.fail_always(
        RemoteCall::SubmitReturn,
        ClientError::Transport("gateway offline".to_string()),
    );
    let receipt = h
        .dispatcher
        .accept_return(ReturnRequest::new(
            "033",
            "retorno.ret",
            detail_line(1, "000000000250").into_bytes(),
        ))
        .await
        .unwrap();

    let dispatcher = h.dispatcher.clone();
    let code = receipt.code.clone();
    let retry = tokio::spawn(async move { dispatcher.retry_notification(&code).await });
    tokio::time::sleep(Duration::from_millis(20)).await;

    let cancel = tokio::time::timeout(Duration::from_secs(1), h.dispatcher.cancel(&receipt.code))
        .await
        .expect("cancel should not wait on the notification retry");
    assert!(matches!(
        cancel,
        Err(RemittanceError::CancellationRejected { .. })
    ));

    h.gateway.recover(RemoteCall::SubmitReturn);
    let status = tokio::time::timeout(Duration::from_secs(5), retry)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(status, RemittanceStatus::Notified);
}

#[tokio::test]
async fn test_polled_confirmation() {
    let h = harness();
    let receipt = h
        .dispatcher
        .accept_remittance(request("033", &["000000010050"]))
        .await
        .unwrap();

    let report = h.dispatcher.query_status(&receipt.code).await.unwrap();
    assert_eq!(report.status, RemittanceStatus::DispatchedToBank);

    let bank_protocol = receipt.bank_protocol.clone().unwrap();
    h.gateway.set_status(
        &receipt.code,
        GatewayStatus {
            status: "processada".to_string(),
            detail: HashMap::from([(
                "protocolo".to_string(),
                serde_json::Value::String(bank_protocol.clone()),
            )]),
        },
    );

    let report = h.dispatcher.query_status(&receipt.code).await.unwrap();
    assert_eq!(report.status, RemittanceStatus::Confirmed);
    assert_eq!(report.remote_status, "processada");

    // confirming again is a no-op
    assert_eq!(
        h.dispatcher
            .confirm(&receipt.code, &bank_protocol)
            .await
            .unwrap(),
        RemittanceStatus::Confirmed
    );
    let record = h.dispatcher.find(&receipt.code).await.unwrap();
    assert!(record.processed_at.is_some());
    assert_eq!(record.history().len(), 4);
}

#[tokio::test]
async fn test_pushed_confirmation_must_match_protocol() {
    let h = harness();
    let receipt = h
        .dispatcher
        .accept_remittance(request("033", &["000000010050"]))
        .await
        .unwrap();

    let err = h
        .dispatcher
        .confirm(&receipt.code, "SANT999999")
        .await
        .unwrap_err();
    assert!(matches!(err, RemittanceError::ProtocolMismatch { .. }));

    let status = h
        .dispatcher
        .confirm(&receipt.code, receipt.bank_protocol.as_deref().unwrap())
        .await
        .unwrap();
    assert_eq!(status, RemittanceStatus::Confirmed);
}

#[tokio::test]
async fn test_await_confirmation_polls_until_confirmed() {
    let h = harness();
    let receipt = h
        .dispatcher
        .accept_remittance(request("033", &["000000010050"]))
        .await
        .unwrap();

    let gateway = h.gateway.clone();
    let code = receipt.code.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        gateway.set_status(
            &code,
            GatewayStatus {
                status: "confirmed".to_string(),
                detail: HashMap::new(),
            },
        );
    });

    let status = tokio::time::timeout(
        Duration::from_secs(5),
        h.dispatcher.await_confirmation(&receipt.code),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(status, RemittanceStatus::Confirmed);
    assert!(h.gateway.calls(RemoteCall::QueryStatus) >= 2);
}

#[tokio::test]
async fn test_cancel_before_gateway_submission() {
    let h = harness();
    let record = h
        .dispatcher
        .register_remittance(request("033", &["000000010050"]))
        .await
        .unwrap();
    assert_eq!(record.status(), RemittanceStatus::Validated);

    let status = h.dispatcher.cancel(&record.code).await.unwrap();
    assert_eq!(status, RemittanceStatus::Failed);
    assert_eq!(
        h.dispatcher.cancel(&record.code).await.unwrap(),
        RemittanceStatus::Failed
    );

    assert!(h.dispatcher.dispatch(&record.code).await.is_err());
    assert_eq!(h.gateway.calls(RemoteCall::SubmitRemittance), 0);

    let stored = h.dispatcher.find(&record.code).await.unwrap();
    assert_eq!(stored.failure().unwrap().reason, FailureReason::Cancelled);
}

#[tokio::test]
async fn test_cancel_after_gateway_is_rejected() {
    let h = harness();
    let receipt = h
        .dispatcher
        .accept_remittance(request("033", &["000000010050"]))
        .await
        .unwrap();

    let err = h.dispatcher.cancel(&receipt.code).await.unwrap_err();
    assert!(matches!(
        err,
        RemittanceError::CancellationRejected {
            status: RemittanceStatus::DispatchedToBank,
            ..
        }
    ));
}

#[tokio::test]
async fn test_parallel_dispatch_of_distinct_remittances() {
    let h = harness();

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let dispatcher = h.dispatcher.clone();
            let bank_code = if i % 2 == 0 { "033" } else { "001" };
            tokio::spawn(async move {
                dispatcher
                    .accept_remittance(request(bank_code, &["000000001000"]))
                    .await
            })
        })
        .collect();

    let mut codes = HashSet::new();
    for handle in handles {
        let receipt = handle.await.unwrap().unwrap();
        assert_eq!(receipt.status, RemittanceStatus::DispatchedToBank);
        codes.insert(receipt.code);
    }

    assert_eq!(codes.len(), 20);
    assert_eq!(h.gateway.submissions().len(), 20);
    assert_eq!(h.bank.submissions().len(), 20);
}

#[tokio::test]
async fn test_service_responses() {
    let h = harness();
    let service = RemittanceService::new(h.dispatcher.clone());

    let health = service.health_check().await;
    assert!(health.success);
    assert_eq!(health.payload.as_deref(), Some("1.0.0"));

    let rejected = service
        .accept_remittance(request("999", &["000000010050"]))
        .await;
    assert!(!rejected.success);
    assert!(rejected.payload.is_none());
    assert!(rejected.message.contains("Unsupported bank"));

    let accepted = service
        .accept_remittance(request("033", &["000000010050"]))
        .await;
    assert!(accepted.success);
    let code = accepted.payload.unwrap().code;

    let status = service.query_status(&code).await;
    assert!(status.success);
    assert_eq!(
        status.payload.unwrap().status,
        RemittanceStatus::DispatchedToBank
    );

    let missing = service.find("REM1").await;
    assert!(!missing.success);

    h.gateway.fail_next(
        RemoteCall::HealthCheck,
        ClientError::Transport("connection refused".to_string()),
    );
    let down = service.health_check().await;
    assert!(!down.success);
    assert!(down.message.contains("connection refused"));
}

#[tokio::test]
async fn test_available_returns() {
    let h = harness();
    h.bank.publish_return(
        "001",
        AvailableReturn {
            file_name: "RET_20240115.ret".to_string(),
            generated_at: chrono::NaiveDate::from_ymd_opt(2024, 1, 15)
                .unwrap()
                .and_hms_opt(6, 0, 0)
                .unwrap(),
            record_count: 12,
        },
    );

    let returns = h.dispatcher.available_returns("001").await.unwrap();
    assert_eq!(returns.len(), 1);
    assert_eq!(returns[0].record_count, 12);
    assert!(h.dispatcher.available_returns("033").await.unwrap().is_empty());
    assert!(matches!(
        h.dispatcher.available_returns("999").await,
        Err(RemittanceError::UnsupportedBank(_))
    ));
}
