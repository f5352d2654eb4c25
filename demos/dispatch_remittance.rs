//! Outbound remittance dispatch example

use banking_remittance::utils::{MemoryStore, RemoteCall, SimulatedBank, SimulatedGateway};
use banking_remittance::{
    detail_line, header_line, trailer_line, ClientError, GatewayStatus, IntegrationConfig,
    RemittanceDispatcher, RemittanceRequest, RemittanceService, RemittanceType,
};
use std::collections::HashMap;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "banking_remittance=info,info".to_string()),
        )
        .init();

    println!("Banking Remittance - Dispatch Example\n");

    let config = Arc::new(IntegrationConfig::load(None)?);
    let store = Arc::new(MemoryStore::with_banks(config.bank_profiles()));
    let gateway = Arc::new(SimulatedGateway::new());
    let bank = Arc::new(SimulatedBank::new());
    let dispatcher = RemittanceDispatcher::new(
        config.clone(),
        store.clone(),
        store.clone(),
        gateway.clone(),
        bank.clone(),
    )?;
    let service = RemittanceService::new(Arc::new(dispatcher));

    let health = service.health_check().await;
    println!("Health: {}", health.message);

    // 1. A collection batch for Santander; the gateway drops the first attempt
    gateway.fail_next(
        RemoteCall::SubmitRemittance,
        ClientError::Transport("connection reset by peer".to_string()),
    );

    let content = [
        header_line("123456"),
        detail_line(1, "000000010050"),
        detail_line(2, "000000025000"),
        trailer_line(2, 35050),
    ]
    .join("\r\n");
    let request = RemittanceRequest::new(
        "033",
        RemittanceType::Collection,
        "cobranca_20240115.rem",
        content.into_bytes(),
    );

    let response = service.accept_remittance(request).await;
    println!("Accept: {}", response.message);
    let receipt = response.payload.ok_or("remittance was not dispatched")?;
    println!(
        "  code {} | total {} | {} records | gateway {} | bank {}",
        receipt.code,
        receipt.total_value,
        receipt.record_count,
        receipt.gateway_protocol.as_deref().unwrap_or("-"),
        receipt.bank_protocol.as_deref().unwrap_or("-"),
    );

    // 2. The gateway reports the batch as processed
    gateway.set_status(
        &receipt.code,
        GatewayStatus {
            status: "processada".to_string(),
            detail: HashMap::new(),
        },
    );
    let status = service.query_status(&receipt.code).await;
    println!("Status: {}", status.message);

    // 3. A bank without a submission target is refused before any call
    let refused = service
        .accept_remittance(RemittanceRequest::new(
            "999",
            RemittanceType::Payment,
            "pagamento.rem",
            detail_line(1, "000000001000").into_bytes(),
        ))
        .await;
    println!("Refused: {}", refused.message);
    println!(
        "Gateway submissions: {}",
        gateway.calls(RemoteCall::SubmitRemittance)
    );

    Ok(())
}
