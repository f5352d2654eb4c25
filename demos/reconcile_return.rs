//! Return file reconciliation example

use banking_remittance::utils::{FileBlobStore, MemoryStore, SimulatedBank, SimulatedGateway};
use banking_remittance::{
    detail_line, trailer_line, IntegrationConfig, RemittanceDispatcher, RemittanceService,
    ReturnRequest,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "banking_remittance=info,info".to_string()),
        )
        .init();

    println!("Banking Remittance - Return Reconciliation Example\n");

    let mut config = IntegrationConfig::default();
    config.files.directory = std::env::temp_dir()
        .join("banking-remittance-demo")
        .to_string_lossy()
        .into_owned();
    let config = Arc::new(config);

    let store = Arc::new(MemoryStore::with_banks(config.bank_profiles()));
    let blobs = Arc::new(FileBlobStore::from_config(&config.files));
    let dispatcher = RemittanceDispatcher::new(
        config.clone(),
        store,
        blobs.clone(),
        Arc::new(SimulatedGateway::new()),
        Arc::new(SimulatedBank::new()),
    )?;
    let service = RemittanceService::new(Arc::new(dispatcher));

    // Three settled slips, one truncated line and a trailer
    let mut short = detail_line(3, "000000000990");
    short.truncate(230);
    let content = [
        detail_line(1, "000000010050"),
        detail_line(2, "000000004500"),
        short,
        detail_line(4, "000000000001"),
        trailer_line(4, 14551),
    ]
    .join("\n");

    let response = service
        .accept_return(ReturnRequest::new("001", "retorno_bb.ret", content.into_bytes()))
        .await;
    println!("Accept: {}", response.message);

    let receipt = response.payload.ok_or("return was not reconciled")?;
    let summary = &receipt.summary;
    println!(
        "  {} accepted | {} rejected | total {} | status {}",
        summary.accepted, summary.rejected, summary.total_value, receipt.status
    );
    if let Some(trailer) = &summary.trailer {
        println!(
            "  trailer declares {} records / {} (consistent: {})",
            trailer.declared_count,
            trailer.declared_total,
            trailer.is_consistent()
        );
    }
    for error in &summary.errors {
        println!("  ✗ {}", error);
    }

    let record = service.find(&receipt.code).await;
    if let Some(record) = record.payload {
        println!(
            "Stored under {} as {}",
            blobs.directory().display(),
            record.stored_file.as_deref().unwrap_or("-")
        );
    }

    Ok(())
}
