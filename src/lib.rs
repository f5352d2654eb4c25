//! # Banking Remittance
//!
//! Dispatches payment/collection remittance batches to a processing gateway
//! and to banks, and reconciles CNAB-style bank return files.
//!
//! ## Features
//!
//! - **Fixed-width codec**: declarative layouts decoded and encoded generically, with per-line errors
//! - **Return reconciliation**: per-line classification and fixed-point totals
//! - **Lifecycle state machine**: every status change of a remittance is an explicit, audited transition
//! - **Dispatch orchestration**: gateway first, then bank, with idempotency keys and bounded retries
//! - **Storage abstraction**: trait-based record, blob, gateway and bank collaborators
//!
//! ## Quick Start
//!
//! ```rust
//! use banking_remittance::{cnab240_reference, decode, detail_line, ReconciliationEngine};
//!
//! let layout = cnab240_reference();
//! let content = format!("{}\n", detail_line(1, "000000010050"));
//!
//! let summary = ReconciliationEngine::new().reconcile(decode(content.as_bytes(), &layout), &layout);
//! assert_eq!(summary.accepted, 1);
//! assert_eq!(summary.total_value.to_string(), "100.50");
//! ```

pub mod codec;
pub mod config;
pub mod reconciliation;
pub mod remittance;
pub mod service;
pub mod traits;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use codec::*;
pub use crate::config::{BankConfig, FileConfig, GatewayConfig, IntegrationConfig, RetryConfig};
pub use reconciliation::*;
pub use remittance::*;
pub use service::*;
pub use traits::*;
pub use types::*;
