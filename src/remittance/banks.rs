//! Bank selection table

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::config::BankConfig;
use crate::types::*;

/// Bank-side operation a remittance is submitted as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BankOperation {
    #[serde(rename = "remessa_cobranca")]
    CollectionRemittance,
    #[serde(rename = "remessa_pagamento")]
    PaymentRemittance,
}

impl BankOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            BankOperation::CollectionRemittance => "remessa_cobranca",
            BankOperation::PaymentRemittance => "remessa_pagamento",
        }
    }
}

impl From<RemittanceType> for BankOperation {
    fn from(remittance_type: RemittanceType) -> Self {
        match remittance_type {
            RemittanceType::Collection => BankOperation::CollectionRemittance,
            RemittanceType::Payment | RemittanceType::Ted | RemittanceType::Doc => {
                BankOperation::PaymentRemittance
            }
        }
    }
}

impl fmt::Display for BankOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Submission target for one bank
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BankHandler {
    pub bank_code: String,
    pub name: String,
    /// Path of the bank-specific submission endpoint
    pub endpoint: String,
}

impl BankHandler {
    pub fn new(bank_code: &str, name: &str, endpoint: &str) -> Self {
        Self {
            bank_code: bank_code.to_string(),
            name: name.to_string(),
            endpoint: endpoint.to_string(),
        }
    }
}

/// Maps bank codes to submission targets
///
/// Resolution happens before any I/O; an unmapped code never reaches a
/// remote client.
#[derive(Debug, Clone, Default)]
pub struct BankRegistry {
    handlers: HashMap<String, BankHandler>,
}

impl BankRegistry {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Build the registry from configured banks
    pub fn from_config(banks: &[BankConfig]) -> Self {
        let mut registry = Self::new();
        for bank in banks {
            registry.register(BankHandler::new(&bank.code, &bank.name, &bank.endpoint));
        }
        registry
    }

    /// Register or replace a handler
    pub fn register(&mut self, handler: BankHandler) {
        self.handlers.insert(handler.bank_code.clone(), handler);
    }

    pub fn has(&self, bank_code: &str) -> bool {
        self.handlers.contains_key(bank_code)
    }

    /// Resolve the handler for a bank code
    pub fn resolve(&self, bank_code: &str) -> RemittanceResult<&BankHandler> {
        self.handlers
            .get(bank_code)
            .ok_or_else(|| RemittanceError::UnsupportedBank(bank_code.to_string()))
    }

    pub fn bank_codes(&self) -> Vec<&str> {
        let mut codes: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        codes.sort_unstable();
        codes
    }
}
