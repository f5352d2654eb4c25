//! Scripted gateway and bank clients for testing and demos
//!
//! Both clients answer successfully unless a failure was scripted for the
//! call. Acknowledgments are keyed by idempotency key, so a repeated call
//! returns the protocol of the first one.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use crate::traits::*;
use crate::types::IdempotencyKey;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Remote call that can be scripted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteCall {
    SubmitRemittance,
    SubmitReturn,
    QueryStatus,
    HealthCheck,
    BankSubmit,
    AvailableReturns,
}

#[derive(Debug, Default)]
struct Script {
    queued: HashMap<RemoteCall, VecDeque<ClientError>>,
    sticky: HashMap<RemoteCall, ClientError>,
    calls: HashMap<RemoteCall, u32>,
}

impl Script {
    /// Count the call and pop the failure scripted for it, if any
    fn next(&mut self, call: RemoteCall) -> Result<(), ClientError> {
        *self.calls.entry(call).or_insert(0) += 1;
        if let Some(error) = self.queued.get_mut(&call).and_then(VecDeque::pop_front) {
            return Err(error);
        }
        match self.sticky.get(&call) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

/// Acknowledgments handed out per idempotency key
#[derive(Debug, Default)]
struct IssuedProtocols {
    issued: HashMap<IdempotencyKey, String>,
    sequence: u64,
}

impl IssuedProtocols {
    fn protocol_for(&mut self, key: &IdempotencyKey, prefix: &str) -> String {
        if let Some(protocol) = self.issued.get(key) {
            return protocol.clone();
        }
        self.sequence += 1;
        let protocol = format!("{}{:06}", prefix, self.sequence);
        self.issued.insert(key.clone(), protocol.clone());
        protocol
    }
}

/// Gateway client with scripted failures
#[derive(Debug)]
pub struct SimulatedGateway {
    script: Mutex<Script>,
    issued: Mutex<IssuedProtocols>,
    statuses: Mutex<HashMap<String, GatewayStatus>>,
    submissions: Mutex<Vec<GatewayRemittance>>,
    returns: Mutex<Vec<GatewayReturn>>,
    version: String,
}

impl Default for SimulatedGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedGateway {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(Script::default()),
            issued: Mutex::new(IssuedProtocols::default()),
            statuses: Mutex::new(HashMap::new()),
            submissions: Mutex::new(Vec::new()),
            returns: Mutex::new(Vec::new()),
            version: "1.0.0".to_string(),
        }
    }

    /// Fail the next call of this kind once
    pub fn fail_next(&self, call: RemoteCall, error: ClientError) {
        lock(&self.script)
            .queued
            .entry(call)
            .or_default()
            .push_back(error);
    }

    /// Fail every call of this kind until [`SimulatedGateway::recover`]
    pub fn fail_always(&self, call: RemoteCall, error: ClientError) {
        lock(&self.script).sticky.insert(call, error);
    }

    pub fn recover(&self, call: RemoteCall) {
        lock(&self.script).sticky.remove(&call);
    }

    /// Remote status reported for a remittance
    pub fn set_status(&self, remittance_id: &str, status: GatewayStatus) {
        lock(&self.statuses).insert(remittance_id.to_string(), status);
    }

    pub fn calls(&self, call: RemoteCall) -> u32 {
        lock(&self.script).calls.get(&call).copied().unwrap_or(0)
    }

    pub fn submissions(&self) -> Vec<GatewayRemittance> {
        lock(&self.submissions).clone()
    }

    pub fn returns(&self) -> Vec<GatewayReturn> {
        lock(&self.returns).clone()
    }
}

#[async_trait]
impl GatewayClient for SimulatedGateway {
    async fn submit_remittance(
        &self,
        submission: &GatewayRemittance,
    ) -> Result<GatewayAck, ClientError> {
        lock(&self.script).next(RemoteCall::SubmitRemittance)?;
        lock(&self.submissions).push(submission.clone());
        let protocol = lock(&self.issued).protocol_for(&submission.idempotency_key, "GW");
        Ok(GatewayAck { protocol })
    }

    async fn submit_return(&self, submission: &GatewayReturn) -> Result<GatewayAck, ClientError> {
        lock(&self.script).next(RemoteCall::SubmitReturn)?;
        lock(&self.returns).push(submission.clone());
        let protocol = lock(&self.issued).protocol_for(&submission.idempotency_key, "GWR");
        Ok(GatewayAck { protocol })
    }

    async fn query_status(&self, remittance_id: &str) -> Result<GatewayStatus, ClientError> {
        lock(&self.script).next(RemoteCall::QueryStatus)?;
        Ok(lock(&self.statuses)
            .get(remittance_id)
            .cloned()
            .unwrap_or_else(|| GatewayStatus {
                status: "em_processamento".to_string(),
                detail: HashMap::new(),
            }))
    }

    async fn health_check(&self) -> Result<String, ClientError> {
        lock(&self.script).next(RemoteCall::HealthCheck)?;
        Ok(self.version.clone())
    }
}

/// Bank client with scripted failures
#[derive(Debug, Default)]
pub struct SimulatedBank {
    script: Mutex<Script>,
    issued: Mutex<IssuedProtocols>,
    submissions: Mutex<Vec<(String, BankSubmission)>>,
    available: Mutex<HashMap<String, Vec<AvailableReturn>>>,
}

impl SimulatedBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self, call: RemoteCall, error: ClientError) {
        lock(&self.script)
            .queued
            .entry(call)
            .or_default()
            .push_back(error);
    }

    pub fn fail_always(&self, call: RemoteCall, error: ClientError) {
        lock(&self.script).sticky.insert(call, error);
    }

    /// Publish a return file for a bank
    pub fn publish_return(&self, bank_code: &str, available: AvailableReturn) {
        lock(&self.available)
            .entry(bank_code.to_string())
            .or_default()
            .push(available);
    }

    pub fn calls(&self, call: RemoteCall) -> u32 {
        lock(&self.script).calls.get(&call).copied().unwrap_or(0)
    }

    /// Submissions received, with the bank code they were sent to
    pub fn submissions(&self) -> Vec<(String, BankSubmission)> {
        lock(&self.submissions).clone()
    }

    fn protocol_prefix(bank_code: &str) -> &'static str {
        match bank_code {
            "033" => "SANT",
            "001" => "BB",
            _ => "BANK",
        }
    }
}

#[async_trait]
impl BankClient for SimulatedBank {
    async fn submit(
        &self,
        bank_code: &str,
        submission: &BankSubmission,
    ) -> Result<BankAck, ClientError> {
        lock(&self.script).next(RemoteCall::BankSubmit)?;
        lock(&self.submissions).push((bank_code.to_string(), submission.clone()));
        let protocol = lock(&self.issued)
            .protocol_for(&submission.idempotency_key, Self::protocol_prefix(bank_code));
        Ok(BankAck {
            protocol,
            status: "enviado".to_string(),
            message: Some(format!("{} received", submission.operation)),
        })
    }

    async fn available_returns(
        &self,
        bank_code: &str,
    ) -> Result<Vec<AvailableReturn>, ClientError> {
        lock(&self.script).next(RemoteCall::AvailableReturns)?;
        Ok(lock(&self.available)
            .get(bank_code)
            .cloned()
            .unwrap_or_default())
    }
}
