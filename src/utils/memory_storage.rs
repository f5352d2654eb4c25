//! In-memory storage implementation for testing

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::traits::*;
use crate::types::*;

/// In-memory record, bank and blob storage for testing and development
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<HashMap<String, RemittanceRecord>>>,
    banks: Arc<RwLock<HashMap<String, BankProfile>>>,
    blobs: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

fn read<T>(lock: &RwLock<T>) -> RemittanceResult<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| RemittanceError::Storage("store lock poisoned".to_string()))
}

fn write<T>(lock: &RwLock<T>) -> RemittanceResult<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| RemittanceError::Storage("store lock poisoned".to_string()))
}

impl MemoryStore {
    /// Create a new empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with bank profiles
    pub fn with_banks(banks: impl IntoIterator<Item = BankProfile>) -> Self {
        let store = Self::new();
        if let Ok(mut map) = store.banks.write() {
            map.extend(banks.into_iter().map(|bank| (bank.code.clone(), bank)));
        }
        store
    }

    /// Add or replace a bank profile
    pub fn add_bank(&self, bank: BankProfile) -> RemittanceResult<()> {
        write(&self.banks)?.insert(bank.code.clone(), bank);
        Ok(())
    }

    /// Number of stored records
    pub fn record_count(&self) -> usize {
        read(&self.records).map(|r| r.len()).unwrap_or(0)
    }

    /// Clear records and blobs, keeping bank profiles (useful for testing)
    pub fn clear(&self) -> RemittanceResult<()> {
        write(&self.records)?.clear();
        write(&self.blobs)?.clear();
        Ok(())
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn save(&self, record: &RemittanceRecord) -> RemittanceResult<RemittanceRecord> {
        if record.code.trim().is_empty() {
            return Err(RemittanceError::Storage(
                "Record code cannot be empty".to_string(),
            ));
        }

        let mut records = write(&self.records)?;
        if let Some(existing) = records.get(&record.code) {
            if existing.kind() != record.kind() {
                return Err(RemittanceError::Storage(format!(
                    "Record {} cannot change kind",
                    record.code
                )));
            }
        }
        records.insert(record.code.clone(), record.clone());
        Ok(record.clone())
    }

    async fn find_by_code(&self, code: &str) -> RemittanceResult<Option<RemittanceRecord>> {
        Ok(read(&self.records)?.get(code).cloned())
    }

    async fn find_bank_by_code(&self, code: &str) -> RemittanceResult<Option<BankProfile>> {
        Ok(read(&self.banks)?.get(code).cloned())
    }

    async fn list_by_status(
        &self,
        status: RemittanceStatus,
    ) -> RemittanceResult<Vec<RemittanceRecord>> {
        let records = read(&self.records)?;
        let mut filtered: Vec<RemittanceRecord> = records
            .values()
            .filter(|record| record.status() == status)
            .cloned()
            .collect();
        filtered.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(filtered)
    }
}

#[async_trait]
impl BlobStore for MemoryStore {
    async fn store(&self, bytes: &[u8], suggested_name: &str) -> RemittanceResult<String> {
        let mut blobs = write(&self.blobs)?;
        let mut millis = chrono::Utc::now().timestamp_millis();
        let mut name = format!("{}_{}", millis, suggested_name);
        while blobs.contains_key(&name) {
            millis += 1;
            name = format!("{}_{}", millis, suggested_name);
        }
        blobs.insert(name.clone(), bytes.to_vec());
        Ok(name)
    }

    async fn fetch(&self, stored_ref: &str) -> RemittanceResult<Vec<u8>> {
        read(&self.blobs)?
            .get(stored_ref)
            .cloned()
            .ok_or_else(|| RemittanceError::Storage(format!("No stored file {}", stored_ref)))
    }
}
