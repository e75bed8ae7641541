//! In-process stores

use parking_lot::Mutex;
use std::collections::HashSet;

use super::{QuotaRecord, QuotaStore, SendLedger, StoreError};

/// Ledger kept in memory, lost on exit
///
/// Keeps every append, duplicates included, so tests can observe what a
/// file ledger would have written.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    entries: Mutex<Vec<String>>,
}

impl MemoryLedger {
    /// Empty ledger
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger pre-populated with `addresses`
    pub fn with_entries<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            entries: Mutex::new(addresses.into_iter().map(Into::into).collect()),
        }
    }

    /// Every append in order
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().clone()
    }
}

impl SendLedger for MemoryLedger {
    fn has_sent(&self, address: &str) -> Result<bool, StoreError> {
        Ok(self.entries.lock().iter().any(|entry| entry == address))
    }

    fn record_sent(&self, address: &str) -> Result<(), StoreError> {
        self.entries.lock().push(address.to_string());
        Ok(())
    }

    fn sent_addresses(&self) -> Result<HashSet<String>, StoreError> {
        Ok(self.entries.lock().iter().cloned().collect())
    }
}

/// Quota record kept in memory
#[derive(Debug, Default)]
pub struct MemoryQuotaStore {
    record: Mutex<Option<QuotaRecord>>,
}

impl MemoryQuotaStore {
    /// Store with no record
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding `record`
    #[must_use]
    pub fn with_record(record: QuotaRecord) -> Self {
        Self {
            record: Mutex::new(Some(record)),
        }
    }
}

impl QuotaStore for MemoryQuotaStore {
    fn load(&self) -> Result<Option<QuotaRecord>, StoreError> {
        Ok(*self.record.lock())
    }

    fn store(&self, record: QuotaRecord) -> Result<(), StoreError> {
        *self.record.lock() = Some(record);
        Ok(())
    }
}
