//! Durable send state
//!
//! Two flat records survive across runs:
//!
//! - the send ledger, an append-only list of addresses that were delivered
//! - the quota record, a single `date,count` pair for today's sends
//!
//! Both sit behind traits so the dispatch loop can run against files in
//! production and in-memory stores in tests. [`SendTracker`] combines them
//! behind one lock.

mod ledger;
mod memory;
mod quota;
mod tracker;

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub use ledger::FileLedger;
pub use memory::{MemoryLedger, MemoryQuotaStore};
pub use quota::{FileQuotaStore, QuotaRecord, QuotaTracker};
pub use tracker::{Claim, SendTracker};

/// Storage errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing a state file failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// The quota file does not hold a `date,count` line
    #[error("corrupt quota record in {}: {line:?}", path.display())]
    CorruptQuota {
        /// Quota file
        path: PathBuf,
        /// Offending content
        line: String,
    },

    /// A storage call moved to the blocking pool did not finish
    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl StoreError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Append-only record of delivered addresses
///
/// Lookups use set semantics. Writers may append an address more than once.
pub trait SendLedger: Send + Sync {
    /// Whether `address` was recorded as an exact entry
    ///
    /// # Errors
    ///
    /// Returns error if the record exists but cannot be read
    fn has_sent(&self, address: &str) -> Result<bool, StoreError>;

    /// Durably append `address`
    ///
    /// The entry must survive a process crash once this returns.
    ///
    /// # Errors
    ///
    /// Returns error if the entry could not be written and synced
    fn record_sent(&self, address: &str) -> Result<(), StoreError>;

    /// Every recorded address, read in one pass
    ///
    /// # Errors
    ///
    /// Returns error if the record exists but cannot be read
    fn sent_addresses(&self) -> Result<HashSet<String>, StoreError>;
}

/// Persistence for the single daily quota record
pub trait QuotaStore: Send + Sync {
    /// The stored record, `None` if nothing was ever written
    ///
    /// # Errors
    ///
    /// Returns error on I/O failure or unparseable content
    fn load(&self) -> Result<Option<QuotaRecord>, StoreError>;

    /// Replace the stored record
    ///
    /// # Errors
    ///
    /// Returns error if the record could not be durably written
    fn store(&self, record: QuotaRecord) -> Result<(), StoreError>;
}
