//! Error types and error handling
//!
//! Each concern owns its own error enum ([`ConfigError`], [`StoreError`],
//! [`EmailError`]); they all fold into [`BulkmailError`], which is what the
//! dispatch loop and the binary deal with.

use thiserror::Error;

use crate::config::ConfigError;
use crate::email::EmailError;
use crate::store::StoreError;

/// Result alias for operations that surface [`BulkmailError`]
pub type Result<T> = std::result::Result<T, BulkmailError>;

/// Top-level error type
#[derive(Debug, Error)]
pub enum BulkmailError {
    /// Configuration could not be loaded or failed validation
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Ledger or quota storage failed
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    /// Message could not be built or rendered
    #[error("Email error: {0}")]
    Email(#[from] EmailError),

    /// Recipient source exists but could not be read
    #[error("Recipient source error: {0}")]
    Source(#[from] csv::Error),

    /// The mail server rejected the sender credentials
    ///
    /// Unlike per-recipient transport failures this aborts the run: every
    /// further attempt would be rejected the same way.
    #[error("Authentication failed for {sender}: {reason}")]
    Authentication {
        /// Sender address the credentials belong to
        sender: String,
        /// Server response
        reason: String,
    },
}
