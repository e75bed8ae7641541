//! bulkmail: quota-aware bulk email sender
//!
//! Sends one campaign message to every address in a CSV list while:
//! - never mailing an address that is already in the durable send ledger
//! - stopping for the day once the daily quota is reached, and resuming at
//!   local midnight
//! - pacing sends in small concurrent batches with a pause between them
//! - backing off after failed batches and leaving failed addresses for the
//!   next run
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use bulkmail::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = BulkmailConfig::load()?.validated()?;
//!     bulkmail::observability::init(&config.logging)?;
//!
//!     let state = BulkmailState::from_config(config);
//!     let report = state.dispatcher(state.sender()?)?.run().await?;
//!
//!     println!("sent {} emails in {} batches", report.sent, report.batches);
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`recipients`]: CSV source, address validation, pending list
//! - [`store`]: send ledger, daily quota, and the lock that joins them
//! - [`email`]: message rendering and the SMTP / console backends
//! - [`dispatch`]: the batch state machine
//! - [`state`]: wiring from configuration to services

#![allow(clippy::missing_errors_doc)]

pub mod clock;
pub mod config;
pub mod dispatch;
pub mod email;
pub mod error;
pub mod observability;
pub mod recipients;
pub mod state;
pub mod store;
pub mod testing;

pub use error::{BulkmailError, Result};

/// Commonly used types
pub mod prelude {
    pub use crate::clock::{Clock, SystemClock};
    pub use crate::config::BulkmailConfig;
    pub use crate::dispatch::{CancellationToken, DispatchState, Dispatcher, RunOutcome, RunReport};
    pub use crate::email::{Campaign, Email, EmailError, EmailSender};
    pub use crate::error::{BulkmailError, Result};
    pub use crate::recipients::{Recipient, RecipientLoader};
    pub use crate::state::BulkmailState;
    pub use crate::store::{QuotaTracker, SendLedger, SendTracker};
}
