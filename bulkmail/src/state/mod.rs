//! Application state
//!
//! Wires the configuration into concrete services: file-backed ledger and
//! quota, the system clock, the mail backend and the rendered campaign.
//! Tests build the same state over in-memory stores with
//! [`BulkmailState::with_stores`].

use chrono::NaiveDate;
use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::{BackendKind, BulkmailConfig};
use crate::dispatch::{DispatchContext, Dispatcher};
use crate::email::{Campaign, ConsoleBackend, EmailError, EmailSender, SmtpBackend};
use crate::error::Result;
use crate::recipients::{LoadReport, RecipientLoader};
use crate::store::{
    FileLedger, FileQuotaStore, QuotaStore, QuotaTracker, SendLedger, SendTracker,
};

/// Snapshot for the `status` command
#[derive(Debug, Clone)]
pub struct StatusReport {
    /// Local calendar date the count applies to
    pub today: NaiveDate,
    /// Sends counted today
    pub daily_count: u32,
    /// Configured daily limit
    pub daily_limit: u32,
    /// Distinct addresses in the ledger
    pub ledger_size: usize,
    /// What a run would load right now
    pub load: LoadReport,
}

impl StatusReport {
    /// Sends still allowed today
    #[must_use]
    pub const fn remaining_quota(&self) -> u32 {
        self.daily_limit.saturating_sub(self.daily_count)
    }
}

/// Shared services for one process
///
/// # Example
///
/// ```rust,no_run
/// use bulkmail::config::BulkmailConfig;
/// use bulkmail::state::BulkmailState;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = BulkmailConfig::load()?;
/// let state = BulkmailState::from_config(config);
/// let status = state.status()?;
/// println!("{} sent today", status.daily_count);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct BulkmailState {
    config: Arc<BulkmailConfig>,
    ledger: Arc<dyn SendLedger>,
    tracker: Arc<SendTracker>,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for BulkmailState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BulkmailState")
            .field("config", &self.config)
            .field("tracker", &self.tracker)
            .finish_non_exhaustive()
    }
}

impl BulkmailState {
    /// State backed by the files named in `[storage]` and the system clock
    #[must_use]
    pub fn from_config(config: BulkmailConfig) -> Self {
        let ledger = Arc::new(FileLedger::new(config.storage.ledger.clone()));
        let quota = Arc::new(FileQuotaStore::new(config.storage.quota.clone()));
        Self::with_stores(config, ledger, quota, Arc::new(SystemClock))
    }

    /// State over arbitrary stores and clock
    #[must_use]
    pub fn with_stores(
        config: BulkmailConfig,
        ledger: Arc<dyn SendLedger>,
        quota: Arc<dyn QuotaStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let tracker = Arc::new(SendTracker::new(
            Arc::clone(&ledger),
            QuotaTracker::new(quota, Arc::clone(&clock)),
        ));
        Self {
            config: Arc::new(config),
            ledger,
            tracker,
            clock,
        }
    }

    /// Loaded configuration
    #[must_use]
    pub fn config(&self) -> &BulkmailConfig {
        &self.config
    }

    /// Ledger and quota
    #[must_use]
    pub fn tracker(&self) -> &Arc<SendTracker> {
        &self.tracker
    }

    /// Loader for the configured recipient source
    #[must_use]
    pub fn loader(&self) -> RecipientLoader {
        RecipientLoader::new(
            self.config.storage.recipients.clone(),
            Arc::clone(&self.ledger),
        )
    }

    /// Mail backend selected by `backend`
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured
    pub fn sender(&self) -> std::result::Result<Arc<dyn EmailSender>, EmailError> {
        Ok(match self.config.backend {
            BackendKind::Smtp => Arc::new(SmtpBackend::new(&self.config.smtp, &self.config.sender)?),
            BackendKind::Console => Arc::new(ConsoleBackend::verbose()),
        })
    }

    /// Dispatcher sending through `sender`
    ///
    /// # Errors
    ///
    /// Returns error if the campaign cannot be rendered
    pub fn dispatcher(&self, sender: Arc<dyn EmailSender>) -> Result<Dispatcher> {
        let campaign = Campaign::from_settings(&self.config.sender, &self.config.message)?;
        let context = Arc::new(DispatchContext {
            sender,
            tracker: Arc::clone(&self.tracker),
            campaign: Arc::new(campaign),
        });
        Ok(Dispatcher::new(
            self.config.dispatch.clone(),
            self.loader(),
            context,
        ))
    }

    /// Quota, ledger and pending-list snapshot
    ///
    /// # Errors
    ///
    /// Returns error if the ledger, quota or recipient source cannot be read
    pub fn status(&self) -> Result<StatusReport> {
        Ok(StatusReport {
            today: self.clock.today(),
            daily_count: self.tracker.current_count()?,
            daily_limit: self.config.dispatch.daily_limit,
            ledger_size: self.ledger.sent_addresses()?.len(),
            load: self.loader().load()?,
        })
    }
}
