//! Throttled dispatch loop
//!
//! The loop is a small state machine:
//!
//! ```text
//! Loading -> CheckQuota -> DispatchBatch -> BatchCooldown -> CheckQuota ...
//!                 |  ^
//!                 v  |
//!          QuotaExhaustedWait
//! ```
//!
//! Recipients are taken from the pending list through a run-local cursor that
//! advances by every recipient offered, so skips and failures never shift
//! which address comes next. Each batch runs its attempts concurrently in a
//! [`JoinSet`] and joins all of them before the loop moves on.

mod attempt;
mod cancellation;
mod report;

use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

pub use attempt::{send_one, AttemptOutcome, DispatchContext};
pub use cancellation::{CancellationToken, Wait};
pub use report::{BatchReport, RunOutcome, RunReport};

use crate::config::DispatchSettings;
use crate::error::{BulkmailError, Result};
use crate::recipients::{Recipient, RecipientLoader};

/// Position in the dispatch state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// Building the pending list
    Loading,
    /// Deciding between sending and waiting
    CheckQuota,
    /// Waiting for the daily count to reset
    QuotaExhaustedWait,
    /// Sending the next batch
    DispatchBatch,
    /// Pausing between batches
    BatchCooldown,
    /// The run is over
    Finished(RunOutcome),
}

/// Drives batches of sends from the pending list
///
/// # Examples
///
/// ```rust,no_run
/// use bulkmail::config::BulkmailConfig;
/// use bulkmail::state::BulkmailState;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = BulkmailConfig::load()?.validated()?;
/// let state = BulkmailState::from_config(config);
///
/// let report = state.dispatcher(state.sender()?)?.run().await?;
/// println!("sent {} emails", report.sent);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Dispatcher {
    settings: DispatchSettings,
    loader: RecipientLoader,
    context: Arc<DispatchContext>,
    shutdown: CancellationToken,
    state: DispatchState,
    pending: Vec<Recipient>,
    cursor: usize,
    report: RunReport,
}

impl Dispatcher {
    /// Dispatcher starting in [`DispatchState::Loading`]
    #[must_use]
    pub fn new(
        settings: DispatchSettings,
        loader: RecipientLoader,
        context: Arc<DispatchContext>,
    ) -> Self {
        Self {
            settings,
            loader,
            context,
            shutdown: CancellationToken::new(),
            state: DispatchState::Loading,
            pending: Vec::new(),
            cursor: 0,
            report: RunReport::default(),
        }
    }

    /// Stop at the next wait or state boundary when `token` is cancelled
    #[must_use]
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> DispatchState {
        self.state
    }

    /// Index of the next recipient to offer
    #[must_use]
    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    /// The pending list built by the loader
    #[must_use]
    pub fn pending(&self) -> &[Recipient] {
        &self.pending
    }

    /// Totals so far
    #[must_use]
    pub const fn report(&self) -> &RunReport {
        &self.report
    }

    /// Run until the list is drained, the run is cancelled, or an error
    ///
    /// # Errors
    ///
    /// Returns error when the pending list or quota cannot be read, or the
    /// relay rejects the sender credentials
    pub async fn run(mut self) -> Result<RunReport> {
        info!(
            batch_size = self.settings.batch_size,
            daily_limit = self.settings.daily_limit,
            sender = self.context.sender.name(),
            "starting bulk send"
        );

        loop {
            if let DispatchState::Finished(outcome) = self.advance().await? {
                info!(
                    ?outcome,
                    batches = self.report.batches,
                    sent = self.report.sent,
                    skipped = self.report.skipped,
                    failed = self.report.failed,
                    errors = self.report.errors,
                    "bulk send finished"
                );
                return Ok(self.report);
            }
        }
    }

    /// Execute one state and return the next one
    ///
    /// Once [`DispatchState::Finished`] is reached, further calls return it
    /// unchanged.
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run)
    pub async fn advance(&mut self) -> Result<DispatchState> {
        let next = match self.state {
            DispatchState::Loading => self.load()?,
            DispatchState::CheckQuota => self.check_quota()?,
            DispatchState::QuotaExhaustedWait => self.wait_for_quota().await,
            DispatchState::DispatchBatch => self.dispatch_batch().await?,
            DispatchState::BatchCooldown => self.cooldown().await,
            finished @ DispatchState::Finished(_) => finished,
        };

        if next != self.state {
            debug!(from = ?self.state, to = ?next, "dispatch state transition");
        }
        if let DispatchState::Finished(outcome) = next {
            self.report.outcome = Some(outcome);
        }
        self.state = next;
        Ok(next)
    }

    fn load(&mut self) -> Result<DispatchState> {
        let loaded = self.loader.load()?;
        if loaded.pending.is_empty() {
            warn!("no valid emails found");
            return Ok(DispatchState::Finished(RunOutcome::NothingToSend));
        }

        self.report.pending = loaded.pending.len();
        self.pending = loaded.pending;
        self.cursor = 0;
        Ok(DispatchState::CheckQuota)
    }

    fn check_quota(&mut self) -> Result<DispatchState> {
        if self.shutdown.is_cancelled() {
            return Ok(DispatchState::Finished(RunOutcome::Cancelled));
        }
        if self.cursor >= self.pending.len() {
            return Ok(DispatchState::Finished(RunOutcome::Drained));
        }

        if self
            .context
            .tracker
            .quota()
            .is_exhausted(self.settings.daily_limit)?
        {
            Ok(DispatchState::QuotaExhaustedWait)
        } else {
            Ok(DispatchState::DispatchBatch)
        }
    }

    async fn wait_for_quota(&mut self) -> DispatchState {
        let until_reset = self.context.tracker.quota().remaining_today();
        let wait = self.settings.quota_wait().min(until_reset);
        self.report.quota_waits += 1;

        info!(
            daily_limit = self.settings.daily_limit,
            wait_secs = wait.as_secs(),
            "daily limit reached, waiting for reset"
        );

        match self.shutdown.sleep(wait).await {
            Wait::Elapsed => DispatchState::CheckQuota,
            Wait::Cancelled => DispatchState::Finished(RunOutcome::Cancelled),
        }
    }

    async fn dispatch_batch(&mut self) -> Result<DispatchState> {
        let daily_count = self.context.tracker.current_count()?;
        let quota_left = self.settings.daily_limit.saturating_sub(daily_count);
        let take = self
            .settings
            .batch_size
            .min(usize::try_from(quota_left).unwrap_or(usize::MAX))
            .max(1);
        let end = (self.cursor + take).min(self.pending.len());
        let batch = self.pending[self.cursor..end].to_vec();
        self.cursor = end;

        let number = self.report.batches + 1;
        let batch_report = self.run_batch(number, batch).await;
        self.report.absorb(&batch_report);

        info!(
            batch = number,
            offered = batch_report.offered(),
            sent = batch_report.sent.len(),
            skipped = batch_report.skipped,
            failed = batch_report.failed.len(),
            errors = batch_report.errors,
            daily_count = ?batch_report.daily_count,
            remaining = self.pending.len() - self.cursor,
            "batch complete"
        );

        if let Some(reason) = batch_report.auth_failure {
            error!(reason = %reason, "SMTP authentication rejected, aborting run");
            return Err(BulkmailError::Authentication {
                sender: self.context.campaign.from_mailbox().email.to_string(),
                reason,
            });
        }

        if batch_report.needs_retry_delay() {
            warn!(
                retry_delay_secs = self.settings.retry_delay_s,
                "batch had failures, backing off"
            );
            if self.shutdown.sleep(self.settings.retry_delay()).await == Wait::Cancelled {
                return Ok(DispatchState::Finished(RunOutcome::Cancelled));
            }
        }

        Ok(DispatchState::BatchCooldown)
    }

    async fn run_batch(&self, number: u64, batch: Vec<Recipient>) -> BatchReport {
        let mut attempts = JoinSet::new();
        for recipient in batch {
            attempts.spawn(send_one(Arc::clone(&self.context), recipient));
        }

        let mut report = BatchReport::new(number);
        while let Some(joined) = attempts.join_next().await {
            match joined {
                Ok(outcome) => report.record(outcome),
                Err(err) => {
                    error!(batch = number, error = %err, "send attempt aborted");
                    report.errors += 1;
                }
            }
        }
        report
    }

    async fn cooldown(&self) -> DispatchState {
        match self.shutdown.sleep(self.settings.batch_delay()).await {
            Wait::Elapsed => DispatchState::CheckQuota,
            Wait::Cancelled => DispatchState::Finished(RunOutcome::Cancelled),
        }
    }
}
