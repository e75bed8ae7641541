//! Batch and run summaries

use serde::Serialize;

use super::attempt::AttemptOutcome;
use crate::recipients::Recipient;

/// Why a run ended without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// The loader produced no recipients
    NothingToSend,
    /// Every pending recipient was offered
    Drained,
    /// Shutdown was requested
    Cancelled,
}

/// Tally of one batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    /// 1-based batch number within the run
    pub number: u64,
    /// Recipients delivered and recorded
    pub sent: Vec<Recipient>,
    /// Recipients skipped as already sent or in flight
    pub skipped: usize,
    /// Recipients whose transport failed
    pub failed: Vec<Recipient>,
    /// Attempts that panicked or hit a storage error
    pub errors: usize,
    /// Server response when the credentials were refused
    pub auth_failure: Option<String>,
    /// Daily count after the last successful send
    pub daily_count: Option<u32>,
}

impl BatchReport {
    pub(crate) fn new(number: u64) -> Self {
        Self {
            number,
            ..Self::default()
        }
    }

    pub(crate) fn record(&mut self, outcome: AttemptOutcome) {
        match outcome {
            AttemptOutcome::Sent {
                recipient,
                daily_count,
            } => {
                self.daily_count = Some(self.daily_count.map_or(daily_count, |c| c.max(daily_count)));
                self.sent.push(recipient);
            }
            AttemptOutcome::Skipped { .. } => self.skipped += 1,
            AttemptOutcome::Failed { recipient, error } => {
                if error.is_authentication() && self.auth_failure.is_none() {
                    self.auth_failure = Some(error.to_string());
                }
                self.failed.push(recipient);
            }
            AttemptOutcome::StoreFailed { .. } => self.errors += 1,
        }
    }

    /// Whether the loop should pause for the retry delay after this batch
    #[must_use]
    pub fn needs_retry_delay(&self) -> bool {
        self.errors > 0 || !self.failed.is_empty()
    }

    /// Attempts accounted for
    #[must_use]
    pub fn offered(&self) -> usize {
        self.sent.len() + self.skipped + self.failed.len() + self.errors
    }
}

/// Totals for a whole run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// How the run ended, `None` while it is still going
    pub outcome: Option<RunOutcome>,
    /// Recipients in the pending list at load time
    pub pending: usize,
    /// Batches dispatched
    pub batches: u64,
    /// Successful sends
    pub sent: usize,
    /// Skipped attempts
    pub skipped: usize,
    /// Transport failures
    pub failed: usize,
    /// Panicked attempts and storage errors
    pub errors: usize,
    /// Times the loop waited for the daily quota to reset
    pub quota_waits: u64,
}

impl RunReport {
    pub(crate) fn absorb(&mut self, batch: &BatchReport) {
        self.batches += 1;
        self.sent += batch.sent.len();
        self.skipped += batch.skipped;
        self.failed += batch.failed.len();
        self.errors += batch.errors;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::EmailError;

    fn recipient(addr: &str) -> Recipient {
        Recipient::parse(addr).unwrap()
    }

    #[test]
    fn test_batch_tally() {
        let mut batch = BatchReport::new(1);
        batch.record(AttemptOutcome::Sent {
            recipient: recipient("a@x.com"),
            daily_count: 4,
        });
        batch.record(AttemptOutcome::Sent {
            recipient: recipient("b@x.com"),
            daily_count: 3,
        });
        batch.record(AttemptOutcome::Skipped {
            recipient: recipient("c@x.com"),
        });

        assert_eq!(batch.daily_count, Some(4));
        assert_eq!(batch.offered(), 3);
        assert!(!batch.needs_retry_delay());
    }

    #[test]
    fn test_failures_request_retry_delay() {
        let mut batch = BatchReport::new(2);
        batch.record(AttemptOutcome::Failed {
            recipient: recipient("a@x.com"),
            error: EmailError::smtp("connection reset"),
        });

        assert!(batch.needs_retry_delay());
        assert!(batch.auth_failure.is_none());
    }

    #[test]
    fn test_auth_failure_is_captured() {
        let mut batch = BatchReport::new(1);
        batch.record(AttemptOutcome::Failed {
            recipient: recipient("a@x.com"),
            error: EmailError::Authentication("535 bad credentials".to_string()),
        });

        assert!(batch.auth_failure.unwrap().contains("535"));
    }

    #[test]
    fn test_run_absorbs_batches() {
        let mut run = RunReport::default();
        let mut batch = BatchReport::new(1);
        batch.record(AttemptOutcome::Sent {
            recipient: recipient("a@x.com"),
            daily_count: 1,
        });
        batch.errors = 1;

        run.absorb(&batch);
        run.absorb(&BatchReport::new(2));

        assert_eq!(run.batches, 2);
        assert_eq!(run.sent, 1);
        assert_eq!(run.errors, 1);
    }
}
