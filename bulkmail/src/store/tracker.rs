//! Single-writer send state

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

use super::{QuotaTracker, SendLedger, StoreError};

/// Result of claiming an address before sending
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// The caller owns the address until it commits or releases it
    Acquired,
    /// The address is already in the ledger
    AlreadySent,
    /// Another attempt in this process holds the address
    InFlight,
}

/// Ledger and quota behind one lock
///
/// Send attempts claim an address, send outside the lock, then commit or
/// release. Claims close the gap between "not in the ledger" and "recorded",
/// so two attempts for the same address cannot both send.
pub struct SendTracker {
    ledger: Arc<dyn SendLedger>,
    quota: QuotaTracker,
    in_flight: Mutex<HashSet<String>>,
}

impl std::fmt::Debug for SendTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SendTracker")
            .field("quota", &self.quota)
            .field("in_flight", &self.in_flight.lock().len())
            .finish_non_exhaustive()
    }
}

impl SendTracker {
    /// Tracker over `ledger` and `quota`
    pub fn new(ledger: Arc<dyn SendLedger>, quota: QuotaTracker) -> Self {
        Self {
            ledger,
            quota,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Claim `address` for sending
    ///
    /// # Errors
    ///
    /// Returns error if the ledger cannot be read
    pub fn claim(&self, address: &str) -> Result<Claim, StoreError> {
        let mut in_flight = self.in_flight.lock();
        if in_flight.contains(address) {
            return Ok(Claim::InFlight);
        }
        if self.ledger.has_sent(address)? {
            return Ok(Claim::AlreadySent);
        }
        in_flight.insert(address.to_string());
        Ok(Claim::Acquired)
    }

    /// Record a delivered address and count it against today's quota
    ///
    /// Returns the new daily count. The claim is dropped whether or not the
    /// writes succeed.
    ///
    /// # Errors
    ///
    /// Returns error if the ledger append or the quota update fails
    pub fn commit(&self, address: &str) -> Result<u32, StoreError> {
        let mut in_flight = self.in_flight.lock();
        in_flight.remove(address);
        self.ledger.record_sent(address)?;
        self.quota.increment()
    }

    /// Drop a claim without recording anything
    pub fn release(&self, address: &str) {
        self.in_flight.lock().remove(address);
    }

    /// Sends counted for today
    ///
    /// # Errors
    ///
    /// Returns error if the quota record cannot be read
    pub fn current_count(&self) -> Result<u32, StoreError> {
        let _guard = self.in_flight.lock();
        self.quota.current_count()
    }

    /// Quota view, for exhaustion checks and wait computations
    #[must_use]
    pub const fn quota(&self) -> &QuotaTracker {
        &self.quota
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::store::{MemoryLedger, MemoryQuotaStore};
    use chrono::NaiveDate;

    fn tracker(ledger: Arc<MemoryLedger>) -> SendTracker {
        let clock = Arc::new(FixedClock::on(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()));
        let quota = QuotaTracker::new(Arc::new(MemoryQuotaStore::new()), clock);
        SendTracker::new(ledger, quota)
    }

    #[test]
    fn test_claim_is_exclusive() {
        let tracker = tracker(Arc::new(MemoryLedger::new()));

        assert_eq!(tracker.claim("a@example.org").unwrap(), Claim::Acquired);
        assert_eq!(tracker.claim("a@example.org").unwrap(), Claim::InFlight);

        tracker.release("a@example.org");
        assert_eq!(tracker.claim("a@example.org").unwrap(), Claim::Acquired);
    }

    #[test]
    fn test_commit_records_and_counts() {
        let ledger = Arc::new(MemoryLedger::new());
        let tracker = tracker(ledger.clone());

        assert_eq!(tracker.claim("a@example.org").unwrap(), Claim::Acquired);
        assert_eq!(tracker.commit("a@example.org").unwrap(), 1);

        assert_eq!(ledger.entries(), vec!["a@example.org".to_string()]);
        assert_eq!(tracker.current_count().unwrap(), 1);
        assert_eq!(tracker.claim("a@example.org").unwrap(), Claim::AlreadySent);
    }

    #[test]
    fn test_ledger_entries_are_already_sent() {
        let tracker = tracker(Arc::new(MemoryLedger::with_entries(["c@example.org"])));
        assert_eq!(tracker.claim("c@example.org").unwrap(), Claim::AlreadySent);
        assert_eq!(tracker.current_count().unwrap(), 0);
    }
}
