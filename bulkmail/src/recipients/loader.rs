//! Builds the pending list for a run

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{normalize, read_candidates, InvalidRecipient, Recipient};
use crate::error::Result;
use crate::store::SendLedger;

/// Outcome of a load, for the dispatch loop and the `check` command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Recipients to offer, in source order
    pub pending: Vec<Recipient>,
    /// Candidates already in the ledger
    pub skipped_sent: usize,
    /// Candidates that failed validation, with the reason
    pub invalid: Vec<(String, InvalidRecipient)>,
    /// Repeats of an address seen earlier in the source
    pub duplicates: usize,
    /// The source file does not exist
    pub source_missing: bool,
}

/// Reads the recipient source and filters it against the ledger
///
/// Loading has no side effects on the ledger or the source.
#[derive(Clone)]
pub struct RecipientLoader {
    source: PathBuf,
    ledger: Arc<dyn SendLedger>,
}

impl std::fmt::Debug for RecipientLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecipientLoader")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl RecipientLoader {
    /// Loader for the CSV at `source`, skipping addresses in `ledger`
    pub fn new(source: impl Into<PathBuf>, ledger: Arc<dyn SendLedger>) -> Self {
        Self {
            source: source.into(),
            ledger,
        }
    }

    /// Location of the recipient source
    #[must_use]
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// The ordered list of recipients still to be sent
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load)
    pub fn load_pending(&self) -> Result<Vec<Recipient>> {
        Ok(self.load()?.pending)
    }

    /// Load the source and classify every candidate
    ///
    /// A missing source yields an empty report with `source_missing` set.
    ///
    /// # Errors
    ///
    /// Returns error if the source exists but cannot be read, or the ledger
    /// cannot be read
    pub fn load(&self) -> Result<LoadReport> {
        let Some(candidates) = read_candidates(&self.source)? else {
            warn!(source = %self.source.display(), "recipient source not found");
            return Ok(LoadReport {
                source_missing: true,
                ..LoadReport::default()
            });
        };

        let sent = self.ledger.sent_addresses()?;
        let mut seen = HashSet::new();
        let mut report = LoadReport::default();

        for candidate in candidates {
            if sent.contains(candidate.as_str()) || sent.contains(&normalize(&candidate)) {
                report.skipped_sent += 1;
                continue;
            }

            match Recipient::parse(&candidate) {
                Ok(recipient) => {
                    if seen.insert(recipient.clone()) {
                        report.pending.push(recipient);
                    } else {
                        debug!(recipient = %recipient, "duplicate recipient in source");
                        report.duplicates += 1;
                    }
                }
                Err(reason) => {
                    warn!(candidate = %candidate, reason = %reason, "skipping invalid email");
                    report.invalid.push((candidate, reason));
                }
            }
        }

        info!(
            source = %self.source.display(),
            pending = report.pending.len(),
            already_sent = report.skipped_sent,
            invalid = report.invalid.len(),
            duplicates = report.duplicates,
            "recipients loaded"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryLedger;
    use std::fs;
    use tempfile::TempDir;

    fn source(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("recipients.csv");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_missing_source_is_empty() {
        let dir = TempDir::new().unwrap();
        let loader = RecipientLoader::new(dir.path().join("none.csv"), Arc::new(MemoryLedger::new()));

        let report = loader.load().unwrap();
        assert!(report.source_missing);
        assert!(report.pending.is_empty());
    }

    #[test]
    fn test_ledger_matches_normalized_form() {
        let dir = TempDir::new().unwrap();
        let path = source(&dir, "Ann@X.COM\nbob@x.com\n");
        let ledger = Arc::new(MemoryLedger::with_entries(["Ann@x.com"]));

        let report = RecipientLoader::new(path, ledger).load().unwrap();
        assert_eq!(report.skipped_sent, 1);
        assert_eq!(report.pending, vec![Recipient::parse("bob@x.com").unwrap()]);
    }

    #[test]
    fn test_first_occurrence_wins() {
        let dir = TempDir::new().unwrap();
        let path = source(&dir, "a@x.com\nb@x.com\na@X.com\n");

        let report = RecipientLoader::new(path, Arc::new(MemoryLedger::new()))
            .load()
            .unwrap();
        let pending: Vec<&str> = report.pending.iter().map(Recipient::as_str).collect();
        assert_eq!(pending, vec!["a@x.com", "b@x.com"]);
        assert_eq!(report.duplicates, 1);
    }

    #[test]
    fn test_invalid_rows_are_reported() {
        let dir = TempDir::new().unwrap();
        let path = source(&dir, "email\nnot-an-address\nok@x.com\nroot@localhost\n");

        let report = RecipientLoader::new(path, Arc::new(MemoryLedger::new()))
            .load()
            .unwrap();
        assert_eq!(report.pending.len(), 1);
        let rejected: Vec<&str> = report.invalid.iter().map(|(raw, _)| raw.as_str()).collect();
        assert_eq!(rejected, vec!["email", "not-an-address", "root@localhost"]);
    }
}
