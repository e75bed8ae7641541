//! Daily send quota

use chrono::NaiveDate;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::{QuotaStore, StoreError};
use crate::clock::Clock;

/// Persisted `(date, count)` pair
///
/// `count` is only meaningful on `date`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaRecord {
    /// Calendar date the count belongs to
    pub date: NaiveDate,
    /// Successful sends on that date
    pub count: u32,
}

impl QuotaRecord {
    /// Record for `date` with `count` sends
    #[must_use]
    pub const fn new(date: NaiveDate, count: u32) -> Self {
        Self { date, count }
    }

    /// Parse a `YYYY-MM-DD,count` line
    #[must_use]
    pub fn parse(line: &str) -> Option<Self> {
        let (date, count) = line.trim().split_once(',')?;
        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()?;
        let count = count.trim().parse().ok()?;
        Some(Self { date, count })
    }
}

impl fmt::Display for QuotaRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.date.format("%Y-%m-%d"), self.count)
    }
}

/// Quota record stored as a single line in a text file
///
/// Updates write a sibling temporary file, sync it, then rename it over the
/// target, so a crash leaves either the old or the new record.
#[derive(Debug, Clone)]
pub struct FileQuotaStore {
    path: PathBuf,
}

impl FileQuotaStore {
    /// Store backed by `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the quota file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl QuotaStore for FileQuotaStore {
    fn load(&self) -> Result<Option<QuotaRecord>, StoreError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(StoreError::io(&self.path, err)),
        };

        let line = contents.lines().next().unwrap_or_default().trim();
        if line.is_empty() {
            return Ok(None);
        }

        QuotaRecord::parse(line)
            .map(Some)
            .ok_or_else(|| StoreError::CorruptQuota {
                path: self.path.clone(),
                line: line.to_string(),
            })
    }

    fn store(&self, record: QuotaRecord) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| StoreError::io(parent, err))?;
        }

        let temp = self.temp_path();
        let mut file = File::create(&temp).map_err(|err| StoreError::io(&temp, err))?;
        write!(file, "{record}").map_err(|err| StoreError::io(&temp, err))?;
        file.sync_all().map_err(|err| StoreError::io(&temp, err))?;
        drop(file);

        fs::rename(&temp, &self.path).map_err(|err| StoreError::io(&self.path, err))
    }
}

/// Today's send count with a logical reset at the date boundary
///
/// A record from an earlier date reads as zero without touching storage;
/// the next [`increment`](Self::increment) replaces it.
#[derive(Clone)]
pub struct QuotaTracker {
    store: Arc<dyn QuotaStore>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for QuotaTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuotaTracker")
            .field("today", &self.clock.today())
            .finish_non_exhaustive()
    }
}

impl QuotaTracker {
    /// Tracker over `store`, judging "today" with `clock`
    pub fn new(store: Arc<dyn QuotaStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Sends recorded for the current calendar date
    ///
    /// # Errors
    ///
    /// Returns error if the record cannot be read
    pub fn current_count(&self) -> Result<u32, StoreError> {
        self.count_on(self.clock.today())
    }

    /// Count one more send today and return the new count
    ///
    /// # Errors
    ///
    /// Returns error if the record cannot be read or replaced
    pub fn increment(&self) -> Result<u32, StoreError> {
        // one reading of the date for both the lookup and the write
        let today = self.clock.today();
        let count = self.count_on(today)?.saturating_add(1);
        self.store.store(QuotaRecord::new(today, count))?;
        Ok(count)
    }

    /// Whether today's count has reached `limit`
    ///
    /// # Errors
    ///
    /// Returns error if the record cannot be read
    pub fn is_exhausted(&self, limit: u32) -> Result<bool, StoreError> {
        Ok(self.current_count()? >= limit)
    }

    /// Wall-clock time until the count resets
    #[must_use]
    pub fn remaining_today(&self) -> Duration {
        self.clock.until_next_day()
    }

    fn count_on(&self, today: NaiveDate) -> Result<u32, StoreError> {
        Ok(self
            .store
            .load()?
            .filter(|record| record.date == today)
            .map_or(0, |record| record.count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::store::MemoryQuotaStore;
    use chrono::{NaiveDateTime, NaiveTime, TimeDelta};
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Hands out the given instants in order, then repeats the last one
    struct SteppingClock {
        instants: Mutex<VecDeque<NaiveDateTime>>,
    }

    impl SteppingClock {
        fn new(instants: impl IntoIterator<Item = NaiveDateTime>) -> Self {
            Self {
                instants: Mutex::new(instants.into_iter().collect()),
            }
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> NaiveDateTime {
            let mut instants = self.instants.lock();
            if instants.len() > 1 {
                instants.pop_front().unwrap()
            } else {
                *instants.front().unwrap()
            }
        }
    }

    #[test]
    fn test_record_parse_and_display() {
        let record = QuotaRecord::parse("2023-01-01,400").unwrap();
        assert_eq!(record, QuotaRecord::new(date(2023, 1, 1), 400));
        assert_eq!(record.to_string(), "2023-01-01,400");

        assert_eq!(
            QuotaRecord::parse(" 2024-02-29 , 7 \n"),
            Some(QuotaRecord::new(date(2024, 2, 29), 7))
        );
    }

    #[test]
    fn test_record_parse_rejects_garbage() {
        assert!(QuotaRecord::parse("2023-01-01").is_none());
        assert!(QuotaRecord::parse("yesterday,3").is_none());
        assert!(QuotaRecord::parse("2023-01-01,-1").is_none());
        assert!(QuotaRecord::parse("2023-13-01,1").is_none());
    }

    #[test]
    fn test_file_store_missing_and_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileQuotaStore::new(dir.path().join("daily_count.txt"));
        assert_eq!(store.load().unwrap(), None);

        fs::write(store.path(), "\n").unwrap();
        assert_eq!(store.load().unwrap(), None);
    }

    #[test]
    fn test_file_store_replaces_content() {
        let dir = TempDir::new().unwrap();
        let store = FileQuotaStore::new(dir.path().join("daily_count.txt"));

        store.store(QuotaRecord::new(date(2024, 5, 1), 3)).unwrap();
        store.store(QuotaRecord::new(date(2024, 5, 2), 1)).unwrap();

        assert_eq!(fs::read_to_string(store.path()).unwrap(), "2024-05-02,1");
        assert!(!store.temp_path().exists());
        assert_eq!(
            store.load().unwrap(),
            Some(QuotaRecord::new(date(2024, 5, 2), 1))
        );
    }

    #[test]
    fn test_file_store_corrupt_record() {
        let dir = TempDir::new().unwrap();
        let store = FileQuotaStore::new(dir.path().join("daily_count.txt"));
        fs::write(store.path(), "not a record").unwrap();

        let err = store.load().unwrap_err();
        assert!(matches!(err, StoreError::CorruptQuota { ref line, .. } if line == "not a record"));
    }

    #[test]
    fn test_stale_record_reads_as_zero() {
        let store = Arc::new(MemoryQuotaStore::with_record(QuotaRecord::new(
            date(2023, 1, 1),
            400,
        )));
        let clock = Arc::new(FixedClock::on(date(2023, 1, 2)));
        let tracker = QuotaTracker::new(store.clone(), clock);

        assert_eq!(tracker.current_count().unwrap(), 0);
        assert!(!tracker.is_exhausted(400).unwrap());
        // reading does not reset storage
        assert_eq!(
            store.load().unwrap(),
            Some(QuotaRecord::new(date(2023, 1, 1), 400))
        );
    }

    #[test]
    fn test_increment_after_date_change_restarts_at_one() {
        let store = Arc::new(MemoryQuotaStore::with_record(QuotaRecord::new(
            date(2023, 1, 1),
            400,
        )));
        let clock = Arc::new(FixedClock::on(date(2023, 1, 1)));
        let tracker = QuotaTracker::new(store.clone(), clock.clone());
        assert!(tracker.is_exhausted(400).unwrap());

        clock.advance(TimeDelta::days(1));
        assert_eq!(tracker.increment().unwrap(), 1);
        assert_eq!(
            store.load().unwrap(),
            Some(QuotaRecord::new(date(2023, 1, 2), 1))
        );
    }

    #[test]
    fn test_increment_across_midnight_uses_one_date() {
        let day1 = date(2024, 3, 15);
        let day2 = date(2024, 3, 16);
        let store = Arc::new(MemoryQuotaStore::with_record(QuotaRecord::new(day1, 400)));
        let clock = Arc::new(SteppingClock::new([
            day1.and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap()),
            day2.and_time(NaiveTime::MIN),
        ]));
        let tracker = QuotaTracker::new(store.clone(), clock);

        let count = tracker.increment().unwrap();

        // the count belongs to the date it was computed on
        let record = store.load().unwrap().unwrap();
        assert_eq!(record, QuotaRecord::new(day1, count));
        assert_eq!(count, 401);
        // the new day starts from zero, not from yesterday's total
        assert_eq!(tracker.current_count().unwrap(), 0);
        assert!(!tracker.is_exhausted(400).unwrap());
        assert_eq!(tracker.increment().unwrap(), 1);
        assert_eq!(store.load().unwrap(), Some(QuotaRecord::new(day2, 1)));
    }

    #[test]
    fn test_remaining_today_follows_clock() {
        let clock = Arc::new(FixedClock::on(date(2024, 1, 1)));
        let tracker = QuotaTracker::new(Arc::new(MemoryQuotaStore::new()), clock.clone());
        assert_eq!(tracker.remaining_today(), Duration::from_secs(12 * 3600));

        clock.advance(TimeDelta::hours(11));
        assert_eq!(tracker.remaining_today(), Duration::from_secs(3600));
    }
}
