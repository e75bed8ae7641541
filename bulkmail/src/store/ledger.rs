//! Newline-delimited file ledger

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use super::{SendLedger, StoreError};

/// Ledger stored as one address per line
///
/// The file is created on the first [`record_sent`](SendLedger::record_sent).
/// A missing file reads as an empty ledger.
#[derive(Debug, Clone)]
pub struct FileLedger {
    path: PathBuf,
}

impl FileLedger {
    /// Ledger backed by `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the ledger file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open_reader(&self) -> Result<Option<BufReader<File>>, StoreError> {
        match File::open(&self.path) {
            Ok(file) => Ok(Some(BufReader::new(file))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::io(&self.path, err)),
        }
    }

    fn entries(&self) -> Result<Vec<String>, StoreError> {
        let Some(reader) = self.open_reader()? else {
            return Ok(Vec::new());
        };

        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line.map_err(|err| StoreError::io(&self.path, err))?;
            let entry = line.trim();
            if !entry.is_empty() {
                entries.push(entry.to_string());
            }
        }
        Ok(entries)
    }
}

impl SendLedger for FileLedger {
    fn has_sent(&self, address: &str) -> Result<bool, StoreError> {
        Ok(self.entries()?.iter().any(|entry| entry == address))
    }

    fn record_sent(&self, address: &str) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| StoreError::io(parent, err))?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|err| StoreError::io(&self.path, err))?;

        writeln!(file, "{address}").map_err(|err| StoreError::io(&self.path, err))?;
        file.sync_all()
            .map_err(|err| StoreError::io(&self.path, err))
    }

    fn sent_addresses(&self) -> Result<HashSet<String>, StoreError> {
        Ok(self.entries()?.into_iter().collect())
    }
}
