//! CSV recipient source

use std::path::Path;
use tracing::warn;

/// Read candidate addresses from the first column of a CSV file
///
/// Rows keep file order. Blank rows and rows with an empty first field are
/// skipped. There is no header handling: a header row comes back as a
/// candidate and fails validation like any other bad address. Returns `None`
/// when the file does not exist.
///
/// # Errors
///
/// Returns error if the file exists but cannot be opened or read
pub fn read_candidates(path: &Path) -> Result<Option<Vec<String>>, csv::Error> {
    if !path.exists() {
        return Ok(None);
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)?;

    let mut candidates = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = match record {
            Ok(record) => record,
            Err(err) if err.is_io_error() => return Err(err),
            Err(err) => {
                warn!(row = row + 1, error = %err, "skipping unreadable recipient row");
                continue;
            }
        };

        if let Some(candidate) = record.get(0).filter(|field| !field.is_empty()) {
            candidates.push(candidate.to_string());
        }
    }

    Ok(Some(candidates))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        assert!(read_candidates(&dir.path().join("absent.csv"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_first_column_in_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("list.csv");
        fs::write(
            &path,
            "email,name\n b@x.com ,Bea\n\na@x.com\n,orphan\nc@x.com,Cy,extra\n",
        )
        .unwrap();

        let candidates = read_candidates(&path).unwrap().unwrap();
        assert_eq!(candidates, vec!["email", "b@x.com", "a@x.com", "c@x.com"]);
    }

    #[test]
    fn test_empty_file_has_no_candidates() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("list.csv");
        fs::write(&path, "").unwrap();

        assert_eq!(read_candidates(&path).unwrap(), Some(Vec::new()));
    }
}
