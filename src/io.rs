// 📂 Portfolio files - entry CSVs in, reconciled CSVs and checksum out
//
// A portfolio is a directory: every non-hidden *.csv below it is an entry
// file, `.checksum.json` holds the previous run's trusted hashes.

use crate::entry::{format_cents, Entry, Origin, RawEntry};
use crate::hasher::ChecksumSet;
use crate::pipeline::ReconciledLedger;
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const CHECKSUM_FILE: &str = ".checksum.json";

// ============================================================================
// READING
// ============================================================================

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

/// Every non-hidden `*.csv` under `dir`, sorted by path.
pub fn find_entry_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        let listing = fs::read_dir(&current)
            .with_context(|| format!("Failed to list {}", current.display()))?;
        for item in listing {
            let path = item?.path();
            if is_hidden(&path) {
                continue;
            }
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().map(|e| e == "csv").unwrap_or(false) {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Read one entry file; rows get `(path, row_index)` origins.
pub fn load_entry_file(path: &Path) -> Result<Vec<RawEntry>> {
    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open CSV file {}", path.display()))?;

    let mut rows = Vec::new();
    for (row, result) in rdr.deserialize().enumerate() {
        let raw: RawEntry = result
            .with_context(|| format!("Failed to read row {} of {}", row, path.display()))?;
        rows.push(raw.with_origin(Origin::new(path, row)));
    }

    Ok(rows)
}

/// Merge every entry file of a portfolio into one raw table.
pub fn load_portfolio(dir: &Path) -> Result<Vec<RawEntry>> {
    let mut rows = Vec::new();
    for path in find_entry_files(dir)? {
        let loaded = load_entry_file(&path)?;
        tracing::debug!(file = %path.display(), rows = loaded.len(), "loaded entry file");
        rows.extend(loaded);
    }
    Ok(rows)
}

// ============================================================================
// WRITING
// ============================================================================

/// Output column layout, numbers with 2 decimals.
#[derive(Debug, Serialize)]
pub struct OutputRow<'a> {
    pub transaction_id: Option<&'a str>,
    pub date: String,
    pub description: Option<&'a str>,
    pub entity: &'a str,
    pub category: Option<&'a str>,
    pub amount: String,
    pub rate: Option<String>,
    pub status: &'static str,
    pub account_name: &'a str,
    pub account_mask: &'a str,
    pub account_type: &'a str,
    pub account_subtype: &'a str,
    pub balance_current: Option<String>,
    pub balance_available: Option<String>,
    pub balance_limit: Option<String>,
    pub balance_total: Option<String>,
    pub hash: Option<&'a str>,
}

impl<'a> From<&'a Entry> for OutputRow<'a> {
    fn from(e: &'a Entry) -> Self {
        OutputRow {
            transaction_id: e.transaction_id.as_deref(),
            date: e.date.format("%Y-%m-%d").to_string(),
            description: e.description.as_deref(),
            entity: &e.entity,
            category: e.category.as_deref(),
            amount: format_cents(e.amount),
            rate: (e.rate != Decimal::ONE).then(|| e.rate.normalize().to_string()),
            status: e.status.as_str(),
            account_name: &e.account_name,
            account_mask: &e.account_mask,
            account_type: e.account_type.as_str(),
            account_subtype: &e.account_subtype,
            balance_current: e.balance_current.map(format_cents),
            balance_available: e.balance_available.map(format_cents),
            balance_limit: e.balance_limit.map(format_cents),
            balance_total: e.balance_total.map(format_cents),
            hash: e.hash.as_deref(),
        }
    }
}

pub fn write_entries(path: &Path, entries: &[&Entry]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV file {}", path.display()))?;
    for entry in entries {
        wtr.serialize(OutputRow::from(*entry))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write each source file's entries back to it, in reconciled order.
/// Returns the number of files written.
pub fn write_partitioned(ledger: &ReconciledLedger) -> Result<usize> {
    let mut by_file: BTreeMap<&Path, Vec<&Entry>> = BTreeMap::new();
    for entry in &ledger.entries {
        by_file.entry(entry.origin.file.as_path()).or_default().push(entry);
    }

    for (path, entries) in &by_file {
        write_entries(path, entries)?;
    }
    Ok(by_file.len())
}

// ============================================================================
// CHECKSUM ARTIFACT
// ============================================================================

/// Read a persisted checksum; a missing file means "no trust anchor yet".
pub fn read_checksum(path: &Path) -> Result<Option<ChecksumSet>> {
    if !path.exists() {
        return Ok(None);
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read checksum {}", path.display()))?;
    let set = serde_json::from_str(&text)
        .with_context(|| format!("Invalid checksum file {}", path.display()))?;
    Ok(Some(set))
}

pub fn write_checksum(path: &Path, checksum: &ChecksumSet) -> Result<()> {
    let json = serde_json::to_string_pretty(checksum)?;
    fs::write(path, json).with_context(|| format!("Failed to write checksum {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "date,entity,amount,status,account_name,account_mask,account_type,account_subtype\n";

    #[test]
    fn test_find_entry_files_skips_hidden() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.csv"), HEADER).unwrap();
        fs::create_dir(dir.path().join("sub")).unwrap();
        fs::write(dir.path().join("sub/a.csv"), HEADER).unwrap();
        fs::create_dir(dir.path().join(".archive")).unwrap();
        fs::write(dir.path().join(".archive/old.csv"), HEADER).unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let files = find_entry_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["b.csv".to_string(), "sub/a.csv".to_string()]);
    }

    #[test]
    fn test_load_entry_file_sets_origin_and_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checking.csv");
        let mut file = fs::File::create(&path).unwrap();
        write!(
            file,
            "{}2024-01-01,Employer,1000,posted,Checking,1234,depository,checking\n\
             2024-01-02,Cafe,-3.50,pending,Checking,1234,depository,checking\n",
            HEADER
        )
        .unwrap();

        let rows = load_entry_file(&path).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].origin, Origin::new(&path, 1));
        assert_eq!(rows[1].amount.as_deref(), Some("-3.50"));
        assert!(rows[0].balance_current.is_none());
        assert!(rows[0].hash.is_none());
    }

    #[test]
    fn test_checksum_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CHECKSUM_FILE);
        assert!(read_checksum(&path).unwrap().is_none());

        let set: ChecksumSet = vec!["aa".to_string(), "bb".to_string()].into_iter().collect();
        write_checksum(&path, &set).unwrap();
        assert_eq!(read_checksum(&path).unwrap(), Some(set));
    }
}
