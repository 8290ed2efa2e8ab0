// 🔐 Integrity Hasher - stable fingerprint of every settled entry
//
// The hash covers only economically load-bearing fields (no description,
// no category, no balances, not the hash itself) in a fixed order, so an
// unchanged ledger reproduces byte-identical values run after run.
//
// The previous run's hashes are the trust anchor: every one of them must be
// reproduced, otherwise settled history was edited or reordered.

use crate::entry::{format_cents, Entry};
use crate::error::{ReconcileError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;

/// Field separator inside the canonical record (ASCII unit separator).
const SEPARATOR: &str = "\u{1f}";

// ============================================================================
// CHECKSUM SET
// ============================================================================

/// Set of hex digests over settled entries. Persisted as a JSON array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChecksumSet(BTreeSet<String>);

impl ChecksumSet {
    pub fn new() -> Self {
        ChecksumSet(BTreeSet::new())
    }

    pub fn insert(&mut self, hash: impl Into<String>) -> bool {
        self.0.insert(hash.into())
    }

    pub fn contains(&self, hash: &str) -> bool {
        self.0.contains(hash)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.0.iter()
    }

    /// Values of `self` that `other` does not contain.
    pub fn missing_from(&self, other: &ChecksumSet) -> Vec<String> {
        self.0.difference(&other.0).cloned().collect()
    }

    pub fn is_subset_of(&self, other: &ChecksumSet) -> bool {
        self.0.is_subset(&other.0)
    }
}

impl FromIterator<String> for ChecksumSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        ChecksumSet(iter.into_iter().collect())
    }
}

// ============================================================================
// HASHING
// ============================================================================

/// Canonical text of the hashed projection. Field order is part of the format.
pub fn canonical_record(entry: &Entry) -> String {
    let limit = entry.balance_limit.map(format_cents).unwrap_or_default();
    let date = entry.date.format("%Y-%m-%d").to_string();
    let amount = format_cents(entry.amount);
    let worth = format_cents(entry.worth);
    let fields: [&str; 11] = [
        entry.transaction_id.as_deref().unwrap_or_default(),
        &date,
        &entry.entity,
        &amount,
        &worth,
        entry.status.as_str(),
        &entry.account_name,
        &entry.account_mask,
        entry.account_type.as_str(),
        &entry.account_subtype,
        &limit,
    ];
    fields.join(SEPARATOR)
}

/// SHA-256 of the canonical record, lowercase hex.
pub fn hash_entry(entry: &Entry) -> String {
    let mut hasher = Sha256::new();
    hasher.update(canonical_record(entry).as_bytes());
    format!("{:x}", hasher.finalize())
}

pub struct IntegrityHasher {
    /// Accept a ledger whose settled history no longer matches (default: false)
    pub forced: bool,
}

impl IntegrityHasher {
    pub fn new() -> Self {
        IntegrityHasher { forced: false }
    }

    pub fn forced(forced: bool) -> Self {
        IntegrityHasher { forced }
    }

    /// Fresh hashes of every settled entry, in table order (`None` if unsettled).
    pub fn compute(&self, entries: &[Entry]) -> Vec<Option<String>> {
        entries
            .iter()
            .map(|e| e.is_settled().then(|| hash_entry(e)))
            .collect()
    }

    /// Replace the `hash` column with fresh values and return the new checksum.
    ///
    /// Unless forced, every hash already present in the table and every value
    /// of `trusted` must be among the fresh hashes.
    pub fn apply(&self, entries: &mut [Entry], trusted: Option<&ChecksumSet>) -> Result<ChecksumSet> {
        let fresh = self.compute(entries);
        let checksum: ChecksumSet = fresh.iter().flatten().cloned().collect();

        let mut expected: ChecksumSet = entries.iter().filter_map(|e| e.hash.clone()).collect();
        if let Some(trusted) = trusted {
            for hash in trusted.iter() {
                expected.insert(hash.clone());
            }
        }

        let missing = expected.missing_from(&checksum);
        if !missing.is_empty() {
            if self.forced {
                tracing::warn!(
                    missing = missing.len(),
                    "forced re-hash: accepting changed settled history"
                );
            } else {
                return Err(ReconcileError::Checksum { missing });
            }
        }

        for (entry, hash) in entries.iter_mut().zip(fresh) {
            entry.hash = hash;
        }

        tracing::info!(hashed = checksum.len(), "integrity hashes computed");
        Ok(checksum)
    }
}

impl Default for IntegrityHasher {
    fn default() -> Self {
        Self::new()
    }
}
