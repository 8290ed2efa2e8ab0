// 🔁 Transfer Matcher - link the two legs of money moving between own accounts
//
// A leg is an entry whose `entity` is another account of the portfolio.
// Two legs already sharing an id that still form a valid pair stay linked.
// The remaining legs are bucketed by (|worth|, from, to); inside a bucket,
// legs are paired greedily in table order: sender with receiver, opposite
// worths, less than `transfer_window_days` apart. Each entry joins at most one pair.
//
// Paired legs share one transaction id. Every other entry keeps the id it
// already carries, or gets a fresh one.

use crate::config::ReconcileConfig;
use crate::entry::Entry;
use crate::error::{ReconcileError, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

// ============================================================================
// MATCH RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchResult {
    /// One leg of a transfer; `partner` is the other leg's table index
    Paired { id: String, partner: usize },

    /// A transaction on its own
    Unpaired { id: String },
}

impl MatchResult {
    pub fn id(&self) -> &str {
        match self {
            MatchResult::Paired { id, .. } | MatchResult::Unpaired { id } => id,
        }
    }

    pub fn partner(&self) -> Option<usize> {
        match self {
            MatchResult::Paired { partner, .. } => Some(*partner),
            MatchResult::Unpaired { .. } => None,
        }
    }

    pub fn is_paired(&self) -> bool {
        matches!(self, MatchResult::Paired { .. })
    }
}

/// Two table indices, `first < second`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferPair {
    pub first: usize,
    pub second: usize,
}

// ============================================================================
// LEG (transfer candidate)
// ============================================================================

#[derive(Debug, Clone)]
struct Leg<'a> {
    index: usize,
    date: NaiveDate,
    worth: Decimal,
    from: &'a str,
    to: &'a str,
    /// Money leaves this account
    is_source: bool,
}

impl<'a> Leg<'a> {
    fn new(index: usize, entry: &'a Entry) -> Self {
        let is_source = entry.worth < Decimal::ZERO;
        let (from, to) = if is_source {
            (entry.account_name.as_str(), entry.entity.as_str())
        } else {
            (entry.entity.as_str(), entry.account_name.as_str())
        };
        Leg {
            index,
            date: entry.date,
            worth: entry.worth,
            from,
            to,
            is_source,
        }
    }

    fn key(&self) -> (Decimal, &'a str, &'a str) {
        (self.worth.abs(), self.from, self.to)
    }
}

// ============================================================================
// TRANSFER MATCHER
// ============================================================================

pub struct TransferMatcher {
    /// Legs must be strictly closer than this many days (default: 7)
    pub window_days: i64,

    /// Reuse the id of the only already-hashed leg of a pair (default: true)
    pub prefer_hashed_id: bool,
}

impl TransferMatcher {
    pub fn new() -> Self {
        Self::from_config(&ReconcileConfig::default())
    }

    pub fn from_config(config: &ReconcileConfig) -> Self {
        TransferMatcher {
            window_days: config.transfer_window_days,
            prefer_hashed_id: config.prefer_hashed_id,
        }
    }

    /// Find transfer pairs. `entries` must be in canonical order; table index
    /// decides precedence (first found wins).
    ///
    /// Two legs that already share a transaction id and still form a valid
    /// pair are kept together before any greedy matching happens.
    pub fn find_pairs(&self, entries: &[Entry]) -> Vec<TransferPair> {
        let account_names: HashSet<&str> =
            entries.iter().map(|e| e.account_name.as_str()).collect();

        let legs: Vec<Leg> = entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| entry.is_transfer_candidate(&account_names))
            .map(|(index, entry)| Leg::new(index, entry))
            .collect();

        let mut consumed: HashSet<usize> = HashSet::new();
        let mut pairs = self.linked_pairs(entries, &legs);
        for pair in &pairs {
            consumed.insert(pair.first);
            consumed.insert(pair.second);
        }
        let linked = pairs.len();

        // Bucket the rest; BTreeMap keeps bucket order reproducible
        let mut buckets: BTreeMap<(Decimal, &str, &str), Vec<&Leg>> = BTreeMap::new();
        for leg in legs.iter().filter(|leg| !consumed.contains(&leg.index)) {
            buckets.entry(leg.key()).or_default().push(leg);
        }

        for bucket in buckets.values() {
            for (a, x) in bucket.iter().enumerate() {
                if consumed.contains(&x.index) {
                    continue;
                }
                let partner = bucket[a + 1..]
                    .iter()
                    .find(|y| !consumed.contains(&y.index) && self.is_pair(x, y));
                if let Some(y) = partner {
                    consumed.insert(x.index);
                    consumed.insert(y.index);
                    pairs.push(TransferPair {
                        first: x.index,
                        second: y.index,
                    });
                }
            }
        }

        pairs.sort_by_key(|p| p.first);
        tracing::debug!(pairs = pairs.len(), linked, "transfer pairs found");
        pairs
    }

    /// Pairs the input already links: exactly two legs under one id, same
    /// bucket, and still a valid pair.
    fn linked_pairs(&self, entries: &[Entry], legs: &[Leg]) -> Vec<TransferPair> {
        let mut by_id: BTreeMap<&str, Vec<&Leg>> = BTreeMap::new();
        for leg in legs {
            if let Some(id) = entries[leg.index].transaction_id.as_deref() {
                by_id.entry(id).or_default().push(leg);
            }
        }

        by_id
            .values()
            .filter_map(|group| match group.as_slice() {
                [x, y] if x.key() == y.key() && self.is_pair(x, y) => Some(TransferPair {
                    first: x.index.min(y.index),
                    second: x.index.max(y.index),
                }),
                _ => None,
            })
            .collect()
    }

    fn is_pair(&self, x: &Leg, y: &Leg) -> bool {
        x.index != y.index
            && x.is_source != y.is_source
            && (y.date - x.date).num_days().abs() < self.window_days
            && x.worth + y.worth == Decimal::ZERO
    }

    /// Pick the shared id for a freshly found pair.
    fn pair_id(&self, x: &Entry, y: &Entry) -> String {
        match (&x.transaction_id, &y.transaction_id) {
            // Linked on an earlier run
            (Some(a), Some(b)) if a == b => return a.clone(),
            _ => {}
        }

        if self.prefer_hashed_id {
            match (x.hash.is_some(), y.hash.is_some()) {
                (true, false) => {
                    if let Some(id) = &x.transaction_id {
                        return id.clone();
                    }
                }
                (false, true) => {
                    if let Some(id) = &y.transaction_id {
                        return id.clone();
                    }
                }
                _ => {}
            }
        }

        match (&x.transaction_id, &y.transaction_id) {
            (Some(id), None) | (None, Some(id)) => id.clone(),
            _ => mint_id(),
        }
    }

    /// Assign `transaction_id` to every entry and return the per-entry result.
    pub fn assign(&self, entries: &mut [Entry]) -> Result<Vec<MatchResult>> {
        let pairs = self.find_pairs(entries);
        let mut results: Vec<Option<MatchResult>> = vec![None; entries.len()];

        for pair in &pairs {
            let id = self.pair_id(&entries[pair.first], &entries[pair.second]);
            entries[pair.first].transaction_id = Some(id.clone());
            entries[pair.second].transaction_id = Some(id.clone());
            results[pair.first] = Some(MatchResult::Paired {
                id: id.clone(),
                partner: pair.second,
            });
            results[pair.second] = Some(MatchResult::Paired {
                id,
                partner: pair.first,
            });
        }

        let results: Vec<MatchResult> = results
            .into_iter()
            .zip(entries.iter_mut())
            .map(|(result, entry)| {
                result.unwrap_or_else(|| {
                    let id = entry.transaction_id.get_or_insert_with(mint_id).clone();
                    MatchResult::Unpaired { id }
                })
            })
            .collect();

        verify_id_pattern(entries, &results)?;

        tracing::info!(
            entries = entries.len(),
            transfers = pairs.len(),
            "transaction ids assigned"
        );
        Ok(results)
    }
}

impl Default for TransferMatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn mint_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// ============================================================================
// ID PATTERN CHECK
// ============================================================================

/// Every id must name exactly one coherent group: a single unpaired entry,
/// or exactly the two legs of one pair.
pub fn verify_id_pattern(entries: &[Entry], results: &[MatchResult]) -> Result<()> {
    let mut members: HashMap<&str, Vec<usize>> = HashMap::new();
    for (index, result) in results.iter().enumerate() {
        members.entry(result.id()).or_default().push(index);
    }

    let mut ids: Vec<_> = members.into_iter().collect();
    ids.sort();

    for (id, group) in ids {
        let coherent = match group.as_slice() {
            [single] => !results[*single].is_paired(),
            [a, b] => results[*a].partner() == Some(*b) && results[*b].partner() == Some(*a),
            _ => false,
        };

        if !coherent {
            let origins: Vec<String> = group
                .iter()
                .map(|&i| entries[i].origin.to_string())
                .collect();
            return Err(ReconcileError::IdPattern {
                transaction_id: id.to_string(),
                reason: format!(
                    "does not match one transfer pair or one entry; shared by [{}]",
                    origins.join(", ")
                ),
            });
        }
    }

    Ok(())
}
