// 📐 Schema Validator - final invariants of the reconciled table
//
// Settled entries carry balances and a hash; entries with a known limit carry
// an available balance; every entry has a transaction id; the table is in
// canonical order; multi-entry transactions net to zero inside the window.

use crate::config::ReconcileConfig;
use crate::entry::Entry;
use crate::error::{ReconcileError, Result, SchemaViolation};
use crate::sequencer::canonical_order;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::cmp::Ordering;
use std::collections::BTreeMap;

pub struct SchemaValidator {
    /// Widest allowed date span inside one transaction (exclusive, in days)
    pub window_days: i64,
}

impl SchemaValidator {
    pub fn new() -> Self {
        Self::from_config(&ReconcileConfig::default())
    }

    pub fn from_config(config: &ReconcileConfig) -> Self {
        SchemaValidator {
            window_days: config.transfer_window_days,
        }
    }

    /// Column-level checks for one output row.
    pub fn validate_entry(&self, entry: &Entry) -> Vec<SchemaViolation> {
        let mut violations = Vec::new();
        let origin = &entry.origin;

        if entry.transaction_id.is_none() {
            violations.push(SchemaViolation::new(origin, "transaction_id", "missing after matching"));
        }

        if entry.is_settled() {
            if entry.balance_current.is_none() {
                violations.push(SchemaViolation::new(
                    origin,
                    "balance_current",
                    "required for settled entries",
                ));
            }
            if entry.hash.is_none() {
                violations.push(SchemaViolation::new(origin, "hash", "required for settled entries"));
            }
        } else if entry.hash.is_some() {
            violations.push(SchemaViolation::new(origin, "hash", "unsettled entries are not hashed"));
        }

        if entry.balance_limit.is_some() && entry.balance_available.is_none() {
            violations.push(SchemaViolation::new(
                origin,
                "balance_available",
                "required when balance_limit is known",
            ));
        }

        violations
    }

    /// Every row valid and rows in canonical order.
    pub fn validate(&self, entries: &[Entry]) -> Result<()> {
        let mut violations: Vec<SchemaViolation> =
            entries.iter().flat_map(|e| self.validate_entry(e)).collect();

        for pair in entries.windows(2) {
            if canonical_order(&pair[0], &pair[1]) == Ordering::Greater {
                violations.push(SchemaViolation::new(
                    &pair[1].origin,
                    "date",
                    format!("out of order after {}", pair[0].origin),
                ));
            }
        }

        if !violations.is_empty() {
            return Err(ReconcileError::Schema(violations));
        }

        self.check_transactions(entries)
    }

    /// Every transaction with two or more entries nets to zero worth and
    /// spans less than the window.
    pub fn check_transactions(&self, entries: &[Entry]) -> Result<()> {
        let mut groups: BTreeMap<&str, Vec<&Entry>> = BTreeMap::new();
        for entry in entries {
            if let Some(id) = entry.transaction_id.as_deref() {
                groups.entry(id).or_default().push(entry);
            }
        }

        for (id, members) in groups.into_iter().filter(|(_, m)| m.len() > 1) {
            let total = members
                .iter()
                .try_fold(Decimal::ZERO, |acc, e| acc.checked_add(e.worth));
            match total {
                Some(total) if total.is_zero() => {}
                Some(total) => {
                    return Err(ReconcileError::IdPattern {
                        transaction_id: id.to_string(),
                        reason: format!("has non-zero worth sum {}", total),
                    });
                }
                None => {
                    return Err(ReconcileError::IdPattern {
                        transaction_id: id.to_string(),
                        reason: "has a worth sum outside decimal range".to_string(),
                    });
                }
            }

            let dates: Vec<NaiveDate> = members.iter().map(|e| e.date).collect();
            if let (Some(first), Some(last)) = (dates.iter().min(), dates.iter().max()) {
                let span = (*last - *first).num_days();
                if span >= self.window_days {
                    return Err(ReconcileError::IdPattern {
                        transaction_id: id.to_string(),
                        reason: format!("spans {} days (limit {})", span, self.window_days),
                    });
                }
            }
        }

        Ok(())
    }
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self::new()
    }
}
