// ⚖️ Balance Filler - derive running balances per account and prove
// user-declared balances consistent with them
//
// For every account, in canonical order:
//   balance_current   = offset + Σ amount over posted entries so far
//   balance_available = offset + Σ amount              (depository)
//                     = limit − (offset + Σ amount)    (credit-type with a limit)
//   balance_total     = offset + Σ amount
//
// `offset` is the account's opening balance, inferred from whatever
// balance_current values the user wrote down. All of them must imply the
// SAME offset (to the cent), otherwise the ledger is wrong somewhere.

use crate::entry::{round_cents, AccountType, Entry};
use crate::error::{ReconcileError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// ACCOUNT SUMMARY
// ============================================================================

/// Balances of an account after its last entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub name: String,
    pub account_type: AccountType,
    pub entries: usize,
    pub opening_balance: Decimal,
    pub balance_current: Decimal,
    pub balance_available: Option<Decimal>,
    pub balance_total: Decimal,
}

impl AccountSummary {
    pub fn summary(&self) -> String {
        let available = self
            .balance_available
            .map(|a| format!("{:.2}", a))
            .unwrap_or_else(|| "-".to_string());
        format!(
            "{} ({}): {} entries, current {:.2}, available {}, total {:.2}",
            self.name, self.account_type, self.entries, self.balance_current, available, self.balance_total
        )
    }
}

// ============================================================================
// GROUPING
// ============================================================================

/// Row indices per account, each list in canonical (table) order.
pub fn group_by_account(entries: &[Entry]) -> BTreeMap<String, Vec<usize>> {
    let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (i, entry) in entries.iter().enumerate() {
        groups.entry(entry.account_name.clone()).or_default().push(i);
    }
    groups
}

/// Reduce per-row offsets to the single offset an account may have.
/// No declared values means no correction.
fn consistent_offset(
    account: &str,
    column: &'static str,
    offsets: impl Iterator<Item = Decimal>,
) -> Result<Decimal> {
    let mut distinct: Vec<Decimal> = Vec::new();
    for offset in offsets.map(round_cents) {
        if !distinct.contains(&offset) {
            distinct.push(offset);
        }
    }

    match distinct.as_slice() {
        [] => Ok(Decimal::ZERO),
        [single] => Ok(*single),
        _ => Err(ReconcileError::Reconciliation {
            account: account.to_string(),
            column,
            offsets: distinct,
        }),
    }
}

// ============================================================================
// CURRENT BALANCE
// ============================================================================

/// `a + b`, or a schema violation on the row that overflowed.
fn add_at(entry: &Entry, column: &str, a: Decimal, b: Decimal) -> Result<Decimal> {
    a.checked_add(b)
        .ok_or_else(|| ReconcileError::schema(&entry.origin, column, "balance overflows decimal range"))
}

/// Prefix sum of posted amounts; pending rows carry the last posted value.
/// Returns the accepted offset (the account's opening balance).
pub fn fill_current_balances(account: &str, entries: &mut [Entry], rows: &[usize]) -> Result<Decimal> {
    let mut running = Decimal::ZERO;
    let mut computed: Vec<Decimal> = Vec::with_capacity(rows.len());
    for &i in rows {
        let entry = &entries[i];
        if entry.status.is_posted() {
            running = add_at(entry, "balance_current", running, entry.amount)?;
        }
        computed.push(running);
    }

    let mut implied = Vec::new();
    for (&i, c) in rows.iter().zip(&computed) {
        if let Some(declared) = entries[i].balance_current {
            implied.push(add_at(&entries[i], "balance_current", declared, -*c)?);
        }
    }
    let offset = consistent_offset(account, "balance_current", implied.into_iter())?;

    for (&i, c) in rows.iter().zip(computed) {
        let shifted = add_at(&entries[i], "balance_current", c, offset)?;
        entries[i].balance_current = Some(round_cents(shifted));
    }

    tracing::debug!(account, %offset, "filled current balances");
    Ok(offset)
}

// ============================================================================
// AVAILABLE & TOTAL BALANCE
// ============================================================================

/// Prefix sum of every amount (pending included), shifted by `opening`, the
/// offset accepted for current balance. Declared available values must match
/// the derived ones to the cent; no second offset is inferred.
pub fn fill_available_balances(
    account: &str,
    entries: &mut [Entry],
    rows: &[usize],
    opening: Decimal,
) -> Result<()> {
    let mut cumulative = Decimal::ZERO;

    for &i in rows {
        let entry = &entries[i];
        cumulative = add_at(entry, "balance_total", cumulative, entry.amount)?;
        let held = add_at(entry, "balance_total", cumulative, opening)?;

        let available = match (&entry.account_type, entry.balance_limit) {
            (AccountType::Depository, _) => Some(held),
            (_, Some(limit)) => Some(add_at(entry, "balance_available", limit, -held)?),
            (_, None) => None,
        }
        .map(round_cents);

        match (entry.balance_available.map(round_cents), available) {
            (Some(_), None) => {
                return Err(ReconcileError::schema(
                    &entry.origin,
                    "balance_available",
                    format!(
                        "declared for {} account '{}' without a balance_limit to derive it from",
                        entry.account_type, account
                    ),
                ));
            }
            (Some(declared), Some(derived)) if declared != derived => {
                let drift = add_at(entry, "balance_available", declared, -derived)?;
                return Err(ReconcileError::Reconciliation {
                    account: account.to_string(),
                    column: "balance_available",
                    offsets: vec![Decimal::ZERO, drift],
                });
            }
            _ => {}
        }

        let entry = &mut entries[i];
        entry.balance_total = Some(round_cents(held));
        entry.balance_available = available;
    }

    Ok(())
}

/// Fill current, available and total balances for every account.
/// Either every account reconciles or the whole call fails.
pub fn fill_balances(entries: &mut [Entry]) -> Result<()> {
    let groups = group_by_account(entries);

    for (account, rows) in &groups {
        let opening = fill_current_balances(account, entries, rows)?;
        fill_available_balances(account, entries, rows, opening)?;
    }

    tracing::info!(accounts = groups.len(), "balances reconciled");
    Ok(())
}

/// One summary per account, in account-name order. Expects filled balances.
pub fn summarize(entries: &[Entry]) -> Vec<AccountSummary> {
    group_by_account(entries)
        .into_iter()
        .filter_map(|(name, rows)| {
            let first = &entries[*rows.first()?];
            let last = &entries[*rows.last()?];
            let first_posted = if first.status.is_posted() { first.amount } else { Decimal::ZERO };
            Some(AccountSummary {
                opening_balance: round_cents(first.balance_current? - first_posted),
                account_type: last.account_type.clone(),
                entries: rows.len(),
                balance_current: last.balance_current?,
                balance_available: last.balance_available,
                balance_total: last.balance_total?,
                name,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::EntryStatus;
    use crate::testutil::{entry, typed};
    use rust_decimal_macros::dec;

    fn currents(entries: &[Entry]) -> Vec<Decimal> {
        entries.iter().filter_map(|e| e.balance_current).collect()
    }

    #[test]
    fn test_current_balance_prefix_sum() {
        let mut entries = vec![
            entry(0, "2024-01-01", "Checking", "Employer", dec!(1000)),
            entry(1, "2024-01-02", "Checking", "Grocer", dec!(-45.10)),
            entry(2, "2024-01-03", "Checking", "Cafe", dec!(-4.90)),
        ];

        fill_balances(&mut entries).unwrap();
        assert_eq!(currents(&entries), vec![dec!(1000), dec!(954.90), dec!(950.00)]);
        assert_eq!(entries[2].balance_available, Some(dec!(950.00)));
        assert_eq!(entries[2].balance_total, Some(dec!(950.00)));
    }

    #[test]
    fn test_pending_carries_last_posted_value() {
        let mut entries = vec![
            entry(0, "2024-01-01", "Checking", "Pending first", dec!(-10)),
            entry(1, "2024-01-02", "Checking", "Employer", dec!(100)),
            entry(2, "2024-01-03", "Checking", "Pending later", dec!(-20)),
        ];
        entries[0].status = EntryStatus::Pending;
        entries[2].status = EntryStatus::Pending;

        fill_balances(&mut entries).unwrap();
        assert_eq!(currents(&entries), vec![dec!(0), dec!(100), dec!(100)]);
        // available counts pending holds
        assert_eq!(entries[2].balance_available, Some(dec!(70)));
    }

    #[test]
    fn test_declared_balance_sets_opening_offset() {
        let mut entries = vec![
            entry(0, "2024-01-01", "Savings", "Interest", dec!(5)),
            entry(1, "2024-01-02", "Savings", "Deposit", dec!(100)),
        ];
        entries[1].balance_current = Some(dec!(605));

        fill_balances(&mut entries).unwrap();
        assert_eq!(currents(&entries), vec![dec!(505), dec!(605)]);
        assert_eq!(entries[0].balance_available, Some(dec!(505)));

        let summary = &summarize(&entries)[0];
        assert_eq!(summary.opening_balance, dec!(500));
        assert_eq!(summary.balance_current, dec!(605));
    }

    #[test]
    fn test_conflicting_offsets_rejected() {
        let mut entries = vec![
            entry(0, "2024-01-01", "Checking", "A", dec!(10)),
            entry(1, "2024-01-02", "Checking", "B", dec!(10)),
        ];
        entries[0].balance_current = Some(dec!(15)); // offset +5
        entries[1].balance_current = Some(dec!(27)); // offset +7

        match fill_balances(&mut entries).unwrap_err() {
            ReconcileError::Reconciliation { account, column, offsets } => {
                assert_eq!(account, "Checking");
                assert_eq!(column, "balance_current");
                assert_eq!(offsets, vec![dec!(5), dec!(7)]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_offsets_compared_at_cents() {
        let mut entries = vec![
            entry(0, "2024-01-01", "Checking", "A", dec!(10.001)),
            entry(1, "2024-01-02", "Checking", "B", dec!(10)),
        ];
        entries[0].balance_current = Some(dec!(10.00));
        entries[1].balance_current = Some(dec!(20.00));

        assert!(fill_balances(&mut entries).is_ok());
    }

    #[test]
    fn test_credit_available_uses_limit() {
        let mut entries = vec![
            typed(0, "2024-01-01", "Card", AccountType::Credit, "Store", dec!(300)),
            typed(1, "2024-01-05", "Card", AccountType::Credit, "Checking", dec!(-100)),
        ];
        for e in entries.iter_mut() {
            e.balance_limit = Some(dec!(1000));
        }

        fill_balances(&mut entries).unwrap();
        assert_eq!(currents(&entries), vec![dec!(300), dec!(200)]);
        assert_eq!(entries[0].balance_available, Some(dec!(700)));
        assert_eq!(entries[1].balance_available, Some(dec!(800)));
    }

    #[test]
    fn test_credit_without_limit_has_no_available() {
        let mut entries = vec![typed(0, "2024-01-01", "Loan", AccountType::Loan, "Bank", dec!(50))];
        fill_balances(&mut entries).unwrap();
        assert_eq!(entries[0].balance_available, None);
        assert_eq!(entries[0].balance_current, Some(dec!(50)));
    }

    #[test]
    fn test_declared_available_cross_checked() {
        let mut entries = vec![
            typed(0, "2024-01-01", "Card", AccountType::Credit, "Store", dec!(300)),
            typed(1, "2024-01-02", "Card", AccountType::Credit, "Store", dec!(100)),
        ];
        for e in entries.iter_mut() {
            e.balance_limit = Some(dec!(1000));
        }
        entries[0].balance_available = Some(dec!(700));
        entries[1].balance_available = Some(dec!(650)); // should be 600

        assert!(matches!(
            fill_balances(&mut entries),
            Err(ReconcileError::Reconciliation { column: "balance_available", .. })
        ));
    }

    #[test]
    fn test_depository_available_must_follow_current_offset() {
        let mut entries = vec![entry(0, "2024-01-01", "Checking", "Employer", dec!(100))];
        entries[0].balance_available = Some(dec!(600));

        match fill_balances(&mut entries).unwrap_err() {
            ReconcileError::Reconciliation { column, offsets, .. } => {
                assert_eq!(column, "balance_available");
                assert_eq!(offsets, vec![dec!(0), dec!(500)]);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_depository_available_matches_with_opening_balance() {
        let mut entries = vec![entry(0, "2024-01-01", "Checking", "Employer", dec!(100))];
        entries[0].balance_current = Some(dec!(600));
        entries[0].balance_available = Some(dec!(600.00));

        fill_balances(&mut entries).unwrap();
        assert_eq!(entries[0].balance_available, Some(dec!(600)));
        assert_eq!(entries[0].balance_total, Some(dec!(600)));
    }

    #[test]
    fn test_overflow_is_schema_error_on_row() {
        let mut entries = vec![
            entry(0, "2024-01-01", "Checking", "A", dec!(50000000000000000000000000000)),
            entry(1, "2024-01-02", "Checking", "B", dec!(50000000000000000000000000000)),
        ];

        match fill_balances(&mut entries).unwrap_err() {
            ReconcileError::Schema(violations) => {
                assert_eq!(violations[0].origin.row, 1);
                assert!(violations[0].message.contains("overflow"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_available_without_limit_is_schema_error() {
        let mut entries = vec![typed(0, "2024-01-01", "Card", AccountType::Credit, "Store", dec!(1))];
        entries[0].balance_available = Some(dec!(10));
        assert!(matches!(fill_balances(&mut entries), Err(ReconcileError::Schema(_))));
    }

    #[test]
    fn test_accounts_are_independent() {
        let mut entries = vec![
            entry(0, "2024-01-01", "A", "X", dec!(10)),
            entry(1, "2024-01-01", "B", "Y", dec!(20)),
            entry(2, "2024-01-02", "A", "X", dec!(1)),
        ];
        fill_balances(&mut entries).unwrap();
        assert_eq!(currents(&entries), vec![dec!(10), dec!(20), dec!(11)]);
        assert_eq!(summarize(&entries).len(), 2);
    }
}
