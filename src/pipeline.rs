// 🧮 Reconciler - runs the six stages over one merged entry table
//
//   normalize → sequence → fill balances → match transfers → hash → validate
//
// Batch, single-threaded, all-or-nothing: a failure in any stage returns an
// error and no partially reconciled table escapes.

use crate::accounts::AccountRegistry;
use crate::balances::{fill_balances, summarize, AccountSummary};
use crate::config::ReconcileConfig;
use crate::entry::{Entry, RawEntry};
use crate::error::Result;
use crate::hasher::{ChecksumSet, IntegrityHasher};
use crate::normalizer::normalize;
use crate::sequencer::sequence;
use crate::transfers::{MatchResult, TransferMatcher};
use crate::validator::SchemaValidator;
use serde::{Deserialize, Serialize};

// ============================================================================
// RECONCILED LEDGER
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciledLedger {
    /// Every entry, in canonical order, with all derived columns filled
    pub entries: Vec<Entry>,

    /// Registered account id per entry (aligned with `entries`)
    pub account_ids: Vec<Option<String>>,

    /// Transfer linkage per entry (aligned with `entries`)
    pub matches: Vec<MatchResult>,

    /// Hashes of every settled entry; the next run's trust anchor
    pub checksum: ChecksumSet,

    /// Per-account closing balances
    pub accounts: Vec<AccountSummary>,
}

impl ReconciledLedger {
    pub fn transfer_count(&self) -> usize {
        self.matches.iter().filter(|m| m.is_paired()).count() / 2
    }

    pub fn summary(&self) -> String {
        format!(
            "{} entries across {} accounts, {} transfers, {} settled hashes",
            self.entries.len(),
            self.accounts.len(),
            self.transfer_count(),
            self.checksum.len()
        )
    }
}

// ============================================================================
// RECONCILER
// ============================================================================

pub struct Reconciler {
    config: ReconcileConfig,
    registry: AccountRegistry,
}

impl Reconciler {
    pub fn new(config: ReconcileConfig) -> Self {
        Reconciler {
            config,
            registry: AccountRegistry::new(),
        }
    }

    pub fn with_registry(mut self, registry: AccountRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Run every stage. `trusted` is the checksum persisted by the previous run.
    pub fn run(&self, rows: &[RawEntry], trusted: Option<&ChecksumSet>) -> Result<ReconciledLedger> {
        let result = self.run_stages(rows, trusted);
        if let Err(err) = &result {
            tracing::error!(kind = err.kind(), "reconciliation aborted");
        }
        result
    }

    fn run_stages(&self, rows: &[RawEntry], trusted: Option<&ChecksumSet>) -> Result<ReconciledLedger> {
        tracing::info!(rows = rows.len(), "reconciliation started");

        let entries = normalize(rows)?;
        let mut entries = sequence(entries);
        fill_balances(&mut entries)?;

        let matches = TransferMatcher::from_config(&self.config).assign(&mut entries)?;
        let checksum = IntegrityHasher::forced(self.config.forced_hash).apply(&mut entries, trusted)?;
        SchemaValidator::from_config(&self.config).validate(&entries)?;

        let ledger = ReconciledLedger {
            account_ids: self.registry.resolve_all(&entries),
            accounts: summarize(&entries),
            matches,
            checksum,
            entries,
        };

        tracing::info!("{}", ledger.summary());
        Ok(ledger)
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(ReconcileConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::RegisteredAccount;
    use crate::entry::Origin;
    use crate::error::ReconcileError;

    fn row(file: &str, i: usize, date: &str, account: &str, kind: &str, entity: &str, amount: &str) -> RawEntry {
        RawEntry {
            date: Some(date.to_string()),
            entity: Some(entity.to_string()),
            amount: Some(amount.to_string()),
            status: Some("posted".to_string()),
            account_name: Some(account.to_string()),
            account_mask: Some("0001".to_string()),
            account_type: Some(kind.to_string()),
            account_subtype: Some("checking".to_string()),
            ..Default::default()
        }
        .with_origin(Origin::new(file, i))
    }

    #[test]
    fn test_run_links_transfer_and_registers_accounts() {
        let rows = vec![
            row("chk.csv", 0, "2024-01-01", "Checking", "depository", "Employer", "1000"),
            row("chk.csv", 1, "2024-01-02", "Checking", "depository", "Savings", "-250"),
            row("sav.csv", 0, "2024-01-02", "Savings", "depository", "Checking", "250"),
        ];
        let registry =
            AccountRegistry::from_accounts(&[RegisteredAccount::new("chk", &["Checking"], &[])]);

        let ledger = Reconciler::default().with_registry(registry).run(&rows, None).unwrap();

        assert_eq!(ledger.transfer_count(), 1);
        assert_eq!(ledger.checksum.len(), 3);
        assert_eq!(ledger.accounts.len(), 2);

        let ids: Vec<_> = ledger.account_ids.iter().map(|id| id.as_deref()).collect();
        let savings = ledger.entries.iter().position(|e| e.account_name == "Savings").unwrap();
        assert_eq!(ids[savings], None);
        assert_eq!(ids.iter().filter(|id| **id == Some("chk")).count(), 2);
    }

    #[test]
    fn test_schema_failure_aborts() {
        let rows = vec![row("chk.csv", 0, "not a date", "Checking", "depository", "X", "1")];
        assert!(matches!(Reconciler::default().run(&rows, None), Err(ReconcileError::Schema(_))));
    }
}
