// Ledger Reconcile - Core Library
// Turns a portfolio of CSV entry files into one balance-correct,
// uniquely identified, integrity-hashed transaction log.

pub mod accounts;   // Account registry: (name, mask) -> stable id
pub mod balances;   // Balance Filler
pub mod config;     // Run configuration (portfolio.json)
pub mod entry;      // Raw and typed entries
pub mod error;      // Error taxonomy
pub mod hasher;     // Integrity Hasher + checksum set
pub mod io;         // Portfolio files
pub mod normalizer; // Normalizer
pub mod pipeline;   // Reconciler (all stages)
pub mod sequencer;  // Sequencer
pub mod transfers;  // Transfer Matcher
pub mod validator;  // Schema Validator

#[cfg(test)]
pub(crate) mod testutil;

// Re-export commonly used types
pub use accounts::{AccountRegistry, RegisteredAccount};
pub use balances::{fill_balances, summarize, AccountSummary};
pub use config::{PortfolioConfig, ReconcileConfig};
pub use entry::{round_cents, AccountType, Entry, EntryStatus, Origin, RawEntry};
pub use error::{ReconcileError, Result, SchemaViolation};
pub use hasher::{hash_entry, ChecksumSet, IntegrityHasher};
pub use io::{
    load_portfolio, read_checksum, write_checksum, write_partitioned, CHECKSUM_FILE,
};
pub use normalizer::normalize;
pub use pipeline::{ReconciledLedger, Reconciler};
pub use sequencer::sequence;
pub use transfers::{MatchResult, TransferMatcher, TransferPair};
pub use validator::SchemaValidator;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
