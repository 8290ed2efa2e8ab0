// ⚠️ Error taxonomy for a reconciliation run
//
// Every stage validates eagerly and returns one of these. There is no retry:
// the pipeline is deterministic, so the only remedy is fixing the input.

use crate::entry::Origin;
use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;

// ============================================================================
// SCHEMA VIOLATION
// ============================================================================

/// One offending cell (or row, when `origin` is known but the problem spans
/// the whole row).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    pub origin: Origin,
    pub column: String,
    pub message: String,
}

impl SchemaViolation {
    pub fn new(origin: &Origin, column: &str, message: impl Into<String>) -> Self {
        SchemaViolation {
            origin: origin.clone(),
            column: column.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.origin, self.column, self.message)
    }
}

fn list_violations(violations: &[SchemaViolation]) -> String {
    violations
        .iter()
        .map(|v| format!("  {}", v))
        .collect::<Vec<_>>()
        .join("\n")
}

// ============================================================================
// RECONCILE ERROR
// ============================================================================

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Malformed, missing or wrongly-typed columns (input or output).
    #[error("schema violations ({} total):\n{}", .0.len(), list_violations(.0))]
    Schema(Vec<SchemaViolation>),

    /// A declared balance cannot be explained by one constant offset.
    #[error("account '{account}' has conflicting {column} offsets: {offsets:?}")]
    Reconciliation {
        account: String,
        column: &'static str,
        offsets: Vec<Decimal>,
    },

    /// A transaction id is not 1:1 with a coherent entry group.
    #[error("transaction id '{transaction_id}' {reason}")]
    IdPattern {
        transaction_id: String,
        reason: String,
    },

    /// Previously trusted hashes are no longer reproduced by the ledger.
    #[error("integrity check failed: {} trusted hash(es) not reproduced: {missing:?}", .missing.len())]
    Checksum { missing: Vec<String> },
}

impl ReconcileError {
    pub fn schema(origin: &Origin, column: &str, message: impl Into<String>) -> Self {
        ReconcileError::Schema(vec![SchemaViolation::new(origin, column, message)])
    }

    /// Short machine-friendly tag, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ReconcileError::Schema(_) => "schema",
            ReconcileError::Reconciliation { .. } => "reconciliation",
            ReconcileError::IdPattern { .. } => "id_pattern",
            ReconcileError::Checksum { .. } => "checksum",
        }
    }
}

pub type Result<T> = std::result::Result<T, ReconcileError>;
