// 🧾 Ledger entries - raw CSV rows and their typed, reconciled form
//
// A RawEntry is exactly what a source file says (all text).
// An Entry is the typed row the pipeline works on; every derived column
// (worth, balances, transaction_id, hash) lives on it and is recomputed
// from scratch on every run.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

// ============================================================================
// ORIGIN (immutable row identity)
// ============================================================================

/// Where an entry came from: `(file_path, row_index)`.
/// `row` is the 0-based data row inside its file (header excluded).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Origin {
    pub file: PathBuf,
    pub row: usize,
}

impl Origin {
    pub fn new(file: impl AsRef<Path>, row: usize) -> Self {
        Origin {
            file: file.as_ref().to_path_buf(),
            row,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.row)
    }
}

// ============================================================================
// RAW ENTRY (one CSV line, untyped)
// ============================================================================

/// Source-file row before coercion. Missing columns and empty cells are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawEntry {
    #[serde(skip)]
    pub origin: Origin,

    pub transaction_id: Option<String>,
    pub date: Option<String>,
    pub description: Option<String>,
    pub entity: Option<String>,
    pub category: Option<String>,
    pub amount: Option<String>,
    pub rate: Option<String>,
    pub status: Option<String>,
    pub account_name: Option<String>,
    pub account_mask: Option<String>,
    pub account_type: Option<String>,
    pub account_subtype: Option<String>,
    pub balance_current: Option<String>,
    pub balance_available: Option<String>,
    pub balance_limit: Option<String>,
    pub hash: Option<String>,
}

impl Default for Origin {
    fn default() -> Self {
        Origin::new("", 0)
    }
}

impl RawEntry {
    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }
}

// ============================================================================
// STATUS & ACCOUNT TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// Settled by the institution
    Posted,
    /// Provisional, may still change
    Pending,
}

impl EntryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryStatus::Posted => "posted",
            EntryStatus::Pending => "pending",
        }
    }

    pub fn is_posted(&self) -> bool {
        matches!(self, EntryStatus::Posted)
    }
}

impl FromStr for EntryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "posted" => Ok(EntryStatus::Posted),
            "pending" => Ok(EntryStatus::Pending),
            other => Err(format!("unknown status '{}' (expected posted or pending)", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountType {
    /// Checking, savings: money the owner holds
    Depository,

    /// Credit line; amounts are drawn against a limit
    Credit,

    /// Loan; amounts increase what is owed
    Loan,

    /// Anything else the institution reports, kept verbatim (lowercased)
    Other(String),
}

impl AccountType {
    pub fn as_str(&self) -> &str {
        match self {
            AccountType::Depository => "depository",
            AccountType::Credit => "credit",
            AccountType::Loan => "loan",
            AccountType::Other(name) => name,
        }
    }

    /// Money held (worth follows amount) vs. money owed (worth opposes amount).
    pub fn is_depository(&self) -> bool {
        matches!(self, AccountType::Depository)
    }

    /// Signed economic effect of `amount` on net worth.
    pub fn worth_of(&self, amount: Decimal) -> Decimal {
        if self.is_depository() {
            amount
        } else {
            -amount
        }
    }
}

impl FromStr for AccountType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        match lower.as_str() {
            "" => Err("account type is empty".to_string()),
            "depository" => Ok(AccountType::Depository),
            "credit" => Ok(AccountType::Credit),
            "loan" => Ok(AccountType::Loan),
            _ => Ok(AccountType::Other(lower)),
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// ENTRY (typed row)
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    // ========================================================================
    // IDENTITY
    // ========================================================================
    pub origin: Origin,

    // ========================================================================
    // AS ENTERED
    // ========================================================================
    pub date: NaiveDate,
    pub entity: String,
    pub description: Option<String>,
    pub category: Option<String>,

    /// Amount in the account's own sign convention
    pub amount: Decimal,

    /// Precomputed conversion rate into the portfolio currency (1 if absent)
    pub rate: Decimal,

    pub status: EntryStatus,
    pub account_name: String,
    pub account_mask: String,
    pub account_type: AccountType,
    pub account_subtype: String,
    pub balance_limit: Option<Decimal>,

    // ========================================================================
    // DERIVED (user values are read here, then replaced by computed ones)
    // ========================================================================
    pub worth: Decimal,
    pub balance_current: Option<Decimal>,
    pub balance_available: Option<Decimal>,
    pub balance_total: Option<Decimal>,
    pub transaction_id: Option<String>,
    pub hash: Option<String>,
}

impl Entry {
    /// Settled entries are the ones that get hashed and must carry balances.
    pub fn is_settled(&self) -> bool {
        self.status.is_posted()
    }

    /// Does `entity` name one of the portfolio's own accounts (other than this one)?
    pub fn is_transfer_candidate(&self, account_names: &std::collections::HashSet<&str>) -> bool {
        self.entity != self.account_name && account_names.contains(self.entity.as_str())
    }
}

// ============================================================================
// MONEY HELPERS
// ============================================================================

/// Round to cents and drop the sign of zero.
pub fn round_cents(value: Decimal) -> Decimal {
    let rounded = value.round_dp(2);
    if rounded.is_zero() {
        Decimal::ZERO
    } else {
        rounded
    }
}

/// Fixed 2-decimal text used for output files and hashing.
pub fn format_cents(value: Decimal) -> String {
    format!("{:.2}", round_cents(value))
}
