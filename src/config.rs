// ⚙️ Run configuration - explicit structs loaded from portfolio.json

use crate::accounts::RegisteredAccount;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Policy knobs for one reconciliation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Two legs of a transfer must be strictly less than this many days apart (default: 7)
    pub transfer_window_days: i64,

    /// When exactly one leg of a new pair is already hashed, reuse its id (default: true)
    pub prefer_hashed_id: bool,

    /// Skip the checksum cross-check; set when settled history was edited on purpose
    pub forced_hash: bool,
}

impl ReconcileConfig {
    pub fn new() -> Self {
        ReconcileConfig {
            transfer_window_days: 7,
            prefer_hashed_id: true,
            forced_hash: false,
        }
    }

    pub fn with_window(days: i64) -> Self {
        ReconcileConfig {
            transfer_window_days: days,
            ..Self::new()
        }
    }

    pub fn forced(mut self) -> Self {
        self.forced_hash = true;
        self
    }
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Contents of a portfolio's `portfolio.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortfolioConfig {
    pub accounts: Vec<RegisteredAccount>,
    pub reconcile: ReconcileConfig,
}

impl PortfolioConfig {
    pub const FILE_NAME: &'static str = "portfolio.json";

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("Failed to parse portfolio config")
    }

    /// Read `<dir>/portfolio.json`; a missing file means defaults.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(Self::FILE_NAME);
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("Invalid config in {}", path.display()))
    }
}
