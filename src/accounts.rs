// 💳 Account Registry - maps (account_name, account_mask) to a stable account id
//
// "Account name is a VALUE (can change), account id is IDENTITY (never changes)"
//
// An account may be known under several names (renames, nicknames) and
// several masks (card reissues). Every name x mask pair resolves to one id.
// The registry is read-only for the reconciliation core.

use crate::entry::{Entry, Origin};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// REGISTERED ACCOUNT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredAccount {
    /// Stable identity
    pub id: String,

    /// Every name entries may use for this account
    pub names: Vec<String>,

    /// Known masks (last digits). Empty = any mask is accepted.
    #[serde(default)]
    pub masks: Vec<String>,
}

impl RegisteredAccount {
    pub fn new(id: &str, names: &[&str], masks: &[&str]) -> Self {
        RegisteredAccount {
            id: id.to_string(),
            names: names.iter().map(|n| n.to_string()).collect(),
            masks: masks.iter().map(|m| m.to_string()).collect(),
        }
    }
}

// ============================================================================
// ACCOUNT REGISTRY
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct AccountRegistry {
    /// (name, mask) -> id; a `None` mask is the wildcard for mask-less accounts
    pairs: HashMap<(String, Option<String>), String>,
}

impl AccountRegistry {
    pub fn new() -> Self {
        AccountRegistry {
            pairs: HashMap::new(),
        }
    }

    pub fn from_accounts(accounts: &[RegisteredAccount]) -> Self {
        let mut registry = Self::new();
        for account in accounts {
            registry.register(account);
        }
        registry
    }

    pub fn register(&mut self, account: &RegisteredAccount) {
        for name in &account.names {
            if account.masks.is_empty() {
                self.pairs
                    .insert((name.clone(), None), account.id.clone());
            }
            for mask in &account.masks {
                self.pairs
                    .insert((name.clone(), Some(mask.clone())), account.id.clone());
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Resolve a name/mask pair to its account id.
    pub fn resolve(&self, name: &str, mask: &str) -> Option<&str> {
        self.pairs
            .get(&(name.to_string(), Some(mask.to_string())))
            .or_else(|| self.pairs.get(&(name.to_string(), None)))
            .map(String::as_str)
    }

    /// Per-entry registered account mapping, aligned with `entries`.
    pub fn resolve_all(&self, entries: &[Entry]) -> Vec<Option<String>> {
        entries
            .iter()
            .map(|e| {
                self.resolve(&e.account_name, &e.account_mask)
                    .map(str::to_string)
            })
            .collect()
    }

    /// Entries whose (name, mask) pair is not registered.
    pub fn unregistered<'a>(&self, entries: &'a [Entry]) -> Vec<&'a Origin> {
        entries
            .iter()
            .filter(|e| self.resolve(&e.account_name, &e.account_mask).is_none())
            .map(|e| &e.origin)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> AccountRegistry {
        AccountRegistry::from_accounts(&[
            RegisteredAccount::new("chk", &["Checking", "Everyday Checking"], &["1234"]),
            RegisteredAccount::new("cc", &["Credit Card"], &["9876", "5555"]),
            RegisteredAccount::new("cash", &["Wallet"], &[]),
        ])
    }

    #[test]
    fn test_resolve_every_name_mask_pair() {
        let registry = registry();
        assert_eq!(registry.resolve("Checking", "1234"), Some("chk"));
        assert_eq!(registry.resolve("Everyday Checking", "1234"), Some("chk"));
        assert_eq!(registry.resolve("Credit Card", "5555"), Some("cc"));
        assert_eq!(registry.resolve("Credit Card", "0000"), None);
    }

    #[test]
    fn test_maskless_account_accepts_any_mask() {
        let registry = registry();
        assert_eq!(registry.resolve("Wallet", "whatever"), Some("cash"));
        assert_eq!(registry.resolve("Unknown", "1234"), None);
    }

    #[test]
    fn test_empty_registry() {
        assert!(AccountRegistry::new().is_empty());
        assert!(!registry().is_empty());
    }
}
