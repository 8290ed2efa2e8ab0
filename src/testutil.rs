// Builders for typed entries in unit tests.

use crate::entry::{AccountType, Entry, EntryStatus, Origin};
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Posted depository entry.
pub fn entry(row: usize, date: &str, account: &str, entity: &str, amount: Decimal) -> Entry {
    typed(row, date, account, AccountType::Depository, entity, amount)
}

/// Posted entry of any account type; worth follows the type.
pub fn typed(
    row: usize,
    date: &str,
    account: &str,
    account_type: AccountType,
    entity: &str,
    amount: Decimal,
) -> Entry {
    Entry {
        origin: Origin::new(format!("{}.csv", account.to_lowercase()), row),
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        entity: entity.to_string(),
        description: None,
        category: None,
        amount,
        rate: Decimal::ONE,
        status: EntryStatus::Posted,
        account_name: account.to_string(),
        account_mask: "0000".to_string(),
        worth: account_type.worth_of(amount),
        account_type,
        account_subtype: "test".to_string(),
        balance_limit: None,
        balance_current: None,
        balance_available: None,
        balance_total: None,
        transaction_id: None,
        hash: None,
    }
}
