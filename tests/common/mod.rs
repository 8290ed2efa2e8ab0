#![allow(dead_code)]

use ledger_reconcile::entry::format_cents;
use ledger_reconcile::{Entry, Origin, RawEntry};
use rust_decimal::Decimal;

pub const HEADER: &str = "date,entity,amount,status,account_name,account_mask,account_type,account_subtype,balance_current,balance_limit,transaction_id,hash\n";

/// Minimal raw row; everything optional left blank.
pub fn raw(
    file: &str,
    row: usize,
    date: &str,
    account: &str,
    account_type: &str,
    entity: &str,
    amount: &str,
) -> RawEntry {
    RawEntry {
        date: Some(date.to_string()),
        entity: Some(entity.to_string()),
        amount: Some(amount.to_string()),
        status: Some("posted".to_string()),
        account_name: Some(account.to_string()),
        account_mask: Some("0001".to_string()),
        account_type: Some(account_type.to_string()),
        account_subtype: Some("test".to_string()),
        ..Default::default()
    }
    .with_origin(Origin::new(file, row))
}

/// Feed a reconciled entry back in as the next run would read it.
pub fn as_raw(entry: &Entry) -> RawEntry {
    RawEntry {
        origin: entry.origin.clone(),
        transaction_id: entry.transaction_id.clone(),
        date: Some(entry.date.format("%Y-%m-%d").to_string()),
        description: entry.description.clone(),
        entity: Some(entry.entity.clone()),
        category: entry.category.clone(),
        amount: Some(format_cents(entry.amount)),
        rate: (entry.rate != Decimal::ONE).then(|| entry.rate.to_string()),
        status: Some(entry.status.as_str().to_string()),
        account_name: Some(entry.account_name.clone()),
        account_mask: Some(entry.account_mask.clone()),
        account_type: Some(entry.account_type.as_str().to_string()),
        account_subtype: Some(entry.account_subtype.clone()),
        balance_current: entry.balance_current.map(format_cents),
        balance_available: entry.balance_available.map(format_cents),
        balance_limit: entry.balance_limit.map(format_cents),
        hash: entry.hash.clone(),
    }
}
