// 🧹 Normalizer - coerce raw text columns into typed entries
//
// Pure function: raw rows in, typed rows out (or every offending cell at once).
// Also derives `worth`, the signed effect of an entry on net worth.

use crate::entry::{round_cents, AccountType, Entry, EntryStatus, Origin, RawEntry};
use crate::error::{ReconcileError, Result, SchemaViolation};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Accepted date layouts, tried in order.
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

// ============================================================================
// FIELD PARSERS
// ============================================================================

pub fn parse_date(text: &str) -> std::result::Result<NaiveDate, String> {
    let text = text.trim();
    // Tolerate a trailing time component ("2024-01-02 00:00:00")
    let day = text.split_whitespace().next().unwrap_or(text);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(day, fmt).ok())
        .ok_or_else(|| format!("not a date: '{}'", text))
}

/// Parse a money-like number: "$1,234.50", "(12.00)", "-0.0".
pub fn parse_decimal(text: &str) -> std::result::Result<Decimal, String> {
    let trimmed = text.trim();
    let (negated, body) = match trimmed.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };
    let cleaned: String = body
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();

    let value = Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .map_err(|_| format!("not a number: '{}'", text))?;

    let value = if negated { -value } else { value };
    Ok(if value.is_zero() { Decimal::ZERO } else { value })
}

// ============================================================================
// ROW CHECKER
// ============================================================================

/// Collects every problem in one row instead of stopping at the first.
struct RowCheck<'a> {
    origin: &'a Origin,
    violations: Vec<SchemaViolation>,
}

impl<'a> RowCheck<'a> {
    fn new(origin: &'a Origin) -> Self {
        RowCheck {
            origin,
            violations: Vec::new(),
        }
    }

    fn required<T>(
        &mut self,
        column: &str,
        value: &Option<String>,
        parse: impl Fn(&str) -> std::result::Result<T, String>,
    ) -> Option<T> {
        match clean(value) {
            None => {
                self.violations
                    .push(SchemaViolation::new(self.origin, column, "required field is empty"));
                None
            }
            Some(text) => self.parsed(column, parse(text)),
        }
    }

    fn optional<T>(
        &mut self,
        column: &str,
        value: &Option<String>,
        parse: impl Fn(&str) -> std::result::Result<T, String>,
    ) -> Option<T> {
        clean(value).and_then(|text| self.parsed(column, parse(text)))
    }

    fn parsed<T>(&mut self, column: &str, result: std::result::Result<T, String>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(message) => {
                self.violations
                    .push(SchemaViolation::new(self.origin, column, message));
                None
            }
        }
    }
}

fn clean(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn text(s: &str) -> std::result::Result<String, String> {
    Ok(s.to_string())
}

// ============================================================================
// NORMALIZE
// ============================================================================

/// Type every row. Fails with one `Schema` error listing all bad cells.
pub fn normalize(rows: &[RawEntry]) -> Result<Vec<Entry>> {
    let mut entries = Vec::with_capacity(rows.len());
    let mut violations = Vec::new();

    for raw in rows {
        match normalize_row(raw) {
            Ok(entry) => entries.push(entry),
            Err(mut found) => violations.append(&mut found),
        }
    }

    if !violations.is_empty() {
        tracing::debug!(count = violations.len(), "normalizer rejected input");
        return Err(ReconcileError::Schema(violations));
    }

    tracing::debug!(entries = entries.len(), "normalized entries");
    Ok(entries)
}

fn normalize_row(raw: &RawEntry) -> std::result::Result<Entry, Vec<SchemaViolation>> {
    let mut check = RowCheck::new(&raw.origin);

    let date = check.required("date", &raw.date, parse_date);
    let entity = check.required("entity", &raw.entity, text);
    let amount = check.required("amount", &raw.amount, parse_decimal);
    let status = check.required("status", &raw.status, EntryStatus::from_str);
    let account_name = check.required("account_name", &raw.account_name, text);
    let account_mask = check.required("account_mask", &raw.account_mask, text);
    let account_type = check.required("account_type", &raw.account_type, AccountType::from_str);
    let account_subtype = check.required("account_subtype", &raw.account_subtype, text);

    let rate = check.optional("rate", &raw.rate, |s| {
        let rate = parse_decimal(s)?;
        if rate <= Decimal::ZERO {
            Err(format!("rate must be positive, got {}", rate))
        } else {
            Ok(rate)
        }
    });
    let balance_current = check.optional("balance_current", &raw.balance_current, parse_decimal);
    let balance_available =
        check.optional("balance_available", &raw.balance_available, parse_decimal);
    let balance_limit = check.optional("balance_limit", &raw.balance_limit, parse_decimal);

    let (
        Some(date),
        Some(entity),
        Some(amount),
        Some(status),
        Some(account_name),
        Some(account_mask),
        Some(account_type),
        Some(account_subtype),
    ) = (
        date,
        entity,
        amount,
        status,
        account_name,
        account_mask,
        account_type,
        account_subtype,
    )
    else {
        return Err(check.violations);
    };

    if !check.violations.is_empty() {
        return Err(check.violations);
    }

    // Output carries cents only; derive everything from what will be written
    let amount = round_cents(amount);
    let balance_limit = balance_limit.map(round_cents);
    let rate = rate.unwrap_or(Decimal::ONE);
    let Some(worth) = account_type.worth_of(amount).checked_mul(rate) else {
        return Err(vec![SchemaViolation::new(
            &raw.origin,
            "rate",
            "amount times rate overflows decimal range",
        )]);
    };
    let worth = round_cents(worth);

    Ok(Entry {
        origin: raw.origin.clone(),
        date,
        entity,
        description: clean(&raw.description).map(str::to_string),
        category: clean(&raw.category).map(str::to_string),
        amount,
        rate,
        status,
        account_name,
        account_mask,
        account_type,
        account_subtype,
        balance_limit,
        worth,
        balance_current,
        balance_available,
        balance_total: None,
        transaction_id: clean(&raw.transaction_id).map(str::to_string),
        hash: clean(&raw.hash).map(str::to_string),
    })
}
