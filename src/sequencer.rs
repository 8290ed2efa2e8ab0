// 📅 Sequencer - the canonical total order every later stage relies on
//
// Order: date ascending, then worth descending (money arriving is listed
// before money leaving on the same day), then first-come: the row's origin
// (file path, row index), so input order never matters.

use crate::entry::Entry;
use std::cmp::Ordering;

/// Compare two entries by (date asc, worth desc, origin asc).
pub fn canonical_order(a: &Entry, b: &Entry) -> Ordering {
    a.date
        .cmp(&b.date)
        .then_with(|| b.worth.cmp(&a.worth))
        .then_with(|| a.origin.cmp(&b.origin))
}

/// Sort entries into canonical order.
pub fn sequence(mut entries: Vec<Entry>) -> Vec<Entry> {
    entries.sort_by(canonical_order);
    entries
}

/// True when `entries` is already in canonical order.
pub fn is_sequenced(entries: &[Entry]) -> bool {
    entries
        .windows(2)
        .all(|w| canonical_order(&w[0], &w[1]) != Ordering::Greater)
}
