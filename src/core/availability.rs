//! Available-quantity and overdue accounting over the local mirror.
//!
//! Everything here is recomputed from the mirror on each call; nothing is
//! cached.

use chrono::NaiveDate;

use crate::{borrow::BorrowRecord, item::InventoryItem, types::BorrowStatus};

use super::ledger::Ledger;

/// Units of `item_id` currently out on `Borrowed` records.
pub fn borrowed_quantity(ledger: &Ledger, item_id: &str) -> u64 {
    ledger
        .records_for_item(item_id)
        .into_iter()
        .filter(|rec| rec.status == BorrowStatus::Borrowed)
        .map(|rec| u64::from(rec.qty))
        .sum()
}

/// Total units minus units on active loan.
///
/// Signed so that a mirror loaded from an over-lent store reports the deficit
/// instead of hiding it.
pub fn available(ledger: &Ledger, item: &InventoryItem) -> i64 {
    let borrowed = i64::try_from(borrowed_quantity(ledger, &item.id)).unwrap_or(i64::MAX);
    i64::from(item.quantity).saturating_sub(borrowed)
}

/// Looks the item up by id; `None` when it is not in the mirror.
pub fn available_by_id(ledger: &Ledger, item_id: &str) -> Option<i64> {
    ledger.item(item_id).map(|item| available(ledger, item))
}

/// True for an open loan whose due date lies strictly before `today`.
pub fn is_overdue_on(record: &BorrowRecord, today: NaiveDate) -> bool {
    match record.due_date {
        Some(due) if record.status == BorrowStatus::Borrowed => today > due,
        _ => false,
    }
}

/// [`is_overdue_on`] evaluated against the current UTC date.
pub fn is_overdue(record: &BorrowRecord) -> bool {
    is_overdue_on(record, crate::types::today())
}
