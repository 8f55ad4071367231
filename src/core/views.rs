//! Read models for the inventory, borrow, and returns screens.

use chrono::NaiveDate;
use serde::Serialize;

use crate::{borrow::BorrowRecord, item::InventoryItem};

use super::{
    availability::{available, is_overdue_on},
    ledger::Ledger,
};

/// Inventory table row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InventoryRow {
    /// The catalog entry.
    pub item: InventoryItem,
    /// Units not on active loan.
    pub available: i64,
}

/// Active-borrowings row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoanRow {
    /// The open record.
    pub record: BorrowRecord,
    /// Past its due date.
    pub overdue: bool,
}

/// Case-insensitive substring match over name, category and location.
/// A blank query matches everything.
pub fn matches_filter(item: &InventoryItem, query: &str) -> bool {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return true;
    }
    [&item.name, &item.category, &item.location]
        .into_iter()
        .any(|field| field.to_lowercase().contains(&q))
}

/// Filtered inventory, newest first, each with its available count.
pub fn inventory_rows(ledger: &Ledger, query: &str) -> Vec<InventoryRow> {
    ledger
        .items()
        .filter(|item| matches_filter(item, query))
        .map(|item| InventoryRow {
            available: available(ledger, item),
            item: item.clone(),
        })
        .collect()
}

/// Open loans, newest first, flagged when overdue on `today`.
pub fn active_loans(ledger: &Ledger, today: NaiveDate) -> Vec<LoanRow> {
    ledger
        .records()
        .filter(|rec| rec.is_active())
        .map(|rec| LoanRow {
            overdue: is_overdue_on(rec, today),
            record: rec.clone(),
        })
        .collect()
}

/// Every record, newest first.
pub fn history(ledger: &Ledger) -> Vec<BorrowRecord> {
    ledger.records().cloned().collect()
}
