//! Borrow record, loan request, and return report types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::{BorrowId, BorrowStatus, ItemId, Version};

/// Ledger entry for one loan of some quantity of an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BorrowRecord {
    /// Unique record identifier.
    pub id: BorrowId,
    /// Borrowed item.
    pub inventory_id: ItemId,
    /// Item name at the time of the loan.
    #[serde(default)]
    pub costume_name: String,
    /// Person holding the units.
    pub borrower_name: String,
    /// Borrower's department or team.
    #[serde(default)]
    pub department: String,
    /// Units on loan.
    pub qty: u32,
    /// Why the units went out.
    #[serde(default)]
    pub purpose: String,
    /// Date the units are due back.
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    /// Staff member who handed the units out.
    #[serde(default)]
    pub staff: String,
    /// Open or closed.
    pub status: BorrowStatus,
    /// Date the loan was made.
    pub date_borrowed: NaiveDate,
    /// Date the loan was closed.
    #[serde(default)]
    pub date_returned: Option<NaiveDate>,
    /// Condition noted at return.
    #[serde(default)]
    pub condition_on_return: Option<String>,
    /// Units that did not come back.
    #[serde(default)]
    pub missing_items: Option<u32>,
    /// Repair cost noted at return.
    #[serde(default)]
    pub repair_cost: Option<f64>,
    /// Staff member who checked the return.
    #[serde(default)]
    pub checked_by: Option<String>,
    /// Store-managed concurrency token.
    #[serde(default)]
    pub version: Version,
}

impl BorrowRecord {
    /// True while units are out.
    pub fn is_active(&self) -> bool {
        self.status == BorrowStatus::Borrowed
    }
}

/// Input for creating a loan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanRequest {
    /// Item to lend.
    pub inventory_id: ItemId,
    /// Person taking the units.
    pub borrower_name: String,
    /// Borrower's department or team.
    pub department: String,
    /// Units requested.
    pub qty: u32,
    /// Why the units go out.
    pub purpose: String,
    /// Date the units are due back.
    pub due_date: Option<NaiveDate>,
    /// Staff member in charge.
    pub staff: String,
}

impl LoanRequest {
    /// One unit of `inventory_id` for an event, remaining fields blank.
    pub fn new(inventory_id: impl Into<ItemId>, borrower_name: impl Into<String>) -> Self {
        Self {
            inventory_id: inventory_id.into(),
            borrower_name: borrower_name.into(),
            department: String::new(),
            qty: 1,
            purpose: "Event".to_string(),
            due_date: None,
            staff: String::new(),
        }
    }
}

/// Structured return form submitted in one piece.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnReport {
    /// Condition, e.g. `Good`, `Needs Repair`, `Damaged`.
    pub condition: String,
    /// Units that did not come back.
    pub missing_items: u32,
    /// Repair cost, non-negative.
    pub repair_cost: f64,
    /// Staff member checking the return.
    pub checked_by: String,
}

impl Default for ReturnReport {
    fn default() -> Self {
        Self {
            condition: "Good".to_string(),
            missing_items: 0,
            repair_cost: 0.0,
            checked_by: "Staff".to_string(),
        }
    }
}

/// Field changes that close a loan, as sent to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnPatch {
    /// Always [`BorrowStatus::Returned`].
    pub status: BorrowStatus,
    /// Closing date.
    pub date_returned: NaiveDate,
    /// Condition noted at return.
    pub condition_on_return: String,
    /// Units that did not come back.
    pub missing_items: u32,
    /// Repair cost.
    pub repair_cost: f64,
    /// Staff member who checked the return.
    pub checked_by: String,
}

impl ReturnPatch {
    /// Applies this patch in place to `rec`.
    pub fn apply_to(&self, rec: &mut BorrowRecord) {
        rec.status = self.status;
        rec.date_returned = Some(self.date_returned);
        rec.condition_on_return = Some(self.condition_on_return.clone());
        rec.missing_items = Some(self.missing_items);
        rec.repair_cost = Some(self.repair_cost);
        rec.checked_by = Some(self.checked_by.clone());
    }
}
