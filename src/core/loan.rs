//! Rules for opening and closing loans.
//!
//! These functions only decide what the new record should look like; writing
//! it to the store and the mirror is the runtime's job.

use chrono::NaiveDate;
use thiserror::Error;

use crate::{
    borrow::{BorrowRecord, LoanRequest, ReturnPatch, ReturnReport},
    types::{BorrowId, BorrowStatus, ItemId},
};

use super::{availability::available, ledger::Ledger};

/// Reasons a loan request is refused. Nothing is written when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoanError {
    /// The item is not in the mirror.
    #[error("unknown inventory item {0}")]
    UnknownItem(ItemId),
    /// Borrower name was blank.
    #[error("borrower name is required")]
    MissingBorrower,
    /// Requested quantity was zero.
    #[error("quantity must be at least 1")]
    InvalidQuantity,
    /// Not enough units left.
    #[error("Not enough available. {available} left.")]
    InsufficientAvailability {
        /// Units asked for.
        requested: u32,
        /// Units free at the time of the check.
        available: i64,
    },
}

/// Reasons a return is refused.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReturnError {
    /// The record is not in the mirror.
    #[error("unknown borrow record {0}")]
    UnknownRecord(BorrowId),
    /// Condition was blank.
    #[error("condition on return is required")]
    EmptyCondition,
    /// Repair cost was negative or not a number.
    #[error("repair cost must be a non-negative amount, got {0}")]
    InvalidRepairCost(f64),
}

/// Validates `request` against the mirror and builds the record to insert.
pub fn prepare_loan(
    ledger: &Ledger,
    request: LoanRequest,
    id: BorrowId,
    today: NaiveDate,
) -> Result<BorrowRecord, LoanError> {
    let item = ledger
        .item(&request.inventory_id)
        .ok_or_else(|| LoanError::UnknownItem(request.inventory_id.clone()))?;

    let borrower_name = request.borrower_name.trim();
    if borrower_name.is_empty() {
        return Err(LoanError::MissingBorrower);
    }
    if request.qty == 0 {
        return Err(LoanError::InvalidQuantity);
    }

    let free = available(ledger, item);
    if i64::from(request.qty) > free {
        return Err(LoanError::InsufficientAvailability {
            requested: request.qty,
            available: free,
        });
    }

    Ok(BorrowRecord {
        id,
        costume_name: item.name.clone(),
        borrower_name: borrower_name.to_string(),
        inventory_id: request.inventory_id,
        department: request.department,
        qty: request.qty,
        purpose: request.purpose,
        due_date: request.due_date,
        staff: request.staff,
        status: BorrowStatus::Borrowed,
        date_borrowed: today,
        date_returned: None,
        condition_on_return: None,
        missing_items: None,
        repair_cost: None,
        checked_by: None,
        version: 0,
    })
}

impl ReturnReport {
    /// Field-level checks on the return form.
    pub fn validate(&self) -> Result<(), ReturnError> {
        if self.condition.trim().is_empty() {
            return Err(ReturnError::EmptyCondition);
        }
        if !self.repair_cost.is_finite() || self.repair_cost < 0.0 {
            return Err(ReturnError::InvalidRepairCost(self.repair_cost));
        }
        Ok(())
    }
}

/// Builds the closing patch for `record_id`.
///
/// A record that is already returned is accepted and its return fields are
/// overwritten.
pub fn prepare_return(
    ledger: &Ledger,
    record_id: &str,
    report: ReturnReport,
    today: NaiveDate,
) -> Result<ReturnPatch, ReturnError> {
    if ledger.record(record_id).is_none() {
        return Err(ReturnError::UnknownRecord(record_id.to_string()));
    }
    report.validate()?;

    Ok(ReturnPatch {
        status: BorrowStatus::Returned,
        date_returned: today,
        condition_on_return: report.condition.trim().to_string(),
        missing_items: report.missing_items,
        repair_cost: report.repair_cost,
        checked_by: report.checked_by,
    })
}
