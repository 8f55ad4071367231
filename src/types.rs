//! Shared identifiers, collection names, and loan status.

use std::fmt;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable inventory item identifier.
pub type ItemId = String;
/// Borrow record identifier.
pub type BorrowId = String;
/// Store-managed optimistic concurrency token.
pub type Version = u64;

/// Remote collection holding a record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Collection {
    /// Costume catalog entries.
    Inventory,
    /// Loan transactions.
    BorrowLog,
}

impl Collection {
    /// Collection name as known to the record store.
    pub fn name(self) -> &'static str {
        match self {
            Collection::Inventory => "inventory",
            Collection::BorrowLog => "borrow_log",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lifecycle state of a borrow record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BorrowStatus {
    /// Units are out with the borrower.
    Borrowed,
    /// Units came back and the record is closed.
    Returned,
}

/// Generates an identifier of the form `<prefix>_<random>`.
pub fn new_id(prefix: &str) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{prefix}_{}", &suffix[..12])
}

/// Current calendar date in UTC.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}
