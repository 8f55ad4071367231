//! In-memory mirror and the bookkeeping rules evaluated against it.

/// Available-quantity and overdue calculations.
pub mod availability;
/// Helper index aliases.
pub mod indices;
/// Local mirror of both collections.
pub mod ledger;
/// Loan creation and closure rules.
pub mod loan;
/// Screen-level read models.
pub mod views;
