//! File formats for moving inventory in and out.

/// Inventory CSV codec.
pub mod csv;
