//! Costume inventory and loan ledger mirrored over a generic record store.
//!
//! # Examples
//!
//! Pure bookkeeping over [`core::ledger::Ledger`]:
//! ```
//! use chrono::NaiveDate;
//! use costumelog::{
//!     borrow::LoanRequest,
//!     core::{availability::available, ledger::Ledger, loan::prepare_loan},
//!     item::ItemDraft,
//! };
//!
//! let mut ledger = Ledger::new();
//! let mut draft = ItemDraft::quick("Pirate hat", None);
//! draft.quantity = 5;
//! ledger.prepend_item(draft.into_item("c_hat".to_string())).expect("item");
//!
//! let today = NaiveDate::from_ymd_opt(2024, 3, 1).expect("date");
//! let mut request = LoanRequest::new("c_hat", "Ana");
//! request.qty = 3;
//! let record = prepare_loan(&ledger, request, "b_1".to_string(), today).expect("loan");
//! ledger.prepend_record(record).expect("record");
//!
//! let item = ledger.item("c_hat").expect("item");
//! assert_eq!(available(&ledger, item), 2);
//! ```
//!
//! Runtime usage with a SQLite store:
//! ```no_run
//! use costumelog::{
//!     borrow::{LoanRequest, ReturnReport},
//!     item::ItemDraft,
//!     persist::sqlite::SqliteRecordStore,
//!     runtime::handle::{spawn_costumelog, RuntimeConfig},
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! costumelog::telemetry::init();
//! let store = SqliteRecordStore::open("costumes.db").expect("open sqlite");
//! let handle = spawn_costumelog(Box::new(store), RuntimeConfig::default());
//! let item = handle.add_item(ItemDraft::quick("Pirate hat", Some("Hat"))).await.expect("add");
//! let loan = handle.borrow(LoanRequest::new(item.id.clone(), "Ana")).await.expect("borrow");
//! handle.return_loan(loan.id, ReturnReport::default()).await.expect("return");
//! handle.export_csv_to(".").await.expect("export");
//! handle.shutdown().await.expect("shutdown");
//! # }
//! ```
#![deny(missing_docs)]

/// Borrow records, loan requests, and return reports.
pub mod borrow;
/// In-memory mirror and bookkeeping rules.
pub mod core;
/// CSV import and export.
pub mod io;
/// Inventory item records and patches.
pub mod item;
/// Record store contract, adapters, and implementations.
pub mod persist;
/// Single-writer runtime handle and events.
pub mod runtime;
/// Logging setup.
pub mod telemetry;
/// Shared identifiers and enums.
pub mod types;
