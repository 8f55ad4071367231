use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use tempfile::TempDir;

use costumelog::{
    borrow::{LoanRequest, ReturnReport},
    core::{ledger::LedgerError, loan::LoanError},
    io::csv::CsvError,
    item::{ItemDraft, ItemPatch},
    persist::{
        PersistError, PersistResult, RecordStore, Row, adapter::InventoryAdapter,
        memory::MemoryRecordStore, sqlite::SqliteRecordStore,
    },
    runtime::{
        events::LedgerEvent,
        handle::{RuntimeConfig, RuntimeError, spawn_costumelog},
    },
    types::{BorrowStatus, Collection},
};

struct FlakyStore {
    inner: MemoryRecordStore,
    offline: Arc<AtomicBool>,
}

impl FlakyStore {
    fn check(&self) -> PersistResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(PersistError::Message("store unreachable".to_string()));
        }
        Ok(())
    }
}

impl RecordStore for FlakyStore {
    fn select_all(&self, collection: Collection) -> PersistResult<Vec<Row>> {
        self.check()?;
        self.inner.select_all(collection)
    }

    fn insert(&mut self, collection: Collection, row: Row) -> PersistResult<Row> {
        self.check()?;
        self.inner.insert(collection, row)
    }

    fn update(&mut self, collection: Collection, id: &str, patch: Row) -> PersistResult<Row> {
        self.check()?;
        self.inner.update(collection, id, patch)
    }

    fn delete(&mut self, collection: Collection, id: &str) -> PersistResult<()> {
        self.check()?;
        self.inner.delete(collection, id)
    }
}

fn quiet_config() -> RuntimeConfig {
    RuntimeConfig {
        load_on_start: false,
        ..RuntimeConfig::default()
    }
}

fn stock(name: &str, quantity: u32) -> ItemDraft {
    let mut draft = ItemDraft::quick(name, Some("Dress"));
    draft.quantity = quantity;
    draft
}

#[tokio::test]
async fn existing_rows_are_mirrored_on_start() {
    let mut store = MemoryRecordStore::new();
    InventoryAdapter::new(&mut store)
        .insert(&stock("Gown", 2).into_item("c_gown".to_string()))
        .expect("seed");

    let handle = spawn_costumelog(Box::new(store), RuntimeConfig::default());
    let rows = handle.inventory("").await.expect("inventory");

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].item.id, "c_gown");
    assert_eq!(rows[0].available, 2);

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn borrow_and_return_flow_emits_events_in_order() {
    let handle = spawn_costumelog(Box::new(MemoryRecordStore::new()), quiet_config());
    let mut sub = handle.subscribe();

    let item = handle.add_item(stock("Gown", 5)).await.expect("add");
    assert!(item.id.starts_with("c_"));
    assert_eq!(item.version, 1);

    let loan = handle
        .borrow(LoanRequest {
            qty: 3,
            ..LoanRequest::new(item.id.clone(), "Ana")
        })
        .await
        .expect("borrow");
    assert!(loan.id.starts_with("b_"));
    assert_eq!(handle.available(item.id.clone()).await.expect("available"), Some(2));

    let refused = handle
        .borrow(LoanRequest {
            qty: 3,
            ..LoanRequest::new(item.id.clone(), "Ben")
        })
        .await;
    assert!(matches!(
        refused,
        Err(RuntimeError::Loan(LoanError::InsufficientAvailability { requested: 3, available: 2 }))
    ));
    assert_eq!(handle.history().await.expect("history").len(), 1);
    assert_eq!(handle.active_loans().await.expect("active").len(), 1);

    let closed = handle
        .return_loan(loan.id.clone(), ReturnReport::default())
        .await
        .expect("return");
    assert_eq!(closed.status, BorrowStatus::Returned);
    assert_eq!(closed.checked_by.as_deref(), Some("Staff"));
    assert_eq!(handle.available(item.id.clone()).await.expect("available"), Some(5));
    assert!(handle.active_loans().await.expect("active").is_empty());

    let mut seen = Vec::new();
    while seen.len() < 3 {
        let evt = tokio::time::timeout(Duration::from_secs(1), sub.recv())
            .await
            .expect("event")
            .expect("recv");
        seen.push(evt);
    }
    assert_eq!(seen[0], LedgerEvent::ItemAdded { id: item.id.clone() });
    assert_eq!(
        seen[1],
        LedgerEvent::Borrowed {
            id: loan.id.clone(),
            item_id: item.id.clone()
        }
    );
    assert_eq!(seen[2], LedgerEvent::Returned { id: loan.id });

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn failed_store_writes_leave_the_mirror_untouched() {
    let offline = Arc::new(AtomicBool::new(false));
    let store = FlakyStore {
        inner: MemoryRecordStore::new(),
        offline: Arc::clone(&offline),
    };
    let handle = spawn_costumelog(Box::new(store), quiet_config());

    let item = handle.add_item(stock("Gown", 2)).await.expect("add");
    offline.store(true, Ordering::SeqCst);

    assert!(matches!(
        handle.add_item(stock("Cape", 1)).await,
        Err(RuntimeError::Persist(_))
    ));
    assert!(matches!(
        handle.borrow(LoanRequest::new(item.id.clone(), "Ana")).await,
        Err(RuntimeError::Persist(_))
    ));
    assert!(matches!(
        handle
            .update_item(
                item.id.clone(),
                ItemPatch {
                    quantity: Some(9),
                    ..ItemPatch::default()
                }
            )
            .await,
        Err(RuntimeError::Persist(_))
    ));
    assert!(matches!(handle.remove_item(item.id.clone()).await, Err(RuntimeError::Persist(_))));
    assert!(matches!(handle.reload().await, Err(RuntimeError::Persist(_))));

    let rows = handle.inventory("").await.expect("inventory");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].item, item);
    assert!(handle.history().await.expect("history").is_empty());

    offline.store(false, Ordering::SeqCst);
    handle.remove_item(item.id.clone()).await.expect("remove once back");
    assert!(handle.get_item(item.id).await.expect("get").is_none());

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn item_with_active_loan_cannot_be_removed() {
    let handle = spawn_costumelog(Box::new(MemoryRecordStore::new()), quiet_config());
    let item = handle.add_item(stock("Gown", 2)).await.expect("add");
    let loan = handle
        .borrow(LoanRequest::new(item.id.clone(), "Ana"))
        .await
        .expect("borrow");

    assert!(matches!(
        handle.remove_item(item.id.clone()).await,
        Err(RuntimeError::Ledger(LedgerError::ItemOnLoan { active: 1, .. }))
    ));

    handle
        .return_loan(loan.id.clone(), ReturnReport::default())
        .await
        .expect("return");
    handle.remove_item(item.id.clone()).await.expect("remove");

    let history = handle.history().await.expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].inventory_id, item.id);

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn second_return_overwrites_first() {
    let handle = spawn_costumelog(Box::new(MemoryRecordStore::new()), quiet_config());
    let item = handle.add_item(stock("Gown", 2)).await.expect("add");
    let loan = handle
        .borrow(LoanRequest::new(item.id.clone(), "Ana"))
        .await
        .expect("borrow");

    handle
        .return_loan(loan.id.clone(), ReturnReport::default())
        .await
        .expect("first return");
    let again = handle
        .return_loan(
            loan.id.clone(),
            ReturnReport {
                condition: "Damaged".to_string(),
                missing_items: 1,
                repair_cost: 15.0,
                checked_by: "Lee".to_string(),
            },
        )
        .await
        .expect("second return");

    assert_eq!(again.condition_on_return.as_deref(), Some("Damaged"));
    assert_eq!(again.missing_items, Some(1));
    assert_eq!(again.version, 3);
    assert_eq!(handle.get_record(loan.id).await.expect("get"), Some(again));

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn csv_import_is_row_by_row_and_exports_back() {
    let handle = spawn_costumelog(Box::new(MemoryRecordStore::new()), quiet_config());
    handle
        .add_item(ItemDraft {
            id: Some("c_taken".to_string()),
            ..stock("Old gown", 1)
        })
        .await
        .expect("seed");

    let text = "id,name,category,size,color,quantity,condition,location,notes\n\
                c_a,Cape,Outerwear,L,Black,2,Good,Rack 1,\n\
                c_taken,Duplicate,Dress,M,Red,1,Good,Rack 2,\n\
                ,Mask,Accessory,Free,White,x,Good,Box,\"fragile, handle with care\"\n";
    let summary = handle.import_csv(text).await.expect("import");

    assert_eq!(summary.added.len(), 2);
    assert_eq!(summary.added[0], "c_a");
    assert!(summary.added[1].starts_with("c_"));
    assert_eq!(summary.failed.len(), 1);
    assert_eq!(summary.failed[0].line, 3);

    let mask = handle
        .get_item(summary.added[1].clone())
        .await
        .expect("get")
        .expect("mask");
    assert_eq!(mask.quantity, 0);
    assert_eq!(mask.notes, "fragile, handle with care");

    let exported = handle.export_csv().await.expect("export");
    assert_eq!(exported.lines().count(), 4);

    let fresh = spawn_costumelog(Box::new(MemoryRecordStore::new()), quiet_config());
    let again = fresh.import_csv(exported).await.expect("re-import");
    assert_eq!(again.added.len(), 3);
    assert!(again.failed.is_empty());

    let mut left: Vec<_> = handle.inventory("").await.expect("inv").into_iter().map(|r| r.item).collect();
    let mut right: Vec<_> = fresh.inventory("").await.expect("inv").into_iter().map(|r| r.item).collect();
    left.sort_by(|a, b| a.id.cmp(&b.id));
    right.sort_by(|a, b| a.id.cmp(&b.id));
    assert_eq!(left, right);

    assert!(matches!(
        handle.import_csv("id,name\n").await,
        Err(RuntimeError::Csv(CsvError::NoData))
    ));

    handle.shutdown().await.expect("shutdown");
    fresh.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn csv_files_go_through_the_handle() {
    let tmp = TempDir::new().expect("tmp");
    let handle = spawn_costumelog(Box::new(MemoryRecordStore::new()), quiet_config());
    handle.add_item(stock("Gown", 4)).await.expect("add");

    let path = handle.export_csv_to(tmp.path()).await.expect("export");
    assert!(path.ends_with("inventory_export.csv"));

    let other = spawn_costumelog(Box::new(MemoryRecordStore::new()), quiet_config());
    let summary = other.import_csv_file(path).await.expect("import file");
    assert_eq!(summary.added.len(), 1);

    let txt = tmp.path().join("inventory.txt");
    std::fs::write(&txt, "id\n").expect("write");
    assert!(matches!(
        other.import_csv_file(txt).await,
        Err(RuntimeError::Csv(CsvError::NotCsv(_)))
    ));

    handle.shutdown().await.expect("shutdown");
    other.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn stale_mirror_update_is_rejected_as_conflict() {
    let tmp = TempDir::new().expect("tmp");
    let db_path = tmp.path().join("shared.db");

    let first = spawn_costumelog(
        Box::new(SqliteRecordStore::open(&db_path).expect("open")),
        quiet_config(),
    );
    let item = first.add_item(stock("Gown", 2)).await.expect("add");

    let second = spawn_costumelog(
        Box::new(SqliteRecordStore::open(&db_path).expect("open")),
        RuntimeConfig::default(),
    );
    assert_eq!(second.available(item.id.clone()).await.expect("available"), Some(2));

    first
        .update_item(
            item.id.clone(),
            ItemPatch {
                quantity: Some(4),
                ..ItemPatch::default()
            },
        )
        .await
        .expect("first update");

    let stale = second
        .update_item(
            item.id.clone(),
            ItemPatch {
                quantity: Some(1),
                ..ItemPatch::default()
            },
        )
        .await;
    assert!(matches!(
        stale,
        Err(RuntimeError::Persist(PersistError::Conflict { .. }))
    ));

    second.reload().await.expect("reload");
    assert_eq!(second.available(item.id.clone()).await.expect("available"), Some(4));

    first.shutdown().await.expect("shutdown");
    second.shutdown().await.expect("shutdown");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_borrows_cannot_overdraw_stock() {
    let store = SqliteRecordStore::open_in_memory().expect("open");
    let handle = spawn_costumelog(Box::new(store), quiet_config());
    let item = handle.add_item(stock("Cloak", 5)).await.expect("add");

    let mut tasks = Vec::new();
    for n in 0..10 {
        let handle = handle.clone();
        let item_id = item.id.clone();
        tasks.push(tokio::spawn(async move {
            let mut request = LoanRequest::new(item_id, format!("Borrower {n}"));
            request.qty = 3;
            handle.borrow(request).await
        }));
    }

    let mut opened = 0;
    for task in tasks {
        match task.await.expect("join") {
            Ok(_) => opened += 1,
            Err(RuntimeError::Loan(LoanError::InsufficientAvailability { requested, available })) => {
                assert_eq!(requested, 3);
                assert_eq!(available, 2);
            }
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(opened, 1);
    assert_eq!(handle.available(item.id.clone()).await.expect("available"), Some(2));
    assert_eq!(handle.history().await.expect("history").len(), 1);
    handle.shutdown().await.expect("shutdown");
}
