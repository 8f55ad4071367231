//! Runtime handle, command loop, and store calls.

use std::{path::PathBuf, sync::Arc};

use chrono::NaiveDate;
use thiserror::Error;
use tokio::sync::{Mutex, broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::{
    borrow::{BorrowRecord, LoanRequest, ReturnReport},
    core::{
        availability::available_by_id,
        ledger::{Ledger, LedgerError},
        loan::{LoanError, ReturnError, prepare_loan, prepare_return},
        views::{self, InventoryRow, LoanRow},
    },
    io::csv::{self as csv_io, CsvError, ImportSummary, RowFailure},
    item::{InventoryItem, ItemDraft, ItemPatch},
    persist::{
        PersistError, PersistResult, RecordStore,
        adapter::{BorrowLedgerAdapter, InventoryAdapter},
    },
    types::{BorrowId, ItemId, new_id, today},
};

use super::events::LedgerEvent;

/// Failures surfaced through [`CostumeLogHandle`].
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Mirror refused the change.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    /// Loan request failed validation.
    #[error(transparent)]
    Loan(#[from] LoanError),
    /// Return form failed validation.
    #[error(transparent)]
    Return(#[from] ReturnError),
    /// Record store call failed; the mirror is unchanged.
    #[error(transparent)]
    Persist(#[from] PersistError),
    /// CSV could not be read or written.
    #[error(transparent)]
    Csv(#[from] CsvError),
    /// The runtime loop has stopped.
    #[error("runtime channel closed")]
    ChannelClosed,
}

/// Runtime tuning and id generation.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Commands buffered before callers wait.
    pub command_queue_bound: usize,
    /// Events buffered per subscriber before lagging.
    pub event_capacity: usize,
    /// Fill the mirror from the store before serving the first command.
    pub load_on_start: bool,
    /// Prefix of generated item ids.
    pub item_id_prefix: String,
    /// Prefix of generated borrow record ids.
    pub borrow_id_prefix: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            command_queue_bound: 256,
            event_capacity: 1024,
            load_on_start: true,
            item_id_prefix: "c".to_string(),
            borrow_id_prefix: "b".to_string(),
        }
    }
}

type SharedStore = Arc<Mutex<Box<dyn RecordStore>>>;
type Reply<T> = oneshot::Sender<Result<T, RuntimeError>>;

/// Cloneable client of the runtime loop.
pub struct CostumeLogHandle {
    cmd_tx: mpsc::Sender<Command>,
    events_tx: broadcast::Sender<LedgerEvent>,
}

impl Clone for CostumeLogHandle {
    fn clone(&self) -> Self {
        Self {
            cmd_tx: self.cmd_tx.clone(),
            events_tx: self.events_tx.clone(),
        }
    }
}

enum Command {
    Reload {
        resp: Reply<()>,
    },
    AddItem {
        draft: ItemDraft,
        resp: Reply<InventoryItem>,
    },
    UpdateItem {
        id: ItemId,
        patch: ItemPatch,
        resp: Reply<InventoryItem>,
    },
    RemoveItem {
        id: ItemId,
        resp: Reply<()>,
    },
    Borrow {
        request: LoanRequest,
        resp: Reply<BorrowRecord>,
    },
    Return {
        id: BorrowId,
        report: ReturnReport,
        resp: Reply<BorrowRecord>,
    },
    ImportCsv {
        text: String,
        resp: Reply<ImportSummary>,
    },
    ExportCsv {
        resp: Reply<String>,
    },
    Inventory {
        query: String,
        resp: oneshot::Sender<Vec<InventoryRow>>,
    },
    ActiveLoans {
        today: NaiveDate,
        resp: oneshot::Sender<Vec<LoanRow>>,
    },
    History {
        resp: oneshot::Sender<Vec<BorrowRecord>>,
    },
    GetItem {
        id: ItemId,
        resp: oneshot::Sender<Option<InventoryItem>>,
    },
    GetRecord {
        id: BorrowId,
        resp: oneshot::Sender<Option<BorrowRecord>>,
    },
    Available {
        id: ItemId,
        resp: oneshot::Sender<Option<i64>>,
    },
    Shutdown {
        resp: oneshot::Sender<()>,
    },
}

/// Starts the runtime loop on the current tokio runtime.
///
/// The loop owns the mirror and `store`; every command, including the store
/// call it makes, completes before the next one is read.
pub fn spawn_costumelog(store: Box<dyn RecordStore>, config: RuntimeConfig) -> CostumeLogHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(config.command_queue_bound.max(1));
    let (events_tx, _) = broadcast::channel::<LedgerEvent>(config.event_capacity.max(1));

    let mut worker = Worker {
        ledger: Ledger::new(),
        store: Arc::new(Mutex::new(store)),
        events_tx: events_tx.clone(),
        config,
    };

    tokio::spawn(async move {
        if worker.config.load_on_start {
            let _ = worker.reload().await;
        }

        while let Some(cmd) = cmd_rx.recv().await {
            if worker.handle_command(cmd).await {
                break;
            }
        }
        debug!("costumelog runtime stopped");
    });

    CostumeLogHandle { cmd_tx, events_tx }
}

impl CostumeLogHandle {
    /// New receiver for [`LedgerEvent`]s emitted from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events_tx.subscribe()
    }

    /// Replaces both mirrored collections with the store's contents.
    pub async fn reload(&self) -> Result<(), RuntimeError> {
        self.request(|resp| Command::Reload { resp }).await?
    }

    /// Stores a new item, generating its id when the draft has none.
    pub async fn add_item(&self, draft: ItemDraft) -> Result<InventoryItem, RuntimeError> {
        self.request(|resp| Command::AddItem { draft, resp }).await?
    }

    /// Applies `patch` against the mirrored version of the item.
    pub async fn update_item(
        &self,
        id: impl Into<ItemId>,
        patch: ItemPatch,
    ) -> Result<InventoryItem, RuntimeError> {
        let id = id.into();
        self.request(|resp| Command::UpdateItem { id, patch, resp })
            .await?
    }

    /// Deletes an item with no units on active loan.
    pub async fn remove_item(&self, id: impl Into<ItemId>) -> Result<(), RuntimeError> {
        let id = id.into();
        self.request(|resp| Command::RemoveItem { id, resp }).await?
    }

    /// Opens a loan if enough units are available.
    pub async fn borrow(&self, request: LoanRequest) -> Result<BorrowRecord, RuntimeError> {
        self.request(|resp| Command::Borrow { request, resp }).await?
    }

    /// Closes a loan with the given return form.
    pub async fn return_loan(
        &self,
        id: impl Into<BorrowId>,
        report: ReturnReport,
    ) -> Result<BorrowRecord, RuntimeError> {
        let id = id.into();
        self.request(|resp| Command::Return { id, report, resp })
            .await?
    }

    /// Stores each row of `text` as a new item, one write per row.
    pub async fn import_csv(&self, text: impl Into<String>) -> Result<ImportSummary, RuntimeError> {
        let text = text.into();
        self.request(|resp| Command::ImportCsv { text, resp }).await?
    }

    /// Reads a `.csv` file and imports it.
    pub async fn import_csv_file(&self, path: impl Into<PathBuf>) -> Result<ImportSummary, RuntimeError> {
        let path = path.into();
        let text = tokio::task::spawn_blocking(move || csv_io::read_import_file(path))
            .await
            .map_err(|e| PersistError::Message(format!("join error: {e}")))??;
        self.import_csv(text).await
    }

    /// Mirrored inventory rendered as CSV text.
    pub async fn export_csv(&self) -> Result<String, RuntimeError> {
        self.request(|resp| Command::ExportCsv { resp }).await?
    }

    /// Writes `dir/inventory_export.csv` and returns its path.
    pub async fn export_csv_to(&self, dir: impl Into<PathBuf>) -> Result<PathBuf, RuntimeError> {
        let text = self.export_csv().await?;
        let path = dir.into().join(csv_io::EXPORT_FILE_NAME);
        let out = path.clone();
        tokio::task::spawn_blocking(move || std::fs::write(&out, text))
            .await
            .map_err(|e| PersistError::Message(format!("join error: {e}")))?
            .map_err(CsvError::from)?;
        Ok(path)
    }

    /// Inventory rows matching `query`.
    pub async fn inventory(&self, query: impl Into<String>) -> Result<Vec<InventoryRow>, RuntimeError> {
        let query = query.into();
        self.request(|resp| Command::Inventory { query, resp }).await
    }

    /// Open loans, overdue as of today.
    pub async fn active_loans(&self) -> Result<Vec<LoanRow>, RuntimeError> {
        self.active_loans_on(today()).await
    }

    /// Open loans, overdue as of `today`.
    pub async fn active_loans_on(&self, today: NaiveDate) -> Result<Vec<LoanRow>, RuntimeError> {
        self.request(|resp| Command::ActiveLoans { today, resp })
            .await
    }

    /// Every borrow record, newest first.
    pub async fn history(&self) -> Result<Vec<BorrowRecord>, RuntimeError> {
        self.request(|resp| Command::History { resp }).await
    }

    /// Mirrored item by id.
    pub async fn get_item(&self, id: impl Into<ItemId>) -> Result<Option<InventoryItem>, RuntimeError> {
        let id = id.into();
        self.request(|resp| Command::GetItem { id, resp }).await
    }

    /// Mirrored record by id.
    pub async fn get_record(&self, id: impl Into<BorrowId>) -> Result<Option<BorrowRecord>, RuntimeError> {
        let id = id.into();
        self.request(|resp| Command::GetRecord { id, resp }).await
    }

    /// Available units of an item, `None` if unknown.
    pub async fn available(&self, id: impl Into<ItemId>) -> Result<Option<i64>, RuntimeError> {
        let id = id.into();
        self.request(|resp| Command::Available { id, resp }).await
    }

    /// Stops the loop after queued commands.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.request(|resp| Command::Shutdown { resp }).await
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(make(tx))
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }
}

struct Worker {
    ledger: Ledger,
    store: SharedStore,
    events_tx: broadcast::Sender<LedgerEvent>,
    config: RuntimeConfig,
}

impl Worker {
    async fn handle_command(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::Reload { resp } => {
                let _ = resp.send(self.reload().await);
            }
            Command::AddItem { draft, resp } => {
                let _ = resp.send(self.add_item(draft).await);
            }
            Command::UpdateItem { id, patch, resp } => {
                let _ = resp.send(self.update_item(id, patch).await);
            }
            Command::RemoveItem { id, resp } => {
                let _ = resp.send(self.remove_item(id).await);
            }
            Command::Borrow { request, resp } => {
                let _ = resp.send(self.borrow(request).await);
            }
            Command::Return { id, report, resp } => {
                let _ = resp.send(self.return_loan(id, report).await);
            }
            Command::ImportCsv { text, resp } => {
                let _ = resp.send(self.import_csv(&text).await);
            }
            Command::ExportCsv { resp } => {
                let out = csv_io::export_inventory(self.ledger.items()).map_err(RuntimeError::from);
                let _ = resp.send(out);
            }
            Command::Inventory { query, resp } => {
                let _ = resp.send(views::inventory_rows(&self.ledger, &query));
            }
            Command::ActiveLoans { today, resp } => {
                let _ = resp.send(views::active_loans(&self.ledger, today));
            }
            Command::History { resp } => {
                let _ = resp.send(views::history(&self.ledger));
            }
            Command::GetItem { id, resp } => {
                let _ = resp.send(self.ledger.item(&id).cloned());
            }
            Command::GetRecord { id, resp } => {
                let _ = resp.send(self.ledger.record(&id).cloned());
            }
            Command::Available { id, resp } => {
                let _ = resp.send(available_by_id(&self.ledger, &id));
            }
            Command::Shutdown { resp } => {
                let _ = resp.send(());
                return true;
            }
        }

        false
    }

    async fn reload(&mut self) -> Result<(), RuntimeError> {
        let (items, records) = self
            .store_call("reload", |store| {
                let items = InventoryAdapter::new(&mut *store).select_all()?;
                let records = BorrowLedgerAdapter::new(store).select_all()?;
                Ok((items, records))
            })
            .await?;

        self.ledger.replace_inventory(items);
        self.ledger.replace_borrow_log(records);
        debug!(
            items = self.ledger.item_len(),
            records = self.ledger.record_len(),
            "mirror reloaded"
        );
        self.emit(LedgerEvent::Reloaded {
            items: self.ledger.item_len(),
            records: self.ledger.record_len(),
        });
        Ok(())
    }

    async fn add_item(&mut self, mut draft: ItemDraft) -> Result<InventoryItem, RuntimeError> {
        let id = draft
            .id
            .take()
            .unwrap_or_else(|| new_id(&self.config.item_id_prefix));
        if self.ledger.item(&id).is_some() {
            warn!(item = %id, "item id already mirrored");
            return Err(LedgerError::ItemExists(id).into());
        }

        let item = draft.into_item(id);
        let stored = self
            .store_call("add_item", move |store| InventoryAdapter::new(store).insert(&item))
            .await?;

        self.ledger.prepend_item(stored.clone())?;
        info!(item = %stored.id, name = %stored.name, quantity = stored.quantity, "item added");
        self.emit(LedgerEvent::ItemAdded {
            id: stored.id.clone(),
        });
        Ok(stored)
    }

    async fn update_item(&mut self, id: ItemId, patch: ItemPatch) -> Result<InventoryItem, RuntimeError> {
        let version = self
            .ledger
            .item(&id)
            .map(|item| item.version)
            .ok_or_else(|| LedgerError::MissingItem(id.clone()))?;

        let target = id.clone();
        let stored = self
            .store_call("update_item", move |store| {
                InventoryAdapter::new(store).update(&target, &patch, Some(version))
            })
            .await?;

        self.ledger.replace_item(stored.clone())?;
        info!(item = %id, version = stored.version, "item updated");
        self.emit(LedgerEvent::ItemUpdated { id });
        Ok(stored)
    }

    async fn remove_item(&mut self, id: ItemId) -> Result<(), RuntimeError> {
        if let Err(err) = self.ledger.check_removable(&id) {
            warn!(item = %id, error = %err, "item removal refused");
            return Err(err.into());
        }

        let target = id.clone();
        self.store_call("remove_item", move |store| InventoryAdapter::new(store).delete(&target))
            .await?;

        self.ledger.remove_item(&id)?;
        info!(item = %id, "item removed");
        self.emit(LedgerEvent::ItemRemoved { id });
        Ok(())
    }

    async fn borrow(&mut self, request: LoanRequest) -> Result<BorrowRecord, RuntimeError> {
        let id = new_id(&self.config.borrow_id_prefix);
        let record = match prepare_loan(&self.ledger, request, id, today()) {
            Ok(record) => record,
            Err(err) => {
                warn!(error = %err, "loan refused");
                return Err(err.into());
            }
        };

        let stored = self
            .store_call("borrow", move |store| BorrowLedgerAdapter::new(store).insert(&record))
            .await?;

        self.ledger.prepend_record(stored.clone())?;
        info!(
            record = %stored.id,
            item = %stored.inventory_id,
            qty = stored.qty,
            borrower = %stored.borrower_name,
            "loan opened"
        );
        self.emit(LedgerEvent::Borrowed {
            id: stored.id.clone(),
            item_id: stored.inventory_id.clone(),
        });
        Ok(stored)
    }

    async fn return_loan(&mut self, id: BorrowId, report: ReturnReport) -> Result<BorrowRecord, RuntimeError> {
        let patch = match prepare_return(&self.ledger, &id, report, today()) {
            Ok(patch) => patch,
            Err(err) => {
                warn!(record = %id, error = %err, "return refused");
                return Err(err.into());
            }
        };
        let version = self.ledger.record(&id).map(|rec| rec.version);

        let target = id.clone();
        let stored = self
            .store_call("return_loan", move |store| {
                BorrowLedgerAdapter::new(store).update(&target, &patch, version)
            })
            .await?;

        self.ledger.replace_record(stored.clone())?;
        info!(record = %id, item = %stored.inventory_id, "loan closed");
        self.emit(LedgerEvent::Returned { id });
        Ok(stored)
    }

    async fn import_csv(&mut self, text: &str) -> Result<ImportSummary, RuntimeError> {
        let parsed = match csv_io::parse_inventory(text) {
            Ok(parsed) => parsed,
            Err(err) => {
                warn!(error = %err, "import rejected");
                return Err(err.into());
            }
        };

        let mut summary = ImportSummary {
            added: Vec::new(),
            failed: parsed.rejected,
        };
        for row in parsed.rows {
            match self.add_item(row.draft).await {
                Ok(item) => summary.added.push(item.id),
                Err(err) => summary.failed.push(RowFailure {
                    line: row.line,
                    reason: err.to_string(),
                }),
            }
        }
        summary.failed.sort_by_key(|f| f.line);

        info!(
            added = summary.added.len(),
            failed = summary.failed.len(),
            "csv import finished"
        );
        self.emit(LedgerEvent::Imported {
            added: summary.added.len(),
            failed: summary.failed.len(),
        });
        Ok(summary)
    }

    /// Runs `f` against the store off the async executor. Failures are logged
    /// here so callers only need to propagate them.
    async fn store_call<T, F>(&self, op: &'static str, f: F) -> Result<T, RuntimeError>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn RecordStore) -> PersistResult<T> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let result = tokio::task::spawn_blocking(move || {
            let mut guard = store.blocking_lock();
            f(&mut **guard)
        })
        .await
        .map_err(|e| PersistError::Message(format!("join error: {e}")))
        .and_then(|inner| inner);

        result.map_err(|err| {
            warn!(op, error = %err, "store call failed");
            RuntimeError::from(err)
        })
    }

    fn emit(&self, event: LedgerEvent) {
        let _ = self.events_tx.send(event);
    }
}
