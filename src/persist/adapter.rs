//! Typed views of the `inventory` and `borrow_log` collections.

use std::marker::PhantomData;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
    borrow::BorrowRecord,
    item::InventoryItem,
    types::{Collection, Version},
};

use super::{PersistResult, RecordStore, VERSION_FIELD, from_row, to_row};

/// A record type living in one store collection.
pub trait StoredRecord: Serialize + DeserializeOwned {
    /// Collection holding this type.
    const COLLECTION: Collection;
}

impl StoredRecord for InventoryItem {
    const COLLECTION: Collection = Collection::Inventory;
}

impl StoredRecord for BorrowRecord {
    const COLLECTION: Collection = Collection::BorrowLog;
}

/// CRUD over one collection, decoding rows into `T`.
pub struct CollectionAdapter<'a, T> {
    store: &'a mut dyn RecordStore,
    _record: PhantomData<T>,
}

/// Inventory Store Adapter.
pub type InventoryAdapter<'a> = CollectionAdapter<'a, InventoryItem>;
/// Borrow Ledger Adapter.
pub type BorrowLedgerAdapter<'a> = CollectionAdapter<'a, BorrowRecord>;

impl<'a, T: StoredRecord> CollectionAdapter<'a, T> {
    /// Wraps `store` for this record type.
    pub fn new(store: &'a mut dyn RecordStore) -> Self {
        Self {
            store,
            _record: PhantomData,
        }
    }

    /// All records, newest first.
    pub fn select_all(&self) -> PersistResult<Vec<T>> {
        self.store
            .select_all(T::COLLECTION)?
            .into_iter()
            .map(from_row)
            .collect()
    }

    /// Inserts `value` and returns it as stored.
    pub fn insert(&mut self, value: &T) -> PersistResult<T> {
        let row = self.store.insert(T::COLLECTION, to_row(value)?)?;
        from_row(row)
    }

    /// Sends the set fields of `patch`; `expected` pins the stored version.
    pub fn update<P: Serialize>(
        &mut self,
        id: &str,
        patch: &P,
        expected: Option<Version>,
    ) -> PersistResult<T> {
        let mut row = to_row(patch)?;
        if let Some(version) = expected {
            row.insert(VERSION_FIELD.to_string(), Value::from(version));
        }
        let row = self.store.update(T::COLLECTION, id, row)?;
        from_row(row)
    }

    /// Deletes one record by id.
    pub fn delete(&mut self, id: &str) -> PersistResult<()> {
        self.store.delete(T::COLLECTION, id)
    }
}
