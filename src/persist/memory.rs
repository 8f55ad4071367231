//! Record store held entirely in process memory.

use hashbrown::HashMap;

use crate::types::Collection;

use super::{PersistError, PersistResult, RecordStore, Row, merge_patch, prepare_insert, row_id};

/// In-memory implementation of [`crate::persist::RecordStore`].
///
/// Rows are kept in insertion order per collection.
#[derive(Debug, Default, Clone)]
pub struct MemoryRecordStore {
    tables: HashMap<Collection, Vec<Row>>,
}

impl MemoryRecordStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows in `collection`.
    pub fn len(&self, collection: Collection) -> usize {
        self.tables.get(&collection).map_or(0, Vec::len)
    }

    fn position(&self, collection: Collection, id: &str) -> Option<usize> {
        self.tables
            .get(&collection)?
            .iter()
            .position(|row| row_id(row).is_ok_and(|rid| rid == id))
    }
}

impl RecordStore for MemoryRecordStore {
    fn select_all(&self, collection: Collection) -> PersistResult<Vec<Row>> {
        Ok(self
            .tables
            .get(&collection)
            .map(|rows| rows.iter().rev().cloned().collect())
            .unwrap_or_default())
    }

    fn insert(&mut self, collection: Collection, row: Row) -> PersistResult<Row> {
        let (id, row) = prepare_insert(row)?;
        if self.position(collection, &id).is_some() {
            return Err(PersistError::Duplicate { collection, id });
        }
        self.tables.entry(collection).or_default().push(row.clone());
        Ok(row)
    }

    fn update(&mut self, collection: Collection, id: &str, patch: Row) -> PersistResult<Row> {
        let pos = self
            .position(collection, id)
            .ok_or_else(|| PersistError::NotFound {
                collection,
                id: id.to_string(),
            })?;
        let rows = self.tables.entry(collection).or_default();
        let merged = merge_patch(collection, id, rows[pos].clone(), patch)?;
        rows[pos] = merged.clone();
        Ok(merged)
    }

    fn delete(&mut self, collection: Collection, id: &str) -> PersistResult<()> {
        let pos = self
            .position(collection, id)
            .ok_or_else(|| PersistError::NotFound {
                collection,
                id: id.to_string(),
            })?;
        self.tables.entry(collection).or_default().remove(pos);
        Ok(())
    }
}
