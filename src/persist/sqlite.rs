//! SQLite-backed record store.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};

use crate::types::Collection;

use super::{
    PersistError, PersistResult, RecordStore, Row, merge_patch, prepare_insert, row_version,
};

/// SQLite implementation of [`crate::persist::RecordStore`].
///
/// Each collection is a table of `(seq, id, version, payload)` where
/// `payload` is the full row as JSON.
pub struct SqliteRecordStore {
    conn: Connection,
}

impl SqliteRecordStore {
    /// Opens or creates a SQLite-backed store at `path`.
    ///
    /// Enables WAL mode and sets `synchronous=NORMAL`.
    pub fn open(path: impl AsRef<Path>) -> PersistResult<Self> {
        let conn = Connection::open(path)?;
        Self::init_connection(conn)
    }

    /// Opens an in-memory SQLite store.
    pub fn open_in_memory() -> PersistResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_connection(conn)
    }

    fn init_connection(conn: Connection) -> PersistResult<Self> {
        conn.execute_batch(include_str!("schema.sql"))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(Self { conn })
    }

    fn load_row(conn: &Connection, collection: Collection, id: &str) -> PersistResult<Option<Row>> {
        let payload: Option<String> = conn
            .query_row(
                &format!("SELECT payload FROM {} WHERE id = ?1", collection.name()),
                params![id],
                |row| row.get(0),
            )
            .optional()?;

        payload
            .map(|text| serde_json::from_str::<Row>(&text).map_err(PersistError::from))
            .transpose()
    }
}

impl RecordStore for SqliteRecordStore {
    fn select_all(&self, collection: Collection) -> PersistResult<Vec<Row>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT payload FROM {} ORDER BY seq DESC",
            collection.name()
        ))?;
        let payloads = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut out = Vec::new();
        for payload in payloads {
            out.push(serde_json::from_str::<Row>(&payload?)?);
        }
        Ok(out)
    }

    fn insert(&mut self, collection: Collection, row: Row) -> PersistResult<Row> {
        let (id, row) = prepare_insert(row)?;
        let tx = self.conn.transaction()?;
        if Self::load_row(&tx, collection, &id)?.is_some() {
            return Err(PersistError::Duplicate { collection, id });
        }
        tx.execute(
            &format!(
                "INSERT INTO {}(id, version, payload) VALUES (?1, ?2, ?3)",
                collection.name()
            ),
            params![id, row_version(&row) as i64, serde_json::to_string(&row)?],
        )?;
        tx.commit()?;
        Ok(row)
    }

    fn update(&mut self, collection: Collection, id: &str, patch: Row) -> PersistResult<Row> {
        let tx = self.conn.transaction()?;
        let current = Self::load_row(&tx, collection, id)?.ok_or_else(|| PersistError::NotFound {
            collection,
            id: id.to_string(),
        })?;
        let found = row_version(&current);
        let merged = merge_patch(collection, id, current, patch)?;

        let changed = tx.execute(
            &format!(
                "UPDATE {} SET version = ?1, payload = ?2 WHERE id = ?3 AND version = ?4",
                collection.name()
            ),
            params![
                row_version(&merged) as i64,
                serde_json::to_string(&merged)?,
                id,
                found as i64,
            ],
        )?;
        if changed == 0 {
            return Err(PersistError::Conflict {
                collection,
                id: id.to_string(),
                expected: found,
                found: found + 1,
            });
        }
        tx.commit()?;
        Ok(merged)
    }

    fn delete(&mut self, collection: Collection, id: &str) -> PersistResult<()> {
        let count = self.conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", collection.name()),
            params![id],
        )?;
        if count == 0 {
            return Err(PersistError::NotFound {
                collection,
                id: id.to_string(),
            });
        }
        Ok(())
    }
}
