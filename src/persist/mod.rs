//! Record store contract shared by every backend.

pub mod adapter;
pub mod memory;
pub mod sqlite;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::types::{Collection, Version};

/// A stored row: a JSON object keyed by field name, always carrying `id`.
pub type Row = Map<String, Value>;

/// Field holding the row identifier.
pub const ID_FIELD: &str = "id";
/// Field holding the store-managed concurrency token.
pub const VERSION_FIELD: &str = "version";

/// Record store failures.
#[derive(Debug, Error)]
pub enum PersistError {
    /// SQLite driver error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Row could not be encoded or decoded.
    #[error("row encoding error: {0}")]
    Serde(#[from] serde_json::Error),
    /// No row with this id.
    #[error("{collection} row {id} not found")]
    NotFound {
        /// Collection searched.
        collection: Collection,
        /// Missing id.
        id: String,
    },
    /// Insert with an id already stored.
    #[error("{collection} row {id} already exists")]
    Duplicate {
        /// Collection written to.
        collection: Collection,
        /// Clashing id.
        id: String,
    },
    /// Patch carried a stale version.
    #[error("{collection} row {id} was modified concurrently (expected version {expected}, found {found})")]
    Conflict {
        /// Collection written to.
        collection: Collection,
        /// Row id.
        id: String,
        /// Version the caller last saw.
        expected: Version,
        /// Version in the store.
        found: Version,
    },
    /// Row lacks a non-empty string id.
    #[error("row has no string `id` field")]
    MissingId,
    /// Anything else.
    #[error("{0}")]
    Message(String),
}

/// Result alias for store calls.
pub type PersistResult<T> = Result<T, PersistError>;

/// Generic record store reachable through four verbs per collection.
///
/// Implementations are blocking; the runtime calls them off the async
/// executor.
pub trait RecordStore: Send {
    /// Every row in `collection`, newest first.
    fn select_all(&self, collection: Collection) -> PersistResult<Vec<Row>>;
    /// Stores `row` and returns it as persisted. Duplicate ids are rejected.
    fn insert(&mut self, collection: Collection, row: Row) -> PersistResult<Row>;
    /// Merges `patch` into the row with `id` and returns the result.
    ///
    /// A `version` key in the patch must equal the stored version.
    fn update(&mut self, collection: Collection, id: &str, patch: Row) -> PersistResult<Row>;
    /// Removes the row with `id`.
    fn delete(&mut self, collection: Collection, id: &str) -> PersistResult<()>;
}

/// The row's `id`, which must be a non-empty string.
pub fn row_id(row: &Row) -> PersistResult<String> {
    row.get(ID_FIELD)
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or(PersistError::MissingId)
}

/// The row's version, 0 when absent.
pub fn row_version(row: &Row) -> Version {
    row.get(VERSION_FIELD).and_then(Value::as_u64).unwrap_or(0)
}

/// Stamps the initial version on a row about to be inserted.
pub fn prepare_insert(mut row: Row) -> PersistResult<(String, Row)> {
    let id = row_id(&row)?;
    row.insert(VERSION_FIELD.to_string(), Value::from(1u64));
    Ok((id, row))
}

/// Merges `patch` over `current`, checking and bumping the version.
///
/// The `id` field is never rewritten by a patch.
pub fn merge_patch(collection: Collection, id: &str, mut current: Row, patch: Row) -> PersistResult<Row> {
    let found = row_version(&current);
    if let Some(expected) = patch.get(VERSION_FIELD).and_then(Value::as_u64) {
        if expected != found {
            return Err(PersistError::Conflict {
                collection,
                id: id.to_string(),
                expected,
                found,
            });
        }
    }

    for (key, value) in patch {
        if key == ID_FIELD || key == VERSION_FIELD {
            continue;
        }
        current.insert(key, value);
    }
    current.insert(VERSION_FIELD.to_string(), Value::from(found + 1));
    Ok(current)
}

/// Encodes a record as a row; anything but a JSON object is refused.
pub fn to_row<T: Serialize>(value: &T) -> PersistResult<Row> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(PersistError::Message(format!(
            "expected an object row, got {other}"
        ))),
    }
}

/// Decodes a row into a record.
pub fn from_row<T: DeserializeOwned>(row: Row) -> PersistResult<T> {
    Ok(serde_json::from_value(Value::Object(row))?)
}
