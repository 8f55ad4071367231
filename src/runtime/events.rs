//! Runtime event stream payloads.

use crate::types::{BorrowId, ItemId};

/// Events emitted from the single-writer runtime loop after a change has been
/// stored and mirrored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerEvent {
    /// Both collections were replaced from the store.
    Reloaded {
        /// Items now mirrored.
        items: usize,
        /// Borrow records now mirrored.
        records: usize,
    },
    /// An item was added.
    ItemAdded {
        /// New item id.
        id: ItemId,
    },
    /// An item was edited.
    ItemUpdated {
        /// Edited item id.
        id: ItemId,
    },
    /// An item was deleted.
    ItemRemoved {
        /// Deleted item id.
        id: ItemId,
    },
    /// A loan was opened.
    Borrowed {
        /// New record id.
        id: BorrowId,
        /// Item lent.
        item_id: ItemId,
    },
    /// A loan was closed.
    Returned {
        /// Closed record id.
        id: BorrowId,
    },
    /// A CSV import finished.
    Imported {
        /// Rows stored.
        added: usize,
        /// Rows not stored.
        failed: usize,
    },
}
