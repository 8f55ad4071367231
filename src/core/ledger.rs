use hashbrown::HashMap;
use thiserror::Error;

use crate::{
    borrow::BorrowRecord,
    item::InventoryItem,
    types::{BorrowId, ItemId},
};

use super::indices::VecIndex;

/// Mirror-level refusals.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// No item with this id.
    #[error("unknown inventory item {0}")]
    MissingItem(ItemId),
    /// No record with this id.
    #[error("unknown borrow record {0}")]
    MissingRecord(BorrowId),
    /// Item id already mirrored.
    #[error("inventory item {0} already exists")]
    ItemExists(ItemId),
    /// Record id already mirrored.
    #[error("borrow record {0} already exists")]
    RecordExists(BorrowId),
    /// Removal refused while units are out.
    #[error("inventory item {id} has {active} unit(s) on active loan")]
    ItemOnLoan {
        /// Item that was to be removed.
        id: ItemId,
        /// Units still out.
        active: u64,
    },
}

/// Local mirror of the `inventory` and `borrow_log` collections.
///
/// Both collections keep insertion order internally and are exposed newest
/// first, matching how freshly created rows are shown ahead of loaded ones.
#[derive(Debug, Default, Clone)]
pub struct Ledger {
    items: HashMap<ItemId, InventoryItem>,
    item_order: Vec<ItemId>,
    records: HashMap<BorrowId, BorrowRecord>,
    record_order: Vec<BorrowId>,
    by_item: VecIndex<ItemId, BorrowId>,
}

impl Ledger {
    /// Empty mirror.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a mirror from rows listed newest first. Repeated ids keep the
    /// first occurrence.
    pub fn from_collections(items: Vec<InventoryItem>, records: Vec<BorrowRecord>) -> Self {
        let mut ledger = Self::new();
        ledger.replace_inventory(items);
        ledger.replace_borrow_log(records);
        ledger
    }

    /// Swaps in a freshly loaded inventory, newest first.
    pub fn replace_inventory(&mut self, items: Vec<InventoryItem>) {
        self.items.clear();
        self.item_order.clear();
        for item in items.into_iter().rev() {
            if self.items.contains_key(&item.id) {
                if let Some(pos) = self.item_order.iter().position(|id| *id == item.id) {
                    self.item_order.remove(pos);
                }
            }
            self.item_order.push(item.id.clone());
            self.items.insert(item.id.clone(), item);
        }
    }

    /// Swaps in a freshly loaded borrow log, newest first, and rebuilds the
    /// per-item index.
    pub fn replace_borrow_log(&mut self, records: Vec<BorrowRecord>) {
        self.records.clear();
        self.record_order.clear();
        self.by_item.clear();
        for rec in records.into_iter().rev() {
            if let Some(old) = self.records.remove(&rec.id) {
                Self::remove_from_vec_index(self.by_item.entry(old.inventory_id).or_default(), &rec.id);
                if let Some(pos) = self.record_order.iter().position(|id| *id == rec.id) {
                    self.record_order.remove(pos);
                }
            }
            self.index_record(&rec);
            self.record_order.push(rec.id.clone());
            self.records.insert(rec.id.clone(), rec);
        }
    }

    /// Adds a stored item ahead of the existing ones.
    pub fn prepend_item(&mut self, item: InventoryItem) -> Result<(), LedgerError> {
        if self.items.contains_key(&item.id) {
            return Err(LedgerError::ItemExists(item.id));
        }
        self.item_order.push(item.id.clone());
        self.items.insert(item.id.clone(), item);
        Ok(())
    }

    /// Overwrites an item in place.
    pub fn replace_item(&mut self, item: InventoryItem) -> Result<(), LedgerError> {
        let slot = self
            .items
            .get_mut(&item.id)
            .ok_or_else(|| LedgerError::MissingItem(item.id.clone()))?;
        *slot = item;
        Ok(())
    }

    /// Drops an item; its records stay.
    pub fn remove_item(&mut self, id: &str) -> Result<InventoryItem, LedgerError> {
        let item = self
            .items
            .remove(id)
            .ok_or_else(|| LedgerError::MissingItem(id.to_string()))?;
        if let Some(pos) = self.item_order.iter().position(|x| x == id) {
            self.item_order.remove(pos);
        }
        Ok(item)
    }

    /// Refuses removal of unknown items and of items with units on loan.
    pub fn check_removable(&self, id: &str) -> Result<(), LedgerError> {
        if !self.items.contains_key(id) {
            return Err(LedgerError::MissingItem(id.to_string()));
        }
        let active = super::availability::borrowed_quantity(self, id);
        if active > 0 {
            return Err(LedgerError::ItemOnLoan {
                id: id.to_string(),
                active,
            });
        }
        Ok(())
    }

    /// Adds a stored record ahead of the existing ones.
    pub fn prepend_record(&mut self, rec: BorrowRecord) -> Result<(), LedgerError> {
        if self.records.contains_key(&rec.id) {
            return Err(LedgerError::RecordExists(rec.id));
        }
        self.index_record(&rec);
        self.record_order.push(rec.id.clone());
        self.records.insert(rec.id.clone(), rec);
        Ok(())
    }

    /// Overwrites a record in place, re-indexing if its item changed.
    pub fn replace_record(&mut self, rec: BorrowRecord) -> Result<(), LedgerError> {
        let slot = self
            .records
            .get_mut(&rec.id)
            .ok_or_else(|| LedgerError::MissingRecord(rec.id.clone()))?;
        let old_item = std::mem::replace(slot, rec.clone()).inventory_id;

        if old_item != rec.inventory_id {
            Self::remove_from_vec_index(self.by_item.entry(old_item).or_default(), &rec.id);
            self.index_record(&rec);
        }
        Ok(())
    }

    /// Item by id.
    pub fn item(&self, id: &str) -> Option<&InventoryItem> {
        self.items.get(id)
    }

    /// Record by id.
    pub fn record(&self, id: &str) -> Option<&BorrowRecord> {
        self.records.get(id)
    }

    /// Items, newest first.
    pub fn items(&self) -> impl Iterator<Item = &InventoryItem> {
        self.item_order
            .iter()
            .rev()
            .filter_map(|id| self.items.get(id))
    }

    /// Borrow records, newest first.
    pub fn records(&self) -> impl Iterator<Item = &BorrowRecord> {
        self.record_order
            .iter()
            .rev()
            .filter_map(|id| self.records.get(id))
    }

    /// Every record referencing `item_id`, open or closed.
    pub fn records_for_item(&self, item_id: &str) -> Vec<&BorrowRecord> {
        self.by_item
            .get(item_id)
            .into_iter()
            .flat_map(|ids| ids.iter())
            .filter_map(|id| self.records.get(id))
            .collect()
    }

    /// Number of items.
    pub fn item_len(&self) -> usize {
        self.items.len()
    }

    /// Number of records.
    pub fn record_len(&self) -> usize {
        self.records.len()
    }

    fn index_record(&mut self, rec: &BorrowRecord) {
        self.by_item
            .entry(rec.inventory_id.clone())
            .or_default()
            .push(rec.id.clone());
    }

    fn remove_from_vec_index(v: &mut Vec<BorrowId>, id: &str) {
        if let Some(pos) = v.iter().position(|x| x == id) {
            v.remove(pos);
        }
    }
}
