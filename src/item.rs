//! Inventory item record, draft, and patch types.

use serde::{Deserialize, Serialize};

use crate::types::{ItemId, Version};

/// Category used when a quick-add leaves it blank.
pub const DEFAULT_CATEGORY: &str = "Accessory";

/// Catalog entry for a stock of identical costume units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    /// Stable item identifier.
    pub id: ItemId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Category, e.g. `Accessory` or `Dress`.
    #[serde(default)]
    pub category: String,
    /// Size label.
    #[serde(default)]
    pub size: String,
    /// Color label.
    #[serde(default)]
    pub color: String,
    /// Total owned units.
    #[serde(default)]
    pub quantity: u32,
    /// Physical condition.
    #[serde(default)]
    pub condition: String,
    /// Storage location.
    #[serde(default)]
    pub location: String,
    /// Free text.
    #[serde(default)]
    pub notes: String,
    /// Store-managed concurrency token.
    #[serde(default)]
    pub version: Version,
}

/// Insert payload used to create a new [`InventoryItem`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ItemDraft {
    /// Identifier to keep; a fresh one is generated when `None`.
    pub id: Option<ItemId>,
    /// Display name.
    pub name: String,
    /// Category.
    pub category: String,
    /// Size label.
    pub size: String,
    /// Color label.
    pub color: String,
    /// Total owned units.
    pub quantity: u32,
    /// Physical condition.
    pub condition: String,
    /// Storage location.
    pub location: String,
    /// Free text.
    pub notes: String,
}

impl ItemDraft {
    /// Quick-add draft: one free-size unit in good condition, kept in storage.
    pub fn quick(name: impl Into<String>, category: Option<&str>) -> Self {
        let category = category
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CATEGORY);
        Self {
            id: None,
            name: name.into(),
            category: category.to_string(),
            size: "Free".to_string(),
            color: String::new(),
            quantity: 1,
            condition: "Good".to_string(),
            location: "Storage".to_string(),
            notes: String::new(),
        }
    }

    /// Materializes the draft under `id`.
    pub fn into_item(self, id: ItemId) -> InventoryItem {
        InventoryItem {
            id,
            name: self.name,
            category: self.category,
            size: self.size,
            color: self.color,
            quantity: self.quantity,
            condition: self.condition,
            location: self.location,
            notes: self.notes,
            version: 0,
        }
    }
}

/// Sparse patch where each `Some` field overwrites the item value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ItemPatch {
    /// Optional replacement for name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Optional replacement for category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Optional replacement for size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    /// Optional replacement for color.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Optional replacement for quantity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    /// Optional replacement for condition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Optional replacement for location.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Optional replacement for notes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl ItemPatch {
    /// Applies this patch in place to `item`.
    pub fn apply_to(&self, item: &mut InventoryItem) {
        if let Some(v) = &self.name {
            item.name = v.clone();
        }
        if let Some(v) = &self.category {
            item.category = v.clone();
        }
        if let Some(v) = &self.size {
            item.size = v.clone();
        }
        if let Some(v) = &self.color {
            item.color = v.clone();
        }
        if let Some(v) = self.quantity {
            item.quantity = v;
        }
        if let Some(v) = &self.condition {
            item.condition = v.clone();
        }
        if let Some(v) = &self.location {
            item.location = v.clone();
        }
        if let Some(v) = &self.notes {
            item.notes = v.clone();
        }
    }
}
