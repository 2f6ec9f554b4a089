use serde::{Deserialize, Serialize};

use crate::domain::meal::dedup_case_insensitive;

/// One pantry record from the inventory reference file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(default, alias = "Quantity")]
    pub quantity: u32,
    #[serde(default, alias = "Expiry")]
    pub expiry: Option<String>,
}

/// The inventory reference file: `{ "items": [ {name, quantity, expiry?} ] }`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryFile {
    #[serde(default, alias = "Items")]
    pub items: Vec<InventoryItem>,
}

impl InventoryFile {
    pub fn contains(&self, ingredient: &str) -> bool {
        self.items.iter().any(|item| item.name.eq_ignore_ascii_case(ingredient))
    }
}

/// Partition of a plan's ingredient set against the inventory.
///
/// Invariant: `available` and `missing` are disjoint and together cover the
/// distinct ingredient set exactly.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryResult {
    pub available: Vec<String>,
    pub missing: Vec<String>,
}

impl InventoryResult {
    pub fn partition(
        ingredients: impl IntoIterator<Item = String>,
        inventory: &InventoryFile,
    ) -> Self {
        let mut available = Vec::new();
        let mut missing = Vec::new();
        for ingredient in dedup_case_insensitive(ingredients) {
            if inventory.contains(&ingredient) {
                available.push(ingredient);
            } else {
                missing.push(ingredient);
            }
        }
        Self { available, missing }
    }
}
