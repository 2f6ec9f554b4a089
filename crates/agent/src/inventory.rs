//! Inventory stage: pure local availability check, no model involvement.

use tracing::info;

use pantry_core::domain::inventory::{InventoryFile, InventoryResult};
use pantry_core::domain::meal::MealPlan;

#[derive(Clone, Copy, Debug, Default)]
pub struct InventoryStage;

impl InventoryStage {
    /// Partitions the plan's distinct ingredient set against the inventory.
    /// The inventory file itself is loaded (and required to exist) by the
    /// coordinator; there is no safe default for a missing file.
    pub fn run(&self, plan: &MealPlan, inventory: &InventoryFile) -> InventoryResult {
        let result = InventoryResult::partition(plan.distinct_ingredients(), inventory);
        info!(
            event_name = "agent.inventory.partitioned",
            available = result.available.len(),
            missing = result.missing.len(),
            "inventory availability computed"
        );
        result
    }
}
