use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::budget::BudgetResult;
use crate::domain::inventory::InventoryResult;
use crate::domain::meal::MealPlan;
use crate::domain::shopping::ShoppingResult;

/// Aggregate returned to the caller after one pipeline invocation.
///
/// Stages that did not run (because an earlier stage failed fatally) stay
/// `None`; the `steps` and `errors` logs record what happened either way, so
/// a caller always receives a populated result object rather than a bare
/// error.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationResult {
    pub correlation_id: String,
    #[serde(rename = "mealPlan")]
    pub meal_plan: Option<MealPlan>,
    pub inventory: Option<InventoryResult>,
    pub budget: Option<BudgetResult>,
    pub shopping: Option<ShoppingResult>,
    pub steps: Vec<StepEntry>,
    pub errors: Vec<String>,
}

/// One human-readable step log entry with its wall-clock timestamp.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepEntry {
    pub at: DateTime<Utc>,
    pub message: String,
}

impl OrchestrationResult {
    pub fn new(correlation_id: impl Into<String>) -> Self {
        Self { correlation_id: correlation_id.into(), ..Self::default() }
    }

    pub fn record_step(&mut self, message: impl Into<String>) {
        self.steps.push(StepEntry { at: Utc::now(), message: message.into() });
    }

    pub fn record_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }
}
