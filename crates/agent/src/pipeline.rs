//! Per-request pipeline coordinator.
//!
//! Sequences plan -> inventory -> budget -> shopping, passing the typed
//! output of each stage into the next. Reference data is loaded fresh per
//! request; nothing mutable is shared across concurrent requests. A stage
//! failure records a log entry and returns the best-available partial
//! result instead of aborting the request.

use tracing::{error, info};
use uuid::Uuid;

use pantry_core::config::AppConfig;
use pantry_core::domain::request::MealRequest;
use pantry_core::domain::result::OrchestrationResult;
use pantry_core::reference::{
    load_inventory, load_price_book, resolve_reference_file, INVENTORY_FILE_NAME,
    PRICE_FILE_NAME,
};

use crate::budget::BudgetStage;
use crate::inventory::InventoryStage;
use crate::llm::ModelClient;
use crate::plan::PlanStage;
use crate::retry::RetryController;
use crate::shopping::ShoppingStage;

#[derive(Clone, Debug)]
pub struct Pipeline {
    config: AppConfig,
}

impl Pipeline {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub async fn run(&self, model: &dyn ModelClient, request: &MealRequest) -> OrchestrationResult {
        let correlation_id = Uuid::new_v4().to_string();
        let mut result = OrchestrationResult::new(correlation_id.clone());
        info!(
            event_name = "pipeline.request.started",
            correlation_id = %correlation_id,
            description = %request.description,
            "pipeline started"
        );

        let retry = RetryController::new(self.config.pipeline.max_attempts);

        // Plan
        let plan_outcome = match PlanStage::new(retry).run(model, request).await {
            Ok(outcome) => outcome,
            Err(stage_error) => {
                error!(
                    event_name = "pipeline.plan.failed",
                    correlation_id = %correlation_id,
                    reason = %stage_error,
                    "plan stage failed"
                );
                result.record_error(format!("Meal planner error: {stage_error}"));
                return result;
            }
        };
        if let Some(note) = &plan_outcome.note {
            result.record_error(note.clone());
        }
        result.record_step(format!(
            "Meal planner returned {} meal(s){}",
            plan_outcome.plan.meals.len(),
            if plan_outcome.degraded { " (degraded)" } else { "" }
        ));
        let plan = plan_outcome.plan;

        // Inventory: fatal if the reference file cannot be loaded, since a
        // missing file is indistinguishable from an empty pantry.
        let reference_dir = self.config.pipeline.reference_dir.as_deref();
        let inventory_path = resolve_reference_file(INVENTORY_FILE_NAME, reference_dir);
        let inventory_file = match load_inventory(inventory_path.as_deref()) {
            Ok(file) => file,
            Err(reference_error) => {
                error!(
                    event_name = "pipeline.inventory.reference_missing",
                    correlation_id = %correlation_id,
                    reason = %reference_error,
                    "inventory reference data unavailable"
                );
                result.meal_plan = Some(plan);
                result.record_error(format!("Inventory error: {reference_error}"));
                return result;
            }
        };
        let inventory = InventoryStage.run(&plan, &inventory_file);
        result.record_step(format!(
            "Inventory check returned {} available / {} missing",
            inventory.available.len(),
            inventory.missing.len()
        ));
        result.meal_plan = Some(plan);

        // Budget: prices degrade to the configured default when absent.
        let price_path = resolve_reference_file(PRICE_FILE_NAME, reference_dir);
        let price_book = load_price_book(price_path.as_deref());
        result.record_step(if price_book.is_empty() {
            "Price book unavailable; default prices in use".to_string()
        } else {
            format!("Price book loaded with {} entries", price_book.len())
        });

        let budget_stage = BudgetStage::new(
            retry,
            request.budget.unwrap_or(self.config.pipeline.budget_ceiling),
            self.config.pipeline.default_item_price,
        );
        let budget = match budget_stage.run(model, &inventory.available, &price_book).await {
            Ok(budget) => budget,
            Err(stage_error) => {
                result.inventory = Some(inventory);
                result.record_error(format!("Budget error: {stage_error}"));
                return result;
            }
        };
        result.inventory = Some(inventory);
        result.record_step(format!(
            "Budget stage returned {} item(s) totaling {}",
            budget.items.len(),
            budget.total_cost
        ));

        // Shopping
        let shopping = match ShoppingStage::new(retry).run(model, &budget.items).await {
            Ok(shopping) => shopping,
            Err(stage_error) => {
                result.budget = Some(budget);
                result.record_error(format!("Shopper error: {stage_error}"));
                return result;
            }
        };
        result.budget = Some(budget);
        result.record_step(format!(
            "Shopper returned descriptions for {} item(s)",
            shopping.categorized_items.len()
        ));
        result.shopping = Some(shopping);

        info!(
            event_name = "pipeline.request.completed",
            correlation_id = %correlation_id,
            steps = result.steps.len(),
            errors = result.errors.len(),
            "pipeline completed"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use rust_decimal::Decimal;

    use pantry_core::config::AppConfig;
    use pantry_core::domain::request::MealRequest;

    use crate::llm::ScriptedModel;

    use super::Pipeline;

    const PLAN_JSON: &str = r#"{"meals":[{"name":"Fried rice","ingredients":["egg","rice","saffron"],"notes":"weeknight"}]}"#;

    fn write_reference_files(dir: &Path) {
        fs::write(dir.join("prices.json"), r#"{ "egg": 0.2, "rice": 1.0, "saffron": 90.0 }"#)
            .expect("write prices");
        fs::write(
            dir.join("inventory.json"),
            r#"{ "items": [ { "name": "egg", "quantity": 6 }, { "name": "rice", "quantity": 2 } ] }"#,
        )
        .expect("write inventory");
    }

    fn config_with_reference_dir(dir: &Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.pipeline.reference_dir = Some(dir.to_path_buf());
        config
    }

    #[tokio::test]
    async fn full_run_within_budget_skips_the_budget_model_call() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_reference_files(dir.path());

        let model = ScriptedModel::new([
            PLAN_JSON,
            r#"{"categorizedItems":{"egg":"Fresh eggs.","rice":"Long-grain rice."}}"#,
        ]);
        let pipeline = Pipeline::new(config_with_reference_dir(dir.path()));

        let result = pipeline.run(&model, &MealRequest::new("weeknight dinners")).await;

        // Plan + shopping batch only; the in-budget path never asks the model.
        assert_eq!(model.calls(), 2);
        assert!(result.errors.is_empty());

        let plan = result.meal_plan.expect("plan");
        assert_eq!(plan.meals.len(), 1);

        let inventory = result.inventory.expect("inventory");
        assert_eq!(inventory.available, vec!["egg".to_string(), "rice".to_string()]);
        assert_eq!(inventory.missing, vec!["saffron".to_string()]);

        let budget = result.budget.expect("budget");
        assert_eq!(budget.total_cost, Decimal::new(12, 1));
        assert_eq!(budget.note, "Within budget - no changes needed");

        let shopping = result.shopping.expect("shopping");
        assert_eq!(shopping.categorized_items.len(), 2);
    }

    #[tokio::test]
    async fn over_budget_requests_adjustment_and_recomputes_the_total() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_reference_files(dir.path());

        let model = ScriptedModel::new([
            r#"{"meals":[{"name":"Paella","ingredients":["egg","saffron"],"notes":""}]}"#,
            r#"{"items":["egg","rice"],"totalCost":999.0,"note":"Removed saffron"}"#,
            r#"{"categorizedItems":{"egg":"Fresh eggs.","rice":"Long-grain rice."}}"#,
        ]);

        let mut config = config_with_reference_dir(dir.path());
        config.pipeline.budget_ceiling = Decimal::new(10, 0);
        // Inventory has both egg and saffron available for this request.
        fs::write(
            dir.path().join("inventory.json"),
            r#"{ "items": [ { "name": "egg", "quantity": 6 }, { "name": "saffron", "quantity": 1 } ] }"#,
        )
        .expect("write inventory");

        let result = Pipeline::new(config).run(&model, &MealRequest::new("paella night")).await;

        assert_eq!(model.calls(), 3);
        let budget = result.budget.expect("budget");
        assert_eq!(budget.items, vec!["egg".to_string(), "rice".to_string()]);
        // 0.2 + 1.0, never the model's claimed 999.0.
        assert_eq!(budget.total_cost, Decimal::new(12, 1));
    }

    #[tokio::test]
    async fn corrupt_inventory_is_fatal_but_returns_the_partial_result() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("prices.json"), r#"{ "egg": 0.2 }"#).expect("write prices");
        fs::write(dir.path().join("inventory.json"), "definitely not json").expect("write");

        let model = ScriptedModel::new([PLAN_JSON]);
        let pipeline = Pipeline::new(config_with_reference_dir(dir.path()));

        let result = pipeline.run(&model, &MealRequest::new("anything")).await;

        assert_eq!(model.calls(), 1);
        assert!(result.meal_plan.is_some());
        assert!(result.inventory.is_none());
        assert!(result.budget.is_none());
        assert!(result.shopping.is_none());
        assert!(result.errors.iter().any(|message| message.starts_with("Inventory error:")));
    }

    #[tokio::test]
    async fn per_request_budget_overrides_the_configured_ceiling() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_reference_files(dir.path());

        let model = ScriptedModel::new([
            PLAN_JSON,
            r#"{"items":["egg"],"totalCost":0.2,"note":"Trimmed to fit"}"#,
            r#"{"categorizedItems":{"egg":"Fresh eggs."}}"#,
        ]);

        let mut request = MealRequest::new("frugal week");
        request.budget = Some(Decimal::new(1, 0));

        let result =
            Pipeline::new(config_with_reference_dir(dir.path())).run(&model, &request).await;

        // available = egg + rice -> 1.2 > 1.0 budget, so the model is asked.
        assert_eq!(model.calls(), 3);
        let budget = result.budget.expect("budget");
        assert_eq!(budget.items, vec!["egg".to_string()]);
        assert_eq!(budget.total_cost, Decimal::new(2, 1));
    }
}
