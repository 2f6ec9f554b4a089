//! Budget stage: local total first, model substitutions only when over
//! budget, and the model's reported total always replaced by a local
//! recomputation.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, warn};

use pantry_core::domain::budget::BudgetResult;
use pantry_core::pricing::{recompute_total, PriceBook};

use crate::llm::ModelClient;
use crate::retry::{RetryController, RetryError};
use crate::validate::{Field, Schema};

const SYSTEM_PROMPT: &str = "You are an assistant whose ONLY allowed output is a single valid \
JSON object matching this schema: { \"items\": [ string ], \"totalCost\": number, \"note\": \
string }. Do not output any text, explanation, markup, or extra keys. Always use double quotes.";

pub const WITHIN_BUDGET_NOTE: &str = "Within budget - no changes needed";

pub fn budget_schema() -> Schema {
    Schema::new([
        Field::string_array("items").non_empty(),
        Field::number("totalCost"),
        Field::string("note"),
    ])
}

#[derive(Debug, Deserialize)]
struct BudgetWire {
    items: Vec<String>,
    #[serde(rename = "totalCost")]
    total_cost: f64,
    note: String,
}

#[derive(Clone, Debug)]
pub struct BudgetStage {
    retry: RetryController,
    ceiling: Decimal,
    default_price: Decimal,
}

impl BudgetStage {
    pub fn new(retry: RetryController, ceiling: Decimal, default_price: Decimal) -> Self {
        Self { retry, ceiling, default_price }
    }

    pub async fn run(
        &self,
        model: &dyn ModelClient,
        items: &[String],
        book: &PriceBook,
    ) -> Result<BudgetResult, anyhow::Error> {
        let total = recompute_total(items, book, self.default_price);

        if total <= self.ceiling {
            info!(
                event_name = "agent.budget.within_budget",
                total = %total,
                ceiling = %self.ceiling,
                "no adjustment needed"
            );
            return Ok(BudgetResult {
                items: items.to_vec(),
                total_cost: total,
                note: WITHIN_BUDGET_NOTE.to_string(),
            });
        }

        let prompt = self.adjustment_prompt(items, total, book);
        match self.retry.run(model, SYSTEM_PROMPT, &prompt, &budget_schema()).await {
            Ok(object) => {
                let wire: BudgetWire = serde_json::from_value(serde_json::Value::Object(object))
                    .map_err(anyhow::Error::from)?;
                let recomputed = recompute_total(&wire.items, book, self.default_price);
                info!(
                    event_name = "agent.budget.total_recomputed",
                    model_total = wire.total_cost,
                    recomputed_total = %recomputed,
                    "model-reported total discarded in favor of local recomputation"
                );
                Ok(BudgetResult { items: wire.items, total_cost: recomputed, note: wire.note })
            }
            Err(RetryError::Exhausted { attempts, .. }) => {
                warn!(
                    event_name = "agent.budget.exhausted",
                    attempts,
                    "keeping original list after failed adjustment"
                );
                Ok(BudgetResult {
                    items: items.to_vec(),
                    total_cost: total,
                    note: format!(
                        "Failed to parse model response after {attempts} attempts; original \
                         list returned"
                    ),
                })
            }
            Err(RetryError::Model(error)) => Err(error),
        }
    }

    fn adjustment_prompt(&self, items: &[String], total: Decimal, book: &PriceBook) -> String {
        let prices: serde_json::Map<String, serde_json::Value> = book
            .iter()
            .map(|(name, price)| {
                (name.clone(), serde_json::Value::from(price.to_f64().unwrap_or_default()))
            })
            .collect();
        let prices_json =
            serde_json::to_string(&prices).unwrap_or_else(|_| "{}".to_string());

        format!(
            "Original items: [{}]\nBudget: {}\nCurrentTotal: {}\nPrices: {}\n\n\
             Task: Suggest an adjusted shopping list that meets or is closest to the Budget.\n\
             Requirements:\n\
             - Return ONLY the JSON object: {{ \"items\": [ string ], \"totalCost\": number, \"note\": string }}.\n\
             - items: array of product names.\n\
             - totalCost: numeric sum computed using the provided Prices (use default price 2.0 for unknown items).\n\
             - note: 1-2 sentence explanation.\n\
             - Prefer substitutions over removals. Make minimal changes needed to meet budget.",
            items.join(", "),
            self.ceiling,
            total,
            prices_json
        )
    }
}
