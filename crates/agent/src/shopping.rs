//! Shopping stage: per-item descriptions, batched first, one-by-one
//! fallback after, placeholder text as the last resort.

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::{info, warn};

use pantry_core::domain::shopping::ShoppingResult;

use crate::llm::ModelClient;
use crate::retry::{RetryController, RetryError};
use crate::validate::{Field, Schema};

const SYSTEM_PROMPT: &str = "You are an assistant that, given a JSON array of product names, \
returns ONLY a JSON object with a single key \"categorizedItems\" whose value maps each product \
name to a short friendly description (one sentence). The output must be a single valid JSON \
object. No extra text.";

const ITEM_SYSTEM_PROMPT: &str =
    "You write one short friendly sentence describing a grocery product. Reply with the \
     sentence only.";

pub const PLACEHOLDER_DESCRIPTION: &str = "No description available.";

pub fn shopping_schema() -> Schema {
    Schema::new([Field::string_map("categorizedItems")])
}

#[derive(Debug, Deserialize)]
struct ShoppingWire {
    #[serde(rename = "categorizedItems")]
    categorized_items: BTreeMap<String, String>,
}

#[derive(Clone, Copy, Debug)]
pub struct ShoppingStage {
    retry: RetryController,
}

impl ShoppingStage {
    pub fn new(retry: RetryController) -> Self {
        Self { retry }
    }

    /// Produces a description for every item. Keys in the returned map use
    /// the budget list's own spelling; model-returned keys that match no
    /// item are dropped.
    pub async fn run(
        &self,
        model: &dyn ModelClient,
        items: &[String],
    ) -> Result<ShoppingResult, anyhow::Error> {
        if items.is_empty() {
            return Ok(ShoppingResult::default());
        }

        let batched = self.batched_descriptions(model, items).await?;

        let mut categorized_items = BTreeMap::new();
        for item in items {
            let described = batched.iter().find_map(|(name, description)| {
                (name.eq_ignore_ascii_case(item) && !description.trim().is_empty())
                    .then(|| description.trim().to_string())
            });

            let description = match described {
                Some(description) => description,
                None => self.single_item_description(model, item).await,
            };
            categorized_items.insert(item.clone(), description);
        }

        Ok(ShoppingResult { categorized_items })
    }

    async fn batched_descriptions(
        &self,
        model: &dyn ModelClient,
        items: &[String],
    ) -> Result<BTreeMap<String, String>, anyhow::Error> {
        let items_json = serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string());
        let prompt = format!(
            "Given the following list of items, return a JSON object mapping each item to a \
             short friendly description.\nItems: {items_json}"
        );

        match self.retry.run(model, SYSTEM_PROMPT, &prompt, &shopping_schema()).await {
            Ok(object) => {
                let wire: ShoppingWire =
                    serde_json::from_value(serde_json::Value::Object(object))
                        .map_err(anyhow::Error::from)?;
                info!(
                    event_name = "agent.shopping.batch_validated",
                    descriptions = wire.categorized_items.len(),
                    "batched descriptions accepted"
                );
                Ok(wire.categorized_items)
            }
            Err(RetryError::Exhausted { attempts, .. }) => {
                warn!(
                    event_name = "agent.shopping.batch_exhausted",
                    attempts,
                    "falling back to per-item description requests"
                );
                Ok(BTreeMap::new())
            }
            Err(RetryError::Model(error)) => Err(error),
        }
    }

    async fn single_item_description(&self, model: &dyn ModelClient, item: &str) -> String {
        let prompt = format!(
            "In one short sentence, describe the grocery item \"{item}\" for a shopping list."
        );
        match model.generate(ITEM_SYSTEM_PROMPT, &prompt).await {
            Ok(response) if !response.trim().is_empty() => response.trim().to_string(),
            Ok(_) => PLACEHOLDER_DESCRIPTION.to_string(),
            Err(error) => {
                warn!(
                    event_name = "agent.shopping.item_fallback_failed",
                    item,
                    reason = %error,
                    "using placeholder description"
                );
                PLACEHOLDER_DESCRIPTION.to_string()
            }
        }
    }
}
