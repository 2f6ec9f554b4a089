//! Meal plan stage: the only stage whose input is the raw user request.

use serde::Deserialize;
use tracing::{info, warn};

use pantry_core::domain::meal::{Meal, MealPlan};
use pantry_core::domain::request::MealRequest;

use crate::extract;
use crate::llm::ModelClient;
use crate::retry::{RetryController, RetryError};
use crate::validate::{Field, Schema};

const SYSTEM_PROMPT: &str = "You are a helpful meal planning assistant. Respond ONLY with a \
single JSON object (no surrounding text) that matches the schema described below.";

const SCHEMA_INSTRUCTION: &str = r#"Return a JSON object with this shape:
{
  "meals": [
    {
      "name": string,
      "ingredients": [ string ],
      "notes": string (optional)
    }
  ]
}
Only output valid JSON and no other text."#;

pub fn meal_plan_schema() -> Schema {
    Schema::new([Field::object_array(
        "meals",
        Schema::new([
            Field::string("name"),
            Field::string_array("ingredients").non_empty(),
            Field::string("notes").optional(),
        ]),
    )
    .non_empty()])
}

#[derive(Debug, Deserialize)]
struct MealPlanWire {
    meals: Vec<MealWire>,
}

#[derive(Debug, Deserialize)]
struct MealWire {
    name: String,
    ingredients: Vec<String>,
    #[serde(default)]
    notes: String,
}

/// Outcome of the plan stage. A degraded plan was synthesized heuristically
/// rather than strictly validated and always carries an explanatory note.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlanOutcome {
    pub plan: MealPlan,
    pub degraded: bool,
    pub note: Option<String>,
}

#[derive(Clone, Copy, Debug)]
pub struct PlanStage {
    retry: RetryController,
}

impl PlanStage {
    pub fn new(retry: RetryController) -> Self {
        Self { retry }
    }

    pub async fn run(
        &self,
        model: &dyn ModelClient,
        request: &MealRequest,
    ) -> Result<PlanOutcome, anyhow::Error> {
        let prompt = format!(
            "Generate a meal plan for: {}\nConstraints: {}\n\n{}",
            request.description,
            request.constraints_line(),
            SCHEMA_INSTRUCTION
        );

        let schema = meal_plan_schema();
        match self.retry.run(model, SYSTEM_PROMPT, &prompt, &schema).await {
            Ok(object) => {
                let wire: MealPlanWire =
                    serde_json::from_value(serde_json::Value::Object(object))
                        .map_err(anyhow::Error::from)?;
                let meals = wire
                    .meals
                    .into_iter()
                    .map(|meal| Meal::new(meal.name, meal.ingredients, meal.notes))
                    .collect();
                info!(event_name = "agent.plan.validated", "meal plan validated");
                Ok(PlanOutcome { plan: MealPlan::new(meals), degraded: false, note: None })
            }
            Err(RetryError::Exhausted { attempts, last_raw, last_reason }) => {
                warn!(
                    event_name = "agent.plan.exhausted",
                    attempts,
                    reason = %last_reason,
                    "falling back to heuristic extraction"
                );
                Ok(self.fallback_plan(request, &last_raw, attempts))
            }
            Err(RetryError::Model(error)) => Err(error),
        }
    }

    /// Synthesizes a single-meal plan from whatever the last raw response
    /// contained. An empty plan is the explicit last resort.
    fn fallback_plan(&self, request: &MealRequest, last_raw: &str, attempts: u32) -> PlanOutcome {
        let ingredients = extract::extract_items(last_raw);
        if ingredients.is_empty() {
            return PlanOutcome {
                plan: MealPlan::empty(),
                degraded: true,
                note: Some(format!(
                    "Failed to parse meal plan response after {attempts} attempts and no \
                     ingredients could be recovered"
                )),
            };
        }

        let meal = Meal::new(
            format!("Suggested meal for {}", request.description),
            ingredients,
            "Recovered heuristically from an unstructured model response",
        );
        PlanOutcome {
            plan: MealPlan::new(vec![meal]),
            degraded: true,
            note: Some(format!(
                "Failed to parse meal plan response after {attempts} attempts; recovered a \
                 single meal heuristically"
            )),
        }
    }
}
