use std::str::FromStr;

use rust_decimal::Decimal;

use pantry_agent::llm::EchoModel;
use pantry_agent::pipeline::Pipeline;
use pantry_core::config::{AppConfig, LoadOptions};
use pantry_core::domain::request::MealRequest;

use super::CommandResult;

pub fn run(
    description: &str,
    meals: Option<u32>,
    budget: Option<&str>,
    prefs: Option<&str>,
) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return CommandResult::failure("plan", "config", error.to_string(), 2),
    };

    let mut request = MealRequest::new(description);
    if let Some(meal_count) = meals {
        request.meal_count = meal_count;
    }
    if let Some(preferences) = prefs {
        request.dietary_preferences = preferences
            .split(',')
            .map(str::trim)
            .filter(|preference| !preference.is_empty())
            .map(str::to_string)
            .collect();
    }
    if let Some(raw_budget) = budget {
        match Decimal::from_str(raw_budget.trim()) {
            Ok(value) => request.budget = Some(value),
            Err(_) => {
                return CommandResult::failure(
                    "plan",
                    "invalid_budget",
                    format!("`{raw_budget}` is not a valid amount"),
                    2,
                );
            }
        }
    }

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "plan",
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                1,
            );
        }
    };

    // The echo model is the bootstrap stand-in until a real provider is
    // wired behind ModelClient; the pipeline exercises its degraded paths.
    let pipeline = Pipeline::new(config);
    let result = runtime.block_on(pipeline.run(&EchoModel, &request));

    let output = serde_json::to_string_pretty(&result)
        .unwrap_or_else(|error| format!("{{\"error\":\"serialization failed: {error}\"}}"));
    CommandResult { exit_code: if result.errors.is_empty() { 0 } else { 1 }, output }
}
