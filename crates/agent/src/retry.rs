//! Bounded ask-model-then-validate loop.
//!
//! Validation failure is the only retry trigger; transport errors from the
//! model client propagate immediately because retrying them belongs to the
//! transport layer. Each attempt is a single sequential await, so dropping
//! the returned future cancels the in-flight attempt loop.

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::warn;

use crate::llm::ModelClient;
use crate::validate::{validate, Schema, ValidationOutcome};

/// Appended to the prompt on every attempt after the first. This is the
/// system's only error-correction signal to the model.
const CORRECTIVE_SUFFIX: &str = "\n\nYour previous reply was not valid. Respond with ONLY a \
single valid JSON object that matches the exact keys and types described above. Do not output \
any surrounding text, markdown, or extra keys. Always use double quotes.";

#[derive(Debug, Error)]
pub enum RetryError {
    /// All attempts failed validation. Carries the last raw response so the
    /// caller can degrade from it (heuristic recovery, diagnostics).
    #[error("model output failed validation after {attempts} attempts: {last_reason}")]
    Exhausted { attempts: u32, last_raw: String, last_reason: String },
    #[error(transparent)]
    Model(#[from] anyhow::Error),
}

#[derive(Clone, Copy, Debug)]
pub struct RetryController {
    max_attempts: u32,
}

impl Default for RetryController {
    fn default() -> Self {
        Self { max_attempts: 3 }
    }
}

impl RetryController {
    pub fn new(max_attempts: u32) -> Self {
        Self { max_attempts: max_attempts.max(1) }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Asks the model for schema-conformant output, reissuing the prompt
    /// with the corrective suffix on each attempt after the first. Makes
    /// exactly `max_attempts` model calls before giving up.
    pub async fn run(
        &self,
        model: &dyn ModelClient,
        system_prompt: &str,
        base_prompt: &str,
        schema: &Schema,
    ) -> Result<Map<String, Value>, RetryError> {
        let mut last_raw = String::new();
        let mut last_reason = String::new();

        for attempt in 1..=self.max_attempts {
            let prompt = if attempt == 1 {
                base_prompt.to_string()
            } else {
                format!("{base_prompt}{CORRECTIVE_SUFFIX}")
            };

            let raw = model.generate(system_prompt, &prompt).await?;

            match validate(&raw, schema) {
                ValidationOutcome::Valid(object) => return Ok(object),
                ValidationOutcome::Invalid(error) => {
                    warn!(
                        event_name = "agent.retry.attempt_invalid",
                        attempt,
                        max_attempts = self.max_attempts,
                        reason = %error,
                        "model response failed validation"
                    );
                    last_reason = error.to_string();
                    last_raw = raw;
                }
            }
        }

        Err(RetryError::Exhausted {
            attempts: self.max_attempts,
            last_raw,
            last_reason,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::llm::ScriptedModel;
    use crate::validate::{Field, Schema};

    use super::{RetryController, RetryError};

    fn items_schema() -> Schema {
        Schema::new([
            Field::string_array("items").non_empty(),
            Field::number("totalCost"),
            Field::string("note"),
        ])
    }

    #[tokio::test]
    async fn parses_on_second_attempt() {
        let model = ScriptedModel::new([
            "Some text without json".to_string(),
            r#"{ "items": ["egg", "rice"], "totalCost": 1.2, "note": "Removed cheese" }"#
                .to_string(),
        ]);

        let controller = RetryController::new(3);
        let object = controller
            .run(&model, "sys", "prompt", &items_schema())
            .await
            .expect("second attempt should validate");

        assert_eq!(model.calls(), 2);
        assert_eq!(object["items"][0], "egg");
        assert_eq!(object["note"], "Removed cheese");
    }

    #[tokio::test]
    async fn exhausts_after_exactly_max_attempts() {
        let model = ScriptedModel::new(["no json here", "still no json", "nope"]);

        let controller = RetryController::new(3);
        let error = controller
            .run(&model, "sys", "prompt", &items_schema())
            .await
            .expect_err("all attempts invalid");

        assert_eq!(model.calls(), 3);
        let RetryError::Exhausted { attempts, last_raw, .. } = error else {
            panic!("expected Exhausted");
        };
        assert_eq!(attempts, 3);
        assert_eq!(last_raw, "nope");
    }

    #[tokio::test]
    async fn model_errors_propagate_without_retry() {
        // One canned response; the second generate() call errors out.
        let model = ScriptedModel::new(["not json"]);

        let controller = RetryController::new(3);
        let error = controller
            .run(&model, "sys", "prompt", &items_schema())
            .await
            .expect_err("model error should propagate");

        assert!(matches!(error, RetryError::Model(_)));
        assert_eq!(model.calls(), 2);
    }

    #[tokio::test]
    async fn single_attempt_controller_never_retries() {
        let model = ScriptedModel::new(["garbage"]);
        let controller = RetryController::new(1);
        let error = controller
            .run(&model, "sys", "prompt", &items_schema())
            .await
            .expect_err("one invalid attempt exhausts");
        assert_eq!(model.calls(), 1);
        assert!(matches!(error, RetryError::Exhausted { attempts: 1, .. }));
    }
}
