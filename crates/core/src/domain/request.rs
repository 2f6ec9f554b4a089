use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The user-facing meal request the pipeline is started with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealRequest {
    pub description: String,
    #[serde(default = "default_meal_count")]
    pub meal_count: u32,
    #[serde(default)]
    pub dietary_preferences: Vec<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub budget: Option<Decimal>,
}

fn default_meal_count() -> u32 {
    3
}

impl MealRequest {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            meal_count: default_meal_count(),
            dietary_preferences: Vec::new(),
            budget: None,
        }
    }

    /// Constraint line appended to the plan prompt, e.g.
    /// `meals=3; prefs=vegetarian,gluten free`.
    pub fn constraints_line(&self) -> String {
        format!("meals={}; prefs={}", self.meal_count, self.dietary_preferences.join(","))
    }
}

#[cfg(test)]
mod tests {
    use super::MealRequest;

    #[test]
    fn constraints_line_joins_preferences() {
        let mut request = MealRequest::new("Diwali dinner");
        request.meal_count = 2;
        request.dietary_preferences =
            vec!["gluten free".to_string(), "vegetarian".to_string()];
        assert_eq!(request.constraints_line(), "meals=2; prefs=gluten free,vegetarian");
    }

    #[test]
    fn defaults_apply_when_fields_are_absent() {
        let request: MealRequest =
            serde_json::from_str(r#"{ "description": "quick lunches" }"#).expect("parse");
        assert_eq!(request.meal_count, 3);
        assert!(request.dietary_preferences.is_empty());
        assert!(request.budget.is_none());
    }
}
