use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Outcome of the budget stage.
///
/// `total_cost` is always derived from the local price book, never taken
/// verbatim from a model response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetResult {
    pub items: Vec<String>,
    #[serde(rename = "totalCost", with = "rust_decimal::serde::float")]
    pub total_cost: Decimal,
    pub note: String,
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::BudgetResult;

    #[test]
    fn total_cost_serializes_as_a_json_number() {
        let result = BudgetResult {
            items: vec!["egg".to_string(), "rice".to_string()],
            total_cost: Decimal::new(37, 1),
            note: "Within budget - no changes needed".to_string(),
        };

        let json = serde_json::to_value(&result).expect("serialize");
        assert!(json["totalCost"].is_number());
        assert_eq!(json["totalCost"].as_f64(), Some(3.7));
        assert_eq!(json["items"][0], "egg");
    }
}
