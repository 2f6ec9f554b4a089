use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Per-item shopping descriptions keyed by product name.
///
/// Keys are a case-insensitive subset of the budget stage's item list, and
/// every item carries a non-empty description by the time the pipeline
/// returns (fallback text if none could be obtained).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingResult {
    #[serde(rename = "categorizedItems")]
    pub categorized_items: BTreeMap<String, String>,
}

impl ShoppingResult {
    pub fn description_of(&self, item: &str) -> Option<&str> {
        self.categorized_items
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(item))
            .map(|(_, description)| description.as_str())
    }
}
