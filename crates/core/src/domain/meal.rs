use serde::{Deserialize, Serialize};

/// A single planned meal. Ingredients are deduplicated case-insensitively
/// at construction, preserving first-seen order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meal {
    pub name: String,
    pub ingredients: Vec<String>,
    #[serde(default)]
    pub notes: String,
}

impl Meal {
    pub fn new(
        name: impl Into<String>,
        ingredients: impl IntoIterator<Item = String>,
        notes: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            ingredients: dedup_case_insensitive(ingredients),
            notes: notes.into(),
        }
    }
}

/// An ordered sequence of meals. Empty only as an explicit fallback case,
/// never absent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealPlan {
    pub meals: Vec<Meal>,
}

impl MealPlan {
    pub fn new(meals: Vec<Meal>) -> Self {
        Self { meals }
    }

    pub fn empty() -> Self {
        Self { meals: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.meals.is_empty()
    }

    /// Distinct ingredient names across all meals, case-insensitive,
    /// first-seen order and spelling.
    pub fn distinct_ingredients(&self) -> Vec<String> {
        dedup_case_insensitive(
            self.meals.iter().flat_map(|meal| meal.ingredients.iter().cloned()),
        )
    }
}

pub(crate) fn dedup_case_insensitive(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut deduped = Vec::new();
    for item in items {
        if seen.insert(item.to_lowercase()) {
            deduped.push(item);
        }
    }
    deduped
}

#[cfg(test)]
mod tests {
    use super::{Meal, MealPlan};

    #[test]
    fn meal_deduplicates_ingredients_case_insensitively() {
        let meal = Meal::new(
            "Omelette",
            vec!["Egg".to_string(), "egg".to_string(), "Milk".to_string(), "EGG".to_string()],
            "",
        );
        assert_eq!(meal.ingredients, vec!["Egg".to_string(), "Milk".to_string()]);
    }

    #[test]
    fn distinct_ingredients_preserve_first_seen_order_across_meals() {
        let plan = MealPlan::new(vec![
            Meal::new("Breakfast", vec!["Egg".to_string(), "Bread".to_string()], ""),
            Meal::new("Dinner", vec!["Rice".to_string(), "egg".to_string()], "leftovers ok"),
        ]);

        assert_eq!(
            plan.distinct_ingredients(),
            vec!["Egg".to_string(), "Bread".to_string(), "Rice".to_string()]
        );
    }

    #[test]
    fn empty_plan_has_no_ingredients() {
        let plan = MealPlan::empty();
        assert!(plan.is_empty());
        assert!(plan.distinct_ingredients().is_empty());
    }
}
