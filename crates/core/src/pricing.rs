use std::collections::HashMap;

use rust_decimal::Decimal;

/// Case-insensitive product-name → unit-price table loaded from the price
/// reference file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PriceBook {
    prices: HashMap<String, Decimal>,
}

impl PriceBook {
    pub fn new(prices: impl IntoIterator<Item = (String, Decimal)>) -> Self {
        Self {
            prices: prices
                .into_iter()
                .map(|(name, price)| (name.to_lowercase(), price))
                .collect(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn price_of(&self, name: &str) -> Option<Decimal> {
        self.prices.get(&name.to_lowercase()).copied()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Decimal)> {
        self.prices.iter()
    }
}

/// The single source of truth for shopping-list totals.
///
/// Sums price-book lookups over `items`, substituting `default_price` for
/// unknown products. Every total surfaced by the pipeline comes from here;
/// totals reported by a model response are discarded in its favor.
pub fn recompute_total(items: &[String], book: &PriceBook, default_price: Decimal) -> Decimal {
    items
        .iter()
        .map(|item| book.price_of(item).unwrap_or(default_price))
        .sum()
}
