pub mod config;
pub mod domain;
pub mod pricing;
pub mod reference;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions};
pub use domain::budget::BudgetResult;
pub use domain::inventory::{InventoryFile, InventoryItem, InventoryResult};
pub use domain::meal::{Meal, MealPlan};
pub use domain::request::MealRequest;
pub use domain::result::OrchestrationResult;
pub use domain::shopping::ShoppingResult;
pub use pricing::{recompute_total, PriceBook};
pub use reference::{load_inventory, load_price_book, resolve_reference_file, ReferenceError};
