//! Agent pipeline - untrusted model output, validated and recovered
//!
//! This crate turns a free-text meal request into a validated shopping list
//! by chaining four model-backed stages:
//!
//! 1. **Plan** (`plan`) - prompt for a meal plan, strict-validate the reply
//! 2. **Inventory** (`inventory`) - pure local availability partition
//! 3. **Budget** (`budget`) - local total, model substitutions only if over
//! 4. **Shopping** (`shopping`) - per-item descriptions with fallbacks
//!
//! # Key Types
//!
//! - `Pipeline` - per-request coordinator (see `pipeline` module)
//! - `ModelClient` - pluggable trait for the hosted chat model
//! - `RetryController` - bounded ask/validate loop with corrective prompts
//!
//! # Safety Principle
//!
//! The model is an untrusted producer. Its output is only accepted after
//! exact schema validation, every cost total is recomputed from the local
//! price book, and every failure path degrades to an annotated partial
//! result instead of fabricated success.

pub mod budget;
pub mod extract;
pub mod inventory;
pub mod llm;
pub mod pipeline;
pub mod plan;
pub mod retry;
pub mod shopping;
pub mod validate;
