//! Reference data loading for the price book and inventory files.
//!
//! The reference files may live at different repository depths depending on
//! where the process was started, so resolution probes a configured base
//! directory, then the working directory, then walks parent directories up
//! to the filesystem root.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::inventory::InventoryFile;
use crate::pricing::PriceBook;

pub const PRICE_FILE_NAME: &str = "prices.json";
pub const INVENTORY_FILE_NAME: &str = "inventory.json";

#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("reference file `{0}` was not found in the base directory, the working directory, or any parent directory")]
    NotFound(String),
    #[error("could not read reference file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse reference file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: serde_json::Error },
}

/// Locates a reference file by probing, in order: `base_dir` (when given),
/// the current working directory, and each parent of the working directory.
pub fn resolve_reference_file(file_name: &str, base_dir: Option<&Path>) -> Option<PathBuf> {
    if let Some(dir) = base_dir {
        let candidate = dir.join(file_name);
        if candidate.is_file() {
            return Some(candidate);
        }
    }

    find_upwards(file_name, env::current_dir().ok()?)
}

fn find_upwards(file_name: &str, start: PathBuf) -> Option<PathBuf> {
    let mut dir = start;
    loop {
        let candidate = dir.join(file_name);
        if candidate.is_file() {
            return Some(candidate);
        }
        if !dir.pop() {
            return None;
        }
    }
}

/// Loads the price book. Missing or malformed files yield an empty book:
/// "no prices" is a valid, degraded state and callers fall back to the
/// configured default price.
pub fn load_price_book(path: Option<&Path>) -> PriceBook {
    let Some(path) = path else {
        return PriceBook::empty();
    };
    let Ok(raw) = fs::read_to_string(path) else {
        return PriceBook::empty();
    };

    match serde_json::from_str::<serde_json::Map<String, serde_json::Value>>(
        &strip_trailing_commas(&raw),
    ) {
        Ok(entries) => PriceBook::new(entries.into_iter().filter_map(|(name, value)| {
            let serde_json::Value::Number(number) = value else {
                return None;
            };
            let price = Decimal::from_str(&number.to_string()).ok()?;
            Some((name, price))
        })),
        Err(_) => PriceBook::empty(),
    }
}

/// Loads the inventory file. Unlike prices there is no safe default here:
/// an absent file is indistinguishable from "nothing is available", so the
/// caller treats this error as fatal for the inventory stage.
pub fn load_inventory(path: Option<&Path>) -> Result<InventoryFile, ReferenceError> {
    let path = path.ok_or_else(|| ReferenceError::NotFound(INVENTORY_FILE_NAME.to_string()))?;
    let raw = fs::read_to_string(path)
        .map_err(|source| ReferenceError::ReadFile { path: path.to_path_buf(), source })?;

    serde_json::from_str(&strip_trailing_commas(&raw))
        .map_err(|source| ReferenceError::ParseFile { path: path.to_path_buf(), source })
}

/// Removes commas that directly precede a closing brace or bracket, outside
/// string literals, so hand-edited reference files with trailing commas
/// still parse.
fn strip_trailing_commas(raw: &str) -> String {
    let mut output = String::with_capacity(raw.len());
    let mut in_string = false;
    let mut escaped = false;

    for character in raw.chars() {
        if in_string {
            output.push(character);
            if escaped {
                escaped = false;
            } else if character == '\\' {
                escaped = true;
            } else if character == '"' {
                in_string = false;
            }
            continue;
        }

        match character {
            '"' => {
                in_string = true;
                output.push(character);
            }
            '}' | ']' => {
                while output.ends_with(|c: char| c.is_whitespace()) {
                    output.pop();
                }
                if output.ends_with(',') {
                    output.pop();
                }
                output.push(character);
            }
            _ => output.push(character),
        }
    }

    output
}
