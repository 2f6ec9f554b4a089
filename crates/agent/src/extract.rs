//! Heuristic recovery of ingredient lists from loose model text.
//!
//! Used when strict parsing is unusable: recovering ingredients from
//! descriptive prose, or as a last resort after the retry controller is
//! exhausted. Lines are classified as list-like, split into tokens, cleaned
//! of quantity noise, then re-combined into multi-word ingredient names only
//! when the combined phrase actually occurs in the surrounding text.

use once_cell::sync::Lazy;
use regex::Regex;

static LIST_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:[-*•]|\d+[.)]?)\s+").expect("list marker pattern"));

static BRACKETED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\([^)]*\)|\[[^\]]*\]").expect("bracket pattern"));

static QUANTITY_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^\d+(?:[.,/]\d+)?\s*(?:(?:kg|kilograms?|g|grams?|lbs?|pounds?|oz|ounces?|ml|l|liters?|litres?|cups?|tbsp|tablespoons?|tsp|teaspoons?|pieces?|pcs|slices?|cloves?|cans?|packs?|bunch(?:es)?)\b\.?)?\s*(?:of\s+)?",
    )
    .expect("quantity prefix pattern")
});

static HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\w+\s*[:-]\s*\n").expect("heading pattern"));

const CONNECTOR_WORDS: &[&str] = &["and", "or", "with", "plus", "of", "the", "a", "an"];

const SCOPED_WINDOW_CAP: usize = 1000;

/// Derives an ordered, deduplicated ingredient list from free-form text.
pub fn extract_items(text: &str) -> Vec<String> {
    let tokens = tokenize(text);
    merge_tokens(&tokens, text, "")
}

/// Recovers the ingredients of one named meal from an unstructured block by
/// scoping extraction to the text window that follows the meal name.
pub fn ingredients_for_meal(meal_name: &str, raw_text: &str) -> Vec<String> {
    let Some(window) = scoped_window(meal_name, raw_text) else {
        return Vec::new();
    };
    let tokens = tokenize(window);
    merge_tokens(&tokens, window, meal_name)
}

/// Line classification and token cleaning. Produces single-word tokens in
/// reading order; multi-word names are reassembled by `merge_tokens`.
fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let is_marker_line = LIST_MARKER.is_match(trimmed);
        let comma_count = trimmed.matches(',').count();
        let word_count = trimmed.split_whitespace().count();

        let segments: Vec<String> = if is_marker_line {
            let body = LIST_MARKER.replace(trimmed, "");
            body.split(',').map(|segment| clean_segment(segment)).collect()
        } else if comma_count >= 2 {
            trimmed.split(',').map(clean_segment).collect()
        } else if word_count <= 4 && trimmed.len() < 60 {
            trimmed.split(',').map(clean_segment).collect()
        } else {
            continue;
        };

        for segment in segments {
            for word in segment.split_whitespace() {
                if word.chars().any(|c| c.is_alphabetic())
                    && !CONNECTOR_WORDS.contains(&word.to_lowercase().as_str())
                {
                    tokens.push(word.to_string());
                }
            }
        }
    }

    tokens
}

/// Strips bracketed quantity annotations, leading numeric-quantity-plus-unit
/// prefixes, and trailing punctuation; collapses internal whitespace.
fn clean_segment(segment: &str) -> String {
    let without_brackets = BRACKETED.replace_all(segment, " ");
    let trimmed = without_brackets.trim();
    let without_quantity = QUANTITY_PREFIX.replace(trimmed, "");
    let stripped =
        without_quantity.trim().trim_end_matches(['.', ',', ';', ':', '!', '?', '-']).trim();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Greedily re-combines adjacent single-word tokens into multi-word names,
/// testing tri-gram then bi-gram windows. A candidate phrase is accepted
/// only if that exact phrase occurs in the meal name, the surrounding raw
/// text, or the token stream itself; otherwise adjacent words stay separate.
fn merge_tokens(tokens: &[String], context: &str, meal_name: &str) -> Vec<String> {
    let context_lower = context.to_lowercase();
    let meal_lower = meal_name.to_lowercase();

    let phrase_is_grounded = |phrase: &str| {
        let phrase_lower = phrase.to_lowercase();
        context_lower.contains(&phrase_lower)
            || (!meal_lower.is_empty() && meal_lower.contains(&phrase_lower))
            || tokens.iter().any(|token| token.eq_ignore_ascii_case(phrase))
    };

    let mut merged = Vec::new();
    let mut index = 0;
    while index < tokens.len() {
        let mut advanced = false;
        for window in [3usize, 2] {
            if index + window <= tokens.len() {
                let phrase = tokens[index..index + window].join(" ");
                if phrase_is_grounded(&phrase) {
                    merged.push(title_case(&phrase));
                    index += window;
                    advanced = true;
                    break;
                }
            }
        }
        if !advanced {
            merged.push(title_case(&tokens[index]));
            index += 1;
        }
    }

    dedup_preserving_order(merged)
}

/// Window of text following the meal name's first occurrence, capped and
/// truncated at the next heading-like line or blank line.
fn scoped_window<'a>(meal_name: &str, raw_text: &'a str) -> Option<&'a str> {
    let start = find_case_insensitive(raw_text, meal_name)? + meal_name.len();
    let rest = &raw_text[start..];

    // Step past the name's own delimiter so a blank line directly after the
    // heading does not truncate the window to nothing.
    let content_offset = rest
        .char_indices()
        .find(|(_, c)| !c.is_whitespace() && *c != ':' && *c != '-')
        .map(|(offset, _)| offset)
        .unwrap_or(rest.len());
    let rest = &rest[content_offset..];

    let mut end = floor_char_boundary(rest, SCOPED_WINDOW_CAP);
    if let Some(position) = rest[..end].find("\n\n") {
        end = position;
    }
    if let Some(heading) = HEADING.find(&rest[..end]) {
        end = heading.start();
    }

    Some(&rest[..end])
}

fn find_case_insensitive(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack.to_lowercase().find(&needle.to_lowercase())
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    if index >= text.len() {
        return text.len();
    }
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn title_case(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>()
                    + chars.as_str().to_lowercase().as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn dedup_preserving_order(items: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    items.into_iter().filter(|item| seen.insert(item.to_lowercase())).collect()
}
