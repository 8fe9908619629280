//! Ingredient normalization.
//!
//! Clients send ingredients either as free text (`"200g pomodoro"`) or as
//! objects (`{"nome": "farina", "quantita": 500, "unita": "g"}`). Everything
//! is turned into an [`Ingredient`] before it reaches the store.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::models::{Ingredient, PLACEHOLDER_UNIT};

/// Ingredient as received from a client, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawIngredient {
    /// Object carrying a non-empty `nome`; trusted as already normalized.
    Structured(Ingredient),
    Text(String),
    /// Any other JSON value, already stringified.
    Other(String),
}

impl From<Value> for RawIngredient {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => RawIngredient::Text(text),
            Value::Object(ref map) => match map.get("nome").and_then(Value::as_str) {
                Some(name) if !name.is_empty() => RawIngredient::Structured(Ingredient {
                    name: name.to_string(),
                    quantity: map.get("quantita").and_then(Value::as_u64).unwrap_or(1),
                    unit: map
                        .get("unita")
                        .and_then(Value::as_str)
                        .unwrap_or(PLACEHOLDER_UNIT)
                        .to_string(),
                }),
                _ => RawIngredient::Other(value.to_string()),
            },
            other => RawIngredient::Other(other.to_string()),
        }
    }
}

/// Splits a fused quantity+unit token such as `200g` or `3`.
///
/// This is the only place that decides whether a token is a quantity, so
/// detection and extraction can never disagree. Returns `None` for tokens
/// that are not a digit run followed by ASCII letters, and for digit runs
/// that do not fit in a `u64`.
fn quantity_token(token: &str) -> Option<(u64, &str)> {
    lazy_static! {
        static ref QUANTITY_RE: Regex = Regex::new(r"^(\d+)([a-zA-Z]*)$").unwrap();
    }
    let caps = QUANTITY_RE.captures(token)?;
    let quantity = caps.get(1)?.as_str().parse::<u64>().ok()?;
    let unit = caps.get(2).map_or("", |m| m.as_str());
    Some((quantity, unit))
}

fn normalize_text(text: &str) -> Ingredient {
    let trimmed = text.trim();
    let parts: Vec<&str> = trimmed.split_whitespace().collect();

    if let [first, rest @ ..] = parts.as_slice() {
        if !rest.is_empty() {
            if let Some((quantity, unit)) = quantity_token(first) {
                let unit = if unit.is_empty() { PLACEHOLDER_UNIT } else { unit };
                return Ingredient::new(rest.join(" "), quantity, unit);
            }
        }
    }

    Ingredient::named(trimmed)
}

/// Never fails: unrecognized input degrades to a name-only ingredient.
pub fn normalize(raw: RawIngredient) -> Ingredient {
    match raw {
        RawIngredient::Structured(ingredient) => ingredient,
        RawIngredient::Text(text) => normalize_text(&text),
        RawIngredient::Other(text) => Ingredient::named(text),
    }
}

pub fn normalize_all(values: Vec<Value>) -> Vec<Ingredient> {
    values
        .into_iter()
        .map(|v| normalize(RawIngredient::from(v)))
        .collect()
}
