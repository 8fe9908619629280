//! Shopping-list aggregation.
//!
//! Fetches the selected recipes, and sums their ingredient quantities per
//! `(name, unit)`, scaled by the number of guests. Nothing here is cached;
//! every call builds its own map.

use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroU64;
use std::str::FromStr;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{error::AppError, models::Recipe, store::RecipeStore};

/// Number of people a shopping list is for. Always at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GuestCount(NonZeroU64);

impl GuestCount {
    pub fn new(n: u64) -> Result<Self, AppError> {
        NonZeroU64::new(n)
            .map(GuestCount)
            .ok_or_else(|| AppError::invalid("Guest count must be at least 1"))
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }

    /// Accepts a JSON integer or a numeric string.
    pub fn from_value(value: &Value) -> Result<Self, AppError> {
        match value {
            Value::Number(n) => {
                let whole = n.as_u64().or_else(|| {
                    n.as_f64()
                        .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f < u64::MAX as f64)
                        .map(|f| f as u64)
                });
                match whole {
                    Some(n) => Self::new(n),
                    None => Err(AppError::invalid(format!(
                        "Guest count must be a positive integer, got {n}"
                    ))),
                }
            }
            Value::String(s) => s.parse(),
            other => Err(AppError::invalid(format!(
                "Guest count must be a positive integer, got {other}"
            ))),
        }
    }
}

impl FromStr for GuestCount {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let n = s.trim().parse::<u64>().map_err(|_| {
            AppError::invalid(format!("Guest count must be a positive integer, got {s:?}"))
        })?;
        Self::new(n)
    }
}

impl fmt::Display for GuestCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for GuestCount {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.get())
    }
}

pub fn parse_recipe_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::invalid(format!("Invalid recipe id: {raw}")))
}

/// Parses `id1,id2,...` as sent in the query string.
pub fn parse_recipe_id_list(raw: &str) -> Result<Vec<Uuid>, AppError> {
    if raw.trim().is_empty() {
        return Err(AppError::invalid("At least one recipe id is required"));
    }
    raw.split(',').map(parse_recipe_id).collect()
}

/// Parses a JSON array of id strings as sent in a request body.
pub fn recipe_ids_from_value(value: &Value) -> Result<Vec<Uuid>, AppError> {
    let Value::Array(items) = value else {
        return Err(AppError::invalid("Recipe ids must be a list"));
    };
    if items.is_empty() {
        return Err(AppError::invalid("At least one recipe id is required"));
    }
    items
        .iter()
        .map(|item| match item {
            Value::String(s) => parse_recipe_id(s),
            other => Err(AppError::invalid(format!("Invalid recipe id: {other}"))),
        })
        .collect()
}

/// One aggregated entry, keyed by ingredient name and unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItem {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "quantita")]
    pub quantity: u64,
    #[serde(rename = "unita")]
    pub unit: String,
}

#[derive(Debug, Clone)]
pub struct ShoppingList {
    pub line_items: Vec<LineItem>,
    pub recipe_names: Vec<String>,
}

/// Sums `quantity * guests` per `(name, unit)`, in first-encounter order.
pub fn merge_line_items(recipes: &[Recipe], guests: GuestCount) -> Vec<LineItem> {
    let mut index: HashMap<(&str, &str), usize> = HashMap::new();
    let mut items: Vec<LineItem> = Vec::new();

    for ingredient in recipes.iter().flat_map(|r| r.ingredients.iter()) {
        let key = (ingredient.name.as_str(), ingredient.unit.as_str());
        let slot = *index.entry(key).or_insert_with(|| {
            items.push(LineItem {
                name: ingredient.name.clone(),
                quantity: 0,
                unit: ingredient.unit.clone(),
            });
            items.len() - 1
        });
        let scaled = ingredient.quantity.saturating_mul(guests.get());
        items[slot].quantity = items[slot].quantity.saturating_add(scaled);
    }

    items
}

/// Builds the shopping list for `recipe_ids`, scaled by `guests`.
///
/// Fails with `NotFound` when the store returns a different number of
/// recipes than ids were requested. A repeated id is fetched once, so it
/// also trips this check.
pub async fn aggregate<S>(
    store: &S,
    recipe_ids: &[Uuid],
    guests: GuestCount,
) -> Result<ShoppingList, AppError>
where
    S: RecipeStore + ?Sized,
{
    if recipe_ids.is_empty() {
        return Err(AppError::invalid("At least one recipe id is required"));
    }

    let recipes = store.find_recipes_by_ids(recipe_ids).await?;
    if recipes.len() != recipe_ids.len() {
        warn!(
            requested = recipe_ids.len(),
            found = recipes.len(),
            "shopping list references missing recipes"
        );
        return Err(AppError::not_found("Some recipes were not found"));
    }

    let line_items = merge_line_items(&recipes, guests);
    debug!(
        recipes = recipes.len(),
        %guests,
        line_items = line_items.len(),
        "shopping list aggregated"
    );

    Ok(ShoppingList {
        line_items,
        recipe_names: recipes.into_iter().map(|r| r.name).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Creator, Ingredient, NewRecipe};
    use crate::store::MemoryStore;
    use serde_json::json;
    use time::OffsetDateTime;

    async fn seed(store: &MemoryStore, name: &str, ingredients: Vec<Ingredient>) -> Uuid {
        let now = OffsetDateTime::now_utc();
        store
            .insert_recipe(&NewRecipe {
                name: name.into(),
                ingredients,
                instructions: vec![],
                image_url: None,
                creator: Creator {
                    id: Uuid::nil(),
                    name: "Chef".into(),
                    email: "chef@example.com".into(),
                },
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap()
    }

    fn guests(n: u64) -> GuestCount {
        GuestCount::new(n).unwrap()
    }

    fn item(name: &str, quantity: u64, unit: &str) -> LineItem {
        LineItem {
            name: name.into(),
            quantity,
            unit: unit.into(),
        }
    }

    #[tokio::test]
    async fn sums_across_recipes_scaled_by_guests() {
        let store = MemoryStore::new();
        let r1 = seed(
            &store,
            "Sugo",
            vec![Ingredient::new("tomato", 200, "g"), Ingredient::new("salt", 1, "pz")],
        )
        .await;
        let r2 = seed(&store, "Insalata", vec![Ingredient::new("tomato", 100, "g")]).await;

        let list = aggregate(&store, &[r1, r2], guests(2)).await.unwrap();
        assert_eq!(list.line_items, vec![item("tomato", 600, "g"), item("salt", 2, "pz")]);
        assert_eq!(list.recipe_names, vec!["Sugo".to_string(), "Insalata".to_string()]);
    }

    #[tokio::test]
    async fn same_name_different_unit_stays_separate() {
        let store = MemoryStore::new();
        let r1 = seed(&store, "A", vec![Ingredient::new("latte", 200, "ml")]).await;
        let r2 = seed(&store, "B", vec![Ingredient::new("latte", 1, "l")]).await;

        let list = aggregate(&store, &[r1, r2], guests(1)).await.unwrap();
        assert_eq!(list.line_items, vec![item("latte", 200, "ml"), item("latte", 1, "l")]);
    }

    #[tokio::test]
    async fn single_recipe_single_guest_is_identity() {
        let store = MemoryStore::new();
        let ingredients = vec![
            Ingredient::new("farina", 500, "g"),
            Ingredient::new("uova", 3, "pz"),
            Ingredient::new("latte", 250, "ml"),
        ];
        let id = seed(&store, "Crepes", ingredients.clone()).await;

        let list = aggregate(&store, &[id], guests(1)).await.unwrap();
        let expected: Vec<LineItem> = ingredients
            .into_iter()
            .map(|i| item(&i.name, i.quantity, &i.unit))
            .collect();
        assert_eq!(list.line_items, expected);
    }

    #[tokio::test]
    async fn scaling_guests_scales_every_quantity() {
        let store = MemoryStore::new();
        let r1 = seed(
            &store,
            "A",
            vec![Ingredient::new("riso", 80, "g"), Ingredient::new("burro", 10, "g")],
        )
        .await;
        let r2 = seed(&store, "B", vec![Ingredient::new("riso", 70, "g")]).await;

        let base = aggregate(&store, &[r1, r2], guests(2)).await.unwrap();
        let tripled = aggregate(&store, &[r1, r2], guests(6)).await.unwrap();
        for (a, b) in base.line_items.iter().zip(&tripled.line_items) {
            assert_eq!((&a.name, &a.unit), (&b.name, &b.unit));
            assert_eq!(a.quantity * 3, b.quantity);
        }
    }

    #[tokio::test]
    async fn empty_id_list_is_invalid() {
        let store = MemoryStore::new();
        let err = aggregate(&store, &[], guests(1)).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let store = MemoryStore::new();
        let known = seed(&store, "A", vec![Ingredient::named("sale")]).await;
        let err = aggregate(&store, &[known, Uuid::new_v4()], guests(1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn repeated_id_trips_count_check() {
        let store = MemoryStore::new();
        let id = seed(&store, "A", vec![Ingredient::named("sale")]).await;
        let err = aggregate(&store, &[id, id], guests(1)).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn quantities_saturate_instead_of_overflowing() {
        let now = OffsetDateTime::now_utc();
        let recipe = NewRecipe {
            name: "Huge".into(),
            ingredients: vec![Ingredient::new("sale", u64::MAX, "g")],
            instructions: vec![],
            image_url: None,
            creator: Creator {
                id: Uuid::nil(),
                name: "Chef".into(),
                email: "chef@example.com".into(),
            },
            created_at: now,
            updated_at: now,
        }
        .into_recipe(Uuid::new_v4());
        let items = merge_line_items(&[recipe], guests(2));
        assert_eq!(items[0].quantity, u64::MAX);
    }

    #[test]
    fn guest_count_parsing() {
        assert_eq!("4".parse::<GuestCount>().unwrap().get(), 4);
        assert_eq!(" 2 ".parse::<GuestCount>().unwrap().get(), 2);
        for bad in ["0", "-1", "abc", "", "2.5"] {
            assert!(bad.parse::<GuestCount>().is_err(), "{bad:?}");
        }

        assert_eq!(GuestCount::from_value(&json!(3)).unwrap().get(), 3);
        assert_eq!(GuestCount::from_value(&json!("3")).unwrap().get(), 3);
        assert_eq!(GuestCount::from_value(&json!(3.0)).unwrap().get(), 3);
        for bad in [json!(0), json!(-2), json!(1.5), json!(null), json!("x"), json!([2])] {
            assert!(GuestCount::from_value(&bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn id_list_parsing_names_offending_value() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(parse_recipe_id_list(&format!("{a}, {b}")).unwrap(), vec![a, b]);

        let err = parse_recipe_id_list(&format!("{a},nope")).unwrap_err();
        assert_eq!(err.to_string(), "Invalid recipe id: nope");
        assert!(parse_recipe_id_list("  ").is_err());
    }

    #[test]
    fn body_ids_must_be_non_empty_list_of_strings() {
        let a = Uuid::new_v4();
        assert_eq!(recipe_ids_from_value(&json!([a.to_string()])).unwrap(), vec![a]);
        assert!(recipe_ids_from_value(&json!([])).is_err());
        assert!(recipe_ids_from_value(&json!(a.to_string())).is_err());
        assert!(recipe_ids_from_value(&json!([42])).is_err());
    }
}
