use serde_json::Value;
use time::OffsetDateTime;
use tracing::{debug, info};
use uuid::Uuid;

use super::{dto::RecipePayload, normalize::normalize_all};
use crate::{
    auth::dto::UserContext,
    error::AppError,
    models::{Creator, Ingredient, NewRecipe, Recipe, RecipeChanges},
    store::RecipeStore,
};

/// Validated, normalized recipe fields.
#[derive(Debug, Clone)]
pub struct RecipeInput {
    pub name: String,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<String>,
    pub image_url: Option<String>,
}

const REQUIRED_FIELDS: &str = "Name, ingredients and instructions are required";

fn coerce_instructions(value: Value) -> Option<Vec<String>> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(vec![s]),
        Value::Array(items) => Some(
            items
                .into_iter()
                .map(|item| match item {
                    Value::String(s) => s,
                    other => other.to_string(),
                })
                .collect(),
        ),
        other => Some(vec![other.to_string()]),
    }
}

impl RecipeInput {
    pub fn from_payload(payload: RecipePayload) -> Result<Self, AppError> {
        let name = payload
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| AppError::invalid(REQUIRED_FIELDS))?;

        let ingredients = match payload.ingredients {
            Some(Value::Array(items)) => normalize_all(items),
            Some(_) => return Err(AppError::invalid("Ingredients must be a list")),
            None => return Err(AppError::invalid(REQUIRED_FIELDS)),
        };

        let instructions = payload
            .instructions
            .and_then(coerce_instructions)
            .ok_or_else(|| AppError::invalid(REQUIRED_FIELDS))?;

        Ok(Self {
            name,
            ingredients,
            instructions,
            image_url: payload.image_url.filter(|u| !u.is_empty()),
        })
    }
}

pub async fn create_recipe<S>(
    store: &S,
    user: &UserContext,
    input: RecipeInput,
) -> Result<Recipe, AppError>
where
    S: RecipeStore + ?Sized,
{
    let now = OffsetDateTime::now_utc();
    let new_recipe = NewRecipe {
        name: input.name,
        ingredients: input.ingredients,
        instructions: input.instructions,
        image_url: input.image_url,
        creator: Creator {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
        },
        created_at: now,
        updated_at: now,
    };
    debug!(name = %new_recipe.name, ingredients = new_recipe.ingredients.len(), "creating recipe");

    let id = store.insert_recipe(&new_recipe).await?;
    info!(recipe_id = %id, user_id = %user.id, "recipe created");
    Ok(new_recipe.into_recipe(id))
}

/// Only the creator may update. Creator and creation time are kept; an
/// absent image URL keeps the stored one.
pub async fn update_recipe<S>(
    store: &S,
    user: &UserContext,
    id: Uuid,
    input: RecipeInput,
) -> Result<Recipe, AppError>
where
    S: RecipeStore + ?Sized,
{
    let existing = store
        .find_recipe_owned_by(id, user.id)
        .await?
        .ok_or_else(|| AppError::not_found("Recipe not found or not authorized to edit it"))?;

    let changes = RecipeChanges {
        name: input.name,
        ingredients: input.ingredients,
        instructions: input.instructions,
        image_url: input.image_url.or(existing.image_url),
        updated_at: OffsetDateTime::now_utc(),
    };

    let modified = store.update_recipe(id, &changes).await?;
    if modified == 0 {
        return Err(AppError::invalid("No changes applied"));
    }

    info!(recipe_id = %id, user_id = %user.id, "recipe updated");
    Ok(Recipe {
        id,
        name: changes.name,
        ingredients: changes.ingredients,
        instructions: changes.instructions,
        image_url: changes.image_url,
        creator: existing.creator,
        created_at: existing.created_at,
        updated_at: changes.updated_at,
    })
}
