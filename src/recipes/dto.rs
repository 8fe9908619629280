use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::models::Recipe;

/// Create/update body. Ingredients and instructions stay loosely typed
/// until normalization.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipePayload {
    pub name: Option<String>,
    pub ingredients: Option<Value>,
    pub instructions: Option<Value>,
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedRecipeResponse {
    pub message: String,
    pub recipe_id: Uuid,
    pub recipe: Recipe,
}

#[derive(Debug, Serialize)]
pub struct UpdatedRecipeResponse {
    pub message: String,
    pub recipe: Recipe,
}
