use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Unit assigned when none can be inferred from the input.
pub const PLACEHOLDER_UNIT: &str = "pz";

/// Normalized ingredient as stored on a recipe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "quantita")]
    pub quantity: u64,
    #[serde(rename = "unita")]
    pub unit: String,
}

impl Ingredient {
    pub fn new(name: impl Into<String>, quantity: u64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity,
            unit: unit.into(),
        }
    }

    /// One piece of `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, 1, PLACEHOLDER_UNIT)
    }
}

/// Snapshot of the recipe author taken at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creator {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<String>,
    pub image_url: Option<String>,
    #[serde(rename = "creatore")]
    pub creator: Creator,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Recipe document before the store assigns an id.
#[derive(Debug, Clone)]
pub struct NewRecipe {
    pub name: String,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<String>,
    pub image_url: Option<String>,
    pub creator: Creator,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl NewRecipe {
    pub fn into_recipe(self, id: Uuid) -> Recipe {
        Recipe {
            id,
            name: self.name,
            ingredients: self.ingredients,
            instructions: self.instructions,
            image_url: self.image_url,
            creator: self.creator,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Mutable recipe fields. Creator and creation time are not part of it.
#[derive(Debug, Clone)]
pub struct RecipeChanges {
    pub name: String,
    pub ingredients: Vec<Ingredient>,
    pub instructions: Vec<String>,
    pub image_url: Option<String>,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub email: String,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // argon2 PHC string
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "nomeRicetta")]
    pub recipe_name: String,
    pub user_id: Uuid,
    #[serde(rename = "userNome")]
    pub user_name: String,
    #[serde(rename = "testo")]
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub recipe_name: String,
    pub user_id: Uuid,
    pub user_name: String,
    pub text: String,
}
