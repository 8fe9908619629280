//! Document store seams.
//!
//! Handlers and the shopping-list aggregator only see these traits. The
//! Postgres implementation is used in production; the in-memory one backs
//! local runs (`STORE_BACKEND=memory`) and tests.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Comment, NewComment, NewRecipe, NewUser, ProfileChanges, Recipe, RecipeChanges, User,
};

/// A write was rejected because it would duplicate a unique value.
///
/// Returned inside `anyhow::Error`; callers check for it with
/// `anyhow::Error::is`.
#[derive(Debug, Error)]
#[error("duplicate value {0:?}")]
pub struct DuplicateKey(pub String);

#[async_trait]
pub trait RecipeStore: Send + Sync {
    async fn list_recipes(&self) -> anyhow::Result<Vec<Recipe>>;
    async fn list_recipes_by_creator(&self, user_id: Uuid) -> anyhow::Result<Vec<Recipe>>;
    /// Recipes whose id is in `ids`. A repeated id yields its recipe once.
    async fn find_recipes_by_ids(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Recipe>>;
    async fn find_recipe_by_name(&self, name: &str) -> anyhow::Result<Option<Recipe>>;
    async fn find_recipe_owned_by(&self, id: Uuid, user_id: Uuid)
        -> anyhow::Result<Option<Recipe>>;
    async fn insert_recipe(&self, recipe: &NewRecipe) -> anyhow::Result<Uuid>;
    /// Returns the number of modified documents.
    async fn update_recipe(&self, id: Uuid, changes: &RecipeChanges) -> anyhow::Result<u64>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    /// Fails with [`DuplicateKey`] when the email is taken.
    async fn insert_user(&self, user: &NewUser) -> anyhow::Result<User>;
    /// Fails with [`DuplicateKey`] when the new email belongs to another user.
    async fn update_user_profile(&self, id: Uuid, changes: &ProfileChanges)
        -> anyhow::Result<u64>;
}

#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn insert_comment(&self, comment: &NewComment) -> anyhow::Result<Comment>;
    /// Newest first.
    async fn list_comments_for_recipe(&self, recipe_name: &str) -> anyhow::Result<Vec<Comment>>;
    /// Deletes only when id, recipe name and author all match.
    async fn delete_comment(
        &self,
        id: Uuid,
        recipe_name: &str,
        user_id: Uuid,
    ) -> anyhow::Result<u64>;
}

pub trait DocumentStore: RecipeStore + UserStore + CommentStore {}

impl<T> DocumentStore for T where T: RecipeStore + UserStore + CommentStore {}
