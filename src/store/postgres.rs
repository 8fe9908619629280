use anyhow::Context;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, types::Json, FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::{CommentStore, DuplicateKey, RecipeStore, UserStore};
use crate::models::{
    Comment, Creator, Ingredient, NewComment, NewRecipe, NewUser, ProfileChanges, Recipe,
    RecipeChanges, User,
};

const RECIPE_COLUMNS: &str = "id, name, ingredients, instructions, image_url, \
     creator_id, creator_name, creator_email, created_at, updated_at";

/// Turns a unique-constraint violation into [`DuplicateKey`] so callers can
/// tell it apart from other database failures.
fn map_unique(err: sqlx::Error, value: &str, what: &'static str) -> anyhow::Error {
    match err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            DuplicateKey(value.to_string()).into()
        }
        other => anyhow::Error::new(other).context(what),
    }
}

#[derive(Clone)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .context("connect to database")?;
        Ok(Self { db })
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db)
            .await
            .context("run migrations")?;
        Ok(())
    }
}

#[derive(Debug, FromRow)]
struct RecipeRow {
    id: Uuid,
    name: String,
    ingredients: Json<Vec<Ingredient>>,
    instructions: Json<Vec<String>>,
    image_url: Option<String>,
    creator_id: Uuid,
    creator_name: String,
    creator_email: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<RecipeRow> for Recipe {
    fn from(r: RecipeRow) -> Self {
        Self {
            id: r.id,
            name: r.name,
            ingredients: r.ingredients.0,
            instructions: r.instructions.0,
            image_url: r.image_url,
            creator: Creator {
                id: r.creator_id,
                name: r.creator_name,
                email: r.creator_email,
            },
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    name: String,
    password_hash: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<UserRow> for User {
    fn from(r: UserRow) -> Self {
        Self {
            id: r.id,
            email: r.email,
            name: r.name,
            password_hash: r.password_hash,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct CommentRow {
    id: Uuid,
    recipe_name: String,
    user_id: Uuid,
    user_name: String,
    body: String,
    created_at: OffsetDateTime,
}

impl From<CommentRow> for Comment {
    fn from(r: CommentRow) -> Self {
        Self {
            id: r.id,
            recipe_name: r.recipe_name,
            user_id: r.user_id,
            user_name: r.user_name,
            text: r.body,
            created_at: r.created_at,
        }
    }
}

#[async_trait]
impl RecipeStore for PgStore {
    async fn list_recipes(&self) -> anyhow::Result<Vec<Recipe>> {
        let rows = sqlx::query_as::<_, RecipeRow>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes ORDER BY created_at ASC, id ASC"
        ))
        .fetch_all(&self.db)
        .await
        .context("list recipes")?;
        Ok(rows.into_iter().map(Recipe::from).collect())
    }

    async fn list_recipes_by_creator(&self, user_id: Uuid) -> anyhow::Result<Vec<Recipe>> {
        let rows = sqlx::query_as::<_, RecipeRow>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes WHERE creator_id = $1 \
             ORDER BY created_at ASC, id ASC"
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list recipes by creator")?;
        Ok(rows.into_iter().map(Recipe::from).collect())
    }

    async fn find_recipes_by_ids(&self, ids: &[Uuid]) -> anyhow::Result<Vec<Recipe>> {
        let rows = sqlx::query_as::<_, RecipeRow>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = ANY($1) \
             ORDER BY created_at ASC, id ASC"
        ))
        .bind(ids)
        .fetch_all(&self.db)
        .await
        .context("find recipes by ids")?;
        Ok(rows.into_iter().map(Recipe::from).collect())
    }

    async fn find_recipe_by_name(&self, name: &str) -> anyhow::Result<Option<Recipe>> {
        let row = sqlx::query_as::<_, RecipeRow>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes WHERE name = $1 \
             ORDER BY created_at ASC LIMIT 1"
        ))
        .bind(name)
        .fetch_optional(&self.db)
        .await
        .context("find recipe by name")?;
        Ok(row.map(Recipe::from))
    }

    async fn find_recipe_owned_by(
        &self,
        id: Uuid,
        user_id: Uuid,
    ) -> anyhow::Result<Option<Recipe>> {
        let row = sqlx::query_as::<_, RecipeRow>(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1 AND creator_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .context("find owned recipe")?;
        Ok(row.map(Recipe::from))
    }

    async fn insert_recipe(&self, recipe: &NewRecipe) -> anyhow::Result<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO recipes (id, name, ingredients, instructions, image_url,
                                 creator_id, creator_name, creator_email,
                                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(id)
        .bind(&recipe.name)
        .bind(Json(&recipe.ingredients))
        .bind(Json(&recipe.instructions))
        .bind(recipe.image_url.as_deref())
        .bind(recipe.creator.id)
        .bind(&recipe.creator.name)
        .bind(&recipe.creator.email)
        .bind(recipe.created_at)
        .bind(recipe.updated_at)
        .execute(&self.db)
        .await
        .context("insert recipe")?;
        Ok(id)
    }

    async fn update_recipe(&self, id: Uuid, changes: &RecipeChanges) -> anyhow::Result<u64> {
        let res = sqlx::query(
            r#"
            UPDATE recipes
               SET name = $2, ingredients = $3, instructions = $4,
                   image_url = $5, updated_at = $6
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(&changes.name)
        .bind(Json(&changes.ingredients))
        .bind(Json(&changes.instructions))
        .bind(changes.image_url.as_deref())
        .bind(changes.updated_at)
        .execute(&self.db)
        .await
        .context("update recipe")?;
        Ok(res.rows_affected())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_user_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, name, password_hash, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find user by id")?;
        Ok(row.map(User::from))
    }

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, email, name, password_hash, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find user by email")?;
        Ok(row.map(User::from))
    }

    async fn insert_user(&self, user: &NewUser) -> anyhow::Result<User> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (id, email, name, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING id, email, name, password_hash, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.name)
        .bind(&user.password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(|e| map_unique(e, &user.email, "insert user"))?;
        Ok(row.into())
    }

    async fn update_user_profile(
        &self,
        id: Uuid,
        changes: &ProfileChanges,
    ) -> anyhow::Result<u64> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET name = COALESCE($2, name),
                   email = COALESCE($3, email),
                   updated_at = now()
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(changes.name.as_deref())
        .bind(changes.email.as_deref())
        .execute(&self.db)
        .await
        .map_err(|e| {
            let email = changes.email.as_deref().unwrap_or_default();
            map_unique(e, email, "update user profile")
        })?;
        Ok(res.rows_affected())
    }
}

#[async_trait]
impl CommentStore for PgStore {
    async fn insert_comment(&self, comment: &NewComment) -> anyhow::Result<Comment> {
        let row = sqlx::query_as::<_, CommentRow>(
            r#"
            INSERT INTO comments (id, recipe_name, user_id, user_name, body)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, recipe_name, user_id, user_name, body, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&comment.recipe_name)
        .bind(comment.user_id)
        .bind(&comment.user_name)
        .bind(&comment.text)
        .fetch_one(&self.db)
        .await
        .context("insert comment")?;
        Ok(row.into())
    }

    async fn list_comments_for_recipe(&self, recipe_name: &str) -> anyhow::Result<Vec<Comment>> {
        let rows = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT id, recipe_name, user_id, user_name, body, created_at
              FROM comments
             WHERE recipe_name = $1
             ORDER BY created_at DESC
            "#,
        )
        .bind(recipe_name)
        .fetch_all(&self.db)
        .await
        .context("list comments")?;
        Ok(rows.into_iter().map(Comment::from).collect())
    }

    async fn delete_comment(
        &self,
        id: Uuid,
        recipe_name: &str,
        user_id: Uuid,
    ) -> anyhow::Result<u64> {
        let res = sqlx::query(
            r#"
            DELETE FROM comments
             WHERE id = $1 AND recipe_name = $2 AND user_id = $3
            "#,
        )
        .bind(id)
        .bind(recipe_name)
        .bind(user_id)
        .execute(&self.db)
        .await
        .context("delete comment")?;
        Ok(res.rows_affected())
    }
}
