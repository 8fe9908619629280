use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{CreatedRecipeResponse, RecipePayload, UpdatedRecipeResponse};
use super::services::{create_recipe, update_recipe, RecipeInput};
use crate::{auth::AuthUser, error::AppError, models::Recipe, state::AppState};

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes", get(list_recipes))
        .route("/myrecipes", get(list_my_recipes))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/recipes", post(create))
        .route("/recipes/:id", put(update))
}

pub(crate) fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::invalid(format!("Invalid id: {raw}")))
}

#[instrument(skip(state))]
pub async fn list_recipes(State(state): State<AppState>) -> Result<Json<Vec<Recipe>>, AppError> {
    Ok(Json(state.store.list_recipes().await?))
}

#[instrument(skip(state))]
pub async fn list_my_recipes(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<Recipe>>, AppError> {
    Ok(Json(state.store.list_recipes_by_creator(user.id).await?))
}

#[instrument(skip(state, payload))]
pub async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(payload): Json<RecipePayload>,
) -> Result<(StatusCode, Json<CreatedRecipeResponse>), AppError> {
    let input = RecipeInput::from_payload(payload)?;
    let recipe = create_recipe(state.store.as_ref(), &user, input).await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedRecipeResponse {
            message: "Recipe created".into(),
            recipe_id: recipe.id,
            recipe,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn update(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    Json(payload): Json<RecipePayload>,
) -> Result<Json<UpdatedRecipeResponse>, AppError> {
    let id = parse_id(&id)?;
    let input = RecipeInput::from_payload(payload)?;
    let recipe = update_recipe(state.store.as_ref(), &user, id, input).await?;
    Ok(Json(UpdatedRecipeResponse {
        message: "Recipe updated".into(),
        recipe,
    }))
}
