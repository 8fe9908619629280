use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::dto::{CommentListItem, CreateCommentRequest};
use crate::{
    auth::{dto::MessageResponse, AuthUser},
    error::AppError,
    models::{Comment, NewComment},
    recipes::handlers::parse_id,
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/ricette/:nome/commenti", get(list_comments).post(add_comment))
        .route("/ricette/:nome/commenti/:id", delete(delete_comment))
}

#[instrument(skip(state, payload))]
pub async fn add_comment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(recipe_name): Path<String>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    let text = payload
        .text
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::invalid("Comment cannot be empty"))?;

    if state.store.find_recipe_by_name(&recipe_name).await?.is_none() {
        warn!(%recipe_name, "comment on unknown recipe");
        return Err(AppError::not_found("Recipe not found"));
    }

    let comment = state
        .store
        .insert_comment(&NewComment {
            recipe_name,
            user_id: user.id,
            user_name: user.name,
            text,
        })
        .await?;

    info!(comment_id = %comment.id, user_id = %user.id, "comment added");
    Ok((StatusCode::CREATED, Json(comment)))
}

#[instrument(skip(state))]
pub async fn list_comments(
    State(state): State<AppState>,
    Path(recipe_name): Path<String>,
) -> Result<Json<Vec<CommentListItem>>, AppError> {
    let comments = state.store.list_comments_for_recipe(&recipe_name).await?;
    Ok(Json(comments.into_iter().map(CommentListItem::from).collect()))
}

#[instrument(skip(state))]
pub async fn delete_comment(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path((recipe_name, id)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, AppError> {
    let id = parse_id(&id)?;
    let deleted = state.store.delete_comment(id, &recipe_name, user.id).await?;
    if deleted == 0 {
        return Err(AppError::not_found("Comment not found or not authorized"));
    }

    info!(comment_id = %id, user_id = %user.id, "comment deleted");
    Ok(Json(MessageResponse {
        message: "Comment deleted".into(),
    }))
}
