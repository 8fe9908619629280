use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::models::Comment;

#[derive(Debug, Default, Deserialize)]
pub struct CreateCommentRequest {
    #[serde(rename = "testo")]
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CommentAuthor {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
}

/// Comment as listed under a recipe.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentListItem {
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "testo")]
    pub text: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub user: CommentAuthor,
}

impl From<Comment> for CommentListItem {
    fn from(c: Comment) -> Self {
        Self {
            id: c.id,
            text: c.text,
            created_at: c.created_at,
            user: CommentAuthor {
                id: c.user_id,
                name: c.user_name,
            },
        }
    }
}
