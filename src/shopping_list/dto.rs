use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;

use super::aggregate::{GuestCount, LineItem};

/// `POST /lista-spesa` body: `{ricette: [id...], persone: n}`.
#[derive(Debug, Default, Deserialize)]
pub struct ShoppingListBody {
    #[serde(rename = "ricette")]
    pub recipe_ids: Option<Value>,
    #[serde(rename = "persone")]
    pub guests: Option<Value>,
}

/// `GET /lista-spesa?ricette=id1,id2&persone=n`.
#[derive(Debug, Default, Deserialize)]
pub struct ShoppingListQuery {
    #[serde(rename = "ricette")]
    pub recipe_ids: Option<String>,
    #[serde(rename = "persone")]
    pub guests: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ShoppingListResponse {
    #[serde(rename = "listaSpesa")]
    pub line_items: Vec<LineItem>,
    #[serde(rename = "ricette")]
    pub recipe_names: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ShoppingListView {
    #[serde(rename = "ricette")]
    pub recipe_names: Vec<String>,
    #[serde(rename = "listaSpesa")]
    pub line_items: Vec<LineItem>,
    #[serde(rename = "persone")]
    pub guests: GuestCount,
    #[serde(rename = "createdAt", with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}
