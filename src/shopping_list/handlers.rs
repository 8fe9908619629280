use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{info, instrument};

use super::aggregate::{aggregate, parse_recipe_id_list, recipe_ids_from_value, GuestCount};
use super::dto::{ShoppingListBody, ShoppingListQuery, ShoppingListResponse, ShoppingListView};
use crate::{error::AppError, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new().route("/lista-spesa", get(from_query).post(from_body))
}

const MISSING_PARAMS: &str =
    "Missing parameters: ricette (comma separated ids) and persone (number)";

/// Body-based entry point.
#[instrument(skip(state))]
pub async fn from_body(
    State(state): State<AppState>,
    Json(body): Json<ShoppingListBody>,
) -> Result<Json<ShoppingListResponse>, AppError> {
    let (Some(ids), Some(guests)) = (body.recipe_ids, body.guests) else {
        return Err(AppError::invalid("Invalid data: ricette and persone are required"));
    };
    let ids = recipe_ids_from_value(&ids)?;
    let guests = GuestCount::from_value(&guests)?;

    let list = aggregate(state.store.as_ref(), &ids, guests).await?;
    info!(recipes = ids.len(), %guests, items = list.line_items.len(), "shopping list generated");
    Ok(Json(ShoppingListResponse {
        line_items: list.line_items,
        recipe_names: list.recipe_names,
    }))
}

/// Query-string entry point; echoes the guest count and a timestamp.
#[instrument(skip(state))]
pub async fn from_query(
    State(state): State<AppState>,
    Query(query): Query<ShoppingListQuery>,
) -> Result<Json<ShoppingListView>, AppError> {
    let (Some(ids), Some(guests)) = (query.recipe_ids, query.guests) else {
        return Err(AppError::invalid(MISSING_PARAMS));
    };
    let guests: GuestCount = guests.parse()?;
    let ids = parse_recipe_id_list(&ids)?;

    let list = aggregate(state.store.as_ref(), &ids, guests).await?;
    info!(recipes = ids.len(), %guests, items = list.line_items.len(), "shopping list viewed");
    Ok(Json(ShoppingListView {
        recipe_names: list.recipe_names,
        line_items: list.line_items,
        guests,
        created_at: OffsetDateTime::now_utc(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::dto::UserContext;
    use crate::recipes::services::{create_recipe, RecipeInput};
    use serde_json::json;
    use uuid::Uuid;

    async fn seed(state: &AppState, name: &str, ingredients: serde_json::Value) -> Uuid {
        let chef = UserContext {
            id: Uuid::new_v4(),
            name: "Chef".into(),
            email: "chef@example.com".into(),
        };
        let input = RecipeInput::from_payload(
            serde_json::from_value(json!({
                "name": name,
                "ingredients": ingredients,
                "instructions": "cook"
            }))
            .unwrap(),
        )
        .unwrap();
        create_recipe(state.store.as_ref(), &chef, input).await.unwrap().id
    }

    #[tokio::test]
    async fn body_entry_point_aggregates_normalized_ingredients() {
        let state = AppState::fake();
        let r1 = seed(&state, "Sugo", json!(["200g tomato", "salt"])).await;
        let r2 = seed(&state, "Bruschetta", json!([{ "nome": "tomato", "quantita": 100, "unita": "g" }])).await;

        let Json(res) = from_body(
            State(state),
            Json(ShoppingListBody {
                recipe_ids: Some(json!([r1.to_string(), r2.to_string()])),
                guests: Some(json!(2)),
            }),
        )
        .await
        .unwrap();

        let json = serde_json::to_value(&res).unwrap();
        assert_eq!(
            json,
            json!({
                "listaSpesa": [
                    { "nome": "tomato", "quantita": 600, "unita": "g" },
                    { "nome": "salt", "quantita": 2, "unita": "pz" }
                ],
                "ricette": ["Sugo", "Bruschetta"]
            })
        );
    }

    #[tokio::test]
    async fn query_entry_point_echoes_guests() {
        let state = AppState::fake();
        let r1 = seed(&state, "Sugo", json!(["200g tomato"])).await;

        let Json(view) = from_query(
            State(state),
            Query(ShoppingListQuery {
                recipe_ids: Some(format!(" {r1} ")),
                guests: Some("3".into()),
            }),
        )
        .await
        .unwrap();

        assert_eq!(view.guests.get(), 3);
        assert_eq!(view.recipe_names, vec!["Sugo".to_string()]);
        assert_eq!(view.line_items[0].quantity, 600);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["persone"], json!(3));
        assert!(json["createdAt"].is_string());
    }

    #[tokio::test]
    async fn rejects_bad_input_before_touching_the_store() {
        let state = AppState::fake();
        for (ids, guests) in [
            (None, Some(json!(2))),
            (Some(json!([])), Some(json!(2))),
            (Some(json!([Uuid::new_v4().to_string()])), Some(json!(0))),
            (Some(json!([Uuid::new_v4().to_string()])), Some(json!(-3))),
            (Some(json!([Uuid::new_v4().to_string()])), Some(json!("many"))),
            (Some(json!(["not-an-id"])), Some(json!(2))),
        ] {
            let err = from_body(
                State(state.clone()),
                Json(ShoppingListBody {
                    recipe_ids: ids,
                    guests,
                }),
            )
            .await
            .unwrap_err();
            assert!(matches!(err, AppError::InvalidArgument(_)), "{err}");
        }

        let err = from_query(
            State(state),
            Query(ShoppingListQuery {
                recipe_ids: Some("abc".into()),
                guests: Some("2".into()),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "Invalid recipe id: abc");
    }

    #[tokio::test]
    async fn missing_recipe_is_not_found() {
        let state = AppState::fake();
        let r1 = seed(&state, "Sugo", json!(["salt"])).await;
        let err = from_query(
            State(state),
            Query(ShoppingListQuery {
                recipe_ids: Some(format!("{r1},{}", Uuid::new_v4())),
                guests: Some("1".into()),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
