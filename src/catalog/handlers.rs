use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use tracing::instrument;

use super::FoodItem;
use crate::{auth::AuthUser, state::AppState};

const MAX_RESULTS: usize = 50;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/foods/search", get(search_foods))
        .route("/foods/:id", get(get_food))
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
    pub category: Option<String>,
    pub subcategory: Option<String>,
}

#[instrument(skip(state))]
pub async fn search_foods(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Query(p): Query<SearchParams>,
) -> Json<Vec<FoodItem>> {
    let items = state
        .catalog
        .search(&p.q, p.category.as_deref(), p.subcategory.as_deref())
        .into_iter()
        .take(MAX_RESULTS)
        .cloned()
        .collect();
    Json(items)
}

/// GET /foods/:id
#[instrument(skip(state))]
pub async fn get_food(
    State(state): State<AppState>,
    AuthUser(_user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<FoodItem>, (StatusCode, String)> {
    state
        .catalog
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "food not found".into()))
}
