use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::{error::AppError, models::place::PlaceSearchResponse, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new().route("/places/search", get(search_places))
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    query: Option<String>,
}

async fn search_places(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<PlaceSearchResponse>, AppError> {
    Ok(Json(state.places.search(params.query.as_deref()).await?))
}
