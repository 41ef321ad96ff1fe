pub mod activities;
pub mod places;
pub mod trips;

use axum::{routing::get, Router};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .merge(trips::router())
        .merge(activities::router())
        .merge(places::router());

    Router::new()
        .route("/", get(banner))
        .nest("/api", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn banner() -> &'static str {
    "Co-Planet API is running!"
}

#[derive(Debug, Serialize)]
pub struct Message {
    pub message: &'static str,
}
