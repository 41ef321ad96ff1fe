use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};

use crate::{
    error::AppError,
    extract::{JsonBody, RecordId},
    models::trip::{Trip, TripDetail, TripPayload},
    routes::Message,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/trips", get(list_trips).post(create_trip))
        .route(
            "/trips/:id",
            get(get_trip).put(update_trip).delete(delete_trip),
        )
}

async fn create_trip(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<TripPayload>,
) -> Result<(StatusCode, Json<Trip>), AppError> {
    let trip = state.trips.create_trip(payload).await?;
    Ok((StatusCode::CREATED, Json(trip)))
}

async fn list_trips(State(state): State<AppState>) -> Result<Json<Vec<Trip>>, AppError> {
    Ok(Json(state.trips.list_trips().await?))
}

async fn get_trip(
    State(state): State<AppState>,
    RecordId(id): RecordId,
) -> Result<Json<TripDetail>, AppError> {
    Ok(Json(state.trips.get_trip(id).await?))
}

async fn update_trip(
    State(state): State<AppState>,
    RecordId(id): RecordId,
    JsonBody(patch): JsonBody<TripPayload>,
) -> Result<Json<Trip>, AppError> {
    Ok(Json(state.trips.update_trip(id, patch).await?))
}

async fn delete_trip(
    State(state): State<AppState>,
    RecordId(id): RecordId,
) -> Result<Json<Message>, AppError> {
    state.trips.delete_trip(id).await?;
    Ok(Json(Message {
        message: "Trip deleted successfully",
    }))
}
