use axum::{
    extract::State,
    http::StatusCode,
    routing::{post, put},
    Json, Router,
};

use crate::{
    error::AppError,
    extract::{JsonBody, RecordId},
    models::activity::{Activity, ActivityPayload},
    routes::Message,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/trips/:id/activities", post(create_activity))
        .route(
            "/activities/:id",
            put(update_activity).delete(delete_activity),
        )
}

async fn create_activity(
    State(state): State<AppState>,
    RecordId(trip_id): RecordId,
    JsonBody(payload): JsonBody<ActivityPayload>,
) -> Result<(StatusCode, Json<Activity>), AppError> {
    let activity = state.activities.create_activity(trip_id, payload).await?;
    Ok((StatusCode::CREATED, Json(activity)))
}

async fn update_activity(
    State(state): State<AppState>,
    RecordId(id): RecordId,
    JsonBody(patch): JsonBody<ActivityPayload>,
) -> Result<Json<Activity>, AppError> {
    Ok(Json(state.activities.update_activity(id, patch).await?))
}

async fn delete_activity(
    State(state): State<AppState>,
    RecordId(id): RecordId,
) -> Result<Json<Message>, AppError> {
    state.activities.delete_activity(id).await?;
    Ok(Json(Message {
        message: "Activity deleted successfully",
    }))
}
