use chrono::Utc;
use tracing::info;

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        activity::Activity,
        trip::{Trip, TripDetail, TripFields, TripPayload, TripRow},
    },
    services::activities::ACTIVITY_COLUMNS,
};

const TRIP_COLUMNS: &str = "id, name, origin, origin_place_name, origin_lat, origin_lng, \
    origin_mapbox_id, destination, destination_place_name, destination_lat, destination_lng, \
    destination_mapbox_id, is_round_trip, start_date, end_date, summary, people, created_at";

#[derive(Clone)]
pub struct TripService {
    db: DbPool,
}

impl TripService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub async fn create_trip(&self, payload: TripPayload) -> Result<Trip, AppError> {
        let fields = TripFields::from_payload(payload)?;
        let people = fields.people_json()?;

        let id = sqlx::query(
            r#"INSERT INTO trip (name, origin, origin_place_name, origin_lat, origin_lng,
                origin_mapbox_id, destination, destination_place_name, destination_lat,
                destination_lng, destination_mapbox_id, is_round_trip, start_date, end_date,
                summary, people, created_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&fields.name)
        .bind(&fields.origin)
        .bind(&fields.origin_place_name)
        .bind(fields.origin_lat)
        .bind(fields.origin_lng)
        .bind(&fields.origin_mapbox_id)
        .bind(&fields.destination)
        .bind(&fields.destination_place_name)
        .bind(fields.destination_lat)
        .bind(fields.destination_lng)
        .bind(&fields.destination_mapbox_id)
        .bind(fields.is_round_trip)
        .bind(fields.start_date)
        .bind(fields.end_date)
        .bind(&fields.summary)
        .bind(people)
        .bind(Utc::now())
        .execute(&self.db)
        .await?
        .last_insert_rowid();

        info!(trip_id = id, round_trip = fields.is_round_trip, "trip created");
        self.find_trip(id).await
    }

    /// Most recent first.
    pub async fn list_trips(&self) -> Result<Vec<Trip>, AppError> {
        let rows: Vec<TripRow> = sqlx::query_as(&format!(
            "SELECT {TRIP_COLUMNS} FROM trip ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.db)
        .await?;
        Ok(rows.into_iter().map(Trip::from).collect())
    }

    pub async fn get_trip(&self, id: i64) -> Result<TripDetail, AppError> {
        let trip = self.find_trip(id).await?;
        let activities: Vec<Activity> = sqlx::query_as(&format!(
            "SELECT {ACTIVITY_COLUMNS} FROM activity WHERE trip_id = ? ORDER BY id"
        ))
        .bind(id)
        .fetch_all(&self.db)
        .await?;
        Ok(TripDetail { trip, activities })
    }

    pub async fn update_trip(&self, id: i64, patch: TripPayload) -> Result<Trip, AppError> {
        let existing = self.find_trip(id).await?;
        let fields = existing.fields.apply_patch(patch)?;
        let people = fields.people_json()?;

        sqlx::query(
            r#"UPDATE trip SET name = ?, origin = ?, origin_place_name = ?, origin_lat = ?,
                origin_lng = ?, origin_mapbox_id = ?, destination = ?, destination_place_name = ?,
                destination_lat = ?, destination_lng = ?, destination_mapbox_id = ?,
                is_round_trip = ?, start_date = ?, end_date = ?, summary = ?, people = ?
               WHERE id = ?"#,
        )
        .bind(&fields.name)
        .bind(&fields.origin)
        .bind(&fields.origin_place_name)
        .bind(fields.origin_lat)
        .bind(fields.origin_lng)
        .bind(&fields.origin_mapbox_id)
        .bind(&fields.destination)
        .bind(&fields.destination_place_name)
        .bind(fields.destination_lat)
        .bind(fields.destination_lng)
        .bind(&fields.destination_mapbox_id)
        .bind(fields.is_round_trip)
        .bind(fields.start_date)
        .bind(fields.end_date)
        .bind(&fields.summary)
        .bind(people)
        .bind(id)
        .execute(&self.db)
        .await?;

        info!(trip_id = id, "trip updated");
        self.find_trip(id).await
    }

    /// Deletes the trip and its activities in one transaction.
    pub async fn delete_trip(&self, id: i64) -> Result<(), AppError> {
        let mut tx = self.db.begin().await?;
        let removed_activities = sqlx::query("DELETE FROM activity WHERE trip_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let removed = sqlx::query("DELETE FROM trip WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        if removed == 0 {
            tx.rollback().await?;
            return Err(AppError::NotFound("Trip"));
        }
        tx.commit().await?;

        info!(trip_id = id, removed_activities, "trip deleted");
        Ok(())
    }

    async fn find_trip(&self, id: i64) -> Result<Trip, AppError> {
        let row: Option<TripRow> =
            sqlx::query_as(&format!("SELECT {TRIP_COLUMNS} FROM trip WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.db)
                .await?;
        row.map(Trip::from).ok_or(AppError::NotFound("Trip"))
    }
}
