use tracing::info;

use crate::{
    db::DbPool,
    error::AppError,
    models::activity::{Activity, ActivityFields, ActivityPayload},
};

pub(crate) const ACTIVITY_COLUMNS: &str = "id, trip_id, name, type, date, location, notes, status";

#[derive(Clone)]
pub struct ActivityService {
    db: DbPool,
}

impl ActivityService {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    pub async fn create_activity(
        &self,
        trip_id: i64,
        payload: ActivityPayload,
    ) -> Result<Activity, AppError> {
        let trip: Option<i64> = sqlx::query_scalar("SELECT id FROM trip WHERE id = ?")
            .bind(trip_id)
            .fetch_optional(&self.db)
            .await?;
        if trip.is_none() {
            return Err(AppError::NotFound("Trip"));
        }

        let fields = ActivityFields::from_payload(payload)?;
        let id = sqlx::query(
            "INSERT INTO activity (trip_id, name, type, date, location, notes, status) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(trip_id)
        .bind(&fields.name)
        .bind(&fields.kind)
        .bind(fields.date)
        .bind(&fields.location)
        .bind(&fields.notes)
        .bind(&fields.status)
        .execute(&self.db)
        .await?
        .last_insert_rowid();

        info!(activity_id = id, trip_id, "activity created");
        self.find_activity(id).await
    }

    pub async fn update_activity(
        &self,
        id: i64,
        patch: ActivityPayload,
    ) -> Result<Activity, AppError> {
        let existing = ActivityFields::from(self.find_activity(id).await?);
        let fields = existing.apply_patch(patch)?;

        sqlx::query(
            "UPDATE activity SET name = ?, type = ?, date = ?, location = ?, notes = ?, status = ? \
             WHERE id = ?",
        )
        .bind(&fields.name)
        .bind(&fields.kind)
        .bind(fields.date)
        .bind(&fields.location)
        .bind(&fields.notes)
        .bind(&fields.status)
        .bind(id)
        .execute(&self.db)
        .await?;

        info!(activity_id = id, "activity updated");
        self.find_activity(id).await
    }

    pub async fn delete_activity(&self, id: i64) -> Result<(), AppError> {
        let removed = sqlx::query("DELETE FROM activity WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?
            .rows_affected();
        if removed == 0 {
            return Err(AppError::NotFound("Activity"));
        }
        info!(activity_id = id, "activity deleted");
        Ok(())
    }

    async fn find_activity(&self, id: i64) -> Result<Activity, AppError> {
        let activity: Option<Activity> =
            sqlx::query_as(&format!("SELECT {ACTIVITY_COLUMNS} FROM activity WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.db)
                .await?;
        activity.ok_or(AppError::NotFound("Activity"))
    }
}
