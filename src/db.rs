use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use crate::error::AppError;

pub type DbPool = SqlitePool;

/// Columns added after the first public schema. Installations created before
/// a column existed get it added on startup; nothing is ever dropped.
const TRIP_COLUMNS: &[(&str, &str)] = &[
    ("origin", "VARCHAR(200)"),
    ("origin_place_name", "VARCHAR(255)"),
    ("origin_lat", "FLOAT"),
    ("origin_lng", "FLOAT"),
    ("origin_mapbox_id", "VARCHAR(100)"),
    ("destination", "VARCHAR(200)"),
    ("destination_place_name", "VARCHAR(255)"),
    ("destination_lat", "FLOAT"),
    ("destination_lng", "FLOAT"),
    ("destination_mapbox_id", "VARCHAR(100)"),
    ("is_round_trip", "BOOLEAN NOT NULL DEFAULT 0"),
    ("start_date", "DATE"),
    ("end_date", "DATE"),
    ("summary", "TEXT"),
    ("people", "TEXT"),
    ("created_at", "DATETIME"),
];

const ACTIVITY_COLUMNS: &[(&str, &str)] = &[
    ("type", "VARCHAR(50)"),
    ("date", "DATETIME"),
    ("location", "VARCHAR(200)"),
    ("notes", "TEXT"),
    ("status", "VARCHAR(20) DEFAULT 'planned'"),
];

pub async fn init_pool(database_url: &str) -> Result<DbPool, AppError> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Creates missing tables, then adds any column an older database lacks.
/// Safe to run on every startup.
pub async fn run_migrations(pool: &DbPool) -> Result<(), AppError> {
    sqlx::migrate!("./migrations").run(pool).await?;

    let added = backfill_columns(pool, "trip", TRIP_COLUMNS).await?
        + backfill_columns(pool, "activity", ACTIVITY_COLUMNS).await?;
    if added > 0 {
        info!("schema upgrade added {added} column(s)");
    }
    Ok(())
}

async fn backfill_columns(
    pool: &DbPool,
    table: &str,
    columns: &[(&str, &str)],
) -> Result<usize, AppError> {
    let existing: Vec<String> =
        sqlx::query_scalar(&format!("SELECT name FROM pragma_table_info('{table}')"))
            .fetch_all(pool)
            .await?;

    let mut added = 0;
    for (name, ddl) in columns {
        if existing.iter().any(|column| column == name) {
            continue;
        }
        sqlx::query(&format!("ALTER TABLE {table} ADD COLUMN {name} {ddl}"))
            .execute(pool)
            .await?;
        info!("added column {table}.{name}");
        added += 1;
    }
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn temp_pool(dir: &TempDir) -> DbPool {
        let url = format!("sqlite://{}", dir.path().join("schema.sqlite").to_string_lossy());
        init_pool(&url).await.expect("pool")
    }

    #[tokio::test]
    async fn fresh_database_gets_full_schema() {
        let dir = TempDir::new().expect("temp dir");
        let pool = temp_pool(&dir).await;
        run_migrations(&pool).await.expect("migrate");

        let columns: Vec<String> = sqlx::query_scalar("SELECT name FROM pragma_table_info('trip')")
            .fetch_all(&pool)
            .await
            .expect("columns");
        for (name, _) in TRIP_COLUMNS {
            assert!(columns.iter().any(|c| c == name), "missing {name}");
        }
    }

    #[tokio::test]
    async fn legacy_trip_table_is_upgraded_in_place() {
        let dir = TempDir::new().expect("temp dir");
        let pool = temp_pool(&dir).await;
        sqlx::query(
            "CREATE TABLE trip (id INTEGER PRIMARY KEY, name VARCHAR(100) NOT NULL, \
             destination VARCHAR(200), start_date DATE, end_date DATE, summary TEXT, \
             people TEXT, created_at DATETIME)",
        )
        .execute(&pool)
        .await
        .expect("legacy table");
        sqlx::query("INSERT INTO trip (name, destination) VALUES ('Lisbon', 'Lisbon')")
            .execute(&pool)
            .await
            .expect("legacy row");

        run_migrations(&pool).await.expect("first upgrade");
        run_migrations(&pool).await.expect("second upgrade is a no-op");

        let (name, origin_lat, round_trip): (String, Option<f64>, bool) =
            sqlx::query_as("SELECT name, origin_lat, is_round_trip FROM trip")
                .fetch_one(&pool)
                .await
                .expect("row survives");
        assert_eq!(name, "Lisbon");
        assert_eq!(origin_lat, None);
        assert!(!round_trip);
    }
}
