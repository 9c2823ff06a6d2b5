//! Relational schema for location plans.
//!
//! Three tables, parent to leaf. Child rows go away with their parent through
//! `ON DELETE CASCADE`; the connection enables foreign keys.

use sqlx::sqlite::SqliteConnection;

use super::error::{map_sqlx_error, StorageError};

const STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS location_plans (
        passport_id    TEXT PRIMARY KEY NOT NULL,
        scale          INTEGER NOT NULL
                       CHECK (scale IN (100, 200, 500, 1000, 2000, 5000)),
        executor_name  TEXT NOT NULL DEFAULT '',
        plan_date      TEXT NOT NULL,
        notes          TEXT NOT NULL DEFAULT '',
        image_path     TEXT NULL,
        created_at     TEXT NOT NULL,
        updated_at     TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS building_coordinates (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        passport_id  TEXT NOT NULL
                     REFERENCES location_plans (passport_id) ON DELETE CASCADE,
        litera       TEXT NOT NULL,
        description  TEXT NOT NULL DEFAULT '',
        UNIQUE (passport_id, litera)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS coordinate_points (
        id           INTEGER PRIMARY KEY AUTOINCREMENT,
        building_id  INTEGER NOT NULL
                     REFERENCES building_coordinates (id) ON DELETE CASCADE,
        seq          INTEGER NOT NULL CHECK (seq >= 1),
        x            TEXT NOT NULL,
        y            TEXT NOT NULL,
        UNIQUE (building_id, seq)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_building_coordinates_passport ON building_coordinates (passport_id)",
    "CREATE INDEX IF NOT EXISTS idx_coordinate_points_building ON coordinate_points (building_id)",
];

/// Create missing tables and indexes. Safe to run on every start-up.
pub(crate) async fn apply(conn: &mut SqliteConnection) -> Result<(), StorageError> {
    for statement in STATEMENTS {
        sqlx::query(statement)
            .execute(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("apply_schema", e))?;
    }
    Ok(())
}
