//! SQLite-backed location plan repository.
//!
//! A plan is spread over three tables:
//!
//! - `location_plans`: one row per passport, scalar fields
//! - `building_coordinates`: one row per building, keyed by `(passport_id, litera)`
//! - `coordinate_points`: one row per polygon vertex, keyed by `(building_id, seq)`
//!
//! Coordinates are written as their normalized two-decimal text (`"10.51"`) so
//! reading them back reproduces the exact value.
//!
//! `update` overwrites the parent row, deletes every child row of the plan and
//! inserts the current building set again. All of it happens in one unit of work.
//! `modify` runs the read, the caller's change and that write-back in a single
//! unit of work, so read-modify-write callers cannot lose each other's changes.

use chrono::{NaiveDate, SecondsFormat, Utc};
use futures::FutureExt;
use sqlx::sqlite::SqliteConnection;
use sqlx::FromRow;
use tracing::{debug, info, instrument, warn};

use techpassport_core::PassportId;
use techpassport_location_plan::{
    BuildingCoordinates, CoordinatePoint, LocationPlan, LocationPlanParts, PlanScale,
};

use super::r#trait::{check_same_passport, LocationPlanRepository, ModifyError};
use crate::db::error::map_sqlx_error;
use crate::db::{StorageError, UnitOfWork};

const PLAN_DATE_FORMAT: &str = "%Y-%m-%d";

/// Location plan repository over the shared SQLite connection.
#[derive(Debug, Clone)]
pub struct SqliteLocationPlanRepository {
    uow: UnitOfWork,
}

impl SqliteLocationPlanRepository {
    pub fn new(uow: UnitOfWork) -> Self {
        Self { uow }
    }

    pub fn unit_of_work(&self) -> &UnitOfWork {
        &self.uow
    }
}

/// Owned, storage-shaped copy of a plan, moved into the unit of work.
#[derive(Debug, Clone)]
struct PlanRecord {
    passport_id: String,
    scale: i64,
    executor_name: String,
    plan_date: String,
    notes: String,
    image_path: Option<String>,
    buildings: Vec<BuildingRecord>,
}

#[derive(Debug, Clone)]
struct BuildingRecord {
    litera: String,
    description: String,
    points: Vec<(String, String)>,
}

impl From<&LocationPlan> for PlanRecord {
    fn from(plan: &LocationPlan) -> Self {
        Self {
            passport_id: plan.passport_id().as_str().to_string(),
            scale: i64::from(plan.scale().denominator()),
            executor_name: plan.executor_name().to_string(),
            plan_date: plan.plan_date().format(PLAN_DATE_FORMAT).to_string(),
            notes: plan.notes().to_string(),
            image_path: plan.image_path().map(str::to_string),
            buildings: plan.buildings().iter().map(BuildingRecord::from).collect(),
        }
    }
}

impl From<&BuildingCoordinates> for BuildingRecord {
    fn from(building: &BuildingCoordinates) -> Self {
        Self {
            litera: building.litera().to_string(),
            description: building.description().to_string(),
            points: building
                .points()
                .iter()
                .map(|p| (p.x().to_string(), p.y().to_string()))
                .collect(),
        }
    }
}

#[derive(Debug, FromRow)]
struct PlanRow {
    passport_id: String,
    scale: i64,
    executor_name: String,
    plan_date: String,
    notes: String,
    image_path: Option<String>,
}

/// One row of the building/point join. Point columns are NULL for a building
/// without points, which only a damaged database can contain.
#[derive(Debug, FromRow)]
struct BuildingPointRow {
    litera: String,
    description: String,
    x: Option<String>,
    y: Option<String>,
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn corrupt(passport_id: &str, what: impl core::fmt::Display) -> StorageError {
    StorageError::CorruptRow(format!("location plan {passport_id}: {what}"))
}

async fn insert_plan_row(
    conn: &mut SqliteConnection,
    record: &PlanRecord,
    timestamp: &str,
) -> Result<(), StorageError> {
    sqlx::query(
        r#"
        INSERT INTO location_plans (
            passport_id, scale, executor_name, plan_date, notes, image_path,
            created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(record.passport_id.as_str())
    .bind(record.scale)
    .bind(record.executor_name.as_str())
    .bind(record.plan_date.as_str())
    .bind(record.notes.as_str())
    .bind(record.image_path.as_deref())
    .bind(timestamp)
    .bind(timestamp)
    .execute(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("insert_location_plan", e))?;
    Ok(())
}

/// Insert buildings, then their points with 1-based sequence numbers.
async fn insert_children(
    conn: &mut SqliteConnection,
    record: &PlanRecord,
) -> Result<(), StorageError> {
    for building in &record.buildings {
        let building_id = sqlx::query(
            "INSERT INTO building_coordinates (passport_id, litera, description) VALUES (?, ?, ?)",
        )
        .bind(record.passport_id.as_str())
        .bind(building.litera.as_str())
        .bind(building.description.as_str())
        .execute(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("insert_building_coordinates", e))?
        .last_insert_rowid();

        for (idx, (x, y)) in building.points.iter().enumerate() {
            let seq = i64::try_from(idx + 1).map_err(|_| StorageError::Database {
                operation: "insert_coordinate_point",
                message: format!("too many points in building '{}'", building.litera),
            })?;
            sqlx::query(
                "INSERT INTO coordinate_points (building_id, seq, x, y) VALUES (?, ?, ?, ?)",
            )
            .bind(building_id)
            .bind(seq)
            .bind(x.as_str())
            .bind(y.as_str())
            .execute(&mut *conn)
            .await
            .map_err(|e| map_sqlx_error("insert_coordinate_point", e))?;
        }
    }
    Ok(())
}

async fn delete_children(conn: &mut SqliteConnection, passport_id: &str) -> Result<(), StorageError> {
    sqlx::query(
        r#"
        DELETE FROM coordinate_points
        WHERE building_id IN (SELECT id FROM building_coordinates WHERE passport_id = ?)
        "#,
    )
    .bind(passport_id)
    .execute(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("delete_coordinate_points", e))?;

    sqlx::query("DELETE FROM building_coordinates WHERE passport_id = ?")
        .bind(passport_id)
        .execute(&mut *conn)
        .await
        .map_err(|e| map_sqlx_error("delete_building_coordinates", e))?;
    Ok(())
}

/// Overwrite the parent row, then drop and re-insert every child row.
async fn replace_plan(conn: &mut SqliteConnection, record: &PlanRecord) -> Result<(), StorageError> {
    let updated = sqlx::query(
        r#"
        UPDATE location_plans
        SET scale = ?, executor_name = ?, plan_date = ?, notes = ?,
            image_path = ?, updated_at = ?
        WHERE passport_id = ?
        "#,
    )
    .bind(record.scale)
    .bind(record.executor_name.as_str())
    .bind(record.plan_date.as_str())
    .bind(record.notes.as_str())
    .bind(record.image_path.as_deref())
    .bind(now_rfc3339())
    .bind(record.passport_id.as_str())
    .execute(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("update_location_plan", e))?
    .rows_affected();

    if updated == 0 {
        return Err(StorageError::NotFound(record.passport_id.clone()));
    }

    delete_children(&mut *conn, &record.passport_id).await?;
    insert_children(&mut *conn, record).await
}

async fn fetch_plan(
    conn: &mut SqliteConnection,
    passport_id: &str,
) -> Result<Option<LocationPlan>, StorageError> {
    let Some(row) = sqlx::query_as::<_, PlanRow>(
        r#"
        SELECT passport_id, scale, executor_name, plan_date, notes, image_path
        FROM location_plans
        WHERE passport_id = ?
        "#,
    )
    .bind(passport_id)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("load_location_plan", e))?
    else {
        return Ok(None);
    };

    let rows = sqlx::query_as::<_, BuildingPointRow>(
        r#"
        SELECT b.litera, b.description, p.x, p.y
        FROM building_coordinates b
        LEFT JOIN coordinate_points p ON p.building_id = b.id
        WHERE b.passport_id = ?
        ORDER BY b.litera ASC, p.seq ASC
        "#,
    )
    .bind(passport_id)
    .fetch_all(&mut *conn)
    .await
    .map_err(|e| map_sqlx_error("load_building_coordinates", e))?;

    let buildings = group_buildings(passport_id, rows)?;
    restore_plan(row, buildings).map(Some)
}

fn group_buildings(
    passport_id: &str,
    rows: Vec<BuildingPointRow>,
) -> Result<Vec<BuildingCoordinates>, StorageError> {
    // (litera, description, points) in query order
    let mut groups: Vec<(String, String, Vec<CoordinatePoint>)> = Vec::new();

    for row in rows {
        let is_new = groups.last().is_none_or(|(litera, _, _)| *litera != row.litera);
        if is_new {
            groups.push((row.litera.clone(), row.description, Vec::new()));
        }

        if let (Some(x), Some(y)) = (row.x, row.y) {
            let point = CoordinatePoint::from_strings(&x, &y).map_err(|e| {
                corrupt(passport_id, format_args!("building '{}': {e}", row.litera))
            })?;
            if let Some((_, _, points)) = groups.last_mut() {
                points.push(point);
            }
        }
    }

    groups
        .into_iter()
        .map(|(litera, description, points)| {
            BuildingCoordinates::create(&litera, Some(description.as_str()), points)
                .map_err(|e| corrupt(passport_id, format_args!("building '{litera}': {e}")))
        })
        .collect()
}

fn restore_plan(
    row: PlanRow,
    buildings: Vec<BuildingCoordinates>,
) -> Result<LocationPlan, StorageError> {
    let id = row.passport_id.as_str();
    let passport_id = PassportId::parse(id).map_err(|e| corrupt(id, e))?;
    let scale = PlanScale::try_from(row.scale).map_err(|e| corrupt(id, e))?;
    let plan_date = NaiveDate::parse_from_str(&row.plan_date, PLAN_DATE_FORMAT)
        .map_err(|e| corrupt(id, format_args!("plan date '{}': {e}", row.plan_date)))?;

    LocationPlan::restore(LocationPlanParts {
        passport_id,
        scale,
        executor_name: row.executor_name,
        plan_date: Some(plan_date),
        notes: row.notes,
        image_path: row.image_path,
        buildings,
    })
    .map_err(|e| corrupt(id, e))
}

impl LocationPlanRepository for SqliteLocationPlanRepository {
    #[instrument(
        skip(self, plan),
        fields(passport_id = %plan.passport_id(), building_count = plan.building_count()),
        err
    )]
    fn save(&self, plan: &LocationPlan) -> Result<(), StorageError> {
        let record = PlanRecord::from(plan);
        self.uow.execute("save_location_plan", move |conn| {
            async move {
                let now = now_rfc3339();
                insert_plan_row(&mut *conn, &record, &now).await?;
                insert_children(&mut *conn, &record).await?;
                info!(passport_id = %record.passport_id, "location plan saved");
                Ok(())
            }
            .boxed()
        })
    }

    #[instrument(skip(self), fields(passport_id = %passport_id), err)]
    fn find_by_passport_id(
        &self,
        passport_id: &PassportId,
    ) -> Result<Option<LocationPlan>, StorageError> {
        let id = passport_id.as_str().to_string();
        let found = self.uow.execute("find_location_plan", move |conn| {
            async move { fetch_plan(&mut *conn, &id).await }.boxed()
        })?;
        debug!(found = found.is_some(), "location plan lookup");
        Ok(found)
    }

    #[instrument(
        skip(self, plan),
        fields(passport_id = %plan.passport_id(), building_count = plan.building_count()),
        err
    )]
    fn update(&self, plan: &LocationPlan) -> Result<(), StorageError> {
        let record = PlanRecord::from(plan);
        self.uow.execute("update_location_plan", move |conn| {
            async move {
                replace_plan(&mut *conn, &record).await?;
                info!(passport_id = %record.passport_id, "location plan updated");
                Ok(())
            }
            .boxed()
        })
    }

    #[instrument(skip(self), fields(passport_id = %passport_id), err)]
    fn exists_by_passport_id(&self, passport_id: &PassportId) -> Result<bool, StorageError> {
        let id = passport_id.as_str().to_string();
        self.uow.execute("exists_location_plan", move |conn| {
            async move {
                let count = sqlx::query_scalar::<_, i64>(
                    "SELECT COUNT(*) FROM location_plans WHERE passport_id = ?",
                )
                .bind(id.as_str())
                .fetch_one(&mut *conn)
                .await
                .map_err(|e| map_sqlx_error("exists_location_plan", e))?;
                Ok(count > 0)
            }
            .boxed()
        })
    }

    #[instrument(skip(self), fields(passport_id = %passport_id), err)]
    fn delete(&self, passport_id: &PassportId) -> Result<bool, StorageError> {
        let id = passport_id.as_str().to_string();
        self.uow.execute("delete_location_plan", move |conn| {
            async move {
                // Buildings and points follow through ON DELETE CASCADE.
                let removed = sqlx::query("DELETE FROM location_plans WHERE passport_id = ?")
                    .bind(id.as_str())
                    .execute(&mut *conn)
                    .await
                    .map_err(|e| map_sqlx_error("delete_location_plan", e))?
                    .rows_affected();
                if removed > 0 {
                    info!(passport_id = %id, "location plan deleted");
                }
                Ok(removed > 0)
            }
            .boxed()
        })
    }

    #[instrument(skip(self, change), fields(passport_id = %passport_id))]
    fn modify<E, F>(
        &self,
        passport_id: &PassportId,
        change: F,
    ) -> Result<LocationPlan, ModifyError<E>>
    where
        E: Send + 'static,
        F: FnOnce(Option<LocationPlan>) -> Result<LocationPlan, E> + Send + 'static,
    {
        let expected_id = passport_id.clone();
        let outcome = self.uow.execute("modify_location_plan", move |conn| {
            async move {
                let existing = fetch_plan(&mut *conn, expected_id.as_str()).await?;
                let is_new = existing.is_none();

                let plan = match change(existing) {
                    Ok(plan) => plan,
                    // Nothing was written; committing the read is harmless.
                    Err(rejected) => return Ok(Err(rejected)),
                };
                check_same_passport(&expected_id, &plan)?;

                let record = PlanRecord::from(&plan);
                if is_new {
                    let now = now_rfc3339();
                    insert_plan_row(&mut *conn, &record, &now).await?;
                    insert_children(&mut *conn, &record).await?;
                } else {
                    replace_plan(&mut *conn, &record).await?;
                }
                info!(passport_id = %record.passport_id, created = is_new, "location plan modified");

                let stored = fetch_plan(&mut *conn, expected_id.as_str())
                    .await?
                    .ok_or_else(|| StorageError::NotFound(expected_id.to_string()))?;
                Ok(Ok(stored))
            }
            .boxed()
        });

        match outcome {
            Ok(Ok(plan)) => Ok(plan),
            Ok(Err(rejected)) => {
                debug!("location plan change rejected");
                Err(ModifyError::Rejected(rejected))
            }
            Err(err) => {
                warn!(error = %err, "location plan modification failed");
                Err(ModifyError::Storage(err))
            }
        }
    }
}
