//! Location plan use cases.
//!
//! Each mutating use case runs as one [`LocationPlanRepository::modify`] call:
//! the load, the guarded mutation and the write-back share a unit of work, so
//! concurrent commands on one passport cannot overwrite each other. A rejected
//! command never touches storage.

use std::sync::Arc;

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{info, instrument};

use techpassport_core::{DomainError, PassportId};
use techpassport_location_plan::{
    BuildingCoordinates, CoordinatePoint, CoordinateSystem, CoordinateSystemRegistry, LocationPlan,
    PlanScale,
};

use crate::db::StorageError;
use crate::location_plan_store::{LocationPlanRepository, ModifyError};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("no location plan for passport {0}")]
    PlanNotFound(PassportId),

    #[error("plan {passport_id} has no building '{litera}'")]
    BuildingNotFound {
        passport_id: PassportId,
        litera: String,
    },
}

impl From<ModifyError<ServiceError>> for ServiceError {
    fn from(err: ModifyError<ServiceError>) -> Self {
        match err {
            ModifyError::Rejected(e) => e,
            ModifyError::Storage(e) => Self::Storage(e),
        }
    }
}

impl ServiceError {
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::PlanNotFound(_) | Self::BuildingNotFound { .. } => true,
            Self::Storage(e) => e.is_not_found(),
            Self::Domain(DomainError::NotFound(_)) => true,
            Self::Domain(_) => false,
        }
    }
}

/// Create-or-update command for a plan's scalar fields.
///
/// `None` keeps the stored value (or the default for a new plan). Buildings are
/// never touched.
#[derive(Debug, Clone)]
pub struct SavePlan {
    pub passport_id: PassportId,
    pub scale: PlanScale,
    pub executor_name: Option<String>,
    pub plan_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub image_path: Option<String>,
}

impl SavePlan {
    pub fn new(passport_id: PassportId, scale: PlanScale) -> Self {
        Self {
            passport_id,
            scale,
            executor_name: None,
            plan_date: None,
            notes: None,
            image_path: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AddBuilding {
    pub passport_id: PassportId,
    pub litera: String,
    pub description: Option<String>,
    pub points: Vec<CoordinatePoint>,
}

/// Location plan use cases over any repository.
pub struct LocationPlanService<R> {
    repository: R,
    coordinate_systems: Arc<CoordinateSystemRegistry>,
}

impl<R> LocationPlanService<R>
where
    R: LocationPlanRepository,
{
    pub fn new(repository: R, coordinate_systems: Arc<CoordinateSystemRegistry>) -> Self {
        Self {
            repository,
            coordinate_systems,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Insert a new plan or update the scalar fields of the stored one.
    ///
    /// Concurrent saves of a new passport all succeed: the later ones update
    /// the plan the first one created.
    #[instrument(skip(self, command), fields(passport_id = %command.passport_id), err)]
    pub fn save_plan(&self, command: SavePlan) -> Result<LocationPlan, ServiceError> {
        let SavePlan {
            passport_id,
            scale,
            executor_name,
            plan_date,
            notes,
            image_path,
        } = command;

        let key = passport_id.clone();
        let plan = self.repository.modify(&key, move |existing| {
            if existing.is_none() {
                info!(scale = %scale, "creating location plan");
            }
            let mut plan = existing.unwrap_or_else(|| LocationPlan::new(passport_id, scale));
            plan.update_scale(scale);
            if let Some(executor_name) = executor_name {
                plan.update_executor(executor_name);
            }
            if let Some(plan_date) = plan_date {
                plan.update_plan_date(plan_date);
            }
            if let Some(notes) = notes {
                plan.update_notes(notes);
            }
            if image_path.is_some() {
                plan.set_image_path(image_path);
            }
            Ok::<_, ServiceError>(plan)
        })?;
        info!(scale = %plan.scale(), "location plan saved");
        Ok(plan)
    }

    #[instrument(skip(self), fields(passport_id = %passport_id), err)]
    pub fn load_plan(&self, passport_id: &PassportId) -> Result<LocationPlan, ServiceError> {
        self.repository
            .find_by_passport_id(passport_id)?
            .ok_or_else(|| ServiceError::PlanNotFound(passport_id.clone()))
    }

    #[instrument(
        skip(self, command),
        fields(passport_id = %command.passport_id, litera = %command.litera),
        err
    )]
    pub fn add_building(&self, command: AddBuilding) -> Result<LocationPlan, ServiceError> {
        let building = BuildingCoordinates::create(
            &command.litera,
            command.description.as_deref(),
            command.points,
        )?;
        let passport_id = command.passport_id;
        let key = passport_id.clone();
        let plan = self.repository.modify(&key, move |existing| {
            let mut plan = existing.ok_or(ServiceError::PlanNotFound(passport_id))?;
            plan.add_building_coordinates(building)?;
            Ok::<_, ServiceError>(plan)
        })?;
        Ok(plan)
    }

    /// Remove a building. Unlike the aggregate, an unknown litera is an error here.
    #[instrument(skip(self), fields(passport_id = %passport_id), err)]
    pub fn remove_building(
        &self,
        passport_id: &PassportId,
        litera: &str,
    ) -> Result<LocationPlan, ServiceError> {
        let owned_id = passport_id.clone();
        let litera = litera.trim().to_string();
        let plan = self.repository.modify(passport_id, move |existing| {
            let mut plan = existing.ok_or_else(|| ServiceError::PlanNotFound(owned_id.clone()))?;
            if !plan.remove_building_coordinates(&litera) {
                return Err(ServiceError::BuildingNotFound {
                    passport_id: owned_id,
                    litera,
                });
            }
            Ok(plan)
        })?;
        Ok(plan)
    }

    #[instrument(skip(self), fields(passport_id = %passport_id), err)]
    pub fn delete_plan(&self, passport_id: &PassportId) -> Result<(), ServiceError> {
        if self.repository.delete(passport_id)? {
            Ok(())
        } else {
            Err(ServiceError::PlanNotFound(passport_id.clone()))
        }
    }

    /// Regional coordinate system for a region code such as `"77"`.
    pub fn coordinate_system_for(&self, region_code: &str) -> Option<&CoordinateSystem> {
        self.coordinate_systems.lookup(region_code)
    }
}
