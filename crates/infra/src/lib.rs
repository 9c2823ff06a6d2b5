//! Infrastructure layer: SQLite storage, configuration and use-case services.

pub mod config;
pub mod db;
pub mod location_plan_store;
pub mod services;

#[cfg(test)]
mod integration_tests;

pub use config::{DatabaseLocation, StorageConfig};
pub use db::{ConnectionProvider, StorageError, UnitOfWork};
pub use location_plan_store::{
    InMemoryLocationPlanRepository, LocationPlanRepository, ModifyError,
    SqliteLocationPlanRepository,
};
pub use services::{AddBuilding, LocationPlanService, SavePlan, ServiceError};
