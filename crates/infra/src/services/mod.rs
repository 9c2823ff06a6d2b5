//! Application services: use cases composed from the aggregate and a repository.

pub mod location_plan;

pub use location_plan::{AddBuilding, LocationPlanService, SavePlan, ServiceError};
