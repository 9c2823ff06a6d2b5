//! Location plan domain module.
//!
//! The site plan of a technical passport: its scale, metadata and the outlines
//! of the buildings on it. Pure domain logic (no IO, no storage).

pub mod building;
pub mod coordinate;
pub mod coordinate_system;
pub mod plan;
pub mod scale;
pub mod view;

pub use building::{BuildingCoordinates, MIN_POLYGON_POINTS};
pub use coordinate::{Coordinate, CoordinatePoint};
pub use coordinate_system::{CoordinateSystem, CoordinateSystemRegistry};
pub use plan::{LocationPlan, LocationPlanParts};
pub use scale::PlanScale;
pub use view::{BuildingView, LocationPlanView};
