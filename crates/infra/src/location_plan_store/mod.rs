//! Location plan persistence.
//!
//! `LocationPlanRepository` is the storage contract. `SqliteLocationPlanRepository`
//! is the durable implementation over three related tables and
//! `InMemoryLocationPlanRepository` serves tests and dry runs.

pub mod in_memory;
pub mod sqlite;
pub mod r#trait;

pub use in_memory::InMemoryLocationPlanRepository;
pub use r#trait::{LocationPlanRepository, ModifyError};
pub use sqlite::SqliteLocationPlanRepository;
