use std::sync::Arc;

use thiserror::Error;

use techpassport_core::PassportId;
use techpassport_location_plan::LocationPlan;

use crate::db::StorageError;

/// Durable storage for location plans, keyed by passport id.
///
/// ## Semantics
///
/// - `save` inserts a new plan with all of its buildings and points. A plan
///   already stored under the same passport id is a conflict.
/// - `find_by_passport_id` rebuilds the aggregate. Buildings come back ordered
///   by litera, points in the order they were saved.
/// - `update` replaces the stored plan: scalar fields are overwritten and the
///   whole building set is deleted and written again. A missing plan is
///   `StorageError::NotFound` and nothing is written.
/// - `delete` removes the plan and every child row. Returns whether a plan was
///   removed.
/// - `modify` loads the stored plan, hands it to a change and writes the result
///   back, all in one unit of work. Concurrent `modify` calls on the same
///   passport therefore never overwrite each other's changes.
///
/// Each call is atomic: it either completes in full or leaves storage as it was.
/// Calls block the current thread.
pub trait LocationPlanRepository: Send + Sync {
    fn save(&self, plan: &LocationPlan) -> Result<(), StorageError>;

    fn find_by_passport_id(
        &self,
        passport_id: &PassportId,
    ) -> Result<Option<LocationPlan>, StorageError>;

    fn update(&self, plan: &LocationPlan) -> Result<(), StorageError>;

    fn exists_by_passport_id(&self, passport_id: &PassportId) -> Result<bool, StorageError>;

    fn delete(&self, passport_id: &PassportId) -> Result<bool, StorageError>;

    /// Atomically read, change and write back one plan.
    ///
    /// `change` receives the stored plan (`None` if there is none) and returns
    /// the plan to store: a new plan is inserted, an existing one replaced. The
    /// returned plan must keep `passport_id`. When `change` rejects, nothing is
    /// written and its error comes back as `ModifyError::Rejected`.
    fn modify<E, F>(
        &self,
        passport_id: &PassportId,
        change: F,
    ) -> Result<LocationPlan, ModifyError<E>>
    where
        E: Send + 'static,
        F: FnOnce(Option<LocationPlan>) -> Result<LocationPlan, E> + Send + 'static;
}

/// Failure of [`LocationPlanRepository::modify`].
#[derive(Debug, Error)]
pub enum ModifyError<E> {
    /// The change itself refused; storage is untouched.
    #[error(transparent)]
    Rejected(E),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// The plan returned by a change must stay under the passport it was loaded for.
pub(crate) fn check_same_passport(
    passport_id: &PassportId,
    plan: &LocationPlan,
) -> Result<(), StorageError> {
    if plan.passport_id() == passport_id {
        Ok(())
    } else {
        Err(StorageError::Conflict {
            operation: "modify_location_plan",
            message: format!(
                "change for passport {passport_id} returned plan {}",
                plan.passport_id()
            ),
        })
    }
}

impl<S> LocationPlanRepository for Arc<S>
where
    S: LocationPlanRepository + ?Sized,
{
    fn save(&self, plan: &LocationPlan) -> Result<(), StorageError> {
        (**self).save(plan)
    }

    fn find_by_passport_id(
        &self,
        passport_id: &PassportId,
    ) -> Result<Option<LocationPlan>, StorageError> {
        (**self).find_by_passport_id(passport_id)
    }

    fn update(&self, plan: &LocationPlan) -> Result<(), StorageError> {
        (**self).update(plan)
    }

    fn exists_by_passport_id(&self, passport_id: &PassportId) -> Result<bool, StorageError> {
        (**self).exists_by_passport_id(passport_id)
    }

    fn delete(&self, passport_id: &PassportId) -> Result<bool, StorageError> {
        (**self).delete(passport_id)
    }

    fn modify<E, F>(
        &self,
        passport_id: &PassportId,
        change: F,
    ) -> Result<LocationPlan, ModifyError<E>>
    where
        E: Send + 'static,
        F: FnOnce(Option<LocationPlan>) -> Result<LocationPlan, E> + Send + 'static,
    {
        (**self).modify(passport_id, change)
    }
}
