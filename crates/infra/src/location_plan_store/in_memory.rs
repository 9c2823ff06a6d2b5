use std::collections::HashMap;
use std::sync::RwLock;

use techpassport_core::PassportId;
use techpassport_location_plan::{LocationPlan, LocationPlanParts};

use super::r#trait::{check_same_passport, LocationPlanRepository, ModifyError};
use crate::db::StorageError;

/// In-memory location plan repository.
///
/// Intended for tests/dev. Follows the same ordering and conflict rules as the
/// SQLite repository.
#[derive(Debug, Default)]
pub struct InMemoryLocationPlanRepository {
    plans: RwLock<HashMap<PassportId, LocationPlan>>,
}

impl InMemoryLocationPlanRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.plans.read().map(|plans| plans.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn lock_poisoned() -> StorageError {
    StorageError::Connection("lock poisoned".to_string())
}

/// Copy of `plan` with buildings sorted by litera, as storage returns them.
fn ordered(plan: &LocationPlan) -> Result<LocationPlan, StorageError> {
    let mut buildings = plan.buildings().to_vec();
    buildings.sort_by(|a, b| a.litera().cmp(b.litera()));

    LocationPlan::restore(LocationPlanParts {
        passport_id: plan.passport_id().clone(),
        scale: plan.scale(),
        executor_name: plan.executor_name().to_string(),
        plan_date: Some(plan.plan_date()),
        notes: plan.notes().to_string(),
        image_path: plan.image_path().map(str::to_string),
        buildings,
    })
    .map_err(|e| StorageError::CorruptRow(e.to_string()))
}

impl LocationPlanRepository for InMemoryLocationPlanRepository {
    fn save(&self, plan: &LocationPlan) -> Result<(), StorageError> {
        let mut plans = self.plans.write().map_err(|_| lock_poisoned())?;
        if plans.contains_key(plan.passport_id()) {
            return Err(StorageError::Conflict {
                operation: "save_location_plan",
                message: format!("location plan for passport {} already exists", plan.passport_id()),
            });
        }
        plans.insert(plan.passport_id().clone(), plan.clone());
        Ok(())
    }

    fn find_by_passport_id(
        &self,
        passport_id: &PassportId,
    ) -> Result<Option<LocationPlan>, StorageError> {
        let plans = self.plans.read().map_err(|_| lock_poisoned())?;
        plans.get(passport_id).map(ordered).transpose()
    }

    fn update(&self, plan: &LocationPlan) -> Result<(), StorageError> {
        let mut plans = self.plans.write().map_err(|_| lock_poisoned())?;
        match plans.get_mut(plan.passport_id()) {
            Some(stored) => {
                *stored = plan.clone();
                Ok(())
            }
            None => Err(StorageError::NotFound(plan.passport_id().to_string())),
        }
    }

    fn exists_by_passport_id(&self, passport_id: &PassportId) -> Result<bool, StorageError> {
        let plans = self.plans.read().map_err(|_| lock_poisoned())?;
        Ok(plans.contains_key(passport_id))
    }

    fn delete(&self, passport_id: &PassportId) -> Result<bool, StorageError> {
        let mut plans = self.plans.write().map_err(|_| lock_poisoned())?;
        Ok(plans.remove(passport_id).is_some())
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
        // The write lock is held across the change, so modifications serialize.
        let mut plans = self.plans.write().map_err(|_| lock_poisoned())?;
        let existing = plans.get(passport_id).map(ordered).transpose()?;

        let plan = change(existing).map_err(ModifyError::Rejected)?;
        check_same_passport(passport_id, &plan)?;

        let stored = ordered(&plan)?;
        plans.insert(passport_id.clone(), plan);
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use techpassport_location_plan::{BuildingCoordinates, CoordinatePoint, PlanScale};

    fn triangle(litera: &str) -> BuildingCoordinates {
        BuildingCoordinates::create(
            litera,
            None,
            [
                CoordinatePoint::new(0.0, 0.0).unwrap(),
                CoordinatePoint::new(10.0, 0.0).unwrap(),
                CoordinatePoint::new(10.0, 10.0).unwrap(),
            ],
        )
        .unwrap()
    }

    fn plan(id: &str) -> LocationPlan {
        LocationPlan::new(PassportId::parse(id).unwrap(), PlanScale::new(500).unwrap())
    }

    #[test]
    fn save_find_and_delete() {
        let repo = InMemoryLocationPlanRepository::new();
        let mut p = plan("P-1");
        p.add_building_coordinates(triangle("Б")).unwrap();
        p.add_building_coordinates(triangle("А")).unwrap();
        repo.save(&p).unwrap();

        let loaded = repo.find_by_passport_id(p.passport_id()).unwrap().unwrap();
        let literas: Vec<_> = loaded.buildings().iter().map(|b| b.litera()).collect();
        assert_eq!(literas, vec!["А", "Б"]);
        assert!(repo.exists_by_passport_id(p.passport_id()).unwrap());

        assert!(repo.delete(p.passport_id()).unwrap());
        assert!(!repo.delete(p.passport_id()).unwrap());
        assert!(repo.find_by_passport_id(p.passport_id()).unwrap().is_none());
        assert!(repo.is_empty());
    }

    #[test]
    fn save_twice_is_a_conflict() {
        let repo = InMemoryLocationPlanRepository::new();
        let p = plan("P-1");
        repo.save(&p).unwrap();
        assert!(repo.save(&p).unwrap_err().is_conflict());
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn modify_creates_updates_and_rejects() {
        let repo = InMemoryLocationPlanRepository::new();
        let id = PassportId::parse("P-1").unwrap();

        let created = repo
            .modify(&id, |existing| {
                assert!(existing.is_none());
                Ok::<_, String>(plan("P-1"))
            })
            .unwrap();
        assert_eq!(created.building_count(), 0);

        repo.modify(&id, |existing| {
            let mut p = existing.unwrap();
            p.add_building_coordinates(triangle("A")).unwrap();
            Ok::<_, String>(p)
        })
        .unwrap();

        let err = repo
            .modify(&id, |_| Err::<LocationPlan, _>("refused".to_string()))
            .unwrap_err();
        assert!(matches!(err, ModifyError::Rejected(ref m) if m == "refused"));

        let err = repo
            .modify(&id, |_| Ok::<_, String>(plan("P-2")))
            .unwrap_err();
        assert!(matches!(err, ModifyError::Storage(ref e) if e.is_conflict()));

        let stored = repo.find_by_passport_id(&id).unwrap().unwrap();
        assert_eq!(stored.building_count(), 1);
        assert_eq!(repo.len(), 1);
    }

    #[test]
    fn update_requires_existing_plan() {
        let repo = InMemoryLocationPlanRepository::new();
        let mut p = plan("P-1");
        assert!(repo.update(&p).unwrap_err().is_not_found());
        assert!(repo.is_empty());

        repo.save(&p).unwrap();
        p.update_executor("Ivanov");
        repo.update(&p).unwrap();
        let loaded = repo.find_by_passport_id(p.passport_id()).unwrap().unwrap();
        assert_eq!(loaded.executor_name(), "Ivanov");
    }
}
