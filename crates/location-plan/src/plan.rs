use chrono::{Local, NaiveDate};

use techpassport_core::{AggregateRoot, DomainError, DomainResult, PassportId};

use crate::building::BuildingCoordinates;
use crate::scale::PlanScale;

/// Aggregate root: the location (site) plan of one technical passport.
///
/// Owns its building outlines. Every mutation goes through the methods below and
/// either succeeds completely or leaves the plan untouched.
#[derive(Debug, Clone)]
pub struct LocationPlan {
    passport_id: PassportId,
    scale: PlanScale,
    executor_name: String,
    plan_date: NaiveDate,
    notes: String,
    image_path: Option<String>,
    buildings: Vec<BuildingCoordinates>,
}

/// Everything needed to rebuild a [`LocationPlan`] read back from storage.
#[derive(Debug, Clone)]
pub struct LocationPlanParts {
    pub passport_id: PassportId,
    pub scale: PlanScale,
    pub executor_name: String,
    /// Defaults to today when absent.
    pub plan_date: Option<NaiveDate>,
    pub notes: String,
    pub image_path: Option<String>,
    pub buildings: Vec<BuildingCoordinates>,
}

impl LocationPlan {
    /// A fresh plan: no buildings, dated today.
    pub fn new(passport_id: PassportId, scale: PlanScale) -> Self {
        Self {
            passport_id,
            scale,
            executor_name: String::new(),
            plan_date: today(),
            notes: String::new(),
            image_path: None,
            buildings: Vec::new(),
        }
    }

    /// Rebuild a plan from already-validated parts.
    ///
    /// Fails if two buildings share a litera.
    pub fn restore(parts: LocationPlanParts) -> DomainResult<Self> {
        let LocationPlanParts {
            passport_id,
            scale,
            executor_name,
            plan_date,
            notes,
            image_path,
            buildings,
        } = parts;

        for (idx, building) in buildings.iter().enumerate() {
            if buildings[..idx].iter().any(|b| b == building) {
                return Err(DomainError::invariant(format!(
                    "duplicate building litera '{}' in plan {passport_id}",
                    building.litera()
                )));
            }
        }

        Ok(Self {
            passport_id,
            scale,
            executor_name,
            plan_date: plan_date.unwrap_or_else(today),
            notes,
            image_path: normalize_image_path(image_path),
            buildings,
        })
    }

    pub fn passport_id(&self) -> &PassportId {
        &self.passport_id
    }

    pub fn scale(&self) -> PlanScale {
        self.scale
    }

    pub fn executor_name(&self) -> &str {
        &self.executor_name
    }

    pub fn plan_date(&self) -> NaiveDate {
        self.plan_date
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn image_path(&self) -> Option<&str> {
        self.image_path.as_deref()
    }

    pub fn buildings(&self) -> &[BuildingCoordinates] {
        &self.buildings
    }

    pub fn building(&self, litera: &str) -> Option<&BuildingCoordinates> {
        self.buildings.iter().find(|b| b.has_litera(litera))
    }

    pub fn has_building(&self, litera: &str) -> bool {
        self.building(litera).is_some()
    }

    pub fn building_count(&self) -> usize {
        self.buildings.len()
    }

    pub fn update_scale(&mut self, scale: PlanScale) {
        self.scale = scale;
    }

    pub fn update_executor(&mut self, executor_name: impl Into<String>) {
        self.executor_name = executor_name.into();
    }

    pub fn update_plan_date(&mut self, plan_date: NaiveDate) {
        self.plan_date = plan_date;
    }

    pub fn update_notes(&mut self, notes: impl Into<String>) {
        self.notes = notes.into();
    }

    /// Attach or detach the uploaded raster. Blank paths detach.
    pub fn set_image_path(&mut self, image_path: Option<String>) {
        self.image_path = normalize_image_path(image_path);
    }

    /// Append a building. Fails if its litera is already on the plan.
    pub fn add_building_coordinates(&mut self, building: BuildingCoordinates) -> DomainResult<()> {
        // Plans hold a handful of buildings; a scan is enough.
        if self.buildings.iter().any(|b| b == &building) {
            return Err(DomainError::validation(format!(
                "building '{}' already exists",
                building.litera()
            )));
        }
        self.buildings.push(building);
        Ok(())
    }

    /// Remove every building with this litera. Unknown literas are a no-op.
    ///
    /// Returns `true` if something was removed.
    pub fn remove_building_coordinates(&mut self, litera: &str) -> bool {
        let before = self.buildings.len();
        self.buildings.retain(|b| !b.has_litera(litera));
        self.buildings.len() != before
    }
}

impl AggregateRoot for LocationPlan {
    type Id = PassportId;

    fn id(&self) -> &Self::Id {
        &self.passport_id
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn normalize_image_path(image_path: Option<String>) -> Option<String> {
    image_path.filter(|p| !p.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinate::CoordinatePoint;

    fn pid(raw: &str) -> PassportId {
        PassportId::parse(raw).unwrap()
    }

    fn scale(d: u32) -> PlanScale {
        PlanScale::new(d).unwrap()
    }

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

    #[test]
    fn new_plan_has_defaults() {
        let plan = LocationPlan::new(pid("P-1"), scale(500));
        assert_eq!(plan.passport_id().as_str(), "P-1");
        assert_eq!(plan.scale(), scale(500));
        assert_eq!(plan.executor_name(), "");
        assert_eq!(plan.notes(), "");
        assert_eq!(plan.image_path(), None);
        assert_eq!(plan.plan_date(), Local::now().date_naive());
        assert!(plan.buildings().is_empty());
        assert_eq!(plan.id(), &pid("P-1"));
    }

    #[test]
    fn duplicate_litera_is_rejected_and_plan_unchanged() {
        let mut plan = LocationPlan::new(pid("P-1"), scale(500));
        plan.add_building_coordinates(triangle("A")).unwrap();
        let before = plan.building_count();

        let err = plan.add_building_coordinates(triangle("A")).unwrap_err();
        assert!(matches!(err, DomainError::Validation(ref m) if m.contains("already exists")));
        assert_eq!(plan.building_count(), before);
    }

    #[test]
    fn buildings_keep_insertion_order() {
        let mut plan = LocationPlan::new(pid("P-1"), scale(500));
        for litera in ["B", "A", "C"] {
            plan.add_building_coordinates(triangle(litera)).unwrap();
        }
        let literas: Vec<&str> = plan.buildings().iter().map(|b| b.litera()).collect();
        assert_eq!(literas, ["B", "A", "C"]);
    }

    #[test]
    fn remove_is_idempotent() {
        let mut plan = LocationPlan::new(pid("P-1"), scale(500));
        plan.add_building_coordinates(triangle("A")).unwrap();
        plan.add_building_coordinates(triangle("B")).unwrap();

        assert!(plan.remove_building_coordinates(" A "));
        assert!(!plan.remove_building_coordinates("A"));
        assert!(!plan.remove_building_coordinates("Z"));
        assert_eq!(plan.building_count(), 1);
        assert!(plan.has_building("B"));
    }

    #[test]
    fn updaters_change_metadata() {
        let mut plan = LocationPlan::new(pid("P-1"), scale(500));
        let date = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();

        plan.update_scale(scale(1000));
        plan.update_executor("ООО «Кадастр»");
        plan.update_plan_date(date);
        plan.update_notes("обмер 2024");
        plan.set_image_path(Some("plans/p1.png".to_string()));

        assert_eq!(plan.scale().denominator(), 1000);
        assert_eq!(plan.executor_name(), "ООО «Кадастр»");
        assert_eq!(plan.plan_date(), date);
        assert_eq!(plan.notes(), "обмер 2024");
        assert_eq!(plan.image_path(), Some("plans/p1.png"));

        plan.set_image_path(Some("   ".to_string()));
        assert_eq!(plan.image_path(), None);
        plan.update_executor("");
        assert_eq!(plan.executor_name(), "");
    }

    #[test]
    fn restore_defaults_missing_date_and_rejects_duplicates() {
        let parts = LocationPlanParts {
            passport_id: pid("P-2"),
            scale: scale(200),
            executor_name: "Иванов".to_string(),
            plan_date: None,
            notes: String::new(),
            image_path: Some(String::new()),
            buildings: vec![triangle("A"), triangle("B")],
        };
        let plan = LocationPlan::restore(parts.clone()).unwrap();
        assert_eq!(plan.plan_date(), Local::now().date_naive());
        assert_eq!(plan.image_path(), None);
        assert_eq!(plan.building_count(), 2);

        let duplicated = LocationPlanParts {
            buildings: vec![triangle("A"), triangle("A")],
            ..parts
        };
        let err = LocationPlan::restore(duplicated).unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: whatever the sequence of adds, literas stay unique and
            /// a rejected add never changes the building count.
            #[test]
            fn literas_stay_unique(literas in proptest::collection::vec("[A-DБВ]{1,2}", 0..24)) {
                let mut plan = LocationPlan::new(pid("P-prop"), scale(500));
                for litera in &literas {
                    let before = plan.building_count();
                    let existed = plan.has_building(litera);
                    let result = plan.add_building_coordinates(triangle(litera));
                    prop_assert_eq!(result.is_err(), existed);
                    let expected = if existed { before } else { before + 1 };
                    prop_assert_eq!(plan.building_count(), expected);
                }

                let mut seen = std::collections::HashSet::new();
                for b in plan.buildings() {
                    prop_assert!(seen.insert(b.litera().to_string()));
                }
            }
        }
    }
}
