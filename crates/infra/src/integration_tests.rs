//! Integration tests for the full location plan pipeline.
//!
//! Tests: Service → Repository → UnitOfWork → SQLite
//!
//! Verifies:
//! - Use cases persist through the SQLite repository and read back intact
//! - Concurrent commands on one passport never lose each other's writes
//! - The serialized view carries normalized coordinate text

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};
    use std::thread;

    use techpassport_core::PassportId;
    use techpassport_location_plan::{
        CoordinatePoint, CoordinateSystemRegistry, LocationPlanView, PlanScale,
    };

    use crate::config::StorageConfig;
    use crate::db::{ConnectionProvider, UnitOfWork};
    use crate::location_plan_store::{LocationPlanRepository, SqliteLocationPlanRepository};
    use crate::services::{AddBuilding, LocationPlanService, SavePlan, ServiceError};

    type SqliteService = LocationPlanService<Arc<SqliteLocationPlanRepository>>;

    fn setup(config: &StorageConfig) -> SqliteService {
        let provider = Arc::new(ConnectionProvider::open(config).unwrap());
        let repository = Arc::new(SqliteLocationPlanRepository::new(UnitOfWork::new(provider)));
        LocationPlanService::new(repository, Arc::new(CoordinateSystemRegistry::builtin()))
    }

    fn id(raw: &str) -> PassportId {
        PassportId::parse(raw).unwrap()
    }

    fn points(raw: &[(&str, &str)]) -> Vec<CoordinatePoint> {
        raw.iter()
            .map(|(x, y)| CoordinatePoint::from_strings(x, y).unwrap())
            .collect()
    }

    #[test]
    fn service_round_trip_through_sqlite() {
        let svc = setup(&StorageConfig::in_memory());

        let mut command = SavePlan::new(id("P-1"), PlanScale::parse("1:500").unwrap());
        command.executor_name = Some("Сидоров".to_string());
        svc.save_plan(command).unwrap();

        svc.add_building(AddBuilding {
            passport_id: id("P-1"),
            litera: "A".to_string(),
            description: Some("гараж".to_string()),
            points: points(&[("0", "0"), ("10,5", "0"), ("10,5", "7.255")]),
        })
        .unwrap();

        let plan = svc.load_plan(&id("P-1")).unwrap();
        let view = LocationPlanView::from(&plan);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["scale"], "1:500");
        assert_eq!(json["executor_name"], "Сидоров");
        assert_eq!(json["buildings"][0]["litera"], "A");
        assert_eq!(json["buildings"][0]["points"][2]["y"], "7.26");
    }

    #[test]
    fn strict_remove_does_not_write() {
        let svc = setup(&StorageConfig::in_memory());
        svc.save_plan(SavePlan::new(id("P-1"), PlanScale::new(500).unwrap()))
            .unwrap();

        let err = svc.remove_building(&id("P-1"), "A").unwrap_err();
        assert!(matches!(err, ServiceError::BuildingNotFound { .. }));
        assert!(svc.repository().exists_by_passport_id(&id("P-1")).unwrap());
    }

    #[test]
    fn storage_errors_surface_through_the_service() {
        let svc = setup(&StorageConfig::in_memory());
        svc.repository().unit_of_work().provider().close().unwrap();

        let err = svc.load_plan(&id("P-1")).unwrap_err();
        assert!(matches!(err, ServiceError::Storage(_)));
        assert!(err.to_string().contains("find_location_plan"));
    }

    const WRITERS: usize = 8;

    /// Runs `body(n)` on `WRITERS` threads released together.
    fn race(svc: &Arc<SqliteService>, body: fn(&SqliteService, usize)) {
        let barrier = Arc::new(Barrier::new(WRITERS));
        let handles: Vec<_> = (0..WRITERS)
            .map(|n| {
                let svc = Arc::clone(svc);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    body(&svc, n);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn concurrent_additions_to_one_plan_are_all_kept() {
        let dir = tempfile::tempdir().unwrap();
        let svc = Arc::new(setup(&StorageConfig::file(dir.path().join("passport.db"))));
        svc.save_plan(SavePlan::new(id("P-1"), PlanScale::new(200).unwrap()))
            .unwrap();

        race(&svc, |svc, n| {
            svc.add_building(AddBuilding {
                passport_id: id("P-1"),
                litera: format!("L{n}"),
                description: None,
                points: points(&[("0", "0"), ("1", "0"), ("1", "1")]),
            })
            .unwrap();
        });

        let plan = svc.load_plan(&id("P-1")).unwrap();
        assert_eq!(plan.building_count(), WRITERS);
    }

    #[test]
    fn concurrent_saves_of_a_new_plan_create_it_once() {
        let dir = tempfile::tempdir().unwrap();
        let svc = Arc::new(setup(&StorageConfig::file(dir.path().join("passport.db"))));

        race(&svc, |svc, n| {
            let mut command = SavePlan::new(id("P-1"), PlanScale::new(500).unwrap());
            command.notes = Some(format!("writer {n}"));
            svc.save_plan(command).unwrap();
        });

        let plan = svc.load_plan(&id("P-1")).unwrap();
        assert!(plan.notes().starts_with("writer "));
        assert_eq!(plan.scale().denominator(), 500);
    }

    #[test]
    fn concurrent_writers_on_distinct_plans_are_serialized() {
        let dir = tempfile::tempdir().unwrap();
        let svc = Arc::new(setup(&StorageConfig::file(dir.path().join("passport.db"))));

        race(&svc, |svc, n| {
            let passport_id = id(&format!("P-{n}"));
            svc.save_plan(SavePlan::new(passport_id.clone(), PlanScale::new(200).unwrap()))
                .unwrap();
            svc.add_building(AddBuilding {
                passport_id,
                litera: "A".to_string(),
                description: None,
                points: points(&[("0", "0"), ("1", "0"), ("1", "1")]),
            })
            .unwrap();
        });

        for n in 0..WRITERS {
            let plan = svc.load_plan(&id(&format!("P-{n}"))).unwrap();
            assert_eq!(plan.building_count(), 1);
        }
    }
}
