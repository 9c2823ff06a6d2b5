//! Serializable, read-only rendering of a plan for display and export.

use chrono::NaiveDate;
use serde::Serialize;

use crate::building::BuildingCoordinates;
use crate::coordinate::CoordinatePoint;
use crate::plan::LocationPlan;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocationPlanView {
    pub passport_id: String,
    pub scale: String,
    pub executor_name: String,
    pub plan_date: NaiveDate,
    pub notes: String,
    pub image_path: Option<String>,
    pub buildings: Vec<BuildingView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildingView {
    pub litera: String,
    pub description: String,
    pub points: Vec<CoordinatePoint>,
}

impl From<&BuildingCoordinates> for BuildingView {
    fn from(building: &BuildingCoordinates) -> Self {
        Self {
            litera: building.litera().to_string(),
            description: building.description().to_string(),
            points: building.points().to_vec(),
        }
    }
}

impl From<&LocationPlan> for LocationPlanView {
    fn from(plan: &LocationPlan) -> Self {
        Self {
            passport_id: plan.passport_id().to_string(),
            scale: plan.scale().to_string(),
            executor_name: plan.executor_name().to_string(),
            plan_date: plan.plan_date(),
            notes: plan.notes().to_string(),
            image_path: plan.image_path().map(str::to_string),
            buildings: plan.buildings().iter().map(BuildingView::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::PlanScale;
    use techpassport_core::PassportId;

    #[test]
    fn view_serializes_plan_with_text_coordinates() {
        let mut plan = LocationPlan::new(PassportId::parse("P-1").unwrap(), PlanScale::new(500).unwrap());
        plan.update_plan_date(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
        plan.add_building_coordinates(
            BuildingCoordinates::create(
                "A",
                None,
                [
                    CoordinatePoint::new(0.0, 0.0).unwrap(),
                    CoordinatePoint::new(10.0, 0.0).unwrap(),
                    CoordinatePoint::new(10.0, 10.0).unwrap(),
                ],
            )
            .unwrap(),
        )
        .unwrap();

        let json = serde_json::to_value(LocationPlanView::from(&plan)).unwrap();
        assert_eq!(json["scale"], "1:500");
        assert_eq!(json["plan_date"], "2024-01-31");
        assert_eq!(json["image_path"], serde_json::Value::Null);
        assert_eq!(json["buildings"][0]["litera"], "A");
        assert_eq!(json["buildings"][0]["points"][2]["y"], "10.00");
    }
}
