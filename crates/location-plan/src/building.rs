use techpassport_core::{DomainError, DomainResult, Entity};

use crate::coordinate::CoordinatePoint;

/// Fewest vertices a building outline may have.
pub const MIN_POLYGON_POINTS: usize = 3;

/// Outline of one building on the location plan.
///
/// Identity is the `litera` label: two values with the same litera are the same
/// building, whatever their outlines. Points are owned and exposed read-only.
#[derive(Debug, Clone)]
pub struct BuildingCoordinates {
    litera: String,
    description: String,
    points: Box<[CoordinatePoint]>,
}

impl BuildingCoordinates {
    /// Validate and build an outline. Nothing is produced on failure.
    pub fn create(
        litera: &str,
        description: Option<&str>,
        points: impl IntoIterator<Item = CoordinatePoint>,
    ) -> DomainResult<Self> {
        let litera = litera.trim();
        if litera.is_empty() {
            return Err(DomainError::validation("building litera cannot be blank"));
        }

        let points: Box<[CoordinatePoint]> = points.into_iter().collect();
        if points.len() < MIN_POLYGON_POINTS {
            return Err(DomainError::validation(format!(
                "building '{litera}' needs at least {MIN_POLYGON_POINTS} points, got {}",
                points.len()
            )));
        }

        Ok(Self {
            litera: litera.to_string(),
            description: description.unwrap_or_default().to_string(),
            points,
        })
    }

    pub fn litera(&self) -> &str {
        &self.litera
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn points(&self) -> &[CoordinatePoint] {
        &self.points
    }

    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    pub(crate) fn has_litera(&self, litera: &str) -> bool {
        self.litera == litera.trim()
    }
}

impl PartialEq for BuildingCoordinates {
    fn eq(&self, other: &Self) -> bool {
        self.litera == other.litera
    }
}

impl Eq for BuildingCoordinates {}

impl core::hash::Hash for BuildingCoordinates {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        self.litera.hash(state);
    }
}

impl Entity for BuildingCoordinates {
    type Id = String;

    fn id(&self) -> &Self::Id {
        &self.litera
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<CoordinatePoint> {
        vec![
            CoordinatePoint::new(0.0, 0.0).unwrap(),
            CoordinatePoint::new(10.0, 0.0).unwrap(),
            CoordinatePoint::new(10.0, 10.0).unwrap(),
            CoordinatePoint::new(0.0, 10.0).unwrap(),
        ]
    }

    #[test]
    fn fewer_than_three_points_fail() {
        for n in 0..MIN_POLYGON_POINTS {
            let points = square().into_iter().take(n);
            let err = BuildingCoordinates::create("A", None, points).unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)), "{n} points");
        }
    }

    #[test]
    fn exactly_three_points_succeed() {
        let building = BuildingCoordinates::create("A", None, square().into_iter().take(3)).unwrap();
        assert_eq!(building.point_count(), 3);
        assert_eq!(building.description(), "");
    }

    #[test]
    fn litera_is_trimmed_and_required() {
        let building = BuildingCoordinates::create("  Б1 ", Some("жилой дом"), square()).unwrap();
        assert_eq!(building.litera(), "Б1");
        assert_eq!(building.description(), "жилой дом");

        let err = BuildingCoordinates::create("   ", None, square()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn points_keep_insertion_order() {
        let points = square();
        let building = BuildingCoordinates::create("A", None, points.clone()).unwrap();
        assert_eq!(building.points(), points.as_slice());
    }

    #[test]
    fn identity_is_the_litera() {
        let a = BuildingCoordinates::create("A", Some("one"), square()).unwrap();
        let also_a = BuildingCoordinates::create("A", Some("two"), square().into_iter().take(3)).unwrap();
        let b = BuildingCoordinates::create("B", Some("one"), square()).unwrap();
        assert_eq!(a, also_a);
        assert_ne!(a, b);
        assert_eq!(a.id(), "A");
    }
}
