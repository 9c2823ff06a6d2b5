use core::str::FromStr;
use serde::{Deserialize, Serialize};

use techpassport_core::{DomainError, DomainResult, ValueObject};

/// Map scale of a location plan, stored as its denominator (`1:N`).
///
/// Only the denominators in [`PlanScale::ALLOWED_DENOMINATORS`] exist; any other
/// value is rejected at construction.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct PlanScale(u32);

impl PlanScale {
    pub const ALLOWED_DENOMINATORS: [u32; 6] = [100, 200, 500, 1000, 2000, 5000];

    pub fn new(denominator: u32) -> DomainResult<Self> {
        if Self::ALLOWED_DENOMINATORS.contains(&denominator) {
            Ok(Self(denominator))
        } else {
            Err(DomainError::validation(format!(
                "plan scale 1:{denominator} is not allowed (expected one of {})",
                Self::allowed_list()
            )))
        }
    }

    /// Parse `"1:N"` or a bare `"N"`.
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let text = raw.trim();
        if text.is_empty() {
            return Err(DomainError::validation("plan scale cannot be blank"));
        }

        let denominator = match text.split_once(':') {
            Some((numerator, denominator)) => {
                if numerator.trim() != "1" {
                    return Err(DomainError::validation(format!(
                        "plan scale '{raw}' must have the form 1:N"
                    )));
                }
                denominator.trim()
            }
            None => text,
        };

        let value = denominator.parse::<u32>().map_err(|_| {
            DomainError::validation(format!("plan scale '{raw}' is not a number"))
        })?;

        Self::new(value)
    }

    pub fn denominator(self) -> u32 {
        self.0
    }

    /// Every allowed scale, smallest denominator first.
    pub fn all() -> impl Iterator<Item = PlanScale> {
        Self::ALLOWED_DENOMINATORS.into_iter().map(PlanScale)
    }

    fn allowed_list() -> String {
        Self::ALLOWED_DENOMINATORS
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl ValueObject for PlanScale {}

impl core::fmt::Display for PlanScale {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "1:{}", self.0)
    }
}

impl FromStr for PlanScale {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<u32> for PlanScale {
    type Error = DomainError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<i64> for PlanScale {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        let denominator = u32::try_from(value).map_err(|_| {
            DomainError::validation(format!("plan scale 1:{value} is not allowed"))
        })?;
        Self::new(denominator)
    }
}

impl From<PlanScale> for u32 {
    fn from(value: PlanScale) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_allowed_denominator_round_trips_through_text() {
        for denominator in PlanScale::ALLOWED_DENOMINATORS {
            let scale = PlanScale::new(denominator).unwrap();
            let text = scale.to_string();
            assert_eq!(text, format!("1:{denominator}"));
            assert_eq!(PlanScale::parse(&text).unwrap(), scale);
        }
        assert_eq!(PlanScale::parse("1:500").unwrap().to_string(), "1:500");
    }

    #[test]
    fn bare_denominator_and_whitespace_are_accepted() {
        assert_eq!(PlanScale::parse("2000").unwrap().denominator(), 2000);
        assert_eq!(PlanScale::parse(" 1 : 200 ").unwrap().denominator(), 200);
    }

    #[test]
    fn disallowed_denominators_fail() {
        for denominator in [0, 1, 250, 750, 10_000] {
            let err = PlanScale::new(denominator).unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)), "{denominator}");
        }
        assert!(PlanScale::try_from(-500_i64).is_err());
    }

    #[test]
    fn malformed_text_fails() {
        for raw in ["", "  ", "abc", "2:500", "1:", ":500", "1:5a0", "1:500:1", "-500"] {
            let err = PlanScale::parse(raw).unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)), "{raw:?}");
        }
    }

    #[test]
    fn all_lists_scales_in_ascending_order() {
        let all: Vec<u32> = PlanScale::all().map(PlanScale::denominator).collect();
        assert_eq!(all, PlanScale::ALLOWED_DENOMINATORS);
    }

    #[test]
    fn serde_uses_the_denominator() {
        let scale = PlanScale::new(1000).unwrap();
        assert_eq!(serde_json::to_string(&scale).unwrap(), "1000");
        assert_eq!(serde_json::from_str::<PlanScale>("1000").unwrap(), scale);
        assert!(serde_json::from_str::<PlanScale>("750").is_err());
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: only the fixed set constructs.
            #[test]
            fn construction_matches_allowed_set(denominator in 1u32..20_000) {
                let allowed = PlanScale::ALLOWED_DENOMINATORS.contains(&denominator);
                prop_assert_eq!(PlanScale::new(denominator).is_ok(), allowed);
            }
        }
    }
}
