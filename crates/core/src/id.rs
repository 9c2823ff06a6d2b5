//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};

/// Identifier of a technical passport.
///
/// A passport id is an opaque, non-blank string. Ids coming from outside are
/// trimmed on parse; generated ids are time-ordered UUIDs rendered as text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PassportId(String);

impl PassportId {
    /// Generate a fresh identifier (UUIDv7, time-ordered).
    ///
    /// Prefer passing ids explicitly in tests for determinism.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Parse an externally supplied identifier.
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::invalid_id("PassportId: identifier cannot be blank"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for PassportId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for PassportId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PassportId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PassportId> for String {
    fn from(value: PassportId) -> Self {
        value.0
    }
}

impl AsRef<str> for PassportId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims_and_compares_by_value() {
        let a = PassportId::parse("  P-1 ").unwrap();
        let b: PassportId = "P-1".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "P-1");
        assert_eq!(a.to_string(), "P-1");
    }

    #[test]
    fn blank_ids_are_rejected() {
        for raw in ["", "   ", "\t\n"] {
            let err = PassportId::parse(raw).unwrap_err();
            assert!(matches!(err, DomainError::InvalidId(_)), "{raw:?}");
        }
    }

    #[test]
    fn generated_ids_are_distinct_and_parseable() {
        let a = PassportId::generate();
        let b = PassportId::generate();
        assert_ne!(a, b);
        assert_eq!(PassportId::parse(a.as_str()).unwrap(), a);
    }

    #[test]
    fn serde_goes_through_validation() {
        let id: PassportId = serde_json::from_str("\" P-7 \"").unwrap();
        assert_eq!(id.as_str(), "P-7");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"P-7\"");
        assert!(serde_json::from_str::<PassportId>("\"  \"").is_err());
    }
}
