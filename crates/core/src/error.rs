//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Raised synchronously by value constructors and aggregate mutators. These are
/// always recoverable by the caller and never leave a value half-built.
/// Storage failures live in the infrastructure layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (blank field, non-numeric input, disallowed scale, ...).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// An identifier was invalid (e.g. blank passport id).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A requested resource was not found (domain-level).
    #[error("not found: {0}")]
    NotFound(String),

    /// A conflict occurred (e.g. the resource already exists).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// `true` for input-shaped failures the caller can fix and retry.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::InvalidId(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_violated_rule() {
        let err = DomainError::validation("litera cannot be blank");
        assert_eq!(err.to_string(), "validation failed: litera cannot be blank");

        let err = DomainError::not_found("location plan P-1");
        assert_eq!(err.to_string(), "not found: location plan P-1");
    }

    #[test]
    fn validation_classification() {
        assert!(DomainError::validation("x").is_validation());
        assert!(DomainError::invalid_id("x").is_validation());
        assert!(!DomainError::conflict("x").is_validation());
        assert!(!DomainError::invariant("x").is_validation());
    }
}
