//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. Construction is
/// the only way to obtain one and construction always validates, so an invalid
/// instance can never be observed.
///
/// ```ignore
/// #[derive(Debug, Clone, PartialEq, Eq)]
/// struct PlanScale(u32);
///
/// impl ValueObject for PlanScale {}
/// ```
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
