//! Aggregate root trait for state-based domain models.

/// Aggregate root marker + minimal interface.
///
/// An aggregate root is the single entry point for consistency-preserving
/// mutation of the entities it owns. Children are only reachable through the
/// root, and only as read-only views.
pub trait AggregateRoot {
    /// Strongly-typed aggregate identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the aggregate identifier.
    fn id(&self) -> &Self::Id;
}
