//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Two entities with the same identifier are the same entity, whatever their
/// other attributes hold.
pub trait Entity {
    /// Identifier type, unique within the owning aggregate.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
