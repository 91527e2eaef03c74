//! Entity traits: identity + soft deletion.

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

/// Entities that are flagged as deleted instead of being removed.
///
/// Soft-deleted rows are invisible to every lookup and listing.
pub trait SoftDelete {
    fn is_deleted(&self) -> bool;

    fn mark_deleted(&mut self);
}
