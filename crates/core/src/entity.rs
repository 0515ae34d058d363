//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Ord + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;

    /// Returns true when both entities share the same identity, whatever their state.
    fn same_identity_as(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}
