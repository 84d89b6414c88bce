//! Entities: things with a stable, copyable identity.

/// A domain object identified by a number or key rather than by its contents.
///
/// Two resolved clients with the same client number are the same client,
/// whatever rows they carry. Registries key their tables by [`Entity::id`].
pub trait Entity {
    type Id: Copy + Ord + core::fmt::Display;

    fn id(&self) -> Self::Id;
}
