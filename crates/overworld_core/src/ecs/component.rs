//! # Component System
//!
//! Components are plain data records with no behavior. Each type carries a
//! fixed bit in the entity's component mask.

/// Marker trait for ECS components.
///
/// Components must be:
/// - `Clone`: storages reset and copy slots by value
/// - `Default`: every slot is pre-initialised at world creation
/// - `Send + Sync`: the planning phase reads storages from worker threads
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Clone, Copy, Default)]
/// struct Speed(f32);
///
/// impl Component for Speed {
///     const ID: u8 = 4;
/// }
/// ```
pub trait Component: Clone + Default + Send + Sync + 'static {
    /// Unique identifier for this component type (0-63).
    const ID: u8;
}

/// Helper for building component bitmasks used by [`crate::World::query`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ComponentMask(u64);

impl ComponentMask {
    /// The empty mask (matches every alive entity).
    pub const EMPTY: Self = Self(0);

    /// Mask containing a single component type.
    #[inline]
    #[must_use]
    pub const fn of<C: Component>() -> Self {
        Self(1 << C::ID)
    }

    /// Adds another component type to the mask.
    #[inline]
    #[must_use]
    pub const fn with<C: Component>(self) -> Self {
        Self(self.0 | (1 << C::ID))
    }

    /// Raw bits.
    #[inline]
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct A;
    impl Component for A {
        const ID: u8 = 0;
    }

    #[derive(Clone, Default)]
    struct B;
    impl Component for B {
        const ID: u8 = 7;
    }

    #[test]
    fn test_mask_building() {
        let mask = ComponentMask::of::<A>().with::<B>();
        assert_eq!(mask.bits(), 1 | (1 << 7));
        assert_eq!(ComponentMask::EMPTY.bits(), 0);
    }
}
