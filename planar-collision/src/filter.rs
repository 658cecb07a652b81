//! Collision filtering with category/mask bitmasks.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Category/mask collision filter.
///
/// A fixture belongs to the categories in `category` and collides with the
/// categories in `mask`. Two fixtures collide only if each one's mask
/// accepts the other's category, so the test is symmetric.
///
/// # Example
///
/// ```
/// use planar_collision::CollisionFilter;
///
/// const PLAYER: u64 = 1 << 0;
/// const ENEMY: u64 = 1 << 1;
/// const DEBRIS: u64 = 1 << 2;
///
/// // Debris collides with everything except other debris
/// let debris = CollisionFilter::new(DEBRIS, !DEBRIS);
/// let player = CollisionFilter::new(PLAYER, u64::MAX);
///
/// assert!(debris.can_collide(&player));
/// assert!(!debris.can_collide(&debris));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CollisionFilter {
    /// Bitmask of categories this fixture belongs to.
    pub category: u64,
    /// Bitmask of categories this fixture collides with.
    pub mask: u64,
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self {
            category: 1,
            mask: u64::MAX,
        }
    }
}

impl CollisionFilter {
    /// Create a filter with the given category and mask bits.
    #[must_use]
    pub const fn new(category: u64, mask: u64) -> Self {
        Self { category, mask }
    }

    /// A filter that collides with everything.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            category: 1,
            mask: u64::MAX,
        }
    }

    /// A filter that collides with nothing.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            category: 1,
            mask: 0,
        }
    }

    /// Check whether two filters allow their fixtures to collide.
    #[must_use]
    pub const fn can_collide(&self, other: &Self) -> bool {
        self.mask & other.category != 0 && other.mask & self.category != 0
    }
}
