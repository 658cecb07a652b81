//! World bounds.

use nalgebra::{Point2, Vector2};
use planar_geometry::Aabb;

/// Rectangular world bounds.
///
/// Bodies whose AABB leaves the bounds entirely are deactivated and a
/// bounds event fires; they stay in the world but stop simulating until
/// explicitly reactivated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    aabb: Aabb,
}

impl Bounds {
    /// Create bounds of the given width and height centered at the origin.
    #[must_use]
    pub fn rectangle(width: f64, height: f64) -> Self {
        Self {
            aabb: Aabb::from_center(Point2::origin(), Vector2::new(width * 0.5, height * 0.5)),
        }
    }

    /// Create bounds from an explicit AABB.
    #[must_use]
    pub const fn from_aabb(aabb: Aabb) -> Self {
        Self { aabb }
    }

    /// The bounding AABB.
    #[must_use]
    pub fn aabb(&self) -> &Aabb {
        &self.aabb
    }

    /// Whether a collidable with the given AABB is entirely outside the
    /// bounds.
    #[must_use]
    pub fn is_outside(&self, aabb: &Aabb) -> bool {
        !self.aabb.overlaps(aabb)
    }
}
