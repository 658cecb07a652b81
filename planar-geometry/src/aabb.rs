//! Axis-aligned bounding boxes.

use nalgebra::{Point2, Vector2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Aabb {
    /// Minimum corner of the bounding box.
    pub min: Point2<f64>,
    /// Maximum corner of the bounding box.
    pub max: Point2<f64>,
}

impl Aabb {
    /// Create a new AABB from minimum and maximum corners.
    #[must_use]
    pub const fn new(min: Point2<f64>, max: Point2<f64>) -> Self {
        Self { min, max }
    }

    /// Create an AABB centered at a point with the given half-extents.
    #[must_use]
    pub fn from_center(center: Point2<f64>, half_extents: Vector2<f64>) -> Self {
        Self {
            min: center - half_extents,
            max: center + half_extents,
        }
    }

    /// Check if this AABB overlaps with another AABB.
    ///
    /// Touching boxes count as overlapping.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    /// Check if this AABB entirely contains another AABB.
    #[must_use]
    pub fn contains(&self, other: &Self) -> bool {
        self.min.x <= other.min.x
            && self.min.y <= other.min.y
            && self.max.x >= other.max.x
            && self.max.y >= other.max.y
    }

    /// Check if this AABB contains a point.
    #[must_use]
    pub fn contains_point(&self, point: &Point2<f64>) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    /// Expand this AABB by a margin on all sides.
    #[must_use]
    pub fn expanded(&self, margin: f64) -> Self {
        Self {
            min: Point2::new(self.min.x - margin, self.min.y - margin),
            max: Point2::new(self.max.x + margin, self.max.y + margin),
        }
    }

    /// Compute the union of two AABBs.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            min: Point2::new(self.min.x.min(other.min.x), self.min.y.min(other.min.y)),
            max: Point2::new(self.max.x.max(other.max.x), self.max.y.max(other.max.y)),
        }
    }

    /// Translate the AABB by an offset.
    #[must_use]
    pub fn translated(&self, offset: &Vector2<f64>) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// Get the center of the AABB.
    #[must_use]
    pub fn center(&self) -> Point2<f64> {
        Point2::from((self.min.coords + self.max.coords) * 0.5)
    }

    /// Get the width of the AABB.
    #[must_use]
    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    /// Get the height of the AABB.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    /// Get the extent along the given axis (0 = x, 1 = y).
    #[must_use]
    pub fn extent(&self, axis: usize) -> f64 {
        if axis == 0 {
            self.width()
        } else {
            self.height()
        }
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::new(Point2::origin(), Point2::origin())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_overlaps() {
        let a = Aabb::from_center(Point2::origin(), Vector2::new(1.0, 1.0));
        let b = Aabb::from_center(Point2::new(1.5, 0.0), Vector2::new(1.0, 1.0));
        let c = Aabb::from_center(Point2::new(5.0, 0.0), Vector2::new(1.0, 1.0));

        assert!(a.overlaps(&b), "a and b should overlap");
        assert!(b.overlaps(&a), "overlap should be symmetric");
        assert!(!a.overlaps(&c), "a and c should not overlap");
    }

    #[test]
    fn test_touching_counts_as_overlap() {
        let a = Aabb::new(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0));
        let b = Aabb::new(Point2::new(1.0, 0.0), Point2::new(2.0, 1.0));
        assert!(a.overlaps(&b));
    }

    #[test]
    fn test_expanded() {
        let aabb = Aabb::from_center(Point2::origin(), Vector2::new(1.0, 1.0));
        let expanded = aabb.expanded(0.5);

        assert_eq!(expanded.min.x, -1.5);
        assert_eq!(expanded.max.y, 1.5);
    }

    #[test]
    fn test_union() {
        let a = Aabb::new(Point2::new(-1.0, -1.0), Point2::new(0.0, 0.0));
        let b = Aabb::new(Point2::new(0.5, -2.0), Point2::new(2.0, 1.0));
        let u = a.union(&b);

        assert_eq!(u.min, Point2::new(-1.0, -2.0));
        assert_eq!(u.max, Point2::new(2.0, 1.0));
    }

    #[test]
    fn test_contains() {
        let outer = Aabb::new(Point2::new(-2.0, -2.0), Point2::new(2.0, 2.0));
        let inner = Aabb::new(Point2::new(-1.0, -1.0), Point2::new(1.0, 1.0));

        assert!(outer.contains(&inner));
        assert!(!inner.contains(&outer));
        assert!(outer.contains_point(&Point2::new(0.5, -1.5)));
        assert!(!outer.contains_point(&Point2::new(3.0, 0.0)));
    }
}
