//! The closed convex shape set and its capability dispatch.

use nalgebra::{Point2, Vector2};
use planar_types::{MassData, Transform};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Aabb, Circle, Feature, Polygon, Segment};

/// A closed interval on a projection axis.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Interval {
    /// Lower bound.
    pub min: f64,
    /// Upper bound.
    pub max: f64,
}

impl Interval {
    /// Create a new interval.
    #[must_use]
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Check if this interval overlaps another.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.min <= other.max && other.min <= self.max
    }

    /// Get the overlap depth with another interval (negative if disjoint).
    #[must_use]
    pub fn overlap(&self, other: &Self) -> f64 {
        self.max.min(other.max) - self.min.max(other.min)
    }

    /// Check if the interval contains a value.
    #[must_use]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// A convex collision shape.
///
/// The shape set is closed: the collision pipeline dispatches over exactly
/// these variants, so there is no open trait to implement. All operations
/// take the owning body's world [`Transform`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Convex {
    /// A circle.
    Circle(Circle),
    /// A convex polygon with counter-clockwise winding.
    Polygon(Polygon),
    /// A two-point line segment.
    Segment(Segment),
}

impl From<Circle> for Convex {
    fn from(circle: Circle) -> Self {
        Self::Circle(circle)
    }
}

impl From<Polygon> for Convex {
    fn from(polygon: Polygon) -> Self {
        Self::Polygon(polygon)
    }
}

impl From<Segment> for Convex {
    fn from(segment: Segment) -> Self {
        Self::Segment(segment)
    }
}

impl Convex {
    /// Project the shape onto an axis, returning the covered interval.
    #[must_use]
    pub fn project(&self, axis: &Vector2<f64>, transform: &Transform) -> Interval {
        match self {
            Self::Circle(c) => c.project(axis, transform),
            Self::Polygon(p) => p.project(axis, transform),
            Self::Segment(s) => s.project(axis, transform),
        }
    }

    /// Get the world-space point farthest in the given direction (the
    /// support function used by GJK and EPA).
    #[must_use]
    pub fn farthest_point(&self, direction: &Vector2<f64>, transform: &Transform) -> Point2<f64> {
        match self {
            Self::Circle(c) => c.farthest_point(direction, transform),
            Self::Polygon(p) => p.farthest_point(direction, transform),
            Self::Segment(s) => s.farthest_point(direction, transform),
        }
    }

    /// Get the farthest feature (vertex or edge) in the given direction.
    #[must_use]
    pub fn farthest_feature(&self, direction: &Vector2<f64>, transform: &Transform) -> Feature {
        match self {
            Self::Circle(c) => c.farthest_feature(direction, transform),
            Self::Polygon(p) => p.farthest_feature(direction, transform),
            Self::Segment(s) => s.farthest_feature(direction, transform),
        }
    }

    /// Compute the world-space AABB.
    #[must_use]
    pub fn create_aabb(&self, transform: &Transform) -> Aabb {
        match self {
            Self::Circle(c) => c.create_aabb(transform),
            Self::Polygon(p) => p.create_aabb(transform),
            Self::Segment(s) => s.create_aabb(transform),
        }
    }

    /// Maximum distance from the given local point to the shape boundary.
    ///
    /// With `point` at the body's center of mass this is the rotation-disc
    /// radius used to bound swept motion in continuous collision detection.
    #[must_use]
    pub fn radius_about(&self, point: &Point2<f64>) -> f64 {
        match self {
            Self::Circle(c) => c.radius_about(point),
            Self::Polygon(p) => p.radius_about(point),
            Self::Segment(s) => s.radius_about(point),
        }
    }

    /// Compute mass data for the given density.
    #[must_use]
    pub fn create_mass(&self, density: f64) -> MassData {
        match self {
            Self::Circle(c) => c.create_mass(density),
            Self::Polygon(p) => p.create_mass(density),
            Self::Segment(s) => s.create_mass(density),
        }
    }

    /// Get the shape's geometric center in the local frame.
    #[must_use]
    pub fn center(&self) -> Point2<f64> {
        match self {
            Self::Circle(c) => c.center,
            Self::Polygon(p) => p.center(),
            Self::Segment(s) => s.center(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_interval_overlap() {
        let a = Interval::new(0.0, 2.0);
        let b = Interval::new(1.0, 3.0);
        let c = Interval::new(2.5, 4.0);

        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert_relative_eq!(a.overlap(&b), 1.0, epsilon = 1e-12);
        assert!(a.overlap(&c) < 0.0);
        assert!(a.contains(1.5));
    }

    #[test]
    fn test_dispatch_matches_concrete() {
        let circle = Circle::new(1.0).unwrap();
        let shape = Convex::from(circle);
        let transform = Transform::identity();

        assert_eq!(
            shape.farthest_point(&Vector2::x(), &transform),
            circle.farthest_point(&Vector2::x(), &transform)
        );
        assert_eq!(
            shape.create_aabb(&transform),
            circle.create_aabb(&transform)
        );
    }

    #[test]
    fn test_projection_of_translated_shapes_disjoint() {
        let a = Convex::from(Polygon::rectangle(1.0, 1.0).unwrap());
        let b = Convex::from(Circle::new(0.4).unwrap());

        let ta = Transform::identity();
        let tb = Transform::from_position(Point2::new(2.0, 0.0));

        let ia = a.project(&Vector2::x(), &ta);
        let ib = b.project(&Vector2::x(), &tb);
        assert!(!ia.overlaps(&ib));
    }
}
