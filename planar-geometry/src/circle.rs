//! Circle shape.

use nalgebra::{Point2, Vector2};
use planar_types::{MassData, PhysicsError, Transform};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Aabb, Feature, Interval, VertexFeature};

/// A circle with a local-frame center and a radius.
///
/// # Example
///
/// ```
/// use planar_geometry::Circle;
///
/// let circle = Circle::new(0.5).unwrap();
/// assert_eq!(circle.radius, 0.5);
/// assert!(Circle::new(-1.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Circle {
    /// Center in the shape's local frame.
    pub center: Point2<f64>,
    /// Radius; always positive.
    pub radius: f64,
}

impl Circle {
    /// Create a circle centered at the local origin.
    pub fn new(radius: f64) -> planar_types::Result<Self> {
        Self::at(Point2::origin(), radius)
    }

    /// Create a circle at the given local center.
    pub fn at(center: Point2<f64>, radius: f64) -> planar_types::Result<Self> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(PhysicsError::invalid_shape("circle radius must be positive"));
        }
        if !center.coords.iter().all(|x| x.is_finite()) {
            return Err(PhysicsError::NonFiniteParameter { name: "center" });
        }
        Ok(Self { center, radius })
    }

    /// Project the circle onto an axis.
    #[must_use]
    pub fn project(&self, axis: &Vector2<f64>, transform: &Transform) -> Interval {
        let center = transform.transform_point(&self.center).coords.dot(axis);
        Interval::new(center - self.radius, center + self.radius)
    }

    /// Get the world-space point farthest in the given direction.
    #[must_use]
    pub fn farthest_point(&self, direction: &Vector2<f64>, transform: &Transform) -> Point2<f64> {
        let center = transform.transform_point(&self.center);
        let norm = direction.norm();
        if norm < f64::EPSILON {
            return center;
        }
        center + direction * (self.radius / norm)
    }

    /// Get the farthest feature: always a single vertex for a circle.
    #[must_use]
    pub fn farthest_feature(&self, direction: &Vector2<f64>, transform: &Transform) -> Feature {
        Feature::Vertex(VertexFeature::new(
            self.farthest_point(direction, transform),
            0,
        ))
    }

    /// Compute the world-space AABB.
    #[must_use]
    pub fn create_aabb(&self, transform: &Transform) -> Aabb {
        let center = transform.transform_point(&self.center);
        Aabb::from_center(center, Vector2::new(self.radius, self.radius))
    }

    /// Maximum distance from the given local point to the circle boundary.
    #[must_use]
    pub fn radius_about(&self, point: &Point2<f64>) -> f64 {
        (self.center - point).norm() + self.radius
    }

    /// Compute mass data for the given density.
    ///
    /// `m = ρ·π·r²`, `I = m·r²/2` about the circle's own center.
    #[must_use]
    pub fn create_mass(&self, density: f64) -> MassData {
        let mass = density * std::f64::consts::PI * self.radius * self.radius;
        let inertia = 0.5 * mass * self.radius * self.radius;
        MassData {
            center: self.center,
            mass,
            inertia,
            kind: planar_types::MassKind::Normal,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rejects_bad_radius() {
        assert!(Circle::new(0.0).is_err());
        assert!(Circle::new(f64::NAN).is_err());
        assert!(Circle::at(Point2::new(f64::NAN, 0.0), 1.0).is_err());
    }

    #[test]
    fn test_project() {
        let circle = Circle::new(0.5).unwrap();
        let transform = Transform::from_position(Point2::new(2.0, 0.0));

        let interval = circle.project(&Vector2::x(), &transform);
        assert_relative_eq!(interval.min, 1.5, epsilon = 1e-12);
        assert_relative_eq!(interval.max, 2.5, epsilon = 1e-12);
    }

    #[test]
    fn test_farthest_point() {
        let circle = Circle::new(1.0).unwrap();
        let p = circle.farthest_point(&Vector2::new(0.0, 3.0), &Transform::identity());
        assert_relative_eq!(p.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(p.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_farthest_feature_is_vertex() {
        let circle = Circle::new(1.0).unwrap();
        let feature = circle.farthest_feature(&Vector2::x(), &Transform::identity());
        assert!(feature.is_vertex());
    }

    #[test]
    fn test_aabb() {
        let circle = Circle::new(2.0).unwrap();
        let aabb = circle.create_aabb(&Transform::from_position(Point2::new(5.0, 5.0)));
        assert_eq!(aabb.min, Point2::new(3.0, 3.0));
        assert_eq!(aabb.max, Point2::new(7.0, 7.0));
    }

    #[test]
    fn test_mass() {
        let circle = Circle::new(1.0).unwrap();
        let mass = circle.create_mass(1.0);
        assert_relative_eq!(mass.mass, std::f64::consts::PI, epsilon = 1e-12);
        assert_relative_eq!(mass.inertia, std::f64::consts::PI / 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_radius_about_offset_point() {
        let circle = Circle::at(Point2::new(1.0, 0.0), 0.5).unwrap();
        assert_relative_eq!(circle.radius_about(&Point2::origin()), 1.5, epsilon = 1e-12);
    }
}
