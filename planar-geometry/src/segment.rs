//! Line segment shape.

use nalgebra::{Point2, Vector2};
use planar_types::{MassData, MassKind, PhysicsError, Transform};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{right, Aabb, EdgeFeature, Feature, Interval, VertexFeature};

/// A two-point line segment.
///
/// Segments are thin shapes for walls and floors: they collide like a
/// degenerate two-vertex polygon and carry a thin-rod mass.
///
/// # Example
///
/// ```
/// use planar_geometry::Segment;
/// use nalgebra::Point2;
///
/// let floor = Segment::new(Point2::new(-5.0, 0.0), Point2::new(5.0, 0.0)).unwrap();
/// assert_eq!(floor.length(), 10.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Segment {
    /// First endpoint in the local frame.
    pub p1: Point2<f64>,
    /// Second endpoint in the local frame.
    pub p2: Point2<f64>,
}

impl Segment {
    /// Create a segment from two distinct points.
    pub fn new(p1: Point2<f64>, p2: Point2<f64>) -> planar_types::Result<Self> {
        if !p1.coords.iter().all(|x| x.is_finite()) || !p2.coords.iter().all(|x| x.is_finite()) {
            return Err(PhysicsError::NonFiniteParameter { name: "endpoints" });
        }
        if (p2 - p1).norm_squared() < f64::EPSILON {
            return Err(PhysicsError::invalid_shape(
                "segment endpoints must be distinct",
            ));
        }
        Ok(Self { p1, p2 })
    }

    /// Get the segment length.
    #[must_use]
    pub fn length(&self) -> f64 {
        (self.p2 - self.p1).norm()
    }

    /// Get the midpoint in the local frame.
    #[must_use]
    pub fn center(&self) -> Point2<f64> {
        Point2::from((self.p1.coords + self.p2.coords) * 0.5)
    }

    /// Get the unit normal (right-hand perpendicular of `p1 -> p2`).
    #[must_use]
    pub fn normal(&self) -> Vector2<f64> {
        right(&(self.p2 - self.p1)).normalize()
    }

    /// Project the segment onto an axis.
    #[must_use]
    pub fn project(&self, axis: &Vector2<f64>, transform: &Transform) -> Interval {
        let d1 = transform.transform_point(&self.p1).coords.dot(axis);
        let d2 = transform.transform_point(&self.p2).coords.dot(axis);
        Interval::new(d1.min(d2), d1.max(d2))
    }

    /// Get the world-space point farthest in the given direction.
    #[must_use]
    pub fn farthest_point(&self, direction: &Vector2<f64>, transform: &Transform) -> Point2<f64> {
        let w1 = transform.transform_point(&self.p1);
        let w2 = transform.transform_point(&self.p2);
        if w1.coords.dot(direction) >= w2.coords.dot(direction) {
            w1
        } else {
            w2
        }
    }

    /// Get the farthest feature: the whole segment, with `max` set to the
    /// farther endpoint.
    #[must_use]
    pub fn farthest_feature(&self, direction: &Vector2<f64>, transform: &Transform) -> Feature {
        let w1 = VertexFeature::new(transform.transform_point(&self.p1), 0);
        let w2 = VertexFeature::new(transform.transform_point(&self.p2), 1);
        let max = if w1.point.coords.dot(direction) >= w2.point.coords.dot(direction) {
            w1
        } else {
            w2
        };
        Feature::Edge(EdgeFeature::new(w1, w2, 0, max))
    }

    /// Compute the world-space AABB.
    #[must_use]
    pub fn create_aabb(&self, transform: &Transform) -> Aabb {
        let w1 = transform.transform_point(&self.p1);
        let w2 = transform.transform_point(&self.p2);
        Aabb::new(
            Point2::new(w1.x.min(w2.x), w1.y.min(w2.y)),
            Point2::new(w1.x.max(w2.x), w1.y.max(w2.y)),
        )
    }

    /// Maximum distance from the given local point to an endpoint.
    #[must_use]
    pub fn radius_about(&self, point: &Point2<f64>) -> f64 {
        (self.p1 - point)
            .norm_squared()
            .max((self.p2 - point).norm_squared())
            .sqrt()
    }

    /// Compute mass data for the given density.
    ///
    /// A segment is treated as a thin rod: `m = ρ·L`, `I = m·L²/12`.
    #[must_use]
    pub fn create_mass(&self, density: f64) -> MassData {
        let length = self.length();
        let mass = density * length;
        let inertia = mass * length * length / 12.0;
        MassData {
            center: self.center(),
            mass,
            inertia,
            kind: MassKind::Normal,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rejects_coincident_endpoints() {
        let p = Point2::new(1.0, 1.0);
        assert!(Segment::new(p, p).is_err());
    }

    #[test]
    fn test_length_and_center() {
        let segment = Segment::new(Point2::new(-2.0, 0.0), Point2::new(2.0, 0.0)).unwrap();
        assert_relative_eq!(segment.length(), 4.0, epsilon = 1e-12);
        assert_relative_eq!(segment.center().coords.norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_normal_is_unit() {
        let segment = Segment::new(Point2::new(0.0, 0.0), Point2::new(3.0, 4.0)).unwrap();
        assert_relative_eq!(segment.normal().norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_farthest_feature_max_endpoint() {
        let segment = Segment::new(Point2::new(-1.0, 0.0), Point2::new(1.0, 0.0)).unwrap();
        let feature = segment.farthest_feature(&Vector2::x(), &Transform::identity());
        match feature {
            Feature::Edge(edge) => {
                assert_eq!(edge.max.index, 1);
                assert_relative_eq!(edge.max.point.x, 1.0, epsilon = 1e-12);
            }
            Feature::Vertex(_) => panic!("expected an edge feature"),
        }
    }

    #[test]
    fn test_mass_is_thin_rod() {
        let segment = Segment::new(Point2::new(0.0, 0.0), Point2::new(2.0, 0.0)).unwrap();
        let mass = segment.create_mass(3.0);
        assert_relative_eq!(mass.mass, 6.0, epsilon = 1e-12);
        assert_relative_eq!(mass.inertia, 6.0 * 4.0 / 12.0, epsilon = 1e-12);
        assert_relative_eq!(mass.center.x, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_aabb_under_rotation() {
        let segment = Segment::new(Point2::new(-1.0, 0.0), Point2::new(1.0, 0.0)).unwrap();
        let transform =
            Transform::from_position_angle(Point2::origin(), std::f64::consts::FRAC_PI_2);
        let aabb = segment.create_aabb(&transform);

        assert_relative_eq!(aabb.min.y, -1.0, epsilon = 1e-12);
        assert_relative_eq!(aabb.max.y, 1.0, epsilon = 1e-12);
        assert!(aabb.width() < 1e-12);
    }
}
