//! Convex geometry for 2D rigid-body simulation.
//!
//! This crate provides the shape layer of the Planar physics stack: the
//! closed set of convex shapes the collision pipeline understands, the
//! support queries that drive GJK/EPA and manifold clipping, axis-aligned
//! bounding boxes for the broad-phase, and mass computation from shape and
//! density.
//!
//! # Shapes
//!
//! The shape set is closed: a tagged [`Convex`] enum rather than an open
//! trait hierarchy, because the collision pipeline needs to enumerate
//! shape pairs:
//!
//! - [`Circle`]: center and radius
//! - [`Polygon`]: convex, counter-clockwise winding, at least 3 vertices
//! - [`Segment`]: a two-point line segment (thin walls, floors)
//!
//! # Capability set
//!
//! Every shape supports the same operations (dispatched through
//! [`Convex`]):
//!
//! | Operation | Used by |
//! |---|---|
//! | `project(axis, transform)` | separating-axis queries, bounds |
//! | `farthest_point(direction, transform)` | GJK/EPA support function |
//! | `farthest_feature(direction, transform)` | manifold clipping |
//! | `create_aabb(transform)` | broad-phase |
//! | `create_mass(density)` | body mass setup |
//! | `radius_about(point)` | rotation-disc radius for CCD |
//!
//! # Example
//!
//! ```
//! use planar_geometry::{Convex, Polygon};
//! use planar_types::Transform;
//! use nalgebra::Vector2;
//!
//! let shape = Convex::from(Polygon::rectangle(2.0, 1.0).unwrap());
//! let aabb = shape.create_aabb(&Transform::identity());
//! assert_eq!(aabb.max.x, 1.0);
//! assert_eq!(aabb.max.y, 0.5);
//!
//! // Support point in the +X direction is on the right edge
//! let p = shape.farthest_point(&Vector2::x(), &Transform::identity());
//! assert_eq!(p.x, 1.0);
//! ```

#![doc(html_root_url = "https://docs.rs/planar-geometry/0.3.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,     // Many methods can't be const due to nalgebra
    clippy::suboptimal_flops,          // mul_add style changes aren't always clearer
    clippy::missing_errors_doc,        // Error docs added where non-obvious
)]

mod aabb;
mod circle;
mod convex;
mod feature;
mod polygon;
mod segment;

pub use aabb::Aabb;
pub use circle::Circle;
pub use convex::{Convex, Interval};
pub use feature::{EdgeFeature, Feature, VertexFeature};
pub use polygon::Polygon;
pub use segment::Segment;

/// 2D cross product: the z-component of the 3D cross of `(a, 0)` and
/// `(b, 0)`.
#[inline]
#[must_use]
pub fn cross(a: &nalgebra::Vector2<f64>, b: &nalgebra::Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Rotate a vector 90 degrees counter-clockwise (the left normal).
#[inline]
#[must_use]
pub fn left(v: &nalgebra::Vector2<f64>) -> nalgebra::Vector2<f64> {
    nalgebra::Vector2::new(-v.y, v.x)
}

/// Rotate a vector 90 degrees clockwise (the right normal).
///
/// For a counter-clockwise wound polygon this is the outward edge normal.
#[inline]
#[must_use]
pub fn right(v: &nalgebra::Vector2<f64>) -> nalgebra::Vector2<f64> {
    nalgebra::Vector2::new(v.y, -v.x)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use nalgebra::Vector2;

    #[test]
    fn test_cross() {
        assert_eq!(cross(&Vector2::x(), &Vector2::y()), 1.0);
        assert_eq!(cross(&Vector2::y(), &Vector2::x()), -1.0);
    }

    #[test]
    fn test_perpendiculars() {
        let v = Vector2::new(1.0, 0.0);
        assert_eq!(left(&v), Vector2::new(0.0, 1.0));
        assert_eq!(right(&v), Vector2::new(0.0, -1.0));
    }
}
