//! Contact manifold generation by edge clipping.
//!
//! The narrow phase reports a single penetration normal and depth; the
//! manifold solver turns that into one or two contact points:
//!
//! 1. Ask shape 1 for its farthest feature along the penetration normal
//!    and shape 2 for its farthest feature against it.
//! 2. If either feature is a vertex, the manifold is that single point.
//! 3. Otherwise both features are edges: the more perpendicular edge (to
//!    the normal) becomes the *reference*, the other the *incident*; the
//!    incident edge is clipped against the reference edge's side planes,
//!    and every surviving point behind the reference face becomes a
//!    contact point.
//!
//! When the roles are swapped relative to the shape order, the manifold
//! points record `flipped = true` in their ids. Each id encodes the
//! reference edge, incident edge, clipped vertex, and flip flag, which
//! keeps point identity stable while a pair of shapes stays in contact;
//! the contact solver relies on that identity to carry accumulated
//! impulses across steps.
//!
//! The manifold normal points from shape 2 toward shape 1, the convention
//! the contact solver expects.

use nalgebra::{Point2, Vector2};
use planar_geometry::{left, Convex, Feature, VertexFeature};
use planar_types::Transform;

use crate::Penetration;

/// Degenerate-edge guard for the reference edge.
const EDGE_EPSILON: f64 = 1e-12;

/// Identity of a contact point, stable across steps while the contacting
/// features persist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ManifoldPointId {
    /// A single-point manifold produced from a vertex feature; there is
    /// nothing to index.
    Distance,
    /// A clipped point, identified by the features that produced it.
    Indexed {
        /// Reference edge index on its shape.
        reference: usize,
        /// Incident edge index on its shape.
        incident: usize,
        /// Index of the incident vertex that survived clipping.
        vertex: usize,
        /// Whether reference/incident roles were swapped relative to the
        /// shape order.
        flipped: bool,
    },
}

/// A single contact point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManifoldPoint {
    /// Stable identity for warm-starting.
    pub id: ManifoldPointId,
    /// Contact point in world coordinates.
    pub point: Point2<f64>,
    /// Penetration depth at this point (≥ 0).
    pub depth: f64,
}

/// A contact manifold: one or two points sharing a normal.
#[derive(Debug, Clone, PartialEq)]
pub struct Manifold {
    /// Unit normal pointing from shape 2 toward shape 1.
    pub normal: Vector2<f64>,
    /// The contact points (one or two).
    pub points: Vec<ManifoldPoint>,
}

/// Manifold generation by clipping the incident edge against the
/// reference edge.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClippingManifoldSolver;

impl ClippingManifoldSolver {
    /// Create a new solver.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Build a manifold for an intersecting pair.
    ///
    /// `penetration` must come from the same shapes in the same order.
    /// Returns `None` when clipping degenerates (grazing contacts where
    /// fewer than two points survive a side plane); callers treat that as
    /// no contact for this step.
    #[must_use]
    pub fn solve(
        &self,
        penetration: &Penetration,
        convex1: &Convex,
        transform1: &Transform,
        convex2: &Convex,
        transform2: &Transform,
    ) -> Option<Manifold> {
        let n = penetration.normal;

        let feature1 = convex1.farthest_feature(&n, transform1);
        if let Feature::Vertex(vertex) = feature1 {
            return Some(Manifold {
                normal: -n,
                points: vec![ManifoldPoint {
                    id: ManifoldPointId::Distance,
                    point: vertex.point,
                    depth: penetration.depth,
                }],
            });
        }

        let feature2 = convex2.farthest_feature(&-n, transform2);
        if let Feature::Vertex(vertex) = feature2 {
            return Some(Manifold {
                normal: -n,
                points: vec![ManifoldPoint {
                    id: ManifoldPointId::Distance,
                    point: vertex.point,
                    depth: penetration.depth,
                }],
            });
        }

        let (Feature::Edge(edge1), Feature::Edge(edge2)) = (feature1, feature2) else {
            return None;
        };

        // The reference edge is the one more perpendicular to the normal;
        // a swap relative to shape order is recorded in the point ids.
        let alignment1 = normalized_alignment(&edge1.edge, &n);
        let alignment2 = normalized_alignment(&edge2.edge, &n);
        let (reference, incident, flipped) = if alignment1 > alignment2 {
            (edge2, edge1, true)
        } else {
            (edge1, edge2, false)
        };

        if reference.edge.norm_squared() < EDGE_EPSILON {
            return None;
        }
        let mut refev = reference.edge.normalize();

        // Orient the reference edge so its left normal opposes the query
        // direction. Polygon windings guarantee this already; segments
        // have no interior, so their edge may arrive either way.
        let query = if flipped { -n } else { n };
        let (ref_v1, ref_v2) = if left(&refev).dot(&query) > 0.0 {
            refev = -refev;
            (reference.vertex2, reference.vertex1)
        } else {
            (reference.vertex1, reference.vertex2)
        };

        // Clip the incident edge against the two side planes of the
        // reference edge.
        let offset1 = -refev.dot(&ref_v1.point.coords);
        let clip1 = clip(&incident.vertex1, &incident.vertex2, &-refev, offset1);
        if clip1.len() < 2 {
            return None;
        }

        let offset2 = refev.dot(&ref_v2.point.coords);
        let clip2 = clip(&clip1[0], &clip1[1], &refev, offset2);
        if clip2.len() < 2 {
            return None;
        }

        // The reference face: depth is measured along the inward normal of
        // the reference edge, from its farthest vertex.
        let front_normal = left(&refev);
        let front_offset = front_normal.dot(&reference.max.point.coords);

        let normal = if flipped { -front_normal } else { front_normal };

        let mut points = Vec::with_capacity(2);
        for vertex in &clip2 {
            let depth = front_normal.dot(&vertex.point.coords) - front_offset;
            if depth >= 0.0 {
                points.push(ManifoldPoint {
                    id: ManifoldPointId::Indexed {
                        reference: reference.index,
                        incident: incident.index,
                        vertex: vertex.index,
                        flipped,
                    },
                    point: vertex.point,
                    depth,
                });
            }
        }

        if points.is_empty() {
            return None;
        }
        Some(Manifold { normal, points })
    }
}

/// |ê·n| for role selection; zero for a degenerate edge.
fn normalized_alignment(edge: &Vector2<f64>, normal: &Vector2<f64>) -> f64 {
    let length = edge.norm();
    if length < EDGE_EPSILON {
        return 0.0;
    }
    (edge.dot(normal) / length).abs()
}

/// Clip the segment `[v1, v2]` against the plane `n·p = offset`, keeping
/// the side `n·p ≤ offset`.
///
/// An intersection point inherits the index of the vertex that was clipped
/// away, so ids stay tied to the incident edge's topology.
fn clip(
    v1: &VertexFeature,
    v2: &VertexFeature,
    n: &Vector2<f64>,
    offset: f64,
) -> Vec<VertexFeature> {
    let mut points = Vec::with_capacity(2);
    let d1 = n.dot(&v1.point.coords) - offset;
    let d2 = n.dot(&v2.point.coords) - offset;

    if d1 <= 0.0 {
        points.push(*v1);
    }
    if d2 <= 0.0 {
        points.push(*v2);
    }

    if d1 * d2 < 0.0 {
        let u = d1 / (d1 - d2);
        let point = v1.point + (v2.point - v1.point) * u;
        let index = if d1 > 0.0 { v1.index } else { v2.index };
        points.push(VertexFeature::new(point, index));
    }
    points
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::float_cmp,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use crate::Gjk;
    use approx::assert_relative_eq;
    use planar_geometry::{Circle, Polygon, Segment};

    fn unit_box() -> Convex {
        Convex::from(Polygon::rectangle(1.0, 1.0).unwrap())
    }

    fn transform_at(x: f64, y: f64) -> Transform {
        Transform::from_position(Point2::new(x, y))
    }

    fn manifold_for(
        shape1: &Convex,
        t1: &Transform,
        shape2: &Convex,
        t2: &Transform,
    ) -> Manifold {
        let penetration = Gjk::new().penetration(shape1, t1, shape2, t2).unwrap();
        ClippingManifoldSolver::new()
            .solve(&penetration, shape1, t1, shape2, t2)
            .unwrap()
    }

    #[test]
    fn test_box_box_two_points() {
        let manifold = manifold_for(
            &unit_box(),
            &transform_at(0.0, 0.0),
            &unit_box(),
            &transform_at(0.9, 0.0),
        );

        assert_eq!(manifold.points.len(), 2);
        for point in &manifold.points {
            assert_relative_eq!(point.depth, 0.1, epsilon = 1e-9);
        }
        // Normal points from shape 2 back toward shape 1
        assert_relative_eq!(manifold.normal.x, -1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_circle_box_single_point() {
        let circle = Convex::from(Circle::new(0.5).unwrap());
        let manifold = manifold_for(
            &circle,
            &transform_at(0.0, 0.0),
            &unit_box(),
            &transform_at(0.9, 0.0),
        );

        assert_eq!(manifold.points.len(), 1);
        assert_eq!(manifold.points[0].id, ManifoldPointId::Distance);
        assert_relative_eq!(manifold.points[0].depth, 0.1, epsilon = 1e-6);
    }

    #[test]
    fn test_box_resting_on_segment() {
        let floor = Convex::from(
            Segment::new(Point2::new(-5.0, 0.0), Point2::new(5.0, 0.0)).unwrap(),
        );
        // Box slightly sunk into the floor
        let manifold = manifold_for(
            &floor,
            &Transform::identity(),
            &unit_box(),
            &transform_at(0.0, 0.45),
        );

        assert_eq!(manifold.points.len(), 2);
        for point in &manifold.points {
            assert_relative_eq!(point.depth, 0.05, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_ids_are_stable_across_small_motion() {
        let t1 = transform_at(0.0, 0.0);
        let before = manifold_for(&unit_box(), &t1, &unit_box(), &transform_at(0.9, 0.0));
        let after = manifold_for(&unit_box(), &t1, &unit_box(), &transform_at(0.905, 0.001));

        let before_ids: Vec<_> = before.points.iter().map(|p| p.id).collect();
        let after_ids: Vec<_> = after.points.iter().map(|p| p.id).collect();
        assert_eq!(before_ids, after_ids);
    }

    #[test]
    fn test_depths_match_penetration_for_aligned_boxes() {
        let penetration = Gjk::new()
            .penetration(
                &unit_box(),
                &transform_at(0.0, 0.0),
                &unit_box(),
                &transform_at(0.0, 0.8),
            )
            .unwrap();
        let manifold = ClippingManifoldSolver::new()
            .solve(
                &penetration,
                &unit_box(),
                &transform_at(0.0, 0.0),
                &unit_box(),
                &transform_at(0.0, 0.8),
            )
            .unwrap();

        assert_eq!(manifold.points.len(), 2);
        for point in &manifold.points {
            assert_relative_eq!(point.depth, penetration.depth, epsilon = 1e-9);
        }
        // Stacked vertically: normal points down toward shape 1
        assert_relative_eq!(manifold.normal.y, -1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_corner_contact_single_point() {
        // A box tilted 45 degrees resting its corner on a flat box: the
        // clip keeps both side-plane survivors but only the penetrating
        // corner passes the front-face test.
        let tilted = Transform::from_position_angle(
            Point2::new(0.0, 1.1),
            std::f64::consts::FRAC_PI_4,
        );
        let penetration = Gjk::new()
            .penetration(&unit_box(), &transform_at(0.0, 0.0), &unit_box(), &tilted)
            .unwrap();
        let manifold = ClippingManifoldSolver::new()
            .solve(
                &penetration,
                &unit_box(),
                &transform_at(0.0, 0.0),
                &unit_box(),
                &tilted,
            )
            .unwrap();

        assert_eq!(manifold.points.len(), 1);
        assert!(manifold.points[0].depth >= 0.0);
    }
}
