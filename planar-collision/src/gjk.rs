//! GJK narrow-phase detection with EPA penetration extraction.
//!
//! GJK works in Minkowski-difference space: two convex shapes intersect
//! exactly when the difference `A − B` (every point of A minus every point
//! of B) contains the origin. The algorithm steers a simplex of up to three
//! support points toward the origin; either a support point fails to pass
//! the origin (the shapes are disjoint, and a companion routine reports
//! their distance and closest points) or the simplex encloses it (the
//! shapes overlap, and EPA takes over).
//!
//! EPA (Expanding Polytope Algorithm) grows the terminal simplex into a
//! polygon that hugs the boundary of the Minkowski difference: each
//! iteration finds the polygon edge nearest the origin and inserts the
//! support point along that edge's outward normal, until the insertion
//! stops making progress. The nearest edge then gives the penetration
//! normal and depth.
//!
//! All arithmetic is `f64`. Degenerate cases (collinear supports, centers
//! coinciding) are treated as touching contacts with zero depth rather
//! than errors; iteration-cap overruns report "no collision" and leave the
//! caller to decide whether to warn.
//!
//! # References
//!
//! - Gilbert, Johnson, Keerthi: "A Fast Procedure for Computing the
//!   Distance Between Complex Objects in Three-Dimensional Space" (1988)
//! - van den Bergen: "Collision Detection in Interactive 3D Environments"

use nalgebra::{Point2, Vector2};
use planar_geometry::{right, Convex};
use planar_types::Transform;
use tracing::warn;

/// Tolerance for numerical comparisons in GJK/EPA.
const EPSILON: f64 = 1e-10;

/// Maximum iterations for GJK before giving up.
const GJK_MAX_ITERATIONS: usize = 32;

/// Maximum iterations for the GJK distance refinement.
const DISTANCE_MAX_ITERATIONS: usize = 64;

/// Maximum iterations for EPA before giving up.
const EPA_MAX_ITERATIONS: usize = 100;

/// EPA convergence tolerance: stop once a new support point improves the
/// closest edge by less than this.
const EPA_TOLERANCE: f64 = 1e-9;

/// Distance-query convergence tolerance.
const DISTANCE_TOLERANCE: f64 = 1e-9;

/// Penetration between two overlapping convex shapes.
///
/// The normal is a unit vector pointing from the first shape toward the
/// second; the depth is non-negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Penetration {
    /// Unit normal from shape 1 toward shape 2.
    pub normal: Vector2<f64>,
    /// Overlap depth along the normal (≥ 0).
    pub depth: f64,
}

/// Separation between two disjoint convex shapes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Separation {
    /// Unit normal from shape 1 toward shape 2.
    pub normal: Vector2<f64>,
    /// Distance between the closest points (> 0).
    pub distance: f64,
    /// Closest point on shape 1, world coordinates.
    pub point1: Point2<f64>,
    /// Closest point on shape 2, world coordinates.
    pub point2: Point2<f64>,
}

/// A point in Minkowski-difference space, remembering the support points
/// on both shapes that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinkowskiPoint {
    /// The difference point `support1 - support2`.
    pub point: Point2<f64>,
    /// Support point on shape 1 in world space.
    pub support1: Point2<f64>,
    /// Support point on shape 2 in world space.
    pub support2: Point2<f64>,
}

impl MinkowskiPoint {
    fn new(support1: Point2<f64>, support2: Point2<f64>) -> Self {
        Self {
            point: Point2::from(support1 - support2),
            support1,
            support2,
        }
    }
}

/// The GJK simplex: one to three Minkowski points.
#[derive(Debug, Clone)]
pub struct Simplex {
    points: [MinkowskiPoint; 3],
    size: usize,
}

impl Simplex {
    fn new() -> Self {
        let zero = MinkowskiPoint::new(Point2::origin(), Point2::origin());
        Self {
            points: [zero; 3],
            size: 0,
        }
    }

    /// Push a point; the newest point is always index 0.
    fn push(&mut self, point: MinkowskiPoint) {
        for i in (1..=self.size.min(2)).rev() {
            self.points[i] = self.points[i - 1];
        }
        self.points[0] = point;
        self.size = (self.size + 1).min(3);
    }

    fn set(&mut self, points: &[MinkowskiPoint]) {
        self.size = points.len().min(3);
        for (i, p) in points.iter().take(3).enumerate() {
            self.points[i] = *p;
        }
    }

    /// Get the number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.size
    }

    /// Check if the simplex is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Get the points as a slice.
    #[must_use]
    pub fn points(&self) -> &[MinkowskiPoint] {
        &self.points[..self.size]
    }
}

/// Triple product `(a × b) × c = b(a·c) − a(b·c)`: a vector perpendicular
/// to `a`, pointing toward `c`'s side.
#[inline]
fn triple_product(a: &Vector2<f64>, b: &Vector2<f64>, c: &Vector2<f64>) -> Vector2<f64> {
    b * a.dot(c) - a * b.dot(c)
}

/// Support point on the Minkowski difference `shape1 − shape2`.
fn support(
    shape1: &Convex,
    transform1: &Transform,
    shape2: &Convex,
    transform2: &Transform,
    direction: &Vector2<f64>,
) -> MinkowskiPoint {
    let s1 = shape1.farthest_point(direction, transform1);
    let s2 = shape2.farthest_point(&-direction, transform2);
    MinkowskiPoint::new(s1, s2)
}

/// The GJK/EPA narrow-phase detector.
///
/// Holds nothing but iteration caps; the default is what the solver was
/// tuned against.
#[derive(Debug, Clone)]
pub struct Gjk {
    max_iterations: usize,
    epa_max_iterations: usize,
}

impl Default for Gjk {
    fn default() -> Self {
        Self::new()
    }
}

impl Gjk {
    /// Create a detector with the default iteration caps.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_iterations: GJK_MAX_ITERATIONS,
            epa_max_iterations: EPA_MAX_ITERATIONS,
        }
    }

    /// Test two shapes for intersection; on overlap, return the terminal
    /// simplex for EPA.
    #[must_use]
    pub fn detect(
        &self,
        shape1: &Convex,
        transform1: &Transform,
        shape2: &Convex,
        transform2: &Transform,
    ) -> Option<Simplex> {
        let c1 = transform1.transform_point(&shape1.center());
        let c2 = transform2.transform_point(&shape2.center());

        let mut direction = c2 - c1;
        if direction.norm_squared() < EPSILON {
            direction = Vector2::x();
        }

        let mut simplex = Simplex::new();
        let first = support(shape1, transform1, shape2, transform2, &direction);
        simplex.push(first);
        direction = -first.point.coords;

        for _ in 0..self.max_iterations {
            if direction.norm_squared() < EPSILON {
                // The origin lies on the simplex: a touching contact.
                return Some(simplex);
            }
            direction = direction.normalize();

            let point = support(shape1, transform1, shape2, transform2, &direction);
            if point.point.coords.dot(&direction) < 0.0 {
                // The support plane separates the origin: disjoint.
                return None;
            }

            simplex.push(point);
            if Self::advance_simplex(&mut simplex, &mut direction) {
                return Some(simplex);
            }
        }

        // No convergence within the cap; the pair is treated as disjoint
        // for this query.
        warn!("GJK hit its iteration cap; treating the pair as disjoint");
        None
    }

    /// Intersection test without penetration extraction.
    #[must_use]
    pub fn intersects(
        &self,
        shape1: &Convex,
        transform1: &Transform,
        shape2: &Convex,
        transform2: &Transform,
    ) -> bool {
        self.detect(shape1, transform1, shape2, transform2).is_some()
    }

    /// Full narrow-phase query: `None` if the shapes are disjoint or the
    /// algorithms fail to converge, otherwise the penetration normal
    /// (shape 1 toward shape 2) and depth.
    #[must_use]
    pub fn penetration(
        &self,
        shape1: &Convex,
        transform1: &Transform,
        shape2: &Convex,
        transform2: &Transform,
    ) -> Option<Penetration> {
        let simplex = self.detect(shape1, transform1, shape2, transform2)?;
        self.expand_polytope(&simplex, shape1, transform1, shape2, transform2)
    }

    /// Process the simplex after a push, updating the search direction.
    ///
    /// Returns true when the simplex encloses the origin.
    fn advance_simplex(simplex: &mut Simplex, direction: &mut Vector2<f64>) -> bool {
        match simplex.len() {
            2 => {
                let a = simplex.points[0];
                let b = simplex.points[1];
                let ab = b.point - a.point;
                let ao = -a.point.coords;

                if ab.dot(&ao) > 0.0 {
                    *direction = triple_product(&ab, &ao, &ab);
                } else {
                    simplex.set(&[a]);
                    *direction = ao;
                }
                false
            }
            3 => {
                let a = simplex.points[0];
                let b = simplex.points[1];
                let c = simplex.points[2];

                let ab = b.point - a.point;
                let ac = c.point - a.point;
                let ao = -a.point.coords;

                // Outward perpendiculars of the two edges touching the
                // newest point.
                let ab_perp = triple_product(&ac, &ab, &ab);
                let ac_perp = triple_product(&ab, &ac, &ac);

                if ab_perp.dot(&ao) > 0.0 {
                    simplex.set(&[a, b]);
                    *direction = ab_perp;
                    false
                } else if ac_perp.dot(&ao) > 0.0 {
                    simplex.set(&[a, c]);
                    *direction = ac_perp;
                    false
                } else {
                    true
                }
            }
            _ => false,
        }
    }

    /// EPA: expand the terminal simplex into a polygon along the Minkowski
    /// boundary and read the penetration off the closest edge.
    fn expand_polytope(
        &self,
        simplex: &Simplex,
        shape1: &Convex,
        transform1: &Transform,
        shape2: &Convex,
        transform2: &Transform,
    ) -> Option<Penetration> {
        let mut polytope: Vec<MinkowskiPoint> = simplex.points().to_vec();

        // A degenerate simplex (touching contact) needs to be grown into a
        // triangle before edges exist to expand.
        if polytope.len() < 3 {
            for direction in [Vector2::x(), Vector2::y(), -Vector2::x(), -Vector2::y()] {
                if polytope.len() >= 3 {
                    break;
                }
                let p = support(shape1, transform1, shape2, transform2, &direction);
                let is_new = polytope
                    .iter()
                    .all(|v| (v.point - p.point).norm_squared() > EPSILON);
                if is_new {
                    polytope.push(p);
                }
            }
        }
        if polytope.len() < 3 {
            // The Minkowski difference is flat: the shapes touch along a
            // line or point.
            return Some(Self::touching_contact(shape1, transform1, shape2, transform2));
        }

        // Normalize winding so edge outward normals are the right-hand
        // perpendiculars.
        if polygon_signed_area(&polytope) < 0.0 {
            polytope.reverse();
        }

        for _ in 0..self.epa_max_iterations {
            let (index, normal, distance) = closest_edge(&polytope)?;

            let point = support(shape1, transform1, shape2, transform2, &normal);
            let support_distance = point.point.coords.dot(&normal);

            if support_distance - distance < EPA_TOLERANCE {
                return Some(Penetration {
                    normal,
                    depth: distance.max(0.0),
                });
            }

            // Insert the new vertex between the closest edge's endpoints.
            polytope.insert(index + 1, point);
        }

        // Return the best estimate found at the iteration cap.
        let (_, normal, distance) = closest_edge(&polytope)?;
        Some(Penetration {
            normal,
            depth: distance.max(0.0),
        })
    }

    /// A zero-depth contact for shapes whose Minkowski difference is flat.
    fn touching_contact(
        shape1: &Convex,
        transform1: &Transform,
        shape2: &Convex,
        transform2: &Transform,
    ) -> Penetration {
        let c1 = transform1.transform_point(&shape1.center());
        let c2 = transform2.transform_point(&shape2.center());
        let axis = c2 - c1;
        let normal = if axis.norm_squared() > EPSILON {
            axis.normalize()
        } else {
            Vector2::x()
        };
        Penetration { normal, depth: 0.0 }
    }

    /// Distance between two disjoint shapes, with witness points.
    ///
    /// Returns `None` if the shapes intersect or touch.
    #[must_use]
    pub fn distance(
        &self,
        shape1: &Convex,
        transform1: &Transform,
        shape2: &Convex,
        transform2: &Transform,
    ) -> Option<Separation> {
        let c1 = transform1.transform_point(&shape1.center());
        let c2 = transform2.transform_point(&shape2.center());

        let mut direction = c2 - c1;
        if direction.norm_squared() < EPSILON {
            direction = Vector2::x();
        }

        let mut a = support(shape1, transform1, shape2, transform2, &direction);
        let mut b = support(shape1, transform1, shape2, transform2, &-direction);

        for _ in 0..DISTANCE_MAX_ITERATIONS {
            let (closest, t) = closest_point_on_segment(&a.point, &b.point);
            let distance = closest.coords.norm();
            if distance < EPSILON {
                // The origin lies on the segment: touching.
                return None;
            }

            direction = -closest.coords / distance;
            let c = support(shape1, transform1, shape2, transform2, &direction);

            // If the new support cannot get past the current closest point,
            // the simplex already spans the closest feature.
            let progress = c.point.coords.dot(&direction) + distance;
            if progress < DISTANCE_TOLERANCE {
                return Some(Self::separation_from_segment(&a, &b, t, distance));
            }

            // Keep the sub-segment that stays closest to the origin.
            let (ac_closest, _) = closest_point_on_segment(&a.point, &c.point);
            let (cb_closest, _) = closest_point_on_segment(&c.point, &b.point);
            if ac_closest.coords.norm_squared() <= cb_closest.coords.norm_squared() {
                b = c;
            } else {
                a = c;
            }
        }

        let (closest, t) = closest_point_on_segment(&a.point, &b.point);
        let distance = closest.coords.norm();
        if distance < EPSILON {
            return None;
        }
        Some(Self::separation_from_segment(&a, &b, t, distance))
    }

    /// Recover world-space witness points from the barycentric coordinate
    /// of the closest point on the terminal segment.
    fn separation_from_segment(
        a: &MinkowskiPoint,
        b: &MinkowskiPoint,
        t: f64,
        distance: f64,
    ) -> Separation {
        let point1 = Point2::from(a.support1.coords.lerp(&b.support1.coords, t));
        let point2 = Point2::from(a.support2.coords.lerp(&b.support2.coords, t));
        let normal = (point2 - point1) / distance;
        Separation {
            normal,
            distance,
            point1,
            point2,
        }
    }
}

/// Closest point to the origin on the segment `[a, b]`, with its
/// barycentric coordinate.
fn closest_point_on_segment(a: &Point2<f64>, b: &Point2<f64>) -> (Point2<f64>, f64) {
    let ab = b - a;
    let length_squared = ab.norm_squared();
    if length_squared < EPSILON {
        return (*a, 0.0);
    }
    let t = (-a.coords.dot(&ab) / length_squared).clamp(0.0, 1.0);
    (a + ab * t, t)
}

/// Twice the signed area of the polytope (positive for counter-clockwise
/// winding).
fn polygon_signed_area(polytope: &[MinkowskiPoint]) -> f64 {
    let n = polytope.len();
    let mut sum = 0.0;
    for i in 0..n {
        let a = polytope[i].point;
        let b = polytope[(i + 1) % n].point;
        sum += a.x * b.y - b.x * a.y;
    }
    sum
}

/// Find the polytope edge closest to the origin: `(index, outward normal,
/// distance)`.
fn closest_edge(polytope: &[MinkowskiPoint]) -> Option<(usize, Vector2<f64>, f64)> {
    let n = polytope.len();
    let mut best: Option<(usize, Vector2<f64>, f64)> = None;

    for i in 0..n {
        let a = polytope[i].point;
        let b = polytope[(i + 1) % n].point;
        let edge = b - a;
        if edge.norm_squared() < EPSILON {
            continue;
        }
        let normal = right(&edge).normalize();
        let distance = normal.dot(&a.coords);
        if best.map_or(true, |(_, _, d)| distance < d) {
            best = Some((i, normal, distance));
        }
    }
    best
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
    use approx::assert_relative_eq;
    use planar_geometry::{Circle, Polygon};

    fn transform_at(x: f64, y: f64) -> Transform {
        Transform::from_position(Point2::new(x, y))
    }

    fn circle(radius: f64) -> Convex {
        Convex::from(Circle::new(radius).unwrap())
    }

    fn unit_box() -> Convex {
        Convex::from(Polygon::rectangle(1.0, 1.0).unwrap())
    }

    #[test]
    fn test_circles_intersecting() {
        let gjk = Gjk::new();
        // Radii sum to 2, centers 1.5 apart
        assert!(gjk.intersects(&circle(1.0), &transform_at(0.0, 0.0), &circle(1.0), &transform_at(1.5, 0.0)));
    }

    #[test]
    fn test_circles_separated() {
        let gjk = Gjk::new();
        assert!(!gjk.intersects(&circle(1.0), &transform_at(0.0, 0.0), &circle(1.0), &transform_at(3.0, 0.0)));
    }

    #[test]
    fn test_circle_box_intersecting() {
        let gjk = Gjk::new();
        assert!(gjk.intersects(&circle(1.0), &transform_at(0.0, 0.0), &unit_box(), &transform_at(1.2, 0.0)));
    }

    #[test]
    fn test_coincident_centers() {
        let gjk = Gjk::new();
        assert!(gjk.intersects(&circle(1.0), &transform_at(0.0, 0.0), &circle(0.5), &transform_at(0.0, 0.0)));
    }

    #[test]
    fn test_penetration_circles() {
        let gjk = Gjk::new();
        let result = gjk
            .penetration(&circle(1.0), &transform_at(0.0, 0.0), &circle(1.0), &transform_at(1.5, 0.0))
            .unwrap();

        // Overlap = 2 - 1.5 = 0.5, along +X from shape 1 to shape 2
        assert_relative_eq!(result.depth, 0.5, epsilon = 1e-6);
        assert_relative_eq!(result.normal.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(result.normal.norm(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_penetration_boxes() {
        let gjk = Gjk::new();
        let result = gjk
            .penetration(&unit_box(), &transform_at(0.0, 0.0), &unit_box(), &transform_at(0.9, 0.0))
            .unwrap();

        assert_relative_eq!(result.depth, 0.1, epsilon = 1e-9);
        assert_relative_eq!(result.normal.x, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_penetration_normal_direction_flips_with_order() {
        let gjk = Gjk::new();
        let ta = transform_at(0.0, 0.0);
        let tb = transform_at(0.0, 0.8);

        let ab = gjk.penetration(&unit_box(), &ta, &unit_box(), &tb).unwrap();
        let ba = gjk.penetration(&unit_box(), &tb, &unit_box(), &ta).unwrap();

        // Normal always points from the first shape to the second.
        assert!(ab.normal.y > 0.9);
        assert!(ba.normal.y < -0.9);
        assert_relative_eq!(ab.depth, ba.depth, epsilon = 1e-9);
    }

    #[test]
    fn test_distance_circles() {
        let gjk = Gjk::new();
        let separation = gjk
            .distance(&circle(1.0), &transform_at(0.0, 0.0), &circle(1.0), &transform_at(5.0, 0.0))
            .unwrap();

        assert_relative_eq!(separation.distance, 3.0, epsilon = 1e-6);
        assert_relative_eq!(separation.normal.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(separation.point1.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(separation.point2.x, 4.0, epsilon = 1e-6);
    }

    #[test]
    fn test_distance_boxes() {
        let gjk = Gjk::new();
        let separation = gjk
            .distance(&unit_box(), &transform_at(0.0, 0.0), &unit_box(), &transform_at(3.0, 0.0))
            .unwrap();

        assert_relative_eq!(separation.distance, 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_distance_none_when_overlapping() {
        let gjk = Gjk::new();
        assert!(gjk
            .distance(&unit_box(), &transform_at(0.0, 0.0), &unit_box(), &transform_at(0.5, 0.0))
            .is_none());
    }

    #[test]
    fn test_distance_is_symmetric() {
        let gjk = Gjk::new();
        let box_transform = Transform::from_position_angle(Point2::new(2.4, 1.3), 0.5);

        let ab = gjk
            .distance(&circle(0.7), &transform_at(0.0, 0.0), &unit_box(), &box_transform)
            .unwrap();
        let ba = gjk
            .distance(&unit_box(), &box_transform, &circle(0.7), &transform_at(0.0, 0.0))
            .unwrap();

        assert_relative_eq!(ab.distance, ba.distance, epsilon = 1e-6);
    }

    #[test]
    fn test_rotated_boxes() {
        let gjk = Gjk::new();
        let tilted = Transform::from_position_angle(
            Point2::new(1.2, 0.0),
            std::f64::consts::FRAC_PI_4,
        );

        // Corner-on: the rotated box reaches sqrt(2)/2 toward the other
        assert!(gjk.intersects(&unit_box(), &transform_at(0.0, 0.0), &unit_box(), &tilted));

        let result = gjk
            .penetration(&unit_box(), &transform_at(0.0, 0.0), &unit_box(), &tilted)
            .unwrap();
        let expected = 0.5 + std::f64::consts::FRAC_1_SQRT_2 - 1.2;
        assert_relative_eq!(result.depth, expected, epsilon = 1e-6);
    }

    #[test]
    fn test_touching_shapes_report_zero_depth() {
        let gjk = Gjk::new();
        // Exactly touching boxes; either detection outcome is acceptable,
        // but an intersection must carry (near) zero depth.
        if let Some(result) =
            gjk.penetration(&unit_box(), &transform_at(0.0, 0.0), &unit_box(), &transform_at(1.0, 0.0))
        {
            assert!(result.depth.abs() < 1e-6);
        }
    }
}
