//! Convex polygon shape.

use nalgebra::{Point2, Vector2};
use planar_types::{MassData, MassKind, PhysicsError, Transform};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{cross, right, Aabb, EdgeFeature, Feature, Interval, VertexFeature};

/// Collinearity / duplicate-vertex tolerance for polygon construction.
const AREA_EPSILON: f64 = 1e-10;

/// A convex polygon with counter-clockwise winding.
///
/// Winding is normalized at construction: clockwise input is reversed.
/// Degenerate input (fewer than three vertices, duplicate or collinear
/// points, zero area, or a concavity) is rejected.
///
/// # Example
///
/// ```
/// use planar_geometry::Polygon;
/// use nalgebra::Point2;
///
/// let triangle = Polygon::new(vec![
///     Point2::new(0.0, 0.0),
///     Point2::new(1.0, 0.0),
///     Point2::new(0.0, 1.0),
/// ])
/// .unwrap();
/// assert_eq!(triangle.vertices().len(), 3);
///
/// // Clockwise input is accepted and reversed
/// let cw = Polygon::new(vec![
///     Point2::new(0.0, 0.0),
///     Point2::new(0.0, 1.0),
///     Point2::new(1.0, 0.0),
/// ])
/// .unwrap();
/// assert!(cw.area() > 0.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Polygon {
    vertices: Vec<Point2<f64>>,
    normals: Vec<Vector2<f64>>,
    center: Point2<f64>,
    area: f64,
}

impl Polygon {
    /// Create a polygon from a list of vertices.
    ///
    /// The winding may be clockwise or counter-clockwise; the stored
    /// polygon is always counter-clockwise.
    pub fn new(mut vertices: Vec<Point2<f64>>) -> planar_types::Result<Self> {
        if vertices.len() < 3 {
            return Err(PhysicsError::degenerate_polygon(
                "a polygon requires at least 3 vertices",
            ));
        }
        if !vertices
            .iter()
            .all(|v| v.coords.iter().all(|x| x.is_finite()))
        {
            return Err(PhysicsError::NonFiniteParameter { name: "vertices" });
        }

        let signed_area = signed_area(&vertices);
        if signed_area.abs() < AREA_EPSILON {
            return Err(PhysicsError::degenerate_polygon("polygon has zero area"));
        }
        if signed_area < 0.0 {
            vertices.reverse();
        }

        // Every adjacent edge pair must turn left; a zero cross product is a
        // duplicate or collinear vertex.
        let n = vertices.len();
        for i in 0..n {
            let p0 = vertices[i];
            let p1 = vertices[(i + 1) % n];
            let p2 = vertices[(i + 2) % n];
            let turn = cross(&(p1 - p0), &(p2 - p1));
            if turn.abs() < AREA_EPSILON {
                return Err(PhysicsError::degenerate_polygon(
                    "polygon has duplicate or collinear vertices",
                ));
            }
            if turn < 0.0 {
                return Err(PhysicsError::degenerate_polygon("polygon is not convex"));
            }
        }

        let normals = vertices
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let edge = vertices[(i + 1) % n] - v;
                right(&edge).normalize()
            })
            .collect();

        let area = signed_area.abs();
        let center = centroid(&vertices, area);

        Ok(Self {
            vertices,
            normals,
            center,
            area,
        })
    }

    /// Create an axis-aligned rectangle centered at the local origin.
    pub fn rectangle(width: f64, height: f64) -> planar_types::Result<Self> {
        if !width.is_finite() || !height.is_finite() || width <= 0.0 || height <= 0.0 {
            return Err(PhysicsError::invalid_shape(
                "rectangle dimensions must be positive",
            ));
        }
        let hw = width * 0.5;
        let hh = height * 0.5;
        Self::new(vec![
            Point2::new(-hw, -hh),
            Point2::new(hw, -hh),
            Point2::new(hw, hh),
            Point2::new(-hw, hh),
        ])
    }

    /// Create a triangle from three points.
    pub fn triangle(
        p1: Point2<f64>,
        p2: Point2<f64>,
        p3: Point2<f64>,
    ) -> planar_types::Result<Self> {
        Self::new(vec![p1, p2, p3])
    }

    /// Create a right triangle with legs along the axes, right angle at the
    /// local origin.
    pub fn right_triangle(width: f64, height: f64) -> planar_types::Result<Self> {
        if !width.is_finite() || !height.is_finite() || width <= 0.0 || height <= 0.0 {
            return Err(PhysicsError::invalid_shape(
                "triangle dimensions must be positive",
            ));
        }
        Self::triangle(
            Point2::origin(),
            Point2::new(width, 0.0),
            Point2::new(0.0, height),
        )
    }

    /// Create a regular polygon inscribed in a circle of the given radius.
    pub fn unit_circle_polygon(count: usize, radius: f64) -> planar_types::Result<Self> {
        if count < 3 {
            return Err(PhysicsError::invalid_shape(
                "a regular polygon requires at least 3 vertices",
            ));
        }
        if !radius.is_finite() || radius <= 0.0 {
            return Err(PhysicsError::invalid_shape("radius must be positive"));
        }
        let step = 2.0 * std::f64::consts::PI / count as f64;
        let vertices = (0..count)
            .map(|i| {
                let theta = step * i as f64;
                Point2::new(radius * theta.cos(), radius * theta.sin())
            })
            .collect();
        Self::new(vertices)
    }

    /// Get the vertices in counter-clockwise order.
    #[must_use]
    pub fn vertices(&self) -> &[Point2<f64>] {
        &self.vertices
    }

    /// Get the outward unit edge normals; `normals()[i]` belongs to the
    /// edge from `vertices()[i]` to `vertices()[i + 1]`.
    #[must_use]
    pub fn normals(&self) -> &[Vector2<f64>] {
        &self.normals
    }

    /// Get the centroid in the local frame.
    #[must_use]
    pub fn center(&self) -> Point2<f64> {
        self.center
    }

    /// Get the enclosed area.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.area
    }

    /// Project the polygon onto an axis.
    #[must_use]
    pub fn project(&self, axis: &Vector2<f64>, transform: &Transform) -> Interval {
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in &self.vertices {
            let d = transform.transform_point(v).coords.dot(axis);
            min = min.min(d);
            max = max.max(d);
        }
        Interval::new(min, max)
    }

    /// Index of the vertex farthest along a world-space direction.
    fn farthest_vertex_index(&self, direction: &Vector2<f64>, transform: &Transform) -> usize {
        let local_dir = transform.inverse_transform_vector(direction);
        let mut best = 0;
        let mut best_dot = f64::NEG_INFINITY;
        for (i, v) in self.vertices.iter().enumerate() {
            let d = v.coords.dot(&local_dir);
            if d > best_dot {
                best_dot = d;
                best = i;
            }
        }
        best
    }

    /// Get the world-space point farthest in the given direction.
    #[must_use]
    pub fn farthest_point(&self, direction: &Vector2<f64>, transform: &Transform) -> Point2<f64> {
        let index = self.farthest_vertex_index(direction, transform);
        transform.transform_point(&self.vertices[index])
    }

    /// Get the farthest feature in the given direction.
    ///
    /// Returns the edge adjacent to the farthest vertex whose outward
    /// normal is nearest the direction; the edge's `max` is that vertex.
    #[must_use]
    pub fn farthest_feature(&self, direction: &Vector2<f64>, transform: &Transform) -> Feature {
        let n = self.vertices.len();
        let index = self.farthest_vertex_index(direction, transform);
        let local_dir = transform.inverse_transform_vector(direction);

        let prev = (index + n - 1) % n;
        let next = (index + 1) % n;

        let max = VertexFeature::new(transform.transform_point(&self.vertices[index]), index);

        // The candidate edges share the farthest vertex; take the one whose
        // outward normal is better aligned with the query direction.
        if self.normals[prev].dot(&local_dir) >= self.normals[index].dot(&local_dir) {
            let v1 = VertexFeature::new(transform.transform_point(&self.vertices[prev]), prev);
            Feature::Edge(EdgeFeature::new(v1, max, prev, max))
        } else {
            let v2 = VertexFeature::new(transform.transform_point(&self.vertices[next]), next);
            Feature::Edge(EdgeFeature::new(max, v2, index, max))
        }
    }

    /// Compute the world-space AABB.
    #[must_use]
    pub fn create_aabb(&self, transform: &Transform) -> Aabb {
        let mut min = Point2::new(f64::INFINITY, f64::INFINITY);
        let mut max = Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        for v in &self.vertices {
            let w = transform.transform_point(v);
            min.x = min.x.min(w.x);
            min.y = min.y.min(w.y);
            max.x = max.x.max(w.x);
            max.y = max.y.max(w.y);
        }
        Aabb::new(min, max)
    }

    /// Maximum distance from the given local point to any vertex.
    #[must_use]
    pub fn radius_about(&self, point: &Point2<f64>) -> f64 {
        self.vertices
            .iter()
            .map(|v| (v - point).norm_squared())
            .fold(0.0_f64, f64::max)
            .sqrt()
    }

    /// Compute mass data for the given density.
    ///
    /// Mass is `ρ·area`; inertia uses the standard polygon decomposition
    /// into triangles about the centroid.
    #[must_use]
    pub fn create_mass(&self, density: f64) -> MassData {
        let n = self.vertices.len();
        let mass = density * self.area;

        // Inertia about the centroid: sum over the triangle fan rooted at
        // the centroid, I = (rho/12) * sum cross_i * (|a|^2 + a.b + |b|^2).
        let mut inertia = 0.0;
        for i in 0..n {
            let a = self.vertices[i] - self.center;
            let b = self.vertices[(i + 1) % n] - self.center;
            let c = cross(&a, &b);
            inertia += c * (a.norm_squared() + a.dot(&b) + b.norm_squared());
        }
        inertia *= density / 12.0;

        MassData {
            center: self.center,
            mass,
            inertia,
            kind: MassKind::Normal,
        }
    }
}

/// Twice the signed area is the shoelace sum; positive for
/// counter-clockwise winding.
fn signed_area(vertices: &[Point2<f64>]) -> f64 {
    let n = vertices.len();
    let mut sum = 0.0;
    for i in 0..n {
        let a = vertices[i];
        let b = vertices[(i + 1) % n];
        sum += a.x * b.y - b.x * a.y;
    }
    sum * 0.5
}

fn centroid(vertices: &[Point2<f64>], area: f64) -> Point2<f64> {
    let n = vertices.len();
    let mut sum = Vector2::zeros();
    for i in 0..n {
        let a = vertices[i].coords;
        let b = vertices[(i + 1) % n].coords;
        let c = a.x * b.y - b.x * a.y;
        sum += (a + b) * c;
    }
    Point2::from(sum / (6.0 * area))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_box() -> Polygon {
        Polygon::rectangle(1.0, 1.0).unwrap()
    }

    #[test]
    fn test_rejects_degenerate_input() {
        // Too few vertices
        assert!(Polygon::new(vec![Point2::origin(), Point2::new(1.0, 0.0)]).is_err());

        // Collinear
        assert!(Polygon::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(2.0, 0.0),
        ])
        .is_err());

        // Duplicate vertex
        assert!(Polygon::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 1.0),
        ])
        .is_err());

        // Concave
        assert!(Polygon::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(2.0, 2.0),
            Point2::new(1.0, 0.5),
            Point2::new(0.0, 2.0),
        ])
        .is_err());
    }

    #[test]
    fn test_winding_is_normalized_ccw() {
        let ccw = Polygon::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(0.0, 1.0),
        ])
        .unwrap();
        let cw = Polygon::new(vec![
            Point2::new(0.0, 0.0),
            Point2::new(0.0, 1.0),
            Point2::new(1.0, 0.0),
        ])
        .unwrap();

        assert!(signed_area(ccw.vertices()) > 0.0);
        assert!(signed_area(cw.vertices()) > 0.0);
    }

    #[test]
    fn test_normals_are_unit_and_outward() {
        let polygon = unit_box();
        for normal in polygon.normals() {
            assert_relative_eq!(normal.norm(), 1.0, epsilon = 1e-12);
        }
        // Bottom edge (first, from (-0.5,-0.5) to (0.5,-0.5)) points down
        assert_relative_eq!(polygon.normals()[0].y, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rectangle_matches_explicit_polygon() {
        let rect = Polygon::rectangle(2.0, 4.0).unwrap();
        let explicit = Polygon::new(vec![
            Point2::new(-1.0, -2.0),
            Point2::new(1.0, -2.0),
            Point2::new(1.0, 2.0),
            Point2::new(-1.0, 2.0),
        ])
        .unwrap();

        // Same vertex set up to rotation of the list
        for v in rect.vertices() {
            assert!(explicit
                .vertices()
                .iter()
                .any(|w| (w - v).norm() < 1e-12));
        }
        assert_relative_eq!(rect.area(), explicit.area(), epsilon = 1e-12);
    }

    #[test]
    fn test_centroid_and_area() {
        let polygon = Polygon::new(vec![
            Point2::new(1.0, 1.0),
            Point2::new(3.0, 1.0),
            Point2::new(3.0, 2.0),
            Point2::new(1.0, 2.0),
        ])
        .unwrap();

        assert_relative_eq!(polygon.area(), 2.0, epsilon = 1e-12);
        assert_relative_eq!(polygon.center().x, 2.0, epsilon = 1e-12);
        assert_relative_eq!(polygon.center().y, 1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_project() {
        let polygon = unit_box();
        let transform = Transform::from_position(Point2::new(3.0, 0.0));
        let interval = polygon.project(&Vector2::x(), &transform);

        assert_relative_eq!(interval.min, 2.5, epsilon = 1e-12);
        assert_relative_eq!(interval.max, 3.5, epsilon = 1e-12);
    }

    #[test]
    fn test_farthest_point() {
        let polygon = unit_box();
        let p = polygon.farthest_point(&Vector2::new(1.0, 1.0), &Transform::identity());
        assert_relative_eq!(p.x, 0.5, epsilon = 1e-12);
        assert_relative_eq!(p.y, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_farthest_feature_picks_aligned_edge() {
        let polygon = unit_box();

        // Straight down: the bottom edge, not a vertex
        let feature = polygon.farthest_feature(&-Vector2::y(), &Transform::identity());
        match feature {
            Feature::Edge(edge) => {
                assert_relative_eq!(edge.vertex1.point.y, -0.5, epsilon = 1e-12);
                assert_relative_eq!(edge.vertex2.point.y, -0.5, epsilon = 1e-12);
            }
            Feature::Vertex(_) => panic!("expected an edge feature"),
        }
    }

    #[test]
    fn test_farthest_feature_respects_rotation() {
        let polygon = unit_box();
        let transform =
            Transform::from_position_angle(Point2::origin(), std::f64::consts::FRAC_PI_4);

        // Rotated 45 degrees, the +X support is a single corner; the
        // returned edge must contain that corner as its max.
        let feature = polygon.farthest_feature(&Vector2::x(), &transform);
        match feature {
            Feature::Edge(edge) => {
                let corner = 0.5_f64.hypot(0.5);
                assert_relative_eq!(edge.max.point.x, corner, epsilon = 1e-12);
            }
            Feature::Vertex(_) => panic!("expected an edge feature"),
        }
    }

    #[test]
    fn test_mass_of_unit_box() {
        let polygon = unit_box();
        let mass = polygon.create_mass(2.0);

        assert_relative_eq!(mass.mass, 2.0, epsilon = 1e-12);
        // I = m (w^2 + h^2) / 12 for a rectangle
        assert_relative_eq!(mass.inertia, 2.0 * (1.0 + 1.0) / 12.0, epsilon = 1e-12);
        assert_relative_eq!(mass.center.coords.norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_radius_about_centroid() {
        let polygon = unit_box();
        let radius = polygon.radius_about(&polygon.center());
        assert_relative_eq!(radius, 0.5_f64.hypot(0.5), epsilon = 1e-12);
    }

    #[test]
    fn test_unit_circle_polygon() {
        let polygon = Polygon::unit_circle_polygon(8, 1.0).unwrap();
        assert_eq!(polygon.vertices().len(), 8);
        for v in polygon.vertices() {
            assert_relative_eq!(v.coords.norm(), 1.0, epsilon = 1e-12);
        }
    }
}
