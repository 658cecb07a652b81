//! Support features returned by shape queries.
//!
//! A feature is the part of a shape's boundary farthest along a direction:
//! either a single vertex or a whole edge. The manifold clipping solver
//! consumes these to build one- or two-point contact manifolds, and the
//! indices carried here give contact points identities that are stable from
//! step to step (which is what makes warm-starting work).

use nalgebra::{Point2, Vector2};

/// A vertex of a shape, in world coordinates, with its index in the parent
/// shape's vertex list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexFeature {
    /// The vertex position in world coordinates.
    pub point: Point2<f64>,
    /// Index into the parent shape's vertex list.
    pub index: usize,
}

impl VertexFeature {
    /// Create a new vertex feature.
    #[must_use]
    pub const fn new(point: Point2<f64>, index: usize) -> Self {
        Self { point, index }
    }
}

/// An edge of a shape, in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeFeature {
    /// First endpoint, in winding order.
    pub vertex1: VertexFeature,
    /// Second endpoint, in winding order.
    pub vertex2: VertexFeature,
    /// The edge vector `vertex2 - vertex1`.
    pub edge: Vector2<f64>,
    /// Index of this edge in the parent shape.
    pub index: usize,
    /// The endpoint farthest along the query direction.
    pub max: VertexFeature,
}

impl EdgeFeature {
    /// Create a new edge feature.
    #[must_use]
    pub fn new(
        vertex1: VertexFeature,
        vertex2: VertexFeature,
        index: usize,
        max: VertexFeature,
    ) -> Self {
        Self {
            vertex1,
            vertex2,
            edge: vertex2.point - vertex1.point,
            index,
            max,
        }
    }
}

/// The farthest feature of a shape along a direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Feature {
    /// A single vertex (circles; segment ends when queried along the axis).
    Vertex(VertexFeature),
    /// An edge (polygon sides, full segments).
    Edge(EdgeFeature),
}

impl Feature {
    /// Check whether this feature is a vertex.
    #[must_use]
    pub fn is_vertex(&self) -> bool {
        matches!(self, Self::Vertex(_))
    }

    /// Get the vertex farthest along the query direction.
    #[must_use]
    pub fn max_point(&self) -> Point2<f64> {
        match self {
            Self::Vertex(v) => v.point,
            Self::Edge(e) => e.max.point,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_feature_vector() {
        let v1 = VertexFeature::new(Point2::new(0.0, 0.0), 0);
        let v2 = VertexFeature::new(Point2::new(2.0, 0.0), 1);
        let edge = EdgeFeature::new(v1, v2, 0, v2);

        assert_eq!(edge.edge, Vector2::new(2.0, 0.0));
        assert_eq!(edge.max.index, 1);
    }

    #[test]
    fn test_feature_max_point() {
        let v = VertexFeature::new(Point2::new(1.0, 2.0), 3);
        assert!(Feature::Vertex(v).is_vertex());
        assert_eq!(Feature::Vertex(v).max_point(), Point2::new(1.0, 2.0));
    }
}
