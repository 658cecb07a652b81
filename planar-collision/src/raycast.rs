//! Ray queries against convex shapes.

use nalgebra::{Point2, Vector2};
use planar_geometry::{cross, right, Convex, Polygon};
use planar_types::{PhysicsError, Transform};

/// Parallel-line tolerance for ray/edge intersection.
const PARALLEL_EPSILON: f64 = 1e-12;

/// A ray: a start point and a unit direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Start point in world coordinates.
    pub start: Point2<f64>,
    /// Unit direction.
    pub direction: Vector2<f64>,
}

impl Ray {
    /// Create a ray; the direction is normalized and must be non-zero.
    pub fn new(start: Point2<f64>, direction: Vector2<f64>) -> planar_types::Result<Self> {
        let norm = direction.norm();
        if !norm.is_finite() || norm < PARALLEL_EPSILON {
            return Err(PhysicsError::ZeroLengthAxis);
        }
        if !start.coords.iter().all(|x| x.is_finite()) {
            return Err(PhysicsError::NonFiniteParameter { name: "start" });
        }
        Ok(Self {
            start,
            direction: direction / norm,
        })
    }

    /// Point at parameter `t` along the ray.
    #[must_use]
    pub fn point_at(&self, t: f64) -> Point2<f64> {
        self.start + self.direction * t
    }
}

/// A ray hit on a shape boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    /// Hit point in world coordinates.
    pub point: Point2<f64>,
    /// Outward surface normal at the hit point.
    pub normal: Vector2<f64>,
    /// Distance from the ray start to the hit point.
    pub t: f64,
}

/// Cast a ray against a shape.
///
/// Returns the nearest boundary hit within `max_length`, or `None` on a
/// miss. A ray starting inside the shape reports no hit.
#[must_use]
pub fn raycast(
    shape: &Convex,
    transform: &Transform,
    ray: &Ray,
    max_length: f64,
) -> Option<RaycastHit> {
    match shape {
        Convex::Circle(circle) => {
            let center = transform.transform_point(&circle.center);
            raycast_circle(&center, circle.radius, ray, max_length)
        }
        Convex::Polygon(polygon) => raycast_polygon(polygon, transform, ray, max_length),
        Convex::Segment(segment) => {
            let a = transform.transform_point(&segment.p1);
            let b = transform.transform_point(&segment.p2);
            raycast_segment(&a, &b, ray, max_length)
        }
    }
}

fn raycast_circle(
    center: &Point2<f64>,
    radius: f64,
    ray: &Ray,
    max_length: f64,
) -> Option<RaycastHit> {
    let offset = ray.start - center;

    // |offset + t·d|² = r², with d unit
    let b = 2.0 * offset.dot(&ray.direction);
    let c = offset.norm_squared() - radius * radius;
    let discriminant = b * b - 4.0 * c;
    if discriminant < 0.0 {
        return None;
    }

    let sqrt_d = discriminant.sqrt();
    let t = (-b - sqrt_d) * 0.5;
    if t < 0.0 {
        // Entry point behind the start: the ray begins inside or the
        // circle is behind it.
        return None;
    }
    if t > max_length {
        return None;
    }

    let point = ray.point_at(t);
    Some(RaycastHit {
        point,
        normal: (point - center) / radius,
        t,
    })
}

fn raycast_polygon(
    polygon: &Polygon,
    transform: &Transform,
    ray: &Ray,
    max_length: f64,
) -> Option<RaycastHit> {
    // Clip the ray against each edge half-plane, tracking the latest entry
    // and earliest exit.
    let mut t_enter = f64::NEG_INFINITY;
    let mut t_exit = f64::INFINITY;
    let mut enter_normal = Vector2::zeros();

    for (i, vertex) in polygon.vertices().iter().enumerate() {
        let v = transform.transform_point(vertex);
        let normal = transform.transform_vector(&polygon.normals()[i]);

        let denom = ray.direction.dot(&normal);
        let dist = (v - ray.start).dot(&normal);

        if denom.abs() < PARALLEL_EPSILON {
            // Parallel to this edge; outside its half-plane means a miss.
            if dist < 0.0 {
                return None;
            }
            continue;
        }

        let t = dist / denom;
        if denom < 0.0 {
            if t > t_enter {
                t_enter = t;
                enter_normal = normal;
            }
        } else {
            t_exit = t_exit.min(t);
        }
        if t_enter > t_exit {
            return None;
        }
    }

    if t_enter < 0.0 || t_enter > max_length {
        return None;
    }

    Some(RaycastHit {
        point: ray.point_at(t_enter),
        normal: enter_normal,
        t: t_enter,
    })
}

fn raycast_segment(
    a: &Point2<f64>,
    b: &Point2<f64>,
    ray: &Ray,
    max_length: f64,
) -> Option<RaycastHit> {
    let edge = b - a;
    let denom = cross(&ray.direction, &edge);
    if denom.abs() < PARALLEL_EPSILON {
        return None;
    }

    let to_a = a - ray.start;
    let t = cross(&to_a, &edge) / denom;
    let s = cross(&to_a, &ray.direction) / denom;

    if t < 0.0 || t > max_length || !(0.0..=1.0).contains(&s) {
        return None;
    }

    // Face the normal against the ray.
    let mut normal = right(&edge).normalize();
    if normal.dot(&ray.direction) > 0.0 {
        normal = -normal;
    }

    Some(RaycastHit {
        point: ray.point_at(t),
        normal,
        t,
    })
}
