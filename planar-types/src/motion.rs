//! Rigid motion types: transforms and velocities in the plane.

use nalgebra::{Point2, UnitComplex, Vector2};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Position and orientation of a rigid body in the plane.
///
/// The rotation is stored as a unit complex number, the 2D analogue of a
/// unit quaternion: composition and point transformation stay cheap and
/// there is no angle wrapping to manage.
///
/// # Example
///
/// ```
/// use planar_types::Transform;
/// use nalgebra::Point2;
///
/// let transform = Transform::from_position(Point2::new(1.0, 2.0));
/// let world = transform.transform_point(&Point2::new(1.0, 0.0));
/// assert_eq!(world, Point2::new(2.0, 2.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Transform {
    /// Position in world coordinates.
    pub position: Point2<f64>,
    /// Orientation as a unit complex number.
    pub rotation: UnitComplex<f64>,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    /// Create an identity transform (origin, no rotation).
    #[must_use]
    pub fn identity() -> Self {
        Self {
            position: Point2::origin(),
            rotation: UnitComplex::identity(),
        }
    }

    /// Create a transform from position only (no rotation).
    #[must_use]
    pub fn from_position(position: Point2<f64>) -> Self {
        Self {
            position,
            rotation: UnitComplex::identity(),
        }
    }

    /// Create a transform from a position and a rotation angle in radians.
    #[must_use]
    pub fn from_position_angle(position: Point2<f64>, angle: f64) -> Self {
        Self {
            position,
            rotation: UnitComplex::new(angle),
        }
    }

    /// Get the rotation angle in radians, in (-π, π].
    #[must_use]
    pub fn angle(&self) -> f64 {
        self.rotation.angle()
    }

    /// Transform a point from local to world coordinates.
    #[must_use]
    pub fn transform_point(&self, local: &Point2<f64>) -> Point2<f64> {
        self.position + self.rotation * local.coords
    }

    /// Transform a vector from local to world coordinates (rotation only).
    #[must_use]
    pub fn transform_vector(&self, local: &Vector2<f64>) -> Vector2<f64> {
        self.rotation * local
    }

    /// Transform a point from world to local coordinates.
    #[must_use]
    pub fn inverse_transform_point(&self, world: &Point2<f64>) -> Point2<f64> {
        Point2::from(self.rotation.inverse() * (world - self.position))
    }

    /// Transform a vector from world to local coordinates.
    #[must_use]
    pub fn inverse_transform_vector(&self, world: &Vector2<f64>) -> Vector2<f64> {
        self.rotation.inverse() * world
    }

    /// Translate the transform by a world-space offset.
    pub fn translate(&mut self, offset: &Vector2<f64>) {
        self.position += offset;
    }

    /// Rotate the transform by `angle` radians about a world-space point.
    ///
    /// Bodies rotate about their center of mass, which is generally not the
    /// transform origin, so plain rotation composition is not enough.
    pub fn rotate_about(&mut self, angle: f64, point: &Point2<f64>) {
        let rotation = UnitComplex::new(angle);
        self.position = point + rotation * (self.position - point);
        self.rotation = rotation * self.rotation;
    }

    /// Compute the inverse transform.
    #[must_use]
    pub fn inverse(&self) -> Self {
        let inv_rotation = self.rotation.inverse();
        Self {
            position: Point2::from(-(inv_rotation * self.position.coords)),
            rotation: inv_rotation,
        }
    }

    /// Compose two transforms: self * other.
    #[must_use]
    pub fn compose(&self, other: &Self) -> Self {
        Self {
            position: self.transform_point(&other.position),
            rotation: self.rotation * other.rotation,
        }
    }

    /// Interpolate between two transforms.
    ///
    /// Positions interpolate linearly; rotations along the shortest arc.
    /// Used by the time-of-impact search to place bodies at a fraction of
    /// their step motion.
    #[must_use]
    pub fn lerp(&self, other: &Self, t: f64) -> Self {
        let t = t.clamp(0.0, 1.0);
        let delta = self.rotation.rotation_to(&other.rotation);
        Self {
            position: Point2::from(self.position.coords.lerp(&other.position.coords, t)),
            rotation: self.rotation * UnitComplex::new(delta.angle() * t),
        }
    }

    /// Check if the transform contains `NaN` or `Inf` values.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.position.coords.iter().all(|x| x.is_finite())
            && self.rotation.complex().re.is_finite()
            && self.rotation.complex().im.is_finite()
    }
}

/// Linear and angular velocity of a rigid body.
///
/// # Example
///
/// ```
/// use planar_types::Velocity;
/// use nalgebra::Vector2;
///
/// let velocity = Velocity::linear(Vector2::new(1.0, 0.0));
/// assert_eq!(velocity.linear.x, 1.0);
/// assert_eq!(velocity.angular, 0.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Velocity {
    /// Linear velocity in world coordinates (m/s).
    pub linear: Vector2<f64>,
    /// Angular velocity (rad/s, counter-clockwise positive).
    pub angular: f64,
}

impl Velocity {
    /// Create a velocity with the given linear and angular parts.
    #[must_use]
    pub const fn new(linear: Vector2<f64>, angular: f64) -> Self {
        Self { linear, angular }
    }

    /// Create a zero velocity (at rest).
    #[must_use]
    pub fn zero() -> Self {
        Self::default()
    }

    /// Create a velocity with a linear part only.
    #[must_use]
    pub fn linear(v: Vector2<f64>) -> Self {
        Self { linear: v, angular: 0.0 }
    }

    /// Create a velocity with an angular part only.
    #[must_use]
    pub fn angular(omega: f64) -> Self {
        Self {
            linear: Vector2::zeros(),
            angular: omega,
        }
    }

    /// Compute the velocity at a point offset from the center of mass.
    ///
    /// `v_point = v + ω × r`, where in 2D `ω × r = ω · perp(r)`.
    #[must_use]
    pub fn at_point(&self, offset: &Vector2<f64>) -> Vector2<f64> {
        self.linear + self.angular * Vector2::new(-offset.y, offset.x)
    }

    /// Compute kinetic energy given mass and rotational inertia.
    #[must_use]
    pub fn kinetic_energy(&self, mass: f64, inertia: f64) -> f64 {
        0.5 * mass * self.linear.norm_squared() + 0.5 * inertia * self.angular * self.angular
    }

    /// Check if the velocity contains `NaN` or `Inf` values.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.linear.iter().all(|x| x.is_finite()) && self.angular.is_finite()
    }

    /// Get the linear speed (magnitude of linear velocity).
    #[must_use]
    pub fn speed(&self) -> f64 {
        self.linear.norm()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_transform_identity() {
        let transform = Transform::identity();
        let p = Point2::new(1.0, 2.0);
        assert_relative_eq!(
            transform.transform_point(&p).coords,
            p.coords,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_transform_rotation() {
        // 90 degree rotation sends +X to +Y
        let transform = Transform::from_position_angle(Point2::origin(), FRAC_PI_2);
        let world = transform.transform_vector(&Vector2::x());

        assert_relative_eq!(world.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(world.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_transform_inverse() {
        let transform = Transform::from_position_angle(Point2::new(1.0, 2.0), 0.3);
        let composed = transform.compose(&transform.inverse());

        assert_relative_eq!(composed.position.coords, Vector2::zeros(), epsilon = 1e-12);
        assert_relative_eq!(composed.angle(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rotate_about_pivot() {
        // Rotating the origin-anchored transform 90 degrees about (1, 0)
        // moves the origin to (1, -1).
        let mut transform = Transform::identity();
        transform.rotate_about(FRAC_PI_2, &Point2::new(1.0, 0.0));

        assert_relative_eq!(transform.position.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(transform.position.y, -1.0, epsilon = 1e-12);
        assert_relative_eq!(transform.angle(), FRAC_PI_2, epsilon = 1e-12);
    }

    #[test]
    fn test_transform_lerp() {
        let a = Transform::from_position(Point2::new(0.0, 0.0));
        let b = Transform::from_position_angle(Point2::new(10.0, 0.0), 1.0);

        let mid = a.lerp(&b, 0.5);
        assert_relative_eq!(mid.position.x, 5.0, epsilon = 1e-12);
        assert_relative_eq!(mid.angle(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_velocity_at_point() {
        // Spinning counter-clockwise at 1 rad/s; the point at (1, 0) moves up.
        let velocity = Velocity::angular(1.0);
        let v = velocity.at_point(&Vector2::new(1.0, 0.0));

        assert_relative_eq!(v.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(v.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_kinetic_energy() {
        let velocity = Velocity::new(Vector2::new(1.0, 0.0), 2.0);
        // 0.5 * 2 * 1 + 0.5 * 0.5 * 4 = 2
        assert_relative_eq!(velocity.kinetic_energy(2.0, 0.5), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_is_finite() {
        assert!(Transform::identity().is_finite());
        assert!(Velocity::zero().is_finite());

        let bad = Velocity::new(Vector2::new(f64::NAN, 0.0), 0.0);
        assert!(!bad.is_finite());
    }
}
