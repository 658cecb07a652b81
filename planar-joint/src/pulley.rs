//! Pulley joint: a rope over two ground anchors.

use nalgebra::{Point2, Vector2};
use planar_types::{BodyId, PhysicsError, Settings, Transform};

use crate::joint::cross;
use crate::{Joint, JointKind, SolverBody};

/// Minimum rope-segment length used to avoid normalizing a zero vector
/// when a body reaches its ground anchor.
const SEGMENT_EPSILON: f64 = 1e-9;

/// Connects two bodies through an idealized rope running over two fixed
/// ground anchors, enforcing
///
/// ```text
/// length1 + ratio · length2 = constant
/// ```
///
/// A ratio other than one makes the pulley a block-and-tackle.
#[derive(Debug, Clone)]
pub struct PulleyJoint {
    body1: BodyId,
    body2: BodyId,
    ground_anchor1: Point2<f64>,
    ground_anchor2: Point2<f64>,
    local_anchor1: Point2<f64>,
    local_anchor2: Point2<f64>,
    ratio: f64,
    total_length: f64,
    collision_allowed: bool,

    // Solver cache
    r1: Vector2<f64>,
    r2: Vector2<f64>,
    u1: Vector2<f64>,
    u2: Vector2<f64>,
    mass: f64,
    impulse: f64,
}

impl PulleyJoint {
    /// Create a pulley joint from world-space ground anchors and body
    /// anchors, given the bodies' transforms at creation time. The rope
    /// length is captured from the current configuration.
    #[allow(clippy::too_many_arguments)]
    pub fn world_anchored(
        body1: BodyId,
        body2: BodyId,
        transform1: &Transform,
        transform2: &Transform,
        ground_anchor1: Point2<f64>,
        ground_anchor2: Point2<f64>,
        anchor1: Point2<f64>,
        anchor2: Point2<f64>,
        ratio: f64,
    ) -> planar_types::Result<Self> {
        if !ratio.is_finite() || ratio <= 0.0 {
            return Err(PhysicsError::InvalidCoefficient {
                name: "ratio",
                value: ratio,
            });
        }
        let length1 = (anchor1 - ground_anchor1).norm();
        let length2 = (anchor2 - ground_anchor2).norm();
        Ok(Self {
            body1,
            body2,
            ground_anchor1,
            ground_anchor2,
            local_anchor1: transform1.inverse_transform_point(&anchor1),
            local_anchor2: transform2.inverse_transform_point(&anchor2),
            ratio,
            total_length: length1 + ratio * length2,
            collision_allowed: false,
            r1: Vector2::zeros(),
            r2: Vector2::zeros(),
            u1: Vector2::zeros(),
            u2: Vector2::zeros(),
            mass: 0.0,
            impulse: 0.0,
        })
    }

    /// The pulley ratio.
    #[must_use]
    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Current rope-segment lengths for the given transforms.
    #[must_use]
    pub fn lengths(&self, transform1: &Transform, transform2: &Transform) -> (f64, f64) {
        let p1 = transform1.transform_point(&self.local_anchor1);
        let p2 = transform2.transform_point(&self.local_anchor2);
        ((p1 - self.ground_anchor1).norm(), (p2 - self.ground_anchor2).norm())
    }
}

impl Joint for PulleyJoint {
    fn body1(&self) -> BodyId {
        self.body1
    }

    fn body2(&self) -> BodyId {
        self.body2
    }

    fn kind(&self) -> JointKind {
        JointKind::Pulley
    }

    fn collision_allowed(&self) -> bool {
        self.collision_allowed
    }

    fn initialize(
        &mut self,
        body1: &mut SolverBody,
        body2: &mut SolverBody,
        _settings: &Settings,
        _dt: f64,
    ) {
        let c1 = body1.world_center();
        let c2 = body2.world_center();
        let p1 = body1.transform.transform_point(&self.local_anchor1);
        let p2 = body2.transform.transform_point(&self.local_anchor2);
        self.r1 = p1 - c1;
        self.r2 = p2 - c2;

        let d1 = p1 - self.ground_anchor1;
        let d2 = p2 - self.ground_anchor2;
        let l1 = d1.norm();
        let l2 = d2.norm();
        self.u1 = if l1 > SEGMENT_EPSILON { d1 / l1 } else { Vector2::zeros() };
        self.u2 = if l2 > SEGMENT_EPSILON { d2 / l2 } else { Vector2::zeros() };

        let cr1 = cross(&self.r1, &self.u1);
        let cr2 = cross(&self.r2, &self.u2);
        let inv_mass = body1.inv_mass
            + body1.inv_inertia * cr1 * cr1
            + self.ratio * self.ratio * (body2.inv_mass + body2.inv_inertia * cr2 * cr2);
        self.mass = if inv_mass > 0.0 { 1.0 / inv_mass } else { 0.0 };

        // Warm start: the rope pulls each body toward its ground anchor.
        let p1 = self.u1 * -self.impulse;
        let p2 = self.u2 * (-self.ratio * self.impulse);
        body1.apply_impulse(&p1, &self.r1);
        body2.apply_impulse(&p2, &self.r2);
    }

    fn solve_velocity(
        &mut self,
        body1: &mut SolverBody,
        body2: &mut SolverBody,
        _settings: &Settings,
        _dt: f64,
    ) {
        let v1 = body1.velocity_at(&self.r1);
        let v2 = body2.velocity_at(&self.r2);

        let cdot = -self.u1.dot(&v1) - self.ratio * self.u2.dot(&v2);
        let impulse = -self.mass * cdot;
        self.impulse += impulse;

        let p1 = self.u1 * -impulse;
        let p2 = self.u2 * (-self.ratio * impulse);
        body1.apply_impulse(&p1, &self.r1);
        body2.apply_impulse(&p2, &self.r2);
    }

    fn solve_position(
        &mut self,
        body1: &mut SolverBody,
        body2: &mut SolverBody,
        settings: &Settings,
    ) -> bool {
        let c1 = body1.world_center();
        let c2 = body2.world_center();
        let p1 = body1.transform.transform_point(&self.local_anchor1);
        let p2 = body2.transform.transform_point(&self.local_anchor2);
        let r1 = p1 - c1;
        let r2 = p2 - c2;

        let d1 = p1 - self.ground_anchor1;
        let d2 = p2 - self.ground_anchor2;
        let l1 = d1.norm();
        let l2 = d2.norm();
        let u1 = if l1 > SEGMENT_EPSILON { d1 / l1 } else { Vector2::zeros() };
        let u2 = if l2 > SEGMENT_EPSILON { d2 / l2 } else { Vector2::zeros() };

        let c = (self.total_length - l1 - self.ratio * l2)
            .clamp(-settings.max_correction, settings.max_correction);

        let cr1 = cross(&r1, &u1);
        let cr2 = cross(&r2, &u2);
        let inv_mass = body1.inv_mass
            + body1.inv_inertia * cr1 * cr1
            + self.ratio * self.ratio * (body2.inv_mass + body2.inv_inertia * cr2 * cr2);
        if inv_mass == 0.0 {
            return true;
        }

        let impulse = -c / inv_mass;
        body1.apply_position_impulse(&(u1 * -impulse), &r1);
        body2.apply_position_impulse(&(u2 * (-self.ratio * impulse)), &r2);

        c.abs() <= settings.position_epsilon
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use planar_types::Velocity;

    fn dynamic_at(x: f64, y: f64) -> SolverBody {
        SolverBody {
            transform: Transform::from_position(Point2::new(x, y)),
            velocity: Velocity::zero(),
            inv_mass: 1.0,
            inv_inertia: 1.0,
            local_center: Point2::origin(),
        }
    }

    fn hanging_pair() -> (SolverBody, SolverBody, PulleyJoint) {
        // Two bodies hanging below ground anchors at y = 5.
        let a = dynamic_at(-2.0, 0.0);
        let b = dynamic_at(2.0, 0.0);
        let joint = PulleyJoint::world_anchored(
            BodyId::new(1),
            BodyId::new(2),
            &a.transform,
            &b.transform,
            Point2::new(-2.0, 5.0),
            Point2::new(2.0, 5.0),
            Point2::new(-2.0, 0.0),
            Point2::new(2.0, 0.0),
            1.0,
        )
        .unwrap();
        (a, b, joint)
    }

    #[test]
    fn test_rejects_bad_ratio() {
        let a = dynamic_at(0.0, 0.0);
        assert!(PulleyJoint::world_anchored(
            BodyId::new(1),
            BodyId::new(2),
            &a.transform,
            &a.transform,
            Point2::new(0.0, 5.0),
            Point2::new(1.0, 5.0),
            Point2::origin(),
            Point2::new(1.0, 0.0),
            0.0,
        )
        .is_err());
    }

    #[test]
    fn test_rope_couples_velocities() {
        let settings = Settings::default();
        let dt = settings.timestep;
        let (mut a, mut b, mut joint) = hanging_pair();

        // Body a falls; the rope must haul body b up at the same rate.
        a.velocity.linear = Vector2::new(0.0, -1.0);

        joint.initialize(&mut a, &mut b, &settings, dt);
        for _ in 0..settings.velocity_iterations {
            joint.solve_velocity(&mut a, &mut b, &settings, dt);
        }

        // u1 = u2 = -y: Cdot = v1.y - ... total rope speed is zero.
        let rope_rate = -a.velocity.linear.y - b.velocity.linear.y;
        assert!(rope_rate.abs() < 1e-9);
        assert!(b.velocity.linear.y > 0.0, "body b is hauled upward");
    }

    #[test]
    fn test_position_solve_restores_total_length() {
        let settings = Settings::default();
        let (mut a, mut b, mut joint) = hanging_pair();

        // Stretch the rope by dropping body a.
        a.transform.position.y -= 0.1;

        let mut solved = false;
        for _ in 0..settings.position_iterations {
            solved = joint.solve_position(&mut a, &mut b, &settings);
            if solved {
                break;
            }
        }
        assert!(solved);

        let (l1, l2) = joint.lengths(&a.transform, &b.transform);
        assert_relative_eq!(l1 + l2, 10.0, epsilon = 1e-6);
    }
}
