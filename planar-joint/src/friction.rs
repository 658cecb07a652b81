//! Friction joint: capped damping of relative motion.

use nalgebra::{Matrix2, Point2, Vector2};
use planar_types::{BodyId, PhysicsError, Settings, Transform};

use crate::joint::{clamp_accumulated, point_constraint_matrix, solve22};
use crate::{Joint, JointKind, SolverBody};

/// Resists relative linear and angular motion between two bodies, up to a
/// force and torque budget: top-down friction for worlds without a
/// gravity-aligned contact surface.
#[derive(Debug, Clone)]
pub struct FrictionJoint {
    body1: BodyId,
    body2: BodyId,
    local_anchor1: Point2<f64>,
    local_anchor2: Point2<f64>,
    max_force: f64,
    max_torque: f64,

    // Solver cache
    r1: Vector2<f64>,
    r2: Vector2<f64>,
    mass: Matrix2<f64>,
    angular_mass: f64,
    impulse: Vector2<f64>,
    angular_impulse: f64,
}

impl FrictionJoint {
    /// Create a friction joint acting at a world anchor, given the bodies'
    /// transforms at creation time.
    pub fn world_anchored(
        body1: BodyId,
        body2: BodyId,
        transform1: &Transform,
        transform2: &Transform,
        anchor: Point2<f64>,
        max_force: f64,
        max_torque: f64,
    ) -> planar_types::Result<Self> {
        if !max_force.is_finite() || max_force < 0.0 {
            return Err(PhysicsError::InvalidCoefficient {
                name: "max force",
                value: max_force,
            });
        }
        if !max_torque.is_finite() || max_torque < 0.0 {
            return Err(PhysicsError::InvalidCoefficient {
                name: "max torque",
                value: max_torque,
            });
        }
        Ok(Self {
            body1,
            body2,
            local_anchor1: transform1.inverse_transform_point(&anchor),
            local_anchor2: transform2.inverse_transform_point(&anchor),
            max_force,
            max_torque,
            r1: Vector2::zeros(),
            r2: Vector2::zeros(),
            mass: Matrix2::zeros(),
            angular_mass: 0.0,
            impulse: Vector2::zeros(),
            angular_impulse: 0.0,
        })
    }
}

impl Joint for FrictionJoint {
    fn body1(&self) -> BodyId {
        self.body1
    }

    fn body2(&self) -> BodyId {
        self.body2
    }

    fn kind(&self) -> JointKind {
        JointKind::Friction
    }

    fn collision_allowed(&self) -> bool {
        true
    }

    fn initialize(
        &mut self,
        body1: &mut SolverBody,
        body2: &mut SolverBody,
        _settings: &Settings,
        _dt: f64,
    ) {
        self.r1 = body1.transform.transform_point(&self.local_anchor1) - body1.world_center();
        self.r2 = body2.transform.transform_point(&self.local_anchor2) - body2.world_center();
        self.mass = point_constraint_matrix(body1, body2, &self.r1, &self.r2);

        let inertia_sum = body1.inv_inertia + body2.inv_inertia;
        self.angular_mass = if inertia_sum > 0.0 {
            1.0 / inertia_sum
        } else {
            0.0
        };

        // Warm start.
        body1.apply_impulse(&-self.impulse, &self.r1);
        body1.apply_angular_impulse(-self.angular_impulse);
        body2.apply_impulse(&self.impulse, &self.r2);
        body2.apply_angular_impulse(self.angular_impulse);
    }

    fn solve_velocity(
        &mut self,
        body1: &mut SolverBody,
        body2: &mut SolverBody,
        _settings: &Settings,
        dt: f64,
    ) {
        // Angular friction.
        {
            let cdot = body2.velocity.angular - body1.velocity.angular;
            let impulse = -self.angular_mass * cdot;
            let max = self.max_torque * dt;
            let applied = clamp_accumulated(&mut self.angular_impulse, impulse, -max, max);
            body1.apply_angular_impulse(-applied);
            body2.apply_angular_impulse(applied);
        }

        // Linear friction.
        {
            let cdot = body2.velocity_at(&self.r2) - body1.velocity_at(&self.r1);
            let impulse = solve22(&self.mass, &-cdot);

            let old = self.impulse;
            self.impulse += impulse;
            let max_impulse = self.max_force * dt;
            if self.impulse.norm() > max_impulse {
                self.impulse *= max_impulse / self.impulse.norm();
            }
            let applied = self.impulse - old;

            body1.apply_impulse(&-applied, &self.r1);
            body2.apply_impulse(&applied, &self.r2);
        }
    }

    fn solve_position(
        &mut self,
        _body1: &mut SolverBody,
        _body2: &mut SolverBody,
        _settings: &Settings,
    ) -> bool {
        // Friction has no rest position to restore.
        true
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use planar_types::Velocity;

    fn dynamic_with_velocity(v: Vector2<f64>, w: f64) -> SolverBody {
        SolverBody {
            transform: Transform::identity(),
            velocity: Velocity::new(v, w),
            inv_mass: 1.0,
            inv_inertia: 1.0,
            local_center: Point2::origin(),
        }
    }

    #[test]
    fn test_validation() {
        let t = Transform::identity();
        assert!(FrictionJoint::world_anchored(
            BodyId::new(1),
            BodyId::new(2),
            &t,
            &t,
            Point2::origin(),
            -1.0,
            1.0,
        )
        .is_err());
    }

    #[test]
    fn test_large_budget_stops_relative_motion() {
        let settings = Settings::default();
        let dt = settings.timestep;

        let mut a = dynamic_with_velocity(Vector2::zeros(), 0.0);
        let mut b = dynamic_with_velocity(Vector2::new(2.0, 0.0), 3.0);

        let mut joint = FrictionJoint::world_anchored(
            BodyId::new(1),
            BodyId::new(2),
            &a.transform,
            &b.transform,
            Point2::origin(),
            1e6,
            1e6,
        )
        .unwrap();

        joint.initialize(&mut a, &mut b, &settings, dt);
        for _ in 0..settings.velocity_iterations {
            joint.solve_velocity(&mut a, &mut b, &settings, dt);
        }

        assert!((b.velocity.linear - a.velocity.linear).norm() < 1e-9);
        assert!((b.velocity.angular - a.velocity.angular).abs() < 1e-9);
    }

    #[test]
    fn test_small_budget_only_damps() {
        let settings = Settings::default();
        let dt = settings.timestep;

        let mut a = SolverBody::fixed();
        let mut b = dynamic_with_velocity(Vector2::new(2.0, 0.0), 0.0);

        let mut joint = FrictionJoint::world_anchored(
            BodyId::new(1),
            BodyId::new(2),
            &a.transform,
            &b.transform,
            Point2::origin(),
            0.5,
            0.5,
        )
        .unwrap();

        joint.initialize(&mut a, &mut b, &settings, dt);
        for _ in 0..settings.velocity_iterations {
            joint.solve_velocity(&mut a, &mut b, &settings, dt);
        }

        // Slowed by exactly the impulse budget, not stopped.
        let expected = 2.0 - 0.5 * dt;
        assert!((b.velocity.linear.x - expected).abs() < 1e-9);
    }
}
