//! Weld joint: full rigid lock.

use nalgebra::{Matrix2, Point2, Vector2};
use planar_types::{BodyId, Settings, Transform};

use crate::joint::{point_constraint_matrix, solve22};
use crate::{Joint, JointKind, SolverBody};

/// Locks two bodies together completely: the anchors coincide and the
/// relative angle stays at its creation value.
///
/// The angular row and the point rows are solved sequentially each
/// iteration, which converges within the solver's normal iteration budget.
#[derive(Debug, Clone)]
pub struct WeldJoint {
    body1: BodyId,
    body2: BodyId,
    local_anchor1: Point2<f64>,
    local_anchor2: Point2<f64>,
    reference_angle: f64,
    collision_allowed: bool,

    // Solver cache
    r1: Vector2<f64>,
    r2: Vector2<f64>,
    mass: Matrix2<f64>,
    angular_mass: f64,
    impulse: Vector2<f64>,
    angular_impulse: f64,
}

impl WeldJoint {
    /// Create a weld joint from local anchors.
    #[must_use]
    pub fn new(
        body1: BodyId,
        body2: BodyId,
        local_anchor1: Point2<f64>,
        local_anchor2: Point2<f64>,
    ) -> Self {
        Self {
            body1,
            body2,
            local_anchor1,
            local_anchor2,
            reference_angle: 0.0,
            collision_allowed: false,
            r1: Vector2::zeros(),
            r2: Vector2::zeros(),
            mass: Matrix2::zeros(),
            angular_mass: 0.0,
            impulse: Vector2::zeros(),
            angular_impulse: 0.0,
        }
    }

    /// Create a weld joint at a world anchor, given the bodies' transforms
    /// at creation time.
    #[must_use]
    pub fn world_anchored(
        body1: BodyId,
        body2: BodyId,
        transform1: &Transform,
        transform2: &Transform,
        anchor: Point2<f64>,
    ) -> Self {
        let mut joint = Self::new(
            body1,
            body2,
            transform1.inverse_transform_point(&anchor),
            transform2.inverse_transform_point(&anchor),
        );
        joint.reference_angle = transform2.angle() - transform1.angle();
        joint
    }

    /// Allow collision resolution between the joined bodies.
    #[must_use]
    pub fn with_collision_allowed(mut self) -> Self {
        self.collision_allowed = true;
        self
    }
}

impl Joint for WeldJoint {
    fn body1(&self) -> BodyId {
        self.body1
    }

    fn body2(&self) -> BodyId {
        self.body2
    }

    fn kind(&self) -> JointKind {
        JointKind::Weld
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
        _dt: f64,
    ) {
        // Angular row first, then the point rows.
        let cdot = body2.velocity.angular - body1.velocity.angular;
        let impulse = -self.angular_mass * cdot;
        self.angular_impulse += impulse;
        body1.apply_angular_impulse(-impulse);
        body2.apply_angular_impulse(impulse);

        let cdot = body2.velocity_at(&self.r2) - body1.velocity_at(&self.r1);
        let impulse = solve22(&self.mass, &-cdot);
        self.impulse += impulse;
        body1.apply_impulse(&-impulse, &self.r1);
        body2.apply_impulse(&impulse, &self.r2);
    }

    fn solve_position(
        &mut self,
        body1: &mut SolverBody,
        body2: &mut SolverBody,
        settings: &Settings,
    ) -> bool {
        // Angular correction.
        let angle_error =
            body2.transform.angle() - body1.transform.angle() - self.reference_angle;
        if self.angular_mass > 0.0 {
            let c = angle_error.clamp(-settings.max_correction, settings.max_correction);
            let impulse = -self.angular_mass * c;
            body1.apply_position_rotation(-impulse);
            body2.apply_position_rotation(impulse);
        }

        // Point correction.
        let r1 = body1.transform.transform_point(&self.local_anchor1) - body1.world_center();
        let r2 = body2.transform.transform_point(&self.local_anchor2) - body2.world_center();
        let c = body2.transform.transform_point(&self.local_anchor2)
            - body1.transform.transform_point(&self.local_anchor1);

        let k = point_constraint_matrix(body1, body2, &r1, &r2);
        let impulse = solve22(&k, &-c);
        body1.apply_position_impulse(&-impulse, &r1);
        body2.apply_position_impulse(&impulse, &r2);

        c.norm() <= settings.position_epsilon && angle_error.abs() <= settings.position_epsilon
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
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

    #[test]
    fn test_weld_stops_relative_motion() {
        let settings = Settings::default();
        let dt = settings.timestep;

        let mut a = dynamic_at(0.0, 0.0);
        let mut b = dynamic_at(1.0, 0.0);
        b.velocity.linear = Vector2::new(0.0, 2.0);
        b.velocity.angular = 1.0;

        let mut joint = WeldJoint::world_anchored(
            BodyId::new(1),
            BodyId::new(2),
            &a.transform,
            &b.transform,
            Point2::new(0.5, 0.0),
        );

        joint.initialize(&mut a, &mut b, &settings, dt);
        for _ in 0..settings.velocity_iterations {
            joint.solve_velocity(&mut a, &mut b, &settings, dt);
        }

        // Relative angular velocity and relative anchor velocity vanish.
        assert!((b.velocity.angular - a.velocity.angular).abs() < 1e-9);
        let rel = b.velocity.at_point(&Vector2::new(-0.5, 0.0))
            - a.velocity.at_point(&Vector2::new(0.5, 0.0));
        assert!(rel.norm() < 1e-9);
    }

    #[test]
    fn test_position_solve_restores_pose() {
        let settings = Settings::default();

        let mut a = dynamic_at(0.0, 0.0);
        // Drifted and slightly rotated
        let mut b = SolverBody {
            transform: Transform::from_position_angle(Point2::new(1.004, 0.002), 0.003),
            ..dynamic_at(0.0, 0.0)
        };

        let mut joint = WeldJoint::new(
            BodyId::new(1),
            BodyId::new(2),
            Point2::new(0.5, 0.0),
            Point2::new(-0.5, 0.0),
        );

        let mut solved = false;
        for _ in 0..settings.position_iterations {
            solved = joint.solve_position(&mut a, &mut b, &settings);
            if solved {
                break;
            }
        }
        assert!(solved);
    }
}
