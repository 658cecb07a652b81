//! Mouse joint: drag a body toward a world-space target.

use nalgebra::{Matrix2, Point2, Vector2};
use planar_types::{BodyId, PhysicsError, Settings, Transform};

use crate::joint::solve22;
use crate::{Joint, JointKind, SolverBody};

/// Pulls a body's anchor point toward a movable world-space target with a
/// critically-tunable spring, under a force cap.
///
/// This is a single-body joint: [`Joint::body1`] and [`Joint::body2`]
/// return the same id, and the solver hands an immovable placeholder for
/// the first slot. Only the second body is moved.
#[derive(Debug, Clone)]
pub struct MouseJoint {
    body: BodyId,
    local_anchor: Point2<f64>,
    target: Point2<f64>,
    frequency: f64,
    damping_ratio: f64,
    max_force: f64,

    // Solver cache
    r: Vector2<f64>,
    mass: Matrix2<f64>,
    c: Vector2<f64>,
    gamma: f64,
    beta: f64,
    impulse: Vector2<f64>,
}

impl MouseJoint {
    /// Create a mouse joint gripping the body at a world-space anchor,
    /// given the body's transform at creation time.
    ///
    /// `frequency` (Hz) and `damping_ratio` shape the spring; `max_force`
    /// caps the pull so a far-away target cannot fling the body.
    pub fn world_anchored(
        body: BodyId,
        transform: &Transform,
        anchor: Point2<f64>,
        frequency: f64,
        damping_ratio: f64,
        max_force: f64,
    ) -> planar_types::Result<Self> {
        if !frequency.is_finite() || frequency <= 0.0 {
            return Err(PhysicsError::InvalidCoefficient {
                name: "frequency",
                value: frequency,
            });
        }
        if !damping_ratio.is_finite() || damping_ratio < 0.0 {
            return Err(PhysicsError::InvalidCoefficient {
                name: "damping ratio",
                value: damping_ratio,
            });
        }
        if !max_force.is_finite() || max_force < 0.0 {
            return Err(PhysicsError::InvalidCoefficient {
                name: "max force",
                value: max_force,
            });
        }
        Ok(Self {
            body,
            local_anchor: transform.inverse_transform_point(&anchor),
            target: anchor,
            frequency,
            damping_ratio,
            max_force,
            r: Vector2::zeros(),
            mass: Matrix2::zeros(),
            c: Vector2::zeros(),
            gamma: 0.0,
            beta: 0.0,
            impulse: Vector2::zeros(),
        })
    }

    /// Move the drag target.
    pub fn set_target(&mut self, target: Point2<f64>) {
        self.target = target;
    }

    /// The current drag target.
    #[must_use]
    pub fn target(&self) -> Point2<f64> {
        self.target
    }
}

impl Joint for MouseJoint {
    fn body1(&self) -> BodyId {
        self.body
    }

    fn body2(&self) -> BodyId {
        self.body
    }

    fn kind(&self) -> JointKind {
        JointKind::Mouse
    }

    fn collision_allowed(&self) -> bool {
        true
    }

    fn initialize(
        &mut self,
        _body1: &mut SolverBody,
        body2: &mut SolverBody,
        _settings: &Settings,
        dt: f64,
    ) {
        let mass = if body2.inv_mass > 0.0 {
            1.0 / body2.inv_mass
        } else {
            0.0
        };

        // Fold the spring into constraint softening: gamma softens the
        // effective mass, beta feeds position error into the velocity
        // constraint.
        let omega = 2.0 * std::f64::consts::PI * self.frequency;
        let damping = 2.0 * mass * self.damping_ratio * omega;
        let stiffness = mass * omega * omega;

        self.gamma = dt * (damping + dt * stiffness);
        if self.gamma > 0.0 {
            self.gamma = 1.0 / self.gamma;
        }
        self.beta = dt * stiffness * self.gamma;

        self.r = body2.transform.transform_point(&self.local_anchor) - body2.world_center();
        self.c = (body2.world_center() + self.r) - self.target;

        let i = body2.inv_inertia;
        let m = body2.inv_mass;
        let mut k = Matrix2::new(
            m + i * self.r.y * self.r.y,
            -i * self.r.x * self.r.y,
            -i * self.r.x * self.r.y,
            m + i * self.r.x * self.r.x,
        );
        k.m11 += self.gamma;
        k.m22 += self.gamma;
        self.mass = k;

        // Warm start.
        body2.apply_impulse(&self.impulse, &self.r);
    }

    fn solve_velocity(
        &mut self,
        _body1: &mut SolverBody,
        body2: &mut SolverBody,
        _settings: &Settings,
        dt: f64,
    ) {
        let cdot = body2.velocity_at(&self.r);
        let rhs = -(cdot + self.c * self.beta + self.impulse * self.gamma);
        let mut impulse = solve22(&self.mass, &rhs);

        // Clamp the accumulated impulse to the force budget.
        let old = self.impulse;
        self.impulse += impulse;
        let max_impulse = self.max_force * dt;
        if self.impulse.norm() > max_impulse {
            self.impulse *= max_impulse / self.impulse.norm();
        }
        impulse = self.impulse - old;

        body2.apply_impulse(&impulse, &self.r);
    }

    fn solve_position(
        &mut self,
        _body1: &mut SolverBody,
        _body2: &mut SolverBody,
        _settings: &Settings,
    ) -> bool {
        // The spring is velocity-level only; a stretched grab is fine.
        true
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
    fn test_validation() {
        let body = dynamic_at(0.0, 0.0);
        assert!(MouseJoint::world_anchored(
            BodyId::new(1),
            &body.transform,
            Point2::origin(),
            0.0,
            0.7,
            100.0,
        )
        .is_err());
        assert!(MouseJoint::world_anchored(
            BodyId::new(1),
            &body.transform,
            Point2::origin(),
            5.0,
            -0.1,
            100.0,
        )
        .is_err());
    }

    #[test]
    fn test_pulls_body_toward_target() {
        let settings = Settings::default();
        let dt = settings.timestep;

        let mut dummy = SolverBody::fixed();
        let mut body = dynamic_at(0.0, 0.0);

        let mut joint = MouseJoint::world_anchored(
            BodyId::new(1),
            &body.transform,
            Point2::origin(),
            5.0,
            0.7,
            1000.0,
        )
        .unwrap();
        joint.set_target(Point2::new(1.0, 0.0));

        joint.initialize(&mut dummy, &mut body, &settings, dt);
        for _ in 0..settings.velocity_iterations {
            joint.solve_velocity(&mut dummy, &mut body, &settings, dt);
        }

        assert!(body.velocity.linear.x > 0.0, "body accelerates toward the target");
    }

    #[test]
    fn test_force_cap_limits_impulse() {
        let settings = Settings::default();
        let dt = settings.timestep;

        let mut dummy = SolverBody::fixed();
        let mut body = dynamic_at(0.0, 0.0);
        let max_force = 1.0;

        let mut joint = MouseJoint::world_anchored(
            BodyId::new(1),
            &body.transform,
            Point2::origin(),
            20.0,
            0.0,
            max_force,
        )
        .unwrap();
        joint.set_target(Point2::new(100.0, 0.0));

        joint.initialize(&mut dummy, &mut body, &settings, dt);
        for _ in 0..settings.velocity_iterations {
            joint.solve_velocity(&mut dummy, &mut body, &settings, dt);
        }

        // Total impulse is capped at max_force * dt; with unit mass the
        // velocity can't exceed that.
        assert!(body.velocity.linear.norm() <= max_force * dt + 1e-12);
    }
}
