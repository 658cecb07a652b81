//! Distance joint: rigid rod or spring.

use nalgebra::{Point2, Vector2};
use planar_types::{BodyId, PhysicsError, Settings, Transform};

use crate::joint::cross;
use crate::{Joint, JointKind, SolverBody};

/// Holds two anchors at a fixed distance, or, given a frequency, acts as
/// a damped spring toward that distance.
///
/// Frequency and damping ratio follow the usual convention: values ≥ 0,
/// zero frequency means a rigid rod.
#[derive(Debug, Clone)]
pub struct DistanceJoint {
    body1: BodyId,
    body2: BodyId,
    local_anchor1: Point2<f64>,
    local_anchor2: Point2<f64>,
    rest_length: f64,
    frequency: f64,
    damping_ratio: f64,
    collision_allowed: bool,

    // Solver cache
    r1: Vector2<f64>,
    r2: Vector2<f64>,
    u: Vector2<f64>,
    mass: f64,
    gamma: f64,
    bias: f64,
    impulse: f64,
}

impl DistanceJoint {
    /// Create a distance joint from local anchors and a rest length.
    pub fn new(
        body1: BodyId,
        body2: BodyId,
        local_anchor1: Point2<f64>,
        local_anchor2: Point2<f64>,
        rest_length: f64,
    ) -> planar_types::Result<Self> {
        if !rest_length.is_finite() || rest_length < 0.0 {
            return Err(PhysicsError::InvalidCoefficient {
                name: "rest length",
                value: rest_length,
            });
        }
        Ok(Self {
            body1,
            body2,
            local_anchor1,
            local_anchor2,
            rest_length,
            frequency: 0.0,
            damping_ratio: 0.0,
            collision_allowed: false,
            r1: Vector2::zeros(),
            r2: Vector2::zeros(),
            u: Vector2::zeros(),
            mass: 0.0,
            gamma: 0.0,
            bias: 0.0,
            impulse: 0.0,
        })
    }

    /// Create a distance joint between two world anchors; the rest length
    /// is their current separation.
    pub fn world_anchored(
        body1: BodyId,
        body2: BodyId,
        transform1: &Transform,
        transform2: &Transform,
        anchor1: Point2<f64>,
        anchor2: Point2<f64>,
    ) -> planar_types::Result<Self> {
        Self::new(
            body1,
            body2,
            transform1.inverse_transform_point(&anchor1),
            transform2.inverse_transform_point(&anchor2),
            (anchor2 - anchor1).norm(),
        )
    }

    /// Soften the joint into a damped spring.
    pub fn with_spring(mut self, frequency: f64, damping_ratio: f64) -> planar_types::Result<Self> {
        if !frequency.is_finite() || frequency < 0.0 {
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
        self.frequency = frequency;
        self.damping_ratio = damping_ratio;
        Ok(self)
    }

    /// Allow collision resolution between the joined bodies.
    #[must_use]
    pub fn with_collision_allowed(mut self) -> Self {
        self.collision_allowed = true;
        self
    }

    /// Whether this joint is a spring rather than a rigid rod.
    #[must_use]
    pub fn is_spring(&self) -> bool {
        self.frequency > 0.0
    }

    /// The rest length.
    #[must_use]
    pub fn rest_length(&self) -> f64 {
        self.rest_length
    }
}

impl Joint for DistanceJoint {
    fn body1(&self) -> BodyId {
        self.body1
    }

    fn body2(&self) -> BodyId {
        self.body2
    }

    fn kind(&self) -> JointKind {
        JointKind::Distance
    }

    fn collision_allowed(&self) -> bool {
        self.collision_allowed
    }

    fn initialize(
        &mut self,
        body1: &mut SolverBody,
        body2: &mut SolverBody,
        _settings: &Settings,
        dt: f64,
    ) {
        let c1 = body1.world_center();
        let c2 = body2.world_center();
        self.r1 = body1.transform.transform_point(&self.local_anchor1) - c1;
        self.r2 = body2.transform.transform_point(&self.local_anchor2) - c2;

        let d = (c2 + self.r2) - (c1 + self.r1);
        let length = d.norm();
        self.u = if length > f64::EPSILON {
            d / length
        } else {
            Vector2::zeros()
        };

        let cr1 = cross(&self.r1, &self.u);
        let cr2 = cross(&self.r2, &self.u);
        let inv_mass = body1.inv_mass
            + body2.inv_mass
            + body1.inv_inertia * cr1 * cr1
            + body2.inv_inertia * cr2 * cr2;

        if self.is_spring() && inv_mass > 0.0 {
            // Soft constraint: fold spring stiffness and damping into the
            // effective mass (gamma) and a position feedback term (bias).
            let spring_mass = 1.0 / inv_mass;
            let omega = 2.0 * std::f64::consts::PI * self.frequency;
            let damping = 2.0 * spring_mass * self.damping_ratio * omega;
            let stiffness = spring_mass * omega * omega;

            let c = length - self.rest_length;
            self.gamma = dt * (damping + dt * stiffness);
            self.gamma = if self.gamma > 0.0 { 1.0 / self.gamma } else { 0.0 };
            self.bias = c * dt * stiffness * self.gamma;

            let effective = inv_mass + self.gamma;
            self.mass = if effective > 0.0 { 1.0 / effective } else { 0.0 };
        } else {
            self.gamma = 0.0;
            self.bias = 0.0;
            self.mass = if inv_mass > 0.0 { 1.0 / inv_mass } else { 0.0 };
        }

        // Warm start.
        let p = self.u * self.impulse;
        body1.apply_impulse(&-p, &self.r1);
        body2.apply_impulse(&p, &self.r2);
    }

    fn solve_velocity(
        &mut self,
        body1: &mut SolverBody,
        body2: &mut SolverBody,
        _settings: &Settings,
        _dt: f64,
    ) {
        let cdot = self
            .u
            .dot(&(body2.velocity_at(&self.r2) - body1.velocity_at(&self.r1)));
        let impulse = -self.mass * (cdot + self.bias + self.gamma * self.impulse);
        self.impulse += impulse;

        let p = self.u * impulse;
        body1.apply_impulse(&-p, &self.r1);
        body2.apply_impulse(&p, &self.r2);
    }

    fn solve_position(
        &mut self,
        body1: &mut SolverBody,
        body2: &mut SolverBody,
        settings: &Settings,
    ) -> bool {
        if self.is_spring() {
            // Springs are allowed to be stretched; there is nothing to
            // correct positionally.
            return true;
        }

        let c1 = body1.world_center();
        let c2 = body2.world_center();
        let r1 = body1.transform.transform_point(&self.local_anchor1) - c1;
        let r2 = body2.transform.transform_point(&self.local_anchor2) - c2;

        let d = (c2 + r2) - (c1 + r1);
        let length = d.norm();
        if length < f64::EPSILON {
            return true;
        }
        let u = d / length;
        let c = (length - self.rest_length)
            .clamp(-settings.max_correction, settings.max_correction);

        let cr1 = cross(&r1, &u);
        let cr2 = cross(&r2, &u);
        let inv_mass = body1.inv_mass
            + body2.inv_mass
            + body1.inv_inertia * cr1 * cr1
            + body2.inv_inertia * cr2 * cr2;
        if inv_mass == 0.0 {
            return true;
        }

        let impulse = -c / inv_mass;
        let p = u * impulse;
        body1.apply_position_impulse(&-p, &r1);
        body2.apply_position_impulse(&p, &r2);

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

    #[test]
    fn test_rejects_negative_length() {
        assert!(DistanceJoint::new(
            BodyId::new(1),
            BodyId::new(2),
            Point2::origin(),
            Point2::origin(),
            -1.0,
        )
        .is_err());
    }

    #[test]
    fn test_world_anchored_captures_length() {
        let t1 = Transform::identity();
        let t2 = Transform::from_position(Point2::new(3.0, 4.0));
        let joint = DistanceJoint::world_anchored(
            BodyId::new(1),
            BodyId::new(2),
            &t1,
            &t2,
            Point2::origin(),
            Point2::new(3.0, 4.0),
        )
        .unwrap();

        assert_relative_eq!(joint.rest_length(), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rod_stops_separating_velocity() {
        let settings = Settings::default();
        let dt = settings.timestep;

        let mut a = dynamic_at(0.0, 0.0);
        let mut b = dynamic_at(2.0, 0.0);
        // Pulling apart along the rod
        b.velocity.linear = Vector2::new(1.0, 0.0);

        let mut joint = DistanceJoint::world_anchored(
            BodyId::new(1),
            BodyId::new(2),
            &a.transform,
            &b.transform,
            Point2::origin(),
            Point2::new(2.0, 0.0),
        )
        .unwrap();

        joint.initialize(&mut a, &mut b, &settings, dt);
        for _ in 0..settings.velocity_iterations {
            joint.solve_velocity(&mut a, &mut b, &settings, dt);
        }

        // Relative velocity along the rod vanishes; momentum is shared.
        let relative = b.velocity.linear.x - a.velocity.linear.x;
        assert!(relative.abs() < 1e-9);
        assert_relative_eq!(
            a.velocity.linear.x + b.velocity.linear.x,
            1.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_position_solve_restores_length() {
        let settings = Settings::default();

        let mut a = dynamic_at(0.0, 0.0);
        let mut b = dynamic_at(2.1, 0.0);

        let mut joint = DistanceJoint::new(
            BodyId::new(1),
            BodyId::new(2),
            Point2::origin(),
            Point2::origin(),
            2.0,
        )
        .unwrap();

        let mut solved = false;
        for _ in 0..settings.position_iterations {
            solved = joint.solve_position(&mut a, &mut b, &settings);
            if solved {
                break;
            }
        }
        assert!(solved);

        let length = (b.transform.position - a.transform.position).norm();
        assert_relative_eq!(length, 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_spring_skips_position_solve() {
        let settings = Settings::default();
        let mut a = dynamic_at(0.0, 0.0);
        let mut b = dynamic_at(5.0, 0.0);

        let mut joint = DistanceJoint::new(
            BodyId::new(1),
            BodyId::new(2),
            Point2::origin(),
            Point2::origin(),
            2.0,
        )
        .unwrap()
        .with_spring(4.0, 0.7)
        .unwrap();

        assert!(joint.solve_position(&mut a, &mut b, &settings));
        assert_relative_eq!(b.transform.position.x, 5.0, epsilon = 1e-12);
    }
}
