//! Revolute (pin) joint.

use nalgebra::{Matrix2, Point2, Vector2};
use planar_types::{BodyId, PhysicsError, Settings, Transform};

use crate::joint::{clamp_accumulated, point_constraint_matrix, solve22};
use crate::{Joint, JointKind, LimitState, SolverBody};

/// A revolute joint pins two bodies together at a point while leaving
/// relative rotation free.
///
/// Options: an angle limit (relative rotation confined to
/// `[lower, upper]`) and a motor (drives relative angular velocity toward
/// a target speed under a torque cap).
#[derive(Debug, Clone)]
pub struct RevoluteJoint {
    body1: BodyId,
    body2: BodyId,
    local_anchor1: Point2<f64>,
    local_anchor2: Point2<f64>,
    reference_angle: f64,
    collision_allowed: bool,

    limit_enabled: bool,
    lower: f64,
    upper: f64,

    motor_enabled: bool,
    motor_speed: f64,
    max_torque: f64,

    // Solver cache
    r1: Vector2<f64>,
    r2: Vector2<f64>,
    mass: Matrix2<f64>,
    angular_mass: f64,
    limit_state: LimitState,
    impulse: Vector2<f64>,
    motor_impulse: f64,
    limit_impulse: f64,
}

impl RevoluteJoint {
    /// Create a revolute joint from local-frame anchors.
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
            limit_enabled: false,
            lower: 0.0,
            upper: 0.0,
            motor_enabled: false,
            motor_speed: 0.0,
            max_torque: 0.0,
            r1: Vector2::zeros(),
            r2: Vector2::zeros(),
            mass: Matrix2::zeros(),
            angular_mass: 0.0,
            limit_state: LimitState::Inactive,
            impulse: Vector2::zeros(),
            motor_impulse: 0.0,
            limit_impulse: 0.0,
        }
    }

    /// Create a revolute joint pinned at a world-space anchor, given the
    /// bodies' transforms at creation time.
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

    /// Enable the angle limit. The relative angle (from the creation pose)
    /// is confined to `[lower, upper]` radians.
    pub fn with_limits(mut self, lower: f64, upper: f64) -> planar_types::Result<Self> {
        if !lower.is_finite() || !upper.is_finite() {
            return Err(PhysicsError::NonFiniteParameter { name: "limits" });
        }
        if lower > upper {
            return Err(PhysicsError::InvalidCoefficient {
                name: "lower limit",
                value: lower,
            });
        }
        self.limit_enabled = true;
        self.lower = lower;
        self.upper = upper;
        Ok(self)
    }

    /// Enable the motor: drive relative angular velocity toward `speed`
    /// rad/s with at most `max_torque` N·m.
    #[must_use]
    pub fn with_motor(mut self, speed: f64, max_torque: f64) -> Self {
        self.motor_enabled = true;
        self.motor_speed = speed;
        self.max_torque = max_torque.max(0.0);
        self
    }

    /// Allow collision resolution between the joined bodies.
    #[must_use]
    pub fn with_collision_allowed(mut self) -> Self {
        self.collision_allowed = true;
        self
    }

    /// The relative joint angle for the given body transforms.
    #[must_use]
    pub fn joint_angle(&self, transform1: &Transform, transform2: &Transform) -> f64 {
        transform2.angle() - transform1.angle() - self.reference_angle
    }

    /// The motor's target speed (rad/s).
    #[must_use]
    pub fn motor_speed(&self) -> f64 {
        self.motor_speed
    }

    /// Change the motor's target speed.
    pub fn set_motor_speed(&mut self, speed: f64) {
        self.motor_speed = speed;
    }
}

impl Joint for RevoluteJoint {
    fn body1(&self) -> BodyId {
        self.body1
    }

    fn body2(&self) -> BodyId {
        self.body2
    }

    fn kind(&self) -> JointKind {
        JointKind::Revolute
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

        if self.limit_enabled {
            let angle = self.joint_angle(&body1.transform, &body2.transform);
            let new_state = if (self.upper - self.lower).abs() < f64::EPSILON {
                LimitState::Equal
            } else if angle <= self.lower {
                LimitState::AtLower
            } else if angle >= self.upper {
                LimitState::AtUpper
            } else {
                LimitState::Inactive
            };
            if new_state != self.limit_state {
                self.limit_impulse = 0.0;
            }
            self.limit_state = new_state;
        } else {
            self.limit_state = LimitState::Inactive;
            self.limit_impulse = 0.0;
        }
        if !self.motor_enabled {
            self.motor_impulse = 0.0;
        }

        // Warm start with last step's impulses.
        let angular = self.motor_impulse + self.limit_impulse;
        body1.apply_impulse(&-self.impulse, &self.r1);
        body1.apply_angular_impulse(-angular);
        body2.apply_impulse(&self.impulse, &self.r2);
        body2.apply_angular_impulse(angular);
    }

    fn solve_velocity(
        &mut self,
        body1: &mut SolverBody,
        body2: &mut SolverBody,
        _settings: &Settings,
        dt: f64,
    ) {
        // Motor
        if self.motor_enabled && self.limit_state != LimitState::Equal && self.angular_mass > 0.0 {
            let cdot = body2.velocity.angular - body1.velocity.angular - self.motor_speed;
            let impulse = -self.angular_mass * cdot;
            let max = self.max_torque * dt;
            let applied = clamp_accumulated(&mut self.motor_impulse, impulse, -max, max);
            body1.apply_angular_impulse(-applied);
            body2.apply_angular_impulse(applied);
        }

        // Limit
        if self.limit_enabled && self.limit_state != LimitState::Inactive && self.angular_mass > 0.0
        {
            let cdot = body2.velocity.angular - body1.velocity.angular;
            let impulse = -self.angular_mass * cdot;
            let applied = match self.limit_state {
                LimitState::Equal => {
                    self.limit_impulse += impulse;
                    impulse
                }
                LimitState::AtLower => {
                    clamp_accumulated(&mut self.limit_impulse, impulse, 0.0, f64::INFINITY)
                }
                LimitState::AtUpper => {
                    clamp_accumulated(&mut self.limit_impulse, impulse, f64::NEG_INFINITY, 0.0)
                }
                LimitState::Inactive => 0.0,
            };
            body1.apply_angular_impulse(-applied);
            body2.apply_angular_impulse(applied);
        }

        // Point constraint
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
        let mut angular_error = 0.0;

        // Limit correction
        if self.limit_enabled && self.limit_state != LimitState::Inactive && self.angular_mass > 0.0
        {
            let angle = self.joint_angle(&body1.transform, &body2.transform);
            let c = match self.limit_state {
                LimitState::Equal => {
                    (angle - self.lower).clamp(-settings.max_correction, settings.max_correction)
                }
                LimitState::AtLower => {
                    (angle - self.lower).clamp(-settings.max_correction, 0.0)
                }
                LimitState::AtUpper => (angle - self.upper).clamp(0.0, settings.max_correction),
                LimitState::Inactive => 0.0,
            };
            angular_error = c.abs();
            let impulse = -self.angular_mass * c;
            body1.apply_position_rotation(-impulse);
            body2.apply_position_rotation(impulse);
        }

        // Point correction
        let r1 = body1.transform.transform_point(&self.local_anchor1) - body1.world_center();
        let r2 = body2.transform.transform_point(&self.local_anchor2) - body2.world_center();
        let c = body2.transform.transform_point(&self.local_anchor2)
            - body1.transform.transform_point(&self.local_anchor1);
        let linear_error = c.norm();

        let k = point_constraint_matrix(body1, body2, &r1, &r2);
        let impulse = solve22(&k, &-c);
        body1.apply_position_impulse(&-impulse, &r1);
        body2.apply_position_impulse(&impulse, &r2);

        linear_error <= settings.position_epsilon && angular_error <= settings.position_epsilon
    }
}
