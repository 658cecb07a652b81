//! Prismatic (slider) joint.

use nalgebra::{Matrix2, Point2, Vector2};
use planar_types::{BodyId, PhysicsError, Settings, Transform};

use crate::joint::{clamp_accumulated, cross, solve22};
use crate::{Joint, JointKind, LimitState, SolverBody};

/// A prismatic joint constrains two bodies to translate along a single
/// axis with no relative rotation.
///
/// Options: translation limits along the axis and a linear motor.
#[derive(Debug, Clone)]
pub struct PrismaticJoint {
    body1: BodyId,
    body2: BodyId,
    local_anchor1: Point2<f64>,
    local_anchor2: Point2<f64>,
    /// Unit axis in body 1's local frame.
    local_axis: Vector2<f64>,
    reference_angle: f64,
    collision_allowed: bool,

    limit_enabled: bool,
    lower: f64,
    upper: f64,

    motor_enabled: bool,
    motor_speed: f64,
    max_force: f64,

    // Solver cache
    axis: Vector2<f64>,
    perp: Vector2<f64>,
    s1: f64,
    s2: f64,
    a1: f64,
    a2: f64,
    mass: Matrix2<f64>,
    axial_mass: f64,
    limit_state: LimitState,
    impulse: Vector2<f64>,
    motor_impulse: f64,
    limit_impulse: f64,
}

impl PrismaticJoint {
    /// Create a prismatic joint from local anchors and a local-frame axis
    /// on body 1.
    pub fn new(
        body1: BodyId,
        body2: BodyId,
        local_anchor1: Point2<f64>,
        local_anchor2: Point2<f64>,
        local_axis: Vector2<f64>,
    ) -> planar_types::Result<Self> {
        let norm = local_axis.norm();
        if !norm.is_finite() || norm < f64::EPSILON {
            return Err(PhysicsError::ZeroLengthAxis);
        }
        Ok(Self {
            body1,
            body2,
            local_anchor1,
            local_anchor2,
            local_axis: local_axis / norm,
            reference_angle: 0.0,
            collision_allowed: false,
            limit_enabled: false,
            lower: 0.0,
            upper: 0.0,
            motor_enabled: false,
            motor_speed: 0.0,
            max_force: 0.0,
            axis: Vector2::zeros(),
            perp: Vector2::zeros(),
            s1: 0.0,
            s2: 0.0,
            a1: 0.0,
            a2: 0.0,
            mass: Matrix2::zeros(),
            axial_mass: 0.0,
            limit_state: LimitState::Inactive,
            impulse: Vector2::zeros(),
            motor_impulse: 0.0,
            limit_impulse: 0.0,
        })
    }

    /// Create a prismatic joint from a world anchor and world axis, given
    /// the bodies' transforms at creation time.
    pub fn world_anchored(
        body1: BodyId,
        body2: BodyId,
        transform1: &Transform,
        transform2: &Transform,
        anchor: Point2<f64>,
        axis: Vector2<f64>,
    ) -> planar_types::Result<Self> {
        let mut joint = Self::new(
            body1,
            body2,
            transform1.inverse_transform_point(&anchor),
            transform2.inverse_transform_point(&anchor),
            transform1.inverse_transform_vector(&axis),
        )?;
        joint.reference_angle = transform2.angle() - transform1.angle();
        Ok(joint)
    }

    /// Enable translation limits along the axis.
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

    /// Enable the motor: drive translation speed toward `speed` m/s with
    /// at most `max_force` N.
    #[must_use]
    pub fn with_motor(mut self, speed: f64, max_force: f64) -> Self {
        self.motor_enabled = true;
        self.motor_speed = speed;
        self.max_force = max_force.max(0.0);
        self
    }

    /// Allow collision resolution between the joined bodies.
    #[must_use]
    pub fn with_collision_allowed(mut self) -> Self {
        self.collision_allowed = true;
        self
    }

    /// Current translation along the axis for the given transforms.
    #[must_use]
    pub fn translation(&self, transform1: &Transform, transform2: &Transform) -> f64 {
        let p1 = transform1.transform_point(&self.local_anchor1);
        let p2 = transform2.transform_point(&self.local_anchor2);
        let axis = transform1.transform_vector(&self.local_axis);
        (p2 - p1).dot(&axis)
    }
}

impl Joint for PrismaticJoint {
    fn body1(&self) -> BodyId {
        self.body1
    }

    fn body2(&self) -> BodyId {
        self.body2
    }

    fn kind(&self) -> JointKind {
        JointKind::Prismatic
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
        let r1 = body1.transform.transform_point(&self.local_anchor1) - c1;
        let r2 = body2.transform.transform_point(&self.local_anchor2) - c2;
        let d = (c2 + r2) - (c1 + r1);

        self.axis = body1.transform.transform_vector(&self.local_axis);
        self.perp = Vector2::new(-self.axis.y, self.axis.x);

        // Arms for the axial row and the perpendicular row.
        self.a1 = cross(&(d + r1), &self.axis);
        self.a2 = cross(&r2, &self.axis);
        self.s1 = cross(&(d + r1), &self.perp);
        self.s2 = cross(&r2, &self.perp);

        let m = body1.inv_mass + body2.inv_mass;
        let i1 = body1.inv_inertia;
        let i2 = body2.inv_inertia;

        let axial = m + i1 * self.a1 * self.a1 + i2 * self.a2 * self.a2;
        self.axial_mass = if axial > 0.0 { 1.0 / axial } else { 0.0 };

        let k11 = m + i1 * self.s1 * self.s1 + i2 * self.s2 * self.s2;
        let k12 = i1 * self.s1 + i2 * self.s2;
        let mut k22 = i1 + i2;
        if k22 == 0.0 {
            // Both bodies have fixed rotation; the angular row is inert.
            k22 = 1.0;
        }
        self.mass = Matrix2::new(k11, k12, k12, k22);

        if self.limit_enabled {
            let translation = d.dot(&self.axis);
            let new_state = if (self.upper - self.lower).abs() < f64::EPSILON {
                LimitState::Equal
            } else if translation <= self.lower {
                LimitState::AtLower
            } else if translation >= self.upper {
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

        // Warm start: perpendicular + angular rows, then the axial motor
        // and limit impulses.
        let axial_impulse = self.motor_impulse + self.limit_impulse;
        let p = self.perp * self.impulse.x + self.axis * axial_impulse;
        let l1 = self.impulse.x * self.s1 + self.impulse.y + axial_impulse * self.a1;
        let l2 = self.impulse.x * self.s2 + self.impulse.y + axial_impulse * self.a2;

        body1.velocity.linear -= p * body1.inv_mass;
        body1.velocity.angular -= body1.inv_inertia * l1;
        body2.velocity.linear += p * body2.inv_mass;
        body2.velocity.angular += body2.inv_inertia * l2;
    }

    fn solve_velocity(
        &mut self,
        body1: &mut SolverBody,
        body2: &mut SolverBody,
        _settings: &Settings,
        dt: f64,
    ) {
        // Motor
        if self.motor_enabled && self.limit_state != LimitState::Equal && self.axial_mass > 0.0 {
            let cdot = self.axis.dot(&(body2.velocity.linear - body1.velocity.linear))
                + self.a2 * body2.velocity.angular
                - self.a1 * body1.velocity.angular
                - self.motor_speed;
            let impulse = -self.axial_mass * cdot;
            let max = self.max_force * dt;
            let applied = clamp_accumulated(&mut self.motor_impulse, impulse, -max, max);

            let p = self.axis * applied;
            body1.velocity.linear -= p * body1.inv_mass;
            body1.velocity.angular -= body1.inv_inertia * applied * self.a1;
            body2.velocity.linear += p * body2.inv_mass;
            body2.velocity.angular += body2.inv_inertia * applied * self.a2;
        }

        // Limit
        if self.limit_enabled && self.limit_state != LimitState::Inactive && self.axial_mass > 0.0 {
            let cdot = self.axis.dot(&(body2.velocity.linear - body1.velocity.linear))
                + self.a2 * body2.velocity.angular
                - self.a1 * body1.velocity.angular;
            let impulse = -self.axial_mass * cdot;
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

            let p = self.axis * applied;
            body1.velocity.linear -= p * body1.inv_mass;
            body1.velocity.angular -= body1.inv_inertia * applied * self.a1;
            body2.velocity.linear += p * body2.inv_mass;
            body2.velocity.angular += body2.inv_inertia * applied * self.a2;
        }

        // Perpendicular + angular rows
        let cdot = Vector2::new(
            self.perp.dot(&(body2.velocity.linear - body1.velocity.linear))
                + self.s2 * body2.velocity.angular
                - self.s1 * body1.velocity.angular,
            body2.velocity.angular - body1.velocity.angular,
        );
        let impulse = solve22(&self.mass, &-cdot);
        self.impulse += impulse;

        let p = self.perp * impulse.x;
        let l1 = impulse.x * self.s1 + impulse.y;
        let l2 = impulse.x * self.s2 + impulse.y;

        body1.velocity.linear -= p * body1.inv_mass;
        body1.velocity.angular -= body1.inv_inertia * l1;
        body2.velocity.linear += p * body2.inv_mass;
        body2.velocity.angular += body2.inv_inertia * l2;
    }

    fn solve_position(
        &mut self,
        body1: &mut SolverBody,
        body2: &mut SolverBody,
        settings: &Settings,
    ) -> bool {
        let c1 = body1.world_center();
        let c2 = body2.world_center();
        let r1 = body1.transform.transform_point(&self.local_anchor1) - c1;
        let r2 = body2.transform.transform_point(&self.local_anchor2) - c2;
        let d = (c2 + r2) - (c1 + r1);

        let axis = body1.transform.transform_vector(&self.local_axis);
        let perp = Vector2::new(-axis.y, axis.x);

        let s1 = cross(&(d + r1), &perp);
        let s2 = cross(&r2, &perp);

        let perp_error = perp.dot(&d);
        let angle_error =
            body2.transform.angle() - body1.transform.angle() - self.reference_angle;

        // Limit correction along the axis.
        let mut axial_error = 0.0;
        if self.limit_enabled && self.limit_state != LimitState::Inactive && self.axial_mass > 0.0 {
            let translation = d.dot(&axis);
            let c = match self.limit_state {
                LimitState::Equal => (translation - self.lower)
                    .clamp(-settings.max_correction, settings.max_correction),
                LimitState::AtLower => {
                    (translation - self.lower).clamp(-settings.max_correction, 0.0)
                }
                LimitState::AtUpper => {
                    (translation - self.upper).clamp(0.0, settings.max_correction)
                }
                LimitState::Inactive => 0.0,
            };
            axial_error = c.abs();

            let a1 = cross(&(d + r1), &axis);
            let a2 = cross(&r2, &axis);
            let impulse = -self.axial_mass * c;
            let p = axis * impulse;
            body1.apply_position_impulse(&-p, &r1);
            body1.apply_position_rotation(-(impulse * a1 - cross(&r1, &p)));
            body2.apply_position_impulse(&p, &r2);
            body2.apply_position_rotation(impulse * a2 - cross(&r2, &p));
        }

        // Perpendicular + angular correction.
        let m = body1.inv_mass + body2.inv_mass;
        let i1 = body1.inv_inertia;
        let i2 = body2.inv_inertia;
        let k11 = m + i1 * s1 * s1 + i2 * s2 * s2;
        let k12 = i1 * s1 + i2 * s2;
        let mut k22 = i1 + i2;
        if k22 == 0.0 {
            k22 = 1.0;
        }
        let k = Matrix2::new(k11, k12, k12, k22);
        let impulse = solve22(&k, &-Vector2::new(perp_error, angle_error));

        let p = perp * impulse.x;
        body1.apply_position_impulse(&-p, &r1);
        body1.apply_position_rotation(-(impulse.x * s1 - cross(&r1, &p) + impulse.y));
        body2.apply_position_impulse(&p, &r2);
        body2.apply_position_rotation(impulse.x * s2 - cross(&r2, &p) + impulse.y);

        perp_error.abs() <= settings.position_epsilon
            && angle_error.abs() <= settings.position_epsilon
            && axial_error <= settings.position_epsilon
    }
}
