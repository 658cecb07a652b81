//! Angle joint: relative rotation lock, optionally geared.

use planar_types::{BodyId, PhysicsError, Settings};

use crate::{Joint, JointKind, SolverBody};

/// Locks the relative rotation of two bodies.
///
/// With `ratio = 1` the relative angle is held at its creation value.
/// Other ratios gear the angular velocities (`ω₂ = ratio · ω₁`), which is
/// how gear trains are modelled; geared joints are velocity-level only,
/// since a position-level gearing constraint would need the accumulated
/// wrap count of both bodies.
#[derive(Debug, Clone)]
pub struct AngleJoint {
    body1: BodyId,
    body2: BodyId,
    reference_angle: f64,
    ratio: f64,

    // Solver cache
    mass: f64,
    impulse: f64,
}

impl AngleJoint {
    /// Create an angle joint holding the current relative angle.
    #[must_use]
    pub fn new(body1: BodyId, body2: BodyId, reference_angle: f64) -> Self {
        Self {
            body1,
            body2,
            reference_angle,
            ratio: 1.0,
            mass: 0.0,
            impulse: 0.0,
        }
    }

    /// Gear the joint: `ω₂ = ratio · ω₁`.
    pub fn with_ratio(mut self, ratio: f64) -> planar_types::Result<Self> {
        if !ratio.is_finite() || ratio == 0.0 {
            return Err(PhysicsError::InvalidCoefficient {
                name: "ratio",
                value: ratio,
            });
        }
        self.ratio = ratio;
        Ok(self)
    }

    /// The gear ratio.
    #[must_use]
    pub fn ratio(&self) -> f64 {
        self.ratio
    }
}

impl Joint for AngleJoint {
    fn body1(&self) -> BodyId {
        self.body1
    }

    fn body2(&self) -> BodyId {
        self.body2
    }

    fn kind(&self) -> JointKind {
        JointKind::Angle
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
        let inv = self.ratio * self.ratio * body1.inv_inertia + body2.inv_inertia;
        self.mass = if inv > 0.0 { 1.0 / inv } else { 0.0 };

        // Warm start.
        body1.apply_angular_impulse(-self.ratio * self.impulse);
        body2.apply_angular_impulse(self.impulse);
    }

    fn solve_velocity(
        &mut self,
        body1: &mut SolverBody,
        body2: &mut SolverBody,
        _settings: &Settings,
        _dt: f64,
    ) {
        let cdot = body2.velocity.angular - self.ratio * body1.velocity.angular;
        let impulse = -self.mass * cdot;
        self.impulse += impulse;

        body1.apply_angular_impulse(-self.ratio * impulse);
        body2.apply_angular_impulse(impulse);
    }

    fn solve_position(
        &mut self,
        body1: &mut SolverBody,
        body2: &mut SolverBody,
        settings: &Settings,
    ) -> bool {
        if (self.ratio - 1.0).abs() > f64::EPSILON {
            return true;
        }

        let error =
            body2.transform.angle() - body1.transform.angle() - self.reference_angle;
        if self.mass > 0.0 {
            let c = error.clamp(-settings.max_correction, settings.max_correction);
            let impulse = -self.mass * c;
            body1.apply_position_rotation(-impulse);
            body2.apply_position_rotation(impulse);
        }

        error.abs() <= settings.position_epsilon
    }
}
