//! Error types for simulation operations.

use thiserror::Error;

use crate::{BodyId, JointId};

/// Errors that can occur while building shapes, bodies, and joints, or
/// while mutating a world.
///
/// Numerical trouble inside a step (non-converging narrow phase, `NaN`
/// body state) is deliberately *not* represented here: a step never fails.
/// Those conditions surface through listeners and body state instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PhysicsError {
    /// A shape parameter is out of its domain (non-positive radius,
    /// zero-length segment, ...).
    #[error("invalid shape: {reason}")]
    InvalidShape {
        /// Description of what's wrong.
        reason: String,
    },

    /// A polygon point set is degenerate: fewer than three vertices,
    /// duplicate or collinear points, or zero enclosed area.
    #[error("degenerate polygon: {reason}")]
    DegeneratePolygon {
        /// Description of the degeneracy.
        reason: String,
    },

    /// Fixture density must be positive.
    #[error("density must be positive, got {0}")]
    NonPositiveDensity(f64),

    /// A coefficient is outside its valid range.
    #[error("{name} out of range: {value}")]
    InvalidCoefficient {
        /// Name of the offending parameter.
        name: &'static str,
        /// The offending value.
        value: f64,
    },

    /// A parameter that must be finite is `NaN` or infinite.
    #[error("{name} must be finite")]
    NonFiniteParameter {
        /// Name of the offending parameter.
        name: &'static str,
    },

    /// A joint axis has zero length.
    #[error("joint axis must have non-zero length")]
    ZeroLengthAxis,

    /// Invalid mass properties.
    #[error("invalid mass: {reason}")]
    InvalidMass {
        /// Description of what's wrong.
        reason: String,
    },

    /// The body's mass was never computed; call the mass setup before
    /// stepping.
    #[error("{0} has no mass set; compute mass from fixtures before stepping")]
    MassUnset(BodyId),

    /// The body is already a member of a world.
    #[error("{0} is already in a world")]
    BodyAlreadyInWorld(BodyId),

    /// The body is not a member of this world.
    #[error("{0} is not in this world")]
    BodyNotInWorld(BodyId),

    /// A joint references a body that is not in the same world.
    #[error("{0} references a body outside this world")]
    JointBodiesNotInWorld(JointId),

    /// The joint is not a member of this world.
    #[error("{0} is not in this world")]
    JointNotInWorld(JointId),

    /// Invalid configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Description of the configuration error.
        reason: String,
    },

    /// `step` was called from inside a step listener.
    #[error("the world cannot be stepped reentrantly")]
    SteppedDuringStep,
}

impl PhysicsError {
    /// Create an invalid shape error.
    #[must_use]
    pub fn invalid_shape(reason: impl Into<String>) -> Self {
        Self::InvalidShape {
            reason: reason.into(),
        }
    }

    /// Create a degenerate polygon error.
    #[must_use]
    pub fn degenerate_polygon(reason: impl Into<String>) -> Self {
        Self::DegeneratePolygon {
            reason: reason.into(),
        }
    }

    /// Create an invalid mass error.
    #[must_use]
    pub fn invalid_mass(reason: impl Into<String>) -> Self {
        Self::InvalidMass {
            reason: reason.into(),
        }
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Check if this is an input-domain error (bad argument at a
    /// construction or mutation call).
    #[must_use]
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidShape { .. }
                | Self::DegeneratePolygon { .. }
                | Self::NonPositiveDensity(_)
                | Self::InvalidCoefficient { .. }
                | Self::NonFiniteParameter { .. }
                | Self::ZeroLengthAxis
                | Self::InvalidMass { .. }
        )
    }

    /// Check if this is a world state-invariant violation.
    #[must_use]
    pub fn is_state_error(&self) -> bool {
        matches!(
            self,
            Self::MassUnset(_)
                | Self::BodyAlreadyInWorld(_)
                | Self::BodyNotInWorld(_)
                | Self::JointBodiesNotInWorld(_)
                | Self::JointNotInWorld(_)
                | Self::SteppedDuringStep
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PhysicsError::NonPositiveDensity(-1.0);
        assert!(err.to_string().contains("-1"));

        let err = PhysicsError::MassUnset(BodyId::new(7));
        assert!(err.to_string().contains("Body(7)"));

        let err = PhysicsError::InvalidCoefficient {
            name: "friction",
            value: 1.5,
        };
        assert!(err.to_string().contains("friction"));
    }

    #[test]
    fn test_error_predicates() {
        assert!(PhysicsError::ZeroLengthAxis.is_input_error());
        assert!(!PhysicsError::ZeroLengthAxis.is_state_error());

        let err = PhysicsError::BodyAlreadyInWorld(BodyId::new(1));
        assert!(err.is_state_error());
        assert!(!err.is_input_error());
    }
}
