//! Simulation settings: timestep, solver iterations, and thresholds.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Which bodies are checked for tunneling by continuous collision
/// detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ContinuousMode {
    /// Only bodies flagged as bullets.
    #[default]
    Bullets,
    /// Every dynamic body.
    All,
    /// Continuous detection disabled; fast bodies may tunnel.
    Off,
}

/// Tunable parameters for the world step loop and solvers.
///
/// All tunables live here; there is no global state. The defaults are the
/// values the solver was tuned against; prefer the presets over hand-edits
/// unless you know which trade-off you are making.
///
/// # Example
///
/// ```
/// use planar_types::Settings;
///
/// let settings = Settings::default()
///     .with_iterations(12, 6)
///     .with_timestep(1.0 / 120.0);
/// assert!(settings.validate().is_ok());
/// assert_eq!(settings.frequency(), 120.0);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Settings {
    /// Fixed timestep for `update`-driven stepping (seconds).
    pub timestep: f64,
    /// Number of velocity iterations for the sequential-impulse solver.
    pub velocity_iterations: usize,
    /// Number of position iterations for the sequential-impulse solver.
    pub position_iterations: usize,
    /// Baumgarte position-correction factor in [0, 1].
    pub baumgarte: f64,
    /// Allowed penetration before position correction kicks in (m).
    pub linear_slop: f64,
    /// Maximum position correction applied per iteration (m).
    pub max_correction: f64,
    /// Relative normal velocity below which restitution is ignored (m/s).
    pub restitution_velocity: f64,
    /// Position error below which an island's position solve stops early (m).
    pub position_epsilon: f64,
    /// Linear speed below which a body is considered at rest (m/s).
    pub sleep_linear_velocity: f64,
    /// Angular speed below which a body is considered at rest (rad/s).
    pub sleep_angular_velocity: f64,
    /// Time a whole island must rest before it is put to sleep (s).
    pub sleep_time: f64,
    /// Whether bodies may be put to sleep at all.
    pub auto_sleeping: bool,
    /// Maximum translation of a body within one step (m).
    pub max_translation: f64,
    /// Maximum rotation of a body within one step (rad).
    pub max_rotation: f64,
    /// Continuous collision detection mode.
    pub continuous: ContinuousMode,
    /// Separation below which a time-of-impact search counts as touching (m).
    pub toi_tolerance: f64,
    /// Iteration cap for one conservative-advancement search.
    pub toi_iterations: usize,
    /// Cap on continuous sub-steps per body per frame.
    pub max_sub_steps: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timestep: 1.0 / 60.0,
            velocity_iterations: 10,
            position_iterations: 5,
            baumgarte: 0.2,
            linear_slop: 0.005,
            max_correction: 0.2,
            restitution_velocity: 1.0,
            position_epsilon: 0.005,
            sleep_linear_velocity: 0.01,
            sleep_angular_velocity: 2.0_f64.to_radians(),
            sleep_time: 0.5,
            auto_sleeping: true,
            max_translation: 2.0,
            max_rotation: std::f64::consts::FRAC_PI_2,
            continuous: ContinuousMode::Bullets,
            toi_tolerance: 0.001,
            toi_iterations: 20,
            max_sub_steps: 8,
        }
    }
}

impl Settings {
    /// Create settings tuned for accuracy over speed: more iterations, a
    /// finer timestep, and no sleeping.
    #[must_use]
    pub fn high_accuracy() -> Self {
        Self {
            timestep: 1.0 / 120.0,
            velocity_iterations: 16,
            position_iterations: 10,
            auto_sleeping: false,
            ..Default::default()
        }
    }

    /// Create settings tuned for speed over accuracy.
    #[must_use]
    pub fn fast() -> Self {
        Self {
            timestep: 1.0 / 30.0,
            velocity_iterations: 6,
            position_iterations: 3,
            sleep_time: 0.25,
            ..Default::default()
        }
    }

    /// Set the fixed timestep.
    #[must_use]
    pub fn with_timestep(mut self, timestep: f64) -> Self {
        self.timestep = timestep;
        self
    }

    /// Set the velocity and position iteration counts.
    #[must_use]
    pub fn with_iterations(mut self, velocity: usize, position: usize) -> Self {
        self.velocity_iterations = velocity;
        self.position_iterations = position;
        self
    }

    /// Set the continuous collision detection mode.
    #[must_use]
    pub fn with_continuous(mut self, mode: ContinuousMode) -> Self {
        self.continuous = mode;
        self
    }

    /// Disable sleeping (all bodies always active).
    #[must_use]
    pub fn no_sleeping(mut self) -> Self {
        self.auto_sleeping = false;
        self
    }

    /// Get the step frequency in Hz.
    #[must_use]
    pub fn frequency(&self) -> f64 {
        1.0 / self.timestep
    }

    /// Validate the settings.
    pub fn validate(&self) -> crate::Result<()> {
        if !self.timestep.is_finite() || self.timestep <= 0.0 {
            return Err(crate::PhysicsError::invalid_config(
                "timestep must be positive and finite",
            ));
        }
        if self.velocity_iterations == 0 {
            return Err(crate::PhysicsError::invalid_config(
                "velocity_iterations must be at least 1",
            ));
        }
        if !(0.0..=1.0).contains(&self.baumgarte) {
            return Err(crate::PhysicsError::invalid_config(
                "baumgarte must be in [0, 1]",
            ));
        }
        if self.linear_slop < 0.0 || self.max_correction < 0.0 {
            return Err(crate::PhysicsError::invalid_config(
                "slop and correction limits cannot be negative",
            ));
        }
        if self.sleep_linear_velocity < 0.0
            || self.sleep_angular_velocity < 0.0
            || self.sleep_time < 0.0
        {
            return Err(crate::PhysicsError::invalid_config(
                "sleep thresholds cannot be negative",
            ));
        }
        if self.toi_iterations == 0 || self.max_sub_steps == 0 {
            return Err(crate::PhysicsError::invalid_config(
                "continuous-detection iteration caps must be at least 1",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_relative_eq!(settings.timestep, 1.0 / 60.0, epsilon = 1e-12);
        assert_eq!(settings.velocity_iterations, 10);
        assert_eq!(settings.position_iterations, 5);
        assert_eq!(settings.continuous, ContinuousMode::Bullets);
    }

    #[test]
    fn test_presets() {
        assert!(Settings::high_accuracy().validate().is_ok());
        assert!(Settings::fast().validate().is_ok());
        assert!(!Settings::high_accuracy().auto_sleeping);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut settings = Settings::default();
        settings.timestep = 0.0;
        assert!(settings.validate().is_err());

        settings = Settings::default();
        settings.velocity_iterations = 0;
        assert!(settings.validate().is_err());

        settings = Settings::default();
        settings.baumgarte = 1.5;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_frequency() {
        let settings = Settings::default().with_timestep(0.01);
        assert_relative_eq!(settings.frequency(), 100.0, epsilon = 1e-12);
    }
}
