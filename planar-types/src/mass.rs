//! Mass, rotational inertia, and mass composition.

use nalgebra::Point2;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::PhysicsError;

/// How a body's mass participates in dynamics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MassKind {
    /// Finite mass and inertia; fully dynamic.
    #[default]
    Normal,
    /// Infinite mass and inertia; the body never moves in response to
    /// forces or impulses (static bodies).
    Infinite,
    /// Infinite mass but finite inertia; the body can spin but not
    /// translate.
    FixedLinear,
    /// Finite mass but infinite inertia; the body can translate but not
    /// spin.
    FixedAngular,
}

/// Mass, center of mass, and rotational inertia of a body.
///
/// The center is expressed in the body's local frame. The inertia is taken
/// about the center of mass.
///
/// # Example
///
/// ```
/// use planar_types::{MassData, MassKind};
/// use nalgebra::Point2;
///
/// let mass = MassData::new(Point2::origin(), 2.0, 0.5).unwrap();
/// assert_eq!(mass.inverse_mass(), 0.5);
/// assert!(mass.is_dynamic());
///
/// let frozen = mass.with_kind(MassKind::Infinite);
/// assert_eq!(frozen.inverse_mass(), 0.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MassData {
    /// Center of mass in the body's local frame.
    pub center: Point2<f64>,
    /// Mass in kg.
    pub mass: f64,
    /// Rotational inertia about the center of mass (kg·m²).
    pub inertia: f64,
    /// How the mass participates in dynamics.
    pub kind: MassKind,
}

impl MassData {
    /// Create mass data with the given center, mass, and inertia.
    ///
    /// Mass and inertia must be finite and non-negative; the kind is
    /// [`MassKind::Normal`] unless both are zero, in which case the mass is
    /// infinite (matching a zero-density degenerate input never reaching
    /// here in practice).
    pub fn new(center: Point2<f64>, mass: f64, inertia: f64) -> crate::Result<Self> {
        if !mass.is_finite() || mass < 0.0 {
            return Err(PhysicsError::invalid_mass("mass must be finite and non-negative"));
        }
        if !inertia.is_finite() || inertia < 0.0 {
            return Err(PhysicsError::invalid_mass(
                "inertia must be finite and non-negative",
            ));
        }
        if !center.coords.iter().all(|x| x.is_finite()) {
            return Err(PhysicsError::invalid_mass("center of mass must be finite"));
        }

        let kind = if mass == 0.0 && inertia == 0.0 {
            MassKind::Infinite
        } else {
            MassKind::Normal
        };

        Ok(Self {
            center,
            mass,
            inertia,
            kind,
        })
    }

    /// Create an infinite mass centered at the given point.
    #[must_use]
    pub fn infinite(center: Point2<f64>) -> Self {
        Self {
            center,
            mass: 0.0,
            inertia: 0.0,
            kind: MassKind::Infinite,
        }
    }

    /// Return a copy with the given kind.
    #[must_use]
    pub fn with_kind(mut self, kind: MassKind) -> Self {
        self.kind = kind;
        self
    }

    /// Get the inverse mass, honoring the mass kind.
    #[must_use]
    pub fn inverse_mass(&self) -> f64 {
        match self.kind {
            MassKind::Normal | MassKind::FixedAngular if self.mass > 0.0 => 1.0 / self.mass,
            _ => 0.0,
        }
    }

    /// Get the inverse rotational inertia, honoring the mass kind.
    #[must_use]
    pub fn inverse_inertia(&self) -> f64 {
        match self.kind {
            MassKind::Normal | MassKind::FixedLinear if self.inertia > 0.0 => 1.0 / self.inertia,
            _ => 0.0,
        }
    }

    /// Whether the body responds to forces at all.
    ///
    /// A body is dynamic iff its mass is finite and positive in at least
    /// one degree of freedom.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.inverse_mass() > 0.0 || self.inverse_inertia() > 0.0
    }

    /// Whether this mass is infinite in every degree of freedom.
    #[must_use]
    pub fn is_infinite(&self) -> bool {
        !self.is_dynamic()
    }

    /// Combine per-fixture masses into a composite body mass.
    ///
    /// The composite center is the mass-weighted centroid and the composite
    /// inertia applies the parallel-axis theorem:
    ///
    /// ```text
    /// I = Σ (Iᵢ + mᵢ·|cᵢ − c|²)
    /// ```
    ///
    /// Combination is associative: combining in any grouping yields the
    /// same composite.
    pub fn combine(masses: &[Self]) -> crate::Result<Self> {
        if masses.is_empty() {
            return Err(PhysicsError::invalid_mass(
                "cannot combine an empty set of masses",
            ));
        }
        if masses.len() == 1 {
            return Ok(masses[0]);
        }

        let total_mass: f64 = masses.iter().map(|m| m.mass).sum();
        if total_mass <= 0.0 {
            // All constituents are massless; the composite is immovable at
            // the average of the centers.
            let n = masses.len() as f64;
            let center = masses
                .iter()
                .fold(Point2::origin(), |acc: Point2<f64>, m| acc + m.center.coords)
                / n;
            return Ok(Self::infinite(center));
        }

        let center: Point2<f64> = Point2::from(
            masses
                .iter()
                .map(|m| m.center.coords * m.mass)
                .sum::<nalgebra::Vector2<f64>>()
                / total_mass,
        );

        let inertia: f64 = masses
            .iter()
            .map(|m| m.inertia + m.mass * (m.center - center).norm_squared())
            .sum();

        Self::new(center, total_mass, inertia)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_new_rejects_bad_input() {
        assert!(MassData::new(Point2::origin(), -1.0, 1.0).is_err());
        assert!(MassData::new(Point2::origin(), 1.0, f64::NAN).is_err());
        assert!(MassData::new(Point2::new(f64::INFINITY, 0.0), 1.0, 1.0).is_err());
    }

    #[test]
    fn test_kinds() {
        let mass = MassData::new(Point2::origin(), 4.0, 2.0).unwrap();

        assert_eq!(mass.inverse_mass(), 0.25);
        assert_eq!(mass.inverse_inertia(), 0.5);

        let linear_only = mass.with_kind(MassKind::FixedAngular);
        assert_eq!(linear_only.inverse_mass(), 0.25);
        assert_eq!(linear_only.inverse_inertia(), 0.0);

        let angular_only = mass.with_kind(MassKind::FixedLinear);
        assert_eq!(angular_only.inverse_mass(), 0.0);
        assert_eq!(angular_only.inverse_inertia(), 0.5);

        let frozen = mass.with_kind(MassKind::Infinite);
        assert!(frozen.is_infinite());
    }

    #[test]
    fn test_combine_two_point_masses() {
        // Two equal point masses a meter apart: center in the middle,
        // inertia 2 * m * (0.5)^2.
        let a = MassData::new(Point2::new(0.0, 0.0), 1.0, 0.0).unwrap();
        let b = MassData::new(Point2::new(1.0, 0.0), 1.0, 0.0).unwrap();

        let combined = MassData::combine(&[a, b]).unwrap();
        assert_relative_eq!(combined.center.x, 0.5, epsilon = 1e-12);
        assert_relative_eq!(combined.mass, 2.0, epsilon = 1e-12);
        assert_relative_eq!(combined.inertia, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_combine_is_associative() {
        let a = MassData::new(Point2::new(0.0, 0.0), 1.0, 0.2).unwrap();
        let b = MassData::new(Point2::new(2.0, 0.0), 3.0, 0.1).unwrap();
        let c = MassData::new(Point2::new(0.0, -1.0), 0.5, 0.05).unwrap();

        let left = MassData::combine(&[MassData::combine(&[a, b]).unwrap(), c]).unwrap();
        let right = MassData::combine(&[a, MassData::combine(&[b, c]).unwrap()]).unwrap();
        let flat = MassData::combine(&[a, b, c]).unwrap();

        assert_relative_eq!(left.center.coords, right.center.coords, epsilon = 1e-12);
        assert_relative_eq!(left.mass, right.mass, epsilon = 1e-12);
        assert_relative_eq!(left.inertia, right.inertia, epsilon = 1e-12);
        assert_relative_eq!(flat.inertia, left.inertia, epsilon = 1e-12);
    }

    #[test]
    fn test_combine_empty_fails() {
        assert!(MassData::combine(&[]).is_err());
    }

    #[test]
    fn test_combine_all_infinite() {
        let a = MassData::infinite(Point2::new(0.0, 0.0));
        let b = MassData::infinite(Point2::new(2.0, 0.0));

        let combined = MassData::combine(&[a, b]).unwrap();
        assert!(combined.is_infinite());
        assert_relative_eq!(combined.center.x, 1.0, epsilon = 1e-12);
    }
}
