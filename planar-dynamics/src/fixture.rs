//! Fixtures: a shape plus its material and filtering data.

use planar_collision::CollisionFilter;
use planar_geometry::Convex;
use planar_types::{FixtureId, MassData, PhysicsError};

/// A shape attached to a body, with density, surface material, and
/// collision filtering.
///
/// Sensors participate in collision detection and fire contact events but
/// are never resolved: other bodies pass through them.
///
/// # Example
///
/// ```
/// use planar_dynamics::Fixture;
/// use planar_geometry::{Convex, Polygon};
///
/// let fixture = Fixture::new(Convex::from(Polygon::rectangle(1.0, 1.0).unwrap()))
///     .with_density(2.0)
///     .unwrap()
///     .with_friction(0.4)
///     .unwrap();
/// assert_eq!(fixture.density(), 2.0);
/// ```
#[derive(Debug, Clone)]
pub struct Fixture {
    pub(crate) id: FixtureId,
    shape: Convex,
    density: f64,
    friction: f64,
    restitution: f64,
    sensor: bool,
    filter: CollisionFilter,
    user_data: u128,
}

impl Fixture {
    /// Default fixture density (kg/m²).
    pub const DEFAULT_DENSITY: f64 = 1.0;
    /// Default coefficient of friction.
    pub const DEFAULT_FRICTION: f64 = 0.2;
    /// Default coefficient of restitution.
    pub const DEFAULT_RESTITUTION: f64 = 0.0;

    /// Create a fixture with default material properties.
    #[must_use]
    pub fn new(shape: Convex) -> Self {
        Self {
            id: FixtureId::new(0),
            shape,
            density: Self::DEFAULT_DENSITY,
            friction: Self::DEFAULT_FRICTION,
            restitution: Self::DEFAULT_RESTITUTION,
            sensor: false,
            filter: CollisionFilter::default(),
            user_data: 0,
        }
    }

    /// The fixture's id within its body (assigned when attached).
    #[must_use]
    pub fn id(&self) -> FixtureId {
        self.id
    }

    /// The collision shape.
    #[must_use]
    pub fn shape(&self) -> &Convex {
        &self.shape
    }

    /// The density (kg/m²).
    #[must_use]
    pub fn density(&self) -> f64 {
        self.density
    }

    /// Set the density; must be positive and finite.
    pub fn set_density(&mut self, density: f64) -> planar_types::Result<()> {
        if !density.is_finite() {
            return Err(PhysicsError::NonFiniteParameter { name: "density" });
        }
        if density <= 0.0 {
            return Err(PhysicsError::NonPositiveDensity(density));
        }
        self.density = density;
        Ok(())
    }

    /// Builder form of [`Fixture::set_density`].
    pub fn with_density(mut self, density: f64) -> planar_types::Result<Self> {
        self.set_density(density)?;
        Ok(self)
    }

    /// The coefficient of friction.
    #[must_use]
    pub fn friction(&self) -> f64 {
        self.friction
    }

    /// Set the coefficient of friction; must lie in `[0, 1]`.
    pub fn set_friction(&mut self, friction: f64) -> planar_types::Result<()> {
        if !(0.0..=1.0).contains(&friction) {
            return Err(PhysicsError::InvalidCoefficient {
                name: "friction",
                value: friction,
            });
        }
        self.friction = friction;
        Ok(())
    }

    /// Builder form of [`Fixture::set_friction`].
    pub fn with_friction(mut self, friction: f64) -> planar_types::Result<Self> {
        self.set_friction(friction)?;
        Ok(self)
    }

    /// The coefficient of restitution.
    #[must_use]
    pub fn restitution(&self) -> f64 {
        self.restitution
    }

    /// Set the coefficient of restitution; must lie in `[0, 1]`.
    pub fn set_restitution(&mut self, restitution: f64) -> planar_types::Result<()> {
        if !(0.0..=1.0).contains(&restitution) {
            return Err(PhysicsError::InvalidCoefficient {
                name: "restitution",
                value: restitution,
            });
        }
        self.restitution = restitution;
        Ok(())
    }

    /// Builder form of [`Fixture::set_restitution`].
    pub fn with_restitution(mut self, restitution: f64) -> planar_types::Result<Self> {
        self.set_restitution(restitution)?;
        Ok(self)
    }

    /// Whether this fixture is a sensor.
    #[must_use]
    pub fn is_sensor(&self) -> bool {
        self.sensor
    }

    /// Make this fixture a sensor (detected, never resolved).
    #[must_use]
    pub fn as_sensor(mut self) -> Self {
        self.sensor = true;
        self
    }

    /// The collision filter.
    #[must_use]
    pub fn filter(&self) -> CollisionFilter {
        self.filter
    }

    /// Set the collision filter.
    pub fn set_filter(&mut self, filter: CollisionFilter) {
        self.filter = filter;
    }

    /// Builder form of [`Fixture::set_filter`].
    #[must_use]
    pub fn with_filter(mut self, filter: CollisionFilter) -> Self {
        self.filter = filter;
        self
    }

    /// The user-data slot.
    #[must_use]
    pub fn user_data(&self) -> u128 {
        self.user_data
    }

    /// Set the user-data slot.
    pub fn set_user_data(&mut self, data: u128) {
        self.user_data = data;
    }

    /// Compute this fixture's mass from its shape and density.
    #[must_use]
    pub fn create_mass(&self) -> MassData {
        self.shape.create_mass(self.density)
    }
}
