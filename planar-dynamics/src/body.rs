//! Rigid bodies.

use nalgebra::{Point2, Vector2};
use planar_geometry::Aabb;
use planar_types::{BodyId, MassData, MassKind, PhysicsError, Transform, Velocity};

use crate::Fixture;

/// A force applied over a time window; retired in place once its
/// remaining time runs out.
#[derive(Debug, Clone, Copy)]
struct AppliedForce {
    force: Vector2<f64>,
    /// World-space application point; `None` applies at the center of
    /// mass.
    point: Option<Point2<f64>>,
    remaining: f64,
}

/// A torque applied over a time window.
#[derive(Debug, Clone, Copy)]
struct AppliedTorque {
    torque: f64,
    remaining: f64,
}

/// A rigid body: a transform, a velocity, a set of fixtures, and a mass.
///
/// Bodies are built up before being added to a world: attach fixtures,
/// compute the mass, then hand the body over. A body whose mass was never
/// computed cannot be stepped; the world refuses with
/// [`PhysicsError::MassUnset`].
///
/// The active flag and the sleep flag are orthogonal: an inactive body
/// (outside the world bounds) is skipped entirely; a sleeping body is
/// still collidable but costs nothing until something wakes it.
///
/// # Example
///
/// ```
/// use planar_dynamics::{Body, Fixture};
/// use planar_geometry::{Convex, Polygon};
/// use planar_types::MassKind;
///
/// let mut body = Body::new();
/// body.add_fixture(Fixture::new(Convex::from(
///     Polygon::rectangle(1.0, 1.0).unwrap(),
/// )));
/// body.set_mass_from_fixtures(MassKind::Normal).unwrap();
/// assert!(body.is_dynamic());
/// ```
#[derive(Debug, Clone)]
pub struct Body {
    pub(crate) id: BodyId,
    fixtures: Vec<Fixture>,
    next_fixture_id: u32,

    pub(crate) transform: Transform,
    initial_transform: Transform,
    /// Pose at the start of the current step; with `transform` it defines
    /// the swept motion for continuous collision detection.
    pub(crate) transform0: Transform,

    mass: Option<MassData>,
    pub(crate) velocity: Velocity,

    pub(crate) force: Vector2<f64>,
    pub(crate) torque: f64,
    applied_forces: Vec<AppliedForce>,
    applied_torques: Vec<AppliedTorque>,

    linear_damping: f64,
    angular_damping: f64,
    gravity_scale: f64,
    rotation_disc_radius: f64,

    auto_sleep: bool,
    pub(crate) asleep: bool,
    pub(crate) active: bool,
    pub(crate) on_island: bool,
    bullet: bool,
    pub(crate) sleep_time: f64,
    pub(crate) in_world: bool,

    user_data: u128,
}

impl Default for Body {
    fn default() -> Self {
        Self::new()
    }
}

impl Body {
    /// Create an empty body at the origin.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: BodyId::new(0),
            fixtures: Vec::with_capacity(1),
            next_fixture_id: 0,
            transform: Transform::identity(),
            initial_transform: Transform::identity(),
            transform0: Transform::identity(),
            mass: None,
            velocity: Velocity::zero(),
            force: Vector2::zeros(),
            torque: 0.0,
            applied_forces: Vec::new(),
            applied_torques: Vec::new(),
            linear_damping: 0.0,
            angular_damping: 0.01,
            gravity_scale: 1.0,
            rotation_disc_radius: 0.0,
            auto_sleep: true,
            asleep: false,
            active: true,
            on_island: false,
            bullet: false,
            sleep_time: 0.0,
            in_world: false,
            user_data: 0,
        }
    }

    /// The body's id (assigned when added to a world).
    #[must_use]
    pub fn id(&self) -> BodyId {
        self.id
    }

    // ------------------------------------------------------------------
    // Fixtures and mass
    // ------------------------------------------------------------------

    /// Attach a fixture, returning its id within this body.
    pub fn add_fixture(&mut self, mut fixture: Fixture) -> planar_types::FixtureId {
        let id = planar_types::FixtureId::new(self.next_fixture_id);
        self.next_fixture_id += 1;
        fixture.id = id;
        self.fixtures.push(fixture);
        id
    }

    /// Detach a fixture. The body's mass is stale afterwards; recompute it
    /// before stepping.
    pub fn remove_fixture(&mut self, id: planar_types::FixtureId) -> Option<Fixture> {
        let index = self.fixtures.iter().position(|f| f.id == id)?;
        Some(self.fixtures.remove(index))
    }

    /// The attached fixtures.
    #[must_use]
    pub fn fixtures(&self) -> &[Fixture] {
        &self.fixtures
    }

    /// Look up a fixture by id.
    #[must_use]
    pub fn fixture(&self, id: planar_types::FixtureId) -> Option<&Fixture> {
        self.fixtures.iter().find(|f| f.id == id)
    }

    /// Compute the body's mass from its fixtures, composed by the
    /// parallel-axis theorem, and refresh the rotation-disc radius.
    ///
    /// `kind` overrides how the composed mass participates in dynamics
    /// (e.g. [`MassKind::Infinite`] for a static body).
    pub fn set_mass_from_fixtures(&mut self, kind: MassKind) -> planar_types::Result<()> {
        if self.fixtures.is_empty() {
            return Err(PhysicsError::invalid_mass(
                "cannot compute mass for a body with no fixtures",
            ));
        }
        let masses: Vec<MassData> = self.fixtures.iter().map(Fixture::create_mass).collect();
        let mass = MassData::combine(&masses)?.with_kind(kind);
        self.set_mass(mass);
        Ok(())
    }

    /// Set the mass directly and refresh the rotation-disc radius.
    pub fn set_mass(&mut self, mass: MassData) {
        self.rotation_disc_radius = self
            .fixtures
            .iter()
            .map(|f| f.shape().radius_about(&mass.center))
            .fold(0.0, f64::max);
        self.mass = Some(mass);
    }

    /// The body's mass, if computed.
    #[must_use]
    pub fn mass(&self) -> Option<&MassData> {
        self.mass.as_ref()
    }

    /// Whether the body responds to forces.
    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.mass.as_ref().is_some_and(MassData::is_dynamic)
    }

    /// Whether the body is immovable.
    #[must_use]
    pub fn is_static(&self) -> bool {
        self.mass.as_ref().map_or(false, MassData::is_infinite)
    }

    /// Maximum distance from the center of mass to any fixture vertex;
    /// bounds the motion of any body point under rotation.
    #[must_use]
    pub fn rotation_disc_radius(&self) -> f64 {
        self.rotation_disc_radius
    }

    // ------------------------------------------------------------------
    // Transform and velocity
    // ------------------------------------------------------------------

    /// The current transform.
    #[must_use]
    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    /// The transform the body was created with.
    #[must_use]
    pub fn initial_transform(&self) -> &Transform {
        &self.initial_transform
    }

    /// Teleport the body. Wakes it.
    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
        self.transform0 = transform;
        if !self.in_world {
            self.initial_transform = transform;
        }
        self.wake();
    }

    /// The current velocity.
    #[must_use]
    pub fn velocity(&self) -> Velocity {
        self.velocity
    }

    /// Set the velocity. Wakes the body.
    pub fn set_velocity(&mut self, velocity: Velocity) {
        self.velocity = velocity;
        self.wake();
    }

    /// The center of mass in world coordinates (the transform position if
    /// the mass is unset).
    #[must_use]
    pub fn world_center(&self) -> Point2<f64> {
        match &self.mass {
            Some(mass) => self.transform.transform_point(&mass.center),
            None => self.transform.position,
        }
    }

    /// Transform a local point to world coordinates.
    #[must_use]
    pub fn world_point(&self, local: &Point2<f64>) -> Point2<f64> {
        self.transform.transform_point(local)
    }

    /// Transform a world point to local coordinates.
    #[must_use]
    pub fn local_point(&self, world: &Point2<f64>) -> Point2<f64> {
        self.transform.inverse_transform_point(world)
    }

    /// Transform a local vector to world coordinates.
    #[must_use]
    pub fn world_vector(&self, local: &Vector2<f64>) -> Vector2<f64> {
        self.transform.transform_vector(local)
    }

    /// Transform a world vector to local coordinates.
    #[must_use]
    pub fn local_vector(&self, world: &Vector2<f64>) -> Vector2<f64> {
        self.transform.inverse_transform_vector(world)
    }

    // ------------------------------------------------------------------
    // Forces and impulses
    // ------------------------------------------------------------------

    /// Apply a force at the center of mass for the next step.
    ///
    /// Wakes the body.
    pub fn apply_force(&mut self, force: Vector2<f64>) {
        self.apply_force_for(force, 0.0);
    }

    /// Apply a force at the center of mass for `duration` seconds of
    /// simulated time (zero means exactly one step).
    pub fn apply_force_for(&mut self, force: Vector2<f64>, duration: f64) {
        self.applied_forces.push(AppliedForce {
            force,
            point: None,
            remaining: duration.max(0.0),
        });
        self.wake();
    }

    /// Apply a force at a world-space point for the next step; the offset
    /// from the center of mass also produces torque.
    pub fn apply_force_at(&mut self, force: Vector2<f64>, point: Point2<f64>) {
        self.applied_forces.push(AppliedForce {
            force,
            point: Some(point),
            remaining: 0.0,
        });
        self.wake();
    }

    /// Apply a torque for the next step. Wakes the body.
    pub fn apply_torque(&mut self, torque: f64) {
        self.apply_torque_for(torque, 0.0);
    }

    /// Apply a torque for `duration` seconds of simulated time.
    pub fn apply_torque_for(&mut self, torque: f64, duration: f64) {
        self.applied_torques.push(AppliedTorque {
            torque,
            remaining: duration.max(0.0),
        });
        self.wake();
    }

    /// Apply a linear impulse at the center of mass, changing velocity
    /// immediately. Wakes the body.
    pub fn apply_impulse(&mut self, impulse: Vector2<f64>) {
        if let Some(mass) = &self.mass {
            self.velocity.linear += impulse * mass.inverse_mass();
            self.wake();
        }
    }

    /// Fold the time-scoped force/torque records into this step's force
    /// and torque, retiring expired records in place.
    pub(crate) fn accumulate(&mut self, dt: f64) {
        self.force = Vector2::zeros();
        self.torque = 0.0;

        let center = self.world_center();
        for entry in &mut self.applied_forces {
            self.force += entry.force;
            if let Some(point) = entry.point {
                let r = point - center;
                self.torque += r.x * entry.force.y - r.y * entry.force.x;
            }
            entry.remaining -= dt;
        }
        for entry in &mut self.applied_torques {
            self.torque += entry.torque;
            entry.remaining -= dt;
        }
        self.applied_forces.retain(|f| f.remaining > 0.0);
        self.applied_torques.retain(|t| t.remaining > 0.0);
    }

    /// Drop all pending force and torque records.
    pub fn clear_accumulators(&mut self) {
        self.force = Vector2::zeros();
        self.torque = 0.0;
        self.applied_forces.clear();
        self.applied_torques.clear();
    }

    // ------------------------------------------------------------------
    // Damping and gravity scale
    // ------------------------------------------------------------------

    /// The linear damping coefficient.
    #[must_use]
    pub fn linear_damping(&self) -> f64 {
        self.linear_damping
    }

    /// Set linear damping; must be ≥ 0 (0 disables damping).
    pub fn set_linear_damping(&mut self, damping: f64) -> planar_types::Result<()> {
        if !damping.is_finite() || damping < 0.0 {
            return Err(PhysicsError::InvalidCoefficient {
                name: "linear damping",
                value: damping,
            });
        }
        self.linear_damping = damping;
        Ok(())
    }

    /// The angular damping coefficient.
    #[must_use]
    pub fn angular_damping(&self) -> f64 {
        self.angular_damping
    }

    /// Set angular damping; must be ≥ 0 (0 disables damping).
    pub fn set_angular_damping(&mut self, damping: f64) -> planar_types::Result<()> {
        if !damping.is_finite() || damping < 0.0 {
            return Err(PhysicsError::InvalidCoefficient {
                name: "angular damping",
                value: damping,
            });
        }
        self.angular_damping = damping;
        Ok(())
    }

    /// How strongly world gravity affects this body (1 = normal).
    #[must_use]
    pub fn gravity_scale(&self) -> f64 {
        self.gravity_scale
    }

    /// Set the gravity scale.
    pub fn set_gravity_scale(&mut self, scale: f64) -> planar_types::Result<()> {
        if !scale.is_finite() {
            return Err(PhysicsError::NonFiniteParameter {
                name: "gravity scale",
            });
        }
        self.gravity_scale = scale;
        Ok(())
    }

    // ------------------------------------------------------------------
    // State flags
    // ------------------------------------------------------------------

    /// Whether the body is asleep.
    #[must_use]
    pub fn is_asleep(&self) -> bool {
        self.asleep
    }

    /// Put the body to sleep (zeroing velocity and accumulators) or wake
    /// it.
    pub fn set_asleep(&mut self, asleep: bool) {
        if asleep {
            self.asleep = true;
            self.velocity = Velocity::zero();
            self.clear_accumulators();
        } else {
            self.wake();
        }
    }

    /// Wake the body and reset its sleep timer.
    pub fn wake(&mut self) {
        self.asleep = false;
        self.sleep_time = 0.0;
    }

    /// Whether automatic sleeping is allowed for this body.
    #[must_use]
    pub fn auto_sleep(&self) -> bool {
        self.auto_sleep
    }

    /// Allow or forbid automatic sleeping.
    pub fn set_auto_sleep(&mut self, allowed: bool) {
        self.auto_sleep = allowed;
        if !allowed {
            self.wake();
        }
    }

    /// Whether the body is active (inside bounds and simulating).
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Activate or deactivate the body. Bodies deactivated by a bounds
    /// exit stay inactive until reactivated here.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
        if active {
            self.wake();
        }
    }

    /// Whether the body is flagged for continuous collision detection.
    #[must_use]
    pub fn is_bullet(&self) -> bool {
        self.bullet
    }

    /// Flag the body for continuous collision detection.
    pub fn set_bullet(&mut self, bullet: bool) {
        self.bullet = bullet;
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

    // ------------------------------------------------------------------
    // Geometry queries
    // ------------------------------------------------------------------

    /// The union of all fixture AABBs at the current transform.
    #[must_use]
    pub fn create_aabb(&self) -> Option<Aabb> {
        self.aabb_at(&self.transform)
    }

    /// The union of all fixture AABBs at a given transform.
    #[must_use]
    pub fn aabb_at(&self, transform: &Transform) -> Option<Aabb> {
        let mut fixtures = self.fixtures.iter();
        let first = fixtures.next()?.shape().create_aabb(transform);
        Some(fixtures.fold(first, |aabb, f| aabb.union(&f.shape().create_aabb(transform))))
    }

    /// The AABB swept from the step-start pose to the current pose,
    /// inflated by the rotation-disc radius.
    #[must_use]
    pub fn swept_aabb(&self) -> Option<Aabb> {
        let start = self.aabb_at(&self.transform0)?;
        let end = self.aabb_at(&self.transform)?;
        Some(start.union(&end).expanded(self.rotation_disc_radius))
    }

    /// Kinetic energy of the body (zero if the mass is unset).
    #[must_use]
    pub fn kinetic_energy(&self) -> f64 {
        self.mass.as_ref().map_or(0.0, |mass| {
            self.velocity.kinetic_energy(mass.mass, mass.inertia)
        })
    }

    /// Whether the body's state is free of `NaN`/`Inf`.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.transform.is_finite() && self.velocity.is_finite()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use planar_geometry::{Circle, Convex, Polygon};

    fn boxed_body() -> Body {
        let mut body = Body::new();
        body.add_fixture(Fixture::new(Convex::from(
            Polygon::rectangle(1.0, 1.0).unwrap(),
        )));
        body.set_mass_from_fixtures(MassKind::Normal).unwrap();
        body
    }

    #[test]
    fn test_mass_requires_fixtures() {
        let mut empty = Body::new();
        assert!(empty.set_mass_from_fixtures(MassKind::Normal).is_err());
        assert!(empty.mass().is_none());
    }

    #[test]
    fn test_mass_composition_of_two_fixtures() {
        let mut body = Body::new();
        let left = Circle::at(Point2::new(-1.0, 0.0), 0.5).unwrap();
        let right = Circle::at(Point2::new(1.0, 0.0), 0.5).unwrap();

        body.add_fixture(Fixture::new(Convex::from(left)));
        body.add_fixture(Fixture::new(Convex::from(right)));
        body.set_mass_from_fixtures(MassKind::Normal).unwrap();

        let mass = body.mass().unwrap();
        assert_relative_eq!(mass.center.x, 0.0, epsilon = 1e-12);
        // Parallel axis: 2 * (I_circle + m * 1^2)
        let circle_mass = Circle::new(0.5).unwrap().create_mass(1.0);
        let expected = 2.0 * (circle_mass.inertia + circle_mass.mass);
        assert_relative_eq!(mass.inertia, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_static_body_kind() {
        let mut body = boxed_body();
        body.set_mass_from_fixtures(MassKind::Infinite).unwrap();
        assert!(body.is_static());
        assert!(!body.is_dynamic());
    }

    #[test]
    fn test_rotation_disc_radius() {
        let body = boxed_body();
        assert_relative_eq!(
            body.rotation_disc_radius(),
            0.5_f64.hypot(0.5),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_force_accumulation_and_retirement() {
        let mut body = boxed_body();
        body.apply_force(Vector2::new(1.0, 0.0));
        body.apply_force_for(Vector2::new(0.0, 2.0), 0.05);

        let dt = 1.0 / 60.0;
        body.accumulate(dt);
        assert_relative_eq!(body.force.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(body.force.y, 2.0, epsilon = 1e-12);

        // One-shot force retires after a single step; the timed force
        // survives until its window runs out.
        body.accumulate(dt);
        assert_relative_eq!(body.force.x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(body.force.y, 2.0, epsilon = 1e-12);

        body.accumulate(dt);
        body.accumulate(dt);
        assert_relative_eq!(body.force.y, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_offset_force_produces_torque() {
        let mut body = boxed_body();
        body.apply_force_at(Vector2::new(0.0, 1.0), Point2::new(1.0, 0.0));
        body.accumulate(1.0 / 60.0);

        assert_relative_eq!(body.torque, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_sleep_zeroes_velocity() {
        let mut body = boxed_body();
        body.set_velocity(Velocity::linear(Vector2::new(1.0, 0.0)));
        body.apply_force(Vector2::new(5.0, 0.0));

        body.set_asleep(true);
        assert!(body.is_asleep());
        assert_eq!(body.velocity(), Velocity::zero());

        body.accumulate(1.0 / 60.0);
        assert_relative_eq!(body.force.norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_world_local_round_trip() {
        let mut body = boxed_body();
        body.set_transform(Transform::from_position_angle(Point2::new(3.0, -1.0), 0.7));

        let p = Point2::new(0.3, 1.8);
        let round = body.world_point(&body.local_point(&p));
        assert!((round - p).norm() < 1e-12);
    }

    #[test]
    fn test_aabb_union_of_fixtures() {
        let mut body = Body::new();
        body.add_fixture(Fixture::new(Convex::from(
            Circle::at(Point2::new(-1.0, 0.0), 0.5).unwrap(),
        )));
        body.add_fixture(Fixture::new(Convex::from(
            Circle::at(Point2::new(1.0, 0.0), 0.5).unwrap(),
        )));

        let aabb = body.create_aabb().unwrap();
        assert_relative_eq!(aabb.min.x, -1.5, epsilon = 1e-12);
        assert_relative_eq!(aabb.max.x, 1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_impulse_wakes_and_moves() {
        let mut body = boxed_body();
        body.set_asleep(true);

        body.apply_impulse(Vector2::new(2.0, 0.0));
        assert!(!body.is_asleep());
        assert_relative_eq!(body.velocity().linear.x, 2.0, epsilon = 1e-12);
    }
}
