//! The world: bodies, joints, and the step loop.

use std::collections::BTreeMap;

use nalgebra::{Point2, Vector2};
use planar_collision::raycast::raycast as shape_raycast;
use planar_collision::{
    BroadPhase, BroadPhaseDetector, ClippingManifoldSolver,
    CollisionFilter, Gjk, ManifoldPointId, Proxy, Ray, RaycastHit,
};
use planar_geometry::Aabb;
use planar_joint::Joint;
use planar_types::{BodyId, FixtureKey, JointId, PhysicsError, Settings, Transform, Velocity};
use tracing::{debug, warn};

use crate::ccd::{resolve_impact, sweep_transform, time_of_impact};
use crate::contact::{mix_friction, mix_restitution, ContactLife};
use crate::events::{
    ContactEvent, ContactPair, Destroyed, Listeners, SolverWarning, StepEvent,
};
use crate::island::build_islands;
use crate::solver::solve_island;
use crate::{Body, Bounds, ContactManager};

/// A raycast hit attributed to its fixture.
#[derive(Debug, Clone, Copy)]
pub struct RaycastResult {
    /// The fixture that was hit.
    pub fixture: FixtureKey,
    /// The hit data.
    pub hit: RaycastHit,
}

/// Per-body state snapshot for an external renderer.
#[derive(Debug)]
pub struct BodyDebugView<'a> {
    /// The body id.
    pub id: BodyId,
    /// World transform.
    pub transform: Transform,
    /// Each fixture's shape (local coordinates within the body).
    pub shapes: Vec<&'a planar_geometry::Convex>,
    /// Center of mass in world coordinates.
    pub world_center: Point2<f64>,
    /// The body's AABB, if it has fixtures.
    pub aabb: Option<Aabb>,
    /// Active flag.
    pub active: bool,
    /// Asleep flag.
    pub asleep: bool,
    /// Bullet flag.
    pub bullet: bool,
}

/// Per-contact-point snapshot for an external renderer.
#[derive(Debug, Clone, Copy)]
pub struct ContactDebugView {
    /// The fixture pair.
    pub pair: ContactPair,
    /// World-space contact point.
    pub point: Point2<f64>,
    /// Contact normal (from the second body toward the first).
    pub normal: Vector2<f64>,
    /// Penetration depth at detection time.
    pub depth: f64,
    /// Stable point identity.
    pub id: ManifoldPointId,
}

/// A mutation requested mid-step, applied at the step boundary.
enum PendingOp {
    AddBody(Box<Body>),
    RemoveBody(BodyId),
    AddJoint(JointId, Box<dyn Joint>),
    RemoveJoint(JointId),
}

/// The simulation world.
///
/// Owns bodies, joints, and contacts in arenas keyed by stable handles;
/// all cross-references go through those handles, so the cyclic
/// body/contact/joint graph involves no shared ownership.
///
/// # Example
///
/// ```
/// use planar_dynamics::{Body, Bounds, Fixture, World};
/// use planar_geometry::{Convex, Polygon};
/// use planar_types::{MassKind, Settings, Transform};
/// use nalgebra::Point2;
///
/// let mut world = World::new(Bounds::rectangle(40.0, 40.0), Settings::default()).unwrap();
///
/// let mut floor = Body::new();
/// floor.add_fixture(Fixture::new(Convex::from(Polygon::rectangle(20.0, 1.0).unwrap())));
/// floor.set_mass_from_fixtures(MassKind::Infinite).unwrap();
/// world.add_body(floor).unwrap();
///
/// let mut crate_body = Body::new();
/// crate_body.add_fixture(Fixture::new(Convex::from(Polygon::rectangle(1.0, 1.0).unwrap())));
/// crate_body.set_mass_from_fixtures(MassKind::Normal).unwrap();
/// crate_body.set_transform(Transform::from_position(Point2::new(0.0, 5.0)));
/// let falling = world.add_body(crate_body).unwrap();
///
/// for _ in 0..60 {
///     world.step(1.0 / 60.0).unwrap();
/// }
/// assert!(world.body(falling).unwrap().transform().position.y < 5.0);
/// ```
pub struct World {
    bodies: BTreeMap<BodyId, Body>,
    joints: BTreeMap<JointId, Box<dyn Joint>>,

    gravity: Vector2<f64>,
    bounds: Bounds,
    settings: Settings,

    broad_phase: BroadPhaseDetector,
    gjk: Gjk,
    manifold_solver: ClippingManifoldSolver,
    contacts: ContactManager,
    listeners: Listeners,

    step_count: u64,
    time: f64,
    accumulator: f64,
    next_body_id: u64,
    next_joint_id: u64,
    in_step: bool,
    pending: Vec<PendingOp>,
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("bodies", &self.bodies.len())
            .field("joints", &self.joints.len())
            .field("contacts", &self.contacts.len())
            .field("gravity", &self.gravity)
            .field("step_count", &self.step_count)
            .finish_non_exhaustive()
    }
}

impl World {
    /// Earth gravity, pointing down.
    pub const EARTH_GRAVITY: Vector2<f64> = Vector2::new(0.0, -9.81);

    /// Create a world with the given bounds and settings.
    pub fn new(bounds: Bounds, settings: Settings) -> planar_types::Result<Self> {
        settings.validate()?;
        Ok(Self {
            bodies: BTreeMap::new(),
            joints: BTreeMap::new(),
            gravity: Self::EARTH_GRAVITY,
            bounds,
            settings,
            broad_phase: BroadPhaseDetector::default(),
            gjk: Gjk::new(),
            manifold_solver: ClippingManifoldSolver::new(),
            contacts: ContactManager::new(),
            listeners: Listeners::default(),
            step_count: 0,
            time: 0.0,
            accumulator: 0.0,
            next_body_id: 1,
            next_joint_id: 1,
            in_step: false,
            pending: Vec::new(),
        })
    }

    // ------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------

    /// The gravity vector.
    #[must_use]
    pub fn gravity(&self) -> Vector2<f64> {
        self.gravity
    }

    /// Set the gravity vector.
    pub fn set_gravity(&mut self, gravity: Vector2<f64>) -> planar_types::Result<()> {
        if !gravity.iter().all(|x| x.is_finite()) {
            return Err(PhysicsError::NonFiniteParameter { name: "gravity" });
        }
        self.gravity = gravity;
        Ok(())
    }

    /// The world bounds.
    #[must_use]
    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Replace the world bounds.
    pub fn set_bounds(&mut self, bounds: Bounds) {
        self.bounds = bounds;
    }

    /// The settings.
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Replace the settings.
    pub fn set_settings(&mut self, settings: Settings) -> planar_types::Result<()> {
        settings.validate()?;
        self.settings = settings;
        Ok(())
    }

    /// The listener record; register callbacks on it directly.
    pub fn listeners_mut(&mut self) -> &mut Listeners {
        &mut self.listeners
    }

    // ------------------------------------------------------------------
    // Bodies and joints
    // ------------------------------------------------------------------

    /// Add a body, returning its id.
    ///
    /// Mid-step calls are buffered and applied at the step boundary; the
    /// returned id is valid either way.
    pub fn add_body(&mut self, mut body: Body) -> planar_types::Result<BodyId> {
        if body.in_world {
            return Err(PhysicsError::BodyAlreadyInWorld(body.id));
        }
        let id = BodyId::new(self.next_body_id);
        self.next_body_id += 1;
        body.id = id;
        body.in_world = true;
        body.transform0 = body.transform;

        if self.in_step {
            self.pending.push(PendingOp::AddBody(Box::new(body)));
        } else {
            self.insert_body(body);
        }
        Ok(id)
    }

    fn insert_body(&mut self, body: Body) {
        let id = body.id;
        self.sync_body_proxies(&body);
        self.bodies.insert(id, body);
    }

    /// Remove a body: severs its contacts and joints, removes its
    /// broad-phase entries, and fires destruction events.
    ///
    /// Mid-step calls are buffered and applied at the step boundary.
    pub fn remove_body(&mut self, id: BodyId) -> planar_types::Result<()> {
        if !self.bodies.contains_key(&id) {
            return Err(PhysicsError::BodyNotInWorld(id));
        }
        if self.in_step {
            self.pending.push(PendingOp::RemoveBody(id));
            return Ok(());
        }
        self.destroy_body(id);
        Ok(())
    }

    fn destroy_body(&mut self, id: BodyId) {
        let Some(mut body) = self.bodies.remove(&id) else {
            return;
        };
        body.in_world = false;

        for fixture in body.fixtures() {
            self.broad_phase.remove(&FixtureKey::new(id, fixture.id()));
        }

        // Sever contacts.
        let severed = self.contacts.remove_body(id);
        let mut listeners = std::mem::take(&mut self.listeners);
        for contact in severed {
            if let Some(callback) = &mut listeners.destroyed {
                callback(&Destroyed::Contact(
                    contact.pair.fixture1,
                    contact.pair.fixture2,
                ));
            }
            // The surviving body is woken: its support just vanished.
            let (b1, b2) = contact.pair.bodies();
            let other = if b1 == id { b2 } else { b1 };
            if let Some(other_body) = self.bodies.get_mut(&other) {
                other_body.wake();
            }
        }

        // Sever joints.
        let joint_ids: Vec<JointId> = self
            .joints
            .iter()
            .filter(|(_, joint)| joint.body1() == id || joint.body2() == id)
            .map(|(jid, _)| *jid)
            .collect();
        for jid in joint_ids {
            if let Some(joint) = self.joints.remove(&jid) {
                if let Some(callback) = &mut listeners.destroyed {
                    callback(&Destroyed::Joint(jid));
                }
                let other = if joint.body1() == id {
                    joint.body2()
                } else {
                    joint.body1()
                };
                if let Some(other_body) = self.bodies.get_mut(&other) {
                    other_body.wake();
                }
            }
        }

        if let Some(callback) = &mut listeners.destroyed {
            callback(&Destroyed::Body(id));
        }
        self.listeners = listeners;
    }

    /// Add a joint, returning its id. Both bodies must already be in this
    /// world. Wakes both bodies.
    pub fn add_joint<J: Joint + 'static>(&mut self, joint: J) -> planar_types::Result<JointId> {
        let id = JointId::new(self.next_joint_id);
        if !self.bodies.contains_key(&joint.body1()) || !self.bodies.contains_key(&joint.body2())
        {
            return Err(PhysicsError::JointBodiesNotInWorld(id));
        }
        self.next_joint_id += 1;

        for body_id in [joint.body1(), joint.body2()] {
            if let Some(body) = self.bodies.get_mut(&body_id) {
                body.wake();
            }
        }

        if self.in_step {
            self.pending.push(PendingOp::AddJoint(id, Box::new(joint)));
        } else {
            self.joints.insert(id, Box::new(joint));
        }
        Ok(id)
    }

    /// Remove a joint, waking both of its bodies.
    pub fn remove_joint(&mut self, id: JointId) -> planar_types::Result<()> {
        if !self.joints.contains_key(&id) {
            return Err(PhysicsError::JointNotInWorld(id));
        }
        if self.in_step {
            self.pending.push(PendingOp::RemoveJoint(id));
            return Ok(());
        }
        self.destroy_joint(id);
        Ok(())
    }

    fn destroy_joint(&mut self, id: JointId) {
        if let Some(joint) = self.joints.remove(&id) {
            for body_id in [joint.body1(), joint.body2()] {
                if let Some(body) = self.bodies.get_mut(&body_id) {
                    body.wake();
                }
            }
            let mut listeners = std::mem::take(&mut self.listeners);
            if let Some(callback) = &mut listeners.destroyed {
                callback(&Destroyed::Joint(id));
            }
            self.listeners = listeners;
        }
    }

    fn apply_pending(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        for op in pending {
            match op {
                PendingOp::AddBody(body) => self.insert_body(*body),
                PendingOp::RemoveBody(id) => self.destroy_body(id),
                PendingOp::AddJoint(id, joint) => {
                    self.joints.insert(id, joint);
                }
                PendingOp::RemoveJoint(id) => self.destroy_joint(id),
            }
        }
    }

    // ------------------------------------------------------------------
    // Access
    // ------------------------------------------------------------------

    /// Look up a body.
    #[must_use]
    pub fn body(&self, id: BodyId) -> Option<&Body> {
        self.bodies.get(&id)
    }

    /// Mutable body lookup.
    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        self.bodies.get_mut(&id)
    }

    /// Iterate over all bodies.
    pub fn bodies(&self) -> impl Iterator<Item = &Body> {
        self.bodies.values()
    }

    /// Number of bodies.
    #[must_use]
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Look up a joint.
    #[must_use]
    pub fn joint(&self, id: JointId) -> Option<&dyn Joint> {
        self.joints.get(&id).map(AsRef::as_ref)
    }

    /// Mutable joint lookup.
    pub fn joint_mut(&mut self, id: JointId) -> Option<&mut (dyn Joint + 'static)> {
        self.joints.get_mut(&id).map(AsMut::as_mut)
    }

    /// Iterate over all joints.
    pub fn joints(&self) -> impl Iterator<Item = (JointId, &dyn Joint)> {
        self.joints.iter().map(|(id, joint)| (*id, joint.as_ref()))
    }

    /// Number of joints.
    #[must_use]
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Iterate over the live contacts.
    pub fn contacts(&self) -> impl Iterator<Item = &crate::Contact> {
        self.contacts.iter()
    }

    /// Whether two bodies currently share a contact.
    #[must_use]
    pub fn is_in_contact(&self, body1: BodyId, body2: BodyId) -> bool {
        self.contacts.bodies_in_contact(body1, body2)
    }

    /// All bodies joined to the given body by a joint.
    #[must_use]
    pub fn joined_bodies(&self, id: BodyId) -> Vec<BodyId> {
        let mut joined: Vec<BodyId> = self
            .joints
            .values()
            .filter_map(|joint| {
                if joint.body1() == id && joint.body2() != id {
                    Some(joint.body2())
                } else if joint.body2() == id && joint.body1() != id {
                    Some(joint.body1())
                } else {
                    None
                }
            })
            .collect();
        joined.sort();
        joined.dedup();
        joined
    }

    /// Total kinetic energy of all bodies.
    #[must_use]
    pub fn kinetic_energy(&self) -> f64 {
        self.bodies.values().map(Body::kinetic_energy).sum()
    }

    /// Simulated time so far.
    #[must_use]
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Number of completed steps.
    #[must_use]
    pub fn step_count(&self) -> u64 {
        self.step_count
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// All fixtures whose AABB overlaps the query AABB.
    #[must_use]
    pub fn detect_aabb(&self, aabb: &Aabb) -> Vec<FixtureKey> {
        self.broad_phase
            .query(aabb)
            .into_iter()
            .filter(|key| {
                self.fixture_aabb(key)
                    .map_or(false, |fresh| fresh.overlaps(aabb))
            })
            .collect()
    }

    /// Cast a ray, returning all hits sorted nearest-first.
    #[must_use]
    pub fn raycast(
        &self,
        ray: &Ray,
        max_length: f64,
        filter: Option<CollisionFilter>,
    ) -> Vec<RaycastResult> {
        let end = ray.point_at(max_length);
        let query = Aabb::new(
            Point2::new(ray.start.x.min(end.x), ray.start.y.min(end.y)),
            Point2::new(ray.start.x.max(end.x), ray.start.y.max(end.y)),
        );

        let mut results: Vec<RaycastResult> = self
            .broad_phase
            .query(&query)
            .into_iter()
            .filter_map(|key| {
                let body = self.bodies.get(&key.body)?;
                let fixture = body.fixture(key.fixture)?;
                if let Some(filter) = &filter {
                    if !filter.can_collide(&fixture.filter()) {
                        return None;
                    }
                }
                let hit = shape_raycast(fixture.shape(), body.transform(), ray, max_length)?;
                Some(RaycastResult { fixture: key, hit })
            })
            .collect();
        results.sort_by(|a, b| {
            a.hit
                .t
                .partial_cmp(&b.hit.t)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results
    }

    fn fixture_aabb(&self, key: &FixtureKey) -> Option<Aabb> {
        let body = self.bodies.get(&key.body)?;
        let fixture = body.fixture(key.fixture)?;
        Some(fixture.shape().create_aabb(body.transform()))
    }

    // ------------------------------------------------------------------
    // Debug draw
    // ------------------------------------------------------------------

    /// Snapshot one body for an external renderer.
    #[must_use]
    pub fn debug_body(&self, id: BodyId) -> Option<BodyDebugView<'_>> {
        let body = self.bodies.get(&id)?;
        Some(BodyDebugView {
            id,
            transform: *body.transform(),
            shapes: body.fixtures().iter().map(crate::Fixture::shape).collect(),
            world_center: body.world_center(),
            aabb: body.create_aabb(),
            active: body.is_active(),
            asleep: body.is_asleep(),
            bullet: body.is_bullet(),
        })
    }

    /// Snapshot all contact points for an external renderer.
    #[must_use]
    pub fn debug_contacts(&self) -> Vec<ContactDebugView> {
        self.contacts
            .iter()
            .flat_map(|contact| {
                contact.points.iter().map(|point| ContactDebugView {
                    pair: contact.pair,
                    point: point.point,
                    normal: contact.normal,
                    depth: point.depth,
                    id: point.id,
                })
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Stepping
    // ------------------------------------------------------------------

    /// Advance the accumulator by `elapsed` wall-clock seconds, running
    /// fixed steps of `settings.timestep` as the accumulator allows.
    /// Returns the number of steps taken.
    pub fn update(&mut self, elapsed: f64) -> planar_types::Result<usize> {
        if !elapsed.is_finite() || elapsed < 0.0 {
            return Err(PhysicsError::NonFiniteParameter { name: "elapsed" });
        }
        self.accumulator += elapsed;
        let dt = self.settings.timestep;
        let mut steps = 0;
        while self.accumulator >= dt {
            self.step(dt)?;
            self.accumulator -= dt;
            steps += 1;
        }
        Ok(steps)
    }

    /// Advance the world by one fixed step.
    pub fn step(&mut self, dt: f64) -> planar_types::Result<()> {
        if self.in_step {
            return Err(PhysicsError::SteppedDuringStep);
        }
        if !dt.is_finite() || dt <= 0.0 {
            return Err(PhysicsError::invalid_config(
                "step timestep must be positive and finite",
            ));
        }
        for (id, body) in &self.bodies {
            if body.mass().is_none() {
                return Err(PhysicsError::MassUnset(*id));
            }
        }

        self.in_step = true;
        self.step_inner(dt);
        self.in_step = false;
        self.apply_pending();
        Ok(())
    }

    fn step_inner(&mut self, dt: f64) {
        let mut listeners = std::mem::take(&mut self.listeners);
        if let Some(callback) = &mut listeners.step_begin {
            callback(&StepEvent {
                dt,
                steps: self.step_count,
            });
        }

        // Sweep start: remember every pose for CCD and bounds.
        for body in self.bodies.values_mut() {
            body.transform0 = body.transform;
        }

        // 1. Fold force/torque accumulators and integrate velocities.
        let gravity = self.gravity;
        for body in self.bodies.values_mut() {
            if !body.is_active() || body.is_asleep() || !body.is_dynamic() {
                continue;
            }
            body.accumulate(dt);
            let Some(mass) = body.mass().copied() else {
                continue;
            };
            let inv_mass = mass.inverse_mass();
            let inv_inertia = mass.inverse_inertia();

            let mut acceleration = body.force * inv_mass;
            if inv_mass > 0.0 {
                acceleration += gravity * body.gravity_scale();
            }
            body.velocity.linear += acceleration * dt;
            body.velocity.angular += body.torque * inv_inertia * dt;

            // Exponential damping.
            body.velocity.linear *= 1.0 / (1.0 + dt * body.linear_damping());
            body.velocity.angular *= 1.0 / (1.0 + dt * body.angular_damping());
        }

        // 2. Broad-phase.
        self.sync_broad_phase();
        let pairs = self.broad_phase.detect();

        // 3. Narrow-phase, manifolds, and contact bookkeeping.
        self.contacts.begin_update();
        let mut wake_list: Vec<BodyId> = Vec::new();
        let time = self.time;
        for (key1, key2) in pairs {
            let pair = ContactPair::new(key1, key2);

            let (Some(body1), Some(body2)) =
                (self.bodies.get(&key1.body), self.bodies.get(&key2.body))
            else {
                continue;
            };
            let (Some(fixture1), Some(fixture2)) =
                (body1.fixture(key1.fixture), body2.fixture(key2.fixture))
            else {
                continue;
            };
            if self.joint_forbids_collision(key1.body, key2.body) {
                continue;
            }
            if let Some(callback) = &mut listeners.collision_bodies {
                if !callback(key1.body, key2.body) {
                    continue;
                }
            }
            if let Some(callback) = &mut listeners.collision_pair {
                if !callback(&pair) {
                    continue;
                }
            }

            let Some(penetration) = self.gjk.penetration(
                fixture1.shape(),
                body1.transform(),
                fixture2.shape(),
                body2.transform(),
            ) else {
                continue;
            };
            if let Some(callback) = &mut listeners.collision_penetration {
                if !callback(&pair, &penetration) {
                    continue;
                }
            }

            let Some(manifold) = self.manifold_solver.solve(
                &penetration,
                fixture1.shape(),
                body1.transform(),
                fixture2.shape(),
                body2.transform(),
            ) else {
                // Degenerate clip; skip the pair this step.
                if self.contacts.allow_warning(pair, time) {
                    warn!(%key1, %key2, "manifold generation failed; pair skipped this step");
                    if let Some(callback) = &mut listeners.warning {
                        callback(&SolverWarning {
                            pair: Some(pair),
                            message: "manifold generation failed; pair skipped".into(),
                        });
                    }
                }
                continue;
            };
            if let Some(callback) = &mut listeners.collision_manifold {
                if !callback(&pair, &manifold) {
                    continue;
                }
            }

            let sensor = fixture1.is_sensor() || fixture2.is_sensor();
            let both_sensors = fixture1.is_sensor() && fixture2.is_sensor();
            let friction = mix_friction(fixture1.friction(), fixture2.friction());
            let restitution = mix_restitution(fixture1.restitution(), fixture2.restitution());

            let life = self.contacts.update_pair(
                pair,
                &manifold,
                body1.transform(),
                body2.transform(),
                friction,
                restitution,
                sensor,
            );

            match life {
                ContactLife::Begin => {
                    wake_list.push(key1.body);
                    wake_list.push(key2.body);
                    if let Some(callback) = &mut listeners.contact_begin {
                        callback(&ContactEvent {
                            pair,
                            manifold: Some(manifold),
                            sensor,
                        });
                    }
                }
                ContactLife::Persist => {
                    // Sensor-sensor pairs fire begin and end only.
                    if !both_sensors {
                        if let Some(callback) = &mut listeners.contact_persist {
                            callback(&ContactEvent {
                                pair,
                                manifold: Some(manifold),
                                sensor,
                            });
                        }
                    }
                }
            }
        }

        let ended = self.contacts.finish_update();
        for contact in ended {
            let (b1, b2) = contact.pair.bodies();
            wake_list.push(b1);
            wake_list.push(b2);
            if let Some(callback) = &mut listeners.contact_end {
                callback(&ContactEvent {
                    pair: contact.pair,
                    manifold: None,
                    sensor: contact.sensor,
                });
            }
        }
        for id in wake_list {
            if let Some(body) = self.bodies.get_mut(&id) {
                if body.is_dynamic() {
                    body.wake();
                }
            }
        }

        // Pre-solve veto.
        if listeners.contact_pre_solve.is_some() {
            for contact in self.contacts.iter_mut() {
                if !contact.is_solved() {
                    continue;
                }
                let event = ContactEvent {
                    pair: contact.pair,
                    manifold: None,
                    sensor: contact.sensor,
                };
                if let Some(callback) = &mut listeners.contact_pre_solve {
                    if !callback(&event) {
                        contact.enabled = false;
                    }
                }
            }
        }

        // 4. Islands.
        let islands = build_islands(&mut self.bodies, &mut self.contacts, &self.joints);
        debug!(
            islands = islands.len(),
            contacts = self.contacts.len(),
            "solving step"
        );

        // 5. Solve.
        for island in &islands {
            let post_events = solve_island(
                island,
                &mut self.bodies,
                &mut self.contacts,
                &mut self.joints,
                &self.settings,
                dt,
            );
            if let Some(callback) = &mut listeners.contact_post_solve {
                for event in &post_events {
                    callback(event);
                }
            }
        }

        // 6. Continuous collision detection.
        self.solve_continuous(dt);

        // 7. Bounds.
        let mut out_of_bounds: Vec<BodyId> = Vec::new();
        for (id, body) in &self.bodies {
            if !body.is_active() {
                continue;
            }
            if let Some(aabb) = body.create_aabb() {
                if self.bounds.is_outside(&aabb) {
                    out_of_bounds.push(*id);
                }
            }
        }
        for id in out_of_bounds {
            if let Some(body) = self.bodies.get_mut(&id) {
                body.active = false;
                body.velocity = Velocity::zero();
                body.clear_accumulators();
            }
            if let Some(callback) = &mut listeners.bounds {
                callback(id);
            }
        }

        // 8. Poison bodies whose state went non-finite.
        let mut poisoned: Vec<BodyId> = Vec::new();
        for (id, body) in &self.bodies {
            if body.is_active() && !body.is_finite() {
                poisoned.push(*id);
            }
        }
        for id in poisoned {
            if let Some(body) = self.bodies.get_mut(&id) {
                body.velocity = Velocity::zero();
                body.clear_accumulators();
                body.active = false;
                // Restore the last finite pose so renderers don't see NaN.
                if body.transform0.is_finite() {
                    body.transform = body.transform0;
                }
            }
            warn!(body = %id, "non-finite body state; body deactivated");
            if let Some(callback) = &mut listeners.warning {
                callback(&SolverWarning {
                    pair: None,
                    message: format!("{id} reached a non-finite state and was deactivated"),
                });
            }
        }

        self.step_count += 1;
        self.time += dt;

        if let Some(callback) = &mut listeners.step_end {
            callback(&StepEvent {
                dt,
                steps: self.step_count,
            });
        }
        self.listeners = listeners;
    }

    /// Refresh broad-phase proxies from current body state. Inactive
    /// bodies are removed from the index entirely.
    fn sync_broad_phase(&mut self) {
        for (id, body) in &self.bodies {
            for fixture in body.fixtures() {
                let key = FixtureKey::new(*id, fixture.id());
                if body.is_active() {
                    self.broad_phase.update(
                        key,
                        Proxy {
                            aabb: fixture.shape().create_aabb(body.transform()),
                            filter: fixture.filter(),
                            is_static: !body.is_dynamic(),
                        },
                    );
                } else {
                    self.broad_phase.remove(&key);
                }
            }
        }
    }

    fn sync_body_proxies(&mut self, body: &Body) {
        for fixture in body.fixtures() {
            self.broad_phase.update(
                FixtureKey::new(body.id, fixture.id()),
                Proxy {
                    aabb: fixture.shape().create_aabb(body.transform()),
                    filter: fixture.filter(),
                    is_static: !body.is_dynamic(),
                },
            );
        }
    }

    /// Whether a joint between the two bodies disables their collision.
    fn joint_forbids_collision(&self, body1: BodyId, body2: BodyId) -> bool {
        self.joints.values().any(|joint| {
            let (j1, j2) = (joint.body1(), joint.body2());
            ((j1 == body1 && j2 == body2) || (j1 == body2 && j2 == body1))
                && !joint.collision_allowed()
        })
    }

    /// Continuous collision detection pass over bullet bodies (or every
    /// dynamic body in `All` mode).
    fn solve_continuous(&mut self, dt: f64) {
        use planar_types::ContinuousMode;

        let mode = self.settings.continuous;
        if mode == ContinuousMode::Off {
            return;
        }

        let candidates: Vec<BodyId> = self
            .bodies
            .iter()
            .filter(|(_, body)| {
                body.is_active()
                    && !body.is_asleep()
                    && body.is_dynamic()
                    && (mode == ContinuousMode::All || body.is_bullet())
            })
            .map(|(id, _)| *id)
            .collect();

        for id in candidates {
            for _ in 0..self.settings.max_sub_steps {
                let Some(body) = self.bodies.get(&id) else {
                    break;
                };
                let Some(sweep_aabb) = body.swept_aabb() else {
                    break;
                };

                // Earliest impact against any overlapping body.
                let mut best: Option<(BodyId, f64)> = None;
                for (other_id, other) in &self.bodies {
                    if *other_id == id || !other.is_active() {
                        continue;
                    }
                    if self.joint_forbids_collision(id, *other_id) {
                        continue;
                    }
                    let Some(other_aabb) = other.swept_aabb() else {
                        continue;
                    };
                    if !sweep_aabb.overlaps(&other_aabb) {
                        continue;
                    }
                    if let Some(t) = time_of_impact(body, other, &self.gjk, &self.settings) {
                        if best.map_or(true, |(_, bt)| t < bt) {
                            best = Some((*other_id, t));
                        }
                    }
                }

                let Some((other_id, t)) = best else {
                    break;
                };

                // Roll both bodies back to the impact pose, kill the
                // approach velocity, and replay the remainder of the step.
                let Some(mut body) = self.bodies.remove(&id) else {
                    break;
                };
                let Some(mut other) = self.bodies.remove(&other_id) else {
                    self.bodies.insert(id, body);
                    break;
                };

                let impact_pose = sweep_transform(&body, t);
                body.transform = impact_pose;
                body.transform0 = impact_pose;
                if other.is_dynamic() && !other.is_asleep() {
                    let other_pose = sweep_transform(&other, t);
                    other.transform = other_pose;
                    other.transform0 = other_pose;
                }

                let resolved = resolve_impact(&mut body, &mut other, &self.gjk);

                let remaining = (1.0 - t) * dt;
                if remaining > 0.0 {
                    Self::replay_motion(&mut body, remaining, &self.settings);
                    if other.is_dynamic() && !other.is_asleep() {
                        Self::replay_motion(&mut other, remaining, &self.settings);
                    }
                }

                self.bodies.insert(id, body);
                self.bodies.insert(other_id, other);

                if !resolved {
                    // Nothing changed; further sub-steps would spin.
                    break;
                }
            }
        }
    }

    /// Integrate a body's pose forward after a time-of-impact rollback.
    fn replay_motion(body: &mut Body, dt: f64, settings: &Settings) {
        let mut translation = body.velocity.linear * dt;
        if translation.norm() > settings.max_translation {
            translation = translation.normalize() * settings.max_translation;
        }
        let rotation =
            (body.velocity.angular * dt).clamp(-settings.max_rotation, settings.max_rotation);

        body.transform.translate(&translation);
        if rotation != 0.0 {
            let center = body.world_center();
            body.transform.rotate_about(rotation, &center);
        }
    }
}
