//! Listener registration and event payloads.
//!
//! Instead of an inheritance-style adapter per listener interface, the
//! world holds a single [`Listeners`] record with one optional callback
//! per event kind; embedders register only the ones they care about.
//!
//! Callbacks receive plain data, never the world itself; the world is
//! mid-step when they run. Mutating calls made from inside a callback
//! (adding or removing bodies and joints) are buffered by the world and
//! applied when the step completes.
//!
//! # Ordering guarantees
//!
//! - contact `begin`/`persist`/`end` fire after manifold update, before
//!   the solver
//! - `pre_solve` fires after those, still before the solver, and may veto
//!   resolution for a step
//! - `post_solve` fires after the velocity solve with the accumulated
//!   impulses
//! - `step_begin`/`step_end` bracket the whole pipeline
//! - sleep-state changes become observable only after the step completes

use nalgebra::{Point2, Vector2};
use planar_collision::{Manifold, ManifoldPointId, Penetration};
use planar_types::{BodyId, FixtureKey, JointId};

/// A contacting fixture pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactPair {
    /// First fixture.
    pub fixture1: FixtureKey,
    /// Second fixture.
    pub fixture2: FixtureKey,
}

impl ContactPair {
    /// Create a pair.
    #[must_use]
    pub const fn new(fixture1: FixtureKey, fixture2: FixtureKey) -> Self {
        Self { fixture1, fixture2 }
    }

    /// The two body ids.
    #[must_use]
    pub fn bodies(&self) -> (BodyId, BodyId) {
        (self.fixture1.body, self.fixture2.body)
    }
}

/// Payload of contact begin/persist/end and pre-solve events.
#[derive(Debug, Clone)]
pub struct ContactEvent {
    /// The fixture pair.
    pub pair: ContactPair,
    /// The current manifold; `None` for `end` events.
    pub manifold: Option<Manifold>,
    /// Whether either fixture is a sensor.
    pub sensor: bool,
}

/// One solved contact point in a post-solve event.
#[derive(Debug, Clone, Copy)]
pub struct SolvedContactPoint {
    /// Stable point identity.
    pub id: ManifoldPointId,
    /// World-space contact point.
    pub point: Point2<f64>,
    /// Accumulated normal impulse (≥ 0).
    pub normal_impulse: f64,
    /// Accumulated tangent impulse.
    pub tangent_impulse: f64,
}

/// Payload of the post-solve event.
#[derive(Debug, Clone)]
pub struct PostSolveEvent {
    /// The fixture pair.
    pub pair: ContactPair,
    /// Contact normal, pointing from the second body toward the first.
    pub normal: Vector2<f64>,
    /// The solved points with their accumulated impulses.
    pub points: Vec<SolvedContactPoint>,
}

/// Payload of step begin/end events.
#[derive(Debug, Clone, Copy)]
pub struct StepEvent {
    /// The timestep being simulated.
    pub dt: f64,
    /// The world's step counter (before increment for `begin`, after for
    /// `end`).
    pub steps: u64,
}

/// What was removed, for destruction events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destroyed {
    /// A body left the world (with all its fixtures).
    Body(BodyId),
    /// A joint left the world (removed directly or severed with a body).
    Joint(JointId),
    /// A contact was destroyed because a body or fixture left the world.
    Contact(FixtureKey, FixtureKey),
}

/// A numerical-trouble notification (rate-limited per pair).
#[derive(Debug, Clone)]
pub struct SolverWarning {
    /// The fixture pair the narrow phase or manifold solver gave up on,
    /// if the warning is pair-specific.
    pub pair: Option<ContactPair>,
    /// Human-readable description.
    pub message: String,
}

type Filter<T> = Option<Box<dyn FnMut(&T) -> bool>>;
type Callback<T> = Option<Box<dyn FnMut(&T)>>;

/// The listener record: one optional callback per event kind.
#[derive(Default)]
pub struct Listeners {
    /// A body pair came out of the broad-phase; return false to skip all
    /// of its fixture pairs this step.
    pub collision_bodies: Option<Box<dyn FnMut(BodyId, BodyId) -> bool>>,
    /// A broad-phase fixture pair was found; return false to skip it this
    /// step.
    pub collision_pair: Filter<ContactPair>,
    /// The narrow phase confirmed a penetration; return false to skip.
    pub collision_penetration: Option<Box<dyn FnMut(&ContactPair, &Penetration) -> bool>>,
    /// A manifold was built; return false to skip.
    pub collision_manifold: Option<Box<dyn FnMut(&ContactPair, &Manifold) -> bool>>,

    /// A new contact began touching.
    pub contact_begin: Callback<ContactEvent>,
    /// A contact persisted from the previous step.
    pub contact_persist: Callback<ContactEvent>,
    /// A contact stopped touching.
    pub contact_end: Callback<ContactEvent>,
    /// About to solve this contact; return false to skip resolution this
    /// step (events still fire).
    pub contact_pre_solve: Filter<ContactEvent>,
    /// Velocity solve finished for this contact.
    pub contact_post_solve: Callback<PostSolveEvent>,

    /// A step is starting.
    pub step_begin: Callback<StepEvent>,
    /// A step finished.
    pub step_end: Callback<StepEvent>,

    /// A body left the world bounds and was deactivated.
    pub bounds: Option<Box<dyn FnMut(BodyId)>>,
    /// Something was removed from the world.
    pub destroyed: Option<Box<dyn FnMut(&Destroyed)>>,
    /// Numerical trouble that never aborts a step.
    pub warning: Callback<SolverWarning>,
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn set(present: bool) -> &'static str {
            if present {
                "set"
            } else {
                "unset"
            }
        }
        f.debug_struct("Listeners")
            .field("collision_bodies", &set(self.collision_bodies.is_some()))
            .field("collision_pair", &set(self.collision_pair.is_some()))
            .field(
                "collision_penetration",
                &set(self.collision_penetration.is_some()),
            )
            .field("collision_manifold", &set(self.collision_manifold.is_some()))
            .field("contact_begin", &set(self.contact_begin.is_some()))
            .field("contact_persist", &set(self.contact_persist.is_some()))
            .field("contact_end", &set(self.contact_end.is_some()))
            .field("contact_pre_solve", &set(self.contact_pre_solve.is_some()))
            .field("contact_post_solve", &set(self.contact_post_solve.is_some()))
            .field("step_begin", &set(self.step_begin.is_some()))
            .field("step_end", &set(self.step_end.is_some()))
            .field("bounds", &set(self.bounds.is_some()))
            .field("destroyed", &set(self.destroyed.is_some()))
            .field("warning", &set(self.warning.is_some()))
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use planar_types::FixtureId;

    #[test]
    fn test_contact_pair_bodies() {
        let pair = ContactPair::new(
            FixtureKey::new(BodyId::new(1), FixtureId::new(0)),
            FixtureKey::new(BodyId::new(2), FixtureId::new(3)),
        );
        assert_eq!(pair.bodies(), (BodyId::new(1), BodyId::new(2)));
    }

    #[test]
    fn test_listeners_debug_shows_registration() {
        let mut listeners = Listeners::default();
        listeners.bounds = Some(Box::new(|_| {}));

        let debug = format!("{listeners:?}");
        assert!(debug.contains("bounds: \"set\""));
        assert!(debug.contains("step_begin: \"unset\""));
    }
}
