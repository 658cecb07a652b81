//! Impulse-based 2D rigid-body dynamics.
//!
//! This crate is the dynamics layer of the Planar physics stack: it owns
//! the [`World`], its [`Body`]s and their [`Fixture`]s, the persistent
//! contact table, the island partitioner, the sequential-impulse solver,
//! and continuous collision detection for bullet bodies.
//!
//! # The step pipeline
//!
//! ```text
//! apply forces → integrate velocities → broad-phase → narrow-phase
//!   → manifolds → persist/update contacts → build islands
//!   → solve velocity constraints → integrate positions
//!   → solve position constraints → update sleep → CCD for bullets
//!   → bounds check → dispatch events
//! ```
//!
//! Everything is strictly single-threaded: a call to [`World::step`] is
//! synchronous, listener callbacks run inline, and add/remove requests
//! made mid-step are buffered until the step boundary.
//!
//! # Example
//!
//! ```
//! use planar_dynamics::{Body, Bounds, Fixture, World};
//! use planar_geometry::{Convex, Polygon};
//! use planar_types::{MassKind, Settings, Transform};
//! use nalgebra::Point2;
//!
//! let mut world = World::new(Bounds::rectangle(40.0, 40.0), Settings::default()).unwrap();
//!
//! // Static floor
//! let mut floor = Body::new();
//! floor.add_fixture(Fixture::new(Convex::from(Polygon::rectangle(20.0, 1.0).unwrap())));
//! floor.set_mass_from_fixtures(MassKind::Infinite).unwrap();
//! floor.set_transform(Transform::from_position(Point2::new(0.0, -0.5)));
//! world.add_body(floor).unwrap();
//!
//! // Falling box
//! let mut b = Body::new();
//! b.add_fixture(Fixture::new(Convex::from(Polygon::rectangle(1.0, 1.0).unwrap())));
//! b.set_mass_from_fixtures(MassKind::Normal).unwrap();
//! b.set_transform(Transform::from_position(Point2::new(0.0, 5.0)));
//! let id = world.add_body(b).unwrap();
//!
//! // One second of simulation at the fixed step rate
//! for _ in 0..60 {
//!     world.step(1.0 / 60.0).unwrap();
//! }
//!
//! let body = world.body(id).unwrap();
//! assert!(body.transform().position.y < 5.0);
//! ```

#![doc(html_root_url = "https://docs.rs/planar-dynamics/0.3.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,     // Many methods can't be const due to nalgebra
    clippy::suboptimal_flops,          // mul_add style changes aren't always clearer
    clippy::missing_errors_doc,        // Error docs added where non-obvious
    clippy::module_name_repetitions,
)]

mod body;
mod bounds;
mod ccd;
mod contact;
pub mod events;
mod fixture;
mod island;
mod solver;
mod world;

pub use body::Body;
pub use bounds::Bounds;
pub use contact::{mix_friction, mix_restitution, Contact, ContactManager, ContactPoint};
pub use events::{
    ContactEvent, ContactPair, Destroyed, Listeners, PostSolveEvent, SolvedContactPoint,
    SolverWarning, StepEvent,
};
pub use fixture::Fixture;
pub use island::Island;
pub use world::{BodyDebugView, ContactDebugView, RaycastResult, World};

// Re-export the pieces embedders routinely need alongside the world.
pub use planar_collision::{CollisionFilter, Ray, RaycastHit};
pub use planar_joint::Joint;
pub use planar_types::{BodyId, FixtureId, FixtureKey, JointId, PhysicsError, Settings};
