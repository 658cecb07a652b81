//! Unified API for the Planar 2D rigid-body physics stack.
//!
//! This crate re-exports the complete stack:
//!
//! - [`planar_types`] - Core data types (ids, transforms, mass, settings)
//! - [`planar_geometry`] - Convex shapes, AABBs, mass computation
//! - [`planar_collision`] - Broad-phase, GJK/EPA, contact manifolds
//! - [`planar_joint`] - Joint constraints
//! - [`planar_dynamics`] - The world, bodies, solver, and CCD
//!
//! # Quick Start
//!
//! ```
//! use planar_physics::prelude::*;
//! use nalgebra::Point2;
//!
//! // A world with 40x40 bounds and the default solver settings.
//! let mut world = World::new(Bounds::rectangle(40.0, 40.0), Settings::default()).unwrap();
//!
//! // Static floor with its top face at y = 0.
//! let mut floor = Body::new();
//! floor.add_fixture(Fixture::new(Convex::from(Polygon::rectangle(20.0, 1.0).unwrap())));
//! floor.set_mass_from_fixtures(MassKind::Infinite).unwrap();
//! floor.set_transform(Transform::from_position(Point2::new(0.0, -0.5)));
//! world.add_body(floor).unwrap();
//!
//! // A unit box dropped from y = 5.
//! let mut falling = Body::new();
//! falling.add_fixture(Fixture::new(Convex::from(Polygon::rectangle(1.0, 1.0).unwrap())));
//! falling.set_mass_from_fixtures(MassKind::Normal).unwrap();
//! falling.set_transform(Transform::from_position(Point2::new(0.0, 5.0)));
//! let id = world.add_body(falling).unwrap();
//!
//! // Simulate two seconds; the box lands and goes to sleep.
//! for _ in 0..120 {
//!     world.step(1.0 / 60.0).unwrap();
//! }
//!
//! let body = world.body(id).unwrap();
//! assert!((body.transform().position.y - 0.5).abs() < 0.05);
//! ```

#![doc(html_root_url = "https://docs.rs/planar-physics/0.3.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]

pub use planar_collision;
pub use planar_dynamics;
pub use planar_geometry;
pub use planar_joint;
pub use planar_types;

/// The most commonly used pieces of the stack, for glob import.
pub mod prelude {
    pub use planar_collision::{
        BroadPhase, ClippingManifoldSolver, CollisionFilter, Gjk, Manifold, Ray, RaycastHit,
    };
    pub use planar_dynamics::{
        Body, Bounds, ContactEvent, ContactPair, Fixture, Listeners, RaycastResult, World,
    };
    pub use planar_geometry::{Aabb, Circle, Convex, Polygon, Segment};
    pub use planar_joint::{
        AngleJoint, DistanceJoint, FrictionJoint, Joint, MouseJoint, PrismaticJoint, PulleyJoint,
        RevoluteJoint, WeldJoint,
    };
    pub use planar_types::{
        BodyId, FixtureKey, JointId, MassData, MassKind, PhysicsError, Settings, Transform,
        Velocity,
    };
}
