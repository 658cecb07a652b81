//! Collision detection for 2D convex shapes.
//!
//! This crate provides the three stages of the collision pipeline, in the
//! order the world runs them:
//!
//! 1. **Broad-phase** ([`broad_phase`]): a spatial filter over fixture
//!    AABBs producing candidate pairs.
//! 2. **Narrow-phase** ([`gjk`]): GJK intersection and distance queries,
//!    with EPA extracting a penetration normal and depth for overlapping
//!    pairs.
//! 3. **Manifold generation** ([`manifold`]): clipping the incident edge
//!    against the reference edge to produce a one- or two-point contact
//!    manifold with stable, feature-indexed point ids.
//!
//! Raycasting ([`raycast`]) and collision filtering ([`filter`]) round out
//! the query surface.
//!
//! # Example
//!
//! ```
//! use planar_collision::{Gjk, ClippingManifoldSolver};
//! use planar_geometry::{Convex, Polygon};
//! use planar_types::Transform;
//! use nalgebra::Point2;
//!
//! let a = Convex::from(Polygon::rectangle(1.0, 1.0).unwrap());
//! let b = Convex::from(Polygon::rectangle(1.0, 1.0).unwrap());
//! let ta = Transform::identity();
//! let tb = Transform::from_position(Point2::new(0.9, 0.0));
//!
//! let penetration = Gjk::new().penetration(&a, &ta, &b, &tb).unwrap();
//! assert!((penetration.depth - 0.1).abs() < 1e-6);
//!
//! let manifold = ClippingManifoldSolver::new()
//!     .solve(&penetration, &a, &ta, &b, &tb)
//!     .unwrap();
//! assert_eq!(manifold.points.len(), 2);
//! ```

#![doc(html_root_url = "https://docs.rs/planar-collision/0.3.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,     // Many methods can't be const due to nalgebra
    clippy::suboptimal_flops,          // mul_add style changes aren't always clearer
    clippy::missing_errors_doc,        // Error docs added where non-obvious
)]

pub mod broad_phase;
pub mod filter;
pub mod gjk;
pub mod manifold;
pub mod raycast;

pub use broad_phase::{BroadPhase, BroadPhaseAlgorithm, BroadPhaseConfig, BroadPhaseDetector, Proxy};
pub use filter::CollisionFilter;
pub use gjk::{Gjk, Penetration, Separation, Simplex};
pub use manifold::{ClippingManifoldSolver, Manifold, ManifoldPoint, ManifoldPointId};
pub use raycast::{Ray, RaycastHit};
