//! Core types for 2D rigid-body simulation.
//!
//! This crate provides the foundational types shared by the Planar physics
//! stack:
//!
//! - [`Transform`] - Position and orientation of a body in the plane
//! - [`Velocity`] - Linear and angular velocity
//! - [`MassData`] - Mass, rotational inertia, and center of mass
//! - [`Settings`] - Timestep, solver iteration counts, thresholds
//! - [`PhysicsError`] - Error type for construction and world mutation
//!
//! # Design Philosophy
//!
//! These types are **pure data**. They have no collision detection, no
//! constraint solving, no integration. They're the common language between:
//!
//! - The geometry layer (shapes, bounding volumes)
//! - The collision layer (broad-phase, narrow-phase, manifolds)
//! - The dynamics layer (bodies, joints, the world step loop)
//! - Embedding applications (renderers, editors, games)
//!
//! # Coordinate System
//!
//! - X: right
//! - Y: up
//! - Angles: counter-clockwise positive, radians
//!
//! # Example
//!
//! ```
//! use planar_types::{Transform, Velocity};
//! use nalgebra::{Point2, Vector2};
//!
//! // A body sitting one meter up, rotated 90 degrees
//! let transform = Transform::from_position_angle(
//!     Point2::new(0.0, 1.0),
//!     std::f64::consts::FRAC_PI_2,
//! );
//!
//! let local = Point2::new(1.0, 0.0);
//! let world = transform.transform_point(&local);
//! assert!((world.y - 2.0).abs() < 1e-12);
//!
//! // Velocity of a point on a spinning body
//! let velocity = Velocity::angular(1.0);
//! let v = velocity.at_point(&Vector2::new(1.0, 0.0));
//! assert!((v.y - 1.0).abs() < 1e-12);
//! ```

#![doc(html_root_url = "https://docs.rs/planar-types/0.3.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,     // Many methods can't be const due to nalgebra
    clippy::suboptimal_flops,          // mul_add style changes aren't always clearer
    clippy::missing_errors_doc,        // Error docs added where non-obvious
)]

mod error;
mod id;
mod mass;
mod motion;
mod settings;

pub use error::PhysicsError;
pub use id::{BodyId, FixtureId, FixtureKey, JointId};
pub use mass::{MassData, MassKind};
pub use motion::{Transform, Velocity};
pub use settings::{ContinuousMode, Settings};

// Re-export math types for convenience
pub use nalgebra::{Matrix2, Point2, UnitComplex, Vector2};

/// Result type for simulation operations.
pub type Result<T> = std::result::Result<T, PhysicsError>;
