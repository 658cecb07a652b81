//! Joint constraints for 2D rigid-body simulation.
//!
//! Joints bind two bodies (or one body and a world-space target) and
//! remove degrees of freedom between them. Each joint participates in the
//! sequential-impulse solve the same way contacts do:
//!
//! 1. `initialize` computes effective masses from the bodies' current
//!    state and applies last step's accumulated impulses (warm-starting),
//! 2. `solve_velocity` runs once per velocity iteration, applying the
//!    impulse that drives the joint's velocity error toward zero,
//! 3. `solve_position` runs once per position iteration and reports
//!    whether the positional error is within tolerance.
//!
//! # Joint Types
//!
//! - [`RevoluteJoint`]: pin two bodies at a point; optional angle limits
//!   and a motor
//! - [`PrismaticJoint`]: slide along an axis; optional translation limits
//!   and a linear motor
//! - [`DistanceJoint`]: hold two anchors at a fixed distance, or act as a
//!   spring when given a frequency
//! - [`WeldJoint`]: lock two bodies together completely
//! - [`PulleyJoint`]: rope over two ground anchors with a ratio
//! - [`MouseJoint`]: drag one body toward a world-space target
//! - [`AngleJoint`]: lock relative rotation, optionally geared
//! - [`FrictionJoint`]: damp relative motion with force/torque caps
//!
//! # Example
//!
//! ```
//! use planar_joint::{Joint, RevoluteJoint};
//! use planar_types::{BodyId, Transform};
//! use nalgebra::Point2;
//!
//! let t1 = Transform::identity();
//! let t2 = Transform::from_position(Point2::new(2.0, 0.0));
//! let joint = RevoluteJoint::world_anchored(
//!     BodyId::new(1),
//!     BodyId::new(2),
//!     &t1,
//!     &t2,
//!     Point2::new(1.0, 0.0),
//! )
//! .with_motor(std::f64::consts::PI, 100.0);
//!
//! assert_eq!(joint.body1(), BodyId::new(1));
//! assert!(!joint.collision_allowed());
//! ```

#![doc(html_root_url = "https://docs.rs/planar-joint/0.3.0")]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![warn(missing_docs)]
#![allow(
    clippy::missing_const_for_fn,     // Many methods can't be const due to nalgebra
    clippy::suboptimal_flops,          // mul_add style changes aren't always clearer
    clippy::missing_errors_doc,        // Error docs added where non-obvious
)]

mod angle;
mod distance;
mod friction;
mod joint;
mod mouse;
mod prismatic;
mod pulley;
mod revolute;
mod solver_body;
mod weld;

pub use angle::AngleJoint;
pub use distance::DistanceJoint;
pub use friction::FrictionJoint;
pub use joint::{Joint, JointKind, LimitState};
pub use mouse::MouseJoint;
pub use prismatic::PrismaticJoint;
pub use pulley::PulleyJoint;
pub use revolute::RevoluteJoint;
pub use solver_body::SolverBody;
pub use weld::WeldJoint;
