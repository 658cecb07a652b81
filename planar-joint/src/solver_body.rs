//! The mutable body view constraints solve against.

use nalgebra::{Point2, Vector2};
use planar_types::{Transform, Velocity};

/// The slice of body state a constraint reads and writes.
///
/// The island solver materializes one of these per island body, lets
/// contacts and joints mutate it through the iteration loops, and writes
/// the result back. Constraints never touch bodies directly, which keeps
/// the joint crate independent of the world representation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolverBody {
    /// Current pose.
    pub transform: Transform,
    /// Current velocity.
    pub velocity: Velocity,
    /// Inverse mass (0 for infinite).
    pub inv_mass: f64,
    /// Inverse rotational inertia (0 for infinite).
    pub inv_inertia: f64,
    /// Center of mass in the body's local frame.
    pub local_center: Point2<f64>,
}

impl SolverBody {
    /// An immovable placeholder body (used as the second slot of
    /// single-body joints).
    #[must_use]
    pub fn fixed() -> Self {
        Self {
            transform: Transform::identity(),
            velocity: Velocity::zero(),
            inv_mass: 0.0,
            inv_inertia: 0.0,
            local_center: Point2::origin(),
        }
    }

    /// The center of mass in world coordinates.
    #[must_use]
    pub fn world_center(&self) -> Point2<f64> {
        self.transform.transform_point(&self.local_center)
    }

    /// World-space velocity of a point at arm `r` from the center of mass.
    #[must_use]
    pub fn velocity_at(&self, r: &Vector2<f64>) -> Vector2<f64> {
        self.velocity.at_point(r)
    }

    /// Apply a linear impulse at arm `r` from the center of mass.
    pub fn apply_impulse(&mut self, impulse: &Vector2<f64>, r: &Vector2<f64>) {
        self.velocity.linear += impulse * self.inv_mass;
        self.velocity.angular += self.inv_inertia * (r.x * impulse.y - r.y * impulse.x);
    }

    /// Apply a pure angular impulse.
    pub fn apply_angular_impulse(&mut self, impulse: f64) {
        self.velocity.angular += self.inv_inertia * impulse;
    }

    /// Apply a positional pseudo-impulse at arm `r`: translates the body
    /// and rotates it about its (moved) center of mass, leaving velocity
    /// untouched.
    pub fn apply_position_impulse(&mut self, impulse: &Vector2<f64>, r: &Vector2<f64>) {
        let rotation = self.inv_inertia * (r.x * impulse.y - r.y * impulse.x);
        self.transform.translate(&(impulse * self.inv_mass));
        if rotation != 0.0 {
            let center = self.world_center();
            self.transform.rotate_about(rotation, &center);
        }
    }

    /// Apply a positional angular pseudo-impulse about the center of mass.
    pub fn apply_position_rotation(&mut self, impulse: f64) {
        let rotation = self.inv_inertia * impulse;
        if rotation != 0.0 {
            let center = self.world_center();
            self.transform.rotate_about(rotation, &center);
        }
    }
}
