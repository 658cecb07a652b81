//! The joint trait and shared constraint machinery.

use nalgebra::{Matrix2, Vector2};
use planar_types::{BodyId, Settings};

use crate::SolverBody;

/// Discriminant for the concrete joint types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JointKind {
    /// Pin at a point, free rotation.
    Revolute,
    /// Translation along one axis.
    Prismatic,
    /// Fixed distance or spring between two anchors.
    Distance,
    /// Rigid lock of both position and angle.
    Weld,
    /// Rope over two ground anchors.
    Pulley,
    /// Single body dragged toward a target.
    Mouse,
    /// Relative angle lock.
    Angle,
    /// Capped damping of relative motion.
    Friction,
}

/// State of a joint limit within the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LimitState {
    /// No limit active this step.
    #[default]
    Inactive,
    /// The lower limit is engaged.
    AtLower,
    /// The upper limit is engaged.
    AtUpper,
    /// Lower and upper coincide; the joint is locked.
    Equal,
}

/// A constraint binding two bodies.
///
/// Implementations cache their effective masses and accumulated impulses
/// between `initialize` calls; the accumulated impulses are what makes
/// warm-starting work, so they must persist across steps.
pub trait Joint: std::fmt::Debug {
    /// The first constrained body.
    fn body1(&self) -> BodyId;

    /// The second constrained body. Single-body joints return the same id
    /// as [`Joint::body1`]; the solver hands them an immovable placeholder
    /// for the first slot.
    fn body2(&self) -> BodyId;

    /// Which concrete joint this is.
    fn kind(&self) -> JointKind;

    /// Whether collision resolution between the two bodies stays enabled.
    fn collision_allowed(&self) -> bool;

    /// Compute effective masses for the bodies' current state and apply
    /// the warm-start impulses.
    fn initialize(
        &mut self,
        body1: &mut SolverBody,
        body2: &mut SolverBody,
        settings: &Settings,
        dt: f64,
    );

    /// One velocity iteration.
    fn solve_velocity(
        &mut self,
        body1: &mut SolverBody,
        body2: &mut SolverBody,
        settings: &Settings,
        dt: f64,
    );

    /// One position iteration; returns true when the positional error is
    /// within tolerance.
    fn solve_position(
        &mut self,
        body1: &mut SolverBody,
        body2: &mut SolverBody,
        settings: &Settings,
    ) -> bool;
}

/// Solve `K·x = b` for a 2×2 effective-mass matrix, returning zero when
/// the matrix is singular (both bodies immovable along the constraint).
#[must_use]
pub(crate) fn solve22(k: &Matrix2<f64>, b: &Vector2<f64>) -> Vector2<f64> {
    let det = k.m11 * k.m22 - k.m12 * k.m21;
    if det.abs() < f64::EPSILON {
        return Vector2::zeros();
    }
    let inv_det = 1.0 / det;
    Vector2::new(
        inv_det * (k.m22 * b.x - k.m12 * b.y),
        inv_det * (k.m11 * b.y - k.m21 * b.x),
    )
}

/// The 2×2 effective-mass matrix of a point constraint at arms `r1`, `r2`.
#[must_use]
pub(crate) fn point_constraint_matrix(
    body1: &SolverBody,
    body2: &SolverBody,
    r1: &Vector2<f64>,
    r2: &Vector2<f64>,
) -> Matrix2<f64> {
    let m = body1.inv_mass + body2.inv_mass;
    let i1 = body1.inv_inertia;
    let i2 = body2.inv_inertia;
    Matrix2::new(
        m + i1 * r1.y * r1.y + i2 * r2.y * r2.y,
        -i1 * r1.x * r1.y - i2 * r2.x * r2.y,
        -i1 * r1.x * r1.y - i2 * r2.x * r2.y,
        m + i1 * r1.x * r1.x + i2 * r2.x * r2.x,
    )
}

/// 2D cross product of two vectors.
#[inline]
#[must_use]
pub(crate) fn cross(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Clamp `total + increment` into `[min, max]`, returning the applied
/// increment. The accumulated-impulse clamp every motor and limit uses.
#[must_use]
pub(crate) fn clamp_accumulated(total: &mut f64, increment: f64, min: f64, max: f64) -> f64 {
    let old = *total;
    *total = (old + increment).clamp(min, max);
    *total - old
}
