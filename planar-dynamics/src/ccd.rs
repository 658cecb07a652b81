//! Continuous collision detection by conservative advancement.
//!
//! After the discrete step, each bullet body (or every dynamic body in
//! `ContinuousMode::All`) is tested against the bodies its swept AABB
//! overlaps. The time-of-impact search advances a parameter `t ∈ [0, 1]`
//! along both bodies' step motion: at each iteration the GJK distance `d`
//! between the interpolated poses bounds how far the motion can advance
//! without contact, so `t` grows by `d / v_bound` until the shapes touch
//! or the interval is exhausted.
//!
//! On an impact, both bodies roll back to the impact pose, an inelastic
//! impulse kills the approach velocity at the witness points, and the
//! remainder of the step replays from there, at most
//! `Settings::max_sub_steps` times per body per step.

use nalgebra::Vector2;
use planar_collision::Gjk;
use planar_types::{Settings, Transform};

use crate::Body;

/// Velocity-bound epsilon: motions smaller than this can't tunnel.
const MOTION_EPSILON: f64 = 1e-9;

/// The earliest time of impact between the step motions of two bodies,
/// or `None` if they don't touch within the step.
pub(crate) fn time_of_impact(
    body1: &Body,
    body2: &Body,
    gjk: &Gjk,
    settings: &Settings,
) -> Option<f64> {
    // An upper bound on how fast the closest features can approach over
    // the whole interval: relative translation plus each body's rotation
    // disc swept by its rotation.
    let motion1 = sweep_motion(body1);
    let motion2 = sweep_motion(body2);
    let bound = (motion1.0 - motion2.0).norm()
        + motion1.1.abs() * body1.rotation_disc_radius()
        + motion2.1.abs() * body2.rotation_disc_radius();
    if bound < MOTION_EPSILON {
        return None;
    }

    let mut t = 0.0;
    for _ in 0..settings.toi_iterations {
        let transform1 = sweep_transform(body1, t);
        let transform2 = sweep_transform(body2, t);

        let mut min_distance = f64::INFINITY;
        for fixture1 in body1.fixtures() {
            for fixture2 in body2.fixtures() {
                if fixture1.is_sensor() || fixture2.is_sensor() {
                    continue;
                }
                if !fixture1.filter().can_collide(&fixture2.filter()) {
                    continue;
                }
                match gjk.distance(fixture1.shape(), &transform1, fixture2.shape(), &transform2) {
                    Some(separation) => min_distance = min_distance.min(separation.distance),
                    // Already touching or overlapping at this time.
                    None => return Some(t),
                }
            }
        }
        if !min_distance.is_finite() {
            // No testable fixture pair.
            return None;
        }
        if min_distance < settings.toi_tolerance {
            return Some(t);
        }

        t += min_distance / bound;
        if t >= 1.0 {
            return None;
        }
    }

    // The search didn't converge inside the iteration cap; treat the pair
    // as missing for this step.
    None
}

/// Translation and rotation of a body's sweep over the step.
fn sweep_motion(body: &Body) -> (Vector2<f64>, f64) {
    let translation = body.transform.position - body.transform0.position;
    let rotation = (body.transform0.rotation.inverse() * body.transform.rotation).angle();
    (translation, rotation)
}

/// The body's pose at sweep parameter `t`.
pub(crate) fn sweep_transform(body: &Body, t: f64) -> Transform {
    body.transform0.lerp(&body.transform, t)
}

/// Kill the approaching normal velocity between two bodies at an impact
/// pose (an inelastic mini solve; restitution would re-introduce the
/// tunneling velocity the search just removed).
///
/// Returns whether an impulse was applied.
pub(crate) fn resolve_impact(body1: &mut Body, body2: &mut Body, gjk: &Gjk) -> bool {
    // Find the closest fixture pair for the witness points and normal.
    let mut best: Option<planar_collision::Separation> = None;
    for fixture1 in body1.fixtures() {
        for fixture2 in body2.fixtures() {
            if fixture1.is_sensor() || fixture2.is_sensor() {
                continue;
            }
            if let Some(separation) = gjk.distance(
                fixture1.shape(),
                &body1.transform,
                fixture2.shape(),
                &body2.transform,
            ) {
                if best.map_or(true, |b| separation.distance < b.distance) {
                    best = Some(separation);
                }
            }
        }
    }
    let Some(separation) = best else {
        return false;
    };

    // Normal points from body 1 toward body 2.
    let normal = separation.normal;
    let r1 = separation.point1 - body1.world_center();
    let r2 = separation.point2 - body2.world_center();

    let (inv_m1, inv_i1) = inverse_mass(body1);
    let (inv_m2, inv_i2) = inverse_mass(body2);

    let v1 = body1.velocity.at_point(&r1);
    let v2 = body2.velocity.at_point(&r2);
    let approach = (v2 - v1).dot(&normal);
    if approach >= 0.0 {
        return false;
    }

    let rn1 = r1.x * normal.y - r1.y * normal.x;
    let rn2 = r2.x * normal.y - r2.y * normal.x;
    let k = inv_m1 + inv_m2 + inv_i1 * rn1 * rn1 + inv_i2 * rn2 * rn2;
    if k <= 0.0 {
        return false;
    }

    let lambda = -approach / k;
    let impulse = normal * lambda;

    body1.velocity.linear -= impulse * inv_m1;
    body1.velocity.angular -= inv_i1 * (r1.x * impulse.y - r1.y * impulse.x);
    body2.velocity.linear += impulse * inv_m2;
    body2.velocity.angular += inv_i2 * (r2.x * impulse.y - r2.y * impulse.x);
    true
}

fn inverse_mass(body: &Body) -> (f64, f64) {
    body.mass()
        .map_or((0.0, 0.0), |m| (m.inverse_mass(), m.inverse_inertia()))
}
