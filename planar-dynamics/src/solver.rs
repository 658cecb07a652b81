//! Sequential-impulse island solver.
//!
//! One island is solved at a time, against island-local copies of body
//! state ([`SolverBody`]):
//!
//! 1. initialize contact and joint constraints (effective masses,
//!    restitution bias, warm-start impulses),
//! 2. run the velocity iterations (per contact point the tangent
//!    impulse first, clamped to the friction cone, then the accumulated
//!    non-negative normal impulse; then every joint),
//! 3. integrate positions under the per-step translation and rotation
//!    clamps,
//! 4. run the position iterations with split pseudo-impulses (Baumgarte
//!    feedback works on the transforms directly, never on velocity),
//!    stopping early once every constraint reports itself within
//!    tolerance,
//! 5. update the island's sleep state.
//!
//! Constraint order within an island is stable across iterations, which
//! keeps the iteration deterministic for a given world state.

use std::collections::{BTreeMap, HashMap};

use nalgebra::Vector2;
use planar_geometry::right;
use planar_joint::{Joint, SolverBody};
use planar_types::{BodyId, JointId, Settings};

use crate::events::{PostSolveEvent, SolvedContactPoint};
use crate::island::Island;
use crate::{Body, Contact, ContactManager};

/// 2D cross product.
#[inline]
fn cross(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Solve one island in place, returning post-solve event payloads for its
/// contacts.
pub(crate) fn solve_island(
    island: &Island,
    bodies: &mut BTreeMap<BodyId, Body>,
    contacts: &mut ContactManager,
    joints: &mut BTreeMap<JointId, Box<dyn Joint>>,
    settings: &Settings,
    dt: f64,
) -> Vec<PostSolveEvent> {
    // Island-local body state.
    let mut state: Vec<SolverBody> = Vec::with_capacity(island.bodies.len());
    let mut index: HashMap<BodyId, usize> = HashMap::with_capacity(island.bodies.len());
    for id in &island.bodies {
        let body = &bodies[id];
        let mass = body.mass().copied().unwrap_or_else(|| {
            planar_types::MassData::infinite(nalgebra::Point2::origin())
        });
        index.insert(*id, state.len());
        state.push(SolverBody {
            transform: body.transform,
            velocity: body.velocity,
            inv_mass: mass.inverse_mass(),
            inv_inertia: mass.inverse_inertia(),
            local_center: mass.center,
        });
    }

    // Map contacts to island body slots and initialize them. Island
    // construction records a constraint only after both of its bodies are
    // members, so these lookups cannot miss; if a future change to the
    // step ordering breaks that, fail loudly in tests and drop the
    // constraint in release builds rather than panic.
    for key in &island.contacts {
        if let Some(contact) = contacts.get_mut(key) {
            let slot1 = index.get(&contact.pair.fixture1.body);
            let slot2 = index.get(&contact.pair.fixture2.body);
            let (Some(&i1), Some(&i2)) = (slot1, slot2) else {
                debug_assert!(false, "contact references a body outside its island");
                contact.enabled = false;
                continue;
            };
            contact.island1 = i1;
            contact.island2 = i2;
            initialize_contact(contact, &mut state, settings);
        }
    }

    let mut placeholder = SolverBody::fixed();
    for id in &island.joints {
        if let Some(joint) = joints.get_mut(id) {
            if let Some((body1, body2)) =
                joint_bodies(&mut state, &index, joint.as_ref(), &mut placeholder)
            {
                joint.initialize(body1, body2, settings, dt);
            }
        }
    }

    // Velocity iterations.
    for _ in 0..settings.velocity_iterations {
        for key in &island.contacts {
            if let Some(contact) = contacts.get_mut(key) {
                solve_contact_velocity(contact, &mut state);
            }
        }
        for id in &island.joints {
            if let Some(joint) = joints.get_mut(id) {
                if let Some((body1, body2)) =
                    joint_bodies(&mut state, &index, joint.as_ref(), &mut placeholder)
                {
                    joint.solve_velocity(body1, body2, settings, dt);
                }
            }
        }
    }

    // Integrate positions.
    for solver_body in &mut state {
        if solver_body.inv_mass == 0.0 && solver_body.inv_inertia == 0.0 {
            continue;
        }
        let mut translation = solver_body.velocity.linear * dt;
        let max = settings.max_translation;
        if translation.norm() > max {
            translation = translation.normalize() * max;
        }
        let rotation = (solver_body.velocity.angular * dt)
            .clamp(-settings.max_rotation, settings.max_rotation);

        solver_body.transform.translate(&translation);
        if rotation != 0.0 {
            let center = solver_body.world_center();
            solver_body.transform.rotate_about(rotation, &center);
        }
    }

    // Position iterations with early-out.
    for _ in 0..settings.position_iterations {
        let mut solved = true;
        for key in &island.contacts {
            if let Some(contact) = contacts.get_mut(key) {
                solved &= solve_contact_position(contact, &mut state, settings);
            }
        }
        for id in &island.joints {
            if let Some(joint) = joints.get_mut(id) {
                if let Some((body1, body2)) =
                    joint_bodies(&mut state, &index, joint.as_ref(), &mut placeholder)
                {
                    solved &= joint.solve_position(body1, body2, settings);
                }
            }
        }
        if solved {
            break;
        }
    }

    // Write back (static bodies never move; skipping them also keeps
    // their many-island copies consistent).
    for (id, solver_body) in island.bodies.iter().zip(&state) {
        let Some(body) = bodies.get_mut(id) else {
            continue;
        };
        if !body.is_dynamic() {
            continue;
        }
        body.transform = solver_body.transform;
        body.velocity = solver_body.velocity;
    }

    update_island_sleep(island, bodies, settings, dt);

    // Post-solve payloads.
    island
        .contacts
        .iter()
        .filter_map(|key| contacts.get(key))
        .filter(|contact| contact.is_solved())
        .map(|contact| PostSolveEvent {
            pair: contact.pair,
            normal: contact.normal,
            points: contact
                .points
                .iter()
                .map(|p| SolvedContactPoint {
                    id: p.id,
                    point: p.point,
                    normal_impulse: p.normal_impulse,
                    tangent_impulse: p.tangent_impulse,
                })
                .collect(),
        })
        .collect()
}

/// Two disjoint mutable slots from the state slice; the placeholder
/// stands in for the first slot of single-body joints.
///
/// Island construction guarantees both joint bodies are members; a miss
/// here means the step ordering changed, so assert in tests and skip the
/// joint in release builds.
fn joint_bodies<'a>(
    state: &'a mut [SolverBody],
    index: &HashMap<BodyId, usize>,
    joint: &dyn Joint,
    placeholder: &'a mut SolverBody,
) -> Option<(&'a mut SolverBody, &'a mut SolverBody)> {
    let (Some(&i1), Some(&i2)) = (index.get(&joint.body1()), index.get(&joint.body2())) else {
        debug_assert!(false, "joint references a body outside its island");
        return None;
    };
    if i1 == i2 {
        return Some((placeholder, &mut state[i2]));
    }
    Some(pair_mut(state, i1, i2))
}

/// Split a slice into two disjoint mutable references.
fn pair_mut(slice: &mut [SolverBody], i: usize, j: usize) -> (&mut SolverBody, &mut SolverBody) {
    debug_assert_ne!(i, j);
    if i < j {
        let (head, tail) = slice.split_at_mut(j);
        (&mut head[i], &mut tail[0])
    } else {
        let (head, tail) = slice.split_at_mut(i);
        let (a, b) = (&mut tail[0], &mut head[j]);
        (a, b)
    }
}

/// Compute effective masses and restitution bias, then apply warm-start
/// impulses.
fn initialize_contact(contact: &mut Contact, state: &mut [SolverBody], settings: &Settings) {
    if !contact.is_solved() {
        return;
    }
    let (i1, i2) = (contact.island1, contact.island2);
    let normal = contact.normal;
    let tangent = right(&normal);
    let restitution = contact.restitution;

    for point in &mut contact.points {
        let (body1, body2) = pair_mut(state, i1, i2);

        point.r1 = point.point - body1.world_center();
        point.r2 = point.point - body2.world_center();

        let rn1 = cross(&point.r1, &normal);
        let rn2 = cross(&point.r2, &normal);
        let kn = body1.inv_mass
            + body2.inv_mass
            + body1.inv_inertia * rn1 * rn1
            + body2.inv_inertia * rn2 * rn2;
        point.normal_mass = if kn > 0.0 { 1.0 / kn } else { 0.0 };

        let rt1 = cross(&point.r1, &tangent);
        let rt2 = cross(&point.r2, &tangent);
        let kt = body1.inv_mass
            + body2.inv_mass
            + body1.inv_inertia * rt1 * rt1
            + body2.inv_inertia * rt2 * rt2;
        point.tangent_mass = if kt > 0.0 { 1.0 / kt } else { 0.0 };

        // Restitution bias only above the threshold speed, so resting
        // contacts don't jitter.
        let approach = relative_velocity(body1, body2, point.r1, point.r2).dot(&normal);
        point.velocity_bias = if approach < -settings.restitution_velocity {
            -restitution * approach
        } else {
            0.0
        };

        // Warm start.
        let impulse = normal * point.normal_impulse + tangent * point.tangent_impulse;
        body1.apply_impulse(&impulse, &point.r1);
        body2.apply_impulse(&-impulse, &point.r2);
    }
}

/// Velocity of body 1's contact point relative to body 2's.
#[inline]
fn relative_velocity(
    body1: &SolverBody,
    body2: &SolverBody,
    r1: Vector2<f64>,
    r2: Vector2<f64>,
) -> Vector2<f64> {
    body1.velocity_at(&r1) - body2.velocity_at(&r2)
}

/// One velocity iteration for one contact.
fn solve_contact_velocity(contact: &mut Contact, state: &mut [SolverBody]) {
    if !contact.is_solved() {
        return;
    }
    let (i1, i2) = (contact.island1, contact.island2);
    let normal = contact.normal;
    let tangent = right(&normal);
    let friction = contact.friction;

    for point in &mut contact.points {
        let (body1, body2) = pair_mut(state, i1, i2);

        // Tangent impulse first, clamped to the friction cone.
        let rv = relative_velocity(body1, body2, point.r1, point.r2);
        let tangent_speed = rv.dot(&tangent);
        let lambda = -point.tangent_mass * tangent_speed;

        let max_friction = friction * point.normal_impulse;
        let old = point.tangent_impulse;
        point.tangent_impulse = (old + lambda).clamp(-max_friction, max_friction);
        let applied = point.tangent_impulse - old;

        let impulse = tangent * applied;
        body1.apply_impulse(&impulse, &point.r1);
        body2.apply_impulse(&-impulse, &point.r2);

        // Accumulated non-negative normal impulse.
        let rv = relative_velocity(body1, body2, point.r1, point.r2);
        let normal_speed = rv.dot(&normal);
        let lambda = -point.normal_mass * (normal_speed - point.velocity_bias);

        let old = point.normal_impulse;
        point.normal_impulse = (old + lambda).max(0.0);
        let applied = point.normal_impulse - old;

        let impulse = normal * applied;
        body1.apply_impulse(&impulse, &point.r1);
        body2.apply_impulse(&-impulse, &point.r2);
    }
}

/// One position iteration for one contact; returns whether its residual
/// error is within tolerance.
fn solve_contact_position(
    contact: &mut Contact,
    state: &mut [SolverBody],
    settings: &Settings,
) -> bool {
    if !contact.is_solved() {
        return true;
    }
    let (i1, i2) = (contact.island1, contact.island2);
    let normal = contact.normal;
    let mut max_error: f64 = 0.0;

    for point in &contact.points {
        let (body1, body2) = pair_mut(state, i1, i2);

        let p1 = body1.transform.transform_point(&point.local1);
        let p2 = body2.transform.transform_point(&point.local2);

        // Body 1 separates by moving along +normal; penetration shrinks
        // accordingly.
        let depth = point.depth - normal.dot(&(p1 - p2));
        max_error = max_error.max(depth - settings.linear_slop);

        let correction = (settings.baumgarte * (depth - settings.linear_slop))
            .clamp(0.0, settings.max_correction);
        if correction <= 0.0 {
            continue;
        }

        let r1 = p1 - body1.world_center();
        let r2 = p2 - body2.world_center();
        let rn1 = cross(&r1, &normal);
        let rn2 = cross(&r2, &normal);
        let k = body1.inv_mass
            + body2.inv_mass
            + body1.inv_inertia * rn1 * rn1
            + body2.inv_inertia * rn2 * rn2;
        if k <= 0.0 {
            continue;
        }

        let impulse = normal * (correction / k);
        body1.apply_position_impulse(&impulse, &r1);
        body2.apply_position_impulse(&-impulse, &r2);
    }

    max_error < settings.position_epsilon
}

/// Island-wide sleep bookkeeping: the island sleeps only when every
/// dynamic member has rested long enough.
fn update_island_sleep(
    island: &Island,
    bodies: &mut BTreeMap<BodyId, Body>,
    settings: &Settings,
    dt: f64,
) {
    if !settings.auto_sleeping {
        return;
    }

    let mut min_sleep_time = f64::INFINITY;
    for id in &island.bodies {
        let Some(body) = bodies.get_mut(id) else {
            continue;
        };
        if !body.is_dynamic() {
            continue;
        }
        let resting = body.auto_sleep()
            && body.velocity.speed() <= settings.sleep_linear_velocity
            && body.velocity.angular.abs() <= settings.sleep_angular_velocity;
        if resting {
            body.sleep_time += dt;
        } else {
            body.sleep_time = 0.0;
        }
        min_sleep_time = min_sleep_time.min(body.sleep_time);
    }

    if min_sleep_time >= settings.sleep_time {
        for id in &island.bodies {
            if let Some(body) = bodies.get_mut(id) {
                if body.is_dynamic() {
                    body.set_asleep(true);
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::events::ContactPair;
    use crate::Fixture;
    use nalgebra::Point2;
    use planar_collision::{Manifold, ManifoldPoint, ManifoldPointId};
    use planar_geometry::{Convex, Polygon};
    use planar_types::{FixtureKey, FixtureId, MassKind, Transform, Velocity};

    fn make_body(id: u64, kind: MassKind, y: f64) -> Body {
        let mut body = Body::new();
        body.id = BodyId::new(id);
        body.add_fixture(Fixture::new(Convex::from(
            Polygon::rectangle(1.0, 1.0).unwrap(),
        )));
        body.set_mass_from_fixtures(kind).unwrap();
        body.set_transform(Transform::from_position(Point2::new(0.0, y)));
        body.in_world = true;
        body
    }

    /// A floor at y=0 (top face y=0.5) and a box overlapping it slightly.
    fn resting_setup(
        approach_speed: f64,
        restitution: f64,
    ) -> (
        BTreeMap<BodyId, Body>,
        ContactManager,
        BTreeMap<JointId, Box<dyn Joint>>,
        Island,
    ) {
        let mut bodies = BTreeMap::new();
        let floor = make_body(1, MassKind::Infinite, 0.0);
        let mut falling = make_body(2, MassKind::Normal, 0.99);
        falling.velocity = Velocity::linear(Vector2::new(0.0, -approach_speed));
        bodies.insert(BodyId::new(1), floor);
        bodies.insert(BodyId::new(2), falling);

        let mut contacts = ContactManager::new();
        let pair = ContactPair::new(
            FixtureKey::new(BodyId::new(1), FixtureId::new(0)),
            FixtureKey::new(BodyId::new(2), FixtureId::new(0)),
        );
        // Manifold: normal from body 2 toward body 1 (downward), two
        // points on the overlap line.
        let manifold = Manifold {
            normal: -Vector2::y(),
            points: vec![
                ManifoldPoint {
                    id: ManifoldPointId::Indexed {
                        reference: 2,
                        incident: 0,
                        vertex: 0,
                        flipped: false,
                    },
                    point: Point2::new(-0.5, 0.495),
                    depth: 0.01,
                },
                ManifoldPoint {
                    id: ManifoldPointId::Indexed {
                        reference: 2,
                        incident: 0,
                        vertex: 1,
                        flipped: false,
                    },
                    point: Point2::new(0.5, 0.495),
                    depth: 0.01,
                },
            ],
        };
        contacts.begin_update();
        contacts.update_pair(
            pair,
            &manifold,
            bodies[&BodyId::new(1)].transform(),
            bodies[&BodyId::new(2)].transform(),
            0.3,
            restitution,
            false,
        );
        contacts.finish_update();

        let joints = BTreeMap::new();
        let island = Island {
            bodies: vec![BodyId::new(2), BodyId::new(1)],
            contacts: vec![(pair.fixture1, pair.fixture2)],
            joints: vec![],
        };
        (bodies, contacts, joints, island)
    }

    #[test]
    fn test_contact_stops_approach() {
        let settings = Settings::default();
        let (mut bodies, mut contacts, mut joints, island) = resting_setup(1.0, 0.0);

        solve_island(
            &island,
            &mut bodies,
            &mut contacts,
            &mut joints,
            &settings,
            settings.timestep,
        );

        let box_velocity = bodies[&BodyId::new(2)].velocity();
        assert!(
            box_velocity.linear.y.abs() < 1e-6,
            "approach velocity resolved, got {}",
            box_velocity.linear.y
        );
        // The floor never moves.
        assert_eq!(bodies[&BodyId::new(1)].velocity(), Velocity::zero());
    }

    #[test]
    fn test_restitution_bounces() {
        let settings = Settings::default();
        // Fast approach, full restitution
        let (mut bodies, mut contacts, mut joints, island) = resting_setup(5.0, 1.0);

        solve_island(
            &island,
            &mut bodies,
            &mut contacts,
            &mut joints,
            &settings,
            settings.timestep,
        );

        let box_velocity = bodies[&BodyId::new(2)].velocity();
        assert!(
            box_velocity.linear.y > 4.0,
            "box bounces back, got {}",
            box_velocity.linear.y
        );
    }

    #[test]
    fn test_normal_impulses_are_non_negative() {
        let settings = Settings::default();
        let (mut bodies, mut contacts, mut joints, island) = resting_setup(2.0, 0.0);

        solve_island(
            &island,
            &mut bodies,
            &mut contacts,
            &mut joints,
            &settings,
            settings.timestep,
        );

        for contact in contacts.iter() {
            for point in &contact.points {
                assert!(point.normal_impulse >= 0.0);
                assert!(
                    point.tangent_impulse.abs()
                        <= contact.friction * point.normal_impulse + 1e-9
                );
            }
        }
    }

    #[test]
    fn test_position_solve_pushes_out() {
        let settings = Settings::default();
        let (mut bodies, mut contacts, mut joints, island) = resting_setup(0.0, 0.0);
        let before = bodies[&BodyId::new(2)].transform().position.y;

        solve_island(
            &island,
            &mut bodies,
            &mut contacts,
            &mut joints,
            &settings,
            settings.timestep,
        );

        let after = bodies[&BodyId::new(2)].transform().position.y;
        assert!(after > before, "penetration is corrected upward");
    }

    #[test]
    fn test_island_sleep_after_rest() {
        let mut settings = Settings::default();
        settings.sleep_time = 0.05;
        let (mut bodies, mut contacts, mut joints, island) = resting_setup(0.0, 0.0);

        for _ in 0..10 {
            solve_island(
                &island,
                &mut bodies,
                &mut contacts,
                &mut joints,
                &settings,
                settings.timestep,
            );
        }

        assert!(bodies[&BodyId::new(2)].is_asleep());
    }

    #[test]
    fn test_post_solve_reports_impulses() {
        let settings = Settings::default();
        let (mut bodies, mut contacts, mut joints, island) = resting_setup(1.0, 0.0);

        let events = solve_island(
            &island,
            &mut bodies,
            &mut contacts,
            &mut joints,
            &settings,
            settings.timestep,
        );

        assert_eq!(events.len(), 1);
        assert!(events[0].points.iter().any(|p| p.normal_impulse > 0.0));
    }
}
