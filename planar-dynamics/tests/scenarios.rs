//! End-to-end scenario tests for the world step loop.
//!
//! Each scenario builds a small world, runs it for a fixed number of
//! steps, and checks literal expected outcomes: resting heights, drift
//! bounds, sleep states, motor travel, and tunneling behavior.

use nalgebra::{Point2, Vector2};
use planar_dynamics::{Body, Bounds, Fixture, World};
use planar_geometry::{Circle, Convex, Polygon, Segment};
use planar_joint::RevoluteJoint;
use planar_types::{ContinuousMode, MassKind, Settings, Transform, Velocity};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const DT: f64 = 1.0 / 60.0;

fn static_floor(width: f64) -> Body {
    let mut floor = Body::new();
    floor.add_fixture(Fixture::new(Convex::from(
        Polygon::rectangle(width, 1.0).unwrap(),
    )));
    floor.set_mass_from_fixtures(MassKind::Infinite).unwrap();
    // Top face at y = 0.
    floor.set_transform(Transform::from_position(Point2::new(0.0, -0.5)));
    floor
}

fn unit_box_at(x: f64, y: f64) -> Body {
    let mut body = Body::new();
    body.add_fixture(Fixture::new(Convex::from(
        Polygon::rectangle(1.0, 1.0).unwrap(),
    )));
    body.set_mass_from_fixtures(MassKind::Normal).unwrap();
    body.set_transform(Transform::from_position(Point2::new(x, y)));
    body
}

/// S1: a unit box dropped from y = 10 lands on the floor, comes to rest
/// at its half-height, and falls asleep.
#[test]
fn dropped_box_rests_and_sleeps() {
    let mut world = World::new(Bounds::rectangle(40.0, 40.0), Settings::default()).unwrap();
    world.add_body(static_floor(20.0)).unwrap();
    let falling = world.add_body(unit_box_at(0.0, 10.0)).unwrap();

    for _ in 0..120 {
        world.step(DT).unwrap();
    }

    {
        let body = world.body(falling).unwrap();
        let y = body.transform().position.y;
        // The position solver corrects penetration only beyond
        // `linear_slop`, so a resting contact holds the box up to that
        // far below its exact half-height.
        let lower = 0.5 - world.settings().linear_slop;
        assert!(
            (lower..=0.55).contains(&y),
            "box rests at half-height (within the slop allowance), got y = {y}"
        );
        assert!(
            body.velocity().speed() < 0.05,
            "box is at rest, speed = {}",
            body.velocity().speed()
        );
    }

    // Asleep within a further 300 steps.
    let mut asleep_at = None;
    for i in 0..300 {
        world.step(DT).unwrap();
        if world.body(falling).unwrap().is_asleep() {
            asleep_at = Some(i);
            break;
        }
    }
    assert!(asleep_at.is_some(), "box fell asleep");
}

/// S2: ten stacked boxes stay aligned and all fall asleep.
#[test]
fn stacked_boxes_stay_put() {
    let mut world = World::new(Bounds::rectangle(40.0, 40.0), Settings::default()).unwrap();
    world.add_body(static_floor(20.0)).unwrap();

    let mut stack = Vec::new();
    for i in 0..10 {
        stack.push(world.add_body(unit_box_at(0.0, 0.5 + i as f64)).unwrap());
    }

    for _ in 0..600 {
        world.step(DT).unwrap();
    }

    for id in &stack {
        let body = world.body(*id).unwrap();
        let x = body.transform().position.x;
        assert!(
            x.abs() < 0.05,
            "lateral drift stays small, got x = {x} for {id}"
        );
        assert!(body.is_asleep(), "{id} is asleep");
    }
}

/// S3: a seesaw with a heavy box dropped on the right end tips right.
#[test]
fn seesaw_tips_toward_heavier_box() {
    let mut world = World::new(Bounds::rectangle(60.0, 60.0), Settings::default()).unwrap();

    // Static triangular pivot, apex at (0, 1).
    let mut pivot = Body::new();
    pivot.add_fixture(
        Fixture::new(Convex::from(
            Polygon::triangle(
                Point2::new(-1.0, 0.0),
                Point2::new(1.0, 0.0),
                Point2::new(0.0, 1.0),
            )
            .unwrap(),
        ))
        .with_friction(0.8)
        .unwrap(),
    );
    pivot.set_mass_from_fixtures(MassKind::Infinite).unwrap();
    world.add_body(pivot).unwrap();

    // Plank resting on the apex.
    let mut plank = Body::new();
    plank.add_fixture(
        Fixture::new(Convex::from(Polygon::rectangle(10.0, 0.2).unwrap()))
            .with_friction(0.8)
            .unwrap(),
    );
    plank.set_mass_from_fixtures(MassKind::Normal).unwrap();
    plank.set_transform(Transform::from_position(Point2::new(0.0, 1.1)));
    let plank_id = world.add_body(plank).unwrap();

    // Light box over the left end, heavy box over the right end.
    world.add_body(unit_box_at(-4.0, 2.5)).unwrap();
    let mut heavy = Body::new();
    heavy.add_fixture(
        Fixture::new(Convex::from(Polygon::rectangle(1.0, 1.0).unwrap()))
            .with_density(3.0)
            .unwrap(),
    );
    heavy.set_mass_from_fixtures(MassKind::Normal).unwrap();
    heavy.set_transform(Transform::from_position(Point2::new(4.0, 5.7)));
    world.add_body(heavy).unwrap();

    for _ in 0..300 {
        world.step(DT).unwrap();
    }

    let plank = world.body(plank_id).unwrap();
    let left_end = plank.world_point(&Point2::new(-5.0, 0.0));
    let right_end = plank.world_point(&Point2::new(5.0, 0.0));
    assert!(
        right_end.y < left_end.y,
        "right end dips: right {} vs left {}",
        right_end.y,
        left_end.y
    );
}

/// S4: two hundred random bodies dropped into a segment bucket all stay
/// inside, and nearly all of them fall asleep.
#[test]
fn bucket_contains_and_settles() {
    let mut world = World::new(Bounds::rectangle(100.0, 100.0), Settings::default()).unwrap();

    // Three-segment bucket: floor plus two walls.
    let mut bucket = Body::new();
    bucket.add_fixture(Fixture::new(Convex::from(
        Segment::new(Point2::new(-10.0, 0.0), Point2::new(10.0, 0.0)).unwrap(),
    )));
    bucket.add_fixture(Fixture::new(Convex::from(
        Segment::new(Point2::new(-10.0, 0.0), Point2::new(-10.0, 14.0)).unwrap(),
    )));
    bucket.add_fixture(Fixture::new(Convex::from(
        Segment::new(Point2::new(10.0, 0.0), Point2::new(10.0, 14.0)).unwrap(),
    )));
    bucket.set_mass_from_fixtures(MassKind::Infinite).unwrap();
    world.add_body(bucket).unwrap();

    // 200 bodies in a loose grid with deterministic random sizes.
    let mut rng = StdRng::seed_from_u64(42);
    let mut dropped = Vec::new();
    for i in 0..200 {
        let column = i % 20;
        let row = i / 20;
        let x = -9.0 + column as f64 * 0.95 + rng.gen_range(-0.05..0.05);
        let y = 1.0 + row as f64 * 1.1;
        let size = rng.gen_range(0.2..0.45);

        let mut body = Body::new();
        let fixture = if rng.gen_bool(0.5) {
            Fixture::new(Convex::from(Circle::new(size).unwrap()))
        } else {
            Fixture::new(Convex::from(
                Polygon::rectangle(size * 2.0, size * 2.0).unwrap(),
            ))
        };
        body.add_fixture(fixture.with_friction(0.5).unwrap());
        body.set_mass_from_fixtures(MassKind::Normal).unwrap();
        body.set_transform(Transform::from_position(Point2::new(x, y)));
        dropped.push(world.add_body(body).unwrap());
    }

    for _ in 0..1200 {
        world.step(DT).unwrap();
    }

    let bucket_region = planar_geometry::Aabb::new(
        Point2::new(-10.5, -0.5),
        Point2::new(10.5, 14.5),
    );
    let mut outside = 0;
    let mut asleep = 0;
    for id in &dropped {
        let body = world.body(*id).unwrap();
        if !bucket_region.contains_point(&body.transform().position) {
            outside += 1;
        }
        if body.is_asleep() {
            asleep += 1;
        }
    }
    assert_eq!(outside, 0, "no body escapes the bucket");
    assert!(asleep >= 180, "most bodies settle, asleep = {asleep}");
}

/// S5: a revolute motor at π rad/s advances the joint by 2π over two
/// seconds of simulated time.
#[test]
fn revolute_motor_tracks_target_speed() {
    let mut world = World::new(Bounds::rectangle(40.0, 40.0), Settings::default()).unwrap();
    world.set_gravity(Vector2::zeros()).unwrap();

    let mut base = unit_box_at(0.0, 0.0);
    base.set_mass_from_fixtures(MassKind::Infinite).unwrap();
    let base_id = world.add_body(base).unwrap();

    let mut wheel = unit_box_at(0.0, 0.0);
    // No angular damping: the motor's speed target should be hit exactly.
    wheel.set_angular_damping(0.0).unwrap();
    let wheel_id = world.add_body(wheel).unwrap();

    let joint = RevoluteJoint::world_anchored(
        base_id,
        wheel_id,
        world.body(base_id).unwrap().transform(),
        world.body(wheel_id).unwrap().transform(),
        Point2::origin(),
    )
    .with_motor(std::f64::consts::PI, 100.0);
    world.add_joint(joint).unwrap();

    // Accumulate relative rotation step by step (the transform angle
    // itself wraps at π).
    let mut travelled = 0.0;
    for _ in 0..120 {
        world.step(DT).unwrap();
        let w1 = world.body(base_id).unwrap().velocity().angular;
        let w2 = world.body(wheel_id).unwrap().velocity().angular;
        travelled += (w2 - w1) * DT;
    }

    let expected = 2.0 * std::f64::consts::PI;
    assert!(
        (travelled - expected).abs() < 0.05,
        "motor travels 2π over 2 s, got {travelled}"
    );
}

/// S6: a fast circle tunnels through a thin wall with CCD off, and is
/// stopped by it with CCD on.
#[test]
fn bullet_tunneling_depends_on_ccd() {
    fn fired_circle() -> Body {
        let mut body = Body::new();
        body.add_fixture(Fixture::new(Convex::from(Circle::new(0.1).unwrap())));
        body.set_mass_from_fixtures(MassKind::Normal).unwrap();
        body.set_transform(Transform::from_position(Point2::new(-5.0, 0.0)));
        body.set_velocity(Velocity::linear(Vector2::new(500.0, 0.0)));
        body
    }

    fn thin_wall() -> Body {
        let mut wall = Body::new();
        wall.add_fixture(Fixture::new(Convex::from(
            Polygon::rectangle(0.05, 10.0).unwrap(),
        )));
        wall.set_mass_from_fixtures(MassKind::Infinite).unwrap();
        wall
    }

    // Without CCD the circle crosses the wall in a single step.
    let settings = Settings::default().with_continuous(ContinuousMode::Off);
    let mut world = World::new(Bounds::rectangle(2000.0, 2000.0), settings).unwrap();
    world.set_gravity(Vector2::zeros()).unwrap();
    world.add_body(thin_wall()).unwrap();
    let free = world.add_body(fired_circle()).unwrap();

    world.step(DT).unwrap();
    assert!(
        world.body(free).unwrap().transform().position.x > 0.0,
        "tunneling is permitted with CCD off"
    );

    // With CCD the circle never reaches the wall plane.
    let mut world = World::new(Bounds::rectangle(2000.0, 2000.0), Settings::default()).unwrap();
    world.set_gravity(Vector2::zeros()).unwrap();
    world.add_body(thin_wall()).unwrap();
    let mut bullet = fired_circle();
    bullet.set_bullet(true);
    let stopped = world.add_body(bullet).unwrap();

    for _ in 0..30 {
        world.step(DT).unwrap();
        let x = world.body(stopped).unwrap().transform().position.x;
        assert!(x < 0.0, "bullet never crosses the wall, got x = {x}");
    }
}

/// In a frictionless, fully elastic, gravity-free collision the kinetic
/// energy never grows across a step.
#[test]
fn elastic_collision_does_not_gain_energy() {
    let settings = Settings::default().no_sleeping();
    let mut world = World::new(Bounds::rectangle(100.0, 100.0), settings).unwrap();
    world.set_gravity(Vector2::zeros()).unwrap();

    let mut make_ball = |x: f64, vx: f64| {
        let mut body = Body::new();
        body.add_fixture(
            Fixture::new(Convex::from(Circle::new(0.5).unwrap()))
                .with_friction(0.0)
                .unwrap()
                .with_restitution(1.0)
                .unwrap(),
        );
        body.set_mass_from_fixtures(MassKind::Normal).unwrap();
        body.set_angular_damping(0.0).unwrap();
        body.set_transform(Transform::from_position(Point2::new(x, 0.0)));
        body.set_velocity(Velocity::linear(Vector2::new(vx, 0.0)));
        world.add_body(body).unwrap()
    };
    make_ball(-3.0, 4.0);
    make_ball(3.0, -4.0);

    let initial_energy = world.kinetic_energy();
    for _ in 0..120 {
        let before = world.kinetic_energy();
        world.step(DT).unwrap();
        let after = world.kinetic_energy();
        assert!(
            after <= before + 1e-6 * initial_energy,
            "energy does not grow: {before} -> {after}"
        );
    }
}

/// Forces applied to an infinite-mass body never move it.
#[test]
fn infinite_mass_is_immovable() {
    let mut world = World::new(Bounds::rectangle(40.0, 40.0), Settings::default()).unwrap();
    let mut wall = unit_box_at(0.0, 0.0);
    wall.set_mass_from_fixtures(MassKind::Infinite).unwrap();
    let id = world.add_body(wall).unwrap();

    for _ in 0..30 {
        world.body_mut(id).unwrap().apply_force(Vector2::new(1e6, 1e6));
        world.body_mut(id).unwrap().apply_torque(1e6);
        world.step(DT).unwrap();
    }

    let body = world.body(id).unwrap();
    assert_eq!(body.velocity(), Velocity::zero());
    assert_eq!(body.transform().position, Point2::new(0.0, 0.0));
}

/// A joint keeps its bodies listed as joined, and contact queries see
/// touching bodies.
#[test]
fn connectivity_queries() {
    let mut world = World::new(Bounds::rectangle(40.0, 40.0), Settings::default()).unwrap();
    world.add_body(static_floor(20.0)).unwrap();
    let a = world.add_body(unit_box_at(0.0, 0.5)).unwrap();
    let b = world.add_body(unit_box_at(0.0, 1.5)).unwrap();

    let joint = planar_joint::DistanceJoint::world_anchored(
        a,
        b,
        world.body(a).unwrap().transform(),
        world.body(b).unwrap().transform(),
        Point2::new(0.0, 0.5),
        Point2::new(0.0, 1.5),
    )
    .unwrap();
    world.add_joint(joint).unwrap();

    for _ in 0..30 {
        world.step(DT).unwrap();
    }

    assert_eq!(world.joined_bodies(a), vec![b]);
    assert!(world.is_in_contact(a, b));
    let floor_id = world.bodies().find(|body| body.is_static()).unwrap().id();
    assert!(world.is_in_contact(a, floor_id));
}
