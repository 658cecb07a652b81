//! World step benchmarks: a box pyramid and a bucket of mixed shapes.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use nalgebra::Point2;
use planar_dynamics::{Body, Bounds, Fixture, World};
use planar_geometry::{Circle, Convex, Polygon, Segment};
use planar_types::{MassKind, Settings, Transform};

const DT: f64 = 1.0 / 60.0;

fn floor() -> Body {
    let mut body = Body::new();
    body.add_fixture(Fixture::new(Convex::from(
        Polygon::rectangle(60.0, 1.0).unwrap(),
    )));
    body.set_mass_from_fixtures(MassKind::Infinite).unwrap();
    body.set_transform(Transform::from_position(Point2::new(0.0, -0.5)));
    body
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

/// A pyramid of boxes, `base` wide at the bottom.
fn pyramid_world(base: usize) -> World {
    let mut world = World::new(Bounds::rectangle(200.0, 200.0), Settings::default().no_sleeping()).unwrap();
    world.add_body(floor()).unwrap();

    for row in 0..base {
        let count = base - row;
        let y = 0.5 + row as f64 * 1.0;
        let start = -(count as f64 - 1.0) * 0.5;
        for i in 0..count {
            world
                .add_body(unit_box_at(start + i as f64, y))
                .unwrap();
        }
    }
    world
}

/// A segment bucket filled with alternating circles and boxes.
fn bucket_world(count: usize) -> World {
    let mut world = World::new(Bounds::rectangle(200.0, 200.0), Settings::default().no_sleeping()).unwrap();

    let mut bucket = Body::new();
    bucket.add_fixture(Fixture::new(Convex::from(
        Segment::new(Point2::new(-10.0, 0.0), Point2::new(10.0, 0.0)).unwrap(),
    )));
    bucket.add_fixture(Fixture::new(Convex::from(
        Segment::new(Point2::new(-10.0, 0.0), Point2::new(-10.0, 30.0)).unwrap(),
    )));
    bucket.add_fixture(Fixture::new(Convex::from(
        Segment::new(Point2::new(10.0, 0.0), Point2::new(10.0, 30.0)).unwrap(),
    )));
    bucket.set_mass_from_fixtures(MassKind::Infinite).unwrap();
    world.add_body(bucket).unwrap();

    for i in 0..count {
        let x = -9.0 + (i % 19) as f64;
        let y = 1.0 + (i / 19) as f64 * 1.1;
        let mut body = Body::new();
        if i % 2 == 0 {
            body.add_fixture(Fixture::new(Convex::from(Circle::new(0.4).unwrap())));
        } else {
            body.add_fixture(Fixture::new(Convex::from(
                Polygon::rectangle(0.8, 0.8).unwrap(),
            )));
        }
        body.set_mass_from_fixtures(MassKind::Normal).unwrap();
        body.set_transform(Transform::from_position(Point2::new(x, y)));
        world.add_body(body).unwrap();
    }
    world
}

fn bench_pyramid(c: &mut Criterion) {
    let mut group = c.benchmark_group("pyramid_step");
    for base in [5, 10, 15] {
        group.bench_with_input(BenchmarkId::from_parameter(base), &base, |b, &base| {
            let mut world = pyramid_world(base);
            // Let the stack settle so the benchmark measures steady-state
            // stepping with warm-started contacts.
            for _ in 0..60 {
                world.step(DT).unwrap();
            }
            b.iter(|| world.step(DT).unwrap());
        });
    }
    group.finish();
}

fn bench_bucket(c: &mut Criterion) {
    let mut group = c.benchmark_group("bucket_step");
    group.sample_size(20);
    for count in [50, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let mut world = bucket_world(count);
            for _ in 0..120 {
                world.step(DT).unwrap();
            }
            b.iter(|| world.step(DT).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_pyramid, bench_bucket);
criterion_main!(benches);
