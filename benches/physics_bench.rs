//! Benchmarks for the world step and broad phase.
//!
//! Run with: cargo bench --bench physics_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rustphy2d::collision::DynamicTree;
use rustphy2d::geometry::{Aabb, PolygonShape};
use rustphy2d::prelude::*;

// =============================================================================
// Scene Construction
// =============================================================================

/// A pyramid of boxes on a static ground
fn pyramid(rows: usize) -> World {
    let mut world = World::default();
    let ground = world.create_body(&BodyDef::fixed()).unwrap();
    world
        .create_fixture(ground, &FixtureDef::new(Shape::cuboid(40.0, 0.5)))
        .unwrap();

    for row in 0..rows {
        for col in 0..(rows - row) {
            let x = (col as f32 - (rows - 1 - row) as f32 * 0.5) * 1.05;
            let y = 1.0 + row as f32 * 1.02;
            let body = world
                .create_body(&BodyDef::dynamic().with_position(Vec2::new(x, y)))
                .unwrap();
            world
                .create_fixture(body, &FixtureDef::new(Shape::cuboid(0.5, 0.5)).with_density(1.0))
                .unwrap();
        }
    }
    world
}

/// Loose circles falling into a box
fn circle_rain(count: usize) -> World {
    let mut world = World::default();
    let ground = world.create_body(&BodyDef::fixed()).unwrap();
    for (hx, hy, x, y) in [(20.0, 0.5, 0.0, 0.0), (0.5, 20.0, -20.0, 20.0), (0.5, 20.0, 20.0, 20.0)] {
        let wall = PolygonShape::new_oriented_box(hx, hy, Vec2::new(x, y), 0.0);
        world
            .create_fixture(ground, &FixtureDef::new(Shape::Polygon(wall)))
            .unwrap();
    }

    for i in 0..count {
        let x = (i % 30) as f32 * 1.2 - 18.0;
        let y = 2.0 + (i / 30) as f32 * 1.2;
        let body = world
            .create_body(&BodyDef::dynamic().with_position(Vec2::new(x, y)))
            .unwrap();
        world
            .create_fixture(body, &FixtureDef::new(Shape::circle(0.5)).with_density(1.0))
            .unwrap();
    }
    world
}

// =============================================================================
// Benchmarks
// =============================================================================

fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("world_step");

    for rows in [5usize, 10, 20] {
        let bodies = rows * (rows + 1) / 2;
        group.throughput(Throughput::Elements(bodies as u64));
        group.bench_with_input(BenchmarkId::new("pyramid", bodies), &rows, |b, &rows| {
            let mut world = pyramid(rows);
            b.iter(|| world.step(black_box(1.0 / 60.0), 8, 3));
        });
    }

    for count in [100usize, 400] {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("circle_rain", count), &count, |b, &count| {
            let mut world = circle_rain(count);
            b.iter(|| world.step(black_box(1.0 / 60.0), 8, 3));
        });
    }

    group.finish();
}

fn bench_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("dynamic_tree");

    for count in [256usize, 1024] {
        let boxes: Vec<Aabb> = (0..count)
            .map(|i| {
                let x = (i % 32) as f32 * 3.0;
                let y = (i / 32) as f32 * 3.0;
                Aabb::new(Vec2::new(x, y), Vec2::new(x + 1.0, y + 1.0))
            })
            .collect();

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("build", count), &boxes, |b, boxes| {
            b.iter(|| {
                let mut tree: DynamicTree<usize> = DynamicTree::new();
                for (i, aabb) in boxes.iter().enumerate() {
                    tree.create_proxy(black_box(aabb), i);
                }
                tree.height()
            });
        });

        let mut tree: DynamicTree<usize> = DynamicTree::new();
        for (i, aabb) in boxes.iter().enumerate() {
            tree.create_proxy(aabb, i);
        }
        let probe = Aabb::new(Vec2::new(10.0, 10.0), Vec2::new(25.0, 25.0));
        group.bench_with_input(BenchmarkId::new("query", count), &tree, |b, tree| {
            b.iter(|| {
                let mut hits = 0usize;
                tree.query(black_box(&probe), |_| {
                    hits += 1;
                    true
                });
                hits
            });
        });
    }

    group.finish();
}

// =============================================================================
// Criterion Setup
// =============================================================================

criterion_group!(benches, bench_step, bench_tree);
criterion_main!(benches);
