//! Narrow-phase routines exercised through the public collision API.

use approx::assert_relative_eq;
use rustphy2d::collision::{
    collide_circles, collide_polygons, distance, time_of_impact, DistanceInput, SimplexCache,
    ToiInput, WorldManifold,
};
use rustphy2d::geometry::{CircleShape, PolygonShape, RayCastInput, Shape};
use rustphy2d::math::{Sweep, Transform, Vec2};
use rustphy2d::settings::{LINEAR_SLOP, POLYGON_RADIUS};

fn stationary(center: Vec2) -> Sweep {
    Sweep {
        c0: center,
        c: center,
        ..Default::default()
    }
}

#[test]
fn test_gjk_circle_distance_uses_radii() {
    let a = Shape::circle(1.0);
    let b = Shape::circle(0.5);
    let input = DistanceInput {
        proxy_a: a.distance_proxy(),
        proxy_b: b.distance_proxy(),
        transform_a: Transform::IDENTITY,
        transform_b: Transform::from_angle(Vec2::new(5.0, 0.0), 0.0),
        use_radii: true,
    };

    let mut cache = SimplexCache::default();
    let first = distance(&mut cache, &input);
    assert_relative_eq!(first.distance, 3.5, epsilon = 1e-5);
    assert_relative_eq!(first.point_a.x, 1.0, epsilon = 1e-5);
    assert_relative_eq!(first.point_b.x, 4.5, epsilon = 1e-5);

    // Warm-started call gives the same answer
    let second = distance(&mut cache, &input);
    assert_relative_eq!(second.distance, first.distance);

    // Overlapping circles clamp to zero
    let close = DistanceInput {
        transform_b: Transform::from_angle(Vec2::new(1.0, 0.0), 0.0),
        ..input
    };
    let mut cache = SimplexCache::default();
    assert_eq!(distance(&mut cache, &close).distance, 0.0);
}

#[test]
fn test_gjk_polygon_distance() {
    let a = Shape::cuboid(1.0, 1.0);
    let b = Shape::cuboid(0.5, 0.5);
    let input = DistanceInput {
        proxy_a: a.distance_proxy(),
        proxy_b: b.distance_proxy(),
        transform_a: Transform::IDENTITY,
        transform_b: Transform::from_angle(Vec2::new(4.0, 0.0), 0.0),
        use_radii: false,
    };
    let mut cache = SimplexCache::default();
    let output = distance(&mut cache, &input);
    assert_relative_eq!(output.distance, 2.5, epsilon = 1e-5);
    assert!(output.distance >= 0.0);
}

#[test]
fn test_circle_manifold_world_point() {
    let a = CircleShape::new(1.0);
    let b = CircleShape::new(1.0);
    let xf_a = Transform::IDENTITY;
    let xf_b = Transform::from_angle(Vec2::new(1.5, 0.0), 0.0);

    let manifold = collide_circles(&a, &xf_a, &b, &xf_b);
    assert_eq!(manifold.point_count, 1);

    let mut world = WorldManifold::default();
    world.initialize(&manifold, &xf_a, a.radius, &xf_b, b.radius);
    assert_relative_eq!(world.normal.x, 1.0);
    assert_relative_eq!(world.points[0].x, 0.75, epsilon = 1e-5);

    let apart = Transform::from_angle(Vec2::new(2.5, 0.0), 0.0);
    assert_eq!(collide_circles(&a, &xf_a, &b, &apart).point_count, 0);
}

#[test]
fn test_polygon_manifold_is_symmetric() {
    let a = PolygonShape::new_box(1.0, 0.5);
    let b = PolygonShape::new_box(0.5, 0.5);
    let xf_a = Transform::IDENTITY;
    let xf_b = Transform::from_angle(Vec2::new(0.2, 0.95), 0.0);

    let ab = collide_polygons(&a, &xf_a, &b, &xf_b);
    let ba = collide_polygons(&b, &xf_b, &a, &xf_a);
    assert_eq!(ab.point_count, 2);
    assert_eq!(ba.point_count, 2);

    let mut world_ab = WorldManifold::default();
    world_ab.initialize(&ab, &xf_a, POLYGON_RADIUS, &xf_b, POLYGON_RADIUS);
    let mut world_ba = WorldManifold::default();
    world_ba.initialize(&ba, &xf_b, POLYGON_RADIUS, &xf_a, POLYGON_RADIUS);

    assert_relative_eq!(world_ab.normal.x, -world_ba.normal.x, epsilon = 1e-5);
    assert_relative_eq!(world_ab.normal.y, -world_ba.normal.y, epsilon = 1e-5);
    assert_relative_eq!(world_ab.normal.y, 1.0, epsilon = 1e-5);

    // The reference face swaps with the argument order. Side planes are
    // pushed out by the skin radii and each point sits midway between the
    // clip point and the reference face, so the two orderings agree to
    // within the penetration depth.
    let penetration = 0.5 + 0.5 + 2.0 * POLYGON_RADIUS - 0.95;
    let mut points_ab: Vec<Vec2> = world_ab.points.to_vec();
    let mut points_ba: Vec<Vec2> = world_ba.points.to_vec();
    points_ab.sort_by(|p, q| p.x.total_cmp(&q.x));
    points_ba.sort_by(|p, q| p.x.total_cmp(&q.x));
    for (p, q) in points_ab.iter().zip(&points_ba) {
        assert!((p.x - q.x).abs() <= penetration + 1e-4, "{} vs {}", p.x, q.x);
        assert!((p.y - q.y).abs() <= penetration + 1e-4, "{} vs {}", p.y, q.y);
    }
}

#[test]
fn test_toi_of_circle_hitting_box() {
    let wall = Shape::cuboid(0.5, 0.5);
    let ball = Shape::circle(0.5);
    let mut sweep_b = stationary(Vec2::new(-5.0, 0.0));
    sweep_b.c = Vec2::new(5.0, 0.0);

    let input = ToiInput {
        proxy_a: wall.distance_proxy(),
        proxy_b: ball.distance_proxy(),
        sweep_a: stationary(Vec2::ZERO),
        sweep_b,
        tolerance: LINEAR_SLOP,
    };
    let toi = time_of_impact(&input);

    // The ball reaches the box after 4 of the 10 units travelled
    assert!(toi > 0.0 && toi < 1.0);
    assert_relative_eq!(toi, 0.4, epsilon = 0.01);

    // At the reported time the shapes are close but not overlapping
    let xf_a = input.sweep_a.transform_at(toi);
    let xf_b = input.sweep_b.transform_at(toi);
    let gap = (xf_a.position.x - 0.5) - (xf_b.position.x + 0.5);
    assert!(gap > -LINEAR_SLOP, "overlap at toi: {}", gap);
}

#[test]
fn test_toi_of_separating_shapes_is_one() {
    let a = Shape::circle(0.5);
    let b = Shape::circle(0.5);
    let mut sweep_b = stationary(Vec2::new(3.0, 0.0));
    sweep_b.c = Vec2::new(6.0, 0.0);

    let input = ToiInput {
        proxy_a: a.distance_proxy(),
        proxy_b: b.distance_proxy(),
        sweep_a: stationary(Vec2::ZERO),
        sweep_b,
        tolerance: LINEAR_SLOP,
    };
    assert_eq!(time_of_impact(&input), 1.0);
}

#[test]
fn test_shape_ray_casts() {
    let xf = Transform::from_angle(Vec2::new(0.0, 2.0), 0.0);
    let input = RayCastInput::new(Vec2::new(-5.0, 2.0), Vec2::new(5.0, 2.0));

    let hit = Shape::cuboid(1.0, 1.0).ray_cast(&input, &xf).unwrap();
    assert_relative_eq!(hit.fraction, 0.4, epsilon = 1e-5);
    assert_relative_eq!(hit.normal.x, -1.0);

    let hit = Shape::circle(1.0).ray_cast(&input, &xf).unwrap();
    assert_relative_eq!(hit.fraction, 0.4, epsilon = 1e-5);

    // Edges are one-sided: this one faces +x
    let edge = Shape::edge(Vec2::new(0.0, -1.0), Vec2::new(0.0, 1.0));
    let front = RayCastInput::new(Vec2::new(5.0, 2.0), Vec2::new(-5.0, 2.0));
    let hit = edge.ray_cast(&front, &xf).unwrap();
    assert_relative_eq!(hit.fraction, 0.5, epsilon = 1e-5);
    assert_relative_eq!(hit.normal.x, 1.0, epsilon = 1e-5);
    assert!(edge.ray_cast(&input, &xf).is_none());

    let miss = RayCastInput::new(Vec2::new(-5.0, 5.0), Vec2::new(5.0, 5.0));
    assert!(Shape::cuboid(1.0, 1.0).ray_cast(&miss, &xf).is_none());
}

#[test]
fn test_polygon_rejects_degenerate_input() {
    assert!(Shape::polygon(&[Vec2::ZERO]).is_err());
    assert!(Shape::polygon(&[Vec2::ZERO, Vec2::X, Vec2::new(2.0, 0.0)]).is_err());
    let square = Shape::polygon(&[
        Vec2::new(-1.0, -1.0),
        Vec2::new(1.0, -1.0),
        Vec2::new(1.0, 1.0),
        Vec2::new(-1.0, 1.0),
    ])
    .unwrap();
    let mass = square.compute_mass(1.0);
    assert_relative_eq!(mass.mass, 4.0, epsilon = 1e-5);
    assert_relative_eq!(mass.center.x, 0.0, epsilon = 1e-6);
}
