//! End-to-end world scenarios: settling, continuous collision, joints,
//! filtering and controllers.

use approx::assert_relative_eq;
use rustphy2d::prelude::*;
use rustphy2d::settings::LINEAR_SLOP;

const DT: f32 = 1.0 / 60.0;

fn ground(world: &mut World) -> BodyHandle {
    let ground = world.create_body(&BodyDef::fixed()).unwrap();
    world
        .create_fixture(ground, &FixtureDef::new(Shape::cuboid(20.0, 0.5)))
        .unwrap();
    ground
}

fn dynamic_box(world: &mut World, position: Vec2, half: f32) -> BodyHandle {
    let body = world
        .create_body(&BodyDef::dynamic().with_position(position))
        .unwrap();
    world
        .create_fixture(
            body,
            &FixtureDef::new(Shape::cuboid(half, half))
                .with_density(1.0)
                .with_friction(0.6),
        )
        .unwrap();
    body
}

fn run(world: &mut World, steps: usize) {
    for _ in 0..steps {
        world.step(DT, 8, 3);
    }
}

/// Steps like an application loop that clears accumulated forces each frame
fn run_clearing(world: &mut World, steps: usize) {
    for _ in 0..steps {
        world.step(DT, 8, 3);
        world.clear_forces();
    }
}

#[test]
fn test_dropped_box_settles_and_sleeps() {
    let mut world = World::default();
    ground(&mut world);
    let body = dynamic_box(&mut world, Vec2::new(0.0, 4.0), 0.5);

    let mut steps = 0;
    while world.body(body).is_awake() && steps < 300 {
        world.step(DT, 8, 3);
        steps += 1;
    }

    assert!(steps < 300, "box still awake after 300 steps");
    let b = world.body(body);
    // Surfaces meet at y = 0.5; the box rests on the polygon skins
    let penetration = 1.0 - b.position().y;
    assert!(penetration <= LINEAR_SLOP, "penetration {}", penetration);
    assert!(b.position().y < 1.05);
    assert!(b.linear_velocity().length() < 1e-3);
    assert!(b.angular_velocity().abs() < 1e-3);
}

#[test]
fn test_pyramid_stays_upright() {
    let mut world = World::default();
    ground(&mut world);

    let mut boxes = Vec::new();
    for row in 0..4 {
        for col in 0..(4 - row) {
            let x = (col as f32 - (3 - row) as f32 * 0.5) * 1.05;
            let y = 1.0 + row as f32 * 1.02;
            boxes.push(dynamic_box(&mut world, Vec2::new(x, y), 0.5));
        }
    }

    run(&mut world, 400);

    for &handle in &boxes {
        let b = world.body(handle);
        assert!(b.angle().abs() < 0.1, "box tipped: angle {}", b.angle());
        assert!(b.position().y > 0.9);
    }
}

#[test]
fn test_bullet_stays_on_approach_side() {
    for (continuous, expect_before_wall) in [(true, true), (false, false)] {
        let mut world = World::new(WorldConfig {
            gravity: Vec2::ZERO,
            continuous_physics: continuous,
            ..Default::default()
        });
        let wall = world
            .create_body(&BodyDef::fixed().with_position(Vec2::new(5.0, 0.0)))
            .unwrap();
        world
            .create_fixture(wall, &FixtureDef::new(Shape::cuboid(0.05, 4.0)))
            .unwrap();

        let bullet = world
            .create_body(
                &BodyDef::dynamic()
                    .with_position(Vec2::new(0.3, 0.0))
                    .with_linear_velocity(Vec2::new(150.0, 0.0))
                    .with_bullet(true),
            )
            .unwrap();
        world
            .create_fixture(bullet, &FixtureDef::new(Shape::circle(0.1)).with_density(1.0))
            .unwrap();

        run(&mut world, 20);

        let x = world.body(bullet).position().x;
        assert_eq!(x < 5.0, expect_before_wall, "continuous={} x={}", continuous, x);
    }
}

#[test]
fn test_restitution_bounces() {
    let mut world = World::default();
    ground(&mut world);
    let ball = world
        .create_body(&BodyDef::dynamic().with_position(Vec2::new(0.0, 3.0)))
        .unwrap();
    world
        .create_fixture(
            ball,
            &FixtureDef::new(Shape::circle(0.25))
                .with_density(1.0)
                .with_restitution(0.8),
        )
        .unwrap();

    let mut went_up = false;
    for _ in 0..120 {
        world.step(DT, 8, 3);
        if world.body(ball).linear_velocity().y > 1.0 {
            went_up = true;
            break;
        }
    }
    assert!(went_up, "ball never bounced");
}

#[test]
fn test_sensor_detects_without_response() {
    use std::cell::Cell;
    use std::rc::Rc;

    struct Begins(Rc<Cell<usize>>);
    impl ContactListener for Begins {
        fn begin_contact(&mut self, contact: &Contact) {
            if contact.is_sensor() {
                self.0.set(self.0.get() + 1);
            }
        }
    }

    let mut world = World::default();
    let begins = Rc::new(Cell::new(0));
    world.set_contact_listener(Begins(begins.clone()));

    let zone = world.create_body(&BodyDef::fixed()).unwrap();
    world
        .create_fixture(zone, &FixtureDef::new(Shape::cuboid(2.0, 0.5)).with_sensor(true))
        .unwrap();
    let body = dynamic_box(&mut world, Vec2::new(0.0, 2.0), 0.25);

    run(&mut world, 60);

    assert_eq!(begins.get(), 1);
    // Fell straight through the sensor
    assert!(world.body(body).position().y < -1.0);
}

#[test]
fn test_group_filtering_disables_collision() {
    let mut world = World::default();
    let floor = world.create_body(&BodyDef::fixed()).unwrap();
    let filter = FilterData {
        group_index: -1,
        ..Default::default()
    };
    world
        .create_fixture(floor, &FixtureDef::new(Shape::cuboid(5.0, 0.5)).with_filter(filter))
        .unwrap();

    let body = world
        .create_body(&BodyDef::dynamic().with_position(Vec2::new(0.0, 2.0)))
        .unwrap();
    world
        .create_fixture(
            body,
            &FixtureDef::new(Shape::circle(0.5)).with_density(1.0).with_filter(filter),
        )
        .unwrap();

    run(&mut world, 60);
    assert!(world.body(body).position().y < 0.0);

    // Fixtures outside the group still land on the floor
    let fresh = dynamic_box(&mut world, Vec2::new(3.0, 2.0), 0.25);
    run(&mut world, 120);
    assert!(world.body(fresh).position().y > 0.5);
}

#[test]
fn test_revolute_pendulum_swings_about_anchor() {
    let mut world = World::default();
    let anchor_body = world.create_body(&BodyDef::fixed()).unwrap();
    let bob = dynamic_box(&mut world, Vec2::new(2.0, 0.0), 0.1);

    let def = RevoluteJointDef::initialize(
        anchor_body,
        world.body(anchor_body),
        bob,
        world.body(bob),
        Vec2::ZERO,
    );
    let joint = world.create_joint(&def.into()).unwrap();

    // A quarter swing
    for _ in 0..40 {
        world.step(DT, 8, 3);
        let r = world.body(bob).position().length();
        assert!((r - 2.0).abs() < 0.02, "pendulum length drifted to {}", r);
    }
    assert!(world.body(bob).position().y < -1.5);

    let JointKind::Revolute(revolute) = world.joint(joint).kind() else {
        panic!("expected a revolute joint");
    };
    let angle = revolute.joint_angle(world.body(anchor_body), world.body(bob));
    assert!(angle < 0.0);
}

#[test]
fn test_revolute_limit_holds() {
    let mut world = World::default();
    let anchor_body = world.create_body(&BodyDef::fixed()).unwrap();
    let arm = dynamic_box(&mut world, Vec2::new(1.0, 0.0), 0.2);

    let def = RevoluteJointDef::initialize(
        anchor_body,
        world.body(anchor_body),
        arm,
        world.body(arm),
        Vec2::ZERO,
    )
    .with_limits(-0.25, 0.25);
    world.create_joint(&def.into()).unwrap();

    run(&mut world, 120);
    let angle = world.body(arm).angle();
    assert!(angle >= -0.25 - 0.05, "angle {}", angle);
}

#[test]
fn test_prismatic_motor_drives_along_axis() {
    let mut world = World::new(WorldConfig {
        gravity: Vec2::ZERO,
        ..Default::default()
    });
    let base = world.create_body(&BodyDef::fixed()).unwrap();
    let slider = dynamic_box(&mut world, Vec2::ZERO, 0.25);

    let def = PrismaticJointDef::initialize(
        base,
        world.body(base),
        slider,
        world.body(slider),
        Vec2::ZERO,
        Vec2::X,
    )
    .with_motor(2.0, 100.0)
    .with_limits(-1.0, 1.5);
    let joint = world.create_joint(&def.into()).unwrap();

    run(&mut world, 120);

    let b = world.body(slider);
    assert_relative_eq!(b.position().y, 0.0, epsilon = 0.01);
    assert!(b.position().x > 1.4 && b.position().x < 1.5 + 0.05);

    let JointKind::Prismatic(prismatic) = world.joint(joint).kind() else {
        panic!("expected a prismatic joint");
    };
    let translation = prismatic.joint_translation(world.body(base), b);
    assert_relative_eq!(translation, b.position().x, epsilon = 1e-3);
}

#[test]
fn test_pulley_conserves_rope_length() {
    let mut world = World::default();
    let left = dynamic_box(&mut world, Vec2::new(-2.0, 5.0), 0.5);
    let right = world
        .create_body(&BodyDef::dynamic().with_position(Vec2::new(2.0, 5.0)))
        .unwrap();
    world
        .create_fixture(right, &FixtureDef::new(Shape::cuboid(0.5, 0.5)).with_density(2.0))
        .unwrap();

    let ground_a = Vec2::new(-2.0, 10.0);
    let ground_b = Vec2::new(2.0, 10.0);
    let def = PulleyJointDef::initialize(
        left,
        world.body(left),
        right,
        world.body(right),
        ground_a,
        ground_b,
        Vec2::new(-2.0, 5.0),
        Vec2::new(2.0, 5.0),
        1.0,
    );
    world.create_joint(&def.into()).unwrap();

    run(&mut world, 60);

    let length_a = (world.body(left).position() - ground_a).length();
    let length_b = (world.body(right).position() - ground_b).length();
    assert_relative_eq!(length_a + length_b, 10.0, epsilon = 0.05);
    // The heavier side wins
    assert!(world.body(right).position().y < 5.0);
}

#[test]
fn test_mouse_joint_drags_body_to_target() {
    let mut world = World::new(WorldConfig {
        gravity: Vec2::ZERO,
        ..Default::default()
    });
    let ground_body = world.create_body(&BodyDef::fixed()).unwrap();
    let body = dynamic_box(&mut world, Vec2::ZERO, 0.5);

    let mass = world.body(body).mass();
    let def = MouseJointDef::new(ground_body, body, Vec2::ZERO).with_max_force(1000.0 * mass);
    let joint = world.create_joint(&def.into()).unwrap();

    world.set_mouse_target(joint, Vec2::new(3.0, 1.0)).unwrap();
    run(&mut world, 180);

    let p = world.body(body).position();
    assert_relative_eq!(p.x, 3.0, epsilon = 0.05);
    assert_relative_eq!(p.y, 1.0, epsilon = 0.05);

    // Only mouse joints have a target
    let other = dynamic_box(&mut world, Vec2::new(5.0, 0.0), 0.5);
    let weld = WeldJointDef::initialize(body, world.body(body), other, world.body(other), Vec2::new(4.0, 0.5));
    let weld = world.create_joint(&weld.into()).unwrap();
    assert!(matches!(
        world.set_mouse_target(weld, Vec2::ZERO),
        Err(PhysicsError::InvalidJoint(_))
    ));
}

#[test]
fn test_gear_couples_two_revolutes() {
    let mut world = World::new(WorldConfig {
        gravity: Vec2::ZERO,
        ..Default::default()
    });
    let base = world.create_body(&BodyDef::fixed()).unwrap();
    let wheel1 = world.create_body(&BodyDef::dynamic()).unwrap();
    world
        .create_fixture(wheel1, &FixtureDef::new(Shape::circle(1.0)).with_density(1.0))
        .unwrap();
    let wheel2 = world
        .create_body(&BodyDef::dynamic().with_position(Vec2::new(3.0, 0.0)))
        .unwrap();
    world
        .create_fixture(wheel2, &FixtureDef::new(Shape::circle(2.0)).with_density(1.0))
        .unwrap();

    let rev1 = RevoluteJointDef::initialize(base, world.body(base), wheel1, world.body(wheel1), Vec2::ZERO)
        .with_motor(1.0, 1000.0);
    let rev1 = world.create_joint(&rev1.into()).unwrap();
    let rev2 = RevoluteJointDef::initialize(
        base,
        world.body(base),
        wheel2,
        world.body(wheel2),
        Vec2::new(3.0, 0.0),
    );
    let rev2 = world.create_joint(&rev2.into()).unwrap();
    world.create_joint(&GearJointDef::new(rev1, rev2, 2.0).into()).unwrap();

    run(&mut world, 60);

    // angle1 + ratio * angle2 stays at its initial value of zero
    let a1 = world.body(wheel1).angle();
    let a2 = world.body(wheel2).angle();
    assert!(a1.abs() > 0.1);
    assert_relative_eq!(a1 + 2.0 * a2, 0.0, epsilon = 0.02);
}

#[test]
fn test_rope_limits_distance() {
    let mut world = World::default();
    let hook = world
        .create_body(&BodyDef::fixed().with_position(Vec2::new(0.0, 10.0)))
        .unwrap();
    let load = dynamic_box(&mut world, Vec2::new(0.0, 9.0), 0.2);

    let def = RopeJointDef::new(hook, load)
        .with_anchors(Vec2::ZERO, Vec2::ZERO)
        .with_max_length(3.0);
    world.create_joint(&def.into()).unwrap();

    run(&mut world, 120);
    let d = (world.body(load).position() - Vec2::new(0.0, 10.0)).length();
    assert!(d <= 3.0 + 0.05, "rope stretched to {}", d);
    assert!(d > 2.5);
}

#[test]
fn test_rope_from_world_anchors_limits_anchor_distance() {
    let mut world = World::default();
    let hook = world
        .create_body(&BodyDef::fixed().with_position(Vec2::new(0.0, 10.0)))
        .unwrap();
    let load = dynamic_box(&mut world, Vec2::new(1.0, 9.0), 0.2);

    // Hang from the bottom of the hook by the top edge of the load
    let hook_anchor = Vec2::new(0.0, 9.5);
    let def = RopeJointDef::initialize(
        hook,
        world.body(hook),
        load,
        world.body(load),
        hook_anchor,
        Vec2::new(1.0, 9.2),
        2.0,
    );
    world.create_joint(&def.into()).unwrap();

    run(&mut world, 120);
    let load_anchor = world.body(load).world_point(Vec2::new(0.0, 0.2));
    let d = (load_anchor - hook_anchor).length();
    assert!(d <= 2.0 + 0.05, "rope stretched to {}", d);
    assert!(d > 1.5);
}

#[test]
fn test_buoyancy_floats_light_box() {
    let mut world = World::default();
    let body = dynamic_box(&mut world, Vec2::new(0.0, 0.0), 0.5);
    let water = world
        .create_controller(BuoyancyController::new(Vec2::Y, 0.0, 2.0))
        .unwrap();
    world.add_controller_body(water, body).unwrap();

    run_clearing(&mut world, 600);

    // Density 1 in water of density 2 floats half submerged
    let y = world.body(body).position().y;
    assert_relative_eq!(y, 0.0, epsilon = 0.1);
}

#[test]
fn test_bodies_iterate_in_creation_order() {
    let mut world = World::default();
    let handles: Vec<_> = (0..5)
        .map(|i| dynamic_box(&mut world, Vec2::new(i as f32 * 2.0, 0.0), 0.5))
        .collect();
    world.destroy_body(handles[1]).unwrap();
    let again = dynamic_box(&mut world, Vec2::ZERO, 0.5);

    let order: Vec<_> = world.bodies().map(|(h, _)| h).collect();
    assert_eq!(order, vec![handles[0], handles[2], handles[3], handles[4], again]);
}
