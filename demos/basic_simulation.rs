//! Basic physics simulation example
//!
//! A ball and a box fall onto a floor; a pendulum swings beside them.

use rustphy2d::prelude::*;

fn main() {
    println!("RustPhy2D - Basic Simulation Example");
    println!("====================================\n");

    // Create physics world with default settings: gravity (0, -10)
    let mut world = World::default();

    // Create a static floor
    let floor = world
        .create_body(&BodyDef::fixed())
        .expect("world is unlocked");
    world
        .create_fixture(floor, &FixtureDef::new(Shape::cuboid(10.0, 0.5)))
        .expect("floor fixture");
    println!("Created floor at Y=0 (top surface at Y=0.5)");

    // Create a bouncy ball
    let ball = world
        .create_body(&BodyDef::dynamic().with_position(Vec2::new(0.0, 5.0)))
        .expect("world is unlocked");
    world
        .create_fixture(
            ball,
            &FixtureDef::new(Shape::circle(0.5))
                .with_density(1.0)
                .with_restitution(0.5),
        )
        .expect("ball fixture");
    println!("Created ball at Y=5.0 (radius=0.5)");

    // Create a tilted box
    let crate_body = world
        .create_body(
            &BodyDef::dynamic()
                .with_position(Vec2::new(2.0, 3.0))
                .with_angle(0.4),
        )
        .expect("world is unlocked");
    world
        .create_fixture(
            crate_body,
            &FixtureDef::new(Shape::cuboid(0.5, 0.5))
                .with_density(1.0)
                .with_friction(0.6),
        )
        .expect("box fixture");
    println!("Created box at (2.0, 3.0), tilted 0.4 rad");

    // A pendulum hanging from a fixed pivot
    let pivot = world
        .create_body(&BodyDef::fixed().with_position(Vec2::new(-4.0, 6.0)))
        .expect("world is unlocked");
    let bob = world
        .create_body(&BodyDef::dynamic().with_position(Vec2::new(-2.0, 6.0)))
        .expect("world is unlocked");
    world
        .create_fixture(bob, &FixtureDef::new(Shape::circle(0.25)).with_density(2.0))
        .expect("bob fixture");
    let hinge = RevoluteJointDef::initialize(
        pivot,
        world.body(pivot),
        bob,
        world.body(bob),
        Vec2::new(-4.0, 6.0),
    );
    world.create_joint(&hinge.into()).expect("hinge");
    println!("Created pendulum of length 2.0 at (-4.0, 6.0)\n");

    // Simulation parameters
    let dt = 1.0 / 60.0;
    let total_time = 4.0;
    let steps = (total_time / dt) as usize;

    println!("Simulating {} seconds ({} steps at {}Hz)...\n", total_time, steps, 1.0 / dt);

    // Run simulation
    for i in 0..steps {
        world.step_default(dt);

        // Print state every 30 frames (0.5 seconds)
        if i % 30 == 0 {
            let b = world.body(ball);
            let pos = b.position();
            let vel = b.linear_velocity();
            println!(
                "t={:.2}s: ball=({:.3}, {:.3}) v=({:.3}, {:.3})  box awake={}  contacts={}",
                i as f32 * dt,
                pos.x,
                pos.y,
                vel.x,
                vel.y,
                world.body(crate_body).is_awake(),
                world.contact_count(),
            );
        }
    }

    let final_pos = world.body(ball).position();
    println!("\nFinal ball position: ({:.3}, {:.3})", final_pos.x, final_pos.y);
    println!("Expected resting height: ~1.0 (floor top at 0.5 + ball radius 0.5)");

    let box_pos = world.body(crate_body).position();
    println!(
        "Final box position: ({:.3}, {:.3}), angle {:.3}",
        box_pos.x,
        box_pos.y,
        world.body(crate_body).angle()
    );

    if let Some(hit) = world.ray_cast_one(Vec2::new(0.0, 10.0), Vec2::new(0.0, -1.0)) {
        println!(
            "Ray from (0, 10) straight down hits at ({:.3}, {:.3})",
            hit.point.x, hit.point.y
        );
    }
}
