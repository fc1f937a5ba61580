//! # RustPhy2D
//!
//! A 2D rigid body physics engine.
//!
//! ## Features
//!
//! - **Shapes**: Circles, convex polygons and edge segments
//! - **Broad Phase**: Dynamic AABB tree with fattened, motion-predicted proxies
//! - **Narrow Phase**: SAT manifolds for polygons, GJK distance, conservative advancement TOI
//! - **Solver**: Sequential impulses with warm starting and a two-point block solver
//! - **Joints**: Distance, revolute, prismatic, pulley, gear, mouse, line, weld, friction and rope
//! - **Continuous Collision**: Time of impact sub-stepping for fast bodies
//! - **Sleeping**: Islands that come to rest stop simulating
//! - **Controllers**: Buoyancy, constant acceleration and force, mutual gravity and tensor damping
//!
//! ## Quick Start
//!
//! ```rust
//! use rustphy2d::prelude::*;
//!
//! // Create a physics world with gravity pointing down
//! let mut world = World::default();
//!
//! // Create a static floor
//! let floor = world.create_body(&BodyDef::fixed()).unwrap();
//! world.create_fixture(floor, &FixtureDef::new(Shape::cuboid(10.0, 0.5))).unwrap();
//!
//! // Create a dynamic ball
//! let ball = world
//!     .create_body(&BodyDef::dynamic().with_position(Vec2::new(0.0, 5.0)))
//!     .unwrap();
//! world
//!     .create_fixture(ball, &FixtureDef::new(Shape::circle(0.5)).with_density(1.0))
//!     .unwrap();
//!
//! // Simulation loop
//! let dt = 1.0 / 60.0;
//! for _ in 0..120 {
//!     world.step(dt, 8, 3);
//! }
//! assert!(world.body(ball).position().y < 5.0);
//! ```

pub mod collision;
pub mod constraints;
pub mod dynamics;
pub mod error;
pub mod geometry;
pub mod math;
pub mod settings;
pub mod solver;
mod world;

pub use error::{PhysicsError, Result};
pub use world::{RayCastHit, World, WorldConfig};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::constraints::joints::{
        DistanceJointDef, FrictionJointDef, GearJointDef, LineJointDef, MouseJointDef,
        PrismaticJointDef, PulleyJointDef, RevoluteJointDef, RopeJointDef, WeldJointDef,
    };
    pub use crate::constraints::{Joint, JointDef, JointKind, JointType};
    pub use crate::dynamics::{
        Body, BodyDef, BodyHandle, BodyType, BuoyancyController, Color, ConstantAccelController,
        ConstantForceController, Contact, ContactFilter, ContactHandle, ContactImpulse,
        ContactListener, ControllerHandle, DebugDraw, DestructionListener, DrawFlags, FilterData,
        Fixture, FixtureDef, FixtureHandle, GravityController, JointHandle,
        TensorDampingController,
    };
    pub use crate::error::{PhysicsError, Result};
    pub use crate::geometry::{Aabb, MassData, Shape, ShapeType};
    pub use crate::math::{Mat22, Transform, Vec2};
    pub use crate::world::{RayCastHit, World, WorldConfig};
}
