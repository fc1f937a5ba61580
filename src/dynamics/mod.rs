//! Bodies, fixtures, contacts and the per-island solve.

pub(crate) mod body;
pub mod contacts;
pub mod controllers;
pub(crate) mod debug_draw;
pub(crate) mod fixture;
pub(crate) mod handle;
mod integrator;
pub(crate) mod island;
pub(crate) mod listeners;
mod time_step;

pub use body::{Body, BodyDef, BodyType, ContactEdge, JointEdge};
pub use contacts::{Contact, ContactKind};
pub use controllers::{
    BuoyancyController, ConstantAccelController, ConstantForceController, Controller,
    ControllerDef, ControllerKind, GravityController, TensorDampingController,
};
pub use debug_draw::{Color, DebugDraw, DrawFlags};
pub use fixture::{FilterData, Fixture, FixtureDef};
pub use handle::{
    Arena, ArenaHandle, BodyHandle, ContactHandle, ControllerHandle, FixtureHandle, JointHandle,
};
pub use integrator::{integrate_position, integrate_velocity};
pub use listeners::{
    ContactFilter, ContactImpulse, ContactListener, DefaultContactFilter, DestructionListener,
    NullContactListener,
};
pub use time_step::TimeStep;
