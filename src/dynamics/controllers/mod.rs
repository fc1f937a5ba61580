//! Controllers: force fields stepped once per world step, before islands
//! are solved, over an explicit list of bodies.

mod buoyancy;
mod constant;
mod gravity;
mod tensor_damping;

pub use buoyancy::BuoyancyController;
pub use constant::{ConstantAccelController, ConstantForceController};
pub use gravity::GravityController;
pub use tensor_damping::TensorDampingController;

use crate::math::Vec2;

use super::body::Body;
use super::debug_draw::DebugDraw;
use super::fixture::Fixture;
use super::handle::{Arena, BodyHandle, FixtureHandle};
use super::time_step::TimeStep;

/// Controller kind and parameters
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ControllerKind {
    Buoyancy(BuoyancyController),
    ConstantAccel(ConstantAccelController),
    ConstantForce(ConstantForceController),
    Gravity(GravityController),
    TensorDamping(TensorDampingController),
}

/// Definition passed to `World::create_controller`. Controllers keep no
/// state beyond their parameters, so the definition is the kind itself.
pub type ControllerDef = ControllerKind;

macro_rules! controller_from {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for ControllerKind {
                fn from(controller: $ty) -> Self {
                    ControllerKind::$variant(controller)
                }
            }
        )*
    };
}

controller_from! {
    Buoyancy => BuoyancyController,
    ConstantAccel => ConstantAccelController,
    ConstantForce => ConstantForceController,
    Gravity => GravityController,
    TensorDamping => TensorDampingController,
}

/// Body storage a controller step runs against
pub(crate) struct ControllerBodies<'a> {
    pub(crate) handles: &'a [BodyHandle],
    pub(crate) bodies: &'a mut Arena<BodyHandle, Body>,
    pub(crate) fixtures: &'a Arena<FixtureHandle, Fixture>,
}

/// A controller and the bodies it acts on
#[derive(Debug, Clone)]
pub struct Controller {
    pub(crate) kind: ControllerKind,
    pub(crate) bodies: Vec<BodyHandle>,
}

impl Controller {
    pub(crate) fn new(kind: ControllerKind) -> Self {
        Self {
            kind,
            bodies: Vec::new(),
        }
    }

    #[inline]
    pub fn kind(&self) -> &ControllerKind {
        &self.kind
    }

    /// Parameters can be tuned between steps
    #[inline]
    pub fn kind_mut(&mut self) -> &mut ControllerKind {
        &mut self.kind
    }

    /// Bodies in insertion order
    #[inline]
    pub fn bodies(&self) -> &[BodyHandle] {
        &self.bodies
    }

    #[inline]
    pub fn contains(&self, body: BodyHandle) -> bool {
        self.bodies.contains(&body)
    }

    /// Returns false if the body was already present
    pub(crate) fn add_body(&mut self, body: BodyHandle) -> bool {
        if self.contains(body) {
            return false;
        }
        self.bodies.push(body);
        true
    }

    /// Returns false if the body was not present
    pub(crate) fn remove_body(&mut self, body: BodyHandle) -> bool {
        match self.bodies.iter().position(|&b| b == body) {
            Some(index) => {
                self.bodies.remove(index);
                true
            }
            None => false,
        }
    }

    pub(crate) fn step(
        &self,
        step: &TimeStep,
        gravity: Vec2,
        bodies: &mut Arena<BodyHandle, Body>,
        fixtures: &Arena<FixtureHandle, Fixture>,
    ) {
        let mut set = ControllerBodies {
            handles: &self.bodies,
            bodies,
            fixtures,
        };
        match &self.kind {
            ControllerKind::Buoyancy(c) => c.step(gravity, &mut set),
            ControllerKind::ConstantAccel(c) => c.step(step.dt, &mut set),
            ControllerKind::ConstantForce(c) => c.step(&mut set),
            ControllerKind::Gravity(c) => c.step(&mut set),
            ControllerKind::TensorDamping(c) => c.step(step.dt, &mut set),
        }
    }

    pub(crate) fn draw(&self, drawer: &mut dyn DebugDraw) {
        if let ControllerKind::Buoyancy(c) = &self.kind {
            c.draw(drawer);
        }
    }
}
