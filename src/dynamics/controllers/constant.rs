use crate::math::Vec2;

use super::ControllerBodies;

/// Adds a fixed acceleration to every awake body, independent of mass
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConstantAccelController {
    pub acceleration: Vec2,
}

impl ConstantAccelController {
    #[inline]
    pub fn new(acceleration: Vec2) -> Self {
        Self { acceleration }
    }

    pub(crate) fn step(&self, dt: f32, set: &mut ControllerBodies<'_>) {
        let dv = self.acceleration * dt;
        for &handle in set.handles {
            let body = &mut set.bodies[handle];
            if !body.is_awake() {
                continue;
            }
            let v = body.linear_velocity();
            body.set_linear_velocity(v + dv);
        }
    }
}

/// Applies a fixed force at the center of mass of every awake body
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConstantForceController {
    pub force: Vec2,
}

impl ConstantForceController {
    #[inline]
    pub fn new(force: Vec2) -> Self {
        Self { force }
    }

    pub(crate) fn step(&self, set: &mut ControllerBodies<'_>) {
        for &handle in set.handles {
            let body = &mut set.bodies[handle];
            if body.is_awake() {
                body.apply_force_to_center(self.force);
            }
        }
    }
}
