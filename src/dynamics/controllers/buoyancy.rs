use crate::math::Vec2;

use super::{ControllerBodies, DebugDraw};
use crate::dynamics::debug_draw::palette;

/// Floats bodies in a fluid bounded by the plane `dot(normal, x) = offset`.
///
/// The fluid occupies the half-plane behind the normal. Buoyancy acts at
/// the submerged centroid and linear drag is measured relative to the fluid
/// velocity.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BuoyancyController {
    /// Outward surface normal
    pub normal: Vec2,
    /// Surface height along the normal
    pub offset: f32,
    /// Fluid density
    pub density: f32,
    /// Fluid velocity, for currents
    pub velocity: Vec2,
    pub linear_drag: f32,
    pub angular_drag: f32,
    /// Weight the mass centroid by fixture density instead of area alone
    pub use_density: bool,
    /// Take gravity from the world each step
    pub use_world_gravity: bool,
    /// Used when `use_world_gravity` is off
    pub gravity: Vec2,
}

impl Default for BuoyancyController {
    fn default() -> Self {
        Self {
            normal: Vec2::Y,
            offset: 0.0,
            density: 0.0,
            velocity: Vec2::ZERO,
            linear_drag: 2.0,
            angular_drag: 1.0,
            use_density: false,
            use_world_gravity: true,
            gravity: Vec2::ZERO,
        }
    }
}

impl BuoyancyController {
    pub fn new(normal: Vec2, offset: f32, density: f32) -> Self {
        Self {
            normal: normal.normalize(),
            offset,
            density,
            ..Default::default()
        }
    }

    pub fn with_drag(mut self, linear: f32, angular: f32) -> Self {
        self.linear_drag = linear;
        self.angular_drag = angular;
        self
    }

    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    /// Uses a fixed gravity instead of the world's
    pub fn with_gravity(mut self, gravity: Vec2) -> Self {
        self.gravity = gravity;
        self.use_world_gravity = false;
        self
    }

    pub(crate) fn step(&self, world_gravity: Vec2, set: &mut ControllerBodies<'_>) {
        let gravity = if self.use_world_gravity {
            world_gravity
        } else {
            self.gravity
        };

        for &handle in set.handles {
            let body = &set.bodies[handle];
            if !body.is_awake() || !body.is_dynamic() {
                continue;
            }

            let xf = *body.transform();
            let mut area = 0.0;
            let mut mass = 0.0;
            let mut area_center = Vec2::ZERO;
            let mut mass_center = Vec2::ZERO;
            for &fixture in body.fixtures() {
                let fixture = &set.fixtures[fixture];
                let (sub_area, sub_center) = fixture.shape().compute_submerged_area(self.normal, self.offset, &xf);
                let shape_density = if self.use_density { fixture.density() } else { 1.0 };

                area += sub_area;
                area_center += sub_center * sub_area;
                mass += sub_area * shape_density;
                mass_center += sub_center * (sub_area * shape_density);
            }

            if area <= f32::EPSILON {
                continue;
            }
            area_center *= 1.0 / area;
            mass_center = if mass > f32::EPSILON {
                mass_center * (1.0 / mass)
            } else {
                area_center
            };

            let body = &mut set.bodies[handle];

            let buoyancy_force = -gravity * (self.density * area);
            body.apply_force(buoyancy_force, mass_center);

            let drag_force = (body.linear_velocity_from_world_point(area_center) - self.velocity) * (-self.linear_drag * area);
            body.apply_force(drag_force, area_center);

            let drag_torque = -body.inertia() / body.mass() * area * body.angular_velocity() * self.angular_drag;
            body.apply_torque(drag_torque);
        }
    }

    /// Draws the fluid surface as a long segment
    pub(crate) fn draw(&self, drawer: &mut dyn DebugDraw) {
        const HALF_LENGTH: f32 = 1000.0;
        let base = self.normal * self.offset;
        let along = Vec2::new(self.normal.y, -self.normal.x) * HALF_LENGTH;
        drawer.draw_segment(base + along, base - along, palette::CONTROLLER);
    }
}
