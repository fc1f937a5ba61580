use crate::math::{Mat22, Vec2};

use super::ControllerBodies;

/// Damps linear velocity with a tensor expressed in each body's frame.
///
/// The velocity change per step is `R * T * R^T * v * dt`, which allows
/// anisotropic drag such as a keel resisting sideways motion.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TensorDampingController {
    /// Damping tensor in body coordinates
    pub tensor: Mat22,
    /// Upper bound on the time step used, or 0 for none
    pub max_timestep: f32,
}

impl Default for TensorDampingController {
    fn default() -> Self {
        Self {
            tensor: Mat22::ZERO,
            max_timestep: 0.0,
        }
    }
}

impl TensorDampingController {
    /// Damping along the local axes only
    pub fn axis_aligned(x_damping: f32, y_damping: f32) -> Self {
        let mut controller = Self::default();
        controller.set_axis_aligned(x_damping, y_damping);
        controller
    }

    /// Sets a diagonal tensor and caps the time step so the damping stays
    /// stable.
    pub fn set_axis_aligned(&mut self, x_damping: f32, y_damping: f32) {
        self.tensor = Mat22::from_cols(Vec2::new(-x_damping, 0.0), Vec2::new(0.0, -y_damping));
        self.max_timestep = if x_damping > 0.0 || y_damping > 0.0 {
            1.0 / x_damping.max(y_damping)
        } else {
            0.0
        };
    }

    pub(crate) fn step(&self, dt: f32, set: &mut ControllerBodies<'_>) {
        if dt <= f32::EPSILON {
            return;
        }
        let timestep = if self.max_timestep > 0.0 { dt.min(self.max_timestep) } else { dt };

        for &handle in set.handles {
            let body = &mut set.bodies[handle];
            if !body.is_awake() {
                continue;
            }
            let v = body.linear_velocity();
            let damping = body.world_vector(self.tensor * body.local_vector(v));
            body.set_linear_velocity(v + damping * timestep);
        }
    }
}
