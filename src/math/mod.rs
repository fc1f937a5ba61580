mod mat22;
mod mat33;
mod sweep;
mod transform;
mod vec2;
mod vec3;

pub use mat22::Mat22;
pub use mat33::Mat33;
pub use sweep::Sweep;
pub use transform::Transform;
pub use vec2::Vec2;
pub use vec3::Vec3;

/// Common math constants
pub mod consts {
    /// Machine epsilon used to guard divisions and normalization
    pub const EPSILON: f32 = f32::EPSILON;

    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;
}

/// Utility functions
pub mod utils {
    /// Clamps a value to the range [min, max]
    #[inline]
    pub fn clamp(value: f32, min: f32, max: f32) -> f32 {
        value.max(min).min(max)
    }
}
