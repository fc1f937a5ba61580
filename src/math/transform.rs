use std::ops::Mul;

use super::mat22::Mat22;
use super::vec2::Vec2;

/// A rigid transformation: translation plus rotation.
///
/// Represents a body or shape frame in the plane.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transform {
    /// Position (translation)
    pub position: Vec2,
    /// Rotation matrix
    pub r: Mat22,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    /// Identity transform (no translation or rotation)
    pub const IDENTITY: Self = Self {
        position: Vec2::ZERO,
        r: Mat22::IDENTITY,
    };

    /// Creates a new transform from position and rotation
    #[inline]
    pub const fn new(position: Vec2, r: Mat22) -> Self {
        Self { position, r }
    }

    /// Creates a transform from a position and an angle in radians
    #[inline]
    pub fn from_angle(position: Vec2, angle: f32) -> Self {
        Self::new(position, Mat22::from_angle(angle))
    }

    /// Sets this to the identity transform
    #[inline]
    pub fn set_identity(&mut self) {
        *self = Self::IDENTITY;
    }

    /// Sets position and rotation in place
    #[inline]
    pub fn set(&mut self, position: Vec2, angle: f32) {
        self.position = position;
        self.r.set_angle(angle);
    }

    /// Rotation angle in radians
    #[inline]
    pub fn angle(&self) -> f32 {
        self.r.angle()
    }

    /// Transforms a point from local space to world space
    #[inline]
    pub fn transform_point(&self, point: Vec2) -> Vec2 {
        self.position + self.r * point
    }

    /// Transforms a vector from local space to world space
    #[inline]
    pub fn transform_vector(&self, vector: Vec2) -> Vec2 {
        self.r * vector
    }

    /// Inverse transforms a point from world space to local space
    #[inline]
    pub fn inverse_transform_point(&self, point: Vec2) -> Vec2 {
        self.r.mul_transpose(point - self.position)
    }

    /// Inverse transforms a vector from world space to local space
    #[inline]
    pub fn inverse_transform_vector(&self, vector: Vec2) -> Vec2 {
        self.r.mul_transpose(vector)
    }
}

impl Mul<Vec2> for Transform {
    type Output = Vec2;

    #[inline]
    fn mul(self, point: Vec2) -> Vec2 {
        self.transform_point(point)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_point_roundtrip() {
        let xf = Transform::from_angle(Vec2::new(1.0, 2.0), FRAC_PI_2);
        let local = Vec2::new(1.0, 0.0);
        let world = xf.transform_point(local);
        assert_relative_eq!(world.x, 1.0, epsilon = 1e-6);
        assert_relative_eq!(world.y, 3.0, epsilon = 1e-6);

        let back = xf.inverse_transform_point(world);
        assert_relative_eq!(back.x, local.x, epsilon = 1e-6);
        assert_relative_eq!(back.y, local.y, epsilon = 1e-6);
    }

    #[test]
    fn test_vectors_ignore_translation() {
        let xf = Transform::from_angle(Vec2::new(10.0, -4.0), 0.0);
        assert_eq!(xf.transform_vector(Vec2::X), Vec2::X);
        assert_relative_eq!(xf.angle(), 0.0);
    }
}
