use std::ops::{Add, Mul};

use super::vec2::Vec2;

/// A 2x2 matrix stored as two columns.
///
/// Rotation matrices are built with [`Mat22::from_angle`] and stay orthonormal.
/// The same type also holds small effective-mass matrices for the solvers.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(C)]
pub struct Mat22 {
    pub col1: Vec2,
    pub col2: Vec2,
}

impl Default for Mat22 {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mat22 {
    /// Zero matrix
    pub const ZERO: Self = Self::from_cols(Vec2::ZERO, Vec2::ZERO);

    /// Identity matrix
    pub const IDENTITY: Self = Self::from_cols(Vec2::X, Vec2::Y);

    /// Creates a matrix from column vectors
    #[inline]
    pub const fn from_cols(col1: Vec2, col2: Vec2) -> Self {
        Self { col1, col2 }
    }

    /// Creates a rotation matrix for `angle` radians
    #[inline]
    pub fn from_angle(angle: f32) -> Self {
        let (s, c) = angle.sin_cos();
        Self::from_cols(Vec2::new(c, s), Vec2::new(-s, c))
    }

    /// Re-initializes this matrix as a rotation
    #[inline]
    pub fn set_angle(&mut self, angle: f32) {
        *self = Self::from_angle(angle);
    }

    /// Extracts the rotation angle, assuming this is a rotation matrix
    #[inline]
    pub fn angle(&self) -> f32 {
        self.col1.y.atan2(self.col1.x)
    }

    /// Sets every entry to zero
    #[inline]
    pub fn set_zero(&mut self) {
        *self = Self::ZERO;
    }

    #[inline]
    pub fn determinant(&self) -> f32 {
        self.col1.x * self.col2.y - self.col2.x * self.col1.y
    }

    /// Inverse; a singular matrix yields the zero matrix
    pub fn inverse(&self) -> Self {
        let (a, b, c, d) = (self.col1.x, self.col2.x, self.col1.y, self.col2.y);
        let mut det = a * d - b * c;
        if det != 0.0 {
            det = 1.0 / det;
        }
        Self::from_cols(Vec2::new(det * d, -det * c), Vec2::new(-det * b, det * a))
    }

    /// Solves `A * x = b`. Cheaper than computing the inverse.
    /// A singular matrix yields the zero vector.
    pub fn solve(&self, b: Vec2) -> Vec2 {
        let (a11, a12, a21, a22) = (self.col1.x, self.col2.x, self.col1.y, self.col2.y);
        let mut det = a11 * a22 - a12 * a21;
        if det != 0.0 {
            det = 1.0 / det;
        }
        Vec2::new(det * (a22 * b.x - a12 * b.y), det * (a11 * b.y - a21 * b.x))
    }

    /// Multiplies the transpose of this matrix by `v`
    #[inline]
    pub fn mul_transpose(&self, v: Vec2) -> Vec2 {
        Vec2::new(v.dot(self.col1), v.dot(self.col2))
    }

    /// `self^T * other`
    #[inline]
    pub fn mul_transpose_mat(&self, other: &Self) -> Self {
        Self::from_cols(
            Vec2::new(self.col1.dot(other.col1), self.col2.dot(other.col1)),
            Vec2::new(self.col1.dot(other.col2), self.col2.dot(other.col2)),
        )
    }

    /// Component-wise absolute value
    #[inline]
    pub fn abs(&self) -> Self {
        Self::from_cols(self.col1.abs(), self.col2.abs())
    }
}

impl Mul<Vec2> for Mat22 {
    type Output = Vec2;

    #[inline]
    fn mul(self, v: Vec2) -> Vec2 {
        Vec2::new(
            self.col1.x * v.x + self.col2.x * v.y,
            self.col1.y * v.x + self.col2.y * v.y,
        )
    }
}

impl Mul for Mat22 {
    type Output = Self;

    #[inline]
    fn mul(self, other: Self) -> Self {
        Self::from_cols(self * other.col1, self * other.col2)
    }
}

impl Add for Mat22 {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self::from_cols(self.col1 + other.col1, self.col2 + other.col2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rotation_roundtrip() {
        let r = Mat22::from_angle(0.75);
        assert_relative_eq!(r.angle(), 0.75, epsilon = 1e-6);

        let v = Vec2::new(2.0, -1.0);
        let back = r.mul_transpose(r * v);
        assert_relative_eq!(back.x, v.x, epsilon = 1e-5);
        assert_relative_eq!(back.y, v.y, epsilon = 1e-5);
    }

    #[test]
    fn test_solve_matches_inverse() {
        let m = Mat22::from_cols(Vec2::new(4.0, 1.0), Vec2::new(2.0, 3.0));
        let b = Vec2::new(1.0, 2.0);
        let x = m.solve(b);
        let y = m.inverse() * b;
        assert_relative_eq!(x.x, y.x, epsilon = 1e-6);
        assert_relative_eq!(x.y, y.y, epsilon = 1e-6);
        let check = m * x;
        assert_relative_eq!(check.x, b.x, epsilon = 1e-5);
        assert_relative_eq!(check.y, b.y, epsilon = 1e-5);
    }

    #[test]
    fn test_singular_is_zero() {
        let m = Mat22::from_cols(Vec2::new(1.0, 2.0), Vec2::new(2.0, 4.0));
        assert_eq!(m.inverse(), Mat22::ZERO);
        assert_eq!(m.solve(Vec2::ONE), Vec2::ZERO);
    }
}
