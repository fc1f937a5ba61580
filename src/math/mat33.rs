use std::ops::Mul;

use super::vec2::Vec2;
use super::vec3::Vec3;

/// A 3x3 matrix stored as three columns.
///
/// Holds the coupled effective mass of joints that constrain two linear axes
/// and one angular axis at once.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[repr(C)]
pub struct Mat33 {
    pub col1: Vec3,
    pub col2: Vec3,
    pub col3: Vec3,
}

impl Mat33 {
    /// Zero matrix
    pub const ZERO: Self = Self::from_cols(Vec3::ZERO, Vec3::ZERO, Vec3::ZERO);

    /// Creates a matrix from column vectors
    #[inline]
    pub const fn from_cols(col1: Vec3, col2: Vec3, col3: Vec3) -> Self {
        Self { col1, col2, col3 }
    }

    /// Sets every entry to zero
    #[inline]
    pub fn set_zero(&mut self) {
        *self = Self::ZERO;
    }

    /// Solves `A * x = b` with Cramer's rule.
    /// A singular matrix yields the zero vector.
    pub fn solve33(&self, b: Vec3) -> Vec3 {
        let mut det = self.col1.dot(self.col2.cross(self.col3));
        if det != 0.0 {
            det = 1.0 / det;
        }
        Vec3::new(
            det * b.dot(self.col2.cross(self.col3)),
            det * self.col1.dot(b.cross(self.col3)),
            det * self.col1.dot(self.col2.cross(b)),
        )
    }

    /// Solves the upper-left 2x2 block `A * x = b`, ignoring the third
    /// row and column. A singular block yields the zero vector.
    pub fn solve22(&self, b: Vec2) -> Vec2 {
        let (a11, a12, a21, a22) = (self.col1.x, self.col2.x, self.col1.y, self.col2.y);
        let mut det = a11 * a22 - a12 * a21;
        if det != 0.0 {
            det = 1.0 / det;
        }
        Vec2::new(det * (a22 * b.x - a12 * b.y), det * (a11 * b.y - a21 * b.x))
    }
}

impl Mul<Vec3> for Mat33 {
    type Output = Vec3;

    #[inline]
    fn mul(self, v: Vec3) -> Vec3 {
        self.col1 * v.x + self.col2 * v.y + self.col3 * v.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample() -> Mat33 {
        Mat33::from_cols(
            Vec3::new(4.0, 1.0, 0.5),
            Vec3::new(1.0, 3.0, -0.25),
            Vec3::new(0.5, -0.25, 2.0),
        )
    }

    #[test]
    fn test_solve33() {
        let m = sample();
        let b = Vec3::new(1.0, -2.0, 0.5);
        let x = m.solve33(b);
        let check = m * x;
        assert_relative_eq!(check.x, b.x, epsilon = 1e-5);
        assert_relative_eq!(check.y, b.y, epsilon = 1e-5);
        assert_relative_eq!(check.z, b.z, epsilon = 1e-5);
    }

    #[test]
    fn test_solve22_ignores_third_axis() {
        let m = sample();
        let x = m.solve22(Vec2::new(1.0, 1.0));
        assert_relative_eq!(4.0 * x.x + 1.0 * x.y, 1.0, epsilon = 1e-5);
        assert_relative_eq!(1.0 * x.x + 3.0 * x.y, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_singular_is_zero() {
        assert_eq!(Mat33::ZERO.solve33(Vec3::new(1.0, 2.0, 3.0)), Vec3::ZERO);
    }
}
