use std::f32::consts::{FRAC_PI_2, PI};

use crate::math::{Transform, Vec2};

use super::aabb::Aabb;
use super::ray::{RayCastInput, RayCastOutput};
use super::shape::MassData;

/// A solid circle with an offset center.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CircleShape {
    /// Center in the body frame
    pub position: Vec2,
    /// Radius
    pub radius: f32,
}

impl CircleShape {
    /// Creates a circle centered on the body origin
    #[inline]
    pub const fn new(radius: f32) -> Self {
        Self {
            position: Vec2::ZERO,
            radius,
        }
    }

    /// Creates a circle with an offset center
    #[inline]
    pub const fn with_position(radius: f32, position: Vec2) -> Self {
        Self { position, radius }
    }

    /// Center as a one-element vertex slice for distance queries
    #[inline]
    pub fn vertices(&self) -> &[Vec2] {
        std::slice::from_ref(&self.position)
    }

    pub fn test_point(&self, xf: &Transform, p: Vec2) -> bool {
        let center = xf.transform_point(self.position);
        (p - center).length_squared() <= self.radius * self.radius
    }

    /// Collision Detection in Interactive 3D Environments by Gino van den Bergen,
    /// section 3.1.2: x = s + a * r with |x| = radius.
    pub fn ray_cast(&self, input: &RayCastInput, xf: &Transform) -> Option<RayCastOutput> {
        let position = xf.transform_point(self.position);
        let s = input.p1 - position;
        let b = s.length_squared() - self.radius * self.radius;

        // Solve quadratic equation
        let r = input.p2 - input.p1;
        let c = s.dot(r);
        let rr = r.length_squared();
        let sigma = c * c - rr * b;

        // Check for negative discriminant and short segment
        if sigma < 0.0 || rr < f32::MIN_POSITIVE {
            return None;
        }

        // Find the point of intersection of the line with the circle
        let mut a = -(c + sigma.sqrt());

        // Is the intersection point on the segment?
        if 0.0 <= a && a <= input.max_fraction * rr {
            a /= rr;
            return Some(RayCastOutput {
                normal: (s + r * a).normalize(),
                fraction: a,
            });
        }

        None
    }

    pub fn compute_aabb(&self, xf: &Transform) -> Aabb {
        let p = xf.transform_point(self.position);
        Aabb::from_center_half_extents(p, Vec2::splat(self.radius))
    }

    pub fn compute_mass(&self, density: f32) -> MassData {
        let rr = self.radius * self.radius;
        let mass = density * PI * rr;
        MassData {
            mass,
            center: self.position,
            // Inertia about the local origin
            inertia: mass * (0.5 * rr + self.position.length_squared()),
        }
    }

    /// Area of the circle below the plane `dot(normal, x) = offset`,
    /// with its centroid.
    pub fn compute_submerged_area(
        &self,
        normal: Vec2,
        offset: f32,
        xf: &Transform,
    ) -> (f32, Vec2) {
        let p = xf.transform_point(self.position);
        let l = -(normal.dot(p) - offset);
        let rr = self.radius * self.radius;

        if l < -self.radius + f32::MIN_POSITIVE {
            // Completely dry
            return (0.0, Vec2::ZERO);
        }
        if l > self.radius {
            // Completely wet
            return (PI * rr, p);
        }

        // Partially submerged: circular segment
        let l2 = l * l;
        let area = rr * ((l / self.radius).asin() + FRAC_PI_2) + l * (rr - l2).sqrt();
        let com = -2.0 / 3.0 * (rr - l2).powf(1.5) / area;
        (area, p + normal * com)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mass() {
        let circle = CircleShape::new(2.0);
        let md = circle.compute_mass(1.0);
        assert_relative_eq!(md.mass, PI * 4.0);
        assert_relative_eq!(md.inertia, md.mass * 2.0);
        assert_eq!(md.center, Vec2::ZERO);
    }

    #[test]
    fn test_point_and_aabb() {
        let circle = CircleShape::with_position(1.0, Vec2::new(1.0, 0.0));
        let xf = Transform::from_angle(Vec2::new(0.0, 1.0), 0.0);
        assert!(circle.test_point(&xf, Vec2::new(1.5, 1.0)));
        assert!(!circle.test_point(&xf, Vec2::new(-0.5, 1.0)));

        let aabb = circle.compute_aabb(&xf);
        assert_eq!(aabb.lower, Vec2::new(0.0, 0.0));
        assert_eq!(aabb.upper, Vec2::new(2.0, 2.0));
    }

    #[test]
    fn test_ray_cast() {
        let circle = CircleShape::new(1.0);
        let input = RayCastInput::new(Vec2::new(-3.0, 0.0), Vec2::new(3.0, 0.0));
        let out = circle
            .ray_cast(&input, &Transform::IDENTITY)
            .expect("ray should hit");
        assert_relative_eq!(out.fraction, 2.0 / 6.0, epsilon = 1e-6);
        assert_relative_eq!(out.normal.x, -1.0, epsilon = 1e-6);

        // Starting inside reports no hit
        let inside = RayCastInput::new(Vec2::ZERO, Vec2::new(3.0, 0.0));
        assert!(circle.ray_cast(&inside, &Transform::IDENTITY).is_none());
    }

    #[test]
    fn test_submerged_area() {
        let circle = CircleShape::new(1.0);
        let xf = Transform::IDENTITY;
        let up = Vec2::Y;

        let (dry, _) = circle.compute_submerged_area(up, -2.0, &xf);
        assert_eq!(dry, 0.0);

        let (wet, c) = circle.compute_submerged_area(up, 2.0, &xf);
        assert_relative_eq!(wet, PI);
        assert_eq!(c, Vec2::ZERO);

        // Half submerged: centroid of a half disc sits 4r/3pi below the surface
        let (half, c) = circle.compute_submerged_area(up, 0.0, &xf);
        assert_relative_eq!(half, PI / 2.0, epsilon = 1e-5);
        assert_relative_eq!(c.y, -4.0 / (3.0 * PI), epsilon = 1e-5);
    }
}
