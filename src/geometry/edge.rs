use crate::math::{Transform, Vec2};
use crate::settings::POLYGON_RADIUS;

use super::aabb::Aabb;
use super::ray::{RayCastInput, RayCastOutput};
use super::shape::MassData;

/// A line segment, typically used for static terrain.
///
/// Edges carry no mass and do not collide with each other.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EdgeShape {
    pub(crate) vertices: [Vec2; 2],
    pub(crate) normal: Vec2,
    pub(crate) direction: Vec2,
    pub(crate) length: f32,
    /// Skin radius
    pub radius: f32,
}

impl EdgeShape {
    /// Creates a segment from `v1` to `v2`. The normal points to the right
    /// of the direction of travel.
    pub fn new(v1: Vec2, v2: Vec2) -> Self {
        let (direction, length) = (v2 - v1).normalize_with_length();
        Self {
            vertices: [v1, v2],
            normal: Vec2::new(direction.y, -direction.x),
            direction,
            length,
            radius: POLYGON_RADIUS,
        }
    }

    #[inline]
    pub fn vertex1(&self) -> Vec2 {
        self.vertices[0]
    }

    #[inline]
    pub fn vertex2(&self) -> Vec2 {
        self.vertices[1]
    }

    #[inline]
    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices
    }

    /// Unit normal, to the right of `v1 -> v2`
    #[inline]
    pub fn normal(&self) -> Vec2 {
        self.normal
    }

    /// Unit direction `v1 -> v2`
    #[inline]
    pub fn direction(&self) -> Vec2 {
        self.direction
    }

    #[inline]
    pub fn length(&self) -> f32 {
        self.length
    }

    /// Edges have no interior.
    #[inline]
    pub fn test_point(&self, _xf: &Transform, _p: Vec2) -> bool {
        false
    }

    pub fn ray_cast(&self, input: &RayCastInput, xf: &Transform) -> Option<RayCastOutput> {
        let k_slop = 100.0 * f32::MIN_POSITIVE;
        let r = input.p2 - input.p1;
        let v1 = xf.transform_point(self.vertices[0]);
        let v2 = xf.transform_point(self.vertices[1]);
        let n = (v2 - v1).cross_scalar(1.0);

        let denom = -r.dot(n);
        if denom <= k_slop {
            // Parallel or hitting the back side
            return None;
        }

        let b = input.p1 - v1;
        let mut a = b.dot(n);
        if a < 0.0 || a > input.max_fraction * denom {
            return None;
        }

        let mu2 = -r.x * b.y + r.y * b.x;
        if mu2 < -k_slop * denom || mu2 > denom * (1.0 + k_slop) {
            return None;
        }

        a /= denom;
        Some(RayCastOutput {
            normal: n.normalize(),
            fraction: a,
        })
    }

    pub fn compute_aabb(&self, xf: &Transform) -> Aabb {
        let v1 = xf.transform_point(self.vertices[0]);
        let v2 = xf.transform_point(self.vertices[1]);
        Aabb::from_points(v1, v2)
    }

    pub fn compute_mass(&self, _density: f32) -> MassData {
        MassData {
            mass: 0.0,
            center: self.vertices[0],
            inertia: 0.0,
        }
    }

    /// Signed area of the triangle between the plane origin and the
    /// submerged part of the segment, with its centroid.
    pub fn compute_submerged_area(
        &self,
        normal: Vec2,
        offset: f32,
        xf: &Transform,
    ) -> (f32, Vec2) {
        let v0 = normal * offset;
        let mut v1 = xf.transform_point(self.vertices[0]);
        let mut v2 = xf.transform_point(self.vertices[1]);

        let d1 = normal.dot(v1) - offset;
        let d2 = normal.dot(v2) - offset;

        if d1 > 0.0 {
            if d2 > 0.0 {
                return (0.0, Vec2::ZERO);
            }
            v1 = v1 * (-d2 / (d1 - d2)) + v2 * (d1 / (d1 - d2));
        } else if d2 > 0.0 {
            v2 = v1 * (-d2 / (d1 - d2)) + v2 * (d1 / (d1 - d2));
        }

        let c = (v0 + v1 + v2) * (1.0 / 3.0);
        let area = 0.5 * (v1 - v0).cross(v2 - v0);
        (area, c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_geometry() {
        let edge = EdgeShape::new(Vec2::new(0.0, 0.0), Vec2::new(4.0, 0.0));
        assert_relative_eq!(edge.length(), 4.0);
        assert_eq!(edge.direction(), Vec2::X);
        assert_eq!(edge.normal(), -Vec2::Y);
        assert!(!edge.test_point(&Transform::IDENTITY, Vec2::new(1.0, 0.0)));
        assert_eq!(edge.compute_mass(10.0).mass, 0.0);
    }

    #[test]
    fn test_ray_cast_front_and_back() {
        // Normal points down, so rays from below hit
        let edge = EdgeShape::new(Vec2::new(-1.0, 0.0), Vec2::new(1.0, 0.0));
        let from_below = RayCastInput::new(Vec2::new(0.0, -1.0), Vec2::new(0.0, 1.0));
        let out = edge
            .ray_cast(&from_below, &Transform::IDENTITY)
            .expect("front face hit");
        assert_relative_eq!(out.fraction, 0.5, epsilon = 1e-6);
        assert_relative_eq!(out.normal.y, -1.0, epsilon = 1e-6);

        let from_above = RayCastInput::new(Vec2::new(0.0, 1.0), Vec2::new(0.0, -1.0));
        assert!(edge.ray_cast(&from_above, &Transform::IDENTITY).is_none());

        let beside = RayCastInput::new(Vec2::new(3.0, -1.0), Vec2::new(3.0, 1.0));
        assert!(edge.ray_cast(&beside, &Transform::IDENTITY).is_none());
    }

    #[test]
    fn test_aabb() {
        let edge = EdgeShape::new(Vec2::new(2.0, 1.0), Vec2::new(-1.0, 3.0));
        let aabb = edge.compute_aabb(&Transform::IDENTITY);
        assert_eq!(aabb.lower, Vec2::new(-1.0, 1.0));
        assert_eq!(aabb.upper, Vec2::new(2.0, 3.0));
    }
}
