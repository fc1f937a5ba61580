use crate::math::Vec2;

use super::ray::{RayCastInput, RayCastOutput};

/// An axis-aligned bounding box defined by its lower and upper corners.
///
/// Used for broad-phase collision detection and spatial queries.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Aabb {
    /// Lower corner (smallest x and y)
    pub lower: Vec2,
    /// Upper corner (largest x and y)
    pub upper: Vec2,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::new(Vec2::ZERO, Vec2::ZERO)
    }
}

impl Aabb {
    /// Creates an AABB from its corners
    #[inline]
    pub const fn new(lower: Vec2, upper: Vec2) -> Self {
        Self { lower, upper }
    }

    /// Creates an AABB from center and half-extents
    #[inline]
    pub fn from_center_half_extents(center: Vec2, half_extents: Vec2) -> Self {
        Self::new(center - half_extents, center + half_extents)
    }

    /// Smallest AABB around two points
    #[inline]
    pub fn from_points(a: Vec2, b: Vec2) -> Self {
        Self::new(a.min(b), a.max(b))
    }

    /// Returns true if the bounds are sorted and finite
    #[inline]
    pub fn is_valid(&self) -> bool {
        let d = self.upper - self.lower;
        d.x >= 0.0 && d.y >= 0.0 && self.lower.is_valid() && self.upper.is_valid()
    }

    /// Returns the center of the AABB
    #[inline]
    pub fn center(&self) -> Vec2 {
        (self.lower + self.upper) * 0.5
    }

    /// Returns the half-extents (half the size in each dimension)
    #[inline]
    pub fn extents(&self) -> Vec2 {
        (self.upper - self.lower) * 0.5
    }

    /// Perimeter of the box
    #[inline]
    pub fn perimeter(&self) -> f32 {
        let d = self.upper - self.lower;
        2.0 * (d.x + d.y)
    }

    /// Returns true if this AABB fully contains another AABB
    #[inline]
    pub fn contains(&self, other: &Self) -> bool {
        self.lower.x <= other.lower.x
            && self.lower.y <= other.lower.y
            && other.upper.x <= self.upper.x
            && other.upper.y <= self.upper.y
    }

    /// Returns true if this AABB contains the given point
    #[inline]
    pub fn contains_point(&self, point: Vec2) -> bool {
        point.x >= self.lower.x
            && point.x <= self.upper.x
            && point.y >= self.lower.y
            && point.y <= self.upper.y
    }

    /// Returns true if the two boxes overlap (touching counts)
    #[inline]
    pub fn test_overlap(&self, other: &Self) -> bool {
        let d1 = other.lower - self.upper;
        let d2 = self.lower - other.upper;
        !(d1.x > 0.0 || d1.y > 0.0 || d2.x > 0.0 || d2.y > 0.0)
    }

    /// Returns the union of two AABBs
    #[inline]
    pub fn combine(&self, other: &Self) -> Self {
        Self::new(self.lower.min(other.lower), self.upper.max(other.upper))
    }

    /// Returns a new AABB expanded by a margin in all directions
    #[inline]
    pub fn expand(&self, margin: f32) -> Self {
        let m = Vec2::splat(margin);
        Self::new(self.lower - m, self.upper + m)
    }

    /// Slab test of a segment against the box.
    ///
    /// Returns the entry fraction and the normal of the face that was hit.
    /// A segment starting inside the box, or one that only reaches the box
    /// beyond `max_fraction`, reports no hit.
    pub fn ray_cast(&self, input: &RayCastInput) -> Option<RayCastOutput> {
        let mut tmin = -f32::MAX;
        let mut tmax = f32::MAX;
        let mut normal = Vec2::ZERO;

        let p = input.p1;
        let d = input.p2 - input.p1;

        for axis in 0..2 {
            if d[axis].abs() < f32::MIN_POSITIVE {
                // Parallel to this slab
                if p[axis] < self.lower[axis] || self.upper[axis] < p[axis] {
                    return None;
                }
                continue;
            }

            let inv_d = 1.0 / d[axis];
            let mut t1 = (self.lower[axis] - p[axis]) * inv_d;
            let mut t2 = (self.upper[axis] - p[axis]) * inv_d;
            let mut s = -1.0;
            if t1 > t2 {
                std::mem::swap(&mut t1, &mut t2);
                s = 1.0;
            }

            if t1 > tmin {
                normal = Vec2::ZERO;
                normal[axis] = s;
                tmin = t1;
            }

            tmax = tmax.min(t2);
            if tmin > tmax {
                return None;
            }
        }

        if tmin < 0.0 || input.max_fraction < tmin {
            return None;
        }

        Some(RayCastOutput {
            normal,
            fraction: tmin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit() -> Aabb {
        Aabb::new(Vec2::ZERO, Vec2::ONE)
    }

    #[test]
    fn test_center_and_extents() {
        let aabb = Aabb::new(Vec2::new(-1.0, -2.0), Vec2::new(1.0, 2.0));
        assert_eq!(aabb.center(), Vec2::ZERO);
        assert_eq!(aabb.extents(), Vec2::new(1.0, 2.0));
        assert_eq!(aabb.perimeter(), 12.0);
    }

    #[test]
    fn test_validity() {
        assert!(unit().is_valid());
        assert!(!Aabb::new(Vec2::ONE, Vec2::ZERO).is_valid());
        assert!(!Aabb::new(Vec2::ZERO, Vec2::new(f32::NAN, 1.0)).is_valid());
    }

    #[test]
    fn test_overlap() {
        let a = unit();
        let b = Aabb::new(Vec2::new(0.5, 0.5), Vec2::new(1.5, 1.5));
        let c = Aabb::new(Vec2::new(2.0, 0.0), Vec2::new(3.0, 1.0));
        let touching = Aabb::new(Vec2::new(1.0, 0.0), Vec2::new(2.0, 1.0));

        assert!(a.test_overlap(&b));
        assert!(b.test_overlap(&a));
        assert!(!a.test_overlap(&c));
        assert!(a.test_overlap(&touching));
    }

    #[test]
    fn test_combine_contains_both() {
        let a = unit();
        let b = Aabb::new(Vec2::new(2.0, -1.0), Vec2::new(3.0, 0.5));
        let u = a.combine(&b);
        assert!(u.contains(&a));
        assert!(u.contains(&b));
        assert!(u.contains(&u));
    }

    #[test]
    fn test_ray_cast_hit() {
        let input = RayCastInput {
            p1: Vec2::new(-1.0, 0.5),
            p2: Vec2::new(3.0, 0.5),
            max_fraction: 1.0,
        };
        let out = unit().ray_cast(&input).expect("ray should hit");
        assert!((out.fraction - 0.25).abs() < 1e-6);
        assert_eq!(out.normal, Vec2::new(-1.0, 0.0));
    }

    #[test]
    fn test_ray_cast_miss() {
        let parallel = RayCastInput {
            p1: Vec2::new(-1.0, 2.0),
            p2: Vec2::new(3.0, 2.0),
            max_fraction: 1.0,
        };
        assert!(unit().ray_cast(&parallel).is_none());

        let short = RayCastInput {
            p1: Vec2::new(-1.0, 0.5),
            p2: Vec2::new(3.0, 0.5),
            max_fraction: 0.1,
        };
        assert!(unit().ray_cast(&short).is_none());
    }
}
