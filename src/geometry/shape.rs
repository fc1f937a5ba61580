use crate::collision::narrow_phase::{distance, DistanceInput, DistanceProxy, SimplexCache};
use crate::error::Result;
use crate::math::{Transform, Vec2};

use super::aabb::Aabb;
use super::circle::CircleShape;
use super::edge::EdgeShape;
use super::polygon::PolygonShape;
use super::ray::{RayCastInput, RayCastOutput};

/// The type of collision shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ShapeType {
    Circle,
    Polygon,
    Edge,
}

impl ShapeType {
    /// Number of shape types, for lookup tables
    pub const COUNT: usize = 3;

    #[inline]
    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

/// A collision shape owned by a fixture.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Shape {
    /// A circle with an offset center
    Circle(CircleShape),
    /// A convex polygon
    Polygon(PolygonShape),
    /// A line segment
    Edge(EdgeShape),
}

impl Shape {
    /// Creates a circle centered on the body origin
    #[inline]
    pub fn circle(radius: f32) -> Self {
        Self::Circle(CircleShape::new(radius))
    }

    /// Creates an axis-aligned box from half-widths
    #[inline]
    pub fn cuboid(hx: f32, hy: f32) -> Self {
        Self::Polygon(PolygonShape::new_box(hx, hy))
    }

    /// Creates a convex polygon from counter-clockwise vertices
    #[inline]
    pub fn polygon(vertices: &[Vec2]) -> Result<Self> {
        PolygonShape::new(vertices).map(Self::Polygon)
    }

    /// Creates a segment
    #[inline]
    pub fn edge(v1: Vec2, v2: Vec2) -> Self {
        Self::Edge(EdgeShape::new(v1, v2))
    }

    /// Returns the shape type
    #[inline]
    pub fn shape_type(&self) -> ShapeType {
        match self {
            Shape::Circle(_) => ShapeType::Circle,
            Shape::Polygon(_) => ShapeType::Polygon,
            Shape::Edge(_) => ShapeType::Edge,
        }
    }

    /// Radius used for collision skin
    #[inline]
    pub fn radius(&self) -> f32 {
        match self {
            Shape::Circle(c) => c.radius,
            Shape::Polygon(p) => p.radius,
            Shape::Edge(e) => e.radius,
        }
    }

    /// Tests a world point for containment
    pub fn test_point(&self, xf: &Transform, p: Vec2) -> bool {
        match self {
            Shape::Circle(c) => c.test_point(xf, p),
            Shape::Polygon(poly) => poly.test_point(xf, p),
            Shape::Edge(e) => e.test_point(xf, p),
        }
    }

    /// Casts a world-space segment against the shape
    pub fn ray_cast(&self, input: &RayCastInput, xf: &Transform) -> Option<RayCastOutput> {
        match self {
            Shape::Circle(c) => c.ray_cast(input, xf),
            Shape::Polygon(p) => p.ray_cast(input, xf),
            Shape::Edge(e) => e.ray_cast(input, xf),
        }
    }

    /// Computes the world AABB given a transform
    pub fn compute_aabb(&self, xf: &Transform) -> Aabb {
        match self {
            Shape::Circle(c) => c.compute_aabb(xf),
            Shape::Polygon(p) => p.compute_aabb(xf),
            Shape::Edge(e) => e.compute_aabb(xf),
        }
    }

    /// Computes mass, centroid and inertia about the local origin
    pub fn compute_mass(&self, density: f32) -> MassData {
        match self {
            Shape::Circle(c) => c.compute_mass(density),
            Shape::Polygon(p) => p.compute_mass(density),
            Shape::Edge(e) => e.compute_mass(density),
        }
    }

    /// Area below the world plane `dot(normal, x) = offset`, and its
    /// world centroid.
    pub fn compute_submerged_area(
        &self,
        normal: Vec2,
        offset: f32,
        xf: &Transform,
    ) -> (f32, Vec2) {
        match self {
            Shape::Circle(c) => c.compute_submerged_area(normal, offset, xf),
            Shape::Polygon(p) => p.compute_submerged_area(normal, offset, xf),
            Shape::Edge(e) => e.compute_submerged_area(normal, offset, xf),
        }
    }

    /// Vertex hull and radius view used by GJK
    pub fn distance_proxy(&self) -> DistanceProxy<'_> {
        match self {
            Shape::Circle(c) => DistanceProxy::new(c.vertices(), c.radius),
            Shape::Polygon(p) => DistanceProxy::new(p.vertices(), p.radius),
            Shape::Edge(e) => DistanceProxy::new(e.vertices(), e.radius),
        }
    }
}

/// Exact overlap test between two shapes, radii included
pub fn test_overlap(shape_a: &Shape, xf_a: &Transform, shape_b: &Shape, xf_b: &Transform) -> bool {
    let input = DistanceInput {
        proxy_a: shape_a.distance_proxy(),
        proxy_b: shape_b.distance_proxy(),
        transform_a: *xf_a,
        transform_b: *xf_b,
        use_radii: true,
    };
    let mut cache = SimplexCache::default();
    let output = distance(&mut cache, &input);
    output.distance < 10.0 * f32::EPSILON
}

/// Mass properties of a shape
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MassData {
    /// Total mass
    pub mass: f32,
    /// Center of mass relative to the shape origin
    pub center: Vec2,
    /// Rotational inertia about the shape origin
    pub inertia: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_types() {
        assert_eq!(Shape::circle(1.0).shape_type(), ShapeType::Circle);
        assert_eq!(Shape::cuboid(1.0, 1.0).shape_type(), ShapeType::Polygon);
        assert_eq!(Shape::edge(Vec2::ZERO, Vec2::X).shape_type(), ShapeType::Edge);
        assert_eq!(ShapeType::Edge.index(), 2);
    }

    #[test]
    fn test_overlap_uses_radii() {
        let a = Shape::circle(1.0);
        let b = Shape::circle(1.0);
        let xf_a = Transform::IDENTITY;
        let near = Transform::from_angle(Vec2::new(1.9, 0.0), 0.0);
        let far = Transform::from_angle(Vec2::new(2.1, 0.0), 0.0);
        assert!(test_overlap(&a, &xf_a, &b, &near));
        assert!(!test_overlap(&a, &xf_a, &b, &far));
    }

    #[test]
    fn test_box_overlap() {
        let a = Shape::cuboid(1.0, 1.0);
        let b = Shape::cuboid(0.5, 0.5);
        let inside = Transform::from_angle(Vec2::new(0.5, 0.5), 0.3);
        let outside = Transform::from_angle(Vec2::new(4.0, 0.0), 0.3);
        assert!(test_overlap(&a, &Transform::IDENTITY, &b, &inside));
        assert!(!test_overlap(&a, &Transform::IDENTITY, &b, &outside));
    }
}
