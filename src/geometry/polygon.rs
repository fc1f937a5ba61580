use smallvec::SmallVec;
use tracing::warn;

use crate::error::{PhysicsError, Result};
use crate::math::{Transform, Vec2};
use crate::settings::{MAX_POLYGON_VERTICES, POLYGON_RADIUS};

use super::aabb::Aabb;
use super::edge::EdgeShape;
use super::ray::{RayCastInput, RayCastOutput};
use super::shape::MassData;

/// Vertex storage sized for the largest allowed polygon.
pub type VertexList = SmallVec<[Vec2; MAX_POLYGON_VERTICES]>;

/// A convex polygon with counter-clockwise winding.
///
/// Two-vertex polygons are allowed and behave as thin segments with two
/// opposing normals.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PolygonShape {
    pub(crate) vertices: VertexList,
    pub(crate) normals: VertexList,
    pub(crate) centroid: Vec2,
    /// Skin radius around the hull
    pub radius: f32,
}

impl PolygonShape {
    /// Builds a polygon from counter-clockwise vertices.
    ///
    /// Fails when there are fewer than two or more than
    /// [`MAX_POLYGON_VERTICES`] vertices, an edge has zero length, or the
    /// hull is not convex with counter-clockwise winding.
    pub fn new(points: &[Vec2]) -> Result<Self> {
        let count = points.len();
        if count < 2 {
            warn!(count, "polygon needs at least two vertices");
            return Err(PhysicsError::DegeneratePolygon("fewer than two vertices"));
        }
        if count > MAX_POLYGON_VERTICES {
            return Err(PhysicsError::DegeneratePolygon("too many vertices"));
        }
        if count == 2 {
            return Self::edge(points[0], points[1]);
        }

        let vertices: VertexList = points.iter().copied().collect();
        let mut normals = VertexList::new();
        for i in 0..count {
            let edge = vertices[(i + 1) % count] - vertices[i];
            if edge.length_squared() <= f32::EPSILON * f32::EPSILON {
                return Err(PhysicsError::DegeneratePolygon("zero-length edge"));
            }
            normals.push(edge.cross_scalar(1.0).normalize());
        }

        // Every other vertex must lie strictly left of each edge
        for i in 0..count {
            let i2 = (i + 1) % count;
            let edge = vertices[i2] - vertices[i];
            for (j, &v) in vertices.iter().enumerate() {
                if j == i || j == i2 {
                    continue;
                }
                if edge.cross(v - vertices[i]) <= 0.0 {
                    return Err(PhysicsError::DegeneratePolygon(
                        "vertices are not convex and counter-clockwise",
                    ));
                }
            }
        }

        let centroid = compute_centroid(&vertices);
        Ok(Self {
            vertices,
            normals,
            centroid,
            radius: POLYGON_RADIUS,
        })
    }

    /// Axis-aligned box with the given half-widths, centered on the origin
    pub fn new_box(hx: f32, hy: f32) -> Self {
        Self {
            vertices: SmallVec::from_slice(&[
                Vec2::new(-hx, -hy),
                Vec2::new(hx, -hy),
                Vec2::new(hx, hy),
                Vec2::new(-hx, hy),
            ]),
            normals: SmallVec::from_slice(&[-Vec2::Y, Vec2::X, Vec2::Y, -Vec2::X]),
            centroid: Vec2::ZERO,
            radius: POLYGON_RADIUS,
        }
    }

    /// Box with half-widths `hx`, `hy`, centered at `center` and rotated by `angle`
    pub fn new_oriented_box(hx: f32, hy: f32, center: Vec2, angle: f32) -> Self {
        let mut shape = Self::new_box(hx, hy);
        let xf = Transform::from_angle(center, angle);
        for (v, n) in shape.vertices.iter_mut().zip(shape.normals.iter_mut()) {
            *v = xf.transform_point(*v);
            *n = xf.transform_vector(*n);
        }
        shape.centroid = center;
        shape
    }

    /// Two-sided segment from `v1` to `v2`
    pub fn edge(v1: Vec2, v2: Vec2) -> Result<Self> {
        let d = v2 - v1;
        if d.length_squared() <= f32::EPSILON * f32::EPSILON {
            return Err(PhysicsError::DegeneratePolygon("zero-length edge"));
        }
        let n = d.cross_scalar(1.0).normalize();
        Ok(Self {
            vertices: SmallVec::from_slice(&[v1, v2]),
            normals: SmallVec::from_slice(&[n, -n]),
            centroid: (v1 + v2) * 0.5,
            radius: POLYGON_RADIUS,
        })
    }

    /// Two-vertex polygon view of an edge, keeping its skin radius
    pub(crate) fn from_edge(edge: &EdgeShape) -> Self {
        let [v1, v2] = edge.vertices;
        Self {
            vertices: SmallVec::from_slice(&[v1, v2]),
            normals: SmallVec::from_slice(&[edge.normal, -edge.normal]),
            centroid: (v1 + v2) * 0.5,
            radius: edge.radius,
        }
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[inline]
    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices
    }

    #[inline]
    pub fn normals(&self) -> &[Vec2] {
        &self.normals
    }

    #[inline]
    pub fn centroid(&self) -> Vec2 {
        self.centroid
    }

    /// Index of the vertex furthest along `d`
    pub fn support(&self, d: Vec2) -> usize {
        let mut best_index = 0;
        let mut best_value = self.vertices[0].dot(d);
        for (i, v) in self.vertices.iter().enumerate().skip(1) {
            let value = v.dot(d);
            if value > best_value {
                best_index = i;
                best_value = value;
            }
        }
        best_index
    }

    pub fn test_point(&self, xf: &Transform, p: Vec2) -> bool {
        let local = xf.inverse_transform_point(p);
        self.vertices
            .iter()
            .zip(self.normals.iter())
            .all(|(&v, &n)| n.dot(local - v) <= 0.0)
    }

    pub fn ray_cast(&self, input: &RayCastInput, xf: &Transform) -> Option<RayCastOutput> {
        // Put the ray into the polygon's frame of reference
        let p1 = xf.inverse_transform_point(input.p1);
        let p2 = xf.inverse_transform_point(input.p2);
        let d = p2 - p1;

        let mut lower = 0.0f32;
        let mut upper = input.max_fraction;
        let mut index = None;

        for (i, (&v, &n)) in self.vertices.iter().zip(self.normals.iter()).enumerate() {
            // p = p1 + a * d
            // dot(normal, p - v) = 0
            // dot(normal, p1 - v) + a * dot(normal, d) = 0
            let numerator = n.dot(v - p1);
            let denominator = n.dot(d);

            if denominator == 0.0 {
                if numerator < 0.0 {
                    return None;
                }
            } else if denominator < 0.0 && numerator < lower * denominator {
                // Increase lower, the segment enters this half-space
                lower = numerator / denominator;
                index = Some(i);
            } else if denominator > 0.0 && numerator < upper * denominator {
                // Decrease upper, the segment exits this half-space
                upper = numerator / denominator;
            }

            if upper < lower - f32::MIN_POSITIVE {
                return None;
            }
        }

        index.map(|i| RayCastOutput {
            normal: xf.transform_vector(self.normals[i]),
            fraction: lower,
        })
    }

    pub fn compute_aabb(&self, xf: &Transform) -> Aabb {
        let first = xf.transform_point(self.vertices[0]);
        let (lower, upper) = self.vertices[1..]
            .iter()
            .map(|&v| xf.transform_point(v))
            .fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
        let r = Vec2::splat(self.radius);
        Aabb::new(lower - r, upper + r)
    }

    pub fn compute_mass(&self, density: f32) -> MassData {
        if self.vertices.len() == 2 {
            return MassData {
                mass: 0.0,
                center: (self.vertices[0] + self.vertices[1]) * 0.5,
                inertia: 0.0,
            };
        }

        // Triangle fan from the origin; the reference point's choice only
        // affects round-off
        const INV3: f32 = 1.0 / 3.0;
        let count = self.vertices.len();
        let mut center = Vec2::ZERO;
        let mut area = 0.0;
        let mut inertia = 0.0;

        for i in 0..count {
            let e1 = self.vertices[i];
            let e2 = self.vertices[(i + 1) % count];
            let d = e1.cross(e2);
            let triangle_area = 0.5 * d;
            area += triangle_area;
            center += (e1 + e2) * (triangle_area * INV3);

            let intx2 = INV3 * (0.25 * (e1.x * e1.x + e2.x * e1.x + e2.x * e2.x));
            let inty2 = INV3 * (0.25 * (e1.y * e1.y + e2.y * e1.y + e2.y * e2.y));
            inertia += d * (intx2 + inty2);
        }

        if area <= f32::EPSILON {
            warn!(area, "polygon has no area, treating it as massless");
            return MassData {
                mass: 0.0,
                center: self.centroid,
                inertia: 0.0,
            };
        }

        MassData {
            mass: density * area,
            center: center * (1.0 / area),
            inertia: density * inertia,
        }
    }

    /// Area of the polygon below the plane `dot(normal, x) = offset`,
    /// with its centroid.
    pub fn compute_submerged_area(
        &self,
        normal: Vec2,
        offset: f32,
        xf: &Transform,
    ) -> (f32, Vec2) {
        // Plane in local coordinates
        let normal_l = xf.inverse_transform_vector(normal);
        let offset_l = offset - normal.dot(xf.position);

        let count = self.vertices.len();
        let mut depths: SmallVec<[f32; MAX_POLYGON_VERTICES]> = SmallVec::new();
        let mut dive_count = 0;
        let mut into_index: Option<usize> = None;
        let mut outo_index: Option<usize> = None;
        let mut last_submerged = false;

        for (i, v) in self.vertices.iter().enumerate() {
            let depth = normal_l.dot(*v) - offset_l;
            depths.push(depth);
            let is_submerged = depth < -f32::MIN_POSITIVE;
            if i > 0 {
                if is_submerged && !last_submerged {
                    into_index = Some(i - 1);
                    dive_count += 1;
                } else if !is_submerged && last_submerged {
                    outo_index = Some(i - 1);
                    dive_count += 1;
                }
            }
            last_submerged = is_submerged;
        }

        let (into_index, outo_index) = match dive_count {
            0 => {
                if last_submerged {
                    // Completely submerged
                    let md = self.compute_mass(1.0);
                    return (md.mass, xf.transform_point(md.center));
                }
                return (0.0, Vec2::ZERO);
            }
            1 => match (into_index, outo_index) {
                (None, Some(outo)) => (count - 1, outo),
                (Some(into), _) => (into, count - 1),
                (None, None) => return (0.0, Vec2::ZERO),
            },
            _ => match (into_index, outo_index) {
                (Some(into), Some(outo)) => (into, outo),
                _ => return (0.0, Vec2::ZERO),
            },
        };

        let into_index2 = (into_index + 1) % count;
        let outo_index2 = (outo_index + 1) % count;
        let into_lambda = -depths[into_index] / (depths[into_index2] - depths[into_index]);
        let outo_lambda = -depths[outo_index] / (depths[outo_index2] - depths[outo_index]);

        let into_vec = self.vertices[into_index].lerp(self.vertices[into_index2], into_lambda);
        let outo_vec = self.vertices[outo_index].lerp(self.vertices[outo_index2], outo_lambda);

        // Fan the submerged part from the entry point
        let mut area = 0.0;
        let mut center = Vec2::ZERO;
        let mut p2 = self.vertices[into_index2];
        let mut i = into_index2;
        while i != outo_index2 {
            i = (i + 1) % count;
            let p3 = if i == outo_index2 {
                outo_vec
            } else {
                self.vertices[i]
            };
            let triangle_area = 0.5 * (p2 - into_vec).cross(p3 - into_vec);
            area += triangle_area;
            center += (into_vec + p2 + p3) * (triangle_area / 3.0);
            p2 = p3;
        }

        if area <= 0.0 {
            return (0.0, Vec2::ZERO);
        }
        center *= 1.0 / area;
        (area, xf.transform_point(center))
    }
}

/// Area-weighted centroid of a counter-clockwise polygon
pub(crate) fn compute_centroid(vertices: &[Vec2]) -> Vec2 {
    const INV3: f32 = 1.0 / 3.0;
    let count = vertices.len();
    let mut c = Vec2::ZERO;
    let mut area = 0.0;
    for i in 0..count {
        let p2 = vertices[i];
        let p3 = vertices[(i + 1) % count];
        let triangle_area = 0.5 * p2.cross(p3);
        area += triangle_area;
        c += (p2 + p3) * (triangle_area * INV3);
    }
    if area > f32::EPSILON {
        c * (1.0 / area)
    } else {
        c
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_box_mass() {
        let b = PolygonShape::new_box(1.0, 2.0);
        let md = b.compute_mass(2.0);
        // 2 x 4 box
        assert_relative_eq!(md.mass, 16.0, epsilon = 1e-4);
        assert_relative_eq!(md.center.x, 0.0, epsilon = 1e-6);
        // I = m (w^2 + h^2) / 12
        assert_relative_eq!(md.inertia, 16.0 * (4.0 + 16.0) / 12.0, epsilon = 1e-3);
    }

    #[test]
    fn test_rejects_degenerate() {
        assert!(PolygonShape::new(&[Vec2::ZERO]).is_err());
        // Clockwise triangle
        let cw = [Vec2::new(0.0, 0.0), Vec2::new(0.0, 1.0), Vec2::new(1.0, 0.0)];
        assert!(PolygonShape::new(&cw).is_err());
        // Repeated vertex
        let dup = [Vec2::ZERO, Vec2::ZERO, Vec2::new(1.0, 1.0)];
        assert!(PolygonShape::new(&dup).is_err());
    }

    #[test]
    fn test_triangle_centroid() {
        let tri = PolygonShape::new(&[
            Vec2::new(0.0, 0.0),
            Vec2::new(3.0, 0.0),
            Vec2::new(0.0, 3.0),
        ])
        .expect("valid triangle");
        assert_relative_eq!(tri.centroid().x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(tri.centroid().y, 1.0, epsilon = 1e-5);
        assert_eq!(tri.vertex_count(), 3);
    }

    #[test]
    fn test_point_and_ray() {
        let b = PolygonShape::new_box(1.0, 1.0);
        let xf = Transform::from_angle(Vec2::new(5.0, 0.0), 0.0);
        assert!(b.test_point(&xf, Vec2::new(5.5, 0.5)));
        assert!(!b.test_point(&xf, Vec2::new(3.5, 0.5)));

        let input = RayCastInput::new(Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0));
        let out = b.ray_cast(&input, &xf).expect("ray should hit");
        assert_relative_eq!(out.fraction, 0.4, epsilon = 1e-6);
        assert_relative_eq!(out.normal.x, -1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_aabb_includes_skin() {
        let b = PolygonShape::new_box(1.0, 1.0);
        let aabb = b.compute_aabb(&Transform::IDENTITY);
        assert_relative_eq!(aabb.upper.x, 1.0 + POLYGON_RADIUS);
        assert_relative_eq!(aabb.lower.y, -1.0 - POLYGON_RADIUS);
    }

    #[test]
    fn test_submerged_half_box() {
        let b = PolygonShape::new_box(1.0, 1.0);
        let (area, c) = b.compute_submerged_area(Vec2::Y, 0.0, &Transform::IDENTITY);
        assert_relative_eq!(area, 2.0, epsilon = 1e-5);
        assert_relative_eq!(c.y, -0.5, epsilon = 1e-5);

        let (none, _) = b.compute_submerged_area(Vec2::Y, -5.0, &Transform::IDENTITY);
        assert_eq!(none, 0.0);

        let (all, _) = b.compute_submerged_area(Vec2::Y, 5.0, &Transform::IDENTITY);
        assert_relative_eq!(all, 4.0, epsilon = 1e-5);
    }

    #[test]
    fn test_oriented_box() {
        let b = PolygonShape::new_oriented_box(1.0, 0.5, Vec2::new(2.0, 0.0), std::f32::consts::FRAC_PI_2);
        assert_eq!(b.centroid(), Vec2::new(2.0, 0.0));
        assert!(b.test_point(&Transform::IDENTITY, Vec2::new(2.0, 0.9)));
        assert!(!b.test_point(&Transform::IDENTITY, Vec2::new(2.9, 0.0)));
    }
}
