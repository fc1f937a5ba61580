use crate::math::{Transform, Vec2};

/// Maximum iterations for the GJK distance loop
const GJK_MAX_ITERATIONS: usize = 20;

/// A convex vertex hull with a skin radius, borrowed from a shape.
#[derive(Debug, Clone, Copy)]
pub struct DistanceProxy<'a> {
    vertices: &'a [Vec2],
    /// Skin radius
    pub radius: f32,
}

impl<'a> DistanceProxy<'a> {
    /// Creates a proxy over a non-empty vertex slice
    pub fn new(vertices: &'a [Vec2], radius: f32) -> Self {
        debug_assert!(!vertices.is_empty());
        Self { vertices, radius }
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

    /// Vertex furthest along `d`
    #[inline]
    pub fn support_vertex(&self, d: Vec2) -> Vec2 {
        self.vertices[self.support(d)]
    }

    #[inline]
    pub fn vertex(&self, index: usize) -> Vec2 {
        self.vertices[index]
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }
}

/// Warm-start data for GJK, kept between calls for the same pair.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SimplexCache {
    /// Length or area of the cached simplex
    pub metric: f32,
    pub count: u8,
    pub index_a: [u8; 3],
    pub index_b: [u8; 3],
}

/// Input for [`distance`]
#[derive(Debug, Clone, Copy)]
pub struct DistanceInput<'a> {
    pub proxy_a: DistanceProxy<'a>,
    pub proxy_b: DistanceProxy<'a>,
    pub transform_a: Transform,
    pub transform_b: Transform,
    /// Shrink the result by the proxy radii
    pub use_radii: bool,
}

/// Closest points between two proxies
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DistanceOutput {
    /// Closest point on shape A
    pub point_a: Vec2,
    /// Closest point on shape B
    pub point_b: Vec2,
    pub distance: f32,
    /// Number of GJK iterations used
    pub iterations: usize,
}

/// A simplex vertex: a point of the Minkowski difference B - A plus the
/// support points that produced it.
#[derive(Debug, Clone, Copy, Default)]
struct SimplexVertex {
    w_a: Vec2,
    w_b: Vec2,
    w: Vec2,
    /// Barycentric coordinate for the closest point
    a: f32,
    index_a: usize,
    index_b: usize,
}

impl SimplexVertex {
    fn new(input: &DistanceInput<'_>, index_a: usize, index_b: usize) -> Self {
        let w_a = input
            .transform_a
            .transform_point(input.proxy_a.vertex(index_a));
        let w_b = input
            .transform_b
            .transform_point(input.proxy_b.vertex(index_b));
        Self {
            w_a,
            w_b,
            w: w_b - w_a,
            a: 1.0,
            index_a,
            index_b,
        }
    }
}

/// A 2D simplex of up to three vertices
#[derive(Debug, Clone, Default)]
struct Simplex {
    v: [SimplexVertex; 3],
    count: usize,
}

impl Simplex {
    fn read_cache(cache: &SimplexCache, input: &DistanceInput<'_>) -> Self {
        debug_assert!(cache.count <= 3);
        let mut simplex = Self::default();
        simplex.count = cache.count as usize;
        for i in 0..simplex.count {
            simplex.v[i] = SimplexVertex::new(
                input,
                cache.index_a[i] as usize,
                cache.index_b[i] as usize,
            );
            simplex.v[i].a = 0.0;
        }

        // Flush the cache if the simplex changed too much
        if simplex.count > 1 {
            let metric1 = cache.metric;
            let metric2 = simplex.metric();
            if metric2 < 0.5 * metric1 || 2.0 * metric1 < metric2 || metric2 < f32::EPSILON {
                simplex.count = 0;
            }
        }

        if simplex.count == 0 {
            simplex.v[0] = SimplexVertex::new(input, 0, 0);
            simplex.count = 1;
        }
        simplex
    }

    fn write_cache(&self, cache: &mut SimplexCache) {
        cache.metric = self.metric();
        cache.count = self.count as u8;
        for i in 0..self.count {
            cache.index_a[i] = self.v[i].index_a as u8;
            cache.index_b[i] = self.v[i].index_b as u8;
        }
    }

    fn search_direction(&self) -> Vec2 {
        match self.count {
            1 => -self.v[0].w,
            2 => {
                let e12 = self.v[1].w - self.v[0].w;
                let sgn = e12.cross(-self.v[0].w);
                if sgn > 0.0 {
                    // Origin is left of e12
                    Vec2::scalar_cross(1.0, e12)
                } else {
                    e12.cross_scalar(1.0)
                }
            }
            _ => {
                debug_assert!(false, "invalid simplex size");
                Vec2::ZERO
            }
        }
    }

    fn witness_points(&self) -> (Vec2, Vec2) {
        let [v1, v2, v3] = &self.v;
        match self.count {
            1 => (v1.w_a, v1.w_b),
            2 => (
                v1.w_a * v1.a + v2.w_a * v2.a,
                v1.w_b * v1.a + v2.w_b * v2.a,
            ),
            3 => {
                let p = v1.w_a * v1.a + v2.w_a * v2.a + v3.w_a * v3.a;
                (p, p)
            }
            _ => {
                debug_assert!(false, "invalid simplex size");
                (Vec2::ZERO, Vec2::ZERO)
            }
        }
    }

    fn metric(&self) -> f32 {
        match self.count {
            2 => (self.v[0].w - self.v[1].w).length(),
            3 => (self.v[1].w - self.v[0].w).cross(self.v[2].w - self.v[0].w),
            _ => 0.0,
        }
    }

    /// Closest point on a segment to the origin, by barycentric regions.
    fn solve2(&mut self) {
        let w1 = self.v[0].w;
        let w2 = self.v[1].w;
        let e12 = w2 - w1;

        // w1 region
        let d12_2 = -w1.dot(e12);
        if d12_2 <= 0.0 {
            self.v[0].a = 1.0;
            self.count = 1;
            return;
        }

        // w2 region
        let d12_1 = w2.dot(e12);
        if d12_1 <= 0.0 {
            self.v[1].a = 1.0;
            self.count = 1;
            self.v[0] = self.v[1];
            return;
        }

        // Must be in e12 region
        let inv_d12 = 1.0 / (d12_1 + d12_2);
        self.v[0].a = d12_1 * inv_d12;
        self.v[1].a = d12_2 * inv_d12;
        self.count = 2;
    }

    /// Closest point on a triangle to the origin. Vertex, edge and interior
    /// regions are tested in turn.
    fn solve3(&mut self) {
        let w1 = self.v[0].w;
        let w2 = self.v[1].w;
        let w3 = self.v[2].w;

        let e12 = w2 - w1;
        let d12_1 = w2.dot(e12);
        let d12_2 = -w1.dot(e12);

        let e13 = w3 - w1;
        let d13_1 = w3.dot(e13);
        let d13_2 = -w1.dot(e13);

        let e23 = w3 - w2;
        let d23_1 = w3.dot(e23);
        let d23_2 = -w2.dot(e23);

        let n123 = e12.cross(e13);
        let d123_1 = n123 * w2.cross(w3);
        let d123_2 = n123 * w3.cross(w1);
        let d123_3 = n123 * w1.cross(w2);

        // w1 region
        if d12_2 <= 0.0 && d13_2 <= 0.0 {
            self.v[0].a = 1.0;
            self.count = 1;
            return;
        }

        // e12
        if d12_1 > 0.0 && d12_2 > 0.0 && d123_3 <= 0.0 {
            let inv_d12 = 1.0 / (d12_1 + d12_2);
            self.v[0].a = d12_1 * inv_d12;
            self.v[1].a = d12_2 * inv_d12;
            self.count = 2;
            return;
        }

        // e13
        if d13_1 > 0.0 && d13_2 > 0.0 && d123_2 <= 0.0 {
            let inv_d13 = 1.0 / (d13_1 + d13_2);
            self.v[0].a = d13_1 * inv_d13;
            self.v[2].a = d13_2 * inv_d13;
            self.count = 2;
            self.v[1] = self.v[2];
            return;
        }

        // w2 region
        if d12_1 <= 0.0 && d23_2 <= 0.0 {
            self.v[1].a = 1.0;
            self.count = 1;
            self.v[0] = self.v[1];
            return;
        }

        // w3 region
        if d13_1 <= 0.0 && d23_1 <= 0.0 {
            self.v[2].a = 1.0;
            self.count = 1;
            self.v[0] = self.v[2];
            return;
        }

        // e23
        if d23_1 > 0.0 && d23_2 > 0.0 && d123_1 <= 0.0 {
            let inv_d23 = 1.0 / (d23_1 + d23_2);
            self.v[1].a = d23_1 * inv_d23;
            self.v[2].a = d23_2 * inv_d23;
            self.count = 2;
            self.v[0] = self.v[2];
            return;
        }

        // Must be in triangle123
        let inv_d123 = 1.0 / (d123_1 + d123_2 + d123_3);
        self.v[0].a = d123_1 * inv_d123;
        self.v[1].a = d123_2 * inv_d123;
        self.v[2].a = d123_3 * inv_d123;
        self.count = 3;
    }
}

/// Computes the closest points between two convex proxies with GJK.
///
/// `cache` warm-starts the search and is updated on return. When
/// `use_radii` is set the result is measured between the rounded shapes;
/// overlapping shapes report distance 0 and coincident witness points.
pub fn distance(cache: &mut SimplexCache, input: &DistanceInput<'_>) -> DistanceOutput {
    let proxy_a = &input.proxy_a;
    let proxy_b = &input.proxy_b;
    let xf_a = &input.transform_a;
    let xf_b = &input.transform_b;

    let mut simplex = Simplex::read_cache(cache, input);

    let mut iterations = 0;
    while iterations < GJK_MAX_ITERATIONS {
        let mut save_a = [0usize; 3];
        let mut save_b = [0usize; 3];
        let save_count = simplex.count;
        for i in 0..save_count {
            save_a[i] = simplex.v[i].index_a;
            save_b[i] = simplex.v[i].index_b;
        }

        match simplex.count {
            2 => simplex.solve2(),
            3 => simplex.solve3(),
            _ => {}
        }

        // Origin is inside the triangle: overlap
        if simplex.count == 3 {
            break;
        }

        let d = simplex.search_direction();
        if d.length_squared() < f32::EPSILON * f32::EPSILON {
            // The origin lies on the simplex; treat as overlap
            break;
        }

        let index_a = proxy_a.support(xf_a.r.mul_transpose(-d));
        let index_b = proxy_b.support(xf_b.r.mul_transpose(d));
        let vertex = SimplexVertex::new(input, index_a, index_b);
        iterations += 1;

        // A repeated support point means no further progress
        let duplicate = (0..save_count).any(|i| save_a[i] == index_a && save_b[i] == index_b);
        if duplicate {
            break;
        }

        simplex.v[simplex.count] = vertex;
        simplex.count += 1;
    }

    let (mut point_a, mut point_b) = simplex.witness_points();
    let mut dist = (point_b - point_a).length();
    simplex.write_cache(cache);

    if input.use_radii {
        let r_a = proxy_a.radius;
        let r_b = proxy_b.radius;
        if dist > r_a + r_b && dist > f32::EPSILON {
            // Shapes are still separated: move witness points to the surfaces
            dist -= r_a + r_b;
            let normal = (point_b - point_a).normalize();
            point_a += normal * r_a;
            point_b -= normal * r_b;
        } else {
            let p = (point_a + point_b) * 0.5;
            point_a = p;
            point_b = p;
            dist = 0.0;
        }
    }

    DistanceOutput {
        point_a,
        point_b,
        distance: dist,
        iterations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square() -> [Vec2; 4] {
        [
            Vec2::new(-1.0, -1.0),
            Vec2::new(1.0, -1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(-1.0, 1.0),
        ]
    }

    #[test]
    fn test_separated_boxes() {
        let verts = square();
        let input = DistanceInput {
            proxy_a: DistanceProxy::new(&verts, 0.0),
            proxy_b: DistanceProxy::new(&verts, 0.0),
            transform_a: Transform::IDENTITY,
            transform_b: Transform::from_angle(Vec2::new(5.0, 0.0), 0.0),
            use_radii: false,
        };
        let mut cache = SimplexCache::default();
        let out = distance(&mut cache, &input);
        assert_relative_eq!(out.distance, 3.0, epsilon = 1e-5);
        assert_relative_eq!(out.point_a.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(out.point_b.x, 4.0, epsilon = 1e-5);
        assert!(cache.count >= 1);
    }

    #[test]
    fn test_overlapping_boxes() {
        let verts = square();
        let input = DistanceInput {
            proxy_a: DistanceProxy::new(&verts, 0.0),
            proxy_b: DistanceProxy::new(&verts, 0.0),
            transform_a: Transform::IDENTITY,
            transform_b: Transform::from_angle(Vec2::new(0.5, 0.3), 0.4),
            use_radii: false,
        };
        let mut cache = SimplexCache::default();
        let out = distance(&mut cache, &input);
        assert!(out.distance < 1e-5);
    }

    #[test]
    fn test_radii_shrink_distance() {
        let point = [Vec2::ZERO];
        let input = DistanceInput {
            proxy_a: DistanceProxy::new(&point, 1.0),
            proxy_b: DistanceProxy::new(&point, 0.5),
            transform_a: Transform::IDENTITY,
            transform_b: Transform::from_angle(Vec2::new(0.0, 4.0), 0.0),
            use_radii: true,
        };
        let mut cache = SimplexCache::default();
        let out = distance(&mut cache, &input);
        assert_relative_eq!(out.distance, 2.5, epsilon = 1e-5);
        assert_relative_eq!(out.point_a.y, 1.0, epsilon = 1e-5);
        assert_relative_eq!(out.point_b.y, 3.5, epsilon = 1e-5);
    }

    #[test]
    fn test_cache_warm_start() {
        let verts = square();
        let mut input = DistanceInput {
            proxy_a: DistanceProxy::new(&verts, 0.0),
            proxy_b: DistanceProxy::new(&verts, 0.0),
            transform_a: Transform::IDENTITY,
            transform_b: Transform::from_angle(Vec2::new(4.0, 1.0), 0.1),
            use_radii: false,
        };
        let mut cache = SimplexCache::default();
        let first = distance(&mut cache, &input);

        input.transform_b = Transform::from_angle(Vec2::new(4.01, 1.0), 0.1);
        let second = distance(&mut cache, &input);
        assert!(second.iterations <= first.iterations);
        assert_relative_eq!(second.distance, first.distance + 0.01, epsilon = 1e-3);
    }

    #[test]
    fn test_support() {
        let verts = square();
        let proxy = DistanceProxy::new(&verts, 0.0);
        assert_eq!(proxy.support(Vec2::new(1.0, 1.1)), 2);
        assert_eq!(proxy.support_vertex(Vec2::new(-1.0, -1.1)), verts[0]);
        assert_eq!(proxy.vertex_count(), 4);
    }
}
