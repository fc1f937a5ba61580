use crate::math::{Sweep, Transform, Vec2};

use super::distance::{distance, DistanceInput, DistanceProxy, SimplexCache};

/// Cap on conservative advancement steps
const MAX_ITERATIONS: usize = 1000;

/// Cap on root finder steps per advancement
const MAX_ROOT_ITERATIONS: usize = 50;

/// Input for [`time_of_impact`]. Both sweeps must share the same `t0`.
#[derive(Debug, Clone, Copy)]
pub struct ToiInput<'a> {
    pub proxy_a: DistanceProxy<'a>,
    pub proxy_b: DistanceProxy<'a>,
    pub sweep_a: Sweep,
    pub sweep_b: Sweep,
    /// Target clearance tolerance, usually [`LINEAR_SLOP`](crate::settings::LINEAR_SLOP)
    pub tolerance: f32,
}

/// Which feature pair defines the separating axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SeparationKind {
    Points,
    FaceA,
    FaceB,
}

/// Signed separation along an axis fixed to one body, built from a GJK
/// simplex cache.
#[derive(Debug, Clone, Copy)]
pub struct SeparationFunction<'a> {
    proxy_a: DistanceProxy<'a>,
    proxy_b: DistanceProxy<'a>,
    kind: SeparationKind,
    local_point: Vec2,
    axis: Vec2,
}

impl<'a> SeparationFunction<'a> {
    /// Builds the axis from a cache holding one or two points
    pub fn new(
        cache: &SimplexCache,
        proxy_a: DistanceProxy<'a>,
        xf_a: &Transform,
        proxy_b: DistanceProxy<'a>,
        xf_b: &Transform,
    ) -> Self {
        debug_assert!(0 < cache.count && cache.count < 3);

        if cache.count == 1 {
            let point_a = xf_a.transform_point(proxy_a.vertex(cache.index_a[0] as usize));
            let point_b = xf_b.transform_point(proxy_b.vertex(cache.index_b[0] as usize));
            return Self {
                proxy_a,
                proxy_b,
                kind: SeparationKind::Points,
                local_point: Vec2::ZERO,
                axis: (point_b - point_a).normalize(),
            };
        }

        if cache.index_a[0] == cache.index_a[1] {
            // Two points on B and one on A
            let local_b1 = proxy_b.vertex(cache.index_b[0] as usize);
            let local_b2 = proxy_b.vertex(cache.index_b[1] as usize);
            let local_point = (local_b1 + local_b2) * 0.5;
            let mut axis = (local_b2 - local_b1).cross_scalar(1.0).normalize();

            let normal = xf_b.transform_vector(axis);
            let point_b = xf_b.transform_point(local_point);
            let point_a = xf_a.transform_point(proxy_a.vertex(cache.index_a[0] as usize));
            if (point_a - point_b).dot(normal) < 0.0 {
                axis = -axis;
            }
            return Self {
                proxy_a,
                proxy_b,
                kind: SeparationKind::FaceB,
                local_point,
                axis,
            };
        }

        // Two points on A and one or two on B
        let local_a1 = proxy_a.vertex(cache.index_a[0] as usize);
        let local_a2 = proxy_a.vertex(cache.index_a[1] as usize);
        let local_point = (local_a1 + local_a2) * 0.5;
        let mut axis = (local_a2 - local_a1).cross_scalar(1.0).normalize();

        let normal = xf_a.transform_vector(axis);
        let point_a = xf_a.transform_point(local_point);
        let point_b = xf_b.transform_point(proxy_b.vertex(cache.index_b[0] as usize));
        if (point_b - point_a).dot(normal) < 0.0 {
            axis = -axis;
        }
        Self {
            proxy_a,
            proxy_b,
            kind: SeparationKind::FaceA,
            local_point,
            axis,
        }
    }

    /// Separation of the deepest support points along the axis
    pub fn evaluate(&self, xf_a: &Transform, xf_b: &Transform) -> f32 {
        match self.kind {
            SeparationKind::Points => {
                let axis_a = xf_a.r.mul_transpose(self.axis);
                let axis_b = xf_b.r.mul_transpose(-self.axis);
                let point_a = xf_a.transform_point(self.proxy_a.support_vertex(axis_a));
                let point_b = xf_b.transform_point(self.proxy_b.support_vertex(axis_b));
                (point_b - point_a).dot(self.axis)
            }
            SeparationKind::FaceA => {
                let normal = xf_a.transform_vector(self.axis);
                let axis_b = xf_b.r.mul_transpose(-normal);
                let point_a = xf_a.transform_point(self.local_point);
                let point_b = xf_b.transform_point(self.proxy_b.support_vertex(axis_b));
                (point_b - point_a).dot(normal)
            }
            SeparationKind::FaceB => {
                let normal = xf_b.transform_vector(self.axis);
                let axis_a = xf_a.r.mul_transpose(-normal);
                let point_b = xf_b.transform_point(self.local_point);
                let point_a = xf_a.transform_point(self.proxy_a.support_vertex(axis_a));
                (point_a - point_b).dot(normal)
            }
        }
    }
}

/// Computes the fraction of the sweep at which the two shapes first come
/// within `tolerance` of touching.
///
/// Returns 1.0 when no impact happens during the sweep, and also when the
/// shapes already overlap at the start of the sweep. The search advances
/// conservatively along a separating axis rebuilt from GJK at each step,
/// using a root finder that alternates bisection and false position.
pub fn time_of_impact(input: &ToiInput<'_>) -> f32 {
    let sweep_a = &input.sweep_a;
    let sweep_b = &input.sweep_b;
    debug_assert!(sweep_a.t0 == sweep_b.t0);
    debug_assert!(1.0 - sweep_a.t0 > f32::EPSILON);

    let radius = input.proxy_a.radius + input.proxy_b.radius;
    let tolerance = input.tolerance;

    let mut alpha = 0.0f32;
    let mut target = 0.0f32;
    let mut cache = SimplexCache::default();

    let mut iter = 0;
    loop {
        let xf_a = sweep_a.transform_at(alpha);
        let xf_b = sweep_b.transform_at(alpha);

        // Distance between the core hulls, radii excluded
        let distance_input = DistanceInput {
            proxy_a: input.proxy_a,
            proxy_b: input.proxy_b,
            transform_a: xf_a,
            transform_b: xf_b,
            use_radii: false,
        };
        let output = distance(&mut cache, &distance_input);
        if output.distance <= 0.0 {
            // Cores overlap
            alpha = 1.0;
            break;
        }

        let fcn = SeparationFunction::new(&cache, input.proxy_a, &xf_a, input.proxy_b, &xf_b);
        let separation = fcn.evaluate(&xf_a, &xf_b);
        if separation <= 0.0 {
            alpha = 1.0;
            break;
        }

        if iter == 0 {
            // Aim for a clearance slightly inside the skins
            target = if separation > radius {
                (radius - tolerance).max(0.75 * radius)
            } else {
                (separation - tolerance).max(0.02 * radius)
            };
        }

        if separation - target < 0.5 * tolerance {
            if iter == 0 {
                // Already in contact at the start of the sweep
                alpha = 1.0;
            }
            break;
        }

        // Root find f(x) = target on [alpha, 1]
        let mut new_alpha = alpha;
        let mut x1 = alpha;
        let mut x2 = 1.0f32;
        let mut f1 = separation;
        let mut f2 = fcn.evaluate(&sweep_a.transform_at(x2), &sweep_b.transform_at(x2));

        // The shapes never get close enough
        if f2 >= target {
            alpha = 1.0;
            break;
        }

        for root_iter in 0..MAX_ROOT_ITERATIONS {
            let x = if root_iter & 1 == 1 {
                // False position
                x1 + (target - f1) * (x2 - x1) / (f2 - f1)
            } else {
                // Bisection
                0.5 * (x1 + x2)
            };

            let f = fcn.evaluate(&sweep_a.transform_at(x), &sweep_b.transform_at(x));
            if (f - target).abs() < 0.025 * tolerance {
                new_alpha = x;
                break;
            }

            // Keep the bracket
            if f > target {
                x1 = x;
                f1 = f;
            } else {
                x2 = x;
                f2 = f;
            }
        }

        // No progress
        if new_alpha < (1.0 + 100.0 * f32::EPSILON) * alpha {
            break;
        }
        alpha = new_alpha;

        iter += 1;
        if iter == MAX_ITERATIONS {
            break;
        }
    }

    alpha
}
