use crate::collision::{Manifold, ManifoldType, WorldManifold};
use crate::dynamics::{Body, BodyHandle, ContactHandle};
use crate::math::{Mat22, Transform, Vec2};
use crate::settings::{MAX_CONDITION_NUMBER, MAX_MANIFOLD_POINTS, VELOCITY_THRESHOLD};

/// Solver state for one manifold point
#[derive(Debug, Clone, Copy, Default)]
pub struct ContactConstraintPoint {
    /// Manifold point in the incident shape's frame
    pub local_point: Vec2,
    /// Anchor relative to body A's center of mass
    pub r_a: Vec2,
    /// Anchor relative to body B's center of mass
    pub r_b: Vec2,
    /// Accumulated normal impulse
    pub normal_impulse: f32,
    /// Accumulated friction impulse
    pub tangent_impulse: f32,
    pub normal_mass: f32,
    pub tangent_mass: f32,
    /// Effective mass with unit mass ratios, for position correction
    pub equalized_mass: f32,
    /// Restitution target velocity
    pub velocity_bias: f32,
}

/// Velocity and position constraint built from a touching contact
#[derive(Debug, Clone, Copy)]
pub struct ContactConstraint {
    pub points: [ContactConstraintPoint; MAX_MANIFOLD_POINTS],
    pub local_plane_normal: Vec2,
    pub local_point: Vec2,
    /// World normal from A to B at initialization
    pub normal: Vec2,
    /// Inverse of `k` for the two-point block solver
    pub normal_mass: Mat22,
    pub k: Mat22,
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub contact: ContactHandle,
    pub manifold_type: ManifoldType,
    /// Sum of the two shape radii
    pub radius: f32,
    pub friction: f32,
    pub point_count: usize,
}

impl ContactConstraint {
    /// Builds the constraint from the contact manifold at the current body
    /// state. Two-point manifolds with an ill-conditioned block matrix are
    /// reduced to a single point.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        contact: ContactHandle,
        manifold: &Manifold,
        body_a_handle: BodyHandle,
        body_a: &Body,
        radius_a: f32,
        body_b_handle: BodyHandle,
        body_b: &Body,
        radius_b: f32,
        friction: f32,
        restitution: f32,
    ) -> Self {
        debug_assert!(manifold.point_count > 0);

        let mut world_manifold = WorldManifold::default();
        world_manifold.initialize(manifold, body_a.transform(), radius_a, body_b.transform(), radius_b);
        let normal = world_manifold.normal;
        let tangent = normal.cross_scalar(1.0);

        let (inv_mass_a, inv_i_a) = (body_a.inv_mass(), body_a.inv_inertia());
        let (inv_mass_b, inv_i_b) = (body_b.inv_mass(), body_b.inv_inertia());
        let (mass_a, mass_b) = (body_a.mass(), body_b.mass());
        let (v_a, w_a) = (body_a.linear_velocity(), body_a.angular_velocity());
        let (v_b, w_b) = (body_b.linear_velocity(), body_b.angular_velocity());

        let mut constraint = Self {
            points: [ContactConstraintPoint::default(); MAX_MANIFOLD_POINTS],
            local_plane_normal: manifold.local_plane_normal,
            local_point: manifold.local_point,
            normal,
            normal_mass: Mat22::ZERO,
            k: Mat22::ZERO,
            body_a: body_a_handle,
            body_b: body_b_handle,
            contact,
            manifold_type: manifold.manifold_type,
            radius: radius_a + radius_b,
            friction,
            point_count: manifold.point_count,
        };

        for (i, mp) in manifold.points().iter().enumerate() {
            let cp = &mut constraint.points[i];
            cp.normal_impulse = mp.normal_impulse;
            cp.tangent_impulse = mp.tangent_impulse;
            cp.local_point = mp.local_point;

            cp.r_a = world_manifold.points[i] - body_a.world_center();
            cp.r_b = world_manifold.points[i] - body_b.world_center();

            let rn_a = cp.r_a.cross(normal);
            let rn_b = cp.r_b.cross(normal);
            let rn_a = rn_a * rn_a;
            let rn_b = rn_b * rn_b;

            let k_normal = inv_mass_a + inv_mass_b + inv_i_a * rn_a + inv_i_b * rn_b;
            debug_assert!(k_normal > f32::EPSILON);
            cp.normal_mass = 1.0 / k_normal;

            let k_equalized = mass_a * inv_mass_a
                + mass_b * inv_mass_b
                + mass_a * inv_i_a * rn_a
                + mass_b * inv_i_b * rn_b;
            debug_assert!(k_equalized > f32::EPSILON);
            cp.equalized_mass = 1.0 / k_equalized;

            let rt_a = cp.r_a.cross(tangent);
            let rt_b = cp.r_b.cross(tangent);
            let k_tangent =
                inv_mass_a + inv_mass_b + inv_i_a * rt_a * rt_a + inv_i_b * rt_b * rt_b;
            debug_assert!(k_tangent > f32::EPSILON);
            cp.tangent_mass = 1.0 / k_tangent;

            // Restitution only above the threshold approach speed
            cp.velocity_bias = 0.0;
            let dv = v_b + Vec2::scalar_cross(w_b, cp.r_b) - v_a - Vec2::scalar_cross(w_a, cp.r_a);
            let v_rel = normal.dot(dv);
            if v_rel < -VELOCITY_THRESHOLD {
                cp.velocity_bias = -restitution * v_rel;
            }
        }

        // Prepare the block solver
        if constraint.point_count == 2 {
            let cp1 = &constraint.points[0];
            let cp2 = &constraint.points[1];

            let rn1_a = cp1.r_a.cross(normal);
            let rn1_b = cp1.r_b.cross(normal);
            let rn2_a = cp2.r_a.cross(normal);
            let rn2_b = cp2.r_b.cross(normal);

            let k11 = inv_mass_a + inv_mass_b + inv_i_a * rn1_a * rn1_a + inv_i_b * rn1_b * rn1_b;
            let k22 = inv_mass_a + inv_mass_b + inv_i_a * rn2_a * rn2_a + inv_i_b * rn2_b * rn2_b;
            let k12 = inv_mass_a + inv_mass_b + inv_i_a * rn1_a * rn2_a + inv_i_b * rn1_b * rn2_b;

            if k11 * k11 < MAX_CONDITION_NUMBER * (k11 * k22 - k12 * k12) {
                constraint.k = Mat22::from_cols(Vec2::new(k11, k12), Vec2::new(k12, k22));
                constraint.normal_mass = constraint.k.inverse();
            } else {
                // Redundant points, keep one
                constraint.point_count = 1;
            }
        }

        constraint
    }

    #[inline]
    pub fn points(&self) -> &[ContactConstraintPoint] {
        &self.points[..self.point_count]
    }
}

/// Contact geometry re-evaluated at the current positions, used by the
/// position solver.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionSolverManifold {
    /// World normal from A to B
    pub normal: Vec2,
    pub points: [Vec2; MAX_MANIFOLD_POINTS],
    /// Signed distances, negative when penetrating
    pub separations: [f32; MAX_MANIFOLD_POINTS],
}

impl PositionSolverManifold {
    pub fn new(constraint: &ContactConstraint, xf_a: &Transform, xf_b: &Transform) -> Self {
        debug_assert!(constraint.point_count > 0);
        let mut psm = Self::default();

        match constraint.manifold_type {
            ManifoldType::Circles => {
                let point_a = xf_a.transform_point(constraint.local_point);
                let point_b = xf_b.transform_point(constraint.points[0].local_point);
                psm.normal = Vec2::X;
                if point_a.distance_squared(point_b) > f32::EPSILON * f32::EPSILON {
                    psm.normal = (point_b - point_a).normalize();
                }
                psm.points[0] = (point_a + point_b) * 0.5;
                psm.separations[0] = (point_b - point_a).dot(psm.normal) - constraint.radius;
            }
            ManifoldType::FaceA => {
                psm.normal = xf_a.transform_vector(constraint.local_plane_normal);
                let plane_point = xf_a.transform_point(constraint.local_point);
                for i in 0..constraint.point_count {
                    let clip_point = xf_b.transform_point(constraint.points[i].local_point);
                    psm.separations[i] = (clip_point - plane_point).dot(psm.normal) - constraint.radius;
                    psm.points[i] = clip_point;
                }
            }
            ManifoldType::FaceB => {
                let normal = xf_b.transform_vector(constraint.local_plane_normal);
                let plane_point = xf_b.transform_point(constraint.local_point);
                for i in 0..constraint.point_count {
                    let clip_point = xf_a.transform_point(constraint.points[i].local_point);
                    psm.separations[i] = (clip_point - plane_point).dot(normal) - constraint.radius;
                    psm.points[i] = clip_point;
                }
                // Keep the normal pointing from A to B
                psm.normal = -normal;
            }
        }

        psm
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::{collide_polygons, ManifoldPoint};
    use crate::dynamics::BodyDef;
    use crate::geometry::PolygonShape;
    use approx::assert_relative_eq;

    #[test]
    fn test_resting_box_constraint() {
        let ground = PolygonShape::new_box(5.0, 0.5);
        let block = PolygonShape::new_box(0.5, 0.5);
        let body_a = Body::new(&BodyDef::fixed());
        let mut body_b = Body::new(&BodyDef::dynamic().with_position(Vec2::new(0.0, 0.99)));
        body_b.set_linear_velocity(Vec2::new(0.0, -3.0));

        let manifold = collide_polygons(&ground, body_a.transform(), &block, body_b.transform());
        assert_eq!(manifold.point_count, 2);

        let c = ContactConstraint::new(
            ContactHandle::new(0),
            &manifold,
            BodyHandle::new(0),
            &body_a,
            ground.radius,
            BodyHandle::new(1),
            &body_b,
            block.radius,
            0.5,
            0.5,
        );
        assert_relative_eq!(c.normal.y, 1.0, epsilon = 1e-5);
        // Approach speed above the threshold produces a bounce target
        assert_relative_eq!(c.points[0].velocity_bias, 1.5, epsilon = 1e-4);
        assert!(c.points[0].normal_mass > 0.0);
        assert_relative_eq!(c.points[0].equalized_mass, 1.0 / (1.0 + body_b.inv_inertia() * c.points[0].r_b.x.powi(2)), epsilon = 1e-5);
    }

    #[test]
    fn test_position_manifold_circles() {
        let mut manifold = Manifold::default();
        manifold.point_count = 1;
        manifold.points[0] = ManifoldPoint::default();
        let body_a = Body::new(&BodyDef::dynamic());
        let body_b = Body::new(&BodyDef::dynamic().with_position(Vec2::new(1.5, 0.0)));
        let c = ContactConstraint::new(
            ContactHandle::new(0),
            &manifold,
            BodyHandle::new(0),
            &body_a,
            1.0,
            BodyHandle::new(1),
            &body_b,
            1.0,
            0.2,
            0.0,
        );
        let psm = PositionSolverManifold::new(&c, body_a.transform(), body_b.transform());
        assert_relative_eq!(psm.normal.x, 1.0);
        assert_relative_eq!(psm.separations[0], -0.5);
        assert_relative_eq!(psm.points[0].x, 0.75);
    }
}
