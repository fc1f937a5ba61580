use crate::constraints::{ContactConstraint, PositionSolverManifold};
use crate::dynamics::contacts::Contact;
use crate::dynamics::{Arena, Body, BodyHandle, ContactHandle, ContactImpulse, Fixture, FixtureHandle, TimeStep};
use crate::math::utils::clamp;
use crate::math::{Mat22, Vec2};
use crate::settings::{LINEAR_SLOP, MAX_LINEAR_CORRECTION};

/// Sequential impulse solver for the contacts of one island
#[derive(Debug, Default)]
pub struct ContactSolver {
    constraints: Vec<ContactConstraint>,
}

impl ContactSolver {
    /// Builds one constraint per contact. Every contact must be touching,
    /// so its manifold has at least one point.
    pub(crate) fn new(
        contacts: &[ContactHandle],
        contact_arena: &Arena<ContactHandle, Contact>,
        fixtures: &Arena<FixtureHandle, Fixture>,
        bodies: &Arena<BodyHandle, Body>,
    ) -> Self {
        let constraints = contacts
            .iter()
            .map(|&handle| {
                let contact = &contact_arena[handle];
                let fixture_a = &fixtures[contact.fixture_a];
                let fixture_b = &fixtures[contact.fixture_b];
                ContactConstraint::new(
                    handle,
                    &contact.manifold,
                    contact.body_a,
                    &bodies[contact.body_a],
                    fixture_a.shape.radius(),
                    contact.body_b,
                    &bodies[contact.body_b],
                    fixture_b.shape.radius(),
                    contact.friction(fixtures),
                    contact.restitution(fixtures),
                )
            })
            .collect();

        Self { constraints }
    }

    #[inline]
    pub fn constraints(&self) -> &[ContactConstraint] {
        &self.constraints
    }

    /// Applies the previous step's impulses scaled by the step ratio, or
    /// clears them when warm starting is off.
    pub fn init_velocity_constraints(&mut self, step: &TimeStep, bodies: &mut Arena<BodyHandle, Body>) {
        for c in &mut self.constraints {
            let count = c.point_count;
            if !step.warm_starting {
                for cp in &mut c.points[..count] {
                    cp.normal_impulse = 0.0;
                    cp.tangent_impulse = 0.0;
                }
                continue;
            }

            let (body_a, body_b) = bodies.pair_mut(c.body_a, c.body_b);
            let normal = c.normal;
            let tangent = normal.cross_scalar(1.0);

            for cp in &mut c.points[..count] {
                cp.normal_impulse *= step.dt_ratio;
                cp.tangent_impulse *= step.dt_ratio;

                let p = normal * cp.normal_impulse + tangent * cp.tangent_impulse;
                body_a.angular_velocity -= body_a.inv_inertia * cp.r_a.cross(p);
                body_a.linear_velocity -= p * body_a.inv_mass;
                body_b.angular_velocity += body_b.inv_inertia * cp.r_b.cross(p);
                body_b.linear_velocity += p * body_b.inv_mass;
            }
        }
    }

    /// One Gauss-Seidel pass: friction first, then the normal impulses.
    pub fn solve_velocity_constraints(&mut self, bodies: &mut Arena<BodyHandle, Body>) {
        for c in &mut self.constraints {
            let (body_a, body_b) = bodies.pair_mut(c.body_a, c.body_b);

            let mut w_a = body_a.angular_velocity;
            let mut w_b = body_b.angular_velocity;
            let mut v_a = body_a.linear_velocity;
            let mut v_b = body_b.linear_velocity;
            let (inv_mass_a, inv_i_a) = (body_a.inv_mass, body_a.inv_inertia);
            let (inv_mass_b, inv_i_b) = (body_b.inv_mass, body_b.inv_inertia);

            let normal = c.normal;
            let tangent = normal.cross_scalar(1.0);
            let friction = c.friction;
            let count = c.point_count;

            debug_assert!(count == 1 || count == 2);

            // Friction, bounded by the current normal impulse
            for cp in &mut c.points[..count] {
                let dv = v_b + Vec2::scalar_cross(w_b, cp.r_b) - v_a - Vec2::scalar_cross(w_a, cp.r_a);
                let vt = dv.dot(tangent);
                let lambda = cp.tangent_mass * -vt;

                let max_friction = friction * cp.normal_impulse;
                let new_impulse = clamp(cp.tangent_impulse + lambda, -max_friction, max_friction);
                let lambda = new_impulse - cp.tangent_impulse;

                let p = tangent * lambda;
                v_a -= p * inv_mass_a;
                w_a -= inv_i_a * cp.r_a.cross(p);
                v_b += p * inv_mass_b;
                w_b += inv_i_b * cp.r_b.cross(p);

                cp.tangent_impulse = new_impulse;
            }

            if count == 1 {
                let cp = &mut c.points[0];
                let dv = v_b + Vec2::scalar_cross(w_b, cp.r_b) - v_a - Vec2::scalar_cross(w_a, cp.r_a);
                let vn = dv.dot(normal);
                let lambda = -cp.normal_mass * (vn - cp.velocity_bias);

                let new_impulse = (cp.normal_impulse + lambda).max(0.0);
                let lambda = new_impulse - cp.normal_impulse;

                let p = normal * lambda;
                v_a -= p * inv_mass_a;
                w_a -= inv_i_a * cp.r_a.cross(p);
                v_b += p * inv_mass_b;
                w_b += inv_i_b * cp.r_b.cross(p);

                cp.normal_impulse = new_impulse;
            } else {
                // Block solver: find x solving the LCP
                //   vn = K x + b, vn >= 0, x >= 0, vn_i x_i = 0
                // with b the velocity error less the current impulses.
                let [cp1, cp2] = &mut c.points;
                let a = Vec2::new(cp1.normal_impulse, cp2.normal_impulse);
                debug_assert!(a.x >= 0.0 && a.y >= 0.0);

                let dv1 = v_b + Vec2::scalar_cross(w_b, cp1.r_b) - v_a - Vec2::scalar_cross(w_a, cp1.r_a);
                let dv2 = v_b + Vec2::scalar_cross(w_b, cp2.r_b) - v_a - Vec2::scalar_cross(w_a, cp2.r_a);
                let vn1 = dv1.dot(normal);
                let vn2 = dv2.dot(normal);

                let b = Vec2::new(vn1 - cp1.velocity_bias, vn2 - cp2.velocity_bias) - c.k * a;

                let solution = solve_block(&c.k, &c.normal_mass, cp1.normal_mass, cp2.normal_mass, b);
                if let Some(x) = solution {
                    let d = x - a;
                    let p1 = normal * d.x;
                    let p2 = normal * d.y;
                    v_a -= (p1 + p2) * inv_mass_a;
                    w_a -= inv_i_a * (cp1.r_a.cross(p1) + cp2.r_a.cross(p2));
                    v_b += (p1 + p2) * inv_mass_b;
                    w_b += inv_i_b * (cp1.r_b.cross(p1) + cp2.r_b.cross(p2));

                    cp1.normal_impulse = x.x;
                    cp2.normal_impulse = x.y;
                }
            }

            body_a.linear_velocity = v_a;
            body_a.angular_velocity = w_a;
            body_b.linear_velocity = v_b;
            body_b.angular_velocity = w_b;
        }
    }

    /// Writes the accumulated impulses back to the contact manifolds for
    /// warm starting the next step.
    pub(crate) fn store_impulses(&self, contacts: &mut Arena<ContactHandle, Contact>) {
        for c in &self.constraints {
            let manifold = &mut contacts[c.contact].manifold;
            for (mp, cp) in manifold.points.iter_mut().zip(c.points()) {
                mp.normal_impulse = cp.normal_impulse;
                mp.tangent_impulse = cp.tangent_impulse;
            }
        }
    }

    /// Pushes overlapping bodies apart along the re-evaluated contact
    /// normal. Returns true once the worst penetration is within tolerance.
    pub fn solve_position_constraints(&self, bodies: &mut Arena<BodyHandle, Body>, baumgarte: f32) -> bool {
        let mut min_separation = 0.0_f32;

        for c in &self.constraints {
            let (body_a, body_b) = bodies.pair_mut(c.body_a, c.body_b);

            // Mass-weighted so static bodies do not move
            let inv_mass_a = body_a.mass * body_a.inv_mass;
            let inv_i_a = body_a.mass * body_a.inv_inertia;
            let inv_mass_b = body_b.mass * body_b.inv_mass;
            let inv_i_b = body_b.mass * body_b.inv_inertia;

            let psm = PositionSolverManifold::new(c, &body_a.xf, &body_b.xf);
            let normal = psm.normal;

            for (j, cp) in c.points().iter().enumerate() {
                let point = psm.points[j];
                let separation = psm.separations[j];

                let r_a = point - body_a.sweep.c;
                let r_b = point - body_b.sweep.c;

                min_separation = min_separation.min(separation);

                // Prevent large corrections and allow slop
                let correction = clamp(baumgarte * (separation + LINEAR_SLOP), -MAX_LINEAR_CORRECTION, 0.0);
                let impulse = -cp.equalized_mass * correction;
                let p = normal * impulse;

                body_a.sweep.c -= p * inv_mass_a;
                body_a.sweep.a -= inv_i_a * r_a.cross(p);
                body_a.synchronize_transform();

                body_b.sweep.c += p * inv_mass_b;
                body_b.sweep.a += inv_i_b * r_b.cross(p);
                body_b.synchronize_transform();
            }
        }

        // The solver cannot drive the separation past -LINEAR_SLOP
        min_separation >= -1.5 * LINEAR_SLOP
    }

    /// Solver impulses for the constraint at `index`, for post-solve
    /// reporting
    pub fn impulse(&self, index: usize) -> ContactImpulse {
        let c = &self.constraints[index];
        let mut impulse = ContactImpulse {
            count: c.point_count,
            ..ContactImpulse::default()
        };
        for (j, cp) in c.points().iter().enumerate() {
            impulse.normal_impulses[j] = cp.normal_impulse;
            impulse.tangent_impulses[j] = cp.tangent_impulse;
        }
        impulse
    }
}

/// Total enumeration of the two-point LCP, in order: both points active,
/// only the first, only the second, neither. Returns `None` when no case
/// is consistent, leaving the impulses unchanged.
fn solve_block(k: &Mat22, normal_mass: &Mat22, mass1: f32, mass2: f32, b: Vec2) -> Option<Vec2> {
    // Case 1: vn = 0 at both points
    let x = -(*normal_mass * b);
    if x.x >= 0.0 && x.y >= 0.0 {
        return Some(x);
    }

    // Case 2: vn1 = 0, x2 = 0
    let x = Vec2::new(-mass1 * b.x, 0.0);
    let vn2 = k.col1.y * x.x + b.y;
    if x.x >= 0.0 && vn2 >= 0.0 {
        return Some(x);
    }

    // Case 3: x1 = 0, vn2 = 0
    let x = Vec2::new(0.0, -mass2 * b.y);
    let vn1 = k.col2.x * x.y + b.x;
    if x.y >= 0.0 && vn1 >= 0.0 {
        return Some(x);
    }

    // Case 4: x = 0
    if b.x >= 0.0 && b.y >= 0.0 {
        return Some(Vec2::ZERO);
    }

    None
}
