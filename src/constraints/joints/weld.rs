use crate::dynamics::{Body, BodyHandle, TimeStep};
use crate::math::{Mat33, Vec2, Vec3};
use crate::settings::{ANGULAR_SLOP, LINEAR_SLOP};

use super::anchor_arm;

/// Glues two bodies together at an anchor, removing all relative motion
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WeldJointDef {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,
    pub reference_angle: f32,
    pub collide_connected: bool,
}

impl WeldJointDef {
    pub fn new(body_a: BodyHandle, body_b: BodyHandle) -> Self {
        Self {
            body_a,
            body_b,
            local_anchor_a: Vec2::ZERO,
            local_anchor_b: Vec2::ZERO,
            reference_angle: 0.0,
            collide_connected: false,
        }
    }

    pub fn initialize(body_a: BodyHandle, a: &Body, body_b: BodyHandle, b: &Body, anchor: Vec2) -> Self {
        Self {
            local_anchor_a: a.local_point(anchor),
            local_anchor_b: b.local_point(anchor),
            reference_angle: b.angle() - a.angle(),
            ..Self::new(body_a, body_b)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeldJoint {
    pub(crate) local_anchor_a: Vec2,
    pub(crate) local_anchor_b: Vec2,
    reference_angle: f32,
    impulse: Vec3,
    mass: Mat33,
}

impl WeldJoint {
    pub(crate) fn new(def: &WeldJointDef) -> Self {
        Self {
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            reference_angle: def.reference_angle,
            impulse: Vec3::ZERO,
            mass: Mat33::ZERO,
        }
    }

    pub fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        self.impulse.xy() * inv_dt
    }

    pub fn reaction_torque(&self, inv_dt: f32) -> f32 {
        inv_dt * self.impulse.z
    }

    pub(crate) fn init_velocity_constraints(&mut self, step: &TimeStep, a: &mut Body, b: &mut Body) {
        let r_a = anchor_arm(a, self.local_anchor_a);
        let r_b = anchor_arm(b, self.local_anchor_b);
        self.mass = point_angle_mass(a, r_a, b, r_b);

        if step.warm_starting {
            self.impulse = self.impulse * step.dt_ratio;
            let p = self.impulse.xy();
            a.linear_velocity -= p * a.inv_mass;
            a.angular_velocity -= a.inv_inertia * (r_a.cross(p) + self.impulse.z);
            b.linear_velocity += p * b.inv_mass;
            b.angular_velocity += b.inv_inertia * (r_b.cross(p) + self.impulse.z);
        } else {
            self.impulse = Vec3::ZERO;
        }
    }

    pub(crate) fn solve_velocity_constraints(&mut self, a: &mut Body, b: &mut Body) {
        let r_a = anchor_arm(a, self.local_anchor_a);
        let r_b = anchor_arm(b, self.local_anchor_b);

        let cdot1 = b.linear_velocity + Vec2::scalar_cross(b.angular_velocity, r_b)
            - a.linear_velocity
            - Vec2::scalar_cross(a.angular_velocity, r_a);
        let cdot2 = b.angular_velocity - a.angular_velocity;
        let cdot = Vec3::from_vec2(cdot1, cdot2);

        let impulse = self.mass.solve33(-cdot);
        self.impulse += impulse;

        let p = impulse.xy();
        a.linear_velocity -= p * a.inv_mass;
        a.angular_velocity -= a.inv_inertia * (r_a.cross(p) + impulse.z);
        b.linear_velocity += p * b.inv_mass;
        b.angular_velocity += b.inv_inertia * (r_b.cross(p) + impulse.z);
    }

    pub(crate) fn solve_position_constraints(&mut self, a: &mut Body, b: &mut Body) -> bool {
        let r_a = anchor_arm(a, self.local_anchor_a);
        let r_b = anchor_arm(b, self.local_anchor_b);

        let c1 = b.sweep.c + r_b - a.sweep.c - r_a;
        let c2 = b.sweep.a - a.sweep.a - self.reference_angle;

        let position_error = c1.length();
        let angular_error = c2.abs();
        let (m_a, m_b) = (a.inv_mass, b.inv_mass);

        self.mass = point_angle_mass(a, r_a, b, r_b);
        let impulse = self.mass.solve33(-Vec3::from_vec2(c1, c2));

        let p = impulse.xy();
        a.sweep.c -= p * m_a;
        a.sweep.a -= a.inv_inertia * (r_a.cross(p) + impulse.z);
        b.sweep.c += p * m_b;
        b.sweep.a += b.inv_inertia * (r_b.cross(p) + impulse.z);

        a.synchronize_transform();
        b.synchronize_transform();

        position_error <= LINEAR_SLOP && angular_error <= ANGULAR_SLOP
    }
}

/// Effective mass for two point rows plus one angle row
fn point_angle_mass(a: &Body, r_a: Vec2, b: &Body, r_b: Vec2) -> Mat33 {
    let (m_a, i_a) = (a.inv_mass, a.inv_inertia);
    let (m_b, i_b) = (b.inv_mass, b.inv_inertia);

    let col1 = Vec3::new(
        m_a + m_b + r_a.y * r_a.y * i_a + r_b.y * r_b.y * i_b,
        -r_a.y * r_a.x * i_a - r_b.y * r_b.x * i_b,
        -r_a.y * i_a - r_b.y * i_b,
    );
    let col2 = Vec3::new(col1.y, m_a + m_b + r_a.x * r_a.x * i_a + r_b.x * r_b.x * i_b, r_a.x * i_a + r_b.x * i_b);
    let col3 = Vec3::new(col1.z, col2.z, i_a + i_b);
    Mat33::from_cols(col1, col2, col3)
}
