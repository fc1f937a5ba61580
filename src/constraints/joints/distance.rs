use crate::dynamics::{Body, BodyHandle, TimeStep};
use crate::math::consts::PI;
use crate::math::utils::clamp;
use crate::math::Vec2;
use crate::settings::{LINEAR_SLOP, MAX_LINEAR_CORRECTION};

use super::{anchor_arm, apply_impulse, apply_position_impulse};

/// Keeps two anchor points at a fixed distance, optionally as a soft spring
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DistanceJointDef {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,
    /// Rest length
    pub length: f32,
    /// Spring frequency in Hz, zero for a rigid rod
    pub frequency_hz: f32,
    /// 0 is undamped, 1 is critical damping
    pub damping_ratio: f32,
    pub collide_connected: bool,
}

impl DistanceJointDef {
    pub fn new(body_a: BodyHandle, body_b: BodyHandle) -> Self {
        Self {
            body_a,
            body_b,
            local_anchor_a: Vec2::ZERO,
            local_anchor_b: Vec2::ZERO,
            length: 1.0,
            frequency_hz: 0.0,
            damping_ratio: 0.0,
            collide_connected: false,
        }
    }

    /// Uses world anchors and sets the rest length to their current distance
    pub fn initialize(
        body_a: BodyHandle,
        a: &Body,
        body_b: BodyHandle,
        b: &Body,
        anchor_a: Vec2,
        anchor_b: Vec2,
    ) -> Self {
        Self {
            local_anchor_a: a.local_point(anchor_a),
            local_anchor_b: b.local_point(anchor_b),
            length: anchor_a.distance(anchor_b),
            ..Self::new(body_a, body_b)
        }
    }

    pub fn with_spring(mut self, frequency_hz: f32, damping_ratio: f32) -> Self {
        self.frequency_hz = frequency_hz;
        self.damping_ratio = damping_ratio;
        self
    }

    pub fn with_collide_connected(mut self, flag: bool) -> Self {
        self.collide_connected = flag;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DistanceJoint {
    pub(crate) local_anchor_a: Vec2,
    pub(crate) local_anchor_b: Vec2,
    length: f32,
    frequency_hz: f32,
    damping_ratio: f32,
    u: Vec2,
    impulse: f32,
    gamma: f32,
    bias: f32,
    mass: f32,
}

impl DistanceJoint {
    pub(crate) fn new(def: &DistanceJointDef) -> Self {
        Self {
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            length: def.length,
            frequency_hz: def.frequency_hz,
            damping_ratio: def.damping_ratio,
            u: Vec2::ZERO,
            impulse: 0.0,
            gamma: 0.0,
            bias: 0.0,
            mass: 0.0,
        }
    }

    #[inline]
    pub fn length(&self) -> f32 {
        self.length
    }

    pub fn set_length(&mut self, length: f32) {
        self.length = length;
    }

    #[inline]
    pub fn frequency(&self) -> f32 {
        self.frequency_hz
    }

    pub fn set_frequency(&mut self, hz: f32) {
        self.frequency_hz = hz;
    }

    #[inline]
    pub fn damping_ratio(&self) -> f32 {
        self.damping_ratio
    }

    pub fn set_damping_ratio(&mut self, ratio: f32) {
        self.damping_ratio = ratio;
    }

    pub fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        self.u * (inv_dt * self.impulse)
    }

    pub(crate) fn init_velocity_constraints(&mut self, step: &TimeStep, a: &mut Body, b: &mut Body) {
        let r1 = anchor_arm(a, self.local_anchor_a);
        let r2 = anchor_arm(b, self.local_anchor_b);
        self.u = b.sweep.c + r2 - a.sweep.c - r1;

        // Handle singularity
        let length = self.u.length();
        if length > LINEAR_SLOP {
            self.u *= 1.0 / length;
        } else {
            self.u = Vec2::ZERO;
        }

        let cr1u = r1.cross(self.u);
        let cr2u = r2.cross(self.u);
        let inv_mass = a.inv_mass + a.inv_inertia * cr1u * cr1u + b.inv_mass + b.inv_inertia * cr2u * cr2u;
        self.mass = if inv_mass != 0.0 { 1.0 / inv_mass } else { 0.0 };

        if self.frequency_hz > 0.0 {
            let c = length - self.length;
            let omega = 2.0 * PI * self.frequency_hz;
            // Damping coefficient and spring stiffness
            let d = 2.0 * self.mass * self.damping_ratio * omega;
            let k = self.mass * omega * omega;

            self.gamma = step.dt * (d + step.dt * k);
            self.gamma = if self.gamma != 0.0 { 1.0 / self.gamma } else { 0.0 };
            self.bias = c * step.dt * k * self.gamma;

            let soft = inv_mass + self.gamma;
            self.mass = if soft != 0.0 { 1.0 / soft } else { 0.0 };
        }

        if step.warm_starting {
            self.impulse *= step.dt_ratio;
            apply_impulse(a, r1, b, r2, self.u * self.impulse);
        } else {
            self.impulse = 0.0;
        }
    }

    pub(crate) fn solve_velocity_constraints(&mut self, a: &mut Body, b: &mut Body) {
        let r1 = anchor_arm(a, self.local_anchor_a);
        let r2 = anchor_arm(b, self.local_anchor_b);

        let v1 = a.linear_velocity + Vec2::scalar_cross(a.angular_velocity, r1);
        let v2 = b.linear_velocity + Vec2::scalar_cross(b.angular_velocity, r2);
        let cdot = self.u.dot(v2 - v1);

        let impulse = -self.mass * (cdot + self.bias + self.gamma * self.impulse);
        self.impulse += impulse;

        apply_impulse(a, r1, b, r2, self.u * impulse);
    }

    pub(crate) fn solve_position_constraints(&mut self, a: &mut Body, b: &mut Body) -> bool {
        // Springs are not position corrected
        if self.frequency_hz > 0.0 {
            return true;
        }

        let r1 = anchor_arm(a, self.local_anchor_a);
        let r2 = anchor_arm(b, self.local_anchor_b);
        let d = b.sweep.c + r2 - a.sweep.c - r1;

        let (u, length) = d.normalize_with_length();
        let c = clamp(length - self.length, -MAX_LINEAR_CORRECTION, MAX_LINEAR_CORRECTION);

        let impulse = -self.mass * c;
        self.u = u;
        apply_position_impulse(a, r1, b, r2, u * impulse);

        c.abs() < LINEAR_SLOP
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::BodyDef;
    use approx::assert_relative_eq;

    #[test]
    fn test_initialize_sets_length() {
        let a = Body::new(&BodyDef::fixed());
        let b = Body::new(&BodyDef::dynamic().with_position(Vec2::new(3.0, 4.0)));
        let def = DistanceJointDef::initialize(
            BodyHandle::new(0),
            &a,
            BodyHandle::new(1),
            &b,
            Vec2::ZERO,
            Vec2::new(3.0, 4.0),
        );
        assert_relative_eq!(def.length, 5.0);
        assert_eq!(def.local_anchor_b, Vec2::ZERO);
    }

    #[test]
    fn test_position_correction_pulls_to_length() {
        let mut a = Body::new(&BodyDef::fixed());
        let mut b = Body::new(&BodyDef::dynamic().with_position(Vec2::new(1.1, 0.0)));
        let mut joint = DistanceJoint::new(&DistanceJointDef::new(BodyHandle::new(0), BodyHandle::new(1)));
        let step = TimeStep::new(1.0 / 60.0, 1.0, 8, 3, true);
        joint.init_velocity_constraints(&step, &mut a, &mut b);

        for _ in 0..10 {
            if joint.solve_position_constraints(&mut a, &mut b) {
                break;
            }
        }
        assert_relative_eq!(b.position().x, 1.0, epsilon = LINEAR_SLOP);
    }
}
