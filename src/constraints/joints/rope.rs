use crate::dynamics::{Body, BodyHandle, TimeStep};
use crate::math::utils::clamp;
use crate::math::Vec2;
use crate::settings::{LINEAR_SLOP, MAX_LINEAR_CORRECTION};

use super::{anchor_arm, apply_impulse, apply_position_impulse, LimitState};

/// Caps the distance between two anchors without resisting compression
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RopeJointDef {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,
    pub max_length: f32,
    pub collide_connected: bool,
}

impl RopeJointDef {
    pub fn new(body_a: BodyHandle, body_b: BodyHandle) -> Self {
        Self {
            body_a,
            body_b,
            local_anchor_a: Vec2::new(-1.0, 0.0),
            local_anchor_b: Vec2::new(1.0, 0.0),
            max_length: 0.0,
            collide_connected: false,
        }
    }

    /// Anchors given in world space, converted to each body's local frame
    pub fn initialize(
        body_a: BodyHandle,
        a: &Body,
        body_b: BodyHandle,
        b: &Body,
        anchor_a: Vec2,
        anchor_b: Vec2,
        max_length: f32,
    ) -> Self {
        Self {
            local_anchor_a: a.local_point(anchor_a),
            local_anchor_b: b.local_point(anchor_b),
            max_length,
            ..Self::new(body_a, body_b)
        }
    }

    pub fn with_anchors(mut self, local_anchor_a: Vec2, local_anchor_b: Vec2) -> Self {
        self.local_anchor_a = local_anchor_a;
        self.local_anchor_b = local_anchor_b;
        self
    }

    pub fn with_max_length(mut self, max_length: f32) -> Self {
        self.max_length = max_length;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RopeJoint {
    pub(crate) local_anchor_a: Vec2,
    pub(crate) local_anchor_b: Vec2,
    max_length: f32,
    length: f32,
    u: Vec2,
    r_a: Vec2,
    r_b: Vec2,
    mass: f32,
    impulse: f32,
    state: LimitState,
}

impl RopeJoint {
    pub(crate) fn new(def: &RopeJointDef) -> Self {
        Self {
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            max_length: def.max_length,
            length: 0.0,
            u: Vec2::ZERO,
            r_a: Vec2::ZERO,
            r_b: Vec2::ZERO,
            mass: 0.0,
            impulse: 0.0,
            state: LimitState::Inactive,
        }
    }

    #[inline]
    pub fn max_length(&self) -> f32 {
        self.max_length
    }

    #[inline]
    pub fn limit_state(&self) -> LimitState {
        self.state
    }

    pub fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        self.u * (inv_dt * self.impulse)
    }

    pub(crate) fn init_velocity_constraints(&mut self, step: &TimeStep, a: &mut Body, b: &mut Body) {
        self.r_a = anchor_arm(a, self.local_anchor_a);
        self.r_b = anchor_arm(b, self.local_anchor_b);

        // Rope axis
        self.u = b.sweep.c + self.r_b - a.sweep.c - self.r_a;
        self.length = self.u.length();

        let c = self.length - self.max_length;
        self.state = if c > 0.0 { LimitState::AtUpper } else { LimitState::Inactive };

        if self.length > LINEAR_SLOP {
            self.u *= 1.0 / self.length;
        } else {
            self.u = Vec2::ZERO;
            self.mass = 0.0;
            self.impulse = 0.0;
            return;
        }

        let cr_a = self.r_a.cross(self.u);
        let cr_b = self.r_b.cross(self.u);
        let inv_mass = a.inv_mass + a.inv_inertia * cr_a * cr_a + b.inv_mass + b.inv_inertia * cr_b * cr_b;
        self.mass = if inv_mass != 0.0 { 1.0 / inv_mass } else { 0.0 };

        if step.warm_starting {
            self.impulse *= step.dt_ratio;
            apply_impulse(a, self.r_a, b, self.r_b, self.u * self.impulse);
        } else {
            self.impulse = 0.0;
        }
    }

    pub(crate) fn solve_velocity_constraints(&mut self, step: &TimeStep, a: &mut Body, b: &mut Body) {
        let v_a = a.linear_velocity + Vec2::scalar_cross(a.angular_velocity, self.r_a);
        let v_b = b.linear_velocity + Vec2::scalar_cross(b.angular_velocity, self.r_b);

        let c = self.length - self.max_length;
        let mut cdot = self.u.dot(v_b - v_a);

        // Predictive constraint
        if c < 0.0 {
            cdot += step.inv_dt * c;
        }

        let impulse = -self.mass * cdot;
        let old_impulse = self.impulse;
        self.impulse = (old_impulse + impulse).min(0.0);
        let impulse = self.impulse - old_impulse;

        apply_impulse(a, self.r_a, b, self.r_b, self.u * impulse);
    }

    pub(crate) fn solve_position_constraints(&mut self, a: &mut Body, b: &mut Body) -> bool {
        let r_a = anchor_arm(a, self.local_anchor_a);
        let r_b = anchor_arm(b, self.local_anchor_b);

        let d = b.sweep.c + r_b - a.sweep.c - r_a;
        let (u, length) = d.normalize_with_length();
        let c = clamp(length - self.max_length, 0.0, MAX_LINEAR_CORRECTION);

        let impulse = -self.mass * c;
        self.u = u;
        apply_position_impulse(a, r_a, b, r_b, u * impulse);

        length - self.max_length < LINEAR_SLOP
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::BodyDef;
    use approx::assert_relative_eq;

    fn rope(b_x: f32) -> (Body, Body, RopeJoint) {
        let a = Body::new(&BodyDef::fixed());
        let b = Body::new(&BodyDef::dynamic().with_position(Vec2::new(b_x, 0.0)));
        let def = RopeJointDef::new(BodyHandle::new(0), BodyHandle::new(1))
            .with_anchors(Vec2::ZERO, Vec2::ZERO)
            .with_max_length(2.0);
        (a, b, RopeJoint::new(&def))
    }

    #[test]
    fn test_initialize_uses_local_anchors() {
        let a = Body::new(&BodyDef::fixed().with_position(Vec2::new(0.0, 10.0)));
        let b = Body::new(&BodyDef::dynamic().with_position(Vec2::new(3.0, 8.0)));
        let def = RopeJointDef::initialize(
            BodyHandle::new(0),
            &a,
            BodyHandle::new(1),
            &b,
            Vec2::new(0.0, 9.5),
            Vec2::new(3.0, 8.5),
            4.0,
        );
        assert_relative_eq!(def.local_anchor_a.y, -0.5);
        assert_relative_eq!(def.local_anchor_b.x, 0.0);
        assert_relative_eq!(def.local_anchor_b.y, 0.5);
        assert_relative_eq!(def.max_length, 4.0);
    }

    #[test]
    fn test_slack_rope_allows_approach() {
        let (mut a, mut b, mut joint) = rope(1.0);
        b.set_linear_velocity(Vec2::new(-3.0, 0.0));

        let step = TimeStep::new(1.0 / 60.0, 1.0, 8, 3, true);
        joint.init_velocity_constraints(&step, &mut a, &mut b);
        joint.solve_velocity_constraints(&step, &mut a, &mut b);
        assert_eq!(joint.limit_state(), LimitState::Inactive);
        assert_relative_eq!(b.linear_velocity().x, -3.0);
    }

    #[test]
    fn test_taut_rope_stops_separation() {
        let (mut a, mut b, mut joint) = rope(2.1);
        b.set_linear_velocity(Vec2::new(5.0, 0.0));

        let step = TimeStep::new(1.0 / 60.0, 1.0, 8, 3, true);
        joint.init_velocity_constraints(&step, &mut a, &mut b);
        assert_eq!(joint.limit_state(), LimitState::AtUpper);
        joint.solve_velocity_constraints(&step, &mut a, &mut b);
        assert!(b.linear_velocity().x <= 1e-5);
    }

    #[test]
    fn test_position_pulls_back_to_max_length() {
        let (mut a, mut b, mut joint) = rope(2.1);
        let step = TimeStep::new(1.0 / 60.0, 1.0, 8, 3, true);
        joint.init_velocity_constraints(&step, &mut a, &mut b);
        for _ in 0..3 {
            joint.solve_position_constraints(&mut a, &mut b);
        }
        assert_relative_eq!(b.position().x, 2.0, epsilon = LINEAR_SLOP);
    }
}
