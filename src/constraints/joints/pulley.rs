use crate::dynamics::{Body, BodyHandle, TimeStep};
use crate::error::{PhysicsError, Result};
use crate::math::utils::clamp;
use crate::math::Vec2;
use crate::settings::{LINEAR_SLOP, MAX_LINEAR_CORRECTION, MIN_PULLEY_LENGTH};

use super::{anchor_arm, LimitState};

/// Two bodies hung from fixed world points by one rope:
/// `length_a + ratio * length_b == constant`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PulleyJointDef {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    /// World point the rope from body A passes over
    pub ground_anchor_a: Vec2,
    /// World point the rope from body B passes over
    pub ground_anchor_b: Vec2,
    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,
    pub length_a: f32,
    pub max_length_a: f32,
    pub length_b: f32,
    pub max_length_b: f32,
    /// Block-and-tackle ratio, must be positive
    pub ratio: f32,
    pub collide_connected: bool,
}

impl PulleyJointDef {
    pub fn new(body_a: BodyHandle, body_b: BodyHandle) -> Self {
        Self {
            body_a,
            body_b,
            ground_anchor_a: Vec2::new(-1.0, 1.0),
            ground_anchor_b: Vec2::new(1.0, 1.0),
            local_anchor_a: Vec2::new(-1.0, 0.0),
            local_anchor_b: Vec2::new(1.0, 0.0),
            length_a: 0.0,
            max_length_a: 0.0,
            length_b: 0.0,
            max_length_b: 0.0,
            ratio: 1.0,
            collide_connected: true,
        }
    }

    /// Derives rope lengths and their caps from world anchors in the current pose
    #[allow(clippy::too_many_arguments)]
    pub fn initialize(
        body_a: BodyHandle,
        a: &Body,
        body_b: BodyHandle,
        b: &Body,
        ground_anchor_a: Vec2,
        ground_anchor_b: Vec2,
        anchor_a: Vec2,
        anchor_b: Vec2,
        ratio: f32,
    ) -> Self {
        let length_a = anchor_a.distance(ground_anchor_a);
        let length_b = anchor_b.distance(ground_anchor_b);
        let constant = length_a + ratio * length_b;
        Self {
            ground_anchor_a,
            ground_anchor_b,
            local_anchor_a: a.local_point(anchor_a),
            local_anchor_b: b.local_point(anchor_b),
            length_a,
            max_length_a: constant - ratio * MIN_PULLEY_LENGTH,
            length_b,
            max_length_b: if ratio > 0.0 { (constant - MIN_PULLEY_LENGTH) / ratio } else { 0.0 },
            ratio,
            ..Self::new(body_a, body_b)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PulleyJoint {
    pub(crate) local_anchor_a: Vec2,
    pub(crate) local_anchor_b: Vec2,
    ground_anchor_a: Vec2,
    ground_anchor_b: Vec2,

    u_a: Vec2,
    u_b: Vec2,
    constant: f32,
    ratio: f32,
    max_length_a: f32,
    max_length_b: f32,

    // Effective masses
    pulley_mass: f32,
    limit_mass_a: f32,
    limit_mass_b: f32,

    // Accumulated impulses
    impulse: f32,
    limit_impulse_a: f32,
    limit_impulse_b: f32,

    state: LimitState,
    limit_state_a: LimitState,
    limit_state_b: LimitState,
}

impl PulleyJoint {
    pub(crate) fn new(def: &PulleyJointDef) -> Result<Self> {
        if def.ratio.is_nan() || def.ratio <= 0.0 {
            return Err(PhysicsError::InvalidJointDef("pulley ratio must be positive"));
        }
        let ratio = def.ratio;
        let constant = def.length_a + ratio * def.length_b;

        Ok(Self {
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            ground_anchor_a: def.ground_anchor_a,
            ground_anchor_b: def.ground_anchor_b,
            u_a: Vec2::ZERO,
            u_b: Vec2::ZERO,
            constant,
            ratio,
            max_length_a: def.max_length_a.min(constant - ratio * MIN_PULLEY_LENGTH),
            max_length_b: def.max_length_b.min((constant - MIN_PULLEY_LENGTH) / ratio),
            pulley_mass: 0.0,
            limit_mass_a: 0.0,
            limit_mass_b: 0.0,
            impulse: 0.0,
            limit_impulse_a: 0.0,
            limit_impulse_b: 0.0,
            state: LimitState::Inactive,
            limit_state_a: LimitState::Inactive,
            limit_state_b: LimitState::Inactive,
        })
    }

    #[inline]
    pub fn ground_anchor_a(&self) -> Vec2 {
        self.ground_anchor_a
    }

    #[inline]
    pub fn ground_anchor_b(&self) -> Vec2 {
        self.ground_anchor_b
    }

    /// Current rope length on body A's side
    pub fn length_a(&self, a: &Body) -> f32 {
        a.world_point(self.local_anchor_a).distance(self.ground_anchor_a)
    }

    /// Current rope length on body B's side
    pub fn length_b(&self, b: &Body) -> f32 {
        b.world_point(self.local_anchor_b).distance(self.ground_anchor_b)
    }

    #[inline]
    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    pub fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        self.u_b * (inv_dt * self.impulse)
    }

    pub(crate) fn init_velocity_constraints(&mut self, step: &TimeStep, a: &mut Body, b: &mut Body) {
        let r1 = anchor_arm(a, self.local_anchor_a);
        let r2 = anchor_arm(b, self.local_anchor_b);

        // Rope directions from the ground anchors
        self.u_a = a.sweep.c + r1 - self.ground_anchor_a;
        self.u_b = b.sweep.c + r2 - self.ground_anchor_b;

        let length_a = self.u_a.length();
        let length_b = self.u_b.length();

        self.u_a = if length_a > LINEAR_SLOP { self.u_a * (1.0 / length_a) } else { Vec2::ZERO };
        self.u_b = if length_b > LINEAR_SLOP { self.u_b * (1.0 / length_b) } else { Vec2::ZERO };

        let c = self.constant - length_a - self.ratio * length_b;
        if c > 0.0 {
            self.state = LimitState::Inactive;
            self.impulse = 0.0;
        } else {
            self.state = LimitState::AtUpper;
        }

        if length_a < self.max_length_a {
            self.limit_state_a = LimitState::Inactive;
            self.limit_impulse_a = 0.0;
        } else {
            self.limit_state_a = LimitState::AtUpper;
        }

        if length_b < self.max_length_b {
            self.limit_state_b = LimitState::Inactive;
            self.limit_impulse_b = 0.0;
        } else {
            self.limit_state_b = LimitState::AtUpper;
        }

        let cr1u1 = r1.cross(self.u_a);
        let cr2u2 = r2.cross(self.u_b);

        self.limit_mass_a = a.inv_mass + a.inv_inertia * cr1u1 * cr1u1;
        self.limit_mass_b = b.inv_mass + b.inv_inertia * cr2u2 * cr2u2;
        self.pulley_mass = self.limit_mass_a + self.ratio * self.ratio * self.limit_mass_b;

        self.limit_mass_a = invert(self.limit_mass_a);
        self.limit_mass_b = invert(self.limit_mass_b);
        self.pulley_mass = invert(self.pulley_mass);

        if step.warm_starting {
            self.impulse *= step.dt_ratio;
            self.limit_impulse_a *= step.dt_ratio;
            self.limit_impulse_b *= step.dt_ratio;

            let p1 = self.u_a * -(self.impulse + self.limit_impulse_a);
            let p2 = self.u_b * (-self.ratio * self.impulse - self.limit_impulse_b);
            a.linear_velocity += p1 * a.inv_mass;
            a.angular_velocity += a.inv_inertia * r1.cross(p1);
            b.linear_velocity += p2 * b.inv_mass;
            b.angular_velocity += b.inv_inertia * r2.cross(p2);
        } else {
            self.impulse = 0.0;
            self.limit_impulse_a = 0.0;
            self.limit_impulse_b = 0.0;
        }
    }

    pub(crate) fn solve_velocity_constraints(&mut self, a: &mut Body, b: &mut Body) {
        let r1 = anchor_arm(a, self.local_anchor_a);
        let r2 = anchor_arm(b, self.local_anchor_b);

        if self.state == LimitState::AtUpper {
            let v1 = a.linear_velocity + Vec2::scalar_cross(a.angular_velocity, r1);
            let v2 = b.linear_velocity + Vec2::scalar_cross(b.angular_velocity, r2);

            let cdot = -self.u_a.dot(v1) - self.ratio * self.u_b.dot(v2);
            let impulse = self.pulley_mass * -cdot;
            let old_impulse = self.impulse;
            self.impulse = (old_impulse + impulse).max(0.0);
            let impulse = self.impulse - old_impulse;

            let p1 = self.u_a * -impulse;
            let p2 = self.u_b * (-self.ratio * impulse);
            a.linear_velocity += p1 * a.inv_mass;
            a.angular_velocity += a.inv_inertia * r1.cross(p1);
            b.linear_velocity += p2 * b.inv_mass;
            b.angular_velocity += b.inv_inertia * r2.cross(p2);
        }

        if self.limit_state_a == LimitState::AtUpper {
            let v1 = a.linear_velocity + Vec2::scalar_cross(a.angular_velocity, r1);

            let cdot = -self.u_a.dot(v1);
            let impulse = -self.limit_mass_a * cdot;
            let old_impulse = self.limit_impulse_a;
            self.limit_impulse_a = (old_impulse + impulse).max(0.0);
            let impulse = self.limit_impulse_a - old_impulse;

            let p1 = self.u_a * -impulse;
            a.linear_velocity += p1 * a.inv_mass;
            a.angular_velocity += a.inv_inertia * r1.cross(p1);
        }

        if self.limit_state_b == LimitState::AtUpper {
            let v2 = b.linear_velocity + Vec2::scalar_cross(b.angular_velocity, r2);

            let cdot = -self.u_b.dot(v2);
            let impulse = -self.limit_mass_b * cdot;
            let old_impulse = self.limit_impulse_b;
            self.limit_impulse_b = (old_impulse + impulse).max(0.0);
            let impulse = self.limit_impulse_b - old_impulse;

            let p2 = self.u_b * -impulse;
            b.linear_velocity += p2 * b.inv_mass;
            b.angular_velocity += b.inv_inertia * r2.cross(p2);
        }
    }

    pub(crate) fn solve_position_constraints(&mut self, a: &mut Body, b: &mut Body) -> bool {
        let mut linear_error = 0.0_f32;

        if self.state == LimitState::AtUpper {
            let r1 = anchor_arm(a, self.local_anchor_a);
            let r2 = anchor_arm(b, self.local_anchor_b);

            let (u1, length_a) = (a.sweep.c + r1 - self.ground_anchor_a).normalize_with_length();
            let (u2, length_b) = (b.sweep.c + r2 - self.ground_anchor_b).normalize_with_length();
            self.u_a = u1;
            self.u_b = u2;

            let c = self.constant - length_a - self.ratio * length_b;
            linear_error = linear_error.max(-c);

            let c = clamp(c + LINEAR_SLOP, -MAX_LINEAR_CORRECTION, 0.0);
            let impulse = -self.pulley_mass * c;

            let p1 = u1 * -impulse;
            let p2 = u2 * (-self.ratio * impulse);

            a.sweep.c += p1 * a.inv_mass;
            a.sweep.a += a.inv_inertia * r1.cross(p1);
            b.sweep.c += p2 * b.inv_mass;
            b.sweep.a += b.inv_inertia * r2.cross(p2);

            a.synchronize_transform();
            b.synchronize_transform();
        }

        if self.limit_state_a == LimitState::AtUpper {
            let r1 = anchor_arm(a, self.local_anchor_a);
            let (u1, length_a) = (a.sweep.c + r1 - self.ground_anchor_a).normalize_with_length();
            self.u_a = u1;

            let c = self.max_length_a - length_a;
            linear_error = linear_error.max(-c);
            let c = clamp(c + LINEAR_SLOP, -MAX_LINEAR_CORRECTION, 0.0);
            let impulse = -self.limit_mass_a * c;

            let p1 = u1 * -impulse;
            a.sweep.c += p1 * a.inv_mass;
            a.sweep.a += a.inv_inertia * r1.cross(p1);
            a.synchronize_transform();
        }

        if self.limit_state_b == LimitState::AtUpper {
            let r2 = anchor_arm(b, self.local_anchor_b);
            let (u2, length_b) = (b.sweep.c + r2 - self.ground_anchor_b).normalize_with_length();
            self.u_b = u2;

            let c = self.max_length_b - length_b;
            linear_error = linear_error.max(-c);
            let c = clamp(c + LINEAR_SLOP, -MAX_LINEAR_CORRECTION, 0.0);
            let impulse = -self.limit_mass_b * c;

            let p2 = u2 * -impulse;
            b.sweep.c += p2 * b.inv_mass;
            b.sweep.a += b.inv_inertia * r2.cross(p2);
            b.synchronize_transform();
        }

        linear_error < LINEAR_SLOP
    }
}

#[inline]
fn invert(mass: f32) -> f32 {
    if mass > f32::EPSILON {
        1.0 / mass
    } else {
        0.0
    }
}
