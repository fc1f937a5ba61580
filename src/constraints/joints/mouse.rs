use crate::dynamics::{Body, BodyHandle, TimeStep};
use crate::math::consts::PI;
use crate::math::{Mat22, Vec2};

use super::anchor_arm;

/// Drags a point on body B toward a world target with a soft spring.
///
/// `body_a` is only used for bookkeeping; any other body, usually a static
/// ground body, will do.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MouseJointDef {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    /// Initial world target; also fixes the anchor on body B
    pub target: Vec2,
    /// Cap on the constraint force, usually a multiple of the body weight
    pub max_force: f32,
    pub frequency_hz: f32,
    pub damping_ratio: f32,
    pub collide_connected: bool,
}

impl MouseJointDef {
    pub fn new(body_a: BodyHandle, body_b: BodyHandle, target: Vec2) -> Self {
        Self {
            body_a,
            body_b,
            target,
            max_force: 0.0,
            frequency_hz: 5.0,
            damping_ratio: 0.7,
            collide_connected: false,
        }
    }

    pub fn with_max_force(mut self, max_force: f32) -> Self {
        self.max_force = max_force;
        self
    }

    pub fn with_spring(mut self, frequency_hz: f32, damping_ratio: f32) -> Self {
        self.frequency_hz = frequency_hz;
        self.damping_ratio = damping_ratio;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MouseJoint {
    pub(crate) local_anchor: Vec2,
    target: Vec2,
    max_force: f32,
    frequency_hz: f32,
    damping_ratio: f32,
    impulse: Vec2,
    mass: Mat22,
    c: Vec2,
    beta: f32,
    gamma: f32,
}

impl MouseJoint {
    pub(crate) fn new(def: &MouseJointDef, body_b: &Body) -> Self {
        debug_assert!(def.target.is_valid());
        debug_assert!(def.max_force >= 0.0);
        Self {
            local_anchor: body_b.local_point(def.target),
            target: def.target,
            max_force: def.max_force,
            frequency_hz: def.frequency_hz,
            damping_ratio: def.damping_ratio,
            impulse: Vec2::ZERO,
            mass: Mat22::ZERO,
            c: Vec2::ZERO,
            beta: 0.0,
            gamma: 0.0,
        }
    }

    #[inline]
    pub fn target(&self) -> Vec2 {
        self.target
    }

    /// Moves the target. Use `World::set_mouse_target` to also wake the
    /// dragged body.
    pub fn set_target(&mut self, target: Vec2) {
        self.target = target;
    }

    #[inline]
    pub fn max_force(&self) -> f32 {
        self.max_force
    }

    pub fn set_max_force(&mut self, max_force: f32) {
        self.max_force = max_force;
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
        self.impulse * inv_dt
    }

    pub(crate) fn init_velocity_constraints(&mut self, step: &TimeStep, b: &mut Body) {
        let mass = b.mass;

        // Spring frequency and damping
        let omega = 2.0 * PI * self.frequency_hz;
        let d = 2.0 * mass * self.damping_ratio * omega;
        let k = mass * omega * omega;

        // gamma has units of inverse mass, beta of inverse time
        self.gamma = step.dt * (d + step.dt * k);
        self.gamma = if self.gamma != 0.0 { 1.0 / self.gamma } else { 0.0 };
        self.beta = step.dt * k * self.gamma;

        let r = anchor_arm(b, self.local_anchor);

        // K = [(1/m1 + 1/m2) * eye(2) - skew(r1) * invI1 * skew(r1) - skew(r2) * invI2 * skew(r2)]
        let (inv_mass, inv_i) = (b.inv_mass, b.inv_inertia);
        let k1 = Mat22::from_cols(Vec2::new(inv_mass, 0.0), Vec2::new(0.0, inv_mass));
        let k2 = Mat22::from_cols(
            Vec2::new(inv_i * r.y * r.y, -inv_i * r.x * r.y),
            Vec2::new(-inv_i * r.x * r.y, inv_i * r.x * r.x),
        );
        let mut k = k1 + k2;
        k.col1.x += self.gamma;
        k.col2.y += self.gamma;
        self.mass = k.inverse();

        self.c = b.sweep.c + r - self.target;

        // Cheat with some damping
        b.angular_velocity *= 0.98;

        // Warm starting
        self.impulse *= step.dt_ratio;
        b.linear_velocity += self.impulse * inv_mass;
        b.angular_velocity += inv_i * r.cross(self.impulse);
    }

    pub(crate) fn solve_velocity_constraints(&mut self, step: &TimeStep, b: &mut Body) {
        let r = anchor_arm(b, self.local_anchor);

        let cdot = b.linear_velocity + Vec2::scalar_cross(b.angular_velocity, r);
        let mut impulse = -(self.mass * (cdot + self.c * self.beta + self.impulse * self.gamma));

        let old_impulse = self.impulse;
        self.impulse += impulse;
        let max_impulse = step.dt * self.max_force;
        if self.impulse.length_squared() > max_impulse * max_impulse {
            self.impulse *= max_impulse / self.impulse.length();
        }
        impulse = self.impulse - old_impulse;

        b.linear_velocity += impulse * b.inv_mass;
        b.angular_velocity += b.inv_inertia * r.cross(impulse);
    }
}
