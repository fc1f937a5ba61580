use crate::dynamics::{Body, BodyHandle, TimeStep};
use crate::math::utils::clamp;
use crate::math::{Mat22, Vec2};

use super::anchor_arm;

/// Top-down friction: resists relative translation and rotation up to a
/// maximum force and torque.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FrictionJointDef {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,
    pub max_force: f32,
    pub max_torque: f32,
    pub collide_connected: bool,
}

impl FrictionJointDef {
    pub fn new(body_a: BodyHandle, body_b: BodyHandle) -> Self {
        Self {
            body_a,
            body_b,
            local_anchor_a: Vec2::ZERO,
            local_anchor_b: Vec2::ZERO,
            max_force: 0.0,
            max_torque: 0.0,
            collide_connected: false,
        }
    }

    pub fn initialize(body_a: BodyHandle, a: &Body, body_b: BodyHandle, b: &Body, anchor: Vec2) -> Self {
        Self {
            local_anchor_a: a.local_point(anchor),
            local_anchor_b: b.local_point(anchor),
            ..Self::new(body_a, body_b)
        }
    }

    pub fn with_max(mut self, force: f32, torque: f32) -> Self {
        self.max_force = force;
        self.max_torque = torque;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrictionJoint {
    pub(crate) local_anchor_a: Vec2,
    pub(crate) local_anchor_b: Vec2,
    linear_mass: Mat22,
    angular_mass: f32,
    linear_impulse: Vec2,
    angular_impulse: f32,
    max_force: f32,
    max_torque: f32,
}

impl FrictionJoint {
    pub(crate) fn new(def: &FrictionJointDef) -> Self {
        Self {
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            linear_mass: Mat22::ZERO,
            angular_mass: 0.0,
            linear_impulse: Vec2::ZERO,
            angular_impulse: 0.0,
            max_force: def.max_force,
            max_torque: def.max_torque,
        }
    }

    #[inline]
    pub fn max_force(&self) -> f32 {
        self.max_force
    }

    pub fn set_max_force(&mut self, force: f32) {
        debug_assert!(force.is_finite() && force >= 0.0);
        self.max_force = force;
    }

    #[inline]
    pub fn max_torque(&self) -> f32 {
        self.max_torque
    }

    pub fn set_max_torque(&mut self, torque: f32) {
        debug_assert!(torque.is_finite() && torque >= 0.0);
        self.max_torque = torque;
    }

    pub fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        self.linear_impulse * inv_dt
    }

    pub fn reaction_torque(&self, inv_dt: f32) -> f32 {
        inv_dt * self.angular_impulse
    }

    pub(crate) fn init_velocity_constraints(&mut self, step: &TimeStep, a: &mut Body, b: &mut Body) {
        let r_a = anchor_arm(a, self.local_anchor_a);
        let r_b = anchor_arm(b, self.local_anchor_b);

        let (m_a, i_a) = (a.inv_mass, a.inv_inertia);
        let (m_b, i_b) = (b.inv_mass, b.inv_inertia);

        let k1 = Mat22::from_cols(Vec2::new(m_a + m_b, 0.0), Vec2::new(0.0, m_a + m_b));
        let k2 = Mat22::from_cols(
            Vec2::new(i_a * r_a.y * r_a.y, -i_a * r_a.x * r_a.y),
            Vec2::new(-i_a * r_a.x * r_a.y, i_a * r_a.x * r_a.x),
        );
        let k3 = Mat22::from_cols(
            Vec2::new(i_b * r_b.y * r_b.y, -i_b * r_b.x * r_b.y),
            Vec2::new(-i_b * r_b.x * r_b.y, i_b * r_b.x * r_b.x),
        );
        self.linear_mass = (k1 + k2 + k3).inverse();

        self.angular_mass = i_a + i_b;
        if self.angular_mass > 0.0 {
            self.angular_mass = 1.0 / self.angular_mass;
        }

        if step.warm_starting {
            self.linear_impulse *= step.dt_ratio;
            self.angular_impulse *= step.dt_ratio;

            let p = self.linear_impulse;
            a.linear_velocity -= p * m_a;
            a.angular_velocity -= i_a * (r_a.cross(p) + self.angular_impulse);
            b.linear_velocity += p * m_b;
            b.angular_velocity += i_b * (r_b.cross(p) + self.angular_impulse);
        } else {
            self.linear_impulse = Vec2::ZERO;
            self.angular_impulse = 0.0;
        }
    }

    pub(crate) fn solve_velocity_constraints(&mut self, step: &TimeStep, a: &mut Body, b: &mut Body) {
        let (m_a, i_a) = (a.inv_mass, a.inv_inertia);
        let (m_b, i_b) = (b.inv_mass, b.inv_inertia);

        // Angular friction
        {
            let cdot = b.angular_velocity - a.angular_velocity;
            let impulse = -self.angular_mass * cdot;

            let old_impulse = self.angular_impulse;
            let max_impulse = step.dt * self.max_torque;
            self.angular_impulse = clamp(old_impulse + impulse, -max_impulse, max_impulse);
            let impulse = self.angular_impulse - old_impulse;

            a.angular_velocity -= i_a * impulse;
            b.angular_velocity += i_b * impulse;
        }

        // Linear friction
        {
            let r_a = anchor_arm(a, self.local_anchor_a);
            let r_b = anchor_arm(b, self.local_anchor_b);

            let cdot = b.linear_velocity + Vec2::scalar_cross(b.angular_velocity, r_b)
                - a.linear_velocity
                - Vec2::scalar_cross(a.angular_velocity, r_a);

            let mut impulse = -(self.linear_mass * cdot);
            let old_impulse = self.linear_impulse;
            self.linear_impulse += impulse;

            let max_impulse = step.dt * self.max_force;
            if self.linear_impulse.length_squared() > max_impulse * max_impulse {
                self.linear_impulse = self.linear_impulse.normalize() * max_impulse;
            }
            impulse = self.linear_impulse - old_impulse;

            a.linear_velocity -= impulse * m_a;
            a.angular_velocity -= i_a * r_a.cross(impulse);
            b.linear_velocity += impulse * m_b;
            b.angular_velocity += i_b * r_b.cross(impulse);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::BodyDef;
    use approx::assert_relative_eq;

    #[test]
    fn test_friction_force_is_bounded() {
        let mut a = Body::new(&BodyDef::fixed());
        let mut b = Body::new(&BodyDef::dynamic());
        let def = FrictionJointDef::new(BodyHandle::new(0), BodyHandle::new(1)).with_max(6.0, 0.0);
        let mut joint = FrictionJoint::new(&def);
        b.set_linear_velocity(Vec2::new(1.0, 0.0));

        let step = TimeStep::new(1.0 / 60.0, 1.0, 8, 3, true);
        joint.init_velocity_constraints(&step, &mut a, &mut b);
        joint.solve_velocity_constraints(&step, &mut a, &mut b);

        // 6 N for 1/60 s removes 0.1 m/s from a 1 kg body
        assert_relative_eq!(b.linear_velocity().x, 0.9, epsilon = 1e-5);
        assert_relative_eq!(joint.reaction_force(step.inv_dt).length(), 6.0, epsilon = 1e-3);
    }

    #[test]
    fn test_slow_motion_is_stopped() {
        let mut a = Body::new(&BodyDef::fixed());
        let mut b = Body::new(&BodyDef::dynamic());
        let def = FrictionJointDef::new(BodyHandle::new(0), BodyHandle::new(1)).with_max(100.0, 0.0);
        let mut joint = FrictionJoint::new(&def);
        b.set_linear_velocity(Vec2::new(0.5, 0.0));

        let step = TimeStep::new(1.0 / 60.0, 1.0, 8, 3, true);
        joint.init_velocity_constraints(&step, &mut a, &mut b);
        joint.solve_velocity_constraints(&step, &mut a, &mut b);
        assert_relative_eq!(b.linear_velocity().x, 0.0, epsilon = 1e-5);
    }
}
