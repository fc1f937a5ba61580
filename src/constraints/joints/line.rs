use crate::dynamics::{Body, BodyHandle, TimeStep};
use crate::math::utils::clamp;
use crate::math::{Mat22, Vec2};
use crate::settings::{ANGULAR_SLOP, LINEAR_SLOP, MAX_LINEAR_CORRECTION};

use super::{anchor_arm, LimitState};

/// Like a prismatic joint but with free rotation: body B's anchor slides on
/// a line fixed in body A.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LineJointDef {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,
    pub local_axis_a: Vec2,
    pub enable_limit: bool,
    pub lower_translation: f32,
    pub upper_translation: f32,
    pub enable_motor: bool,
    pub max_motor_force: f32,
    pub motor_speed: f32,
    pub collide_connected: bool,
}

impl LineJointDef {
    pub fn new(body_a: BodyHandle, body_b: BodyHandle) -> Self {
        Self {
            body_a,
            body_b,
            local_anchor_a: Vec2::ZERO,
            local_anchor_b: Vec2::ZERO,
            local_axis_a: Vec2::X,
            enable_limit: false,
            lower_translation: 0.0,
            upper_translation: 0.0,
            enable_motor: false,
            max_motor_force: 0.0,
            motor_speed: 0.0,
            collide_connected: false,
        }
    }

    pub fn initialize(body_a: BodyHandle, a: &Body, body_b: BodyHandle, b: &Body, anchor: Vec2, axis: Vec2) -> Self {
        Self {
            local_anchor_a: a.local_point(anchor),
            local_anchor_b: b.local_point(anchor),
            local_axis_a: a.local_vector(axis),
            ..Self::new(body_a, body_b)
        }
    }

    pub fn with_limits(mut self, lower: f32, upper: f32) -> Self {
        self.enable_limit = true;
        self.lower_translation = lower;
        self.upper_translation = upper;
        self
    }

    pub fn with_motor(mut self, speed: f32, max_force: f32) -> Self {
        self.enable_motor = true;
        self.motor_speed = speed;
        self.max_motor_force = max_force;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineJoint {
    pub(crate) local_anchor_a: Vec2,
    pub(crate) local_anchor_b: Vec2,
    local_x_axis: Vec2,
    local_y_axis: Vec2,

    axis: Vec2,
    perp: Vec2,
    s1: f32,
    s2: f32,
    a1: f32,
    a2: f32,
    k: Mat22,
    // x is the perpendicular row, y the axial limit row
    impulse: Vec2,
    motor_mass: f32,
    motor_impulse: f32,

    lower_translation: f32,
    upper_translation: f32,
    max_motor_force: f32,
    motor_speed: f32,
    enable_limit: bool,
    enable_motor: bool,
    limit_state: LimitState,
}

impl LineJoint {
    pub(crate) fn new(def: &LineJointDef) -> Self {
        let local_x_axis = def.local_axis_a.normalize();
        Self {
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            local_x_axis,
            local_y_axis: Vec2::scalar_cross(1.0, local_x_axis),
            axis: Vec2::ZERO,
            perp: Vec2::ZERO,
            s1: 0.0,
            s2: 0.0,
            a1: 0.0,
            a2: 0.0,
            k: Mat22::ZERO,
            impulse: Vec2::ZERO,
            motor_mass: 0.0,
            motor_impulse: 0.0,
            lower_translation: def.lower_translation,
            upper_translation: def.upper_translation,
            max_motor_force: def.max_motor_force,
            motor_speed: def.motor_speed,
            enable_limit: def.enable_limit,
            enable_motor: def.enable_motor,
            limit_state: LimitState::Inactive,
        }
    }

    pub fn joint_translation(&self, a: &Body, b: &Body) -> f32 {
        let d = b.world_point(self.local_anchor_b) - a.world_point(self.local_anchor_a);
        d.dot(a.world_vector(self.local_x_axis))
    }

    pub fn joint_speed(&self, a: &Body, b: &Body) -> f32 {
        let r1 = anchor_arm(a, self.local_anchor_a);
        let r2 = anchor_arm(b, self.local_anchor_b);
        let d = (b.sweep.c + r2) - (a.sweep.c + r1);
        let axis = a.world_vector(self.local_x_axis);

        let (v1, w1) = (a.linear_velocity, a.angular_velocity);
        let (v2, w2) = (b.linear_velocity, b.angular_velocity);
        d.dot(Vec2::scalar_cross(w1, axis))
            + axis.dot(v2 + Vec2::scalar_cross(w2, r2) - v1 - Vec2::scalar_cross(w1, r1))
    }

    #[inline]
    pub fn is_limit_enabled(&self) -> bool {
        self.enable_limit
    }

    pub fn enable_limit(&mut self, flag: bool) {
        self.enable_limit = flag;
    }

    pub fn set_limits(&mut self, lower: f32, upper: f32) {
        debug_assert!(lower <= upper);
        self.lower_translation = lower;
        self.upper_translation = upper;
    }

    #[inline]
    pub fn lower_limit(&self) -> f32 {
        self.lower_translation
    }

    #[inline]
    pub fn upper_limit(&self) -> f32 {
        self.upper_translation
    }

    #[inline]
    pub fn is_motor_enabled(&self) -> bool {
        self.enable_motor
    }

    pub fn enable_motor(&mut self, flag: bool) {
        self.enable_motor = flag;
    }

    #[inline]
    pub fn motor_speed(&self) -> f32 {
        self.motor_speed
    }

    pub fn set_motor_speed(&mut self, speed: f32) {
        self.motor_speed = speed;
    }

    pub fn set_max_motor_force(&mut self, force: f32) {
        self.max_motor_force = force;
    }

    pub fn motor_force(&self, inv_dt: f32) -> f32 {
        inv_dt * self.motor_impulse
    }

    #[inline]
    pub fn limit_state(&self) -> LimitState {
        self.limit_state
    }

    pub fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        (self.perp * self.impulse.x + self.axis * (self.motor_impulse + self.impulse.y)) * inv_dt
    }

    pub fn reaction_torque(&self, _inv_dt: f32) -> f32 {
        0.0
    }

    fn block_mass(&self, m1: f32, i1: f32, m2: f32, i2: f32) -> Mat22 {
        let k11 = m1 + m2 + i1 * self.s1 * self.s1 + i2 * self.s2 * self.s2;
        let k12 = i1 * self.s1 * self.a1 + i2 * self.s2 * self.a2;
        let k22 = m1 + m2 + i1 * self.a1 * self.a1 + i2 * self.a2 * self.a2;
        Mat22::from_cols(Vec2::new(k11, k12), Vec2::new(k12, k22))
    }

    pub(crate) fn init_velocity_constraints(&mut self, step: &TimeStep, a: &mut Body, b: &mut Body) {
        let r1 = anchor_arm(a, self.local_anchor_a);
        let r2 = anchor_arm(b, self.local_anchor_b);
        let d = b.sweep.c + r2 - a.sweep.c - r1;

        let (m1, i1) = (a.inv_mass, a.inv_inertia);
        let (m2, i2) = (b.inv_mass, b.inv_inertia);

        // Motor and limit axis
        self.axis = a.xf.r * self.local_x_axis;
        self.a1 = (d + r1).cross(self.axis);
        self.a2 = r2.cross(self.axis);
        self.motor_mass = m1 + m2 + i1 * self.a1 * self.a1 + i2 * self.a2 * self.a2;
        if self.motor_mass > f32::EPSILON {
            self.motor_mass = 1.0 / self.motor_mass;
        } else {
            self.motor_mass = 0.0;
        }

        // Point-to-line constraint
        self.perp = a.xf.r * self.local_y_axis;
        self.s1 = (d + r1).cross(self.perp);
        self.s2 = r2.cross(self.perp);
        self.k = self.block_mass(m1, i1, m2, i2);

        if self.enable_limit {
            let translation = self.axis.dot(d);
            if (self.upper_translation - self.lower_translation).abs() < 2.0 * LINEAR_SLOP {
                self.limit_state = LimitState::Equal;
            } else if translation <= self.lower_translation {
                if self.limit_state != LimitState::AtLower {
                    self.limit_state = LimitState::AtLower;
                    self.impulse.y = 0.0;
                }
            } else if translation >= self.upper_translation {
                if self.limit_state != LimitState::AtUpper {
                    self.limit_state = LimitState::AtUpper;
                    self.impulse.y = 0.0;
                }
            } else {
                self.limit_state = LimitState::Inactive;
                self.impulse.y = 0.0;
            }
        } else {
            self.limit_state = LimitState::Inactive;
        }

        if !self.enable_motor {
            self.motor_impulse = 0.0;
        }

        if step.warm_starting {
            self.impulse *= step.dt_ratio;
            self.motor_impulse *= step.dt_ratio;

            let axial = self.motor_impulse + self.impulse.y;
            let p = self.perp * self.impulse.x + self.axis * axial;
            let l1 = self.impulse.x * self.s1 + axial * self.a1;
            let l2 = self.impulse.x * self.s2 + axial * self.a2;

            a.linear_velocity -= p * m1;
            a.angular_velocity -= i1 * l1;
            b.linear_velocity += p * m2;
            b.angular_velocity += i2 * l2;
        } else {
            self.impulse = Vec2::ZERO;
            self.motor_impulse = 0.0;
        }
    }

    pub(crate) fn solve_velocity_constraints(&mut self, step: &TimeStep, a: &mut Body, b: &mut Body) {
        let (mut v1, mut w1) = (a.linear_velocity, a.angular_velocity);
        let (mut v2, mut w2) = (b.linear_velocity, b.angular_velocity);
        let (m1, i1) = (a.inv_mass, a.inv_inertia);
        let (m2, i2) = (b.inv_mass, b.inv_inertia);

        if self.enable_motor && self.limit_state != LimitState::Equal {
            let cdot = self.axis.dot(v2 - v1) + self.a2 * w2 - self.a1 * w1;
            let impulse = self.motor_mass * (self.motor_speed - cdot);
            let old_impulse = self.motor_impulse;
            let max_impulse = step.dt * self.max_motor_force;
            self.motor_impulse = clamp(old_impulse + impulse, -max_impulse, max_impulse);
            let impulse = self.motor_impulse - old_impulse;

            let p = self.axis * impulse;
            v1 -= p * m1;
            w1 -= i1 * impulse * self.a1;
            v2 += p * m2;
            w2 += i2 * impulse * self.a2;
        }

        let cdot1 = self.perp.dot(v2 - v1) + self.s2 * w2 - self.s1 * w1;

        let df = if self.enable_limit && self.limit_state != LimitState::Inactive {
            let cdot2 = self.axis.dot(v2 - v1) + self.a2 * w2 - self.a1 * w1;
            let cdot = Vec2::new(cdot1, cdot2);

            let f1 = self.impulse;
            self.impulse += self.k.solve(-cdot);

            match self.limit_state {
                LimitState::AtLower => self.impulse.y = self.impulse.y.max(0.0),
                LimitState::AtUpper => self.impulse.y = self.impulse.y.min(0.0),
                _ => {}
            }

            // f2(1) = invK(1,1) * (-Cdot(1) - K(1,2) * (f2(2) - f1(2))) + f1(1)
            let b_scalar = -cdot1 - (self.impulse.y - f1.y) * self.k.col2.x;
            self.impulse.x = if self.k.col1.x != 0.0 { b_scalar / self.k.col1.x + f1.x } else { f1.x };

            self.impulse - f1
        } else {
            // Limit is inactive, just solve the point-to-line constraint
            let df = if self.k.col1.x != 0.0 { -cdot1 / self.k.col1.x } else { 0.0 };
            self.impulse.x += df;
            Vec2::new(df, 0.0)
        };

        let p = self.perp * df.x + self.axis * df.y;
        let l1 = df.x * self.s1 + df.y * self.a1;
        let l2 = df.x * self.s2 + df.y * self.a2;

        v1 -= p * m1;
        w1 -= i1 * l1;
        v2 += p * m2;
        w2 += i2 * l2;

        a.linear_velocity = v1;
        a.angular_velocity = w1;
        b.linear_velocity = v2;
        b.angular_velocity = w2;
    }

    pub(crate) fn solve_position_constraints(&mut self, a: &mut Body, b: &mut Body) -> bool {
        let (m1, i1) = (a.inv_mass, a.inv_inertia);
        let (m2, i2) = (b.inv_mass, b.inv_inertia);

        let mut linear_error = 0.0_f32;
        let mut active = false;
        let mut c2 = 0.0;

        let r1 = anchor_arm(a, self.local_anchor_a);
        let r2 = anchor_arm(b, self.local_anchor_b);
        let d = b.sweep.c + r2 - a.sweep.c - r1;

        if self.enable_limit {
            self.axis = a.xf.r * self.local_x_axis;
            self.a1 = (d + r1).cross(self.axis);
            self.a2 = r2.cross(self.axis);

            let translation = self.axis.dot(d);
            if (self.upper_translation - self.lower_translation).abs() < 2.0 * LINEAR_SLOP {
                c2 = clamp(translation, -MAX_LINEAR_CORRECTION, MAX_LINEAR_CORRECTION);
                linear_error = translation.abs();
                active = true;
            } else if translation <= self.lower_translation {
                c2 = clamp(translation - self.lower_translation + LINEAR_SLOP, -MAX_LINEAR_CORRECTION, 0.0);
                linear_error = self.lower_translation - translation;
                active = true;
            } else if translation >= self.upper_translation {
                c2 = clamp(translation - self.upper_translation - LINEAR_SLOP, 0.0, MAX_LINEAR_CORRECTION);
                linear_error = translation - self.upper_translation;
                active = true;
            }
        }

        self.perp = a.xf.r * self.local_y_axis;
        self.s1 = (d + r1).cross(self.perp);
        self.s2 = r2.cross(self.perp);

        let c1 = self.perp.dot(d);
        linear_error = linear_error.max(c1.abs());
        let angular_error = 0.0;

        let impulse = if active {
            let k = self.block_mass(m1, i1, m2, i2);
            k.solve(-Vec2::new(c1, c2))
        } else {
            let k11 = m1 + m2 + i1 * self.s1 * self.s1 + i2 * self.s2 * self.s2;
            let impulse1 = if k11 != 0.0 { -c1 / k11 } else { 0.0 };
            Vec2::new(impulse1, 0.0)
        };

        let p = self.perp * impulse.x + self.axis * impulse.y;
        let l1 = impulse.x * self.s1 + impulse.y * self.a1;
        let l2 = impulse.x * self.s2 + impulse.y * self.a2;

        a.sweep.c -= p * m1;
        a.sweep.a -= i1 * l1;
        b.sweep.c += p * m2;
        b.sweep.a += i2 * l2;
        a.synchronize_transform();
        b.synchronize_transform();

        linear_error <= LINEAR_SLOP && angular_error <= ANGULAR_SLOP
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::BodyDef;
    use approx::assert_relative_eq;

    #[test]
    fn test_slides_freely_along_axis() {
        let mut a = Body::new(&BodyDef::fixed());
        let mut b = Body::new(&BodyDef::dynamic().with_position(Vec2::new(0.0, 1.0)));
        let def = LineJointDef::initialize(BodyHandle::new(0), &a, BodyHandle::new(1), &b, Vec2::new(0.0, 1.0), Vec2::Y);
        let mut joint = LineJoint::new(&def);
        b.set_linear_velocity(Vec2::new(1.5, 2.0));

        let step = TimeStep::new(1.0 / 60.0, 1.0, 8, 3, true);
        joint.init_velocity_constraints(&step, &mut a, &mut b);
        joint.solve_velocity_constraints(&step, &mut a, &mut b);

        assert_relative_eq!(b.linear_velocity().x, 0.0, epsilon = 1e-5);
        assert_relative_eq!(b.linear_velocity().y, 2.0, epsilon = 1e-5);
        assert_relative_eq!(joint.joint_speed(&a, &b), 2.0, epsilon = 1e-5);
    }

    #[test]
    fn test_motor_drives_translation() {
        let mut a = Body::new(&BodyDef::fixed());
        let mut b = Body::new(&BodyDef::dynamic());
        let def = LineJointDef::new(BodyHandle::new(0), BodyHandle::new(1)).with_motor(3.0, 1000.0);
        let mut joint = LineJoint::new(&def);

        let step = TimeStep::new(1.0 / 60.0, 1.0, 8, 3, true);
        joint.init_velocity_constraints(&step, &mut a, &mut b);
        joint.solve_velocity_constraints(&step, &mut a, &mut b);
        assert_relative_eq!(b.linear_velocity().x, 3.0, epsilon = 1e-4);
    }
}
