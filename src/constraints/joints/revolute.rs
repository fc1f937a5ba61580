use crate::dynamics::{Body, BodyHandle, TimeStep};
use crate::math::utils::clamp;
use crate::math::{Mat22, Mat33, Vec2, Vec3};
use crate::settings::{ANGULAR_SLOP, LINEAR_SLOP, MAX_ANGULAR_CORRECTION};

use super::{anchor_arm, LimitState};

/// Pins two bodies together at a shared anchor, leaving relative rotation
/// free. Supports an angle limit and a motor.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RevoluteJointDef {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,
    /// Body B angle minus body A angle in the reference pose
    pub reference_angle: f32,
    pub enable_limit: bool,
    /// Radians
    pub lower_angle: f32,
    /// Radians
    pub upper_angle: f32,
    pub enable_motor: bool,
    /// Radians per second
    pub motor_speed: f32,
    pub max_motor_torque: f32,
    pub collide_connected: bool,
}

impl RevoluteJointDef {
    pub fn new(body_a: BodyHandle, body_b: BodyHandle) -> Self {
        Self {
            body_a,
            body_b,
            local_anchor_a: Vec2::ZERO,
            local_anchor_b: Vec2::ZERO,
            reference_angle: 0.0,
            enable_limit: false,
            lower_angle: 0.0,
            upper_angle: 0.0,
            enable_motor: false,
            motor_speed: 0.0,
            max_motor_torque: 0.0,
            collide_connected: false,
        }
    }

    /// Uses a world anchor in the current pose
    pub fn initialize(body_a: BodyHandle, a: &Body, body_b: BodyHandle, b: &Body, anchor: Vec2) -> Self {
        Self {
            local_anchor_a: a.local_point(anchor),
            local_anchor_b: b.local_point(anchor),
            reference_angle: b.angle() - a.angle(),
            ..Self::new(body_a, body_b)
        }
    }

    pub fn with_limits(mut self, lower: f32, upper: f32) -> Self {
        self.enable_limit = true;
        self.lower_angle = lower;
        self.upper_angle = upper;
        self
    }

    pub fn with_motor(mut self, speed: f32, max_torque: f32) -> Self {
        self.enable_motor = true;
        self.motor_speed = speed;
        self.max_motor_torque = max_torque;
        self
    }

    pub fn with_collide_connected(mut self, flag: bool) -> Self {
        self.collide_connected = flag;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RevoluteJoint {
    pub(crate) local_anchor_a: Vec2,
    pub(crate) local_anchor_b: Vec2,
    pub(crate) reference_angle: f32,

    impulse: Vec3,
    motor_impulse: f32,
    // Effective mass for the point-to-point and limit rows
    mass: Mat33,
    motor_mass: f32,

    enable_motor: bool,
    max_motor_torque: f32,
    motor_speed: f32,
    enable_limit: bool,
    lower_angle: f32,
    upper_angle: f32,
    limit_state: LimitState,
}

impl RevoluteJoint {
    pub(crate) fn new(def: &RevoluteJointDef) -> Self {
        Self {
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            reference_angle: def.reference_angle,
            impulse: Vec3::ZERO,
            motor_impulse: 0.0,
            mass: Mat33::ZERO,
            motor_mass: 0.0,
            enable_motor: def.enable_motor,
            max_motor_torque: def.max_motor_torque,
            motor_speed: def.motor_speed,
            enable_limit: def.enable_limit,
            lower_angle: def.lower_angle,
            upper_angle: def.upper_angle,
            limit_state: LimitState::Inactive,
        }
    }

    /// Current relative angle, zero in the reference pose
    pub fn joint_angle(&self, a: &Body, b: &Body) -> f32 {
        b.sweep.a - a.sweep.a - self.reference_angle
    }

    pub fn joint_speed(&self, a: &Body, b: &Body) -> f32 {
        b.angular_velocity - a.angular_velocity
    }

    #[inline]
    pub fn is_limit_enabled(&self) -> bool {
        self.enable_limit
    }

    pub fn enable_limit(&mut self, flag: bool) {
        self.enable_limit = flag;
    }

    #[inline]
    pub fn lower_limit(&self) -> f32 {
        self.lower_angle
    }

    #[inline]
    pub fn upper_limit(&self) -> f32 {
        self.upper_angle
    }

    pub fn set_limits(&mut self, lower: f32, upper: f32) {
        debug_assert!(lower <= upper);
        self.lower_angle = lower;
        self.upper_angle = upper;
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

    pub fn set_max_motor_torque(&mut self, torque: f32) {
        self.max_motor_torque = torque;
    }

    pub fn motor_torque(&self, inv_dt: f32) -> f32 {
        inv_dt * self.motor_impulse
    }

    #[inline]
    pub fn limit_state(&self) -> LimitState {
        self.limit_state
    }

    pub fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        Vec2::new(self.impulse.x, self.impulse.y) * inv_dt
    }

    pub fn reaction_torque(&self, inv_dt: f32) -> f32 {
        inv_dt * self.impulse.z
    }

    pub(crate) fn init_velocity_constraints(&mut self, step: &TimeStep, a: &mut Body, b: &mut Body) {
        let r1 = anchor_arm(a, self.local_anchor_a);
        let r2 = anchor_arm(b, self.local_anchor_b);

        // J = [-I -r1_skew I r2_skew]
        //     [ 0       -1 0       1]
        let (m1, i1) = (a.inv_mass, a.inv_inertia);
        let (m2, i2) = (b.inv_mass, b.inv_inertia);

        let col1 = Vec3::new(
            m1 + m2 + r1.y * r1.y * i1 + r2.y * r2.y * i2,
            -r1.y * r1.x * i1 - r2.y * r2.x * i2,
            -r1.y * i1 - r2.y * i2,
        );
        let col2 = Vec3::new(col1.y, m1 + m2 + r1.x * r1.x * i1 + r2.x * r2.x * i2, r1.x * i1 + r2.x * i2);
        let col3 = Vec3::new(col1.z, col2.z, i1 + i2);
        self.mass = Mat33::from_cols(col1, col2, col3);

        self.motor_mass = i1 + i2;
        if self.motor_mass > 0.0 {
            self.motor_mass = 1.0 / self.motor_mass;
        }

        if !self.enable_motor {
            self.motor_impulse = 0.0;
        }

        if self.enable_limit {
            let joint_angle = b.sweep.a - a.sweep.a - self.reference_angle;
            if (self.upper_angle - self.lower_angle).abs() < 2.0 * ANGULAR_SLOP {
                self.limit_state = LimitState::Equal;
            } else if joint_angle <= self.lower_angle {
                if self.limit_state != LimitState::AtLower {
                    self.impulse.z = 0.0;
                }
                self.limit_state = LimitState::AtLower;
            } else if joint_angle >= self.upper_angle {
                if self.limit_state != LimitState::AtUpper {
                    self.impulse.z = 0.0;
                }
                self.limit_state = LimitState::AtUpper;
            } else {
                self.limit_state = LimitState::Inactive;
                self.impulse.z = 0.0;
            }
        } else {
            self.limit_state = LimitState::Inactive;
        }

        if step.warm_starting {
            self.impulse = self.impulse * step.dt_ratio;
            self.motor_impulse *= step.dt_ratio;

            let p = Vec2::new(self.impulse.x, self.impulse.y);
            a.linear_velocity -= p * m1;
            a.angular_velocity -= i1 * (r1.cross(p) + self.motor_impulse + self.impulse.z);
            b.linear_velocity += p * m2;
            b.angular_velocity += i2 * (r2.cross(p) + self.motor_impulse + self.impulse.z);
        } else {
            self.impulse = Vec3::ZERO;
            self.motor_impulse = 0.0;
        }
    }

    pub(crate) fn solve_velocity_constraints(&mut self, step: &TimeStep, a: &mut Body, b: &mut Body) {
        let (mut v1, mut w1) = (a.linear_velocity, a.angular_velocity);
        let (mut v2, mut w2) = (b.linear_velocity, b.angular_velocity);
        let (m1, i1) = (a.inv_mass, a.inv_inertia);
        let (m2, i2) = (b.inv_mass, b.inv_inertia);

        // Motor
        if self.enable_motor && self.limit_state != LimitState::Equal {
            let cdot = w2 - w1 - self.motor_speed;
            let impulse = -self.motor_mass * cdot;
            let old_impulse = self.motor_impulse;
            let max_impulse = step.dt * self.max_motor_torque;
            self.motor_impulse = clamp(old_impulse + impulse, -max_impulse, max_impulse);
            let impulse = self.motor_impulse - old_impulse;

            w1 -= i1 * impulse;
            w2 += i2 * impulse;
        }

        let r1 = anchor_arm(a, self.local_anchor_a);
        let r2 = anchor_arm(b, self.local_anchor_b);

        if self.enable_limit && self.limit_state != LimitState::Inactive {
            // Point-to-point and limit in block form
            let cdot1 = v2 + Vec2::scalar_cross(w2, r2) - v1 - Vec2::scalar_cross(w1, r1);
            let cdot2 = w2 - w1;
            let cdot = Vec3::new(cdot1.x, cdot1.y, cdot2);

            let mut impulse = self.mass.solve33(-cdot);

            match self.limit_state {
                LimitState::Equal => self.impulse += impulse,
                LimitState::AtLower => {
                    let new_impulse = self.impulse.z + impulse.z;
                    if new_impulse < 0.0 {
                        let reduced = self.mass.solve22(-cdot1);
                        impulse = Vec3::new(reduced.x, reduced.y, -self.impulse.z);
                        self.impulse.x += reduced.x;
                        self.impulse.y += reduced.y;
                        self.impulse.z = 0.0;
                    } else {
                        self.impulse += impulse;
                    }
                }
                LimitState::AtUpper => {
                    let new_impulse = self.impulse.z + impulse.z;
                    if new_impulse > 0.0 {
                        let reduced = self.mass.solve22(-cdot1);
                        impulse = Vec3::new(reduced.x, reduced.y, -self.impulse.z);
                        self.impulse.x += reduced.x;
                        self.impulse.y += reduced.y;
                        self.impulse.z = 0.0;
                    } else {
                        self.impulse += impulse;
                    }
                }
                LimitState::Inactive => {}
            }

            let p = Vec2::new(impulse.x, impulse.y);
            v1 -= p * m1;
            w1 -= i1 * (r1.cross(p) + impulse.z);
            v2 += p * m2;
            w2 += i2 * (r2.cross(p) + impulse.z);
        } else {
            // Point-to-point only
            let cdot = v2 + Vec2::scalar_cross(w2, r2) - v1 - Vec2::scalar_cross(w1, r1);
            let impulse = self.mass.solve22(-cdot);

            self.impulse.x += impulse.x;
            self.impulse.y += impulse.y;

            v1 -= impulse * m1;
            w1 -= i1 * r1.cross(impulse);
            v2 += impulse * m2;
            w2 += i2 * r2.cross(impulse);
        }

        a.linear_velocity = v1;
        a.angular_velocity = w1;
        b.linear_velocity = v2;
        b.angular_velocity = w2;
    }

    pub(crate) fn solve_position_constraints(&mut self, a: &mut Body, b: &mut Body) -> bool {
        let mut angular_error = 0.0;

        // Angle limit
        if self.enable_limit && self.limit_state != LimitState::Inactive {
            let angle = b.sweep.a - a.sweep.a - self.reference_angle;
            let mut limit_impulse = 0.0;

            match self.limit_state {
                LimitState::Equal => {
                    // Prevent large angular corrections
                    let c = clamp(angle - self.lower_angle, -MAX_ANGULAR_CORRECTION, MAX_ANGULAR_CORRECTION);
                    limit_impulse = -self.motor_mass * c;
                    angular_error = c.abs();
                }
                LimitState::AtLower => {
                    let mut c = angle - self.lower_angle;
                    angular_error = -c;
                    // Prevent large angular corrections and allow some slop
                    c = clamp(c + ANGULAR_SLOP, -MAX_ANGULAR_CORRECTION, 0.0);
                    limit_impulse = -self.motor_mass * c;
                }
                LimitState::AtUpper => {
                    let mut c = angle - self.upper_angle;
                    angular_error = c;
                    c = clamp(c - ANGULAR_SLOP, 0.0, MAX_ANGULAR_CORRECTION);
                    limit_impulse = -self.motor_mass * c;
                }
                LimitState::Inactive => {}
            }

            a.sweep.a -= a.inv_inertia * limit_impulse;
            b.sweep.a += b.inv_inertia * limit_impulse;
            a.synchronize_transform();
            b.synchronize_transform();
        }

        // Point-to-point
        let r1 = anchor_arm(a, self.local_anchor_a);
        let r2 = anchor_arm(b, self.local_anchor_b);

        let mut c = b.sweep.c + r2 - a.sweep.c - r1;
        let position_error = c.length();

        let (m1, i1) = (a.inv_mass, a.inv_inertia);
        let (m2, i2) = (b.inv_mass, b.inv_inertia);

        // Handle large detachment
        let allowed_stretch = 10.0 * LINEAR_SLOP;
        if c.length_squared() > allowed_stretch * allowed_stretch {
            // Use a particle solution with no rotation
            let k = m1 + m2;
            let mass = if k > f32::EPSILON { 1.0 / k } else { k };
            let impulse = -c * mass;
            let k_beta = 0.5;
            a.sweep.c -= impulse * (k_beta * m1);
            b.sweep.c += impulse * (k_beta * m2);

            c = b.sweep.c + r2 - a.sweep.c - r1;
        }

        let k1 = Mat22::from_cols(Vec2::new(m1 + m2, 0.0), Vec2::new(0.0, m1 + m2));
        let k2 = Mat22::from_cols(
            Vec2::new(i1 * r1.y * r1.y, -i1 * r1.x * r1.y),
            Vec2::new(-i1 * r1.x * r1.y, i1 * r1.x * r1.x),
        );
        let k3 = Mat22::from_cols(
            Vec2::new(i2 * r2.y * r2.y, -i2 * r2.x * r2.y),
            Vec2::new(-i2 * r2.x * r2.y, i2 * r2.x * r2.x),
        );
        let k = k1 + k2 + k3;
        let impulse = k.solve(-c);

        a.sweep.c -= impulse * m1;
        a.sweep.a -= i1 * r1.cross(impulse);
        b.sweep.c += impulse * m2;
        b.sweep.a += i2 * r2.cross(impulse);

        a.synchronize_transform();
        b.synchronize_transform();

        position_error <= LINEAR_SLOP && angular_error <= ANGULAR_SLOP
    }
}
