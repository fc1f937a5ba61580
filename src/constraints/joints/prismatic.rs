use crate::dynamics::{Body, BodyHandle, TimeStep};
use crate::math::utils::clamp;
use crate::math::{Mat33, Sweep, Vec2, Vec3};
use crate::settings::{ANGULAR_SLOP, LINEAR_SLOP, MAX_LINEAR_CORRECTION};

use super::{anchor_arm, LimitState};

/// One translational degree of freedom along an axis fixed in body A, with
/// relative rotation locked. Supports a translation limit and a motor.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PrismaticJointDef {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub local_anchor_a: Vec2,
    pub local_anchor_b: Vec2,
    /// Translation axis in body A's frame
    pub local_axis_a: Vec2,
    /// Body B angle minus body A angle in the reference pose
    pub reference_angle: f32,
    pub enable_limit: bool,
    pub lower_translation: f32,
    pub upper_translation: f32,
    pub enable_motor: bool,
    pub max_motor_force: f32,
    /// Target speed in meters per second
    pub motor_speed: f32,
    pub collide_connected: bool,
}

impl PrismaticJointDef {
    pub fn new(body_a: BodyHandle, body_b: BodyHandle) -> Self {
        Self {
            body_a,
            body_b,
            local_anchor_a: Vec2::ZERO,
            local_anchor_b: Vec2::ZERO,
            local_axis_a: Vec2::X,
            reference_angle: 0.0,
            enable_limit: false,
            lower_translation: 0.0,
            upper_translation: 0.0,
            enable_motor: false,
            max_motor_force: 0.0,
            motor_speed: 0.0,
            collide_connected: false,
        }
    }

    /// Uses a world anchor and world axis in the current pose
    pub fn initialize(body_a: BodyHandle, a: &Body, body_b: BodyHandle, b: &Body, anchor: Vec2, axis: Vec2) -> Self {
        Self {
            local_anchor_a: a.local_point(anchor),
            local_anchor_b: b.local_point(anchor),
            local_axis_a: a.local_vector(axis),
            reference_angle: b.angle() - a.angle(),
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
pub struct PrismaticJoint {
    pub(crate) local_anchor_a: Vec2,
    pub(crate) local_anchor_b: Vec2,
    pub(crate) local_x_axis: Vec2,
    local_y_axis: Vec2,
    pub(crate) reference_angle: f32,

    axis: Vec2,
    perp: Vec2,
    s1: f32,
    s2: f32,
    a1: f32,
    a2: f32,
    k: Mat33,
    impulse: Vec3,
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

impl PrismaticJoint {
    pub(crate) fn new(def: &PrismaticJointDef) -> Self {
        let local_x_axis = def.local_axis_a.normalize();
        Self {
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            local_x_axis,
            local_y_axis: Vec2::scalar_cross(1.0, local_x_axis),
            reference_angle: def.reference_angle,
            axis: Vec2::ZERO,
            perp: Vec2::ZERO,
            s1: 0.0,
            s2: 0.0,
            a1: 0.0,
            a2: 0.0,
            k: Mat33::ZERO,
            impulse: Vec3::ZERO,
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

    /// Current translation along the axis
    pub fn joint_translation(&self, a: &Body, b: &Body) -> f32 {
        let d = b.world_point(self.local_anchor_b) - a.world_point(self.local_anchor_a);
        let axis = a.world_vector(self.local_x_axis);
        d.dot(axis)
    }

    /// Current translation speed along the axis
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

    #[inline]
    pub fn lower_limit(&self) -> f32 {
        self.lower_translation
    }

    #[inline]
    pub fn upper_limit(&self) -> f32 {
        self.upper_translation
    }

    pub fn set_limits(&mut self, lower: f32, upper: f32) {
        debug_assert!(lower <= upper);
        self.lower_translation = lower;
        self.upper_translation = upper;
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

    /// Motor force from the last step, given the inverse time step
    pub fn motor_force(&self, inv_dt: f32) -> f32 {
        inv_dt * self.motor_impulse
    }

    #[inline]
    pub fn limit_state(&self) -> LimitState {
        self.limit_state
    }

    pub fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        (self.perp * self.impulse.x + self.axis * (self.motor_impulse + self.impulse.z)) * inv_dt
    }

    pub fn reaction_torque(&self, inv_dt: f32) -> f32 {
        inv_dt * self.impulse.y
    }

    /// Effective mass of the perpendicular, angular and axial rows
    fn block_mass(&self, m1: f32, i1: f32, m2: f32, i2: f32) -> Mat33 {
        let (s1, s2, a1, a2) = (self.s1, self.s2, self.a1, self.a2);
        let k11 = m1 + m2 + i1 * s1 * s1 + i2 * s2 * s2;
        let k12 = i1 * s1 + i2 * s2;
        let k13 = i1 * s1 * a1 + i2 * s2 * a2;
        let mut k22 = i1 + i2;
        if k22 == 0.0 {
            k22 = 1.0;
        }
        let k23 = i1 * a1 + i2 * a2;
        let k33 = m1 + m2 + i1 * a1 * a1 + i2 * a2 * a2;
        Mat33::from_cols(
            Vec3::new(k11, k12, k13),
            Vec3::new(k12, k22, k23),
            Vec3::new(k13, k23, k33),
        )
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
        }

        // Prismatic constraint
        self.perp = a.xf.r * self.local_y_axis;
        self.s1 = (d + r1).cross(self.perp);
        self.s2 = r2.cross(self.perp);
        self.k = self.block_mass(m1, i1, m2, i2);

        if self.enable_limit {
            let translation = self.axis.dot(d);
            self.update_limit_state(translation);
        } else {
            self.limit_state = LimitState::Inactive;
        }

        if !self.enable_motor {
            self.motor_impulse = 0.0;
        }

        if step.warm_starting {
            self.impulse = self.impulse * step.dt_ratio;
            self.motor_impulse *= step.dt_ratio;

            let axial = self.motor_impulse + self.impulse.z;
            let p = self.perp * self.impulse.x + self.axis * axial;
            let l1 = self.impulse.x * self.s1 + self.impulse.y + axial * self.a1;
            let l2 = self.impulse.x * self.s2 + self.impulse.y + axial * self.a2;

            a.linear_velocity -= p * m1;
            a.angular_velocity -= i1 * l1;
            b.linear_velocity += p * m2;
            b.angular_velocity += i2 * l2;
        } else {
            self.impulse = Vec3::ZERO;
            self.motor_impulse = 0.0;
        }
    }

    fn update_limit_state(&mut self, translation: f32) {
        if (self.upper_translation - self.lower_translation).abs() < 2.0 * LINEAR_SLOP {
            self.limit_state = LimitState::Equal;
        } else if translation <= self.lower_translation {
            if self.limit_state != LimitState::AtLower {
                self.limit_state = LimitState::AtLower;
                self.impulse.z = 0.0;
            }
        } else if translation >= self.upper_translation {
            if self.limit_state != LimitState::AtUpper {
                self.limit_state = LimitState::AtUpper;
                self.impulse.z = 0.0;
            }
        } else {
            self.limit_state = LimitState::Inactive;
            self.impulse.z = 0.0;
        }
    }

    pub(crate) fn solve_velocity_constraints(&mut self, step: &TimeStep, a: &mut Body, b: &mut Body) {
        let (mut v1, mut w1) = (a.linear_velocity, a.angular_velocity);
        let (mut v2, mut w2) = (b.linear_velocity, b.angular_velocity);
        let (m1, i1) = (a.inv_mass, a.inv_inertia);
        let (m2, i2) = (b.inv_mass, b.inv_inertia);

        // Motor
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

        let cdot1 = Vec2::new(self.perp.dot(v2 - v1) + self.s2 * w2 - self.s1 * w1, w2 - w1);

        let df = if self.enable_limit && self.limit_state != LimitState::Inactive {
            // Solve prismatic and limit constraint in block form
            let cdot2 = self.axis.dot(v2 - v1) + self.a2 * w2 - self.a1 * w1;
            let cdot = Vec3::new(cdot1.x, cdot1.y, cdot2);

            let f1 = self.impulse;
            self.impulse += self.k.solve33(-cdot);

            match self.limit_state {
                LimitState::AtLower => self.impulse.z = self.impulse.z.max(0.0),
                LimitState::AtUpper => self.impulse.z = self.impulse.z.min(0.0),
                _ => {}
            }

            // f2(1:2) = invK(1:2,1:2) * (-Cdot(1:2) - K(1:2,3) * (f2(3) - f1(3))) + f1(1:2)
            let b_vec = -cdot1 - Vec2::new(self.k.col3.x, self.k.col3.y) * (self.impulse.z - f1.z);
            let f2r = self.k.solve22(b_vec) + Vec2::new(f1.x, f1.y);
            self.impulse.x = f2r.x;
            self.impulse.y = f2r.y;

            self.impulse - f1
        } else {
            // Limit is inactive, just solve the prismatic constraint
            let df = self.k.solve22(-cdot1);
            self.impulse.x += df.x;
            self.impulse.y += df.y;
            Vec3::new(df.x, df.y, 0.0)
        };

        let p = self.perp * df.x + self.axis * df.z;
        let l1 = df.x * self.s1 + df.y + df.z * self.a1;
        let l2 = df.x * self.s2 + df.y + df.z * self.a2;

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
        let mut sweep_a: Sweep = a.sweep;
        let mut sweep_b: Sweep = b.sweep;
        let (m1, i1) = (a.inv_mass, a.inv_inertia);
        let (m2, i2) = (b.inv_mass, b.inv_inertia);

        let mut linear_error = 0.0_f32;
        let mut active = false;
        let mut c2 = 0.0;

        let r1 = anchor_arm(a, self.local_anchor_a);
        let r2 = anchor_arm(b, self.local_anchor_b);
        let d = sweep_b.c + r2 - sweep_a.c - r1;

        self.axis = a.xf.r * self.local_x_axis;
        self.a1 = (d + r1).cross(self.axis);
        self.a2 = r2.cross(self.axis);

        if self.enable_limit {
            let translation = self.axis.dot(d);
            if (self.upper_translation - self.lower_translation).abs() < 2.0 * LINEAR_SLOP {
                // Prevent large angular corrections
                c2 = clamp(translation, -MAX_LINEAR_CORRECTION, MAX_LINEAR_CORRECTION);
                linear_error = translation.abs();
                active = true;
            } else if translation <= self.lower_translation {
                // Prevent large linear corrections and allow some slop
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

        let c1 = Vec2::new(self.perp.dot(d), sweep_b.a - sweep_a.a - self.reference_angle);
        linear_error = linear_error.max(c1.x.abs());
        let angular_error = c1.y.abs();

        let impulse = if active {
            self.k = self.block_mass(m1, i1, m2, i2);
            self.k.solve33(-Vec3::new(c1.x, c1.y, c2))
        } else {
            let k = self.block_mass(m1, i1, m2, i2);
            let impulse1 = k.solve22(-c1);
            Vec3::new(impulse1.x, impulse1.y, 0.0)
        };

        let p = self.perp * impulse.x + self.axis * impulse.z;
        let l1 = impulse.x * self.s1 + impulse.y + impulse.z * self.a1;
        let l2 = impulse.x * self.s2 + impulse.y + impulse.z * self.a2;

        sweep_a.c -= p * m1;
        sweep_a.a -= i1 * l1;
        sweep_b.c += p * m2;
        sweep_b.a += i2 * l2;

        a.sweep = sweep_a;
        b.sweep = sweep_b;
        a.synchronize_transform();
        b.synchronize_transform();

        linear_error <= LINEAR_SLOP && angular_error <= ANGULAR_SLOP
    }
}
