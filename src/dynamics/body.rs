use crate::geometry::MassData;
use crate::math::{Sweep, Transform, Vec2};

use super::handle::{BodyHandle, ContactHandle, ControllerHandle, FixtureHandle, JointHandle};

/// The type of rigid body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BodyType {
    /// Zero mass, zero velocity, moved only by hand
    #[default]
    Static,
    /// Zero mass, moves with its velocity and ignores forces
    Kinematic,
    /// Positive mass, moved by forces and collisions
    Dynamic,
}

/// Description for creating a body
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BodyDef {
    pub body_type: BodyType,
    /// World position of the body origin
    pub position: Vec2,
    /// World angle in radians
    pub angle: f32,
    /// Linear velocity of the body origin
    pub linear_velocity: Vec2,
    pub angular_velocity: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    /// Set false for bodies that should never fall asleep
    pub allow_sleep: bool,
    /// Is the body initially awake?
    pub awake: bool,
    /// Prevents rotation; useful for characters
    pub fixed_rotation: bool,
    /// Fast moving body that needs continuous collision against other
    /// dynamic bodies
    pub bullet: bool,
    /// Inactive bodies do not collide or simulate
    pub active: bool,
    /// Scales the inertia tensor
    pub inertia_scale: f32,
    pub user_data: u64,
}

impl Default for BodyDef {
    fn default() -> Self {
        Self {
            body_type: BodyType::Static,
            position: Vec2::ZERO,
            angle: 0.0,
            linear_velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            linear_damping: 0.0,
            angular_damping: 0.0,
            allow_sleep: true,
            awake: true,
            fixed_rotation: false,
            bullet: false,
            active: true,
            inertia_scale: 1.0,
            user_data: 0,
        }
    }
}

impl BodyDef {
    /// Creates a dynamic body description
    pub fn dynamic() -> Self {
        Self {
            body_type: BodyType::Dynamic,
            ..Self::default()
        }
    }

    /// Creates a static body description
    pub fn fixed() -> Self {
        Self::default()
    }

    /// Creates a kinematic body description
    pub fn kinematic() -> Self {
        Self {
            body_type: BodyType::Kinematic,
            ..Self::default()
        }
    }

    pub fn with_position(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    pub fn with_angle(mut self, angle: f32) -> Self {
        self.angle = angle;
        self
    }

    pub fn with_linear_velocity(mut self, velocity: Vec2) -> Self {
        self.linear_velocity = velocity;
        self
    }

    pub fn with_angular_velocity(mut self, omega: f32) -> Self {
        self.angular_velocity = omega;
        self
    }

    /// Sets linear and angular damping
    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.linear_damping = linear;
        self.angular_damping = angular;
        self
    }

    pub fn with_bullet(mut self, bullet: bool) -> Self {
        self.bullet = bullet;
        self
    }

    pub fn with_fixed_rotation(mut self, fixed: bool) -> Self {
        self.fixed_rotation = fixed;
        self
    }

    pub fn with_user_data(mut self, user_data: u64) -> Self {
        self.user_data = user_data;
        self
    }
}

/// Link from a body to one of its contacts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactEdge {
    pub contact: ContactHandle,
    /// The body on the other side of the contact
    pub other: BodyHandle,
}

/// Link from a body to one of its joints
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JointEdge {
    pub joint: JointHandle,
    /// The body on the other side of the joint
    pub other: BodyHandle,
    /// Copied from the joint so collision filtering needs no joint lookup
    pub collide_connected: bool,
}

/// A rigid body. Create with [`World::create_body`](crate::World::create_body).
#[derive(Debug, Clone)]
pub struct Body {
    pub(crate) body_type: BodyType,

    /// Body origin transform
    pub(crate) xf: Transform,
    /// Swept motion of the center of mass for continuous collision
    pub(crate) sweep: Sweep,

    pub(crate) linear_velocity: Vec2,
    pub(crate) angular_velocity: f32,

    /// Accumulated force, cleared by `World::clear_forces`
    pub(crate) force: Vec2,
    pub(crate) torque: f32,

    pub(crate) mass: f32,
    pub(crate) inv_mass: f32,
    /// Rotational inertia about the center of mass
    pub(crate) inertia: f32,
    pub(crate) inv_inertia: f32,
    pub(crate) inertia_scale: f32,

    pub(crate) linear_damping: f32,
    pub(crate) angular_damping: f32,

    pub(crate) sleep_time: f32,

    pub(crate) island: bool,
    pub(crate) awake: bool,
    pub(crate) allow_sleep: bool,
    pub(crate) bullet: bool,
    pub(crate) fixed_rotation: bool,
    pub(crate) active: bool,

    pub(crate) fixtures: Vec<FixtureHandle>,
    pub(crate) contact_edges: Vec<ContactEdge>,
    pub(crate) joint_edges: Vec<JointEdge>,
    pub(crate) controllers: Vec<ControllerHandle>,

    /// Application data
    pub user_data: u64,
}

impl Body {
    pub(crate) fn new(def: &BodyDef) -> Self {
        debug_assert!(def.position.is_valid());
        debug_assert!(def.linear_velocity.is_valid());
        debug_assert!(def.inertia_scale >= 0.0);

        let xf = Transform::from_angle(def.position, def.angle);
        let sweep = Sweep {
            local_center: Vec2::ZERO,
            c0: def.position,
            c: def.position,
            a0: def.angle,
            a: def.angle,
            t0: 1.0,
        };

        let (mass, inv_mass) = if def.body_type == BodyType::Dynamic {
            (1.0, 1.0)
        } else {
            (0.0, 0.0)
        };

        Self {
            body_type: def.body_type,
            xf,
            sweep,
            linear_velocity: def.linear_velocity,
            angular_velocity: def.angular_velocity,
            force: Vec2::ZERO,
            torque: 0.0,
            mass,
            inv_mass,
            inertia: 0.0,
            inv_inertia: 0.0,
            inertia_scale: def.inertia_scale,
            linear_damping: def.linear_damping,
            angular_damping: def.angular_damping,
            sleep_time: 0.0,
            island: false,
            awake: def.awake,
            allow_sleep: def.allow_sleep,
            bullet: def.bullet,
            fixed_rotation: def.fixed_rotation,
            active: def.active,
            fixtures: Vec::new(),
            contact_edges: Vec::new(),
            joint_edges: Vec::new(),
            controllers: Vec::new(),
            user_data: def.user_data,
        }
    }

    #[inline]
    pub fn body_type(&self) -> BodyType {
        self.body_type
    }

    #[inline]
    pub fn is_dynamic(&self) -> bool {
        self.body_type == BodyType::Dynamic
    }

    #[inline]
    pub fn is_static(&self) -> bool {
        self.body_type == BodyType::Static
    }

    #[inline]
    pub fn is_kinematic(&self) -> bool {
        self.body_type == BodyType::Kinematic
    }

    /// Transform of the body origin
    #[inline]
    pub fn transform(&self) -> &Transform {
        &self.xf
    }

    /// World position of the body origin
    #[inline]
    pub fn position(&self) -> Vec2 {
        self.xf.position
    }

    #[inline]
    pub fn angle(&self) -> f32 {
        self.sweep.a
    }

    /// World position of the center of mass
    #[inline]
    pub fn world_center(&self) -> Vec2 {
        self.sweep.c
    }

    /// Center of mass in body coordinates
    #[inline]
    pub fn local_center(&self) -> Vec2 {
        self.sweep.local_center
    }

    #[inline]
    pub fn sweep(&self) -> &Sweep {
        &self.sweep
    }

    /// Linear velocity of the center of mass
    #[inline]
    pub fn linear_velocity(&self) -> Vec2 {
        self.linear_velocity
    }

    /// Ignored on static bodies
    pub fn set_linear_velocity(&mut self, v: Vec2) {
        if self.body_type == BodyType::Static {
            return;
        }
        if v.dot(v) > 0.0 {
            self.set_awake(true);
        }
        self.linear_velocity = v;
    }

    #[inline]
    pub fn angular_velocity(&self) -> f32 {
        self.angular_velocity
    }

    /// Ignored on static bodies
    pub fn set_angular_velocity(&mut self, omega: f32) {
        if self.body_type == BodyType::Static {
            return;
        }
        if omega != 0.0 {
            self.set_awake(true);
        }
        self.angular_velocity = omega;
    }

    #[inline]
    pub fn force(&self) -> Vec2 {
        self.force
    }

    #[inline]
    pub fn torque(&self) -> f32 {
        self.torque
    }

    /// Applies a force at a world point. Off-center forces also produce
    /// torque. Wakes the body.
    pub fn apply_force(&mut self, force: Vec2, point: Vec2) {
        if self.body_type != BodyType::Dynamic {
            return;
        }
        self.set_awake(true);
        self.force += force;
        self.torque += (point - self.sweep.c).cross(force);
    }

    /// Applies a force at the center of mass
    pub fn apply_force_to_center(&mut self, force: Vec2) {
        let center = self.sweep.c;
        self.apply_force(force, center);
    }

    pub fn apply_torque(&mut self, torque: f32) {
        if self.body_type != BodyType::Dynamic {
            return;
        }
        self.set_awake(true);
        self.torque += torque;
    }

    /// Applies an impulse at a world point, changing velocity immediately
    pub fn apply_linear_impulse(&mut self, impulse: Vec2, point: Vec2) {
        if self.body_type != BodyType::Dynamic {
            return;
        }
        self.set_awake(true);
        self.linear_velocity += impulse * self.inv_mass;
        self.angular_velocity += self.inv_inertia * (point - self.sweep.c).cross(impulse);
    }

    pub fn apply_angular_impulse(&mut self, impulse: f32) {
        if self.body_type != BodyType::Dynamic {
            return;
        }
        self.set_awake(true);
        self.angular_velocity += self.inv_inertia * impulse;
    }

    #[inline]
    pub fn mass(&self) -> f32 {
        self.mass
    }

    #[inline]
    pub fn inv_mass(&self) -> f32 {
        self.inv_mass
    }

    /// Rotational inertia about the body origin
    #[inline]
    pub fn inertia(&self) -> f32 {
        self.inertia + self.mass * self.sweep.local_center.length_squared()
    }

    /// Inverse inertia about the center of mass
    #[inline]
    pub fn inv_inertia(&self) -> f32 {
        self.inv_inertia
    }

    /// Mass, local center and inertia about the body origin
    pub fn mass_data(&self) -> MassData {
        MassData {
            mass: self.mass,
            center: self.sweep.local_center,
            inertia: self.inertia(),
        }
    }

    /// Overrides the mass properties computed from fixtures. Only dynamic
    /// bodies are affected; a non-positive mass becomes 1.
    pub fn set_mass_data(&mut self, data: &MassData) {
        if self.body_type != BodyType::Dynamic {
            return;
        }

        self.inertia = 0.0;
        self.inv_inertia = 0.0;

        self.mass = if data.mass > 0.0 { data.mass } else { 1.0 };
        self.inv_mass = 1.0 / self.mass;

        if data.inertia > 0.0 && !self.fixed_rotation {
            let inertia = data.inertia - self.mass * data.center.length_squared();
            if inertia > 0.0 {
                self.inertia = inertia;
                self.inv_inertia = 1.0 / inertia;
            }
        }

        self.move_center(data.center);
    }

    /// Recomputes mass properties from the given per-fixture mass data
    pub(crate) fn reset_mass_data_from<I>(&mut self, fixture_masses: I)
    where
        I: IntoIterator<Item = MassData>,
    {
        self.mass = 0.0;
        self.inv_mass = 0.0;
        self.inertia = 0.0;
        self.inv_inertia = 0.0;

        if self.body_type != BodyType::Dynamic {
            self.sweep.local_center = Vec2::ZERO;
            self.sweep.c0 = self.xf.position;
            self.sweep.c = self.xf.position;
            return;
        }

        // Accumulate mass over all fixtures
        let mut center = Vec2::ZERO;
        for data in fixture_masses {
            self.mass += data.mass;
            center += data.center * data.mass;
            self.inertia += data.inertia;
        }

        if self.mass > 0.0 {
            self.inv_mass = 1.0 / self.mass;
            center *= self.inv_mass;
        } else {
            // Dynamic bodies always have positive mass
            self.mass = 1.0;
            self.inv_mass = 1.0;
        }

        if self.inertia > 0.0 && !self.fixed_rotation {
            // Shift inertia to the center of mass
            self.inertia -= self.mass * center.length_squared();
            self.inertia *= self.inertia_scale;
            debug_assert!(self.inertia > 0.0);
            self.inv_inertia = if self.inertia > 0.0 {
                1.0 / self.inertia
            } else {
                0.0
            };
        } else {
            self.inertia = 0.0;
            self.inv_inertia = 0.0;
        }

        self.move_center(center);
    }

    /// Moves the center of mass, keeping the velocity of the body origin
    fn move_center(&mut self, local_center: Vec2) {
        let old_center = self.sweep.c;
        self.sweep.local_center = local_center;
        self.sweep.c = self.xf.transform_point(local_center);
        self.sweep.c0 = self.sweep.c;

        self.linear_velocity += Vec2::scalar_cross(self.angular_velocity, self.sweep.c - old_center);
    }

    #[inline]
    pub fn is_awake(&self) -> bool {
        self.awake
    }

    /// Wakes or sleeps the body. A sleeping body has zero velocity and no
    /// accumulated force.
    pub fn set_awake(&mut self, flag: bool) {
        if self.awake == flag {
            return;
        }
        self.awake = flag;
        self.sleep_time = 0.0;
        if !flag {
            self.linear_velocity = Vec2::ZERO;
            self.angular_velocity = 0.0;
            self.force = Vec2::ZERO;
            self.torque = 0.0;
        }
    }

    #[inline]
    pub fn is_sleeping_allowed(&self) -> bool {
        self.allow_sleep
    }

    pub fn set_sleeping_allowed(&mut self, flag: bool) {
        self.allow_sleep = flag;
        if !flag {
            self.set_awake(true);
        }
    }

    #[inline]
    pub fn is_bullet(&self) -> bool {
        self.bullet
    }

    pub fn set_bullet(&mut self, flag: bool) {
        self.bullet = flag;
    }

    #[inline]
    pub fn is_fixed_rotation(&self) -> bool {
        self.fixed_rotation
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[inline]
    pub fn linear_damping(&self) -> f32 {
        self.linear_damping
    }

    pub fn set_linear_damping(&mut self, damping: f32) {
        self.linear_damping = damping;
    }

    #[inline]
    pub fn angular_damping(&self) -> f32 {
        self.angular_damping
    }

    pub fn set_angular_damping(&mut self, damping: f32) {
        self.angular_damping = damping;
    }

    /// Seconds spent below the sleep thresholds
    #[inline]
    pub fn sleep_time(&self) -> f32 {
        self.sleep_time
    }

    #[inline]
    pub fn world_point(&self, local_point: Vec2) -> Vec2 {
        self.xf.transform_point(local_point)
    }

    #[inline]
    pub fn world_vector(&self, local_vector: Vec2) -> Vec2 {
        self.xf.transform_vector(local_vector)
    }

    #[inline]
    pub fn local_point(&self, world_point: Vec2) -> Vec2 {
        self.xf.inverse_transform_point(world_point)
    }

    #[inline]
    pub fn local_vector(&self, world_vector: Vec2) -> Vec2 {
        self.xf.inverse_transform_vector(world_vector)
    }

    /// Velocity of a point fixed to the body, given in world coordinates
    pub fn linear_velocity_from_world_point(&self, world_point: Vec2) -> Vec2 {
        self.linear_velocity + Vec2::scalar_cross(self.angular_velocity, world_point - self.sweep.c)
    }

    /// Velocity of a point fixed to the body, given in body coordinates
    pub fn linear_velocity_from_local_point(&self, local_point: Vec2) -> Vec2 {
        self.linear_velocity_from_world_point(self.world_point(local_point))
    }

    #[inline]
    pub fn fixtures(&self) -> &[FixtureHandle] {
        &self.fixtures
    }

    #[inline]
    pub fn contact_edges(&self) -> &[ContactEdge] {
        &self.contact_edges
    }

    #[inline]
    pub fn joint_edges(&self) -> &[JointEdge] {
        &self.joint_edges
    }

    /// Controllers this body belongs to
    #[inline]
    pub fn controllers(&self) -> &[ControllerHandle] {
        &self.controllers
    }

    /// False if neither body is dynamic, or if a joint that disables
    /// collision connects the two.
    pub fn should_collide(&self, other_handle: BodyHandle, other: &Body) -> bool {
        if self.body_type != BodyType::Dynamic && other.body_type != BodyType::Dynamic {
            return false;
        }
        !self
            .joint_edges
            .iter()
            .any(|edge| edge.other == other_handle && !edge.collide_connected)
    }

    /// Places the body, resetting the sweep to a stationary pose
    pub(crate) fn set_pose(&mut self, position: Vec2, angle: f32) {
        self.xf.set(position, angle);
        self.sweep.c = self.xf.transform_point(self.sweep.local_center);
        self.sweep.c0 = self.sweep.c;
        self.sweep.a = angle;
        self.sweep.a0 = angle;
    }

    /// Rebuilds the origin transform from the end of the sweep
    pub(crate) fn synchronize_transform(&mut self) {
        self.xf.r.set_angle(self.sweep.a);
        self.xf.position = self.sweep.c - self.xf.r * self.sweep.local_center;
    }

    /// Origin transform at the start of the sweep
    pub(crate) fn transform0(&self) -> Transform {
        let mut xf = Transform::from_angle(self.sweep.c0, self.sweep.a0);
        xf.position -= xf.r * self.sweep.local_center;
        xf
    }

    /// Moves the body to time `t` of the step and freezes it there
    pub(crate) fn advance(&mut self, t: f32) {
        self.sweep.advance(t);
        self.sweep.c = self.sweep.c0;
        self.sweep.a = self.sweep.a0;
        self.synchronize_transform();
    }

    pub(crate) fn clear_forces(&mut self) {
        self.force = Vec2::ZERO;
        self.torque = 0.0;
    }
}
