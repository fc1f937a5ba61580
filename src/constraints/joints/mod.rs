//! Joints connecting pairs of bodies.
//!
//! Every joint kind is solved with the same three passes as contacts:
//! velocity setup with warm starting, velocity iterations, and position
//! correction. A [`Joint`] owns the two body handles and dispatches to the
//! per-kind state in [`JointKind`].

mod distance;
mod friction;
mod gear;
mod line;
mod mouse;
mod prismatic;
mod pulley;
mod revolute;
mod rope;
mod weld;

pub use distance::{DistanceJoint, DistanceJointDef};
pub use friction::{FrictionJoint, FrictionJointDef};
pub use gear::{GearJoint, GearJointDef};
pub use line::{LineJoint, LineJointDef};
pub use mouse::{MouseJoint, MouseJointDef};
pub use prismatic::{PrismaticJoint, PrismaticJointDef};
pub use pulley::{PulleyJoint, PulleyJointDef};
pub use revolute::{RevoluteJoint, RevoluteJointDef};
pub use rope::{RopeJoint, RopeJointDef};
pub use weld::{WeldJoint, WeldJointDef};

use crate::dynamics::{Arena, Body, BodyHandle, JointHandle, TimeStep};
use crate::error::{PhysicsError, Result};
use crate::math::Vec2;

/// Joint kind tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum JointType {
    Distance,
    Mouse,
    Prismatic,
    Pulley,
    Gear,
    Rope,
    Friction,
    Revolute,
    Line,
    Weld,
}

/// Which side of a joint limit is engaged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LimitState {
    #[default]
    Inactive,
    AtLower,
    AtUpper,
    /// Lower and upper limits coincide
    Equal,
}

/// Definition for any joint kind, passed to `World::create_joint`
#[derive(Debug, Clone, PartialEq)]
pub enum JointDef {
    Distance(DistanceJointDef),
    Mouse(MouseJointDef),
    Prismatic(PrismaticJointDef),
    Pulley(PulleyJointDef),
    Gear(GearJointDef),
    Rope(RopeJointDef),
    Friction(FrictionJointDef),
    Revolute(RevoluteJointDef),
    Line(LineJointDef),
    Weld(WeldJointDef),
}

macro_rules! joint_def_from {
    ($($variant:ident => $def:ty),* $(,)?) => {
        $(
            impl From<$def> for JointDef {
                fn from(def: $def) -> Self {
                    JointDef::$variant(def)
                }
            }
        )*
    };
}

joint_def_from! {
    Distance => DistanceJointDef,
    Mouse => MouseJointDef,
    Prismatic => PrismaticJointDef,
    Pulley => PulleyJointDef,
    Gear => GearJointDef,
    Rope => RopeJointDef,
    Friction => FrictionJointDef,
    Revolute => RevoluteJointDef,
    Line => LineJointDef,
    Weld => WeldJointDef,
}

impl JointDef {
    pub fn joint_type(&self) -> JointType {
        match self {
            JointDef::Distance(_) => JointType::Distance,
            JointDef::Mouse(_) => JointType::Mouse,
            JointDef::Prismatic(_) => JointType::Prismatic,
            JointDef::Pulley(_) => JointType::Pulley,
            JointDef::Gear(_) => JointType::Gear,
            JointDef::Rope(_) => JointType::Rope,
            JointDef::Friction(_) => JointType::Friction,
            JointDef::Revolute(_) => JointType::Revolute,
            JointDef::Line(_) => JointType::Line,
            JointDef::Weld(_) => JointType::Weld,
        }
    }

    /// Whether the two connected bodies still collide with each other
    pub fn collide_connected(&self) -> bool {
        match self {
            JointDef::Distance(d) => d.collide_connected,
            JointDef::Mouse(d) => d.collide_connected,
            JointDef::Prismatic(d) => d.collide_connected,
            JointDef::Pulley(d) => d.collide_connected,
            JointDef::Gear(d) => d.collide_connected,
            JointDef::Rope(d) => d.collide_connected,
            JointDef::Friction(d) => d.collide_connected,
            JointDef::Revolute(d) => d.collide_connected,
            JointDef::Line(d) => d.collide_connected,
            JointDef::Weld(d) => d.collide_connected,
        }
    }
}

/// Per-kind joint state
#[derive(Debug, Clone, PartialEq)]
pub enum JointKind {
    Distance(DistanceJoint),
    Mouse(MouseJoint),
    Prismatic(PrismaticJoint),
    Pulley(PulleyJoint),
    Gear(GearJoint),
    Rope(RopeJoint),
    Friction(FrictionJoint),
    Revolute(RevoluteJoint),
    Line(LineJoint),
    Weld(WeldJoint),
}

/// A constraint between two bodies, owned by the world
#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    pub(crate) body_a: BodyHandle,
    pub(crate) body_b: BodyHandle,
    pub(crate) collide_connected: bool,
    pub(crate) island: bool,
    pub(crate) kind: JointKind,
    pub user_data: u64,
}

impl Joint {
    /// Builds a joint from its definition. Gear joints read the revolute or
    /// prismatic joints they couple from `joints`.
    pub(crate) fn new(
        def: &JointDef,
        bodies: &Arena<BodyHandle, Body>,
        joints: &Arena<JointHandle, Joint>,
    ) -> Result<Self> {
        let (body_a, body_b, kind) = match def {
            JointDef::Distance(d) => (d.body_a, d.body_b, JointKind::Distance(DistanceJoint::new(d))),
            JointDef::Mouse(d) => {
                let b = bodies.get(d.body_b).ok_or(PhysicsError::InvalidBody(d.body_b.0))?;
                (d.body_a, d.body_b, JointKind::Mouse(MouseJoint::new(d, b)))
            }
            JointDef::Prismatic(d) => (d.body_a, d.body_b, JointKind::Prismatic(PrismaticJoint::new(d))),
            JointDef::Pulley(d) => (d.body_a, d.body_b, JointKind::Pulley(PulleyJoint::new(d)?)),
            JointDef::Gear(d) => {
                let gear = GearJoint::new(d, bodies, joints)?;
                (gear.body_a, gear.body_b, JointKind::Gear(gear))
            }
            JointDef::Rope(d) => (d.body_a, d.body_b, JointKind::Rope(RopeJoint::new(d))),
            JointDef::Friction(d) => (d.body_a, d.body_b, JointKind::Friction(FrictionJoint::new(d))),
            JointDef::Revolute(d) => (d.body_a, d.body_b, JointKind::Revolute(RevoluteJoint::new(d))),
            JointDef::Line(d) => (d.body_a, d.body_b, JointKind::Line(LineJoint::new(d))),
            JointDef::Weld(d) => (d.body_a, d.body_b, JointKind::Weld(WeldJoint::new(d))),
        };

        for handle in [body_a, body_b] {
            if !bodies.contains(handle) {
                return Err(PhysicsError::InvalidBody(handle.0));
            }
        }
        if body_a == body_b {
            return Err(PhysicsError::SameBody);
        }

        Ok(Self {
            body_a,
            body_b,
            collide_connected: def.collide_connected(),
            island: false,
            kind,
            user_data: 0,
        })
    }

    pub fn joint_type(&self) -> JointType {
        match &self.kind {
            JointKind::Distance(_) => JointType::Distance,
            JointKind::Mouse(_) => JointType::Mouse,
            JointKind::Prismatic(_) => JointType::Prismatic,
            JointKind::Pulley(_) => JointType::Pulley,
            JointKind::Gear(_) => JointType::Gear,
            JointKind::Rope(_) => JointType::Rope,
            JointKind::Friction(_) => JointType::Friction,
            JointKind::Revolute(_) => JointType::Revolute,
            JointKind::Line(_) => JointType::Line,
            JointKind::Weld(_) => JointType::Weld,
        }
    }

    #[inline]
    pub fn body_a(&self) -> BodyHandle {
        self.body_a
    }

    #[inline]
    pub fn body_b(&self) -> BodyHandle {
        self.body_b
    }

    /// The body on the other side of the joint
    pub fn other(&self, body: BodyHandle) -> BodyHandle {
        if body == self.body_a {
            self.body_b
        } else {
            self.body_a
        }
    }

    #[inline]
    pub fn collide_connected(&self) -> bool {
        self.collide_connected
    }

    #[inline]
    pub fn kind(&self) -> &JointKind {
        &self.kind
    }

    /// Per-kind state, for motor, limit and target setters. Changing a
    /// motor does not wake the bodies; see `World::wake_joint`.
    #[inline]
    pub fn kind_mut(&mut self) -> &mut JointKind {
        &mut self.kind
    }

    /// True when both bodies are active
    pub fn is_active(&self, bodies: &Arena<BodyHandle, Body>) -> bool {
        bodies[self.body_a].is_active() && bodies[self.body_b].is_active()
    }

    /// Anchor point on body A in world coordinates
    pub fn anchor_a(&self, bodies: &Arena<BodyHandle, Body>) -> Vec2 {
        let a = &bodies[self.body_a];
        match &self.kind {
            JointKind::Distance(j) => a.world_point(j.local_anchor_a),
            JointKind::Mouse(j) => j.target(),
            JointKind::Prismatic(j) => a.world_point(j.local_anchor_a),
            JointKind::Pulley(j) => a.world_point(j.local_anchor_a),
            JointKind::Gear(j) => a.world_point(j.local_anchor_a),
            JointKind::Rope(j) => a.world_point(j.local_anchor_a),
            JointKind::Friction(j) => a.world_point(j.local_anchor_a),
            JointKind::Revolute(j) => a.world_point(j.local_anchor_a),
            JointKind::Line(j) => a.world_point(j.local_anchor_a),
            JointKind::Weld(j) => a.world_point(j.local_anchor_a),
        }
    }

    /// Anchor point on body B in world coordinates
    pub fn anchor_b(&self, bodies: &Arena<BodyHandle, Body>) -> Vec2 {
        let b = &bodies[self.body_b];
        let local = match &self.kind {
            JointKind::Distance(j) => j.local_anchor_b,
            JointKind::Mouse(j) => j.local_anchor,
            JointKind::Prismatic(j) => j.local_anchor_b,
            JointKind::Pulley(j) => j.local_anchor_b,
            JointKind::Gear(j) => j.local_anchor_b,
            JointKind::Rope(j) => j.local_anchor_b,
            JointKind::Friction(j) => j.local_anchor_b,
            JointKind::Revolute(j) => j.local_anchor_b,
            JointKind::Line(j) => j.local_anchor_b,
            JointKind::Weld(j) => j.local_anchor_b,
        };
        b.world_point(local)
    }

    /// Reaction force on body B at the anchor, given the inverse time step
    pub fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        match &self.kind {
            JointKind::Distance(j) => j.reaction_force(inv_dt),
            JointKind::Mouse(j) => j.reaction_force(inv_dt),
            JointKind::Prismatic(j) => j.reaction_force(inv_dt),
            JointKind::Pulley(j) => j.reaction_force(inv_dt),
            JointKind::Gear(j) => j.reaction_force(inv_dt),
            JointKind::Rope(j) => j.reaction_force(inv_dt),
            JointKind::Friction(j) => j.reaction_force(inv_dt),
            JointKind::Revolute(j) => j.reaction_force(inv_dt),
            JointKind::Line(j) => j.reaction_force(inv_dt),
            JointKind::Weld(j) => j.reaction_force(inv_dt),
        }
    }

    /// Reaction torque on body B, given the inverse time step
    pub fn reaction_torque(&self, inv_dt: f32, bodies: &Arena<BodyHandle, Body>) -> f32 {
        match &self.kind {
            JointKind::Distance(_) | JointKind::Mouse(_) | JointKind::Pulley(_) | JointKind::Rope(_) => 0.0,
            JointKind::Prismatic(j) => j.reaction_torque(inv_dt),
            JointKind::Gear(j) => j.reaction_torque(inv_dt, &bodies[self.body_b]),
            JointKind::Friction(j) => j.reaction_torque(inv_dt),
            JointKind::Revolute(j) => j.reaction_torque(inv_dt),
            JointKind::Line(j) => j.reaction_torque(inv_dt),
            JointKind::Weld(j) => j.reaction_torque(inv_dt),
        }
    }

    pub(crate) fn init_velocity_constraints(&mut self, step: &TimeStep, bodies: &mut Arena<BodyHandle, Body>) {
        if let JointKind::Gear(gear) = &mut self.kind {
            gear.sync_grounds(bodies);
        }
        let (a, b) = bodies.pair_mut(self.body_a, self.body_b);
        match &mut self.kind {
            JointKind::Distance(j) => j.init_velocity_constraints(step, a, b),
            JointKind::Mouse(j) => j.init_velocity_constraints(step, b),
            JointKind::Prismatic(j) => j.init_velocity_constraints(step, a, b),
            JointKind::Pulley(j) => j.init_velocity_constraints(step, a, b),
            JointKind::Gear(j) => j.init_velocity_constraints(step, a, b),
            JointKind::Rope(j) => j.init_velocity_constraints(step, a, b),
            JointKind::Friction(j) => j.init_velocity_constraints(step, a, b),
            JointKind::Revolute(j) => j.init_velocity_constraints(step, a, b),
            JointKind::Line(j) => j.init_velocity_constraints(step, a, b),
            JointKind::Weld(j) => j.init_velocity_constraints(step, a, b),
        }
    }

    pub(crate) fn solve_velocity_constraints(&mut self, step: &TimeStep, bodies: &mut Arena<BodyHandle, Body>) {
        let (a, b) = bodies.pair_mut(self.body_a, self.body_b);
        match &mut self.kind {
            JointKind::Distance(j) => j.solve_velocity_constraints(a, b),
            JointKind::Mouse(j) => j.solve_velocity_constraints(step, b),
            JointKind::Prismatic(j) => j.solve_velocity_constraints(step, a, b),
            JointKind::Pulley(j) => j.solve_velocity_constraints(a, b),
            JointKind::Gear(j) => j.solve_velocity_constraints(a, b),
            JointKind::Rope(j) => j.solve_velocity_constraints(step, a, b),
            JointKind::Friction(j) => j.solve_velocity_constraints(step, a, b),
            JointKind::Revolute(j) => j.solve_velocity_constraints(step, a, b),
            JointKind::Line(j) => j.solve_velocity_constraints(step, a, b),
            JointKind::Weld(j) => j.solve_velocity_constraints(a, b),
        }
    }

    /// Returns true when the position error is within tolerance
    pub(crate) fn solve_position_constraints(&mut self, bodies: &mut Arena<BodyHandle, Body>) -> bool {
        let (a, b) = bodies.pair_mut(self.body_a, self.body_b);
        match &mut self.kind {
            JointKind::Distance(j) => j.solve_position_constraints(a, b),
            JointKind::Mouse(_) | JointKind::Friction(_) => true,
            JointKind::Prismatic(j) => j.solve_position_constraints(a, b),
            JointKind::Pulley(j) => j.solve_position_constraints(a, b),
            JointKind::Gear(j) => j.solve_position_constraints(a, b),
            JointKind::Rope(j) => j.solve_position_constraints(a, b),
            JointKind::Revolute(j) => j.solve_position_constraints(a, b),
            JointKind::Line(j) => j.solve_position_constraints(a, b),
            JointKind::Weld(j) => j.solve_position_constraints(a, b),
        }
    }
}

/// Vector from the center of mass to a body-local anchor, in world axes
#[inline]
pub(crate) fn anchor_arm(body: &Body, local_anchor: Vec2) -> Vec2 {
    body.xf.r * (local_anchor - body.sweep.local_center)
}

/// Applies a linear impulse at the arms, negatively to A and positively to B
#[inline]
pub(crate) fn apply_impulse(a: &mut Body, r_a: Vec2, b: &mut Body, r_b: Vec2, p: Vec2) {
    a.linear_velocity -= p * a.inv_mass;
    a.angular_velocity -= a.inv_inertia * r_a.cross(p);
    b.linear_velocity += p * b.inv_mass;
    b.angular_velocity += b.inv_inertia * r_b.cross(p);
}

/// Position counterpart of [`apply_impulse`], moving the sweeps directly
#[inline]
pub(crate) fn apply_position_impulse(a: &mut Body, r_a: Vec2, b: &mut Body, r_b: Vec2, p: Vec2) {
    a.sweep.c -= p * a.inv_mass;
    a.sweep.a -= a.inv_inertia * r_a.cross(p);
    b.sweep.c += p * b.inv_mass;
    b.sweep.a += b.inv_inertia * r_b.cross(p);
    a.synchronize_transform();
    b.synchronize_transform();
}
