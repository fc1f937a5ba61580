use crate::dynamics::{Arena, Body, BodyHandle, JointHandle, TimeStep};
use crate::error::{PhysicsError, Result};
use crate::math::{Transform, Vec2};

use super::{anchor_arm, Joint, JointKind};

/// Couples two revolute or prismatic joints so that
/// `coordinate1 + ratio * coordinate2 == constant`.
///
/// Both coupled joints must have a static body A. The gear connects their
/// B bodies.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GearJointDef {
    pub joint1: JointHandle,
    pub joint2: JointHandle,
    pub ratio: f32,
    pub collide_connected: bool,
}

impl GearJointDef {
    pub fn new(joint1: JointHandle, joint2: JointHandle, ratio: f32) -> Self {
        Self {
            joint1,
            joint2,
            ratio,
            collide_connected: false,
        }
    }
}

/// How one side of the gear measures its coordinate
#[derive(Debug, Clone, Copy, PartialEq)]
enum GearSide {
    Revolute {
        reference_angle: f32,
    },
    Prismatic {
        /// Anchor on the ground body
        ground_anchor: Vec2,
        /// Translation axis in the ground frame
        local_x_axis: Vec2,
    },
}

/// Velocity Jacobian for the scalar gear constraint
#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct Jacobian {
    linear_a: Vec2,
    angular_a: f32,
    linear_b: Vec2,
    angular_b: f32,
}

impl Jacobian {
    fn compute(&self, a: &Body, b: &Body) -> f32 {
        self.linear_a.dot(a.linear_velocity)
            + self.angular_a * a.angular_velocity
            + self.linear_b.dot(b.linear_velocity)
            + self.angular_b * b.angular_velocity
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GearJoint {
    pub(crate) body_a: BodyHandle,
    pub(crate) body_b: BodyHandle,
    pub(crate) local_anchor_a: Vec2,
    pub(crate) local_anchor_b: Vec2,

    joint1: JointHandle,
    joint2: JointHandle,
    ground1: BodyHandle,
    ground2: BodyHandle,
    side1: GearSide,
    side2: GearSide,
    // Ground poses, refreshed before each solve
    ground_xf1: Transform,
    ground_xf2: Transform,
    ground_angle1: f32,
    ground_angle2: f32,

    j: Jacobian,
    constant: f32,
    ratio: f32,
    mass: f32,
    impulse: f32,
}

impl GearJoint {
    pub(crate) fn new(
        def: &GearJointDef,
        bodies: &Arena<BodyHandle, Body>,
        joints: &Arena<JointHandle, Joint>,
    ) -> Result<Self> {
        let joint1 = joints.get(def.joint1).ok_or(PhysicsError::InvalidJoint(def.joint1.0))?;
        let joint2 = joints.get(def.joint2).ok_or(PhysicsError::InvalidJoint(def.joint2.0))?;

        let (side1, local_anchor_a) = Self::side_of(joint1)?;
        let (side2, local_anchor_b) = Self::side_of(joint2)?;

        let ground1 = bodies.get(joint1.body_a).ok_or(PhysicsError::InvalidBody(joint1.body_a.0))?;
        let ground2 = bodies.get(joint2.body_a).ok_or(PhysicsError::InvalidBody(joint2.body_a.0))?;
        if !ground1.is_static() || !ground2.is_static() {
            return Err(PhysicsError::InvalidJointDef("gear joint grounds must be static"));
        }
        let body_a = bodies.get(joint1.body_b).ok_or(PhysicsError::InvalidBody(joint1.body_b.0))?;
        let body_b = bodies.get(joint2.body_b).ok_or(PhysicsError::InvalidBody(joint2.body_b.0))?;

        let mut gear = Self {
            body_a: joint1.body_b,
            body_b: joint2.body_b,
            local_anchor_a,
            local_anchor_b,
            joint1: def.joint1,
            joint2: def.joint2,
            ground1: joint1.body_a,
            ground2: joint2.body_a,
            side1,
            side2,
            ground_xf1: *ground1.transform(),
            ground_xf2: *ground2.transform(),
            ground_angle1: ground1.sweep.a,
            ground_angle2: ground2.sweep.a,
            j: Jacobian::default(),
            constant: 0.0,
            ratio: def.ratio,
            mass: 0.0,
            impulse: 0.0,
        };

        let coordinate1 = gear.coordinate1(body_a);
        let coordinate2 = gear.coordinate2(body_b);
        gear.constant = coordinate1 + gear.ratio * coordinate2;
        Ok(gear)
    }

    fn side_of(joint: &Joint) -> Result<(GearSide, Vec2)> {
        match &joint.kind {
            JointKind::Revolute(r) => Ok((
                GearSide::Revolute {
                    reference_angle: r.reference_angle,
                },
                r.local_anchor_b,
            )),
            JointKind::Prismatic(p) => Ok((
                GearSide::Prismatic {
                    ground_anchor: p.local_anchor_a,
                    local_x_axis: p.local_x_axis,
                },
                p.local_anchor_b,
            )),
            _ => Err(PhysicsError::InvalidJointDef(
                "gear joints couple revolute or prismatic joints",
            )),
        }
    }

    #[inline]
    pub fn joint1(&self) -> JointHandle {
        self.joint1
    }

    #[inline]
    pub fn joint2(&self) -> JointHandle {
        self.joint2
    }

    #[inline]
    pub fn ratio(&self) -> f32 {
        self.ratio
    }

    pub fn set_ratio(&mut self, ratio: f32) {
        debug_assert!(ratio.is_finite());
        self.ratio = ratio;
    }

    pub fn reaction_force(&self, inv_dt: f32) -> Vec2 {
        self.j.linear_b * (inv_dt * self.impulse)
    }

    pub fn reaction_torque(&self, inv_dt: f32, b: &Body) -> f32 {
        let r = anchor_arm(b, self.local_anchor_b);
        let p = self.j.linear_b * self.impulse;
        let l = self.impulse * self.j.angular_b - r.cross(p);
        inv_dt * l
    }

    /// Caches the ground poses so solving only needs the two geared bodies
    pub(crate) fn sync_grounds(&mut self, bodies: &Arena<BodyHandle, Body>) {
        if let Some(g) = bodies.get(self.ground1) {
            self.ground_xf1 = *g.transform();
            self.ground_angle1 = g.sweep.a;
        }
        if let Some(g) = bodies.get(self.ground2) {
            self.ground_xf2 = *g.transform();
            self.ground_angle2 = g.sweep.a;
        }
    }

    fn coordinate(side: GearSide, ground_xf: &Transform, ground_angle: f32, body: &Body, local_anchor: Vec2) -> f32 {
        match side {
            GearSide::Revolute { reference_angle } => body.sweep.a - ground_angle - reference_angle,
            GearSide::Prismatic {
                ground_anchor,
                local_x_axis,
            } => {
                let p_a = ground_xf.transform_point(ground_anchor);
                let p_b = body.world_point(local_anchor);
                let axis = ground_xf.transform_vector(local_x_axis);
                (p_b - p_a).dot(axis)
            }
        }
    }

    fn coordinate1(&self, a: &Body) -> f32 {
        Self::coordinate(self.side1, &self.ground_xf1, self.ground_angle1, a, self.local_anchor_a)
    }

    fn coordinate2(&self, b: &Body) -> f32 {
        Self::coordinate(self.side2, &self.ground_xf2, self.ground_angle2, b, self.local_anchor_b)
    }

    pub(crate) fn init_velocity_constraints(&mut self, step: &TimeStep, a: &mut Body, b: &mut Body) {
        let mut k = 0.0;
        self.j = Jacobian::default();

        match self.side1 {
            GearSide::Revolute { .. } => {
                self.j.angular_a = -1.0;
                k += a.inv_inertia;
            }
            GearSide::Prismatic { local_x_axis, .. } => {
                let ug = self.ground_xf1.transform_vector(local_x_axis);
                let r = anchor_arm(a, self.local_anchor_a);
                let crug = r.cross(ug);
                self.j.linear_a = -ug;
                self.j.angular_a = -crug;
                k += a.inv_mass + a.inv_inertia * crug * crug;
            }
        }

        match self.side2 {
            GearSide::Revolute { .. } => {
                self.j.angular_b = -self.ratio;
                k += self.ratio * self.ratio * b.inv_inertia;
            }
            GearSide::Prismatic { local_x_axis, .. } => {
                let ug = self.ground_xf2.transform_vector(local_x_axis);
                let r = anchor_arm(b, self.local_anchor_b);
                let crug = r.cross(ug);
                self.j.linear_b = -ug * self.ratio;
                self.j.angular_b = -self.ratio * crug;
                k += self.ratio * self.ratio * (b.inv_mass + b.inv_inertia * crug * crug);
            }
        }

        self.mass = if k > 0.0 { 1.0 / k } else { 0.0 };

        if step.warm_starting {
            self.apply_velocity(a, b, self.impulse);
        } else {
            self.impulse = 0.0;
        }
    }

    fn apply_velocity(&self, a: &mut Body, b: &mut Body, impulse: f32) {
        a.linear_velocity += self.j.linear_a * (a.inv_mass * impulse);
        a.angular_velocity += a.inv_inertia * impulse * self.j.angular_a;
        b.linear_velocity += self.j.linear_b * (b.inv_mass * impulse);
        b.angular_velocity += b.inv_inertia * impulse * self.j.angular_b;
    }

    pub(crate) fn solve_velocity_constraints(&mut self, a: &mut Body, b: &mut Body) {
        let cdot = self.j.compute(a, b);
        let impulse = self.mass * -cdot;
        self.impulse += impulse;
        self.apply_velocity(a, b, impulse);
    }

    pub(crate) fn solve_position_constraints(&mut self, a: &mut Body, b: &mut Body) -> bool {
        let coordinate1 = self.coordinate1(a);
        let coordinate2 = self.coordinate2(b);

        let c = self.constant - (coordinate1 + self.ratio * coordinate2);
        let impulse = self.mass * -c;

        a.sweep.c += self.j.linear_a * (a.inv_mass * impulse);
        a.sweep.a += a.inv_inertia * impulse * self.j.angular_a;
        b.sweep.c += self.j.linear_b * (b.inv_mass * impulse);
        b.sweep.a += b.inv_inertia * impulse * self.j.angular_b;

        a.synchronize_transform();
        b.synchronize_transform();

        // Gear error is not tracked separately
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::joints::{JointDef, RevoluteJointDef};
    use crate::dynamics::BodyDef;
    use crate::geometry::MassData;
    use approx::assert_relative_eq;

    fn wheel(x: f32) -> Body {
        let mut body = Body::new(&BodyDef::dynamic().with_position(Vec2::new(x, 0.0)));
        body.set_mass_data(&MassData {
            mass: 1.0,
            center: Vec2::ZERO,
            inertia: 1.0,
        });
        body
    }

    fn setup(ratio: f32) -> (Arena<BodyHandle, Body>, GearJoint) {
        let mut bodies = Arena::new();
        let ground = bodies.insert(Body::new(&BodyDef::fixed()));
        let w1 = bodies.insert(wheel(0.0));
        let w2 = bodies.insert(wheel(3.0));

        let mut joints: Arena<JointHandle, Joint> = Arena::new();
        let def1 = RevoluteJointDef::initialize(ground, &bodies[ground], w1, &bodies[w1], Vec2::new(0.0, 0.0));
        let def2 = RevoluteJointDef::initialize(ground, &bodies[ground], w2, &bodies[w2], Vec2::new(3.0, 0.0));
        let j1 = joints.insert(Joint::new(&JointDef::from(def1), &bodies, &joints).unwrap());
        let j2 = joints.insert(Joint::new(&JointDef::from(def2), &bodies, &joints).unwrap());

        let gear = GearJoint::new(&GearJointDef::new(j1, j2, ratio), &bodies, &joints).unwrap();
        (bodies, gear)
    }

    #[test]
    fn test_gear_connects_driven_bodies() {
        let (_, gear) = setup(2.0);
        assert_eq!(gear.body_a, BodyHandle::new(1));
        assert_eq!(gear.body_b, BodyHandle::new(2));
    }

    #[test]
    fn test_velocity_follows_ratio() {
        let (mut bodies, mut gear) = setup(2.0);
        let (a, b) = bodies.pair_mut(gear.body_a, gear.body_b);
        a.set_angular_velocity(1.0);

        let step = TimeStep::new(1.0 / 60.0, 1.0, 8, 3, true);
        gear.init_velocity_constraints(&step, a, b);
        gear.solve_velocity_constraints(a, b);

        // w1 + ratio * w2 == 0
        let residual = a.angular_velocity() + 2.0 * b.angular_velocity();
        assert_relative_eq!(residual, 0.0, epsilon = 1e-5);
    }

    #[test]
    fn test_rejects_non_static_ground() {
        let mut bodies = Arena::new();
        let a = bodies.insert(wheel(0.0));
        let b = bodies.insert(wheel(1.0));
        let c = bodies.insert(wheel(2.0));
        let mut joints: Arena<JointHandle, Joint> = Arena::new();
        let j1 = joints.insert(
            Joint::new(&RevoluteJointDef::new(a, b).into(), &bodies, &joints).unwrap(),
        );
        let j2 = joints.insert(
            Joint::new(&RevoluteJointDef::new(a, c).into(), &bodies, &joints).unwrap(),
        );
        let result = GearJoint::new(&GearJointDef::new(j1, j2, 1.0), &bodies, &joints);
        assert!(matches!(result, Err(PhysicsError::InvalidJointDef(_))));
    }
}
