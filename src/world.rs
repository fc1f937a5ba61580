use std::collections::VecDeque;

use smallvec::SmallVec;
use tracing::{debug, trace, trace_span, warn};

use crate::constraints::{Joint, JointDef, JointKind};
use crate::dynamics::contacts::{Contact, ContactManager};
use crate::dynamics::debug_draw::palette;
use crate::dynamics::island::{Island, IslandContext};
use crate::dynamics::{
    Arena, Body, BodyDef, BodyHandle, BodyType, Color, ContactFilter, ContactHandle,
    ContactListener, Controller, ControllerDef, ControllerHandle, DebugDraw, DestructionListener,
    DrawFlags, FilterData, Fixture, FixtureDef, FixtureHandle, JointEdge, JointHandle, TimeStep,
};
use crate::error::{PhysicsError, Result};
use crate::geometry::{Aabb, MassData, RayCastInput, Shape, VertexList};
use crate::math::{Transform, Vec2};
use crate::settings::{LINEAR_SLOP, MAX_TOI, MAX_TOI_CONTACTS_PER_ISLAND, MAX_TOI_JOINTS_PER_ISLAND};

/// Configuration for the physics world
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WorldConfig {
    /// Gravity vector
    pub gravity: Vec2,
    /// Let resting islands go to sleep
    pub allow_sleep: bool,
    /// Seed the solver with last step's impulses
    pub warm_starting: bool,
    /// Run time of impact sub-stepping for fast and static contacts
    pub continuous_physics: bool,
    /// Velocity iterations used by [`World::step_default`]
    pub velocity_iterations: usize,
    /// Position iterations used by [`World::step_default`]
    pub position_iterations: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: Vec2::new(0.0, -10.0),
            allow_sleep: true,
            warm_starting: true,
            continuous_physics: true,
            velocity_iterations: 8,
            position_iterations: 3,
        }
    }
}

/// Result of a ray cast against the world
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayCastHit {
    /// The fixture that was hit
    pub fixture: FixtureHandle,
    /// World point of impact
    pub point: Vec2,
    /// Surface normal at the point of impact
    pub normal: Vec2,
    /// Fraction along the ray from `p1` to `p2`
    pub fraction: f32,
}

/// The physics world: owns every body, fixture, joint, contact and
/// controller, and advances the simulation.
pub struct World {
    /// Configuration
    config: WorldConfig,
    bodies: Arena<BodyHandle, Body>,
    /// Bodies in creation order
    body_list: Vec<BodyHandle>,
    fixtures: Arena<FixtureHandle, Fixture>,
    joints: Arena<JointHandle, Joint>,
    joint_list: Vec<JointHandle>,
    controllers: Arena<ControllerHandle, Controller>,
    controller_list: Vec<ControllerHandle>,
    /// Broad phase, contacts and contact callbacks
    contact_manager: ContactManager,
    destruction_listener: Option<Box<dyn DestructionListener>>,
    /// Scratch island reused across steps
    island: Island,
    /// Inverse of the previous step's dt, for warm-start scaling
    inv_dt0: f32,
    /// Fixtures were added since the last pair update
    new_fixture: bool,
    locked: bool,
}

impl Default for World {
    fn default() -> Self {
        Self::new(WorldConfig::default())
    }
}

impl World {
    /// Creates a new physics world with the given configuration
    pub fn new(config: WorldConfig) -> Self {
        Self {
            config,
            bodies: Arena::new(),
            body_list: Vec::new(),
            fixtures: Arena::new(),
            joints: Arena::new(),
            joint_list: Vec::new(),
            controllers: Arena::new(),
            controller_list: Vec::new(),
            contact_manager: ContactManager::new(),
            destruction_listener: None,
            island: Island::new(),
            inv_dt0: 0.0,
            new_fixture: false,
            locked: false,
        }
    }

    #[inline]
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    #[inline]
    pub fn gravity(&self) -> Vec2 {
        self.config.gravity
    }

    /// Sets the gravity vector
    pub fn set_gravity(&mut self, gravity: Vec2) {
        self.config.gravity = gravity;
    }

    pub fn set_warm_starting(&mut self, flag: bool) {
        self.config.warm_starting = flag;
    }

    pub fn set_continuous_physics(&mut self, flag: bool) {
        self.config.continuous_physics = flag;
    }

    /// Turning sleep off wakes every body
    pub fn set_allow_sleep(&mut self, flag: bool) {
        if self.config.allow_sleep == flag {
            return;
        }
        self.config.allow_sleep = flag;
        if !flag {
            for (_, body) in self.bodies.iter_mut() {
                body.set_awake(true);
            }
        }
    }

    /// Replaces the filter that decides which fixture pairs may collide
    pub fn set_contact_filter(&mut self, filter: impl ContactFilter + 'static) {
        self.contact_manager.filter = Box::new(filter);
    }

    /// Replaces the listener for contact begin/end and solver events
    pub fn set_contact_listener(&mut self, listener: impl ContactListener + 'static) {
        self.contact_manager.listener = Box::new(listener);
    }

    pub fn set_destruction_listener(&mut self, listener: impl DestructionListener + 'static) {
        self.destruction_listener = Some(Box::new(listener));
    }

    /// True while a step is running. Structural changes are rejected then.
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.locked
    }

    fn check_unlocked(&self, operation: &'static str) -> Result<()> {
        if self.locked {
            warn!(operation, "rejected while the world is locked");
            return Err(PhysicsError::WorldLocked);
        }
        Ok(())
    }

    // ---- bodies ----

    /// Creates a new body and returns its handle
    pub fn create_body(&mut self, def: &BodyDef) -> Result<BodyHandle> {
        self.check_unlocked("create_body")?;
        let handle = self.bodies.insert(Body::new(def));
        self.body_list.push(handle);
        debug!(body = handle.0, body_type = ?def.body_type, "body created");
        Ok(handle)
    }

    /// Destroys a body along with its joints, contacts and fixtures. The
    /// destruction listener is told about each joint and fixture.
    pub fn destroy_body(&mut self, handle: BodyHandle) -> Result<()> {
        self.check_unlocked("destroy_body")?;
        let body = self.bodies.get(handle).ok_or(PhysicsError::InvalidBody(handle.0))?;

        // Delete the attached joints
        let joints: SmallVec<[JointHandle; 4]> = body.joint_edges.iter().map(|edge| edge.joint).collect();
        for joint in joints {
            if let Some(listener) = self.destruction_listener.as_mut() {
                listener.say_goodbye_joint(joint);
            }
            self.remove_joint(joint);
        }

        // Detach from controllers
        let controllers = std::mem::take(&mut self.bodies[handle].controllers);
        for controller in controllers {
            if let Some(controller) = self.controllers.get_mut(controller) {
                controller.remove_body(handle);
            }
        }

        // Delete the attached contacts
        let contacts: SmallVec<[ContactHandle; 8]> =
            self.bodies[handle].contact_edges.iter().map(|edge| edge.contact).collect();
        for contact in contacts {
            self.contact_manager.destroy(contact, &mut self.bodies);
        }

        // Delete the attached fixtures, which destroys their proxies
        let fixtures = std::mem::take(&mut self.bodies[handle].fixtures);
        for fixture in fixtures {
            if let Some(listener) = self.destruction_listener.as_mut() {
                listener.say_goodbye_fixture(fixture);
            }
            if let Some(mut fixture) = self.fixtures.remove(fixture) {
                fixture.destroy_proxy(&mut self.contact_manager.broad_phase);
            }
        }

        self.bodies.remove(handle);
        self.body_list.retain(|&b| b != handle);
        debug!(body = handle.0, "body destroyed");
        Ok(())
    }

    /// Teleports a body. Contacts are updated on the next step.
    pub fn set_transform(&mut self, handle: BodyHandle, position: Vec2, angle: f32) -> Result<()> {
        self.check_unlocked("set_transform")?;
        let body = self.bodies.get_mut(handle).ok_or(PhysicsError::InvalidBody(handle.0))?;
        body.set_pose(position, angle);

        let body = &self.bodies[handle];
        let xf = body.xf;
        for &fixture in &body.fixtures {
            self.fixtures[fixture].synchronize(&mut self.contact_manager.broad_phase, &xf, &xf);
        }
        self.contact_manager.find_new_contacts(&mut self.bodies, &self.fixtures);
        Ok(())
    }

    /// Changes the body type. Mass is recomputed, the body is woken and its
    /// contacts are re-filtered.
    pub fn set_type(&mut self, handle: BodyHandle, body_type: BodyType) -> Result<()> {
        self.check_unlocked("set_type")?;
        let body = self.bodies.get_mut(handle).ok_or(PhysicsError::InvalidBody(handle.0))?;
        if body.body_type == body_type {
            return Ok(());
        }
        body.body_type = body_type;
        self.reset_body_mass(handle);

        let body = &mut self.bodies[handle];
        if body_type == BodyType::Static {
            body.linear_velocity = Vec2::ZERO;
            body.angular_velocity = 0.0;
        }
        body.set_awake(true);
        body.clear_forces();

        for edge in &body.contact_edges {
            self.contact_manager.contacts[edge.contact].flag_for_filtering();
        }
        Ok(())
    }

    /// Adds or removes a body from the simulation. An inactive body has no
    /// broad-phase proxies and no contacts, but keeps its fixtures and
    /// joints.
    pub fn set_active(&mut self, handle: BodyHandle, flag: bool) -> Result<()> {
        self.check_unlocked("set_active")?;
        let body = self.bodies.get_mut(handle).ok_or(PhysicsError::InvalidBody(handle.0))?;
        if body.active == flag {
            return Ok(());
        }
        body.active = flag;

        let xf = body.xf;
        let fixtures: SmallVec<[FixtureHandle; 4]> = body.fixtures.iter().copied().collect();
        let broad_phase = &mut self.contact_manager.broad_phase;
        if flag {
            for fixture in fixtures {
                self.fixtures[fixture].create_proxy(broad_phase, &xf, fixture);
            }
            self.new_fixture = true;
        } else {
            for fixture in fixtures {
                self.fixtures[fixture].destroy_proxy(broad_phase);
            }
            let contacts: SmallVec<[ContactHandle; 8]> =
                self.bodies[handle].contact_edges.iter().map(|edge| edge.contact).collect();
            for contact in contacts {
                self.contact_manager.destroy(contact, &mut self.bodies);
            }
        }
        Ok(())
    }

    /// Locks or unlocks rotation; mass data is recomputed
    pub fn set_fixed_rotation(&mut self, handle: BodyHandle, flag: bool) -> Result<()> {
        self.check_unlocked("set_fixed_rotation")?;
        let body = self.bodies.get_mut(handle).ok_or(PhysicsError::InvalidBody(handle.0))?;
        body.fixed_rotation = flag;
        self.reset_body_mass(handle);
        Ok(())
    }

    /// Recomputes mass, center and inertia from the body's fixtures
    pub fn reset_mass_data(&mut self, handle: BodyHandle) -> Result<()> {
        if !self.bodies.contains(handle) {
            return Err(PhysicsError::InvalidBody(handle.0));
        }
        self.reset_body_mass(handle);
        Ok(())
    }

    fn reset_body_mass(&mut self, handle: BodyHandle) {
        let fixtures = &self.fixtures;
        let masses: SmallVec<[MassData; 4]> = self.bodies[handle]
            .fixtures
            .iter()
            .map(|&f| &fixtures[f])
            .filter(|f| f.density > 0.0)
            .map(Fixture::mass_data)
            .collect();
        self.bodies[handle].reset_mass_data_from(masses);
    }

    // ---- fixtures ----

    /// Attaches a fixture to a body. Mass data is updated when the fixture
    /// has density, and new contacts are found at the start of the next
    /// step.
    pub fn create_fixture(&mut self, body: BodyHandle, def: &FixtureDef) -> Result<FixtureHandle> {
        self.check_unlocked("create_fixture")?;
        let b = self.bodies.get(body).ok_or(PhysicsError::InvalidBody(body.0))?;
        let (xf, active) = (b.xf, b.active);

        let handle = self.fixtures.insert(Fixture::new(body, def));
        if active {
            self.fixtures[handle].create_proxy(&mut self.contact_manager.broad_phase, &xf, handle);
        }
        self.bodies[body].fixtures.push(handle);

        if def.density > 0.0 {
            self.reset_body_mass(body);
        }
        self.new_fixture = true;
        Ok(handle)
    }

    /// Removes a fixture and its contacts, then recomputes the body's mass
    pub fn destroy_fixture(&mut self, handle: FixtureHandle) -> Result<()> {
        self.check_unlocked("destroy_fixture")?;
        let body = self.fixtures.get(handle).ok_or(PhysicsError::InvalidFixture(handle.0))?.body;

        let contacts = &self.contact_manager.contacts;
        let doomed: SmallVec<[ContactHandle; 8]> = self.bodies[body]
            .contact_edges
            .iter()
            .filter(|edge| {
                let c = &contacts[edge.contact];
                c.fixture_a == handle || c.fixture_b == handle
            })
            .map(|edge| edge.contact)
            .collect();
        for contact in doomed {
            self.contact_manager.destroy(contact, &mut self.bodies);
        }

        if let Some(mut fixture) = self.fixtures.remove(handle) {
            fixture.destroy_proxy(&mut self.contact_manager.broad_phase);
        }
        self.bodies[body].fixtures.retain(|&f| f != handle);
        self.reset_body_mass(body);
        Ok(())
    }

    /// Turns a fixture into a sensor or back. Existing contacts switch
    /// immediately.
    pub fn set_sensor(&mut self, handle: FixtureHandle, flag: bool) -> Result<()> {
        self.check_unlocked("set_sensor")?;
        let fixture = self.fixtures.get_mut(handle).ok_or(PhysicsError::InvalidFixture(handle.0))?;
        if fixture.is_sensor == flag {
            return Ok(());
        }
        fixture.is_sensor = flag;
        let body = fixture.body;

        for edge in &self.bodies[body].contact_edges {
            let contact = &mut self.contact_manager.contacts[edge.contact];
            if contact.fixture_a == handle || contact.fixture_b == handle {
                let sensor = self.fixtures[contact.fixture_a].is_sensor || self.fixtures[contact.fixture_b].is_sensor;
                contact.set_sensor(sensor);
            }
        }
        Ok(())
    }

    /// Replaces the collision filter; contacts are re-filtered next step
    pub fn set_filter_data(&mut self, handle: FixtureHandle, filter: FilterData) -> Result<()> {
        self.check_unlocked("set_filter_data")?;
        let fixture = self.fixtures.get_mut(handle).ok_or(PhysicsError::InvalidFixture(handle.0))?;
        fixture.filter = filter;
        let body = fixture.body;

        for edge in &self.bodies[body].contact_edges {
            let contact = &mut self.contact_manager.contacts[edge.contact];
            if contact.fixture_a == handle || contact.fixture_b == handle {
                contact.flag_for_filtering();
            }
        }
        Ok(())
    }

    // ---- joints ----

    /// Creates a joint. Contacts between the two bodies are re-filtered
    /// when the joint disables collision.
    pub fn create_joint(&mut self, def: &JointDef) -> Result<JointHandle> {
        self.check_unlocked("create_joint")?;
        let joint = Joint::new(def, &self.bodies, &self.joints)?;
        let (body_a, body_b, collide_connected) = (joint.body_a, joint.body_b, joint.collide_connected);
        let joint_type = joint.joint_type();

        let handle = self.joints.insert(joint);
        self.joint_list.push(handle);

        self.bodies[body_a].joint_edges.push(JointEdge {
            joint: handle,
            other: body_b,
            collide_connected,
        });
        self.bodies[body_b].joint_edges.push(JointEdge {
            joint: handle,
            other: body_a,
            collide_connected,
        });

        if !collide_connected {
            self.flag_contacts_between(body_a, body_b);
        }

        debug!(joint = handle.0, ?joint_type, "joint created");
        Ok(handle)
    }

    /// Destroys a joint and wakes its bodies
    pub fn destroy_joint(&mut self, handle: JointHandle) -> Result<()> {
        self.check_unlocked("destroy_joint")?;
        self.remove_joint(handle).ok_or(PhysicsError::InvalidJoint(handle.0))?;
        debug!(joint = handle.0, "joint destroyed");
        Ok(())
    }

    fn remove_joint(&mut self, handle: JointHandle) -> Option<Joint> {
        let joint = self.joints.remove(handle)?;
        self.joint_list.retain(|&j| j != handle);

        for body in [joint.body_a, joint.body_b] {
            if let Some(body) = self.bodies.get_mut(body) {
                body.set_awake(true);
                body.joint_edges.retain(|edge| edge.joint != handle);
            }
        }

        if !joint.collide_connected {
            self.flag_contacts_between(joint.body_a, joint.body_b);
        }
        Some(joint)
    }

    fn flag_contacts_between(&mut self, body_a: BodyHandle, body_b: BodyHandle) {
        let Some(body) = self.bodies.get(body_b) else {
            return;
        };
        for edge in &body.contact_edges {
            if edge.other == body_a {
                self.contact_manager.contacts[edge.contact].flag_for_filtering();
            }
        }
    }

    /// Moves a mouse joint's target and wakes the dragged body
    pub fn set_mouse_target(&mut self, handle: JointHandle, target: Vec2) -> Result<()> {
        let joint = self.joints.get_mut(handle).ok_or(PhysicsError::InvalidJoint(handle.0))?;
        let JointKind::Mouse(mouse) = &mut joint.kind else {
            return Err(PhysicsError::InvalidJoint(handle.0));
        };
        mouse.set_target(target);
        self.bodies[joint.body_b].set_awake(true);
        Ok(())
    }

    /// Wakes both bodies of a joint, after changing a motor or limit
    pub fn wake_joint(&mut self, handle: JointHandle) -> Result<()> {
        let joint = self.joints.get(handle).ok_or(PhysicsError::InvalidJoint(handle.0))?;
        let (a, b) = (joint.body_a, joint.body_b);
        self.bodies[a].set_awake(true);
        self.bodies[b].set_awake(true);
        Ok(())
    }

    // ---- controllers ----

    pub fn create_controller(&mut self, def: impl Into<ControllerDef>) -> Result<ControllerHandle> {
        self.check_unlocked("create_controller")?;
        let handle = self.controllers.insert(Controller::new(def.into()));
        self.controller_list.push(handle);
        debug!(controller = handle.0, "controller created");
        Ok(handle)
    }

    /// Destroys a controller; its bodies are detached, not destroyed
    pub fn destroy_controller(&mut self, handle: ControllerHandle) -> Result<()> {
        self.check_unlocked("destroy_controller")?;
        let controller = self.controllers.remove(handle).ok_or(PhysicsError::InvalidController(handle.0))?;
        for body in controller.bodies {
            if let Some(body) = self.bodies.get_mut(body) {
                body.controllers.retain(|&c| c != handle);
            }
        }
        self.controller_list.retain(|&c| c != handle);
        debug!(controller = handle.0, "controller destroyed");
        Ok(())
    }

    /// Puts a body under a controller. Adding it twice has no effect.
    pub fn add_controller_body(&mut self, controller: ControllerHandle, body: BodyHandle) -> Result<()> {
        self.check_unlocked("add_controller_body")?;
        let c = self.controllers.get_mut(controller).ok_or(PhysicsError::InvalidController(controller.0))?;
        let b = self.bodies.get_mut(body).ok_or(PhysicsError::InvalidBody(body.0))?;
        if c.add_body(body) {
            b.controllers.push(controller);
        }
        Ok(())
    }

    pub fn remove_controller_body(&mut self, controller: ControllerHandle, body: BodyHandle) -> Result<()> {
        self.check_unlocked("remove_controller_body")?;
        let c = self.controllers.get_mut(controller).ok_or(PhysicsError::InvalidController(controller.0))?;
        let b = self.bodies.get_mut(body).ok_or(PhysicsError::InvalidBody(body.0))?;
        if c.remove_body(body) {
            b.controllers.retain(|&h| h != controller);
        }
        Ok(())
    }

    /// Detaches every body from a controller
    pub fn clear_controller(&mut self, controller: ControllerHandle) -> Result<()> {
        self.check_unlocked("clear_controller")?;
        let c = self.controllers.get_mut(controller).ok_or(PhysicsError::InvalidController(controller.0))?;
        for body in std::mem::take(&mut c.bodies) {
            if let Some(body) = self.bodies.get_mut(body) {
                body.controllers.retain(|&h| h != controller);
            }
        }
        Ok(())
    }

    // ---- stepping ----

    /// Advances the simulation by `dt` seconds: collide, solve islands,
    /// then sub-step time of impact events.
    pub fn step(&mut self, dt: f32, velocity_iterations: usize, position_iterations: usize) {
        let _span = trace_span!("step", dt).entered();

        // New fixtures need their pairs before collision
        if self.new_fixture {
            self.contact_manager.find_new_contacts(&mut self.bodies, &self.fixtures);
            self.new_fixture = false;
        }

        self.locked = true;

        let step = TimeStep::new(
            dt,
            self.inv_dt0 * dt,
            velocity_iterations,
            position_iterations,
            self.config.warm_starting,
        );

        trace!("collide");
        self.contact_manager.collide(&mut self.bodies, &self.fixtures);

        if step.dt > 0.0 {
            self.solve(&step);

            if self.config.continuous_physics {
                self.solve_toi(&step);
            }
            self.inv_dt0 = step.inv_dt;
        }

        self.locked = false;
    }

    /// Steps with the configured iteration counts
    pub fn step_default(&mut self, dt: f32) {
        let (velocity_iterations, position_iterations) =
            (self.config.velocity_iterations, self.config.position_iterations);
        self.step(dt, velocity_iterations, position_iterations);
    }

    /// Zeroes the force and torque accumulated on every body
    pub fn clear_forces(&mut self) {
        for (_, body) in self.bodies.iter_mut() {
            body.clear_forces();
        }
    }

    fn solve(&mut self, step: &TimeStep) {
        let gravity = self.config.gravity;

        for &handle in &self.controller_list {
            self.controllers[handle].step(step, gravity, &mut self.bodies, &self.fixtures);
        }

        for (_, body) in self.bodies.iter_mut() {
            body.island = false;
        }
        for (_, contact) in self.contact_manager.contacts.iter_mut() {
            contact.island = false;
        }
        for (_, joint) in self.joints.iter_mut() {
            joint.island = false;
        }

        let mut island = std::mem::take(&mut self.island);
        let mut stack: Vec<BodyHandle> = Vec::with_capacity(self.body_list.len());
        let mut island_count = 0usize;

        for seed_index in 0..self.body_list.len() {
            let seed = self.body_list[seed_index];
            {
                let body = &self.bodies[seed];
                if body.island || !body.awake || !body.active || body.body_type == BodyType::Static {
                    continue;
                }
            }

            // Depth first search over the constraint graph
            island.clear();
            stack.clear();
            stack.push(seed);
            self.bodies[seed].island = true;

            while let Some(handle) = stack.pop() {
                island.add_body(handle);

                let body = &mut self.bodies[handle];
                body.set_awake(true);

                // Static bodies do not propagate islands
                if body.body_type == BodyType::Static {
                    continue;
                }

                for edge_index in 0..self.bodies[handle].contact_edges.len() {
                    let edge = self.bodies[handle].contact_edges[edge_index];
                    let contact = &mut self.contact_manager.contacts[edge.contact];
                    if contact.island || !contact.is_solid_touching() {
                        continue;
                    }
                    island.add_contact(edge.contact);
                    contact.island = true;

                    let other = &mut self.bodies[edge.other];
                    if other.island {
                        continue;
                    }
                    other.island = true;
                    stack.push(edge.other);
                }

                for edge_index in 0..self.bodies[handle].joint_edges.len() {
                    let edge = self.bodies[handle].joint_edges[edge_index];
                    let joint = &mut self.joints[edge.joint];
                    if joint.island || !self.bodies[edge.other].active {
                        continue;
                    }
                    island.add_joint(edge.joint);
                    joint.island = true;

                    let other = &mut self.bodies[edge.other];
                    if other.island {
                        continue;
                    }
                    other.island = true;
                    stack.push(edge.other);
                }
            }

            let mut ctx = IslandContext {
                bodies: &mut self.bodies,
                fixtures: &self.fixtures,
                contacts: &mut self.contact_manager.contacts,
                joints: &mut self.joints,
                listener: self.contact_manager.listener.as_mut(),
            };
            island.solve(step, gravity, self.config.allow_sleep, &mut ctx);
            island_count += 1;

            // Static bodies may take part in other islands
            for &handle in &island.bodies {
                let body = &mut self.bodies[handle];
                if body.body_type == BodyType::Static {
                    body.island = false;
                }
            }
        }
        self.island = island;

        // Bodies that were solved moved, so their proxies must follow
        for index in 0..self.body_list.len() {
            let handle = self.body_list[index];
            let body = &self.bodies[handle];
            if body.island && body.body_type != BodyType::Static {
                self.synchronize_fixtures(handle);
            }
        }

        self.contact_manager.find_new_contacts(&mut self.bodies, &self.fixtures);
        trace!(islands = island_count, "solve");
    }

    fn solve_toi(&mut self, step: &TimeStep) {
        for (_, body) in self.bodies.iter_mut() {
            body.island = false;
            body.sweep.t0 = 0.0;
        }
        for (_, contact) in self.contact_manager.contacts.iter_mut() {
            contact.island = false;
            contact.toi = None;
        }
        for (_, joint) in self.joints.iter_mut() {
            joint.island = false;
        }

        let mut island = std::mem::take(&mut self.island);
        let mut queue: VecDeque<BodyHandle> = VecDeque::new();
        let mut toi_events = 0usize;

        loop {
            // Find the earliest time of impact among continuous contacts
            let Some((min_contact, min_toi)) = self.find_min_toi() else {
                break;
            };
            if min_toi > MAX_TOI {
                break;
            }

            let (body_a, body_b) = {
                let contact = &self.contact_manager.contacts[min_contact];
                (contact.body_a, contact.body_b)
            };
            let backup_a = self.bodies[body_a].sweep;
            let backup_b = self.bodies[body_b].sweep;

            self.bodies[body_a].advance(min_toi);
            self.bodies[body_b].advance(min_toi);

            // The contact likely has some new contact points
            let manager = &mut self.contact_manager;
            manager.contacts[min_contact].update(&self.fixtures, &mut self.bodies, manager.listener.as_mut());
            let contact = &mut manager.contacts[min_contact];
            contact.toi = None;

            if contact.sensor || !contact.enabled {
                // Restore the sweeps
                let a = &mut self.bodies[body_a];
                a.sweep = backup_a;
                a.synchronize_transform();
                let b = &mut self.bodies[body_b];
                b.sweep = backup_b;
                b.synchronize_transform();
                continue;
            }

            // The contact may have separated while advancing
            if !contact.touching {
                continue;
            }

            // Build a small island around the dynamic body with breadth
            // first search
            let seed = if self.bodies[body_a].body_type == BodyType::Dynamic {
                body_a
            } else {
                body_b
            };

            island.clear();
            queue.clear();
            queue.push_back(seed);
            self.bodies[seed].island = true;

            while let Some(handle) = queue.pop_front() {
                island.add_body(handle);

                let body = &mut self.bodies[handle];
                body.set_awake(true);

                // Only dynamic bodies propagate
                if body.body_type != BodyType::Dynamic {
                    continue;
                }

                for edge_index in 0..self.bodies[handle].contact_edges.len() {
                    if island.contacts.len() == MAX_TOI_CONTACTS_PER_ISLAND {
                        break;
                    }
                    let edge = self.bodies[handle].contact_edges[edge_index];
                    let contact = &mut self.contact_manager.contacts[edge.contact];
                    if contact.island || !contact.is_solid_touching() {
                        continue;
                    }
                    island.add_contact(edge.contact);
                    contact.island = true;

                    let other = &mut self.bodies[edge.other];
                    if other.island {
                        continue;
                    }
                    if other.body_type != BodyType::Static {
                        other.advance(min_toi);
                        other.set_awake(true);
                        queue.push_back(edge.other);
                    }
                    other.island = true;
                }

                for edge_index in 0..self.bodies[handle].joint_edges.len() {
                    if island.joints.len() == MAX_TOI_JOINTS_PER_ISLAND {
                        break;
                    }
                    let edge = self.bodies[handle].joint_edges[edge_index];
                    let joint = &mut self.joints[edge.joint];
                    if joint.island || !self.bodies[edge.other].active {
                        continue;
                    }
                    island.add_joint(edge.joint);
                    joint.island = true;

                    let other = &mut self.bodies[edge.other];
                    if other.island {
                        continue;
                    }
                    if other.body_type != BodyType::Static {
                        other.advance(min_toi);
                        other.set_awake(true);
                        queue.push_back(edge.other);
                    }
                    other.island = true;
                }
            }

            let sub_step = TimeStep::new(
                (1.0 - min_toi) * step.dt,
                0.0,
                step.velocity_iterations,
                step.position_iterations,
                false,
            );
            let mut ctx = IslandContext {
                bodies: &mut self.bodies,
                fixtures: &self.fixtures,
                contacts: &mut self.contact_manager.contacts,
                joints: &mut self.joints,
                listener: self.contact_manager.listener.as_mut(),
            };
            island.solve_toi(&sub_step, &mut ctx);
            toi_events += 1;
            debug!(toi = min_toi, bodies = island.bodies.len(), "toi event solved");

            // Reset island flags and synchronize broad-phase proxies
            for &handle in &island.bodies {
                let body = &mut self.bodies[handle];
                body.island = false;
                if !body.awake || body.body_type != BodyType::Dynamic {
                    continue;
                }
                self.synchronize_fixtures(handle);

                // Contacts of moved bodies need a fresh TOI
                for edge in &self.bodies[handle].contact_edges {
                    self.contact_manager.contacts[edge.contact].toi = None;
                }
            }
            for &handle in &island.contacts {
                let contact = &mut self.contact_manager.contacts[handle];
                contact.island = false;
                contact.toi = None;
            }
            for &handle in &island.joints {
                self.joints[handle].island = false;
            }

            // Commit fixture proxy movements to the broad phase so new
            // contacts are created
            self.contact_manager.find_new_contacts(&mut self.bodies, &self.fixtures);
        }

        self.island = island;
        trace!(toi_events, "solve_toi");
    }

    /// Earliest TOI over all continuous contacts, caching each contact's
    /// result until one of its bodies moves.
    fn find_min_toi(&mut self) -> Option<(ContactHandle, f32)> {
        let mut min_contact = None;
        let mut min_toi = 1.0;

        for index in 0..self.contact_manager.contact_list.len() {
            let handle = self.contact_manager.contact_list[index];
            let contact = &self.contact_manager.contacts[handle];
            if contact.sensor || !contact.enabled || !contact.continuous {
                continue;
            }

            let (body_a, body_b) = (contact.body_a, contact.body_b);
            let moving = |body: &Body| body.body_type == BodyType::Dynamic && body.awake;
            if !moving(&self.bodies[body_a]) && !moving(&self.bodies[body_b]) {
                continue;
            }

            let toi = if let Some(toi) = contact.toi {
                toi
            } else if contact.touching {
                // Touching contacts are handled by the discrete solver
                1.0
            } else {
                let (a, b) = self.bodies.pair_mut(body_a, body_b);

                // Put the sweeps onto the same time interval
                let mut t0 = a.sweep.t0;
                if a.sweep.t0 < b.sweep.t0 {
                    t0 = b.sweep.t0;
                    a.sweep.advance(t0);
                } else if b.sweep.t0 < a.sweep.t0 {
                    b.sweep.advance(t0);
                }

                let mut toi = contact.compute_toi(&self.fixtures, &a.sweep, &b.sweep);
                debug_assert!((0.0..=1.0).contains(&toi));

                // Map the fraction of the remaining interval back to the step
                if toi > 0.0 && toi < 1.0 {
                    toi = (1.0 - toi) * t0 + toi;
                }
                toi
            };
            self.contact_manager.contacts[handle].toi = Some(toi);

            if f32::EPSILON < toi && toi < min_toi {
                min_contact = Some(handle);
                min_toi = toi;
            }
        }

        min_contact.map(|handle| (handle, min_toi))
    }

    /// Moves a body's proxies to cover its motion over the last step
    fn synchronize_fixtures(&mut self, handle: BodyHandle) {
        let body = &self.bodies[handle];
        let xf1 = body.transform0();
        let xf2 = body.xf;
        for &fixture in &body.fixtures {
            self.fixtures[fixture].synchronize(&mut self.contact_manager.broad_phase, &xf1, &xf2);
        }
    }

    // ---- queries ----

    /// Calls `callback` for every fixture whose fat AABB overlaps `aabb`.
    /// Return false from the callback to stop.
    pub fn query_aabb<F>(&self, aabb: &Aabb, mut callback: F)
    where
        F: FnMut(FixtureHandle) -> bool,
    {
        let broad_phase = &self.contact_manager.broad_phase;
        broad_phase.query(aabb, |proxy| match broad_phase.user_data(proxy) {
            Some(fixture) => callback(fixture),
            None => true,
        });
    }

    /// Calls `callback` for every fixture containing `point`
    pub fn query_point<F>(&self, point: Vec2, mut callback: F)
    where
        F: FnMut(FixtureHandle) -> bool,
    {
        let slop = Vec2::new(LINEAR_SLOP, LINEAR_SLOP);
        let aabb = Aabb::new(point - slop, point + slop);
        self.query_aabb(&aabb, |handle| {
            let fixture = &self.fixtures[handle];
            if fixture.test_point(&self.bodies[fixture.body].xf, point) {
                callback(handle)
            } else {
                true
            }
        });
    }

    /// Casts a ray from `p1` to `p2`. The callback receives the fixture,
    /// point, normal and fraction of each hit and returns the new maximum
    /// fraction: 0 stops the cast, the hit fraction clips the ray to the
    /// closest hit so far, and 1 continues unclipped.
    pub fn ray_cast<F>(&self, p1: Vec2, p2: Vec2, mut callback: F)
    where
        F: FnMut(FixtureHandle, Vec2, Vec2, f32) -> f32,
    {
        let input = RayCastInput::new(p1, p2);
        let broad_phase = &self.contact_manager.broad_phase;
        broad_phase.ray_cast(&input, |sub_input, proxy| {
            let Some(handle) = broad_phase.user_data(proxy) else {
                return sub_input.max_fraction;
            };
            let fixture = &self.fixtures[handle];
            match fixture.ray_cast(sub_input, &self.bodies[fixture.body].xf) {
                Some(output) => {
                    let point = p1 * (1.0 - output.fraction) + p2 * output.fraction;
                    callback(handle, point, output.normal, output.fraction)
                }
                None => sub_input.max_fraction,
            }
        });
    }

    /// Closest hit along the ray
    pub fn ray_cast_one(&self, p1: Vec2, p2: Vec2) -> Option<RayCastHit> {
        let mut result = None;
        self.ray_cast(p1, p2, |fixture, point, normal, fraction| {
            result = Some(RayCastHit {
                fixture,
                point,
                normal,
                fraction,
            });
            fraction
        });
        result
    }

    /// Every hit along the ray, in traversal order
    pub fn ray_cast_all(&self, p1: Vec2, p2: Vec2) -> Vec<RayCastHit> {
        let mut result = Vec::new();
        self.ray_cast(p1, p2, |fixture, point, normal, fraction| {
            result.push(RayCastHit {
                fixture,
                point,
                normal,
                fraction,
            });
            1.0
        });
        result
    }

    // ---- debug draw ----

    /// Renders the parts of the world selected by `flags`
    pub fn draw_debug_data(&self, drawer: &mut dyn DebugDraw, flags: DrawFlags) {
        if flags.contains(DrawFlags::SHAPE) {
            for (_, body) in self.bodies() {
                let color = if !body.active {
                    palette::INACTIVE
                } else if body.body_type == BodyType::Static {
                    palette::STATIC
                } else if body.body_type == BodyType::Kinematic {
                    palette::KINEMATIC
                } else if !body.awake {
                    palette::SLEEPING
                } else {
                    palette::AWAKE
                };
                for &fixture in &body.fixtures {
                    draw_shape(drawer, &self.fixtures[fixture].shape, &body.xf, color);
                }
            }
        }

        if flags.contains(DrawFlags::JOINT) {
            for (_, joint) in self.joints() {
                self.draw_joint(drawer, joint);
            }
        }

        if flags.contains(DrawFlags::CONTROLLER) {
            for (_, controller) in self.controllers() {
                controller.draw(drawer);
            }
        }

        if flags.contains(DrawFlags::PAIR) {
            for (_, contact) in self.contacts() {
                let center_a = self.fixtures[contact.fixture_a].aabb.center();
                let center_b = self.fixtures[contact.fixture_b].aabb.center();
                drawer.draw_segment(center_a, center_b, palette::PAIR);
            }
        }

        if flags.contains(DrawFlags::AABB) {
            let broad_phase = &self.contact_manager.broad_phase;
            for (_, body) in self.bodies().filter(|(_, b)| b.active) {
                for &fixture in &body.fixtures {
                    let Some(proxy) = self.fixtures[fixture].proxy else {
                        continue;
                    };
                    let aabb = broad_phase.fat_aabb(proxy);
                    let vertices = [
                        aabb.lower,
                        Vec2::new(aabb.upper.x, aabb.lower.y),
                        aabb.upper,
                        Vec2::new(aabb.lower.x, aabb.upper.y),
                    ];
                    drawer.draw_polygon(&vertices, palette::AABB);
                }
            }
        }

        if flags.contains(DrawFlags::CENTER_OF_MASS) {
            for (_, body) in self.bodies() {
                let mut xf = body.xf;
                xf.position = body.world_center();
                drawer.draw_transform(&xf);
            }
        }
    }

    fn draw_joint(&self, drawer: &mut dyn DebugDraw, joint: &Joint) {
        let anchor_a = joint.anchor_a(&self.bodies);
        let anchor_b = joint.anchor_b(&self.bodies);
        let color = palette::JOINT;

        match &joint.kind {
            JointKind::Distance(_) | JointKind::Mouse(_) => {
                drawer.draw_segment(anchor_a, anchor_b, color);
            }
            JointKind::Pulley(pulley) => {
                let ground_a = pulley.ground_anchor_a();
                let ground_b = pulley.ground_anchor_b();
                drawer.draw_segment(ground_a, anchor_a, color);
                drawer.draw_segment(ground_b, anchor_b, color);
                drawer.draw_segment(ground_a, ground_b, color);
            }
            _ => {
                let x1 = self.bodies[joint.body_a].xf.position;
                let x2 = self.bodies[joint.body_b].xf.position;
                drawer.draw_segment(x1, anchor_a, color);
                drawer.draw_segment(anchor_a, anchor_b, color);
                drawer.draw_segment(x2, anchor_b, color);
            }
        }
    }

    // ---- accessors ----

    /// Returns the body. Panics on a stale handle.
    #[inline]
    pub fn body(&self, handle: BodyHandle) -> &Body {
        &self.bodies[handle]
    }

    #[inline]
    pub fn body_mut(&mut self, handle: BodyHandle) -> &mut Body {
        &mut self.bodies[handle]
    }

    #[inline]
    pub fn get_body(&self, handle: BodyHandle) -> Option<&Body> {
        self.bodies.get(handle)
    }

    #[inline]
    pub fn get_body_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        self.bodies.get_mut(handle)
    }

    #[inline]
    pub fn fixture(&self, handle: FixtureHandle) -> &Fixture {
        &self.fixtures[handle]
    }

    /// Friction, restitution and density can be changed in place; call
    /// [`World::reset_mass_data`] after changing density.
    #[inline]
    pub fn fixture_mut(&mut self, handle: FixtureHandle) -> &mut Fixture {
        &mut self.fixtures[handle]
    }

    #[inline]
    pub fn get_fixture(&self, handle: FixtureHandle) -> Option<&Fixture> {
        self.fixtures.get(handle)
    }

    #[inline]
    pub fn joint(&self, handle: JointHandle) -> &Joint {
        &self.joints[handle]
    }

    #[inline]
    pub fn joint_mut(&mut self, handle: JointHandle) -> &mut Joint {
        &mut self.joints[handle]
    }

    #[inline]
    pub fn get_joint(&self, handle: JointHandle) -> Option<&Joint> {
        self.joints.get(handle)
    }

    #[inline]
    pub fn contact(&self, handle: ContactHandle) -> &Contact {
        &self.contact_manager.contacts[handle]
    }

    #[inline]
    pub fn get_contact(&self, handle: ContactHandle) -> Option<&Contact> {
        self.contact_manager.contacts.get(handle)
    }

    #[inline]
    pub fn controller(&self, handle: ControllerHandle) -> &Controller {
        &self.controllers[handle]
    }

    #[inline]
    pub fn controller_mut(&mut self, handle: ControllerHandle) -> &mut Controller {
        &mut self.controllers[handle]
    }

    #[inline]
    pub fn get_controller(&self, handle: ControllerHandle) -> Option<&Controller> {
        self.controllers.get(handle)
    }

    /// Bodies in creation order
    pub fn bodies(&self) -> impl Iterator<Item = (BodyHandle, &Body)> {
        self.body_list.iter().map(move |&h| (h, &self.bodies[h]))
    }

    /// Joints in creation order
    pub fn joints(&self) -> impl Iterator<Item = (JointHandle, &Joint)> {
        self.joint_list.iter().map(move |&h| (h, &self.joints[h]))
    }

    /// Live contacts in creation order, touching or not
    pub fn contacts(&self) -> impl Iterator<Item = (ContactHandle, &Contact)> {
        let contacts = &self.contact_manager.contacts;
        self.contact_manager.contact_list.iter().map(move |&h| (h, &contacts[h]))
    }

    pub fn controllers(&self) -> impl Iterator<Item = (ControllerHandle, &Controller)> {
        self.controller_list.iter().map(move |&h| (h, &self.controllers[h]))
    }

    #[inline]
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    #[inline]
    pub fn fixture_count(&self) -> usize {
        self.fixtures.len()
    }

    #[inline]
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    #[inline]
    pub fn contact_count(&self) -> usize {
        self.contact_manager.contact_count()
    }

    #[inline]
    pub fn controller_count(&self) -> usize {
        self.controllers.len()
    }

    /// Number of broad-phase proxies
    #[inline]
    pub fn proxy_count(&self) -> usize {
        self.contact_manager.broad_phase.proxy_count()
    }

    /// Height of the broad-phase tree
    #[inline]
    pub fn tree_height(&self) -> usize {
        self.contact_manager.broad_phase.tree().height()
    }
}

fn draw_shape(drawer: &mut dyn DebugDraw, shape: &Shape, xf: &Transform, color: Color) {
    match shape {
        Shape::Circle(circle) => {
            let center = xf.transform_point(circle.position);
            drawer.draw_solid_circle(center, circle.radius, xf.r.col1, color);
        }
        Shape::Polygon(polygon) => {
            let vertices: VertexList = polygon.vertices().iter().map(|&v| xf.transform_point(v)).collect();
            drawer.draw_solid_polygon(&vertices, color);
        }
        Shape::Edge(edge) => {
            drawer.draw_segment(xf.transform_point(edge.vertex1()), xf.transform_point(edge.vertex2()), color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::joints::{DistanceJointDef, RevoluteJointDef};
    use crate::dynamics::{ConstantAccelController, ContactImpulse};
    use approx::assert_relative_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn world_with_ground() -> (World, BodyHandle) {
        let mut world = World::default();
        let ground = world.create_body(&BodyDef::fixed()).unwrap();
        world
            .create_fixture(ground, &FixtureDef::new(Shape::cuboid(10.0, 0.5)))
            .unwrap();
        (world, ground)
    }

    fn add_box(world: &mut World, position: Vec2) -> BodyHandle {
        let body = world.create_body(&BodyDef::dynamic().with_position(position)).unwrap();
        world
            .create_fixture(body, &FixtureDef::new(Shape::cuboid(0.5, 0.5)).with_density(1.0))
            .unwrap();
        body
    }

    #[test]
    fn test_world_creation() {
        let world = World::default();
        assert_eq!(world.body_count(), 0);
        assert_eq!(world.gravity(), Vec2::new(0.0, -10.0));
        assert!(!world.is_locked());
    }

    #[test]
    fn test_create_body() {
        let mut world = World::default();
        let handle = world
            .create_body(&BodyDef::dynamic().with_position(Vec2::new(0.0, 5.0)))
            .unwrap();
        assert_eq!(world.body_count(), 1);
        assert_eq!(world.body(handle).position(), Vec2::new(0.0, 5.0));
    }

    #[test]
    fn test_gravity_simulation() {
        let mut world = World::default();
        let handle = add_box(&mut world, Vec2::new(0.0, 10.0));

        for _ in 0..60 {
            world.step_default(1.0 / 60.0);
        }

        let body = world.body(handle);
        assert!(body.position().y < 10.0);
        assert_relative_eq!(body.linear_velocity().y, -10.0, epsilon = 1e-3);
        assert!(!world.is_locked());
    }

    #[test]
    fn test_box_settles_on_ground() {
        let (mut world, _) = world_with_ground();
        let body = add_box(&mut world, Vec2::new(0.0, 2.0));

        let mut slept = false;
        for _ in 0..300 {
            world.step_default(1.0 / 60.0);
            if !world.body(body).is_awake() {
                slept = true;
                break;
            }
        }

        assert!(slept, "box never fell asleep");
        let body = world.body(body);
        // Ground top at 0.5, box half-height 0.5, plus the polygon skins
        assert!((body.position().y - 1.0).abs() < 0.03, "y = {}", body.position().y);
        assert!(body.linear_velocity().length() < 1e-3);
    }

    #[test]
    fn test_box_stack() {
        let (mut world, _) = world_with_ground();
        let boxes: Vec<_> = (0..3)
            .map(|i| add_box(&mut world, Vec2::new(0.0, 1.0 + i as f32 * 1.05)))
            .collect();

        for _ in 0..300 {
            world.step_default(1.0 / 60.0);
        }

        for (i, &handle) in boxes.iter().enumerate() {
            let pos = world.body(handle).position();
            let expected = 1.0 + i as f32;
            assert!((pos.y - expected).abs() < 0.1, "box {} at y={}", i, pos.y);
            assert!(pos.x.abs() < 0.1, "box {} drifted: x={}", i, pos.x);
        }
    }

    #[test]
    fn test_destroy_body_cleans_up() {
        #[derive(Default)]
        struct Goodbyes {
            joints: usize,
            fixtures: usize,
        }
        struct Listener(Rc<RefCell<Goodbyes>>);
        impl DestructionListener for Listener {
            fn say_goodbye_joint(&mut self, _joint: JointHandle) {
                self.0.borrow_mut().joints += 1;
            }
            fn say_goodbye_fixture(&mut self, _fixture: FixtureHandle) {
                self.0.borrow_mut().fixtures += 1;
            }
        }

        let (mut world, ground) = world_with_ground();
        let goodbyes = Rc::new(RefCell::new(Goodbyes::default()));
        world.set_destruction_listener(Listener(goodbyes.clone()));

        let body = add_box(&mut world, Vec2::new(0.0, 1.0));
        let joint_def = RevoluteJointDef::initialize(ground, world.body(ground), body, world.body(body), Vec2::new(0.0, 1.0));
        world.create_joint(&joint_def.into()).unwrap();
        let controller = world.create_controller(ConstantAccelController::new(Vec2::X)).unwrap();
        world.add_controller_body(controller, body).unwrap();

        world.step_default(1.0 / 60.0);
        world.destroy_body(body).unwrap();

        assert_eq!(goodbyes.borrow().joints, 1);
        assert_eq!(goodbyes.borrow().fixtures, 1);
        assert_eq!(world.body_count(), 1);
        assert_eq!(world.joint_count(), 0);
        assert_eq!(world.contact_count(), 0);
        assert_eq!(world.proxy_count(), 1);
        assert!(world.controller(controller).bodies().is_empty());
        assert!(world.body(ground).joint_edges().is_empty());
        assert_eq!(world.destroy_body(body), Err(PhysicsError::InvalidBody(body.0)));
    }

    #[test]
    fn test_joint_rejects_same_body() {
        let mut world = World::default();
        let body = world.create_body(&BodyDef::dynamic()).unwrap();
        let def = DistanceJointDef::new(body, body);
        assert_eq!(world.create_joint(&def.into()), Err(PhysicsError::SameBody));
    }

    #[test]
    fn test_distance_joint_holds_length() {
        let mut world = World::default();
        let anchor = world.create_body(&BodyDef::fixed().with_position(Vec2::new(0.0, 8.0))).unwrap();
        let ball = world.create_body(&BodyDef::dynamic().with_position(Vec2::new(2.0, 8.0))).unwrap();
        world
            .create_fixture(ball, &FixtureDef::new(Shape::circle(0.25)).with_density(1.0))
            .unwrap();
        let def = DistanceJointDef::initialize(anchor, world.body(anchor), ball, world.body(ball), Vec2::new(0.0, 8.0), Vec2::new(2.0, 8.0));
        world.create_joint(&def.into()).unwrap();

        for _ in 0..120 {
            world.step_default(1.0 / 60.0);
        }
        let d = (world.body(ball).position() - Vec2::new(0.0, 8.0)).length();
        assert!((d - 2.0).abs() <= LINEAR_SLOP * 2.0, "length drifted to {}", d);
    }

    #[test]
    fn test_contact_listener_sees_impulses() {
        struct Counter(Rc<RefCell<(usize, usize)>>);
        impl ContactListener for Counter {
            fn begin_contact(&mut self, _contact: &Contact) {
                self.0.borrow_mut().0 += 1;
            }
            fn post_solve(&mut self, _contact: &Contact, impulse: &ContactImpulse) {
                if impulse.normal_impulses[..impulse.count].iter().any(|&i| i > 0.0) {
                    self.0.borrow_mut().1 += 1;
                }
            }
        }

        let (mut world, _) = world_with_ground();
        let counts = Rc::new(RefCell::new((0, 0)));
        world.set_contact_listener(Counter(counts.clone()));
        add_box(&mut world, Vec2::new(0.0, 1.2));

        for _ in 0..30 {
            world.step_default(1.0 / 60.0);
        }
        let (begins, solves) = *counts.borrow();
        assert_eq!(begins, 1);
        assert!(solves > 0);
    }

    #[test]
    fn test_set_type_to_static_stops_body() {
        let mut world = World::default();
        let body = add_box(&mut world, Vec2::new(0.0, 5.0));
        world.step_default(1.0 / 60.0);
        world.set_type(body, BodyType::Static).unwrap();
        assert_eq!(world.body(body).linear_velocity(), Vec2::ZERO);
        assert_eq!(world.body(body).mass(), 0.0);

        let y = world.body(body).position().y;
        world.step_default(1.0 / 60.0);
        assert_eq!(world.body(body).position().y, y);
    }

    #[test]
    fn test_set_active_removes_proxies_and_contacts() {
        let (mut world, _) = world_with_ground();
        let body = add_box(&mut world, Vec2::new(0.0, 1.0));
        world.step_default(1.0 / 60.0);
        assert_eq!(world.contact_count(), 1);

        world.set_active(body, false).unwrap();
        assert_eq!(world.contact_count(), 0);
        assert_eq!(world.proxy_count(), 1);

        world.set_active(body, true).unwrap();
        world.step_default(1.0 / 60.0);
        assert_eq!(world.proxy_count(), 2);
        assert_eq!(world.contact_count(), 1);
    }

    #[test]
    fn test_set_transform_moves_body() {
        let mut world = World::default();
        let body = add_box(&mut world, Vec2::ZERO);
        world.set_transform(body, Vec2::new(3.0, 4.0), 0.5).unwrap();
        let b = world.body(body);
        assert_eq!(b.position(), Vec2::new(3.0, 4.0));
        assert_relative_eq!(b.angle(), 0.5);
    }

    #[test]
    fn test_queries() {
        let (mut world, ground) = world_with_ground();
        let body = add_box(&mut world, Vec2::new(0.0, 3.0));

        let mut found = Vec::new();
        world.query_aabb(&Aabb::new(Vec2::new(-1.0, 2.0), Vec2::new(1.0, 4.0)), |f| {
            found.push(f);
            true
        });
        assert_eq!(found, vec![world.body(body).fixtures()[0]]);

        let mut hit = None;
        world.query_point(Vec2::new(5.0, 0.0), |f| {
            hit = Some(f);
            false
        });
        assert_eq!(hit, Some(world.body(ground).fixtures()[0]));
    }

    #[test]
    fn test_ray_cast_one_returns_closest() {
        let (mut world, ground) = world_with_ground();
        let body = add_box(&mut world, Vec2::new(0.0, 3.0));

        let hit = world.ray_cast_one(Vec2::new(0.0, 10.0), Vec2::new(0.0, -10.0)).unwrap();
        assert_eq!(hit.fixture, world.body(body).fixtures()[0]);
        assert_relative_eq!(hit.point.y, 3.5, epsilon = 0.02);
        assert_relative_eq!(hit.normal.y, 1.0, epsilon = 1e-4);

        let all = world.ray_cast_all(Vec2::new(0.0, 10.0), Vec2::new(0.0, -10.0));
        assert_eq!(all.len(), 2);
        assert!(all.iter().any(|h| h.fixture == world.body(ground).fixtures()[0]));
    }

    #[test]
    fn test_bullet_does_not_tunnel() {
        let run = |continuous: bool| {
            let mut world = World::new(WorldConfig {
                gravity: Vec2::ZERO,
                continuous_physics: continuous,
                ..Default::default()
            });
            let wall = world.create_body(&BodyDef::fixed()).unwrap();
            world
                .create_fixture(wall, &FixtureDef::new(Shape::cuboid(0.1, 5.0)))
                .unwrap();
            let bullet = world
                .create_body(
                    &BodyDef::dynamic()
                        .with_position(Vec2::new(-4.5, 0.0))
                        .with_linear_velocity(Vec2::new(100.0, 0.0))
                        .with_bullet(true),
                )
                .unwrap();
            world
                .create_fixture(bullet, &FixtureDef::new(Shape::circle(0.1)).with_density(1.0))
                .unwrap();
            for _ in 0..10 {
                world.step_default(1.0 / 60.0);
            }
            world.body(bullet).position().x
        };

        assert!(run(true) < 0.0, "bullet passed through the wall");
        assert!(run(false) > 0.0, "discrete stepping should tunnel");
    }

    #[test]
    fn test_controller_applies_each_step() {
        let mut world = World::new(WorldConfig {
            gravity: Vec2::ZERO,
            ..Default::default()
        });
        let body = add_box(&mut world, Vec2::ZERO);
        let controller = world
            .create_controller(ConstantAccelController::new(Vec2::new(6.0, 0.0)))
            .unwrap();
        world.add_controller_body(controller, body).unwrap();
        assert_eq!(world.body(body).controllers(), &[controller]);

        world.step_default(0.5);
        assert_relative_eq!(world.body(body).linear_velocity().x, 3.0);

        world.destroy_controller(controller).unwrap();
        assert!(world.body(body).controllers().is_empty());
    }

    #[test]
    fn test_mutators_rejected_while_locked() {
        let mut world = World::default();
        let body = add_box(&mut world, Vec2::ZERO);
        let fixture = world.body(body).fixtures()[0];
        let controller = world
            .create_controller(ConstantAccelController::new(Vec2::X))
            .unwrap();

        world.locked = true;
        assert!(matches!(world.set_fixed_rotation(body, true), Err(PhysicsError::WorldLocked)));
        assert!(matches!(world.set_sensor(fixture, true), Err(PhysicsError::WorldLocked)));
        assert!(matches!(
            world.set_filter_data(fixture, FilterData::default()),
            Err(PhysicsError::WorldLocked)
        ));
        assert!(matches!(
            world.add_controller_body(controller, body),
            Err(PhysicsError::WorldLocked)
        ));
        assert!(matches!(
            world.remove_controller_body(controller, body),
            Err(PhysicsError::WorldLocked)
        ));
        assert!(matches!(world.clear_controller(controller), Err(PhysicsError::WorldLocked)));

        // Nothing changed
        assert!(!world.body(body).is_fixed_rotation());
        assert!(!world.fixture(fixture).is_sensor());
        assert!(world.body(body).controllers().is_empty());

        world.locked = false;
        assert!(world.set_fixed_rotation(body, true).is_ok());
        assert!(world.add_controller_body(controller, body).is_ok());
    }

    #[test]
    fn test_debug_draw_respects_flags() {
        #[derive(Default)]
        struct Recorder {
            polygons: usize,
            segments: usize,
            transforms: usize,
        }
        impl DebugDraw for Recorder {
            fn draw_polygon(&mut self, _vertices: &[Vec2], _color: Color) {
                self.polygons += 1;
            }
            fn draw_solid_polygon(&mut self, _vertices: &[Vec2], _color: Color) {
                self.polygons += 1;
            }
            fn draw_circle(&mut self, _center: Vec2, _radius: f32, _color: Color) {}
            fn draw_solid_circle(&mut self, _center: Vec2, _radius: f32, _axis: Vec2, _color: Color) {}
            fn draw_segment(&mut self, _p1: Vec2, _p2: Vec2, _color: Color) {
                self.segments += 1;
            }
            fn draw_transform(&mut self, _xf: &Transform) {
                self.transforms += 1;
            }
        }

        let (mut world, _) = world_with_ground();
        add_box(&mut world, Vec2::new(0.0, 1.0));
        world.step_default(1.0 / 60.0);

        let mut recorder = Recorder::default();
        world.draw_debug_data(&mut recorder, DrawFlags::SHAPE);
        assert_eq!(recorder.polygons, 2);
        assert_eq!(recorder.segments, 0);

        let mut recorder = Recorder::default();
        world.draw_debug_data(&mut recorder, DrawFlags::AABB | DrawFlags::PAIR | DrawFlags::CENTER_OF_MASS);
        assert_eq!(recorder.polygons, 2);
        assert_eq!(recorder.segments, 1);
        assert_eq!(recorder.transforms, 2);
    }
}
