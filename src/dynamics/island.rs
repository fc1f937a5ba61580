//! Islands: connected groups of awake bodies solved together.
//!
//! The world builds an island by walking touching contacts and joints from
//! an awake seed body, then hands it here to be integrated, constrained and
//! possibly put to sleep as one unit.

use tracing::debug;

use crate::constraints::Joint;
use crate::math::Vec2;
use crate::settings::{
    ANGULAR_SLEEP_TOLERANCE, CONTACT_BAUMGARTE, LINEAR_SLEEP_TOLERANCE, TIME_TO_SLEEP,
    TOI_BAUMGARTE,
};
use crate::solver::ContactSolver;

use super::body::{Body, BodyType};
use super::contacts::Contact;
use super::fixture::Fixture;
use super::handle::{Arena, BodyHandle, ContactHandle, FixtureHandle, JointHandle};
use super::integrator::{integrate_position, integrate_velocity};
use super::listeners::ContactListener;
use super::time_step::TimeStep;

/// Borrowed world storage an island solves against
pub(crate) struct IslandContext<'a> {
    pub(crate) bodies: &'a mut Arena<BodyHandle, Body>,
    pub(crate) fixtures: &'a Arena<FixtureHandle, Fixture>,
    pub(crate) contacts: &'a mut Arena<ContactHandle, Contact>,
    pub(crate) joints: &'a mut Arena<JointHandle, Joint>,
    pub(crate) listener: &'a mut dyn ContactListener,
}

/// Handles of the bodies, contacts and joints in one island. Buffers are
/// reused between islands.
#[derive(Debug, Default)]
pub(crate) struct Island {
    pub(crate) bodies: Vec<BodyHandle>,
    pub(crate) contacts: Vec<ContactHandle>,
    pub(crate) joints: Vec<JointHandle>,
}

impl Island {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn clear(&mut self) {
        self.bodies.clear();
        self.contacts.clear();
        self.joints.clear();
    }

    #[inline]
    pub(crate) fn add_body(&mut self, body: BodyHandle) {
        self.bodies.push(body);
    }

    #[inline]
    pub(crate) fn add_contact(&mut self, contact: ContactHandle) {
        self.contacts.push(contact);
    }

    #[inline]
    pub(crate) fn add_joint(&mut self, joint: JointHandle) {
        self.joints.push(joint);
    }

    /// Full discrete solve: integrate, constrain, correct positions, report
    /// impulses and update sleep state.
    pub(crate) fn solve(&self, step: &TimeStep, gravity: Vec2, allow_sleep: bool, ctx: &mut IslandContext<'_>) {
        // Integrate velocities and apply damping
        for &handle in &self.bodies {
            integrate_velocity(&mut ctx.bodies[handle], gravity, step.dt);
        }

        let mut contact_solver = ContactSolver::new(&self.contacts, ctx.contacts, ctx.fixtures, ctx.bodies);

        // Initialize velocity constraints
        contact_solver.init_velocity_constraints(step, ctx.bodies);
        for &handle in &self.joints {
            ctx.joints[handle].init_velocity_constraints(step, ctx.bodies);
        }

        // Solve velocity constraints
        for _ in 0..step.velocity_iterations {
            for &handle in &self.joints {
                ctx.joints[handle].solve_velocity_constraints(step, ctx.bodies);
            }
            contact_solver.solve_velocity_constraints(ctx.bodies);
        }

        // Post-solve cleanup
        contact_solver.store_impulses(ctx.contacts);

        // Integrate positions
        for &handle in &self.bodies {
            integrate_position(&mut ctx.bodies[handle], step.dt);
        }

        // Iterate over constraints
        for _ in 0..step.position_iterations {
            let contacts_ok = contact_solver.solve_position_constraints(ctx.bodies, CONTACT_BAUMGARTE);
            let joints_ok = self.solve_joint_positions(ctx);
            if contacts_ok && joints_ok {
                // Exit early if the position errors are small
                break;
            }
        }

        self.report(&contact_solver, ctx);

        if allow_sleep {
            self.update_sleep(step.dt, ctx.bodies);
        }
    }

    /// Sub-step solve for a time of impact event. Warm starting is skipped
    /// and impulses are not stored, since TOI impulses can be very large.
    pub(crate) fn solve_toi(&self, sub_step: &TimeStep, ctx: &mut IslandContext<'_>) {
        let mut contact_solver = ContactSolver::new(&self.contacts, ctx.contacts, ctx.fixtures, ctx.bodies);
        contact_solver.init_velocity_constraints(sub_step, ctx.bodies);

        // Joint warm starting is off, but the Jacobians are needed
        for &handle in &self.joints {
            ctx.joints[handle].init_velocity_constraints(sub_step, ctx.bodies);
        }

        for _ in 0..sub_step.velocity_iterations {
            contact_solver.solve_velocity_constraints(ctx.bodies);
            for &handle in &self.joints {
                ctx.joints[handle].solve_velocity_constraints(sub_step, ctx.bodies);
            }
        }

        for &handle in &self.bodies {
            integrate_position(&mut ctx.bodies[handle], sub_step.dt);
        }

        for _ in 0..sub_step.position_iterations {
            let contacts_ok = contact_solver.solve_position_constraints(ctx.bodies, TOI_BAUMGARTE);
            let joints_ok = self.solve_joint_positions(ctx);
            if contacts_ok && joints_ok {
                break;
            }
        }

        self.report(&contact_solver, ctx);
    }

    /// Runs every joint's position pass; true when all are within tolerance
    fn solve_joint_positions(&self, ctx: &mut IslandContext<'_>) -> bool {
        let mut joints_ok = true;
        for &handle in &self.joints {
            let ok = ctx.joints[handle].solve_position_constraints(ctx.bodies);
            joints_ok = joints_ok && ok;
        }
        joints_ok
    }

    /// Hands the solver impulses of each contact to the listener
    fn report(&self, solver: &ContactSolver, ctx: &mut IslandContext<'_>) {
        for (index, &handle) in self.contacts.iter().enumerate() {
            let impulse = solver.impulse(index);
            ctx.listener.post_solve(&ctx.contacts[handle], &impulse);
        }
    }

    /// Accumulates rest time and sleeps the whole island once every body
    /// has rested for [`TIME_TO_SLEEP`].
    fn update_sleep(&self, dt: f32, bodies: &mut Arena<BodyHandle, Body>) {
        let lin_tol_sqr = LINEAR_SLEEP_TOLERANCE * LINEAR_SLEEP_TOLERANCE;
        let ang_tol_sqr = ANGULAR_SLEEP_TOLERANCE * ANGULAR_SLEEP_TOLERANCE;

        let mut min_sleep_time = f32::MAX;
        for &handle in &self.bodies {
            let body = &mut bodies[handle];
            if body.body_type == BodyType::Static {
                continue;
            }

            if !body.allow_sleep
                || body.angular_velocity * body.angular_velocity > ang_tol_sqr
                || body.linear_velocity.length_squared() > lin_tol_sqr
            {
                body.sleep_time = 0.0;
                min_sleep_time = 0.0;
            } else {
                body.sleep_time += dt;
                min_sleep_time = min_sleep_time.min(body.sleep_time);
            }
        }

        if min_sleep_time >= TIME_TO_SLEEP {
            for &handle in &self.bodies {
                bodies[handle].set_awake(false);
            }
            debug!(bodies = self.bodies.len(), "island went to sleep");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::body::BodyDef;
    use crate::dynamics::listeners::NullContactListener;
    use approx::assert_relative_eq;

    #[test]
    fn test_free_body_falls() {
        let mut bodies = Arena::new();
        let fixtures = Arena::new();
        let mut contacts = Arena::new();
        let mut joints = Arena::new();
        let mut listener = NullContactListener;

        let body = bodies.insert(Body::new(&BodyDef::dynamic()));
        let mut island = Island::new();
        island.add_body(body);

        let step = TimeStep::new(0.1, 1.0, 8, 3, true);
        let mut ctx = IslandContext {
            bodies: &mut bodies,
            fixtures: &fixtures,
            contacts: &mut contacts,
            joints: &mut joints,
            listener: &mut listener,
        };
        island.solve(&step, Vec2::new(0.0, -10.0), true, &mut ctx);

        assert_relative_eq!(bodies[body].linear_velocity().y, -1.0);
        assert_relative_eq!(bodies[body].position().y, -0.1);
        assert!(bodies[body].is_awake());
    }

    #[test]
    fn test_resting_island_sleeps() {
        let mut bodies = Arena::new();
        let fixtures = Arena::new();
        let mut contacts = Arena::new();
        let mut joints = Arena::new();
        let mut listener = NullContactListener;

        let body = bodies.insert(Body::new(&BodyDef::dynamic()));
        let mut island = Island::new();
        island.add_body(body);

        let step = TimeStep::new(0.1, 1.0, 8, 3, true);
        let mut ctx = IslandContext {
            bodies: &mut bodies,
            fixtures: &fixtures,
            contacts: &mut contacts,
            joints: &mut joints,
            listener: &mut listener,
        };
        // No gravity, so the body rests from the start
        for _ in 0..6 {
            island.solve(&step, Vec2::ZERO, true, &mut ctx);
        }
        assert!(!bodies[body].is_awake());
    }

    #[test]
    fn test_sleep_disallowed_keeps_island_awake() {
        let mut bodies = Arena::new();
        let fixtures = Arena::new();
        let mut contacts = Arena::new();
        let mut joints = Arena::new();
        let mut listener = NullContactListener;

        let body = bodies.insert(Body::new(&BodyDef::dynamic()));
        bodies[body].set_sleeping_allowed(false);
        let mut island = Island::new();
        island.add_body(body);

        let step = TimeStep::new(0.1, 1.0, 8, 3, true);
        let mut ctx = IslandContext {
            bodies: &mut bodies,
            fixtures: &fixtures,
            contacts: &mut contacts,
            joints: &mut joints,
            listener: &mut listener,
        };
        for _ in 0..10 {
            island.solve(&step, Vec2::ZERO, true, &mut ctx);
        }
        assert!(bodies[body].is_awake());
    }
}
