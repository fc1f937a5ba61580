//! Callbacks into the application.
//!
//! Listeners run while the world is locked, so they receive plain
//! references and cannot restructure the world.

use crate::collision::Manifold;
use crate::settings::MAX_MANIFOLD_POINTS;

use super::contacts::Contact;
use super::fixture::Fixture;
use super::handle::{FixtureHandle, JointHandle};

/// Impulses applied by the solver at each manifold point, reported in
/// [`ContactListener::post_solve`]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ContactImpulse {
    pub normal_impulses: [f32; MAX_MANIFOLD_POINTS],
    pub tangent_impulses: [f32; MAX_MANIFOLD_POINTS],
    pub count: usize,
}

/// Decides whether two fixtures may form a contact
pub trait ContactFilter {
    /// Called for new broad-phase pairs and for contacts flagged for
    /// filtering. Defaults to the category, mask and group rules.
    fn should_collide(&self, fixture_a: &Fixture, fixture_b: &Fixture) -> bool {
        fixture_a.filter.should_collide(&fixture_b.filter)
    }
}

/// Filter using only the fixtures' [`FilterData`](super::FilterData)
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultContactFilter;

impl ContactFilter for DefaultContactFilter {}

/// Receives contact events during a step
pub trait ContactListener {
    /// Two fixtures started touching
    fn begin_contact(&mut self, _contact: &Contact) {}

    /// Two fixtures stopped touching. Also called when a touching contact
    /// is destroyed.
    fn end_contact(&mut self, _contact: &Contact) {}

    /// Called after the manifold update and before solving, for non-sensor
    /// contacts. `contact.set_enabled(false)` skips it for this step.
    fn pre_solve(&mut self, _contact: &mut Contact, _old_manifold: &Manifold) {}

    /// Solver impulses, once the island has been solved
    fn post_solve(&mut self, _contact: &Contact, _impulse: &ContactImpulse) {}
}

/// Listener that ignores every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullContactListener;

impl ContactListener for NullContactListener {}

/// Told about joints and fixtures destroyed implicitly when their body is
/// destroyed
pub trait DestructionListener {
    fn say_goodbye_joint(&mut self, _joint: JointHandle) {}

    fn say_goodbye_fixture(&mut self, _fixture: FixtureHandle) {}
}
