use tracing::trace;

use crate::collision::BroadPhase;
use crate::dynamics::body::{Body, ContactEdge};
use crate::dynamics::fixture::Fixture;
use crate::dynamics::handle::{Arena, BodyHandle, ContactHandle, FixtureHandle};
use crate::dynamics::listeners::{
    ContactFilter, ContactListener, DefaultContactFilter, NullContactListener,
};

use super::contact::Contact;
use super::factory::ContactFactory;

/// Owns the broad phase and every contact, and keeps contacts in step with
/// proxy overlap.
pub(crate) struct ContactManager {
    pub(crate) broad_phase: BroadPhase<FixtureHandle>,
    pub(crate) contacts: Arena<ContactHandle, Contact>,
    /// Live contacts in creation order
    pub(crate) contact_list: Vec<ContactHandle>,
    factory: ContactFactory,
    pub(crate) filter: Box<dyn ContactFilter>,
    pub(crate) listener: Box<dyn ContactListener>,
    pair_buffer: Vec<(FixtureHandle, FixtureHandle)>,
}

impl Default for ContactManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ContactManager {
    pub(crate) fn new() -> Self {
        Self {
            broad_phase: BroadPhase::new(),
            contacts: Arena::new(),
            contact_list: Vec::new(),
            factory: ContactFactory::new(),
            filter: Box::new(DefaultContactFilter),
            listener: Box::new(NullContactListener),
            pair_buffer: Vec::new(),
        }
    }

    /// Creates a contact for a new broad-phase pair unless filtering
    /// rejects it or one already exists.
    pub(crate) fn add_pair(
        &mut self,
        fixture_a: FixtureHandle,
        fixture_b: FixtureHandle,
        bodies: &mut Arena<BodyHandle, Body>,
        fixtures: &Arena<FixtureHandle, Fixture>,
    ) {
        let body_a = fixtures[fixture_a].body;
        let body_b = fixtures[fixture_b].body;

        // Fixtures on the same body never collide
        if body_a == body_b {
            return;
        }

        if !bodies[body_b].should_collide(body_a, &bodies[body_a]) {
            return;
        }

        if !self
            .filter
            .should_collide(&fixtures[fixture_a], &fixtures[fixture_b])
        {
            return;
        }

        // Does a contact already exist, in either order?
        let contacts = &self.contacts;
        let exists = bodies[body_b].contact_edges.iter().any(|edge| {
            let c = &contacts[edge.contact];
            (c.fixture_a == fixture_a && c.fixture_b == fixture_b)
                || (c.fixture_a == fixture_b && c.fixture_b == fixture_a)
        });
        if exists {
            return;
        }

        let Some(contact) = self.factory.create(fixture_a, fixture_b, fixtures, bodies) else {
            return;
        };
        let (body_a, body_b) = (contact.body_a, contact.body_b);
        let handle = self.contacts.insert(contact);
        self.contact_list.push(handle);

        bodies[body_a].contact_edges.push(ContactEdge {
            contact: handle,
            other: body_b,
        });
        bodies[body_b].contact_edges.push(ContactEdge {
            contact: handle,
            other: body_a,
        });
    }

    /// Turns new broad-phase pairs into contacts
    pub(crate) fn find_new_contacts(
        &mut self,
        bodies: &mut Arena<BodyHandle, Body>,
        fixtures: &Arena<FixtureHandle, Fixture>,
    ) {
        let mut pairs = std::mem::take(&mut self.pair_buffer);
        pairs.clear();
        self.broad_phase.update_pairs(|a, b| pairs.push((a, b)));

        for &(fixture_a, fixture_b) in &pairs {
            self.add_pair(fixture_a, fixture_b, bodies, fixtures);
        }
        self.pair_buffer = pairs;
    }

    /// Removes a contact, ending it first if it was touching
    pub(crate) fn destroy(&mut self, handle: ContactHandle, bodies: &mut Arena<BodyHandle, Body>) {
        let Some(contact) = self.contacts.remove(handle) else {
            return;
        };

        if contact.touching {
            self.listener.end_contact(&contact);
        }

        for body_handle in [contact.body_a, contact.body_b] {
            if let Some(body) = bodies.get_mut(body_handle) {
                if contact.manifold.point_count > 0 {
                    body.set_awake(true);
                }
                body.contact_edges.retain(|edge| edge.contact != handle);
            }
        }

        if let Some(pos) = self.contact_list.iter().position(|&c| c == handle) {
            self.contact_list.remove(pos);
        }
    }

    /// Updates every contact whose bodies are not both asleep. Contacts
    /// whose proxies no longer overlap, or that fail re-filtering, are
    /// destroyed.
    pub(crate) fn collide(
        &mut self,
        bodies: &mut Arena<BodyHandle, Body>,
        fixtures: &Arena<FixtureHandle, Fixture>,
    ) {
        let mut destroyed = 0usize;
        let mut index = 0;
        while index < self.contact_list.len() {
            let handle = self.contact_list[index];
            let contact = &self.contacts[handle];
            let (fixture_a, fixture_b) = (contact.fixture_a, contact.fixture_b);
            let (body_a, body_b) = (contact.body_a, contact.body_b);

            if !bodies[body_a].awake && !bodies[body_b].awake {
                index += 1;
                continue;
            }

            if contact.filtering {
                if !bodies[body_b].should_collide(body_a, &bodies[body_a])
                    || !self
                        .filter
                        .should_collide(&fixtures[fixture_a], &fixtures[fixture_b])
                {
                    self.destroy(handle, bodies);
                    destroyed += 1;
                    continue;
                }
                self.contacts[handle].filtering = false;
            }

            let overlap = match (fixtures[fixture_a].proxy, fixtures[fixture_b].proxy) {
                (Some(proxy_a), Some(proxy_b)) => self.broad_phase.test_overlap(proxy_a, proxy_b),
                _ => false,
            };
            if !overlap {
                self.destroy(handle, bodies);
                destroyed += 1;
                continue;
            }

            let listener = self.listener.as_mut();
            self.contacts[handle].update(fixtures, bodies, listener);
            index += 1;
        }

        trace!(
            contacts = self.contact_list.len(),
            destroyed,
            "contacts collided"
        );
    }

    #[inline]
    pub(crate) fn contact_count(&self) -> usize {
        self.contact_list.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::body::BodyDef;
    use crate::dynamics::fixture::{FilterData, FixtureDef};
    use crate::geometry::Shape;
    use crate::math::Vec2;

    fn add_circle(
        manager: &mut ContactManager,
        bodies: &mut Arena<BodyHandle, Body>,
        fixtures: &mut Arena<FixtureHandle, Fixture>,
        def: BodyDef,
        filter: FilterData,
    ) -> (BodyHandle, FixtureHandle) {
        let body = bodies.insert(Body::new(&def));
        let fixture = fixtures.insert(Fixture::new(
            body,
            &FixtureDef::new(Shape::circle(1.0)).with_filter(filter),
        ));
        let xf = bodies[body].xf;
        fixtures[fixture].create_proxy(&mut manager.broad_phase, &xf, fixture);
        bodies[body].fixtures.push(fixture);
        (body, fixture)
    }

    #[test]
    fn test_find_new_contacts_once() {
        let mut manager = ContactManager::new();
        let mut bodies = Arena::new();
        let mut fixtures = Arena::new();
        let (a, _) = add_circle(
            &mut manager,
            &mut bodies,
            &mut fixtures,
            BodyDef::fixed(),
            FilterData::default(),
        );
        let (b, _) = add_circle(
            &mut manager,
            &mut bodies,
            &mut fixtures,
            BodyDef::dynamic().with_position(Vec2::new(1.5, 0.0)),
            FilterData::default(),
        );

        manager.find_new_contacts(&mut bodies, &fixtures);
        assert_eq!(manager.contact_count(), 1);
        assert_eq!(bodies[a].contact_edges().len(), 1);
        assert_eq!(bodies[b].contact_edges()[0].other, a);

        // Pairs already reported do not duplicate
        let contact = manager.contact_list[0];
        let (fa, fb) = (
            manager.contacts[contact].fixture_a,
            manager.contacts[contact].fixture_b,
        );
        manager.add_pair(fb, fa, &mut bodies, &fixtures);
        assert_eq!(manager.contact_count(), 1);

        manager.collide(&mut bodies, &fixtures);
        assert!(manager.contacts[contact].is_touching());
    }

    #[test]
    fn test_two_static_bodies_never_pair() {
        let mut manager = ContactManager::new();
        let mut bodies = Arena::new();
        let mut fixtures = Arena::new();
        for x in [0.0, 0.5] {
            add_circle(
                &mut manager,
                &mut bodies,
                &mut fixtures,
                BodyDef::fixed().with_position(Vec2::new(x, 0.0)),
                FilterData::default(),
            );
        }
        manager.find_new_contacts(&mut bodies, &fixtures);
        assert_eq!(manager.contact_count(), 0);
    }

    #[test]
    fn test_filtered_pair_is_rejected() {
        let mut manager = ContactManager::new();
        let mut bodies = Arena::new();
        let mut fixtures = Arena::new();
        let group = FilterData {
            group_index: -3,
            ..FilterData::default()
        };
        add_circle(&mut manager, &mut bodies, &mut fixtures, BodyDef::dynamic(), group);
        add_circle(&mut manager, &mut bodies, &mut fixtures, BodyDef::dynamic(), group);
        manager.find_new_contacts(&mut bodies, &fixtures);
        assert_eq!(manager.contact_count(), 0);
    }

    #[test]
    fn test_destroy_unlinks_bodies() {
        let mut manager = ContactManager::new();
        let mut bodies = Arena::new();
        let mut fixtures = Arena::new();
        let (a, _) = add_circle(
            &mut manager,
            &mut bodies,
            &mut fixtures,
            BodyDef::dynamic(),
            FilterData::default(),
        );
        let (b, _) = add_circle(
            &mut manager,
            &mut bodies,
            &mut fixtures,
            BodyDef::dynamic().with_position(Vec2::new(1.0, 0.0)),
            FilterData::default(),
        );
        manager.find_new_contacts(&mut bodies, &fixtures);
        let contact = manager.contact_list[0];
        manager.destroy(contact, &mut bodies);

        assert_eq!(manager.contact_count(), 0);
        assert!(bodies[a].contact_edges().is_empty());
        assert!(bodies[b].contact_edges().is_empty());
        assert!(manager.contacts.get(contact).is_none());
    }
}
