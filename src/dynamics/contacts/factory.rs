use crate::dynamics::body::Body;
use crate::dynamics::fixture::Fixture;
use crate::dynamics::handle::{Arena, BodyHandle, FixtureHandle};
use crate::geometry::ShapeType;

use super::contact::{Contact, ContactKind};

#[derive(Debug, Clone, Copy, Default)]
struct ContactRegister {
    kind: Option<ContactKind>,
    /// False when the fixtures must be swapped to match the kind
    primary: bool,
}

/// Dispatch table from an ordered pair of shape types to a contact kind.
///
/// Released contacts go back to the contact arena's free list, so slots are
/// recycled without a separate pool.
#[derive(Debug, Clone)]
pub(crate) struct ContactFactory {
    registers: [[ContactRegister; ShapeType::COUNT]; ShapeType::COUNT],
}

impl Default for ContactFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ContactFactory {
    pub(crate) fn new() -> Self {
        let mut factory = Self {
            registers: [[ContactRegister::default(); ShapeType::COUNT]; ShapeType::COUNT],
        };
        factory.add_type(ContactKind::CircleCircle, ShapeType::Circle, ShapeType::Circle);
        factory.add_type(ContactKind::PolygonCircle, ShapeType::Polygon, ShapeType::Circle);
        factory.add_type(ContactKind::PolygonPolygon, ShapeType::Polygon, ShapeType::Polygon);
        factory.add_type(ContactKind::EdgeCircle, ShapeType::Edge, ShapeType::Circle);
        factory.add_type(ContactKind::PolygonEdge, ShapeType::Polygon, ShapeType::Edge);
        factory
    }

    fn add_type(&mut self, kind: ContactKind, type_a: ShapeType, type_b: ShapeType) {
        self.registers[type_a.index()][type_b.index()] = ContactRegister {
            kind: Some(kind),
            primary: true,
        };
        if type_a != type_b {
            self.registers[type_b.index()][type_a.index()] = ContactRegister {
                kind: Some(kind),
                primary: false,
            };
        }
    }

    /// Kind for the ordered pair and whether the order must be swapped
    pub(crate) fn lookup(&self, type_a: ShapeType, type_b: ShapeType) -> Option<(ContactKind, bool)> {
        let register = self.registers[type_a.index()][type_b.index()];
        register.kind.map(|kind| (kind, !register.primary))
    }

    /// Builds a contact for the pair, or `None` when no collision routine
    /// handles the two shape types (edge against edge).
    pub(crate) fn create(
        &self,
        fixture_a: FixtureHandle,
        fixture_b: FixtureHandle,
        fixtures: &Arena<FixtureHandle, Fixture>,
        bodies: &Arena<BodyHandle, Body>,
    ) -> Option<Contact> {
        let fa = &fixtures[fixture_a];
        let fb = &fixtures[fixture_b];
        let (kind, swap) = self.lookup(fa.shape_type(), fb.shape_type())?;

        let contact = if swap {
            Contact::new(kind, fixture_b, fb, fixture_a, fa, &bodies[fb.body], &bodies[fa.body])
        } else {
            Contact::new(kind, fixture_a, fa, fixture_b, fb, &bodies[fa.body], &bodies[fb.body])
        };
        Some(contact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registers() {
        let factory = ContactFactory::new();
        assert_eq!(
            factory.lookup(ShapeType::Circle, ShapeType::Polygon),
            Some((ContactKind::PolygonCircle, true))
        );
        assert_eq!(
            factory.lookup(ShapeType::Polygon, ShapeType::Circle),
            Some((ContactKind::PolygonCircle, false))
        );
        assert_eq!(
            factory.lookup(ShapeType::Edge, ShapeType::Polygon),
            Some((ContactKind::PolygonEdge, true))
        );
        assert_eq!(
            factory.lookup(ShapeType::Circle, ShapeType::Edge),
            Some((ContactKind::EdgeCircle, true))
        );
        assert_eq!(factory.lookup(ShapeType::Edge, ShapeType::Edge), None);
    }
}
