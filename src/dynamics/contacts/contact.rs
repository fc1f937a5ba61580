use crate::collision::{
    collide_circles, collide_edge_and_circle, collide_polygon_and_circle,
    collide_polygon_and_edge, collide_polygons, time_of_impact, Manifold, ToiInput,
    WorldManifold,
};
use crate::dynamics::body::{Body, BodyType};
use crate::dynamics::fixture::Fixture;
use crate::dynamics::handle::{Arena, BodyHandle, FixtureHandle};
use crate::dynamics::listeners::ContactListener;
use crate::geometry::{test_overlap, Shape};
use crate::math::{Sweep, Transform};
use crate::settings::{mix_friction, mix_restitution, LINEAR_SLOP};

/// Collision routine selected for a pair of shape types. Fixture A always
/// holds the first shape named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContactKind {
    CircleCircle,
    PolygonCircle,
    PolygonPolygon,
    EdgeCircle,
    PolygonEdge,
}

impl ContactKind {
    /// Runs the narrow phase for this pair
    pub fn evaluate(self, shape_a: &Shape, xf_a: &Transform, shape_b: &Shape, xf_b: &Transform) -> Manifold {
        match (self, shape_a, shape_b) {
            (ContactKind::CircleCircle, Shape::Circle(a), Shape::Circle(b)) => {
                collide_circles(a, xf_a, b, xf_b)
            }
            (ContactKind::PolygonCircle, Shape::Polygon(a), Shape::Circle(b)) => {
                collide_polygon_and_circle(a, xf_a, b, xf_b)
            }
            (ContactKind::PolygonPolygon, Shape::Polygon(a), Shape::Polygon(b)) => {
                collide_polygons(a, xf_a, b, xf_b)
            }
            (ContactKind::EdgeCircle, Shape::Edge(a), Shape::Circle(b)) => {
                collide_edge_and_circle(a, xf_a, b, xf_b)
            }
            (ContactKind::PolygonEdge, Shape::Polygon(a), Shape::Edge(b)) => {
                collide_polygon_and_edge(a, xf_a, b, xf_b)
            }
            _ => {
                debug_assert!(false, "shape types do not match contact kind {:?}", self);
                Manifold::default()
            }
        }
    }
}

/// A potential or actual collision between two fixtures. Exists while the
/// fixtures' fat AABBs overlap; touching only once the manifold has points.
#[derive(Debug, Clone)]
pub struct Contact {
    pub(crate) kind: ContactKind,
    pub(crate) fixture_a: FixtureHandle,
    pub(crate) fixture_b: FixtureHandle,
    pub(crate) body_a: BodyHandle,
    pub(crate) body_b: BodyHandle,

    pub(crate) manifold: Manifold,
    pub(crate) old_manifold: Manifold,

    pub(crate) touching: bool,
    pub(crate) sensor: bool,
    /// Involves a bullet or a non-dynamic body
    pub(crate) continuous: bool,
    /// Filtering must be re-run before the next update
    pub(crate) filtering: bool,
    /// Cleared by a pre-solve listener to skip this step
    pub(crate) enabled: bool,
    pub(crate) island: bool,

    /// Cached time of impact for the current TOI pass
    pub(crate) toi: Option<f32>,
}

impl Contact {
    pub(crate) fn new(
        kind: ContactKind,
        fixture_a: FixtureHandle,
        fa: &Fixture,
        fixture_b: FixtureHandle,
        fb: &Fixture,
        body_a: &Body,
        body_b: &Body,
    ) -> Self {
        Self {
            kind,
            fixture_a,
            fixture_b,
            body_a: fa.body,
            body_b: fb.body,
            manifold: Manifold::default(),
            old_manifold: Manifold::default(),
            touching: false,
            sensor: fa.is_sensor || fb.is_sensor,
            continuous: is_continuous(body_a, body_b),
            filtering: false,
            enabled: true,
            island: false,
            toi: None,
        }
    }

    #[inline]
    pub fn kind(&self) -> ContactKind {
        self.kind
    }

    #[inline]
    pub fn fixture_a(&self) -> FixtureHandle {
        self.fixture_a
    }

    #[inline]
    pub fn fixture_b(&self) -> FixtureHandle {
        self.fixture_b
    }

    #[inline]
    pub fn body_a(&self) -> BodyHandle {
        self.body_a
    }

    #[inline]
    pub fn body_b(&self) -> BodyHandle {
        self.body_b
    }

    /// The body on the other side from `body`
    #[inline]
    pub fn other(&self, body: BodyHandle) -> BodyHandle {
        if self.body_a == body {
            self.body_b
        } else {
            self.body_a
        }
    }

    /// Manifold in local coordinates
    #[inline]
    pub fn manifold(&self) -> &Manifold {
        &self.manifold
    }

    #[inline]
    pub fn is_touching(&self) -> bool {
        self.touching
    }

    #[inline]
    pub fn is_sensor(&self) -> bool {
        self.sensor
    }

    #[inline]
    pub fn is_continuous(&self) -> bool {
        self.continuous
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Disables the contact for the current step. Only meaningful inside
    /// a pre-solve callback; the flag is reset on every update.
    pub fn set_enabled(&mut self, flag: bool) {
        self.enabled = flag;
    }

    #[inline]
    pub fn is_filtering(&self) -> bool {
        self.filtering
    }

    /// Re-runs collision filtering before the next update
    pub fn flag_for_filtering(&mut self) {
        self.filtering = true;
    }

    pub(crate) fn set_sensor(&mut self, sensor: bool) {
        self.sensor = sensor;
    }

    /// Takes part in the island graph and the solver
    #[inline]
    pub(crate) fn is_solid_touching(&self) -> bool {
        self.touching && self.enabled && !self.sensor
    }

    /// Evaluates the manifold in world coordinates
    pub fn world_manifold(&self, fixture_a: &Fixture, xf_a: &Transform, fixture_b: &Fixture, xf_b: &Transform) -> WorldManifold {
        let mut world_manifold = WorldManifold::default();
        world_manifold.initialize(
            &self.manifold,
            xf_a,
            fixture_a.shape.radius(),
            xf_b,
            fixture_b.shape.radius(),
        );
        world_manifold
    }

    /// Updates the manifold and touching state, carrying warm-start impulses
    /// across by contact id, and fires the listener callbacks.
    pub(crate) fn update(
        &mut self,
        fixtures: &Arena<FixtureHandle, Fixture>,
        bodies: &mut Arena<BodyHandle, Body>,
        listener: &mut dyn ContactListener,
    ) {
        std::mem::swap(&mut self.manifold, &mut self.old_manifold);

        // Re-enabled each step; pre-solve may disable it again
        self.enabled = true;

        let was_touching = self.touching;
        let fixture_a = &fixtures[self.fixture_a];
        let fixture_b = &fixtures[self.fixture_b];
        let aabb_overlap = fixture_a.aabb.test_overlap(&fixture_b.aabb);

        let touching;
        if self.sensor {
            let body_a = &bodies[self.body_a];
            let body_b = &bodies[self.body_b];
            touching = aabb_overlap
                && test_overlap(&fixture_a.shape, &body_a.xf, &fixture_b.shape, &body_b.xf);
            // Sensors have no contact points
            self.manifold.point_count = 0;
        } else {
            let (body_a, body_b) = bodies.pair_mut(self.body_a, self.body_b);
            self.continuous = is_continuous(body_a, body_b);

            if aabb_overlap {
                self.manifold =
                    self.kind
                        .evaluate(&fixture_a.shape, &body_a.xf, &fixture_b.shape, &body_b.xf);
                touching = self.manifold.point_count > 0;

                // Match old contact ids to new ones for warm starting
                let old = &self.old_manifold;
                for point in self.manifold.points_mut() {
                    let (normal, tangent) = old.find_impulses(point.id).unwrap_or((0.0, 0.0));
                    point.normal_impulse = normal;
                    point.tangent_impulse = tangent;
                }
            } else {
                touching = false;
                self.manifold.point_count = 0;
            }

            if touching != was_touching {
                body_a.set_awake(true);
                body_b.set_awake(true);
            }
        }

        self.touching = touching;

        if !was_touching && touching {
            listener.begin_contact(self);
        }
        if was_touching && !touching {
            listener.end_contact(self);
        }
        if !self.sensor {
            let old_manifold = self.old_manifold;
            listener.pre_solve(self, &old_manifold);
        }
    }

    /// Time of impact of the two fixtures over the given sweeps
    pub(crate) fn compute_toi(&self, fixtures: &Arena<FixtureHandle, Fixture>, sweep_a: &Sweep, sweep_b: &Sweep) -> f32 {
        let input = ToiInput {
            proxy_a: fixtures[self.fixture_a].shape.distance_proxy(),
            proxy_b: fixtures[self.fixture_b].shape.distance_proxy(),
            sweep_a: *sweep_a,
            sweep_b: *sweep_b,
            tolerance: LINEAR_SLOP,
        };
        time_of_impact(&input)
    }

    /// Mixed friction of the two fixtures
    pub(crate) fn friction(&self, fixtures: &Arena<FixtureHandle, Fixture>) -> f32 {
        mix_friction(fixtures[self.fixture_a].friction, fixtures[self.fixture_b].friction)
    }

    /// Mixed restitution of the two fixtures
    pub(crate) fn restitution(&self, fixtures: &Arena<FixtureHandle, Fixture>) -> f32 {
        mix_restitution(
            fixtures[self.fixture_a].restitution,
            fixtures[self.fixture_b].restitution,
        )
    }
}

fn is_continuous(body_a: &Body, body_b: &Body) -> bool {
    body_a.body_type != BodyType::Dynamic
        || body_a.bullet
        || body_b.body_type != BodyType::Dynamic
        || body_b.bullet
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dynamics::body::BodyDef;
    use crate::dynamics::fixture::FixtureDef;
    use crate::math::Vec2;

    #[derive(Default)]
    struct Recorder {
        begins: usize,
        ends: usize,
        pre_solves: usize,
    }

    impl ContactListener for Recorder {
        fn begin_contact(&mut self, _contact: &Contact) {
            self.begins += 1;
        }

        fn end_contact(&mut self, _contact: &Contact) {
            self.ends += 1;
        }

        fn pre_solve(&mut self, _contact: &mut Contact, _old_manifold: &Manifold) {
            self.pre_solves += 1;
        }
    }

    fn setup(
        sensor: bool,
        offset: f32,
    ) -> (
        Arena<BodyHandle, Body>,
        Arena<FixtureHandle, Fixture>,
        Contact,
    ) {
        let mut bodies = Arena::new();
        let a = bodies.insert(Body::new(&BodyDef::fixed()));
        let b = bodies.insert(Body::new(
            &BodyDef::dynamic().with_position(Vec2::new(offset, 0.0)),
        ));

        let mut fixtures = Arena::new();
        let mut fa = Fixture::new(a, &FixtureDef::new(Shape::circle(1.0)));
        let mut fb = Fixture::new(b, &FixtureDef::new(Shape::circle(1.0)).with_sensor(sensor));
        fa.aabb = fa.shape.compute_aabb(&bodies[a].xf);
        fb.aabb = fb.shape.compute_aabb(&bodies[b].xf);
        let ha = fixtures.insert(fa);
        let hb = fixtures.insert(fb);

        let contact = Contact::new(
            ContactKind::CircleCircle,
            ha,
            &fixtures[ha],
            hb,
            &fixtures[hb],
            &bodies[a],
            &bodies[b],
        );
        (bodies, fixtures, contact)
    }

    #[test]
    fn test_update_begins_touching() {
        let (mut bodies, fixtures, mut contact) = setup(false, 1.5);
        assert!(contact.is_continuous());

        let mut recorder = Recorder::default();
        contact.update(&fixtures, &mut bodies, &mut recorder);
        assert!(contact.is_touching());
        assert_eq!(contact.manifold().point_count, 1);
        assert_eq!(recorder.begins, 1);
        assert_eq!(recorder.pre_solves, 1);

        // Second update keeps touching without a new begin
        contact.update(&fixtures, &mut bodies, &mut recorder);
        assert_eq!(recorder.begins, 1);
        assert_eq!(recorder.ends, 0);
    }

    #[test]
    fn test_impulses_carry_over_by_id() {
        let (mut bodies, fixtures, mut contact) = setup(false, 1.5);
        let mut recorder = Recorder::default();
        contact.update(&fixtures, &mut bodies, &mut recorder);
        contact.manifold.points[0].normal_impulse = 3.0;
        contact.update(&fixtures, &mut bodies, &mut recorder);
        assert_eq!(contact.manifold().points[0].normal_impulse, 3.0);

        // A point whose feature key changed starts cold
        contact.manifold.points[0].id = crate::collision::ContactId::from_key(0xFFFF);
        contact.update(&fixtures, &mut bodies, &mut recorder);
        assert_eq!(contact.manifold().points[0].normal_impulse, 0.0);
    }

    #[test]
    fn test_sensor_reports_without_points() {
        let (mut bodies, fixtures, mut contact) = setup(true, 1.5);
        assert!(contact.is_sensor());
        let mut recorder = Recorder::default();
        contact.update(&fixtures, &mut bodies, &mut recorder);
        assert!(contact.is_touching());
        assert_eq!(contact.manifold().point_count, 0);
        assert_eq!(recorder.begins, 1);
        assert_eq!(recorder.pre_solves, 0);
    }

    #[test]
    fn test_separated_contact_ends() {
        let (mut bodies, mut fixtures, mut contact) = setup(false, 1.5);
        let mut recorder = Recorder::default();
        contact.update(&fixtures, &mut bodies, &mut recorder);

        // Move B away without a broad-phase update
        let b = contact.body_b();
        bodies[b].set_pose(Vec2::new(5.0, 0.0), 0.0);
        let fb = contact.fixture_b();
        let xf = bodies[b].xf;
        fixtures[fb].aabb = fixtures[fb].shape.compute_aabb(&xf);

        contact.update(&fixtures, &mut bodies, &mut recorder);
        assert!(!contact.is_touching());
        assert_eq!(recorder.ends, 1);
    }
}
