use crate::collision::{BroadPhase, ProxyId};
use crate::geometry::{Aabb, MassData, RayCastInput, RayCastOutput, Shape, ShapeType};
use crate::math::Transform;

use super::handle::{BodyHandle, FixtureHandle};

/// Collision filtering data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FilterData {
    /// Collision category bits, normally a single bit
    pub category_bits: u16,
    /// Categories this fixture accepts collisions with
    pub mask_bits: u16,
    /// Fixtures sharing a positive group always collide, a negative group
    /// never collide. Zero disables grouping.
    pub group_index: i16,
}

impl Default for FilterData {
    fn default() -> Self {
        Self {
            category_bits: 0x0001,
            mask_bits: 0xFFFF,
            group_index: 0,
        }
    }
}

impl FilterData {
    /// Group rule first, then category and mask in both directions
    pub fn should_collide(&self, other: &FilterData) -> bool {
        if self.group_index == other.group_index && self.group_index != 0 {
            return self.group_index > 0;
        }
        (self.mask_bits & other.category_bits) != 0 && (self.category_bits & other.mask_bits) != 0
    }
}

/// Description for attaching a shape to a body
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FixtureDef {
    /// Cloned into the fixture
    pub shape: Shape,
    /// Usually in [0, 1]
    pub friction: f32,
    /// Usually in [0, 1]
    pub restitution: f32,
    /// Usually in kg/m^2
    pub density: f32,
    /// Sensors detect overlap without producing a collision response
    pub is_sensor: bool,
    pub filter: FilterData,
    pub user_data: u64,
}

impl FixtureDef {
    pub fn new(shape: Shape) -> Self {
        Self {
            shape,
            friction: 0.2,
            restitution: 0.0,
            density: 0.0,
            is_sensor: false,
            filter: FilterData::default(),
            user_data: 0,
        }
    }

    pub fn with_density(mut self, density: f32) -> Self {
        self.density = density;
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    pub fn with_sensor(mut self, is_sensor: bool) -> Self {
        self.is_sensor = is_sensor;
        self
    }

    pub fn with_filter(mut self, filter: FilterData) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_user_data(mut self, user_data: u64) -> Self {
        self.user_data = user_data;
        self
    }
}

/// A shape attached to a body, with material and filtering data.
/// Create with [`World::create_fixture`](crate::World::create_fixture).
#[derive(Debug, Clone)]
pub struct Fixture {
    pub(crate) body: BodyHandle,
    pub(crate) shape: Shape,
    pub(crate) density: f32,
    pub(crate) friction: f32,
    pub(crate) restitution: f32,
    pub(crate) is_sensor: bool,
    pub(crate) filter: FilterData,
    /// Swept AABB fed to the broad phase
    pub(crate) aabb: Aabb,
    /// Present while the owning body is active
    pub(crate) proxy: Option<ProxyId>,
    pub user_data: u64,
}

impl Fixture {
    pub(crate) fn new(body: BodyHandle, def: &FixtureDef) -> Self {
        Self {
            body,
            shape: def.shape.clone(),
            density: def.density,
            friction: def.friction,
            restitution: def.restitution,
            is_sensor: def.is_sensor,
            filter: def.filter,
            aabb: Aabb::default(),
            proxy: None,
            user_data: def.user_data,
        }
    }

    #[inline]
    pub fn body(&self) -> BodyHandle {
        self.body
    }

    #[inline]
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    #[inline]
    pub fn shape_type(&self) -> ShapeType {
        self.shape.shape_type()
    }

    #[inline]
    pub fn density(&self) -> f32 {
        self.density
    }

    /// Takes effect on the body after
    /// [`World::reset_mass_data`](crate::World::reset_mass_data)
    pub fn set_density(&mut self, density: f32) {
        debug_assert!(density.is_finite() && density >= 0.0);
        self.density = density;
    }

    #[inline]
    pub fn friction(&self) -> f32 {
        self.friction
    }

    /// Existing contacts keep their mixed friction until rebuilt
    pub fn set_friction(&mut self, friction: f32) {
        self.friction = friction;
    }

    #[inline]
    pub fn restitution(&self) -> f32 {
        self.restitution
    }

    pub fn set_restitution(&mut self, restitution: f32) {
        self.restitution = restitution;
    }

    #[inline]
    pub fn is_sensor(&self) -> bool {
        self.is_sensor
    }

    #[inline]
    pub fn filter_data(&self) -> &FilterData {
        &self.filter
    }

    /// Cached AABB, swept over the last step
    #[inline]
    pub fn aabb(&self) -> &Aabb {
        &self.aabb
    }

    #[inline]
    pub fn proxy(&self) -> Option<ProxyId> {
        self.proxy
    }

    /// Tests a world point against the shape placed at `xf`
    pub fn test_point(&self, xf: &Transform, point: crate::math::Vec2) -> bool {
        self.shape.test_point(xf, point)
    }

    /// Casts a world segment against the shape placed at `xf`
    pub fn ray_cast(&self, input: &RayCastInput, xf: &Transform) -> Option<RayCastOutput> {
        self.shape.ray_cast(input, xf)
    }

    /// Mass properties from the shape and density
    pub fn mass_data(&self) -> MassData {
        self.shape.compute_mass(self.density)
    }

    pub(crate) fn create_proxy(
        &mut self,
        broad_phase: &mut BroadPhase<FixtureHandle>,
        xf: &Transform,
        handle: FixtureHandle,
    ) {
        debug_assert!(self.proxy.is_none());
        self.aabb = self.shape.compute_aabb(xf);
        self.proxy = Some(broad_phase.create_proxy(&self.aabb, handle));
    }

    pub(crate) fn destroy_proxy(&mut self, broad_phase: &mut BroadPhase<FixtureHandle>) {
        if let Some(proxy) = self.proxy.take() {
            broad_phase.destroy_proxy(proxy);
        }
    }

    /// Covers the motion from `xf1` to `xf2` and moves the proxy
    pub(crate) fn synchronize(
        &mut self,
        broad_phase: &mut BroadPhase<FixtureHandle>,
        xf1: &Transform,
        xf2: &Transform,
    ) {
        let Some(proxy) = self.proxy else {
            return;
        };
        let aabb1 = self.shape.compute_aabb(xf1);
        let aabb2 = self.shape.compute_aabb(xf2);
        self.aabb = aabb1.combine(&aabb2);
        broad_phase.move_proxy(proxy, &self.aabb, xf2.position - xf1.position);
    }
}
