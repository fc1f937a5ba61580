pub mod broad_phase;
pub mod narrow_phase;

pub use broad_phase::{BroadPhase, DynamicTree, ProxyId};
pub use narrow_phase::{
    collide_circles, collide_edge_and_circle, collide_polygon_and_circle,
    collide_polygon_and_edge, collide_polygons, distance, time_of_impact, ContactId,
    DistanceInput, DistanceOutput, DistanceProxy, Manifold, ManifoldPoint, ManifoldType,
    SeparationFunction, SimplexCache, ToiInput, WorldManifold,
};
