mod collide;
mod distance;
mod manifold;
mod time_of_impact;

pub use collide::{
    collide_circles, collide_edge_and_circle, collide_polygon_and_circle,
    collide_polygon_and_edge, collide_polygons,
};
pub use distance::{distance, DistanceInput, DistanceOutput, DistanceProxy, SimplexCache};
pub use manifold::{ContactId, Manifold, ManifoldPoint, ManifoldType, WorldManifold};
pub use time_of_impact::{time_of_impact, SeparationFunction, ToiInput};
