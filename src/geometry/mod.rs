mod aabb;
mod circle;
mod edge;
mod polygon;
mod ray;
mod shape;

pub use aabb::Aabb;
pub use circle::CircleShape;
pub use edge::EdgeShape;
pub use polygon::{PolygonShape, VertexList};
pub use ray::{RayCastInput, RayCastOutput};
pub use shape::{test_overlap, MassData, Shape, ShapeType};
