//! Contact manifold generation for each supported shape pair.
//!
//! Every routine returns a fresh [`Manifold`] with zero accumulated
//! impulses; an empty manifold means the shapes are not touching.

use crate::geometry::{CircleShape, EdgeShape, PolygonShape};
use crate::math::{Transform, Vec2};
use crate::settings::MAX_MANIFOLD_POINTS;

use super::manifold::{ContactId, Manifold, ManifoldType};

/// Reference face selection prefers polygon A unless B is clearly better
const K_RELATIVE_TOL: f32 = 0.98;
const K_ABSOLUTE_TOL: f32 = 0.001;

/// A vertex produced while clipping the incident edge
#[derive(Debug, Clone, Copy, Default)]
struct ClipVertex {
    v: Vec2,
    id: ContactId,
}

/// Circle against circle
pub fn collide_circles(
    circle_a: &CircleShape,
    xf_a: &Transform,
    circle_b: &CircleShape,
    xf_b: &Transform,
) -> Manifold {
    let mut manifold = Manifold::default();

    let p1 = xf_a.transform_point(circle_a.position);
    let p2 = xf_b.transform_point(circle_b.position);
    let radius = circle_a.radius + circle_b.radius;
    if p1.distance_squared(p2) > radius * radius {
        return manifold;
    }

    manifold.manifold_type = ManifoldType::Circles;
    manifold.local_point = circle_a.position;
    manifold.local_plane_normal = Vec2::ZERO;
    manifold.point_count = 1;
    manifold.points[0].local_point = circle_b.position;
    manifold.points[0].id = ContactId::default();
    manifold
}

/// Polygon against circle. At most one point is produced.
pub fn collide_polygon_and_circle(
    polygon: &PolygonShape,
    xf_a: &Transform,
    circle: &CircleShape,
    xf_b: &Transform,
) -> Manifold {
    let mut manifold = Manifold::default();

    // Circle center in the polygon's frame
    let c = xf_b.transform_point(circle.position);
    let c_local = xf_a.inverse_transform_point(c);

    // Find the face of maximum separation
    let radius = polygon.radius + circle.radius;
    let mut normal_index = 0;
    let mut separation = f32::MIN;
    for (i, (&v, &n)) in polygon.vertices.iter().zip(polygon.normals.iter()).enumerate() {
        let s = n.dot(c_local - v);
        if s > radius {
            // Early out
            return manifold;
        }
        if s > separation {
            separation = s;
            normal_index = i;
        }
    }

    let count = polygon.vertex_count();
    let v1 = polygon.vertices[normal_index];
    let v2 = polygon.vertices[(normal_index + 1) % count];

    manifold.manifold_type = ManifoldType::FaceA;
    manifold.points[0].local_point = circle.position;
    manifold.points[0].id = ContactId::default();

    // Center is inside the polygon
    if separation < f32::EPSILON {
        manifold.point_count = 1;
        manifold.local_plane_normal = polygon.normals[normal_index];
        manifold.local_point = (v1 + v2) * 0.5;
        return manifold;
    }

    // Vertex and face regions
    let u1 = (c_local - v1).dot(v2 - v1);
    let u2 = (c_local - v2).dot(v1 - v2);
    if u1 <= 0.0 {
        if c_local.distance_squared(v1) > radius * radius {
            return manifold;
        }
        manifold.local_plane_normal = (c_local - v1).normalize();
        manifold.local_point = v1;
    } else if u2 <= 0.0 {
        if c_local.distance_squared(v2) > radius * radius {
            return manifold;
        }
        manifold.local_plane_normal = (c_local - v2).normalize();
        manifold.local_point = v2;
    } else {
        let face_center = (v1 + v2) * 0.5;
        let s = (c_local - face_center).dot(polygon.normals[normal_index]);
        if s > radius {
            return manifold;
        }
        manifold.local_plane_normal = polygon.normals[normal_index];
        manifold.local_point = face_center;
    }
    manifold.point_count = 1;
    manifold
}

/// Edge against circle. The edge is two-sided: the circle is pushed out
/// along whichever side of the segment its center lies on.
pub fn collide_edge_and_circle(
    edge: &EdgeShape,
    xf_a: &Transform,
    circle: &CircleShape,
    xf_b: &Transform,
) -> Manifold {
    let mut manifold = Manifold::default();

    let c = xf_a.inverse_transform_point(xf_b.transform_point(circle.position));
    let [v1, v2] = edge.vertices;
    let e = v2 - v1;
    let radius = edge.radius + circle.radius;

    // Barycentric coordinates of the center along the segment
    let u = e.dot(v2 - c);
    let v = e.dot(c - v1);

    let mut id = ContactId::default();
    if v <= 0.0 {
        // Region v1
        if c.distance_squared(v1) > radius * radius {
            return manifold;
        }
        manifold.manifold_type = ManifoldType::Circles;
        manifold.local_point = v1;
        manifold.local_plane_normal = Vec2::ZERO;
    } else if u <= 0.0 {
        // Region v2
        if c.distance_squared(v2) > radius * radius {
            return manifold;
        }
        id.set_reference_edge(1);
        manifold.manifold_type = ManifoldType::Circles;
        manifold.local_point = v2;
        manifold.local_plane_normal = Vec2::ZERO;
    } else {
        // Interior
        let mut n = edge.normal;
        let mut separation = n.dot(c - v1);
        if separation < 0.0 {
            n = -n;
            separation = -separation;
            id.set_flip(1);
        }
        if separation > radius {
            return manifold;
        }
        id.set_incident_edge(1);
        manifold.manifold_type = ManifoldType::FaceA;
        manifold.local_point = v1;
        manifold.local_plane_normal = n;
    }

    manifold.point_count = 1;
    manifold.points[0].local_point = circle.position;
    manifold.points[0].id = id;
    manifold
}

/// Polygon against edge. The edge acts as a two-vertex polygon.
pub fn collide_polygon_and_edge(
    polygon: &PolygonShape,
    xf_a: &Transform,
    edge: &EdgeShape,
    xf_b: &Transform,
) -> Manifold {
    let edge_polygon = PolygonShape::from_edge(edge);
    collide_polygons(polygon, xf_a, &edge_polygon, xf_b)
}

/// Polygon against polygon, by separating axes and incident edge clipping.
///
/// The reference face is taken from whichever polygon has the larger
/// separation, with a tolerance biased toward A to keep the normal stable
/// between steps.
pub fn collide_polygons(
    poly_a: &PolygonShape,
    xf_a: &Transform,
    poly_b: &PolygonShape,
    xf_b: &Transform,
) -> Manifold {
    let mut manifold = Manifold::default();
    let total_radius = poly_a.radius + poly_b.radius;

    let (edge_a, separation_a) = find_max_separation(poly_a, xf_a, poly_b, xf_b);
    if separation_a > total_radius {
        return manifold;
    }

    let (edge_b, separation_b) = find_max_separation(poly_b, xf_b, poly_a, xf_a);
    if separation_b > total_radius {
        return manifold;
    }

    let (poly1, xf1, poly2, xf2, edge1, flip) =
        if separation_b > K_RELATIVE_TOL * separation_a + K_ABSOLUTE_TOL {
            manifold.manifold_type = ManifoldType::FaceB;
            (poly_b, xf_b, poly_a, xf_a, edge_b, 1u8)
        } else {
            manifold.manifold_type = ManifoldType::FaceA;
            (poly_a, xf_a, poly_b, xf_b, edge_a, 0u8)
        };

    let incident_edge = find_incident_edge(poly1, xf1, edge1, poly2, xf2);

    let count1 = poly1.vertex_count();
    let local_v11 = poly1.vertices[edge1];
    let local_v12 = poly1.vertices[(edge1 + 1) % count1];

    let local_tangent = (local_v12 - local_v11).normalize();
    let local_normal = local_tangent.cross_scalar(1.0);
    let plane_point = (local_v11 + local_v12) * 0.5;

    let tangent = xf1.transform_vector(local_tangent);
    let normal = tangent.cross_scalar(1.0);

    let v11 = xf1.transform_point(local_v11);
    let v12 = xf1.transform_point(local_v12);

    // Face offset
    let front_offset = normal.dot(v11);

    // Side offsets, extended by the polygon skin
    let side_offset1 = -tangent.dot(v11) + total_radius;
    let side_offset2 = tangent.dot(v12) + total_radius;

    // Clip the incident edge against the extruded side planes
    let Some(clip_points1) = clip_segment_to_line(&incident_edge, -tangent, side_offset1) else {
        return manifold;
    };
    let Some(clip_points2) = clip_segment_to_line(&clip_points1, tangent, side_offset2) else {
        return manifold;
    };

    manifold.local_plane_normal = local_normal;
    manifold.local_point = plane_point;

    let mut point_count = 0;
    for cv in clip_points2.iter().take(MAX_MANIFOLD_POINTS) {
        let separation = normal.dot(cv.v) - front_offset;
        if separation <= total_radius {
            let mp = &mut manifold.points[point_count];
            mp.local_point = xf2.inverse_transform_point(cv.v);
            mp.id = cv.id;
            mp.id.set_flip(flip);
            point_count += 1;
        }
    }
    manifold.point_count = point_count;
    manifold
}

/// Sutherland-Hodgman clipping of a segment against the half-plane
/// `dot(normal, x) <= offset`. Returns `None` if fewer than two points
/// survive.
fn clip_segment_to_line(
    v_in: &[ClipVertex; 2],
    normal: Vec2,
    offset: f32,
) -> Option<[ClipVertex; 2]> {
    let mut v_out = [ClipVertex::default(); 2];
    let mut num_out = 0;

    // Distance of end points to the line
    let distance0 = normal.dot(v_in[0].v) - offset;
    let distance1 = normal.dot(v_in[1].v) - offset;

    // Points behind the plane are kept
    if distance0 <= 0.0 {
        v_out[num_out] = v_in[0];
        num_out += 1;
    }
    if distance1 <= 0.0 {
        v_out[num_out] = v_in[1];
        num_out += 1;
    }

    // The points straddle the plane
    if distance0 * distance1 < 0.0 && num_out < 2 {
        let interp = distance0 / (distance0 - distance1);
        v_out[num_out].v = v_in[0].v + (v_in[1].v - v_in[0].v) * interp;
        v_out[num_out].id = if distance0 > 0.0 { v_in[0].id } else { v_in[1].id };
        num_out += 1;
    }

    (num_out == 2).then_some(v_out)
}

/// Separation of `poly2` along the normal of `edge1` on `poly1`
fn edge_separation(
    poly1: &PolygonShape,
    xf1: &Transform,
    edge1: usize,
    poly2: &PolygonShape,
    xf2: &Transform,
) -> f32 {
    // Normal in world frame, then in poly2's frame
    let normal1_world = xf1.transform_vector(poly1.normals[edge1]);
    let normal1 = xf2.inverse_transform_vector(normal1_world);

    // Support vertex of poly2 against the normal
    let index = poly2.support(-normal1);

    let v1 = xf1.transform_point(poly1.vertices[edge1]);
    let v2 = xf2.transform_point(poly2.vertices[index]);
    (v2 - v1).dot(normal1_world)
}

/// Face of `poly1` with the largest separation from `poly2`, found by
/// hill-climbing from the face pointing toward `poly2`'s centroid.
fn find_max_separation(
    poly1: &PolygonShape,
    xf1: &Transform,
    poly2: &PolygonShape,
    xf2: &Transform,
) -> (usize, f32) {
    let count1 = poly1.vertex_count();

    // Centroid offset in poly1's frame
    let d = xf2.transform_point(poly2.centroid) - xf1.transform_point(poly1.centroid);
    let d_local1 = xf1.inverse_transform_vector(d);

    // Edge normal most aligned with the centroid offset
    let mut edge = 0;
    let mut max_dot = f32::MIN;
    for (i, n) in poly1.normals.iter().enumerate() {
        let dot = n.dot(d_local1);
        if dot > max_dot {
            max_dot = dot;
            edge = i;
        }
    }

    let s = edge_separation(poly1, xf1, edge, poly2, xf2);

    let prev_edge = if edge == 0 { count1 - 1 } else { edge - 1 };
    let s_prev = edge_separation(poly1, xf1, prev_edge, poly2, xf2);

    let next_edge = if edge + 1 == count1 { 0 } else { edge + 1 };
    let s_next = edge_separation(poly1, xf1, next_edge, poly2, xf2);

    // Pick the search direction
    let (mut best_edge, mut best_separation, step_forward) = if s_prev > s && s_prev > s_next {
        (prev_edge, s_prev, false)
    } else if s_next > s {
        (next_edge, s_next, true)
    } else {
        return (edge, s);
    };

    // Walk while the separation keeps increasing
    loop {
        let edge = if step_forward {
            if best_edge + 1 == count1 {
                0
            } else {
                best_edge + 1
            }
        } else if best_edge == 0 {
            count1 - 1
        } else {
            best_edge - 1
        };

        let s = edge_separation(poly1, xf1, edge, poly2, xf2);
        if s > best_separation {
            best_edge = edge;
            best_separation = s;
        } else {
            break;
        }
    }

    (best_edge, best_separation)
}

/// World-space edge of `poly2` most anti-parallel to face `edge1` of `poly1`
fn find_incident_edge(
    poly1: &PolygonShape,
    xf1: &Transform,
    edge1: usize,
    poly2: &PolygonShape,
    xf2: &Transform,
) -> [ClipVertex; 2] {
    // Reference normal in poly2's frame
    let normal1 = xf2.inverse_transform_vector(xf1.transform_vector(poly1.normals[edge1]));

    let mut i1 = 0;
    let mut min_dot = f32::MAX;
    for (i, n) in poly2.normals.iter().enumerate() {
        let dot = normal1.dot(*n);
        if dot < min_dot {
            min_dot = dot;
            i1 = i;
        }
    }
    let i2 = (i1 + 1) % poly2.vertex_count();

    let mut c = [ClipVertex::default(); 2];
    for (k, (cv, index)) in c.iter_mut().zip([i1, i2]).enumerate() {
        cv.v = xf2.transform_point(poly2.vertices[index]);
        cv.id.set_reference_edge(edge1 as u8);
        cv.id.set_incident_edge(index as u8);
        cv.id.set_incident_vertex(k as u8);
    }
    c
}
