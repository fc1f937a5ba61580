use crate::math::{Transform, Vec2};
use crate::settings::MAX_MANIFOLD_POINTS;

/// Packed key identifying the features that produced a contact point.
///
/// Byte 0 holds the reference edge, byte 1 the incident edge, byte 2 the
/// incident vertex and byte 3 the flip flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ContactId(u32);

impl ContactId {
    #[inline]
    pub const fn from_key(key: u32) -> Self {
        Self(key)
    }

    #[inline]
    pub const fn key(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn reference_edge(self) -> u8 {
        (self.0 & 0xff) as u8
    }

    #[inline]
    pub const fn incident_edge(self) -> u8 {
        ((self.0 >> 8) & 0xff) as u8
    }

    #[inline]
    pub const fn incident_vertex(self) -> u8 {
        ((self.0 >> 16) & 0xff) as u8
    }

    #[inline]
    pub const fn flip(self) -> u8 {
        ((self.0 >> 24) & 0xff) as u8
    }

    #[inline]
    pub fn set_reference_edge(&mut self, edge: u8) {
        self.0 = (self.0 & 0xffff_ff00) | edge as u32;
    }

    #[inline]
    pub fn set_incident_edge(&mut self, edge: u8) {
        self.0 = (self.0 & 0xffff_00ff) | ((edge as u32) << 8);
    }

    #[inline]
    pub fn set_incident_vertex(&mut self, vertex: u8) {
        self.0 = (self.0 & 0xff00_ffff) | ((vertex as u32) << 16);
    }

    #[inline]
    pub fn set_flip(&mut self, flip: u8) {
        self.0 = (self.0 & 0x00ff_ffff) | ((flip as u32) << 24);
    }
}

/// A contact point in the local frame of the incident shape, with the
/// impulses accumulated for warm starting.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ManifoldPoint {
    /// Meaning depends on the manifold type:
    /// - `Circles`: center of circle B
    /// - `FaceA`: center of circle B or clip point of polygon B
    /// - `FaceB`: clip point of polygon A
    pub local_point: Vec2,
    pub normal_impulse: f32,
    pub tangent_impulse: f32,
    pub id: ContactId,
}

/// How the manifold's local point and normal are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ManifoldType {
    #[default]
    Circles,
    FaceA,
    FaceB,
}

/// Contact points between two convex shapes, stored in local coordinates
/// so they stay valid as the bodies move.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Manifold {
    pub points: [ManifoldPoint; MAX_MANIFOLD_POINTS],
    /// Not used for `Circles`
    pub local_plane_normal: Vec2,
    /// Circle A center for `Circles`, the reference face center otherwise
    pub local_point: Vec2,
    pub manifold_type: ManifoldType,
    pub point_count: usize,
}

impl Manifold {
    /// Live points
    #[inline]
    pub fn points(&self) -> &[ManifoldPoint] {
        &self.points[..self.point_count]
    }

    #[inline]
    pub fn points_mut(&mut self) -> &mut [ManifoldPoint] {
        &mut self.points[..self.point_count]
    }

    /// Impulses of the point whose id matches `id`, if any
    pub fn find_impulses(&self, id: ContactId) -> Option<(f32, f32)> {
        self.points()
            .iter()
            .find(|p| p.id == id)
            .map(|p| (p.normal_impulse, p.tangent_impulse))
    }
}

/// World-space view of a manifold.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WorldManifold {
    /// Points from A to B
    pub normal: Vec2,
    /// Midway between the two surfaces
    pub points: [Vec2; MAX_MANIFOLD_POINTS],
}

impl WorldManifold {
    /// Evaluates `manifold` at the given transforms and shape radii
    pub fn initialize(
        &mut self,
        manifold: &Manifold,
        xf_a: &Transform,
        radius_a: f32,
        xf_b: &Transform,
        radius_b: f32,
    ) {
        if manifold.point_count == 0 {
            return;
        }

        match manifold.manifold_type {
            ManifoldType::Circles => {
                let point_a = xf_a.transform_point(manifold.local_point);
                let point_b = xf_b.transform_point(manifold.points[0].local_point);
                let mut normal = Vec2::X;
                if point_a.distance_squared(point_b) > f32::EPSILON * f32::EPSILON {
                    normal = (point_b - point_a).normalize();
                }
                let c_a = point_a + normal * radius_a;
                let c_b = point_b - normal * radius_b;
                self.normal = normal;
                self.points[0] = (c_a + c_b) * 0.5;
            }
            ManifoldType::FaceA => {
                let normal = xf_a.transform_vector(manifold.local_plane_normal);
                let plane_point = xf_a.transform_point(manifold.local_point);
                for (i, mp) in manifold.points().iter().enumerate() {
                    let clip_point = xf_b.transform_point(mp.local_point);
                    let c_a = clip_point
                        + normal * (radius_a - (clip_point - plane_point).dot(normal));
                    let c_b = clip_point - normal * radius_b;
                    self.points[i] = (c_a + c_b) * 0.5;
                }
                self.normal = normal;
            }
            ManifoldType::FaceB => {
                let normal = xf_b.transform_vector(manifold.local_plane_normal);
                let plane_point = xf_b.transform_point(manifold.local_point);
                for (i, mp) in manifold.points().iter().enumerate() {
                    let clip_point = xf_a.transform_point(mp.local_point);
                    let c_b = clip_point
                        + normal * (radius_b - (clip_point - plane_point).dot(normal));
                    let c_a = clip_point - normal * radius_a;
                    self.points[i] = (c_a + c_b) * 0.5;
                }
                // Normal always points from A to B
                self.normal = -normal;
            }
        }
    }
}
