use crate::math::Vec2;

/// Segment `p1 -> p2` to cast, clipped at `max_fraction` of its length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayCastInput {
    pub p1: Vec2,
    pub p2: Vec2,
    pub max_fraction: f32,
}

impl RayCastInput {
    /// Full-length segment from `p1` to `p2`
    #[inline]
    pub const fn new(p1: Vec2, p2: Vec2) -> Self {
        Self {
            p1,
            p2,
            max_fraction: 1.0,
        }
    }

    /// Point along the segment at `fraction`
    #[inline]
    pub fn point_at(&self, fraction: f32) -> Vec2 {
        self.p1 * (1.0 - fraction) + self.p2 * fraction
    }
}

/// A ray hit: surface normal and fraction along the input segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayCastOutput {
    pub normal: Vec2,
    pub fraction: f32,
}
