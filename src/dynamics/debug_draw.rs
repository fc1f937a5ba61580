//! Debug rendering hooks.
//!
//! The world walks its bodies, joints and broad phase and forwards plain
//! geometry to a [`DebugDraw`] implementation supplied by the application.

use std::ops::{BitOr, BitOrAssign};

use crate::math::{Transform, Vec2};

/// RGB color with components in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }
}

/// Selects what [`World::draw_debug_data`](crate::World::draw_debug_data)
/// renders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DrawFlags(u32);

impl DrawFlags {
    pub const NONE: Self = Self(0);
    /// Fixture shapes
    pub const SHAPE: Self = Self(0x0001);
    /// Joint connections
    pub const JOINT: Self = Self(0x0002);
    /// Fat broad-phase AABBs
    pub const AABB: Self = Self(0x0004);
    /// Broad-phase pairs
    pub const PAIR: Self = Self(0x0008);
    /// Center of mass frames
    pub const CENTER_OF_MASS: Self = Self(0x0010);
    /// Controller specific visuals
    pub const CONTROLLER: Self = Self(0x0020);

    pub const ALL: Self = Self(0x003F);

    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits & Self::ALL.0)
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    #[inline]
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }
}

impl BitOr for DrawFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for DrawFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// Receives debug geometry. Every method is required so that nothing is
/// silently dropped by a partial renderer.
pub trait DebugDraw {
    /// Closed polygon outline
    fn draw_polygon(&mut self, vertices: &[Vec2], color: Color);

    fn draw_solid_polygon(&mut self, vertices: &[Vec2], color: Color);

    fn draw_circle(&mut self, center: Vec2, radius: f32, color: Color);

    /// Filled circle with a radius line along `axis`
    fn draw_solid_circle(&mut self, center: Vec2, radius: f32, axis: Vec2, color: Color);

    fn draw_segment(&mut self, p1: Vec2, p2: Vec2, color: Color);

    /// Coordinate frame, for centers of mass
    fn draw_transform(&mut self, xf: &Transform);
}

/// Fixed palette for debug rendering
pub(crate) mod palette {
    use super::Color;

    pub const INACTIVE: Color = Color::new(0.5, 0.5, 0.3);
    pub const STATIC: Color = Color::new(0.5, 0.9, 0.5);
    pub const KINEMATIC: Color = Color::new(0.5, 0.5, 0.9);
    pub const SLEEPING: Color = Color::new(0.6, 0.6, 0.6);
    pub const AWAKE: Color = Color::new(0.9, 0.7, 0.7);

    pub const JOINT: Color = Color::new(0.5, 0.8, 0.8);
    pub const PAIR: Color = Color::new(0.3, 0.9, 0.9);
    pub const AABB: Color = Color::new(0.9, 0.3, 0.9);
    pub const CONTROLLER: Color = Color::new(0.0, 0.0, 0.8);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_bits() {
        assert_eq!(DrawFlags::SHAPE.bits(), 0x1);
        assert_eq!(DrawFlags::CONTROLLER.bits(), 0x20);
        let flags = DrawFlags::SHAPE | DrawFlags::JOINT;
        assert!(flags.contains(DrawFlags::SHAPE));
        assert!(!flags.contains(DrawFlags::AABB));
        assert_eq!(DrawFlags::from_bits(0xFF), DrawFlags::ALL);
    }

    #[test]
    fn test_insert_remove() {
        let mut flags = DrawFlags::NONE;
        flags.insert(DrawFlags::PAIR);
        flags |= DrawFlags::AABB;
        flags.remove(DrawFlags::PAIR);
        assert_eq!(flags, DrawFlags::AABB);
    }
}
