//! Global tuning constants.
//!
//! Units are meters, kilograms and seconds. These values are tuned for
//! moving objects between 0.1 and 10 meters in size.

use crate::math::consts::PI;

/// Maximum number of contact points between two convex shapes.
pub const MAX_MANIFOLD_POINTS: usize = 2;

/// Maximum number of vertices on a convex polygon.
pub const MAX_POLYGON_VERTICES: usize = 8;

/// Fattens broad-phase AABBs so proxies can move a little without
/// triggering a tree update.
pub const AABB_EXTENSION: f32 = 0.1;

/// Predicts broad-phase proxy motion from displacement.
pub const AABB_MULTIPLIER: f32 = 2.0;

/// Collision and constraint tolerance. Chosen to be numerically
/// significant but visually insignificant.
pub const LINEAR_SLOP: f32 = 0.005;

/// Angular collision and constraint tolerance.
pub const ANGULAR_SLOP: f32 = 2.0 / 180.0 * PI;

/// Skin radius around polygons, keeps polygons slightly apart so
/// continuous collision has something to catch.
pub const POLYGON_RADIUS: f32 = 2.0 * LINEAR_SLOP;

/// Target separation tolerance for time of impact.
pub const TOI_SLOP: f32 = 8.0 * LINEAR_SLOP;

/// Cap on contacts gathered into a single TOI island.
pub const MAX_TOI_CONTACTS_PER_ISLAND: usize = 32;

/// Cap on joints gathered into a single TOI island.
pub const MAX_TOI_JOINTS_PER_ISLAND: usize = 32;

/// TOI events at or past this fraction of the step are ignored.
pub const MAX_TOI: f32 = 1.0 - 100.0 * f32::EPSILON;

/// Approach speed below which collisions are treated as inelastic.
pub const VELOCITY_THRESHOLD: f32 = 1.0;

/// Maximum linear position correction applied per position iteration.
pub const MAX_LINEAR_CORRECTION: f32 = 0.2;

/// Maximum angular position correction applied per position iteration.
pub const MAX_ANGULAR_CORRECTION: f32 = 8.0 / 180.0 * PI;

/// Maximum translation of a body per step.
pub const MAX_TRANSLATION: f32 = 2.0;
pub const MAX_TRANSLATION_SQUARED: f32 = MAX_TRANSLATION * MAX_TRANSLATION;

/// Maximum rotation of a body per step.
pub const MAX_ROTATION: f32 = 0.5 * PI;
pub const MAX_ROTATION_SQUARED: f32 = MAX_ROTATION * MAX_ROTATION;

/// Fraction of overlap resolved per position iteration.
pub const CONTACT_BAUMGARTE: f32 = 0.2;

/// Baumgarte factor used by the time of impact sub-stepping.
pub const TOI_BAUMGARTE: f32 = 0.75;

/// Time a body must be still before it sleeps.
pub const TIME_TO_SLEEP: f32 = 0.5;

/// A body cannot sleep if its linear speed is above this.
pub const LINEAR_SLEEP_TOLERANCE: f32 = 0.01;

/// A body cannot sleep if its angular speed is above this.
pub const ANGULAR_SLEEP_TOLERANCE: f32 = 2.0 / 180.0 * PI;

/// Condition number limit for the two-point block solver.
pub const MAX_CONDITION_NUMBER: f32 = 100.0;

/// Shortest allowed rope on either side of a pulley.
pub const MIN_PULLEY_LENGTH: f32 = 1.0;

/// Friction mixing law: geometric mean.
#[inline]
pub fn mix_friction(friction1: f32, friction2: f32) -> f32 {
    (friction1 * friction2).sqrt()
}

/// Restitution mixing law: the bouncier surface wins.
#[inline]
pub fn mix_restitution(restitution1: f32, restitution2: f32) -> f32 {
    restitution1.max(restitution2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_mixing() {
        assert_relative_eq!(mix_friction(0.4, 0.9), 0.6);
        assert_relative_eq!(mix_friction(0.0, 0.9), 0.0);
        assert_eq!(mix_restitution(0.1, 0.7), 0.7);
    }
}
