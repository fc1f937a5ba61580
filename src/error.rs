//! Error types for world mutation.
//!
//! Numerical degeneracies never surface here; they are clamped where they
//! occur. Only misuse of the public API is reported.

use thiserror::Error;

/// Errors returned by structural world operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhysicsError {
    /// The world is in the middle of a step or callback.
    #[error("world is locked during a time step")]
    WorldLocked,

    /// A joint was asked to connect a body to itself.
    #[error("joint bodies must differ")]
    SameBody,

    /// A body handle does not refer to a live body.
    #[error("invalid body handle: {0}")]
    InvalidBody(u32),

    /// A fixture handle does not refer to a live fixture.
    #[error("invalid fixture handle: {0}")]
    InvalidFixture(u32),

    /// A joint handle does not refer to a live joint.
    #[error("invalid joint handle: {0}")]
    InvalidJoint(u32),

    /// A controller handle does not refer to a live controller.
    #[error("invalid controller handle: {0}")]
    InvalidController(u32),

    /// Polygon vertices do not describe a convex, counter-clockwise hull.
    #[error("degenerate polygon: {0}")]
    DegeneratePolygon(&'static str),

    /// A joint definition violates its preconditions.
    #[error("invalid joint definition: {0}")]
    InvalidJointDef(&'static str),
}

/// Result alias for fallible world operations.
pub type Result<T> = std::result::Result<T, PhysicsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            PhysicsError::WorldLocked.to_string(),
            "world is locked during a time step"
        );
        assert_eq!(
            PhysicsError::InvalidBody(7).to_string(),
            "invalid body handle: 7"
        );
    }
}
