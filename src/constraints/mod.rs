//! Velocity and position constraints: contact rows built from manifolds,
//! and the joint family.

mod contact_constraint;
pub mod joints;

pub use contact_constraint::{ContactConstraint, ContactConstraintPoint, PositionSolverManifold};
pub use joints::{Joint, JointDef, JointKind, JointType, LimitState};
