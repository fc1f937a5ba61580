//! Sequential impulse solver for contact constraints.

mod contact_solver;

pub use contact_solver::ContactSolver;
