//! Grasp-preserving motion solving for palmgrip.
//!
//! Provides the per-tick constraint assembly, the relaxation-order state
//! machine, and the weighted null-space least-squares projection that
//! together turn a desired hand/object motion into a reference motion that
//! keeps the current contacts to first order.
//!
//! # Architecture
//!
//! ```text
//! (S, GraspState, x_d) ──► ConstraintSystem ──► RelaxationEngine ──► NullSpaceSolver ──► SolveResult
//! ```
//!
//! The [`ConstraintSystem`](assembler::ConstraintSystem) is rebuilt from
//! scratch every tick from immutable inputs; only the
//! [`RelaxationEngine`](relaxation::RelaxationEngine) carries state across
//! ticks.

pub mod assembler;
pub mod linalg;
pub mod relaxation;
pub mod solver;

pub use assembler::{assemble, ConstraintSystem};
pub use relaxation::{ReductionPair, RelaxationEngine, DESIRED_MOTION_TOL, FEASIBILITY_TOL};
pub use solver::{NullSpaceSolver, SolveResult};
