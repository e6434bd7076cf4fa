//! Relaxation-order state machine and reduction-pair construction.
//!
//! The engine decides how many rows of the stacked constraint system are
//! pinned as hard equalities this tick, detects when the pinned subset is
//! not satisfiable, and escalates one order per tick while the desired
//! motion holds still.

use nalgebra::DMatrix;
use tracing::debug;

use palmgrip_core::error::SolveError;

use crate::assembler::ConstraintSystem;
use crate::linalg::{null_space_basis, pseudo_inverse};

/// Desired-motion change (in norm) beyond which the order resets.
pub const DESIRED_MOTION_TOL: f64 = 1e-4;

/// Elementwise residual bound for the feasibility projection identity.
pub const FEASIBILITY_TOL: f64 = 1e-4;

// ---------------------------------------------------------------------------
// ReductionPair
// ---------------------------------------------------------------------------

/// Row selector `r` for the current order and the transposed orthonormal
/// basis `r_bar` of its null space. Rebuilt whenever the order changes;
/// cheap next to the solve, so nothing is cached across ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct ReductionPair {
    pub r: DMatrix<f64>,
    pub r_bar: DMatrix<f64>,
}

impl ReductionPair {
    /// Whether the selector pins any row at all.
    #[must_use]
    pub fn pins_nothing(&self) -> bool {
        self.r.iter().all(|&v| v == 0.0)
    }
}

// ---------------------------------------------------------------------------
// RelaxationEngine
// ---------------------------------------------------------------------------

/// Carries the relaxation order and the previous desired motion across
/// ticks. Everything else about the constraint system is rebuilt per tick.
#[derive(Debug, Clone, Default)]
pub struct RelaxationEngine {
    order: usize,
    previous_desired: Option<nalgebra::DVector<f64>>,
}

impl RelaxationEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current relaxation order.
    #[must_use]
    pub const fn order(&self) -> usize {
        self.order
    }

    /// Drop all carried state, as at the start of a fresh session.
    pub fn reset(&mut self) {
        self.order = 0;
        self.previous_desired = None;
    }

    /// Record this tick's desired motion, resetting the order when it moved
    /// more than [`DESIRED_MOTION_TOL`] from the previous tick (or on the
    /// first tick of a session). Returns whether a reset happened.
    pub fn observe_desired(&mut self, x_d: &nalgebra::DVector<f64>) -> bool {
        let changed = match &self.previous_desired {
            None => true,
            Some(previous) => {
                previous.len() != x_d.len() || (x_d - previous).norm() > DESIRED_MOTION_TOL
            }
        };
        if changed {
            self.order = 0;
        }
        self.previous_desired = Some(x_d.clone());
        changed
    }

    /// Request the next higher order, one step per tick.
    ///
    /// Returns `false` when the order is already at `max_order`, i.e.
    /// relaxation is exhausted and the tick stays infeasible.
    pub fn escalate(&mut self, max_order: usize) -> bool {
        if self.order < max_order {
            self.order += 1;
            debug!(order = self.order, "escalating relaxation order");
            true
        } else {
            false
        }
    }

    /// Build the reduction pair for the current order.
    ///
    /// With `n = x_d.len()` and `m = q_tilde.nrows()`:
    /// - order 0: a single all-zero row of width `m` (no row pinned);
    /// - `0 < order < n`: an `order x m` truncated identity pinning the
    ///   first `order` rows in the order fixed by the upstream permutation;
    /// - `order >= n`: a zero matrix with `num_contacts`-scaled residual
    ///   rows; the source's residual correction never pins rows here.
    ///
    /// # Errors
    ///
    /// Returns [`SolveError::OrderOutOfRange`] when the order exceeds the
    /// stacked row count; constraint construction for the tick is a hard
    /// failure then.
    pub fn reduction(
        &self,
        system: &ConstraintSystem,
        num_contacts: usize,
    ) -> Result<ReductionPair, SolveError> {
        let m = system.rows();
        let n = system.motion_dim();
        if self.order > m {
            return Err(SolveError::OrderOutOfRange {
                order: self.order,
                max: m,
            });
        }

        let r = if self.order == 0 {
            DMatrix::zeros(1, m)
        } else if self.order < n {
            DMatrix::identity(self.order, m)
        } else {
            let residual = self.order - n;
            DMatrix::zeros(n + num_contacts * residual, m)
        };
        let r_bar = null_space_basis(&r).transpose();
        Ok(ReductionPair { r, r_bar })
    }

    /// Consistency check for the pinned subset of the stacked system.
    ///
    /// A selector that pins nothing is trivially feasible. Otherwise the
    /// pinned subset is feasible iff projecting `r_bar·y` through the
    /// pseudo-inverse of `r_bar·q_tilde` reproduces it within
    /// [`FEASIBILITY_TOL`].
    ///
    /// # Errors
    ///
    /// Returns [`SolveError::SvdFailed`] if the pseudo-inversion fails.
    pub fn feasible(
        &self,
        pair: &ReductionPair,
        system: &ConstraintSystem,
    ) -> Result<bool, SolveError> {
        if pair.pins_nothing() {
            return Ok(true);
        }
        let reduced = &pair.r_bar * &system.q_tilde;
        let pinv = pseudo_inverse(&reduced)?;
        let reduced_y = &pair.r_bar * &system.y;
        let residual = &reduced * (pinv * &reduced_y) - &reduced_y;
        Ok(residual.amax() <= FEASIBILITY_TOL)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
