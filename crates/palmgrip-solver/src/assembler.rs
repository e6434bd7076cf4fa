//! Per-tick assembly of the contact-consistency constraint system.

use nalgebra::{DMatrix, DVector};

use palmgrip_core::error::AssembleError;
use palmgrip_core::types::{GraspState, SynergyMap, TWIST_DIM};

// ---------------------------------------------------------------------------
// ConstraintSystem
// ---------------------------------------------------------------------------

/// The stacked constraint system for one tick.
///
/// `q` is the contact-consistency block `[H·J·S | H·T | −H·Gᵀ]` with its rows
/// already permuted by `P`; `q_tilde` stacks the identity over `q`; `y`
/// stacks the desired motion over a zero block, one zero per contact row.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintSystem {
    pub q: DMatrix<f64>,
    pub q_tilde: DMatrix<f64>,
    pub y: DVector<f64>,
}

impl ConstraintSystem {
    /// Rows of the stacked system; the relaxation order is capped here.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.q_tilde.nrows()
    }

    /// Width of the stacked system, equal to the desired-motion dimension.
    #[must_use]
    pub fn motion_dim(&self) -> usize {
        self.q_tilde.ncols()
    }
}

// ---------------------------------------------------------------------------
// assemble
// ---------------------------------------------------------------------------

/// Build the constraint system for one tick.
///
/// Pure transform: no state, no partial output. Any dimension mismatch among
/// the kinematic matrices, the synergy map and the desired motion rejects
/// the tick before any arithmetic runs.
///
/// # Errors
///
/// Returns [`AssembleError`] on the first shape mismatch found.
pub fn assemble(
    synergy: &SynergyMap,
    grasp: &GraspState,
    x_d: &DVector<f64>,
) -> Result<ConstraintSystem, AssembleError> {
    grasp.validate()?;
    if synergy.nrows() != grasp.j.ncols() {
        return Err(AssembleError::SynergyRowMismatch {
            expected: grasp.j.ncols(),
            got: synergy.nrows(),
        });
    }
    let syn_cols = synergy.ncols();
    let n = syn_cols + 2 * TWIST_DIM;
    if x_d.len() != n {
        return Err(AssembleError::DesiredMotionLength {
            expected: n,
            got: x_d.len(),
        });
    }

    let rows = grasp.h.nrows();
    let finger_block = &grasp.h * &grasp.j * synergy;
    let palm_block = &grasp.h * &grasp.t;
    let object_block = -(&grasp.h * grasp.g.transpose());

    let mut q = DMatrix::zeros(rows, n);
    q.view_mut((0, 0), (rows, syn_cols)).copy_from(&finger_block);
    q.view_mut((0, syn_cols), (rows, TWIST_DIM))
        .copy_from(&palm_block);
    q.view_mut((0, syn_cols + TWIST_DIM), (rows, TWIST_DIM))
        .copy_from(&object_block);

    // Row order of the contact block is fixed here, before stacking, so the
    // relaxation engine's truncated-identity selector pins rows in the order
    // the permutation dictates.
    let q = &grasp.p * q;

    let mut q_tilde = DMatrix::zeros(n + rows, n);
    q_tilde
        .view_mut((0, 0), (n, n))
        .copy_from(&DMatrix::identity(n, n));
    q_tilde.view_mut((n, 0), (rows, n)).copy_from(&q);

    let mut y = DVector::zeros(n + rows);
    y.rows_mut(0, n).copy_from(x_d);

    Ok(ConstraintSystem { q, q_tilde, y })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
