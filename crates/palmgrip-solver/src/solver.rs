//! Weighted null-space least-squares projection of the desired motion.

use nalgebra::{DMatrix, DVector};
use tracing::debug;

use palmgrip_core::error::SolveError;

use crate::assembler::ConstraintSystem;
use crate::linalg::null_space_basis;

// ---------------------------------------------------------------------------
// SolveResult
// ---------------------------------------------------------------------------

/// Outcome of one tick's minimization.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveResult {
    /// Reference motion preserving the current contacts.
    pub x_ref: DVector<f64>,
    /// Verdict of the relaxation engine's consistency check for this tick.
    pub feasible: bool,
}

// ---------------------------------------------------------------------------
// NullSpaceSolver
// ---------------------------------------------------------------------------

/// Equality-constrained weighted least squares via null-space
/// parameterization.
///
/// Minimizes `(x − x_d)ᵀ·A·(x − x_d)` subject to the contact-consistency
/// block holding exactly: any feasible `x` is `N·z` for a null-space basis
/// `N` of the contact block, which reduces the problem to unconstrained
/// least squares in `z` solved by the normal equations:
///
/// ```text
/// x_ref = N · (Nᵀ·A·N)⁻¹ · Nᵀ·A · x_d
/// ```
#[derive(Debug, Clone)]
pub struct NullSpaceSolver {
    weight: DMatrix<f64>,
}

impl NullSpaceSolver {
    /// Create a solver with the given positive-(semi)definite weight matrix.
    #[must_use]
    pub const fn new(weight: DMatrix<f64>) -> Self {
        Self { weight }
    }

    /// The weight matrix in use.
    #[must_use]
    pub const fn weight(&self) -> &DMatrix<f64> {
        &self.weight
    }

    /// Project the desired motion onto the contact-preserving subspace.
    ///
    /// `feasible` is the relaxation engine's verdict for this tick and is
    /// passed through unchanged for the control loop to act on. A contact
    /// block of full column rank admits only the zero motion, which is
    /// returned without touching the normal equations.
    ///
    /// # Errors
    ///
    /// [`SolveError::WeightShapeMismatch`] when the weight matrix does not
    /// match the motion dimension, [`SolveError::SingularProjection`] when
    /// `Nᵀ·A·N` is not invertible.
    pub fn solve(
        &self,
        system: &ConstraintSystem,
        x_d: &DVector<f64>,
        feasible: bool,
    ) -> Result<SolveResult, SolveError> {
        if self.weight.nrows() != x_d.len() || self.weight.ncols() != x_d.len() {
            return Err(SolveError::WeightShapeMismatch {
                expected: x_d.len(),
                got: self.weight.nrows(),
            });
        }

        let basis = null_space_basis(&system.q);
        if basis.ncols() == 0 {
            debug!("contact block has full column rank: only the zero motion remains");
            return Ok(SolveResult {
                x_ref: DVector::zeros(x_d.len()),
                feasible,
            });
        }

        let weighted = basis.transpose() * &self.weight;
        let gram = &weighted * &basis;
        let inverse = gram
            .try_inverse()
            .ok_or(SolveError::SingularProjection)?;
        let x_ref = &basis * (inverse * (weighted * x_d));

        Ok(SolveResult { x_ref, feasible })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// System whose contact block is the single row `q`; the stacked parts
    /// are irrelevant to the projection and kept minimal.
    fn system_from_rows(rows: usize, cols: usize, entries: &[f64]) -> ConstraintSystem {
        let q = DMatrix::from_row_slice(rows, cols, entries);
        let mut q_tilde = DMatrix::zeros(cols + rows, cols);
        q_tilde
            .view_mut((0, 0), (cols, cols))
            .copy_from(&DMatrix::identity(cols, cols));
        q_tilde.view_mut((cols, 0), (rows, cols)).copy_from(&q);
        ConstraintSystem {
            q,
            q_tilde,
            y: DVector::zeros(cols + rows),
        }
    }

    #[test]
    fn unit_weight_projects_onto_the_null_space() {
        // Constraint pins the third component to zero.
        let system = system_from_rows(1, 3, &[0.0, 0.0, 1.0]);
        let solver = NullSpaceSolver::new(DMatrix::identity(3, 3));
        let x_d = DVector::from_vec(vec![1.0, 2.0, 3.0]);

        let result = solver.solve(&system, &x_d, true).unwrap();
        assert!(result.feasible);
        assert_relative_eq!(result.x_ref[0], 1.0, epsilon = 1e-10);
        assert_relative_eq!(result.x_ref[1], 2.0, epsilon = 1e-10);
        assert_relative_eq!(result.x_ref[2], 0.0, epsilon = 1e-10);
    }

    #[test]
    fn weighted_solution_satisfies_the_stationarity_conditions() {
        let system = system_from_rows(1, 3, &[1.0, 1.0, 1.0]);
        let weight = DMatrix::from_diagonal(&DVector::from_vec(vec![1.0, 4.0, 9.0]));
        let solver = NullSpaceSolver::new(weight.clone());
        let x_d = DVector::from_vec(vec![1.0, -2.0, 0.5]);

        let result = solver.solve(&system, &x_d, true).unwrap();

        // Feasibility: the constraint holds exactly.
        assert_relative_eq!((&system.q * &result.x_ref).amax(), 0.0, epsilon = 1e-10);

        // Optimality: the weighted error is orthogonal to every feasible
        // direction.
        let error = &result.x_ref - &x_d;
        for direction in [
            DVector::from_vec(vec![1.0, -1.0, 0.0]),
            DVector::from_vec(vec![0.0, 1.0, -1.0]),
        ] {
            assert_relative_eq!((direction.transpose() * &weight * &error)[0], 0.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn solver_is_idempotent() {
        let system = system_from_rows(2, 4, &[1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, -1.0]);
        let solver = NullSpaceSolver::new(DMatrix::identity(4, 4));
        let x_d = DVector::from_vec(vec![0.3, -0.7, 1.1, 0.2]);

        let first = solver.solve(&system, &x_d, false).unwrap();
        let second = solver.solve(&system, &x_d, false).unwrap();
        assert_eq!(first, second);
        assert!(!first.feasible);
    }

    #[test]
    fn full_column_rank_constraint_yields_zero_motion() {
        let system = system_from_rows(3, 3, &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
        let solver = NullSpaceSolver::new(DMatrix::identity(3, 3));
        let x_d = DVector::from_vec(vec![1.0, 2.0, 3.0]);

        let result = solver.solve(&system, &x_d, true).unwrap();
        assert_relative_eq!(result.x_ref.amax(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn zero_weight_reports_singular_projection() {
        let system = system_from_rows(1, 3, &[0.0, 0.0, 1.0]);
        let solver = NullSpaceSolver::new(DMatrix::zeros(3, 3));
        let x_d = DVector::from_vec(vec![1.0, 2.0, 3.0]);

        assert_eq!(
            solver.solve(&system, &x_d, true).unwrap_err(),
            SolveError::SingularProjection
        );
    }

    #[test]
    fn weight_shape_is_validated() {
        let system = system_from_rows(1, 3, &[0.0, 0.0, 1.0]);
        let solver = NullSpaceSolver::new(DMatrix::identity(4, 4));
        let x_d = DVector::from_vec(vec![1.0, 2.0, 3.0]);

        assert_eq!(
            solver.solve(&system, &x_d, true).unwrap_err(),
            SolveError::WeightShapeMismatch {
                expected: 3,
                got: 4
            }
        );
    }
}
