//! Dense-matrix helpers shared by the relaxation engine and the solver:
//! undamped pseudo-inversion and rank-revealing null-space bases.

use nalgebra::DMatrix;

use palmgrip_core::error::SolveError;

/// Relative threshold under which a singular value (or Gram eigenvalue)
/// counts as zero.
pub(crate) const RANK_EPS: f64 = 1e-10;

// ---------------------------------------------------------------------------
// pseudo_inverse
// ---------------------------------------------------------------------------

/// Undamped Moore-Penrose pseudo-inverse.
///
/// Singular values below `RANK_EPS` times the largest are truncated, so
/// rank-deficient inputs are handled without blowing up.
///
/// # Errors
///
/// Returns [`SolveError::SvdFailed`] if the decomposition does not converge.
pub fn pseudo_inverse(m: &DMatrix<f64>) -> Result<DMatrix<f64>, SolveError> {
    if m.is_empty() {
        return Ok(DMatrix::zeros(m.ncols(), m.nrows()));
    }
    let svd = m
        .clone()
        .try_svd(true, true, f64::EPSILON, 0)
        .ok_or(SolveError::SvdFailed)?;
    let cutoff = (svd.singular_values.max() * RANK_EPS).max(f64::MIN_POSITIVE);
    svd.pseudo_inverse(cutoff).map_err(|_| SolveError::SvdFailed)
}

// ---------------------------------------------------------------------------
// null_space_basis
// ---------------------------------------------------------------------------

/// Orthonormal basis of the null space of `m`, one basis vector per column.
///
/// Computed from the eigendecomposition of the Gram matrix `mᵀm`:
/// eigenvectors whose eigenvalue vanishes relative to the largest span the
/// kernel. Returns an `ncols x 0` matrix when the kernel is trivial, and the
/// identity when `m` has no rows (or is entirely zero).
#[must_use]
pub fn null_space_basis(m: &DMatrix<f64>) -> DMatrix<f64> {
    let n = m.ncols();
    if n == 0 {
        return DMatrix::zeros(0, 0);
    }
    if m.nrows() == 0 {
        return DMatrix::identity(n, n);
    }

    let gram = m.transpose() * m;
    let eigen = gram.symmetric_eigen();
    let largest = eigen.eigenvalues.amax();
    if largest <= 0.0 {
        // Zero matrix: every direction is in the kernel.
        return DMatrix::identity(n, n);
    }

    let cutoff = largest * RANK_EPS;
    let columns: Vec<_> = (0..n)
        .filter(|&i| eigen.eigenvalues[i].abs() <= cutoff)
        .map(|i| eigen.eigenvectors.column(i).into_owned())
        .collect();
    if columns.is_empty() {
        DMatrix::zeros(n, 0)
    } else {
        DMatrix::from_columns(&columns)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::DVector;

    #[test]
    fn null_space_of_single_row() {
        let m = DMatrix::from_row_slice(1, 3, &[1.0, 0.0, 0.0]);
        let basis = null_space_basis(&m);
        assert_eq!(basis.shape(), (3, 2));
        // Every basis vector is annihilated by m and the basis is orthonormal.
        assert_relative_eq!((&m * &basis).amax(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(
            basis.transpose() * &basis,
            DMatrix::identity(2, 2),
            epsilon = 1e-12
        );
    }

    #[test]
    fn null_space_of_full_rank_matrix_is_empty() {
        let m = DMatrix::<f64>::identity(3, 3);
        assert_eq!(null_space_basis(&m).shape(), (3, 0));
    }

    #[test]
    fn null_space_of_zero_matrix_spans_everything() {
        let m = DMatrix::<f64>::zeros(2, 4);
        let basis = null_space_basis(&m);
        assert_eq!(basis.shape(), (4, 4));
        assert_relative_eq!(
            basis.transpose() * &basis,
            DMatrix::identity(4, 4),
            epsilon = 1e-12
        );
    }

    #[test]
    fn null_space_of_wide_rank_deficient_matrix() {
        // Two identical rows: rank 1, kernel dimension 2.
        let m = DMatrix::from_row_slice(2, 3, &[1.0, 1.0, 0.0, 1.0, 1.0, 0.0]);
        let basis = null_space_basis(&m);
        assert_eq!(basis.shape(), (3, 2));
        assert_relative_eq!((&m * &basis).amax(), 0.0, epsilon = 1e-10);
    }

    #[test]
    fn pseudo_inverse_satisfies_moore_penrose_identity() {
        let m = DMatrix::from_row_slice(2, 2, &[2.0, 0.0, 0.0, 0.0]);
        let pinv = pseudo_inverse(&m).unwrap();
        assert_relative_eq!(&m * &pinv * &m, m, epsilon = 1e-10);
        assert_relative_eq!(pinv[(0, 0)], 0.5, epsilon = 1e-12);
        assert_relative_eq!(pinv[(1, 1)], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn pseudo_inverse_of_rectangular_selector() {
        let m = DMatrix::from_row_slice(2, 3, &[1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
        let pinv = pseudo_inverse(&m).unwrap();
        assert_eq!(pinv.shape(), (3, 2));
        assert_relative_eq!(&m * &pinv, DMatrix::identity(2, 2), epsilon = 1e-10);
    }

    #[test]
    fn pseudo_inverse_solves_consistent_system() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let rhs = DVector::from_vec(vec![5.0, 6.0]);
        let x = pseudo_inverse(&m).unwrap() * &rhs;
        assert_relative_eq!(&m * x, rhs, epsilon = 1e-10);
    }
}
