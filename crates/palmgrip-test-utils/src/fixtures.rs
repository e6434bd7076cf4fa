//! Dimensionally consistent grasp fixtures for a one-synergy hand.

use nalgebra::DMatrix;

use palmgrip_core::types::{GraspState, TWIST_DIM};

/// Identity permutation over `size` rows.
#[must_use]
pub fn identity_permutation(size: usize) -> DMatrix<f64> {
    DMatrix::identity(size, size)
}

/// Permutation matrix sending row `i` to row `indices[i]`.
///
/// # Panics
///
/// Panics if `indices` is not a permutation of `0..indices.len()`.
#[must_use]
pub fn permutation_from_indices(indices: &[usize]) -> DMatrix<f64> {
    let size = indices.len();
    let mut p = DMatrix::zeros(size, size);
    for (from, &to) in indices.iter().enumerate() {
        assert!(to < size, "permutation index {to} out of range");
        p[(to, from)] = 1.0;
    }
    assert!(
        p.column_sum().iter().all(|&v| v == 1.0),
        "indices must be a permutation"
    );
    p
}

/// Single fully-constrained contact on a one-joint, one-synergy hand.
///
/// All frame maps are the identity, so the contact block reduces to
/// `[J | I | −I]` and has a seven-dimensional null space.
#[must_use]
pub fn single_contact_state() -> GraspState {
    GraspState {
        j: DMatrix::from_column_slice(TWIST_DIM, 1, &[1.0, 0.5, 0.0, 0.0, 0.0, 0.0]),
        g: DMatrix::identity(TWIST_DIM, TWIST_DIM),
        t: DMatrix::identity(TWIST_DIM, TWIST_DIM),
        h: DMatrix::identity(TWIST_DIM, TWIST_DIM),
        p: identity_permutation(TWIST_DIM),
        num_contacts: 1,
    }
}

/// Two position-only contacts on a two-joint, one-synergy hand.
///
/// The selection matrix keeps the three linear rows of each contact, so the
/// contact block has six rows over fourteen joint/twist columns.
#[must_use]
pub fn two_contact_state() -> GraspState {
    let frames = 2 * TWIST_DIM;

    let mut j = DMatrix::zeros(frames, 2);
    j[(0, 0)] = 1.0;
    j[(2, 0)] = -0.5;
    j[(TWIST_DIM, 1)] = 1.0;
    j[(TWIST_DIM + 1, 1)] = 0.25;

    // Three linear rows per contact.
    let mut h = DMatrix::zeros(6, frames);
    for i in 0..3 {
        h[(i, i)] = 1.0;
        h[(3 + i, TWIST_DIM + i)] = 1.0;
    }

    let mut t = DMatrix::zeros(frames, TWIST_DIM);
    t.view_mut((0, 0), (TWIST_DIM, TWIST_DIM))
        .copy_from(&DMatrix::identity(TWIST_DIM, TWIST_DIM));
    t.view_mut((TWIST_DIM, 0), (TWIST_DIM, TWIST_DIM))
        .copy_from(&DMatrix::identity(TWIST_DIM, TWIST_DIM));

    let mut g = DMatrix::zeros(TWIST_DIM, frames);
    g.view_mut((0, 0), (TWIST_DIM, TWIST_DIM))
        .copy_from(&DMatrix::identity(TWIST_DIM, TWIST_DIM));
    g.view_mut((0, TWIST_DIM), (TWIST_DIM, TWIST_DIM))
        .copy_from(&DMatrix::identity(TWIST_DIM, TWIST_DIM));

    GraspState {
        j,
        g,
        t,
        h,
        p: identity_permutation(6),
        num_contacts: 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixtures_are_dimensionally_consistent() {
        assert!(single_contact_state().validate().is_ok());
        assert!(two_contact_state().validate().is_ok());
    }

    #[test]
    fn permutation_from_indices_builds_a_swap() {
        let p = permutation_from_indices(&[1, 0, 2]);
        assert_eq!(p[(1, 0)], 1.0);
        assert_eq!(p[(0, 1)], 1.0);
        assert_eq!(p[(2, 2)], 1.0);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn permutation_from_indices_rejects_bad_index() {
        let _ = permutation_from_indices(&[0, 3]);
    }
}
