use thiserror::Error;

/// Top-level error type for palmgrip-core.
#[derive(Debug, Error)]
pub enum PalmgripError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Constraint assembly error: {0}")]
    Assemble(#[from] AssembleError),

    #[error("Solver error: {0}")]
    Solve(#[from] SolveError),

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid rate_hz: {0} (must be > 0 and finite)")]
    InvalidRate(f64),

    #[error("Invalid scaling: {0} (must be finite)")]
    InvalidScaling(f64),

    #[error("Invalid closing_threshold: {0} (must be > 0)")]
    InvalidClosingThreshold(f64),

    #[error("Weight matrix is not square: {rows} rows, row {bad_row} has {cols} entries")]
    WeightNotSquare {
        rows: usize,
        bad_row: usize,
        cols: usize,
    },

    #[error("Weight matrix is {got}x{got} but the desired motion has {expected} components")]
    WeightSizeMismatch { expected: usize, got: usize },

    #[error("Desired motion has {got} components, expected at least {min} (one synergy + two twists)")]
    DesiredMotionTooShort { min: usize, got: usize },

    #[error("Motion profiles disagree on dimension: single={single}, multi={multi}")]
    ProfileDimensionMismatch { single: usize, multi: usize },
}

/// Constraint-assembly precondition violations.
///
/// Copy + static payloads for cheap propagation in the per-tick hot path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AssembleError {
    #[error("Synergy map has {got} rows but the contact Jacobian has {expected} joint columns")]
    SynergyRowMismatch { expected: usize, got: usize },

    #[error("Contact frame row mismatch: Jacobian has {expected} rows, {matrix} spans {got}")]
    ContactFrameMismatch {
        matrix: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Palm-twist map has {got} columns, expected 6")]
    PalmTwistWidth { got: usize },

    #[error("Grasp map has {got} rows, expected 6")]
    GraspMapHeight { got: usize },

    #[error("Permutation matrix is {rows}x{cols}, expected {expected}x{expected}")]
    PermutationShape {
        rows: usize,
        cols: usize,
        expected: usize,
    },

    #[error("Desired motion has {got} components, expected {expected}")]
    DesiredMotionLength { expected: usize, got: usize },
}

/// Per-tick solver failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SolveError {
    #[error("Relaxation order {order} exceeds the stacked system rows {max}")]
    OrderOutOfRange { order: usize, max: usize },

    #[error("Weighted projection (N^T * A * N) is singular")]
    SingularProjection,

    #[error("Weight matrix is {got}x{got} but the motion vector has {expected} components")]
    WeightShapeMismatch { expected: usize, got: usize },

    #[error("Singular value decomposition did not converge")]
    SvdFailed,
}

/// Command dispatch failures reported by the motion executor.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Command rejected by the motion executor: {0}")]
    Rejected(String),
}

/// Session-end notification failures.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Session-end notification not delivered: {0}")]
    Undelivered(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palmgrip_error_from_config_error() {
        let err = ConfigError::InvalidRate(-1.0);
        let top: PalmgripError = err.into();
        assert!(matches!(top, PalmgripError::Config(_)));
        assert!(top.to_string().contains("-1"));
    }

    #[test]
    fn palmgrip_error_from_assemble_error() {
        let err = AssembleError::PalmTwistWidth { got: 5 };
        let top: PalmgripError = err.into();
        assert!(matches!(top, PalmgripError::Assemble(_)));
        assert!(top.to_string().contains('5'));
    }

    #[test]
    fn palmgrip_error_from_solve_error() {
        let err = SolveError::SingularProjection;
        let top: PalmgripError = err.into();
        assert!(matches!(top, PalmgripError::Solve(_)));
        assert!(top.to_string().contains("singular"));
    }

    #[test]
    fn config_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let config_err: ConfigError = io_err.into();
        assert!(matches!(config_err, ConfigError::Io(_)));
    }

    #[test]
    fn assemble_error_is_copy() {
        let err = AssembleError::GraspMapHeight { got: 3 };
        let err2 = err; // Copy
        assert_eq!(err, err2);
    }

    #[test]
    fn assemble_error_display_messages() {
        assert_eq!(
            AssembleError::SynergyRowMismatch {
                expected: 33,
                got: 12
            }
            .to_string(),
            "Synergy map has 12 rows but the contact Jacobian has 33 joint columns"
        );
        assert_eq!(
            AssembleError::DesiredMotionLength {
                expected: 13,
                got: 7
            }
            .to_string(),
            "Desired motion has 7 components, expected 13"
        );
        assert_eq!(
            AssembleError::PermutationShape {
                rows: 3,
                cols: 6,
                expected: 6
            }
            .to_string(),
            "Permutation matrix is 3x6, expected 6x6"
        );
    }

    #[test]
    fn solve_error_display_messages() {
        assert_eq!(
            SolveError::OrderOutOfRange { order: 20, max: 19 }.to_string(),
            "Relaxation order 20 exceeds the stacked system rows 19"
        );
        assert_eq!(
            SolveError::WeightShapeMismatch {
                expected: 13,
                got: 12
            }
            .to_string(),
            "Weight matrix is 12x12 but the motion vector has 13 components"
        );
    }
}
