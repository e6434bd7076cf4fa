use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{motion_dim, ConstraintKind};

// ---------------------------------------------------------------------------
// Serde default functions
// ---------------------------------------------------------------------------

const fn default_rate_hz() -> f64 {
    100.0
}
const fn default_scaling() -> f64 {
    1.0
}
const fn default_closing_threshold() -> f64 {
    0.8
}
const fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// MotionProfile
// ---------------------------------------------------------------------------

/// One desired-motion profile: the motion to track plus the contact
/// constraint variant and row permutation to grasp with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotionProfile {
    /// Desired motion vector: synergy rates, palm twist, object twist.
    pub desired: Vec<f64>,
    /// Which twist components the selection matrix pins at each contact.
    pub constraint: ConstraintKind,
    /// Row permutation for the contact-constraint block. Empty means
    /// identity (contact index ascending).
    #[serde(default)]
    pub permutation: Vec<usize>,
}

impl MotionProfile {
    /// The desired motion as a dense vector.
    #[must_use]
    pub fn desired_vector(&self) -> DVector<f64> {
        DVector::from_column_slice(&self.desired)
    }
}

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration handed to the session control loop at construction.
///
/// Replaces the parameter-server lookups of older revisions: every topic-like
/// constant and tuning value lives here and is loaded once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Control loop rate in Hz (default: 100).
    #[serde(default = "default_rate_hz")]
    pub rate_hz: f64,

    /// Gain applied to the reference before dispatch (default: 1.0).
    #[serde(default = "default_scaling")]
    pub scaling: f64,

    /// Synergy drive value beyond which the hand counts as closed and the
    /// session stops (default: 0.8).
    #[serde(default = "default_closing_threshold")]
    pub closing_threshold: f64,

    /// Dispatch the zero reference instead of the solver output when the
    /// constraint set is infeasible (default: true).
    #[serde(default = "default_true")]
    pub relax_to_zero: bool,

    /// Substitute the multi-contact profile when more than one contact is
    /// active (default: true).
    #[serde(default = "default_true")]
    pub multi_contact_switch: bool,

    /// Minimization weight matrix, row major. Must be square with the same
    /// dimension as the desired motion vectors.
    pub weight: Vec<Vec<f64>>,

    /// Profile used while at most one contact is active.
    pub single: MotionProfile,

    /// Profile substituted when more than one contact is active and
    /// `multi_contact_switch` is set.
    pub multi: MotionProfile,
}

impl Default for SessionConfig {
    /// One-synergy hand, unit weights, pure hand-closing desired motion.
    fn default() -> Self {
        let dim = motion_dim(1);
        let mut desired = vec![0.0; dim];
        desired[0] = 1.0;
        let weight = (0..dim)
            .map(|i| {
                let mut row = vec![0.0; dim];
                row[i] = 1.0;
                row
            })
            .collect();
        Self {
            rate_hz: default_rate_hz(),
            scaling: default_scaling(),
            closing_threshold: default_closing_threshold(),
            relax_to_zero: true,
            multi_contact_switch: true,
            weight,
            single: MotionProfile {
                desired: desired.clone(),
                constraint: ConstraintKind::Full,
                permutation: Vec::new(),
            },
            multi: MotionProfile {
                desired,
                constraint: ConstraintKind::PositionOnly,
                permutation: Vec::new(),
            },
        }
    }
}

impl SessionConfig {
    /// Validate configuration. Returns Err on invalid values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.rate_hz.is_finite() && self.rate_hz > 0.0) {
            return Err(ConfigError::InvalidRate(self.rate_hz));
        }
        if !self.scaling.is_finite() {
            return Err(ConfigError::InvalidScaling(self.scaling));
        }
        if self.closing_threshold <= 0.0 {
            return Err(ConfigError::InvalidClosingThreshold(self.closing_threshold));
        }

        let dim = self.single.desired.len();
        let min = motion_dim(1);
        if dim < min {
            return Err(ConfigError::DesiredMotionTooShort { min, got: dim });
        }
        if self.multi.desired.len() != dim {
            return Err(ConfigError::ProfileDimensionMismatch {
                single: dim,
                multi: self.multi.desired.len(),
            });
        }

        let rows = self.weight.len();
        for (i, row) in self.weight.iter().enumerate() {
            if row.len() != rows {
                return Err(ConfigError::WeightNotSquare {
                    rows,
                    bad_row: i,
                    cols: row.len(),
                });
            }
        }
        if rows != dim {
            return Err(ConfigError::WeightSizeMismatch {
                expected: dim,
                got: rows,
            });
        }
        Ok(())
    }

    /// The weight matrix as a dense matrix.
    #[must_use]
    pub fn weight_matrix(&self) -> DMatrix<f64> {
        let dim = self.weight.len();
        DMatrix::from_fn(dim, dim, |r, c| self.weight[r][c])
    }

    /// Number of synergy drive coordinates the profiles are sized for.
    #[must_use]
    pub fn synergy_dims(&self) -> usize {
        self.single.desired.len() - 2 * crate::types::TWIST_DIM
    }

    /// Load from TOML file.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
