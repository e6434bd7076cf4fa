use std::collections::BTreeMap;
use std::fmt;

use nalgebra::{DMatrix, DVector, Isometry3};
use serde::{Deserialize, Serialize};

use crate::error::AssembleError;

/// Dimension of a spatial twist (linear + angular velocity).
pub const TWIST_DIM: usize = 6;

/// Width of the command sent to the motion executor: one synergy rate plus
/// the palm twist.
pub const COMMAND_DIM: usize = 7;

/// Length of the motion vector for a hand with `synergy_cols` drive
/// coordinates: synergies, palm twist, object twist.
#[must_use]
pub const fn motion_dim(synergy_cols: usize) -> usize {
    synergy_cols + 2 * TWIST_DIM
}

// ---------------------------------------------------------------------------
// Contacts
// ---------------------------------------------------------------------------

/// Identifier of a touching finger.
pub type FingerId = u8;

/// Snapshot of one finger-object contact.
#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    /// Pose of the contact frame, in the palm frame.
    pub frame: Isometry3<f64>,
    /// Pose of the touching finger link at the moment of first contact.
    pub link_frame: Isometry3<f64>,
}

impl Contact {
    /// Contact whose frames coincide with the palm frame.
    #[must_use]
    pub fn at_identity() -> Self {
        Self {
            frame: Isometry3::identity(),
            link_frame: Isometry3::identity(),
        }
    }
}

/// Current contact set, keyed by finger.
///
/// A `BTreeMap` so iteration order (and therefore the row order of anything
/// derived from it) is the finger index ascending.
pub type ContactMap = BTreeMap<FingerId, Contact>;

// ---------------------------------------------------------------------------
// SynergyMap
// ---------------------------------------------------------------------------

/// Dense map from the reduced actuation space to full joint velocities.
///
/// One column per drive coordinate; for a fully actuated hand this is the
/// identity.
pub type SynergyMap = DMatrix<f64>;

// ---------------------------------------------------------------------------
// GraspState
// ---------------------------------------------------------------------------

/// Kinematic matrix bundle produced by the grasp-matrix builder each tick.
///
/// Consumed once per tick; never persisted across ticks.
#[derive(Debug, Clone, PartialEq)]
pub struct GraspState {
    /// Contact Jacobian: joint velocities to stacked contact twists.
    pub j: DMatrix<f64>,
    /// Grasp map: object twist to stacked contact velocities (transposed use).
    pub g: DMatrix<f64>,
    /// Palm-twist pole-change map: palm twist to stacked contact twists.
    pub t: DMatrix<f64>,
    /// Contact selection matrix picking the constrained twist components.
    pub h: DMatrix<f64>,
    /// Row permutation applied to the contact-constraint block.
    pub p: DMatrix<f64>,
    /// Number of active contacts this bundle was built from.
    pub num_contacts: usize,
}

impl GraspState {
    /// Check internal dimensional consistency.
    ///
    /// # Errors
    ///
    /// Returns the first [`AssembleError`] describing a shape mismatch.
    pub fn validate(&self) -> Result<(), AssembleError> {
        let frames = self.j.nrows();
        if self.h.ncols() != frames {
            return Err(AssembleError::ContactFrameMismatch {
                matrix: "selection matrix H",
                expected: frames,
                got: self.h.ncols(),
            });
        }
        if self.t.nrows() != frames {
            return Err(AssembleError::ContactFrameMismatch {
                matrix: "palm-twist map T",
                expected: frames,
                got: self.t.nrows(),
            });
        }
        if self.g.ncols() != frames {
            return Err(AssembleError::ContactFrameMismatch {
                matrix: "grasp map G",
                expected: frames,
                got: self.g.ncols(),
            });
        }
        if self.t.ncols() != TWIST_DIM {
            return Err(AssembleError::PalmTwistWidth {
                got: self.t.ncols(),
            });
        }
        if self.g.nrows() != TWIST_DIM {
            return Err(AssembleError::GraspMapHeight {
                got: self.g.nrows(),
            });
        }
        if self.p.nrows() != self.h.nrows() || self.p.ncols() != self.h.nrows() {
            return Err(AssembleError::PermutationShape {
                rows: self.p.nrows(),
                cols: self.p.ncols(),
                expected: self.h.nrows(),
            });
        }
        Ok(())
    }

    /// Number of constrained contact rows.
    #[must_use]
    pub fn constraint_rows(&self) -> usize {
        self.h.nrows()
    }
}

// ---------------------------------------------------------------------------
// ConstraintKind
// ---------------------------------------------------------------------------

/// Which twist components the selection matrix pins at each contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    /// All six twist components constrained (single-contact grasping).
    Full,
    /// Only the linear components constrained (multi-contact grasping).
    PositionOnly,
}

impl ConstraintKind {
    /// Constrained rows per contact.
    #[must_use]
    pub const fn rows_per_contact(&self) -> usize {
        match self {
            Self::Full => TWIST_DIM,
            Self::PositionOnly => 3,
        }
    }
}

// ---------------------------------------------------------------------------
// MotionCommand
// ---------------------------------------------------------------------------

/// The 7-component reference sent to the motion executor each tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionCommand {
    /// Synergy drive rate.
    pub synergy: f64,
    /// Palm twist (linear + angular).
    pub twist: [f64; TWIST_DIM],
}

impl MotionCommand {
    /// The all-zero command dispatched while idle.
    #[must_use]
    pub const fn zeros() -> Self {
        Self {
            synergy: 0.0,
            twist: [0.0; TWIST_DIM],
        }
    }

    /// Take the first seven components of a reference motion vector.
    ///
    /// # Panics
    ///
    /// Panics if `reference` has fewer than [`COMMAND_DIM`] components.
    #[must_use]
    pub fn from_reference(reference: &DVector<f64>) -> Self {
        assert!(
            reference.len() >= COMMAND_DIM,
            "reference motion must have at least {COMMAND_DIM} components"
        );
        let mut twist = [0.0; TWIST_DIM];
        for (i, value) in twist.iter_mut().enumerate() {
            *value = reference[i + 1];
        }
        Self {
            synergy: reference[0],
            twist,
        }
    }

    /// Flat view of the command.
    #[must_use]
    pub fn as_array(&self) -> [f64; COMMAND_DIM] {
        [
            self.synergy,
            self.twist[0],
            self.twist[1],
            self.twist[2],
            self.twist[3],
            self.twist[4],
            self.twist[5],
        ]
    }

    /// Whether every component is exactly zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.synergy == 0.0 && self.twist.iter().all(|&v| v == 0.0)
    }
}

impl Default for MotionCommand {
    fn default() -> Self {
        Self::zeros()
    }
}

// ---------------------------------------------------------------------------
// Session signals
// ---------------------------------------------------------------------------

/// Why a running session stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCause {
    /// The orchestrator sent an explicit stop command.
    Commanded,
    /// The synergy drive value crossed the closing threshold.
    HandClosed,
    /// The safety monitor reported an imminent collision.
    Collision,
    /// The safety monitor reported a joint position or velocity limit.
    JointLimit,
}

impl fmt::Display for StopCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Commanded => "external stop command",
            Self::HandClosed => "closing-hand threshold",
            Self::Collision => "imminent collision",
            Self::JointLimit => "joint-limit violation",
        };
        f.write_str(text)
    }
}

/// One report from the safety monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SafetyReport {
    pub collision: bool,
    pub joint_position_limits: bool,
    pub joint_velocity_limits: bool,
}

impl SafetyReport {
    /// The stop cause this report demands, if any. Collision wins over
    /// limit violations when both are flagged.
    #[must_use]
    pub const fn stop_cause(&self) -> Option<StopCause> {
        if self.collision {
            Some(StopCause::Collision)
        } else if self.joint_position_limits || self.joint_velocity_limits {
            Some(StopCause::JointLimit)
        } else {
            None
        }
    }
}

/// One joint-state observation from the hand.
#[derive(Debug, Clone, PartialEq)]
pub struct JointObservation {
    /// Full joint positions, hand joints only.
    pub positions: DVector<f64>,
    /// Current value of the synergy drive coordinate.
    pub drive_value: f64,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn consistent_state() -> GraspState {
        GraspState {
            j: DMatrix::zeros(6, 2),
            g: DMatrix::zeros(6, 6),
            t: DMatrix::zeros(6, 6),
            h: DMatrix::identity(6, 6),
            p: DMatrix::identity(6, 6),
            num_contacts: 1,
        }
    }

    #[test]
    fn grasp_state_validates_consistent_dimensions() {
        assert!(consistent_state().validate().is_ok());
    }

    #[test]
    fn grasp_state_rejects_narrow_palm_twist_map() {
        let mut state = consistent_state();
        state.t = DMatrix::zeros(6, 5);
        assert_eq!(
            state.validate(),
            Err(AssembleError::PalmTwistWidth { got: 5 })
        );
    }

    #[test]
    fn grasp_state_rejects_selection_width_mismatch() {
        let mut state = consistent_state();
        state.h = DMatrix::identity(6, 12);
        assert!(matches!(
            state.validate(),
            Err(AssembleError::ContactFrameMismatch { .. })
        ));
    }

    #[test]
    fn grasp_state_rejects_non_square_permutation() {
        let mut state = consistent_state();
        state.p = DMatrix::identity(6, 5);
        assert!(matches!(
            state.validate(),
            Err(AssembleError::PermutationShape { .. })
        ));
    }

    #[test]
    fn motion_command_from_reference_takes_first_seven() {
        let reference = DVector::from_vec(vec![
            1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0, 13.0,
        ]);
        let command = MotionCommand::from_reference(&reference);
        assert_eq!(command.synergy, 1.0);
        assert_eq!(command.twist, [2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        assert_eq!(command.as_array(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn motion_command_zeros_is_zero() {
        assert!(MotionCommand::zeros().is_zero());
        assert!(!MotionCommand::from_reference(&DVector::from_element(13, 0.5)).is_zero());
    }

    #[test]
    fn safety_report_collision_wins() {
        let report = SafetyReport {
            collision: true,
            joint_position_limits: true,
            joint_velocity_limits: false,
        };
        assert_eq!(report.stop_cause(), Some(StopCause::Collision));
    }

    #[test]
    fn safety_report_limits_map_to_joint_limit() {
        let report = SafetyReport {
            collision: false,
            joint_position_limits: false,
            joint_velocity_limits: true,
        };
        assert_eq!(report.stop_cause(), Some(StopCause::JointLimit));
        assert_eq!(SafetyReport::default().stop_cause(), None);
    }

    #[test]
    fn motion_dim_counts_both_twists() {
        assert_eq!(motion_dim(1), 13);
        assert_eq!(motion_dim(2), 14);
    }

    #[test]
    fn constraint_kind_rows_per_contact() {
        assert_eq!(ConstraintKind::Full.rows_per_contact(), 6);
        assert_eq!(ConstraintKind::PositionOnly.rows_per_contact(), 3);
    }
}
