//! Mock collaborators and grasp fixtures for palmgrip test suites.
//!
//! Provides lightweight stand-ins for the contact tracker, grasp-matrix
//! builder, command sink and session-end sink, plus dimensionally consistent
//! grasp-state fixtures, so any crate's tests can drive the control pipeline
//! without hardware.

pub mod fixtures;
pub mod mocks;

pub use fixtures::{
    identity_permutation, permutation_from_indices, single_contact_state, two_contact_state,
};
pub use mocks::{
    FailingSink, RecordingEndSink, RecordingSink, ScriptedContactTracker, StaticGraspBuilder,
};
