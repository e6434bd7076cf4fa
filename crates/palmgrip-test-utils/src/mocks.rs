//! Mock implementations of the collaborator traits for testing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use palmgrip_core::error::{DispatchError, NotifyError};
use palmgrip_core::traits::{CommandSink, ContactTracker, GraspMatrixBuilder, SessionEndSink};
use palmgrip_core::types::{ConstraintKind, ContactMap, GraspState, MotionCommand, StopCause};

// ---------------------------------------------------------------------------
// ScriptedContactTracker
// ---------------------------------------------------------------------------

/// A contact tracker that serves a fixed contact map and counts resets.
///
/// The scripted map survives resets, so a test can keep serving contacts
/// across session transitions while still observing the reset calls.
pub struct ScriptedContactTracker {
    contacts: Arc<Mutex<ContactMap>>,
    resets: Arc<AtomicUsize>,
}

impl ScriptedContactTracker {
    #[must_use]
    pub fn new(contacts: ContactMap) -> Self {
        Self {
            contacts: Arc::new(Mutex::new(contacts)),
            resets: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Handle for swapping the served contact map mid-test.
    #[must_use]
    pub fn contacts_handle(&self) -> Arc<Mutex<ContactMap>> {
        Arc::clone(&self.contacts)
    }

    /// Handle observing how many times the tracker was reset.
    #[must_use]
    pub fn reset_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.resets)
    }
}

impl ContactTracker for ScriptedContactTracker {
    fn contacts(&mut self) -> ContactMap {
        self.contacts.lock().expect("tracker lock").clone()
    }

    fn reset(&mut self) {
        self.resets.fetch_add(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// StaticGraspBuilder
// ---------------------------------------------------------------------------

/// A grasp-matrix builder serving one bundle per constraint kind.
///
/// Returns `None` for an empty contact set, like a real builder with nothing
/// to constrain. Records the mode the loop last selected.
pub struct StaticGraspBuilder {
    full: Option<GraspState>,
    position_only: Option<GraspState>,
    mode: Arc<Mutex<Option<(ConstraintKind, Vec<usize>)>>>,
}

impl StaticGraspBuilder {
    #[must_use]
    pub fn new(full: Option<GraspState>, position_only: Option<GraspState>) -> Self {
        Self {
            full,
            position_only,
            mode: Arc::new(Mutex::new(None)),
        }
    }

    /// Handle observing the last `(kind, permutation)` the loop selected.
    #[must_use]
    pub fn mode_handle(&self) -> Arc<Mutex<Option<(ConstraintKind, Vec<usize>)>>> {
        Arc::clone(&self.mode)
    }
}

impl GraspMatrixBuilder for StaticGraspBuilder {
    fn set_mode(&mut self, kind: ConstraintKind, permutation: &[usize]) {
        *self.mode.lock().expect("mode lock") = Some((kind, permutation.to_vec()));
    }

    fn build(&mut self, contacts: &ContactMap) -> Option<GraspState> {
        if contacts.is_empty() {
            return None;
        }
        let kind = self
            .mode
            .lock()
            .expect("mode lock")
            .as_ref()
            .map(|(kind, _)| *kind)?;
        match kind {
            ConstraintKind::Full => self.full.clone(),
            ConstraintKind::PositionOnly => self.position_only.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingSink
// ---------------------------------------------------------------------------

/// A command sink that records every dispatched command.
#[derive(Default)]
pub struct RecordingSink {
    commands: Arc<Mutex<Vec<MotionCommand>>>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle observing the dispatched commands.
    #[must_use]
    pub fn commands_handle(&self) -> Arc<Mutex<Vec<MotionCommand>>> {
        Arc::clone(&self.commands)
    }
}

impl CommandSink for RecordingSink {
    fn dispatch(&mut self, command: &MotionCommand) -> Result<(), DispatchError> {
        self.commands.lock().expect("sink lock").push(*command);
        Ok(())
    }
}

/// A command sink that rejects every command.
#[derive(Default)]
pub struct FailingSink {
    attempts: Arc<AtomicUsize>,
}

impl FailingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle observing how many dispatches were attempted.
    #[must_use]
    pub fn attempts_handle(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.attempts)
    }
}

impl CommandSink for FailingSink {
    fn dispatch(&mut self, _command: &MotionCommand) -> Result<(), DispatchError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(DispatchError::Rejected("mock executor offline".into()))
    }
}

// ---------------------------------------------------------------------------
// RecordingEndSink
// ---------------------------------------------------------------------------

/// A session-end sink that records every notification.
#[derive(Default)]
pub struct RecordingEndSink {
    notifications: Arc<Mutex<Vec<StopCause>>>,
}

impl RecordingEndSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle observing the delivered notifications.
    #[must_use]
    pub fn notifications_handle(&self) -> Arc<Mutex<Vec<StopCause>>> {
        Arc::clone(&self.notifications)
    }
}

impl SessionEndSink for RecordingEndSink {
    fn session_ended(&mut self, cause: StopCause) -> Result<(), NotifyError> {
        self.notifications.lock().expect("end sink lock").push(cause);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
