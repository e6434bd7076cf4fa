//! Synthetic collaborators for the headless demo: one touching finger on a
//! one-joint hand, identity frame maps, and logging sinks.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use nalgebra::DMatrix;
use tracing::{debug, info};

use palmgrip_core::error::{DispatchError, NotifyError};
use palmgrip_core::traits::{CommandSink, ContactTracker, GraspMatrixBuilder, SessionEndSink};
use palmgrip_core::types::{
    Contact, ConstraintKind, ContactMap, GraspState, MotionCommand, StopCause, TWIST_DIM,
};

// ---------------------------------------------------------------------------
// SingleTouchTracker
// ---------------------------------------------------------------------------

/// Always reports finger 1 touching at the palm origin.
pub struct SingleTouchTracker;

impl SingleTouchTracker {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ContactTracker for SingleTouchTracker {
    fn contacts(&mut self) -> ContactMap {
        let mut contacts = ContactMap::new();
        contacts.insert(1, Contact::at_identity());
        contacts
    }

    fn reset(&mut self) {
        debug!("contact tracker reset");
    }
}

// ---------------------------------------------------------------------------
// SingleContactBuilder
// ---------------------------------------------------------------------------

/// Grasp matrices for one contact on a one-joint hand: identity frame maps
/// and a fixed contact Jacobian column.
pub struct SingleContactBuilder {
    kind: ConstraintKind,
}

impl SingleContactBuilder {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            kind: ConstraintKind::Full,
        }
    }
}

impl GraspMatrixBuilder for SingleContactBuilder {
    fn set_mode(&mut self, kind: ConstraintKind, _permutation: &[usize]) {
        self.kind = kind;
    }

    fn build(&mut self, contacts: &ContactMap) -> Option<GraspState> {
        if contacts.is_empty() {
            return None;
        }
        let rows = self.kind.rows_per_contact();
        let mut h = DMatrix::zeros(rows, TWIST_DIM);
        for i in 0..rows {
            h[(i, i)] = 1.0;
        }
        Some(GraspState {
            j: DMatrix::from_column_slice(TWIST_DIM, 1, &[1.0, 0.5, 0.0, 0.0, 0.0, 0.0]),
            g: DMatrix::identity(TWIST_DIM, TWIST_DIM),
            t: DMatrix::identity(TWIST_DIM, TWIST_DIM),
            h,
            p: DMatrix::identity(rows, rows),
            num_contacts: contacts.len(),
        })
    }
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Counts dispatched commands and logs them at debug level.
pub struct DispatchLog {
    count: Arc<AtomicUsize>,
}

impl DispatchLog {
    #[must_use]
    pub fn new() -> Self {
        Self {
            count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Handle observing the number of dispatched commands.
    #[must_use]
    pub fn count_handle(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.count)
    }
}

impl CommandSink for DispatchLog {
    fn dispatch(&mut self, command: &MotionCommand) -> Result<(), DispatchError> {
        self.count.fetch_add(1, Ordering::SeqCst);
        debug!(synergy = command.synergy, "command dispatched");
        Ok(())
    }
}

/// Logs the session-end notification.
pub struct LoggingEndSink;

impl SessionEndSink for LoggingEndSink {
    fn session_ended(&mut self, cause: StopCause) -> Result<(), NotifyError> {
        info!(%cause, "grasp session ended");
        Ok(())
    }
}
