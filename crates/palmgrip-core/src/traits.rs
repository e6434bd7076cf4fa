use crate::error::{DispatchError, NotifyError};
use crate::types::{ConstraintKind, ContactMap, GraspState, MotionCommand, StopCause};

// ---------------------------------------------------------------------------
// ContactTracker
// ---------------------------------------------------------------------------

/// Maintains the set of currently touching fingers and their contact frames.
///
/// Implementations typically sit on a low-level touch signal; the control
/// loop only ever takes snapshots and clears the accumulated state around
/// session transitions.
pub trait ContactTracker: Send + 'static {
    /// Snapshot of the current contact set.
    fn contacts(&mut self) -> ContactMap;

    /// Forget every recorded contact. Idempotent.
    fn reset(&mut self);

    /// Human-readable name for this tracker.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

// ---------------------------------------------------------------------------
// GraspMatrixBuilder
// ---------------------------------------------------------------------------

/// Produces the kinematic matrix bundle for the current contact set.
///
/// The builder owns its view of the joint configuration and object pose;
/// the loop only hands it the contact snapshot and the active constraint
/// mode for the tick.
pub trait GraspMatrixBuilder: Send + 'static {
    /// Select the contact-selection variant and row permutation to use for
    /// every bundle built until the next call.
    fn set_mode(&mut self, kind: ConstraintKind, permutation: &[usize]);

    /// Build the grasp matrices for `contacts`.
    ///
    /// Returns `None` when no usable bundle exists this tick (for instance,
    /// an empty contact set).
    fn build(&mut self, contacts: &ContactMap) -> Option<GraspState>;

    /// Human-readable name for this builder.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

// ---------------------------------------------------------------------------
// CommandSink
// ---------------------------------------------------------------------------

/// Accepts the per-tick motion command on behalf of the motion executor.
pub trait CommandSink: Send + 'static {
    /// Deliver one command.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] when the executor rejects the command; the
    /// control loop logs and continues.
    fn dispatch(&mut self, command: &MotionCommand) -> Result<(), DispatchError>;

    /// Human-readable name for this sink.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

// ---------------------------------------------------------------------------
// SessionEndSink
// ---------------------------------------------------------------------------

/// Receives the best-effort notification that a running session ended.
pub trait SessionEndSink: Send + 'static {
    /// Notify the upstream orchestrator that grasping ended.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] when delivery fails; the control loop logs
    /// and continues.
    fn session_ended(&mut self, cause: StopCause) -> Result<(), NotifyError>;

    /// Human-readable name for this sink.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
