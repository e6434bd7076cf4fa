//! Shared cross-thread session state and the callback-facing handle.
//!
//! The `running` flag and the synergy map are the only state touched from
//! outside the control thread. Both live behind one exclusive lock acquired
//! for single field reads and writes, never across the solve. Asynchronous
//! stop triggers flip `running` immediately and leave a pending stop cause
//! for the next tick to consume, so collaborator cleanup and the end
//! notification happen exactly once, on the loop thread.

use std::sync::{Arc, Mutex};

use nalgebra::DMatrix;
use tracing::{debug, info, warn};

use palmgrip_core::types::{JointObservation, SafetyReport, StopCause, SynergyMap};

// ---------------------------------------------------------------------------
// SharedState
// ---------------------------------------------------------------------------

/// Signals the control loop drains at the top of each tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickSignals {
    pub running: bool,
    pub stop: Option<StopCause>,
    pub reset: bool,
    pub shutdown: bool,
}

#[derive(Debug)]
struct Inner {
    running: bool,
    shutdown: bool,
    synergy: SynergyMap,
    pending_stop: Option<StopCause>,
    pending_reset: bool,
}

/// The lock-guarded session fields shared between the control thread and
/// the callback contexts.
#[derive(Debug)]
pub struct SharedState {
    inner: Mutex<Inner>,
}

impl SharedState {
    #[must_use]
    pub fn new(initial_synergy: SynergyMap) -> Self {
        Self {
            inner: Mutex::new(Inner {
                running: false,
                shutdown: false,
                synergy: initial_synergy,
                pending_stop: None,
                pending_reset: false,
            }),
        }
    }

    /// Whether the session is currently running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    /// Snapshot of the synergy map.
    #[must_use]
    pub fn synergy(&self) -> SynergyMap {
        self.lock().synergy.clone()
    }

    /// Replace the synergy map.
    pub fn set_synergy(&self, synergy: SynergyMap) {
        self.lock().synergy = synergy;
    }

    /// Enter the running state and schedule a collaborator reset.
    pub(crate) fn begin(&self) {
        let mut inner = self.lock();
        inner.running = true;
        inner.pending_reset = true;
        inner.pending_stop = None;
    }

    /// Stop the session if it is running, recording `cause` for the loop.
    ///
    /// Returns whether this call performed the transition; concurrent
    /// triggers race on the flag, so exactly one of them wins.
    pub(crate) fn request_stop(&self, cause: StopCause) -> bool {
        let mut inner = self.lock();
        if inner.running {
            inner.running = false;
            inner.pending_stop = Some(cause);
            true
        } else {
            false
        }
    }

    /// Ask the control loop to exit after the current tick.
    pub(crate) fn request_shutdown(&self) {
        self.lock().shutdown = true;
    }

    /// Drain the pending signals for one tick.
    pub(crate) fn poll(&self) -> TickSignals {
        let mut inner = self.lock();
        TickSignals {
            running: inner.running,
            stop: inner.pending_stop.take(),
            reset: std::mem::take(&mut inner.pending_reset),
            shutdown: inner.shutdown,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("session state lock poisoned")
    }
}

// ---------------------------------------------------------------------------
// SessionHandle
// ---------------------------------------------------------------------------

/// Callback-facing API of the session actor.
///
/// Cheap to clone; every method takes the shared lock only for the field it
/// touches.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    shared: Arc<SharedState>,
    closing_threshold: f64,
}

impl SessionHandle {
    pub(crate) fn new(shared: Arc<SharedState>, closing_threshold: f64) -> Self {
        Self {
            shared,
            closing_threshold,
        }
    }

    /// Toggle the session state machine.
    ///
    /// Starting clears the contact tracker before the first running tick;
    /// stopping is recorded as an external stop command. Returns whether the
    /// session is running after the call.
    pub fn start(&self, run: bool) -> bool {
        if run {
            self.shared.begin();
            info!("start command received: entering the running state");
            true
        } else {
            if self.shared.request_stop(StopCause::Commanded) {
                debug!("stop command received while running");
            }
            false
        }
    }

    /// Feed one joint-state observation.
    ///
    /// Rebuilds the synergy map as the joint positions divided by the drive
    /// value, and stops the session once the drive value crosses the
    /// closing threshold.
    pub fn observe_joints(&self, observation: &JointObservation) {
        if observation.drive_value.abs() < f64::EPSILON {
            warn!("synergy drive value is zero: keeping the previous synergy map");
            return;
        }
        let scaled = &observation.positions / observation.drive_value;
        let synergy = DMatrix::from_column_slice(scaled.len(), 1, scaled.as_slice());
        self.shared.set_synergy(synergy);

        if observation.drive_value > self.closing_threshold
            && self.shared.request_stop(StopCause::HandClosed)
        {
            debug!(
                drive_value = observation.drive_value,
                threshold = self.closing_threshold,
                "closing threshold crossed"
            );
        }
    }

    /// Feed one safety-monitor report.
    pub fn report_safety(&self, report: &SafetyReport) {
        if let Some(cause) = report.stop_cause() {
            if self.shared.request_stop(cause) {
                debug!(%cause, "safety stop requested");
            }
        }
    }

    /// Whether the session is currently running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    /// Ask the control loop to exit after the current tick.
    pub fn shutdown(&self) {
        self.shared.request_shutdown();
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

    fn handle_with_threshold(threshold: f64) -> (Arc<SharedState>, SessionHandle) {
        let shared = Arc::new(SharedState::new(DMatrix::identity(1, 1)));
        let handle = SessionHandle::new(Arc::clone(&shared), threshold);
        (shared, handle)
    }

    #[test]
    fn start_and_stop_toggle_running() {
        let (_shared, handle) = handle_with_threshold(0.8);
        assert!(!handle.is_running());
        assert!(handle.start(true));
        assert!(handle.is_running());
        assert!(!handle.start(false));
        assert!(!handle.is_running());
    }

    #[test]
    fn only_the_first_stop_trigger_wins() {
        let (shared, _handle) = handle_with_threshold(0.8);
        shared.begin();
        assert!(shared.request_stop(StopCause::Collision));
        assert!(!shared.request_stop(StopCause::HandClosed));

        let signals = shared.poll();
        assert_eq!(signals.stop, Some(StopCause::Collision));
        assert!(!signals.running);
        // Consumed: the next poll sees nothing pending.
        assert_eq!(shared.poll().stop, None);
    }

    #[test]
    fn begin_schedules_a_reset_consumed_once() {
        let (shared, handle) = handle_with_threshold(0.8);
        handle.start(true);
        let signals = shared.poll();
        assert!(signals.running);
        assert!(signals.reset);
        assert!(!shared.poll().reset);
    }

    #[test]
    fn observe_joints_rebuilds_the_synergy_map() {
        let (shared, handle) = handle_with_threshold(0.8);
        handle.start(true);
        handle.observe_joints(&JointObservation {
            positions: DVector::from_vec(vec![0.2, 0.4]),
            drive_value: 0.4,
        });
        let synergy = shared.synergy();
        assert_eq!(synergy.shape(), (2, 1));
        assert_relative_eq!(synergy[(0, 0)], 0.5);
        assert_relative_eq!(synergy[(1, 0)], 1.0);
        assert!(handle.is_running());
    }

    #[test]
    fn zero_drive_value_keeps_previous_synergy() {
        let (shared, handle) = handle_with_threshold(0.8);
        handle.observe_joints(&JointObservation {
            positions: DVector::from_vec(vec![0.2, 0.4]),
            drive_value: 0.0,
        });
        assert_eq!(shared.synergy(), DMatrix::identity(1, 1));
    }

    #[test]
    fn crossing_the_threshold_stops_the_session() {
        let (shared, handle) = handle_with_threshold(0.8);
        handle.start(true);
        handle.observe_joints(&JointObservation {
            positions: DVector::from_vec(vec![0.9]),
            drive_value: 0.9,
        });
        assert!(!handle.is_running());
        assert_eq!(shared.poll().stop, Some(StopCause::HandClosed));
    }

    #[test]
    fn safety_report_without_flags_is_ignored() {
        let (shared, handle) = handle_with_threshold(0.8);
        handle.start(true);
        handle.report_safety(&SafetyReport::default());
        assert!(handle.is_running());
        handle.report_safety(&SafetyReport {
            collision: true,
            ..SafetyReport::default()
        });
        assert!(!handle.is_running());
        assert_eq!(shared.poll().stop, Some(StopCause::Collision));
    }

    #[test]
    fn shutdown_is_sticky() {
        let (shared, handle) = handle_with_threshold(0.8);
        handle.shutdown();
        assert!(shared.poll().shutdown);
        assert!(shared.poll().shutdown);
    }
}
