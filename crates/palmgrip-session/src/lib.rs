//! Session state machine and fixed-rate control loop for palmgrip.
//!
//! The [`SessionRunner`](runner::SessionRunner) owns the collaborators and
//! drives the per-tick pipeline on the control thread; the
//! [`SessionHandle`](shared::SessionHandle) is the thin actor API that
//! sensor callbacks, the safety monitor and the orchestrator's start/stop
//! command use from their own threads.
//!
//! ```text
//! joint observer ──┐
//! safety monitor ──┼─► SessionHandle ─► SharedState ─► SessionRunner::tick ─► CommandSink
//! start command  ──┘         (one lock, field access only)
//! ```

pub mod runner;
pub mod shared;

pub use runner::{SessionPhase, SessionRunner, TickOutcome};
pub use shared::{SessionHandle, SharedState};
