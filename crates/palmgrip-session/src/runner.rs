//! The fixed-rate control loop driving the grasp-preserving pipeline.

use std::sync::Arc;

use nalgebra::{DMatrix, DVector};
use tracing::{debug, error, info, warn};

use palmgrip_core::config::SessionConfig;
use palmgrip_core::error::{ConfigError, PalmgripError, SolveError};
use palmgrip_core::time::LoopRate;
use palmgrip_core::traits::{CommandSink, ContactTracker, GraspMatrixBuilder, SessionEndSink};
use palmgrip_core::types::{GraspState, MotionCommand, StopCause, SynergyMap};
use palmgrip_solver::{assemble, NullSpaceSolver, RelaxationEngine, SolveResult};

use crate::shared::{SessionHandle, SharedState};

// ---------------------------------------------------------------------------
// TickOutcome
// ---------------------------------------------------------------------------

/// Which side of the state machine a tick executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Running,
}

/// What one tick did, for the embedding layer and for tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutcome {
    pub phase: SessionPhase,
    /// The command handed to the sink this tick.
    pub command: MotionCommand,
    /// Solver verdict, when the pipeline ran to completion.
    pub feasible: Option<bool>,
    /// Relaxation order after the tick.
    pub order: usize,
    /// Whether a shutdown was requested.
    pub shutdown: bool,
}

// ---------------------------------------------------------------------------
// SessionRunner
// ---------------------------------------------------------------------------

/// Owns the collaborators and drives the per-tick pipeline.
///
/// Lives on the control thread. Everything asynchronous reaches it through
/// the [`SessionHandle`] and the shared-state lock; the relaxation engine
/// and the per-tick matrices are private to this thread and need no
/// synchronization.
pub struct SessionRunner {
    config: SessionConfig,
    shared: Arc<SharedState>,
    tracker: Box<dyn ContactTracker>,
    builder: Box<dyn GraspMatrixBuilder>,
    sink: Box<dyn CommandSink>,
    end_sink: Box<dyn SessionEndSink>,
    engine: RelaxationEngine,
    solver: NullSpaceSolver,
    last_command: MotionCommand,
}

impl SessionRunner {
    /// Build a runner from a validated configuration and its collaborators.
    ///
    /// The synergy map starts as the identity (fully actuated hand) until
    /// the first joint observation arrives.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the configuration is invalid.
    pub fn new(
        config: SessionConfig,
        tracker: Box<dyn ContactTracker>,
        builder: Box<dyn GraspMatrixBuilder>,
        sink: Box<dyn CommandSink>,
        end_sink: Box<dyn SessionEndSink>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let dims = config.synergy_dims();
        let solver = NullSpaceSolver::new(config.weight_matrix());
        let shared = Arc::new(SharedState::new(DMatrix::identity(dims, dims)));
        Ok(Self {
            config,
            shared,
            tracker,
            builder,
            sink,
            end_sink,
            engine: RelaxationEngine::new(),
            solver,
            last_command: MotionCommand::zeros(),
        })
    }

    /// The actor handle for callback contexts.
    #[must_use]
    pub fn handle(&self) -> SessionHandle {
        SessionHandle::new(Arc::clone(&self.shared), self.config.closing_threshold)
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Execute one control tick.
    ///
    /// Never panics on collaborator or solver failures: every error is local
    /// to the tick, logged, and answered with a safe command.
    pub fn tick(&mut self) -> TickOutcome {
        let signals = self.shared.poll();

        if let Some(cause) = signals.stop {
            self.end_session(cause);
        }
        if signals.reset {
            self.tracker.reset();
            self.engine.reset();
            self.last_command = MotionCommand::zeros();
        }

        let (phase, command, feasible) = if signals.running {
            let (command, feasible) = self.running_tick();
            (SessionPhase::Running, command, feasible)
        } else {
            (SessionPhase::Idle, MotionCommand::zeros(), None)
        };

        self.dispatch(command);
        TickOutcome {
            phase,
            command,
            feasible,
            order: self.engine.order(),
            shutdown: signals.shutdown,
        }
    }

    /// Run the loop at the configured rate until a shutdown is requested.
    pub fn run(&mut self) {
        info!(rate_hz = self.config.rate_hz, "control loop started");
        let mut rate = LoopRate::from_hz(self.config.rate_hz);
        loop {
            let outcome = self.tick();
            if outcome.shutdown {
                break;
            }
            rate.sleep();
        }
        info!("control loop finished");
    }

    // -- tick internals --

    fn running_tick(&mut self) -> (MotionCommand, Option<bool>) {
        let contacts = self.tracker.contacts();
        let multi = contacts.len() > 1 && self.config.multi_contact_switch;
        let profile = if multi {
            &self.config.multi
        } else {
            &self.config.single
        };
        self.builder.set_mode(profile.constraint, &profile.permutation);

        let Some(grasp) = self.builder.build(&contacts) else {
            debug!("no usable contact set: holding with the zero reference");
            return (MotionCommand::zeros(), None);
        };

        let x_d = profile.desired_vector();
        let synergy = self.shared.synergy();

        match self.solve_tick(&synergy, &grasp, &x_d) {
            Ok(result) => {
                let reference = if result.feasible || !self.config.relax_to_zero {
                    result.x_ref
                } else {
                    DVector::zeros(x_d.len())
                };
                let scaled = reference * self.config.scaling;
                (MotionCommand::from_reference(&scaled), Some(result.feasible))
            }
            Err(PalmgripError::Solve(SolveError::SingularProjection)) => {
                error!("weighted projection is singular: tick failed");
                if self.config.relax_to_zero {
                    (MotionCommand::zeros(), None)
                } else {
                    // Propagate the stale reference.
                    (self.last_command, None)
                }
            }
            Err(err) => {
                error!("tick rejected: {err}");
                (MotionCommand::zeros(), None)
            }
        }
    }

    fn solve_tick(
        &mut self,
        synergy: &SynergyMap,
        grasp: &GraspState,
        x_d: &DVector<f64>,
    ) -> Result<SolveResult, PalmgripError> {
        let system = assemble(synergy, grasp, x_d)?;
        self.engine.observe_desired(x_d);
        let pair = self.engine.reduction(&system, grasp.num_contacts)?;
        let feasible = self.engine.feasible(&pair, &system)?;
        let result = self.solver.solve(&system, x_d, feasible)?;
        if !feasible && !self.engine.escalate(system.rows()) {
            warn!(order = self.engine.order(), "relaxation exhausted: tick remains infeasible");
        }
        Ok(result)
    }

    fn end_session(&mut self, cause: StopCause) {
        match cause {
            StopCause::HandClosed => info!("hand is almost fully closed: stopping the grasp session"),
            StopCause::Collision => warn!("imminent collision: stopping the grasp session"),
            StopCause::JointLimit => warn!("joint-limit violation: stopping the grasp session"),
            StopCause::Commanded => info!("external stop command: stopping the grasp session"),
        }
        self.tracker.reset();
        self.engine.reset();
        self.last_command = MotionCommand::zeros();

        // The orchestrator hears back about stops it did not itself command.
        if cause != StopCause::Commanded {
            if let Err(err) = self.end_sink.session_ended(cause) {
                error!("session-end notification failed: {err}");
            }
        }
    }

    fn dispatch(&mut self, command: MotionCommand) {
        self.last_command = command;
        if let Err(err) = self.sink.dispatch(&command) {
            error!("command dispatch failed: {err}");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use palmgrip_test_utils::{
        single_contact_state, FailingSink, RecordingEndSink, RecordingSink,
        ScriptedContactTracker, StaticGraspBuilder,
    };

    fn runner_with_sink(sink: Box<dyn CommandSink>) -> SessionRunner {
        SessionRunner::new(
            SessionConfig::default(),
            Box::new(ScriptedContactTracker::new(Default::default())),
            Box::new(StaticGraspBuilder::new(Some(single_contact_state()), None)),
            sink,
            Box::new(RecordingEndSink::new()),
        )
        .unwrap()
    }

    #[test]
    fn idle_tick_is_a_zero_heartbeat() {
        let sink = RecordingSink::new();
        let commands = sink.commands_handle();
        let mut runner = runner_with_sink(Box::new(sink));

        let outcome = runner.tick();
        assert_eq!(outcome.phase, SessionPhase::Idle);
        assert!(outcome.command.is_zero());
        assert_eq!(outcome.feasible, None);
        assert_eq!(commands.lock().unwrap().len(), 1);
    }

    #[test]
    fn dispatch_failure_never_stops_the_loop() {
        let sink = FailingSink::new();
        let attempts = sink.attempts_handle();
        let mut runner = runner_with_sink(Box::new(sink));

        runner.tick();
        runner.tick();
        assert_eq!(attempts.load(std::sync::atomic::Ordering::SeqCst), 2);
    }

    #[test]
    fn invalid_config_is_rejected_at_construction() {
        let config = SessionConfig {
            rate_hz: -5.0,
            ..SessionConfig::default()
        };
        let result = SessionRunner::new(
            config,
            Box::new(ScriptedContactTracker::new(Default::default())),
            Box::new(StaticGraspBuilder::new(None, None)),
            Box::new(RecordingSink::new()),
            Box::new(RecordingEndSink::new()),
        );
        assert!(matches!(result, Err(ConfigError::InvalidRate(_))));
    }
}
