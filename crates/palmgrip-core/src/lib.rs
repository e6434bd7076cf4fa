// palmgrip-core: Types, traits, config, timing, errors for the palmgrip grasp controller.

pub mod config;
pub mod error;
pub mod time;
pub mod traits;
pub mod types;

pub mod prelude {
    pub use crate::config::{MotionProfile, SessionConfig};
    pub use crate::error::{
        AssembleError, ConfigError, DispatchError, NotifyError, PalmgripError, SolveError,
    };
    pub use crate::time::LoopRate;
    pub use crate::traits::{CommandSink, ContactTracker, GraspMatrixBuilder, SessionEndSink};
    pub use crate::types::{
        motion_dim, Contact, ContactMap, ConstraintKind, FingerId, GraspState, JointObservation,
        MotionCommand, SafetyReport, StopCause, SynergyMap, COMMAND_DIM, TWIST_DIM,
    };
}
