//! palmgrip CLI.
//!
//! Provides two modes of operation:
//! - `run`: drive a headless demo session against a synthetic single-contact
//!   hand and print a summary
//! - `info`: print the default configuration as TOML

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use nalgebra::DVector;
use tracing::info;

use palmgrip_core::config::SessionConfig;
use palmgrip_core::error::PalmgripError;
use palmgrip_core::time::LoopRate;
use palmgrip_core::types::JointObservation;
use palmgrip_session::{SessionPhase, SessionRunner};

mod demo;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

/// Grasp-preserving motion controller for a robotic hand.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a headless demo session and print a summary.
    Run {
        /// Number of control ticks to execute.
        #[arg(short = 'n', long, default_value_t = 200)]
        ticks: u32,

        /// Tick at which the synthetic drive crosses the closing threshold.
        #[arg(long, default_value_t = 150)]
        close_at: u32,

        /// Optional TOML configuration file.
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Print the default configuration as TOML.
    Info,
}

fn main() -> Result<(), PalmgripError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Commands::Run {
            ticks,
            close_at,
            config,
        } => run_demo(ticks, close_at, config),
        Commands::Info => {
            let config = SessionConfig::default();
            println!(
                "{}",
                toml_repr(&config).unwrap_or_else(|| "<unprintable configuration>".into())
            );
            Ok(())
        }
    }
}

fn toml_repr(config: &SessionConfig) -> Option<String> {
    // serde round-trip through the same crate the loader uses.
    toml::to_string_pretty(config).ok()
}

// ---------------------------------------------------------------------------
// Headless demo
// ---------------------------------------------------------------------------

fn run_demo(ticks: u32, close_at: u32, config_path: Option<PathBuf>) -> Result<(), PalmgripError> {
    let config = match config_path {
        Some(path) => SessionConfig::from_file(path)?,
        None => SessionConfig::default(),
    };
    let threshold = config.closing_threshold;

    let dispatch_log = demo::DispatchLog::new();
    let dispatched = dispatch_log.count_handle();
    let mut runner = SessionRunner::new(
        config,
        Box::new(demo::SingleTouchTracker::new()),
        Box::new(demo::SingleContactBuilder::new()),
        Box::new(dispatch_log),
        Box::new(demo::LoggingEndSink),
    )?;
    let handle = runner.handle();
    handle.start(true);

    let mut rate = LoopRate::from_hz(runner.config().rate_hz);
    let mut running_ticks = 0u32;
    let mut infeasible_ticks = 0u32;

    for tick in 0..ticks {
        // Synthetic hand: the drive value ramps toward closed and crosses
        // the threshold around `close_at`.
        let drive = 0.1 + (f64::from(tick) / f64::from(close_at.max(1))) * threshold;
        handle.observe_joints(&JointObservation {
            positions: DVector::from_vec(vec![drive]),
            drive_value: drive,
        });

        let outcome = runner.tick();
        if outcome.phase == SessionPhase::Running {
            running_ticks += 1;
        }
        if outcome.feasible == Some(false) {
            infeasible_ticks += 1;
        }
        rate.sleep();
    }

    info!("demo finished");
    println!("ticks executed:    {ticks}");
    println!("running ticks:     {running_ticks}");
    println!("infeasible ticks:  {infeasible_ticks}");
    println!(
        "commands sent:     {}",
        dispatched.load(std::sync::atomic::Ordering::SeqCst)
    );
    println!(
        "session running:   {}",
        if handle.is_running() { "yes" } else { "no" }
    );
    Ok(())
}
