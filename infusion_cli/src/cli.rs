//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "infusion", version, about = "Infusion sensor-fusion estimator CLI")]
pub struct Cli {
    /// Path to the estimator config TOML (pins, physical constants, tunables).
    #[arg(long, value_name = "FILE", default_value = "etc/infusion_config.toml")]
    pub config: PathBuf,

    /// Log as JSON lines instead of pretty text.
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace).
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub cmd: Commands,
}

/// Memory locking mode for real-time operation of the tick loop.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum RtLock {
    None,
    Current,
    All,
}

impl RtLock {
    #[inline]
    pub fn os_default() -> Self {
        #[cfg(target_os = "linux")]
        {
            return RtLock::Current;
        }
        #[cfg(target_os = "macos")]
        {
            return RtLock::None;
        }
        #[allow(unreachable_code)]
        RtLock::None
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the estimator against a simulated mass sensor and drop source for
    /// a fixed duration, driving one tick per configured `T_main`.
    Simulate {
        /// Wall-clock duration to run, in seconds.
        #[arg(long, default_value_t = 120)]
        duration_s: u64,
        /// Initial bag + liquid mass presented to the simulated sensor, in grams.
        #[arg(long, default_value_t = 572.0)]
        initial_mass_g: f32,
        /// Simulated drain rate of the bag, in grams/second.
        #[arg(long, default_value_t = 0.5)]
        drain_gps: f32,
        /// Simulated drop rate, in drops/minute.
        #[arg(long, default_value_t = 20.0)]
        drops_per_min: f32,
        /// Device id to stamp onto the cloud JSON payload.
        #[arg(long, default_value = "sim-0001")]
        device_id: String,
        /// Write the 26-field CSV telemetry trace to this path.
        #[arg(long, value_name = "FILE")]
        csv_out: Option<PathBuf>,
        /// Enable real-time scheduling for the tick loop (SCHED_FIFO, affinity, mlockall).
        #[arg(long, action = ArgAction::SetTrue)]
        rt: bool,
        /// Real-time priority for SCHED_FIFO on Linux; ignored on macOS.
        #[arg(long, value_name = "PRIO")]
        rt_prio: Option<i32>,
        /// Memory locking mode for --rt: none, current, or all.
        #[arg(long, value_enum, value_name = "MODE")]
        rt_lock: Option<RtLock>,
        /// CPU index to pin the process to when --rt is enabled (Linux only).
        #[arg(long, value_name = "CPU")]
        rt_cpu: Option<usize>,
    },
    /// Parse and validate the config TOML, then exit.
    ValidateConfig,
    /// Quick smoke test: read the mass sensor a few times and report timing.
    SelfCheck,
}
