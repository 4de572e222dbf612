//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "lumen", version, about = "Adaptive light-matching LED controller")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/lumen.toml")]
    pub config: PathBuf,

    /// Print results and errors as JSON lines
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides logging.level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Memory locking mode for real-time operation.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum RtLock {
    /// Do not lock memory
    None,
    /// Lock currently resident pages
    Current,
    /// Lock current and future pages
    All,
}

impl RtLock {
    #[inline]
    pub fn os_default() -> Self {
        #[cfg(target_os = "linux")]
        {
            return RtLock::All;
        }
        #[cfg(target_os = "macos")]
        {
            return RtLock::Current;
        }
        #[allow(unreachable_code)]
        RtLock::None
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the control loop until Ctrl-C or --ticks
    Run {
        /// Stop after this many ticks (default: run until Ctrl-C)
        #[arg(long, value_name = "N")]
        ticks: Option<u64>,
        /// Simulated panel: start with the mode switch on Manual
        #[arg(long, action = ArgAction::SetTrue)]
        manual: bool,
        /// Simulated panel: potentiometer ADC count used in Manual mode
        #[arg(long, value_name = "RAW", default_value_t = 0)]
        pot: u16,
        /// Simulated panel: start with the LED switch off
        #[arg(long, action = ArgAction::SetTrue)]
        off: bool,
        /// Feed the loop from a recorded trace instead of synthetic daylight
        #[arg(
            long,
            value_name = "FILE",
            long_help = "Feed the simulated sensor from a trace CSV (header 'timestamp,lux1,lux2') instead of the [simulation] daylight profile.\n\nEach row is one sensor read. Without --ticks the run stops once every row has been consumed. Ignored by the hardware backend."
        )]
        trace: Option<PathBuf>,
        /// Print control loop latency stats
        #[arg(long, action = ArgAction::SetTrue)]
        stats: bool,
        /// Lock process memory (mlockall) before entering the loop
        #[arg(
            long,
            action = ArgAction::SetTrue,
            long_help = "Lock the process address space into RAM before entering the control loop.\n\nLinux and macOS: calls mlockall according to --rt-lock. This removes page faults from the tick path but may require elevated privileges or a raised memlock ulimit. Other platforms: ignored with a warning."
        )]
        rt: bool,
        /// Select memory locking mode for --rt: none, current, or all
        #[arg(
            long,
            value_enum,
            value_name = "MODE",
            long_help = "Select memory locking mode when --rt is enabled.\n- none: do not lock memory.\n- current: lock currently resident pages (mlockall(MCL_CURRENT)).\n- all: lock current and future pages (mlockall(MCL_CURRENT|MCL_FUTURE)).\nDefault: all on Linux, current on macOS."
        )]
        rt_lock: Option<RtLock>,
    },
    /// Replay a recorded trace offline and print one line per sample
    Replay {
        /// Trace CSV with header 'timestamp,lux1,lux2'
        #[arg(long, value_name = "FILE")]
        trace: PathBuf,
    },
    /// Validate the config and the filter setup (and hardware presence with --features hardware)
    SelfCheck,
}
