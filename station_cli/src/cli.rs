//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "station", version, about = "Weather-station series cleaner")]
pub struct Cli {
    /// Path to config TOML; built-in defaults when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log and report errors as JSON lines instead of pretty text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides [logging].level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

/// Date window flags shared by the cleaning commands.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct WindowArgs {
    /// Window start (ISO-8601; naive times are UTC); overrides [window].start
    #[arg(long, value_name = "TIME")]
    pub start: Option<String>,
    /// Window end (ISO-8601; naive times are UTC); overrides [window].end
    #[arg(long, value_name = "TIME")]
    pub end: Option<String>,
    /// Do not keep the reading just outside the window
    #[arg(long = "no-boundary", action = ArgAction::SetTrue)]
    pub no_boundary: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Clean a batch JSON document ({category: {sensor: [{timestamp, value}]}})
    Clean {
        /// Batch JSON file
        #[arg(long, value_name = "FILE")]
        input: PathBuf,
        #[command(flatten)]
        window: WindowArgs,
        /// Write the cleaned JSON here instead of stdout
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,
        /// Clean categories on worker threads
        #[arg(long, action = ArgAction::SetTrue)]
        parallel: bool,
        /// Append every rejected reading as a JSON line to this file
        #[arg(long, value_name = "FILE")]
        diagnostics: Option<PathBuf>,
    },
    /// Clean a single `timestamp,value` CSV series
    Series {
        #[arg(long, value_name = "FILE")]
        csv: PathBuf,
        /// temperature_celsius | relative_humidity_percent | air_pressure_pa
        #[arg(long)]
        category: String,
        /// Sensor display name (selects the physical range, e.g. "bmp280 outdoor")
        #[arg(long)]
        sensor: String,
        #[command(flatten)]
        window: WindowArgs,
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
    /// List the known station sensors and their physical ranges
    Sensors,
    /// Validate the config and print the effective parameters
    CheckConfig,
    /// Emit a simulated raw batch (input for `clean`)
    Simulate {
        /// Hours of data ending at --end
        #[arg(long, default_value_t = 24)]
        hours: u32,
        #[arg(long, default_value_t = 1)]
        seed: u32,
        /// Last timestamp (default: now, whole minute)
        #[arg(long, value_name = "TIME")]
        end: Option<String>,
        /// No spikes, glitches or outages
        #[arg(long = "no-faults", action = ArgAction::SetTrue)]
        no_faults: bool,
        #[arg(long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}
