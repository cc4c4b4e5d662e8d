//! CLI argument definitions and shared statics.

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "solder", version, about = "Soldering robot console")]
pub struct Cli {
    /// Path to config TOML; built-in defaults when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print results and errors as JSON
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides [logging].level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum ShapeArg {
    Square,
    Rectangle,
    Circle,
    Concentric,
}

/// One pad from flags, or a whole pad list from CSV.
#[derive(Args, Debug, Clone)]
pub struct PadArgs {
    /// Pad list CSV (label,shape,z_mm,a_mm,b_mm,solder_height_mm)
    #[arg(long, value_name = "FILE", conflicts_with = "shape")]
    pub pads: Option<PathBuf>,

    /// Pad shape
    #[arg(long, value_enum, required_unless_present = "pads")]
    pub shape: Option<ShapeArg>,

    /// Square side (mm)
    #[arg(long, value_name = "MM")]
    pub side: Option<f64>,

    /// Rectangle length (mm)
    #[arg(long, value_name = "MM")]
    pub length: Option<f64>,

    /// Rectangle width (mm)
    #[arg(long, value_name = "MM")]
    pub width: Option<f64>,

    /// Circle radius (mm)
    #[arg(long, value_name = "MM")]
    pub radius: Option<f64>,

    /// Concentric ring outer radius (mm)
    #[arg(long, value_name = "MM")]
    pub outer_radius: Option<f64>,

    /// Concentric ring inner radius (mm)
    #[arg(long, value_name = "MM")]
    pub inner_radius: Option<f64>,

    /// Solder layer height (mm)
    #[arg(long, value_name = "MM", default_value_t = 0.5)]
    pub height: f64,

    /// Wire diameter (mm); [wire].diameter_mm when omitted
    #[arg(long, value_name = "MM")]
    pub diameter: Option<f64>,

    /// Working height of the single pad (mm, 0 is home, lower is negative)
    #[arg(long, value_name = "MM", default_value_t = -5.0, allow_negative_numbers = true)]
    pub z: f64,

    /// Label of the single pad
    #[arg(long, default_value = "pad")]
    pub label: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compute area, solder volume, wire feed and suggested temperature
    Plan {
        #[command(flatten)]
        pads: PadArgs,
    },
    /// Run a full sequence against the simulated controller
    Simulate {
        #[command(flatten)]
        pads: PadArgs,
        /// Break the wire while dispensing this pad (1-based)
        #[arg(long, value_name = "N")]
        inject_wire_break_at_pad: Option<usize>,
        /// Give up and stop the run after this long
        #[arg(long, value_name = "MS", default_value_t = 600_000)]
        timeout_ms: u64,
    },
    /// Validate the config and round-trip the simulated link
    SelfCheck,
}
