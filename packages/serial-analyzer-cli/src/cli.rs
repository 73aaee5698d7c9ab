use clap::{Args, Parser, Subcommand};
use serial_analyzer::ReducerKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "serial-analyzer",
    version,
    about = "Serial sample monitor with median and moving-average filters",
    long_about = "Read fixed-size text samples from a serial device (or a recorded capture),\n\
                  filter them with windowed median and moving-average analyzers and log\n\
                  raw and filtered values to files."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Command {
    /// Attach analyzers to a source and log their outputs until stopped
    Monitor(MonitorArgs),
    /// Run one analyzer over a file of samples, one per line
    Filter(FilterArgs),
    /// List serial ports available on this machine
    Ports(PortsArgs),
}

#[derive(Args)]
pub struct MonitorArgs {
    /// JSON monitor configuration (replaces the source and analyzer flags)
    #[arg(long, env = "SERIAL_ANALYZER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Serial port to read from (e.g. /dev/ttyACM0, COM3)
    #[arg(long, env = "SERIAL_ANALYZER_PORT", conflicts_with = "file")]
    pub port: Option<String>,

    /// Baud rate of the serial port
    #[arg(long, default_value_t = 9600)]
    pub baud: u32,

    /// Size in bytes of every message the device sends
    #[arg(long, default_value_t = 10)]
    pub frame_size: usize,

    /// Replay a recorded capture instead of reading a port
    #[arg(long)]
    pub file: Option<String>,

    /// Delay between replayed frames in milliseconds
    #[arg(long)]
    pub rate_limit_ms: Option<u64>,

    /// Restart the capture when it ends
    #[arg(long, default_value_t = false)]
    pub loop_playback: bool,

    /// Attach a median filter with this radius (repeatable)
    #[arg(long)]
    pub median: Vec<usize>,

    /// Attach a moving-average filter with this radius (repeatable)
    #[arg(long)]
    pub mean: Vec<usize>,

    /// Polling interval in milliseconds
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Directory receiving the output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Stop after this many seconds
    #[arg(long)]
    pub duration: Option<u64>,

    /// Print the final summary as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Suppress progress messages on stderr
    #[arg(long, default_value_t = false)]
    pub quiet: bool,
}

#[derive(Args)]
pub struct FilterArgs {
    /// Input file, one sample per line
    #[arg(long)]
    pub file: String,

    /// Reducer to apply (median, mean)
    #[arg(long, default_value = "median")]
    pub kind: ReducerKind,

    /// Window radius k; the window holds 2k+1 samples
    #[arg(long, default_value_t = 2)]
    pub radius: usize,

    /// Output file (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Compact JSON output (no indentation)
    #[arg(long, default_value_t = false)]
    pub compact: bool,
}

#[derive(Args)]
pub struct PortsArgs {
    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}
