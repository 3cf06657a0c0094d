use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mt-hid")]
#[command(about = "Decode HID multitouch digitizer reports into Linux input events")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Descriptor fixture (TOML) describing the device's elements
    #[arg(long, env = "MTHID_DESCRIPTOR")]
    pub descriptor: Option<PathBuf>,

    /// Percentage of the pressure and tilt ranges trimmed as dead zone
    #[arg(long)]
    pub removal_percentage: Option<u8>,

    /// Device mode written to the device on start and wake
    #[arg(long)]
    pub input_mode: Option<i32>,

    /// Create a uinput device and forward events to it
    #[arg(long)]
    pub uinput: bool,

    /// Don't print events to stdout
    #[arg(long)]
    pub quiet: bool,

    /// Name of the uinput device
    #[arg(long)]
    pub device_name: Option<String>,

    /// Path to config file
    #[arg(long, env = "MTHID_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Feed a recorded report log through the driver
    Replay {
        /// Report log: "<timestamp_us> <hex bytes>" per line
        log: PathBuf,

        /// Sleep between reports to keep the recorded timing
        #[arg(long)]
        realtime: bool,
    },
    /// Parse the descriptor and print what was found
    Describe,
}
