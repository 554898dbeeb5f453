use std::time::Duration;

use clap::{Args, Subcommand};
use radiolink_frame::{BandwidthPreset, RadioVariant};
use radiolink_link::{Characteristic, LinkConfig, LinkTiming, Role};
use radiolink_transport::SerialConfig;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod ports;
pub mod run;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Bring the link up and print state changes and received data.
    Run(RunArgs),
    /// Bring the link up and transmit one payload.
    Send(SendArgs),
    /// List serial ports visible on this host.
    Ports(PortsArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Run(args) => run::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Ports(args) => ports::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Serial device and radio settings shared by `run` and `send`.
#[derive(Args, Debug, Clone)]
pub struct LinkArgs {
    /// Serial device path.
    #[arg(long, env = "RADIOLINK_PORT", default_value = "/dev/ttyUSB0")]
    pub port: String,
    /// Line speed in baud.
    #[arg(long, env = "RADIOLINK_BAUD", default_value_t = 19200)]
    pub baud: u32,
    /// Radio hardware variant (a or b).
    #[arg(long, env = "RADIOLINK_VARIANT", default_value = "a")]
    pub variant: RadioVariant,
    /// Scheduling role (master or slave).
    #[arg(long, env = "RADIOLINK_ROLE", default_value = "master")]
    pub role: Role,
    /// Channel bandwidth preset (narrow, standard, wide, max).
    #[arg(long, env = "RADIOLINK_BANDWIDTH", default_value = "standard")]
    pub bandwidth: BandwidthPreset,
    /// Pause after each handshake command (e.g. 2s, 500ms).
    #[arg(long, default_value = "2s")]
    pub settle: String,
    /// Period of master sequence sends (e.g. 2s, 500ms).
    #[arg(long, default_value = "2s")]
    pub interval: String,
}

impl LinkArgs {
    pub fn serial_config(&self) -> SerialConfig {
        SerialConfig {
            port: self.port.clone(),
            baud_rate: self.baud,
            ..SerialConfig::default()
        }
    }

    pub fn link_config(&self) -> CliResult<LinkConfig> {
        Ok(LinkConfig {
            variant: self.variant,
            role: self.role,
            bandwidth: self.bandwidth,
            timing: LinkTiming {
                settle_delay: parse_duration(&self.settle)?,
                master_interval: parse_duration(&self.interval)?,
                ..LinkTiming::default()
            },
        })
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Characteristics to subscribe to (comma-separated).
    #[arg(long, value_delimiter = ',', default_value = "rssi")]
    pub characteristic: Vec<Characteristic>,
    /// Exit after printing N deliveries.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub link: LinkArgs,
    /// Payload as text.
    #[arg(long, conflicts_with = "hex", required_unless_present = "hex")]
    pub data: Option<String>,
    /// Payload as hex bytes.
    #[arg(long, conflicts_with = "data")]
    pub hex: Option<String>,
    /// Maximum time to wait for the write (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub timeout: String,
}

#[derive(Args, Debug, Default)]
pub struct PortsArgs {}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse `500ms`, `2s` or a bare number of seconds.
pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}
