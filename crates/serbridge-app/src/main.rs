mod settings;

use anyhow::{Context, Result};
use clap::Parser;
use serbridge_core::{
    list_ports, Bridge, BridgeConfig, SerialConfig, SerialPortDevice, Stdin, DEFAULT_BAUD_RATE,
    DEFAULT_DEVICE,
};
use settings::Settings;
use std::io;
use std::path::PathBuf;

/// Bridge standard input and output to a serial port.
///
/// Opens the device, writes one chunk of piped stdin to it (if stdin is a
/// pipe), then copies everything the device sends to stdout until an error
/// occurs.
#[derive(Parser, Debug)]
#[command(name = "serbridge", version)]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "PATH",
        help = format!("The serial device to use [default: {DEFAULT_DEVICE}]")
    )]
    device: Option<String>,

    #[arg(
        short,
        long,
        value_name = "RATE",
        value_parser = clap::value_parser!(u32).range(1..),
        help = format!("The baud rate to use on the serial device [default: {DEFAULT_BAUD_RATE}]")
    )]
    baudrate: Option<u32>,

    /// Write progress messages to stdout
    #[arg(short, long)]
    verbose: bool,

    /// Read defaults from this JSON file instead of the per-user one
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// List available serial ports and exit
    #[arg(long)]
    list_ports: bool,
}

impl Cli {
    fn bridge_config(&self, settings: Settings) -> BridgeConfig {
        BridgeConfig {
            serial: SerialConfig {
                device: self
                    .device
                    .clone()
                    .or(settings.device)
                    .unwrap_or_else(|| DEFAULT_DEVICE.to_string()),
                baud_rate: self.baudrate.or(settings.baudrate).unwrap_or(DEFAULT_BAUD_RATE),
            },
            verbose: self.verbose,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    if cli.list_ports {
        for port in list_ports().context("Failed to list serial ports")? {
            println!("{port}");
        }
        return Ok(());
    }

    let settings = Settings::load(cli.config.as_deref())?;
    let config = cli.bridge_config(settings);
    log::debug!("Starting with {config:?}");

    let report = Bridge::new(config, Stdin, io::stdout().lock(), io::stderr().lock())
        .run(SerialPortDevice::open);
    std::process::exit(report.exit_code());
}
