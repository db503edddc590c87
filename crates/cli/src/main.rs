//! tempered-read
//!
//! Reads temperature and humidity from TEMPer USB sensors through libtempered,
//! or from a built-in simulated device set.

mod config;
mod filter;
mod logging;
mod report;

use anyhow::{Context, Result, bail};
use clap::Parser;
use config::{OutputFormat, ReaderConfig, expand_path};
use filter::DeviceFilter;
use logging::setup_logging;
use report::{DeviceReport, read_device};
use tempered::sim::SimProvider;
use tempered::{Provider, Tempered};
use tracing::{debug, error, info};

#[derive(Parser, Debug)]
#[command(name = "tempered-read")]
#[command(
    author,
    version,
    about = "Read TEMPer USB temperature and humidity sensors"
)]
#[command(long_about = "
Reads every attached TEMPer sensor device and prints its temperature and
humidity readings.

EXAMPLES:
    # Read all devices
    tempered-read

    # List devices without reading them
    tempered-read --list

    # Read a single device as JSON
    tempered-read --device /dev/hidraw3 --json

    # Try it without hardware
    tempered-read --simulate

    # Run with debug logging
    tempered-read --log-level debug

CONFIGURATION:
    The reader looks for configuration files in the following order:
    1. Path specified with --config
    2. ~/.config/tempered/config.toml
    3. /etc/tempered/config.toml
    4. Built-in defaults
")]
struct Args {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH")]
    config: Option<String>,

    /// Save default configuration to default location and exit
    #[arg(long)]
    save_config: bool,

    /// List sensor devices and exit
    #[arg(long)]
    list: bool,

    /// Print a single JSON document instead of text
    #[arg(long)]
    json: bool,

    /// Use simulated devices instead of hardware
    #[arg(long)]
    simulate: bool,

    /// Only use the device at this path (e.g. /dev/hidraw3)
    #[arg(short, long, value_name = "PATH")]
    device: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,
}

/// What to do with the selected devices
struct RunOptions {
    filters: Vec<DeviceFilter>,
    device: Option<String>,
    list: bool,
    format: OutputFormat,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Handle --save-config flag early (before loading config)
    if args.save_config {
        let config = ReaderConfig::default();
        let path = ReaderConfig::default_path();
        config.save(&path).context("Failed to save configuration")?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    let config = if let Some(ref path) = args.config {
        ReaderConfig::load(Some(expand_path(path))).context("Failed to load configuration")?
    } else {
        ReaderConfig::load_or_default()
    };

    // Use CLI log level if specified, otherwise use config value
    let log_level = args
        .log_level
        .as_deref()
        .unwrap_or(&config.general.log_level);
    setup_logging(log_level).context("Failed to setup logging")?;

    info!("tempered-read v{}", env!("CARGO_PKG_VERSION"));

    let options = RunOptions {
        filters: config.device_filters()?,
        device: args.device,
        list: args.list,
        format: if args.json {
            OutputFormat::Json
        } else {
            config.output.format
        },
    };

    if args.simulate {
        info!("Using simulated devices");
        return run(Tempered::new(SimProvider::demo()), &options);
    }

    run_native(&options)
}

#[cfg(feature = "native")]
fn run_native(options: &RunOptions) -> Result<()> {
    run(Tempered::new(tempered::LibTempered::new()), options)
}

#[cfg(not(feature = "native"))]
fn run_native(_options: &RunOptions) -> Result<()> {
    bail!("built without libtempered support: rebuild with --features native or pass --simulate")
}

/// Initialise, read or list the selected devices, then tear down
fn run<P: Provider>(mut tempered: Tempered<P>, options: &RunOptions) -> Result<()> {
    tempered
        .init()
        .context("Failed to initialise sensor library")?;

    let result = read_selected(&tempered, options);

    if let Err(e) = tempered.exit() {
        error!("Error shutting down sensor library: {}", e);
    }

    result
}

fn read_selected<P: Provider>(tempered: &Tempered<P>, options: &RunOptions) -> Result<()> {
    let descriptors = tempered
        .enumerate()
        .context("Failed to enumerate devices")?;
    debug!("Enumerated {} device(s)", descriptors.len());

    let selected = filter::select(descriptors, &options.filters, options.device.as_deref());

    if options.list {
        return report::print_devices(&selected, options.format);
    }

    if selected.is_empty() {
        bail!("No matching sensor devices found");
    }

    let reports: Vec<DeviceReport> = selected
        .into_iter()
        .map(|descriptor| read_device(&mut tempered.device(descriptor)))
        .collect();

    for failed in reports.iter().filter(|r| r.failed()) {
        for failure in failed.failures() {
            eprintln!("{}: {}", failed.descriptor.path, failure);
        }
    }

    report::print_reports(&reports, options.format)?;

    let failures = reports.iter().filter(|r| r.failed()).count();
    if failures > 0 {
        bail!("{} of {} device(s) failed", failures, reports.len());
    }
    Ok(())
}
