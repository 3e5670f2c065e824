mod cli;

use std::process;
use std::time::Duration;

use clap::Parser;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

use castlink::{CastConfig, CommandOutcome, Device, DiscoveryCoordinator, Dispatcher, Result};

use crate::cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = load_config(&cli).and_then(|config| match &cli.command {
        Commands::Discover { seconds } => discover(&config, *seconds),
        Commands::Cast { device, url, seconds } => {
            with_device(&config, device, *seconds, |dispatcher, target| dispatcher.send(target, url))
        }
        Commands::Control { device, action, seconds } => {
            let action = (*action).into();
            with_device(&config, device, *seconds, |dispatcher, target| dispatcher.control(target, action))
        }
    });

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            log::error!("{}", e);
            process::exit(1);
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    if let Err(e) = TermLogger::init(level, Config::default(), TerminalMode::Stderr, ColorChoice::Auto) {
        eprintln!("logging disabled: {}", e);
    }
}

fn load_config(cli: &Cli) -> Result<CastConfig> {
    match &cli.config {
        Some(path) => CastConfig::load(path),
        None => Ok(CastConfig::default()),
    }
}

fn scan(config: &CastConfig, seconds: u64) -> Result<Vec<Device>> {
    let coordinator = DiscoveryCoordinator::new(&config.discovery)?;
    log::info!("scanning for {}s", seconds);
    let mut devices = coordinator.discover_for(Duration::from_secs(seconds))?;
    log::info!("found {} receiver(s)", devices.len());
    devices.sort_by(|a, b| a.name().cmp(b.name()).then_with(|| a.id().as_str().cmp(b.id().as_str())));
    Ok(devices)
}

fn discover(config: &CastConfig, seconds: u64) -> Result<bool> {
    let devices = scan(config, seconds)?;
    if devices.is_empty() {
        println!("no receivers found");
        return Ok(true);
    }

    for device in &devices {
        println!("{}\t{}\t{}:{}\t{}", device.id(), device.name(), device.host(), device.port(), device.protocol());
    }
    Ok(true)
}

fn with_device<F>(config: &CastConfig, query: &str, seconds: u64, command: F) -> Result<bool>
where
    F: FnOnce(&Dispatcher, &Device) -> CommandOutcome,
{
    let devices = scan(config, seconds)?;
    let Some(device) = find_device(&devices, query) else {
        log::warn!("no receiver matching '{}' among {} found", query, devices.len());
        return Ok(false);
    };
    log::info!("selected {} ({})", device, device.protocol());

    let dispatcher = Dispatcher::new(config)?;
    let outcome = command(&dispatcher, device);
    println!("{}", outcome);
    Ok(outcome.is_success())
}

/// Exact id first, then a case-insensitive name match
fn find_device<'a>(devices: &'a [Device], query: &str) -> Option<&'a Device> {
    devices
        .iter()
        .find(|device| device.id().as_str() == query)
        .or_else(|| devices.iter().find(|device| device.name().eq_ignore_ascii_case(query)))
}
