mod simulated;

use std::{path::PathBuf, result::Result as StdResult, sync::Arc};

use anyhow::Context;
use clap::Parser;
use log::{error, info, warn};
use scheduled_location::{
    ChannelDelegate, LocationEvent, ManagerSettings, ScheduledLocationManager,
};
use tokio::sync::mpsc;

use simulated::SimulatedLocation;

type Result<T = (), E = anyhow::Error> = StdResult<T, E>;

#[derive(Parser)]
/// Poll a simulated location service on a schedule and log what the delegate receives
struct Cli {
    /// Seconds between location requests, overrides the settings file
    #[arg(short, long)]
    interval: Option<u32>,

    /// Path to a JSON settings file
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Seed for the simulated walk
    #[arg(long, default_value_t = 0)]
    seed: u64,

    /// Latitude to start walking from
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    lat: f64,

    /// Longitude to start walking from
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    long: f64,

    /// Make every Nth request fail
    #[arg(long)]
    fail_every: Option<u32>,

    /// Exit after this many delegate callbacks
    #[arg(short, long)]
    polls: Option<u64>,
}

fn log_event(event: &LocationEvent) {
    match event {
        LocationEvent::Update(locations) => {
            for loc in locations {
                info!(
                    "Location {:.6},{:.6} +/-{:.0}m at {}",
                    loc.lat, loc.long, loc.horizontal_accuracy, loc.timestamp
                );
            }
        }
        LocationEvent::Failure(why) => warn!("Location failed: {why}"),
    }
}

#[tokio::main]
async fn main() -> Result {
    colog::init();

    let cli = Cli::parse();

    let mut settings = cli
        .settings
        .as_deref()
        .map(ManagerSettings::load)
        .transpose()
        .context("Invalid settings file passed")?
        .unwrap_or_default();

    if let Some(interval) = cli.interval {
        settings.interval_seconds = interval;
    }

    let location = SimulatedLocation::new(cli.seed, (cli.lat, cli.long), cli.fail_every);
    let manager = ScheduledLocationManager::with_settings(location, &settings)
        .context("Failed to set up location manager")?;

    let (tx, mut rx) = mpsc::channel(16);
    let delegate = Arc::new(ChannelDelegate::new(tx));
    manager.set_delegate(&delegate);

    info!(
        "Starting scheduled location {} (interval {}s)",
        env!("CARGO_PKG_VERSION"),
        settings.interval_seconds
    );

    manager.get_user_location_with_interval(settings.interval_seconds)?;

    let mut received = 0;

    loop {
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                if let Err(why) = res {
                    error!("Failed to listen for ctrl-c: {why:?}");
                }
                break;
            }

            Some(event) = rx.recv() => {
                log_event(&event);
                received += 1;
                if cli.polls.is_some_and(|max| received >= max) {
                    break;
                }
            }
        }
    }

    manager.stop_updating();

    let stats = manager.stats();
    info!(
        "Made {} requests, forwarded {} updates and {} failures",
        stats.requests, stats.updates, stats.failures
    );

    Ok(())
}
