//! Slot Watcher CLI
//!
//! Command-line interface for the appointment availability watcher.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use slot_watcher::appointment::{format_timestamp, AppointmentResult};
use slot_watcher::state::PollState;
use slot_watcher::{load_config, Config, WatcherBuilder};
use tracing::Level;

#[derive(Parser)]
#[command(name = "slot-watcher")]
#[command(about = "Polls an appointment endpoint through relays and alerts when slots appear")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Dashboard port (overrides config file)
    #[arg(long)]
    dashboard_port: Option<u16>,

    /// Poll once, print the result and exit
    #[arg(long)]
    once: bool,

    /// Log level
    #[arg(short, long, default_value = "info", value_parser = parse_log_level)]
    log_level: Level,
}

fn parse_log_level(s: &str) -> Result<Level, String> {
    s.parse().map_err(|_| {
        format!(
            "Invalid log level: {}. Use: trace, debug, info, warn, error",
            s
        )
    })
}

fn print_state(state: &PollState, timezone: &str) {
    if let Some(error) = &state.last_error {
        println!("{}", error);
        return;
    }
    match &state.last_result {
        Some(AppointmentResult::Error {
            message,
            last_modified,
            ..
        }) => {
            println!("Error: {}", message.as_deref().unwrap_or_default());
            if let Some(raw) = last_modified {
                println!("Last updated: {}", format_timestamp(raw, timezone));
            }
        }
        Some(AppointmentResult::Available { timestamps }) => {
            println!("Available appointments:");
            for raw in timestamps {
                println!("  {}", format_timestamp(raw, timezone));
            }
        }
        Some(AppointmentResult::Empty) | None => println!("No appointments available."),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    tracing::debug!(
        "Parsed command line arguments: config={:?}, dashboard_port={:?}, once={}, log_level={:?}",
        args.config,
        args.dashboard_port,
        args.once,
        args.log_level
    );

    let mut config = if let Some(config_path) = &args.config {
        tracing::debug!("Loading configuration from {:?}", config_path);
        load_config(config_path)?
    } else {
        tracing::debug!("Using default configuration");
        Config::default()
    };

    config.resolve_secrets()?;

    if let Some(dashboard_port) = args.dashboard_port {
        config.dashboard.port = dashboard_port;
    }

    tracing::info!("Starting slot watcher");
    tracing::debug!(
        "Relays: {}, Notifiers: {}, Interval: {}s",
        config.relays.len(),
        config.notifiers.len(),
        config.polling.interval_seconds
    );

    let timezone = config.display.timezone.clone();
    let once = args.once;

    let watcher = WatcherBuilder::new(config)
        .with_listener(Arc::new(|state: &PollState| {
            tracing::trace!(
                "State: loading={}, next poll in {}s",
                state.is_loading,
                state.seconds_until_next_poll
            );
        }))
        .build()?;

    if once {
        let state = watcher.poll_once().await;
        print_state(&state, &timezone);
        return Ok(());
    }

    watcher.start().await?;

    Ok(())
}
