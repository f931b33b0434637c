//! # Tello Teleop
//!
//! Fly a Tello-class drone from the keyboard, with an optional gamepad.
//!
//! Wires the pieces together: loads configuration, starts the input reader
//! threads, opens the UDP vehicle link, and hands everything to the session
//! loop. The session sends a bounded four-axis velocity command at the tick
//! rate and presents the video feed at the render rate until Escape,
//! Ctrl+C, or a stopped feed ends it.

use anyhow::{bail, Context, Result};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use tello_teleop::config::Config;
use tello_teleop::input::gamepad::GamepadReader;
use tello_teleop::input::keyboard::KeyboardReader;
use tello_teleop::link::tello::TelloLink;
use tello_teleop::session::Session;
use tello_teleop::telemetry::FlightLog;
use tello_teleop::video::StatsDisplay;

/// Configuration path used when none is given on the command line.
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load_or_default(&config_path).context("failed to load configuration")?;

    // Console layer always; a non-blocking file layer when telemetry is on.
    // The guard must outlive the session so buffered lines get flushed.
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());
    let console = tracing_subscriber::fmt::layer();
    let _guard = if config.telemetry.enabled {
        let appender = tracing_appender::rolling::daily(&config.telemetry.log_dir, "teleop.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        tracing_subscriber::registry()
            .with(filter)
            .with(console)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false),
            )
            .init();
        Some(guard)
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(console)
            .init();
        None
    };

    info!("Tello Teleop v{} starting...", env!("CARGO_PKG_VERSION"));

    let (sender, events) = tokio::sync::mpsc::unbounded_channel();

    let Some(keyboard) = KeyboardReader::detect().context("keyboard scan failed")? else {
        bail!("no keyboard device found under /dev/input");
    };
    keyboard.spawn(sender.clone());

    let gamepad_present = match GamepadReader::detect() {
        Ok(Some(gamepad)) => {
            gamepad.spawn(sender);
            true
        }
        Ok(None) => {
            info!("No gamepad detected, keyboard only");
            false
        }
        Err(e) => {
            warn!("Gamepad scan failed, keyboard only: {}", e);
            false
        }
    };

    let link = TelloLink::bind(&config.link)
        .await
        .context("failed to open vehicle link")?;

    let flight_log = if config.telemetry.enabled {
        Some(FlightLog::open(&config.telemetry).context("failed to open flight log")?)
    } else {
        None
    };

    let session = Session::new(
        link,
        config,
        events,
        gamepad_present,
        Box::new(StatsDisplay::new()),
        flight_log,
    );

    session.run().await.context("session failed")?;
    Ok(())
}
