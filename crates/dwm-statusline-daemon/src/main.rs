//! dwm-statusline
//!
//! Samples CPU temperature, battery, backlight and mixer state at a fixed
//! interval and publishes them as the X11 root window name, where dwm and
//! similar window managers show it in their bar.

mod config;
mod display;
mod format;
mod sample;
mod scheduler;
mod signals;

use anyhow::{Context, Result};
use dwm_statusline_hw::{DefaultMixer, SysfsReader};
use std::io;
use std::process::ExitCode;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use config::{BrightnessMode, Config};
use display::{DisplayError, DisplaySession, StatusDisplay};
use format::LineFormatter;
use sample::{BrightnessSource, Sensors};
use scheduler::Scheduler;
use signals::TerminationSignals;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Setup logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(exit_status(&e))
        }
    }
}

/// Exit status for a startup failure: the OS error code behind it when
/// there is one, otherwise 1.
fn exit_status(e: &anyhow::Error) -> u8 {
    e.chain()
        .find_map(|cause| {
            if let Some(io) = cause.downcast_ref::<io::Error>() {
                io.raw_os_error()
            } else {
                cause.downcast_ref::<DisplayError>()?.raw_os_error()
            }
        })
        .and_then(|code| u8::try_from(code).ok())
        .filter(|code| *code != 0)
        .unwrap_or(1)
}

async fn run() -> Result<()> {
    let config = Config::default();

    let mode = config.display.brightness;
    let with_randr = matches!(mode, BrightnessMode::Auto | BrightnessMode::Randr);
    let display = DisplaySession::connect(config.display.name.as_deref(), with_randr)
        .context("Failed to open X display")?;

    let signals = match TerminationSignals::install() {
        Ok(signals) => signals,
        Err(e) => {
            display.shutdown();
            return Err(e).context("Failed to install signal handlers");
        }
    };

    let reader = SysfsReader::new(&config.sysfs.root);
    let brightness = BrightnessSource::resolve(
        mode,
        display.has_backlight(),
        &reader,
        config.sysfs.backlight.as_deref(),
    );
    let sensors = Sensors::new(
        &config,
        DefaultMixer::new(config.audio.device.clone()),
        brightness,
    );
    let formatter = LineFormatter::new(config.max_line_len);

    let (stop_tx, stop_rx) = watch::channel(false);
    signals.notify(stop_tx);

    let summary = Scheduler::new(display, sensors, formatter, config.interval())
        .run(stop_rx)
        .await;
    info!("{:?} after {} ticks", summary.phase, summary.ticks);
    Ok(())
}
