//! Fixed-interval sample, format and publish loop.

use dwm_statusline_hw::MixerBackend;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::display::StatusDisplay;
use crate::format::LineFormatter;
use crate::sample::Sensors;

/// Lifecycle of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Created, loop not started
    Initializing,
    /// Ticking every interval
    Running,
    /// Stop requested; no new tick will start
    Draining,
    /// Display closed
    Stopped,
}

/// Outcome of [`Scheduler::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Lines published (or attempted)
    pub ticks: u64,
    /// Final phase, always `Stopped` once the display is closed
    pub phase: Phase,
}

/// Drives the sample, format, publish, sleep cycle.
pub struct Scheduler<D, B> {
    display: D,
    sensors: Sensors<B>,
    formatter: LineFormatter,
    interval: Duration,
    phase: Phase,
}

impl<D: StatusDisplay, B: MixerBackend> Scheduler<D, B> {
    pub fn new(display: D, sensors: Sensors<B>, formatter: LineFormatter, interval: Duration) -> Self {
        Self {
            display,
            sensors,
            formatter,
            interval,
            phase: Phase::Initializing,
        }
    }

    fn set_phase(&mut self, phase: Phase) {
        debug!("Scheduler {:?} -> {:?}", self.phase, phase);
        self.phase = phase;
    }

    /// Samples every source, formats the line and publishes it.
    pub fn tick(&mut self) -> String {
        let sample = self.sensors.sample(&self.display);
        let line = self.formatter.format(&sample);
        if let Err(e) = self.display.publish(&line) {
            warn!("Failed to publish status: {}", e);
        }
        line
    }

    /// Ticks until `stop` becomes true, then shuts the display down.
    ///
    /// The stop request is checked between ticks and interrupts the sleep;
    /// a tick in progress always completes. Ticks do not catch up: the next
    /// one starts a full interval after the previous one finished. A
    /// dropped sender is treated as a stop request.
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) -> RunSummary {
        self.set_phase(Phase::Running);
        let mut ticks = 0;

        loop {
            if *stop.borrow_and_update() {
                break;
            }

            let line = self.tick();
            ticks += 1;
            debug!("Published {:?}", line);

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                changed = stop.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        self.set_phase(Phase::Draining);
        let Self {
            display, mut phase, ..
        } = self;
        display.shutdown();
        debug!("Scheduler {:?} -> {:?}", phase, Phase::Stopped);
        phase = Phase::Stopped;

        RunSummary { ticks, phase }
    }
}
