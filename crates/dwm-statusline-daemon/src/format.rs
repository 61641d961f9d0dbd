//! Status line layout.
//!
//! `<TEMP>C b<BRIGHT>% <SIGN><RATE>W/<BATTERY>% <VOLUME> <TIME>`, with
//! `n/a` standing in for any field that could not be read.

use std::fmt;
use tracing::debug;

use crate::sample::Sample;

const UNAVAILABLE: &str = "n/a";

struct Celsius(Option<i64>);

impl fmt::Display for Celsius {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(degrees) => write!(f, "{:02}C", degrees),
            None => f.write_str(UNAVAILABLE),
        }
    }
}

struct Percent(Option<u8>);

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(percent) => write!(f, "{}%", percent),
            None => f.write_str(UNAVAILABLE),
        }
    }
}

struct Watts(Option<f64>);

impl fmt::Display for Watts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(watts) => write!(f, "{:.1}W", watts),
            None => f.write_str(UNAVAILABLE),
        }
    }
}

/// Renders samples into the published line.
#[derive(Debug, Clone, Copy)]
pub struct LineFormatter {
    max_len: usize,
}

impl LineFormatter {
    /// Creates a formatter whose output never exceeds `max_len` bytes.
    pub fn new(max_len: usize) -> Self {
        Self { max_len }
    }

    pub fn format(&self, sample: &Sample) -> String {
        let sign = if sample.battery_charging == Some(true) {
            '+'
        } else {
            '-'
        };
        let volume = match &sample.audio {
            Some(audio) => audio.to_string(),
            None => UNAVAILABLE.to_string(),
        };

        let mut line = format!(
            "{} b{} {}{}/{} {} {}",
            Celsius(sample.cpu_temperature),
            Percent(sample.brightness_percent),
            sign,
            Watts(sample.battery_rate_watts),
            Percent(sample.battery_percent),
            volume,
            sample.timestamp.as_deref().unwrap_or_default(),
        );
        line.truncate(line.trim_end().len());

        if line.len() > self.max_len {
            debug!("Status line truncated from {} bytes", line.len());
            let mut end = self.max_len;
            while !line.is_char_boundary(end) {
                end -= 1;
            }
            line.truncate(end);
        }
        line
    }
}
