//! Per-tick sampling of every metric source.

use chrono::{Local, NaiveDateTime};
use dwm_statusline_hw::{
    AudioProvider, AudioSample, Battery, MixerBackend, MixerChannel, SysfsBacklight, SysfsReader,
    TemperatureSensor,
};
use std::fmt::Write;
use tracing::{info, warn};

use crate::config::{BrightnessMode, Config};
use crate::display::StatusDisplay;

/// Snapshot of all metrics for one tick. `None` means the metric could
/// not be read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sample {
    /// CPU temperature in degrees Celsius
    pub cpu_temperature: Option<i64>,
    /// Battery is charging
    pub battery_charging: Option<bool>,
    /// Battery charge or discharge rate in watts
    pub battery_rate_watts: Option<f64>,
    /// Remaining battery charge (0-100)
    pub battery_percent: Option<u8>,
    /// Backlight level (0-100)
    pub brightness_percent: Option<u8>,
    /// Mixer state
    pub audio: Option<AudioSample>,
    /// Local time, already formatted
    pub timestamp: Option<String>,
}

/// Source of the brightness field, chosen once at startup.
#[derive(Debug)]
pub enum BrightnessSource {
    /// RandR backlight property of the display
    Display,
    /// class/backlight files
    Sysfs(SysfsBacklight),
    /// Not reported
    Unavailable,
}

impl BrightnessSource {
    /// Picks the brightness source for `mode`.
    pub fn resolve(
        mode: BrightnessMode,
        display_has_backlight: bool,
        reader: &SysfsReader,
        device: Option<&str>,
    ) -> Self {
        let sysfs = || SysfsBacklight::open(reader.clone(), device).map(Self::Sysfs);
        let source = match mode {
            BrightnessMode::Disabled => Some(Self::Unavailable),
            BrightnessMode::Randr => display_has_backlight.then_some(Self::Display),
            BrightnessMode::Sysfs => sysfs(),
            BrightnessMode::Auto if display_has_backlight => Some(Self::Display),
            BrightnessMode::Auto => sysfs(),
        };
        match source {
            Some(source) => {
                info!("Brightness source: {:?}", source);
                source
            }
            None => {
                warn!("No backlight found for brightness mode {:?}", mode);
                Self::Unavailable
            }
        }
    }
}

/// Formats `time` with a strftime pattern, or `None` if the pattern is invalid.
pub fn format_timestamp(pattern: &str, time: &NaiveDateTime) -> Option<String> {
    let mut out = String::new();
    if write!(out, "{}", time.format(pattern)).is_err() {
        warn!("Failed to format time with {:?}", pattern);
        return None;
    }
    Some(out)
}

/// All metric providers.
pub struct Sensors<B> {
    temperature: TemperatureSensor,
    battery: Battery,
    brightness: BrightnessSource,
    audio: AudioProvider<B>,
    time_format: String,
}

impl<B: MixerBackend> Sensors<B> {
    /// Builds the providers described by `config`.
    pub fn new(config: &Config, mixer: B, brightness: BrightnessSource) -> Self {
        let reader = SysfsReader::new(&config.sysfs.root);
        let audio = AudioProvider::new(
            mixer,
            MixerChannel::from(&config.audio.volume_channel),
            config
                .audio
                .mute_channels
                .iter()
                .map(MixerChannel::from)
                .collect(),
        );
        Self {
            temperature: TemperatureSensor::new(reader.clone(), &config.sysfs.cpu_temperature),
            battery: Battery::new(reader, &config.sysfs.battery),
            brightness,
            audio,
            time_format: config.time_format.clone(),
        }
    }

    /// Reads every source once. Each read is independent; a failure only
    /// empties its own field.
    pub fn sample<D: StatusDisplay>(&self, display: &D) -> Sample {
        Sample {
            cpu_temperature: self.temperature.celsius(),
            battery_charging: self.battery.is_charging(),
            battery_rate_watts: self.battery.rate_watts(),
            battery_percent: self.battery.remaining_percent(),
            brightness_percent: match &self.brightness {
                BrightnessSource::Display => display.brightness_percent(),
                BrightnessSource::Sysfs(backlight) => backlight.percent(),
                BrightnessSource::Unavailable => None,
            },
            audio: self.audio.sample(),
            timestamp: format_timestamp(&self.time_format, &Local::now().naive_local()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::DisplayError;
    use chrono::NaiveDate;
    use dwm_statusline_hw::AmixerBackend;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    struct StubDisplay(Option<u8>);

    impl StatusDisplay for StubDisplay {
        fn brightness_percent(&self) -> Option<u8> {
            self.0
        }

        fn publish(&mut self, _text: &str) -> Result<(), DisplayError> {
            Ok(())
        }

        fn shutdown(self) {}
    }

    fn write_attr(root: &Path, relative: &str, value: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, value).unwrap();
    }

    fn config_for(root: &Path) -> Config {
        let mut config = Config::default();
        config.sysfs.root = root.to_string_lossy().into_owned();
        config
    }

    fn no_mixer() -> AmixerBackend {
        AmixerBackend::default().with_program("/nonexistent/amixer")
    }

    #[test]
    fn test_format_timestamp() {
        let time = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(
            format_timestamp("%m/%d.%H:%M:%S", &time).as_deref(),
            Some("01/01.00:00:00")
        );
        assert_eq!(format_timestamp("%Q", &time), None);
    }

    #[test]
    fn test_sample_full_tree() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write_attr(root, "class/hwmon/hwmon1/temp1_input", "45000\n");
        write_attr(root, "class/power_supply/BAT0/status", "Charging\n");
        write_attr(root, "class/power_supply/BAT0/voltage_now", "12300000\n");
        write_attr(root, "class/power_supply/BAT0/current_now", "1000000\n");
        write_attr(root, "class/power_supply/BAT0/charge_now", "80\n");
        write_attr(root, "class/power_supply/BAT0/charge_full", "100\n");

        let sensors = Sensors::new(&config_for(root), no_mixer(), BrightnessSource::Display);
        let sample = sensors.sample(&StubDisplay(Some(50)));

        assert_eq!(sample.cpu_temperature, Some(45));
        assert_eq!(sample.battery_charging, Some(true));
        assert!((sample.battery_rate_watts.unwrap() - 12.3).abs() < 1e-9);
        assert_eq!(sample.battery_percent, Some(80));
        assert_eq!(sample.brightness_percent, Some(50));
        assert_eq!(sample.audio, None);
        assert!(sample.timestamp.is_some());
    }

    #[test]
    fn test_sample_empty_tree() {
        let dir = TempDir::new().unwrap();
        let sensors = Sensors::new(
            &config_for(dir.path()),
            no_mixer(),
            BrightnessSource::Unavailable,
        );
        let sample = sensors.sample(&StubDisplay(Some(50)));
        assert_eq!(sample.cpu_temperature, None);
        assert_eq!(sample.battery_charging, None);
        assert_eq!(sample.battery_rate_watts, None);
        assert_eq!(sample.battery_percent, None);
        assert_eq!(sample.brightness_percent, None);
        assert!(sample.timestamp.is_some());
    }

    #[test]
    fn test_resolve_brightness_source() {
        let dir = TempDir::new().unwrap();
        let reader = SysfsReader::new(dir.path());

        assert!(matches!(
            BrightnessSource::resolve(BrightnessMode::Auto, true, &reader, None),
            BrightnessSource::Display
        ));
        assert!(matches!(
            BrightnessSource::resolve(BrightnessMode::Auto, false, &reader, None),
            BrightnessSource::Unavailable
        ));
        assert!(matches!(
            BrightnessSource::resolve(BrightnessMode::Randr, false, &reader, None),
            BrightnessSource::Unavailable
        ));
        assert!(matches!(
            BrightnessSource::resolve(BrightnessMode::Disabled, true, &reader, None),
            BrightnessSource::Unavailable
        ));

        write_attr(dir.path(), "class/backlight/intel_backlight/max_brightness", "100\n");
        assert!(matches!(
            BrightnessSource::resolve(BrightnessMode::Auto, false, &reader, None),
            BrightnessSource::Sysfs(_)
        ));
        assert!(matches!(
            BrightnessSource::resolve(BrightnessMode::Sysfs, true, &reader, None),
            BrightnessSource::Sysfs(_)
        ));
    }
}
