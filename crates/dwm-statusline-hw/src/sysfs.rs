//! Sysfs metric readers for temperature, battery and backlight.

use crate::{percent_of_range, Error, Result};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Upper bound on the bytes read from a single attribute file.
const MAX_ATTRIBUTE_LEN: u64 = 64;

/// Reads small text attributes below a sysfs root.
#[derive(Debug, Clone)]
pub struct SysfsReader {
    root: PathBuf,
}

impl SysfsReader {
    /// Creates a reader rooted at `root` (normally `/sys`).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the sysfs root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reads an attribute relative to the root.
    ///
    /// At most 64 bytes are read and trailing whitespace is stripped.
    pub fn read_attribute(&self, relative: impl AsRef<Path>) -> Result<String> {
        let path = self.root.join(relative);
        let mut buf = Vec::new();
        File::open(&path)
            .and_then(|file| file.take(MAX_ATTRIBUTE_LEN).read_to_end(&mut buf))
            .map_err(|source| Error::Sysfs {
                path: path.clone(),
                source,
            })?;
        Ok(String::from_utf8_lossy(&buf).trim_end().to_string())
    }

    /// Reads an attribute, returning `None` when it is missing or unreadable.
    pub fn read_value(&self, relative: impl AsRef<Path>) -> Option<String> {
        match self.read_attribute(relative) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!("{}", e);
                None
            }
        }
    }

    /// Reads and parses a numeric attribute.
    pub fn read_number<T: FromStr>(&self, relative: impl AsRef<Path>) -> Option<T> {
        let relative = relative.as_ref();
        let value = self.read_value(relative)?;
        match value.trim().parse() {
            Ok(number) => Some(number),
            Err(_) => {
                let e = Error::SysfsValue {
                    path: self.root.join(relative),
                    value,
                };
                debug!("{}", e);
                None
            }
        }
    }
}

/// Converts a hwmon reading in millidegrees to whole degrees Celsius.
///
/// Truncates toward zero.
pub fn millidegrees_to_celsius(millidegrees: i64) -> i64 {
    millidegrees / 1000
}

/// CPU temperature sensor backed by a hwmon `temp*_input` file.
#[derive(Debug, Clone)]
pub struct TemperatureSensor {
    reader: SysfsReader,
    path: PathBuf,
}

impl TemperatureSensor {
    /// Creates a sensor for `path`, relative to the reader root.
    pub fn new(reader: SysfsReader, path: impl Into<PathBuf>) -> Self {
        Self {
            reader,
            path: path.into(),
        }
    }

    /// Returns the current temperature in degrees Celsius.
    pub fn celsius(&self) -> Option<i64> {
        self.reader
            .read_number::<i64>(&self.path)
            .map(millidegrees_to_celsius)
    }
}

/// Returns true if a power supply `status` value means charging.
///
/// The comparison is exact and case-sensitive.
pub fn is_charging_status(status: &str) -> bool {
    status == "Charging"
}

/// Computes power in watts from microvolts and microamps.
pub fn power_watts(microvolts: i64, microamps: i64) -> f64 {
    (microamps as f64 / 1_000_000.0) * (microvolts as f64 / 1_000_000.0)
}

/// Computes the remaining charge as a percentage of full charge.
///
/// Returns `None` when `full` is zero. Worn batteries can report `now`
/// above `full`, so the result is capped at 100.
pub fn remaining_percent(now: u64, full: u64) -> Option<u8> {
    if full == 0 {
        return None;
    }
    Some((now.saturating_mul(100) / full).min(100) as u8)
}

/// Battery exposed under `class/power_supply/<name>`.
#[derive(Debug, Clone)]
pub struct Battery {
    reader: SysfsReader,
    dir: PathBuf,
}

impl Battery {
    /// Creates a battery reader for the named power supply (e.g. "BAT0").
    pub fn new(reader: SysfsReader, name: &str) -> Self {
        Self {
            reader,
            dir: Path::new("class/power_supply").join(name),
        }
    }

    fn number<T: FromStr>(&self, attribute: &str) -> Option<T> {
        self.reader.read_number(self.dir.join(attribute))
    }

    /// Returns whether the battery is charging.
    pub fn is_charging(&self) -> Option<bool> {
        self.reader
            .read_value(self.dir.join("status"))
            .map(|status| is_charging_status(&status))
    }

    /// Returns the present charge or discharge rate in watts.
    ///
    /// Uses `voltage_now * current_now`, falling back to `power_now` for
    /// batteries that only report power. The rate is never negative; the
    /// direction is given by [`Battery::is_charging`].
    pub fn rate_watts(&self) -> Option<f64> {
        let from_current = self
            .number::<i64>("voltage_now")
            .zip(self.number::<i64>("current_now"))
            .map(|(microvolts, microamps)| power_watts(microvolts, microamps));
        let watts = match from_current {
            Some(watts) => watts,
            None => self.number::<i64>("power_now")? as f64 / 1_000_000.0,
        };
        Some(watts.abs())
    }

    /// Returns the remaining charge in percent.
    ///
    /// Uses `charge_now`/`charge_full`, falling back to
    /// `energy_now`/`energy_full`.
    pub fn remaining_percent(&self) -> Option<u8> {
        let pair = |now: &str, full: &str| self.number::<u64>(now).zip(self.number::<u64>(full));
        let (now, full) =
            pair("charge_now", "charge_full").or_else(|| pair("energy_now", "energy_full"))?;
        remaining_percent(now, full)
    }
}

/// Backlight device under `class/backlight/<device>`.
#[derive(Debug, Clone)]
pub struct SysfsBacklight {
    reader: SysfsReader,
    dir: PathBuf,
}

impl SysfsBacklight {
    /// Opens the named backlight device, or the first usable one when
    /// `device` is `None`.
    ///
    /// A device is usable when its `max_brightness` can be read.
    pub fn open(reader: SysfsReader, device: Option<&str>) -> Option<Self> {
        let class = Path::new("class/backlight");
        let dir = match device {
            Some(name) => class.join(name),
            None => {
                let mut names: Vec<_> = fs::read_dir(reader.root().join(class))
                    .ok()?
                    .flatten()
                    .map(|entry| entry.file_name())
                    .collect();
                names.sort();
                names
                    .into_iter()
                    .map(|name| class.join(name))
                    .find(|dir| reader.read_value(dir.join("max_brightness")).is_some())?
            }
        };
        reader.read_value(dir.join("max_brightness"))?;
        debug!("Using backlight device {}", dir.display());
        Some(Self { reader, dir })
    }

    /// Returns the current brightness in percent of the maximum.
    pub fn percent(&self) -> Option<u8> {
        let actual: i64 = self.reader.read_number(self.dir.join("actual_brightness"))?;
        let max: i64 = self.reader.read_number(self.dir.join("max_brightness"))?;
        if max <= 0 {
            return None;
        }
        Some(percent_of_range(actual, 0, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_attr(root: &Path, relative: &str, value: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, value).unwrap();
    }

    fn battery_tree(attrs: &[(&str, &str)]) -> (TempDir, Battery) {
        let dir = TempDir::new().unwrap();
        for (name, value) in attrs {
            write_attr(
                dir.path(),
                &format!("class/power_supply/BAT0/{}", name),
                value,
            );
        }
        let battery = Battery::new(SysfsReader::new(dir.path()), "BAT0");
        (dir, battery)
    }

    #[test]
    fn test_read_attribute_trims_newline() {
        let dir = TempDir::new().unwrap();
        write_attr(dir.path(), "class/hwmon/hwmon1/name", "coretemp\n");
        let reader = SysfsReader::new(dir.path());
        assert_eq!(
            reader.read_attribute("class/hwmon/hwmon1/name").unwrap(),
            "coretemp"
        );
    }

    #[test]
    fn test_read_attribute_is_bounded() {
        let dir = TempDir::new().unwrap();
        write_attr(dir.path(), "long", &"x".repeat(500));
        let reader = SysfsReader::new(dir.path());
        assert_eq!(reader.read_attribute("long").unwrap().len(), 64);
    }

    #[test]
    fn test_missing_attribute() {
        let dir = TempDir::new().unwrap();
        let reader = SysfsReader::new(dir.path());
        assert!(matches!(
            reader.read_attribute("does/not/exist"),
            Err(Error::Sysfs { .. })
        ));
        assert_eq!(reader.read_value("does/not/exist"), None);
        assert_eq!(reader.read_number::<i64>("does/not/exist"), None);
    }

    #[test]
    fn test_read_number_rejects_garbage() {
        let dir = TempDir::new().unwrap();
        write_attr(dir.path(), "value", "abc\n");
        let reader = SysfsReader::new(dir.path());
        assert_eq!(reader.read_number::<i64>("value"), None);
    }

    #[test]
    fn test_millidegrees_to_celsius() {
        assert_eq!(millidegrees_to_celsius(36500), 36);
        assert_eq!(millidegrees_to_celsius(45000), 45);
        assert_eq!(millidegrees_to_celsius(999), 0);
        assert_eq!(millidegrees_to_celsius(-1500), -1);
    }

    #[test]
    fn test_temperature_sensor() {
        let dir = TempDir::new().unwrap();
        write_attr(dir.path(), "class/hwmon/hwmon1/temp1_input", "36500\n");
        let reader = SysfsReader::new(dir.path());

        let sensor = TemperatureSensor::new(reader.clone(), "class/hwmon/hwmon1/temp1_input");
        assert_eq!(sensor.celsius(), Some(36));

        let missing = TemperatureSensor::new(reader, "class/hwmon/hwmon9/temp1_input");
        assert_eq!(missing.celsius(), None);
    }

    #[test]
    fn test_is_charging_status() {
        assert!(is_charging_status("Charging"));
        assert!(!is_charging_status("Discharging"));
        assert!(!is_charging_status("Not charging"));
        assert!(!is_charging_status("charging"));
        assert!(!is_charging_status(" Charging"));
        assert!(!is_charging_status(""));
    }

    #[test]
    fn test_remaining_percent() {
        assert_eq!(remaining_percent(50, 100), Some(50));
        assert_eq!(remaining_percent(2999, 4000), Some(74));
        assert_eq!(remaining_percent(4200, 4000), Some(100));
    }

    #[test]
    fn test_remaining_percent_zero_full() {
        assert_eq!(remaining_percent(50, 0), None);
        assert_eq!(remaining_percent(0, 0), None);
    }

    #[test]
    fn test_power_watts() {
        let watts = power_watts(12_300_000, 1_000_000);
        assert!((watts - 12.3).abs() < 1e-9);
    }

    #[test]
    fn test_battery_readings() {
        let (_dir, battery) = battery_tree(&[
            ("status", "Charging\n"),
            ("voltage_now", "12000000\n"),
            ("current_now", "1025000\n"),
            ("charge_now", "3200000\n"),
            ("charge_full", "4000000\n"),
        ]);
        assert_eq!(battery.is_charging(), Some(true));
        assert!((battery.rate_watts().unwrap() - 12.3).abs() < 1e-9);
        assert_eq!(battery.remaining_percent(), Some(80));
    }

    #[test]
    fn test_battery_negative_current() {
        let (_dir, battery) = battery_tree(&[
            ("status", "Discharging\n"),
            ("voltage_now", "12000000\n"),
            ("current_now", "-1025000\n"),
        ]);
        assert_eq!(battery.is_charging(), Some(false));
        assert!((battery.rate_watts().unwrap() - 12.3).abs() < 1e-9);
    }

    #[test]
    fn test_battery_energy_fallback() {
        let (_dir, battery) = battery_tree(&[
            ("status", "Discharging\n"),
            ("power_now", "8500000\n"),
            ("energy_now", "25000000\n"),
            ("energy_full", "50000000\n"),
        ]);
        assert_eq!(battery.is_charging(), Some(false));
        assert!((battery.rate_watts().unwrap() - 8.5).abs() < 1e-9);
        assert_eq!(battery.remaining_percent(), Some(50));
    }

    #[test]
    fn test_battery_zero_full_charge() {
        let (_dir, battery) = battery_tree(&[("charge_now", "10\n"), ("charge_full", "0\n")]);
        assert_eq!(battery.remaining_percent(), None);
    }

    #[test]
    fn test_battery_missing() {
        let dir = TempDir::new().unwrap();
        let battery = Battery::new(SysfsReader::new(dir.path()), "BAT0");
        assert_eq!(battery.is_charging(), None);
        assert_eq!(battery.rate_watts(), None);
        assert_eq!(battery.remaining_percent(), None);
    }

    #[test]
    fn test_backlight_autodetect() {
        let dir = TempDir::new().unwrap();
        write_attr(dir.path(), "class/backlight/intel_backlight/max_brightness", "1000\n");
        write_attr(dir.path(), "class/backlight/intel_backlight/actual_brightness", "500\n");
        let backlight = SysfsBacklight::open(SysfsReader::new(dir.path()), None).unwrap();
        assert_eq!(backlight.percent(), Some(50));
    }

    #[test]
    fn test_backlight_named_device() {
        let dir = TempDir::new().unwrap();
        write_attr(dir.path(), "class/backlight/acpi_video0/max_brightness", "15\n");
        write_attr(dir.path(), "class/backlight/acpi_video0/actual_brightness", "15\n");
        let reader = SysfsReader::new(dir.path());
        let backlight = SysfsBacklight::open(reader.clone(), Some("acpi_video0")).unwrap();
        assert_eq!(backlight.percent(), Some(100));
        assert!(SysfsBacklight::open(reader, Some("intel_backlight")).is_none());
    }

    #[test]
    fn test_backlight_zero_max() {
        let dir = TempDir::new().unwrap();
        write_attr(dir.path(), "class/backlight/bl/max_brightness", "0\n");
        write_attr(dir.path(), "class/backlight/bl/actual_brightness", "0\n");
        let backlight = SysfsBacklight::open(SysfsReader::new(dir.path()), None).unwrap();
        assert_eq!(backlight.percent(), None);
    }

    #[test]
    fn test_backlight_absent() {
        let dir = TempDir::new().unwrap();
        assert!(SysfsBacklight::open(SysfsReader::new(dir.path()), None).is_none());
    }
}
