//! Configuration management.
//!
//! The daemon has no configuration file or flags; `Config::default()` is
//! the single place the built-in constants are collected.

#![allow(dead_code)]

use dwm_statusline_hw::MixerChannel;
use std::time::Duration;

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Poll interval in milliseconds
    pub interval: u64,

    /// strftime pattern for the clock field
    pub time_format: String,

    /// Maximum length of the published line in bytes
    pub max_line_len: usize,

    /// Sysfs sources
    pub sysfs: SysfsConfig,

    /// Mixer channels
    pub audio: AudioConfig,

    /// Display and backlight
    pub display: DisplayConfig,
}

/// Sysfs paths, relative to `root`.
#[derive(Debug, Clone, PartialEq)]
pub struct SysfsConfig {
    /// Sysfs mount point
    pub root: String,

    /// CPU temperature file, in millidegrees Celsius
    pub cpu_temperature: String,

    /// Power supply name under class/power_supply
    pub battery: String,

    /// Backlight device under class/backlight (None = first found)
    pub backlight: Option<String>,
}

impl Default for SysfsConfig {
    fn default() -> Self {
        Self {
            root: default_sysfs_root(),
            cpu_temperature: default_cpu_temperature(),
            battery: default_battery(),
            backlight: None,
        }
    }
}

/// A mixer control and its status line marker.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelConfig {
    pub name: String,
    pub index: u32,
    pub marker: char,
}

impl From<&ChannelConfig> for MixerChannel {
    fn from(channel: &ChannelConfig) -> Self {
        MixerChannel::new(channel.name.clone(), channel.index, channel.marker)
    }
}

/// Mixer configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioConfig {
    /// ALSA device
    pub device: String,

    /// Channel whose volume is shown
    pub volume_channel: ChannelConfig,

    /// Channels shown by mute marker only, before the volume channel
    pub mute_channels: Vec<ChannelConfig>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: default_audio_device(),
            volume_channel: default_volume_channel(),
            mute_channels: default_mute_channels(),
        }
    }
}

/// Where the brightness field comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BrightnessMode {
    /// RandR if available, otherwise sysfs
    #[default]
    Auto,
    /// RandR "Backlight" output property
    Randr,
    /// class/backlight files
    Sysfs,
    /// Brightness is not reported
    Disabled,
}

/// Display configuration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DisplayConfig {
    /// X display name (None = $DISPLAY)
    pub name: Option<String>,

    /// Brightness source
    pub brightness: BrightnessMode,
}

// Default value functions
fn default_interval() -> u64 {
    500
}

fn default_time_format() -> String {
    "%m/%d.%H:%M:%S".to_string()
}

fn default_max_line_len() -> usize {
    127
}

fn default_sysfs_root() -> String {
    dwm_statusline_hw::SYSFS_ROOT.to_string()
}

fn default_cpu_temperature() -> String {
    "class/hwmon/hwmon1/temp1_input".to_string()
}

fn default_battery() -> String {
    "BAT0".to_string()
}

fn default_audio_device() -> String {
    "default".to_string()
}

fn default_volume_channel() -> ChannelConfig {
    ChannelConfig {
        name: "Master".to_string(),
        index: 0,
        marker: 'M',
    }
}

fn default_mute_channels() -> Vec<ChannelConfig> {
    vec![ChannelConfig {
        name: "IEC958".to_string(),
        index: 1,
        marker: 'H',
    }]
}

impl Config {
    /// Returns the poll interval.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            time_format: default_time_format(),
            max_line_len: default_max_line_len(),
            sysfs: SysfsConfig::default(),
            audio: AudioConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}
