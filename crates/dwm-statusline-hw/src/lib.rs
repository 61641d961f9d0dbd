//! dwm-statusline hardware library
//!
//! Reads the host metrics shown on the status line: CPU temperature,
//! battery state and backlight level from sysfs, and playback volume and
//! mute switches from the sound mixer.

pub mod audio;
pub mod error;
pub mod sysfs;

pub use audio::{
    AmixerBackend, AudioProvider, AudioSample, DefaultMixer, MixerBackend, MixerChannel,
    MixerHandle, VolumeLevel,
};
pub use error::{Error, Result};
pub use sysfs::{Battery, SysfsBacklight, SysfsReader, TemperatureSensor};

/// Default sysfs mount point.
pub const SYSFS_ROOT: &str = "/sys";

/// Maps `current` within `[min, max]` onto 0-100.
///
/// An empty or inverted range yields 0 and values outside the range are
/// clamped, so the result is always a valid percentage.
pub fn percent_of_range(current: i64, min: i64, max: i64) -> u8 {
    let range = max.saturating_sub(min);
    if range <= 0 {
        return 0;
    }
    let offset = current.saturating_sub(min).clamp(0, range);
    (offset.saturating_mul(100) / range) as u8
}
