//! Sound mixer sampling.
//!
//! A fresh mixer handle is opened for every sample and released when it is
//! dropped, so a sound card that appears or disappears between polls is
//! picked up on the next one.

mod amixer;
#[cfg(feature = "alsa")]
mod alsa_mixer;

pub use amixer::{AmixerBackend, AmixerSnapshot};
#[cfg(feature = "alsa")]
pub use alsa_mixer::{AlsaBackend, AlsaHandle};

use crate::{percent_of_range, Result};
use std::fmt;
use tracing::debug;

/// Mixer backend used by the daemon.
#[cfg(feature = "alsa")]
pub type DefaultMixer = AlsaBackend;

/// Mixer backend used by the daemon.
#[cfg(not(feature = "alsa"))]
pub type DefaultMixer = AmixerBackend;

/// A simple mixer control, addressed by name and index, and the letter
/// that represents it on the status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixerChannel {
    pub name: String,
    pub index: u32,
    pub marker: char,
}

impl MixerChannel {
    pub fn new(name: impl Into<String>, index: u32, marker: char) -> Self {
        Self {
            name: name.into(),
            index,
            marker,
        }
    }
}

/// Playback volume of a control and its valid range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeLevel {
    pub min: i64,
    pub max: i64,
    pub current: i64,
}

impl VolumeLevel {
    /// Returns the volume as a percentage of the range (0 for an empty range).
    pub fn percent(&self) -> u8 {
        percent_of_range(self.current, self.min, self.max)
    }
}

/// Opens mixer handles.
pub trait MixerBackend {
    type Handle: MixerHandle;

    /// Opens, attaches and loads a mixer. The handle is closed on drop.
    fn open(&self) -> Result<Self::Handle>;
}

/// Read access to an open mixer.
pub trait MixerHandle {
    /// Returns the playback volume of the control, if it exists and has one.
    fn playback_volume(&self, name: &str, index: u32) -> Option<VolumeLevel>;

    /// Returns the playback switch of the control: `Some(true)` when sound
    /// is on, `Some(false)` when muted.
    fn playback_switch(&self, name: &str, index: u32) -> Option<bool>;
}

/// Reading of a single control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelSample {
    pub volume_percent: Option<u8>,
    pub playback_on: Option<bool>,
}

/// Mute state of one channel as shown on the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MuteMarker {
    pub marker: char,
    pub playback_on: Option<bool>,
}

impl fmt::Display for MuteMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self.playback_on {
            Some(true) => self.marker.to_ascii_uppercase(),
            Some(false) => self.marker.to_ascii_lowercase(),
            None => '?',
        };
        write!(f, "{}", c)
    }
}

/// Audio state for one tick: a marker per channel followed by the volume.
///
/// Renders as e.g. `HM42%`, or `HMn/a` when the volume channel is missing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSample {
    pub mutes: Vec<MuteMarker>,
    pub volume_percent: Option<u8>,
}

impl fmt::Display for AudioSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for mute in &self.mutes {
            write!(f, "{}", mute)?;
        }
        match self.volume_percent {
            Some(percent) => write!(f, "{}%", percent),
            None => f.write_str("n/a"),
        }
    }
}

fn read_channel<H: MixerHandle>(handle: &H, name: &str, index: u32) -> ChannelSample {
    ChannelSample {
        volume_percent: handle
            .playback_volume(name, index)
            .map(|level| level.percent()),
        playback_on: handle.playback_switch(name, index),
    }
}

/// Samples volume and mute switches from a mixer backend.
pub struct AudioProvider<B> {
    backend: B,
    volume_channel: MixerChannel,
    mute_channels: Vec<MixerChannel>,
}

impl<B: MixerBackend> AudioProvider<B> {
    /// Creates a provider reporting the volume of `volume_channel` and the
    /// mute state of `mute_channels` followed by `volume_channel`.
    pub fn new(backend: B, volume_channel: MixerChannel, mute_channels: Vec<MixerChannel>) -> Self {
        Self {
            backend,
            volume_channel,
            mute_channels,
        }
    }

    fn open(&self) -> Option<B::Handle> {
        match self.backend.open() {
            Ok(handle) => Some(handle),
            Err(e) => {
                debug!("Mixer unavailable: {}", e);
                None
            }
        }
    }

    /// Reads one control. Returns `None` when the mixer cannot be opened.
    pub fn sample_channel(&self, name: &str, index: u32) -> Option<ChannelSample> {
        let handle = self.open()?;
        Some(read_channel(&handle, name, index))
    }

    /// Reads all configured channels through a single handle.
    pub fn sample(&self) -> Option<AudioSample> {
        let handle = self.open()?;
        let mutes = self
            .mute_channels
            .iter()
            .chain(std::iter::once(&self.volume_channel))
            .map(|channel| MuteMarker {
                marker: channel.marker,
                playback_on: handle.playback_switch(&channel.name, channel.index),
            })
            .collect();
        let volume = read_channel(&handle, &self.volume_channel.name, self.volume_channel.index);
        Some(AudioSample {
            mutes,
            volume_percent: volume.volume_percent,
        })
    }
}
