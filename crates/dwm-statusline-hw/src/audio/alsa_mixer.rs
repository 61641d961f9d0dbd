//! Native ALSA mixer backend.

use super::{MixerBackend, MixerHandle, VolumeLevel};
use crate::Result;
use alsa::mixer::{Mixer, Selem, SelemChannelId, SelemId};

/// Opens the ALSA simple mixer interface of a device.
#[derive(Debug, Clone)]
pub struct AlsaBackend {
    device: String,
}

impl AlsaBackend {
    /// Creates a backend for the given ALSA device (e.g. "default").
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
        }
    }
}

impl Default for AlsaBackend {
    fn default() -> Self {
        Self::new("default")
    }
}

impl MixerBackend for AlsaBackend {
    type Handle = AlsaHandle;

    fn open(&self) -> Result<AlsaHandle> {
        // Opens, attaches, registers and loads in one call; the mixer is
        // closed when the handle is dropped.
        let mixer = Mixer::new(&self.device, false)?;
        Ok(AlsaHandle { mixer })
    }
}

/// An open ALSA mixer.
pub struct AlsaHandle {
    mixer: Mixer,
}

impl AlsaHandle {
    fn find(&self, name: &str, index: u32) -> Option<Selem<'_>> {
        self.mixer.find_selem(&SelemId::new(name, index))
    }
}

impl MixerHandle for AlsaHandle {
    fn playback_volume(&self, name: &str, index: u32) -> Option<VolumeLevel> {
        let selem = self.find(name, index)?;
        if !selem.has_playback_volume() {
            return None;
        }
        let (min, max) = selem.get_playback_volume_range();
        let current = selem.get_playback_volume(SelemChannelId::mono()).ok()?;
        Some(VolumeLevel {
            min: i64::from(min),
            max: i64::from(max),
            current: i64::from(current),
        })
    }

    fn playback_switch(&self, name: &str, index: u32) -> Option<bool> {
        let selem = self.find(name, index)?;
        if !selem.has_playback_switch() {
            return None;
        }
        selem
            .get_playback_switch(SelemChannelId::mono())
            .ok()
            .map(|switch| switch != 0)
    }
}
