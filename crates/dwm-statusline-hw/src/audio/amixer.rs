//! Mixer backend driving the `amixer` utility.

use super::{MixerBackend, MixerHandle, VolumeLevel};
use crate::{Error, Result};
use std::process::{Command, Stdio};

/// Runs `amixer scontents` once per open and parses the result.
#[derive(Debug, Clone)]
pub struct AmixerBackend {
    program: String,
    device: String,
}

impl AmixerBackend {
    /// Creates a backend for the given ALSA device (e.g. "default").
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            program: "amixer".to_string(),
            device: device.into(),
        }
    }

    /// Overrides the program that is run instead of `amixer`.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

impl Default for AmixerBackend {
    fn default() -> Self {
        Self::new("default")
    }
}

impl MixerBackend for AmixerBackend {
    type Handle = AmixerSnapshot;

    fn open(&self) -> Result<AmixerSnapshot> {
        let output = Command::new(&self.program)
            .args(["-D", &self.device, "scontents"])
            .env("LC_ALL", "C")
            .stdin(Stdio::null())
            .output()
            .map_err(|source| Error::MixerSpawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(Error::MixerCommand {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(AmixerSnapshot::parse(&String::from_utf8_lossy(&output.stdout)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct SimpleControl {
    name: String,
    index: u32,
    limits: Option<(i64, i64)>,
    current: Option<i64>,
    switch: Option<bool>,
    seen_playback: bool,
}

/// Parsed `amixer scontents` output.
///
/// Only the first playback channel of each control is kept, which is the
/// channel ALSA reports as mono.
#[derive(Debug, Clone, Default)]
pub struct AmixerSnapshot {
    controls: Vec<SimpleControl>,
}

impl AmixerSnapshot {
    /// Parses the text printed by `amixer scontents`.
    pub fn parse(text: &str) -> Self {
        let mut controls: Vec<SimpleControl> = Vec::new();

        for line in text.lines() {
            if let Some(rest) = line.strip_prefix("Simple mixer control ") {
                if let Some((name, index)) = parse_header(rest) {
                    controls.push(SimpleControl {
                        name,
                        index,
                        ..Default::default()
                    });
                }
                continue;
            }

            let Some(control) = controls.last_mut() else {
                continue;
            };
            let line = line.trim();

            if let Some(rest) = line.strip_prefix("Limits:") {
                control.limits = parse_limits(rest);
            } else if line.starts_with("Capabilities:")
                || line.starts_with("Playback channels:")
                || line.starts_with("Capture channels:")
            {
                continue;
            } else if !control.seen_playback {
                if let Some(values) = channel_values(line) {
                    let (current, switch) = parse_playback(values);
                    control.current = current;
                    control.switch = switch;
                    control.seen_playback = true;
                }
            }
        }

        Self { controls }
    }

    fn find(&self, name: &str, index: u32) -> Option<&SimpleControl> {
        self.controls
            .iter()
            .find(|control| control.name == name && control.index == index)
    }
}

impl MixerHandle for AmixerSnapshot {
    fn playback_volume(&self, name: &str, index: u32) -> Option<VolumeLevel> {
        let control = self.find(name, index)?;
        let (min, max) = control.limits?;
        Some(VolumeLevel {
            min,
            max,
            current: control.current?,
        })
    }

    fn playback_switch(&self, name: &str, index: u32) -> Option<bool> {
        self.find(name, index)?.switch
    }
}

/// Parses `'Master',0`.
fn parse_header(rest: &str) -> Option<(String, u32)> {
    let (name, index) = rest.strip_prefix('\'')?.rsplit_once("',")?;
    Some((name.to_string(), index.trim().parse().ok()?))
}

/// Parses ` Playback 0 - 87`, or ` 0 - 87` for controls with a common
/// playback and capture volume.
fn parse_limits(rest: &str) -> Option<(i64, i64)> {
    let tokens: Vec<&str> = rest.split_whitespace().collect();
    let start = match tokens.iter().position(|t| *t == "Playback") {
        Some(position) => position + 1,
        None if tokens.first()?.parse::<i64>().is_ok() => 0,
        None => return None,
    };
    match tokens.get(start..start + 3)? {
        [min, "-", max] => Some((min.parse().ok()?, max.parse().ok()?)),
        _ => None,
    }
}

/// Returns the playback values of a channel line.
///
/// `Mono: Playback 60 [69%] [on]` has separate playback values, while
/// controls with a common playback and capture volume print
/// `Mono: 31 [100%] [on]` without the `Playback` marker.
fn channel_values(line: &str) -> Option<&str> {
    if let Some((_, values)) = line.split_once(": Playback") {
        return Some(values);
    }
    let (_, values) = line.split_once(':')?;
    let first = values.split_whitespace().next()?;
    (first != "Capture").then_some(values)
}

/// Parses ` 60 [69%] [-20.25dB] [on]` up to any capture section.
fn parse_playback(values: &str) -> (Option<i64>, Option<bool>) {
    let mut current = None;
    let mut switch = None;
    for token in values
        .split_whitespace()
        .take_while(|token| *token != "Capture")
    {
        match token {
            "[on]" => switch = Some(true),
            "[off]" => switch = Some(false),
            _ if current.is_none() => current = token.parse().ok(),
            _ => {}
        }
    }
    (current, switch)
}
