//! Error types for the dwm-statusline hardware library.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when reading host metrics.
#[derive(Error, Debug)]
pub enum Error {
    /// A sysfs attribute could not be read.
    #[error("Failed to read {}: {source}", path.display())]
    Sysfs {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A sysfs attribute did not hold the expected value.
    #[error("Unexpected value in {}: {value:?}", path.display())]
    SysfsValue { path: PathBuf, value: String },

    /// The mixer helper program could not be started.
    #[error("Failed to run {program}: {source}")]
    MixerSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The mixer helper program exited unsuccessfully.
    #[error("{program} exited with {status}: {stderr}")]
    MixerCommand {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    /// Native ALSA mixer error (open, attach, register or load).
    #[cfg(feature = "alsa")]
    #[error("ALSA mixer error: {0}")]
    Alsa(#[from] alsa::Error),
}
