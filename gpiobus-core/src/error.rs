//! Error types for gpiobus-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::DeviceName;

/// Failures reported by the device handle adapter.
///
/// None of these are fatal to the daemon: a chip that cannot be opened is
/// simply not exported.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// The character device does not exist (vanished before we got to it).
    #[error("unable to open {path}: no such device")]
    NotFound { path: PathBuf },

    /// The device exists but could not be opened (permissions, not a chip, ...).
    #[error("unable to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: gpiocdev::Error,
    },

    /// Reading chip or line info from an open handle failed.
    #[error("unable to read info from {name}: {source}")]
    Query {
        name: DeviceName,
        #[source]
        source: gpiocdev::Error,
    },

    #[error("line offset {offset} out of range for {name} ({num_lines} lines)")]
    OffsetOutOfRange {
        name: DeviceName,
        offset: u32,
        num_lines: u32,
    },
}
