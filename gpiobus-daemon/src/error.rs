use thiserror::Error;

use gpiobus_core::{DeviceError, DeviceName};

/// Error surface for the registry, object tree, hotplug listener and runtime.
///
/// Everything here is recoverable or reported at startup. Invariant
/// violations and bus-name loss are not errors; see [`crate::bus::Fatal`].
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error ({context}): {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error("bus error: {0}")]
    Bus(#[from] zbus::Error),

    #[error("bus error: {0}")]
    Fdo(#[from] zbus::fdo::Error),

    #[error("object already exported at {path}")]
    ObjectExists { path: String },

    #[error("no chip named {0} is exported")]
    UnknownChip(DeviceName),

    #[error("channel closed: {0}")]
    ChannelClosed(&'static str),
}

pub(crate) fn io_err(context: &'static str, source: std::io::Error) -> DaemonError {
    DaemonError::Io { context, source }
}
