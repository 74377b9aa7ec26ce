//! The one event type every source is normalized into.
//!
//! Hotplug uevents, process signals, bus-name callbacks and line queries from
//! bus clients all arrive as a [`DaemonEvent`] and are handled one at a time
//! by [`crate::Daemon::dispatch`].

use tokio::sync::oneshot;

use gpiobus_core::{DeviceName, LineInfo};

use crate::bus::NameLostCause;
use crate::hotplug::Uevent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    /// SIGTERM
    Terminate,
    /// SIGINT
    Interrupt,
    /// SIGHUP, ignored.
    Hangup,
}

impl SignalKind {
    pub fn name(self) -> &'static str {
        match self {
            SignalKind::Terminate => "SIGTERM",
            SignalKind::Interrupt => "SIGINT",
            SignalKind::Hangup => "SIGHUP",
        }
    }
}

/// Reply channel for a line query; errors are rendered to strings for the bus.
pub type LineReply = oneshot::Sender<Result<LineInfo, String>>;

#[derive(Debug)]
pub enum DaemonEvent {
    Hotplug(Uevent),
    Signal(SignalKind),
    NameAcquired(String),
    NameLost(NameLostCause),
    LineQuery {
        device: DeviceName,
        offset: u32,
        respond_to: LineReply,
    },
}

/// What the loop should do after an event has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Shutdown,
}
