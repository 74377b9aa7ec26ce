//! GPIO chip hotplug daemon: udev watcher + chip registry + bus object tree.
//!
//! Chips present at startup and chips hotplugged later are exported as
//! `org.gpiod.Chip` objects under `/org/gpiod/<device>` on the system bus.

pub mod bus;
pub mod chip;
pub mod client;
pub mod config;
mod error;
pub mod event;
pub mod hotplug;
pub mod interface;
pub mod line;
pub mod logging;
pub mod paths;
pub mod registry;
mod runtime;
pub mod tree;

pub use bus::{BusConnectionState, BusController, Fatal, NameLostCause};
pub use chip::ChipObject;
pub use config::DaemonConfig;
pub use error::DaemonError;
pub use event::{DaemonEvent, Flow, SignalKind};
pub use registry::ChipRegistry;
pub use runtime::{run, start_blocking, Daemon};
pub use tree::{ChipProperties, ManagerHandle, ObjectTree};
