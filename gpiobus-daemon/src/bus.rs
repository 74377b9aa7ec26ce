//! Bus connection controller.
//!
//! ```text
//! Unconnected ──connection acquired──▶ Owned ──name lost──▶ Lost (fatal)
//!      └──────────────no connection──────────────────────────▲
//! ```
//!
//! Losing the name is fatal whatever the cause. There is no retry and no
//! reconnection; restarting the daemon is the supervisor's job.

use std::fmt;
use std::sync::Arc;

use gpiobus_core::DeviceAccess;

use crate::error::DaemonError;
use crate::hotplug::{self, GpioDevice};
use crate::registry::ChipRegistry;
use crate::tree::ManagerHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusConnectionState {
    Unconnected,
    Owned,
    Lost,
}

/// Why the well-known name is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameLostCause {
    /// No connection to the bus could be made.
    NoConnection,
    /// The connection was closed under us.
    ConnectionClosed,
    /// Another peer owns the name, or took it.
    NameTaken,
}

impl NameLostCause {
    pub fn message(self, name: &str) -> String {
        match self {
            NameLostCause::NoConnection => {
                format!("unable to make connection to the bus to own '{name}'")
            }
            NameLostCause::ConnectionClosed => {
                format!("connection to the bus closed while owning '{name}', dying...")
            }
            NameLostCause::NameTaken => format!("name '{name}' lost on the bus, dying..."),
        }
    }
}

/// An unrecoverable condition. The only thing to do with it is [`Fatal::die`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "a fatal condition must end the process"]
pub struct Fatal {
    message: String,
}

impl Fatal {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Log at error priority and exit with a failure status.
    pub fn die(self) -> ! {
        tracing::error!("{}", self.message);
        std::process::exit(1)
    }
}

impl fmt::Display for Fatal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Debug)]
pub struct BusController {
    name: String,
    state: BusConnectionState,
}

impl BusController {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: BusConnectionState::Unconnected,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> BusConnectionState {
        self.state
    }

    /// Build the registry, export every chip in `devices`, then attach the
    /// object tree. Clients can only see the tree once it is fully populated.
    ///
    /// The hotplug subscription must already be live so nothing that happens
    /// during enumeration is missed.
    ///
    /// # Panics
    /// If called in any state other than `Unconnected`.
    pub async fn on_connection_acquired(
        &mut self,
        access: Arc<dyn DeviceAccess>,
        manager: ManagerHandle,
        root: &str,
        devices: Vec<GpioDevice>,
    ) -> Result<ChipRegistry, DaemonError> {
        assert_eq!(
            self.state,
            BusConnectionState::Unconnected,
            "bus connection acquired twice"
        );
        tracing::debug!("bus connection acquired");

        let mut registry = ChipRegistry::new(access, manager.clone(), root);
        let exported = hotplug::reconcile(&mut registry, devices).await;
        tracing::debug!(exported, "startup reconciliation complete");

        if let Err(err) = manager.attach().await {
            registry.teardown().await;
            return Err(err);
        }
        self.state = BusConnectionState::Owned;
        Ok(registry)
    }

    pub fn on_name_acquired(&self, name: &str) {
        tracing::debug!("bus name acquired: '{name}'");
    }

    /// Move to `Lost` and hand back the fatal condition to die with.
    pub fn on_name_lost(&mut self, cause: NameLostCause) -> Fatal {
        tracing::debug!("bus name lost: '{}'", self.name);
        self.state = BusConnectionState::Lost;
        Fatal::new(cause.message(&self.name))
    }
}
