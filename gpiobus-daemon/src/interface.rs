//! `org.gpiod.Chip` bus interface.

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};
use zbus::fdo;
use zvariant::Type;

use gpiobus_core::{DeviceName, LineInfo};

use crate::event::DaemonEvent;
use crate::tree::ChipProperties;

/// Wire form of a line, returned by `GetLine`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Type)]
pub struct LineDescription {
    pub offset: u32,
    pub name: String,
    pub consumer: String,
    pub used: bool,
    pub direction: String,
    pub active_low: bool,
}

impl From<LineInfo> for LineDescription {
    fn from(info: LineInfo) -> Self {
        Self {
            offset: info.offset,
            name: info.name,
            consumer: info.consumer,
            used: info.used,
            direction: info.direction.to_string(),
            active_low: info.active_low,
        }
    }
}

/// Served at `/org/gpiod/<device>` for every exported chip.
///
/// Property values are a copy taken at export time. Line queries are not
/// answered here: they are forwarded to the event loop, which owns the chip
/// handle.
pub struct ChipInterface {
    device: DeviceName,
    properties: ChipProperties,
    requests: mpsc::UnboundedSender<DaemonEvent>,
}

impl ChipInterface {
    pub fn new(
        device: DeviceName,
        properties: ChipProperties,
        requests: mpsc::UnboundedSender<DaemonEvent>,
    ) -> Self {
        Self {
            device,
            properties,
            requests,
        }
    }
}

#[zbus::interface(name = "org.gpiod.Chip")]
impl ChipInterface {
    #[zbus(property)]
    fn name(&self) -> String {
        self.properties.name.clone()
    }

    #[zbus(property)]
    fn label(&self) -> String {
        self.properties.label.clone()
    }

    #[zbus(property)]
    fn num_lines(&self) -> u32 {
        self.properties.num_lines
    }

    /// Describe the line at `offset`.
    async fn get_line(&self, offset: u32) -> fdo::Result<LineDescription> {
        let (tx, rx) = oneshot::channel();
        self.requests
            .send(DaemonEvent::LineQuery {
                device: self.device.clone(),
                offset,
                respond_to: tx,
            })
            .map_err(|_| fdo::Error::Failed("daemon is shutting down".to_owned()))?;

        let info = rx
            .await
            .map_err(|_| fdo::Error::Failed("daemon is shutting down".to_owned()))?
            .map_err(fdo::Error::InvalidArgs)?;
        Ok(LineDescription::from(info))
    }
}
