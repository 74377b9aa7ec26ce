//! Exported object tree.
//!
//! [`ObjectTree`] is the seam between the registry and the bus. The registry
//! and every chip object hold a clone of the same [`ManagerHandle`]; the tree
//! lives as long as its longest holder.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use gpiobus_core::DeviceName;

use crate::error::DaemonError;
use crate::event::DaemonEvent;
use crate::interface::ChipInterface;

/// Properties published for one chip. Immutable for the object's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChipProperties {
    pub name: String,
    pub label: String,
    pub num_lines: u32,
}

#[async_trait]
pub trait ObjectTree: Send + Sync {
    /// Publish a chip object at `path`.
    async fn export(
        &self,
        path: &str,
        device: &DeviceName,
        properties: ChipProperties,
    ) -> Result<(), DaemonError>;

    /// Withdraw the chip object at `path`.
    async fn unexport(&self, path: &str) -> Result<(), DaemonError>;

    /// Make the tree visible to clients. Called once, after startup
    /// reconciliation has populated it.
    async fn attach(&self) -> Result<(), DaemonError>;
}

/// Shared, refcounted handle to the object manager.
pub type ManagerHandle = Arc<dyn ObjectTree>;

/// [`ObjectTree`] served by a zbus connection.
pub struct BusObjectTree {
    connection: zbus::Connection,
    root: String,
    requests: mpsc::UnboundedSender<DaemonEvent>,
}

impl BusObjectTree {
    /// `requests` carries line queries from bus clients back into the event loop.
    pub fn new(
        connection: zbus::Connection,
        root: impl Into<String>,
        requests: mpsc::UnboundedSender<DaemonEvent>,
    ) -> Self {
        Self {
            connection,
            root: root.into(),
            requests,
        }
    }
}

#[async_trait]
impl ObjectTree for BusObjectTree {
    async fn export(
        &self,
        path: &str,
        device: &DeviceName,
        properties: ChipProperties,
    ) -> Result<(), DaemonError> {
        let iface = ChipInterface::new(device.clone(), properties, self.requests.clone());
        let added = self.connection.object_server().at(path, iface).await?;
        if !added {
            return Err(DaemonError::ObjectExists {
                path: path.to_owned(),
            });
        }
        Ok(())
    }

    async fn unexport(&self, path: &str) -> Result<(), DaemonError> {
        self.connection
            .object_server()
            .remove::<ChipInterface, _>(path)
            .await?;
        Ok(())
    }

    async fn attach(&self) -> Result<(), DaemonError> {
        self.connection
            .object_server()
            .at(self.root.as_str(), zbus::fdo::ObjectManager)
            .await?;
        tracing::debug!(root = %self.root, "object manager attached");
        Ok(())
    }
}
