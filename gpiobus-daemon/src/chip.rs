use std::collections::btree_map::{BTreeMap, Entry};

use gpiobus_core::{ChipHandle, DeviceError, DeviceName};

use crate::error::DaemonError;
use crate::line::LineObject;
use crate::paths::chip_object_path;
use crate::tree::{ChipProperties, ManagerHandle};

/// One open, exported GPIO chip.
///
/// Created only by [`crate::ChipRegistry::export`] and torn down only through
/// [`ChipObject::release`]. Owns its chip handle and its lines exclusively;
/// shares the object manager with the registry and sibling chips.
pub struct ChipObject {
    device: DeviceName,
    path: String,
    properties: ChipProperties,
    // Declared before `handle`: lines must never outlive the descriptor.
    lines: BTreeMap<u32, LineObject>,
    handle: Box<dyn ChipHandle>,
    manager: ManagerHandle,
}

impl ChipObject {
    /// Publish `handle` on the object tree under `<root>/<device>`.
    ///
    /// On failure the handle is closed before returning.
    pub(crate) async fn export(
        device: DeviceName,
        handle: Box<dyn ChipHandle>,
        manager: ManagerHandle,
        root: &str,
    ) -> Result<Self, DaemonError> {
        let info = handle.info();
        let properties = ChipProperties {
            name: info.name.clone(),
            label: info.label.clone(),
            num_lines: info.num_lines,
        };
        let path = chip_object_path(root, device.as_str());

        if let Err(err) = manager.export(&path, &device, properties.clone()).await {
            handle.close();
            return Err(err);
        }

        Ok(Self {
            device,
            path,
            properties,
            lines: BTreeMap::new(),
            handle,
            manager,
        })
    }

    pub fn device(&self) -> &DeviceName {
        &self.device
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn properties(&self) -> &ChipProperties {
        &self.properties
    }

    /// Lines created so far, ordered by offset.
    pub fn lines(&self) -> impl Iterator<Item = &LineObject> {
        self.lines.values()
    }

    /// The line at `offset`, reading it through the chip handle on first access.
    pub fn line(&mut self, offset: u32) -> Result<&LineObject, DeviceError> {
        match self.lines.entry(offset) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let info = self.handle.line_info(offset)?;
                tracing::debug!(device = %self.device, offset, "creating line object");
                Ok(entry.insert(LineObject::new(info)))
            }
        }
    }

    /// Unexport from the bus, release lines, close the handle, drop the
    /// manager reference. In that order.
    pub(crate) async fn release(self) {
        let ChipObject {
            device,
            path,
            lines,
            handle,
            manager,
            ..
        } = self;

        tracing::debug!("destroying bus object for {device}");

        if let Err(err) = manager.unexport(&path).await {
            tracing::warn!(error = %err, path = %path, "failed to unexport chip object");
        }
        for line in lines.into_values() {
            line.release();
        }
        handle.close();
        drop(manager);
    }
}

impl std::fmt::Debug for ChipObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChipObject")
            .field("device", &self.device)
            .field("path", &self.path)
            .field("properties", &self.properties)
            .field("lines", &self.lines.len())
            .finish()
    }
}
