//! Chip registry: device name → exported chip object.
//!
//! # Invariant
//!
//! A chip is in the map if and only if it is exported on the object tree.
//! Both facts change together inside [`ChipRegistry::export`] and
//! [`ChipRegistry::unexport`], and those only run from the single-threaded
//! event loop, so no observer ever sees one without the other.
//!
//! # Failure contract
//!
//! Failing to open or export a device is recoverable: the error is returned
//! and the map is untouched. Exporting a name twice or unexporting a name
//! that was never exported means events were delivered out of order; there
//! is no safe way to continue, so both panic.

use std::collections::HashMap;
use std::sync::Arc;

use gpiobus_core::{DeviceAccess, DeviceName, LineInfo};

use crate::chip::ChipObject;
use crate::error::DaemonError;
use crate::tree::ManagerHandle;

pub struct ChipRegistry {
    chips: HashMap<DeviceName, ChipObject>,
    access: Arc<dyn DeviceAccess>,
    manager: ManagerHandle,
    root: String,
}

impl ChipRegistry {
    pub fn new(access: Arc<dyn DeviceAccess>, manager: ManagerHandle, root: impl Into<String>) -> Self {
        Self {
            chips: HashMap::new(),
            access,
            manager,
            root: root.into(),
        }
    }

    /// Open `name`, publish it on the object tree and record it.
    ///
    /// # Errors
    /// Open or export failures; the registry is unchanged.
    ///
    /// # Panics
    /// If `name` is already exported.
    pub async fn export(&mut self, name: &DeviceName) -> Result<(), DaemonError> {
        tracing::debug!("creating a bus object for {name}");

        let handle = self.access.open_by_name(name)?;
        if self.chips.contains_key(name) {
            handle.close();
            panic!("chip {name} is already exported");
        }

        let chip = ChipObject::export(name.clone(), handle, self.manager.clone(), &self.root).await?;
        self.chips.insert(name.clone(), chip);
        Ok(())
    }

    /// Remove `name` and tear its chip object down.
    ///
    /// # Panics
    /// If `name` is not exported.
    pub async fn unexport(&mut self, name: &DeviceName) {
        let chip = self
            .chips
            .remove(name)
            .unwrap_or_else(|| panic!("chip {name} is not exported"));
        chip.release().await;
    }

    pub fn contains(&self, name: &DeviceName) -> bool {
        self.chips.contains_key(name)
    }

    pub fn get(&self, name: &DeviceName) -> Option<&ChipObject> {
        self.chips.get(name)
    }

    pub fn len(&self) -> usize {
        self.chips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chips.is_empty()
    }

    /// Exported device names, sorted.
    pub fn names(&self) -> Vec<DeviceName> {
        let mut names: Vec<DeviceName> = self.chips.keys().cloned().collect();
        names.sort();
        names
    }

    /// Info for one line of an exported chip, creating its line object if needed.
    pub fn line_info(&mut self, name: &DeviceName, offset: u32) -> Result<LineInfo, DaemonError> {
        let chip = self
            .chips
            .get_mut(name)
            .ok_or_else(|| DaemonError::UnknownChip(name.clone()))?;
        Ok(chip.line(offset)?.info().clone())
    }

    /// Unexport and release every chip. Used on daemon shutdown.
    pub async fn teardown(mut self) {
        for name in self.names() {
            self.unexport(&name).await;
        }
    }
}

impl std::fmt::Debug for ChipRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChipRegistry")
            .field("root", &self.root)
            .field("chips", &self.names())
            .finish()
    }
}
