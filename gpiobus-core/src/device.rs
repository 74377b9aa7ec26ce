//! Device handle adapter.
//!
//! The daemon never talks to `/dev/gpiochipN` directly; it goes through
//! [`DeviceAccess`] to open a chip by name and through [`ChipHandle`] to read
//! it. [`CdevAccess`] is the real implementation on top of the GPIO character
//! device ABI (via `gpiocdev`). Tests substitute in-memory fakes.

use std::path::{Path, PathBuf};

use gpiocdev::chip::Chip;

use crate::error::DeviceError;
use crate::types::{ChipInfo, DeviceName, Direction, LineInfo};

/// An open chip. Exclusively owned; invalid after [`ChipHandle::close`].
pub trait ChipHandle: Send {
    /// Name, label and line count read when the chip was opened.
    fn info(&self) -> &ChipInfo;

    /// Read info for the line at `offset`.
    ///
    /// Only valid while this handle is open.
    fn line_info(&self, offset: u32) -> Result<LineInfo, DeviceError>;

    /// Close the underlying descriptor.
    fn close(self: Box<Self>);
}

/// Opens chips by their kernel device name.
pub trait DeviceAccess: Send + Sync {
    fn open_by_name(&self, name: &DeviceName) -> Result<Box<dyn ChipHandle>, DeviceError>;
}

/// [`DeviceAccess`] over the GPIO character devices found in `dev_dir`.
#[derive(Debug, Clone)]
pub struct CdevAccess {
    dev_dir: PathBuf,
}

impl CdevAccess {
    pub fn new(dev_dir: impl Into<PathBuf>) -> Self {
        Self {
            dev_dir: dev_dir.into(),
        }
    }

    /// `<dev_dir>/<name>`. Pure, no I/O.
    pub fn device_path(&self, name: &DeviceName) -> PathBuf {
        self.dev_dir.join(name.as_str())
    }

    pub fn dev_dir(&self) -> &Path {
        &self.dev_dir
    }
}

impl Default for CdevAccess {
    fn default() -> Self {
        Self::new("/dev")
    }
}

impl DeviceAccess for CdevAccess {
    fn open_by_name(&self, name: &DeviceName) -> Result<Box<dyn ChipHandle>, DeviceError> {
        let path = self.device_path(name);
        if !path.exists() {
            return Err(DeviceError::NotFound { path });
        }

        let chip = Chip::from_path(&path).map_err(|source| DeviceError::Open {
            path: path.clone(),
            source,
        })?;
        let info = chip.info().map_err(|source| DeviceError::Query {
            name: name.clone(),
            source,
        })?;

        Ok(Box::new(CdevChip {
            device: name.clone(),
            info: ChipInfo {
                name: info.name,
                label: info.label,
                num_lines: info.num_lines,
            },
            chip,
        }))
    }
}

struct CdevChip {
    device: DeviceName,
    info: ChipInfo,
    chip: Chip,
}

impl ChipHandle for CdevChip {
    fn info(&self) -> &ChipInfo {
        &self.info
    }

    fn line_info(&self, offset: u32) -> Result<LineInfo, DeviceError> {
        if offset >= self.info.num_lines {
            return Err(DeviceError::OffsetOutOfRange {
                name: self.device.clone(),
                offset,
                num_lines: self.info.num_lines,
            });
        }

        let info = self
            .chip
            .line_info(offset)
            .map_err(|source| DeviceError::Query {
                name: self.device.clone(),
                source,
            })?;

        Ok(LineInfo {
            offset: info.offset,
            name: info.name,
            consumer: info.consumer,
            used: info.used,
            direction: match info.direction {
                gpiocdev::line::Direction::Output => Direction::Output,
                _ => Direction::Input,
            },
            active_low: info.active_low,
        })
    }

    fn close(self: Box<Self>) {
        // Dropping the chip closes its file descriptor.
        drop(self.chip);
    }
}
