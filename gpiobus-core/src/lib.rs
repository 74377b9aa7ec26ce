//! gpiobus core library: chip/line domain types, the device handle
//! adapter and its errors.
//!
//! - [`types`]: [`DeviceName`], [`ChipInfo`], [`LineInfo`]
//! - [`device`]: [`DeviceAccess`] / [`ChipHandle`] and the character-device backend
//! - [`error`]: [`DeviceError`]

pub mod device;
pub mod error;
pub mod types;

pub use device::{CdevAccess, ChipHandle, DeviceAccess};
pub use error::DeviceError;
pub use types::{ChipInfo, DeviceName, Direction, LineInfo};
