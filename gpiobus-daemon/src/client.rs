//! Client side of the bus contract.
//!
//! Used by `gpiodetect-dbus` to list the chips a running daemon exports.

use zbus::fdo::ObjectManagerProxy;
use zbus::Connection;

use gpiobus_core::ChipInfo;

use crate::error::DaemonError;
use crate::interface::LineDescription;
use crate::paths::{BUS_NAME, OBJECT_ROOT};

#[zbus::proxy(
    interface = "org.gpiod.Chip",
    default_service = "org.gpiod",
    gen_blocking = false
)]
pub trait Chip {
    #[zbus(property)]
    fn name(&self) -> zbus::Result<String>;

    #[zbus(property)]
    fn label(&self) -> zbus::Result<String>;

    #[zbus(property)]
    fn num_lines(&self) -> zbus::Result<u32>;

    fn get_line(&self, offset: u32) -> zbus::Result<LineDescription>;
}

/// Every chip exported under `/org/gpiod`, sorted by object path.
pub async fn detect_chips(connection: &Connection) -> Result<Vec<ChipInfo>, DaemonError> {
    let manager = ObjectManagerProxy::builder(connection)
        .destination(BUS_NAME)?
        .path(OBJECT_ROOT)?
        .build()
        .await?;

    let mut paths: Vec<String> = manager
        .get_managed_objects()
        .await?
        .into_keys()
        .map(|path| path.to_string())
        .collect();
    paths.sort();

    let mut chips = Vec::with_capacity(paths.len());
    for path in &paths {
        let chip = ChipProxy::builder(connection)
            .path(path.as_str())?
            .build()
            .await?;
        chips.push(ChipInfo {
            name: chip.name().await?,
            label: chip.label().await?,
            num_lines: chip.num_lines().await?,
        });
    }
    Ok(chips)
}

/// `gpiochip0 [pinctrl-bcm2711] (58 lines)`
pub fn describe(chip: &ChipInfo) -> String {
    format!("{} [{}] ({} lines)", chip.name, chip.label, chip.num_lines)
}
