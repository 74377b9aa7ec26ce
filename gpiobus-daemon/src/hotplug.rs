//! GPIO hotplug listener.
//!
//! The kernel emits two uevents per action per chip: one for the character
//! device and one for the legacy sysfs device. Only the former carries a
//! device file, and only it is acted upon. The same rule filters the device
//! list read at startup, so each physical chip is exported exactly once.

use std::path::PathBuf;

use futures::StreamExt;
use tokio_udev::{AsyncMonitorSocket, Device, Enumerator, MonitorBuilder};

use gpiobus_core::DeviceName;

use crate::error::{io_err, DaemonError};
use crate::registry::ChipRegistry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HotplugAction {
    Add,
    Remove,
    Other(String),
}

impl From<&str> for HotplugAction {
    fn from(action: &str) -> Self {
        match action {
            "add" => HotplugAction::Add,
            "remove" => HotplugAction::Remove,
            other => HotplugAction::Other(other.to_owned()),
        }
    }
}

impl std::fmt::Display for HotplugAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HotplugAction::Add => write!(f, "add"),
            HotplugAction::Remove => write!(f, "remove"),
            HotplugAction::Other(other) => write!(f, "{other}"),
        }
    }
}

/// A device in the gpio subsystem, as udev describes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GpioDevice {
    pub name: DeviceName,
    pub device_file: Option<PathBuf>,
}

impl GpioDevice {
    pub fn new(name: impl Into<DeviceName>, device_file: Option<PathBuf>) -> Self {
        Self {
            name: name.into(),
            device_file,
        }
    }

    /// Character-device chips have a device file; legacy sysfs entries don't.
    pub fn is_gpiochip_device(&self) -> bool {
        self.device_file.is_some()
    }

    fn from_udev(device: &Device) -> Self {
        Self {
            name: DeviceName::from(device.sysname().to_string_lossy().into_owned()),
            device_file: device.devnode().map(|path| path.to_path_buf()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uevent {
    pub action: HotplugAction,
    pub device: GpioDevice,
}

impl Uevent {
    pub fn new(action: &str, device: GpioDevice) -> Self {
        Self {
            action: HotplugAction::from(action),
            device,
        }
    }
}

/// What [`handle_uevent`] did with a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handled {
    Exported,
    Unexported,
    /// Export failed (device gone, permission denied, ...). Logged.
    Failed,
    /// Secondary notification dropped by the discriminator.
    Ignored,
    /// Action other than add/remove. Logged.
    Unknown,
}

/// Apply one uevent to the registry.
pub async fn handle_uevent(registry: &mut ChipRegistry, event: Uevent) -> Handled {
    if !event.device.is_gpiochip_device() {
        return Handled::Ignored;
    }

    let name = &event.device.name;
    tracing::debug!("uevent: {} action on {name} device", event.action);

    match event.action {
        HotplugAction::Add => match registry.export(name).await {
            Ok(()) => Handled::Exported,
            Err(err) => {
                tracing::warn!("{err}");
                Handled::Failed
            }
        },
        HotplugAction::Remove => {
            registry.unexport(name).await;
            Handled::Unexported
        }
        HotplugAction::Other(ref action) => {
            tracing::warn!("unknown action for uevent: {action}");
            Handled::Unknown
        }
    }
}

/// Export every chip already present. Returns how many were exported.
pub async fn reconcile(
    registry: &mut ChipRegistry,
    devices: impl IntoIterator<Item = GpioDevice>,
) -> usize {
    let mut exported = 0;
    for device in devices {
        if !device.is_gpiochip_device() {
            continue;
        }
        match registry.export(&device.name).await {
            Ok(()) => exported += 1,
            Err(err) => tracing::warn!("{err}"),
        }
    }
    exported
}

/// Synchronously list the devices currently in `subsystem`.
pub fn enumerate(subsystem: &str) -> Result<Vec<GpioDevice>, DaemonError> {
    let mut enumerator = Enumerator::new().map_err(|e| io_err("udev enumerate", e))?;
    enumerator
        .match_subsystem(subsystem)
        .map_err(|e| io_err("udev enumerate", e))?;
    let devices = enumerator
        .scan_devices()
        .map_err(|e| io_err("udev enumerate", e))?
        .map(|device| GpioDevice::from_udev(&device))
        .collect();
    Ok(devices)
}

/// Live subscription to uevents of one subsystem.
pub struct HotplugListener {
    socket: AsyncMonitorSocket,
}

impl HotplugListener {
    pub fn subscribe(subsystem: &str) -> Result<Self, DaemonError> {
        let socket = MonitorBuilder::new()
            .and_then(|builder| builder.match_subsystem(subsystem))
            .and_then(|builder| builder.listen())
            .map_err(|e| io_err("udev monitor", e))?;
        let socket = AsyncMonitorSocket::new(socket).map_err(|e| io_err("udev monitor", e))?;
        tracing::debug!(subsystem, "subscribed to uevents");
        Ok(Self { socket })
    }

    /// Next uevent; `None` once the monitor socket is closed.
    pub async fn next(&mut self) -> Option<Result<Uevent, DaemonError>> {
        let event = self.socket.next().await?;
        Some(
            event
                .map(|event| {
                    let action = event
                        .action()
                        .map(|action| action.to_string_lossy().into_owned())
                        .unwrap_or_default();
                    Uevent::new(&action, GpioDevice::from_udev(&event))
                })
                .map_err(|e| io_err("udev monitor", e)),
        )
    }
}
