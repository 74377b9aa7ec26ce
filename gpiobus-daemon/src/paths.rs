/// Well-known name requested on the system bus.
pub const BUS_NAME: &str = "org.gpiod";
/// Root of the exported object tree; the object manager lives here.
pub const OBJECT_ROOT: &str = "/org/gpiod";
/// udev subsystem carrying GPIO chip uevents.
pub const GPIO_SUBSYSTEM: &str = "gpio";
pub const DEV_DIR: &str = "/dev";

/// `<root>/<device>`, without touching the filesystem.
pub fn chip_object_path(root: &str, device: &str) -> String {
    format!("{}/{}", root.trim_end_matches('/'), device)
}
