//! Daemon configuration.
//!
//! The daemon takes a single `--debug` flag; everything else is fixed by the
//! bus contract and lives in [`crate::paths`]. The struct exists so tests and
//! alternative entry points can point the daemon somewhere else.

use std::path::PathBuf;

use crate::paths::{BUS_NAME, DEV_DIR, GPIO_SUBSYSTEM, OBJECT_ROOT};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonConfig {
    /// Enables info and debug records.
    pub debug: bool,
    pub bus_name: String,
    pub object_root: String,
    pub subsystem: String,
    pub dev_dir: PathBuf,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            debug: false,
            bus_name: BUS_NAME.to_owned(),
            object_root: OBJECT_ROOT.to_owned(),
            subsystem: GPIO_SUBSYSTEM.to_owned(),
            dev_dir: PathBuf::from(DEV_DIR),
        }
    }
}

impl DaemonConfig {
    pub fn with_debug(debug: bool) -> Self {
        Self {
            debug,
            ..Self::default()
        }
    }
}
