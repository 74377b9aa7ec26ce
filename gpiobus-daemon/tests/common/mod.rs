//! In-memory stand-ins for the device adapter and the bus object tree.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use gpiobus_core::{
    ChipHandle, ChipInfo, DeviceAccess, DeviceError, DeviceName, Direction, LineInfo,
};
use gpiobus_daemon::hotplug::{GpioDevice, Uevent};
use gpiobus_daemon::{ChipProperties, ChipRegistry, DaemonError, ObjectTree};

pub const ROOT: &str = "/org/gpiod";

// ---------------------------------------------------------------------------
// Device adapter
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeAccess {
    chips: Mutex<HashMap<String, ChipInfo>>,
    opened: AtomicUsize,
    closed: Arc<AtomicUsize>,
    line_reads: Arc<AtomicUsize>,
}

impl FakeAccess {
    pub fn with_chips(names: &[&str]) -> Arc<Self> {
        let access = Arc::new(Self::default());
        for (idx, name) in names.iter().enumerate() {
            access.plug(name, &format!("fake-bank-{idx}"), 8 * (idx as u32 + 1));
        }
        access
    }

    pub fn plug(&self, name: &str, label: &str, num_lines: u32) {
        self.chips.lock().expect("chips lock").insert(
            name.to_owned(),
            ChipInfo {
                name: name.to_owned(),
                label: label.to_owned(),
                num_lines,
            },
        );
    }

    pub fn unplug(&self, name: &str) {
        self.chips.lock().expect("chips lock").remove(name);
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn line_reads(&self) -> usize {
        self.line_reads.load(Ordering::SeqCst)
    }
}

impl DeviceAccess for FakeAccess {
    fn open_by_name(&self, name: &DeviceName) -> Result<Box<dyn ChipHandle>, DeviceError> {
        let info = self
            .chips
            .lock()
            .expect("chips lock")
            .get(name.as_str())
            .cloned()
            .ok_or_else(|| DeviceError::NotFound {
                path: PathBuf::from("/dev").join(name.as_str()),
            })?;
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeChip {
            device: name.clone(),
            info,
            closed: self.closed.clone(),
            line_reads: self.line_reads.clone(),
        }))
    }
}

struct FakeChip {
    device: DeviceName,
    info: ChipInfo,
    closed: Arc<AtomicUsize>,
    line_reads: Arc<AtomicUsize>,
}

impl ChipHandle for FakeChip {
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
        self.line_reads.fetch_add(1, Ordering::SeqCst);
        Ok(LineInfo {
            offset,
            name: format!("GPIO{offset}"),
            consumer: String::new(),
            used: false,
            direction: Direction::Input,
            active_low: false,
        })
    }

    fn close(self: Box<Self>) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

// ---------------------------------------------------------------------------
// Object tree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeOp {
    Export(String),
    Unexport(String),
    Attach,
}

#[derive(Default)]
struct TreeState {
    objects: BTreeMap<String, ChipProperties>,
    ops: Vec<TreeOp>,
    attached_with: Option<Vec<String>>,
    failing: HashSet<String>,
    fail_attach: bool,
}

#[derive(Default)]
pub struct FakeTree {
    state: Mutex<TreeState>,
}

impl FakeTree {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make `export` fail for `path`.
    pub fn fail_export(&self, path: &str) {
        self.state.lock().expect("tree lock").failing.insert(path.to_owned());
    }

    pub fn fail_attach(&self) {
        self.state.lock().expect("tree lock").fail_attach = true;
    }

    pub fn paths(&self) -> Vec<String> {
        self.state.lock().expect("tree lock").objects.keys().cloned().collect()
    }

    pub fn properties(&self, path: &str) -> Option<ChipProperties> {
        self.state.lock().expect("tree lock").objects.get(path).cloned()
    }

    pub fn ops(&self) -> Vec<TreeOp> {
        self.state.lock().expect("tree lock").ops.clone()
    }

    /// Paths that were exported when `attach` ran, or `None` before that.
    pub fn attached_with(&self) -> Option<Vec<String>> {
        self.state.lock().expect("tree lock").attached_with.clone()
    }
}

#[async_trait]
impl ObjectTree for FakeTree {
    async fn export(
        &self,
        path: &str,
        _device: &DeviceName,
        properties: ChipProperties,
    ) -> Result<(), DaemonError> {
        let mut state = self.state.lock().expect("tree lock");
        if state.failing.contains(path) || state.objects.contains_key(path) {
            return Err(DaemonError::ObjectExists {
                path: path.to_owned(),
            });
        }
        state.objects.insert(path.to_owned(), properties);
        state.ops.push(TreeOp::Export(path.to_owned()));
        Ok(())
    }

    async fn unexport(&self, path: &str) -> Result<(), DaemonError> {
        let mut state = self.state.lock().expect("tree lock");
        state.objects.remove(path);
        state.ops.push(TreeOp::Unexport(path.to_owned()));
        Ok(())
    }

    async fn attach(&self) -> Result<(), DaemonError> {
        let mut state = self.state.lock().expect("tree lock");
        if state.fail_attach {
            return Err(DaemonError::ChannelClosed("fake bus"));
        }
        state.attached_with = Some(state.objects.keys().cloned().collect());
        state.ops.push(TreeOp::Attach);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

pub fn registry(access: &Arc<FakeAccess>, tree: &Arc<FakeTree>) -> ChipRegistry {
    ChipRegistry::new(access.clone(), tree.clone(), ROOT)
}

pub fn path(name: &str) -> String {
    format!("{ROOT}/{name}")
}

/// Character-device notification source.
pub fn cdev(name: &str) -> GpioDevice {
    GpioDevice::new(name, Some(PathBuf::from("/dev").join(name)))
}

/// Legacy sysfs notification source; carries no device file.
pub fn sysfs(name: &str) -> GpioDevice {
    GpioDevice::new(name, None)
}

pub fn uevent(action: &str, device: GpioDevice) -> Uevent {
    Uevent::new(action, device)
}

// ---------------------------------------------------------------------------
// Log capture
// ---------------------------------------------------------------------------

struct WarnCounter(Arc<AtomicUsize>);

impl<S: Subscriber> Layer<S> for WarnCounter {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Count warning records on this thread until the guard is dropped.
pub fn count_warnings() -> (tracing::subscriber::DefaultGuard, Arc<AtomicUsize>) {
    let warnings = Arc::new(AtomicUsize::new(0));
    let subscriber = tracing_subscriber::registry().with(WarnCounter(warnings.clone()));
    (tracing::subscriber::set_default(subscriber), warnings)
}
