use std::sync::Arc;

use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::signal::unix::{signal, Signal};
use tokio::sync::mpsc;
use zbus::fdo::{DBusProxy, RequestNameFlags, RequestNameReply};

use gpiobus_core::{CdevAccess, DeviceAccess};

use crate::bus::{BusController, Fatal, NameLostCause};
use crate::config::DaemonConfig;
use crate::error::{io_err, DaemonError};
use crate::event::{DaemonEvent, Flow, SignalKind};
use crate::hotplug::{self, HotplugListener};
use crate::registry::ChipRegistry;
use crate::tree::{BusObjectTree, ManagerHandle};

/// Event-loop state: the controller and the registry it produced.
///
/// [`Daemon::dispatch`] runs one event to completion; nothing else touches
/// the registry, which is what keeps it consistent without locks.
#[derive(Debug)]
pub struct Daemon {
    controller: BusController,
    registry: ChipRegistry,
}

impl Daemon {
    pub fn new(controller: BusController, registry: ChipRegistry) -> Self {
        Self {
            controller,
            registry,
        }
    }

    pub fn controller(&self) -> &BusController {
        &self.controller
    }

    pub fn registry(&self) -> &ChipRegistry {
        &self.registry
    }

    pub async fn dispatch(&mut self, event: DaemonEvent) -> Result<Flow, Fatal> {
        match event {
            DaemonEvent::Hotplug(uevent) => {
                hotplug::handle_uevent(&mut self.registry, uevent).await;
                Ok(Flow::Continue)
            }
            DaemonEvent::Signal(kind) => {
                tracing::debug!("{} received", kind.name());
                match kind {
                    SignalKind::Terminate | SignalKind::Interrupt => Ok(Flow::Shutdown),
                    SignalKind::Hangup => Ok(Flow::Continue),
                }
            }
            DaemonEvent::NameAcquired(name) => {
                self.controller.on_name_acquired(&name);
                Ok(Flow::Continue)
            }
            DaemonEvent::NameLost(cause) => Err(self.controller.on_name_lost(cause)),
            DaemonEvent::LineQuery {
                device,
                offset,
                respond_to,
            } => {
                let reply = self
                    .registry
                    .line_info(&device, offset)
                    .map_err(|err| err.to_string());
                // The caller may have given up; nothing to do then.
                let _ = respond_to.send(reply);
                Ok(Flow::Continue)
            }
        }
    }

    /// Unexport everything. Consumes the daemon.
    pub async fn shutdown(self) {
        self.registry.teardown().await;
    }
}

/// Start the daemon on a current-thread runtime and block until it exits.
pub fn start_blocking(config: DaemonConfig) -> Result<(), DaemonError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio runtime", e))?;
    runtime.block_on(run(config))
}

/// Run the daemon until a shutdown signal.
///
/// Fatal conditions do not return: they end the process from inside.
pub async fn run(config: DaemonConfig) -> Result<(), DaemonError> {
    let mut signals = Signals::install()?;
    let mut controller = BusController::new(config.bus_name.clone());

    let connection = match zbus::Connection::system().await {
        Ok(connection) => connection,
        Err(err) => {
            tracing::debug!(error = %err, "system bus connection failed");
            controller.on_name_lost(NameLostCause::NoConnection).die()
        }
    };

    let (request_tx, mut request_rx) = mpsc::unbounded_channel::<DaemonEvent>();
    let manager: ManagerHandle = Arc::new(BusObjectTree::new(
        connection.clone(),
        config.object_root.clone(),
        request_tx,
    ));
    let access: Arc<dyn DeviceAccess> = Arc::new(CdevAccess::new(&config.dev_dir));

    // Subscribe before enumerating so nothing falls between the two.
    let mut listener = HotplugListener::subscribe(&config.subsystem)?;
    let devices = hotplug::enumerate(&config.subsystem)?;
    let registry = controller
        .on_connection_acquired(access, manager, &config.object_root, devices)
        .await?;

    let mut name_watch = NameWatch::new(&connection, &config.bus_name).await?;
    let mut daemon = Daemon::new(controller, registry);
    let mut pending = Some(request_name(&connection, &config.bus_name).await);

    crate::notice!("gpio-dbus started");

    loop {
        let event = match pending.take() {
            Some(event) => event,
            None => tokio::select! {
                kind = signals.recv() => DaemonEvent::Signal(kind),
                uevent = listener.next() => match uevent {
                    Some(Ok(uevent)) => DaemonEvent::Hotplug(uevent),
                    Some(Err(err)) => {
                        tracing::warn!(error = %err, "uevent receive error");
                        continue;
                    }
                    None => Fatal::new("udev monitor closed, dying...").die(),
                },
                cause = name_watch.next() => DaemonEvent::NameLost(cause),
                Some(request) = request_rx.recv() => request,
            },
        };

        match daemon.dispatch(event).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Shutdown) => break,
            Err(fatal) => fatal.die(),
        }
    }

    daemon.shutdown().await;

    if let Err(err) = connection.release_name(config.bus_name.as_str()).await {
        tracing::debug!(error = %err, "releasing bus name failed");
    }
    if let Err(err) = connection.close().await {
        tracing::warn!("error closing bus connection: {err}");
    }
    Ok(())
}

/// Request the well-known name without queueing behind another owner.
async fn request_name(connection: &zbus::Connection, name: &str) -> DaemonEvent {
    match connection
        .request_name_with_flags(name, RequestNameFlags::DoNotQueue.into())
        .await
    {
        Ok(RequestNameReply::PrimaryOwner | RequestNameReply::AlreadyOwner) => {
            DaemonEvent::NameAcquired(name.to_owned())
        }
        Ok(reply) => {
            tracing::debug!(?reply, "name request refused");
            DaemonEvent::NameLost(NameLostCause::NameTaken)
        }
        Err(zbus::Error::NameTaken) => DaemonEvent::NameLost(NameLostCause::NameTaken),
        Err(err) => {
            tracing::debug!(error = %err, "name request failed");
            DaemonEvent::NameLost(NameLostCause::ConnectionClosed)
        }
    }
}

/// SIGTERM and SIGINT stop the loop; SIGHUP is received and ignored.
///
/// The handlers stay installed after the loop ends, so repeated signals
/// during teardown are swallowed instead of killing the process.
struct Signals {
    terminate: Signal,
    interrupt: Signal,
    hangup: Signal,
}

impl Signals {
    fn install() -> Result<Self, DaemonError> {
        use tokio::signal::unix::SignalKind as Unix;

        let install = |kind| signal(kind).map_err(|e| io_err("signal handler", e));
        Ok(Self {
            terminate: install(Unix::terminate())?,
            interrupt: install(Unix::interrupt())?,
            hangup: install(Unix::hangup())?,
        })
    }

    async fn recv(&mut self) -> SignalKind {
        tokio::select! {
            _ = self.terminate.recv() => SignalKind::Terminate,
            _ = self.interrupt.recv() => SignalKind::Interrupt,
            _ = self.hangup.recv() => SignalKind::Hangup,
        }
    }
}

/// Watches `NameLost` for our name; the stream ending means the bus is gone.
struct NameWatch {
    lost: BoxStream<'static, String>,
    name: String,
}

impl NameWatch {
    async fn new(connection: &zbus::Connection, name: &str) -> Result<Self, DaemonError> {
        let proxy = DBusProxy::new(connection).await?;
        let lost = proxy
            .receive_name_lost()
            .await?
            .filter_map(|message| async move {
                match message.args() {
                    Ok(args) => Some(args.name().to_string()),
                    Err(err) => {
                        tracing::debug!(error = %err, "malformed NameLost signal");
                        None
                    }
                }
            })
            .boxed();
        Ok(Self {
            lost,
            name: name.to_owned(),
        })
    }

    async fn next(&mut self) -> NameLostCause {
        while let Some(lost) = self.lost.next().await {
            if lost == self.name {
                return NameLostCause::NameTaken;
            }
        }
        NameLostCause::ConnectionClosed
    }
}
