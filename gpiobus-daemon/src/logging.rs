//! Syslog-style stderr sink.
//!
//! Every record is written as `<priority>message`, which is what journald
//! expects from a service's stderr. Priorities follow syslog: emergency 0,
//! error 3, warning 4, notice 5, info 6, debug 7. `tracing` has no notice
//! or emergency level, so those two are carried on dedicated targets.

use std::fmt;

use tracing::{Event, Level, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::EnvFilter;

/// Target for lifecycle messages shown even without `--debug`.
pub const NOTICE_TARGET: &str = "notice";
/// Target for records written right before the process aborts.
pub const EMERGENCY_TARGET: &str = "emergency";
/// Environment variable overriding the level filter (EnvFilter syntax).
pub const LOG_ENV: &str = "GPIO_DBUS_LOG";

/// Log at notice priority.
#[macro_export]
macro_rules! notice {
    ($($arg:tt)+) => {
        ::tracing::info!(target: $crate::logging::NOTICE_TARGET, $($arg)+)
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Priority {
    Emergency = 0,
    Error = 3,
    Warning = 4,
    Notice = 5,
    Info = 6,
    Debug = 7,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", *self as u8)
    }
}

pub fn priority_for(level: &Level, target: &str) -> Priority {
    match target {
        EMERGENCY_TARGET => return Priority::Emergency,
        NOTICE_TARGET => return Priority::Notice,
        _ => {}
    }
    match *level {
        Level::ERROR => Priority::Error,
        Level::WARN => Priority::Warning,
        Level::INFO => Priority::Info,
        Level::DEBUG | Level::TRACE => Priority::Debug,
    }
}

/// `FormatEvent` producing `<priority>message fields...`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PriorityFormat;

impl<S, N> FormatEvent<S, N> for PriorityFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();
        write!(writer, "<{}>", priority_for(meta.level(), meta.target()))?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// Level filter: warnings and notices by default, everything with `--debug`.
pub fn filter(debug: bool) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| {
        if debug {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new(format!("warn,{NOTICE_TARGET}=info"))
        }
    })
}

/// Install the stderr sink. Safe to call more than once; later calls are no-ops.
pub fn init(debug: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(debug))
        .with_writer(std::io::stderr)
        .event_format(PriorityFormat)
        .try_init();
}

/// Log panics at emergency priority before the default hook runs.
///
/// Registry invariant violations panic; in release builds the panic aborts.
pub fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!(target: EMERGENCY_TARGET, "{info}");
        default_hook(info);
    }));
}
