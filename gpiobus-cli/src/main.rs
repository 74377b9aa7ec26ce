//! gpio-dbus: export GPIO chips on the system bus as `org.gpiod`.
//!
//! # Usage
//!
//! ```text
//! gpio-dbus [-d|--debug]
//! ```

use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::Parser;

use gpiobus_daemon::{logging, notice, DaemonConfig, Fatal};

#[derive(Parser, Debug)]
#[command(
    name = "gpio-dbus",
    version,
    about = "Export GPIO chips over D-Bus and follow hotplug events",
    long_about = None,
)]
struct Cli {
    /// Emit debug log messages.
    #[arg(short, long)]
    debug: bool,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            err.exit()
        }
        Err(err) => {
            logging::init(false);
            let rendered = err.to_string();
            let reason = rendered.lines().next().unwrap_or_default();
            Fatal::new(format!("option parsing failed: {reason}")).die()
        }
    };

    logging::init(cli.debug);
    logging::install_panic_hook();
    notice!("initiating gpio-dbus");

    match gpiobus_daemon::start_blocking(DaemonConfig::with_debug(cli.debug)) {
        Ok(()) => {
            notice!("gpio-dbus exiting cleanly");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
