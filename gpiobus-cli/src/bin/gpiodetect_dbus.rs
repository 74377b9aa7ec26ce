//! gpiodetect-dbus: list the chips a running gpio-dbus exports.

use anyhow::{Context, Result};
use clap::Parser;

use gpiobus_core::ChipInfo;
use gpiobus_daemon::client;

#[derive(Parser, Debug)]
#[command(
    name = "gpiodetect-dbus",
    version,
    about = "List GPIO chips exported by gpio-dbus",
    long_about = None,
)]
struct Cli {
    /// Emit machine-readable JSON.
    #[arg(long)]
    json: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let connection = zbus::Connection::system()
        .await
        .context("failed to connect to the system bus")?;
    let chips = client::detect_chips(&connection)
        .await
        .context("failed to query org.gpiod; is gpio-dbus running?")?;

    if cli.json {
        print_json(&chips)?;
    } else {
        for chip in &chips {
            println!("{}", client::describe(chip));
        }
    }
    Ok(())
}

fn print_json(chips: &[ChipInfo]) -> Result<()> {
    let out = serde_json::to_string_pretty(chips).context("failed to encode chip list")?;
    println!("{out}");
    Ok(())
}
