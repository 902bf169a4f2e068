//! Headless notifier binary.
//!
//! Opens the settings DB, starts the notification session and drives it
//! from a stdin console until `quit` or Ctrl+C.

use tracing_subscriber::EnvFilter;

use inkbridge_notifier_lib::console;
use inkbridge_notifier_lib::shutdown::graceful_shutdown;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting Inkbridge notifier");

    let (db, config, dir) = inkbridge_notifier_lib::init_foundation()?;
    let services = inkbridge_notifier_lib::build_services(db, config, &dir);
    inkbridge_notifier_lib::start_coordinator(&services).await;

    let console_handle = tokio::spawn(console::run(services.clone()));

    tracing::info!("Notifier running. Type 'help' for commands, Ctrl+C to stop.");

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            result?;
            tracing::info!("Shutting down...");
        }
        _ = services.shutdown.cancelled() => {
            tracing::info!("Console requested shutdown");
        }
    }

    graceful_shutdown(&services).await;
    console_handle.abort();
    Ok(())
}
