use std::time::Duration;

use tokio::time::sleep;

use crate::bootstrap::Services;

pub async fn graceful_shutdown(services: &Services) {
    tracing::info!("Shutdown sequence started");

    services.shutdown.cancel();
    tracing::info!("Shutdown: console stopped");

    services.provider.clear();
    services.coordinator.shutdown().await;
    tracing::info!("Shutdown: notification session closed");

    let closed = services.desktop.close_all();
    if closed > 0 {
        tracing::info!("Shutdown: {closed} OS notifications closed");
    }

    // Let detached audio sinks finish their current cue.
    sleep(Duration::from_millis(200)).await;
    tracing::info!("Shutdown sequence completed");
}
