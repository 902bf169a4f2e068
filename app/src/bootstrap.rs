use std::path::{Path, PathBuf};
use std::sync::Arc;

use inkbridge_alerts::desktop::{DesktopBackend, UnsupportedDesktop};
use inkbridge_alerts::sound::{NullSoundBackend, SoundBackend, SoundLibrary};
use inkbridge_alerts::{DesktopNotifier, SoundManager, VisibilityTracker};
use inkbridge_client::ClientError;
use inkbridge_client::api::NotificationApi;
use inkbridge_db::Database;
use tokio_util::sync::CancellationToken;

use crate::config::{AppConfig, SettingsManager};
use crate::coordinator::{Coordinator, CoordinatorDeps, NotificationProvider};
use crate::navigation::LoggingNavigator;

const APP_NAME: &str = "Inkbridge";

/// Everything the binary wires together, constructed once.
#[derive(Clone)]
pub struct Services {
    pub config: AppConfig,
    pub settings: Arc<SettingsManager>,
    pub visibility: Arc<VisibilityTracker>,
    pub sound: Arc<SoundManager>,
    pub desktop: Arc<DesktopNotifier>,
    pub navigator: Arc<LoggingNavigator>,
    pub coordinator: Arc<Coordinator>,
    pub provider: Arc<NotificationProvider>,
    pub shutdown: CancellationToken,
}

/// Foundation init: .env, data dir, settings DB, config (fatal on error).
pub fn init_foundation() -> Result<(Database, AppConfig, PathBuf), anyhow::Error> {
    load_dotenv();
    let dir = data_dir();
    std::fs::create_dir_all(&dir)?;

    let db_path = dir.join("local.db");
    tracing::info!("Opening database at {}", db_path.display());
    let db = Database::open(&db_path)?;

    let sm = SettingsManager::new(db.clone());
    if let Err(e) = sm.migrate_from_env() {
        tracing::error!("Failed to migrate from env: {e}");
    }
    sm.initialize_defaults()?;

    let config = AppConfig::load(&sm)?;

    if let Ok(status) = sm.check_feature_status() {
        if !status.missing_settings.is_empty() || !status.warnings.is_empty() {
            tracing::warn!(
                "Missing settings: {:?}, warnings: {:?}",
                status.missing_settings,
                status.warnings
            );
        }
    }

    tracing::info!(api = %config.api_base_url, "Settings loaded");
    Ok((db, config, dir))
}

/// Construct the shared services. Never fails: missing audio or desktop
/// support degrades to the null backends.
pub fn build_services(db: Database, config: AppConfig, data_dir: &Path) -> Services {
    let settings = Arc::new(SettingsManager::new(db));
    let visibility = VisibilityTracker::new(config.start_visible);

    let library = SoundLibrary::from_dir(&config.sound_dir(data_dir));
    let sound = Arc::new(SoundManager::new(
        sound_backend(),
        library,
        config.sound_preferences(),
    ));
    if !config.sound_require_interaction {
        sound.mark_user_interaction();
    }

    let desktop = DesktopNotifier::new(
        desktop_backend(config.desktop_notifications_enabled, &visibility),
        visibility.clone(),
    );
    if desktop.is_supported() && !desktop.request_permission() {
        tracing::warn!("OS notifications not permitted");
    }

    let navigator = Arc::new(LoggingNavigator::default());
    let store = Arc::new(NotificationApi::new(&config.api_base_url, &config.auth_token));
    let coordinator = Coordinator::new(
        config.user_id.clone(),
        CoordinatorDeps {
            store,
            visibility: visibility.clone(),
            sound: sound.clone(),
            desktop: desktop.clone(),
            navigator: navigator.clone(),
        },
    );

    Services {
        config,
        settings,
        visibility,
        sound,
        desktop,
        navigator,
        coordinator,
        provider: Arc::new(NotificationProvider::new()),
        shutdown: CancellationToken::new(),
    }
}

/// Start the coordinator and expose it through the provider. Without a
/// user id, or if the session cannot start, consumers stay detached.
pub async fn start_coordinator(services: &Services) {
    let config = &services.config;
    match services
        .coordinator
        .start(config.realtime_config())
        .await
    {
        Ok(()) => {
            services.provider.install(services.coordinator.clone());
            tracing::info!(socket = %config.socket_origin(), "Realtime notifications active");
        }
        Err(ClientError::AuthRequired) => {
            tracing::warn!("USER_ID is not set, running without a notification session");
        }
        Err(e) => {
            tracing::error!("Failed to start notification session: {e}");
        }
    }
}

#[cfg(feature = "rodio")]
fn sound_backend() -> Arc<dyn SoundBackend> {
    match inkbridge_alerts::sound::RodioBackend::spawn() {
        Ok(backend) => Arc::new(backend),
        Err(e) => {
            tracing::warn!("Audio output unavailable, sounds disabled: {e}");
            Arc::new(NullSoundBackend)
        }
    }
}

#[cfg(not(feature = "rodio"))]
fn sound_backend() -> Arc<dyn SoundBackend> {
    tracing::info!("Built without audio support");
    Arc::new(NullSoundBackend)
}

/// A clicked notification brings the notifier to the foreground, which
/// counts as the page becoming visible.
#[cfg(all(feature = "desktop", target_os = "linux"))]
fn desktop_backend(enabled: bool, visibility: &Arc<VisibilityTracker>) -> Arc<dyn DesktopBackend> {
    if !enabled {
        return Arc::new(UnsupportedDesktop);
    }
    let visibility = Arc::downgrade(visibility);
    Arc::new(
        inkbridge_alerts::desktop::XdgDesktop::new(APP_NAME).with_focus_hook(move || {
            if let Some(visibility) = visibility.upgrade() {
                visibility.set_visible(true);
            }
        }),
    )
}

#[cfg(not(all(feature = "desktop", target_os = "linux")))]
fn desktop_backend(enabled: bool, _visibility: &Arc<VisibilityTracker>) -> Arc<dyn DesktopBackend> {
    if enabled {
        tracing::info!("{APP_NAME} built without OS notification support");
    }
    Arc::new(UnsupportedDesktop)
}

/// Determine the data directory for the application.
/// Priority: INKBRIDGE_DATA_DIR env var > ~/.inkbridge
fn data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("INKBRIDGE_DATA_DIR") {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".inkbridge")
}

/// Load .env from multiple candidate paths.
fn load_dotenv() {
    let candidates = [".env", "../.env", "../../.env"];
    for path in &candidates {
        if dotenvy::from_filename(path).is_ok() {
            tracing::info!("Loaded .env from: {path}");
            return;
        }
    }
    tracing::info!("No .env file found, using system environment variables");
}
