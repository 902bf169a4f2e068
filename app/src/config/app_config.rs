//! Runtime application configuration loaded from DB + environment overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use inkbridge_alerts::SoundPreferences;
use inkbridge_client::Credentials;
use inkbridge_client::realtime::RealtimeConfig;

use super::manager::SettingsManager;

/// Runtime configuration populated from the settings DB.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base_url: String,
    pub socket_url: String,
    pub user_id: String,
    pub auth_token: String,
    pub sound_enabled: bool,
    pub sound_volume: f32,
    pub sound_selected: Option<String>,
    pub sound_asset_dir: Option<PathBuf>,
    pub sound_require_interaction: bool,
    pub desktop_notifications_enabled: bool,
    pub reconnect_attempts: u32,
    pub reconnect_delay_ms: u64,
    pub start_visible: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000/api".into(),
            socket_url: String::new(),
            user_id: String::new(),
            auth_token: String::new(),
            sound_enabled: true,
            sound_volume: 0.5,
            sound_selected: None,
            sound_asset_dir: None,
            sound_require_interaction: true,
            desktop_notifications_enabled: true,
            reconnect_attempts: 5,
            reconnect_delay_ms: 1000,
            start_visible: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from the settings manager (DB-first, env overrides).
    pub fn load(sm: &SettingsManager) -> Result<Self, anyhow::Error> {
        let g = |key: &str| -> String { sm.get_setting(key).unwrap_or_default() };
        let defaults = Self::default();

        // Environment variable overrides for connection identity
        let env_or = |key: &str| -> String {
            std::env::var(key)
                .ok()
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| g(key))
        };

        let api_base_url = {
            let url = env_or("API_BASE_URL");
            if url.is_empty() { defaults.api_base_url } else { url }
        };

        let sound = sm.sound_preferences();

        Ok(Self {
            api_base_url,
            socket_url: env_or("SOCKET_URL"),
            user_id: env_or("USER_ID"),
            auth_token: env_or("AUTH_TOKEN"),
            sound_enabled: sound.enabled,
            sound_volume: sound.volume,
            sound_selected: sound.selected_sound,
            sound_asset_dir: non_empty(g("SOUND_ASSET_DIR")).map(PathBuf::from),
            sound_require_interaction: g("SOUND_REQUIRE_INTERACTION") != "false",
            desktop_notifications_enabled: g("DESKTOP_NOTIFICATIONS_ENABLED") != "false",
            reconnect_attempts: parse_or(&g("RECONNECT_ATTEMPTS"), defaults.reconnect_attempts),
            reconnect_delay_ms: parse_or(&g("RECONNECT_DELAY_MS"), defaults.reconnect_delay_ms),
            start_visible: g("START_VISIBLE") != "false",
        })
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.user_id, &self.auth_token)
    }

    /// Socket origin; falls back to the API origin without its path.
    pub fn socket_origin(&self) -> String {
        if !self.socket_url.is_empty() {
            return self.socket_url.clone();
        }
        match url::Url::parse(&self.api_base_url) {
            Ok(url) => url.origin().ascii_serialization(),
            Err(_) => self.api_base_url.clone(),
        }
    }

    pub fn realtime_config(&self) -> RealtimeConfig {
        let mut config = RealtimeConfig::new(self.socket_origin(), self.credentials());
        config.max_reconnect_attempts = self.reconnect_attempts;
        config.reconnect_delay = Duration::from_millis(self.reconnect_delay_ms);
        config
    }

    pub fn sound_preferences(&self) -> SoundPreferences {
        SoundPreferences {
            enabled: self.sound_enabled,
            volume: self.sound_volume,
            selected_sound: self.sound_selected.clone(),
        }
    }

    /// Sound asset directory, `<data dir>/sounds` unless configured.
    pub fn sound_dir(&self, data_dir: &Path) -> PathBuf {
        self.sound_asset_dir
            .clone()
            .unwrap_or_else(|| data_dir.join("sounds"))
    }
}

fn parse_or<T: std::str::FromStr>(s: &str, default: T) -> T {
    if s.is_empty() {
        return default;
    }
    s.parse().unwrap_or(default)
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() { None } else { Some(s) }
}
