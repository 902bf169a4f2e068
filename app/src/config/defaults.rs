//! All setting definitions with their default values.

use std::collections::HashMap;
use std::sync::LazyLock;

type DefTuple = (&'static str, &'static str, bool, bool, &'static str);

// (key, default, secret, required, description)
const DEFS: &[DefTuple] = &[
    ("API_BASE_URL", "http://localhost:5000/api", false, true, "REST API base URL"),
    ("SOCKET_URL", "", false, false, "Real-time server origin (defaults to the API origin)"),
    ("USER_ID", "", false, true, "Signed-in user id, used to join the personal room"),
    ("AUTH_TOKEN", "", true, true, "Bearer token for the notification API"),
    ("SOUND_ENABLED", "true", false, false, "Play sound cues while the app is visible"),
    ("SOUND_VOLUME", "0.5", false, false, "Sound cue volume (0.0-1.0)"),
    ("SOUND_SELECTED", "", false, false, "Asset id replacing the generic notification cue"),
    ("SOUND_ASSET_DIR", "", false, false, "Directory of sound assets (defaults to <data dir>/sounds)"),
    ("SOUND_REQUIRE_INTERACTION", "true", false, false, "Hold sounds until the first console command"),
    ("DESKTOP_NOTIFICATIONS_ENABLED", "true", false, false, "Raise OS notifications while hidden"),
    ("RECONNECT_ATTEMPTS", "5", false, false, "Reconnect attempts before giving up"),
    ("RECONNECT_DELAY_MS", "1000", false, false, "Fixed delay between reconnect attempts"),
    ("START_VISIBLE", "true", false, false, "Initial page visibility"),
];

/// A single setting definition.
#[derive(Debug, Clone)]
pub struct SettingDef {
    pub key: &'static str,
    pub default: &'static str,
    pub secret: bool,
    pub required: bool,
    pub description: &'static str,
}

/// Global setting definitions indexed by key.
pub static DEFAULT_SETTINGS: LazyLock<HashMap<&'static str, SettingDef>> = LazyLock::new(|| {
    DEFS.iter()
        .map(|&(key, default, secret, required, description)| {
            (
                key,
                SettingDef {
                    key,
                    default,
                    secret,
                    required,
                    description,
                },
            )
        })
        .collect()
});

/// Get the default value for a setting key, or `None` if not defined.
pub fn get_default(key: &str) -> Option<&'static str> {
    DEFAULT_SETTINGS.get(key).map(|d| d.default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::validation::validate_setting;

    #[test]
    fn every_default_passes_validation() {
        for def in DEFAULT_SETTINGS.values() {
            assert!(
                validate_setting(def.key, def.default).is_ok(),
                "default for {} is invalid",
                def.key
            );
        }
    }

    #[test]
    fn lookup_by_key() {
        assert_eq!(get_default("SOUND_VOLUME"), Some("0.5"));
        assert_eq!(get_default("NOPE"), None);
        assert!(DEFAULT_SETTINGS["AUTH_TOKEN"].secret);
    }
}
