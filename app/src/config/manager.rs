//! SettingsManager: DB-backed settings with defaults, migration, and feature status.

use std::collections::HashMap;

use inkbridge_alerts::SoundPreferences;
use inkbridge_db::Database;

use super::defaults::DEFAULT_SETTINGS;
use super::validation::validate_setting;
use super::{FeatureStatus, SettingInfo, SettingType};

const SECRET_MASK: &str = "********";

/// Wraps [`Database`] to provide high-level settings operations.
pub struct SettingsManager {
    db: Database,
}

impl SettingsManager {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Get a setting value. Falls back to default if not in DB.
    pub fn get_setting(&self, key: &str) -> Result<String, anyhow::Error> {
        if let Some(val) = self.db.get_setting(key)? {
            return Ok(val);
        }
        if let Some(def) = DEFAULT_SETTINGS.get(key) {
            return Ok(def.default.to_string());
        }
        anyhow::bail!("setting not found: {key}");
    }

    /// Set a setting value with validation.
    pub fn set_setting(&self, key: &str, value: &str) -> Result<(), anyhow::Error> {
        let def = DEFAULT_SETTINGS
            .get(key)
            .ok_or_else(|| anyhow::anyhow!("unknown setting key: {key}"))?;

        validate_setting(key, value).map_err(|e| anyhow::anyhow!("validation error for {key}: {e}"))?;

        self.db.set_setting(key, value, def.secret)?;
        Ok(())
    }

    /// Validate every entry, then write them in one transaction.
    pub fn update_settings(&self, settings: &HashMap<String, String>) -> Result<(), anyhow::Error> {
        for (key, value) in settings {
            if !DEFAULT_SETTINGS.contains_key(key.as_str()) {
                anyhow::bail!("unknown setting key: {key}");
            }
            validate_setting(key, value)
                .map_err(|e| anyhow::anyhow!("validation error for {key}: {e}"))?;
        }
        self.db.update_settings_bulk(settings)?;
        Ok(())
    }

    /// Drop the stored value so the default applies again.
    pub fn reset_setting(&self, key: &str) -> Result<(), anyhow::Error> {
        if !DEFAULT_SETTINGS.contains_key(key) {
            anyhow::bail!("unknown setting key: {key}");
        }
        self.db.delete_setting(key)?;
        Ok(())
    }

    /// Get all known settings, filling in defaults and masking secrets.
    pub fn get_all_settings(&self) -> Result<Vec<SettingInfo>, anyhow::Error> {
        let db_settings: HashMap<String, String> = self.db.get_all_settings()?;
        let mut result: Vec<SettingInfo> = DEFAULT_SETTINGS
            .values()
            .map(|def| {
                let value = db_settings
                    .get(def.key)
                    .cloned()
                    .unwrap_or_else(|| def.default.to_string());
                let has_value = !value.is_empty();
                SettingInfo {
                    key: def.key.to_string(),
                    value: if def.secret && has_value {
                        SECRET_MASK.to_string()
                    } else {
                        value
                    },
                    setting_type: setting_type(def.secret),
                    required: def.required,
                    description: def.description.to_string(),
                    has_value,
                }
            })
            .collect();
        result.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(result)
    }

    /// Initialize default settings in DB (skip existing).
    pub fn initialize_defaults(&self) -> Result<(), anyhow::Error> {
        for (key, def) in DEFAULT_SETTINGS.iter() {
            if self.db.get_setting(key)?.is_some() {
                continue;
            }
            self.db.set_setting(key, def.default, def.secret)?;
        }
        Ok(())
    }

    /// Migrate settings from environment variables to DB (one-time).
    pub fn migrate_from_env(&self) -> Result<u32, anyhow::Error> {
        self.migrate_from(|key| std::env::var(key).ok())
    }

    fn migrate_from(&self, lookup: impl Fn(&str) -> Option<String>) -> Result<u32, anyhow::Error> {
        let mut migrated = 0u32;
        let mut secret_migrated = false;
        for (key, def) in DEFAULT_SETTINGS.iter() {
            if self.db.get_setting(key)?.is_some() {
                continue;
            }
            let Some(value) = lookup(key).filter(|v| !v.is_empty()) else {
                continue;
            };
            if let Err(e) = validate_setting(key, &value) {
                tracing::warn!("Skipping invalid env setting {key}: {e}");
                continue;
            }
            self.db.set_setting(key, &value, def.secret)?;
            tracing::info!("Migrated setting from env: {key}");
            secret_migrated |= def.secret;
            migrated += 1;
        }
        if migrated > 0 {
            tracing::info!("Migration completed: {migrated} settings migrated");
            if secret_migrated {
                tracing::warn!(
                    "SECURITY WARNING: Sensitive data in env vars. \
                     Remove from .env after confirming migration."
                );
            }
        }
        Ok(migrated)
    }

    /// Stored sound preferences over the defaults. A corrupt stored value
    /// is logged and the defaults are used instead.
    pub fn sound_preferences(&self) -> SoundPreferences {
        let defaults = SoundPreferences::default();
        let stored = match self.db.sound_preferences() {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring stored sound preferences");
                return defaults;
            }
        };
        SoundPreferences {
            enabled: stored.enabled.unwrap_or(defaults.enabled),
            volume: stored.volume.unwrap_or(defaults.volume),
            selected_sound: stored.selected,
        }
    }

    pub fn save_sound_preferences(&self, prefs: &SoundPreferences) -> Result<(), anyhow::Error> {
        let selected = prefs.selected_sound.as_deref().unwrap_or_default();
        validate_setting("SOUND_SELECTED", selected)
            .map_err(|e| anyhow::anyhow!("validation error for SOUND_SELECTED: {e}"))?;
        self.db
            .save_sound_preferences(prefs.enabled, prefs.volume, prefs.selected_sound.as_deref())?;
        Ok(())
    }

    /// Check which features are properly configured.
    pub fn check_feature_status(&self) -> Result<FeatureStatus, anyhow::Error> {
        let mut status = FeatureStatus {
            realtime_configured: true,
            sound_enabled: self.get_setting("SOUND_ENABLED")? == "true",
            desktop_enabled: self.get_setting("DESKTOP_NOTIFICATIONS_ENABLED")? == "true",
            missing_settings: Vec::new(),
            warnings: Vec::new(),
        };

        for def in DEFAULT_SETTINGS.values().filter(|d| d.required) {
            if self.get_setting(def.key).unwrap_or_default().is_empty() {
                status.missing_settings.push(def.key.to_string());
                status.realtime_configured = false;
            }
        }
        status.missing_settings.sort();

        if !status.sound_enabled {
            status.warnings.push("SOUND_ENABLED is false - no sound cues".into());
        }
        if !status.desktop_enabled {
            status
                .warnings
                .push("DESKTOP_NOTIFICATIONS_ENABLED is false - no OS notifications".into());
        }

        Ok(status)
    }

    pub fn db(&self) -> &Database {
        &self.db
    }
}

fn setting_type(secret: bool) -> SettingType {
    if secret {
        SettingType::Secret
    } else {
        SettingType::Normal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> SettingsManager {
        SettingsManager::new(Database::open_in_memory().unwrap())
    }

    #[test]
    fn falls_back_to_default() {
        let sm = manager();
        assert_eq!(sm.get_setting("RECONNECT_ATTEMPTS").unwrap(), "5");
        assert!(sm.get_setting("UNKNOWN_KEY").is_err());
    }

    #[test]
    fn set_validates_and_persists() {
        let sm = manager();
        sm.set_setting("SOUND_VOLUME", "0.8").unwrap();
        assert_eq!(sm.get_setting("SOUND_VOLUME").unwrap(), "0.8");

        assert!(sm.set_setting("SOUND_VOLUME", "2").is_err());
        assert!(sm.set_setting("NOT_A_SETTING", "x").is_err());
        assert_eq!(sm.get_setting("SOUND_VOLUME").unwrap(), "0.8");
    }

    #[test]
    fn initialize_defaults_keeps_existing_values() {
        let sm = manager();
        sm.set_setting("USER_ID", "u1").unwrap();
        sm.initialize_defaults().unwrap();
        assert_eq!(sm.db().get_setting("USER_ID").unwrap().as_deref(), Some("u1"));
        assert_eq!(
            sm.db().get_setting("START_VISIBLE").unwrap().as_deref(),
            Some("true")
        );
    }

    #[test]
    fn migration_copies_valid_values_once() {
        let sm = manager();
        let env: HashMap<&str, &str> = [
            ("USER_ID", "u42"),
            ("AUTH_TOKEN", "secret-token"),
            ("SOUND_VOLUME", "7"),
        ]
        .into_iter()
        .collect();
        let lookup = |key: &str| env.get(key).map(|v| v.to_string());

        assert_eq!(sm.migrate_from(lookup).unwrap(), 2);
        assert_eq!(sm.get_setting("USER_ID").unwrap(), "u42");
        assert_eq!(sm.get_setting("SOUND_VOLUME").unwrap(), "0.5");
        assert_eq!(sm.migrate_from(lookup).unwrap(), 0);
    }

    #[test]
    fn bulk_update_is_all_or_nothing() {
        let sm = manager();
        let mut batch = HashMap::new();
        batch.insert("SOUND_ENABLED".to_string(), "false".to_string());
        batch.insert("SOUND_VOLUME".to_string(), "0.9".to_string());
        sm.update_settings(&batch).unwrap();
        assert_eq!(sm.get_setting("SOUND_ENABLED").unwrap(), "false");
        assert_eq!(sm.get_setting("SOUND_VOLUME").unwrap(), "0.9");

        batch.insert("SOUND_VOLUME".to_string(), "9".to_string());
        batch.insert("SOUND_ENABLED".to_string(), "true".to_string());
        assert!(sm.update_settings(&batch).is_err());
        assert_eq!(sm.get_setting("SOUND_ENABLED").unwrap(), "false");
    }

    #[test]
    fn reset_restores_default() {
        let sm = manager();
        sm.set_setting("RECONNECT_ATTEMPTS", "9").unwrap();
        sm.reset_setting("RECONNECT_ATTEMPTS").unwrap();
        assert_eq!(sm.get_setting("RECONNECT_ATTEMPTS").unwrap(), "5");
        assert!(sm.reset_setting("BOGUS").is_err());
    }

    #[test]
    fn secrets_are_masked_in_listing() {
        let sm = manager();
        sm.set_setting("AUTH_TOKEN", "abc").unwrap();
        let all = sm.get_all_settings().unwrap();
        let token = all.iter().find(|s| s.key == "AUTH_TOKEN").unwrap();
        assert_eq!(token.value, SECRET_MASK);
        assert_eq!(token.setting_type, SettingType::Secret);
        assert!(token.has_value);
    }

    #[test]
    fn sound_preferences_round_trip() {
        let sm = manager();
        assert_eq!(sm.sound_preferences(), SoundPreferences::default());

        let prefs = SoundPreferences {
            enabled: false,
            volume: 0.3,
            selected_sound: Some("chime".into()),
        };
        sm.save_sound_preferences(&prefs).unwrap();
        assert_eq!(sm.sound_preferences(), prefs);
        assert_eq!(sm.get_setting("SOUND_ENABLED").unwrap(), "false");
    }

    #[test]
    fn corrupt_sound_preferences_fall_back_to_defaults() {
        let sm = manager();
        sm.db().set_setting("SOUND_VOLUME", "loud", false).unwrap();
        assert_eq!(sm.sound_preferences(), SoundPreferences::default());
    }

    #[test]
    fn feature_status_lists_missing_credentials() {
        let sm = manager();
        sm.initialize_defaults().unwrap();
        let status = sm.check_feature_status().unwrap();
        assert!(!status.realtime_configured);
        assert_eq!(status.missing_settings, vec!["AUTH_TOKEN", "USER_ID"]);

        sm.set_setting("USER_ID", "u1").unwrap();
        sm.set_setting("AUTH_TOKEN", "t").unwrap();
        sm.set_setting("SOUND_ENABLED", "false").unwrap();
        let status = sm.check_feature_status().unwrap();
        assert!(status.realtime_configured);
        assert!(!status.sound_enabled);
        assert_eq!(status.warnings.len(), 1);
    }
}
