//! Typed access to the sound preferences the console changes at runtime.

use crate::{Database, DbError};

pub const SOUND_ENABLED: &str = "SOUND_ENABLED";
pub const SOUND_VOLUME: &str = "SOUND_VOLUME";
pub const SOUND_SELECTED: &str = "SOUND_SELECTED";

/// Sound preferences as stored. `None` means the row is absent (or, for
/// the selected cue, empty) and the caller's default applies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredSoundPreferences {
    pub enabled: Option<bool>,
    pub volume: Option<f32>,
    pub selected: Option<String>,
}

impl Database {
    pub fn sound_preferences(&self) -> Result<StoredSoundPreferences, DbError> {
        let enabled = match self.get_setting(SOUND_ENABLED)? {
            None => None,
            Some(v) => Some(parse_bool(SOUND_ENABLED, &v)?),
        };
        let volume = match self.get_setting(SOUND_VOLUME)? {
            None => None,
            Some(v) => Some(parse_volume(&v)?),
        };
        let selected = self
            .get_setting(SOUND_SELECTED)?
            .filter(|v| !v.trim().is_empty());
        Ok(StoredSoundPreferences {
            enabled,
            volume,
            selected,
        })
    }

    /// Store all three preferences in one transaction. No selected cue is
    /// stored as an empty value.
    pub fn save_sound_preferences(
        &self,
        enabled: bool,
        volume: f32,
        selected: Option<&str>,
    ) -> Result<(), DbError> {
        if !(0.0..=1.0).contains(&volume) {
            return Err(DbError::InvalidData {
                key: SOUND_VOLUME.to_string(),
                value: volume.to_string(),
            });
        }
        let enabled = enabled.to_string();
        let volume = volume.to_string();
        self.write_values(&[
            (SOUND_ENABLED, enabled.as_str()),
            (SOUND_VOLUME, volume.as_str()),
            (SOUND_SELECTED, selected.unwrap_or_default()),
        ])
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool, DbError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(DbError::InvalidData {
            key: key.to_string(),
            value: other.to_string(),
        }),
    }
}

fn parse_volume(value: &str) -> Result<f32, DbError> {
    value
        .parse::<f32>()
        .ok()
        .filter(|v| (0.0..=1.0).contains(v))
        .ok_or_else(|| DbError::InvalidData {
            key: SOUND_VOLUME.to_string(),
            value: value.to_string(),
        })
}
