//! Audio cues for notification categories.
//!
//! Nothing plays until the user has interacted with the app, while sounds
//! are disabled, or within the throttle window of the previous cue.
//! Playback walks a three-stage fallback chain and never reports failure
//! to the caller.

mod backend;
#[cfg(feature = "rodio")]
mod rodio_backend;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

pub use backend::{NullSoundBackend, SoundBackend, SoundError, Tone};
#[cfg(feature = "rodio")]
pub use rodio_backend::RodioBackend;

/// Minimum gap between two permitted playbacks.
pub const THROTTLE_INTERVAL: Duration = Duration::from_millis(700);

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "flac"];

const MESSAGE_TONES: &[Tone] = &[Tone::new(880.0, 150), Tone::new(1108.0, 200)];
const ALERT_TONES: &[Tone] = &[
    Tone::new(660.0, 120),
    Tone::new(880.0, 120),
    Tone::new(1320.0, 180),
];

/// Named sound cues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundKey {
    Message,
    Notification,
    Agreement,
    Payment,
}

impl SoundKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Notification => "notification",
            Self::Agreement => "agreement",
            Self::Payment => "payment",
        }
    }

    fn fallback_tones(&self) -> &'static [Tone] {
        match self {
            Self::Message => MESSAGE_TONES,
            _ => ALERT_TONES,
        }
    }
}

/// Notification category as seen by the sound table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SoundCategory {
    Message,
    Agreement,
    Payment,
    Other,
}

impl SoundCategory {
    pub fn sound_key(&self) -> SoundKey {
        match self {
            Self::Message => SoundKey::Message,
            Self::Agreement => SoundKey::Agreement,
            Self::Payment => SoundKey::Payment,
            Self::Other => SoundKey::Notification,
        }
    }
}

/// User-controlled sound settings. Persisting them is the caller's job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundPreferences {
    pub enabled: bool,
    pub volume: f32,
    /// Asset id replacing the generic notification cue.
    pub selected_sound: Option<String>,
}

impl Default for SoundPreferences {
    fn default() -> Self {
        Self {
            enabled: true,
            volume: 0.5,
            selected_sound: None,
        }
    }
}

/// Which fallback stage produced the sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStage {
    Stream,
    Buffered,
    Tone,
}

/// What happened to a play request. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    Played(PlaybackStage),
    Disabled,
    AwaitingInteraction,
    Throttled,
    Failed,
}

/// Table of sound assets, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct SoundLibrary {
    assets: HashMap<String, PathBuf>,
}

impl SoundLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_asset(mut self, id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.assets.insert(id.into(), path.into());
        self
    }

    /// Register every audio file in `dir` under its file stem
    /// (`message.mp3` → `message`).
    pub fn from_dir(dir: &Path) -> Self {
        let mut library = Self::new();
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "Sound asset directory unreadable");
                return library;
            }
        };
        for entry in entries.flatten() {
            let path = entry.path();
            let is_audio = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| AUDIO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
            if !is_audio {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                library.assets.insert(stem.to_string(), path.clone());
            }
        }
        tracing::info!(count = library.assets.len(), dir = %dir.display(), "Sound assets loaded");
        library
    }

    pub fn get(&self, id: &str) -> Option<&Path> {
        self.assets.get(id).map(PathBuf::as_path)
    }

    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.assets.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

/// First-request-wins rate limiter.
struct Throttle {
    interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl Throttle {
    fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: Mutex::new(None),
        }
    }

    fn try_acquire(&self, now: Instant) -> bool {
        let Ok(mut last) = self.last.lock() else {
            return false;
        };
        if let Some(prev) = *last {
            if now.saturating_duration_since(prev) < self.interval {
                return false;
            }
        }
        *last = Some(now);
        true
    }
}

pub struct SoundManager {
    backend: Arc<dyn SoundBackend>,
    library: SoundLibrary,
    prefs: RwLock<SoundPreferences>,
    interacted: AtomicBool,
    throttle: Throttle,
}

impl SoundManager {
    pub fn new(
        backend: Arc<dyn SoundBackend>,
        library: SoundLibrary,
        prefs: SoundPreferences,
    ) -> Self {
        let prefs = SoundPreferences {
            volume: clamp_volume(prefs.volume),
            ..prefs
        };
        Self {
            backend,
            library,
            prefs: RwLock::new(prefs),
            interacted: AtomicBool::new(false),
            throttle: Throttle::new(THROTTLE_INTERVAL),
        }
    }

    /// Record the first user interaction; required before anything plays.
    pub fn mark_user_interaction(&self) {
        if !self.interacted.swap(true, Ordering::SeqCst) {
            tracing::debug!("User interaction recorded, sounds unlocked");
        }
    }

    pub fn has_user_interacted(&self) -> bool {
        self.interacted.load(Ordering::SeqCst)
    }

    pub fn preferences(&self) -> SoundPreferences {
        self.prefs
            .read()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    pub fn set_enabled(&self, enabled: bool) {
        if let Ok(mut prefs) = self.prefs.write() {
            prefs.enabled = enabled;
        }
    }

    pub fn set_volume(&self, volume: f32) {
        if let Ok(mut prefs) = self.prefs.write() {
            prefs.volume = clamp_volume(volume);
        }
    }

    pub fn set_selected_sound(&self, sound: Option<String>) {
        if let Some(id) = sound.as_deref() {
            if self.library.get(id).is_none() {
                tracing::warn!(sound = id, "Selected sound is not in the asset table");
            }
        }
        if let Ok(mut prefs) = self.prefs.write() {
            prefs.selected_sound = sound;
        }
    }

    pub fn library(&self) -> &SoundLibrary {
        &self.library
    }

    /// Play the cue mapped to a notification category.
    pub fn play_notification_sound(&self, category: SoundCategory) -> PlayOutcome {
        self.play_sound(category.sound_key())
    }

    pub fn play_sound(&self, key: SoundKey) -> PlayOutcome {
        self.play_sound_at(key, Instant::now())
    }

    fn play_sound_at(&self, key: SoundKey, now: Instant) -> PlayOutcome {
        let prefs = self.preferences();
        if !prefs.enabled {
            return PlayOutcome::Disabled;
        }
        if !self.has_user_interacted() {
            tracing::debug!(sound = key.as_str(), "Sound suppressed until user interaction");
            return PlayOutcome::AwaitingInteraction;
        }
        if !self.throttle.try_acquire(now) {
            tracing::trace!(sound = key.as_str(), "Sound throttled");
            return PlayOutcome::Throttled;
        }

        let outcome = self.run_fallback_chain(key, &prefs);
        if outcome == PlayOutcome::Failed {
            tracing::warn!(sound = key.as_str(), "All playback methods failed");
        }
        outcome
    }

    fn run_fallback_chain(&self, key: SoundKey, prefs: &SoundPreferences) -> PlayOutcome {
        let volume = prefs.volume;
        match self.resolve_asset(key, prefs) {
            Some(asset) => {
                match self.backend.play_stream(asset, volume) {
                    Ok(()) => return PlayOutcome::Played(PlaybackStage::Stream),
                    Err(e) => tracing::debug!(sound = key.as_str(), error = %e, "Streamed playback failed"),
                }
                match self.backend.play_buffered(asset, volume) {
                    Ok(()) => return PlayOutcome::Played(PlaybackStage::Buffered),
                    Err(e) => tracing::debug!(sound = key.as_str(), error = %e, "Buffered playback failed"),
                }
            }
            None => {
                tracing::debug!(sound = key.as_str(), "{}", SoundError::MissingAsset(key.as_str().into()));
            }
        }
        match self.backend.play_tones(key.fallback_tones(), volume) {
            Ok(()) => PlayOutcome::Played(PlaybackStage::Tone),
            Err(e) => {
                tracing::debug!(sound = key.as_str(), error = %e, "Tone synthesis failed");
                PlayOutcome::Failed
            }
        }
    }

    fn resolve_asset<'a>(&'a self, key: SoundKey, prefs: &SoundPreferences) -> Option<&'a Path> {
        if key == SoundKey::Notification {
            if let Some(selected) = prefs.selected_sound.as_deref() {
                if let Some(path) = self.library.get(selected) {
                    return Some(path);
                }
            }
        }
        self.library.get(key.as_str())
    }
}

fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        return 0.0;
    }
    volume.clamp(0.0, 1.0)
}
