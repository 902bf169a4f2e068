use std::path::Path;
use std::time::Duration;

/// One pitch of a synthesized fallback cue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
    pub frequency_hz: f32,
    pub duration: Duration,
}

impl Tone {
    pub const fn new(frequency_hz: f32, millis: u64) -> Self {
        Self {
            frequency_hz,
            duration: Duration::from_millis(millis),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SoundError {
    #[error("audio output unavailable: {0}")]
    Unavailable(String),

    #[error("no sound asset for '{0}'")]
    MissingAsset(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("playback failed: {0}")]
    Playback(String),
}

/// Audio output used by [`super::SoundManager`].
///
/// The three methods are the three fallback stages; the manager calls the
/// next one only when the previous returned an error. Implementations
/// must not block until the sound has finished.
pub trait SoundBackend: Send + Sync {
    /// Stream the asset straight from disk.
    fn play_stream(&self, asset: &Path, volume: f32) -> Result<(), SoundError>;

    /// Read and decode the whole asset in memory, then play the buffer.
    fn play_buffered(&self, asset: &Path, volume: f32) -> Result<(), SoundError>;

    /// Synthesize a short sequence of pitches.
    fn play_tones(&self, tones: &[Tone], volume: f32) -> Result<(), SoundError>;
}

/// Backend for builds without an audio output.
pub struct NullSoundBackend;

impl SoundBackend for NullSoundBackend {
    fn play_stream(&self, _asset: &Path, _volume: f32) -> Result<(), SoundError> {
        Err(SoundError::Unavailable("built without audio support".into()))
    }

    fn play_buffered(&self, _asset: &Path, _volume: f32) -> Result<(), SoundError> {
        Err(SoundError::Unavailable("built without audio support".into()))
    }

    fn play_tones(&self, _tones: &[Tone], _volume: f32) -> Result<(), SoundError> {
        Err(SoundError::Unavailable("built without audio support".into()))
    }
}
