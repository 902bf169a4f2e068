//! `rodio` output on a dedicated audio thread.
//!
//! `OutputStream` is not `Send`, so the stream lives on its own thread and
//! jobs are handed over through a channel. Each job replies as soon as the
//! sound is queued; sinks are detached and play to completion on their own.

use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::{Path, PathBuf};
use std::sync::mpsc;

use rodio::source::{SineWave, Source};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};

use super::backend::{SoundBackend, SoundError, Tone};

const TONE_GAP_MS: u64 = 40;

type Reply = mpsc::Sender<Result<(), SoundError>>;

enum Job {
    Stream(PathBuf, f32, Reply),
    Buffered(PathBuf, f32, Reply),
    Tones(Vec<Tone>, f32, Reply),
}

pub struct RodioBackend {
    jobs: mpsc::Sender<Job>,
}

impl RodioBackend {
    /// Open the default output device on a new audio thread.
    pub fn spawn() -> Result<Self, SoundError> {
        let (jobs_tx, jobs_rx) = mpsc::channel::<Job>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), SoundError>>();

        std::thread::Builder::new()
            .name("inkbridge-audio".into())
            .spawn(move || {
                let (_stream, handle) = match OutputStream::try_default() {
                    Ok(pair) => pair,
                    Err(e) => {
                        let _ = ready_tx.send(Err(SoundError::Unavailable(e.to_string())));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                for job in jobs_rx {
                    run_job(&handle, job);
                }
                tracing::debug!("Audio thread stopped");
            })?;

        ready_rx
            .recv()
            .map_err(|_| SoundError::Unavailable("audio thread exited".into()))??;
        tracing::info!("Audio output opened");
        Ok(Self { jobs: jobs_tx })
    }

    fn submit(&self, make: impl FnOnce(Reply) -> Job) -> Result<(), SoundError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.jobs
            .send(make(reply_tx))
            .map_err(|_| SoundError::Unavailable("audio thread stopped".into()))?;
        reply_rx
            .recv()
            .map_err(|_| SoundError::Unavailable("audio thread stopped".into()))?
    }
}

impl SoundBackend for RodioBackend {
    fn play_stream(&self, asset: &Path, volume: f32) -> Result<(), SoundError> {
        let asset = asset.to_path_buf();
        self.submit(|reply| Job::Stream(asset, volume, reply))
    }

    fn play_buffered(&self, asset: &Path, volume: f32) -> Result<(), SoundError> {
        let asset = asset.to_path_buf();
        self.submit(|reply| Job::Buffered(asset, volume, reply))
    }

    fn play_tones(&self, tones: &[Tone], volume: f32) -> Result<(), SoundError> {
        let tones = tones.to_vec();
        self.submit(|reply| Job::Tones(tones, volume, reply))
    }
}

fn run_job(handle: &OutputStreamHandle, job: Job) {
    let (result, reply) = match job {
        Job::Stream(path, volume, reply) => (play_stream(handle, &path, volume), reply),
        Job::Buffered(path, volume, reply) => (play_buffered(handle, &path, volume), reply),
        Job::Tones(tones, volume, reply) => (play_tones(handle, &tones, volume), reply),
    };
    let _ = reply.send(result);
}

fn new_sink(handle: &OutputStreamHandle, volume: f32) -> Result<Sink, SoundError> {
    let sink = Sink::try_new(handle).map_err(|e| SoundError::Playback(e.to_string()))?;
    sink.set_volume(volume);
    Ok(sink)
}

fn play_stream(handle: &OutputStreamHandle, path: &Path, volume: f32) -> Result<(), SoundError> {
    let file = File::open(path)?;
    let source =
        Decoder::new(BufReader::new(file)).map_err(|e| SoundError::Decode(e.to_string()))?;
    let sink = new_sink(handle, volume)?;
    sink.append(source);
    sink.detach();
    Ok(())
}

fn play_buffered(handle: &OutputStreamHandle, path: &Path, volume: f32) -> Result<(), SoundError> {
    let bytes = std::fs::read(path)?;
    let source = Decoder::new(Cursor::new(bytes))
        .map_err(|e| SoundError::Decode(e.to_string()))?
        .buffered();
    let sink = new_sink(handle, volume)?;
    sink.append(source);
    sink.detach();
    Ok(())
}

fn play_tones(handle: &OutputStreamHandle, tones: &[Tone], volume: f32) -> Result<(), SoundError> {
    let sink = new_sink(handle, volume)?;
    for (i, tone) in tones.iter().enumerate() {
        if i > 0 {
            let gap = SineWave::new(0.0)
                .take_duration(std::time::Duration::from_millis(TONE_GAP_MS))
                .amplify(0.0);
            sink.append(gap);
        }
        let pitch = SineWave::new(tone.frequency_hz)
            .take_duration(tone.duration)
            .amplify(0.3);
        sink.append(pitch);
    }
    sink.detach();
    Ok(())
}
