// Recorded-audio playback for practice. The cpal callback owns the decoded
// buffer and a fractional read position; everything else talks to it through
// a command channel and a few published atomics, so setters never block.

use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use anyhow::Context;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender, bounded};

pub mod driver;
pub mod loader;
pub mod practice;

use driver::LoopDriver;
use practice::PracticeConfig;

pub const MIN_SPEED: f32 = 0.5;
pub const MAX_SPEED: f32 = 1.25;

const PITCH_OK: &str = "Pitch correction active";
const PITCH_DEGRADED: &str = "Pitch correction unavailable on this device";

/// Observable playback state. Position, duration and the playing flag are
/// merged in from the callback's atomics when read through the engine.
#[derive(Clone, Debug)]
pub struct PlaybackState {
    pub is_playing: bool,
    pub position_ms: u64,
    pub duration_ms: u64,
    pub speed: f32,
    pub next_stepped_speed: Option<f32>,
    pub pitch_status: String,
    pub last_error: Option<String>,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            is_playing: false,
            position_ms: 0,
            duration_ms: 0,
            speed: 1.0,
            next_stepped_speed: None,
            pitch_status: PITCH_OK.to_string(),
            last_error: None,
        }
    }
}

/// The output device cannot change speed without shifting pitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PitchUnsupported;

impl fmt::Display for PitchUnsupported {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pitch-preserving speed change not supported")
    }
}

impl std::error::Error for PitchUnsupported {}

enum PlayerCmd {
    Load { samples: Arc<Vec<f32>>, sample_rate: u32 },
    Play,
    Pause,
    SeekMs(u64),
    SetRate(f32),
}

#[derive(Default)]
struct PlayerShared {
    position_ms: AtomicU64,
    duration_ms: AtomicU64,
    playing: AtomicBool,
}

/// Cheap cloneable handle onto the player; the loop driver thread holds one.
#[derive(Clone)]
pub struct PlaybackHandle {
    tx: Sender<PlayerCmd>,
    shared: Arc<PlayerShared>,
    state: Arc<RwLock<PlaybackState>>,
}

impl PlaybackHandle {
    pub fn is_playing(&self) -> bool {
        self.shared.playing.load(Ordering::SeqCst)
    }

    pub fn position_ms(&self) -> u64 {
        self.shared.position_ms.load(Ordering::SeqCst)
    }

    pub fn duration_ms(&self) -> u64 {
        self.shared.duration_ms.load(Ordering::SeqCst)
    }

    /// Preferred path for speed changes. This player resamples rather than
    /// time-stretching, so the capability is reported as missing and the
    /// caller falls back to set_speed_resampled.
    pub fn try_set_speed_pitch_preserving(&self, _speed: f32) -> Result<(), PitchUnsupported> {
        Err(PitchUnsupported)
    }

    /// Plain varispeed: pitch drifts with the rate.
    pub fn set_speed_resampled(&self, speed: f32) {
        if self.tx.try_send(PlayerCmd::SetRate(speed)).is_err() {
            tracing::warn!("speed change dropped, player command queue full");
        }
    }

    /// Best-effort seek; a failed send is abandoned and the driver's next
    /// tick recovers.
    pub fn seek_ms(&self, position_ms: u64) {
        let clamped = position_ms.min(self.duration_ms());
        if self.tx.try_send(PlayerCmd::SeekMs(clamped)).is_err() {
            tracing::warn!("seek to {clamped}ms dropped, player command queue full");
            return;
        }
        self.shared.position_ms.store(clamped, Ordering::SeqCst);
    }

    fn publish_position(&self, position_ms: u64) {
        self.state.write().unwrap().position_ms = position_ms;
    }

    fn publish_next_speed(&self, next: Option<f32>) {
        self.state.write().unwrap().next_stepped_speed = next;
    }

    /// Apply a speed: try the pitch-preserving path, fall back to plain
    /// resampling, and keep a sticky advisory when the fallback kicks in.
    fn apply_speed(&self, pitch_degraded: &AtomicBool, speed: f32) {
        let speed = speed.clamp(MIN_SPEED, MAX_SPEED);
        self.state.write().unwrap().speed = speed;
        match self.try_set_speed_pitch_preserving(speed) {
            Ok(()) => {
                if pitch_degraded.swap(false, Ordering::SeqCst) {
                    self.state.write().unwrap().pitch_status = PITCH_OK.to_string();
                }
            }
            Err(PitchUnsupported) => {
                self.set_speed_resampled(speed);
                if !pitch_degraded.swap(true, Ordering::SeqCst) {
                    tracing::warn!("falling back to resampled speed change, pitch will drift");
                    self.state.write().unwrap().pitch_status = PITCH_DEGRADED.to_string();
                }
            }
        }
    }
}

pub struct PlaybackEngine {
    handle: PlaybackHandle,
    driver: LoopDriver,
    _stream: cpal::Stream,
}

impl PlaybackEngine {
    pub fn start() -> anyhow::Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .context("no default output device")?;
        let config = device
            .default_output_config()
            .context("no default output config")?;

        let device_rate = config.sample_rate();
        let channels = config.channels() as usize;

        let (tx, rx) = bounded::<PlayerCmd>(64);
        let shared = Arc::new(PlayerShared::default());
        let state = Arc::new(RwLock::new(PlaybackState::default()));

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => build_playback_stream_f32(
                &device,
                &config.into(),
                rx,
                Arc::clone(&shared),
                device_rate,
                channels,
            )?,
            _ => anyhow::bail!("unsupported sample format (only f32 supported for now)"),
        };
        stream.play().context("failed to play playback stream")?;

        let handle = PlaybackHandle { tx, shared, state };
        let driver = LoopDriver::spawn(handle.clone());

        Ok(Self {
            handle,
            driver,
            _stream: stream,
        })
    }

    /// Load a file and reset every derived state: speed, stepped mode,
    /// errors, and the sticky pitch advisory.
    pub fn load(&mut self, path: &Path) -> anyhow::Result<()> {
        self.driver.disable_stepped();
        self.driver.reset_pitch_advisory();
        *self.handle.state.write().unwrap() = PlaybackState::default();
        self.handle.shared.playing.store(false, Ordering::SeqCst);
        self.handle.shared.position_ms.store(0, Ordering::SeqCst);
        self.handle.shared.duration_ms.store(0, Ordering::SeqCst);

        let audio = match loader::load_wav(path) {
            Ok(audio) => audio,
            Err(err) => {
                tracing::error!("failed to load {}: {err:#}", path.display());
                self.handle.state.write().unwrap().last_error =
                    Some(format!("Unable to load audio file. {err}"));
                return Err(err);
            }
        };

        self.handle
            .shared
            .duration_ms
            .store(audio.duration_ms(), Ordering::SeqCst);
        let cmd = PlayerCmd::Load {
            samples: Arc::new(audio.samples),
            sample_rate: audio.sample_rate,
        };
        if self.handle.tx.try_send(cmd).is_err() {
            tracing::warn!("load dropped, player command queue full");
        }
        self.handle
            .apply_speed(self.driver.pitch_advisory(), 1.0);
        Ok(())
    }

    pub fn play(&self) {
        if self.handle.duration_ms() == 0 {
            return;
        }
        if self.handle.tx.try_send(PlayerCmd::Play).is_ok() {
            self.handle.shared.playing.store(true, Ordering::SeqCst);
            self.handle.state.write().unwrap().is_playing = true;
        }
    }

    pub fn pause(&self) {
        if self.handle.tx.try_send(PlayerCmd::Pause).is_ok() {
            self.handle.shared.playing.store(false, Ordering::SeqCst);
            self.handle.state.write().unwrap().is_playing = false;
        }
    }

    pub fn seek_to(&self, position_ms: u64) {
        self.handle.seek_ms(position_ms);
        self.handle.publish_position(self.handle.position_ms());
    }

    /// Manual speed control leaves stepped mode.
    pub fn set_speed(&self, speed: f32) {
        self.driver.disable_stepped();
        self.handle
            .apply_speed(self.driver.pitch_advisory(), speed);
    }

    pub fn enable_stepped_mode(&self, config: PracticeConfig) {
        self.driver.enable_stepped(config);
    }

    pub fn reset_stepped_mode(&self) {
        self.driver.reset_stepped();
    }

    pub fn disable_stepped_mode(&self) {
        self.driver.disable_stepped();
    }

    pub fn state(&self) -> PlaybackState {
        let mut state = self.handle.state.read().unwrap().clone();
        state.position_ms = self.handle.position_ms();
        state.duration_ms = self.handle.duration_ms();
        state.is_playing = self.handle.is_playing();
        state
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.driver.stop();
    }
}

// ── Callback-side player ─────────────────────────────────────────

struct PlayerCore {
    device_rate: f64,
    samples: Arc<Vec<f32>>,
    file_rate: f64,
    pos: f64,
    speed: f64,
    playing: bool,
    shared: Arc<PlayerShared>,
}

impl PlayerCore {
    fn new(device_rate: f64, shared: Arc<PlayerShared>) -> Self {
        Self {
            device_rate,
            samples: Arc::new(Vec::new()),
            file_rate: device_rate,
            pos: 0.0,
            speed: 1.0,
            playing: false,
            shared,
        }
    }

    fn handle_cmd(&mut self, cmd: PlayerCmd) {
        match cmd {
            PlayerCmd::Load {
                samples,
                sample_rate,
            } => {
                self.samples = samples;
                self.file_rate = (sample_rate.max(1)) as f64;
                self.pos = 0.0;
                self.playing = false;
                self.shared.playing.store(false, Ordering::SeqCst);
                self.publish_position();
            }
            PlayerCmd::Play => {
                if self.samples.is_empty() {
                    // nothing loaded: undo the optimistic flag from play()
                    self.playing = false;
                    self.shared.playing.store(false, Ordering::SeqCst);
                } else {
                    if self.pos + 1.0 >= self.samples.len() as f64 {
                        self.pos = 0.0; // restart after natural completion
                    }
                    self.playing = true;
                    self.shared.playing.store(true, Ordering::SeqCst);
                }
            }
            PlayerCmd::Pause => {
                self.playing = false;
                self.shared.playing.store(false, Ordering::SeqCst);
            }
            PlayerCmd::SeekMs(ms) => {
                let frame = ms as f64 / 1000.0 * self.file_rate;
                let limit = (self.samples.len().saturating_sub(1)) as f64;
                self.pos = frame.clamp(0.0, limit);
                self.publish_position();
            }
            PlayerCmd::SetRate(speed) => {
                self.speed = speed.clamp(MIN_SPEED, MAX_SPEED) as f64;
            }
        }
    }

    fn next_sample(&mut self) -> f32 {
        if !self.playing || self.samples.len() < 2 {
            return 0.0;
        }
        let idx = self.pos as usize;
        if idx + 1 >= self.samples.len() {
            self.playing = false;
            self.shared.playing.store(false, Ordering::SeqCst);
            self.publish_position();
            return 0.0;
        }
        let frac = (self.pos - idx as f64) as f32;
        let a = self.samples[idx];
        let b = self.samples[idx + 1];
        let sample = a * (1.0 - frac) + b * frac;

        self.pos += self.speed * self.file_rate / self.device_rate;
        sample
    }

    fn publish_position(&self) {
        let ms = (self.pos / self.file_rate * 1000.0) as u64;
        self.shared.position_ms.store(ms, Ordering::SeqCst);
    }
}

fn build_playback_stream_f32(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    rx: Receiver<PlayerCmd>,
    shared: Arc<PlayerShared>,
    device_rate: u32,
    channels: usize,
) -> anyhow::Result<cpal::Stream> {
    let mut core = PlayerCore::new(device_rate.max(1) as f64, shared);

    let err_fn = |err| tracing::error!("playback stream error: {err}");

    let stream = device.build_output_stream(
        config,
        move |data: &mut [f32], _info| {
            while let Ok(cmd) = rx.try_recv() {
                core.handle_cmd(cmd);
            }
            for frame in data.chunks_mut(channels) {
                let sample = core.next_sample();
                for out in frame.iter_mut() {
                    *out = sample;
                }
            }
            core.publish_position();
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}
