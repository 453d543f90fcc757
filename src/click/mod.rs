// Live click-track output. The scheduler thread synthesizes one step at a
// time and pushes it through a bounded channel into the cpal callback; a
// full channel blocks the producer, which is what keeps synthesis locked to
// real playback time.

use std::time::Duration;

use anyhow::Context;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, SendTimeoutError, Sender, bounded};

pub mod clicks;
mod scheduler;

pub use scheduler::{ClickEngine, ClickState, MAX_BPM, MIN_BPM};

// Four steps in flight buffers well past 200ms of lookahead across the
// supported 40-160 bpm range (the shortest step is ~94ms of audio).
const SINK_DEPTH: usize = 4;

// A healthy stream drains a slot in well under a second; anything longer
// means the device stopped pulling and the producer should re-check its
// run flag instead of hanging.
const WRITE_STALL_TIMEOUT: Duration = Duration::from_secs(2);

pub enum SinkWrite {
    Accepted,
    Stalled,
    Closed,
}

/// Producer end of the click stream. Owned by the scheduler thread.
pub struct ClickSink {
    tx: Sender<Vec<i16>>,
}

impl ClickSink {
    /// Blocking write; this is the scheduler's only suspension point.
    pub fn write(&self, chunk: Vec<i16>) -> SinkWrite {
        match self.tx.send_timeout(chunk, WRITE_STALL_TIMEOUT) {
            Ok(()) => SinkWrite::Accepted,
            Err(SendTimeoutError::Timeout(_)) => SinkWrite::Stalled,
            Err(SendTimeoutError::Disconnected(_)) => SinkWrite::Closed,
        }
    }
}

pub struct ClickOutput {
    pub sink: ClickSink,
    pub sample_rate: u32,
    pub stream: cpal::Stream,
}

pub fn start_click_output() -> anyhow::Result<ClickOutput> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .context("no default output device")?;
    let config = device
        .default_output_config()
        .context("no default output config")?;

    let sample_rate = config.sample_rate();
    let channels = config.channels() as usize;

    let (tx, rx) = bounded::<Vec<i16>>(SINK_DEPTH);

    match config.sample_format() {
        cpal::SampleFormat::F32 => {
            let stream = build_click_stream_f32(&device, &config.into(), rx, channels)?;
            stream.play().context("failed to play click stream")?;
            Ok(ClickOutput {
                sink: ClickSink { tx },
                sample_rate,
                stream,
            })
        }
        _ => anyhow::bail!("unsupported sample format (only f32 supported for now)"),
    }
}

fn build_click_stream_f32(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    rx: Receiver<Vec<i16>>,
    channels: usize,
) -> anyhow::Result<cpal::Stream> {
    let mut pending: Vec<i16> = Vec::new();
    let mut pending_pos = 0usize;

    let err_fn = |err| tracing::error!("click output stream error: {err}");

    let stream = device.build_output_stream(
        config,
        move |data: &mut [f32], _info| {
            for frame in data.chunks_mut(channels) {
                if pending_pos >= pending.len() {
                    match rx.try_recv() {
                        Ok(chunk) => {
                            pending = chunk;
                            pending_pos = 0;
                        }
                        Err(_) => {
                            // starved; play silence until the producer catches up
                            for out in frame.iter_mut() {
                                *out = 0.0;
                            }
                            continue;
                        }
                    }
                }
                let sample = pending.get(pending_pos).copied().unwrap_or(0) as f32 / i16::MAX as f32;
                pending_pos += 1;
                for out in frame.iter_mut() {
                    *out = sample;
                }
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}
