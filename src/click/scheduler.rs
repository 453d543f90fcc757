// Click-track scheduler. One worker thread renders a step of audio at the
// current tempo, blocks on the sink write, then advances its bar/step/ramp
// counters. Configuration setters only write shared state; the loop picks
// new values up on its next step, never mid-buffer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::thread;

use crate::pattern::PlaybackBar;
use crate::ramp::{self, RampConfig, RampProgress};
use crate::timing;

use super::clicks::{self, ClickBank};
use super::{ClickSink, SinkWrite, start_click_output};

pub const MIN_BPM: u32 = 40;
pub const MAX_BPM: u32 = 160;

/// Observable scheduler position, replaced wholesale after every step.
#[derive(Clone, Debug, Default)]
pub struct ClickState {
    pub is_playing: bool,
    pub bar_index: usize,
    pub step_index: usize,
    pub chord: String,
    pub current_bpm: u32,
    pub ramp: RampProgress,
}

#[derive(Clone, Copy, Debug)]
struct SharedConfig {
    bpm: u32,
    ramp: RampConfig,
}

pub struct ClickEngine {
    state: Arc<RwLock<ClickState>>,
    config: Arc<RwLock<SharedConfig>>,
    run: Arc<AtomicBool>,
    worker: Option<thread::JoinHandle<()>>,
    stream: Option<cpal::Stream>,
}

impl ClickEngine {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(ClickState::default())),
            config: Arc::new(RwLock::new(SharedConfig {
                bpm: 80,
                ramp: RampConfig::default(),
            })),
            run: Arc::new(AtomicBool::new(false)),
            worker: None,
            stream: None,
        }
    }

    /// Start the scheduling loop over a looping bar sequence. An empty
    /// sequence is a silent no-op.
    pub fn start(
        &mut self,
        initial_bpm: u32,
        sequence: Vec<PlaybackBar>,
        ramp: RampConfig,
    ) -> anyhow::Result<()> {
        if sequence.is_empty() || sequence.iter().any(|bar| bar.pattern.steps.is_empty()) {
            return Ok(());
        }
        self.stop();

        let ramp = clamp_ramp(ramp);
        let bpm = if ramp.enabled {
            ramp.start_bpm
        } else {
            initial_bpm.clamp(MIN_BPM, MAX_BPM)
        };
        *self.config.write().unwrap() = SharedConfig { bpm, ramp };

        let output = start_click_output()?;
        let sample_rate = output.sample_rate;
        let sink = output.sink;
        self.stream = Some(output.stream);

        {
            let mut state = self.state.write().unwrap();
            *state = ClickState {
                is_playing: true,
                chord: sequence[0].chord.clone(),
                current_bpm: bpm,
                ..ClickState::default()
            };
        }

        self.run.store(true, Ordering::SeqCst);
        let run = Arc::clone(&self.run);
        let config = Arc::clone(&self.config);
        let state = Arc::clone(&self.state);
        self.worker = Some(thread::spawn(move || {
            run_scheduler_loop(sink, sample_rate, sequence, run, config, state);
        }));
        Ok(())
    }

    /// Cooperative stop: flag the loop, let the in-flight write finish,
    /// then release the stream. Sink drain errors do not surface.
    pub fn stop(&mut self) {
        self.run.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        self.stream = None;
        self.state.write().unwrap().is_playing = false;
    }

    pub fn set_bpm(&self, bpm: u32) {
        let clamped = bpm.clamp(MIN_BPM, MAX_BPM);
        self.config.write().unwrap().bpm = clamped;
        self.state.write().unwrap().current_bpm = clamped;
    }

    pub fn set_ramp(&self, ramp: RampConfig) {
        let ramp = clamp_ramp(ramp);
        let mut config = self.config.write().unwrap();
        config.ramp = ramp;
        if ramp.enabled {
            config.bpm = ramp.start_bpm;
            self.state.write().unwrap().current_bpm = config.bpm;
        }
    }

    pub fn is_playing(&self) -> bool {
        self.state.read().unwrap().is_playing
    }

    pub fn state(&self) -> ClickState {
        self.state.read().unwrap().clone()
    }
}

impl Drop for ClickEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Ramp settings arrive from an editable settings file; force both ends of
/// the ramp into the tempo range the scheduler supports.
fn clamp_ramp(mut ramp: RampConfig) -> RampConfig {
    ramp.start_bpm = ramp.start_bpm.clamp(MIN_BPM, MAX_BPM);
    ramp.end_bpm = ramp.end_bpm.clamp(MIN_BPM, MAX_BPM);
    ramp
}

fn run_scheduler_loop(
    sink: ClickSink,
    sample_rate: u32,
    bars: Vec<PlaybackBar>,
    run: Arc<AtomicBool>,
    config: Arc<RwLock<SharedConfig>>,
    state: Arc<RwLock<ClickState>>,
) {
    let bank = ClickBank::new(sample_rate);

    let mut bar_index = 0usize;
    let mut step_in_bar = 0usize;
    let mut pattern_step = 0usize;
    let mut bars_since_increment = 0u32;

    while run.load(Ordering::SeqCst) {
        let (bpm, ramp) = {
            let config = config.read().unwrap();
            (config.bpm, config.ramp)
        };

        let bar = &bars[bar_index % bars.len()];
        let pattern = &bar.pattern;
        let steps_per_bar = ((bar.beats_per_bar * pattern.subdivision / 4) as usize).max(1);
        let step = pattern.steps[pattern_step % pattern.steps.len()];

        {
            let mut state = state.write().unwrap();
            state.bar_index = bar_index % bars.len();
            state.step_index = pattern_step % pattern.steps.len();
            state.chord = bar.chord.clone();
            state.current_bpm = bpm;
        }

        let frames = match timing::frames_per_step(sample_rate, bpm, pattern.subdivision) {
            Ok(frames) => frames,
            Err(err) => {
                tracing::warn!("stopping click track on bad step timing: {err}");
                break;
            }
        };

        let pcm = clicks::build_step_pcm(
            &bank,
            frames,
            step.kind,
            step_in_bar,
            steps_per_bar,
            bar.beats_per_bar as usize,
        );

        match sink.write(pcm) {
            SinkWrite::Accepted => {}
            SinkWrite::Stalled => {
                tracing::warn!("click sink stalled, retrying");
                continue;
            }
            SinkWrite::Closed => break,
        }

        step_in_bar += 1;
        pattern_step += 1;

        if step_in_bar >= steps_per_bar {
            step_in_bar = 0;
            pattern_step = 0;
            bar_index = (bar_index + 1) % bars.len();

            let (new_bpm, new_since, progress) = ramp::advance(&ramp, bars_since_increment, bpm);
            bars_since_increment = new_since;
            if new_bpm != bpm {
                config.write().unwrap().bpm = new_bpm;
            }
            let mut state = state.write().unwrap();
            state.current_bpm = new_bpm;
            state.ramp = progress;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramp_bounds_from_settings_are_forced_into_range() {
        let wild = RampConfig {
            enabled: true,
            start_bpm: 10,
            end_bpm: 999,
            increment: 2,
            bars_per_increment: 4,
        };
        let clamped = clamp_ramp(wild);
        assert_eq!(clamped.start_bpm, MIN_BPM);
        assert_eq!(clamped.end_bpm, MAX_BPM);

        // a stepped ramp from the clamped bounds stays inside the range
        let (bpm, _, _) = ramp::advance(&clamped, clamped.bars_per_increment - 1, MAX_BPM);
        assert!(bpm <= MAX_BPM);
    }

    #[test]
    fn in_range_ramps_pass_through_unchanged() {
        let ramp = RampConfig {
            enabled: true,
            start_bpm: 60,
            end_bpm: 120,
            increment: 2,
            bars_per_increment: 4,
        };
        let clamped = clamp_ramp(ramp);
        assert_eq!(clamped.start_bpm, 60);
        assert_eq!(clamped.end_bpm, 120);
    }
}
