// Loop-boundary driver. A single polling thread watches the playback
// position on a ~100ms cadence; when a practice loop's end is reached it
// seeks back to the start, advances the stepped-speed state, and applies the
// resulting speed. The sleep between polls is the thread's only suspension
// point, and stopping is cooperative via the run flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::Duration;

use super::PlaybackHandle;
use super::practice::{self, PracticeConfig, PracticeState};

const POLL_INTERVAL: Duration = Duration::from_millis(100);

#[derive(Clone, Copy, Debug)]
struct SteppedMode {
    config: PracticeConfig,
    state: PracticeState,
}

pub struct LoopDriver {
    handle: PlaybackHandle,
    stepped: Arc<RwLock<Option<SteppedMode>>>,
    pitch_degraded: Arc<AtomicBool>,
    run: Arc<AtomicBool>,
    worker: Option<thread::JoinHandle<()>>,
}

impl LoopDriver {
    pub fn spawn(handle: PlaybackHandle) -> Self {
        let stepped = Arc::new(RwLock::new(None));
        let pitch_degraded = Arc::new(AtomicBool::new(false));
        let run = Arc::new(AtomicBool::new(true));

        let worker = {
            let handle = handle.clone();
            let stepped = Arc::clone(&stepped);
            let pitch_degraded = Arc::clone(&pitch_degraded);
            let run = Arc::clone(&run);
            thread::spawn(move || run_poll_loop(handle, stepped, pitch_degraded, run))
        };

        Self {
            handle,
            stepped,
            pitch_degraded,
            run,
            worker: Some(worker),
        }
    }

    pub fn stop(&mut self) {
        self.run.store(false, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }

    pub fn enable_stepped(&self, config: PracticeConfig) {
        let state = practice::initial_state(&config);
        *self.stepped.write().unwrap() = Some(SteppedMode { config, state });
        self.handle.publish_next_speed(Some(state.next_speed));
        self.handle
            .apply_speed(&self.pitch_degraded, state.current_speed);
    }

    pub fn reset_stepped(&self) {
        let mut slot = self.stepped.write().unwrap();
        let Some(mode) = slot.as_mut() else {
            return;
        };
        mode.state = practice::reset(&mode.config);
        let state = mode.state;
        drop(slot);
        self.handle.publish_next_speed(Some(state.next_speed));
        self.handle
            .apply_speed(&self.pitch_degraded, state.current_speed);
    }

    /// Clears stored config and state; safe to call repeatedly.
    pub fn disable_stepped(&self) {
        *self.stepped.write().unwrap() = None;
        self.handle.publish_next_speed(None);
    }

    pub fn reset_pitch_advisory(&self) {
        self.pitch_degraded.store(false, Ordering::SeqCst);
    }

    pub(super) fn pitch_advisory(&self) -> &AtomicBool {
        &self.pitch_degraded
    }
}

fn run_poll_loop(
    handle: PlaybackHandle,
    stepped: Arc<RwLock<Option<SteppedMode>>>,
    pitch_degraded: Arc<AtomicBool>,
    run: Arc<AtomicBool>,
) {
    while run.load(Ordering::SeqCst) {
        thread::sleep(POLL_INTERVAL);
        if !handle.is_playing() {
            continue;
        }

        let position = handle.position_ms();
        handle.publish_position(position);

        // the whole boundary transaction runs under one write guard so a
        // concurrent disable/enable cannot be clobbered by a write-back
        let mut slot = stepped.write().unwrap();
        let Some((loop_start, next)) = advance_on_boundary(&mut slot, position) else {
            continue;
        };

        handle.seek_ms(loop_start);
        handle.publish_position(loop_start);
        handle.publish_next_speed(Some(next.next_speed));
        handle.apply_speed(&pitch_degraded, next.current_speed);
    }
}

/// Advance the stepped state in place when the loop end has been crossed;
/// returns the seek target and the advanced state, or None when no loop
/// applies (including a cleared slot).
fn advance_on_boundary(
    slot: &mut Option<SteppedMode>,
    position_ms: u64,
) -> Option<(u64, PracticeState)> {
    let mode = slot.as_mut()?;
    let loop_start = loop_seek_target(&mode.config, position_ms)?;
    mode.state = practice::on_loop_boundary(&mode.config, mode.state);
    Some((loop_start, mode.state))
}

/// Where to seek when the loop end has been crossed, or None when no loop
/// applies at this position.
fn loop_seek_target(config: &PracticeConfig, position_ms: u64) -> Option<u64> {
    if !config.loop_enabled {
        return None;
    }
    let start = config.loop_start_ms?;
    let end = config.loop_end_ms?;
    (position_ms >= end).then_some(start)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn looped(start: u64, end: u64) -> PracticeConfig {
        PracticeConfig {
            loop_enabled: true,
            loop_start_ms: Some(start),
            loop_end_ms: Some(end),
            ..PracticeConfig::default()
        }
    }

    #[test]
    fn seeks_back_only_at_or_past_the_loop_end() {
        let config = looped(1_000, 5_000);
        assert_eq!(loop_seek_target(&config, 0), None);
        assert_eq!(loop_seek_target(&config, 4_999), None);
        assert_eq!(loop_seek_target(&config, 5_000), Some(1_000));
        assert_eq!(loop_seek_target(&config, 9_000), Some(1_000));
    }

    #[test]
    fn cleared_mode_is_never_revived_by_a_boundary() {
        let mut slot: Option<SteppedMode> = None;
        assert!(advance_on_boundary(&mut slot, 9_000).is_none());
        assert!(slot.is_none());
    }

    #[test]
    fn boundary_advances_the_stored_state_in_place() {
        let config = looped(1_000, 5_000);
        let mut slot = Some(SteppedMode {
            config,
            state: practice::initial_state(&config),
        });

        let (start, next) = advance_on_boundary(&mut slot, 5_000).unwrap();
        assert_eq!(start, 1_000);
        assert_eq!(slot.unwrap().state.loops_at_current_speed, next.loops_at_current_speed);

        // before the boundary nothing is touched
        let mut slot = Some(SteppedMode {
            config,
            state: practice::initial_state(&config),
        });
        assert!(advance_on_boundary(&mut slot, 4_000).is_none());
        assert_eq!(slot.unwrap().state.loops_at_current_speed, 0);
    }

    #[test]
    fn disabled_or_incomplete_loops_never_seek() {
        let mut config = looped(1_000, 5_000);
        config.loop_enabled = false;
        assert_eq!(loop_seek_target(&config, 9_000), None);

        let mut config = looped(1_000, 5_000);
        config.loop_end_ms = None;
        assert_eq!(loop_seek_target(&config, 9_000), None);
    }
}
