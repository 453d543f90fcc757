// Stepped-speed practice: play a loop at reduced speed, and after a
// configured number of repetitions nudge the speed toward the target.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PracticeConfig {
    pub start_speed: f32,
    pub step_size: f32,
    pub target_speed: f32,
    pub loops_per_speed: u32,
    pub loop_enabled: bool,
    pub loop_start_ms: Option<u64>,
    pub loop_end_ms: Option<u64>,
}

impl Default for PracticeConfig {
    fn default() -> Self {
        Self {
            start_speed: 0.6,
            step_size: 0.05,
            target_speed: 1.0,
            loops_per_speed: 1,
            loop_enabled: false,
            loop_start_ms: None,
            loop_end_ms: None,
        }
    }
}

/// Replaced wholesale at each loop boundary, never mutated in place.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PracticeState {
    pub current_speed: f32,
    pub loops_at_current_speed: u32,
    pub next_speed: f32,
    pub reached_target: bool,
}

pub fn initial_state(config: &PracticeConfig) -> PracticeState {
    let initial = config.start_speed.min(config.target_speed);
    PracticeState {
        current_speed: initial,
        loops_at_current_speed: 0,
        next_speed: (initial + config.step_size).min(config.target_speed),
        reached_target: initial >= config.target_speed,
    }
}

/// One loop repetition completed. Speed only moves once loops_per_speed
/// repetitions are in; after the target is reached only the counter moves.
pub fn on_loop_boundary(config: &PracticeConfig, state: PracticeState) -> PracticeState {
    if state.reached_target {
        return PracticeState {
            loops_at_current_speed: state.loops_at_current_speed + 1,
            ..state
        };
    }

    let loop_count = state.loops_at_current_speed + 1;
    if loop_count < config.loops_per_speed {
        return PracticeState {
            loops_at_current_speed: loop_count,
            ..state
        };
    }

    let advanced = (state.current_speed + config.step_size).min(config.target_speed);
    PracticeState {
        current_speed: advanced,
        loops_at_current_speed: 0,
        next_speed: (advanced + config.step_size).min(config.target_speed),
        reached_target: advanced >= config.target_speed,
    }
}

pub fn reset(config: &PracticeConfig) -> PracticeState {
    initial_state(config)
}
