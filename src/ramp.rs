// Bar-gated tempo ramp. The scheduler calls advance() once per completed
// bar, so tempo only ever changes on a bar boundary.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RampConfig {
    pub enabled: bool,
    pub start_bpm: u32,
    pub end_bpm: u32,
    pub increment: u32,
    pub bars_per_increment: u32,
}

impl Default for RampConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            start_bpm: 60,
            end_bpm: 100,
            increment: 2,
            bars_per_increment: 4,
        }
    }
}

/// Observable ramp position, recomputed every bar.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RampProgress {
    pub active: bool,
    pub current_bpm: u32,
    pub bars_until_increment: u32,
}

/// Advance the ramp by one completed bar. Returns the bpm to use from the
/// next step on, the new bars-since-increment counter, and the progress to
/// publish.
pub fn advance(
    config: &RampConfig,
    bars_since_increment: u32,
    current_bpm: u32,
) -> (u32, u32, RampProgress) {
    if !config.enabled {
        let progress = RampProgress {
            active: false,
            current_bpm,
            bars_until_increment: 0,
        };
        return (current_bpm, bars_since_increment, progress);
    }

    let count = bars_since_increment + 1;
    let bars_until = config.bars_per_increment.saturating_sub(count);

    if count >= config.bars_per_increment {
        let bumped = (current_bpm + config.increment).min(config.end_bpm);
        let progress = RampProgress {
            active: true,
            current_bpm: bumped,
            bars_until_increment: bars_until,
        };
        (bumped, 0, progress)
    } else {
        let progress = RampProgress {
            active: true,
            current_bpm,
            bars_until_increment: bars_until,
        };
        (current_bpm, count, progress)
    }
}
