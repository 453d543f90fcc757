// Config validation with user-facing messages. Surfaced synchronously and
// never retried; the engines assume configs that pass these checks.

use anyhow::bail;

use crate::playback::practice::PracticeConfig;
use crate::playback::{MAX_SPEED, MIN_SPEED};

const MIN_LOOP_MS: u64 = 250;

pub fn validate_song_input(title: &str, audio_file_path: &str) -> anyhow::Result<()> {
    if title.trim().is_empty() {
        bail!("Song title is required");
    }
    if audio_file_path.trim().is_empty() {
        bail!("Audio file path is required");
    }
    Ok(())
}

pub fn validate_practice_config(
    config: &PracticeConfig,
    duration_ms: Option<u64>,
) -> anyhow::Result<()> {
    if !(MIN_SPEED..=MAX_SPEED).contains(&config.start_speed) {
        bail!("Start speed must be between 0.5x and 1.25x");
    }
    if !(MIN_SPEED..=MAX_SPEED).contains(&config.target_speed) {
        bail!("Target speed must be between 0.5x and 1.25x");
    }
    if config.target_speed + 1e-6 < config.start_speed {
        bail!("Target speed cannot be lower than start speed");
    }
    if config.step_size <= 0.0 {
        bail!("Step size must be greater than 0");
    }
    if config.loops_per_speed == 0 {
        bail!("Loops per speed must be at least 1");
    }

    if config.loop_enabled {
        let Some(start) = config.loop_start_ms else {
            bail!("Loop start is required when looping is enabled");
        };
        let Some(end) = config.loop_end_ms else {
            bail!("Loop end is required when looping is enabled");
        };
        if end <= start {
            bail!("Loop end must be greater than loop start");
        }
        if end - start < MIN_LOOP_MS {
            bail!("Loop range is too short (minimum 250ms)");
        }
        if let Some(duration) = duration_ms {
            if end > duration {
                bail!("Loop end cannot exceed song duration");
            }
        }
    }

    Ok(())
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
    fn default_config_passes() {
        assert!(validate_practice_config(&PracticeConfig::default(), None).is_ok());
    }

    #[test]
    fn speed_range_is_enforced() {
        let mut config = PracticeConfig::default();
        config.start_speed = 0.4;
        let err = validate_practice_config(&config, None).unwrap_err();
        assert!(err.to_string().contains("Start speed"));

        let mut config = PracticeConfig::default();
        config.start_speed = 1.0;
        config.target_speed = 0.8;
        let err = validate_practice_config(&config, None).unwrap_err();
        assert!(err.to_string().contains("lower than start"));
    }

    #[test]
    fn loop_range_checks() {
        let err = validate_practice_config(&looped(1_000, 1_100), None).unwrap_err();
        assert!(err.to_string().contains("too short"));

        let err = validate_practice_config(&looped(5_000, 4_000), None).unwrap_err();
        assert!(err.to_string().contains("greater than loop start"));

        let err = validate_practice_config(&looped(0, 10_000), Some(8_000)).unwrap_err();
        assert!(err.to_string().contains("song duration"));

        assert!(validate_practice_config(&looped(0, 10_000), Some(12_000)).is_ok());
    }

    #[test]
    fn missing_loop_bounds_are_rejected_when_looping() {
        let mut config = looped(0, 10_000);
        config.loop_end_ms = None;
        let err = validate_practice_config(&config, None).unwrap_err();
        assert!(err.to_string().contains("Loop end is required"));
    }

    #[test]
    fn song_input_messages() {
        assert!(validate_song_input("Wonderwall", "/a.wav").is_ok());
        assert!(validate_song_input(" ", "/a.wav").is_err());
        assert!(validate_song_input("Wonderwall", "").is_err());
    }
}
