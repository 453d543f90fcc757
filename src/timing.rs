// Conversions between musical time and sample frames. These are the single
// source of truth for step timing, so they stay pure and integer-exact.

use anyhow::bail;

/// Frames of audio in one pattern step at the given tempo. Subdivision is
/// steps per group of four beats, so 8 = eighth notes, 16 = sixteenths.
pub fn frames_per_step(sample_rate: u32, bpm: u32, subdivision: u32) -> anyhow::Result<usize> {
    if sample_rate == 0 {
        bail!("sample rate must be positive");
    }
    if !(1..=300).contains(&bpm) {
        bail!("bpm must be in 1..=300, got {bpm}");
    }
    if subdivision != 8 && subdivision != 16 {
        bail!("subdivision must be 8 or 16, got {subdivision}");
    }

    let quarter_note_sec = 60.0 / bpm as f64;
    let step_fraction = 4.0 / subdivision as f64;
    let frames = (quarter_note_sec * step_fraction * sample_rate as f64).round() as usize;
    Ok(frames.max(1))
}

/// Whether a step index lands on a beat within the bar.
pub fn is_beat_boundary(step_in_bar: usize, steps_per_bar: usize, beats_per_bar: usize) -> bool {
    if steps_per_bar == 0 || beats_per_bar == 0 {
        return false;
    }
    let steps_per_beat = (steps_per_bar / beats_per_bar).max(1);
    step_in_bar % steps_per_beat == 0
}

pub fn is_downbeat(step_in_bar: usize) -> bool {
    step_in_bar == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eighths_at_120_bpm() {
        assert_eq!(frames_per_step(44_100, 120, 8).unwrap(), 11_025);
    }

    #[test]
    fn sixteenths_at_60_bpm_match_eighths_at_120() {
        // halving the tempo and halving the step duration cancel out
        assert_eq!(frames_per_step(44_100, 60, 16).unwrap(), 11_025);
    }

    #[test]
    fn frames_never_below_one_and_shrink_with_tempo() {
        let mut last = usize::MAX;
        for bpm in 1..=300 {
            for subdivision in [8, 16] {
                let frames = frames_per_step(44_100, bpm, subdivision).unwrap();
                assert!(frames >= 1);
                if subdivision == 16 {
                    assert!(frames <= last, "frames grew at bpm {bpm}");
                    last = frames;
                }
            }
        }
    }

    #[test]
    fn rejects_bad_inputs() {
        assert!(frames_per_step(0, 120, 8).is_err());
        assert!(frames_per_step(44_100, 0, 8).is_err());
        assert!(frames_per_step(44_100, 301, 8).is_err());
        assert!(frames_per_step(44_100, 120, 12).is_err());
    }

    #[test]
    fn beat_boundaries_for_eight_steps_four_beats() {
        for step in 0..8 {
            let expected = step % 2 == 0;
            assert_eq!(is_beat_boundary(step, 8, 4), expected, "step {step}");
        }
        assert!(is_downbeat(0));
        assert!(!is_downbeat(2));
    }

    #[test]
    fn degenerate_bars_have_no_boundaries() {
        assert!(!is_beat_boundary(0, 0, 4));
        assert!(!is_beat_boundary(0, 8, 0));
    }
}
