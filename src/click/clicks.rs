// Click wavelet synthesis and mixing. The three wavelets are generated once
// per stream; per-step buffers are silence plus mixed-in clicks.

use crate::pattern::StepKind;
use crate::timing;

/// The three fixed wavelets: downbeat, ordinary beat, and strum cue.
pub struct ClickBank {
    pub downbeat: Vec<i16>,
    pub beat: Vec<i16>,
    pub cue: Vec<i16>,
}

impl ClickBank {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            downbeat: generate_click(sample_rate, 1800.0, 20, 0.75),
            beat: generate_click(sample_rate, 1200.0, 16, 0.6),
            cue: generate_click(sample_rate, 700.0, 10, 0.35),
        }
    }
}

// decaying sine, quantized to i16
fn generate_click(sample_rate: u32, freq_hz: f64, duration_ms: u32, amp: f64) -> Vec<i16> {
    let len = ((duration_ms as f64 / 1000.0) * sample_rate as f64) as usize;
    let len = len.max(1);
    (0..len)
        .map(|i| {
            let t = i as f64 / sample_rate as f64;
            let envelope = 1.0 - i as f64 / len as f64;
            let value = (2.0 * std::f64::consts::PI * freq_hz * t).sin() * envelope * amp;
            (value * i16::MAX as f64) as i16
        })
        .collect()
}

/// Additively mix a wavelet into the head of a buffer, saturating instead of
/// wrapping so coinciding clicks cannot overflow.
pub fn mix_in(target: &mut [i16], wavelet: &[i16]) {
    let len = target.len().min(wavelet.len());
    for i in 0..len {
        let mixed = target[i] as i32 + wavelet[i] as i32;
        target[i] = mixed.clamp(i16::MIN as i32, i16::MAX as i32) as i16;
    }
}

/// Render one step's worth of PCM: silence, a beat or downbeat click on beat
/// boundaries, and a cue click for every non-rest strum.
pub fn build_step_pcm(
    bank: &ClickBank,
    frames: usize,
    kind: StepKind,
    step_in_bar: usize,
    steps_per_bar: usize,
    beats_per_bar: usize,
) -> Vec<i16> {
    let mut out = vec![0i16; frames];

    if timing::is_beat_boundary(step_in_bar, steps_per_bar, beats_per_bar) {
        if timing::is_downbeat(step_in_bar) {
            mix_in(&mut out, &bank.downbeat);
        } else {
            mix_in(&mut out, &bank.beat);
        }
    }

    if kind != StepKind::Rest {
        mix_in(&mut out, &bank.cue);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wavelets_decay_toward_silence() {
        let bank = ClickBank::new(44_100);
        for wavelet in [&bank.downbeat, &bank.beat, &bank.cue] {
            assert!(!wavelet.is_empty());
            let head: i32 = wavelet[..8].iter().map(|s| (*s as i32).abs()).sum();
            let tail: i32 = wavelet[wavelet.len() - 8..]
                .iter()
                .map(|s| (*s as i32).abs())
                .sum();
            assert!(head > tail, "envelope did not decay");
        }
    }

    #[test]
    fn mixing_saturates_instead_of_wrapping() {
        let mut buffer = vec![i16::MAX - 10; 8];
        let loud = vec![i16::MAX; 8];
        mix_in(&mut buffer, &loud);
        assert!(buffer.iter().all(|&s| s == i16::MAX));

        let mut buffer = vec![i16::MIN + 10; 8];
        let quiet = vec![i16::MIN; 8];
        mix_in(&mut buffer, &quiet);
        assert!(buffer.iter().all(|&s| s == i16::MIN));
    }

    #[test]
    fn coinciding_downbeat_and_cue_stay_in_range() {
        let bank = ClickBank::new(44_100);
        // downbeat step of a non-rest strum mixes two wavelets on top of
        // each other; every sample must stay in i16 range by construction
        let pcm = build_step_pcm(&bank, 4_096, StepKind::Down, 0, 8, 4);
        assert_eq!(pcm.len(), 4_096);
        assert!(pcm.iter().any(|&s| s != 0));
    }

    #[test]
    fn rest_steps_on_offbeats_are_silent() {
        let bank = ClickBank::new(44_100);
        let pcm = build_step_pcm(&bank, 1_024, StepKind::Rest, 1, 8, 4);
        assert!(pcm.iter().all(|&s| s == 0));
    }

    #[test]
    fn beat_boundary_gets_the_beat_click_not_the_downbeat() {
        let bank = ClickBank::new(44_100);
        let pcm = build_step_pcm(&bank, 4_096, StepKind::Rest, 2, 8, 4);
        assert_eq!(&pcm[..bank.beat.len()], bank.beat.as_slice());
    }
}
