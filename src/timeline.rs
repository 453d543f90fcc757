// Maps elapsed playback time onto a user-authored chord timeline. The
// timeline is an ordered list of chord segments: an optional non-repeating
// lead-in before the first segment, one first pass over the authored bar
// positions, then the body repeats forever. Bar positions are fractional.

use serde::{Deserialize, Serialize};

const EPSILON: f64 = 1e-6;

/// One authored segment: a chord held for bar_count bars starting at
/// start_bar. Edited elsewhere; the resolver reads these as-is.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BarChordStep {
    pub id: String,
    pub song_id: String,
    pub display_order: u32,
    pub start_bar: f64,
    pub bar_count: f64,
    pub chord_name: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BarLoopPosition {
    /// Monotonic 1-based bar count since playback start.
    pub absolute_bar: f64,
    /// 1-based position within the repeating unit.
    pub loop_bar: f64,
    pub current_step_number: usize,
    pub current_chord: String,
    pub next_chord: String,
    pub bars_until_next_change: f64,
}

/// Resolve elapsed time to a chord and bar position. Returns None when there
/// is nothing to resolve against (no steps, or a degenerate tempo/signature).
pub fn resolve(
    elapsed_ms: u64,
    tempo_bpm: u32,
    time_signature_top: u32,
    steps: &[BarChordStep],
) -> Option<BarLoopPosition> {
    if steps.is_empty() || tempo_bpm == 0 || time_signature_top == 0 {
        return None;
    }

    let bar_ms = (60_000.0 / tempo_bpm as f64 * time_signature_top as f64).max(1.0);
    let mut ordered: Vec<&BarChordStep> = steps.iter().collect();
    ordered.sort_by_key(|s| s.display_order);

    let elapsed_bars = elapsed_ms as f64 / bar_ms;
    let absolute_bar = elapsed_bars + 1.0;

    let first_start = ordered[0].start_bar;
    let repeat_length: f64 = ordered.iter().map(|s| s.bar_count).sum();
    if repeat_length <= EPSILON {
        return None;
    }
    let last = ordered[ordered.len() - 1];
    let first_pass_end = last.start_bar + last.bar_count;

    // lead-in: before the first authored bar, show the upcoming first chord
    if absolute_bar + EPSILON < first_start {
        let next = ordered.get(1).copied().unwrap_or(ordered[0]);
        return Some(BarLoopPosition {
            absolute_bar,
            loop_bar: absolute_bar,
            current_step_number: 1,
            current_chord: ordered[0].chord_name.clone(),
            next_chord: next.chord_name.clone(),
            bars_until_next_change: (first_start - absolute_bar).max(0.0),
        });
    }

    // first pass over the authored start positions
    if absolute_bar + EPSILON < first_pass_end {
        let mut idx = 0;
        for (i, step) in ordered.iter().enumerate() {
            if absolute_bar + EPSILON >= step.start_bar {
                idx = i;
            } else {
                break;
            }
        }
        let step = ordered[idx];
        let next = ordered.get(idx + 1).copied().unwrap_or(ordered[0]);
        let next_change = ordered
            .get(idx + 1)
            .map(|n| n.start_bar)
            .unwrap_or(first_pass_end);
        return Some(BarLoopPosition {
            absolute_bar,
            loop_bar: absolute_bar - first_start + 1.0,
            current_step_number: idx + 1,
            current_chord: step.chord_name.clone(),
            next_chord: next.chord_name.clone(),
            bars_until_next_change: (next_change - absolute_bar).max(0.0),
        });
    }

    // repeating body: walk cumulative bar counts from the first step
    let offset = absolute_bar - first_pass_end;
    let position = ((offset % repeat_length) + repeat_length) % repeat_length;

    let mut located = None;
    let mut acc = 0.0;
    for (i, step) in ordered.iter().enumerate() {
        if position < acc + step.bar_count - EPSILON {
            located = Some((i, acc));
            break;
        }
        acc += step.bar_count;
    }
    // float accumulation can leave the position a hair past the total
    let (idx, start_in_loop) =
        located.unwrap_or((ordered.len() - 1, repeat_length - last.bar_count));

    let step = ordered[idx];
    let next = ordered.get(idx + 1).copied().unwrap_or(ordered[0]);
    let bars_until = start_in_loop + step.bar_count - position;

    Some(BarLoopPosition {
        absolute_bar,
        loop_bar: position + 1.0,
        current_step_number: idx + 1,
        current_chord: step.chord_name.clone(),
        next_chord: next.chord_name.clone(),
        bars_until_next_change: bars_until.max(0.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(order: u32, start_bar: f64, bar_count: f64, chord: &str) -> BarChordStep {
        BarChordStep {
            id: format!("step-{order}"),
            song_id: "song".to_string(),
            display_order: order,
            start_bar,
            bar_count,
            chord_name: chord.to_string(),
        }
    }

    // G for 4 bars, D for 4, Am for 8: 16-bar body starting at bar 1
    fn sixteen_bar_timeline() -> Vec<BarChordStep> {
        vec![
            step(0, 1.0, 4.0, "G"),
            step(1, 5.0, 4.0, "D"),
            step(2, 9.0, 8.0, "Am"),
        ]
    }

    const BAR_MS: u64 = 2_400; // 4/4 at 100 bpm

    #[test]
    fn walks_chords_across_the_first_pass() {
        let steps = sixteen_bar_timeline();

        let at_bar_1 = resolve(0, 100, 4, &steps).unwrap();
        assert_eq!(at_bar_1.current_chord, "G");
        assert_eq!(at_bar_1.next_chord, "D");
        assert_eq!(at_bar_1.current_step_number, 1);
        assert!((at_bar_1.bars_until_next_change - 4.0).abs() < 1e-9);

        let at_bar_5 = resolve(BAR_MS * 4, 100, 4, &steps).unwrap();
        assert_eq!(at_bar_5.current_chord, "D");

        let at_bar_10 = resolve(BAR_MS * 9, 100, 4, &steps).unwrap();
        assert_eq!(at_bar_10.current_chord, "Am");
        assert_eq!(at_bar_10.next_chord, "G");
    }

    #[test]
    fn wraps_back_to_the_first_chord_after_the_body() {
        let steps = sixteen_bar_timeline();
        // bar 17 is one full pass in: same place as the body start
        let wrapped = resolve(BAR_MS * 16, 100, 4, &steps).unwrap();
        assert_eq!(wrapped.current_chord, "G");
        assert!((wrapped.loop_bar - 1.0).abs() < 1e-9);
        assert_eq!(wrapped.current_step_number, 1);
    }

    #[test]
    fn full_cycle_periodicity() {
        let steps = sixteen_bar_timeline();
        // first_pass_end is bar 17; one repeat later must look identical
        let at_end = resolve(BAR_MS * 16, 100, 4, &steps).unwrap();
        let one_cycle_later = resolve(BAR_MS * 32, 100, 4, &steps).unwrap();
        assert_eq!(at_end.current_chord, one_cycle_later.current_chord);
        assert_eq!(at_end.loop_bar, one_cycle_later.loop_bar);
        assert_eq!(
            at_end.current_step_number,
            one_cycle_later.current_step_number
        );
    }

    #[test]
    fn lead_in_counts_down_to_the_first_segment() {
        let steps = vec![step(0, 3.0, 2.0, "Em"), step(1, 5.0, 2.0, "C")];
        let early = resolve(0, 100, 4, &steps).unwrap();
        assert_eq!(early.current_chord, "Em");
        assert_eq!(early.current_step_number, 1);
        assert!((early.bars_until_next_change - 2.0).abs() < 1e-9);
    }

    #[test]
    fn fractional_positions_resolve_inside_a_bar() {
        let steps = sixteen_bar_timeline();
        // halfway through bar 4, still G with 0.5 bars to go
        let mid = resolve(BAR_MS * 3 + BAR_MS / 2, 100, 4, &steps).unwrap();
        assert_eq!(mid.current_chord, "G");
        assert!((mid.bars_until_next_change - 0.5).abs() < 1e-6);
    }

    #[test]
    fn deterministic_for_identical_inputs() {
        let steps = sixteen_bar_timeline();
        let a = resolve(7_777, 100, 4, &steps);
        let b = resolve(7_777, 100, 4, &steps);
        assert_eq!(a, b);
    }

    #[test]
    fn degenerate_inputs_resolve_to_nothing() {
        let steps = sixteen_bar_timeline();
        assert!(resolve(0, 100, 4, &[]).is_none());
        assert!(resolve(0, 0, 4, &steps).is_none());
        assert!(resolve(0, 100, 0, &steps).is_none());
    }

    #[test]
    fn unsorted_input_is_ordered_by_display_order() {
        let mut steps = sixteen_bar_timeline();
        steps.reverse();
        let at_bar_5 = resolve(BAR_MS * 4, 100, 4, &steps).unwrap();
        assert_eq!(at_bar_5.current_chord, "D");
        assert_eq!(at_bar_5.current_step_number, 2);
    }
}
