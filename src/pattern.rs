// Strum patterns and the bar sequences the click scheduler renders.

use std::sync::Arc;

use anyhow::bail;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepKind {
    Down,
    Up,
    Mute,
    Rest,
}

impl StepKind {
    pub fn from_token(token: &str) -> anyhow::Result<Self> {
        match token.trim().to_uppercase().as_str() {
            "D" => Ok(StepKind::Down),
            "U" => Ok(StepKind::Up),
            "X" => Ok(StepKind::Mute),
            "-" => Ok(StepKind::Rest),
            other => bail!("invalid step token: {other}"),
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            StepKind::Down => "D",
            StepKind::Up => "U",
            StepKind::Mute => "X",
            StepKind::Rest => "-",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternStep {
    pub kind: StepKind,
    #[serde(default)]
    pub accent: bool,
}

/// Immutable reference data; bars share one pattern through an Arc.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StrumPattern {
    pub id: String,
    pub name: String,
    pub subdivision: u32, // 8 or 16
    pub steps: Vec<PatternStep>,
}

/// One bar to render: a chord label over a shared strum pattern.
#[derive(Clone, Debug)]
pub struct PlaybackBar {
    pub chord: String,
    pub beats_per_bar: u32,
    pub pattern: Arc<StrumPattern>,
}

/// Parse the text pattern notation, e.g. "D D U U D U".
pub fn parse_pattern_dsl(
    id: &str,
    name: &str,
    subdivision: u32,
    dsl: &str,
) -> anyhow::Result<StrumPattern> {
    if subdivision != 8 && subdivision != 16 {
        bail!("subdivision must be 8 or 16");
    }

    let steps = dsl
        .split_whitespace()
        .map(|token| {
            Ok(PatternStep {
                kind: StepKind::from_token(token)?,
                accent: false,
            })
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    if steps.is_empty() {
        bail!("pattern cannot be empty");
    }

    Ok(StrumPattern {
        id: id.to_string(),
        name: name.to_string(),
        subdivision,
        steps,
    })
}

/// Turn a chord list like "A C D G" into one bar per chord.
pub fn bars_from_chord_sequence(
    input: &str,
    beats_per_bar: u32,
    pattern: &Arc<StrumPattern>,
) -> Vec<PlaybackBar> {
    input
        .split_whitespace()
        .map(|chord| PlaybackBar {
            chord: chord.to_string(),
            beats_per_bar,
            pattern: Arc::clone(pattern),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_tokens() {
        let pattern = parse_pattern_dsl("p", "test", 8, "d D u - x").unwrap();
        let kinds: Vec<StepKind> = pattern.steps.iter().map(|s| s.kind).collect();
        assert_eq!(
            kinds,
            vec![
                StepKind::Down,
                StepKind::Down,
                StepKind::Up,
                StepKind::Rest,
                StepKind::Mute
            ]
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_pattern_dsl("p", "test", 8, "D Q U").is_err());
        assert!(parse_pattern_dsl("p", "test", 8, "   ").is_err());
        assert!(parse_pattern_dsl("p", "test", 12, "D U").is_err());
    }

    #[test]
    fn chord_sequence_shares_one_pattern() {
        let pattern = Arc::new(parse_pattern_dsl("p", "test", 8, "D U D U").unwrap());
        let bars = bars_from_chord_sequence("A C D G", 4, &pattern);
        assert_eq!(bars.len(), 4);
        assert_eq!(bars[2].chord, "D");
        assert!(Arc::ptr_eq(&bars[0].pattern, &bars[3].pattern));
    }

    #[test]
    fn empty_sequence_gives_no_bars() {
        let pattern = Arc::new(parse_pattern_dsl("p", "test", 8, "D").unwrap());
        assert!(bars_from_chord_sequence("", 4, &pattern).is_empty());
    }
}
