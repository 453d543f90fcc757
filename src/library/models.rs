// Persisted practice data: songs, their chord timelines, per-song practice
// profiles, and the last-used session settings.

use serde::{Deserialize, Serialize};

use crate::playback::practice::PracticeConfig;
use crate::ramp::RampConfig;
use crate::timeline::BarChordStep;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub artist: Option<String>,
    pub audio_file_path: String,
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PracticeProfile {
    pub song_id: String,
    pub config: PracticeConfig,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryState {
    pub schema_version: u32,
    pub songs: Vec<Song>,
    pub bar_chord_steps: Vec<BarChordStep>,
    pub practice_profiles: Vec<PracticeProfile>,
}

impl LibraryState {
    /// Steps for one song, in display order, ready for the timeline resolver.
    pub fn steps_for_song(&self, song_id: &str) -> Vec<BarChordStep> {
        let mut steps: Vec<BarChordStep> = self
            .bar_chord_steps
            .iter()
            .filter(|s| s.song_id == song_id)
            .cloned()
            .collect();
        steps.sort_by_key(|s| s.display_order);
        steps
    }

    pub fn profile_for_song(&self, song_id: &str) -> PracticeConfig {
        self.practice_profiles
            .iter()
            .find(|p| p.song_id == song_id)
            .map(|p| p.config)
            .unwrap_or_default()
    }
}

/// Last-used session settings, restored at startup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub tempo_bpm: u32,
    pub beats_per_bar: u32,
    pub last_pattern_id: String,
    pub ramp: RampConfig,
    pub custom_pattern_dsl: String,
    pub custom_chord_sequence: String,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            tempo_bpm: 80,
            beats_per_bar: 4,
            last_pattern_id: String::new(),
            ramp: RampConfig::default(),
            custom_pattern_dsl: "D D U U D U".to_string(),
            custom_chord_sequence: "A C D G".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(song_id: &str, order: u32) -> BarChordStep {
        BarChordStep {
            id: format!("{song_id}-{order}"),
            song_id: song_id.to_string(),
            display_order: order,
            start_bar: 1.0 + order as f64,
            bar_count: 1.0,
            chord_name: "G".to_string(),
        }
    }

    #[test]
    fn steps_are_filtered_and_ordered() {
        let library = LibraryState {
            bar_chord_steps: vec![step("b", 0), step("a", 2), step("a", 0), step("a", 1)],
            ..LibraryState::default()
        };
        let steps = library.steps_for_song("a");
        let orders: Vec<u32> = steps.iter().map(|s| s.display_order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
    }

    #[test]
    fn missing_profile_falls_back_to_defaults() {
        let library = LibraryState::default();
        assert_eq!(library.profile_for_song("x"), PracticeConfig::default());
    }
}
