// to be called on startup and quit; JSON files under <data_dir>/.strumline/

use std::path::{Path, PathBuf};

use super::models::{LibraryState, UserSettings};

const STRUMLINE_DIR: &str = ".strumline";
const LIBRARY_FILE: &str = "library.json";
const SETTINGS_FILE: &str = "settings.json";

fn library_path(data_dir: &Path) -> PathBuf {
    data_dir.join(STRUMLINE_DIR).join(LIBRARY_FILE)
}

fn settings_path(data_dir: &Path) -> PathBuf {
    data_dir.join(STRUMLINE_DIR).join(SETTINGS_FILE)
}

pub fn load_library(data_dir: &Path) -> Option<LibraryState> {
    let data = std::fs::read_to_string(library_path(data_dir)).ok()?;
    serde_json::from_str(&data).ok()
}

pub fn save_library(data_dir: &Path, state: &LibraryState) -> anyhow::Result<()> {
    write_json(&library_path(data_dir), state)
}

pub fn load_settings(data_dir: &Path) -> Option<UserSettings> {
    let data = std::fs::read_to_string(settings_path(data_dir)).ok()?;
    serde_json::from_str(&data).ok()
}

pub fn save_settings(data_dir: &Path, settings: &UserSettings) -> anyhow::Result<()> {
    write_json(&settings_path(data_dir), settings)
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?; // create .strumline/ if needed
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::models::Song;

    #[test]
    fn library_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let state = LibraryState {
            schema_version: 1,
            songs: vec![Song {
                id: "s1".to_string(),
                title: "Wonderwall".to_string(),
                artist: Some("Oasis".to_string()),
                audio_file_path: "/music/wonderwall.wav".to_string(),
                duration_ms: Some(258_000),
            }],
            ..LibraryState::default()
        };

        save_library(dir.path(), &state).unwrap();
        assert_eq!(load_library(dir.path()), Some(state));
    }

    #[test]
    fn settings_round_trip_and_missing_files_load_as_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_settings(dir.path()).is_none());

        let mut settings = UserSettings::default();
        settings.tempo_bpm = 96;
        settings.custom_chord_sequence = "Em G D C".to_string();
        save_settings(dir.path(), &settings).unwrap();
        assert_eq!(load_settings(dir.path()), Some(settings));
    }

    #[test]
    fn corrupt_json_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = library_path(dir.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();
        assert!(load_library(dir.path()).is_none());
    }
}
