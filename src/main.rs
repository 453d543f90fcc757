mod click;
mod library;
mod pattern;
mod playback;
mod ramp;
mod timeline;
mod timing;
mod tui;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crossterm::terminal;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use click::ClickEngine;
use library::{LibraryState, Song, UserSettings, store, validation};
use pattern::StrumPattern;
use playback::PlaybackEngine;
use tui::input::{self, AppEvent};
use tui::mode::{Screen, TuiState};
use tui::view::{self, ViewModel};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let data_dir: PathBuf = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());

    let mut settings = store::load_settings(&data_dir).unwrap_or_default();
    let library = store::load_library(&data_dir).unwrap_or_else(|| {
        // seed an empty library file so it can be edited by hand
        let state = LibraryState::default();
        if let Err(err) = store::save_library(&data_dir, &state) {
            tracing::warn!("could not seed library file: {err:#}");
        }
        state
    });

    for song in &library.songs {
        if let Err(err) = validation::validate_song_input(&song.title, &song.audio_file_path) {
            tracing::warn!("library song {} is invalid: {err}", song.id);
        }
    }

    let mut click = ClickEngine::new();
    let mut playback = PlaybackEngine::start()?;

    // pick up the first song in the library, if any
    let song: Option<Song> = library.songs.first().cloned();
    let (song_title, chord_steps) = match &song {
        Some(song) => {
            let _ = playback.load(Path::new(&song.audio_file_path));
            (song.title.clone(), library.steps_for_song(&song.id))
        }
        None => ("no song loaded".to_string(), Vec::new()),
    };

    let patterns = available_patterns(&settings);
    let mut pattern_index = patterns
        .iter()
        .position(|p| p.id == settings.last_pattern_id)
        .unwrap_or(0);

    terminal::enable_raw_mode()?;
    let _guard = RawModeGuard; // auto drops when out of scope

    let backend = CrosstermBackend::new(std::io::stdout());
    let mut term = Terminal::new(backend)?;
    term.clear()?;

    let tick_rate = Duration::from_millis(50);
    let mut tui_state = TuiState::default();

    loop {
        let click_state = click.state();
        let playback_state = playback.state();
        let timeline_position = timeline::resolve(
            playback_state.position_ms,
            settings.tempo_bpm,
            settings.beats_per_bar,
            &chord_steps,
        );

        let vm = ViewModel {
            tui: &tui_state,
            click: &click_state,
            pattern: &patterns[pattern_index],
            playback: &playback_state,
            timeline: timeline_position.as_ref(),
            song_title: &song_title,
        };
        term.draw(|frame| {
            view::render(frame, frame.area(), &vm);
        })?;

        let events = input::poll_input(tick_rate, &tui_state)?;
        for event in events {
            match event {
                AppEvent::Quit => {
                    settings.last_pattern_id = patterns[pattern_index].id.clone();
                    if let Err(err) = store::save_settings(&data_dir, &settings) {
                        tracing::warn!("could not save settings: {err:#}");
                    }
                    click.stop();
                    drop(term);
                    return Ok(());
                }
                AppEvent::SwitchScreen => {
                    tui_state.screen = tui_state.screen.next();
                    tui_state.status.clear();
                }
                AppEvent::TogglePlay => match tui_state.screen {
                    Screen::Click => {
                        if click.is_playing() {
                            click.stop();
                        } else {
                            let pattern = Arc::clone(&patterns[pattern_index]);
                            let bars = pattern::bars_from_chord_sequence(
                                &settings.custom_chord_sequence,
                                settings.beats_per_bar,
                                &pattern,
                            );
                            click.start(settings.tempo_bpm, bars, settings.ramp)?;
                        }
                    }
                    Screen::Recorded => {
                        if playback_state.is_playing {
                            playback.pause();
                        } else {
                            playback.play();
                        }
                    }
                },
                AppEvent::TempoDelta(delta) => {
                    let bpm = settings.tempo_bpm.saturating_add_signed(delta);
                    settings.tempo_bpm = bpm.clamp(click::MIN_BPM, click::MAX_BPM);
                    click.set_bpm(settings.tempo_bpm);
                }
                AppEvent::ToggleRamp => {
                    settings.ramp.enabled = !settings.ramp.enabled;
                    click.set_ramp(settings.ramp);
                    tui_state.status = if settings.ramp.enabled {
                        format!(
                            "ramp {} to {} bpm, +{} every {} bars",
                            settings.ramp.start_bpm,
                            settings.ramp.end_bpm,
                            settings.ramp.increment,
                            settings.ramp.bars_per_increment
                        )
                    } else {
                        "ramp off".to_string()
                    };
                }
                AppEvent::CyclePattern => {
                    pattern_index = (pattern_index + 1) % patterns.len();
                    tui_state.status = format!("pattern: {}", patterns[pattern_index].name);
                }
                AppEvent::SeekDelta(delta) => {
                    let target = playback_state.position_ms.saturating_add_signed(delta);
                    playback.seek_to(target.min(playback_state.duration_ms));
                }
                AppEvent::SpeedDelta(delta) => {
                    playback.set_speed(playback_state.speed + delta);
                    tui_state.status = "manual speed (stepped mode off)".to_string();
                }
                AppEvent::EnableStepped => {
                    let config = match &song {
                        Some(song) => library.profile_for_song(&song.id),
                        None => {
                            tui_state.status = "no song loaded".to_string();
                            continue;
                        }
                    };
                    let duration = Some(playback_state.duration_ms).filter(|&d| d > 0);
                    match validation::validate_practice_config(&config, duration) {
                        Ok(()) => {
                            playback.enable_stepped_mode(config);
                            tui_state.status = "stepped practice on".to_string();
                        }
                        Err(err) => tui_state.status = err.to_string(),
                    }
                }
                AppEvent::DisableStepped => {
                    playback.disable_stepped_mode();
                    tui_state.status = "stepped practice off".to_string();
                }
                AppEvent::ResetStepped => {
                    playback.reset_stepped_mode();
                    tui_state.status = "stepped practice reset".to_string();
                }
            }
        }
    }
}

// the selectable patterns: the user's text pattern plus a couple of built-ins
fn available_patterns(settings: &UserSettings) -> Vec<Arc<StrumPattern>> {
    let mut patterns = Vec::new();
    match pattern::parse_pattern_dsl("custom", "Custom", 8, &settings.custom_pattern_dsl) {
        Ok(p) => patterns.push(Arc::new(p)),
        Err(err) => tracing::warn!("ignoring saved pattern text: {err}"),
    }
    for (id, name, subdivision, dsl) in [
        ("folk", "Folk", 8, "D D U U D U D U"),
        ("rock-16", "Rock 16ths", 16, "D - - U - - U - D - - U - - U -"),
    ] {
        match pattern::parse_pattern_dsl(id, name, subdivision, dsl) {
            Ok(p) => patterns.push(Arc::new(p)),
            Err(err) => tracing::warn!("bad built-in pattern {id}: {err}"),
        }
    }
    patterns
}

struct RawModeGuard;
impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}
