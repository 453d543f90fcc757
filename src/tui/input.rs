use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind};

use super::mode::{Screen, TuiState};

// The key plan:
//   Tab           switch between the click and recorded screens
//   Space         start/stop (click) or play/pause (recorded)
//   Esc           quit
// Click screen:
//   + / -         tempo up/down
//   r             toggle the tempo ramp
//   p             cycle strum pattern
// Recorded screen:
//   Left / Right  seek 5s
//   [ / ]         manual speed down/up (leaves stepped mode)
//   s / d / x     stepped mode on / off / reset
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AppEvent {
    Quit,
    SwitchScreen,
    TogglePlay,
    TempoDelta(i32),
    ToggleRamp,
    CyclePattern,
    SeekDelta(i64),
    SpeedDelta(f32),
    EnableStepped,
    DisableStepped,
    ResetStepped,
}

// poll for input, resolving keys to app events based on the active screen
pub fn poll_input(timeout: Duration, ts: &TuiState) -> anyhow::Result<Vec<AppEvent>> {
    if !event::poll(timeout)? {
        return Ok(vec![]);
    }

    if let Event::Key(key) = event::read()? {
        if key.kind != KeyEventKind::Press {
            return Ok(vec![]);
        }
        return Ok(handle_key(key.code, ts));
    }
    Ok(vec![])
}

fn handle_key(code: KeyCode, ts: &TuiState) -> Vec<AppEvent> {
    match code {
        KeyCode::Esc => vec![AppEvent::Quit],
        KeyCode::Tab => vec![AppEvent::SwitchScreen],
        KeyCode::Char(' ') => vec![AppEvent::TogglePlay],
        _ => match ts.screen {
            Screen::Click => click_key(code),
            Screen::Recorded => recorded_key(code),
        },
    }
}

fn click_key(code: KeyCode) -> Vec<AppEvent> {
    match code {
        KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Up => vec![AppEvent::TempoDelta(2)],
        KeyCode::Char('-') | KeyCode::Down => vec![AppEvent::TempoDelta(-2)],
        KeyCode::Char('r') => vec![AppEvent::ToggleRamp],
        KeyCode::Char('p') => vec![AppEvent::CyclePattern],
        _ => vec![],
    }
}

fn recorded_key(code: KeyCode) -> Vec<AppEvent> {
    match code {
        KeyCode::Left => vec![AppEvent::SeekDelta(-5_000)],
        KeyCode::Right => vec![AppEvent::SeekDelta(5_000)],
        KeyCode::Char('[') => vec![AppEvent::SpeedDelta(-0.05)],
        KeyCode::Char(']') => vec![AppEvent::SpeedDelta(0.05)],
        KeyCode::Char('s') => vec![AppEvent::EnableStepped],
        KeyCode::Char('d') => vec![AppEvent::DisableStepped],
        KeyCode::Char('x') => vec![AppEvent::ResetStepped],
        _ => vec![],
    }
}
