use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::click::ClickState;
use crate::pattern::StrumPattern;
use crate::playback::PlaybackState;
use crate::timeline::BarLoopPosition;

use super::mode::{Screen, TuiState};

pub struct ViewModel<'a> {
    pub tui: &'a TuiState,
    pub click: &'a ClickState,
    pub pattern: &'a StrumPattern,
    pub playback: &'a PlaybackState,
    pub timeline: Option<&'a BarLoopPosition>,
    pub song_title: &'a str,
}

pub fn render(frame: &mut Frame, area: Rect, vm: &ViewModel) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // screen title + key hints
            Constraint::Min(8),    // active practice screen
            Constraint::Length(3), // status line
        ])
        .split(area);

    draw_header(frame, sections[0], vm);
    match vm.tui.screen {
        Screen::Click => draw_click_screen(frame, sections[1], vm),
        Screen::Recorded => draw_recorded_screen(frame, sections[1], vm),
    }
    draw_status(frame, sections[2], vm);
}

fn draw_header(frame: &mut Frame, area: Rect, vm: &ViewModel) {
    let hints = match vm.tui.screen {
        Screen::Click => "Space play/stop | +/- tempo | r ramp | p pattern | Tab screen | Esc quit",
        Screen::Recorded => {
            "Space play | arrows seek | [/] speed | s/d/x stepped | Tab screen | Esc quit"
        }
    };
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            vm.tui.screen.title(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(hints, Style::default().fg(Color::DarkGray)),
    ]))
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(header, area);
}

fn draw_click_screen(frame: &mut Frame, area: Rect, vm: &ViewModel) {
    let click = vm.click;
    let transport = if click.is_playing { "playing" } else { "stopped" };

    let ramp_line = if click.ramp.active {
        format!(
            "ramp on: {} bpm, next increase in {} bars",
            click.ramp.current_bpm, click.ramp.bars_until_increment
        )
    } else {
        "ramp off".to_string()
    };

    let mut lines = vec![
        Line::from(vec![
            Span::raw("chord  "),
            Span::styled(
                click.chord.clone(),
                Style::default()
                    .fg(Color::LightMagenta)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(format!(
            "tempo  {} bpm   bar {}   {}",
            click.current_bpm,
            click.bar_index + 1,
            transport
        )),
        Line::from(ramp_line),
        Line::from(""),
    ];
    lines.push(step_strip(vm.pattern, click));

    let body = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(vm.pattern.name.clone()),
    );
    frame.render_widget(body, area);
}

// the pattern row with the playing step lit, a little like hardware step leds
fn step_strip<'a>(pattern: &'a StrumPattern, click: &ClickState) -> Line<'a> {
    let mut spans = vec![Span::raw("steps  ")];
    for (i, step) in pattern.steps.iter().enumerate() {
        let style = if click.is_playing && i == click.step_index {
            Style::default().fg(Color::LightMagenta).bg(Color::Magenta)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(format!(" {} ", step.kind.token()), style));
    }
    Line::from(spans)
}

fn draw_recorded_screen(frame: &mut Frame, area: Rect, vm: &ViewModel) {
    let playback = vm.playback;
    let transport = if playback.is_playing {
        "playing"
    } else {
        "paused"
    };

    let next_speed = playback
        .next_stepped_speed
        .map(|s| format!("  next {s:.2}x"))
        .unwrap_or_default();

    let mut lines = vec![
        Line::from(format!(
            "{}   {} / {}   {}",
            vm.song_title,
            format_ms(playback.position_ms),
            format_ms(playback.duration_ms),
            transport
        )),
        Line::from(format!("speed  {:.2}x{}", playback.speed, next_speed)),
        Line::from(Span::styled(
            playback.pitch_status.clone(),
            Style::default().fg(Color::DarkGray),
        )),
    ];

    if let Some(position) = vm.timeline {
        lines.push(Line::from(""));
        lines.push(Line::from(vec![
            Span::raw("chord  "),
            Span::styled(
                position.current_chord.clone(),
                Style::default()
                    .fg(Color::LightMagenta)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!(
                "  next {} in {:.1} bars  (loop bar {:.1})",
                position.next_chord, position.bars_until_next_change, position.loop_bar
            )),
        ]));
    }

    if let Some(err) = &playback.last_error {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            err.clone(),
            Style::default().fg(Color::Red),
        )));
    }

    let body = Paragraph::new(lines).block(Block::default().borders(Borders::ALL));
    frame.render_widget(body, area);
}

fn draw_status(frame: &mut Frame, area: Rect, vm: &ViewModel) {
    let status = Paragraph::new(Line::from(vm.tui.status.clone()))
        .block(Block::default().borders(Borders::ALL).title("status"));
    frame.render_widget(status, area);
}

fn format_ms(ms: u64) -> String {
    let total_sec = ms / 1000;
    format!("{}:{:02}", total_sec / 60, total_sec % 60)
}
