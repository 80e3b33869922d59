use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use super::{grid, pad};
use crate::shared::{DisplayState, DrawMode, PadMode};

const HELP: &str = "space play · m drag/path · a-d corner · e edit/done · [ ] preset · -/= bpm · x clear · s export · q quit";

// Where the interactive widgets ended up this frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct Areas {
    pub pad: Rect,
    pub grid: Rect,
}

pub fn render(frame: &mut Frame, area: Rect, state: &DisplayState, blink_on: bool) -> Areas {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // lcd screen
            Constraint::Min(11),   // pad + beat grid
            Constraint::Length(1), // key help
        ])
        .split(area);

    draw_screen(frame, sections[0], state);

    let grid_width = 2 + 3 + 2 * state.steps as u16; // border + labels + steps
    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(grid_width)])
        .split(sections[1]);

    let pad = pad::draw_pad(frame, body[0], state, blink_on);
    let grid = grid::draw_beat_grid(frame, body[1], state);

    frame.render_widget(
        Paragraph::new(HELP).style(Style::default().fg(Color::DarkGray)),
        sections[2],
    );
    Areas { pad, grid }
}

fn draw_screen(frame: &mut Frame, area: Rect, state: &DisplayState) {
    let transport = if state.playing {
        Span::styled("▶ PLAY", Style::default().fg(Color::LightGreen).add_modifier(Modifier::BOLD))
    } else {
        Span::styled("■ STOP", Style::default().fg(Color::Gray))
    };
    let step = match state.current_step {
        Some(s) => format!("{:>2}/{}", s + 1, state.steps),
        None => format!("--/{}", state.steps),
    };
    let draw = match state.draw_mode {
        DrawMode::Drag => "drag",
        DrawMode::Path if state.path_ready => "path ✓",
        DrawMode::Path => "path",
    };
    let pad_mode = match state.pad_mode {
        PadMode::Interpolate => "blend",
        PadMode::Edit => "edit",
    };
    let model = if state.busy {
        Span::styled("interpolating", Style::default().fg(Color::Yellow))
    } else if state.encodings_ready {
        Span::styled("model ready", Style::default().fg(Color::Cyan))
    } else {
        Span::styled("encoding", Style::default().fg(Color::DarkGray))
    };
    let corners = format!(
        "A {} · B {} · C {} · D {}",
        state.corner_presets.a, state.corner_presets.b, state.corner_presets.c, state.corner_presets.d
    );

    let line = Line::from(vec![
        transport,
        Span::raw(format!("  {:.0} bpm  {step}  {draw}/{pad_mode}  ", state.bpm)),
        model,
        Span::raw("  "),
        Span::styled(corners, Style::default().fg(Color::Gray)),
        Span::raw("  "),
        Span::styled(state.display_text.clone(), Style::default().fg(Color::White)),
    ]);
    let block = Block::default().borders(Borders::ALL).title(" beatblend ");
    frame.render_widget(Paragraph::new(line).block(block), area);
}
