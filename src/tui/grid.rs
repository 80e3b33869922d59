use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::shared::{DisplayState, NUM_TRACKS, PadMode, TrackId};

const LABEL_WIDTH: u16 = 3;
const STEP_WIDTH: u16 = 2; // step glyph + gap

// The beat grid: one row per track, one column per step, with the playhead
// column highlighted. Returns the inner area for mouse hit testing.
pub fn draw_beat_grid(frame: &mut Frame, area: Rect, ds: &DisplayState) -> Rect {
    let title = match (ds.pad_mode, ds.selected_corner) {
        (PadMode::Edit, Some(corner)) => format!(
            " editing corner {}: {} ",
            corner.label(),
            ds.corner_presets.get(corner)
        ),
        _ => " beat ".to_string(),
    };
    let border = if ds.pad_mode == PadMode::Edit { Color::Yellow } else { Color::DarkGray };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .title(title);
    let inner = block.inner(area);

    let lines: Vec<Line> = TrackId::ALL
        .into_iter()
        .map(|track| {
            let mut spans = vec![Span::styled(
                format!("{:<width$}", track.short_label(), width = LABEL_WIDTH as usize),
                Style::default().fg(Color::Gray),
            )];
            for step in 0..ds.steps {
                let on = ds.pattern.get(track, step);
                let playhead = ds.current_step == Some(step);
                let glyph = if on { "■" } else if step % 4 == 0 { "·" } else { " " };
                let mut style = if on {
                    Style::default().fg(Color::LightMagenta)
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                if playhead {
                    style = style.bg(Color::Rgb(60, 60, 60)).add_modifier(Modifier::BOLD);
                }
                spans.push(Span::styled(glyph, style));
                spans.push(Span::raw(" "));
            }
            Line::from(spans)
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
    inner
}

// Which (track, step) a terminal cell inside the grid belongs to.
pub fn hit_test(inner: Rect, steps: usize, column: u16, row: u16) -> Option<(TrackId, usize)> {
    if column < inner.x + LABEL_WIDTH || row < inner.y {
        return None;
    }
    let track_idx = (row - inner.y) as usize;
    let step = ((column - inner.x - LABEL_WIDTH) / STEP_WIDTH) as usize;
    if track_idx >= NUM_TRACKS || step >= steps || column >= inner.x + inner.width {
        return None;
    }
    Some((TrackId::ALL[track_idx], step))
}
