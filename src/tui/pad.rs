use std::collections::HashSet;

use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::shared::{Corner, DisplayState, DrawMode, Point2D};

// The blend pad. Terminal cells are mapped onto the unit square with A in
// the top-left and D in the bottom-right. Returns the inner area so the input
// layer can turn mouse positions back into pad points.
pub fn draw_pad(frame: &mut Frame, area: Rect, ds: &DisplayState, blink_on: bool) -> Rect {
    let title = match ds.draw_mode {
        DrawMode::Drag => " pad: drag ",
        DrawMode::Path => " pad: path ",
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if ds.busy { Color::Yellow } else { Color::DarkGray }))
        .title(title);
    let inner = block.inner(area);
    if inner.width == 0 || inner.height == 0 {
        frame.render_widget(block, area);
        return inner;
    }

    let to_cell = |p: Point2D| -> (u16, u16) {
        let p = p.clamped();
        let col = ((p.x * inner.width as f32) as u16).min(inner.width - 1);
        let row = ((p.y * inner.height as f32) as u16).min(inner.height - 1);
        (col, row)
    };
    let path: HashSet<(u16, u16)> = ds.path.iter().map(|p| to_cell(*p)).collect();
    let stroke: HashSet<(u16, u16)> = ds.stroke.iter().map(|p| to_cell(*p)).collect();
    let puck = (ds.draw_mode == DrawMode::Drag).then(|| to_cell(ds.puck));
    let cursor = ds.playback_position.map(to_cell);
    let corners: Vec<((u16, u16), &str)> = Corner::ALL
        .iter()
        .map(|c| (to_cell(c.position()), c.label()))
        .collect();

    let lines: Vec<Line> = (0..inner.height)
        .map(|row| {
            let spans: Vec<Span> = (0..inner.width)
                .map(|col| {
                    let at = (col, row);
                    let p = point_in(inner, inner.x + col, inner.y + row);
                    let bg = Style::default().bg(heat(ds, p));
                    if let Some((_, label)) = corners.iter().find(|(c, _)| *c == at) {
                        return Span::styled(label.to_string(), bg.fg(Color::White));
                    }
                    if cursor == Some(at) && blink_on {
                        return Span::styled("●", bg.fg(Color::LightGreen));
                    }
                    if puck == Some(at) {
                        return Span::styled("◉", bg.fg(Color::LightMagenta));
                    }
                    if stroke.contains(&at) {
                        return Span::styled("•", bg.fg(Color::Yellow));
                    }
                    if path.contains(&at) {
                        return Span::styled("·", bg.fg(Color::Cyan));
                    }
                    Span::styled(" ", bg)
                })
                .collect();
            Line::from(spans)
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
    inner
}

// Pad background: how busy the decoded cell under this point is.
fn heat(ds: &DisplayState, p: Point2D) -> Color {
    if ds.cells.is_empty() || ds.grid_cols == 0 || ds.grid_rows == 0 {
        return Color::Reset;
    }
    let col = ((p.x * ds.grid_cols as f32) as usize).min(ds.grid_cols - 1);
    let row = ((p.y * ds.grid_rows as f32) as usize).min(ds.grid_rows - 1);
    let index = row * ds.grid_cols + col;
    let density = ds.cells.get(index).map(|c| c.density).unwrap_or(0.0);
    let mut level = (density * 3.0 * 20.0).min(20.0) as u8;
    if index == ds.selected_cell && ds.draw_mode == DrawMode::Drag {
        level = level.saturating_add(3);
    }
    Color::Indexed(232 + level) // grayscale ramp
}

// Pad point under a terminal cell; may fall outside [0,1] when the pointer
// has left the pad mid-gesture.
pub fn point_in(inner: Rect, column: u16, row: u16) -> Point2D {
    let w = inner.width.max(1) as f32;
    let h = inner.height.max(1) as f32;
    Point2D::new(
        (column as f32 - inner.x as f32 + 0.5) / w,
        (row as f32 - inner.y as f32 + 0.5) / h,
    )
}

pub fn contains(inner: Rect, column: u16, row: u16) -> bool {
    column >= inner.x && column < inner.x + inner.width && row >= inner.y && row < inner.y + inner.height
}
