use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEventKind, MouseButton, MouseEvent, MouseEventKind};

use super::mode::TuiState;
use super::{grid, pad};
use crate::shared::{Corner, InputEvent};

const NUDGE: f32 = 0.05;

// poll for input from tui, resolves keys and mouse gestures into semantic
// input events for the engine to handle
pub fn poll_input(timeout: Duration, ts: &mut TuiState) -> anyhow::Result<Vec<InputEvent>> {
    if !event::poll(timeout)? {
        return Ok(vec![]);
    }

    match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => Ok(handle_key(key.code)),
        Event::Mouse(mouse) => Ok(handle_mouse(mouse, ts)),
        _ => Ok(vec![]),
    }
}

fn handle_key(code: KeyCode) -> Vec<InputEvent> {
    match code {
        KeyCode::Esc | KeyCode::Char('q') => vec![InputEvent::Quit],
        KeyCode::Char(' ') => vec![InputEvent::TogglePlay],

        // pad
        KeyCode::Char('m') => vec![InputEvent::ToggleDrawMode],
        KeyCode::Left => vec![InputEvent::NudgePuck { dx: -NUDGE, dy: 0.0 }],
        KeyCode::Right => vec![InputEvent::NudgePuck { dx: NUDGE, dy: 0.0 }],
        KeyCode::Up => vec![InputEvent::NudgePuck { dx: 0.0, dy: -NUDGE }],
        KeyCode::Down => vec![InputEvent::NudgePuck { dx: 0.0, dy: NUDGE }],

        // corners
        KeyCode::Char('a') => vec![InputEvent::SelectCorner(Corner::A)],
        KeyCode::Char('b') => vec![InputEvent::SelectCorner(Corner::B)],
        KeyCode::Char('c') => vec![InputEvent::SelectCorner(Corner::C)],
        KeyCode::Char('d') => vec![InputEvent::SelectCorner(Corner::D)],
        KeyCode::Char('e') => vec![InputEvent::ToggleEditMode],
        KeyCode::Char('[') => vec![InputEvent::CyclePreset(-1)],
        KeyCode::Char(']') => vec![InputEvent::CyclePreset(1)],

        // tempo, lowercase = fine and shifted = coarse
        KeyCode::Char('-') => vec![InputEvent::AdjustBpm(-1.0)],
        KeyCode::Char('=') => vec![InputEvent::AdjustBpm(1.0)],
        KeyCode::Char('_') => vec![InputEvent::AdjustBpm(-10.0)],
        KeyCode::Char('+') => vec![InputEvent::AdjustBpm(10.0)],

        KeyCode::Char('x') => vec![InputEvent::ClearPattern],
        KeyCode::Char('s') => vec![InputEvent::ExportBeat],

        _ => vec![],
    }
}

// A left-button gesture that starts on the pad stays a pad gesture until the
// button comes up, even if the pointer wanders off the pad.
fn handle_mouse(mouse: MouseEvent, ts: &mut TuiState) -> Vec<InputEvent> {
    let (col, row) = (mouse.column, mouse.row);
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            if pad::contains(ts.pad_area, col, row) {
                ts.dragging_pad = true;
                return vec![InputEvent::PadPress(pad::point_in(ts.pad_area, col, row))];
            }
            match grid::hit_test(ts.grid_area, ts.steps, col, row) {
                Some((track, step)) => vec![InputEvent::ToggleStep { track, step }],
                None => vec![],
            }
        }
        MouseEventKind::Drag(MouseButton::Left) if ts.dragging_pad => {
            vec![InputEvent::PadDrag(pad::point_in(ts.pad_area, col, row).clamped())]
        }
        MouseEventKind::Up(MouseButton::Left) if ts.dragging_pad => {
            ts.dragging_pad = false;
            vec![InputEvent::PadRelease]
        }
        _ => vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::{Point2D, TrackId};
    use crossterm::event::KeyModifiers;
    use ratatui::layout::Rect;

    fn mouse(kind: MouseEventKind, column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind,
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    fn state() -> TuiState {
        TuiState {
            pad_area: Rect::new(1, 1, 10, 10),
            grid_area: Rect::new(20, 1, 40, 9),
            steps: 16,
            dragging_pad: false,
        }
    }

    #[test]
    fn pad_gesture_is_press_drag_release() {
        let mut ts = state();
        let down = handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), 1, 1), &mut ts);
        assert_eq!(down, vec![InputEvent::PadPress(Point2D::new(0.05, 0.05))]);
        assert!(ts.dragging_pad);

        // leaving the pad keeps dragging, clamped to its edge
        let drag = handle_mouse(mouse(MouseEventKind::Drag(MouseButton::Left), 40, 3), &mut ts);
        assert_eq!(drag, vec![InputEvent::PadDrag(Point2D::new(1.0, 0.25))]);

        let up = handle_mouse(mouse(MouseEventKind::Up(MouseButton::Left), 40, 3), &mut ts);
        assert_eq!(up, vec![InputEvent::PadRelease]);
        assert!(!ts.dragging_pad);
    }

    #[test]
    fn grid_click_toggles_a_step() {
        let mut ts = state();
        let events = handle_mouse(mouse(MouseEventKind::Down(MouseButton::Left), 25, 2), &mut ts);
        assert_eq!(
            events,
            vec![InputEvent::ToggleStep {
                track: TrackId::Snare,
                step: 1
            }]
        );
        // stray drags off the pad do nothing
        assert!(handle_mouse(mouse(MouseEventKind::Drag(MouseButton::Left), 25, 2), &mut ts).is_empty());
    }

    #[test]
    fn keys_map_to_events() {
        assert_eq!(handle_key(KeyCode::Char(' ')), vec![InputEvent::TogglePlay]);
        assert_eq!(handle_key(KeyCode::Char('c')), vec![InputEvent::SelectCorner(Corner::C)]);
        assert_eq!(handle_key(KeyCode::Char(']')), vec![InputEvent::CyclePreset(1)]);
        assert!(handle_key(KeyCode::Char('z')).is_empty());
    }
}
