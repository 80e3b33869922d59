use ratatui::layout::Rect;

// state local to tui: where things were drawn last frame (so mouse clicks can
// be resolved) and whether a pad gesture is in progress.
// steps is synced from DisplayState per loop
#[derive(Clone, Debug, Default)]
pub struct TuiState {
    pub pad_area: Rect,  // inside of the pad border
    pub grid_area: Rect, // inside of the beat grid border
    pub steps: usize,
    // left button went down on the pad and hasn't come up yet
    pub dragging_pad: bool,
}
