// Types shared between the engine (middle.rs), the tui and the audio thread.
//
// The flow is the same as a hardware groovebox:
//   - the tui turns keys and mouse gestures into semantic `InputEvent`s
//   - `Middle` owns every piece of pad/sequencer state and turns events into
//     `AudioCommand`s
//   - every frame the tui asks `Middle` for a `DisplayState` and just draws it
//
// Pad coordinates are always normalized to [0,1] x [0,1]. The four corners:
//   A = (0,0)  B = (1,0)
//   C = (0,1)  D = (1,1)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::pipeline::pattern::{CornerSet, Pattern};

pub const NUM_TRACKS: usize = 9;
pub const DEFAULT_STEPS: usize = 16;

// One drum voice per track; names are the serde keys in presets and sessions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TrackId {
    Kick,
    Snare,
    HatClose,
    HatOpen,
    TomLow,
    TomMid,
    TomHigh,
    Crash,
    Ride,
}

impl TrackId {
    pub const ALL: [TrackId; NUM_TRACKS] = [
        TrackId::Kick,
        TrackId::Snare,
        TrackId::HatClose,
        TrackId::HatOpen,
        TrackId::TomLow,
        TrackId::TomMid,
        TrackId::TomHigh,
        TrackId::Crash,
        TrackId::Ride,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            TrackId::Kick => "kick",
            TrackId::Snare => "snare",
            TrackId::HatClose => "hatClose",
            TrackId::HatOpen => "hatOpen",
            TrackId::TomLow => "tomLow",
            TrackId::TomMid => "tomMid",
            TrackId::TomHigh => "tomHigh",
            TrackId::Crash => "crash",
            TrackId::Ride => "ride",
        }
    }

    // grid label, 2 chars max
    pub fn short_label(self) -> &'static str {
        match self {
            TrackId::Kick => "K",
            TrackId::Snare => "S",
            TrackId::HatClose => "HC",
            TrackId::HatOpen => "HO",
            TrackId::TomLow => "TL",
            TrackId::TomMid => "TM",
            TrackId::TomHigh => "TH",
            TrackId::Crash => "C",
            TrackId::Ride => "R",
        }
    }

    // every track has exactly one voice file in the kit directory
    pub fn voice_file(self) -> &'static str {
        match self {
            TrackId::Kick => "kick.wav",
            TrackId::Snare => "snare.wav",
            TrackId::HatClose => "hat_closed.wav",
            TrackId::HatOpen => "hat_open.wav",
            TrackId::TomLow => "tom_low.wav",
            TrackId::TomMid => "tom_mid.wav",
            TrackId::TomHigh => "tom_high.wav",
            TrackId::Crash => "crash.wav",
            TrackId::Ride => "ride.wav",
        }
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownTrack(pub String);

impl fmt::Display for UnknownTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown track name: {:?}", self.0)
    }
}

impl std::error::Error for UnknownTrack {}

impl FromStr for TrackId {
    type Err = UnknownTrack;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TrackId::ALL
            .iter()
            .copied()
            .find(|t| t.name() == s)
            .ok_or_else(|| UnknownTrack(s.to_string()))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Corner {
    A,
    B,
    C,
    D,
}

impl Corner {
    pub const ALL: [Corner; 4] = [Corner::A, Corner::B, Corner::C, Corner::D];

    // geometric position on the unit square
    pub fn position(self) -> Point2D {
        match self {
            Corner::A => Point2D::new(0.0, 0.0),
            Corner::B => Point2D::new(1.0, 0.0),
            Corner::C => Point2D::new(0.0, 1.0),
            Corner::D => Point2D::new(1.0, 1.0),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Corner::A => "A",
            Corner::B => "B",
            Corner::C => "C",
            Corner::D => "D",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f32,
    pub y: f32,
}

impl Point2D {
    pub const CENTER: Point2D = Point2D { x: 0.5, y: 0.5 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    // pointer positions can land outside the pad while dragging
    pub fn clamped(self) -> Self {
        Self {
            x: self.x.clamp(0.0, 1.0),
            y: self.y.clamp(0.0, 1.0),
        }
    }

    pub fn distance(self, other: Point2D) -> f32 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrawMode {
    #[default]
    Drag, // every pointer move blends immediately
    Path, // pointer strokes record a path that playback follows
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PadMode {
    #[default]
    Interpolate,
    Edit, // a selected corner's pattern is being edited on the grid
}

#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    Quit,

    // transport
    TogglePlay,
    AdjustBpm(f32),

    // static pattern
    ClearPattern,
    ToggleStep { track: TrackId, step: usize }, // edits the selected corner while in edit mode

    // pad
    ToggleDrawMode,
    PadPress(Point2D),
    PadDrag(Point2D),
    PadRelease,
    NudgePuck { dx: f32, dy: f32 }, // keyboard blending for terminals without mouse reporting

    // corners
    ToggleEditMode, // leaving edit mode runs the full pad interpolation
    SelectCorner(Corner),
    CyclePreset(i32), // applies the next/previous preset to the selected corner

    ExportBeat,
}

// One pad cell as the pad heat map sees it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellView {
    pub index: usize,
    pub density: f32, // fraction of lit cells in the decoded pattern, 0..1
}

#[derive(Clone, Debug)]
pub struct DisplayState {
    pub pattern: Pattern, // what the beat grid shows
    pub current_step: Option<usize>,
    pub playing: bool,
    pub bpm: f32,
    pub steps: usize,
    pub draw_mode: DrawMode,
    pub pad_mode: PadMode,
    pub selected_corner: Option<Corner>,
    pub corner_presets: CornerSet<String>,
    pub puck: Point2D,
    pub selected_cell: usize,
    pub playback_position: Option<Point2D>, // cursor while playing a path
    pub path: Vec<Point2D>,
    pub stroke: Vec<Point2D>, // raw stroke still being drawn
    pub grid_cols: usize,
    pub grid_rows: usize,
    pub cells: Vec<CellView>,
    pub busy: bool,
    pub encodings_ready: bool,
    pub path_ready: bool,
    pub display_text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn track_names_round_trip_through_from_str() {
        for track in TrackId::ALL {
            assert_eq!(track.name().parse::<TrackId>(), Ok(track));
        }
        assert_eq!(
            "cowbell".parse::<TrackId>(),
            Err(UnknownTrack("cowbell".to_string()))
        );
    }

    #[test]
    fn track_indices_are_dense() {
        for (i, track) in TrackId::ALL.iter().enumerate() {
            assert_eq!(track.index(), i);
        }
    }

    #[test]
    fn serde_uses_reference_track_names() {
        let json = serde_json::to_string(&TrackId::HatClose).unwrap();
        assert_eq!(json, "\"hatClose\"");
        assert!(serde_json::from_str::<TrackId>("\"clap\"").is_err());
    }

    #[test]
    fn points_clamp_into_the_pad() {
        let p = Point2D::new(-0.2, 1.7).clamped();
        assert_eq!(p, Point2D::new(0.0, 1.0));
    }
}
