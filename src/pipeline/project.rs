// The persisted side of a pad session plus the engine tuning knobs.
//
// Only user-authored state lives in ProjectState. Latent encodings, the path
// cache and decoded pad cells are derived and always recomputed on startup.

use serde::{Deserialize, Serialize};

use crate::pipeline::pattern::{CornerSet, Pattern};
use crate::pipeline::presets;
use crate::shared::{DEFAULT_STEPS, DrawMode};

pub const MIN_BPM: f32 = 20.0;
pub const MAX_BPM: f32 = 300.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub steps: usize,         // steps per pattern, one bar
    pub beats_per_bar: u32,
    pub bpm: f32,             // tempo for a fresh session
    pub blend_threshold: f32, // boolean blend votes at or above this are "on"
    pub temperature: f32,     // passed straight to the decoder
    pub resample_density: f32, // finalized path points per unit of arc length
    pub min_resample_points: usize,
    pub trigger_epsilon: f64, // seconds a same-channel retrigger gets pushed forward
    pub lookahead: f64,       // how far ahead of the audio clock steps are scheduled
    pub grid_cols: usize,
    pub grid_rows: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            steps: DEFAULT_STEPS,
            beats_per_bar: 4,
            bpm: 60.0,
            blend_threshold: 0.5,
            temperature: 0.5,
            resample_density: 300.0,
            min_resample_points: 100,
            trigger_epsilon: 1e-4,
            lookahead: 0.1,
            grid_cols: 11,
            grid_rows: 11,
        }
    }
}

impl EngineConfig {
    // Fix up values a hand-edited config file could get wrong.
    pub fn sanitized(mut self) -> Self {
        self.steps = self.steps.max(1);
        self.beats_per_bar = self.beats_per_bar.max(1);
        self.bpm = self.bpm.clamp(MIN_BPM, MAX_BPM);
        self.blend_threshold = self.blend_threshold.clamp(0.0, 1.0);
        self.temperature = self.temperature.max(0.0);
        self.resample_density = self.resample_density.max(0.0);
        self.min_resample_points = self.min_resample_points.max(2);
        self.trigger_epsilon = self.trigger_epsilon.max(f64::EPSILON);
        self.lookahead = self.lookahead.max(0.0);
        self.grid_cols = self.grid_cols.max(1);
        self.grid_rows = self.grid_rows.max(1);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectState {
    pub bpm: f32,
    pub pattern: Pattern, // the static pattern the sequencer plays outside path mode
    pub corner_presets: CornerSet<String>,
    pub corner_patterns: CornerSet<Pattern>,
    #[serde(default)]
    pub draw_mode: DrawMode,
}

impl ProjectState {
    pub fn new(config: &EngineConfig) -> Self {
        let corner_presets = presets::default_corner_presets();
        let corner_patterns = corner_presets.map(|name| presets::preset_or_default(name, config.steps).1);
        Self {
            bpm: config.bpm,
            pattern: presets::preset_or_default(presets::DEFAULT_PRESET, config.steps).1,
            corner_presets,
            corner_patterns,
            draw_mode: DrawMode::Drag,
        }
    }

    // A session saved with a different step count is tiled to fit.
    pub fn conformed(mut self, config: &EngineConfig) -> Self {
        let steps = config.steps;
        self.bpm = self.bpm.clamp(MIN_BPM, MAX_BPM);
        self.pattern = self.pattern.resized(steps);
        self.corner_patterns = self.corner_patterns.map(|p| p.resized(steps));
        self
    }
}

impl Default for ProjectState {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}
