// The engine. Owns every piece of pad and transport state; the tui feeds it
// InputEvents and draws its DisplayState, main forwards its AudioCommands to
// the output stream.
//
// Everything here runs on the shell's thread. The only concurrency is the
// model worker: requests go out tagged with a Ticket, replies come back
// through `tick`, and anything that is no longer the newest request of its
// kind is dropped on arrival.

use std::collections::VecDeque;

use crate::audio_api::AudioCommand;
use crate::blend::{CellGrid, PathPatternCache, average_latent, finalize_path, threshold_blend};
use crate::model::{LatentVector, ModelClient, ModelReply, ModelRequest, Ticket};
use crate::pipeline::pattern::{CornerSet, Pattern};
use crate::pipeline::persistence::{BeatDescriptor, unix_millis};
use crate::pipeline::presets;
use crate::pipeline::project::{EngineConfig, MAX_BPM, MIN_BPM, ProjectState};
use crate::sequencer::{StepEvent, StepSequencer};
use crate::shared::{CellView, Corner, DisplayState, DrawMode, InputEvent, PadMode, Point2D, TrackId};

const CUSTOM_PRESET: &str = "Custom";

// A full pad interpolation in flight ("done editing").
struct Interpolation {
    job: u64,
    resume: bool, // transport was running when the job started
    encodings: Option<CornerSet<LatentVector>>,
    cells: Vec<Option<Pattern>>,
    outstanding: usize,
}

// A fired step waiting for the audio clock to reach it before the grid
// cursor moves there.
struct Cursor {
    at: f64,
    step: usize,
    position: Option<Point2D>,
}

pub struct Middle {
    config: EngineConfig,
    state: ProjectState,
    sequencer: StepSequencer,
    model: ModelClient,

    encodings: Option<CornerSet<LatentVector>>,
    encode_seq: u64,
    blend_seq: u64,
    job_seq: u64,
    interpolation: Option<Interpolation>,

    cache: PathPatternCache,
    cells: CellGrid,
    path: Vec<Point2D>,
    stroke: Vec<Point2D>,
    // static pattern from before path playback took over the grid
    path_snapshot: Option<Pattern>,

    pad_mode: PadMode,
    selected_corner: Option<Corner>,
    puck: Point2D,
    selected_cell: usize,

    now: f64,
    cursors: VecDeque<Cursor>,
    current_step: Option<usize>,
    playback_position: Option<Point2D>,
    display_text: String,
}

impl Middle {
    pub fn new(config: EngineConfig, state: ProjectState, model: ModelClient) -> Self {
        let config = config.sanitized();
        let state = state.conformed(&config);
        let sequencer = StepSequencer::new(config.steps, config.beats_per_bar, state.bpm, config.trigger_epsilon);
        let cells = CellGrid::new(config.grid_cols, config.grid_rows);
        let selected_cell = cells.to_cell(Point2D::CENTER).index;
        let mut middle = Self {
            config,
            state,
            sequencer,
            model,
            encodings: None,
            encode_seq: 0,
            blend_seq: 0,
            job_seq: 0,
            interpolation: None,
            cache: PathPatternCache::new(),
            cells,
            path: Vec::new(),
            stroke: Vec::new(),
            path_snapshot: None,
            pad_mode: PadMode::Interpolate,
            selected_corner: None,
            puck: Point2D::CENTER,
            selected_cell,
            now: 0.0,
            cursors: VecDeque::new(),
            current_step: None,
            playback_position: None,
            display_text: String::new(),
        };
        middle.request_encodings();
        middle
    }

    pub fn handle_input(&mut self, event: InputEvent) -> Vec<AudioCommand> {
        match event {
            InputEvent::Quit | InputEvent::ExportBeat => {} // handled by the shell
            InputEvent::TogglePlay => return self.toggle_play(),
            InputEvent::AdjustBpm(delta) => self.set_bpm(self.state.bpm + delta),
            InputEvent::ClearPattern => self.clear_pattern(),
            InputEvent::ToggleStep { track, step } => match (self.pad_mode, self.selected_corner) {
                (PadMode::Edit, Some(corner)) => self.toggle_corner_step(corner, track, step),
                _ => self.state.pattern.toggle(track, step),
            },
            InputEvent::ToggleDrawMode => {
                let next = match self.state.draw_mode {
                    DrawMode::Drag => DrawMode::Path,
                    DrawMode::Path => DrawMode::Drag,
                };
                self.set_draw_mode(next);
            }
            InputEvent::PadPress(p) => match self.state.draw_mode {
                DrawMode::Drag => self.blend_at(p.x, p.y),
                DrawMode::Path => self.begin_stroke(p),
            },
            InputEvent::PadDrag(p) => match self.state.draw_mode {
                DrawMode::Drag => self.blend_at(p.x, p.y),
                DrawMode::Path => self.extend_stroke(p),
            },
            InputEvent::PadRelease => {
                if self.state.draw_mode == DrawMode::Path {
                    self.end_stroke();
                }
            }
            InputEvent::NudgePuck { dx, dy } => {
                if self.state.draw_mode == DrawMode::Drag {
                    self.blend_at(self.puck.x + dx, self.puck.y + dy);
                }
            }
            InputEvent::ToggleEditMode => match self.pad_mode {
                PadMode::Interpolate => self.set_mode(PadMode::Edit),
                PadMode::Edit => return self.finish_editing(),
            },
            InputEvent::SelectCorner(corner) => self.select_corner(corner),
            InputEvent::CyclePreset(delta) => match self.selected_corner {
                Some(corner) => {
                    let next = presets::cycle_preset(self.state.corner_presets.get(corner), delta);
                    self.apply_preset_to_selected_corner(next);
                }
                None => self.display_text = "select a corner first (a/b/c/d)".to_string(),
            },
        }
        vec![]
    }

    // Advance to `now` (seconds on the audio clock): apply model replies,
    // schedule every step due within the lookahead window.
    pub fn tick(&mut self, now: f64) -> Vec<AudioCommand> {
        self.now = now;
        let mut cmds = Vec::new();

        for reply in self.model.drain() {
            self.apply_reply(reply);
        }

        let horizon = now + self.config.lookahead;
        for event in self.sequencer.advance(horizon) {
            self.fire_step(event, &mut cmds);
        }

        while let Some(cursor) = self.cursors.front() {
            if cursor.at > now {
                break;
            }
            self.current_step = Some(cursor.step);
            self.playback_position = cursor.position;
            self.cursors.pop_front();
        }
        cmds
    }

    // ── transport ─────────────────────────────────────────────────

    pub fn set_playing(&mut self, playing: bool) -> Vec<AudioCommand> {
        match (playing, self.sequencer.is_running()) {
            (true, false) => {
                self.sequencer.start(self.now + self.config.lookahead);
                log::info!("transport started at {:.1} bpm", self.state.bpm);
                vec![]
            }
            (false, true) => {
                self.sequencer.stop();
                self.restore_static_pattern();
                self.cursors.clear();
                self.current_step = None;
                self.playback_position = None;
                log::info!("transport stopped");
                vec![AudioCommand::StopAll]
            }
            _ => vec![],
        }
    }

    pub fn toggle_play(&mut self) -> Vec<AudioCommand> {
        let playing = self.sequencer.is_running();
        self.set_playing(!playing)
    }

    pub fn set_bpm(&mut self, bpm: f32) {
        let bpm = bpm.clamp(MIN_BPM, MAX_BPM);
        self.state.bpm = bpm;
        self.sequencer.set_bpm(bpm);
    }

    fn fire_step(&mut self, event: StepEvent, cmds: &mut Vec<AudioCommand>) {
        let mut position = None;
        let mut active = None;
        if self.path_playback_active() {
            if let Some(frame) = self.cache.frame(event.index) {
                position = Some(frame.position);
                active = frame.pattern.clone();
            }
        } else {
            // cache emptied under a running path: play the static pattern again
            self.restore_static_pattern();
        }

        let pattern = match active {
            Some(path_pattern) => {
                // the grid follows the path; keep what it replaced
                if self.path_snapshot.is_none() {
                    self.path_snapshot = Some(self.state.pattern.clone());
                }
                self.state.pattern = path_pattern;
                &self.state.pattern
            }
            None => self.active_pattern(),
        };

        let hits: Vec<TrackId> = pattern.hits_at(event.index).collect();
        for track in hits {
            let at = self.sequencer.claim_trigger(track, event.time);
            cmds.push(AudioCommand::Trigger { track, at });
        }
        self.cursors.push_back(Cursor {
            at: event.time,
            step: event.index,
            position,
        });
    }

    fn path_playback_active(&self) -> bool {
        self.state.draw_mode == DrawMode::Path && self.pad_mode == PadMode::Interpolate && !self.cache.is_empty()
    }

    fn restore_static_pattern(&mut self) {
        if let Some(pattern) = self.path_snapshot.take() {
            log::debug!("path playback ended, static pattern restored");
            self.state.pattern = pattern;
        }
    }

    // What the sequencer plays and the grid shows right now.
    fn active_pattern(&self) -> &Pattern {
        match (self.pad_mode, self.selected_corner) {
            (PadMode::Edit, Some(corner)) => self.state.corner_patterns.get(corner),
            _ => &self.state.pattern,
        }
    }

    // ── static pattern ────────────────────────────────────────────

    pub fn set_pattern(&mut self, pattern: Pattern) {
        let pattern = pattern.resized(self.config.steps);
        if self.path_snapshot.is_some() {
            self.path_snapshot = Some(pattern.clone());
        }
        self.state.pattern = pattern;
    }

    pub fn clear_pattern(&mut self) {
        self.set_pattern(Pattern::empty(self.config.steps));
    }

    // ── corners ───────────────────────────────────────────────────

    pub fn set_corner_preset(&mut self, corner: Corner, name: &str) {
        let (name, pattern) = presets::preset_or_default(name, self.config.steps);
        *self.state.corner_presets.get_mut(corner) = name;
        *self.state.corner_patterns.get_mut(corner) = pattern;
        self.corners_changed();
    }

    pub fn set_corner_pattern(&mut self, corner: Corner, pattern: Pattern) {
        *self.state.corner_presets.get_mut(corner) = CUSTOM_PRESET.to_string();
        *self.state.corner_patterns.get_mut(corner) = pattern.resized(self.config.steps);
        self.corners_changed();
    }

    pub fn toggle_corner_step(&mut self, corner: Corner, track: TrackId, step: usize) {
        if step >= self.config.steps {
            return;
        }
        self.state.corner_patterns.get_mut(corner).toggle(track, step);
        self.corners_changed();
    }

    // Selecting a corner opens it for editing.
    pub fn select_corner(&mut self, corner: Corner) {
        self.selected_corner = Some(corner);
        self.set_mode(PadMode::Edit);
    }

    pub fn apply_preset_to_selected_corner(&mut self, name: &str) {
        match self.selected_corner {
            Some(corner) => {
                self.set_corner_preset(corner, name);
                self.display_text = format!("{}: {}", corner.label(), self.state.corner_presets.get(corner));
            }
            None => log::debug!("no corner selected, preset {name:?} not applied"),
        }
    }

    // Any corner edit throws the whole encoding set away and asks for a new one.
    fn corners_changed(&mut self) {
        if let Some(job) = self.interpolation.take() {
            log::info!("corners changed, abandoning interpolation {}", job.job);
            if job.resume {
                self.set_playing(true);
            }
        }
        self.request_encodings();
    }

    fn request_encodings(&mut self) {
        self.encodings = None;
        self.cache.clear();
        self.encode_seq += 1;
        let request = ModelRequest::Encode {
            ticket: Ticket::Encodings(self.encode_seq),
            corners: self.state.corner_patterns.clone(),
        };
        if let Err(e) = self.model.submit(request) {
            log::error!("could not request corner encodings: {e}");
        }
    }

    // ── modes ─────────────────────────────────────────────────────

    pub fn set_mode(&mut self, mode: PadMode) {
        match mode {
            PadMode::Edit => {
                if self.selected_corner.is_none() {
                    self.selected_corner = Some(Corner::A);
                }
                self.stroke.clear();
            }
            PadMode::Interpolate => self.selected_corner = None,
        }
        self.pad_mode = mode;
    }

    // Leave edit mode: encode the corners, decode every pad cell, install
    // it all at once. Playback pauses while this runs.
    pub fn finish_editing(&mut self) -> Vec<AudioCommand> {
        if self.interpolation.is_some() {
            log::debug!("interpolation already running");
            return vec![];
        }
        let resume = self.sequencer.is_running();
        let cmds = self.set_playing(false);

        self.job_seq += 1;
        let job = self.job_seq;
        let request = ModelRequest::Encode {
            ticket: Ticket::GridEncode(job),
            corners: self.state.corner_patterns.clone(),
        };
        self.interpolation = Some(Interpolation {
            job,
            resume,
            encodings: None,
            cells: vec![None; self.cells.len()],
            outstanding: self.cells.len(),
        });
        self.display_text = "interpolating...".to_string();
        log::info!("interpolation {job} started ({} cells)", self.cells.len());

        if let Err(e) = self.model.submit(request) {
            self.fail_interpolation(&format!("{e}"));
        }
        cmds
    }

    fn fail_interpolation(&mut self, reason: &str) {
        log::warn!("interpolation failed: {reason}");
        let resume = self.interpolation.take().is_some_and(|job| job.resume);
        self.set_mode(PadMode::Interpolate);
        self.display_text = "interpolation failed".to_string();
        if resume {
            self.set_playing(true);
        }
    }

    fn install_interpolation(&mut self, job: Interpolation) {
        let Interpolation {
            job: id,
            resume,
            encodings,
            cells,
            ..
        } = job;
        let cells: Option<Vec<Pattern>> = cells.into_iter().collect();
        let (Some(encodings), Some(cells)) = (encodings, cells) else {
            self.fail_interpolation("incomplete result");
            return;
        };

        self.encodings = Some(encodings);
        self.encode_seq += 1; // an older Encodings reply would only repeat this
        self.cells.set_patterns(cells);
        self.set_mode(PadMode::Interpolate);
        self.rebuild_path_cache();
        self.display_text = "pad ready".to_string();
        log::info!("interpolation {id} installed");
        if resume {
            self.set_playing(true);
        }
    }

    // ── draw modes and paths ──────────────────────────────────────

    pub fn set_draw_mode(&mut self, mode: DrawMode) {
        if self.state.draw_mode == mode {
            return;
        }
        if self.state.draw_mode == DrawMode::Path {
            self.restore_static_pattern();
            self.playback_position = None;
        }
        self.path.clear();
        self.stroke.clear();
        self.cache.clear();
        self.state.draw_mode = mode;
    }

    pub fn begin_stroke(&mut self, p: Point2D) {
        self.stroke.clear();
        self.stroke.push(p.clamped());
    }

    pub fn extend_stroke(&mut self, p: Point2D) {
        self.stroke.push(p.clamped());
    }

    pub fn end_stroke(&mut self) {
        let raw = std::mem::take(&mut self.stroke);
        self.submit_path(&raw);
    }

    // Resample a finished stroke and rebuild the path cache from it. A stroke
    // of fewer than two points leaves no path at all.
    pub fn submit_path(&mut self, raw: &[Point2D]) {
        let raw: Vec<Point2D> = raw.iter().map(|p| p.clamped()).collect();
        self.path = finalize_path(&raw, self.config.resample_density, self.config.min_resample_points);
        if self.path.is_empty() {
            log::debug!("stroke of {} points discarded", raw.len());
        }
        self.rebuild_path_cache();
    }

    fn rebuild_path_cache(&mut self) {
        let Some(encodings) = &self.encodings else {
            self.cache.clear();
            return;
        };
        let Some(plan) = self.cache.begin_build(&self.path, self.config.steps) else {
            return;
        };
        for (step, pos) in plan.positions.iter().enumerate() {
            let submitted = average_latent(encodings, pos.x, pos.y).map(|latent| {
                self.model.submit(ModelRequest::Decode {
                    ticket: Ticket::PathStep {
                        version: plan.version,
                        step,
                    },
                    latent,
                    temperature: self.config.temperature,
                })
            });
            match submitted {
                Some(Ok(())) => {}
                Some(Err(e)) => {
                    log::warn!("path step {step} not requested: {e}");
                    self.cache.accept(plan.version, step, None);
                }
                None => {
                    log::warn!("corner encodings disagree on size, path step {step} skipped");
                    self.cache.accept(plan.version, step, None);
                }
            }
        }
    }

    // ── direct blending ───────────────────────────────────────────

    // Blend the corners at one pad position. With encodings this asks the
    // model and the newest reply wins; without them it votes on the grids.
    pub fn blend_at(&mut self, x: f32, y: f32) {
        if self.pad_mode == PadMode::Edit {
            return;
        }
        let p = Point2D::new(x, y).clamped();
        self.puck = p;
        self.selected_cell = self.cells.to_cell(p).index;

        if let Some(latent) = self.encodings.as_ref().and_then(|e| average_latent(e, p.x, p.y)) {
            self.blend_seq += 1;
            let request = ModelRequest::Decode {
                ticket: Ticket::Blend(self.blend_seq),
                latent,
                temperature: self.config.temperature,
            };
            match self.model.submit(request) {
                Ok(()) => return,
                Err(e) => log::warn!("blend decode not requested: {e}"),
            }
        }

        match threshold_blend(&self.state.corner_patterns, p.x, p.y, self.config.blend_threshold) {
            Some(pattern) => self.state.pattern = pattern,
            None => log::warn!("corner patterns incomplete, blend at ({:.2}, {:.2}) ignored", p.x, p.y),
        }
    }

    // ── model replies ─────────────────────────────────────────────

    fn conform(&self, pattern: Pattern) -> Option<Pattern> {
        if pattern.steps() == self.config.steps {
            Some(pattern)
        } else {
            log::warn!("model returned {} steps, expected {}", pattern.steps(), self.config.steps);
            None
        }
    }

    fn apply_reply(&mut self, reply: ModelReply) {
        match reply {
            ModelReply::Encoded {
                ticket: Ticket::Encodings(seq),
                result,
            } => {
                if seq != self.encode_seq {
                    log::debug!("dropping stale encodings #{seq}");
                    return;
                }
                match result {
                    Ok(encodings) => {
                        self.encodings = Some(encodings);
                        self.rebuild_path_cache();
                    }
                    Err(e) => log::warn!("corner encoding failed: {e}"),
                }
            }
            ModelReply::Encoded {
                ticket: Ticket::GridEncode(job),
                result,
            } => self.apply_grid_encodings(job, result.map_err(|e| e.to_string())),
            ModelReply::Decoded {
                ticket: Ticket::Blend(seq),
                result,
            } => {
                if seq != self.blend_seq {
                    log::debug!("dropping superseded blend #{seq}");
                    return;
                }
                if self.state.draw_mode != DrawMode::Drag || self.pad_mode != PadMode::Interpolate {
                    return;
                }
                match result {
                    Ok(pattern) => {
                        if let Some(pattern) = self.conform(pattern) {
                            self.state.pattern = pattern;
                        }
                    }
                    Err(e) => log::warn!("blend decode failed: {e}"),
                }
            }
            ModelReply::Decoded {
                ticket: Ticket::PathStep { version, step },
                result,
            } => {
                let pattern = match result {
                    Ok(pattern) => self.conform(pattern),
                    Err(e) => {
                        log::warn!("path step {step} decode failed: {e}");
                        None
                    }
                };
                self.cache.accept(version, step, pattern);
            }
            ModelReply::Decoded {
                ticket: Ticket::GridCell { job, index },
                result,
            } => self.apply_grid_cell(job, index, result.map_err(|e| e.to_string())),
            other => log::warn!("unexpected model reply for {:?}", other.ticket()),
        }
    }

    fn apply_grid_encodings(&mut self, job: u64, result: Result<CornerSet<LatentVector>, String>) {
        if self.interpolation.as_ref().map(|j| j.job) != Some(job) {
            log::debug!("dropping encodings for abandoned interpolation {job}");
            return;
        }
        let encodings = match result {
            Ok(encodings) => encodings,
            Err(e) => return self.fail_interpolation(&e),
        };

        let mut failed = None;
        for (index, center) in self.cells.centers().into_iter().enumerate() {
            let Some(latent) = average_latent(&encodings, center.x, center.y) else {
                failed = Some("corner encodings disagree on size".to_string());
                break;
            };
            let request = ModelRequest::Decode {
                ticket: Ticket::GridCell { job, index },
                latent,
                temperature: self.config.temperature,
            };
            if let Err(e) = self.model.submit(request) {
                failed = Some(e.to_string());
                break;
            }
        }
        match failed {
            Some(reason) => self.fail_interpolation(&reason),
            None => {
                if let Some(current) = self.interpolation.as_mut() {
                    current.encodings = Some(encodings);
                }
            }
        }
    }

    fn apply_grid_cell(&mut self, job: u64, index: usize, result: Result<Pattern, String>) {
        let Some(current) = self.interpolation.as_ref().filter(|j| j.job == job) else {
            log::debug!("dropping cell {index} for abandoned interpolation {job}");
            return;
        };
        if index >= current.cells.len() {
            return;
        }
        let pattern = match result {
            Ok(pattern) => self.conform(pattern),
            Err(e) => return self.fail_interpolation(&e),
        };
        let Some(pattern) = pattern else {
            return self.fail_interpolation("cell pattern has the wrong size");
        };

        let Some(current) = self.interpolation.as_mut() else {
            return;
        };
        if current.cells[index].is_none() {
            current.outstanding -= 1;
        }
        current.cells[index] = Some(pattern);
        if current.outstanding == 0 {
            if let Some(done) = self.interpolation.take() {
                self.install_interpolation(done);
            }
        }
    }

    // ── observables ───────────────────────────────────────────────

    pub fn now(&self) -> f64 {
        self.now
    }

    pub fn is_playing(&self) -> bool {
        self.sequencer.is_running()
    }

    pub fn is_busy(&self) -> bool {
        self.interpolation.is_some()
    }

    pub fn current_step(&self) -> Option<usize> {
        self.current_step
    }

    pub fn playback_position(&self) -> Option<Point2D> {
        self.playback_position
    }

    pub fn pattern(&self) -> &Pattern {
        self.active_pattern()
    }

    // The pattern outside path playback: what leaving path mode restores.
    pub fn static_pattern(&self) -> &Pattern {
        self.path_snapshot.as_ref().unwrap_or(&self.state.pattern)
    }

    pub fn encodings_ready(&self) -> bool {
        self.encodings.is_some()
    }

    pub fn path(&self) -> &[Point2D] {
        &self.path
    }

    pub fn path_cache(&self) -> &PathPatternCache {
        &self.cache
    }

    pub fn cell_pattern(&self, index: usize) -> Option<&Pattern> {
        self.cells.pattern(index)
    }

    pub fn corner_pattern(&self, corner: Corner) -> &Pattern {
        self.state.corner_patterns.get(corner)
    }

    pub fn pad_mode(&self) -> PadMode {
        self.pad_mode
    }

    pub fn draw_mode(&self) -> DrawMode {
        self.state.draw_mode
    }

    pub fn bpm(&self) -> f32 {
        self.state.bpm
    }

    pub fn step_duration(&self) -> f64 {
        self.sequencer.step_duration()
    }

    pub fn set_display_text(&mut self, text: impl Into<String>) {
        self.display_text = text.into();
    }

    // What gets saved on quit. Path playback never leaks into the session.
    pub fn session(&self) -> ProjectState {
        let mut state = self.state.clone();
        state.pattern = self.static_pattern().clone();
        state
    }

    // ── export ────────────────────────────────────────────────────

    // Triggers for one bar starting at t = 0, the way playback would sound it.
    pub fn bar_schedule(&self) -> Vec<AudioCommand> {
        let use_path = self.path_playback_active();
        let step_duration = self.sequencer.step_duration();
        let mut cmds = Vec::new();
        for step in 0..self.config.steps {
            let pattern = use_path
                .then(|| self.cache.pattern_at(step))
                .flatten()
                .unwrap_or_else(|| self.static_pattern());
            let at = step as f64 * step_duration;
            cmds.extend(pattern.hits_at(step).map(|track| AudioCommand::Trigger { track, at }));
        }
        cmds
    }

    pub fn bar_duration(&self) -> f64 {
        self.sequencer.bar_duration()
    }

    pub fn beat_descriptor(&self, title: &str) -> BeatDescriptor {
        let title = match title.trim() {
            "" => format!("Beat {}", unix_millis() / 1000),
            t => t.to_string(),
        };
        let steps = self.config.steps;
        let bpm = self.state.bpm;
        let duration = (60.0 / f64::from(bpm) * (steps as f64 / 4.0) * 100.0).round() / 100.0;
        let bars = ((steps as f64 / 16.0).round() as u32).max(1);

        let mut genres: Vec<String> = Vec::new();
        for (_, name) in self.state.corner_presets.iter() {
            if !genres.contains(name) {
                genres.push(name.clone());
            }
        }
        let path = self.path_playback_active();
        BeatDescriptor {
            title,
            bpm,
            duration,
            bars,
            pattern: self.static_pattern().clone(),
            genres,
            moods: if path { vec!["path".to_string()] } else { vec![] },
            description: format!("{} BPM · {} beat", bpm.round(), if path { "path" } else { "grid" }),
            corner_presets: self.state.corner_presets.clone(),
            audio_file: None,
        }
    }

    pub fn display_state(&self) -> DisplayState {
        let cells = self
            .cells
            .densities()
            .into_iter()
            .enumerate()
            .map(|(index, density)| CellView { index, density })
            .collect();
        DisplayState {
            pattern: self.active_pattern().clone(),
            current_step: self.current_step,
            playing: self.sequencer.is_running(),
            bpm: self.state.bpm,
            steps: self.config.steps,
            draw_mode: self.state.draw_mode,
            pad_mode: self.pad_mode,
            selected_corner: self.selected_corner,
            corner_presets: self.state.corner_presets.clone(),
            puck: self.puck,
            selected_cell: self.selected_cell,
            playback_position: self.playback_position,
            path: self.path.clone(),
            stroke: self.stroke.clone(),
            grid_cols: self.cells.cols(),
            grid_rows: self.cells.rows(),
            cells,
            busy: self.is_busy(),
            encodings_ready: self.encodings.is_some(),
            path_ready: !self.cache.is_empty(),
            display_text: self.display_text.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelError;
    use crossbeam_channel::{Receiver, Sender};

    struct Harness {
        middle: Middle,
        requests: Receiver<ModelRequest>,
        replies: Sender<ModelReply>,
    }

    fn harness() -> Harness {
        let (req_tx, req_rx) = crossbeam_channel::unbounded();
        let (reply_tx, reply_rx) = crossbeam_channel::unbounded();
        let config = EngineConfig {
            grid_cols: 2,
            grid_rows: 2,
            ..EngineConfig::default()
        };
        let middle = Middle::new(config, ProjectState::default(), ModelClient::from_channels(req_tx, reply_rx));
        Harness {
            middle,
            requests: req_rx,
            replies: reply_tx,
        }
    }

    fn pending(h: &Harness) -> Vec<ModelRequest> {
        h.requests.try_iter().collect()
    }

    fn encode_ticket(req: &ModelRequest) -> Option<Ticket> {
        match req {
            ModelRequest::Encode { ticket, .. } => Some(*ticket),
            _ => None,
        }
    }

    #[test]
    fn startup_asks_for_encodings() {
        let h = harness();
        let reqs = pending(&h);
        assert_eq!(reqs.len(), 1);
        assert_eq!(encode_ticket(&reqs[0]), Some(Ticket::Encodings(1)));
        assert!(!h.middle.encodings_ready());
    }

    #[test]
    fn drag_without_encodings_votes_on_the_corners() {
        let mut h = harness();
        h.middle.blend_at(0.0, 0.0);
        assert_eq!(h.middle.pattern(), h.middle.corner_pattern(Corner::A));
        h.middle.blend_at(1.0, 1.0);
        assert_eq!(h.middle.pattern(), h.middle.corner_pattern(Corner::D));
        assert_eq!(h.middle.display_state().selected_cell, 3);
    }

    #[test]
    fn corner_edit_invalidates_encodings() {
        let mut h = harness();
        pending(&h);
        h.replies
            .send(ModelReply::Encoded {
                ticket: Ticket::Encodings(1),
                result: Ok(CornerSet::from_fn(|_| vec![0.0; 4])),
            })
            .unwrap();
        h.middle.tick(0.0);
        assert!(h.middle.encodings_ready());

        h.middle.toggle_corner_step(Corner::B, TrackId::Kick, 3);
        assert!(!h.middle.encodings_ready());
        let reqs = pending(&h);
        assert_eq!(encode_ticket(&reqs[0]), Some(Ticket::Encodings(2)));
    }

    #[test]
    fn unknown_preset_falls_back_to_rock() {
        let mut h = harness();
        h.middle.set_corner_preset(Corner::C, "Polka 9000");
        let ds = h.middle.display_state();
        assert_eq!(ds.corner_presets.c, presets::DEFAULT_PRESET);
        assert_eq!(
            h.middle.corner_pattern(Corner::C),
            &presets::preset(presets::DEFAULT_PRESET, 16).unwrap()
        );
    }

    #[test]
    fn edit_mode_shows_and_edits_the_selected_corner() {
        let mut h = harness();
        let before = h.middle.pattern().clone();
        h.middle.handle_input(InputEvent::SelectCorner(Corner::D));
        assert_eq!(h.middle.pad_mode(), PadMode::Edit);
        assert_eq!(h.middle.pattern(), h.middle.corner_pattern(Corner::D));

        let was = h.middle.corner_pattern(Corner::D).get(TrackId::Ride, 0);
        h.middle.handle_input(InputEvent::ToggleStep {
            track: TrackId::Ride,
            step: 0,
        });
        assert_eq!(h.middle.corner_pattern(Corner::D).get(TrackId::Ride, 0), !was);
        assert_eq!(h.middle.static_pattern(), &before);
    }

    #[test]
    fn finish_editing_installs_cells_atomically() {
        let mut h = harness();
        h.middle.select_corner(Corner::A);
        pending(&h);
        h.middle.finish_editing();
        assert!(h.middle.is_busy());
        assert!(h.middle.finish_editing().is_empty()); // already running: no-op

        let reqs = pending(&h);
        assert_eq!(reqs.len(), 1);
        assert_eq!(encode_ticket(&reqs[0]), Some(Ticket::GridEncode(1)));
        h.replies
            .send(ModelReply::Encoded {
                ticket: Ticket::GridEncode(1),
                result: Ok(CornerSet::from_fn(|_| vec![1.0; 2])),
            })
            .unwrap();
        h.middle.tick(0.0);
        let cells: Vec<Ticket> = pending(&h)
            .iter()
            .filter_map(|r| match r {
                ModelRequest::Decode { ticket, .. } => Some(*ticket),
                _ => None,
            })
            .collect();
        assert_eq!(cells.len(), 4);

        for (i, ticket) in cells.iter().enumerate() {
            assert_eq!(h.middle.cell_pattern(0), None);
            h.replies
                .send(ModelReply::Decoded {
                    ticket: *ticket,
                    result: Ok(Pattern::empty(16)),
                })
                .unwrap();
            h.middle.tick(i as f64 * 0.01);
        }
        assert!(!h.middle.is_busy());
        assert!(h.middle.encodings_ready());
        assert_eq!(h.middle.pad_mode(), PadMode::Interpolate);
        assert_eq!(h.middle.cell_pattern(3), Some(&Pattern::empty(16)));
        assert_eq!(h.middle.display_state().cells.len(), 4);
    }

    #[test]
    fn failed_interpolation_keeps_prior_state() {
        let mut h = harness();
        h.middle.set_playing(true);
        h.middle.set_mode(PadMode::Edit);
        let cmds = h.middle.finish_editing();
        assert!(matches!(cmds.as_slice(), [AudioCommand::StopAll]));
        assert!(!h.middle.is_playing());

        h.replies
            .send(ModelReply::Encoded {
                ticket: Ticket::GridEncode(1),
                result: Err(ModelError::Encode("boom".to_string())),
            })
            .unwrap();
        h.middle.tick(0.0);
        assert!(!h.middle.is_busy());
        assert_eq!(h.middle.pad_mode(), PadMode::Interpolate);
        assert!(!h.middle.encodings_ready());
        assert!(h.middle.is_playing()); // resumed
    }

    #[test]
    fn bpm_is_clamped() {
        let mut h = harness();
        h.middle.set_bpm(1000.0);
        assert_eq!(h.middle.bpm(), MAX_BPM);
        h.middle.handle_input(InputEvent::AdjustBpm(-5000.0));
        assert_eq!(h.middle.bpm(), MIN_BPM);
    }

    #[test]
    fn beat_descriptor_metadata() {
        let mut h = harness();
        h.middle.set_bpm(120.0);
        h.middle.set_corner_preset(Corner::B, "Rock 1");
        let beat = h.middle.beat_descriptor("  ");
        assert!(beat.title.starts_with("Beat "));
        assert_eq!(beat.duration, 2.0);
        assert_eq!(beat.bars, 1);
        assert_eq!(beat.genres, vec!["Rock 1", "Reggaeton", "Samba Full Time"]);
        assert!(beat.moods.is_empty());
        assert_eq!(beat.description, "120 BPM · grid beat");
        assert_eq!(h.middle.beat_descriptor(" Late Night ").title, "Late Night");
    }

    #[test]
    fn bar_schedule_spaces_hits_by_step() {
        let mut h = harness();
        h.middle.set_pattern(Pattern::from_rows(16, &[(TrackId::Kick, "x...x...x...x...")]));
        let times: Vec<f64> = h
            .middle
            .bar_schedule()
            .iter()
            .filter_map(|c| match c {
                AudioCommand::Trigger { at, .. } => Some(*at),
                _ => None,
            })
            .collect();
        assert_eq!(times, vec![0.0, 1.0, 2.0, 3.0]);
    }
}
