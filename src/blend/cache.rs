//! Per-step pad positions and decoded patterns for path playback.
//!
//! A build samples the path once per sequencer step and asks the model for a
//! pattern at each position. Decodes come back one at a time and in any
//! order, so a build collects them off to the side and only replaces the
//! live table once every step has answered. Each build carries a version;
//! replies for anything but the newest build are dropped, which is what keeps
//! a slow, stale build from overwriting a fresher one.

use crate::blend::path::sample_by_arc_length;
use crate::pipeline::pattern::Pattern;
use crate::shared::Point2D;

#[derive(Clone, Debug, PartialEq)]
pub struct PathFrame {
    pub position: Point2D,
    pub pattern: Option<Pattern>, // None: the decode for this step failed
}

/// What the caller has to decode for a freshly started build.
#[derive(Clone, Debug, PartialEq)]
pub struct BuildPlan {
    pub version: u64,
    pub positions: Vec<Point2D>,
}

#[derive(Debug)]
struct PendingBuild {
    version: u64,
    positions: Vec<Point2D>,
    results: Vec<Option<Option<Pattern>>>, // outer None: still waiting
    outstanding: usize,
}

#[derive(Debug, PartialEq)]
pub enum Accepted {
    Stale,    // not the current build, dropped
    Pending,  // stored, other steps still outstanding
    Complete, // last step arrived, live table replaced
}

#[derive(Debug, Default)]
pub struct PathPatternCache {
    version: u64,
    live: Vec<PathFrame>,
    live_version: Option<u64>,
    pending: Option<PendingBuild>,
}

/// Position for every step: step i sits at `i / max(1, steps - 1)` of the path.
pub fn step_positions(path: &[Point2D], steps: usize) -> Vec<Point2D> {
    let denominator = steps.saturating_sub(1).max(1) as f32;
    (0..steps)
        .map(|step| sample_by_arc_length(path, step as f32 / denominator))
        .collect()
}

impl PathPatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new build, superseding any build still in flight.
    ///
    /// A path too short to play empties the cache and returns `None`.
    pub fn begin_build(&mut self, path: &[Point2D], steps: usize) -> Option<BuildPlan> {
        if path.len() < 2 || steps == 0 {
            self.clear();
            return None;
        }
        self.version += 1;
        let positions = step_positions(path, steps);
        self.pending = Some(PendingBuild {
            version: self.version,
            positions: positions.clone(),
            results: vec![None; steps],
            outstanding: steps,
        });
        log::debug!("path cache build v{} started ({steps} steps)", self.version);
        Some(BuildPlan {
            version: self.version,
            positions,
        })
    }

    /// Drop everything, including any build in flight.
    pub fn clear(&mut self) {
        self.version += 1;
        self.live.clear();
        self.live_version = None;
        self.pending = None;
    }

    /// Record the decode result for one step of build `version`.
    pub fn accept(&mut self, version: u64, step: usize, pattern: Option<Pattern>) -> Accepted {
        let Some(pending) = self.pending.as_mut().filter(|p| p.version == version) else {
            log::debug!("dropping stale path decode v{version} step {step}");
            return Accepted::Stale;
        };
        let Some(slot) = pending.results.get_mut(step) else {
            log::warn!("path decode for step {step} is outside build v{version}");
            return Accepted::Stale;
        };
        if slot.is_none() {
            pending.outstanding -= 1;
        }
        *slot = Some(pattern);
        if pending.outstanding > 0 {
            return Accepted::Pending;
        }

        if let Some(done) = self.pending.take() {
            self.live = done
                .positions
                .into_iter()
                .zip(done.results)
                .map(|(position, result)| PathFrame {
                    position,
                    pattern: result.flatten(),
                })
                .collect();
            self.live_version = Some(done.version);
            log::debug!("path cache v{} is live", done.version);
        }
        Accepted::Complete
    }

    pub fn frame(&self, step: usize) -> Option<&PathFrame> {
        self.live.get(step)
    }

    // entry usable for playback at this step
    pub fn pattern_at(&self, step: usize) -> Option<&Pattern> {
        self.frame(step).and_then(|f| f.pattern.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn is_building(&self) -> bool {
        self.pending.is_some()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn live_version(&self) -> Option<u64> {
        self.live_version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::TrackId;

    fn line() -> Vec<Point2D> {
        vec![Point2D::new(0.0, 0.0), Point2D::new(1.0, 0.0)]
    }

    fn marked(step: usize) -> Pattern {
        let mut p = Pattern::empty(4);
        p.set(TrackId::Kick, step, true);
        p
    }

    #[test]
    fn positions_span_the_whole_path() {
        let positions = step_positions(&line(), 5);
        let xs: Vec<f32> = positions.iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![0.0, 0.25, 0.5, 0.75, 1.0]);
    }

    #[test]
    fn single_step_sits_at_the_start() {
        assert_eq!(step_positions(&line(), 1), vec![Point2D::new(0.0, 0.0)]);
    }

    #[test]
    fn short_paths_leave_the_cache_empty() {
        let mut cache = PathPatternCache::new();
        assert!(cache.begin_build(&[Point2D::CENTER], 4).is_none());
        assert!(cache.is_empty());
        assert!(!cache.is_building());
    }

    #[test]
    fn build_goes_live_only_when_complete() {
        let mut cache = PathPatternCache::new();
        let plan = cache.begin_build(&line(), 4).unwrap();
        for step in [3, 0, 2] {
            assert_eq!(cache.accept(plan.version, step, Some(marked(step))), Accepted::Pending);
            assert!(cache.is_empty());
        }
        assert_eq!(cache.accept(plan.version, 1, Some(marked(1))), Accepted::Complete);
        for step in 0..4 {
            assert_eq!(cache.pattern_at(step), Some(&marked(step)));
            assert_eq!(cache.frame(step).unwrap().position, plan.positions[step]);
        }
        assert_eq!(cache.live_version(), Some(plan.version));
    }

    #[test]
    fn failed_steps_become_gaps() {
        let mut cache = PathPatternCache::new();
        let plan = cache.begin_build(&line(), 2).unwrap();
        cache.accept(plan.version, 0, None);
        assert_eq!(cache.accept(plan.version, 1, Some(marked(1))), Accepted::Complete);
        assert!(cache.pattern_at(0).is_none());
        assert!(cache.frame(0).is_some());
        assert!(cache.pattern_at(1).is_some());
    }

    #[test]
    fn newer_build_wins_even_if_older_finishes_last() {
        let mut cache = PathPatternCache::new();
        let first = cache.begin_build(&line(), 2).unwrap();
        let second = cache.begin_build(&line(), 2).unwrap();
        assert!(second.version > first.version);

        cache.accept(second.version, 0, Some(marked(2)));
        cache.accept(second.version, 1, Some(marked(3)));
        assert_eq!(cache.accept(first.version, 0, Some(marked(0))), Accepted::Stale);
        assert_eq!(cache.accept(first.version, 1, Some(marked(1))), Accepted::Stale);

        assert_eq!(cache.pattern_at(0), Some(&marked(2)));
        assert_eq!(cache.pattern_at(1), Some(&marked(3)));
        assert_eq!(cache.live_version(), Some(second.version));
    }

    #[test]
    fn clear_discards_in_flight_builds() {
        let mut cache = PathPatternCache::new();
        let plan = cache.begin_build(&line(), 1).unwrap();
        cache.clear();
        assert_eq!(cache.accept(plan.version, 0, Some(marked(0))), Accepted::Stale);
        assert!(cache.is_empty());
    }

    #[test]
    fn duplicate_replies_do_not_finish_early() {
        let mut cache = PathPatternCache::new();
        let plan = cache.begin_build(&line(), 2).unwrap();
        cache.accept(plan.version, 0, Some(marked(0)));
        assert_eq!(cache.accept(plan.version, 0, Some(marked(0))), Accepted::Pending);
        assert!(cache.is_empty());
    }
}
