// The step data the whole engine passes around.
//
// "pattern": one bar of drums, a row of on/off steps for every track.
// "corner set": four of something (patterns, presets, latent vectors) pinned
// to the corners of the blend pad.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::shared::{Corner, NUM_TRACKS, TrackId};

// Every track is always present and every row has exactly `steps` entries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PatternRepr", into = "PatternRepr")]
pub struct Pattern {
    steps: usize,
    rows: [Vec<bool>; NUM_TRACKS],
}

impl Pattern {
    pub fn empty(steps: usize) -> Self {
        Self {
            steps,
            rows: std::array::from_fn(|_| vec![false; steps]),
        }
    }

    // Build from text rows like "x...x...x...x..." ('x' = hit); tracks not
    // listed stay silent, rows are cut/padded to `steps`.
    pub fn from_rows(steps: usize, rows: &[(TrackId, &str)]) -> Self {
        let mut pattern = Self::empty(steps);
        for (track, row) in rows {
            for (step, ch) in row.chars().filter(|c| !c.is_whitespace()).take(steps).enumerate() {
                pattern.rows[track.index()][step] = matches!(ch, 'x' | 'X');
            }
        }
        pattern
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn get(&self, track: TrackId, step: usize) -> bool {
        self.rows[track.index()].get(step).copied().unwrap_or(false)
    }

    pub fn set(&mut self, track: TrackId, step: usize, on: bool) {
        if let Some(cell) = self.rows[track.index()].get_mut(step) {
            *cell = on;
        }
    }

    pub fn toggle(&mut self, track: TrackId, step: usize) {
        let on = self.get(track, step);
        self.set(track, step, !on);
    }

    pub fn row(&self, track: TrackId) -> &[bool] {
        &self.rows[track.index()]
    }

    // tracks that hit on this step, in track order
    pub fn hits_at(&self, step: usize) -> impl Iterator<Item = TrackId> + '_ {
        TrackId::ALL.into_iter().filter(move |t| self.get(*t, step))
    }

    pub fn hit_count(&self) -> usize {
        self.rows.iter().map(|r| r.iter().filter(|on| **on).count()).sum()
    }

    // fraction of lit cells, used for the pad heat map
    pub fn density(&self) -> f32 {
        let total = NUM_TRACKS * self.steps;
        if total == 0 {
            return 0.0;
        }
        self.hit_count() as f32 / total as f32
    }

    // Repeat (or cut) the bar so it has `steps` steps. Presets are written
    // at 16 steps and tile onto 32-step engines.
    pub fn resized(&self, steps: usize) -> Self {
        if steps == self.steps {
            return self.clone();
        }
        let mut out = Self::empty(steps);
        if self.steps == 0 {
            return out;
        }
        for track in TrackId::ALL {
            for step in 0..steps {
                out.set(track, step, self.get(track, step % self.steps));
            }
        }
        out
    }
}

// Serialized form: { "kick": [true, false, ...], ... }
#[derive(Serialize, Deserialize)]
struct PatternRepr(BTreeMap<TrackId, Vec<bool>>);

impl TryFrom<PatternRepr> for Pattern {
    type Error = String;

    fn try_from(repr: PatternRepr) -> Result<Self, Self::Error> {
        let steps = repr.0.values().next().map(|r| r.len()).unwrap_or(0);
        let mut pattern = Pattern::empty(steps);
        for track in TrackId::ALL {
            let row = repr
                .0
                .get(&track)
                .ok_or_else(|| format!("pattern is missing track {track}"))?;
            if row.len() != steps {
                return Err(format!(
                    "track {track} has {} steps, expected {steps}",
                    row.len()
                ));
            }
            pattern.rows[track.index()] = row.clone();
        }
        Ok(pattern)
    }
}

impl From<Pattern> for PatternRepr {
    fn from(pattern: Pattern) -> Self {
        let Pattern { rows, .. } = pattern;
        PatternRepr(TrackId::ALL.into_iter().zip(rows).collect())
    }
}

// Exactly four values, one per pad corner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CornerSet<T> {
    pub a: T,
    pub b: T,
    pub c: T,
    pub d: T,
}

impl<T> CornerSet<T> {
    pub fn from_fn(mut f: impl FnMut(Corner) -> T) -> Self {
        Self {
            a: f(Corner::A),
            b: f(Corner::B),
            c: f(Corner::C),
            d: f(Corner::D),
        }
    }

    pub fn get(&self, corner: Corner) -> &T {
        match corner {
            Corner::A => &self.a,
            Corner::B => &self.b,
            Corner::C => &self.c,
            Corner::D => &self.d,
        }
    }

    pub fn get_mut(&mut self, corner: Corner) -> &mut T {
        match corner {
            Corner::A => &mut self.a,
            Corner::B => &mut self.b,
            Corner::C => &mut self.c,
            Corner::D => &mut self.d,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Corner, &T)> {
        Corner::ALL.into_iter().map(move |c| (c, self.get(c)))
    }

    pub fn map<U>(&self, mut f: impl FnMut(&T) -> U) -> CornerSet<U> {
        CornerSet::from_fn(|c| f(self.get(c)))
    }
}
