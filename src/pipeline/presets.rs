// Named one-bar drum presets the corners can be loaded from.
// Written at 16 steps (4 per beat); `Pattern::resized` tiles them for other
// step counts.

use crate::pipeline::pattern::{CornerSet, Pattern};
use crate::shared::TrackId::{self, *};

pub const DEFAULT_PRESET: &str = "Rock 1";

type Rows = &'static [(TrackId, &'static str)];

const PRESETS: &[(&str, Rows)] = &[
    (
        "Rock 1",
        &[
            (Kick, "x.......x.x....."),
            (Snare, "....x.......x..."),
            (HatClose, "x.x.x.x.x.x.x.x."),
            (Crash, "x..............."),
        ],
    ),
    (
        "Rock 2",
        &[
            (Kick, "x.....x.x.x....."),
            (Snare, "....x.......x..x"),
            (HatClose, "xxxxxxxxxxxxxxxx"),
        ],
    ),
    (
        "Pop Punk",
        &[
            (Kick, "x.x...x.x.x...x."),
            (Snare, "....x.......x..."),
            (HatOpen, "x.x.x.x.x.x.x.x."),
            (Crash, "x..............."),
        ],
    ),
    (
        "Reggaeton",
        &[
            (Kick, "x...x...x...x..."),
            (Snare, "...x..x....x..x."),
            (HatClose, "x.x.x.x.x.x.x.x."),
        ],
    ),
    (
        "Samba Full Time",
        &[
            (Kick, "x..xx..xx..xx..x"),
            (HatClose, "xx.xxx.xxx.xxx.x"),
            (TomLow, "..x...x...x...x."),
            (TomHigh, "x.....x...x....."),
            (Ride, "x.x.x.x.x.x.x.x."),
        ],
    ),
    (
        "Funk",
        &[
            (Kick, "x.x.......x..x.."),
            (Snare, "....x..x.x..x..."),
            (HatClose, "xxxxxxx.xxxxxxx."),
            (HatOpen, ".......x.......x"),
        ],
    ),
    (
        "Hip Hop",
        &[
            (Kick, "x......x..x....."),
            (Snare, "....x.......x..."),
            (HatClose, "x.x.x.x.x.x.x.xx"),
        ],
    ),
    (
        "Tom Fill",
        &[
            (Kick, "x...x...x...x..."),
            (TomHigh, "xx.............."),
            (TomMid, "....xx.........."),
            (TomLow, "........xx.xx..."),
            (Crash, "..............x."),
        ],
    ),
];

pub fn preset_names() -> impl Iterator<Item = &'static str> {
    PRESETS.iter().map(|(name, _)| *name)
}

pub fn preset(name: &str, steps: usize) -> Option<Pattern> {
    PRESETS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, rows)| Pattern::from_rows(16, rows).resized(steps))
}

// Unknown names fall back to the default preset.
pub fn preset_or_default(name: &str, steps: usize) -> (String, Pattern) {
    match preset(name, steps) {
        Some(p) => (name.to_string(), p),
        None => {
            log::warn!("unknown preset {name:?}, using {DEFAULT_PRESET}");
            let fallback = preset(DEFAULT_PRESET, steps).unwrap_or_else(|| Pattern::empty(steps));
            (DEFAULT_PRESET.to_string(), fallback)
        }
    }
}

// Neighbour of `current` in the preset list, wrapping around.
pub fn cycle_preset(current: &str, delta: i32) -> &'static str {
    let count = PRESETS.len() as i32;
    let idx = PRESETS.iter().position(|(n, _)| *n == current).unwrap_or(0) as i32;
    PRESETS[(idx + delta).rem_euclid(count) as usize].0
}

pub fn default_corner_presets() -> CornerSet<String> {
    CornerSet {
        a: "Rock 1".to_string(),
        b: "Pop Punk".to_string(),
        c: "Reggaeton".to_string(),
        d: "Samba Full Time".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_preset_parses_at_sixteen_steps() {
        for name in preset_names() {
            let p = preset(name, 16).unwrap();
            assert_eq!(p.steps(), 16);
            assert!(p.hit_count() > 0, "{name} is empty");
        }
    }

    #[test]
    fn default_corners_are_real_presets() {
        let corners = default_corner_presets();
        for (_, name) in corners.iter() {
            assert!(preset(name, 16).is_some());
        }
    }

    #[test]
    fn unknown_preset_falls_back() {
        let (name, pattern) = preset_or_default("Polka", 16);
        assert_eq!(name, DEFAULT_PRESET);
        assert_eq!(pattern, preset(DEFAULT_PRESET, 16).unwrap());
    }

    #[test]
    fn cycling_wraps_both_ways() {
        let first = preset_names().next().unwrap();
        let last = preset_names().last().unwrap();
        assert_eq!(cycle_preset(last, 1), first);
        assert_eq!(cycle_preset(first, -1), last);
    }
}
