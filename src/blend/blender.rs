//! Combining the four corner patterns into one.
//!
//! Two ways to get a pattern for a pad position:
//! - threshold voting straight on the corner grids, always available
//! - averaging the corners' latent vectors and handing the result to the
//!   model's decoder, preferred once encodings exist
//!
//! The decode itself runs on the model worker; this module only prepares
//! the averaged latent.

use crate::blend::weights::weights;
use crate::model::LatentVector;
use crate::pipeline::pattern::{CornerSet, Pattern};
use crate::shared::{Corner, TrackId};

pub const DEFAULT_THRESHOLD: f32 = 0.5;

/// Weighted vote of the corner patterns at (x, y).
///
/// A cell is on when the summed weight of corners that have it on reaches
/// `threshold` (a score of exactly the threshold counts as on). Returns
/// `None` when the corners disagree on step count, i.e. the corner set is
/// not complete for the same grid.
pub fn threshold_blend(corners: &CornerSet<Pattern>, x: f32, y: f32, threshold: f32) -> Option<Pattern> {
    let steps = corners.a.steps();
    if corners.iter().any(|(_, p)| p.steps() != steps) {
        return None;
    }
    let w = weights(x, y);
    let mut out = Pattern::empty(steps);
    for track in TrackId::ALL {
        for step in 0..steps {
            let score: f32 = Corner::ALL
                .iter()
                .filter(|corner| corners.get(**corner).get(track, step))
                .map(|corner| w.get(*corner))
                .sum();
            out.set(track, step, score >= threshold);
        }
    }
    Some(out)
}

/// Element-wise weighted average of the corner latents at (x, y).
///
/// `None` if the four vectors don't share one dimensionality.
pub fn average_latent(encodings: &CornerSet<LatentVector>, x: f32, y: f32) -> Option<LatentVector> {
    let dim = encodings.a.len();
    if dim == 0 || encodings.iter().any(|(_, z)| z.len() != dim) {
        return None;
    }
    let w = weights(x, y);
    let avg: LatentVector = (0..dim)
        .map(|i| {
            Corner::ALL
                .iter()
                .map(|corner| encodings.get(*corner)[i] * w.get(*corner))
                .sum::<f32>()
        })
        .collect();
    Some(avg)
}
