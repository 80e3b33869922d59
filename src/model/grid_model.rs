// Small in-process latent model so the studio works without a network model.
//
// The latent space is the grid itself: one dimension per (track, step) cell,
// +1 for a hit and -1 for a rest. Averaging corner latents therefore gives
// every cell a "how many corners want this" score, and decoding turns that
// score into a hit probability that the temperature sharpens or softens.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::model::{LatentVector, ModelError, PatternDecoder, PatternEncoder, Result};
use crate::pipeline::pattern::{CornerSet, Pattern};
use crate::shared::{NUM_TRACKS, TrackId};

const GAIN: f32 = 4.0; // how decisive a full +/-1 score is at temperature 1

pub struct GridModel {
    steps: usize,
    rng: StdRng,
}

impl GridModel {
    pub fn new(steps: usize) -> Self {
        Self {
            steps,
            rng: StdRng::from_entropy(),
        }
    }

    // reproducible decodes, for tests
    pub fn with_seed(steps: usize, seed: u64) -> Self {
        Self {
            steps,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn latent_dim(&self) -> usize {
        NUM_TRACKS * self.steps
    }

    fn encode_one(&self, pattern: &Pattern) -> Result<LatentVector> {
        if pattern.steps() != self.steps {
            return Err(ModelError::Shape(format!(
                "pattern has {} steps, model expects {}",
                pattern.steps(),
                self.steps
            )));
        }
        let mut z = Vec::with_capacity(self.latent_dim());
        for track in TrackId::ALL {
            z.extend(pattern.row(track).iter().map(|on| if *on { 1.0 } else { -1.0 }));
        }
        Ok(z)
    }
}

fn sigmoid(v: f32) -> f32 {
    1.0 / (1.0 + (-v).exp())
}

impl PatternEncoder for GridModel {
    fn encode(&mut self, corners: &CornerSet<Pattern>) -> Result<CornerSet<LatentVector>> {
        Ok(CornerSet {
            a: self.encode_one(&corners.a)?,
            b: self.encode_one(&corners.b)?,
            c: self.encode_one(&corners.c)?,
            d: self.encode_one(&corners.d)?,
        })
    }
}

impl PatternDecoder for GridModel {
    fn decode(&mut self, latent: &[f32], temperature: f32) -> Result<Pattern> {
        if latent.len() != self.latent_dim() {
            return Err(ModelError::Shape(format!(
                "latent has {} dims, model expects {}",
                latent.len(),
                self.latent_dim()
            )));
        }
        if latent.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::Decode("latent contains non-finite values".to_string()));
        }

        let mut pattern = Pattern::empty(self.steps);
        for (i, score) in latent.iter().enumerate() {
            let track = TrackId::ALL[i / self.steps];
            let step = i % self.steps;
            let on = if temperature <= 0.0 {
                *score > 0.0
            } else {
                let p = sigmoid(score * GAIN / temperature);
                self.rng.gen_bool(f64::from(p.clamp(0.0, 1.0)))
            };
            pattern.set(track, step, on);
        }
        Ok(pattern)
    }
}
