//! Bilinear corner weights for a pad position.

use crate::shared::Corner;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlendWeights {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
}

impl BlendWeights {
    pub fn get(&self, corner: Corner) -> f32 {
        match corner {
            Corner::A => self.a,
            Corner::B => self.b,
            Corner::C => self.c,
            Corner::D => self.d,
        }
    }

    pub fn sum(&self) -> f32 {
        self.a + self.b + self.c + self.d
    }
}

/// Weights of the four corners at (x, y). Callers clamp to [0,1] first; the
/// weights are then non-negative and sum to 1.
pub fn weights(x: f32, y: f32) -> BlendWeights {
    BlendWeights {
        a: (1.0 - x) * (1.0 - y),
        b: x * (1.0 - y),
        c: (1.0 - x) * y,
        d: x * y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corners_get_full_weight() {
        assert_eq!(weights(0.0, 0.0), BlendWeights { a: 1.0, b: 0.0, c: 0.0, d: 0.0 });
        assert_eq!(weights(1.0, 0.0), BlendWeights { a: 0.0, b: 1.0, c: 0.0, d: 0.0 });
        assert_eq!(weights(0.0, 1.0), BlendWeights { a: 0.0, b: 0.0, c: 1.0, d: 0.0 });
        assert_eq!(weights(1.0, 1.0), BlendWeights { a: 0.0, b: 0.0, c: 0.0, d: 1.0 });
    }

    #[test]
    fn weights_partition_unity_across_the_pad() {
        for i in 0..=20 {
            for j in 0..=20 {
                let (x, y) = (i as f32 / 20.0, j as f32 / 20.0);
                let w = weights(x, y);
                assert!((w.sum() - 1.0).abs() < 1e-6, "({x},{y}) sums to {}", w.sum());
                for corner in Corner::ALL {
                    assert!(w.get(corner) >= 0.0);
                }
            }
        }
    }

    #[test]
    fn centre_is_an_even_split() {
        let w = weights(0.5, 0.5);
        for corner in Corner::ALL {
            assert_eq!(w.get(corner), 0.25);
        }
    }
}
