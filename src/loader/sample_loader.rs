use std::f32::consts::TAU;
use std::path::Path;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::audio::{SampleBuffer, StereoFrame};
use crate::audio_api::AudioCommand;
use crate::shared::{NUM_TRACKS, TrackId};

// Load a WAV from disk, prepare for registration with the engine
pub fn load(path: &Path, target_rate: u32) -> anyhow::Result<Arc<SampleBuffer>> {
    let buffer = SampleBuffer::load_wav(path, target_rate)?;
    Ok(Arc::new(buffer))
}

// One buffer per track, ready to hand to the engine.
#[derive(Clone, Debug)]
pub struct Kit {
    buffers: [Arc<SampleBuffer>; NUM_TRACKS],
    from_disk: usize,
}

impl Kit {
    // A kit that needs no files at all.
    pub fn synthesized(sample_rate: u32) -> Self {
        Self {
            buffers: TrackId::ALL.map(|t| Arc::new(synthesize(t, sample_rate))),
            from_disk: 0,
        }
    }

    pub fn buffer(&self, track: TrackId) -> &Arc<SampleBuffer> {
        &self.buffers[track.index()]
    }

    // how many voices came from WAV files rather than the synth
    pub fn from_disk(&self) -> usize {
        self.from_disk
    }

    pub fn register_commands(&self) -> Vec<AudioCommand> {
        TrackId::ALL
            .into_iter()
            .map(|track| AudioCommand::RegisterSample {
                track,
                buffer: self.buffer(track).clone(),
            })
            .collect()
    }
}

// Look for each track's voice file (kick.wav, snare.wav, ...) in `dir`.
// Missing or unreadable files get the synthesized voice instead.
pub fn load_kit(dir: &Path, sample_rate: u32) -> Kit {
    let mut kit = Kit::synthesized(sample_rate);
    for track in TrackId::ALL {
        let path = dir.join(track.voice_file());
        if !path.is_file() {
            continue;
        }
        match load(&path, sample_rate) {
            Ok(buffer) => {
                kit.buffers[track.index()] = buffer;
                kit.from_disk += 1;
            }
            Err(e) => log::warn!("could not load {}: {e}, using synth {track}", path.display()),
        }
    }
    log::info!("kit: {} of {NUM_TRACKS} voices from {}", kit.from_disk, dir.display());
    kit
}

// ── Fallback synth ────────────────────────────────────────────────

struct Recipe {
    seconds: f32,
    decay: f32,       // seconds to fall by 1/e
    tone_hz: f32,     // 0 = no tonal part
    tone_drop: f32,   // pitch falls to tone_hz * (1 - tone_drop)
    noise: f32,       // noise mix, 0..1
    gain: f32,
}

fn recipe(track: TrackId) -> Recipe {
    match track {
        TrackId::Kick => Recipe { seconds: 0.4, decay: 0.12, tone_hz: 150.0, tone_drop: 0.65, noise: 0.0, gain: 1.0 },
        TrackId::Snare => Recipe { seconds: 0.25, decay: 0.06, tone_hz: 185.0, tone_drop: 0.1, noise: 0.7, gain: 0.8 },
        TrackId::HatClose => Recipe { seconds: 0.08, decay: 0.015, tone_hz: 0.0, tone_drop: 0.0, noise: 1.0, gain: 0.4 },
        TrackId::HatOpen => Recipe { seconds: 0.45, decay: 0.12, tone_hz: 0.0, tone_drop: 0.0, noise: 1.0, gain: 0.35 },
        TrackId::TomLow => Recipe { seconds: 0.4, decay: 0.12, tone_hz: 100.0, tone_drop: 0.25, noise: 0.05, gain: 0.8 },
        TrackId::TomMid => Recipe { seconds: 0.35, decay: 0.1, tone_hz: 140.0, tone_drop: 0.25, noise: 0.05, gain: 0.8 },
        TrackId::TomHigh => Recipe { seconds: 0.3, decay: 0.09, tone_hz: 190.0, tone_drop: 0.25, noise: 0.05, gain: 0.8 },
        TrackId::Crash => Recipe { seconds: 1.5, decay: 0.45, tone_hz: 0.0, tone_drop: 0.0, noise: 1.0, gain: 0.35 },
        TrackId::Ride => Recipe { seconds: 1.0, decay: 0.3, tone_hz: 3200.0, tone_drop: 0.0, noise: 0.6, gain: 0.25 },
    }
}

pub fn synthesize(track: TrackId, sample_rate: u32) -> SampleBuffer {
    let r = recipe(track);
    let sr = sample_rate.max(1) as f32;
    let len = (r.seconds * sr) as usize;
    let mut rng = StdRng::seed_from_u64(track.index() as u64); // same kit every run
    let mut phase = 0.0f32;

    let data = (0..len)
        .map(|i| {
            let t = i as f32 / sr;
            let env = (-t / r.decay).exp();
            let hz = r.tone_hz * (1.0 - r.tone_drop * (1.0 - env));
            let tone = phase.sin();
            phase = (phase + TAU * hz / sr) % TAU;
            let noise: f32 = rng.gen_range(-1.0..1.0);
            let s = (tone * (1.0 - r.noise) + noise * r.noise) * env * r.gain;
            StereoFrame::mono(s)
        })
        .collect();
    SampleBuffer { data }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synth_kit_covers_every_track_and_stays_in_range() {
        let kit = Kit::synthesized(8000);
        for track in TrackId::ALL {
            let buf = kit.buffer(track);
            assert!(!buf.is_empty(), "{track} is empty");
            assert!(buf.data.iter().all(|f| f.peak() <= 1.0));
        }
        assert_eq!(kit.register_commands().len(), NUM_TRACKS);
        assert_eq!(kit.from_disk(), 0);
    }

    #[test]
    fn closed_hat_is_shorter_than_open_hat() {
        let closed = synthesize(TrackId::HatClose, 8000);
        let open = synthesize(TrackId::HatOpen, 8000);
        assert!(closed.len() < open.len());
    }

    #[test]
    fn wav_on_disk_replaces_the_synth_voice() {
        let dir = std::env::temp_dir().join(format!(
            "beatblend-kit-{}",
            crate::pipeline::persistence::next_beat_id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(dir.join("snare.wav"), spec).unwrap();
        for _ in 0..3 {
            writer.write_sample(1000i16).unwrap();
        }
        writer.finalize().unwrap();
        std::fs::write(dir.join("kick.wav"), b"not a wav").unwrap();

        let kit = load_kit(&dir, 8000);
        assert_eq!(kit.from_disk(), 1);
        assert_eq!(kit.buffer(TrackId::Snare).len(), 3);
        assert!(kit.buffer(TrackId::Kick).len() > 3); // broken file kept the synth
        std::fs::remove_dir_all(&dir).ok();
    }
}
