// Offline bounce for beat export: the same engine the sound card hears,
// driven by a fake clock and written to a WAV file instead.
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use anyhow::Context;

use crate::audio_api::{AudioCommand, dispatch_triggers};
use crate::loader::sample_loader::Kit;

use super::engine::Engine;
use super::frame::StereoFrame;

const BLOCK: usize = 512;

// Render `duration` seconds of the given commands. Trigger times are seconds
// from the start of the bounce.
pub fn render_offline(kit: &Kit, cmds: &[AudioCommand], duration: f64, sample_rate: u32) -> Vec<StereoFrame> {
    let mut engine = Engine::new(sample_rate, Arc::new(AtomicU64::new(0)));
    for cmd in kit.register_commands() {
        engine.handle_cmd(cmd);
    }
    dispatch_triggers(&mut engine, cmds);

    let total = (duration.max(0.0) * f64::from(sample_rate)).round() as usize;
    let mut out = vec![StereoFrame::zero(); total];
    for block in out.chunks_mut(BLOCK) {
        engine.render_block(block);
    }
    out
}

pub fn write_wav(path: &Path, frames: &[StereoFrame], sample_rate: u32) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer =
        hound::WavWriter::create(path, spec).with_context(|| format!("creating {}", path.display()))?;
    for frame in frames {
        writer.write_sample(to_i16(frame.left))?;
        writer.write_sample(to_i16(frame.right))?;
    }
    writer.finalize()?;
    Ok(())
}

fn to_i16(s: f32) -> i16 {
    (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::TrackId;

    #[test]
    fn bounce_has_requested_length_and_hits_on_time() {
        let kit = Kit::synthesized(1000);
        let cmds = vec![
            AudioCommand::Trigger { track: TrackId::Kick, at: 0.0 },
            AudioCommand::Trigger { track: TrackId::Snare, at: 0.5 },
            AudioCommand::StopAll, // ignored offline
        ];
        let frames = render_offline(&kit, &cmds, 1.0, 1000);
        assert_eq!(frames.len(), 1000);
        assert!(frames[..5].iter().any(|f| f.peak() > 0.0));
    }

    #[test]
    fn wav_is_written_as_stereo_sixteen_bit() {
        let path = std::env::temp_dir().join(format!(
            "beatblend-bounce-{}.wav",
            crate::pipeline::persistence::next_beat_id()
        ));
        let frames = vec![StereoFrame { left: 0.5, right: -2.0 }; 8];
        write_wav(&path, &frames, 8000).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 2);
        assert_eq!(reader.spec().sample_rate, 8000);
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples.len(), 16);
        assert_eq!(samples[0], (0.5 * i16::MAX as f32) as i16);
        assert_eq!(samples[1], -i16::MAX); // clipped
        std::fs::remove_file(&path).ok();
    }
}
