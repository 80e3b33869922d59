use std::path::Path;

use super::frame::StereoFrame;

#[derive(Clone, Debug, Default)]
pub struct SampleBuffer {
    pub data: Vec<StereoFrame>, // the audio data array
}

impl SampleBuffer {
    // Load a WAV file from disk into the sample buffer, converted to stereo at `target_rate`
    pub fn load_wav(path: &Path, target_rate: u32) -> anyhow::Result<Self> {
        let mut reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        let file_rate = spec.sample_rate;
        let file_channels = spec.channels as usize;

        // Read the samples from the WAV file
        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader // float, just pass it through
                .samples::<f32>()
                .collect::<Result<Vec<_>, _>>()?,
            hound::SampleFormat::Int => { // int, convert to float
                let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|x| x as f32 / max))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };

        if file_channels == 0 {
            anyhow::bail!("{} has no channels", path.display());
        }

        let mut frames: Vec<StereoFrame> = if file_channels == 1 {
            samples.into_iter().map(StereoFrame::mono).collect() // mono, duplicate
        } else {
            samples
                .chunks_exact(file_channels) // keep the first two channels
                .map(|c| StereoFrame {
                    left: c[0],
                    right: c[1],
                })
                .collect()
        };

        if file_rate != target_rate {
            frames = resample_linear(&frames, file_rate, target_rate);
        }

        Ok(Self { data: frames })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

fn resample_linear(frames: &[StereoFrame], source_rate: u32, target_rate: u32) -> Vec<StereoFrame> {
    // simple linear resampler; drum hits are short enough that nobody hears the difference
    if source_rate == target_rate || source_rate == 0 {
        return frames.to_vec();
    }
    let ratio = target_rate as f64 / source_rate as f64;
    let out_len = (frames.len() as f64 * ratio).ceil() as usize;
    let mut out = Vec::with_capacity(out_len);

    for i in 0..out_len {
        // fractional position in the source buffer
        let src_pos = i as f64 / ratio; // ex. 3.7
        let idx = src_pos.floor() as usize; // ex. 3
        let frac = (src_pos - idx as f64) as f32; // ex. 0.7
        if idx >= frames.len().saturating_sub(1) { // edge case
            out.push(frames.last().copied().unwrap_or_default());
        } else {
            let a = frames[idx];
            let b = frames[idx + 1];
            out.push(StereoFrame { // blend via frac and linear interpolation
                left: a.left * (1.0 - frac) + b.left * frac,
                right: a.right * (1.0 - frac) + b.right * frac,
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsampling_doubles_length_and_interpolates() {
        let frames = vec![StereoFrame::mono(0.0), StereoFrame::mono(1.0)];
        let out = resample_linear(&frames, 22050, 44100);
        assert_eq!(out.len(), 4);
        assert_eq!(out[1], StereoFrame::mono(0.5));
    }

    #[test]
    fn wav_round_trip_through_hound() {
        let path = std::env::temp_dir().join(format!(
            "beatblend-sample-{}.wav",
            crate::pipeline::persistence::next_beat_id()
        ));
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 44100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for s in [0i16, 16384, -16384, 0] {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();

        let buffer = SampleBuffer::load_wav(&path, 44100).unwrap();
        assert_eq!(buffer.len(), 4);
        assert_eq!(buffer.data[1], StereoFrame::mono(0.5));
        assert_eq!(buffer.data[2], StereoFrame::mono(-0.5));
        std::fs::remove_file(&path).ok();
    }
}
