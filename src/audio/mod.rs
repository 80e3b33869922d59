use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Context;
use crossbeam_channel::{Receiver, Sender};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::audio_api::{AudioCommand, AudioVoice};
use crate::shared::TrackId;

mod engine;
mod frame;
pub mod render;
mod sample_buffer;
mod voice;

pub use engine::Engine;
pub use frame::StereoFrame;
pub use sample_buffer::SampleBuffer;

// Owns the output stream. Dropping the handle stops the stream and releases
// the device.
pub struct AudioHandle {
    tx: Sender<AudioCommand>,
    clock: Arc<AtomicU64>,
    sample_rate: u32,
    _output_stream: cpal::Stream,
}

impl AudioHandle {
    pub fn send(&self, cmd: AudioCommand) {
        if self.tx.try_send(cmd).is_err() {
            log::warn!("audio command queue full, command dropped");
        }
    }

    // Seconds of audio the device has pulled so far; the transport clock.
    pub fn now(&self) -> f64 {
        self.clock.load(Ordering::Acquire) as f64 / f64::from(self.sample_rate)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl AudioVoice for AudioHandle {
    fn trigger(&mut self, track: TrackId, at: f64) {
        self.send(AudioCommand::Trigger { track, at });
    }
}

pub fn start_audio() -> anyhow::Result<AudioHandle> {
    let (tx, rx) = crossbeam_channel::bounded::<AudioCommand>(1024);

    let host = cpal::default_host();
    let device = host.default_output_device().context("no default output device")?;
    let config = device.default_output_config().context("no default output config")?;

    let sample_rate = config.sample_rate();
    let channels = config.channels() as usize;
    let clock = Arc::new(AtomicU64::new(0));

    match config.sample_format() {
        cpal::SampleFormat::F32 => {
            let output_stream = build_output_stream_f32(
                &device,
                &config.into(),
                rx,
                Engine::new(sample_rate, clock.clone()),
                channels,
            )?;
            output_stream.play().context("failed to play output stream")?;
            log::info!("audio output running at {sample_rate} Hz, {channels} channels");

            Ok(AudioHandle {
                tx,
                clock,
                sample_rate,
                _output_stream: output_stream,
            })
        }
        other => anyhow::bail!("unsupported sample format {other:?} (only f32 supported for now)"),
    }
}

// ── Output stream ─────────────────────────────────────────────────

fn build_output_stream_f32(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    rx: Receiver<AudioCommand>,
    mut engine: Engine,
    channels: usize,
) -> anyhow::Result<cpal::Stream> {
    // grown once on the first callback, reused after that
    let mut scratch: Vec<StereoFrame> = Vec::new();

    let err_fn = |err| log::error!("audio output stream error: {err}");

    let stream = device.build_output_stream(
        config,
        move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
            while let Ok(cmd) = rx.try_recv() {
                engine.handle_cmd(cmd);
            }

            let n_frames = data.len() / channels.max(1);
            if scratch.len() < n_frames {
                scratch.resize(n_frames, StereoFrame::zero());
            }
            let frames = &mut scratch[..n_frames];
            engine.render_block(frames);

            // spread the stereo pair over however many channels the device has
            for (out, frame) in data.chunks_exact_mut(channels.max(1)).zip(frames.iter()) {
                match out {
                    [mono] => *mono = (frame.left + frame.right) * 0.5,
                    [left, right, rest @ ..] => {
                        *left = frame.left;
                        *right = frame.right;
                        rest.fill(0.0);
                    }
                    [] => {}
                }
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}
