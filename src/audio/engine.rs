use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::audio_api::{AudioCommand, AudioVoice};
use crate::shared::{NUM_TRACKS, TrackId};

use super::frame::StereoFrame;
use super::sample_buffer::SampleBuffer;
use super::voice::Voice;

const MAX_PENDING: usize = 1024; // hard cap so we wont grow in the audio callback
const VOICE_GAIN: f32 = 0.8;

#[derive(Clone, Copy, Debug)]
struct ScheduledTrigger {
    frame: u64,
    track: TrackId,
}

// Runs on the audio thread. One voice per track: a new hit on a track
// restarts it, and a closed hat chokes the open one like on a real kit.
pub struct Engine {
    sample_rate: f64,
    kit: [Option<Arc<SampleBuffer>>; NUM_TRACKS],
    voices: [Option<Voice>; NUM_TRACKS],
    pending: Vec<ScheduledTrigger>, // sorted by frame
    frame: u64,
    clock: Arc<AtomicU64>, // frames rendered so far, read by the transport
}

impl Engine {
    pub fn new(sample_rate: u32, clock: Arc<AtomicU64>) -> Self {
        Self {
            sample_rate: f64::from(sample_rate),
            kit: std::array::from_fn(|_| None),
            voices: std::array::from_fn(|_| None),
            pending: Vec::with_capacity(MAX_PENDING),
            frame: 0,
            clock,
        }
    }

    pub fn now(&self) -> f64 {
        self.frame as f64 / self.sample_rate
    }

    pub fn handle_cmd(&mut self, cmd: AudioCommand) {
        match cmd {
            AudioCommand::RegisterSample { track, buffer } => {
                self.kit[track.index()] = Some(buffer);
            }
            AudioCommand::Trigger { track, at } => self.schedule(track, at),
            AudioCommand::StopAll => {
                self.voices = std::array::from_fn(|_| None);
                self.pending.clear();
            }
        }
    }

    fn schedule(&mut self, track: TrackId, at: f64) {
        if self.pending.len() >= MAX_PENDING {
            return; // drop rather than allocate on the audio thread
        }
        // late triggers play right away
        let frame = ((at * self.sample_rate).round().max(0.0) as u64).max(self.frame);
        let idx = self.pending.partition_point(|t| t.frame <= frame);
        self.pending.insert(idx, ScheduledTrigger { frame, track });
    }

    fn start_voice(&mut self, track: TrackId) {
        if self.kit[track.index()].is_none() {
            return;
        }
        if track == TrackId::HatClose {
            self.voices[TrackId::HatOpen.index()] = None;
        }
        self.voices[track.index()] = Some(Voice::new(1.0, VOICE_GAIN));
    }

    fn render_voices(&mut self, out: &mut [StereoFrame]) {
        for (slot, buffer) in self.voices.iter_mut().zip(self.kit.iter()) {
            let (Some(voice), Some(buffer)) = (slot.as_mut(), buffer.as_ref()) else {
                continue;
            };
            voice.render_into(buffer, out);
            if !voice.active {
                *slot = None;
            }
        }
    }

    // Fill `frames` with the next block, starting voices on their exact frame.
    pub fn render_block(&mut self, frames: &mut [StereoFrame]) {
        frames.fill(StereoFrame::zero());

        let block_start = self.frame;
        let block_end = block_start + frames.len() as u64;
        let mut cursor = 0usize;

        while let Some(next) = self.pending.first().copied() {
            if next.frame >= block_end {
                break;
            }
            let offset = (next.frame.saturating_sub(block_start)) as usize;
            if offset > cursor {
                self.render_voices(&mut frames[cursor..offset]);
                cursor = offset;
            }
            self.pending.remove(0);
            self.start_voice(next.track);
        }
        if cursor < frames.len() {
            self.render_voices(&mut frames[cursor..]);
        }

        self.frame = block_end;
        self.clock.store(self.frame, Ordering::Release);
    }

    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|v| v.is_some()).count()
    }
}

impl AudioVoice for Engine {
    fn trigger(&mut self, track: TrackId, at: f64) {
        self.schedule(track, at);
    }
}
