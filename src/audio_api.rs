use std::sync::Arc;

pub use crate::audio::{SampleBuffer, StereoFrame};
use crate::shared::TrackId;

#[derive(Clone, Debug)]
pub enum AudioCommand {
    // The engine can't load files (interrupts thread), so the kit is loaded
    // up front (see sample_loader.rs) and each track's buffer is registered
    RegisterSample { track: TrackId, buffer: Arc<SampleBuffer> },

    // Start the track's voice at `at` seconds on the engine clock. Callers
    // keep `at` strictly increasing per track.
    Trigger { track: TrackId, at: f64 },

    // Silence every voice and forget triggers that haven't started yet
    StopAll,
}

// Anything that can play a drum hit at a given time: the live output stream
// or the offline renderer used for export.
pub trait AudioVoice {
    fn trigger(&mut self, track: TrackId, at: f64);
}

// Route a batch of engine commands to a voice sink. Only triggers matter
// offline; the other commands are the live stream's business.
pub fn dispatch_triggers(voice: &mut impl AudioVoice, cmds: &[AudioCommand]) {
    for cmd in cmds {
        if let AudioCommand::Trigger { track, at } = cmd {
            voice.trigger(*track, *at);
        }
    }
}
