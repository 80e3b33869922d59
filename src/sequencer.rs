//! The transport: which step fires when, and the per-channel trigger clock.
//!
//! Step times are computed against the audio clock and handed out a little
//! ahead of time (see `Middle::tick`), so the sequencer itself never waits on
//! anything. It only knows indices and times; which pattern a step plays is
//! decided by the caller.

use crate::shared::{NUM_TRACKS, TrackId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransportState {
    Stopped,
    Running,
}

/// One firing of step `index` at `time` seconds on the audio clock.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StepEvent {
    pub index: usize,
    pub time: f64,
}

/// Last dispatched trigger time per channel.
///
/// The audio side may reject or reorder two starts of the same voice at the
/// same instant, so a trigger that would not land strictly after the previous
/// one on its channel is pushed to `previous + epsilon`.
#[derive(Clone, Debug)]
pub struct TriggerClock {
    last: [Option<f64>; NUM_TRACKS],
    epsilon: f64,
}

impl TriggerClock {
    pub fn new(epsilon: f64) -> Self {
        Self {
            last: [None; NUM_TRACKS],
            epsilon,
        }
    }

    pub fn reset(&mut self) {
        self.last = [None; NUM_TRACKS];
    }

    /// Time to actually dispatch a trigger wanted at `time`.
    pub fn claim(&mut self, track: TrackId, time: f64) -> f64 {
        let slot = &mut self.last[track.index()];
        let at = match *slot {
            Some(prev) => time.max(prev + self.epsilon),
            None => time,
        };
        *slot = Some(at);
        at
    }

    pub fn last(&self, track: TrackId) -> Option<f64> {
        self.last[track.index()]
    }
}

#[derive(Clone, Debug)]
pub struct StepSequencer {
    state: TransportState,
    steps: usize,
    beats_per_bar: u32,
    bpm: f32,
    // next step fires at anchor_time + ticks * step_duration; re-anchored on tempo changes
    anchor_time: f64,
    ticks: u64,
    next_index: usize,
    clock: TriggerClock,
}

impl StepSequencer {
    pub fn new(steps: usize, beats_per_bar: u32, bpm: f32, trigger_epsilon: f64) -> Self {
        Self {
            state: TransportState::Stopped,
            steps: steps.max(1),
            beats_per_bar: beats_per_bar.max(1),
            bpm,
            anchor_time: 0.0,
            ticks: 0,
            next_index: 0,
            clock: TriggerClock::new(trigger_epsilon),
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TransportState::Running
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn bpm(&self) -> f32 {
        self.bpm
    }

    /// Seconds per step: one bar of `beats_per_bar` beats split into `steps`.
    pub fn step_duration(&self) -> f64 {
        60.0 / f64::from(self.bpm) * f64::from(self.beats_per_bar) / self.steps as f64
    }

    pub fn bar_duration(&self) -> f64 {
        self.step_duration() * self.steps as f64
    }

    /// Begin at step 0, firing at `at`. Trigger bookkeeping starts fresh.
    pub fn start(&mut self, at: f64) {
        self.state = TransportState::Running;
        self.anchor_time = at;
        self.ticks = 0;
        self.next_index = 0;
        self.clock.reset();
    }

    /// Stop firing. Anything not yet handed out is simply never produced.
    pub fn stop(&mut self) {
        self.state = TransportState::Stopped;
        self.ticks = 0;
        self.next_index = 0;
        self.clock.reset();
    }

    /// Change tempo. While running, the step already due keeps its time and
    /// the new spacing applies from there on.
    pub fn set_bpm(&mut self, bpm: f32) {
        if self.is_running() {
            self.anchor_time = self.next_time();
            self.ticks = 0;
        }
        self.bpm = bpm;
    }

    pub fn next_time(&self) -> f64 {
        self.anchor_time + self.ticks as f64 * self.step_duration()
    }

    /// Every step due before `horizon`, in order. Wraps from the last step
    /// straight back to step 0.
    pub fn advance(&mut self, horizon: f64) -> Vec<StepEvent> {
        let mut due = Vec::new();
        if !self.is_running() {
            return due;
        }
        loop {
            let time = self.next_time();
            if time >= horizon {
                break;
            }
            due.push(StepEvent {
                index: self.next_index,
                time,
            });
            self.ticks += 1;
            self.next_index = (self.next_index + 1) % self.steps;
        }
        due
    }

    /// Dispatch time for `track` wanted at `time`; see [`TriggerClock`].
    pub fn claim_trigger(&mut self, track: TrackId, time: f64) -> f64 {
        self.clock.claim(track, time)
    }

    pub fn trigger_clock(&self) -> &TriggerClock {
        &self.clock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_duration_follows_tempo() {
        let seq = StepSequencer::new(16, 4, 60.0, 1e-4);
        assert_eq!(seq.step_duration(), 0.25);
        assert_eq!(seq.bar_duration(), 4.0);
        let seq = StepSequencer::new(16, 4, 120.0, 1e-4);
        assert_eq!(seq.step_duration(), 0.125);
    }

    #[test]
    fn stopped_transport_fires_nothing() {
        let mut seq = StepSequencer::new(16, 4, 60.0, 1e-4);
        assert!(seq.advance(100.0).is_empty());
    }

    #[test]
    fn loop_wraps_with_exactly_one_step_between() {
        let mut seq = StepSequencer::new(16, 4, 60.0, 1e-4);
        seq.start(0.0);
        let events = seq.advance(4.0 + 0.001);
        assert_eq!(events.len(), 17);
        assert_eq!(events[15].index, 15);
        assert_eq!(events[16].index, 0);
        assert_eq!(events[16].time - events[15].time, seq.step_duration());
        for pair in events.windows(2) {
            assert_eq!(pair[1].time - pair[0].time, 0.25);
        }
    }

    #[test]
    fn advancing_in_slices_matches_one_big_advance() {
        let mut whole = StepSequencer::new(8, 4, 90.0, 1e-4);
        let mut sliced = whole.clone();
        whole.start(1.0);
        sliced.start(1.0);
        let all = whole.advance(10.0);
        let mut parts = Vec::new();
        let mut t: f64 = 1.0;
        while t < 10.0 {
            t += 0.016;
            parts.extend(sliced.advance(t.min(10.0)));
        }
        assert_eq!(all, parts);
    }

    #[test]
    fn tempo_change_keeps_the_pending_step() {
        let mut seq = StepSequencer::new(16, 4, 60.0, 1e-4);
        seq.start(0.0);
        seq.advance(0.3); // steps 0 and 1 fired, step 2 due at 0.5
        seq.set_bpm(120.0);
        let events = seq.advance(0.8);
        assert_eq!(events[0], StepEvent { index: 2, time: 0.5 });
        assert_eq!(events[1], StepEvent { index: 3, time: 0.625 });
    }

    #[test]
    fn restart_begins_at_step_zero() {
        let mut seq = StepSequencer::new(4, 4, 60.0, 1e-4);
        seq.start(0.0);
        seq.advance(2.5);
        seq.stop();
        seq.start(10.0);
        assert_eq!(seq.advance(10.1), vec![StepEvent { index: 0, time: 10.0 }]);
    }

    #[test]
    fn same_channel_triggers_strictly_increase() {
        let mut clock = TriggerClock::new(1e-4);
        let a = clock.claim(TrackId::Kick, 1.0);
        let b = clock.claim(TrackId::Kick, 1.0);
        let c = clock.claim(TrackId::Kick, 0.5);
        assert_eq!(a, 1.0);
        assert!(b >= a + 1e-4);
        assert!(c >= b + 1e-4);
        // other channels are independent
        assert_eq!(clock.claim(TrackId::Snare, 1.0), 1.0);
    }

    #[test]
    fn later_triggers_pass_through_untouched() {
        let mut clock = TriggerClock::new(1e-4);
        clock.claim(TrackId::Ride, 1.0);
        assert_eq!(clock.claim(TrackId::Ride, 2.0), 2.0);
        clock.reset();
        assert_eq!(clock.last(TrackId::Ride), None);
        assert_eq!(clock.claim(TrackId::Ride, 0.5), 0.5);
    }
}
