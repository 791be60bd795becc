//! Collaborator interfaces of the scheduler
//!
//! The scheduler never produces sound or touches a display itself. It talks to
//! an [`AudioSink`], which owns the audio clock and starts samples at
//! requested clock times, and a [`VisualSink`], which receives highlight and
//! flash events once they are due.

use super::types::{ScheduledNote, VisualEvent};
use crate::keymap::Pitch;

/// Sample playback keyed by pitch, plus the audio clock
pub trait AudioSink {
    /// Start `pitch` at `start` seconds on the audio clock.
    /// A start time in the future must not sound early.
    fn schedule_note(&mut self, pitch: Pitch, start: f64);

    /// Current audio clock time, in seconds
    fn current_time(&self) -> f64;

    /// Called when playback starts, e.g. to resume a suspended audio context
    fn ensure_ready(&mut self) {}
}

/// Receiver of due visual events
pub trait VisualSink {
    fn emit(&mut self, event: VisualEvent);
}

impl VisualSink for Vec<VisualEvent> {
    fn emit(&mut self, event: VisualEvent) {
        self.push(event);
    }
}

/// A clock that can be moved forward by hand, for offline runs
pub trait SteppedClock {
    fn advance(&mut self, seconds: f64);
}

/// Audio sink that records every scheduled note against a manual clock
#[derive(Debug, Clone, Default)]
pub struct RecordingAudio {
    pub now: f64,
    pub notes: Vec<ScheduledNote>,
    pub ready_calls: usize,
}

impl RecordingAudio {
    pub fn new() -> Self {
        Self::default()
    }

    /// A recorder whose clock starts at `now`
    pub fn at(now: f64) -> Self {
        Self {
            now,
            ..Self::default()
        }
    }

    pub fn set_time(&mut self, now: f64) {
        self.now = now;
    }
}

impl AudioSink for RecordingAudio {
    fn schedule_note(&mut self, pitch: Pitch, start: f64) {
        self.notes.push(ScheduledNote { pitch, time: start });
    }

    fn current_time(&self) -> f64 {
        self.now
    }

    fn ensure_ready(&mut self) {
        self.ready_calls += 1;
    }
}

impl SteppedClock for RecordingAudio {
    fn advance(&mut self, seconds: f64) {
        self.now += seconds;
    }
}

/// Wraps another sink and keeps a copy of every scheduled note
#[derive(Debug, Clone)]
pub struct Tap<A> {
    pub inner: A,
    pub notes: Vec<ScheduledNote>,
}

impl<A> Tap<A> {
    pub fn new(inner: A) -> Self {
        Self {
            inner,
            notes: Vec::new(),
        }
    }
}

impl<A: AudioSink> AudioSink for Tap<A> {
    fn schedule_note(&mut self, pitch: Pitch, start: f64) {
        self.notes.push(ScheduledNote { pitch, time: start });
        self.inner.schedule_note(pitch, start);
    }

    fn current_time(&self) -> f64 {
        self.inner.current_time()
    }

    fn ensure_ready(&mut self) {
        self.inner.ensure_ready();
    }
}

impl<A: SteppedClock> SteppedClock for Tap<A> {
    fn advance(&mut self, seconds: f64) {
        self.inner.advance(seconds);
    }
}
