//! # Playback Module
//!
//! Lookahead autoplay of song sheets, with audio and visuals kept in step on
//! one audio clock.
//!
//! ## Purpose
//! Sheet playback has two consumers with different timing needs:
//! 1. **Audio** - notes must be handed to the audio subsystem *before* they
//!    are due, with an exact start time on the audio clock
//! 2. **Visuals** - line highlights and key flashes must appear *when* the
//!    note sounds, not when it was scheduled
//!
//! The scheduler therefore runs two loops over one cursor:
//! - the **scheduling tick** (every ~25ms) dispatches every token starting
//!   within the lookahead horizon (~100ms) to the audio sink and queues the
//!   matching visual cues with the same clock times
//! - the **reconciliation pass** (once per frame) releases queued cues whose
//!   time has come, in order
//!
//! ## Sub-modules
//! - `types` - PlayState, Cursor, cues, visual events, EngineConfig
//! - `sinks` - AudioSink / VisualSink traits and recording implementations
//! - `engine` - The Scheduler state machine
//! - `timeline` - Offline runs on a stepped clock
//!
//! ## States
//! ```text
//!            play                pause
//! Stopped ---------> Playing ----------> Paused
//!    ^                 |  ^                 |
//!    |      stop /     |  +-----------------+
//!    +--- end of song -+         play
//! ```
//! Paused keeps the cursor and queued cues; Stopped rewinds to line 0.
//!
//! ## Example
//! ```rust
//! use pianola::playback::{RecordingAudio, Scheduler, VisualEvent};
//! use pianola::Song;
//!
//! let mut scheduler = Scheduler::new(RecordingAudio::new(), Vec::<VisualEvent>::new());
//! scheduler.load(Song::from_sheet("[tu]"));
//! scheduler.play();
//! scheduler.tick();
//! assert_eq!(scheduler.audio().notes.len(), 2); // both chord keys at once
//!
//! scheduler.audio_mut().set_time(0.05);
//! scheduler.reconcile();
//! assert_eq!(scheduler.visual()[0], VisualEvent::HighlightLine(0));
//! ```

mod types;
mod sinks;
mod engine;
mod timeline;


pub use types::{Cue, Cursor, EngineConfig, PlayState, ScheduledCue, ScheduledNote, VisualEvent};
pub use sinks::{AudioSink, RecordingAudio, SteppedClock, Tap, VisualSink};
pub use engine::Scheduler;
pub use timeline::{simulate, simulate_with, SimulationOptions, Timeline, TimelineEvent, TimelineNote};
