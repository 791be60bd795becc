//! Offline runs of the scheduler
//!
//! Drives a [`Scheduler`] on a stepped clock from play to the end-of-song
//! stop, collecting every dispatched note and every released visual event.
//! The result is deterministic for a given song and configuration.

use serde::Serialize;

use super::engine::Scheduler;
use super::sinks::{AudioSink, RecordingAudio, SteppedClock, Tap};
use super::types::{EngineConfig, VisualEvent};
use crate::keymap::Pitch;
use crate::song::Song;

/// A dispatched note, timed relative to the first beat
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineNote {
    pub pitch: Pitch,
    pub name: String,
    pub midi: u8,
    pub time: f64,
}

/// A visual event with the (relative) clock time it was released at
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    pub time: f64,
    pub event: VisualEvent,
}

/// Everything a song does when played start to finish
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Timeline {
    pub title: Option<String>,
    pub tempo: u32,
    /// Relative time of the final stop
    pub duration: f64,
    pub notes: Vec<TimelineNote>,
    pub events: Vec<TimelineEvent>,
}

/// Options for an offline run
#[derive(Debug, Clone)]
pub struct SimulationOptions {
    pub config: EngineConfig,
    /// Playback speed in percent of the song tempo
    pub tempo_percent: u32,
    /// Line to start from
    pub start_line: usize,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            tempo_percent: 100,
            start_line: 0,
        }
    }
}

/// Play `song` offline with a recording sink.
///
/// # Example
/// ```rust
/// use pianola::playback::{simulate, SimulationOptions};
/// use pianola::Song;
///
/// let timeline = simulate(&Song::from_sheet("t.u"), &SimulationOptions::default());
/// let names: Vec<&str> = timeline.notes.iter().map(|n| n.name.as_str()).collect();
/// assert_eq!(names, vec!["c4", "e4"]);
/// assert!((timeline.notes[1].time - 1.0).abs() < 1e-9);
/// ```
pub fn simulate(song: &Song, options: &SimulationOptions) -> Timeline {
    simulate_with(song, options, RecordingAudio::new()).0
}

/// Play `song` offline through `audio`, returning the timeline and the sink
pub fn simulate_with<A>(song: &Song, options: &SimulationOptions, audio: A) -> (Timeline, A)
where
    A: AudioSink + SteppedClock,
{
    let config = &options.config;
    let step = if config.tick_interval > 0.0 {
        config.tick_interval
    } else {
        EngineConfig::default().tick_interval
    };

    let mut scheduler = Scheduler::with_config(Tap::new(audio), Vec::new(), config.clone());
    scheduler.load(song.clone());
    scheduler.set_tempo(options.tempo_percent);
    if options.start_line > 0 {
        scheduler.seek(options.start_line);
        scheduler.visual_mut().clear();
    }
    scheduler.play();

    let anchor = scheduler.next_time();
    let mut events = Vec::new();

    while scheduler.is_playing() {
        scheduler.tick();
        scheduler.reconcile();
        let now = scheduler.audio().current_time() - anchor;
        events.extend(
            scheduler
                .visual_mut()
                .drain(..)
                .map(|event| TimelineEvent { time: now, event }),
        );
        scheduler.audio_mut().advance(step);
    }

    let (tap, _) = scheduler.into_parts();
    let notes = tap
        .notes
        .iter()
        .map(|note| TimelineNote {
            pitch: note.pitch,
            name: note.pitch.name(),
            midi: note.pitch.midi(),
            time: note.time - anchor,
        })
        .collect();

    let timeline = Timeline {
        title: song.title.clone(),
        tempo: song.tempo,
        duration: events.last().map_or(0.0, |e| e.time),
        notes,
        events,
    };
    (timeline, tap.inner)
}
