//! Lookahead playback engine
//!
//! Walks a song's sheet token by token, dispatching notes to the audio sink a
//! little ahead of the audio clock, and queues visual cues that are released
//! to the visual sink once the clock catches up with them.
//!
//! The engine is passive: something else has to call [`Scheduler::tick`]
//! periodically (every `tick_interval`) and [`Scheduler::reconcile`] once per
//! display frame while playing. Both calls are no-ops unless playing, so a
//! late call after a pause does nothing. See `transport` for a driver.

use std::collections::VecDeque;

use tracing::{debug, info, warn};

use super::sinks::{AudioSink, VisualSink};
use super::types::{Cue, Cursor, EngineConfig, PlayState, ScheduledCue, VisualEvent};
use crate::keymap::{resolve_pitch, KeyBindings, Pitch};
use crate::lexer::{next_token, Token};
use crate::scale::Scale;
use crate::song::{classify_line, Song};

/// What the scheduler does with the line under the cursor
enum Step {
    /// Past the last line
    End,
    /// Blank, page break or comment
    SkipLine,
    /// Column at end of line
    NextLine,
    Token(Token, usize),
}

/// The autoplay scheduler
///
/// Owns the play cursor and the visual cue queue. Audio and visuals go through
/// the sinks `A` and `V`.
///
/// # Example
/// ```rust
/// use pianola::playback::{RecordingAudio, Scheduler, VisualEvent};
/// use pianola::Song;
///
/// let mut scheduler = Scheduler::new(RecordingAudio::new(), Vec::<VisualEvent>::new());
/// scheduler.load(Song::from_sheet("tyu"));
/// scheduler.play();
/// scheduler.tick();
///
/// // Notes start 50ms after play; only the first beat falls within the 100ms horizon
/// assert_eq!(scheduler.audio().notes.len(), 1);
/// assert_eq!(scheduler.audio().notes[0].time, 0.05);
/// ```
pub struct Scheduler<A: AudioSink, V: VisualSink> {
    audio: A,
    visual: V,
    config: EngineConfig,
    song: Option<Song>,
    state: PlayState,
    cursor: Cursor,
    /// Audio clock time at which the next token starts
    next_time: f64,
    tempo_scale: f64,
    /// Every line has been scheduled
    finished: bool,
    queue: VecDeque<ScheduledCue>,
    /// Characters of the line under the cursor
    line_cache: Option<(usize, Vec<char>)>,
}

impl<A: AudioSink, V: VisualSink> Scheduler<A, V> {
    pub fn new(audio: A, visual: V) -> Self {
        Self::with_config(audio, visual, EngineConfig::default())
    }

    pub fn with_config(audio: A, visual: V, config: EngineConfig) -> Self {
        Self {
            audio,
            visual,
            config,
            song: None,
            state: PlayState::Stopped,
            cursor: Cursor::default(),
            next_time: 0.0,
            tempo_scale: 1.0,
            finished: false,
            queue: VecDeque::new(),
            line_cache: None,
        }
    }

    /// Install a song, stopping whatever was playing
    pub fn load(&mut self, song: Song) {
        if self.state != PlayState::Stopped {
            self.stop();
        }
        self.reset_position();
        info!(
            "Loaded {:?}: {} lines at {} BPM",
            song.title.as_deref().unwrap_or("untitled"),
            song.line_count(),
            song.tempo
        );
        self.song = Some(song);
        self.tempo_scale = 1.0;
        self.line_cache = None;
    }

    /// Start or resume playback from the cursor
    pub fn play(&mut self) {
        match &self.song {
            None => {
                warn!("Play requested with no song loaded");
                return;
            }
            Some(song) if song.lines.is_empty() => {
                warn!("Play requested for a song with an empty sheet");
                return;
            }
            Some(_) => {}
        }
        if self.state == PlayState::Playing {
            return;
        }

        self.audio.ensure_ready();
        self.next_time = self.anchor();
        self.state = PlayState::Playing;
        debug!(
            "Playing from line {} column {} at {:.3}s",
            self.cursor.line, self.cursor.column, self.next_time
        );
    }

    /// Start time for the next token when (re)entering Playing.
    ///
    /// Cues still queued from before a pause belong to audio that is already
    /// committed, so scheduling resumes no earlier than the end of the last
    /// committed beat.
    fn anchor(&self) -> f64 {
        let fresh = self.audio.current_time() + self.config.latency;
        match self.queue.back() {
            Some(last) if last.cue != Cue::EndOfSong => fresh.max(self.next_time),
            _ => fresh,
        }
    }

    /// Stop scheduling, keeping the cursor and queued cues
    pub fn pause(&mut self) {
        if self.state == PlayState::Playing {
            self.state = PlayState::Paused;
            debug!("Paused at line {}", self.cursor.line);
        }
    }

    /// Stop and rewind to the start of the sheet
    pub fn stop(&mut self) {
        self.pause();
        self.reset_position();
        self.state = PlayState::Stopped;
        info!("Stopped");
        self.visual.emit(VisualEvent::Stopped);
    }

    fn reset_position(&mut self) {
        self.cursor = Cursor::default();
        self.queue.clear();
        self.finished = false;
    }

    /// Move the cursor to the start of `line`.
    ///
    /// Out-of-range targets are ignored. The target line is highlighted right
    /// away, even when not playing. If playing, playback resumes from the new
    /// line with a fresh time anchor.
    pub fn seek(&mut self, line: usize) {
        let line_count = self.song.as_ref().map_or(0, Song::line_count);
        if line >= line_count {
            debug!("Ignoring seek to line {} of {}", line, line_count);
            return;
        }

        let was_playing = self.is_playing();
        if was_playing {
            self.pause();
        }

        self.cursor = Cursor { line, column: 0 };
        self.finished = false;
        self.queue.clear();
        let now = self.audio.current_time();
        self.queue.push_back(ScheduledCue {
            time: now,
            cue: Cue::HighlightLine(line),
        });
        self.drain(true);
        debug!("Seeked to line {}", line);

        if was_playing {
            self.play();
        }
    }

    /// Set playback speed as a percentage of the song tempo.
    ///
    /// Only tokens scheduled from now on are affected; audio already handed to
    /// the sink keeps its start time.
    pub fn set_tempo(&mut self, percent: u32) {
        if percent == 0 {
            warn!("Ignoring tempo of 0%");
            return;
        }
        self.tempo_scale = percent as f64 / 100.0;
        debug!("Tempo scale set to {:.2}", self.tempo_scale);
    }

    /// Seconds per beat at the current tempo and speed
    pub fn seconds_per_beat(&self) -> f64 {
        let bpm = self
            .song
            .as_ref()
            .map_or(crate::song::DEFAULT_TEMPO, |song| song.tempo);
        60.0 / bpm as f64 / self.tempo_scale
    }

    /// Scheduling tick: dispatch everything starting within the horizon
    pub fn tick(&mut self) {
        if !self.is_playing() {
            return;
        }
        let horizon = self.audio.current_time() + self.config.horizon;
        while self.next_time < horizon && !self.finished {
            self.advance();
        }
    }

    /// Advance the cursor by one step
    fn advance(&mut self) {
        let line_index = self.cursor.line;
        let step = match self.song.as_ref().and_then(|song| song.lines.get(line_index)) {
            None => Step::End,
            Some(line) if classify_line(line).is_skipped() => Step::SkipLine,
            Some(line) => {
                let chars = cached_chars(&mut self.line_cache, line_index, line);
                if self.cursor.column >= chars.len() {
                    Step::NextLine
                } else {
                    let located = next_token(chars, self.cursor.column);
                    Step::Token(located.token, located.next)
                }
            }
        };

        match step {
            Step::End => {
                self.finished = true;
                let time = self.next_time + self.config.end_padding;
                self.enqueue(time, Cue::EndOfSong);
                debug!("Finished scheduling, end of song at {:.3}s", time);
            }
            Step::SkipLine => {
                self.enqueue(self.next_time, Cue::SkipLine(line_index));
                self.next_line();
            }
            Step::NextLine => self.next_line(),
            Step::Token(token, next) => {
                self.cursor.column = next;
                if token == Token::Skip {
                    return;
                }
                let start = self.next_time;
                let duration = self.seconds_per_beat();
                self.enqueue(start, Cue::HighlightLine(line_index));
                if token != Token::Rest {
                    self.dispatch(&token, start, duration);
                }
                self.next_time = start + duration;
            }
        }
    }

    fn next_line(&mut self) {
        self.cursor = Cursor {
            line: self.cursor.line + 1,
            column: 0,
        };
    }

    /// Send a token's notes to the audio sink and queue their flashes
    fn dispatch(&mut self, token: &Token, start: f64, duration: f64) {
        let firings = match &self.song {
            Some(song) => plan_firings(token, start, duration, &song.scale, &song.bindings),
            None => return,
        };
        for (time, pitch) in firings {
            self.audio.schedule_note(pitch, time);
            self.enqueue(time, Cue::FlashPitch(pitch));
        }
    }

    fn enqueue(&mut self, time: f64, cue: Cue) {
        debug_assert!(
            self.queue.back().map_or(true, |last| last.time <= time),
            "cue queue must stay in time order"
        );
        self.queue.push_back(ScheduledCue { time, cue });
    }

    /// Visual reconciliation pass: release every cue that is due
    pub fn reconcile(&mut self) {
        if !self.is_playing() {
            return;
        }
        self.drain(false);
    }

    /// Forward due cues in order. A forced pass ignores the clock.
    fn drain(&mut self, force: bool) {
        let now = self.audio.current_time();
        while let Some(&ScheduledCue { time, cue }) = self.queue.front() {
            if !force && time > now {
                break;
            }
            self.queue.pop_front();
            let event = match cue {
                Cue::EndOfSong => {
                    info!("Reached end of song");
                    self.stop();
                    return;
                }
                Cue::HighlightLine(line) => VisualEvent::HighlightLine(line),
                Cue::FlashPitch(pitch) => VisualEvent::FlashPitch(pitch),
                Cue::SkipLine(line) => VisualEvent::SkipLine(line),
            };
            self.visual.emit(event);
        }
    }

    /// Play a key pressed live, outside the sheet.
    ///
    /// Uses the loaded song's scale and bindings, or C Major without bindings.
    /// The note starts now and its flash is emitted immediately.
    pub fn play_key(&mut self, key: char, shift_held: bool) -> Option<Pitch> {
        let pitch = match &self.song {
            Some(song) => resolve_pitch(key, shift_held, &song.scale, &song.bindings),
            None => resolve_pitch(key, shift_held, &Scale::default(), &KeyBindings::new()),
        }?;
        let now = self.audio.current_time();
        self.audio.schedule_note(pitch, now);
        self.visual.emit(VisualEvent::FlashPitch(pitch));
        Some(pitch)
    }

    pub fn state(&self) -> PlayState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlayState::Playing
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn next_time(&self) -> f64 {
        self.next_time
    }

    pub fn tempo_scale(&self) -> f64 {
        self.tempo_scale
    }

    /// Cues waiting for the clock, in release order
    pub fn queued_cues(&self) -> impl Iterator<Item = &ScheduledCue> {
        self.queue.iter()
    }

    pub fn song(&self) -> Option<&Song> {
        self.song.as_ref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut A {
        &mut self.audio
    }

    pub fn visual(&self) -> &V {
        &self.visual
    }

    pub fn visual_mut(&mut self) -> &mut V {
        &mut self.visual
    }

    pub fn into_parts(self) -> (A, V) {
        (self.audio, self.visual)
    }
}

fn cached_chars<'a>(
    cache: &'a mut Option<(usize, Vec<char>)>,
    index: usize,
    line: &str,
) -> &'a [char] {
    if !matches!(cache, Some((cached, _)) if *cached == index) {
        *cache = Some((index, line.chars().collect()));
    }
    match cache {
        Some((_, chars)) => chars.as_slice(),
        None => &[],
    }
}

/// Split token content into units that sound together.
///
/// Each character is a unit, except that `[...]` groups its characters into
/// one unit (a chord inside a grace run). An unclosed `[` takes the rest.
pub(crate) fn split_units(content: &str) -> Vec<Vec<char>> {
    let mut units = Vec::new();
    let mut chars = content.chars();
    while let Some(c) = chars.next() {
        if c == '[' {
            units.push(chars.by_ref().take_while(|&c| c != ']').collect());
        } else {
            units.push(vec![c]);
        }
    }
    units
}

/// Start time and pitch of every note a token sounds.
///
/// Grace runs give unit `i` of `n` the start `start + i * duration / n`;
/// notes and chords sound every unit at `start`. Characters without a pitch
/// are dropped.
pub(crate) fn plan_firings(
    token: &Token,
    start: f64,
    duration: f64,
    scale: &Scale,
    bindings: &KeyBindings,
) -> Vec<(f64, Pitch)> {
    let units = split_units(&token.content());
    let step = match token {
        Token::GraceRun(_) if !units.is_empty() => duration / units.len() as f64,
        _ => 0.0,
    };

    units
        .iter()
        .enumerate()
        .flat_map(|(i, unit)| {
            let time = start + step * i as f64;
            unit.iter()
                .filter_map(move |&key| resolve_pitch(key, false, scale, bindings))
                .map(move |pitch| (time, pitch))
        })
        .collect()
}
