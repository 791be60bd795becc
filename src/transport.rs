//! # Transport
//!
//! Real-time driver for the [`Scheduler`].
//!
//! ## Purpose
//! The scheduler is passive; the transport gives it a pulse. While playing,
//! two tasks run on the current tokio [`LocalSet`](tokio::task::LocalSet):
//! - the **tick task** calls [`Scheduler::tick`] every `tick_interval`
//! - the **frame task** calls [`Scheduler::reconcile`] every `frame_interval`
//!
//! Both tasks check `is_playing()` before every iteration and end instead of
//! re-arming, so once the song ends (or something else stops the scheduler)
//! they wind down by themselves. `pause`, `stop` and `seek` also abort them
//! right away.
//!
//! Tasks are spawned with `spawn_local`, so every method that starts playback
//! must be called from inside a `LocalSet`.
//!
//! ## Example
//! ```rust
//! use pianola::playback::{Scheduler, VisualEvent};
//! use pianola::transport::{Transport, WallClockAudio};
//! use pianola::Song;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let local = tokio::task::LocalSet::new();
//! local
//!     .run_until(async {
//!         let mut scheduler = Scheduler::new(WallClockAudio::new(), Vec::<VisualEvent>::new());
//!         scheduler.load(Song::from_sheet("tu"));
//!
//!         let mut transport = Transport::new(scheduler);
//!         transport.play();
//!         transport.finished().await;
//!         assert_eq!(transport.scheduler().borrow().audio().notes().len(), 2);
//!     })
//!     .await;
//! # }
//! ```

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use crate::keymap::Pitch;
use crate::playback::{AudioSink, ScheduledNote, Scheduler, VisualSink};

/// Audio sink on the tokio clock that logs notes instead of sounding them
///
/// Its time is measured from creation with [`tokio::time::Instant`], so
/// paused-time tests see a deterministic clock.
#[derive(Debug)]
pub struct WallClockAudio {
    origin: Instant,
    notes: Vec<ScheduledNote>,
}

impl WallClockAudio {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            notes: Vec::new(),
        }
    }

    pub fn notes(&self) -> &[ScheduledNote] {
        &self.notes
    }
}

impl Default for WallClockAudio {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSink for WallClockAudio {
    fn schedule_note(&mut self, pitch: Pitch, start: f64) {
        debug!("Note {} at {:.3}s", pitch, start);
        self.notes.push(ScheduledNote { pitch, time: start });
    }

    fn current_time(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

type Shared<A, V> = Rc<RefCell<Scheduler<A, V>>>;

/// Owns a scheduler and the tasks that drive it
pub struct Transport<A: AudioSink + 'static, V: VisualSink + 'static> {
    scheduler: Shared<A, V>,
    tasks: Vec<JoinHandle<()>>,
}

impl<A: AudioSink + 'static, V: VisualSink + 'static> Transport<A, V> {
    pub fn new(scheduler: Scheduler<A, V>) -> Self {
        Self {
            scheduler: Rc::new(RefCell::new(scheduler)),
            tasks: Vec::new(),
        }
    }

    /// Shared handle to the scheduler, e.g. to inspect its sinks
    pub fn scheduler(&self) -> Shared<A, V> {
        Rc::clone(&self.scheduler)
    }

    pub fn play(&mut self) {
        self.abort_tasks();
        self.scheduler.borrow_mut().play();
        self.spawn_if_playing();
    }

    pub fn pause(&mut self) {
        self.abort_tasks();
        self.scheduler.borrow_mut().pause();
    }

    pub fn stop(&mut self) {
        self.abort_tasks();
        self.scheduler.borrow_mut().stop();
    }

    pub fn seek(&mut self, line: usize) {
        self.abort_tasks();
        self.scheduler.borrow_mut().seek(line);
        self.spawn_if_playing();
    }

    pub fn set_tempo(&mut self, percent: u32) {
        self.scheduler.borrow_mut().set_tempo(percent);
    }

    pub fn press_key(&mut self, key: char, shift_held: bool) -> Option<Pitch> {
        self.scheduler.borrow_mut().play_key(key, shift_held)
    }

    pub fn is_playing(&self) -> bool {
        self.scheduler.borrow().is_playing()
    }

    /// Wait until both tasks have ended (end of song, or aborted)
    pub async fn finished(&mut self) {
        for task in self.tasks.drain(..) {
            // An aborted task reports a cancellation error; either way it is done
            let _ = task.await;
        }
    }

    fn abort_tasks(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }

    fn spawn_if_playing(&mut self) {
        let (tick_every, frame_every) = {
            let scheduler = self.scheduler.borrow();
            if !scheduler.is_playing() {
                return;
            }
            let config = scheduler.config();
            (config.tick_interval, config.frame_interval)
        };

        let tick = spawn_loop(Rc::clone(&self.scheduler), tick_every, |s| s.tick());
        let frame = spawn_loop(Rc::clone(&self.scheduler), frame_every, |s| s.reconcile());
        self.tasks.push(tick);
        self.tasks.push(frame);
        debug!("Transport tasks started");
    }
}

impl<A: AudioSink + 'static, V: VisualSink + 'static> Drop for Transport<A, V> {
    fn drop(&mut self) {
        self.abort_tasks();
    }
}

/// Run `step` every `seconds` until the scheduler is no longer playing
fn spawn_loop<A, V, F>(scheduler: Shared<A, V>, seconds: f64, step: F) -> JoinHandle<()>
where
    A: AudioSink + 'static,
    V: VisualSink + 'static,
    F: Fn(&mut Scheduler<A, V>) + 'static,
{
    let period = Duration::from_secs_f64(seconds.max(0.001));
    tokio::task::spawn_local(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let mut scheduler = scheduler.borrow_mut();
            if !scheduler.is_playing() {
                break;
            }
            step(&mut *scheduler);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::{PlayState, VisualEvent};
    use crate::song::Song;
    use tokio::task::LocalSet;
    use tokio::time::sleep;

    fn transport_for(sheet: &str) -> Transport<WallClockAudio, Vec<VisualEvent>> {
        let mut scheduler = Scheduler::new(WallClockAudio::new(), Vec::new());
        scheduler.load(Song::from_sheet(sheet));
        Transport::new(scheduler)
    }

    fn note_times(transport: &Transport<WallClockAudio, Vec<VisualEvent>>) -> Vec<f64> {
        let scheduler = transport.scheduler();
        let scheduler = scheduler.borrow();
        scheduler.audio().notes().iter().map(|n| n.time).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_plays_to_the_end_and_stops() {
        LocalSet::new()
            .run_until(async {
                let mut transport = transport_for("ty\nu");
                transport.play();
                transport.finished().await;

                assert!(!transport.is_playing());
                let times = note_times(&transport);
                assert_eq!(times.len(), 3);
                assert!((times[0] - 0.05).abs() < 1e-6);
                assert!((times[2] - 1.05).abs() < 1e-6);

                let scheduler = transport.scheduler();
                let scheduler = scheduler.borrow();
                assert_eq!(scheduler.state(), PlayState::Stopped);
                assert_eq!(scheduler.visual().last(), Some(&VisualEvent::Stopped));
                assert!(scheduler.visual().contains(&VisualEvent::HighlightLine(1)));
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_visuals_follow_the_clock() {
        LocalSet::new()
            .run_until(async {
                let mut transport = transport_for("tyuiop");
                transport.play();
                sleep(Duration::from_millis(30)).await;
                assert!(transport.scheduler().borrow().visual().is_empty());

                sleep(Duration::from_millis(60)).await;
                let scheduler = transport.scheduler();
                assert_eq!(
                    scheduler.borrow().visual().first(),
                    Some(&VisualEvent::HighlightLine(0))
                );
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_halts_scheduling() {
        LocalSet::new()
            .run_until(async {
                let mut transport = transport_for("tyuiop");
                transport.play();
                sleep(Duration::from_millis(300)).await;
                transport.pause();
                assert_eq!(note_times(&transport).len(), 1);

                sleep(Duration::from_secs(2)).await;
                assert_eq!(note_times(&transport).len(), 1);
                assert_eq!(transport.scheduler().borrow().state(), PlayState::Paused);

                transport.play();
                sleep(Duration::from_millis(50)).await;
                let times = note_times(&transport);
                assert_eq!(times.len(), 2);
                assert!((times[1] - 2.35).abs() < 1e-6);
                transport.stop();
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_seek_restarts_from_line() {
        LocalSet::new()
            .run_until(async {
                let mut transport = transport_for("t\ny\nu");
                transport.play();
                sleep(Duration::from_millis(100)).await;
                transport.seek(2);
                transport.finished().await;

                let scheduler = transport.scheduler();
                let scheduler = scheduler.borrow();
                let pitches: Vec<Pitch> = scheduler.audio().notes().iter().map(|n| n.pitch).collect();
                assert_eq!(pitches, vec![Pitch(48), Pitch(52)]);
                assert!(scheduler.visual().contains(&VisualEvent::HighlightLine(2)));
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_aborts_tasks() {
        LocalSet::new()
            .run_until(async {
                let mut transport = transport_for("tyuiop");
                transport.play();
                sleep(Duration::from_millis(10)).await;
                transport.stop();
                transport.finished().await;

                sleep(Duration::from_secs(1)).await;
                assert_eq!(note_times(&transport).len(), 1);
                let scheduler = transport.scheduler();
                assert_eq!(scheduler.borrow().cursor().line, 0);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_press_key_while_stopped() {
        LocalSet::new()
            .run_until(async {
                let mut transport = transport_for("t");
                assert_eq!(transport.press_key('t', true), Some(Pitch(49)));
                assert_eq!(transport.press_key('/', false), None);
                assert!(!transport.is_playing());
                assert_eq!(note_times(&transport).len(), 1);
            })
            .await;
    }
}
