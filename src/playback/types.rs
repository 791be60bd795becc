//! Playback type definitions
//!
//! This module defines the types shared by the scheduler, its sinks, and the
//! offline timeline.

use crate::error::PianolaError;
use crate::keymap::Pitch;
use serde::{Deserialize, Serialize};

/// Scheduler state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayState {
    Stopped,
    Playing,
    Paused,
}

/// Position of the scheduler in the sheet
///
/// `column` is a character index into the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Cursor {
    pub line: usize,
    pub column: usize,
}

/// A queued visual cue, released when the audio clock reaches its time
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Cue {
    HighlightLine(usize),
    FlashPitch(Pitch),
    SkipLine(usize),
    /// Never forwarded: releasing it stops playback
    EndOfSong,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScheduledCue {
    /// Audio clock time, in seconds
    pub time: f64,
    pub cue: Cue,
}

/// Event delivered to the visual sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum VisualEvent {
    HighlightLine(usize),
    FlashPitch(Pitch),
    SkipLine(usize),
    Stopped,
}

/// A note handed to the audio sink
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScheduledNote {
    pub pitch: Pitch,
    /// Audio clock time, in seconds
    pub time: f64,
}

/// Scheduler timing, all values in seconds
///
/// # Fields
/// - `latency`: gap between pressing play and the first note
/// - `horizon`: how far ahead of the audio clock notes are dispatched
/// - `tick_interval`: period of the scheduling tick
/// - `frame_interval`: period of the visual reconciliation pass
/// - `end_padding`: time between the last beat and the end-of-song stop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct EngineConfig {
    pub latency: f64,
    pub horizon: f64,
    pub tick_interval: f64,
    pub frame_interval: f64,
    pub end_padding: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            latency: 0.05,
            horizon: 0.1,
            tick_interval: 0.025,
            frame_interval: 0.016,
            end_padding: 1.0,
        }
    }
}

impl EngineConfig {
    /// Parse a YAML config; missing keys keep their defaults
    ///
    /// # Example
    /// ```rust
    /// use pianola::playback::EngineConfig;
    ///
    /// let config = EngineConfig::from_yaml("horizon: 0.2\ntick-interval: 0.05").unwrap();
    /// assert_eq!(config.horizon, 0.2);
    /// assert_eq!(config.latency, 0.05);
    /// ```
    pub fn from_yaml(content: &str) -> Result<Self, PianolaError> {
        let config: EngineConfig = serde_yaml::from_str(content)
            .map_err(|e| PianolaError::MetadataError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), PianolaError> {
        let checks = [
            ("latency", self.latency, false),
            ("horizon", self.horizon, true),
            ("tick-interval", self.tick_interval, true),
            ("frame-interval", self.frame_interval, true),
            ("end-padding", self.end_padding, false),
        ];
        for (name, value, strictly_positive) in checks {
            let valid = value.is_finite() && if strictly_positive { value > 0.0 } else { value >= 0.0 };
            if !valid {
                return Err(PianolaError::MetadataError(format!(
                    "{} must be {}, got {}",
                    name,
                    if strictly_positive { "positive" } else { "non-negative" },
                    value
                )));
            }
        }
        Ok(())
    }
}
