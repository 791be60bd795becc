//! # Song Documents
//!
//! A song is an optional YAML frontmatter block followed by the sheet: one
//! line of notation per line of text.
//!
//! ```text
//! ---
//! title: Ode to Joy
//! artist: Beethoven
//! tempo: 140
//! scale: C Major
//! bindings:
//!   q: { normal: w, shifted: W }
//! ---
//! - first phrase
//! uuio oiuy ttyu u.yy
//! ~
//! uuio oiuy ttyu y.tt
//! ```
//!
//! ## Frontmatter Keys
//! - `title`, `artist` - free text
//! - `tempo` - beats per minute, a positive integer (default 120)
//! - `scale` - a built-in scale name such as `G Major` or `Em` (default C Major)
//! - `bindings` - per-key overrides, each with a `normal` and a `shifted` key
//!
//! The frontmatter must open on the first non-blank line. Unknown keys are
//! rejected so typos do not silently fall back to defaults.
//!
//! ## Line Kinds
//! - blank: whitespace only
//! - page break: exactly `~` once trimmed
//! - comment: starts with `-` once trimmed
//! - content: everything else, the only lines with playable tokens

use crate::error::PianolaError;
use crate::keymap::KeyBindings;
use crate::scale::Scale;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Range;
use tracing::debug;

/// Tempo used when a song does not set one
pub const DEFAULT_TEMPO: u32 = 120;

/// Raw metadata for YAML deserialization
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct RawMetadata {
    title: Option<String>,
    artist: Option<String>,
    tempo: Option<u32>,
    scale: Option<String>,
    bindings: Option<BTreeMap<String, RawBinding>>,
}

#[derive(Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct RawBinding {
    normal: String,
    shifted: String,
}

/// What a sheet line is, for scheduling purposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LineKind {
    Blank,
    PageBreak,
    Comment,
    Content,
}

impl LineKind {
    /// True for lines the scheduler steps over without playing
    pub fn is_skipped(self) -> bool {
        self != LineKind::Content
    }
}

/// Classify one sheet line
pub fn classify_line(line: &str) -> LineKind {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        LineKind::Blank
    } else if trimmed == "~" {
        LineKind::PageBreak
    } else if trimmed.starts_with('-') {
        LineKind::Comment
    } else {
        LineKind::Content
    }
}

/// A playable song
#[derive(Debug, Clone, PartialEq)]
pub struct Song {
    pub title: Option<String>,
    pub artist: Option<String>,
    /// Beats per minute, always positive
    pub tempo: u32,
    pub scale: Scale,
    pub bindings: KeyBindings,
    pub lines: Vec<String>,
}

impl Default for Song {
    fn default() -> Self {
        Self {
            title: None,
            artist: None,
            tempo: DEFAULT_TEMPO,
            scale: Scale::default(),
            bindings: KeyBindings::new(),
            lines: Vec::new(),
        }
    }
}

impl Song {
    /// A song with default settings and the given sheet text
    pub fn from_sheet(sheet: &str) -> Self {
        Self {
            lines: sheet.lines().map(str::to_string).collect(),
            ..Self::default()
        }
    }

    /// Parse a song document (frontmatter + sheet).
    ///
    /// # Example
    /// ```rust
    /// use pianola::Song;
    ///
    /// let song = Song::parse("---\ntitle: Scale\ntempo: 90\n---\ntyuiopas\n").unwrap();
    /// assert_eq!(song.title.as_deref(), Some("Scale"));
    /// assert_eq!(song.tempo, 90);
    /// assert_eq!(song.lines, vec!["tyuiopas".to_string()]);
    /// ```
    pub fn parse(source: &str) -> Result<Self, PianolaError> {
        let (metadata_content, lines) = extract_frontmatter(source)?;

        let raw = match metadata_content {
            Some(content) if !content.trim().is_empty() => serde_yaml::from_str(&content)
                .map_err(|e| PianolaError::MetadataError(e.to_string()))?,
            _ => RawMetadata::default(),
        };

        let tempo = match raw.tempo {
            Some(0) => {
                return Err(PianolaError::MetadataError(
                    "tempo must be a positive integer".to_string(),
                ))
            }
            Some(tempo) => tempo,
            None => DEFAULT_TEMPO,
        };

        let scale = match raw.scale {
            Some(ref name) => Scale::from_name(name)
                .ok_or_else(|| PianolaError::MetadataError(format!("Unknown scale: {}", name)))?,
            None => Scale::default(),
        };

        let bindings = match raw.bindings {
            Some(ref table) => KeyBindings::from_pairs(
                table
                    .iter()
                    .map(|(key, b)| (key.as_str(), b.normal.as_str(), b.shifted.as_str())),
            )?,
            None => KeyBindings::new(),
        };

        debug!(
            "Parsed song {:?}: {} lines at {} BPM in {}",
            raw.title,
            lines.len(),
            tempo,
            scale.name()
        );

        Ok(Self {
            title: raw.title,
            artist: raw.artist,
            tempo,
            scale,
            bindings,
            lines,
        })
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn line_kind(&self, index: usize) -> Option<LineKind> {
        self.lines.get(index).map(|line| classify_line(line))
    }

    /// Line ranges of each page, split at page-break lines.
    /// Page-break lines themselves belong to no page.
    pub fn pages(&self) -> Vec<Range<usize>> {
        let mut pages = Vec::new();
        let mut start = 0;
        for (i, line) in self.lines.iter().enumerate() {
            if classify_line(line) == LineKind::PageBreak {
                pages.push(start..i);
                start = i + 1;
            }
        }
        pages.push(start..self.lines.len());
        pages
    }

    /// Page index containing `line`. A page-break line reports the page it closes.
    pub fn page_of_line(&self, line: usize) -> usize {
        self.lines
            .iter()
            .take(line)
            .filter(|l| classify_line(l) == LineKind::PageBreak)
            .count()
    }
}

/// Split a document into frontmatter content and sheet lines
fn extract_frontmatter(source: &str) -> Result<(Option<String>, Vec<String>), PianolaError> {
    let lines: Vec<&str> = source.lines().collect();

    let start = match lines.iter().position(|line| !line.trim().is_empty()) {
        Some(i) if lines[i].trim() == "---" => i,
        _ => return Ok((None, lines.iter().map(|l| l.to_string()).collect())),
    };

    let end = lines[start + 1..]
        .iter()
        .position(|line| line.trim() == "---")
        .map(|offset| start + 1 + offset)
        .ok_or_else(|| PianolaError::ParseError {
            line: start + 1,
            message: "Unterminated frontmatter: missing closing ---".to_string(),
        })?;

    let metadata = lines[start + 1..end].join("\n");
    let sheet = lines[end + 1..].iter().map(|l| l.to_string()).collect();
    Ok((Some(metadata), sheet))
}
