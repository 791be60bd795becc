//! # Scales
//!
//! Natural note names and the diatonic scales a song can be played in.
//!
//! A [`Scale`] is a display name, the set of natural note names it alters,
//! and a direction flag (sharps or flats). Every natural name is therefore
//! exactly one of unaltered, raised (sharps scale) or lowered (flats scale),
//! always by one semitone.
//!
//! ## Built-in Scales
//! The fifteen major keys and their fifteen relative minors are built in,
//! named `"<Tonic> Major"` / `"<Tonic> Minor"`. Alterations are added in
//! circle-of-fifths order:
//! - Order of sharps: F C G D A E B
//! - Order of flats: B E A D G C F
//!
//! ## Example
//! ```rust
//! use pianola::scale::{NoteName, Scale};
//!
//! let g = Scale::from_name("G Major").unwrap();
//! assert_eq!(g.alteration(NoteName::F), 1);
//! assert_eq!(g.alteration(NoteName::C), 0);
//!
//! let f = Scale::from_name("Dm").unwrap();
//! assert_eq!(f.name(), "D Minor");
//! assert_eq!(f.alteration(NoteName::B), -1);
//! ```

use serde::Serialize;

/// Note names C through B, in keyboard order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub enum NoteName {
    #[default]
    C,
    D,
    E,
    F,
    G,
    A,
    B,
}

impl NoteName {
    /// All natural names in ascending order within an octave
    pub const ALL: [NoteName; 7] = [
        NoteName::C,
        NoteName::D,
        NoteName::E,
        NoteName::F,
        NoteName::G,
        NoteName::A,
        NoteName::B,
    ];

    /// Semitone offset from C
    pub fn semitone(self) -> u8 {
        match self {
            NoteName::C => 0,
            NoteName::D => 2,
            NoteName::E => 4,
            NoteName::F => 5,
            NoteName::G => 7,
            NoteName::A => 9,
            NoteName::B => 11,
        }
    }

    /// Name at a position in the repeating C..B sequence
    pub fn from_index(index: usize) -> NoteName {
        Self::ALL[index % 7]
    }

    pub fn from_char(c: char) -> Option<NoteName> {
        match c.to_ascii_lowercase() {
            'c' => Some(NoteName::C),
            'd' => Some(NoteName::D),
            'e' => Some(NoteName::E),
            'f' => Some(NoteName::F),
            'g' => Some(NoteName::G),
            'a' => Some(NoteName::A),
            'b' => Some(NoteName::B),
            _ => None,
        }
    }

    /// Lowercase letter used in readable notation
    pub fn as_str(self) -> &'static str {
        match self {
            NoteName::C => "c",
            NoteName::D => "d",
            NoteName::E => "e",
            NoteName::F => "f",
            NoteName::G => "g",
            NoteName::A => "a",
            NoteName::B => "b",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

const SHARP_ORDER: [NoteName; 7] = [
    NoteName::F,
    NoteName::C,
    NoteName::G,
    NoteName::D,
    NoteName::A,
    NoteName::E,
    NoteName::B,
];

const FLAT_ORDER: [NoteName; 7] = [
    NoteName::B,
    NoteName::E,
    NoteName::A,
    NoteName::D,
    NoteName::G,
    NoteName::C,
    NoteName::F,
];

/// Major tonics and their position on the circle of fifths
const MAJOR_KEYS: [(&str, i8); 15] = [
    ("C", 0),
    ("G", 1),
    ("D", 2),
    ("A", 3),
    ("E", 4),
    ("B", 5),
    ("F#", 6),
    ("C#", 7),
    ("F", -1),
    ("Bb", -2),
    ("Eb", -3),
    ("Ab", -4),
    ("Db", -5),
    ("Gb", -6),
    ("Cb", -7),
];

/// Minor tonics, each sharing the signature of its relative major
const MINOR_KEYS: [(&str, i8); 15] = [
    ("A", 0),
    ("E", 1),
    ("B", 2),
    ("F#", 3),
    ("C#", 4),
    ("G#", 5),
    ("D#", 6),
    ("A#", 7),
    ("D", -1),
    ("G", -2),
    ("C", -3),
    ("F", -4),
    ("Bb", -5),
    ("Eb", -6),
    ("Ab", -7),
];

/// A named diatonic scale: which natural names are altered, and in which direction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scale {
    name: String,
    altered: [bool; 7],
    sharps: bool,
}

impl Default for Scale {
    fn default() -> Self {
        Self::from_fifths("C Major", 0)
    }
}

impl Scale {
    /// Build a scale from an explicit set of altered names
    pub fn new(name: impl Into<String>, altered: &[NoteName], sharps: bool) -> Self {
        let mut set = [false; 7];
        for note in altered {
            set[note.index()] = true;
        }
        Self {
            name: name.into(),
            altered: set,
            sharps,
        }
    }

    /// Build a scale from a circle-of-fifths position.
    /// Positive = that many sharps, negative = that many flats.
    pub fn from_fifths(name: impl Into<String>, fifths: i8) -> Self {
        let count = fifths.unsigned_abs().min(7) as usize;
        if fifths >= 0 {
            Self::new(name, &SHARP_ORDER[..count], true)
        } else {
            Self::new(name, &FLAT_ORDER[..count], false)
        }
    }

    /// Look up a built-in scale.
    ///
    /// Accepts `"G Major"`, `"g major"`, `"G"` (major), `"E Minor"` and `"Em"`.
    pub fn from_name(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        let mut parts = trimmed.split_whitespace();
        let first = parts.next()?;

        let (tonic, minor) = match (parts.next(), parts.next()) {
            (Some(mode), None) if mode.eq_ignore_ascii_case("major") => (first, false),
            (Some(mode), None) if mode.eq_ignore_ascii_case("minor") => (first, true),
            (None, None) if first.len() > 1 && first.ends_with('m') => {
                (&first[..first.len() - 1], true)
            }
            (None, None) => (first, false),
            _ => return None,
        };

        let tonic = normalize_tonic(tonic);
        let (table, mode) = if minor {
            (&MINOR_KEYS, "Minor")
        } else {
            (&MAJOR_KEYS, "Major")
        };
        table
            .iter()
            .find(|(name, _)| *name == tonic)
            .map(|(name, fifths)| Self::from_fifths(format!("{} {}", name, mode), *fifths))
    }

    /// All built-in scales, majors first
    pub fn builtin() -> Vec<Scale> {
        MAJOR_KEYS
            .iter()
            .map(|(name, fifths)| Self::from_fifths(format!("{} Major", name), *fifths))
            .chain(
                MINOR_KEYS
                    .iter()
                    .map(|(name, fifths)| Self::from_fifths(format!("{} Minor", name), *fifths)),
            )
            .collect()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// True when altered names are raised, false when they are lowered
    pub fn is_sharps(&self) -> bool {
        self.sharps
    }

    pub fn is_altered(&self, note: NoteName) -> bool {
        self.altered[note.index()]
    }

    /// Semitone alteration this scale applies to a natural name: -1, 0 or +1
    pub fn alteration(&self, note: NoteName) -> i8 {
        match (self.is_altered(note), self.sharps) {
            (false, _) => 0,
            (true, true) => 1,
            (true, false) => -1,
        }
    }

    pub fn altered_notes(&self) -> Vec<NoteName> {
        NoteName::ALL
            .iter()
            .copied()
            .filter(|&n| self.is_altered(n))
            .collect()
    }
}

/// "f#" -> "F#", "bb" -> "Bb"
fn normalize_tonic(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(|c| c.to_lowercase()))
            .collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_c_major_has_no_alterations() {
        let scale = Scale::default();
        assert_eq!(scale.name(), "C Major");
        assert!(scale.altered_notes().is_empty());
    }

    #[test]
    fn test_sharp_keys_follow_circle_of_fifths() {
        let d = Scale::from_name("D Major").unwrap();
        assert_eq!(d.altered_notes(), vec![NoteName::C, NoteName::F]);
        assert!(d.is_sharps());

        let cs = Scale::from_name("C# Major").unwrap();
        assert_eq!(cs.altered_notes().len(), 7);
    }

    #[test]
    fn test_flat_keys_follow_circle_of_fifths() {
        let eb = Scale::from_name("Eb Major").unwrap();
        assert_eq!(eb.altered_notes(), vec![NoteName::E, NoteName::A, NoteName::B]);
        assert!(!eb.is_sharps());
        assert_eq!(eb.alteration(NoteName::A), -1);
    }

    #[test]
    fn test_name_forms() {
        assert_eq!(Scale::from_name("g").unwrap().name(), "G Major");
        assert_eq!(Scale::from_name("em").unwrap().name(), "E Minor");
        assert_eq!(Scale::from_name("bb minor").unwrap().name(), "Bb Minor");
        assert_eq!(Scale::from_name("  F#  MAJOR ").unwrap().name(), "F# Major");
        assert!(Scale::from_name("H Major").is_none());
        assert!(Scale::from_name("C Major Extra").is_none());
        assert!(Scale::from_name("").is_none());
    }

    #[test]
    fn test_relative_minor_shares_signature() {
        let a_minor = Scale::from_name("A Minor").unwrap();
        assert!(a_minor.altered_notes().is_empty());

        let e_minor = Scale::from_name("E Minor").unwrap();
        let g_major = Scale::from_name("G Major").unwrap();
        assert_eq!(e_minor.altered_notes(), g_major.altered_notes());
    }

    #[test]
    fn test_builtin_count() {
        let all = Scale::builtin();
        assert_eq!(all.len(), 30);
        assert_eq!(all[0].name(), "C Major");
        assert_eq!(all[15].name(), "A Minor");
    }
}
