//! # Key Mapping
//!
//! Converts typing-keyboard characters into pitches, and back.
//!
//! ## Keyboard Layout
//! The 36 playable keys form one row table, read left to right and top to
//! bottom: the digit row, then the three letter rows.
//!
//! ```text
//! 1 2 3 4 5 6 7 8 9 0 q w e r t y u i o p a s d f g h j k l z x c v b n m
//! C D E F G A B C D E F G A B C D E F G A B C D E F G A B C D E F G A B C
//! 2             3             4             5             6             7
//! ```
//!
//! Each key is a natural note. Holding shift (an uppercase letter, or the
//! shift symbol of a digit such as `!` for `1`) moves the note one semitone.
//!
//! ## Scale and Shift
//! The active [`Scale`] decides what the unshifted key plays:
//! - A name the scale leaves alone plays its natural pitch; shift adds one semitone.
//! - A name a sharps scale alters plays natural + 1; shift plays the natural.
//! - A name a flats scale alters plays natural - 1; shift plays the natural.
//!
//! ## Bindings
//! A song may rebind any of the 36 keys through [`KeyBindings`]. A binding
//! names the key to play for the normal and the shifted press; the shift
//! state of the replacement wins over the physical shift state.
//!
//! ## Example
//! ```rust
//! use pianola::keymap::{resolve_pitch, KeyBindings};
//! use pianola::Scale;
//!
//! let scale = Scale::default();
//! let bindings = KeyBindings::new();
//!
//! let c4 = resolve_pitch('t', false, &scale, &bindings).unwrap();
//! assert_eq!(c4.name(), "c4");
//! assert_eq!(c4.midi(), 60);
//!
//! let c_sharp = resolve_pitch('T', false, &scale, &bindings).unwrap();
//! assert_eq!(c_sharp.name(), "c#4");
//! ```

use crate::error::PianolaError;
use crate::scale::{NoteName, Scale};
use serde::Serialize;
use std::fmt;

/// Playable keys in pitch order
pub const KEY_ROW: [char; 36] = [
    '1', '2', '3', '4', '5', '6', '7', '8', '9', '0', //
    'q', 'w', 'e', 'r', 't', 'y', 'u', 'i', 'o', 'p', //
    'a', 's', 'd', 'f', 'g', 'h', 'j', 'k', 'l', //
    'z', 'x', 'c', 'v', 'b', 'n', 'm',
];

/// Shifted digit symbols and the digit they stand for (US layout)
const SHIFT_SYMBOLS: [(char, char); 10] = [
    ('!', '1'),
    ('@', '2'),
    ('#', '3'),
    ('$', '4'),
    ('%', '5'),
    ('^', '6'),
    ('&', '7'),
    ('*', '8'),
    ('(', '9'),
    (')', '0'),
];

/// Octave of the first key in the row
const BASE_OCTAVE: usize = 2;

/// Semitone pitch index. Pitch 0 is C0, so C4 (middle C) is 48.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Pitch(pub u8);

impl Pitch {
    /// Pitch of a note name, optional sharp, and octave (`c#4`)
    pub fn from_name(name: NoteName, sharp: bool, octave: u8) -> Option<Pitch> {
        let value = 12 * octave as u16 + name.semitone() as u16 + sharp as u16;
        u8::try_from(value).ok().map(Pitch)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// MIDI note number (C4 = 60)
    pub fn midi(self) -> u8 {
        self.0.saturating_add(12)
    }

    pub fn octave(self) -> u8 {
        self.0 / 12
    }

    /// Lowercase name with sharp spelling and octave, e.g. `c#4`
    pub fn name(self) -> String {
        let (name, sharp) = match self.0 % 12 {
            0 => ("c", false),
            1 => ("c", true),
            2 => ("d", false),
            3 => ("d", true),
            4 => ("e", false),
            5 => ("f", false),
            6 => ("f", true),
            7 => ("g", false),
            8 => ("g", true),
            9 => ("a", false),
            10 => ("a", true),
            _ => ("b", false),
        };
        format!("{}{}{}", name, if sharp { "#" } else { "" }, self.octave())
    }
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Split a key into its base key and whether the key itself implies shift.
///
/// `'!'` -> `('1', true)`, `'Q'` -> `('q', true)`, `'q'` -> `('q', false)`.
pub fn unshift(key: char) -> (char, bool) {
    if let Some(&(_, digit)) = SHIFT_SYMBOLS.iter().find(|(symbol, _)| *symbol == key) {
        return (digit, true);
    }
    if key.is_ascii_uppercase() {
        return (key.to_ascii_lowercase(), true);
    }
    (key, false)
}

/// The character typed when `base` is pressed with shift
pub fn shifted_form(base: char) -> char {
    SHIFT_SYMBOLS
        .iter()
        .find(|(_, digit)| *digit == base)
        .map(|(symbol, _)| *symbol)
        .unwrap_or_else(|| base.to_ascii_uppercase())
}

/// Zero-based position of a base key in [`KEY_ROW`]
pub fn row_position(key: char) -> Option<usize> {
    KEY_ROW.iter().position(|&k| k == key)
}

/// Replacement keys for one physical key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub normal: char,
    pub shifted: char,
}

/// Per-song key overrides: one optional [`Binding`] per row key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBindings {
    slots: [Option<Binding>; 36],
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyBindings {
    pub fn new() -> Self {
        Self {
            slots: [None; 36],
        }
    }

    /// Bind a physical row key.
    ///
    /// Both replacements must themselves be playable keys (a row key, its
    /// uppercase form, or a shift symbol).
    pub fn set(&mut self, key: char, binding: Binding) -> Result<(), PianolaError> {
        let slot = row_position(key).ok_or_else(|| {
            PianolaError::MetadataError(format!("Cannot bind '{}': not a piano key", key))
        })?;
        for replacement in [binding.normal, binding.shifted] {
            if row_position(unshift(replacement).0).is_none() {
                return Err(PianolaError::MetadataError(format!(
                    "Binding for '{}' names '{}', which is not a piano key",
                    key, replacement
                )));
            }
        }
        self.slots[slot] = Some(binding);
        Ok(())
    }

    pub fn get(&self, key: char) -> Option<Binding> {
        row_position(key).and_then(|slot| self.slots[slot])
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    /// Bound keys in row order
    pub fn iter(&self) -> impl Iterator<Item = (char, Binding)> + '_ {
        KEY_ROW
            .iter()
            .zip(self.slots.iter())
            .filter_map(|(&key, slot)| slot.map(|binding| (key, binding)))
    }

    /// Build a table from `(key, normal, shifted)` strings, as written in song metadata
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, PianolaError>
    where
        I: IntoIterator<Item = (&'a str, &'a str, &'a str)>,
    {
        let mut bindings = Self::new();
        for (key, normal, shifted) in pairs {
            let key = single_char(key, "binding key")?;
            let binding = Binding {
                normal: single_char(normal, "normal binding")?,
                shifted: single_char(shifted, "shifted binding")?,
            };
            bindings.set(key, binding)?;
        }
        Ok(bindings)
    }
}

fn single_char(s: &str, what: &str) -> Result<char, PianolaError> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(PianolaError::MetadataError(format!(
            "{} must be a single character, got '{}'",
            what, s
        ))),
    }
}

/// Resolve a key press to a pitch.
///
/// `shift_held` is the physical shift state; uppercase letters and shift
/// symbols imply shift on their own. Returns `None` for keys outside the
/// piano, so callers can keep the character as-is.
pub fn resolve_pitch(
    key: char,
    shift_held: bool,
    scale: &Scale,
    bindings: &KeyBindings,
) -> Option<Pitch> {
    let (mut base, implied) = unshift(key);
    let mut shifted = shift_held || implied;

    if let Some(binding) = bindings.get(base) {
        let replacement = if shifted { binding.shifted } else { binding.normal };
        let (rebased, replacement_shifted) = unshift(replacement);
        base = rebased;
        shifted = replacement_shifted;
    }

    let position = row_position(base)?;
    let name = NoteName::from_index(position);
    let octave = position / 7 + BASE_OCTAVE;
    let natural = (12 * octave + name.semitone() as usize) as i16;

    let pitch = match (scale.is_altered(name), shifted) {
        (false, false) => natural,
        (false, true) => natural + 1,
        (true, false) => natural + scale.alteration(name) as i16,
        (true, true) => natural,
    };

    u8::try_from(pitch).ok().map(Pitch)
}

/// Find the key that plays `pitch`, preferring unshifted keys.
///
/// Shifted results are returned as the uppercase letter or shift symbol.
pub fn key_for_pitch(pitch: Pitch, scale: &Scale, bindings: &KeyBindings) -> Option<char> {
    for shifted in [false, true] {
        for &key in KEY_ROW.iter() {
            if resolve_pitch(key, shifted, scale, bindings) == Some(pitch) {
                return Some(if shifted { shifted_form(key) } else { key });
            }
        }
    }
    None
}
