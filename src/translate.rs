//! # Notation Translator
//!
//! Converts sheets between key notation (`tu [io]`) and readable pitch
//! notation (`<c4><e4> [<g4><b4>]`).
//!
//! ## Rules
//! - Comment lines (starting with `-`) are copied unchanged in both directions.
//! - Notation symbols (space, tab, `[ ] { } . ~`) are copied unchanged.
//! - A key that plays a pitch becomes `<name>`, using the sharp spelling.
//! - A readable `<note[#]octave>` becomes the key that plays it, preferring
//!   an unshifted key. Tags are case-insensitive.
//! - Anything that cannot be translated is copied as is.
//!
//! ## Example
//! ```rust
//! use pianola::keymap::KeyBindings;
//! use pianola::translate::{to_keys, to_readable};
//! use pianola::Scale;
//!
//! let scale = Scale::default();
//! let bindings = KeyBindings::new();
//!
//! let readable = to_readable("t[uo]", &scale, &bindings);
//! assert_eq!(readable, "<c4>[<e4><g4>]");
//! assert_eq!(to_keys(&readable, &scale, &bindings), "t[uo]");
//! ```

use crate::keymap::{key_for_pitch, resolve_pitch, KeyBindings, Pitch};
use crate::scale::{NoteName, Scale};
use crate::song::{classify_line, LineKind};

/// Characters with a meaning in sheet notation, never translated
const NOTATION_SYMBOLS: [char; 8] = [' ', '\t', '[', ']', '{', '}', '.', '~'];

/// Rewrite keys as readable pitch names
pub fn to_readable(text: &str, scale: &Scale, bindings: &KeyBindings) -> String {
    map_lines(text, |line| {
        let mut out = String::with_capacity(line.len() * 4);
        for c in line.chars() {
            if NOTATION_SYMBOLS.contains(&c) {
                out.push(c);
                continue;
            }
            match resolve_pitch(c, false, scale, bindings) {
                Some(pitch) => {
                    out.push('<');
                    out.push_str(&pitch.name());
                    out.push('>');
                }
                None => out.push(c),
            }
        }
        out
    })
}

/// Rewrite readable pitch names as keys
pub fn to_keys(text: &str, scale: &Scale, bindings: &KeyBindings) -> String {
    map_lines(text, |line| {
        let chars: Vec<char> = line.chars().collect();
        let mut out = String::with_capacity(line.len());
        let mut i = 0;
        while i < chars.len() {
            if chars[i] == '<' {
                if let Some((pitch, len)) = parse_readable(&chars[i..]) {
                    if let Some(key) = key_for_pitch(pitch, scale, bindings) {
                        out.push(key);
                        i += len;
                        continue;
                    }
                }
            }
            out.push(chars[i]);
            i += 1;
        }
        out
    })
}

/// Apply `f` to every line that is not a comment, keeping line endings
fn map_lines<F>(text: &str, mut f: F) -> String
where
    F: FnMut(&str) -> String,
{
    text.split('\n')
        .map(|line| {
            if classify_line(line) == LineKind::Comment {
                line.to_string()
            } else {
                f(line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse a `<note[#]octave>` tag at the start of `chars`.
///
/// Returns the pitch and the number of characters the tag spans.
fn parse_readable(chars: &[char]) -> Option<(Pitch, usize)> {
    if chars.first() != Some(&'<') {
        return None;
    }
    let name = NoteName::from_char(*chars.get(1)?)?;
    let mut i = 2;
    let sharp = chars.get(i) == Some(&'#');
    if sharp {
        i += 1;
    }

    let digits_start = i;
    let mut octave: u8 = 0;
    while let Some(digit) = chars.get(i).and_then(|c| c.to_digit(10)) {
        octave = octave.checked_mul(10)?.checked_add(digit as u8)?;
        i += 1;
    }
    if i == digits_start || chars.get(i) != Some(&'>') {
        return None;
    }

    Pitch::from_name(name, sharp, octave).map(|pitch| (pitch, i + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::Binding;

    fn c_major() -> (Scale, KeyBindings) {
        (Scale::default(), KeyBindings::new())
    }

    #[test]
    fn test_to_readable_notes_and_symbols() {
        let (scale, bindings) = c_major();
        assert_eq!(
            to_readable("t y.{ui}", &scale, &bindings),
            "<c4> <d4>.{<e4><f4>}"
        );
    }

    #[test]
    fn test_to_readable_shifted_keys() {
        let (scale, bindings) = c_major();
        assert_eq!(to_readable("T!", &scale, &bindings), "<c#4><c#2>");
    }

    #[test]
    fn test_to_readable_keeps_unknown_characters() {
        let (scale, bindings) = c_major();
        assert_eq!(to_readable("t,|u", &scale, &bindings), "<c4>,|<e4>");
    }

    #[test]
    fn test_comment_lines_unchanged() {
        let (scale, bindings) = c_major();
        let text = "- verse one\ntu\n~";
        assert_eq!(to_readable(text, &scale, &bindings), "- verse one\n<c4><e4>\n~");
        assert_eq!(to_keys("- <c4>\n<c4>", &scale, &bindings), "- <c4>\nt");
    }

    #[test]
    fn test_to_readable_uses_scale() {
        let scale = Scale::from_name("G Major").unwrap();
        let bindings = KeyBindings::new();
        assert_eq!(to_readable("4$", &scale, &bindings), "<f#2><f2>");
    }

    #[test]
    fn test_to_readable_uses_bindings() {
        let scale = Scale::default();
        let mut bindings = KeyBindings::new();
        bindings
            .set('t', Binding { normal: 'y', shifted: 'Y' })
            .unwrap();
        assert_eq!(to_readable("t", &scale, &bindings), "<d4>");
    }

    #[test]
    fn test_to_keys_case_insensitive() {
        let (scale, bindings) = c_major();
        assert_eq!(to_keys("<C4> <c#4><E4>", &scale, &bindings), "t Tu");
    }

    #[test]
    fn test_to_keys_keeps_unparsable_tags() {
        let (scale, bindings) = c_major();
        assert_eq!(to_keys("<h4>", &scale, &bindings), "<h4>");
        assert_eq!(to_keys("<c>", &scale, &bindings), "<c>");
        assert_eq!(to_keys("<c4", &scale, &bindings), "<c4");
        assert_eq!(to_keys("<cb4>", &scale, &bindings), "<cb4>");
        // Outside the keyboard
        assert_eq!(to_keys("<c9>", &scale, &bindings), "<c9>");
    }

    #[test]
    fn test_to_keys_prefers_unshifted_keys() {
        let scale = Scale::from_name("D Major").unwrap();
        let bindings = KeyBindings::new();
        // F#4 is the unshifted 'i' in D major
        assert_eq!(to_keys("<f#4>", &scale, &bindings), "i");
        // G#4 needs shift
        assert_eq!(to_keys("<g#4>", &scale, &bindings), "O");
    }

    #[test]
    fn test_parse_readable() {
        let chars: Vec<char> = "<a#3>x".chars().collect();
        assert_eq!(parse_readable(&chars), Some((Pitch(46), 5)));
        let chars: Vec<char> = "<g10>".chars().collect();
        assert_eq!(parse_readable(&chars), Some((Pitch(127), 5)));
        let chars: Vec<char> = "c4>".chars().collect();
        assert_eq!(parse_readable(&chars), None);
    }

    #[test]
    fn test_round_trip_canonical_keys() {
        let (scale, bindings) = c_major();
        let sheet = "tyuiop [tu] {ws}. !@%\n- comment stays <c4>\n~\nasdfghjkl zxcvbnm,";
        let readable = to_readable(sheet, &scale, &bindings);
        assert_eq!(to_keys(&readable, &scale, &bindings), sheet);
    }

    #[test]
    fn test_round_trip_aliased_key_becomes_canonical() {
        let (scale, bindings) = c_major();
        // Shifted E4 sounds F4, which the unshifted key plays
        let readable = to_readable("U", &scale, &bindings);
        assert_eq!(readable, "<f4>");
        assert_eq!(to_keys(&readable, &scale, &bindings), "i");
    }
}
