//! # Sheet Lexer
//!
//! Splits one line of sheet notation into tokens.
//!
//! ## Notation
//! ```text
//! [ceg]   chord: every key inside sounds at once
//! {ab}    grace run: the keys split one beat evenly
//! .       rest: one beat of silence
//! ' '     separator: no sound, no time
//! t       any other character is a single note
//! ```
//!
//! Brackets do not nest. The content of a chord or grace run is everything up
//! to the first matching closing delimiter. An opening delimiter without a
//! closing one produces an empty token that consumes only the delimiter, so
//! the characters after it are read as single notes.
//!
//! Comment lines (`-`) and page breaks (`~`) are recognised by the song model
//! and never reach the lexer during playback.
//!
//! ## Example
//! ```rust
//! use pianola::lexer::{tokenize_line, Token};
//!
//! let tokens: Vec<Token> = tokenize_line("[tu] o.").into_iter().map(|t| t.token).collect();
//! assert_eq!(tokens, vec![Token::Chord("tu".to_string()), Token::Note('o'), Token::Rest]);
//! ```

/// Token types for sheet notation
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A single key
    Note(char),
    /// `[...]` keys played together
    Chord(String),
    /// `{...}` keys played in sequence within one beat
    GraceRun(String),
    /// `.`
    Rest,
    /// Trailing separators with nothing after them
    Skip,
}

impl Token {
    /// Characters to sound for this token
    pub fn content(&self) -> String {
        match self {
            Token::Note(c) => c.to_string(),
            Token::Chord(keys) | Token::GraceRun(keys) => keys.clone(),
            Token::Rest | Token::Skip => String::new(),
        }
    }
}

/// A token with its character span in the line
#[derive(Debug, Clone, PartialEq)]
pub struct LocatedToken {
    pub token: Token,
    /// Index of the token's first character
    pub start: usize,
    /// Index to resume lexing from
    pub next: usize,
}

/// Read one token from `line` starting at character `index`.
///
/// Separators are skipped before the token is read. When only separators
/// remain, a [`Token::Skip`] ending at the line's length is returned.
pub fn next_token(line: &[char], index: usize) -> LocatedToken {
    let mut start = index;
    while start < line.len() && line[start] == ' ' {
        start += 1;
    }

    if start >= line.len() {
        return LocatedToken {
            token: Token::Skip,
            start: index,
            next: line.len().max(index),
        };
    }

    let (token, next) = match line[start] {
        '[' => delimited(line, start, ']', Token::Chord),
        '{' => delimited(line, start, '}', Token::GraceRun),
        '.' => (Token::Rest, start + 1),
        c => (Token::Note(c), start + 1),
    };

    LocatedToken { token, start, next }
}

fn delimited(
    line: &[char],
    open: usize,
    close: char,
    make: fn(String) -> Token,
) -> (Token, usize) {
    match line[open + 1..].iter().position(|&c| c == close) {
        Some(offset) => {
            let end = open + 1 + offset;
            (make(line[open + 1..end].iter().collect()), end + 1)
        }
        None => (make(String::new()), open + 1),
    }
}

/// Lexer over a whole line
pub struct Lexer {
    chars: Vec<char>,
    position: usize,
}

impl Lexer {
    pub fn new(line: &str) -> Self {
        Self {
            chars: line.chars().collect(),
            position: 0,
        }
    }
}

impl Iterator for Lexer {
    type Item = LocatedToken;

    fn next(&mut self) -> Option<LocatedToken> {
        if self.position >= self.chars.len() {
            return None;
        }
        let token = next_token(&self.chars, self.position);
        self.position = token.next;
        Some(token)
    }
}

/// All tokens of a line, in order
pub fn tokenize_line(line: &str) -> Vec<LocatedToken> {
    Lexer::new(line).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(line: &str) -> Vec<Token> {
        tokenize_line(line).into_iter().map(|t| t.token).collect()
    }

    #[test]
    fn test_chord() {
        assert_eq!(tokens("[ceg]"), vec![Token::Chord("ceg".to_string())]);
    }

    #[test]
    fn test_grace_run() {
        assert_eq!(tokens("{ab}"), vec![Token::GraceRun("ab".to_string())]);
    }

    #[test]
    fn test_notes_and_rest() {
        assert_eq!(tokens("a.b"), vec![Token::Note('a'), Token::Rest, Token::Note('b')]);
    }

    #[test]
    fn test_spaces_are_skipped() {
        assert_eq!(tokens("a  b"), vec![Token::Note('a'), Token::Note('b')]);
        let located = tokenize_line("  t");
        assert_eq!(located.len(), 1);
        assert_eq!(located[0].start, 2);
        assert_eq!(located[0].next, 3);
    }

    #[test]
    fn test_trailing_spaces_yield_skip() {
        assert_eq!(tokens("a   "), vec![Token::Note('a'), Token::Skip]);
        assert_eq!(tokens("   "), vec![Token::Skip]);
    }

    #[test]
    fn test_long_space_run() {
        let line = format!("{}t", " ".repeat(100_000));
        let located = tokenize_line(&line);
        assert_eq!(located.len(), 1);
        assert_eq!(located[0].token, Token::Note('t'));
    }

    #[test]
    fn test_unterminated_chord_is_empty() {
        let located = tokenize_line("[ab");
        assert_eq!(located[0].token, Token::Chord(String::new()));
        assert_eq!(located[0].next, 1);
        assert_eq!(
            tokens("[ab"),
            vec![Token::Chord(String::new()), Token::Note('a'), Token::Note('b')]
        );
        assert_eq!(
            tokens("{a"),
            vec![Token::GraceRun(String::new()), Token::Note('a')]
        );
    }

    #[test]
    fn test_no_nesting() {
        // Grace content keeps the inner chord verbatim up to the first '}'
        assert_eq!(tokens("{a[bc]d}"), vec![Token::GraceRun("a[bc]d".to_string())]);
        // A chord ends at the first ']'
        assert_eq!(
            tokens("[a[b]c]"),
            vec![Token::Chord("a[b".to_string()), Token::Note('c'), Token::Note(']')]
        );
    }

    #[test]
    fn test_positions() {
        let located = tokenize_line("t [uo] {pa}");
        let spans: Vec<(usize, usize)> = located.iter().map(|t| (t.start, t.next)).collect();
        assert_eq!(spans, vec![(0, 1), (2, 6), (7, 11)]);
    }

    #[test]
    fn test_next_token_past_end() {
        let chars: Vec<char> = "ab".chars().collect();
        let token = next_token(&chars, 2);
        assert_eq!(token.token, Token::Skip);
        assert_eq!(token.next, 2);
    }

    #[test]
    fn test_token_content() {
        assert_eq!(Token::Note('T').content(), "T");
        assert_eq!(Token::Chord("tu".to_string()).content(), "tu");
        assert_eq!(Token::Rest.content(), "");
    }
}
