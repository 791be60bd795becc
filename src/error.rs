//! # Error Types
//!
//! This module defines all error types for Pianola.
//!
//! Errors are only produced while *loading* things: song documents, binding
//! tables, engine configuration and audio samples. Playback control
//! operations (`play`, `pause`, `seek`, ...) never fail; they log and no-op.
//!
//! ## Error Types
//! - `ParseError` - Structural problems in a song document, with line information
//! - `MetadataError` - Invalid YAML frontmatter values (tempo, scale, bindings)
//! - `SampleError` - A sample for a pitch could not be loaded or decoded
//! - `Io` - File system errors
//!
//! ## Usage
//! ```rust
//! use pianola::{Song, PianolaError};
//!
//! match Song::parse("---\ntempo: 0\n---\nasdf") {
//!     Ok(song) => println!("{} lines", song.lines.len()),
//!     Err(PianolaError::MetadataError(message)) => eprintln!("Bad header: {}", message),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PianolaError {
    /// Structural error in a song document.
    ///
    /// # Example
    /// ```
    /// # use pianola::PianolaError;
    /// let err = PianolaError::ParseError {
    ///     line: 1,
    ///     message: "Unterminated frontmatter".to_string(),
    /// };
    /// assert_eq!(err.to_string(), "Parse error at line 1: Unterminated frontmatter");
    /// ```
    #[error("Parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    /// Invalid metadata error.
    ///
    /// Occurs when YAML frontmatter is invalid or contains unsupported values.
    ///
    /// # Example
    /// ```
    /// # use pianola::PianolaError;
    /// let err = PianolaError::MetadataError("tempo must be a positive integer".to_string());
    /// assert_eq!(err.to_string(), "Invalid metadata: tempo must be a positive integer");
    /// ```
    #[error("Invalid metadata: {0}")]
    MetadataError(String),

    /// A sample could not be loaded for a pitch.
    #[error("Sample error for {pitch}: {message}")]
    SampleError { pitch: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
