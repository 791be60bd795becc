pub mod error;
pub mod keymap;
pub mod lexer;
pub mod playback;
pub mod samples;
pub mod scale;
pub mod song;
pub mod translate;
#[cfg(feature = "native")]
pub mod transport;

pub use error::*;
pub use keymap::{resolve_pitch, KeyBindings, Pitch};
pub use lexer::{tokenize_line, Token};
pub use playback::{simulate, Scheduler, SimulationOptions, Timeline};
pub use scale::Scale;
pub use song::Song;
pub use translate::{to_keys, to_readable};

/// Parse a song document and play it offline from the top.
/// This is the main entry point for the library.
pub fn schedule(source: &str) -> Result<Timeline, PianolaError> {
    schedule_with(source, &SimulationOptions::default())
}

/// Parse a song document and play it offline with the given options
pub fn schedule_with(source: &str, options: &SimulationOptions) -> Result<Timeline, PianolaError> {
    let song = Song::parse(source)?;
    Ok(simulate(&song, options))
}
