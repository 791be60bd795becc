use pianola::keymap::Pitch;
use pianola::playback::{AudioSink, PlayState, Scheduler, VisualEvent};
use pianola::{PianolaError, Scale, Song};
use serde::Serialize;
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
extern "C" {
    /// Audio backend supplied by the page, usually wrapping an AudioContext
    pub type AudioHost;

    #[wasm_bindgen(method, js_name = scheduleNote)]
    fn schedule_note(this: &AudioHost, pitch: u8, time: f64);

    #[wasm_bindgen(method, js_name = currentTime)]
    fn current_time(this: &AudioHost) -> f64;

    #[wasm_bindgen(method)]
    fn resume(this: &AudioHost);
}

#[derive(Serialize)]
struct LoadError {
    message: String,
    line: Option<usize>,
}

fn error_to_load_error(e: PianolaError) -> LoadError {
    match e {
        PianolaError::ParseError { line, message } => LoadError {
            message,
            line: Some(line),
        },
        other => LoadError {
            message: other.to_string(),
            line: None,
        },
    }
}

fn to_js_error(e: PianolaError) -> JsValue {
    let error = error_to_load_error(e);
    match serde_json::to_string(&error) {
        Ok(json) => JsValue::from_str(&json),
        Err(_) => JsValue::from_str(&error.message),
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}

struct HostAudio {
    host: AudioHost,
}

impl AudioSink for HostAudio {
    fn schedule_note(&mut self, pitch: Pitch, start: f64) {
        self.host.schedule_note(pitch.value(), start);
    }

    fn current_time(&self) -> f64 {
        self.host.current_time()
    }

    fn ensure_ready(&mut self) {
        self.host.resume();
    }
}

/// A piano with sheet autoplay.
///
/// The page drives it: call `tick()` every 25ms (see `tickInterval`) and
/// `frame()` from `requestAnimationFrame` while playing.
#[wasm_bindgen]
pub struct Piano {
    scheduler: Scheduler<HostAudio, Vec<VisualEvent>>,
}

#[wasm_bindgen]
impl Piano {
    #[wasm_bindgen(constructor)]
    pub fn new(host: AudioHost) -> Piano {
        Piano {
            scheduler: Scheduler::new(HostAudio { host }, Vec::new()),
        }
    }

    /// Load a song document, stopping current playback
    pub fn load(&mut self, source: &str) -> Result<(), JsValue> {
        let song = Song::parse(source).map_err(to_js_error)?;
        self.scheduler.load(song);
        Ok(())
    }

    pub fn play(&mut self) {
        self.scheduler.play();
    }

    pub fn pause(&mut self) {
        self.scheduler.pause();
    }

    pub fn stop(&mut self) {
        self.scheduler.stop();
    }

    pub fn seek(&mut self, line: usize) {
        self.scheduler.seek(line);
    }

    /// Speed in percent of the song tempo
    #[wasm_bindgen(js_name = setTempo)]
    pub fn set_tempo(&mut self, percent: u32) {
        self.scheduler.set_tempo(percent);
    }

    pub fn tick(&mut self) {
        self.scheduler.tick();
    }

    /// Reconcile visuals and return the due events as a JSON array.
    ///
    /// Events queued by `seek`, `stop` or `pressKey` are included even when
    /// not playing.
    pub fn frame(&mut self) -> String {
        self.scheduler.reconcile();
        let events: Vec<VisualEvent> = self.scheduler.visual_mut().drain(..).collect();
        to_json(&events)
    }

    /// Play a key live; returns the pitch, if the key plays one
    #[wasm_bindgen(js_name = pressKey)]
    pub fn press_key(&mut self, key: char, shift: bool) -> Option<u8> {
        self.scheduler.play_key(key, shift).map(Pitch::value)
    }

    /// "stopped", "playing" or "paused"
    pub fn state(&self) -> String {
        match self.scheduler.state() {
            PlayState::Stopped => "stopped",
            PlayState::Playing => "playing",
            PlayState::Paused => "paused",
        }
        .to_string()
    }

    #[wasm_bindgen(js_name = currentLine)]
    pub fn current_line(&self) -> usize {
        self.scheduler.cursor().line
    }

    /// Scheduling tick period in milliseconds
    #[wasm_bindgen(js_name = tickInterval)]
    pub fn tick_interval(&self) -> f64 {
        self.scheduler.config().tick_interval * 1000.0
    }
}

/// Simulate a whole song and return its timeline as JSON
#[wasm_bindgen]
pub fn schedule(source: &str) -> Result<String, JsValue> {
    pianola::schedule(source)
        .map(|timeline| to_json(&timeline))
        .map_err(to_js_error)
}

#[derive(Clone, Copy)]
enum Notation {
    Keys,
    Readable,
}

/// Translate the sheet of a song document under its own bindings.
/// `scale` overrides the song's scale when given.
fn translate_document(
    source: &str,
    scale: Option<&str>,
    to: Notation,
) -> Result<String, PianolaError> {
    let song = Song::parse(source)?;
    let scale = match scale {
        Some(name) => Scale::from_name(name)
            .ok_or_else(|| PianolaError::MetadataError(format!("Unknown scale: {}", name)))?,
        None => song.scale.clone(),
    };
    let sheet = song.lines.join("\n");
    Ok(match to {
        Notation::Readable => pianola::to_readable(&sheet, &scale, &song.bindings),
        Notation::Keys => pianola::to_keys(&sheet, &scale, &song.bindings),
    })
}

/// Rewrite the keys of a song document as `<c4>`-style pitch names
#[wasm_bindgen(js_name = toReadable)]
pub fn to_readable(source: &str, scale: Option<String>) -> Result<String, JsValue> {
    translate_document(source, scale.as_deref(), Notation::Readable).map_err(to_js_error)
}

/// Rewrite the `<c4>`-style pitch names of a song document as keys
#[wasm_bindgen(js_name = toKeys)]
pub fn to_keys(source: &str, scale: Option<String>) -> Result<String, JsValue> {
    translate_document(source, scale.as_deref(), Notation::Keys).map_err(to_js_error)
}

/// Names of the embedded songs
#[wasm_bindgen(js_name = listSongs)]
pub fn list_songs() -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(&pianola_songs::list_songs()).map_err(JsValue::from)
}

/// Document of an embedded song
#[wasm_bindgen(js_name = getSong)]
pub fn get_song(name: &str) -> Option<String> {
    pianola_songs::get_song(name).map(|song| song.content)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REBOUND: &str = "---\nscale: C Major\nbindings:\n  q: { normal: w, shifted: W }\n---\nq t";

    #[test]
    fn test_translation_follows_song_bindings() {
        let readable = translate_document(REBOUND, None, Notation::Readable).unwrap();
        assert_eq!(readable, "<g3> <c4>");
    }

    #[test]
    fn test_translation_uses_song_scale_unless_overridden() {
        let source = "---\nscale: D Major\n---\ni";
        assert_eq!(
            translate_document(source, None, Notation::Readable).unwrap(),
            "<f#4>"
        );
        assert_eq!(
            translate_document(source, Some("C Major"), Notation::Readable).unwrap(),
            "<f4>"
        );
    }

    #[test]
    fn test_plain_sheet_translates_to_keys() {
        assert_eq!(
            translate_document("<c4> [<e4><g4>]", None, Notation::Keys).unwrap(),
            "t [uo]"
        );
    }

    #[test]
    fn test_unknown_scale_is_a_metadata_error() {
        let err = translate_document("t", Some("H Major"), Notation::Keys).unwrap_err();
        assert!(matches!(err, PianolaError::MetadataError(_)));
    }
}
