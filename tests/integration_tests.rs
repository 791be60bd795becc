//! Integration tests for Pianola
//!
//! Tests the full pipeline from song document to scheduled timeline.

use pianola::playback::{simulate_with, RecordingAudio, SimulationOptions, VisualEvent};
use pianola::samples::{OfflineMixer, Sample, SampleLoader};
use pianola::{schedule, schedule_with, to_keys, to_readable, KeyBindings, Pitch, PianolaError, Scale, Song};

fn names(source: &str) -> Vec<String> {
    schedule(source)
        .unwrap()
        .notes
        .into_iter()
        .map(|n| n.name)
        .collect()
}

#[test]
fn test_schedule_song_with_frontmatter() {
    let source = r#"---
title: Scale Test
tempo: 60
---
- one beat per second
tyu
"#;
    let timeline = schedule(source).unwrap();
    assert_eq!(timeline.title.as_deref(), Some("Scale Test"));
    assert_eq!(timeline.tempo, 60);
    let times: Vec<f64> = timeline.notes.iter().map(|n| n.time).collect();
    assert_eq!(times.len(), 3);
    assert!((times[1] - 1.0).abs() < 1e-9);
    assert!((times[2] - 2.0).abs() < 1e-9);
}

#[test]
fn test_schedule_applies_scale_and_bindings() {
    let source = r#"---
scale: D Major
bindings:
  t: { normal: y, shifted: Y }
---
ti
"#;
    // 't' plays the binding's D4; 'i' is F#4 in D major
    assert_eq!(names(source), vec!["d4", "f#4"]);
}

#[test]
fn test_schedule_chords_and_grace_runs() {
    let timeline = schedule("[tuo] {tuo}").unwrap();
    assert_eq!(timeline.notes.len(), 6);
    assert!(timeline.notes[..3].iter().all(|n| n.time.abs() < 1e-9));
    assert!((timeline.notes[4].time - (0.5 + 0.5 / 3.0)).abs() < 1e-9);
}

#[test]
fn test_schedule_reports_parse_errors() {
    match schedule("---\ntitle: Broken\ntu") {
        Err(PianolaError::ParseError { line, .. }) => assert_eq!(line, 1),
        other => panic!("expected parse error, got {:?}", other.map(|t| t.notes.len())),
    }
    assert!(matches!(
        schedule("---\nscale: H Major\n---\nt"),
        Err(PianolaError::MetadataError(_))
    ));
}

#[test]
fn test_schedule_from_line_skips_earlier_lines() {
    let options = SimulationOptions {
        start_line: 2,
        ..SimulationOptions::default()
    };
    let timeline = schedule_with("t\ny\nu\n~\ni", &options).unwrap();
    let names: Vec<&str> = timeline.notes.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(names, vec!["e4", "f4"]);
    assert!(timeline
        .events
        .iter()
        .all(|e| e.event != VisualEvent::HighlightLine(0)));
}

#[test]
fn test_timeline_serializes_to_camel_case_json() {
    let timeline = schedule("---\ntitle: Json\n---\nt").unwrap();
    let json = serde_json::to_value(&timeline).unwrap();
    assert_eq!(json["title"], "Json");
    assert_eq!(json["notes"][0]["name"], "c4");
    assert_eq!(json["notes"][0]["pitch"], 48);
    assert_eq!(json["notes"][0]["midi"], 60);
    assert_eq!(json["events"][0]["event"]["kind"], "highlightLine");
}

#[test]
fn test_embedded_songs_all_parse_and_play() {
    for file in pianola_songs::get_all_songs() {
        let song = Song::parse(&file.content)
            .unwrap_or_else(|e| panic!("{} failed to parse: {}", file.name, e));
        assert!(song.title.is_some(), "{} has no title", file.name);
        let timeline = schedule(&file.content).unwrap();
        assert!(!timeline.notes.is_empty(), "{} plays nothing", file.name);
    }
}

#[test]
fn test_translation_round_trip_on_embedded_song() {
    let file = pianola_songs::get_song("ode-to-joy").unwrap();
    let song = Song::parse(&file.content).unwrap();
    let sheet = song.lines.join("\n");

    let readable = to_readable(&sheet, &song.scale, &song.bindings);
    assert!(readable.contains("<e4><e4><f4><g4>"));
    assert_eq!(to_keys(&readable, &song.scale, &song.bindings), sheet);
}

#[test]
fn test_translation_in_minor_scale() {
    let scale = Scale::from_name("E minor").unwrap();
    let readable = to_readable("i", &scale, &KeyBindings::new());
    assert_eq!(readable, "<f#4>");
}

struct SineLoader;

impl SampleLoader for SineLoader {
    fn load(&self, pitch: Pitch) -> Result<Sample, PianolaError> {
        let rate = 1_000;
        let freq = 440.0 * 2f32.powf((pitch.midi() as f32 - 69.0) / 12.0);
        let data = (0..100)
            .map(|i| (i as f32 / rate as f32 * freq * std::f32::consts::TAU).sin())
            .collect();
        Ok(Sample::new(rate, data))
    }
}

#[test]
fn test_offline_render_places_notes_on_the_clock() {
    let song = Song::from_sheet("t.u");
    let mixer = OfflineMixer::new(SineLoader, 1_000).with_gain(1.0);
    let (timeline, mixer) = simulate_with(&song, &SimulationOptions::default(), mixer);

    assert_eq!(timeline.notes.len(), 2);
    assert_eq!(mixer.cache().len(), 2);
    let buffer = mixer.buffer();
    // First note at 50ms, silence during the rest, second note at 1.05s
    assert!(buffer[50..150].iter().any(|s| s.abs() > 0.1));
    assert!(buffer[200..1_000].iter().all(|s| *s == 0.0));
    assert!(buffer[1_050..1_150].iter().any(|s| s.abs() > 0.1));
}

#[test]
fn test_offline_render_trimmed_to_the_play_anchor() {
    let song = Song::from_sheet("t.u");
    let options = SimulationOptions::default();
    let mixer = OfflineMixer::new(SineLoader, 1_000).with_gain(1.0);
    let (timeline, mixer) = simulate_with(&song, &options, mixer);

    let buffer = mixer.into_buffer_from(options.config.latency);
    // Notes now start at the timeline's own times: 0s and 1s
    assert_eq!(timeline.notes[0].time, 0.0);
    assert!(buffer[..100].iter().any(|s| s.abs() > 0.1));
    assert!(buffer[150..1_000].iter().all(|s| *s == 0.0));
    assert!(buffer[1_000..1_100].iter().any(|s| s.abs() > 0.1));
}

#[test]
fn test_recording_sink_matches_timeline() {
    let song = Song::from_sheet("{tu}[io]");
    let (timeline, audio) = simulate_with(&song, &SimulationOptions::default(), RecordingAudio::new());
    assert_eq!(audio.notes.len(), timeline.notes.len());
    for (recorded, note) in audio.notes.iter().zip(&timeline.notes) {
        assert_eq!(recorded.pitch, note.pitch);
        assert!((recorded.time - 0.05 - note.time).abs() < 1e-9);
    }
}
