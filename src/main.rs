use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tokio::task::LocalSet;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use pianola::playback::{simulate_with, EngineConfig, Scheduler, SimulationOptions, VisualEvent, VisualSink};
use pianola::samples::{write_wav, OfflineMixer, WavDirLoader, DEFAULT_SAMPLE_RATE};
use pianola::transport::{Transport, WallClockAudio};
use pianola::{simulate, to_keys, to_readable, Scale, Song};

#[derive(Parser)]
#[command(name = "pianola")]
#[command(about = "Keyboard piano sheets: autoplay, rendering and notation tools")]
struct Cli {
    /// Engine timing config (YAML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the scheduled timeline of a song as JSON
    Schedule {
        /// Song file, or @name for an embedded song
        song: String,

        /// Speed in percent of the song tempo
        #[arg(short, long, default_value = "100")]
        tempo: u32,

        /// Line to start from
        #[arg(short, long, default_value = "0")]
        from: usize,
    },

    /// Autoplay a song in real time
    Play {
        /// Song file, or @name for an embedded song
        song: String,

        #[arg(short, long, default_value = "100")]
        tempo: u32,

        #[arg(short, long, default_value = "0")]
        from: usize,
    },

    /// Render a song to a WAV file from per-pitch samples
    Render {
        /// Song file, or @name for an embedded song
        song: String,

        output: PathBuf,

        /// Directory holding c4.wav, c#4.wav, ...
        #[arg(short, long)]
        samples: PathBuf,

        #[arg(long, default_value_t = DEFAULT_SAMPLE_RATE)]
        sample_rate: u32,

        #[arg(short, long, default_value = "100")]
        tempo: u32,
    },

    /// Convert a sheet between key and readable notation
    Translate {
        file: PathBuf,

        #[arg(long, value_enum, default_value = "readable")]
        to: Notation,

        /// Scale to translate in, overriding the song's own
        #[arg(long)]
        scale: Option<String>,
    },

    /// List the embedded songs
    Songs,

    /// List the built-in scales
    Scales,
}

#[derive(Clone, Copy, ValueEnum)]
enum Notation {
    Keys,
    Readable,
}

/// Prints highlighted lines and flashed notes as they happen
struct ConsoleVisual {
    lines: Vec<String>,
    /// Page of each line
    page_of: Vec<usize>,
    page_count: usize,
    current: Option<usize>,
    page: Option<usize>,
}

impl ConsoleVisual {
    fn for_song(song: &Song) -> Self {
        Self {
            lines: song.lines.clone(),
            page_of: (0..song.line_count()).map(|l| song.page_of_line(l)).collect(),
            page_count: song.pages().len(),
            current: None,
            page: None,
        }
    }
}

impl VisualSink for ConsoleVisual {
    fn emit(&mut self, event: VisualEvent) {
        match event {
            VisualEvent::HighlightLine(line) if self.current != Some(line) => {
                self.current = Some(line);
                let page = self.page_of.get(line).copied().unwrap_or(0);
                if self.page_count > 1 && self.page != Some(page) {
                    self.page = Some(page);
                    println!("---- page {}/{}", page + 1, self.page_count);
                }
                let text = self.lines.get(line).map(String::as_str).unwrap_or("");
                println!("{:>4} | {}", line + 1, text);
            }
            VisualEvent::FlashPitch(pitch) => println!("     |   {}", pitch),
            VisualEvent::Stopped => {
                self.current = None;
                self.page = None;
                println!("     ■");
            }
            _ => {}
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => EngineConfig::from_yaml(&fs::read_to_string(path)?)?,
        None => EngineConfig::default(),
    };

    match cli.command {
        Commands::Schedule { song, tempo, from } => {
            let song = load_song(&song)?;
            let options = SimulationOptions {
                config,
                tempo_percent: tempo,
                start_line: from,
            };
            let timeline = simulate(&song, &options);
            println!("{}", serde_json::to_string_pretty(&timeline)?);
        }

        Commands::Play { song, tempo, from } => {
            let song = load_song(&song)?;
            info!(
                "Playing {} at {}%",
                song.title.as_deref().unwrap_or("untitled"),
                tempo
            );
            let visual = ConsoleVisual::for_song(&song);
            let mut scheduler = Scheduler::with_config(WallClockAudio::new(), visual, config);
            scheduler.load(song);
            scheduler.set_tempo(tempo);

            LocalSet::new()
                .run_until(async move {
                    let mut transport = Transport::new(scheduler);
                    if from > 0 {
                        transport.seek(from);
                    }
                    transport.play();
                    let interrupted = tokio::select! {
                        _ = transport.finished() => false,
                        _ = tokio::signal::ctrl_c() => true,
                    };
                    if interrupted {
                        warn!("Interrupted");
                        transport.stop();
                    }
                })
                .await;
        }

        Commands::Render {
            song,
            output,
            samples,
            sample_rate,
            tempo,
        } => {
            let song = load_song(&song)?;
            let options = SimulationOptions {
                config,
                tempo_percent: tempo,
                start_line: 0,
            };
            let mixer = OfflineMixer::new(WavDirLoader::new(samples, sample_rate), sample_rate);
            let (timeline, mixer) = simulate_with(&song, &options, mixer);
            if mixer.cache().is_empty() {
                warn!("No samples could be loaded; the output will be silent");
            }
            // The file starts at the play anchor, without the scheduling lead-in
            let rate = mixer.rate();
            let buffer = mixer.into_buffer_from(options.config.latency);
            write_wav(&output, &buffer, rate)?;
            info!(
                "Rendered {} notes ({:.1}s) to {}",
                timeline.notes.len(),
                timeline.duration,
                output.display()
            );
        }

        Commands::Translate { file, to, scale } => {
            let song = Song::parse(&fs::read_to_string(&file)?)?;
            let scale = match scale {
                Some(name) => {
                    Scale::from_name(&name).ok_or_else(|| format!("Unknown scale: {}", name))?
                }
                None => song.scale.clone(),
            };
            let sheet = song.lines.join("\n");
            let translated = match to {
                Notation::Readable => to_readable(&sheet, &scale, &song.bindings),
                Notation::Keys => to_keys(&sheet, &scale, &song.bindings),
            };
            println!("{}", translated);
        }

        Commands::Songs => {
            for name in pianola_songs::list_songs() {
                println!("{}", name);
            }
        }

        Commands::Scales => {
            for scale in Scale::builtin() {
                println!("{}", scale.name());
            }
        }
    }

    Ok(())
}

/// Read a song from a file, or from the embedded library for `@name`
fn load_song(arg: &str) -> Result<Song, Box<dyn std::error::Error>> {
    let source = match arg.strip_prefix('@') {
        Some(name) => pianola_songs::get_song(name)
            .ok_or_else(|| format!("No embedded song named '{}'", name))?
            .content,
        None => fs::read_to_string(arg)?,
    };
    Ok(Song::parse(&source)?)
}
