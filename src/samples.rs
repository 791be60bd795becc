//! # Samples
//!
//! Piano samples keyed by pitch, and an offline mixer that renders a
//! scheduled performance to a WAV file.
//!
//! ## Purpose
//! The scheduler only names a pitch and a start time. Something has to turn
//! that into sound:
//! - [`SampleLoader`] produces the audio for one pitch, e.g. [`WavDirLoader`]
//!   reads `<dir>/c#4.wav`
//! - [`SampleCache`] loads each pitch at most once and hands out shared
//!   buffers. A failed load is logged and retried on the next request.
//! - [`OfflineMixer`] is an [`AudioSink`] that mixes every scheduled note
//!   into one buffer on a stepped clock, for `simulate_with`
//!
//! All samples are mono `f32` at the mixer's rate.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::PianolaError;
use crate::keymap::Pitch;
use crate::playback::{AudioSink, SteppedClock};

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Mono audio at a fixed rate
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub rate: u32,
    pub data: Vec<f32>,
}

impl Sample {
    pub fn new(rate: u32, data: Vec<f32>) -> Self {
        Self { rate, data }
    }

    /// Length in seconds
    pub fn duration(&self) -> f64 {
        if self.rate == 0 {
            return 0.0;
        }
        self.data.len() as f64 / self.rate as f64
    }

    /// Linear-interpolation resample to `rate`
    pub fn resampled(&self, rate: u32) -> Sample {
        if rate == self.rate || self.data.is_empty() || self.rate == 0 {
            return Sample::new(rate, self.data.clone());
        }
        let ratio = self.rate as f64 / rate as f64;
        let len = (self.data.len() as f64 / ratio).round() as usize;
        let last = self.data.len() - 1;
        let data = (0..len)
            .map(|i| {
                let position = i as f64 * ratio;
                let index = (position.floor() as usize).min(last);
                let next = (index + 1).min(last);
                let frac = (position - index as f64) as f32;
                self.data[index] * (1.0 - frac) + self.data[next] * frac
            })
            .collect();
        Sample::new(rate, data)
    }
}

/// Produces the sample for a pitch
pub trait SampleLoader {
    fn load(&self, pitch: Pitch) -> Result<Sample, PianolaError>;
}

/// Loads `<dir>/<pitch name>.wav`, e.g. `samples/c#4.wav`
#[derive(Debug, Clone)]
pub struct WavDirLoader {
    dir: PathBuf,
    rate: u32,
}

impl WavDirLoader {
    /// Samples are resampled to `rate` as they are loaded
    pub fn new(dir: impl Into<PathBuf>, rate: u32) -> Self {
        Self {
            dir: dir.into(),
            rate,
        }
    }

    pub fn path_for(&self, pitch: Pitch) -> PathBuf {
        self.dir.join(format!("{}.wav", pitch.name()))
    }
}

impl SampleLoader for WavDirLoader {
    fn load(&self, pitch: Pitch) -> Result<Sample, PianolaError> {
        let path = self.path_for(pitch);
        let sample = read_wav(&path).map_err(|e| PianolaError::SampleError {
            pitch: pitch.name(),
            message: format!("{}: {}", path.display(), e),
        })?;
        Ok(sample.resampled(self.rate))
    }
}

/// Read a WAV file, downmixing all channels to mono
pub fn read_wav(path: &Path) -> Result<Sample, hound::Error> {
    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();

    let raw: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / max_val))
                .collect::<Result<_, _>>()?
        }
    };

    let channels = spec.channels.max(1) as usize;
    let data = if channels == 1 {
        raw
    } else {
        raw.chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };
    Ok(Sample::new(spec.sample_rate, data))
}

/// Write mono samples as 16-bit PCM, clamping to [-1, 1]
pub fn write_wav(path: &Path, samples: &[f32], rate: u32) -> Result<(), PianolaError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let to_io = |e: hound::Error| match e {
        hound::Error::IoError(io) => PianolaError::Io(io),
        other => PianolaError::Io(std::io::Error::new(std::io::ErrorKind::Other, other)),
    };

    let writer = BufWriter::new(File::create(path)?);
    let mut wav_writer = hound::WavWriter::new(writer, spec).map_err(to_io)?;
    for &sample in samples {
        let s = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
        wav_writer.write_sample(s).map_err(to_io)?;
    }
    wav_writer.finalize().map_err(to_io)?;
    debug!("Wrote {} samples to {}", samples.len(), path.display());
    Ok(())
}

/// Lazily loaded samples, one per pitch
pub struct SampleCache<L> {
    loader: L,
    samples: HashMap<Pitch, Arc<Sample>>,
}

impl<L: SampleLoader> SampleCache<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            samples: HashMap::new(),
        }
    }

    /// The sample for `pitch`, loading it on first use.
    ///
    /// Returns `None` when loading fails; nothing is cached in that case, so
    /// the next request tries again.
    pub fn get(&mut self, pitch: Pitch) -> Option<Arc<Sample>> {
        if let Some(sample) = self.samples.get(&pitch) {
            return Some(Arc::clone(sample));
        }
        match self.loader.load(pitch) {
            Ok(sample) => {
                let sample = Arc::new(sample);
                self.samples.insert(pitch, Arc::clone(&sample));
                debug!("Loaded sample for {}", pitch);
                Some(sample)
            }
            Err(e) => {
                warn!("{}", e);
                None
            }
        }
    }

    /// Load every pitch in `pitches`, returning how many are now cached
    pub fn preload<I: IntoIterator<Item = Pitch>>(&mut self, pitches: I) -> usize {
        for pitch in pitches {
            self.get(pitch);
        }
        self.samples.len()
    }

    pub fn contains(&self, pitch: Pitch) -> bool {
        self.samples.contains_key(&pitch)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }
}

/// Audio sink that mixes notes into a buffer on a stepped clock
pub struct OfflineMixer<L> {
    cache: SampleCache<L>,
    rate: u32,
    gain: f32,
    now: f64,
    buffer: Vec<f32>,
}

impl<L: SampleLoader> OfflineMixer<L> {
    pub fn new(loader: L, rate: u32) -> Self {
        Self {
            cache: SampleCache::new(loader),
            rate,
            gain: 0.5,
            now: 0.0,
            buffer: Vec::new(),
        }
    }

    /// Per-note gain; overlapping notes add up before clamping on write
    pub fn with_gain(mut self, gain: f32) -> Self {
        self.gain = gain;
        self
    }

    pub fn rate(&self) -> u32 {
        self.rate
    }

    pub fn buffer(&self) -> &[f32] {
        &self.buffer
    }

    pub fn cache(&self) -> &SampleCache<L> {
        &self.cache
    }

    /// Drop everything before `start` seconds and return the rest
    pub fn into_buffer_from(self, start: f64) -> Vec<f32> {
        let offset = (start.max(0.0) * self.rate as f64).round() as usize;
        let mut buffer = self.buffer;
        buffer.drain(..offset.min(buffer.len()));
        buffer
    }
}

impl<L: SampleLoader> AudioSink for OfflineMixer<L> {
    fn schedule_note(&mut self, pitch: Pitch, start: f64) {
        let Some(sample) = self.cache.get(pitch) else {
            return;
        };
        let offset = (start.max(0.0) * self.rate as f64).round() as usize;
        let end = offset + sample.data.len();
        if self.buffer.len() < end {
            self.buffer.resize(end, 0.0);
        }
        for (out, value) in self.buffer[offset..end].iter_mut().zip(&sample.data) {
            *out += value * self.gain;
        }
    }

    fn current_time(&self) -> f64 {
        self.now
    }
}

impl<L> SteppedClock for OfflineMixer<L> {
    fn advance(&mut self, seconds: f64) {
        self.now += seconds;
    }
}
