//! User sample files
//!
//! A WAV file can stand in for the recorded history as the loop source. The
//! decoded audio is fitted to the engine's snapshot format before it is
//! handed to the audio thread:
//!
//! - only the last `capacity` frames are kept; shorter files are zero-padded
//!   at the end to exactly `capacity` frames
//! - engine channel `c` takes file channel `min(c, file_channels - 1)`
//! - the file's sample rate is not converted

use std::path::Path;

use thiserror::Error;

use crate::types::{AudioBuffer, Sample};

/// Errors loading a user sample
#[derive(Debug, Error)]
pub enum LoadError {
    /// File missing, unreadable, or not a supported WAV format
    #[error("Unsupported or unreadable sample file: {0}")]
    Unsupported(#[source] hound::Error),
    /// Sample data could not be decoded
    #[error("Failed to decode sample data: {0}")]
    Decode(#[source] hound::Error),
    /// The file has no sample frames
    #[error("Sample file contains no audio")]
    Empty,
    /// The engine command queue is full
    #[error("Engine is busy (command queue full), try again")]
    EngineBusy,
}

/// Decoded sample in the engine's snapshot format
#[derive(Debug, Clone, PartialEq)]
pub struct UserSample {
    buffer: AudioBuffer,
    /// Rate the file was recorded at (informational; no resampling)
    source_sample_rate: u32,
    name: String,
}

impl UserSample {
    pub fn new(buffer: AudioBuffer, source_sample_rate: u32, name: impl Into<String>) -> Self {
        Self {
            buffer,
            source_sample_rate,
            name: name.into(),
        }
    }

    /// Fit arbitrary audio to `capacity` frames of `channels` channels
    ///
    /// Keeps the last `capacity` frames, pads the end with silence and maps
    /// channels as described in the module docs.
    pub fn fit(source: &AudioBuffer, capacity: usize, channels: usize) -> AudioBuffer {
        let mut fitted = AudioBuffer::silence(channels, capacity);
        let src_channels = source.num_channels();
        if src_channels == 0 {
            return fitted;
        }
        let keep = source.len().min(capacity);
        let skip = source.len() - keep;
        for ch in 0..channels {
            let src = &source.channel(ch.min(src_channels - 1))[skip..];
            fitted.channel_mut(ch)[..keep].copy_from_slice(src);
        }
        fitted
    }

    /// Copy of this sample fitted to another engine format
    ///
    /// `None` when it already has `capacity` frames of `channels` channels.
    pub fn refit(&self, capacity: usize, channels: usize) -> Option<UserSample> {
        if self.len() == capacity && self.num_channels() == channels {
            return None;
        }
        Some(UserSample::new(
            UserSample::fit(&self.buffer, capacity, channels),
            self.source_sample_rate,
            self.name.clone(),
        ))
    }

    /// Frames per channel
    #[inline]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    #[inline]
    pub fn num_channels(&self) -> usize {
        self.buffer.num_channels()
    }

    #[inline]
    pub fn channel(&self, ch: usize) -> &[Sample] {
        self.buffer.channel(ch)
    }

    pub fn buffer(&self) -> &AudioBuffer {
        &self.buffer
    }

    pub fn source_sample_rate(&self) -> u32 {
        self.source_sample_rate
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Decode a WAV file into a [`UserSample`] of `capacity` frames × `channels`
///
/// Supports integer PCM up to 32 bits and 32-bit float. Only the frames that
/// survive the fit are decoded.
pub fn load_user_sample<P: AsRef<Path>>(
    path: P,
    capacity: usize,
    channels: usize,
    engine_sample_rate: u32,
) -> Result<UserSample, LoadError> {
    let path = path.as_ref();
    let capacity = capacity.max(1);
    let channels = channels.max(1);

    let mut reader = hound::WavReader::open(path).map_err(LoadError::Unsupported)?;
    let spec = reader.spec();
    let frames = reader.duration() as usize;
    if frames == 0 {
        return Err(LoadError::Empty);
    }

    let file_channels = spec.channels.max(1) as usize;
    let keep = frames.min(capacity);
    let skip = frames - keep;
    if skip > 0 {
        reader
            .seek(skip as u32)
            .map_err(|e| LoadError::Decode(hound::Error::IoError(e)))?;
    }

    let mut decoded: Vec<Vec<Sample>> = (0..file_channels)
        .map(|_| Vec::with_capacity(keep))
        .collect();
    let total = keep * file_channels;

    match spec.sample_format {
        hound::SampleFormat::Float => {
            for (i, sample) in reader.samples::<f32>().take(total).enumerate() {
                decoded[i % file_channels].push(sample.map_err(LoadError::Decode)?);
            }
        }
        hound::SampleFormat::Int => {
            let scale = 1.0 / (1u64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            for (i, sample) in reader.samples::<i32>().take(total).enumerate() {
                decoded[i % file_channels].push(sample.map_err(LoadError::Decode)? as f32 * scale);
            }
        }
    }

    let source = AudioBuffer::from_channels(decoded);
    if source.is_empty() {
        return Err(LoadError::Empty);
    }

    if spec.sample_rate != engine_sample_rate {
        log::warn!(
            "load_user_sample: {} is {} Hz, engine runs at {} Hz; playing without resampling",
            path.display(),
            spec.sample_rate,
            engine_sample_rate
        );
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    log::info!(
        "load_user_sample: {} ({} ch, {} Hz, {} of {} frames kept)",
        name,
        file_channels,
        spec.sample_rate,
        keep,
        frames
    );

    Ok(UserSample::new(
        UserSample::fit(&source, capacity, channels),
        spec.sample_rate,
        name,
    ))
}
