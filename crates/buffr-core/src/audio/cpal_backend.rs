//! CPAL duplex backend
//!
//! ```text
//! ┌──────────────────┐   interleaved f32    ┌─────────────────────┐
//! │   Input Stream   │────push()───────────►│  Input Sample Queue │
//! │ (capture thread) │                      │  (lock-free SPSC)   │
//! └──────────────────┘                      └──────────┬──────────┘
//!                                                      │ pop()
//! ┌──────────────────┐                      ┌──────────▼──────────┐
//! │  Control Thread  │──params/commands────►│    Output Stream    │
//! │ (EngineController│◄──telemetry──────────│  (owns LoopEngine)  │
//! └──────────────────┘                      └─────────────────────┘
//! ```
//!
//! The output callback never waits for input: missing frames are silence.

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{BufferSize as CpalBufferSize, SampleFormat, Stream, StreamConfig};

use super::backend::{AudioHandle, AudioSystemResult};
use super::config::{AudioConfig, MAX_BUFFER_SIZE};
use super::device::{resolve_device, supported_configs, Direction};
use super::error::{AudioError, AudioResult};
use crate::engine::{create_engine, EngineConfig, LoopEngine};
use crate::types::{AudioBuffer, ChannelLayout};

/// Input queue size in device buffers
const INPUT_QUEUE_BUFFERS: usize = 4;

/// Start the duplex audio system
pub fn start_audio_system(config: &AudioConfig) -> AudioResult<AudioSystemResult> {
    let input_device = resolve_device(config.input_device.as_ref(), Direction::Input)?;
    let output_device = resolve_device(config.output_device.as_ref(), Direction::Output)?;

    let input_name = input_device.name().unwrap_or_else(|_| "Unknown".to_string());
    let output_name = output_device.name().unwrap_or_else(|_| "Unknown".to_string());
    log::info!("Input device: {}", input_name);
    log::info!("Output device: {}", output_name);

    let layout = config.layout;
    let target_rate = config.target_sample_rate();

    // Output decides the rate; input must follow it
    let output_config = get_stream_config(&output_device, Direction::Output, layout, target_rate)?;
    let sample_rate = output_config.sample_rate().0;
    let input_config = get_stream_config(&input_device, Direction::Input, layout, sample_rate)?;
    if input_config.sample_rate().0 != sample_rate {
        return Err(AudioError::SampleRateMismatch {
            input: input_config.sample_rate().0,
            output: sample_rate,
        });
    }

    let buffer_size = config.buffer_size.frames();
    let latency_ms = config.buffer_size.latency_ms(sample_rate);

    let output_stream_config = StreamConfig {
        channels: output_config.channels(),
        sample_rate: output_config.sample_rate(),
        buffer_size: CpalBufferSize::Fixed(buffer_size),
    };
    let input_stream_config = StreamConfig {
        channels: input_config.channels(),
        sample_rate: input_config.sample_rate(),
        buffer_size: CpalBufferSize::Fixed(buffer_size),
    };

    log::info!(
        "Audio config: {} in / {} out channels, {:?} engine, {}Hz, {} frames (~{:.1}ms latency)",
        input_stream_config.channels,
        output_stream_config.channels,
        layout,
        sample_rate,
        buffer_size,
        latency_ms
    );

    let engine_config = EngineConfig::new(sample_rate, buffer_size as usize, layout);
    let (engine, controller) = create_engine(&engine_config)?;

    let queue_capacity = buffer_size as usize * layout.channels() * INPUT_QUEUE_BUFFERS;
    let (input_producer, input_consumer) = rtrb::RingBuffer::<f32>::new(queue_capacity);
    log::debug!("Input sample queue created with capacity {} samples", queue_capacity);

    let processor = DuplexProcessor::new(engine, input_consumer, layout);
    let output_stream = build_output_stream(&output_device, &output_stream_config, processor)?;
    let input_stream = build_input_stream(&input_device, &input_stream_config, input_producer, layout)?;

    input_stream
        .play()
        .map_err(|e| AudioError::StreamPlayError(format!("Input: {}", e)))?;
    output_stream
        .play()
        .map_err(|e| AudioError::StreamPlayError(format!("Output: {}", e)))?;

    log::info!("Audio streams started (duplex)");

    Ok(AudioSystemResult {
        handle: AudioHandle {
            _input_stream: input_stream,
            _output_stream: output_stream,
            sample_rate,
            buffer_size,
            input_name,
            output_name,
        },
        controller,
        sample_rate,
        buffer_size,
        latency_ms,
    })
}

/// Pick the best stream configuration for a device
///
/// Prefers f32, enough channels for the engine layout and the requested
/// rate; falls back to the device maximum rate with a warning.
fn get_stream_config(
    device: &cpal::Device,
    direction: Direction,
    layout: ChannelLayout,
    target_sample_rate: u32,
) -> AudioResult<cpal::SupportedStreamConfig> {
    let configs = supported_configs(device, direction)?;
    if configs.is_empty() {
        return Err(AudioError::ConfigError(format!(
            "No supported {} configurations",
            direction
        )));
    }

    let wanted_channels = layout.channels() as u16;
    let rate_fits = |c: &&cpal::SupportedStreamConfigRange| {
        target_sample_rate >= c.min_sample_rate().0 && target_sample_rate <= c.max_sample_rate().0
    };
    let is_f32 = |c: &&cpal::SupportedStreamConfigRange| c.sample_format() == SampleFormat::F32;

    let best = configs
        .iter()
        .filter(is_f32)
        .filter(|c| c.channels() >= wanted_channels)
        .find(rate_fits)
        .or_else(|| configs.iter().filter(is_f32).find(rate_fits))
        .or_else(|| configs.iter().find(is_f32))
        .or_else(|| configs.first())
        .ok_or_else(|| {
            AudioError::ConfigError(format!("No suitable {} configuration found", direction))
        })?;

    let sample_rate = if rate_fits(&best) {
        cpal::SampleRate(target_sample_rate)
    } else {
        let fallback = best.max_sample_rate();
        log::warn!(
            "Audio {} device doesn't support {}Hz, falling back to {}Hz",
            direction,
            target_sample_rate,
            fallback.0
        );
        fallback
    };

    Ok(best.clone().with_sample_rate(sample_rate))
}

fn build_input_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    mut producer: rtrb::Producer<f32>,
    layout: ChannelLayout,
) -> AudioResult<Stream> {
    let device_channels = config.channels as usize;
    let engine_channels = layout.channels();

    device
        .build_input_stream(
            config,
            move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                push_input_frames(&mut producer, data, device_channels, engine_channels);
            },
            move |err| {
                log::error!("Input audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| AudioError::StreamBuildError(format!("Input: {}", e)))
}

fn build_output_stream(
    device: &cpal::Device,
    config: &StreamConfig,
    mut processor: DuplexProcessor,
) -> AudioResult<Stream> {
    let device_channels = config.channels as usize;

    device
        .build_output_stream(
            config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                processor.render(data, device_channels);
            },
            move |err| {
                log::error!("Output audio stream error: {}", err);
            },
            None,
        )
        .map_err(|e| AudioError::StreamBuildError(format!("Output: {}", e)))
}

/// Map interleaved device frames onto engine channels and queue them
///
/// Engine channel `c` takes device channel `min(c, device_channels - 1)`.
/// Frames that don't fit in the queue are dropped whole. Returns the number
/// of frames queued.
fn push_input_frames(
    producer: &mut rtrb::Producer<f32>,
    data: &[f32],
    device_channels: usize,
    engine_channels: usize,
) -> usize {
    let device_channels = device_channels.max(1);
    let mut queued = 0;
    for frame in data.chunks_exact(device_channels) {
        if producer.slots() < engine_channels {
            break;
        }
        for ch in 0..engine_channels {
            // Cannot fail: slots were checked above
            let _ = producer.push(frame[ch.min(device_channels - 1)]);
        }
        queued += 1;
    }
    queued
}

/// Output callback state: owns the engine and its working buffer
struct DuplexProcessor {
    engine: LoopEngine,
    input: rtrb::Consumer<f32>,
    io: AudioBuffer,
}

impl DuplexProcessor {
    fn new(engine: LoopEngine, input: rtrb::Consumer<f32>, layout: ChannelLayout) -> Self {
        Self {
            engine,
            input,
            io: AudioBuffer::silence(layout.channels(), MAX_BUFFER_SIZE),
        }
    }

    /// Fill one interleaved device buffer (real-time safe)
    fn render(&mut self, data: &mut [f32], device_channels: usize) {
        let device_channels = device_channels.max(1);
        let engine_channels = self.io.num_channels();

        for out in data.chunks_mut(MAX_BUFFER_SIZE * device_channels) {
            let frames = out.len() / device_channels;
            self.io.set_len_from_capacity(frames);

            let available = (self.input.slots() / engine_channels).min(frames);
            for i in 0..frames {
                for ch in 0..engine_channels {
                    self.io.channel_mut(ch)[i] = if i < available {
                        self.input.pop().unwrap_or(0.0)
                    } else {
                        0.0
                    };
                }
            }

            self.engine.process(&mut self.io, &[]);
            self.io.write_interleaved(out, device_channels);
        }
    }
}
