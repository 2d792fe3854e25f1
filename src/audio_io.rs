// src/audio_io.rs

use crate::audio_device::find_output_device;
use crate::audio_engine::AudioEngine;
use anyhow::Result;
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{BufferSize, Device, FromSample, Host, Sample, SampleFormat, Stream, StreamConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{error, info};

/// Frames rendered per pass through the scratch buffer. Larger host buffers are
/// filled in several passes.
const SCRATCH_FRAMES: usize = 4096;

#[derive(Debug, Clone)]
pub struct StreamInfo {
    pub device_name: String,
    pub sample_rate: u32,
    pub buffer_size: Option<u32>,
    pub channels: u16,
    pub sample_format: SampleFormat,
}

/// Opens the output device and starts a stream driven by `engine`. The engine
/// must have been built for `sample_rate`.
pub fn init_and_run_stream(
    host: &Host,
    output_device_name: Option<&str>,
    sample_rate: u32,
    requested_buffer_size: Option<u32>,
    engine: AudioEngine,
    xrun_count: Arc<AtomicUsize>,
) -> Result<(Stream, StreamInfo)> {
    let device = find_output_device(host, output_device_name)?;
    let device_name = device.name()?;
    info!(device = %device_name, "Using output device");

    let default_config = device.default_output_config()?;
    let sample_format = default_config.sample_format();

    let mut config: StreamConfig = default_config.into();
    config.sample_rate = cpal::SampleRate(sample_rate);
    if let Some(bs) = requested_buffer_size {
        config.buffer_size = BufferSize::Fixed(bs);
    }

    let stream = match sample_format {
        SampleFormat::F32 => build_output_stream::<f32>(&device, &config, engine, xrun_count)?,
        SampleFormat::I16 => build_output_stream::<i16>(&device, &config, engine, xrun_count)?,
        SampleFormat::U16 => build_output_stream::<u16>(&device, &config, engine, xrun_count)?,
        format => return Err(anyhow::anyhow!("Unsupported sample format {}", format)),
    };
    stream.play()?;

    let info = StreamInfo {
        device_name,
        sample_rate: config.sample_rate.0,
        buffer_size: match config.buffer_size {
            BufferSize::Fixed(size) => Some(size),
            BufferSize::Default => None,
        },
        channels: config.channels,
        sample_format,
    };
    info!(
        sample_rate = info.sample_rate,
        buffer_size = ?info.buffer_size,
        channels = info.channels,
        format = %info.sample_format,
        "Output stream started"
    );
    Ok((stream, info))
}

fn build_output_stream<T>(
    device: &Device,
    config: &StreamConfig,
    mut engine: AudioEngine,
    xrun_count: Arc<AtomicUsize>,
) -> Result<Stream>
where
    T: Sample + cpal::SizedSample + FromSample<f32>,
{
    let channels = (config.channels as usize).max(1);
    let err_fn = move |err| {
        error!(error = %err, "An error occurred on the output stream");
        xrun_count.fetch_add(1, Ordering::Relaxed);
    };
    let mut scratch: Vec<f32> = vec![0.0; SCRATCH_FRAMES * channels];

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            for chunk in data.chunks_mut(scratch.len()) {
                let rendered = &mut scratch[..chunk.len()];
                engine.audio_out(rendered, channels);
                for (out, &sample) in chunk.iter_mut().zip(rendered.iter()) {
                    *out = T::from_sample(sample);
                }
            }
        },
        err_fn,
        None,
    )?;
    Ok(stream)
}
