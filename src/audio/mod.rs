use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::audio_api::AudioCommand;
use crate::error::{MixerError, Result};

mod channel;
mod engine;
mod frame;
mod sample_buffer;

pub use engine::{Engine, PlaybackAtomics};
pub use frame::StereoFrame;
pub use sample_buffer::{duration_to_frames, frames_to_duration, SampleBuffer};

const COMMAND_QUEUE: usize = 1024;
const MAX_BLOCK_FRAMES: usize = 8192; // scratch size; larger blocks grow it once

// The default output device and the stream config we'll ask it for.
// Opened before any stem is resampled so the buffers can match its rate.
pub struct OutputDevice {
    device: cpal::Device,
    config: cpal::StreamConfig,
    pub sample_rate: u32,
}

pub fn open_output(buffer_frames: u32) -> Result<OutputDevice> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| MixerError::device("no default output device"))?;
    let supported = device
        .default_output_config()
        .map_err(|e| MixerError::device(format!("no default output config: {e}")))?;

    if supported.sample_format() != cpal::SampleFormat::F32 {
        return Err(MixerError::device(format!(
            "unsupported sample format {:?} (only f32 output is supported)",
            supported.sample_format()
        )));
    }

    let sample_rate = u32::from(supported.sample_rate());
    let mut config: cpal::StreamConfig = supported.config();
    config.buffer_size = pick_buffer_size(buffer_frames, supported.buffer_size());

    log::info!(
        "output: {} channels, {} Hz, buffer {:?}",
        config.channels,
        sample_rate,
        config.buffer_size
    );

    Ok(OutputDevice { device, config, sample_rate })
}

// Ask for `requested` frames, but only ever something the device says it
// can do. 0 or an unknown range leaves it to the device.
fn pick_buffer_size(requested: u32, supported: &cpal::SupportedBufferSize) -> cpal::BufferSize {
    match *supported {
        cpal::SupportedBufferSize::Range { min, max } if requested > 0 && min <= max => {
            let frames = requested.clamp(min, max);
            if frames != requested {
                log::warn!("buffer of {requested} frames not supported, using {frames}");
            }
            cpal::BufferSize::Fixed(frames)
        }
        _ => cpal::BufferSize::Default,
    }
}

// Keeps the stream alive; drop it and every channel goes quiet at once.
pub struct AudioHandle {
    tx: Sender<AudioCommand>,
    errors_rx: Receiver<String>,
    atomics: Arc<PlaybackAtomics>,
    sample_rate: u32,
    _output_stream: cpal::Stream,
}

impl AudioHandle {
    pub fn send(&self, cmd: AudioCommand) -> Result<()> {
        self.tx.try_send(cmd).map_err(|e| match e {
            TrySendError::Full(_) => MixerError::device("audio thread stopped draining commands"),
            TrySendError::Disconnected(_) => MixerError::device("audio thread is gone"),
        })
    }

    pub fn atomics(&self) -> &PlaybackAtomics {
        &self.atomics
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    // first error the backend reported since the last call, if any
    pub fn poll_error(&self) -> Option<String> {
        self.errors_rx.try_recv().ok()
    }
}

pub fn start_audio(output: OutputDevice, mut engine: Engine) -> Result<AudioHandle> {
    let (tx, rx) = crossbeam_channel::bounded::<AudioCommand>(COMMAND_QUEUE);
    let (errors_tx, errors_rx) = crossbeam_channel::bounded::<String>(16);
    engine.set_command_rx(rx);
    let atomics = engine.atomics();

    let stream = build_output_stream_f32(&output.device, &output.config, engine, errors_tx)?;
    stream
        .play()
        .map_err(|e| MixerError::device(format!("failed to play output stream: {e}")))?;

    Ok(AudioHandle {
        tx,
        errors_rx,
        atomics,
        sample_rate: output.sample_rate,
        _output_stream: stream,
    })
}

// ── Output stream ─────────────────────────────────────────────────

fn build_output_stream_f32(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut engine: Engine,
    errors_tx: Sender<String>,
) -> Result<cpal::Stream> {
    let channels = config.channels as usize;
    if channels == 0 {
        return Err(MixerError::device("device reports zero output channels"));
    }
    let mut scratch = vec![StereoFrame::zero(); MAX_BLOCK_FRAMES];

    let err_fn = move |err: cpal::StreamError| {
        log::error!("audio output stream error: {err}");
        let _ = errors_tx.try_send(err.to_string());
    };

    let stream = device
        .build_output_stream(
            config,
            move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                engine.drain_commands(); // apply queued transport/gain changes

                let n_frames = data.len() / channels;
                if scratch.len() < n_frames {
                    scratch.resize(n_frames, StereoFrame::zero());
                }
                let frames = &mut scratch[..n_frames];
                engine.render_block(frames);
                write_interleaved(frames, data, channels);
            },
            err_fn,
            None,
        )
        .map_err(|e| MixerError::device(format!("failed to build output stream: {e}")))?;

    Ok(stream)
}

fn write_interleaved(frames: &[StereoFrame], data: &mut [f32], channels: usize) {
    for (frame, out) in frames.iter().zip(data.chunks_exact_mut(channels)) {
        match out {
            [mono] => *mono = (frame.left + frame.right) * 0.5,
            [left, right, rest @ ..] => {
                *left = frame.left;
                *right = frame.right;
                rest.fill(0.0);
            }
            [] => {}
        }
    }
}
