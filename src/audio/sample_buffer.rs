use std::path::Path;
use std::time::Duration;

use super::frame::StereoFrame;
use crate::error::{MixerError, Result};

// A fully decoded stem, held in memory for the whole session
#[derive(Clone, Debug)]
pub struct SampleBuffer {
    pub data: Vec<StereoFrame>, // the audio data array
    pub sample_rate: u32,
    pub source_channels: u16, // channel count of the file before folding to stereo
}

impl SampleBuffer {
    #[cfg(test)]
    pub fn from_frames(data: Vec<StereoFrame>, sample_rate: u32) -> Self {
        Self { data, sample_rate, source_channels: 2 }
    }

    // Load a WAV file from disk into the sample buffer, at the file's own rate
    pub fn load_wav(path: &Path) -> Result<Self> {
        let mut reader = hound::WavReader::open(path).map_err(|e| MixerError::load(path, e))?;
        let spec = reader.spec();
        let file_channels = spec.channels;
        if file_channels == 0 {
            return Err(MixerError::load(path, "file declares zero channels"));
        }

        // Read the samples from the WAV file
        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader // float, just pass it through
                .samples::<f32>()
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| MixerError::load(path, e))?,
            hound::SampleFormat::Int => { // int, convert to float
                let max = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|x| x as f32 / max))
                    .collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(|e| MixerError::load(path, e))?
            }
        };

        let data: Vec<StereoFrame> = if file_channels == 1 {
            samples.into_iter().map(StereoFrame::mono).collect() // mono, duplicate
        } else {
            // anything wider than stereo keeps its front pair
            samples
                .chunks_exact(file_channels as usize)
                .map(|c| StereoFrame { left: c[0], right: c[1] })
                .collect()
        };

        log::debug!(
            "decoded {}: {} frames, {} Hz, {} ch",
            path.display(),
            data.len(),
            spec.sample_rate,
            file_channels
        );

        Ok(Self {
            data,
            sample_rate: spec.sample_rate,
            source_channels: file_channels,
        })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn duration(&self) -> Duration {
        frames_to_duration(self.data.len(), self.sample_rate)
    }

    // silence-pad up to `len` frames, never truncates
    pub fn pad_to(&mut self, len: usize) {
        if self.data.len() < len {
            self.data.resize(len, StereoFrame::zero());
        }
    }

    pub fn resampled(self, target_rate: u32) -> Self {
        if self.sample_rate == target_rate {
            return self;
        }
        let data = resample_linear(&self.data, self.sample_rate, target_rate);
        Self {
            data,
            sample_rate: target_rate,
            source_channels: self.source_channels,
        }
    }
}

pub fn frames_to_duration(frames: usize, sample_rate: u32) -> Duration {
    if sample_rate == 0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(frames as f64 / sample_rate as f64)
}

pub fn duration_to_frames(d: Duration, sample_rate: u32) -> usize {
    (d.as_secs_f64() * sample_rate as f64).round() as usize
}

fn resample_linear(frames: &[StereoFrame], source_rate: u32, target_rate: u32) -> Vec<StereoFrame> {
    if source_rate == target_rate {
        return frames.to_vec();
    }
    let ratio = target_rate as f64 / source_rate as f64;
    let out_len = (frames.len() as f64 * ratio).ceil() as usize;
    let mut out = Vec::with_capacity(out_len);

    for i in 0..out_len {
        // fractional position in the source buffer
        let src_pos = i as f64 / ratio; // ex. 3.7
        let idx = src_pos.floor() as usize; // ex. 3
        let frac = (src_pos - idx as f64) as f32; // ex. 0.7
        if idx >= frames.len().saturating_sub(1) { // edge case
            out.push(*frames.last().unwrap_or(&StereoFrame::zero()));
        } else {
            let a = frames[idx];
            let b = frames[idx + 1];
            out.push(StereoFrame { // blend via frac and linear interpolation
                left: a.left * (1.0 - frac) + b.left * frac,
                right: a.right * (1.0 - frac) + b.right * frac,
            });
        }
    }
    out
}
