//! One playback channel per stem
//!
//! `ChannelPool` is the seam between the mixer and whatever actually makes
//! sound. The cpal implementation keeps every channel behind a single render
//! engine, so "start all", "seek all" and "stop all" are one command each and
//! land on every channel in the same audio block. Mute and level are a gain,
//! never a start/stop, so a muted stem keeps its place.

use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use crate::audio::{self, duration_to_frames, frames_to_duration, AudioHandle, Engine};
use crate::audio_api::AudioCommand;
use crate::config::Settings;
use crate::error::{MixerError, Result};
use crate::loader::{decode_stem_set, StemSet};
use crate::shared::StemLabel;

// how long stop_all waits for the audio thread to confirm
const STOP_TIMEOUT: Duration = Duration::from_millis(200);

/// Addresses one channel of the pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    Stem(StemLabel),
    /// The un-separated original, when the song has one.
    FullMix,
}

pub trait ChannelPool {
    /// Start every channel from `offset`.
    fn start_all(&mut self, offset: Duration) -> Result<()>;

    /// Halt every channel; nothing is unloaded. Once this returns,
    /// `offsets` is where the channels stopped.
    fn stop_all(&mut self) -> Result<()>;

    /// Move every channel to `offset`, running or not.
    fn seek(&mut self, offset: Duration) -> Result<()>;

    /// Scale one channel's output, 0.0 being silent. The channel keeps
    /// running either way.
    fn set_gain(&mut self, channel: Channel, gain: f32) -> Result<()>;

    /// Per-channel playback offsets, in channel order.
    fn offsets(&self) -> Vec<Duration>;

    fn duration(&self) -> Duration;

    /// True once every channel ran off the end of its audio.
    fn reached_end(&self) -> bool;

    /// Surfaces a backend failure reported since the last check.
    fn check_device(&mut self) -> Result<()>;
}

pub struct CpalChannelPool {
    audio: AudioHandle,
    channels: Vec<Channel>, // engine channel index -> channel
    duration: Duration,
    sent: u64, // commands queued; compared against what the engine applied
}

impl CpalChannelPool {
    /// Decode and check every file of the set, then open the output device.
    /// Nothing touches the device unless the whole set is loadable.
    pub fn load(set: &StemSet, settings: &Settings) -> Result<Self> {
        let decoded = decode_stem_set(set, settings.duration_tolerance())?;
        let duration = decoded.duration();

        let mut channels: Vec<Channel> = set.labels().into_iter().map(Channel::Stem).collect();
        if decoded.has_full_mix {
            channels.push(Channel::FullMix);
        }

        let output = audio::open_output(settings.buffer_frames)?;
        let rate = output.sample_rate;
        // the full mix carries a fresh session on its own
        let gains: Vec<f32> = channels
            .iter()
            .map(|&c| match c {
                Channel::FullMix => 1.0,
                Channel::Stem(_) if decoded.has_full_mix => 0.0,
                Channel::Stem(_) => 1.0,
            })
            .collect();
        let buffers = decoded.prepare_for(rate);
        let engine = Engine::new(buffers, &gains, settings.ramp_frames(rate));
        let audio = audio::start_audio(output, engine)?;

        log::info!(
            "loaded {} channels, {:.1}s at {} Hz",
            channels.len(),
            duration.as_secs_f64(),
            rate
        );
        Ok(Self {
            audio,
            channels,
            duration,
            sent: 0,
        })
    }

    fn send(&mut self, cmd: AudioCommand) -> Result<()> {
        self.audio.send(cmd)?;
        self.sent += 1;
        Ok(())
    }

    // spin until the engine has applied everything we sent
    fn wait_applied(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        while self.audio.atomics().applied() != self.sent {
            if let Some(err) = self.audio.poll_error() {
                return Err(MixerError::Device(err));
            }
            if Instant::now() >= deadline {
                log::warn!("audio thread slow to confirm stop");
                return Ok(());
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        Ok(())
    }

    fn frames(&self, offset: Duration) -> usize {
        duration_to_frames(offset.min(self.duration), self.audio.sample_rate())
    }
}

impl ChannelPool for CpalChannelPool {
    fn start_all(&mut self, offset: Duration) -> Result<()> {
        let offset = self.frames(offset);
        self.send(AudioCommand::Start { offset })
    }

    fn stop_all(&mut self) -> Result<()> {
        self.send(AudioCommand::Stop)?;
        self.wait_applied(STOP_TIMEOUT)
    }

    fn seek(&mut self, offset: Duration) -> Result<()> {
        let offset = self.frames(offset);
        self.send(AudioCommand::Seek { offset })
    }

    fn set_gain(&mut self, channel: Channel, gain: f32) -> Result<()> {
        let index = self
            .channels
            .iter()
            .position(|&c| c == channel)
            .ok_or_else(|| MixerError::InvalidStemSet(format!("no channel for {channel:?}")))?;
        self.send(AudioCommand::SetGain { channel: index, gain })
    }

    fn offsets(&self) -> Vec<Duration> {
        let rate = self.audio.sample_rate();
        self.audio
            .atomics()
            .offsets()
            .into_iter()
            .map(|frames| frames_to_duration(frames, rate))
            .collect()
    }

    fn duration(&self) -> Duration {
        self.duration
    }

    fn reached_end(&self) -> bool {
        // an end flag from before our latest command is stale
        let atomics = self.audio.atomics();
        atomics.applied() == self.sent
            && atomics.reached_end.load(Ordering::Relaxed)
    }

    fn check_device(&mut self) -> Result<()> {
        match self.audio.poll_error() {
            Some(err) => Err(MixerError::Device(err)),
            None => Ok(()),
        }
    }
}
