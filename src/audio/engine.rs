use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crossbeam_channel::Receiver;

use super::channel::StemChannel;
use super::frame::StereoFrame;
use super::sample_buffer::SampleBuffer;
use crate::audio_api::AudioCommand;

// Written by the audio thread after every block, read by the mixer without
// locking. Relaxed is enough for the single-value fields; `applied` is
// released after a command's effects so a reader that acquires it sees them.
pub struct PlaybackAtomics {
    pub reached_end: AtomicBool,
    applied: AtomicU64, // commands handled so far
    offsets: Vec<AtomicU64>, // per-channel read head, frames
}

impl PlaybackAtomics {
    pub fn new(channels: usize) -> Self {
        Self {
            reached_end: AtomicBool::new(false),
            applied: AtomicU64::new(0),
            offsets: (0..channels).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    pub fn applied(&self) -> u64 {
        self.applied.load(Ordering::Acquire)
    }

    pub fn offsets(&self) -> Vec<usize> {
        self.offsets.iter().map(|o| o.load(Ordering::Relaxed) as usize).collect()
    }
}

pub struct Engine {
    buffers: Vec<SampleBuffer>, // one per channel, all `length` frames long
    channels: Vec<StemChannel>,
    length: usize,
    playing: bool,
    ramp_frames: u32,
    atomics: Arc<PlaybackAtomics>,
    rx: Option<Receiver<AudioCommand>>,
}

impl Engine {
    // buffers must already share one rate and one length
    pub fn new(buffers: Vec<SampleBuffer>, initial_gains: &[f32], ramp_frames: u32) -> Self {
        let length = buffers.iter().map(SampleBuffer::len).max().unwrap_or(0);
        let channels = initial_gains.iter().map(|&g| StemChannel::new(g)).collect();
        let atomics = Arc::new(PlaybackAtomics::new(buffers.len()));
        let engine = Self {
            buffers,
            channels,
            length,
            playing: false,
            ramp_frames,
            atomics,
            rx: None,
        };
        engine.publish();
        engine
    }

    pub fn set_command_rx(&mut self, rx: Receiver<AudioCommand>) {
        self.rx = Some(rx);
    }

    pub fn atomics(&self) -> Arc<PlaybackAtomics> {
        Arc::clone(&self.atomics)
    }

    // drain whatever the mixer queued since the last block
    pub fn drain_commands(&mut self) {
        let Some(rx) = self.rx.take() else { return };
        while let Ok(cmd) = rx.try_recv() {
            self.handle_cmd(cmd);
        }
        self.rx = Some(rx);
    }

    pub fn handle_cmd(&mut self, cmd: AudioCommand) {
        match cmd {
            AudioCommand::Start { offset } => {
                self.seek_all(offset);
                self.playing = self.length > 0;
                self.atomics.reached_end.store(false, Ordering::Relaxed);
            }
            AudioCommand::Stop => {
                self.playing = false;
                // a ramp cut off here must not replay on the next start
                self.channels.iter_mut().for_each(StemChannel::settle);
            }
            AudioCommand::Seek { offset } => {
                self.seek_all(offset);
                self.atomics.reached_end.store(false, Ordering::Relaxed);
            }
            AudioCommand::SetGain { channel, gain } => {
                // nothing is sounding while stopped, so there's nothing to ramp
                let ramp = if self.playing { self.ramp_frames } else { 0 };
                if let Some(ch) = self.channels.get_mut(channel) {
                    ch.set_target(gain, ramp);
                }
            }
        }
        self.publish();
        self.atomics.applied.fetch_add(1, Ordering::Release);
    }

    fn seek_all(&mut self, offset: usize) {
        let offset = offset.min(self.length);
        for ch in &mut self.channels {
            ch.pos = offset;
        }
    }

    pub fn render_block(&mut self, out: &mut [StereoFrame]) {
        out.fill(StereoFrame::zero());
        if !self.playing {
            return;
        }

        let mut consumed = 0;
        for (ch, buf) in self.channels.iter_mut().zip(&self.buffers) {
            consumed = consumed.max(ch.render_into(buf, out));
        }
        if consumed < out.len() {
            // every head is at the end now; halt and let the mixer notice
            self.playing = false;
            self.atomics.reached_end.store(true, Ordering::Relaxed);
            log::debug!("end of stems reached");
        }
        self.publish();
    }

    fn publish(&self) {
        for (slot, ch) in self.atomics.offsets.iter().zip(&self.channels) {
            slot.store(ch.pos as u64, Ordering::Relaxed);
        }
    }
}
