// Stand-ins for the audio backend and the display, so the mixer can be
// driven without a device. Both share state through Rc so a test keeps a
// handle after moving the fake into the engine.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use super::pool::{Channel, ChannelPool};
use super::reporter::StatusReporter;
use crate::error::{MixerError, Result};
use crate::loader::stem_set::Stem;
use crate::loader::StemSet;
use crate::shared::{StatusEvent, StatusKind, StemLabel};

pub fn four_stem_set(full_mix: bool) -> StemSet {
    let stems = StemLabel::REQUIRED
        .iter()
        .map(|&label| Stem { label, path: PathBuf::from(format!("song/{label}.wav")) })
        .collect();
    StemSet::new("song", stems, full_mix.then(|| PathBuf::from("song/original.wav")))
        .expect("valid set")
}

#[derive(Clone, Debug, PartialEq)]
pub enum PoolCall {
    StartAll(Duration),
    StopAll,
    Seek(Duration),
    SetGain(Channel, f32),
}

#[derive(Default)]
struct PoolState {
    channels: Vec<Channel>,
    gains: Vec<f32>,
    offsets: Vec<Duration>,
    running: bool,
    reached_end: bool,
    device_error: Option<String>,
    calls: Vec<PoolCall>,
    duration: Duration,
}

#[derive(Clone)]
pub struct FakePool(Rc<RefCell<PoolState>>);

impl FakePool {
    pub fn new(set: &StemSet, duration: Duration) -> Self {
        let mut channels: Vec<Channel> = set.labels().into_iter().map(Channel::Stem).collect();
        if set.full_mix().is_some() {
            channels.push(Channel::FullMix);
        }
        let n = channels.len();
        Self(Rc::new(RefCell::new(PoolState {
            channels,
            gains: vec![1.0; n],
            offsets: vec![Duration::ZERO; n],
            duration,
            ..Default::default()
        })))
    }

    pub fn calls(&self) -> Vec<PoolCall> {
        self.0.borrow().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.0.borrow_mut().calls.clear();
    }

    pub fn gains(&self) -> Vec<f32> {
        self.0.borrow().gains.clone()
    }

    pub fn audible(&self) -> Vec<bool> {
        self.gains().iter().map(|&g| g > 0.0).collect()
    }

    /// Let the audio run on by `by`, as the render thread would.
    pub fn advance(&self, by: Duration) {
        let mut s = self.0.borrow_mut();
        if s.running {
            s.offsets.iter_mut().for_each(|o| *o += by);
        }
    }

    pub fn is_running(&self) -> bool {
        self.0.borrow().running
    }

    pub fn finish(&self) {
        let mut s = self.0.borrow_mut();
        s.running = false;
        s.reached_end = true;
        let end = s.duration;
        s.offsets.iter_mut().for_each(|o| *o = end);
    }

    pub fn fail_device(&self, msg: &str) {
        self.0.borrow_mut().device_error = Some(msg.to_string());
    }

    fn move_all(s: &mut PoolState, offset: Duration) {
        s.offsets.iter_mut().for_each(|o| *o = offset);
        s.reached_end = false;
    }
}

impl ChannelPool for FakePool {
    fn start_all(&mut self, offset: Duration) -> Result<()> {
        let mut s = self.0.borrow_mut();
        s.calls.push(PoolCall::StartAll(offset));
        Self::move_all(&mut s, offset);
        s.running = true;
        Ok(())
    }

    fn stop_all(&mut self) -> Result<()> {
        let mut s = self.0.borrow_mut();
        s.calls.push(PoolCall::StopAll);
        s.running = false;
        Ok(())
    }

    fn seek(&mut self, offset: Duration) -> Result<()> {
        let mut s = self.0.borrow_mut();
        s.calls.push(PoolCall::Seek(offset));
        Self::move_all(&mut s, offset);
        Ok(())
    }

    fn set_gain(&mut self, channel: Channel, gain: f32) -> Result<()> {
        let mut s = self.0.borrow_mut();
        s.calls.push(PoolCall::SetGain(channel, gain));
        let index = s
            .channels
            .iter()
            .position(|&c| c == channel)
            .ok_or_else(|| MixerError::InvalidStemSet(format!("no channel for {channel:?}")))?;
        s.gains[index] = gain;
        Ok(())
    }

    fn offsets(&self) -> Vec<Duration> {
        self.0.borrow().offsets.clone()
    }

    fn duration(&self) -> Duration {
        self.0.borrow().duration
    }

    fn reached_end(&self) -> bool {
        self.0.borrow().reached_end
    }

    fn check_device(&mut self) -> Result<()> {
        match self.0.borrow_mut().device_error.take() {
            Some(msg) => Err(MixerError::Device(msg)),
            None => Ok(()),
        }
    }
}

#[derive(Clone, Default)]
pub struct RecordingReporter {
    events: Rc<RefCell<Vec<StatusEvent>>>,
    fail: bool,
}

impl RecordingReporter {
    pub fn failing() -> Self {
        Self { fail: true, ..Default::default() }
    }

    pub fn events(&self) -> Vec<StatusEvent> {
        self.events.borrow().clone()
    }

    pub fn kinds(&self) -> Vec<StatusKind> {
        self.events.borrow().iter().map(|e| e.kind.clone()).collect()
    }
}

impl StatusReporter for RecordingReporter {
    fn report(&mut self, event: &StatusEvent) -> anyhow::Result<()> {
        if self.fail {
            anyhow::bail!("display went away");
        }
        self.events.borrow_mut().push(event.clone());
        Ok(())
    }
}
