//! The mixer's public surface
//!
//! `MixerEngine` composes the transport clock and the channel pool. Every
//! operation either leaves all channels stopped or leaves them all at one
//! offset; callers never see a half-applied transition. Only the input
//! dispatcher calls into it, one key at a time, which is the whole locking
//! story.
//!
//! A stem's gain is its level while audible and zero while muted. Muting
//! never touches the level, so unmuting brings back whatever was set.

use std::time::{Duration, Instant};

use super::mute_mask::MuteMask;
use super::pool::{Channel, ChannelPool};
use super::reporter::StatusReporter;
use super::transport::TransportClock;
use crate::error::{MixerError, Result};
use crate::loader::StemSet;
use crate::shared::{
    StatusEvent, StatusKind, StatusSnapshot, StemLabel, StemStatus, TransportState,
};

// levels snap to hundredths so stepping back up lands on exactly 1.0
fn clamp_level(level: f32) -> f32 {
    (level.clamp(0.0, 1.0) * 100.0).round() / 100.0
}

pub struct MixerEngine<P: ChannelPool> {
    song: String,
    labels: Vec<StemLabel>,
    levels: Vec<f32>, // per stem, hotkey order
    selected: usize, // index of the stem the volume keys act on
    has_full_mix: bool,
    mask: MuteMask,
    clock: TransportClock,
    pool: P,
    reporter: Box<dyn StatusReporter>,
    applied: Vec<(Channel, f32)>, // gains last pushed to the pool
}

impl<P: ChannelPool> MixerEngine<P> {
    /// Takes a pool already loaded from `set`.
    pub fn new(set: &StemSet, pool: P, reporter: Box<dyn StatusReporter>) -> Result<Self> {
        let labels = set.labels();
        let mut engine = Self {
            song: set.song_name().to_string(),
            mask: MuteMask::new(&labels),
            levels: vec![1.0; labels.len()],
            selected: 0,
            labels,
            has_full_mix: set.full_mix().is_some(),
            clock: TransportClock::new(pool.duration()),
            pool,
            reporter,
            applied: Vec::new(),
        };
        engine.apply_gains(true)?;
        engine.report(StatusKind::Loaded);
        Ok(engine)
    }

    pub fn state(&self) -> TransportState {
        self.clock.state()
    }

    pub fn position(&self) -> Duration {
        self.clock.position(Instant::now())
    }

    #[cfg(test)]
    pub fn mask(&self) -> &MuteMask {
        &self.mask
    }

    /// With a full mix on hand, "every stem on at full level" is played from
    /// the original rather than the sum of the stems.
    pub fn full_mix_active(&self) -> bool {
        self.has_full_mix && self.mask.all_audible() && self.levels.iter().all(|&l| l == 1.0)
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            song: self.song.clone(),
            state: self.state(),
            position: self.position(),
            duration: self.clock.length(),
            stems: self
                .mask
                .iter()
                .zip(&self.levels)
                .enumerate()
                .map(|(i, ((label, audible), &volume))| StemStatus {
                    key: i + 1,
                    label,
                    audible,
                    volume,
                    selected: i == self.selected,
                })
                .collect(),
            full_mix_active: self.full_mix_active(),
        }
    }

    // ── Transport ─────────────────────────────────────────────────────

    pub fn play_pause(&mut self) -> Result<()> {
        match self.state() {
            TransportState::Playing => self.pause(),
            TransportState::Paused | TransportState::Stopped => self.play(),
        }
    }

    pub fn play(&mut self) -> Result<()> {
        let Some(offset) = self.clock.play(Instant::now()) else {
            return Ok(());
        };
        self.pool.start_all(offset)?;
        log::info!("playing from {:.2}s", offset.as_secs_f64());
        self.report(StatusKind::Transport);
        Ok(())
    }

    pub fn pause(&mut self) -> Result<()> {
        if self.state() != TransportState::Playing {
            return Ok(());
        }
        self.pool.stop_all()?;
        self.clock.pause(Instant::now());
        // resume from where the audio actually stopped, not the wall clock
        if let Some(&offset) = self.pool.offsets().first() {
            self.clock.anchor_paused(offset);
        }
        log::info!("paused at {:.2}s", self.position().as_secs_f64());
        self.report(StatusKind::Transport);
        Ok(())
    }

    pub fn stop(&mut self) -> Result<()> {
        if self.state() == TransportState::Stopped {
            return Ok(());
        }
        self.halt()?;
        log::info!("stopped");
        self.report(StatusKind::Transport);
        Ok(())
    }

    pub fn rewind(&mut self) -> Result<()> {
        self.clock.rewind(Instant::now());
        if self.state() == TransportState::Playing {
            self.pool.start_all(Duration::ZERO)?;
        } else {
            self.pool.seek(Duration::ZERO)?;
        }
        log::info!("rewound");
        self.report(StatusKind::Rewound);
        Ok(())
    }

    // channels halted and parked at zero, clock stopped
    fn halt(&mut self) -> Result<()> {
        self.pool.stop_all()?;
        self.pool.seek(Duration::ZERO)?;
        self.clock.stop();
        Ok(())
    }

    // ── Stems ─────────────────────────────────────────────────────────

    // hotkey (1-based) to stem index; a key with no stem is reported
    fn stem_index(&mut self, key: usize) -> Result<usize> {
        match key.checked_sub(1).filter(|&i| i < self.labels.len()) {
            Some(i) => Ok(i),
            None => {
                let err = MixerError::InvalidStem { index: key, count: self.labels.len() };
                self.report(StatusKind::UserError(err.to_string()));
                Err(err)
            }
        }
    }

    /// Flip the stem on hotkey `key` (1-based) and select it. Returns
    /// whether it's now audible. A key with no stem is reported and returned
    /// as `InvalidStem`, leaving everything as it was.
    pub fn toggle_stem(&mut self, key: usize) -> Result<bool> {
        let index = self.stem_index(key)?;
        let label = self.labels[index];
        let audible = self
            .mask
            .toggle(label)
            .ok_or_else(|| MixerError::InvalidStemSet(format!("{label} missing from mask")))?;
        self.selected = index;
        self.apply_gains(false)?;

        log::info!("{} {}", if audible { "unmuted" } else { "muted" }, label);
        self.report(StatusKind::StemToggled);
        Ok(audible)
    }

    pub fn volume(&self, key: usize) -> Option<f32> {
        key.checked_sub(1).and_then(|i| self.levels.get(i)).copied()
    }

    /// Set the level of the stem on hotkey `key`, clamped to 0.0..=1.0.
    /// A muted stem stays silent and picks the level up when unmuted.
    pub fn set_volume(&mut self, key: usize, level: f32) -> Result<f32> {
        let index = self.stem_index(key)?;
        let level = clamp_level(level);
        if self.levels[index] == level {
            return Ok(level);
        }
        self.levels[index] = level;
        self.apply_gains(false)?;

        log::info!("{} volume {:.2}", self.labels[index], level);
        self.report(StatusKind::VolumeChanged);
        Ok(level)
    }

    pub fn adjust_volume(&mut self, key: usize, delta: f32) -> Result<f32> {
        let current = self.volume(key).unwrap_or(1.0);
        self.set_volume(key, current + delta)
    }

    pub fn adjust_selected_volume(&mut self, delta: f32) -> Result<f32> {
        self.adjust_volume(self.selected + 1, delta)
    }

    /// Move the selection by `step` stems, wrapping at either end.
    pub fn select(&mut self, step: isize) {
        let n = self.labels.len() as isize;
        self.selected = (self.selected as isize + step).rem_euclid(n) as usize;
        self.report(StatusKind::Selected);
    }

    // push whatever gain changed since last time
    fn apply_gains(&mut self, force: bool) -> Result<()> {
        let full_mix = self.full_mix_active();
        let mut wanted: Vec<(Channel, f32)> = self
            .labels
            .iter()
            .zip(&self.levels)
            .map(|(&label, &level)| {
                let audible = self.mask.is_audible(label) && !full_mix;
                (Channel::Stem(label), if audible { level } else { 0.0 })
            })
            .collect();
        if self.has_full_mix {
            wanted.push((Channel::FullMix, if full_mix { 1.0 } else { 0.0 }));
        }

        for (i, &(channel, gain)) in wanted.iter().enumerate() {
            if force || self.applied.get(i) != Some(&(channel, gain)) {
                self.pool.set_gain(channel, gain)?;
            }
        }
        self.applied = wanted;
        Ok(())
    }

    // ── Housekeeping ──────────────────────────────────────────────────

    /// Called between keys: surfaces device failures, stops at the end of
    /// the song, and gives the display a fresh position.
    pub fn tick(&mut self) -> Result<()> {
        self.pool.check_device()?;
        if self.state() == TransportState::Playing && self.pool.reached_end() {
            self.halt()?;
            log::info!("end of song");
            self.report(StatusKind::Ended);
            return Ok(());
        }
        self.report(StatusKind::Tick);
        Ok(())
    }

    /// Stop everything and release the pool.
    pub fn quit(mut self) -> Result<()> {
        if self.state() != TransportState::Stopped {
            self.halt()?;
        }
        self.report(StatusKind::Quit);
        log::info!("mixer closed");
        Ok(())
    }

    fn report(&mut self, kind: StatusKind) {
        let event = StatusEvent { kind, status: self.snapshot() };
        if let Err(e) = self.reporter.report(&event) {
            log::warn!("status report failed: {e:#}");
        }
    }
}
