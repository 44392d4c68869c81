//! Transport state and elapsed time
//!
//! The clock knows nothing about channels. It answers two questions: what
//! state is the transport in, and how far into the song are we. While
//! playing, position is `anchor + (now - started_at)`; paused freezes it at
//! `anchor`; stopped pins it to zero.
//!
//! Every method takes `now` explicitly so the state machine can be driven
//! with synthetic instants.

use std::time::{Duration, Instant};

use crate::shared::TransportState;

#[derive(Clone, Debug)]
pub struct TransportClock {
    state: TransportState,
    anchor: Duration,
    started_at: Option<Instant>,
    length: Duration,
}

impl TransportClock {
    pub fn new(length: Duration) -> Self {
        Self {
            state: TransportState::Stopped,
            anchor: Duration::ZERO,
            started_at: None,
            length,
        }
    }

    pub fn state(&self) -> TransportState {
        self.state
    }

    pub fn length(&self) -> Duration {
        self.length
    }

    /// Current offset into the song, never past its end.
    pub fn position(&self, now: Instant) -> Duration {
        let raw = match (self.state, self.started_at) {
            (TransportState::Playing, Some(started)) => {
                self.anchor + now.saturating_duration_since(started)
            }
            (TransportState::Stopped, _) => Duration::ZERO,
            _ => self.anchor,
        };
        raw.min(self.length)
    }

    /// Stopped/Paused -> Playing. Returns the offset channels should start
    /// from, or `None` if already playing.
    pub fn play(&mut self, now: Instant) -> Option<Duration> {
        let offset = match self.state {
            TransportState::Playing => return None,
            TransportState::Stopped => Duration::ZERO,
            TransportState::Paused => self.anchor,
        };
        self.state = TransportState::Playing;
        self.anchor = offset;
        self.started_at = Some(now);
        Some(offset)
    }

    /// Playing -> Paused, freezing the position. No-op otherwise.
    pub fn pause(&mut self, now: Instant) -> bool {
        if self.state != TransportState::Playing {
            return false;
        }
        self.anchor = self.position(now);
        self.started_at = None;
        self.state = TransportState::Paused;
        true
    }

    /// Move a paused position to `offset`, e.g. where the audio really
    /// stopped. Ignored unless paused.
    pub fn anchor_paused(&mut self, offset: Duration) {
        if self.state == TransportState::Paused {
            self.anchor = offset.min(self.length);
        }
    }

    /// Playing/Paused -> Stopped. No-op when already stopped.
    pub fn stop(&mut self) -> bool {
        if self.state == TransportState::Stopped {
            return false;
        }
        self.state = TransportState::Stopped;
        self.anchor = Duration::ZERO;
        self.started_at = None;
        true
    }

    /// Back to zero without changing state.
    pub fn rewind(&mut self, now: Instant) {
        self.anchor = Duration::ZERO;
        if self.state == TransportState::Playing {
            self.started_at = Some(now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SONG: Duration = Duration::from_secs(180);

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn stopped_to_playing_starts_at_zero() {
        let t0 = Instant::now();
        let mut clock = TransportClock::new(SONG);
        assert_eq!(clock.play(t0), Some(Duration::ZERO));
        assert_eq!(clock.state(), TransportState::Playing);
        assert_eq!(clock.position(t0 + ms(1500)), ms(1500));
    }

    #[test]
    fn pause_freezes_and_resume_continues() {
        let t0 = Instant::now();
        let mut clock = TransportClock::new(SONG);
        clock.play(t0);
        assert!(clock.pause(t0 + ms(2000)));
        assert_eq!(clock.position(t0 + ms(9000)), ms(2000));

        assert_eq!(clock.play(t0 + ms(10_000)), Some(ms(2000)));
        assert_eq!(clock.position(t0 + ms(10_500)), ms(2500));
    }

    #[test]
    fn paused_position_follows_the_audio() {
        let t0 = Instant::now();
        let mut clock = TransportClock::new(SONG);
        clock.anchor_paused(ms(700));
        assert_eq!(clock.position(t0), Duration::ZERO);

        clock.play(t0);
        clock.pause(t0 + ms(2000));
        clock.anchor_paused(ms(1980));
        assert_eq!(clock.position(t0 + ms(5000)), ms(1980));
        assert_eq!(clock.play(t0 + ms(6000)), Some(ms(1980)));

        clock.pause(t0 + ms(6100));
        clock.anchor_paused(Duration::from_secs(999));
        assert_eq!(clock.position(t0 + ms(6200)), SONG);
    }

    #[test]
    fn stop_resets_from_either_running_state() {
        let t0 = Instant::now();
        let mut clock = TransportClock::new(SONG);
        clock.play(t0);
        assert!(clock.stop());
        assert_eq!(clock.position(t0 + ms(100)), Duration::ZERO);

        clock.play(t0);
        clock.pause(t0 + ms(300));
        assert!(clock.stop());
        assert_eq!(clock.state(), TransportState::Stopped);
        assert_eq!(clock.play(t0 + ms(400)), Some(Duration::ZERO));
    }

    #[test]
    fn self_transitions_are_rejected() {
        let t0 = Instant::now();
        let mut clock = TransportClock::new(SONG);
        assert!(!clock.stop());
        assert!(!clock.pause(t0));
        assert_eq!(clock.state(), TransportState::Stopped);

        clock.play(t0);
        assert_eq!(clock.play(t0 + ms(10)), None);
        clock.pause(t0 + ms(20));
        assert!(!clock.pause(t0 + ms(30)));
        assert_eq!(clock.state(), TransportState::Paused);
    }

    #[test]
    fn rewind_keeps_state() {
        let t0 = Instant::now();
        let mut clock = TransportClock::new(SONG);

        clock.rewind(t0);
        assert_eq!(clock.state(), TransportState::Stopped);
        assert_eq!(clock.position(t0), Duration::ZERO);

        clock.play(t0);
        clock.rewind(t0 + ms(5000));
        assert_eq!(clock.state(), TransportState::Playing);
        assert_eq!(clock.position(t0 + ms(5250)), ms(250));

        clock.pause(t0 + ms(6000));
        clock.rewind(t0 + ms(7000));
        assert_eq!(clock.state(), TransportState::Paused);
        assert_eq!(clock.position(t0 + ms(8000)), Duration::ZERO);
    }

    #[test]
    fn position_is_clamped_to_length() {
        let t0 = Instant::now();
        let mut clock = TransportClock::new(ms(1000));
        clock.play(t0);
        assert_eq!(clock.position(t0 + ms(5000)), ms(1000));
    }
}
