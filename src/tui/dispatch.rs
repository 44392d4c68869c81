use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::error::Result;
use crate::mixer::{ChannelPool, MixerEngine};
use crate::shared::KeyCommand;

/// Feeds keys to the mixer one at a time. Nothing else calls into the
/// engine, so a key's call always finishes before the next key is read.
pub struct InputDispatcher {
    keys: Receiver<KeyCommand>,
    tick: Duration,
    volume_step: f32,
}

impl InputDispatcher {
    pub fn new(keys: Receiver<KeyCommand>, tick: Duration, volume_step: f32) -> Self {
        Self { keys, tick, volume_step }
    }

    /// Runs until Quit (or every key source is gone), then quits the engine.
    /// A fatal error drops the engine, which stops every channel at once.
    pub fn run<P: ChannelPool>(&self, mut engine: MixerEngine<P>) -> Result<()> {
        let mut last_tick = Instant::now();
        loop {
            let wait = self.tick.saturating_sub(last_tick.elapsed());
            match self.keys.recv_timeout(wait) {
                Ok(KeyCommand::Quit) | Err(RecvTimeoutError::Disconnected) => {
                    return engine.quit();
                }
                Ok(cmd) => self.dispatch(&mut engine, cmd)?,
                Err(RecvTimeoutError::Timeout) => {}
            }

            // keep ticking under a held key too
            if last_tick.elapsed() >= self.tick {
                engine.tick()?;
                last_tick = Instant::now();
            }
        }
    }

    fn dispatch<P: ChannelPool>(&self, engine: &mut MixerEngine<P>, cmd: KeyCommand) -> Result<()> {
        let result = match cmd {
            KeyCommand::PlayPause => engine.play_pause(),
            KeyCommand::Stop => engine.stop(),
            KeyCommand::Rewind => engine.rewind(),
            KeyCommand::ToggleStem(key) => engine.toggle_stem(key).map(|_| ()),
            KeyCommand::SelectPrev => {
                engine.select(-1);
                Ok(())
            }
            KeyCommand::SelectNext => {
                engine.select(1);
                Ok(())
            }
            KeyCommand::VolumeDown => engine.adjust_selected_volume(-self.volume_step).map(|_| ()),
            KeyCommand::VolumeUp => engine.adjust_selected_volume(self.volume_step).map(|_| ()),
            KeyCommand::Quit => Ok(()),
        };
        match result {
            Err(e) if !e.is_fatal() => {
                // already on the status line
                log::debug!("ignored: {e}");
                Ok(())
            }
            other => other,
        }
    }
}
