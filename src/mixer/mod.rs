//! Live stem mixer
//!
//! - `transport`: play/pause/stop state and elapsed time
//! - `pool`: one channel per stem behind the `ChannelPool` seam
//! - `engine`: `MixerEngine`, the only thing the input side talks to
//! - `reporter`: where status snapshots go after every change

mod engine;
mod mute_mask;
mod pool;
mod reporter;
mod transport;

#[cfg(test)]
pub mod testing;

pub use engine::MixerEngine;
pub use pool::{ChannelPool, CpalChannelPool};
pub use reporter::{JsonLinesReporter, StatusReporter};
