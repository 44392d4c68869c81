// Everything the mixer can ask of the audio thread. Offsets are in frames at
// the device rate. Each command is applied to every channel between two
// blocks, never halfway through one, which is what keeps the stems locked.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AudioCommand {
    // move every read head to `offset` and start rendering
    Start { offset: usize },

    // stop rendering, read heads stay where they are
    Stop,

    // move every read head to `offset`, running or not
    Seek { offset: usize },

    // retarget one channel's gain, ramped by the engine
    SetGain { channel: usize, gain: f32 },
}
