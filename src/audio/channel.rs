use super::frame::StereoFrame;
use super::sample_buffer::SampleBuffer;

// One stem's read head plus its gain. Every channel in the engine is advanced
// by the same number of frames per block whether it's audible or not, so a
// silent channel is always exactly where the audible ones are.
#[derive(Clone, Debug)]
pub struct StemChannel {
    pub pos: usize,
    gain: f32,
    target: f32,
    step: f32, // per-frame gain increment while ramping
}

impl StemChannel {
    pub fn new(gain: f32) -> Self {
        Self { pos: 0, gain, target: gain, step: 0.0 }
    }

    #[cfg(test)]
    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn is_ramping(&self) -> bool {
        self.gain != self.target
    }

    // glide to `target` over `ramp_frames` so gating never clicks
    pub fn set_target(&mut self, target: f32, ramp_frames: u32) {
        self.target = target;
        if ramp_frames == 0 {
            self.gain = target;
            self.step = 0.0;
        } else {
            self.step = (target - self.gain) / ramp_frames as f32;
        }
    }

    // jump straight to the target, for when nothing is sounding
    pub fn settle(&mut self) {
        self.gain = self.target;
        self.step = 0.0;
    }

    #[inline]
    fn next_gain(&mut self) -> f32 {
        if self.gain != self.target {
            self.gain += self.step;
            let overshot = (self.step > 0.0 && self.gain >= self.target)
                || (self.step < 0.0 && self.gain <= self.target)
                || self.step == 0.0;
            if overshot {
                self.gain = self.target;
            }
        }
        self.gain
    }

    // mix this channel into `out` starting at `pos`, returns frames consumed
    pub fn render_into(&mut self, buffer: &SampleBuffer, out: &mut [StereoFrame]) -> usize {
        let available = buffer.data.len().saturating_sub(self.pos);
        let n = out.len().min(available);
        if n == 0 {
            return 0;
        }

        let src = &buffer.data[self.pos..self.pos + n];
        if !self.is_ramping() && self.gain == 0.0 {
            // gated: skip the math, keep the head moving
            self.pos += n;
            return n;
        }

        for (frame, sample) in out[..n].iter_mut().zip(src) {
            let g = self.next_gain();
            frame.left += sample.left * g;
            frame.right += sample.right * g;
        }
        self.pos += n;
        n
    }
}
