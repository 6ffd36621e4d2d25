use super::frame::StereoFrame;
use super::sample_buffer::SampleBuffer;

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a * (1.0 - t) + b * t
}

// One playing sound. Lives from Play until Stop or the end of its buffer;
// gain and speed can be pushed onto it mid-playback.
#[derive(Clone, Debug)]
pub struct Voice {
    pos: f32,
    speed: f32,
    gain: f32,
    finished: bool,
}

impl Voice {
    pub fn new(gain: f32, speed: f32) -> Self {
        Self {
            pos: 0.0,
            speed,
            gain,
            finished: false,
        }
    }

    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain;
    }

    pub fn set_speed(&mut self, speed: f32) {
        self.speed = speed;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn render_into(&mut self, buffer: &SampleBuffer, out: &mut [StereoFrame]) {
        if self.finished {
            return;
        }
        let data = &buffer.data;
        if data.is_empty() {
            self.finished = true;
            return;
        }
        let len = data.len() as f32;

        for frame in out.iter_mut() {
            if self.pos >= len {
                self.finished = true;
                break;
            }

            // read sample at current position
            let i = self.pos as usize;
            let frac = self.pos - i as f32;
            let s0 = data[i];
            let s1 = data.get(i + 1).copied().unwrap_or(s0);

            frame.left += lerp(s0.left, s1.left, frac) * self.gain;
            frame.right += lerp(s0.right, s1.right, frac) * self.gain;

            // speed is the per-frame position increment
            self.pos += self.speed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant_buffer(n: usize, value: f32) -> SampleBuffer {
        SampleBuffer {
            data: vec![StereoFrame { left: value, right: value }; n],
        }
    }

    #[test]
    fn applies_gain_to_output() {
        let buf = constant_buffer(64, 1.0);
        let mut voice = Voice::new(0.25, 1.0);
        let mut out = vec![StereoFrame::zero(); 16];
        voice.render_into(&buf, &mut out);
        assert!((out[0].left - 0.25).abs() < 1e-6);
        assert!(!voice.is_finished());
    }

    #[test]
    fn finishes_at_end_of_buffer() {
        let buf = constant_buffer(8, 1.0);
        let mut voice = Voice::new(1.0, 1.0);
        let mut out = vec![StereoFrame::zero(); 16];
        voice.render_into(&buf, &mut out);
        assert!(voice.is_finished());
    }

    #[test]
    fn double_speed_finishes_in_half_the_frames() {
        let buf = constant_buffer(16, 1.0);
        let mut voice = Voice::new(1.0, 2.0);
        let mut out = vec![StereoFrame::zero(); 8];
        voice.render_into(&buf, &mut out);
        assert!(!voice.is_finished());
        let mut out2 = vec![StereoFrame::zero(); 8];
        voice.render_into(&buf, &mut out2);
        assert!(voice.is_finished());
    }
}
