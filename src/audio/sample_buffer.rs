use std::path::Path;

use super::frame::StereoFrame;

#[derive(Clone, Debug)]
pub struct SampleBuffer {
    pub data: Vec<StereoFrame>,
}

impl SampleBuffer {
    // Decode a WAV file into stereo frames at the device rate.
    pub fn load_wav(path: &Path, target_rate: u32) -> anyhow::Result<Self> {
        let mut reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        let file_rate = spec.sample_rate;
        let file_channels = spec.channels;

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<Result<Vec<_>, _>>()?,
            hound::SampleFormat::Int => {
                let max = (1u64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|x| x as f32 / max))
                    .collect::<Result<Vec<_>, _>>()?
            }
        };

        let mut frames: Vec<StereoFrame> = if file_channels == 1 {
            // mono, duplicate into both ears
            samples
                .into_iter()
                .map(|x| StereoFrame { left: x, right: x })
                .collect()
        } else {
            // take the first two channels, drop the rest
            samples
                .chunks_exact(file_channels as usize)
                .map(|c| StereoFrame {
                    left: c[0],
                    right: if c.len() > 1 { c[1] } else { c[0] },
                })
                .collect()
        };

        if frames.is_empty() {
            anyhow::bail!("{}: no audio frames", path.display());
        }

        if file_rate != target_rate {
            frames = resample_linear(&frames, file_rate, target_rate);
        }

        Ok(Self { data: frames })
    }
}

fn resample_linear(frames: &[StereoFrame], source_rate: u32, target_rate: u32) -> Vec<StereoFrame> {
    // Plain linear resampler; ambient loops don't need anything sharper.
    if source_rate == target_rate {
        return frames.to_vec();
    }
    let ratio = target_rate as f64 / source_rate as f64;
    let out_len = (frames.len() as f64 * ratio).ceil() as usize;
    let mut out = Vec::with_capacity(out_len);

    for i in 0..out_len {
        // fractional position in the source buffer
        let src_pos = i as f64 / ratio;
        let idx = src_pos.floor() as usize;
        let frac = (src_pos - idx as f64) as f32;
        if idx >= frames.len().saturating_sub(1) {
            out.push(*frames.last().unwrap_or(&StereoFrame::zero()));
        } else {
            let a = frames[idx];
            let b = frames[idx + 1];
            out.push(StereoFrame {
                left: a.left * (1.0 - frac) + b.left * frac,
                right: a.right * (1.0 - frac) + b.right * frac,
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> Vec<StereoFrame> {
        (0..n)
            .map(|i| StereoFrame { left: i as f32, right: i as f32 })
            .collect()
    }

    #[test]
    fn resample_same_rate_is_identity() {
        let frames = ramp(10);
        let out = resample_linear(&frames, 44100, 44100);
        assert_eq!(out.len(), frames.len());
        assert_eq!(out[3].left, 3.0);
    }

    #[test]
    fn resample_doubles_length_when_upsampling_2x() {
        let frames = ramp(8);
        let out = resample_linear(&frames, 22050, 44100);
        assert_eq!(out.len(), 16);
        // midpoint between source frames 1 and 2
        assert!((out[3].left - 1.5).abs() < 1e-4);
    }
}
