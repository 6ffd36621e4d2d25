use anyhow::Context;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender};

use crate::audio_api::{AudioCommand, AudioEvent};

mod engine;
mod frame;
mod sample_buffer;
mod sound_id;
mod voice;

pub use frame::StereoFrame;
pub use sample_buffer::SampleBuffer;
pub use sound_id::{SoundId, next_sound_id};

use engine::Engine;

pub struct AudioHandle {
    tx: Sender<AudioCommand>,
    event_rx: Receiver<AudioEvent>,
    sample_rate: u32,
    _output_stream: cpal::Stream,
}

impl AudioHandle {
    pub fn send(&self, cmd: AudioCommand) {
        let _ = self.tx.try_send(cmd);
    }

    pub fn poll_event(&self) -> Option<AudioEvent> {
        self.event_rx.try_recv().ok()
    }

    // the rate sample buffers must be resampled to before registration
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

pub fn start_audio() -> anyhow::Result<AudioHandle> {
    let (tx, rx) = crossbeam_channel::bounded::<AudioCommand>(1024);
    let (event_tx, event_rx) = crossbeam_channel::bounded::<AudioEvent>(256);

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .context("no default output device")?;
    let config = device
        .default_output_config()
        .context("no default output config")?;

    let sample_rate = config.sample_rate();
    let channels = config.channels() as usize;

    match config.sample_format() {
        cpal::SampleFormat::F32 => {
            let output_stream =
                build_output_stream_f32(&device, &config.into(), rx, event_tx, channels)?;
            output_stream.play().context("failed to play output stream")?;

            Ok(AudioHandle {
                tx,
                event_rx,
                sample_rate,
                _output_stream: output_stream,
            })
        }
        _ => anyhow::bail!("unsupported sample format (only f32 supported for now)"),
    }
}

fn build_output_stream_f32(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    rx: Receiver<AudioCommand>,
    event_tx: Sender<AudioEvent>,
    channels: usize,
) -> anyhow::Result<cpal::Stream> {
    let mut engine = Engine::new();
    engine.set_event_tx(event_tx);

    // reused between callbacks; only grows when the device block size does
    let mut scratch: Vec<StereoFrame> = Vec::new();

    let err_fn = |err| tracing::error!("audio output stream error: {err}");

    let stream = device.build_output_stream(
        config,
        move |data: &mut [f32], _info| {
            while let Ok(cmd) = rx.try_recv() {
                engine.handle_cmd(cmd);
            }

            let n_frames = data.len() / channels;
            if scratch.len() < n_frames {
                scratch.resize(n_frames, StereoFrame::zero());
            }
            engine.render_block(&mut scratch[..n_frames]);

            // interleave stereo frames into the device layout
            for (frame, out) in scratch[..n_frames].iter().zip(data.chunks_mut(channels)) {
                if channels == 1 {
                    out[0] = 0.5 * (frame.left + frame.right);
                } else {
                    out[0] = frame.left;
                    out[1] = frame.right;
                    for extra in out.iter_mut().skip(2) {
                        *extra = 0.0;
                    }
                }
            }
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}
