use std::collections::HashMap;

use crossbeam_channel::Sender;

use crate::audio_api::{AudioCommand, AudioEvent};

use super::frame::StereoFrame;
use super::sample_buffer::SampleBuffer;
use super::sound_id::SoundId;
use super::voice::Voice;

// Runs entirely on the audio callback thread. Owns the registered buffers
// and at most one voice per sound; natural completions go out on event_tx
// so the app side can schedule the next loop.
pub struct Engine {
    buffers: HashMap<SoundId, SampleBuffer>,
    voices: HashMap<SoundId, Voice>,
    event_tx: Option<Sender<AudioEvent>>,
    finished_scratch: Vec<SoundId>, // reused so render_block stays allocation-free
}

impl Engine {
    pub fn new() -> Self {
        Self {
            buffers: HashMap::new(),
            voices: HashMap::new(),
            event_tx: None,
            finished_scratch: Vec::with_capacity(16),
        }
    }

    pub fn set_event_tx(&mut self, tx: Sender<AudioEvent>) {
        self.event_tx = Some(tx);
    }

    pub fn handle_cmd(&mut self, cmd: AudioCommand) {
        match cmd {
            AudioCommand::RegisterSample { id, buffer } => {
                self.buffers.insert(id, buffer);
            }
            AudioCommand::Play { id, gain, speed } => {
                // unknown id means the buffer was never registered; nothing to play
                if self.buffers.contains_key(&id) {
                    self.voices.insert(id, Voice::new(gain, speed));
                }
            }
            AudioCommand::Stop { id } => {
                self.voices.remove(&id);
            }
            AudioCommand::SetGain { id, gain } => {
                if let Some(voice) = self.voices.get_mut(&id) {
                    voice.set_gain(gain);
                }
            }
            AudioCommand::SetSpeed { id, speed } => {
                if let Some(voice) = self.voices.get_mut(&id) {
                    voice.set_speed(speed);
                }
            }
        }
    }

    pub fn render_block(&mut self, out: &mut [StereoFrame]) {
        for frame in out.iter_mut() {
            *frame = StereoFrame::zero();
        }

        self.finished_scratch.clear();
        for (id, voice) in self.voices.iter_mut() {
            if let Some(buffer) = self.buffers.get(id) {
                voice.render_into(buffer, out);
            }
            if voice.is_finished() {
                self.finished_scratch.push(*id);
            }
        }

        for id in self.finished_scratch.drain(..) {
            self.voices.remove(&id);
            if let Some(tx) = &self.event_tx {
                let _ = tx.try_send(AudioEvent::Finished { id });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::sound_id::next_sound_id;

    fn short_buffer(n: usize) -> SampleBuffer {
        SampleBuffer {
            data: vec![StereoFrame { left: 1.0, right: 1.0 }; n],
        }
    }

    #[test]
    fn play_without_registered_buffer_is_ignored() {
        let mut engine = Engine::new();
        let id = next_sound_id();
        engine.handle_cmd(AudioCommand::Play { id, gain: 1.0, speed: 1.0 });
        let mut out = vec![StereoFrame::zero(); 8];
        engine.render_block(&mut out);
        assert_eq!(out[0].left, 0.0);
    }

    #[test]
    fn finished_voice_emits_event_and_is_dropped() {
        let (tx, rx) = crossbeam_channel::bounded(4);
        let mut engine = Engine::new();
        engine.set_event_tx(tx);
        let id = next_sound_id();
        engine.handle_cmd(AudioCommand::RegisterSample { id, buffer: short_buffer(4) });
        engine.handle_cmd(AudioCommand::Play { id, gain: 1.0, speed: 1.0 });

        let mut out = vec![StereoFrame::zero(); 16];
        engine.render_block(&mut out);

        assert_eq!(rx.try_recv(), Ok(AudioEvent::Finished { id }));
        // the voice is gone; the next block renders silence
        engine.render_block(&mut out);
        assert_eq!(out[0].left, 0.0);
    }

    #[test]
    fn voices_sum_into_the_block() {
        let mut engine = Engine::new();
        let a = next_sound_id();
        let b = next_sound_id();
        engine.handle_cmd(AudioCommand::RegisterSample { id: a, buffer: short_buffer(64) });
        engine.handle_cmd(AudioCommand::RegisterSample { id: b, buffer: short_buffer(64) });
        engine.handle_cmd(AudioCommand::Play { id: a, gain: 0.3, speed: 1.0 });
        engine.handle_cmd(AudioCommand::Play { id: b, gain: 0.2, speed: 1.0 });

        let mut out = vec![StereoFrame::zero(); 8];
        engine.render_block(&mut out);
        assert!((out[0].left - 0.5).abs() < 1e-6);
    }
}
