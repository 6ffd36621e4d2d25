pub use crate::audio::{SampleBuffer, SoundId};

#[derive(Clone, Debug)]
pub enum AudioCommand {
    // The engine can't load files (interrupts thread), so you must first
    // register a preloaded buffer (see library.rs), then address it by id.
    RegisterSample { id: SoundId, buffer: SampleBuffer },

    // Start (or restart from the top) one voice for this sound.
    Play { id: SoundId, gain: f32, speed: f32 },

    // Stop and drop the voice; position resets because Play always starts at 0.
    Stop { id: SoundId },

    // Live parameter pushes onto a running voice; ignored if it isn't playing.
    SetGain { id: SoundId, gain: f32 },
    SetSpeed { id: SoundId, speed: f32 },
}

// Engine-to-app notifications, polled by the main loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AudioEvent {
    // A voice ran off the end of its buffer (natural completion, not Stop).
    Finished { id: SoundId },
}
