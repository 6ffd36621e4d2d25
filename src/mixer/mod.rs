mod controller;
mod settings;
mod state;

pub use settings::SoundSettings;
pub use state::Mixer;
