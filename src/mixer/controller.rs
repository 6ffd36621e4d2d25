use std::collections::HashMap;
use std::time::Duration;

use crate::audio::SoundId;
use crate::audio_api::AudioCommand;

use super::settings::{SettingsStore, SoundSettings};

// Per-sound playback state. An entry is created on first activation and
// kept for the rest of the session, so a sound keeps its engine id across
// activate/deactivate cycles.
#[derive(Clone, Copy, Debug, PartialEq)]
enum PlayState {
    Stopped,
    Playing,
    // Waiting out the loop gap between two plays. The wait is captured when
    // the timer is armed; gap edits apply to the next restart only.
    PendingRestart { remaining: Duration },
}

#[derive(Debug)]
struct Entry {
    // None when the source file never decoded; the sound stays listed but silent
    sound_id: Option<SoundId>,
    state: PlayState,
}

// Drives the engine purely through AudioCommands. Owns the loop-gap policy:
// a finished voice is restarted after its configured gap, unless the sound
// was deactivated while the timer ran.
#[derive(Debug, Default)]
pub struct PlaybackController {
    entries: HashMap<String, Entry>,
}

impl PlaybackController {
    pub fn activate(
        &mut self,
        name: &str,
        sound_id: Option<SoundId>,
        settings: SoundSettings,
        global_volume: f32,
        out: &mut Vec<AudioCommand>,
    ) {
        let entry = self
            .entries
            .entry(name.to_string())
            .or_insert(Entry { sound_id: None, state: PlayState::Stopped });
        if sound_id.is_some() {
            entry.sound_id = sound_id;
        }
        match entry.state {
            PlayState::Stopped => {
                if let Some(id) = entry.sound_id {
                    out.push(AudioCommand::Play {
                        id,
                        gain: global_volume * settings.volume,
                        speed: settings.speed,
                    });
                    entry.state = PlayState::Playing;
                }
            }
            // already running (or about to restart); nothing to do
            PlayState::Playing | PlayState::PendingRestart { .. } => {}
        }
    }

    pub fn deactivate(&mut self, name: &str, out: &mut Vec<AudioCommand>) {
        if let Some(entry) = self.entries.get_mut(name) {
            if entry.state == PlayState::Playing
                && let Some(id) = entry.sound_id
            {
                out.push(AudioCommand::Stop { id });
            }
            // leaving PendingRestart here is what cancels the gap timer
            entry.state = PlayState::Stopped;
        }
    }

    // Push volume/speed onto a running voice. When the sound isn't playing
    // there is nothing to push; the settings store already holds the values
    // the next Play will read.
    pub fn apply_live_settings(
        &mut self,
        name: &str,
        settings: SoundSettings,
        global_volume: f32,
        out: &mut Vec<AudioCommand>,
    ) {
        if let Some(entry) = self.entries.get(name)
            && entry.state == PlayState::Playing
            && let Some(id) = entry.sound_id
        {
            out.push(AudioCommand::SetGain { id, gain: global_volume * settings.volume });
            out.push(AudioCommand::SetSpeed { id, speed: settings.speed });
        }
    }

    // Recompute effective gain for every playing sound (global volume moved).
    pub fn refresh_gains(
        &self,
        store: &SettingsStore,
        global_volume: f32,
        out: &mut Vec<AudioCommand>,
    ) {
        for (name, entry) in &self.entries {
            if entry.state == PlayState::Playing
                && let Some(id) = entry.sound_id
                && let Some(settings) = store.get(name)
            {
                out.push(AudioCommand::SetGain { id, gain: global_volume * settings.volume });
            }
        }
    }

    // Natural end of a voice. Arms the gap timer with the gap configured
    // right now; only a currently-playing entry arms (a Finished event can
    // trail a deactivation within the same loop iteration).
    pub fn on_finished(&mut self, id: SoundId, store: &SettingsStore) {
        for (name, entry) in self.entries.iter_mut() {
            if entry.sound_id == Some(id) {
                if entry.state == PlayState::Playing {
                    let gap_ms = store.get(name).map(|s| s.loop_gap_ms).unwrap_or(0);
                    entry.state = PlayState::PendingRestart {
                        remaining: Duration::from_millis(gap_ms),
                    };
                }
                return;
            }
        }
    }

    // Count down gap timers. An expired timer restarts its sound; an entry
    // deactivated while waiting is already back in Stopped, so it can't fire.
    pub fn tick(
        &mut self,
        dt: Duration,
        store: &SettingsStore,
        global_volume: f32,
        out: &mut Vec<AudioCommand>,
    ) {
        for (name, entry) in self.entries.iter_mut() {
            let PlayState::PendingRestart { remaining } = &mut entry.state else {
                continue;
            };
            if *remaining > dt {
                *remaining -= dt;
                continue;
            }
            match (entry.sound_id, store.get(name)) {
                (Some(id), Some(settings)) => {
                    out.push(AudioCommand::Play {
                        id,
                        gain: global_volume * settings.volume,
                        speed: settings.speed,
                    });
                    entry.state = PlayState::Playing;
                }
                _ => entry.state = PlayState::Stopped,
            }
        }
    }

    pub fn is_playing(&self, name: &str) -> bool {
        matches!(
            self.entries.get(name),
            Some(Entry { state: PlayState::Playing, .. })
        )
    }

    pub fn is_waiting(&self, name: &str) -> bool {
        matches!(
            self.entries.get(name),
            Some(Entry { state: PlayState::PendingRestart { .. }, .. })
        )
    }
}
