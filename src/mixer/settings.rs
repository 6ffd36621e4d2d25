use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::shared::{MAX_SPEED, MIN_SPEED};

// Per-sound settings. Records are created lazily on first activation and
// never deleted, so turning a sound back on restores its last values.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SoundSettings {
    pub volume: f32,      // 0.0 ..= 1.0, scaled by the global volume
    pub speed: f32,       // 0.5 ..= 2.0 playback rate
    pub loop_gap_ms: u64, // silence between consecutive plays
}

impl Default for SoundSettings {
    fn default() -> Self {
        Self {
            volume: 0.5,
            speed: 1.0,
            loop_gap_ms: 0,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SettingsStore {
    records: HashMap<String, SoundSettings>,
}

impl SettingsStore {
    pub fn ensure(&mut self, name: &str) {
        if !self.records.contains_key(name) {
            self.records.insert(name.to_string(), SoundSettings::default());
        }
    }

    pub fn get(&self, name: &str) -> Option<SoundSettings> {
        self.records.get(name).copied()
    }

    // Mutators are no-ops when the record doesn't exist; callers ensure() first.
    pub fn set_volume(&mut self, name: &str, volume: f32) {
        if let Some(record) = self.records.get_mut(name) {
            record.volume = volume.clamp(0.0, 1.0);
        }
    }

    pub fn set_speed(&mut self, name: &str, speed: f32) {
        if let Some(record) = self.records.get_mut(name) {
            record.speed = speed.clamp(MIN_SPEED, MAX_SPEED);
        }
    }

    pub fn set_loop_gap(&mut self, name: &str, loop_gap_ms: u64) {
        if let Some(record) = self.records.get_mut(name) {
            record.loop_gap_ms = loop_gap_ms;
        }
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SoundSettings)> {
        self.records.iter()
    }

    pub fn insert(&mut self, name: String, settings: SoundSettings) {
        self.records.insert(name, settings);
    }
}
