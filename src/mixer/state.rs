use std::time::Duration;

use crate::audio::SoundId;
use crate::audio_api::AudioCommand;
use crate::library::{Library, Resolved};
use crate::shared::{BackdropRow, DEFAULT_GLOBAL_VOLUME, DisplayState, SoundCard, SoundCell};
use crate::snapshot::Snapshot;

use super::controller::PlaybackController;
use super::settings::{SettingsStore, SoundSettings};

// The one owner of mixer state: which sounds are on, their settings, the
// global volume, the expanded card, the backdrop. Every user command comes
// through here; the return value is the commands the engine must apply.
pub struct Mixer {
    settings: SettingsStore,
    controller: PlaybackController,
    active: Vec<String>, // insertion order is display order
    global_volume: f32,
    expanded: Option<String>,
    backdrop: Option<String>,
    dirty: bool,
}

impl Mixer {
    pub fn new() -> Self {
        Self {
            settings: SettingsStore::default(),
            controller: PlaybackController::default(),
            active: Vec::new(),
            global_volume: DEFAULT_GLOBAL_VOLUME,
            expanded: None,
            backdrop: None,
            dirty: false,
        }
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.active.iter().any(|n| n == name)
    }

    // Membership flip. `resolve` is only invoked on the activating half, so
    // callers can defer the decode/register work until it's actually needed.
    pub fn toggle_sound(
        &mut self,
        name: &str,
        resolve: impl FnOnce() -> Option<SoundId>,
    ) -> Vec<AudioCommand> {
        let mut out = Vec::new();
        if let Some(pos) = self.active.iter().position(|n| n == name) {
            self.active.remove(pos);
            self.controller.deactivate(name, &mut out);
        } else {
            self.settings.ensure(name);
            self.active.push(name.to_string());
            let settings = self.settings.get(name).unwrap_or_default();
            self.controller
                .activate(name, resolve(), settings, self.global_volume, &mut out);
        }
        self.dirty = true;
        out
    }

    pub fn set_global_volume(&mut self, volume: f32) -> Vec<AudioCommand> {
        self.global_volume = volume.clamp(0.0, 1.0);
        let mut out = Vec::new();
        self.controller
            .refresh_gains(&self.settings, self.global_volume, &mut out);
        self.dirty = true;
        out
    }

    pub fn update_sound_volume(&mut self, name: &str, volume: f32) -> Vec<AudioCommand> {
        self.settings.set_volume(name, volume);
        self.push_live(name)
    }

    pub fn update_sound_speed(&mut self, name: &str, speed: f32) -> Vec<AudioCommand> {
        self.settings.set_speed(name, speed);
        self.push_live(name)
    }

    pub fn update_sound_loop_gap(&mut self, name: &str, loop_gap_ms: u64) -> Vec<AudioCommand> {
        // takes effect at the next scheduled restart, not retroactively
        self.settings.set_loop_gap(name, loop_gap_ms);
        self.dirty = true;
        Vec::new()
    }

    fn push_live(&mut self, name: &str) -> Vec<AudioCommand> {
        let mut out = Vec::new();
        if let Some(settings) = self.settings.get(name) {
            self.controller
                .apply_live_settings(name, settings, self.global_volume, &mut out);
            self.dirty = true;
        }
        out
    }

    pub fn remove_sound(&mut self, name: &str) -> Vec<AudioCommand> {
        if !self.is_active(name) {
            return Vec::new();
        }
        if self.expanded.as_deref() == Some(name) {
            self.expanded = None;
        }
        self.toggle_sound(name, || None)
    }

    // Caller is responsible for having confirmed this with the user, and for
    // clearing the persisted snapshot alongside it.
    pub fn clear_all(&mut self) -> Vec<AudioCommand> {
        let mut out = Vec::new();
        for name in std::mem::take(&mut self.active) {
            self.controller.deactivate(&name, &mut out);
        }
        self.settings.clear();
        self.global_volume = DEFAULT_GLOBAL_VOLUME;
        self.expanded = None;
        self.backdrop = None;
        self.dirty = false;
        out
    }

    pub fn toggle_expanded(&mut self, name: &str) {
        if self.expanded.as_deref() == Some(name) {
            self.expanded = None;
        } else {
            // expanding one card implicitly collapses any other
            self.expanded = Some(name.to_string());
        }
    }

    pub fn select_backdrop(&mut self, backdrop: Option<String>) {
        self.backdrop = backdrop;
        self.dirty = true;
    }

    pub fn on_finished(&mut self, id: SoundId) {
        self.controller.on_finished(id, &self.settings);
    }

    pub fn tick(&mut self, dt: Duration) -> Vec<AudioCommand> {
        let mut out = Vec::new();
        self.controller
            .tick(dt, &self.settings, self.global_volume, &mut out);
        out
    }

    // True once per mutation batch; the main loop saves when it sees it.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            active_sounds: self.active.clone(),
            settings: self
                .settings
                .iter()
                .map(|(name, s)| (name.clone(), *s))
                .collect(),
            global_volume: self.global_volume,
            backdrop: self.backdrop.clone(),
        }
    }

    // Startup replay. Installs settings first, then drives each persisted
    // active sound through the same toggle path a user keypress takes, so a
    // toggle racing restoration still converges on consistent state.
    pub fn restore(
        &mut self,
        snapshot: Snapshot,
        mut resolve: impl FnMut(&str) -> Resolved,
    ) -> Vec<AudioCommand> {
        let mut out = Vec::new();
        self.global_volume = snapshot.global_volume.clamp(0.0, 1.0);
        self.backdrop = snapshot.backdrop;
        for (name, s) in snapshot.settings {
            self.settings.insert(name.clone(), SoundSettings::default());
            self.settings.set_volume(&name, s.volume);
            self.settings.set_speed(&name, s.speed);
            self.settings.set_loop_gap(&name, s.loop_gap_ms);
        }
        for name in snapshot.active_sounds {
            if self.is_active(&name) {
                continue;
            }
            let resolved = resolve(&name);
            if resolved == Resolved::Missing {
                tracing::info!("persisted sound {name:?} is no longer in the library");
                continue;
            }
            let id = match resolved {
                Resolved::Loaded(id) => Some(id),
                _ => None,
            };
            out.extend(self.toggle_sound(&name, || id));
        }
        self.dirty = false;
        out
    }

    pub fn display_state(&self, library: &Library) -> DisplayState {
        DisplayState {
            grid: library
                .sounds
                .iter()
                .enumerate()
                .map(|(i, s)| SoundCell {
                    name: s.name.clone(),
                    active: self.is_active(&s.name),
                    unavailable: library.is_unavailable(i),
                })
                .collect(),
            cards: self
                .active
                .iter()
                .map(|name| {
                    let s = self.settings.get(name).unwrap_or_default();
                    SoundCard {
                        name: name.clone(),
                        volume: s.volume,
                        speed: s.speed,
                        loop_gap_ms: s.loop_gap_ms,
                        expanded: self.expanded.as_deref() == Some(name.as_str()),
                        waiting: self.controller.is_waiting(name),
                    }
                })
                .collect(),
            global_volume: self.global_volume,
            backdrop: self.backdrop.as_ref().map(|file| {
                library
                    .backdrop_display_name(file)
                    .unwrap_or(file.as_str())
                    .to_string()
            }),
            backdrops: library
                .backdrops
                .iter()
                .map(|b| BackdropRow {
                    display_name: b.display_name.clone(),
                    file: b.file.clone(),
                    is_video: b.kind == crate::library::BackdropKind::Video,
                    selected: self.backdrop.as_deref() == Some(b.file.as_str()),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::next_sound_id;

    fn gains(cmds: &[AudioCommand]) -> Vec<f32> {
        cmds.iter()
            .filter_map(|c| match c {
                AudioCommand::SetGain { gain, .. } => Some(*gain),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn toggle_parity_controls_membership() {
        let mut mixer = Mixer::new();
        let id = next_sound_id();
        for i in 1..=5 {
            mixer.toggle_sound("rain", || Some(id));
            assert_eq!(mixer.is_active("rain"), i % 2 == 1);
        }
    }

    #[test]
    fn toggle_emits_play_then_stop() {
        let mut mixer = Mixer::new();
        let id = next_sound_id();
        let on = mixer.toggle_sound("rain", || Some(id));
        assert!(matches!(on.as_slice(), [AudioCommand::Play { .. }]));
        let off = mixer.toggle_sound("rain", || Some(id));
        assert!(matches!(off.as_slice(), [AudioCommand::Stop { .. }]));
    }

    #[test]
    fn reactivation_restores_previous_settings() {
        let mut mixer = Mixer::new();
        let id = next_sound_id();
        mixer.toggle_sound("rain", || Some(id));
        mixer.update_sound_volume("rain", 0.9);
        mixer.toggle_sound("rain", || Some(id)); // off; record survives
        let on = mixer.toggle_sound("rain", || Some(id));
        match on.as_slice() {
            [AudioCommand::Play { gain, .. }] => assert!((gain - 0.5 * 0.9).abs() < 1e-6),
            other => panic!("expected Play, got {other:?}"),
        }
    }

    // defaults, global 0.6 gives 0.30; raising the sound to 0.8 gives 0.48
    #[test]
    fn effective_volume_tracks_global_and_per_sound() {
        let mut mixer = Mixer::new();
        let id = next_sound_id();
        mixer.toggle_sound("rain", || Some(id));

        let cmds = mixer.set_global_volume(0.6);
        assert_eq!(gains(&cmds).len(), 1);
        assert!((gains(&cmds)[0] - 0.30).abs() < 1e-6);

        let cmds = mixer.update_sound_volume("rain", 0.8);
        assert!((gains(&cmds)[0] - 0.48).abs() < 1e-6);
    }

    #[test]
    fn global_volume_does_not_touch_inactive_sounds() {
        let mut mixer = Mixer::new();
        let id = next_sound_id();
        mixer.toggle_sound("rain", || Some(id));
        mixer.toggle_sound("rain", || Some(id)); // off again
        let cmds = mixer.set_global_volume(0.9);
        assert!(gains(&cmds).is_empty());
    }

    #[test]
    fn expanding_one_card_collapses_the_other() {
        let mut mixer = Mixer::new();
        mixer.toggle_sound("rain", || Some(next_sound_id()));
        mixer.toggle_sound("fire", || Some(next_sound_id()));
        mixer.toggle_expanded("rain");
        mixer.toggle_expanded("fire");

        let lib = Library::scan(std::path::Path::new("/nonexistent"));
        let ds = mixer.display_state(&lib);
        let expanded: Vec<_> = ds.cards.iter().filter(|c| c.expanded).collect();
        assert_eq!(expanded.len(), 1);
        assert_eq!(expanded[0].name, "fire");

        mixer.toggle_expanded("fire"); // second press collapses
        let ds = mixer.display_state(&lib);
        assert!(ds.cards.iter().all(|c| !c.expanded));
    }

    #[test]
    fn remove_sound_clears_its_expanded_pointer() {
        let mut mixer = Mixer::new();
        mixer.toggle_sound("rain", || Some(next_sound_id()));
        mixer.toggle_expanded("rain");
        let cmds = mixer.remove_sound("rain");
        assert!(matches!(cmds.as_slice(), [AudioCommand::Stop { .. }]));
        assert!(!mixer.is_active("rain"));

        // removing an inactive sound is a no-op
        assert!(mixer.remove_sound("rain").is_empty());
    }

    #[test]
    fn clear_all_resets_to_defaults() {
        let mut mixer = Mixer::new();
        mixer.toggle_sound("rain", || Some(next_sound_id()));
        mixer.toggle_sound("fire", || Some(next_sound_id()));
        mixer.set_global_volume(0.9);
        mixer.select_backdrop(Some("dunes.jpg".to_string()));

        let cmds = mixer.clear_all();
        assert_eq!(
            cmds.iter()
                .filter(|c| matches!(c, AudioCommand::Stop { .. }))
                .count(),
            2
        );
        assert_eq!(mixer.snapshot(), Snapshot::default());
        assert_eq!(mixer.snapshot().global_volume, DEFAULT_GLOBAL_VOLUME);
    }

    #[test]
    fn snapshot_round_trips_through_restore() {
        let mut mixer = Mixer::new();
        let rain = next_sound_id();
        let fire = next_sound_id();
        mixer.toggle_sound("rain", || Some(rain));
        mixer.toggle_sound("fire", || Some(fire));
        mixer.update_sound_speed("rain", 1.5);
        mixer.update_sound_loop_gap("fire", 800);
        mixer.set_global_volume(0.7);
        mixer.select_backdrop(Some("dunes.jpg".to_string()));
        let snapshot = mixer.snapshot();

        let mut restored = Mixer::new();
        let cmds = restored.restore(snapshot.clone(), |name| match name {
            "rain" => Resolved::Loaded(rain),
            "fire" => Resolved::Loaded(fire),
            _ => Resolved::Missing,
        });
        assert_eq!(
            cmds.iter()
                .filter(|c| matches!(c, AudioCommand::Play { .. }))
                .count(),
            2
        );
        assert_eq!(restored.snapshot(), snapshot);
        assert!(!restored.take_dirty()); // restoring is not a user mutation
    }

    #[test]
    fn restore_skips_sounds_missing_from_the_library() {
        let mut mixer = Mixer::new();
        let id = next_sound_id();
        let mut snapshot = Snapshot::default();
        snapshot.active_sounds = vec!["gone".to_string(), "rain".to_string()];

        let cmds = mixer.restore(snapshot, |name| match name {
            "rain" => Resolved::Loaded(id),
            _ => Resolved::Missing,
        });
        assert!(!mixer.is_active("gone"));
        assert!(mixer.is_active("rain"));
        assert_eq!(cmds.len(), 1);
    }

    #[test]
    fn restore_keeps_unavailable_sounds_listed_but_silent() {
        let mut mixer = Mixer::new();
        let mut snapshot = Snapshot::default();
        snapshot.active_sounds = vec!["rain".to_string()];

        let cmds = mixer.restore(snapshot, |_| Resolved::Unavailable);
        assert!(mixer.is_active("rain"));
        assert!(cmds.is_empty()); // nothing to play, but still in the set
    }

    #[test]
    fn mutations_mark_the_state_dirty_once() {
        let mut mixer = Mixer::new();
        assert!(!mixer.take_dirty());
        mixer.toggle_sound("rain", || Some(next_sound_id()));
        assert!(mixer.take_dirty());
        assert!(!mixer.take_dirty());
    }
}
