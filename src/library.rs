// Discovery of the on-disk assets: WAV sounds in <root>/sounds/ and
// backdrop images/videos in <root>/backdrops/. Sounds decode lazily on
// first activation so startup stays fast and a corrupt file only degrades
// that one sound.

use std::path::{Path, PathBuf};

use crate::audio::{SampleBuffer, SoundId, next_sound_id};
use crate::audio_api::AudioCommand;

const SOUNDS_DIR: &str = "sounds";
const BACKDROPS_DIR: &str = "backdrops";

const IMAGE_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "webp", "bmp"];
const VIDEO_EXTENSIONS: [&str; 6] = ["mp4", "webm", "mov", "avi", "mkv", "flv"];

/// Outcome of resolving a sound name to something the engine can play.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resolved {
    /// Not in the library at all (e.g. a stale name in a snapshot).
    Missing,
    /// In the library but the file would not decode; listed but silent.
    Unavailable,
    Loaded(SoundId),
}

pub struct SoundEntry {
    pub name: String,
    path: PathBuf,
    sound_id: Option<SoundId>,
    unavailable: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackdropKind {
    Image,
    Video,
}

#[derive(Clone, Debug)]
pub struct Backdrop {
    pub display_name: String, // file stem with underscores as spaces
    pub file: String,         // actual file name, the persisted id
    pub kind: BackdropKind,
}

pub struct Library {
    pub sounds: Vec<SoundEntry>,
    pub backdrops: Vec<Backdrop>,
}

impl Library {
    pub fn scan(root: &Path) -> Self {
        Self {
            sounds: scan_sounds(&root.join(SOUNDS_DIR)),
            backdrops: scan_backdrops(&root.join(BACKDROPS_DIR)),
        }
    }

    pub fn sound_name(&self, index: usize) -> Option<&str> {
        self.sounds.get(index).map(|s| s.name.as_str())
    }

    pub fn is_unavailable(&self, index: usize) -> bool {
        self.sounds.get(index).is_some_and(|s| s.unavailable)
    }

    /// Resolve a sound by grid index, decoding and registering the buffer
    /// with the engine on first use. Decode failures are logged and leave
    /// the entry marked unavailable; a later resolve retries.
    pub fn resolve(
        &mut self,
        index: usize,
        target_rate: u32,
        send: &mut dyn FnMut(AudioCommand),
    ) -> Resolved {
        let Some(entry) = self.sounds.get_mut(index) else {
            return Resolved::Missing;
        };
        if let Some(id) = entry.sound_id {
            return Resolved::Loaded(id);
        }
        match SampleBuffer::load_wav(&entry.path, target_rate) {
            Ok(buffer) => {
                let id = next_sound_id();
                entry.sound_id = Some(id);
                entry.unavailable = false;
                send(AudioCommand::RegisterSample { id, buffer });
                Resolved::Loaded(id)
            }
            Err(e) => {
                tracing::warn!("could not decode {}: {e:#}", entry.path.display());
                entry.unavailable = true;
                Resolved::Unavailable
            }
        }
    }

    pub fn resolve_by_name(
        &mut self,
        name: &str,
        target_rate: u32,
        send: &mut dyn FnMut(AudioCommand),
    ) -> Resolved {
        match self.sounds.iter().position(|s| s.name == name) {
            Some(index) => self.resolve(index, target_rate, send),
            None => Resolved::Missing,
        }
    }

    pub fn backdrop_display_name(&self, file: &str) -> Option<&str> {
        self.backdrops
            .iter()
            .find(|b| b.file == file)
            .map(|b| b.display_name.as_str())
    }
}

fn scan_sounds(dir: &Path) -> Vec<SoundEntry> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new(); // no sounds directory is an empty library, not an error
    };
    let mut sounds: Vec<SoundEntry> = entries
        .flatten()
        .filter(|e| e.path().is_file())
        .filter_map(|e| {
            let path = e.path();
            let ext = path.extension()?.to_str()?.to_ascii_lowercase();
            if ext != "wav" {
                return None;
            }
            let name = display_name(&path)?;
            Some(SoundEntry {
                name,
                path,
                sound_id: None,
                unavailable: false,
            })
        })
        .collect();
    sounds.sort_by(|a, b| a.name.cmp(&b.name)); // stable grid order
    sounds
}

fn scan_backdrops(dir: &Path) -> Vec<Backdrop> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut backdrops: Vec<Backdrop> = entries
        .flatten()
        .filter(|e| e.path().is_file())
        .filter_map(|e| {
            let path = e.path();
            let ext = path.extension()?.to_str()?.to_ascii_lowercase();
            let kind = if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
                BackdropKind::Image
            } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
                BackdropKind::Video
            } else {
                return None; // skip unsupported file types
            };
            Some(Backdrop {
                display_name: display_name(&path)?,
                file: path.file_name()?.to_str()?.to_string(),
                kind,
            })
        })
        .collect();
    backdrops.sort_by(|a, b| a.display_name.cmp(&b.display_name));
    backdrops
}

fn display_name(path: &Path) -> Option<String> {
    Some(path.file_stem()?.to_str()?.replace('_', " "))
}
