// Session persistence: the snapshot shape, the store abstraction over the
// two interchangeable backends, and the background save worker that keeps
// disk writes off the UI thread.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};

use crate::mixer::SoundSettings;
use crate::shared::DEFAULT_GLOBAL_VOLUME;

pub(crate) const STATE_DIR: &str = ".lull";
const STATE_FILE: &str = "state.json";

// Produced on every mutating action; consumed once at startup.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub active_sounds: Vec<String>,
    pub settings: BTreeMap<String, SoundSettings>,
    pub global_volume: f32,
    pub backdrop: Option<String>,
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            active_sounds: Vec::new(),
            settings: BTreeMap::new(),
            global_volume: DEFAULT_GLOBAL_VOLUME,
            backdrop: None,
        }
    }
}

// One key-value slot holding an opaque JSON blob. A remote endpoint would
// implement this the same way; nothing outside main knows which is in use.
pub trait SnapshotStore: Send {
    /// Absent or malformed data is None, never an error.
    fn load(&self) -> Option<Snapshot>;
    fn save(&self, snapshot: &Snapshot) -> anyhow::Result<()>;
    fn clear(&self) -> anyhow::Result<()>;
}

// <root>/.lull/state.json
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(root: &Path) -> Self {
        Self {
            path: root.join(STATE_DIR).join(STATE_FILE),
        }
    }
}

impl SnapshotStore for FileStore {
    fn load(&self) -> Option<Snapshot> {
        let data = std::fs::read_to_string(&self.path).ok()?;
        serde_json::from_str(&data).ok()
    }

    fn save(&self, snapshot: &Snapshot) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?; // create .lull/ if needed
        }
        let json = serde_json::to_string_pretty(snapshot)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// Ephemeral backend; also what the tests run against.
#[derive(Default)]
pub struct MemoryStore {
    slot: Mutex<Option<String>>,
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Option<Snapshot> {
        let slot = self.slot.lock().ok()?;
        serde_json::from_str(slot.as_deref()?).ok()
    }

    fn save(&self, snapshot: &Snapshot) -> anyhow::Result<()> {
        let json = serde_json::to_string(snapshot)?;
        if let Ok(mut slot) = self.slot.lock() {
            *slot = Some(json);
        }
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = None;
        }
        Ok(())
    }
}

#[derive(Debug)]
pub enum SaveRequest {
    Save(Snapshot),
    Clear,
}

// Fire-and-forget persistence. The UI loop try_sends the latest snapshot;
// the worker drains its queue to the newest request before touching the
// store, and failures are logged rather than surfaced.
pub struct SaveWorker {
    tx: Option<Sender<SaveRequest>>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl SaveWorker {
    pub fn spawn(store: Box<dyn SnapshotStore>) -> Self {
        let (tx, rx) = crossbeam_channel::bounded::<SaveRequest>(32);
        let handle = std::thread::spawn(move || {
            while let Ok(first) = rx.recv() {
                // only the newest request matters; skip superseded ones
                let mut request = first;
                while let Ok(newer) = rx.try_recv() {
                    request = newer;
                }
                let result = match &request {
                    SaveRequest::Save(snapshot) => store.save(snapshot),
                    SaveRequest::Clear => store.clear(),
                };
                if let Err(e) = result {
                    tracing::warn!("could not persist session state: {e:#}");
                }
            }
        });
        Self {
            tx: Some(tx),
            handle: Some(handle),
        }
    }

    pub fn submit(&self, request: SaveRequest) {
        if let Some(tx) = &self.tx
            && tx.try_send(request).is_err()
        {
            // queue full or worker gone; the next mutation will try again
            tracing::debug!("dropped a save request");
        }
    }

    // Drains outstanding requests before returning; used on quit so the
    // final snapshot actually reaches the store.
    pub fn shutdown(mut self) {
        self.tx.take(); // closes the channel, ending the worker loop
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            tracing::warn!("save worker panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_snapshot() -> Snapshot {
        let mut settings = BTreeMap::new();
        settings.insert(
            "rain".to_string(),
            SoundSettings { volume: 0.8, speed: 1.5, loop_gap_ms: 250 },
        );
        Snapshot {
            active_sounds: vec!["rain".to_string()],
            settings,
            global_volume: 0.7,
            backdrop: Some("misty_forest.jpg".to_string()),
        }
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryStore::default();
        assert!(store.load().is_none());
        let snapshot = sample_snapshot();
        store.save(&snapshot).unwrap();
        assert_eq!(store.load(), Some(snapshot));
        store.clear().unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn file_store_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        assert!(store.load().is_none());
        let snapshot = sample_snapshot();
        store.save(&snapshot).unwrap();
        assert_eq!(store.load(), Some(snapshot));
    }

    #[test]
    fn file_store_clear_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.clear().unwrap(); // nothing persisted yet
        store.save(&sample_snapshot()).unwrap();
        store.clear().unwrap();
        store.clear().unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn malformed_data_loads_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let path = dir.path().join(STATE_DIR).join(STATE_FILE);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json").unwrap();
        assert!(store.load().is_none());
    }

    #[test]
    fn default_snapshot_has_empty_state_and_default_volume() {
        let snapshot = Snapshot::default();
        assert!(snapshot.active_sounds.is_empty());
        assert!(snapshot.backdrop.is_none());
        assert_eq!(snapshot.global_volume, DEFAULT_GLOBAL_VOLUME);
    }

    #[test]
    fn save_worker_flushes_on_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        let reader = FileStore::new(dir.path());

        let worker = SaveWorker::spawn(Box::new(store));
        let snapshot = sample_snapshot();
        worker.submit(SaveRequest::Save(snapshot.clone()));
        worker.shutdown();
        assert_eq!(reader.load(), Some(snapshot));
    }

    #[test]
    fn save_worker_clear_removes_persisted_state() {
        let dir = tempfile::tempdir().unwrap();
        let reader = FileStore::new(dir.path());

        let worker = SaveWorker::spawn(Box::new(FileStore::new(dir.path())));
        worker.submit(SaveRequest::Save(sample_snapshot()));
        worker.submit(SaveRequest::Clear);
        worker.shutdown();
        assert!(reader.load().is_none());
    }
}
