use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// Engine-side handle for one registered sound buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SoundId(pub u64);

// fancy atomic counter lets us generate unique ids while in threads
pub fn next_sound_id() -> SoundId {
    SoundId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
}
