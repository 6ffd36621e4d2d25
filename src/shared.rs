// Shared vocabulary between the input layer, the mixer core, and the renderer.
//
// The TUI resolves raw key presses into semantic InputEvents (it keeps the
// DisplayState from the current frame, so it can turn "volume knob down on
// the selected card" into an absolute value). The core never sees key codes,
// and the renderer never sees core internals; it just draws a DisplayState.

pub const DEFAULT_GLOBAL_VOLUME: f32 = 0.5;

pub const MIN_SPEED: f32 = 0.5;
pub const MAX_SPEED: f32 = 2.0;

#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
    // sound grid
    ToggleSound(usize), // index into the library grid

    // global volume, absolute value (TUI applies the knob step)
    SetGlobalVolume(f32),

    // settings panel for one active sound, absolute values
    AdjustSoundVolume(String, f32),
    AdjustSoundSpeed(String, f32),
    AdjustSoundLoopGap(String, u64),
    ToggleExpanded(String),
    RemoveSound(String),

    // backdrop picker; None clears the selection
    SelectBackdrop(Option<String>),

    // only emitted after the TUI-side confirmation step
    ClearAllConfirmed,

    Quit,
}

/// One button in the sound grid.
#[derive(Clone, Debug)]
pub struct SoundCell {
    pub name: String,
    pub active: bool,
    pub unavailable: bool, // decode failed; listed but silent
}

/// One card in the active-sounds panel, in insertion order.
#[derive(Clone, Debug)]
pub struct SoundCard {
    pub name: String,
    pub volume: f32,
    pub speed: f32,
    pub loop_gap_ms: u64,
    pub expanded: bool,
    pub waiting: bool, // in the gap between two plays
}

#[derive(Clone, Debug)]
pub struct BackdropRow {
    pub display_name: String,
    pub file: String,
    pub is_video: bool,
    pub selected: bool,
}

// Everything the renderer needs for one frame.
#[derive(Clone, Debug, Default)]
pub struct DisplayState {
    pub grid: Vec<SoundCell>,
    pub cards: Vec<SoundCard>,
    pub global_volume: f32,
    pub backdrop: Option<String>, // display name of the selected backdrop
    pub backdrops: Vec<BackdropRow>,
}
