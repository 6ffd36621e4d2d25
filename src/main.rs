mod audio;
mod audio_api;
mod library;
mod mixer;
mod shared;
mod snapshot;
mod tui;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crossterm::terminal;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use audio::AudioHandle;
use audio_api::AudioEvent;
use library::{Library, Resolved};
use mixer::Mixer;
use shared::InputEvent;
use snapshot::{FileStore, MemoryStore, SaveRequest, SaveWorker, SnapshotStore};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let root: PathBuf = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());
    init_logging(&root)?;

    terminal::enable_raw_mode()?;
    let _guard = RawModeGuard; // auto drops when out of scope

    let audio = audio::start_audio()?;
    let sample_rate = audio.sample_rate();
    let mut library = Library::scan(&root);
    tracing::info!(
        "library: {} sounds, {} backdrops under {}",
        library.sounds.len(),
        library.backdrops.len(),
        root.display()
    );

    // both backends satisfy the same contract; nothing below cares which
    let store: Box<dyn SnapshotStore> = if std::env::var_os("LULL_NO_PERSIST").is_some() {
        Box::new(MemoryStore::default())
    } else {
        Box::new(FileStore::new(&root))
    };
    let persisted = store.load();
    let saver = SaveWorker::spawn(store);

    let mut mixer = Mixer::new();
    if let Some(snap) = persisted {
        // replay the previous session through the normal toggle path
        let cmds = mixer.restore(snap, |name| {
            library.resolve_by_name(name, sample_rate, &mut |cmd| audio.send(cmd))
        });
        for cmd in cmds {
            audio.send(cmd);
        }
    }

    let backend = CrosstermBackend::new(std::io::stdout());
    let mut term = Terminal::new(backend)?;
    term.clear()?;

    let tick_rate = Duration::from_millis(33); // ~30fps, plenty for gap timing
    let mut last_tick = Instant::now();
    let mut tui_state = tui::mode::TuiState::default();

    loop {
        let ds = mixer.display_state(&library);
        term.draw(|frame| {
            tui::view::render(frame, frame.area(), &ds, &tui_state);
        })?;

        let events = tui::input::poll_input(tick_rate, &mut tui_state, &ds)?;
        for event in events {
            if event == InputEvent::Quit {
                // save before quitting; shutdown drains the queue
                saver.submit(SaveRequest::Save(mixer.snapshot()));
                saver.shutdown();
                drop(term);
                return Ok(());
            }
            dispatch(event, &mut mixer, &mut library, &audio, &saver, sample_rate);
        }

        // finished voices arm their gap timers
        while let Some(AudioEvent::Finished { id }) = audio.poll_event() {
            mixer.on_finished(id);
        }

        let elapsed = last_tick.elapsed();
        last_tick = Instant::now();
        for cmd in mixer.tick(elapsed) {
            audio.send(cmd);
        }

        if mixer.take_dirty() {
            saver.submit(SaveRequest::Save(mixer.snapshot()));
        }
    }
}

fn dispatch(
    event: InputEvent,
    mixer: &mut Mixer,
    library: &mut Library,
    audio: &AudioHandle,
    saver: &SaveWorker,
    sample_rate: u32,
) {
    let cmds = match event {
        InputEvent::ToggleSound(index) => {
            let Some(name) = library.sound_name(index).map(str::to_string) else {
                return;
            };
            mixer.toggle_sound(&name, || {
                match library.resolve(index, sample_rate, &mut |cmd| audio.send(cmd)) {
                    Resolved::Loaded(id) => Some(id),
                    _ => None,
                }
            })
        }
        InputEvent::SetGlobalVolume(v) => mixer.set_global_volume(v),
        InputEvent::AdjustSoundVolume(name, v) => mixer.update_sound_volume(&name, v),
        InputEvent::AdjustSoundSpeed(name, s) => mixer.update_sound_speed(&name, s),
        InputEvent::AdjustSoundLoopGap(name, ms) => mixer.update_sound_loop_gap(&name, ms),
        InputEvent::ToggleExpanded(name) => {
            mixer.toggle_expanded(&name);
            Vec::new()
        }
        InputEvent::RemoveSound(name) => mixer.remove_sound(&name),
        InputEvent::SelectBackdrop(backdrop) => {
            mixer.select_backdrop(backdrop);
            Vec::new()
        }
        InputEvent::ClearAllConfirmed => {
            let cmds = mixer.clear_all();
            saver.submit(SaveRequest::Clear);
            cmds
        }
        InputEvent::Quit => Vec::new(), // handled by the caller
    };
    for cmd in cmds {
        audio.send(cmd);
    }
}

fn init_logging(root: &Path) -> anyhow::Result<()> {
    use tracing_subscriber::EnvFilter;

    let dir = root.join(snapshot::STATE_DIR);
    std::fs::create_dir_all(&dir)?;
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("lull.log"))?;

    // stderr would tear the raw-mode terminal, so logs go to a file
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

struct RawModeGuard;
impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}
