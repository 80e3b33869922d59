use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::terminal;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use beatblend::audio;
use beatblend::loader::sample_loader;
use beatblend::middle::Middle;
use beatblend::model::{GridModel, ModelWorker};
use beatblend::pipeline::export;
use beatblend::pipeline::persistence::{self, JsonLibrary};
use beatblend::pipeline::project::ProjectState;
use beatblend::shared::InputEvent;
use beatblend::tui;

const KIT_DIR: &str = "kit";
const LOG_FILE: &str = "blendpad.log";

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

// the terminal is in raw mode, so logs go to a file next to the session
fn init_logging(project_dir: &Path) -> anyhow::Result<()> {
    let dir = persistence::data_dir(project_dir);
    std::fs::create_dir_all(&dir)?;
    let file = std::fs::File::create(dir.join(LOG_FILE)).context("creating log file")?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .try_init()?;
    Ok(())
}

fn run() -> anyhow::Result<()> {
    let project_dir: PathBuf = match std::env::args().nth(1) {
        Some(dir) => PathBuf::from(dir),
        None => std::env::current_dir()?,
    };
    init_logging(&project_dir)?;

    let config = persistence::load_config(&project_dir)?;
    let state = persistence::load_project(&project_dir).unwrap_or_else(|| ProjectState::new(&config));

    let (mut worker, model) =
        ModelWorker::spawn(Box::new(GridModel::new(config.steps))).context("starting model worker")?;
    let audio = audio::start_audio()?;
    let kit = sample_loader::load_kit(&project_dir.join(KIT_DIR), audio.sample_rate());
    for cmd in kit.register_commands() {
        audio.send(cmd);
    }

    let mut middle = Middle::new(config, state, model);
    middle.tick(audio.now());
    for cmd in middle.finish_editing() {
        audio.send(cmd); // decodes the pad heat map up front
    }

    terminal::enable_raw_mode()?;
    // Enable keyboard enhancement for real press/release detection.
    // Falls back gracefully if the terminal doesn't support it.
    let _ = crossterm::execute!(
        std::io::stdout(),
        crossterm::event::PushKeyboardEnhancementFlags(
            crossterm::event::KeyboardEnhancementFlags::REPORT_EVENT_TYPES
        ),
        EnableMouseCapture
    );
    let _guard = RawModeGuard; // auto drops when out of scope

    let backend = CrosstermBackend::new(std::io::stdout());
    let mut term = Terminal::new(backend)?;
    term.clear()?;

    let tick_rate = std::time::Duration::from_millis(16); // ~60fps
    let blink_start = Instant::now();
    let mut tui_state = tui::mode::TuiState::default();

    loop {
        let blink_on = (blink_start.elapsed().as_millis() / 250) % 2 == 0;
        let ds = middle.display_state();
        tui_state.steps = ds.steps;

        let mut areas = tui::view::Areas::default();
        term.draw(|frame| {
            let area = frame.area();
            areas = tui::view::render(frame, area, &ds, blink_on);
        })?;
        tui_state.pad_area = areas.pad;
        tui_state.grid_area = areas.grid;

        let events = tui::input::poll_input(tick_rate, &mut tui_state)?;
        for event in events {
            match event {
                InputEvent::Quit => {
                    // save before quitting
                    if let Err(e) = persistence::save_project(&project_dir, &middle.session()) {
                        log::error!("could not save session: {e:#}");
                    }
                    for cmd in middle.set_playing(false) {
                        audio.send(cmd);
                    }
                    drop(term);
                    drop(audio);
                    worker.join();
                    return Ok(());
                }
                InputEvent::ExportBeat => {
                    let beats = persistence::beats_dir(&project_dir);
                    let audio_path = beats.join(format!("{}.wav", persistence::next_beat_id()));
                    let mut library = JsonLibrary::new(beats);
                    match export::export_beat(&middle, "", &kit, audio.sample_rate(), &audio_path, &mut library) {
                        Ok(id) => middle.set_display_text(format!("exported {id}")),
                        Err(e) => {
                            log::error!("export failed: {e:#}");
                            middle.set_display_text("export failed");
                        }
                    }
                }
                event => {
                    for cmd in middle.handle_input(event) {
                        audio.send(cmd);
                    }
                }
            }
        }

        for cmd in middle.tick(audio.now()) {
            audio.send(cmd);
        }
    }
}

struct RawModeGuard;
impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = crossterm::execute!(
            std::io::stdout(),
            DisableMouseCapture,
            crossterm::event::PopKeyboardEnhancementFlags
        );
        let _ = terminal::disable_raw_mode();
    }
}
