mod shared;
mod tui;
mod audio_api;
mod audio;
mod config;
mod error;
mod loader;
mod mixer;

use std::io::Write;
use std::path::Path;

use anyhow::Context;
use clap::Parser;
use crossterm::terminal;
use crossterm::tty::IsTty;

use config::Cli;
use loader::StemSet;
use mixer::{CpalChannelPool, JsonLinesReporter, MixerEngine};
use tui::{InputDispatcher, TuiReporter};

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cwd = std::env::current_dir()?;
    let mut settings = config::load_settings(cli.config.as_deref(), &cwd)?;
    cli.apply_to(&mut settings);
    init_logging(cli.log_filter(), settings.log_file.as_deref())?;

    if cli.list_songs {
        let mut out = std::io::stdout().lock();
        for name in loader::list_songs(&settings.songs_dir)? {
            writeln!(out, "{name}")?;
        }
        return Ok(());
    }

    let song = cli
        .song
        .as_deref()
        .context("no song given (pass a song directory or name, or --list-songs)")?;
    let song_dir = settings.resolve_song(song);

    // everything is decoded and checked before the device opens
    let set = StemSet::from_dir(&song_dir)?;
    let pool = CpalChannelPool::load(&set, &settings)?;

    let (tx, rx) = crossbeam_channel::unbounded();
    let dispatcher = InputDispatcher::new(rx, settings.tick(), settings.volume_step);

    let interactive = !cli.plain && std::io::stdin().is_tty() && std::io::stdout().is_tty();
    if !interactive {
        tui::input::spawn_stdin_reader(std::io::stdin(), tx)?;
        let reporter = JsonLinesReporter::new(std::io::stdout());
        let engine = MixerEngine::new(&set, pool, Box::new(reporter))?;
        dispatcher.run(engine)?;
        return Ok(());
    }

    let _guard = RawModeGuard::enter()?; // auto drops when out of scope
    // log lines would land on top of the table
    let level = log::max_level();
    if settings.log_file.is_none() {
        log::set_max_level(log::LevelFilter::Off);
    }
    let result = (|| -> anyhow::Result<()> {
        let reporter = TuiReporter::new()?;
        tui::input::spawn_key_reader(tx)?;
        let engine = MixerEngine::new(&set, pool, Box::new(reporter))?;
        dispatcher.run(engine)?;
        Ok(())
    })();
    log::set_max_level(level);
    result
}

fn init_logging(filter: &str, log_file: Option<&Path>) -> anyhow::Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter));
    if let Some(path) = log_file {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("cannot open log file '{}'", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> anyhow::Result<Self> {
        terminal::enable_raw_mode()?;
        let guard = RawModeGuard;
        crossterm::execute!(
            std::io::stdout(),
            terminal::EnterAlternateScreen,
            crossterm::cursor::Hide
        )?;
        // real press/release reporting where the terminal supports it
        let _ = crossterm::execute!(
            std::io::stdout(),
            crossterm::event::PushKeyboardEnhancementFlags(
                crossterm::event::KeyboardEnhancementFlags::REPORT_EVENT_TYPES
            )
        );
        Ok(guard)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = crossterm::execute!(
            std::io::stdout(),
            crossterm::event::PopKeyboardEnhancementFlags,
            crossterm::cursor::Show,
            terminal::LeaveAlternateScreen
        );
        let _ = terminal::disable_raw_mode();
    }
}
