// Runtime settings. Read once at startup from <cwd>/.irmix/config.json (or
// --config), then overridden by whatever was passed on the command line.
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::error::{MixerError, Result};

const IRMIX_DIR: &str = ".irmix";
const CONFIG_FILE: &str = "config.json";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub songs_dir: PathBuf, // where bare song names are looked up
    pub buffer_frames: u32, // requested device buffer; 0 lets the device pick
    pub fade_ms: f32, // gain ramp on mute/unmute
    pub duration_tolerance_ms: u64, // how far stem lengths may disagree
    pub tick_ms: u64, // display refresh while no key is pressed
    pub volume_step: f32, // per keypress, levels run 0.0 to 1.0
    pub log_file: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            songs_dir: PathBuf::from("songs"),
            buffer_frames: 512,
            fade_ms: 8.0,
            duration_tolerance_ms: 50,
            tick_ms: 50,
            volume_step: 0.1,
            log_file: None,
        }
    }
}

impl Settings {
    pub fn duration_tolerance(&self) -> Duration {
        Duration::from_millis(self.duration_tolerance_ms)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }

    pub fn ramp_frames(&self, sample_rate: u32) -> u32 {
        (self.fade_ms.max(0.0) * sample_rate as f32 / 1000.0).round() as u32
    }

    // a song argument is either a path to a song directory or a bare name
    // under songs_dir
    pub fn resolve_song(&self, song: &Path) -> PathBuf {
        if song.is_dir() || song.components().count() > 1 {
            song.to_path_buf()
        } else {
            self.songs_dir.join(song)
        }
    }
}

/// irmix - play separated stems in sync and mute them live
#[derive(Parser, Debug)]
#[command(name = "irmix")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Song directory, or a song name under the configured songs directory
    #[arg(value_name = "SONG")]
    pub song: Option<PathBuf>,

    /// Print the songs available under the songs directory and exit
    #[arg(long)]
    pub list_songs: bool,

    /// Print status as JSON lines instead of drawing the terminal UI
    #[arg(long)]
    pub plain: bool,

    /// Settings file (defaults to .irmix/config.json if present)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write log records to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    // default env_logger filter, RUST_LOG still wins
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    pub fn apply_to(&self, settings: &mut Settings) {
        if let Some(path) = &self.log_file {
            settings.log_file = Some(path.clone());
        }
    }
}

// <base_dir>/.irmix/config.json
pub fn default_config_path(base_dir: &Path) -> PathBuf {
    base_dir.join(IRMIX_DIR).join(CONFIG_FILE)
}

// An explicitly named file must exist and parse. The implicit one is
// optional and falls back to defaults if it's broken.
pub fn load_settings(explicit: Option<&Path>, base_dir: &Path) -> Result<Settings> {
    match explicit {
        Some(path) => read_settings(path),
        None => {
            let path = default_config_path(base_dir);
            if !path.exists() {
                log::debug!("no config at {}, using defaults", path.display());
                return Ok(Settings::default());
            }
            read_settings(&path).or_else(|e| {
                log::warn!("{e}, using defaults");
                Ok(Settings::default())
            })
        }
    }
}

fn read_settings(path: &Path) -> Result<Settings> {
    let config_err = |reason: String| MixerError::Config { path: path.to_path_buf(), reason };
    let data = std::fs::read_to_string(path).map_err(|e| config_err(e.to_string()))?;
    let value: serde_json::Value =
        serde_json::from_str(&data).map_err(|e| config_err(e.to_string()))?;
    // serde(default) would happily turn `[]` into the defaults
    if !value.is_object() {
        return Err(config_err("expected a JSON object".into()));
    }
    let settings = serde_json::from_value(value).map_err(|e| config_err(e.to_string()))?;
    log::info!("loaded settings from {}", path.display());
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_implicit_config_is_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(load_settings(None, tmp.path()).unwrap(), Settings::default());
    }

    #[test]
    fn partial_config_fills_in_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = default_config_path(tmp.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{ "fade_ms": 20.0, "songs_dir": "/music/stems" }"#).unwrap();

        let settings = load_settings(None, tmp.path()).unwrap();
        assert_eq!(settings.fade_ms, 20.0);
        assert_eq!(settings.songs_dir, PathBuf::from("/music/stems"));
        assert_eq!(settings.tick_ms, 50);
    }

    #[test]
    fn broken_implicit_config_falls_back() {
        let tmp = tempfile::tempdir().unwrap();
        let path = default_config_path(tmp.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(load_settings(None, tmp.path()).unwrap(), Settings::default());
    }

    #[test]
    fn broken_explicit_config_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("mine.json");
        for body in ["[]", "42", "\"songs\"", "null", "{ \"tick_ms\": \"fast\" }"] {
            std::fs::write(&path, body).unwrap();
            assert!(
                matches!(load_settings(Some(&path), tmp.path()), Err(MixerError::Config { .. })),
                "accepted {body}"
            );
        }
        assert!(load_settings(Some(&tmp.path().join("absent.json")), tmp.path()).is_err());
    }

    #[test]
    fn non_object_implicit_config_falls_back() {
        let tmp = tempfile::tempdir().unwrap();
        let path = default_config_path(tmp.path());
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "[1, 2]").unwrap();
        assert_eq!(load_settings(None, tmp.path()).unwrap(), Settings::default());
    }

    #[test]
    fn ramp_frames_scale_with_rate() {
        let settings = Settings::default();
        assert_eq!(settings.ramp_frames(48000), 384);
        assert_eq!(Settings { fade_ms: 0.0, ..Settings::default() }.ramp_frames(48000), 0);
    }

    #[test]
    fn cli_flags_map_to_settings_and_filters() {
        let cli = Cli::parse_from(["irmix", "-vv", "--log-file", "mix.log", "my_song"]);
        assert_eq!(cli.song, Some(PathBuf::from("my_song")));
        assert_eq!(cli.log_filter(), "debug");
        assert!(!cli.plain);

        let mut settings = Settings::default();
        cli.apply_to(&mut settings);
        assert_eq!(settings.log_file, Some(PathBuf::from("mix.log")));

        let cli = Cli::parse_from(["irmix", "--list-songs"]);
        assert!(cli.list_songs && cli.song.is_none());
        assert_eq!(cli.log_filter(), "warn");
    }

    #[test]
    fn bare_names_resolve_under_songs_dir() {
        let settings = Settings { songs_dir: PathBuf::from("/srv/songs"), ..Settings::default() };
        assert_eq!(
            settings.resolve_song(Path::new("VULFPECK_1612")),
            PathBuf::from("/srv/songs/VULFPECK_1612")
        );
        assert_eq!(
            settings.resolve_song(Path::new("elsewhere/song")),
            PathBuf::from("elsewhere/song")
        );
    }
}
