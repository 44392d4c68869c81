// A song on disk, as the separation step leaves it:
//
//   songs/<song>/bass.wav
//   songs/<song>/drums.wav
//   songs/<song>/vocals.wav
//   songs/<song>/other.wav
//   songs/<song>/guitar.wav     (six-stem models only)
//   songs/<song>/piano.wav      (six-stem models only)
//   songs/<song>/original.wav   (the un-separated mix, optional)
//
// Nothing here decodes audio; that happens once the pool loads the set.

use std::path::{Path, PathBuf};

use crate::error::{MixerError, Result};
use crate::shared::{StemLabel, MAX_STEMS};

const FULL_MIX_NAME: &str = "original";
const STEM_EXT: &str = "wav";

#[derive(Clone, Debug, PartialEq)]
pub struct Stem {
    pub label: StemLabel,
    pub path: PathBuf,
}

// Fixed for the whole session once built
#[derive(Clone, Debug)]
pub struct StemSet {
    song_name: String,
    stems: Vec<Stem>,
    full_mix: Option<PathBuf>,
}

impl StemSet {
    pub fn new(song_name: impl Into<String>, stems: Vec<Stem>, full_mix: Option<PathBuf>) -> Result<Self> {
        if stems.is_empty() || stems.len() > MAX_STEMS {
            return Err(MixerError::InvalidStemSet(format!(
                "expected 1 to {MAX_STEMS} stems, got {}",
                stems.len()
            )));
        }
        for (i, stem) in stems.iter().enumerate() {
            if stems[..i].iter().any(|s| s.label == stem.label) {
                return Err(MixerError::InvalidStemSet(format!("{} appears twice", stem.label)));
            }
        }
        Ok(Self {
            song_name: song_name.into(),
            stems,
            full_mix,
        })
    }

    // every required stem must be there; optional ones and the full mix are
    // picked up when present
    pub fn from_dir(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(MixerError::load(dir, "not a song directory"));
        }
        let song_name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| dir.display().to_string());

        let mut stems = Vec::new();
        for label in StemLabel::ALL {
            let path = stem_path(dir, label.name());
            if path.is_file() {
                stems.push(Stem { label, path });
            } else if label.is_required() {
                return Err(MixerError::MissingStem { label, path });
            }
        }

        let full_mix = Some(stem_path(dir, FULL_MIX_NAME)).filter(|p| p.is_file());
        let set = Self::new(song_name, stems, full_mix)?;
        log::info!(
            "song '{}': {} stems{}",
            set.song_name,
            set.len(),
            if set.full_mix.is_some() { " + full mix" } else { "" }
        );
        Ok(set)
    }

    pub fn song_name(&self) -> &str {
        &self.song_name
    }

    pub fn stems(&self) -> &[Stem] {
        &self.stems
    }

    pub fn len(&self) -> usize {
        self.stems.len()
    }

    pub fn labels(&self) -> Vec<StemLabel> {
        self.stems.iter().map(|s| s.label).collect()
    }

    pub fn full_mix(&self) -> Option<&Path> {
        self.full_mix.as_deref()
    }
}

fn stem_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(name).with_extension(STEM_EXT)
}

// song directories under the songs root, sorted by name
pub fn list_songs(root: &Path) -> Result<Vec<String>> {
    let entries = std::fs::read_dir(root).map_err(|e| MixerError::load(root, e))?;
    let mut songs: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect();
    songs.sort();
    Ok(songs)
}
