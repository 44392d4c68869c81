//! Error types for the mixer
//!
//! Startup errors (missing stems, decode failures, format mismatches) abort
//! before any channel exists. Device errors are fatal mid-session. An invalid
//! stem hotkey is the only error the session absorbs.

use std::path::PathBuf;
use thiserror::Error;

use crate::shared::StemLabel;

#[derive(Debug, Error)]
pub enum MixerError {
    #[error("Missing {label} stem: '{}' does not exist", path.display())]
    MissingStem { label: StemLabel, path: PathBuf },

    #[error("Failed to load '{}': {reason}", path.display())]
    Load { path: PathBuf, reason: String },

    #[error("Stems are not aligned: {0}")]
    FormatMismatch(String),

    #[error("Audio device error: {0}")]
    Device(String),

    #[error("No stem on key {index} (this song has {count})")]
    InvalidStem { index: usize, count: usize },

    #[error("Invalid stem set: {0}")]
    InvalidStemSet(String),

    #[error("Invalid configuration in '{}': {reason}", path.display())]
    Config { path: PathBuf, reason: String },
}

pub type Result<T> = std::result::Result<T, MixerError>;

impl MixerError {
    /// Everything except a bad hotkey ends the session.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, MixerError::InvalidStem { .. })
    }

    pub fn load(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        MixerError::Load {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn device(err: impl ToString) -> Self {
        MixerError::Device(err.to_string())
    }
}
