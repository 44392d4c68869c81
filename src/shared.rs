// Types shared between the layers:
//
//   tui (keys)  ->  mixer (MixerEngine)  ->  audio (cpal callback)
//        ^                  |
//        +--- StatusEvent --+
//
// The tui never touches playback state directly; it turns keys into
// KeyCommands and renders whatever StatusSnapshot the mixer hands back.
//
// Key map:
//   Space         //  PlayPause
//   s / S         //  Stop
//   r / R         //  Rewind
//   1 .. 9        //  ToggleStem(n), only n <= stem count does anything
//   Up / [        //  SelectPrev, the stem whose level - and + change
//   Down / ]      //  SelectNext
//   - / Left      //  VolumeDown on the selected stem
//   + = / Right   //  VolumeUp
//   q / Q / Esc   //  Quit (Ctrl-C too, raw mode swallows SIGINT)

use std::fmt;
use std::time::Duration;

use serde::Serialize;

pub const MAX_STEMS: usize = 9;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StemLabel {
    Bass,
    Drums,
    Vocals,
    Other,
    Guitar,
    Piano,
}

impl StemLabel {
    // hotkey order, the first four always come out of the separator
    pub const ALL: [StemLabel; 6] = [
        StemLabel::Bass,
        StemLabel::Drums,
        StemLabel::Vocals,
        StemLabel::Other,
        StemLabel::Guitar,
        StemLabel::Piano,
    ];

    pub const REQUIRED: [StemLabel; 4] = [
        StemLabel::Bass,
        StemLabel::Drums,
        StemLabel::Vocals,
        StemLabel::Other,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StemLabel::Bass => "bass",
            StemLabel::Drums => "drums",
            StemLabel::Vocals => "vocals",
            StemLabel::Other => "other",
            StemLabel::Guitar => "guitar",
            StemLabel::Piano => "piano",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            StemLabel::Bass => "Bass",
            StemLabel::Drums => "Drums",
            StemLabel::Vocals => "Vocals",
            StemLabel::Other => "Other",
            StemLabel::Guitar => "Guitar",
            StemLabel::Piano => "Piano",
        }
    }

    pub fn is_required(self) -> bool {
        Self::REQUIRED.contains(&self)
    }
}

impl fmt::Display for StemLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportState {
    Stopped,
    Playing,
    Paused,
}

impl TransportState {
    pub fn label(self) -> &'static str {
        match self {
            TransportState::Stopped => "STOPPED",
            TransportState::Playing => "PLAYING",
            TransportState::Paused => "PAUSED",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyCommand {
    PlayPause,
    Stop,
    Rewind,
    ToggleStem(usize), // hotkey number, 1-based
    SelectPrev,
    SelectNext,
    VolumeDown,
    VolumeUp,
    Quit,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StemStatus {
    pub key: usize,
    pub label: StemLabel,
    pub audible: bool,
    pub volume: f32, // kept while muted
    pub selected: bool,
}

// what the presentation layer gets on every change
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StatusSnapshot {
    pub song: String,
    pub state: TransportState,
    #[serde(serialize_with = "as_secs")]
    pub position: Duration,
    #[serde(serialize_with = "as_secs")]
    pub duration: Duration,
    pub stems: Vec<StemStatus>,
    pub full_mix_active: bool, // the un-separated original is what's audible
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", content = "message", rename_all = "snake_case")]
pub enum StatusKind {
    Loaded,
    Transport,
    StemToggled,
    VolumeChanged,
    Selected,
    Rewound,
    Tick,
    UserError(String),
    Ended,
    Quit,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StatusEvent {
    #[serde(flatten)]
    pub kind: StatusKind,
    pub status: StatusSnapshot,
}

fn as_secs<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

pub fn format_time(d: Duration) -> String {
    let secs = d.as_secs();
    format!("{}:{:02}.{}", secs / 60, secs % 60, d.subsec_millis() / 100)
}
