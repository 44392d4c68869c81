use std::io::Write;

use crate::shared::{StatusEvent, StatusKind};

/// Receives every state change the mixer makes. Rendering is best-effort:
/// the mixer logs a failed report and keeps playing.
pub trait StatusReporter {
    fn report(&mut self, event: &StatusEvent) -> anyhow::Result<()>;
}

// One JSON object per line, for pipes and scripts. Ticks only matter to
// something redrawing a clock, so they're left out.
pub struct JsonLinesReporter<W: Write> {
    out: W,
}

impl<W: Write> JsonLinesReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> StatusReporter for JsonLinesReporter<W> {
    fn report(&mut self, event: &StatusEvent) -> anyhow::Result<()> {
        if event.kind == StatusKind::Tick {
            return Ok(());
        }
        serde_json::to_writer(&mut self.out, event)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }
}
