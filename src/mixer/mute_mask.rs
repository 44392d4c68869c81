use crate::shared::StemLabel;

// Which stems the listener wants to hear, in hotkey order. Everything
// starts audible.
#[derive(Clone, Debug, PartialEq)]
pub struct MuteMask {
    entries: Vec<(StemLabel, bool)>,
}

impl MuteMask {
    pub fn new(labels: &[StemLabel]) -> Self {
        Self {
            entries: labels.iter().map(|&l| (l, true)).collect(),
        }
    }

    pub fn is_audible(&self, label: StemLabel) -> bool {
        self.entries
            .iter()
            .find(|(l, _)| *l == label)
            .is_some_and(|(_, audible)| *audible)
    }

    // flips one stem, returns its new value
    pub fn toggle(&mut self, label: StemLabel) -> Option<bool> {
        let entry = self.entries.iter_mut().find(|(l, _)| *l == label)?;
        entry.1 = !entry.1;
        Some(entry.1)
    }

    pub fn all_audible(&self) -> bool {
        self.entries.iter().all(|(_, audible)| *audible)
    }

    pub fn iter(&self) -> impl Iterator<Item = (StemLabel, bool)> + '_ {
        self.entries.iter().copied()
    }
}
