use std::time::Duration;

use crate::audio::{frames_to_duration, SampleBuffer};
use crate::error::{MixerError, Result};

use super::stem_set::StemSet;

// Every file of a set, decoded and checked against each other.
// Stems come first in hotkey order, the full mix (if any) last.
pub struct DecodedStems {
    pub buffers: Vec<SampleBuffer>,
    pub sample_rate: u32,
    pub has_full_mix: bool,
}

impl DecodedStems {
    pub fn length(&self) -> usize {
        self.buffers.iter().map(SampleBuffer::len).max().unwrap_or(0)
    }

    pub fn duration(&self) -> Duration {
        frames_to_duration(self.length(), self.sample_rate)
    }

    // bring everything to the device rate and one common length
    pub fn prepare_for(self, device_rate: u32) -> Vec<SampleBuffer> {
        if self.sample_rate != device_rate {
            log::info!("resampling stems {} Hz -> {} Hz", self.sample_rate, device_rate);
        }
        let mut buffers: Vec<SampleBuffer> =
            self.buffers.into_iter().map(|b| b.resampled(device_rate)).collect();
        let length = buffers.iter().map(SampleBuffer::len).max().unwrap_or(0);
        for buf in &mut buffers {
            buf.pad_to(length);
        }
        buffers
    }
}

// Load every file of the set; fail on the first unreadable one, then make
// sure they can actually play in lockstep.
pub fn decode_stem_set(set: &StemSet, tolerance: Duration) -> Result<DecodedStems> {
    let mut paths: Vec<&std::path::Path> = set.stems().iter().map(|s| s.path.as_path()).collect();
    if let Some(full_mix) = set.full_mix() {
        paths.push(full_mix);
    }

    let mut buffers = Vec::with_capacity(paths.len());
    for path in &paths {
        let buf = SampleBuffer::load_wav(path)?;
        if buf.is_empty() {
            return Err(MixerError::load(*path, "file contains no audio"));
        }
        buffers.push(buf);
    }

    check_alignment(&buffers, &paths, tolerance)?;
    Ok(DecodedStems {
        sample_rate: buffers[0].sample_rate,
        buffers,
        has_full_mix: set.full_mix().is_some(),
    })
}

fn check_alignment(
    buffers: &[SampleBuffer],
    paths: &[&std::path::Path],
    tolerance: Duration,
) -> Result<()> {
    let Some(first) = buffers.first() else {
        return Ok(());
    };
    for (buf, path) in buffers.iter().zip(paths).skip(1) {
        if buf.sample_rate != first.sample_rate {
            return Err(MixerError::FormatMismatch(format!(
                "'{}' is {} Hz, '{}' is {} Hz",
                path.display(),
                buf.sample_rate,
                paths[0].display(),
                first.sample_rate
            )));
        }
        if buf.source_channels != first.source_channels {
            return Err(MixerError::FormatMismatch(format!(
                "'{}' has {} channels, '{}' has {}",
                path.display(),
                buf.source_channels,
                paths[0].display(),
                first.source_channels
            )));
        }
        let (a, b) = (buf.duration(), first.duration());
        let drift = if a > b { a - b } else { b - a };
        if drift > tolerance {
            return Err(MixerError::FormatMismatch(format!(
                "'{}' runs {:.3}s, '{}' runs {:.3}s",
                path.display(),
                a.as_secs_f64(),
                paths[0].display(),
                b.as_secs_f64()
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::stem_set::Stem;
    use crate::shared::StemLabel;
    use std::path::{Path, PathBuf};

    const TOLERANCE: Duration = Duration::from_millis(50);

    fn write_wav(path: &Path, channels: u16, rate: u32, frames: usize) {
        let spec = hound::WavSpec {
            channels,
            sample_rate: rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut w = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..frames * channels as usize {
            w.write_sample((i % 100) as i16 * 100).unwrap();
        }
        w.finalize().unwrap();
    }

    fn set_of(dir: &Path, specs: &[(StemLabel, u16, u32, usize)]) -> StemSet {
        let stems = specs
            .iter()
            .map(|&(label, ch, rate, frames)| {
                let path = dir.join(format!("{label}.wav"));
                write_wav(&path, ch, rate, frames);
                Stem { label, path }
            })
            .collect();
        StemSet::new("test", stems, None).unwrap()
    }

    #[test]
    fn aligned_stems_decode() {
        let tmp = tempfile::tempdir().unwrap();
        let set = set_of(
            tmp.path(),
            &[(StemLabel::Bass, 2, 8000, 8000), (StemLabel::Drums, 2, 8000, 8100)],
        );
        let decoded = decode_stem_set(&set, TOLERANCE).unwrap();
        assert_eq!(decoded.buffers.len(), 2);
        assert_eq!(decoded.sample_rate, 8000);
        assert_eq!(decoded.length(), 8100);
        assert!(!decoded.has_full_mix);

        let prepared = decoded.prepare_for(16000);
        assert!(prepared.iter().all(|b| b.len() == 16200 && b.sample_rate == 16000));
    }

    #[test]
    fn duration_drift_beyond_tolerance_is_a_mismatch() {
        let tmp = tempfile::tempdir().unwrap();
        let set = set_of(
            tmp.path(),
            &[(StemLabel::Bass, 2, 8000, 8000), (StemLabel::Vocals, 2, 8000, 9000)],
        );
        assert!(matches!(
            decode_stem_set(&set, TOLERANCE),
            Err(MixerError::FormatMismatch(_))
        ));
    }

    #[test]
    fn rate_and_layout_mismatches_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let rates = set_of(
            tmp.path(),
            &[(StemLabel::Bass, 2, 8000, 8000), (StemLabel::Drums, 2, 16000, 16000)],
        );
        assert!(matches!(decode_stem_set(&rates, TOLERANCE), Err(MixerError::FormatMismatch(_))));

        let tmp = tempfile::tempdir().unwrap();
        let layout = set_of(
            tmp.path(),
            &[(StemLabel::Bass, 2, 8000, 8000), (StemLabel::Drums, 1, 8000, 8000)],
        );
        assert!(matches!(decode_stem_set(&layout, TOLERANCE), Err(MixerError::FormatMismatch(_))));
    }

    #[test]
    fn unreadable_stem_aborts_with_its_path() {
        let tmp = tempfile::tempdir().unwrap();
        let good = tmp.path().join("bass.wav");
        write_wav(&good, 2, 8000, 100);
        let bad = tmp.path().join("drums.wav");
        std::fs::write(&bad, b"RIFF but not really").unwrap();

        let set = StemSet::new(
            "broken",
            vec![
                Stem { label: StemLabel::Bass, path: good },
                Stem { label: StemLabel::Drums, path: bad.clone() },
            ],
            None,
        )
        .unwrap();
        match decode_stem_set(&set, TOLERANCE) {
            Err(MixerError::Load { path, .. }) => assert_eq!(path, bad),
            Err(other) => panic!("expected load error, got {other}"),
            Ok(_) => panic!("expected load error"),
        }
    }

    #[test]
    fn full_mix_rides_along_last() {
        let tmp = tempfile::tempdir().unwrap();
        let bass = tmp.path().join("bass.wav");
        let original = tmp.path().join("original.wav");
        write_wav(&bass, 2, 8000, 400);
        write_wav(&original, 2, 8000, 400);

        let set = StemSet::new(
            "with-mix",
            vec![Stem { label: StemLabel::Bass, path: bass }],
            Some(PathBuf::from(&original)),
        )
        .unwrap();
        let decoded = decode_stem_set(&set, TOLERANCE).unwrap();
        assert!(decoded.has_full_mix);
        assert_eq!(decoded.buffers.len(), 2);
        assert_eq!(decoded.duration(), Duration::from_millis(50));
    }
}
