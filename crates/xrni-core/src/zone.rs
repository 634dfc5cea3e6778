//! Format-neutral zone records produced by the source readers.
//!
//! Every field is optional. A value that is absent, or zero for the
//! continuous parameters, means "inherit the default".

use crate::sample::{FilterType, LoopMode};
use std::path::PathBuf;

/// Where a zone's audio comes from.
#[derive(Clone, Debug, PartialEq)]
pub enum AudioSource {
    /// External file, resolved relative to the source instrument.
    File(PathBuf),
    /// Audio already extracted from the source (e.g. a bank's sample chunk).
    Embedded(Vec<u8>),
}

/// One source zone. Records without audio describe the instrument's global
/// scope and provide defaults for the zones that follow.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ZoneRecord {
    pub name: Option<String>,
    pub audio: Option<AudioSource>,

    pub loop_mode: Option<LoopMode>,
    /// Keep looping after note-off (play the remainder on release).
    pub loop_on_release: Option<bool>,
    pub loop_start: Option<u64>,
    pub loop_end: Option<u64>,

    /// Bipolar pan, -1 (left) to 1 (right).
    pub pan: Option<f64>,
    pub transpose: Option<i32>,
    pub fine_tune_cents: Option<f64>,
    /// Pitch correction of the sample itself, used when no fine tune is set.
    pub pitch_correction_cents: Option<f64>,
    pub volume_db: Option<f64>,

    /// Amplitude envelope stages in seconds.
    pub attack: Option<f64>,
    pub hold: Option<f64>,
    pub decay: Option<f64>,
    pub release: Option<f64>,
    /// Sustain level, 0 (silent) to 1 (full).
    pub sustain_level: Option<f64>,

    pub cutoff_hz: Option<f64>,
    pub filter_type: Option<FilterType>,

    pub base_note: Option<i32>,
    pub key_range: Option<(i32, i32)>,
    pub velocity_range: Option<(i32, i32)>,

    /// Effect send levels in percent.
    pub chorus_send: Option<f64>,
    pub reverb_send: Option<f64>,

    /// Source parameters that were recognised but have no counterpart.
    pub unmapped: Vec<String>,
}

impl ZoneRecord {
    /// Whether this record describes the global scope rather than a zone.
    pub fn is_global(&self) -> bool {
        self.audio.is_none()
    }

    /// Display name for diagnostics.
    pub fn label(&self) -> String {
        match (&self.name, &self.audio) {
            (Some(name), _) => name.clone(),
            (None, Some(AudioSource::File(path))) => path.display().to_string(),
            (None, Some(AudioSource::Embedded(_))) => "<embedded>".to_string(),
            (None, None) => "<global>".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_records_have_no_audio() {
        let global = ZoneRecord::default();
        assert!(global.is_global());
        assert_eq!(global.label(), "<global>");

        let zone = ZoneRecord {
            audio: Some(AudioSource::File(PathBuf::from("samples/c4.wav"))),
            ..Default::default()
        };
        assert!(!zone.is_global());
        assert_eq!(zone.label(), "samples/c4.wav");
    }
}
