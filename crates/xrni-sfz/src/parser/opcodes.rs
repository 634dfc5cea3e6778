//! Typed access to SFZ opcodes
//!
//! Opcodes are stored as raw strings; [`SfzOpcodes::get_opcode`] converts them
//! on demand through [`OpcodeValue`].
//!
//! ```text
//! <region>
//! sample=C4.wav
//! lokey=c4 hikey=e4
//! loop_mode=loop_continuous
//! ```

use std::path::PathBuf;
use std::str::FromStr;

use crate::parser::error::Error;
use crate::parser::path_utils::normalize_path;
use crate::parser::types::SfzSection;

type Result<T> = std::result::Result<T, Error>;

/// Parse a raw opcode value into a Rust type
pub trait OpcodeValue: Sized {
    fn parse_opcode(s: &str) -> Result<Self>;
}

impl OpcodeValue for String {
    fn parse_opcode(s: &str) -> Result<Self> {
        Ok(s.to_string())
    }
}

impl OpcodeValue for i32 {
    fn parse_opcode(s: &str) -> Result<Self> {
        s.trim()
            .parse::<i32>()
            .map_err(|_| Error::InvalidOpcodeValue(s.to_string(), "integer".to_string()))
    }
}

impl OpcodeValue for u64 {
    fn parse_opcode(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u64>()
            .map_err(|_| Error::InvalidOpcodeValue(s.to_string(), "unsigned integer".to_string()))
    }
}

impl OpcodeValue for f64 {
    fn parse_opcode(s: &str) -> Result<Self> {
        s.trim()
            .parse::<f64>()
            .map_err(|_| Error::InvalidOpcodeValue(s.to_string(), "float".to_string()))
    }
}

impl OpcodeValue for PathBuf {
    fn parse_opcode(s: &str) -> Result<Self> {
        Ok(PathBuf::from(normalize_path(s)))
    }
}

/// A MIDI note, written either as a number (`60`) or a name (`c4`, `f#3`, `db5`)
///
/// Note names use `c4 = 60`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Note(pub i32);

impl FromStr for Note {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Ok(number) = s.parse::<i32>() {
            return Ok(Note(number));
        }

        let invalid = || Error::InvalidOpcodeValue(s.to_string(), "note".to_string());
        let lower = s.to_ascii_lowercase();
        let mut chars = lower.chars();
        let pitch_class = match chars.next() {
            Some('c') => 0,
            Some('d') => 2,
            Some('e') => 4,
            Some('f') => 5,
            Some('g') => 7,
            Some('a') => 9,
            Some('b') => 11,
            _ => return Err(invalid()),
        };

        let rest = chars.as_str();
        let flat = rest
            .strip_prefix('b')
            .filter(|octave| octave.parse::<i32>().is_ok());
        let (accidental, octave) = match (rest.strip_prefix('#'), flat) {
            (Some(octave), _) => (1, octave),
            (None, Some(octave)) => (-1, octave),
            (None, None) => (0, rest),
        };
        let octave: i32 = octave.parse().map_err(|_| invalid())?;
        Ok(Note((octave + 1) * 12 + pitch_class + accidental))
    }
}

impl OpcodeValue for Note {
    fn parse_opcode(s: &str) -> Result<Self> {
        s.parse()
    }
}

/// `loop_mode` values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopMode {
    /// Play once, stopping on note-off
    NoLoop,
    /// Play once, ignoring note-off
    OneShot,
    /// Loop until the voice ends
    LoopContinuous,
    /// Loop while the key is held, then play to the end
    LoopSustain,
}

impl FromStr for LoopMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "no_loop" | "noloop" => Ok(LoopMode::NoLoop),
            "one_shot" | "oneshot" => Ok(LoopMode::OneShot),
            "loop" | "loop_continuous" => Ok(LoopMode::LoopContinuous),
            "loop_sustain" => Ok(LoopMode::LoopSustain),
            _ => Err(Error::InvalidOpcodeValue(s.to_string(), "LoopMode".to_string())),
        }
    }
}

impl OpcodeValue for LoopMode {
    fn parse_opcode(s: &str) -> Result<Self> {
        s.parse()
    }
}

/// Broad family of a `fil_type` value (`lpf_2p`, `hpf_1p`, `bpf_2p`, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    LowPass,
    HighPass,
    /// Band-pass, notch and the rest
    Other,
}

impl FromStr for FilterKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_lowercase();
        if s.starts_with("lpf") {
            Ok(FilterKind::LowPass)
        } else if s.starts_with("hpf") {
            Ok(FilterKind::HighPass)
        } else if s.is_empty() {
            Err(Error::InvalidOpcodeValue(s, "fil_type".to_string()))
        } else {
            Ok(FilterKind::Other)
        }
    }
}

impl OpcodeValue for FilterKind {
    fn parse_opcode(s: &str) -> Result<Self> {
        s.parse()
    }
}

/// Type-safe access to the opcodes of a section
pub trait SfzOpcodes {
    fn get_opcode_str(&self, name: &str) -> Option<&str>;

    /// Get a typed opcode value
    ///
    /// ```
    /// use xrni_sfz::{SfzOpcodes, SfzSection, SfzSectionType};
    /// use xrni_sfz::parser::opcodes::Note;
    ///
    /// let mut section = SfzSection::new(SfzSectionType::Region);
    /// section.add_opcode("lokey".to_string(), "c4".to_string());
    ///
    /// let key: Note = section.get_opcode("lokey").unwrap();
    /// assert_eq!(key, Note(60));
    /// ```
    fn get_opcode<T: OpcodeValue>(&self, name: &str) -> Result<T> {
        match self.get_opcode_str(name) {
            Some(value) => T::parse_opcode(value),
            None => Err(Error::MissingOpcode(name.to_string())),
        }
    }

    /// The first of `names` that is present and valid
    ///
    /// Malformed values are logged and treated as absent.
    fn opcode<T: OpcodeValue>(&self, names: &[&str]) -> Option<T> {
        names.iter().find_map(|name| match self.get_opcode::<T>(name) {
            Ok(value) => Some(value),
            Err(Error::MissingOpcode(_)) => None,
            Err(err) => {
                log::warn!("Ignoring opcode {}: {}", name, err);
                None
            }
        })
    }
}

impl SfzOpcodes for SfzSection {
    fn get_opcode_str(&self, name: &str) -> Option<&str> {
        self.opcodes.get(name).map(|s| s.as_str())
    }
}

const SOUND_SOURCE: &[&str] = &[
    "sample", "default_path", "count", "delay", "delay_random", "direction", "end",
    "offset", "offset_random", "oscillator", "oscillator_phase", "oscillator_multi",
    "sample_quality", "seq_length", "seq_position",
];

const REGION_LOGIC: &[&str] = &[
    "lokey", "hikey", "key", "lovel", "hivel", "lochan", "hichan", "lorand", "hirand",
    "trigger", "sw_lokey", "sw_hikey", "sw_last", "sw_down", "sw_up", "sw_previous",
    "sw_vel", "sw_label", "sw_default", "locc", "hicc", "loprog", "hiprog", "lobend",
    "hibend", "lobpm", "hibpm", "lochanaft", "hichanaft", "lopolyaft", "hipolyaft",
    "xfin_lokey", "xfin_hikey", "xfout_lokey", "xfout_hikey", "xfin_lovel", "xfin_hivel",
    "xfout_lovel", "xfout_hivel", "xf_keycurve", "xf_velcurve", "xf_cccurve",
];

const PERFORMANCE: &[&str] = &[
    "volume", "pan", "width", "position", "amp_veltrack", "amp_random", "amp_keytrack",
    "amp_keycenter", "amplitude", "output", "group", "off_by", "off_mode", "off_time",
    "polyphony", "note_polyphony", "note_selfmask", "rt_decay", "transpose", "tune",
    "pitch_keycenter", "pitch_keytrack", "pitch_veltrack", "pitch_random", "bend_up",
    "bend_down", "bend_step", "volume_oncc", "pan_oncc", "pitch_oncc", "amplitude_oncc",
];

const AMPLITUDE_ENVELOPE: &[&str] = &[
    "ampeg_attack", "ampeg_decay", "ampeg_delay", "ampeg_hold", "ampeg_release",
    "ampeg_start", "ampeg_sustain", "ampeg_vel2attack", "ampeg_vel2decay",
    "ampeg_vel2delay", "ampeg_vel2hold", "ampeg_vel2release", "ampeg_vel2sustain",
    "ampeg_attackcc", "ampeg_decaycc", "ampeg_holdcc", "ampeg_releasecc",
    "ampeg_sustaincc", "ampeg_attack_oncc", "ampeg_decay_oncc", "ampeg_release_oncc",
];

const PITCH_ENVELOPE: &[&str] = &[
    "pitcheg_attack", "pitcheg_decay", "pitcheg_delay", "pitcheg_hold", "pitcheg_release",
    "pitcheg_start", "pitcheg_sustain", "pitcheg_depth", "pitchlfo_delay", "pitchlfo_fade",
    "pitchlfo_freq", "pitchlfo_depth",
];

const FILTER: &[&str] = &[
    "cutoff", "cutoff2", "resonance", "resonance2", "fil_type", "fil2_type",
    "fil_keytrack", "fil_keycenter", "fil_veltrack", "fil_random", "cutoff_oncc",
    "resonance_oncc", "fileg_attack", "fileg_decay", "fileg_delay", "fileg_hold",
    "fileg_release", "fileg_start", "fileg_sustain", "fileg_depth", "fillfo_delay",
    "fillfo_fade", "fillfo_freq", "fillfo_depth",
];

const SAMPLE_PLAYBACK: &[&str] = &[
    "loop_mode", "loopmode", "loop_start", "loopstart", "loop_end", "loopend",
    "loop_count", "loop_crossfade", "sync_beats", "sync_offset",
];

const EFFECTS: &[&str] = &["effect1", "effect2", "effect3", "effect4"];

/// Whether `name` is an opcode this crate knows about
///
/// Trailing controller numbers are ignored, so `cutoff_oncc74` is recognised
/// as `cutoff_oncc`.
pub fn is_recognized(name: &str) -> bool {
    let base = name.trim_end_matches(|c: char| c.is_ascii_digit());
    [
        SOUND_SOURCE,
        REGION_LOGIC,
        PERFORMANCE,
        AMPLITUDE_ENVELOPE,
        PITCH_ENVELOPE,
        FILTER,
        SAMPLE_PLAYBACK,
        EFFECTS,
    ]
    .iter()
    .any(|category| category.contains(&name) || category.contains(&base))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::types::SfzSectionType;

    #[test]
    fn test_note_names() {
        assert_eq!("60".parse::<Note>().unwrap(), Note(60));
        assert_eq!("c4".parse::<Note>().unwrap(), Note(60));
        assert_eq!("C#4".parse::<Note>().unwrap(), Note(61));
        assert_eq!("db5".parse::<Note>().unwrap(), Note(73));
        assert_eq!("b3".parse::<Note>().unwrap(), Note(59));
        assert_eq!("c-1".parse::<Note>().unwrap(), Note(0));
        assert!("h2".parse::<Note>().is_err());
    }

    #[test]
    fn test_loop_mode_and_filter() {
        assert_eq!(
            LoopMode::parse_opcode("loop_sustain").unwrap(),
            LoopMode::LoopSustain
        );
        assert!(LoopMode::parse_opcode("sometimes").is_err());
        assert_eq!(FilterKind::parse_opcode("lpf_2p").unwrap(), FilterKind::LowPass);
        assert_eq!(FilterKind::parse_opcode("hpf_1p").unwrap(), FilterKind::HighPass);
        assert_eq!(FilterKind::parse_opcode("bpf_2p").unwrap(), FilterKind::Other);
    }

    #[test]
    fn test_typed_access() {
        let mut section = SfzSection::new(SfzSectionType::Region);
        section.add_opcode("loopstart".to_string(), "100".to_string());
        section.add_opcode("volume".to_string(), "loud".to_string());

        assert_eq!(
            section.opcode::<u64>(&["loop_start", "loopstart"]),
            Some(100)
        );
        assert_eq!(section.opcode::<f64>(&["volume"]), None);
        assert!(matches!(
            section.get_opcode::<i32>("key"),
            Err(Error::MissingOpcode(_))
        ));
    }

    #[test]
    fn test_recognized_opcodes() {
        assert!(is_recognized("ampeg_attack"));
        assert!(is_recognized("cutoff_oncc74"));
        assert!(!is_recognized("my_custom_label"));
    }
}
