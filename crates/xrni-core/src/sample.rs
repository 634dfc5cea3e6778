//! Typed views over the `Sample` and `ModulationSet` elements.
//!
//! Getters return `None` (or a neutral default) when a field is absent;
//! setters create any missing intermediate elements.

use crate::tree::Element;
use std::fmt;
use std::str::FromStr;

const MAPPING: &str = "Mapping";
const AHDSR: &[&str] = &["Devices", "SampleAhdsrModulationDevice"];
const MIXER: &[&str] = &["Devices", "SampleMixerModulationDevice"];

/// Sample loop behaviour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LoopMode {
    #[default]
    Off,
    Forward,
}

impl fmt::Display for LoopMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoopMode::Off => write!(f, "Off"),
            LoopMode::Forward => write!(f, "Forward"),
        }
    }
}

impl FromStr for LoopMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Off" => Ok(LoopMode::Off),
            "Forward" => Ok(LoopMode::Forward),
            other => Err(format!("unknown loop mode '{}'", other)),
        }
    }
}

/// Filter applied by a modulation set's mixer device.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FilterType {
    #[default]
    None,
    CleanLp,
    CleanHp,
}

impl FilterType {
    /// Index the engine stores for this filter.
    pub fn code(self) -> i32 {
        match self {
            FilterType::None => 0,
            FilterType::CleanLp => 1,
            FilterType::CleanHp => 5,
        }
    }

    /// Filter for a stored index. Unknown indices are not modelled.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(FilterType::None),
            1 => Some(FilterType::CleanLp),
            5 => Some(FilterType::CleanHp),
            _ => None,
        }
    }
}

/// How overlapping keyzones are triggered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OverlapMode {
    Cycle,
    #[default]
    PlayAll,
    Random,
}

impl fmt::Display for OverlapMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverlapMode::Cycle => write!(f, "Cycle"),
            OverlapMode::PlayAll => write!(f, "Play All"),
            OverlapMode::Random => write!(f, "Random"),
        }
    }
}

impl FromStr for OverlapMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Cycle" => Ok(OverlapMode::Cycle),
            "Play All" => Ok(OverlapMode::PlayAll),
            "Random" => Ok(OverlapMode::Random),
            other => Err(format!("unknown overlap mode '{}'", other)),
        }
    }
}

/// One keyzone of the instrument.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample(pub Element);

impl Sample {
    pub fn element(&self) -> &Element {
        &self.0
    }

    pub fn into_element(self) -> Element {
        self.0
    }

    /// Display name of the keyzone.
    pub fn name(&self) -> Option<&str> {
        self.0.text_at(&["Name"])
    }

    pub fn set_name(&mut self, name: &str) {
        self.0.set_value_at(&["Name"], name);
    }

    /// File the audio was imported from.
    pub fn file_name(&self) -> Option<&str> {
        self.0.text_at(&["FileName"])
    }

    pub fn set_file_name(&mut self, file_name: &str) {
        self.0.set_value_at(&["FileName"], file_name);
    }

    /// Loop mode, `Off` when unset.
    pub fn loop_mode(&self) -> LoopMode {
        self.0.value_at(&["LoopMode"]).unwrap_or_default()
    }

    pub fn set_loop_mode(&mut self, mode: LoopMode) {
        self.0.set_value_at(&["LoopMode"], mode);
    }

    /// Whether the loop is left on note-off.
    pub fn loop_release(&self) -> bool {
        self.0.value_at(&["LoopRelease"]).unwrap_or(false)
    }

    pub fn set_loop_release(&mut self, release: bool) {
        self.0.set_value_at(&["LoopRelease"], release);
    }

    /// First frame of the loop.
    pub fn loop_start(&self) -> Option<u64> {
        self.0.value_at(&["LoopStart"])
    }

    pub fn set_loop_start(&mut self, frame: u64) {
        self.0.set_value_at(&["LoopStart"], frame);
    }

    /// Last frame of the loop.
    pub fn loop_end(&self) -> Option<u64> {
        self.0.value_at(&["LoopEnd"])
    }

    pub fn set_loop_end(&mut self, frame: u64) {
        self.0.set_value_at(&["LoopEnd"], frame);
    }

    /// Linear volume, 1 being unity gain.
    pub fn volume(&self) -> Option<f64> {
        self.0.value_at(&["Volume"])
    }

    pub fn set_volume(&mut self, volume: f64) {
        self.0.set_value_at(&["Volume"], volume);
    }

    /// Panning, 0.5 being center.
    pub fn panning(&self) -> Option<f64> {
        self.0.value_at(&["Panning"])
    }

    pub fn set_panning(&mut self, panning: f64) {
        self.0.set_value_at(&["Panning"], panning);
    }

    /// Transposition in semitones.
    pub fn transpose(&self) -> Option<i32> {
        self.0.value_at(&["Transpose"])
    }

    pub fn set_transpose(&mut self, semitones: i32) {
        self.0.set_value_at(&["Transpose"], semitones);
    }

    /// Fine tuning in 1/128 semitone steps.
    pub fn fine_tune(&self) -> Option<i32> {
        self.0.value_at(&["FineTune"])
    }

    pub fn set_fine_tune(&mut self, fine_tune: i32) {
        self.0.set_value_at(&["FineTune"], fine_tune);
    }

    /// Index of the modulation set this sample uses. Missing or malformed
    /// values read as 0.
    pub fn modulation_set_index(&self) -> usize {
        self.0.value_at(&["ModulationSetIndex"]).unwrap_or(0)
    }

    pub fn set_modulation_set_index(&mut self, index: usize) {
        self.0.set_value_at(&["ModulationSetIndex"], index);
    }

    /// Note at which the audio plays at its recorded pitch.
    pub fn base_note(&self) -> Option<i32> {
        self.0.value_at(&[MAPPING, "BaseNote"])
    }

    pub fn set_base_note(&mut self, note: i32) {
        self.0.set_value_at(&[MAPPING, "BaseNote"], note);
    }

    /// Whether the played key transposes the sample. Defaults to true.
    pub fn map_key_to_pitch(&self) -> bool {
        self.0.value_at(&[MAPPING, "MapKeyToPitch"]).unwrap_or(true)
    }

    pub fn set_map_key_to_pitch(&mut self, map: bool) {
        self.0.set_value_at(&[MAPPING, "MapKeyToPitch"], map);
    }

    /// Lowest note of the keyzone.
    pub fn note_start(&self) -> i32 {
        self.0.value_at(&[MAPPING, "NoteStart"]).unwrap_or(0)
    }

    pub fn set_note_start(&mut self, note: i32) {
        self.0.set_value_at(&[MAPPING, "NoteStart"], note);
    }

    /// Highest note of the keyzone.
    pub fn note_end(&self) -> i32 {
        self.0.value_at(&[MAPPING, "NoteEnd"]).unwrap_or(119)
    }

    pub fn set_note_end(&mut self, note: i32) {
        self.0.set_value_at(&[MAPPING, "NoteEnd"], note);
    }

    /// Set both ends of the note range.
    pub fn set_note_range(&mut self, start: i32, end: i32) {
        self.set_note_start(start);
        self.set_note_end(end);
    }

    /// Lowest velocity of the keyzone.
    pub fn velocity_start(&self) -> i32 {
        self.0.value_at(&[MAPPING, "VelocityStart"]).unwrap_or(0)
    }

    pub fn set_velocity_start(&mut self, velocity: i32) {
        self.0.set_value_at(&[MAPPING, "VelocityStart"], velocity);
    }

    /// Highest velocity of the keyzone.
    pub fn velocity_end(&self) -> i32 {
        self.0.value_at(&[MAPPING, "VelocityEnd"]).unwrap_or(127)
    }

    pub fn set_velocity_end(&mut self, velocity: i32) {
        self.0.set_value_at(&[MAPPING, "VelocityEnd"], velocity);
    }

    /// Set both ends of the velocity range.
    pub fn set_velocity_range(&mut self, start: i32, end: i32) {
        self.set_velocity_start(start);
        self.set_velocity_end(end);
    }

    /// Whether the velocity range contains `velocity`.
    pub fn responds_to_velocity(&self, velocity: i32) -> bool {
        (self.velocity_start()..=self.velocity_end()).contains(&velocity)
    }
}

/// Envelope and filter settings shared by one or more samples.
#[derive(Clone, Debug, PartialEq)]
pub struct ModulationSet(pub Element);

impl ModulationSet {
    pub fn element(&self) -> &Element {
        &self.0
    }

    pub fn into_element(self) -> Element {
        self.0
    }

    fn envelope_path(stage: &'static str) -> [&'static str; 4] {
        [AHDSR[0], AHDSR[1], stage, "Value"]
    }

    fn envelope(&self, stage: &'static str) -> Option<f64> {
        self.0.value_at(&Self::envelope_path(stage))
    }

    fn set_envelope(&mut self, stage: &'static str, value: f64) {
        self.0.set_value_at(&Self::envelope_path(stage), value);
    }

    /// Envelope attack, in envelope units.
    pub fn attack(&self) -> Option<f64> {
        self.envelope("Attack")
    }

    pub fn set_attack(&mut self, value: f64) {
        self.set_envelope("Attack", value);
    }

    pub fn hold(&self) -> Option<f64> {
        self.envelope("Hold")
    }

    pub fn set_hold(&mut self, value: f64) {
        self.set_envelope("Hold", value);
    }

    pub fn decay(&self) -> Option<f64> {
        self.envelope("Decay")
    }

    pub fn set_decay(&mut self, value: f64) {
        self.set_envelope("Decay", value);
    }

    /// Sustain level; 1 means no attenuation.
    pub fn sustain(&self) -> Option<f64> {
        self.envelope("Sustain")
    }

    pub fn set_sustain(&mut self, value: f64) {
        self.set_envelope("Sustain", value);
    }

    pub fn release(&self) -> Option<f64> {
        self.envelope("Release")
    }

    pub fn set_release(&mut self, value: f64) {
        self.set_envelope("Release", value);
    }

    /// Filter cutoff, 0 to 127.
    pub fn cutoff(&self) -> Option<f64> {
        self.0.value_at(&[MIXER[0], MIXER[1], "Cutoff", "Value"])
    }

    pub fn set_cutoff(&mut self, value: f64) {
        self.0
            .set_value_at(&[MIXER[0], MIXER[1], "Cutoff", "Value"], value);
    }

    /// Filter type, `None` when unset or unknown.
    pub fn filter_type(&self) -> FilterType {
        self.0
            .value_at(&[MIXER[0], MIXER[1], "FilterType"])
            .and_then(FilterType::from_code)
            .unwrap_or_default()
    }

    pub fn set_filter_type(&mut self, filter: FilterType) {
        self.0
            .set_value_at(&[MIXER[0], MIXER[1], "FilterType"], filter.code());
    }
}
