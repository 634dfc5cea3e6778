//! Mapping of SoundFont 2 instrument zones onto zone records.
//!
//! [`crate::soundfont`] supplies each zone's generator list and, for zones
//! bound to a sample, the sample header plus the audio exported as a WAV
//! file. A zone without a sample is the instrument's global zone.

use crate::sample::LoopMode;
use crate::zone::{AudioSource, ZoneRecord};

/// Raw generator as stored in the `igen` chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GeneratorData {
    pub oper: u16,
    pub amount: [u8; 2],
}

impl GeneratorData {
    pub fn new(oper: u16, amount: [u8; 2]) -> Self {
        Self { oper, amount }
    }

    /// Generator carrying a signed amount.
    pub fn signed(oper: u16, amount: i16) -> Self {
        Self::new(oper, amount.to_le_bytes())
    }

    /// Generator carrying a low/high byte range.
    pub fn range(oper: u16, low: u8, high: u8) -> Self {
        Self::new(oper, [low, high])
    }

    pub fn as_i16(&self) -> i16 {
        i16::from_le_bytes(self.amount)
    }

    pub fn as_range(&self) -> (u8, u8) {
        (self.amount[0], self.amount[1])
    }

    pub fn generator(&self) -> Generator {
        Generator::from(*self)
    }
}

/// How a sample loops, from the `sampleModes` generator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SampleMode {
    NoLoop,
    ContinuousLoop,
    /// Loop while the key is held, then play to the end.
    ReleaseLoop,
}

/// Decoded generator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Generator {
    StartAddrsOffset(i16),
    EndAddrsOffset(i16),
    StartloopAddrsOffset(i16),
    EndloopAddrsOffset(i16),
    StartAddrsCoarseOffset(i16),
    ModLfoToPitch(i16),
    VibLfoToPitch(i16),
    ModEnvToPitch(i16),
    InitialFilterFc(i16),
    InitialFilterQ(i16),
    ModLfoToFilterFc(i16),
    ModEnvToFilterFc(i16),
    EndAddrsCoarseOffset(i16),
    ModLfoToVolume(i16),
    ChorusEffectsSend(i16),
    ReverbEffectsSend(i16),
    Pan(i16),
    DelayModLfo(i16),
    FreqModLfo(i16),
    DelayVibLfo(i16),
    FreqVibLfo(i16),
    DelayModEnv(i16),
    AttackModEnv(i16),
    HoldModEnv(i16),
    DecayModEnv(i16),
    SustainModEnv(i16),
    ReleaseModEnv(i16),
    KeynumToModEnvHold(i16),
    KeynumToModEnvDecay(i16),
    DelayVolEnv(i16),
    AttackVolEnv(i16),
    HoldVolEnv(i16),
    DecayVolEnv(i16),
    SustainVolEnv(i16),
    ReleaseVolEnv(i16),
    KeynumToVolEnvHold(i16),
    KeynumToVolEnvDecay(i16),
    Instrument(u16),
    KeyRange(u8, u8),
    VelRange(u8, u8),
    StartloopAddrsCoarseOffset(i16),
    Keynum(i16),
    Velocity(i16),
    InitialAttenuation(i16),
    EndloopAddrsCoarseOffset(i16),
    CoarseTune(i16),
    FineTune(i16),
    SampleId(u16),
    SampleModes(SampleMode),
    ScaleTuning(i16),
    ExclusiveClass(i16),
    OverridingRootKey(i16),
    EndOper,
    Unknown(u16),
}

impl From<GeneratorData> for Generator {
    fn from(data: GeneratorData) -> Self {
        let v = data.as_i16();
        let u = u16::from_le_bytes(data.amount);
        let (lo, hi) = data.as_range();
        match data.oper {
            0 => Generator::StartAddrsOffset(v),
            1 => Generator::EndAddrsOffset(v),
            2 => Generator::StartloopAddrsOffset(v),
            3 => Generator::EndloopAddrsOffset(v),
            4 => Generator::StartAddrsCoarseOffset(v),
            5 => Generator::ModLfoToPitch(v),
            6 => Generator::VibLfoToPitch(v),
            7 => Generator::ModEnvToPitch(v),
            8 => Generator::InitialFilterFc(v),
            9 => Generator::InitialFilterQ(v),
            10 => Generator::ModLfoToFilterFc(v),
            11 => Generator::ModEnvToFilterFc(v),
            12 => Generator::EndAddrsCoarseOffset(v),
            13 => Generator::ModLfoToVolume(v),
            15 => Generator::ChorusEffectsSend(v),
            16 => Generator::ReverbEffectsSend(v),
            17 => Generator::Pan(v),
            21 => Generator::DelayModLfo(v),
            22 => Generator::FreqModLfo(v),
            23 => Generator::DelayVibLfo(v),
            24 => Generator::FreqVibLfo(v),
            25 => Generator::DelayModEnv(v),
            26 => Generator::AttackModEnv(v),
            27 => Generator::HoldModEnv(v),
            28 => Generator::DecayModEnv(v),
            29 => Generator::SustainModEnv(v),
            30 => Generator::ReleaseModEnv(v),
            31 => Generator::KeynumToModEnvHold(v),
            32 => Generator::KeynumToModEnvDecay(v),
            33 => Generator::DelayVolEnv(v),
            34 => Generator::AttackVolEnv(v),
            35 => Generator::HoldVolEnv(v),
            36 => Generator::DecayVolEnv(v),
            37 => Generator::SustainVolEnv(v),
            38 => Generator::ReleaseVolEnv(v),
            39 => Generator::KeynumToVolEnvHold(v),
            40 => Generator::KeynumToVolEnvDecay(v),
            41 => Generator::Instrument(u),
            43 => Generator::KeyRange(lo, hi),
            44 => Generator::VelRange(lo, hi),
            45 => Generator::StartloopAddrsCoarseOffset(v),
            46 => Generator::Keynum(v),
            47 => Generator::Velocity(v),
            48 => Generator::InitialAttenuation(v),
            50 => Generator::EndloopAddrsCoarseOffset(v),
            51 => Generator::CoarseTune(v),
            52 => Generator::FineTune(v),
            53 => Generator::SampleId(u),
            54 => Generator::SampleModes(match lo & 3 {
                1 => SampleMode::ContinuousLoop,
                3 => SampleMode::ReleaseLoop,
                _ => SampleMode::NoLoop,
            }),
            56 => Generator::ScaleTuning(v),
            57 => Generator::ExclusiveClass(v),
            58 => Generator::OverridingRootKey(v),
            60 => Generator::EndOper,
            other => Generator::Unknown(other),
        }
    }
}

/// Sample header from the `shdr` chunk. Positions are in sample frames
/// within the bank's sample data.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SampleHeader {
    pub name: String,
    pub start: u32,
    pub end: u32,
    pub start_loop: u32,
    pub end_loop: u32,
    pub sample_rate: u32,
    pub original_pitch: u8,
    /// Pitch correction in cents.
    pub correction: i8,
}

/// Audio bound to a zone.
#[derive(Clone, Debug, PartialEq)]
pub struct BankSample {
    pub header: SampleHeader,
    /// The sample exported as a standalone WAV file.
    pub wav: Vec<u8>,
}

/// One instrument zone: its generators and optional sample.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BankZone {
    pub generators: Vec<GeneratorData>,
    pub sample: Option<BankSample>,
}

/// Frames per unit of the coarse address offsets.
const COARSE_OFFSET: i64 = 32768;

/// Generators with no counterpart that are not worth reporting.
const IGNORED_UNMAPPED: &[u16] = &[48];

fn timecents_to_seconds(timecents: i16) -> f64 {
    2f64.powf(f64::from(timecents) / 1200.0)
}

fn absolute_cents_to_hz(cents: i16) -> f64 {
    8.176 * 2f64.powf(f64::from(cents) / 1200.0)
}

/// Sustain attenuation in centibels to a level in [0, 1].
fn centibels_to_level(cb: i16) -> f64 {
    (1.0 - f64::from(cb) / 960.0).max(0.0)
}

fn cooked(position: u32, zone_start: u32, fine: i64, coarse: i64) -> u64 {
    let frame = i64::from(position) - i64::from(zone_start) + fine + coarse * COARSE_OFFSET;
    frame.max(0) as u64
}

/// Convert one zone into a zone record.
pub fn zone_record(zone: &BankZone) -> ZoneRecord {
    let mut record = ZoneRecord::default();

    let (mut loop_start_fine, mut loop_start_coarse) = (0i64, 0i64);
    let (mut loop_end_fine, mut loop_end_coarse) = (0i64, 0i64);

    for data in &zone.generators {
        match data.generator() {
            Generator::StartloopAddrsOffset(v) => loop_start_fine = i64::from(v),
            Generator::StartloopAddrsCoarseOffset(v) => loop_start_coarse = i64::from(v),
            Generator::EndloopAddrsOffset(v) => loop_end_fine = i64::from(v),
            Generator::EndloopAddrsCoarseOffset(v) => loop_end_coarse = i64::from(v),
            Generator::InitialFilterFc(v) => record.cutoff_hz = Some(absolute_cents_to_hz(v)),
            Generator::ChorusEffectsSend(v) => record.chorus_send = Some(f64::from(v) / 10.0),
            Generator::ReverbEffectsSend(v) => record.reverb_send = Some(f64::from(v) / 10.0),
            Generator::Pan(v) => record.pan = Some(f64::from(v) / 500.0),
            Generator::AttackVolEnv(v) => record.attack = Some(timecents_to_seconds(v)),
            Generator::HoldVolEnv(v) => record.hold = Some(timecents_to_seconds(v)),
            Generator::DecayVolEnv(v) => record.decay = Some(timecents_to_seconds(v)),
            Generator::SustainVolEnv(v) => record.sustain_level = Some(centibels_to_level(v)),
            Generator::ReleaseVolEnv(v) => record.release = Some(timecents_to_seconds(v)),
            Generator::KeyRange(lo, hi) => record.key_range = Some((i32::from(lo), i32::from(hi))),
            Generator::VelRange(lo, hi) => {
                record.velocity_range = Some((i32::from(lo), i32::from(hi)))
            }
            Generator::CoarseTune(v) => record.transpose = Some(i32::from(v)),
            Generator::FineTune(v) => record.fine_tune_cents = Some(f64::from(v)),
            Generator::SampleModes(mode) => {
                record.loop_mode = Some(match mode {
                    SampleMode::NoLoop => LoopMode::Off,
                    SampleMode::ContinuousLoop | SampleMode::ReleaseLoop => LoopMode::Forward,
                });
                record.loop_on_release = Some(mode == SampleMode::ReleaseLoop);
            }
            Generator::OverridingRootKey(v) if (0..128).contains(&v) => {
                record.base_note = Some(i32::from(v))
            }
            Generator::OverridingRootKey(_)
            | Generator::SampleId(_)
            | Generator::Instrument(_)
            | Generator::EndOper => {}
            _ if IGNORED_UNMAPPED.contains(&data.oper) => {}
            other => record.unmapped.push(format!("{:?}", other)),
        }
    }

    if let Some(sample) = &zone.sample {
        let header = &sample.header;
        record.name = Some(header.name.clone());
        record.audio = Some(AudioSource::Embedded(sample.wav.clone()));
        if header.correction != 0 {
            record.pitch_correction_cents = Some(f64::from(header.correction));
        }
        if record.base_note.is_none() && header.original_pitch < 128 {
            record.base_note = Some(i32::from(header.original_pitch));
        }
        record.loop_start = Some(cooked(
            header.start_loop,
            header.start,
            loop_start_fine,
            loop_start_coarse,
        ));
        record.loop_end = Some(cooked(
            header.end_loop,
            header.start,
            loop_end_fine,
            loop_end_coarse,
        ));
    }

    record
}

/// Convert every zone of an instrument, keeping their order.
pub fn instrument_records(zones: &[BankZone]) -> Vec<ZoneRecord> {
    zones.iter().map(zone_record).collect()
}
