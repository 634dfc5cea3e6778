//! SFZ regions as zone records.

use std::path::Path;

use xrni_core::{AudioSource, FilterType, LoopMode as ZoneLoopMode, ZoneRecord};

use crate::parser::{
    is_recognized, parse_sfz_file, FilterKind, LoopMode, Note, Result, SfzFile, SfzOpcodes,
    SfzSection,
};

/// Opcodes consumed by [`section_record`].
const MAPPED: &[&str] = &[
    "sample",
    "default_path",
    "key",
    "lokey",
    "hikey",
    "lovel",
    "hivel",
    "pitch_keycenter",
    "transpose",
    "tune",
    "pan",
    "volume",
    "ampeg_attack",
    "ampeg_hold",
    "ampeg_decay",
    "ampeg_sustain",
    "ampeg_release",
    "cutoff",
    "fil_type",
    "loop_mode",
    "loopmode",
    "loop_start",
    "loopstart",
    "loop_end",
    "loopend",
];

/// Read an SFZ file into zone records
///
/// The `<global>` section, if any, comes first as a record without audio.
/// Regions without a `sample` opcode are skipped.
pub fn read_zone_records(path: impl AsRef<Path>) -> Result<Vec<ZoneRecord>> {
    let sfz = parse_sfz_file(path)?;
    Ok(zone_records(&sfz))
}

/// Zone records for an already parsed file
pub fn zone_records(sfz: &SfzFile) -> Vec<ZoneRecord> {
    let mut records = Vec::with_capacity(sfz.regions.len() + 1);

    if let Some(global) = &sfz.global {
        records.push(section_record(global));
    }

    for region in &sfz.regions {
        let Some(sample) = sfz.resolve_absolute_sample_path(region) else {
            log::warn!("Skipping region at line {} without a sample", region.line);
            continue;
        };
        let mut record = section_record(region);
        record.name = sample
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned());
        record.audio = Some(AudioSource::File(sample));
        records.push(record);
    }

    records
}

/// Map the opcodes of one section; the result has no audio
pub fn section_record(section: &SfzSection) -> ZoneRecord {
    let mut record = ZoneRecord::default();

    let low_key = section.opcode::<Note>(&["lokey", "key"]);
    let high_key = section.opcode::<Note>(&["hikey", "key"]);
    if low_key.is_some() || high_key.is_some() {
        record.key_range = Some((
            low_key.map_or(0, |n| n.0),
            high_key.map_or(127, |n| n.0),
        ));
    }
    record.base_note = section
        .opcode::<Note>(&["pitch_keycenter", "key"])
        .map(|n| n.0);

    let low_vel = section.opcode::<i32>(&["lovel"]);
    let high_vel = section.opcode::<i32>(&["hivel"]);
    if low_vel.is_some() || high_vel.is_some() {
        record.velocity_range = Some((low_vel.unwrap_or(0), high_vel.unwrap_or(127)));
    }

    record.transpose = section.opcode(&["transpose"]);
    record.fine_tune_cents = section.opcode(&["tune"]);
    record.pan = section.opcode::<f64>(&["pan"]).map(|pan| pan / 100.0);
    record.volume_db = section.opcode(&["volume"]);

    record.attack = section.opcode(&["ampeg_attack"]);
    record.hold = section.opcode(&["ampeg_hold"]);
    record.decay = section.opcode(&["ampeg_decay"]);
    record.release = section.opcode(&["ampeg_release"]);
    record.sustain_level = section
        .opcode::<f64>(&["ampeg_sustain"])
        .map(|percent| (percent / 100.0).clamp(0.0, 1.0));

    record.cutoff_hz = section.opcode(&["cutoff"]);
    record.filter_type = match section.opcode::<FilterKind>(&["fil_type"]) {
        Some(FilterKind::LowPass) => Some(FilterType::CleanLp),
        Some(FilterKind::HighPass) => Some(FilterType::CleanHp),
        Some(FilterKind::Other) => {
            record.unmapped.push(format!(
                "fil_type={}",
                section.get_opcode_str("fil_type").unwrap_or_default()
            ));
            None
        }
        // A cutoff alone implies the default two-pole low-pass
        None => record.cutoff_hz.map(|_| FilterType::CleanLp),
    };

    if let Some(mode) = section.opcode::<LoopMode>(&["loop_mode", "loopmode"]) {
        let (zone_mode, on_release) = match mode {
            LoopMode::NoLoop | LoopMode::OneShot => (ZoneLoopMode::Off, false),
            LoopMode::LoopContinuous => (ZoneLoopMode::Forward, false),
            LoopMode::LoopSustain => (ZoneLoopMode::Forward, true),
        };
        record.loop_mode = Some(zone_mode);
        record.loop_on_release = Some(on_release);
    }
    record.loop_start = section.opcode(&["loop_start", "loopstart"]);
    record.loop_end = section.opcode(&["loop_end", "loopend"]);

    for (name, value) in &section.opcodes {
        if MAPPED.contains(&name.as_str()) {
            continue;
        }
        if is_recognized(name) {
            record.unmapped.push(format!("{}={}", name, value));
        } else {
            log::debug!("Unknown opcode {} at line {}", name, section.line);
        }
    }

    record
}
