//! Conversion of zone records into an instrument document.
//!
//! A conversion starts from a template document, resolves the instrument's
//! defaults from its global records, then appends one sample/modulation set
//! pair per zone. Nothing is written until the whole instrument has been
//! assembled, and the final save is atomic.

use crate::document::{InstrumentDocument, TemplateSource};
use crate::error::{Error, Result};
use crate::keymap::expand_keymap;
use crate::sample::{ModulationSet, Sample};
use crate::transforms::{
    cents_to_finetune, decibel_to_volume_unit, default_cutoff_unit, frequency_to_cutoff_unit,
    pan_to_panning, seconds_to_envelope_unit, specified,
};
use crate::zone::{AudioSource, ZoneRecord};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the global property receiving the averaged reverb send.
pub const REVERB_SEND: &str = "SF2 reverb";
/// Name of the global property receiving the averaged chorus send.
pub const CHORUS_SEND: &str = "SF2 chorus";

/// Locates the audio file a zone refers to.
pub trait SampleResolver {
    /// Path of an existing file matching `path`, if any.
    fn resolve(&self, path: &Path) -> Option<PathBuf>;
}

impl<F> SampleResolver for F
where
    F: Fn(&Path) -> Option<PathBuf>,
{
    fn resolve(&self, path: &Path) -> Option<PathBuf> {
        self(path)
    }
}

/// Resolver accepting only paths that exist exactly as written.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExactResolver;

impl SampleResolver for ExactResolver {
    fn resolve(&self, path: &Path) -> Option<PathBuf> {
        path.is_file().then(|| path.to_path_buf())
    }
}

/// Knobs for a conversion run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Stretch keyzones so every velocity layer covers the whole keyboard.
    pub expand_keymap: bool,
    /// Replace an existing destination file.
    pub overwrite: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            expand_keymap: true,
            overwrite: false,
        }
    }
}

/// Source parameters a zone carried that could not be expressed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnmappedParameters {
    /// Position of the record in the input.
    pub record: usize,
    pub label: String,
    pub parameters: Vec<String>,
}

/// What happened during a conversion.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConversionReport {
    /// Number of zones added to the instrument.
    pub zones: usize,
    pub unmapped: Vec<UnmappedParameters>,
    /// Sample files that could not be found; their zones have empty audio.
    pub missing_samples: Vec<PathBuf>,
}

/// Builds instrument documents from zone records.
pub struct ConversionPipeline<'a> {
    template: TemplateSource,
    resolver: &'a dyn SampleResolver,
    options: ConvertOptions,
}

impl<'a> ConversionPipeline<'a> {
    pub fn new(template: TemplateSource, resolver: &'a dyn SampleResolver) -> Self {
        Self {
            template,
            resolver,
            options: ConvertOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ConvertOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Assemble an instrument named `name` from `records`, without saving.
    pub fn build(
        &self,
        name: &str,
        records: &[ZoneRecord],
    ) -> Result<(InstrumentDocument, ConversionReport)> {
        let mut doc = InstrumentDocument::new_from_template(&self.template)?;
        let report = convert(&mut doc, name, records, self.resolver, &self.options)?;
        Ok((doc, report))
    }

    /// Assemble an instrument and save it to `destination`.
    pub fn convert(
        &self,
        name: &str,
        records: &[ZoneRecord],
        destination: &Path,
    ) -> Result<ConversionReport> {
        let (mut doc, report) = self.build(name, records)?;
        doc.save(destination, self.options.overwrite, true)?;
        log::info!(
            "Saved {} ({} zones) to {}",
            name,
            report.zones,
            destination.display()
        );
        Ok(report)
    }
}

/// Fill a template document with the zones described by `records`.
///
/// Records without audio are global: they are overlaid, in order, onto the
/// baseline defaults that every zone then inherits. The document must come
/// from [`InstrumentDocument::new_from_template`].
pub fn convert(
    doc: &mut InstrumentDocument,
    name: &str,
    records: &[ZoneRecord],
    resolver: &dyn SampleResolver,
    options: &ConvertOptions,
) -> Result<ConversionReport> {
    let (sample_template, set_template) = doc
        .templates()
        .map(|(s, m)| (s.clone(), m.clone()))
        .ok_or_else(|| Error::Format("document has no sample template".to_string()))?;

    doc.set_name(name);
    let mut report = ConversionReport::default();

    let mut defaults = (sample_template.clone(), set_template.clone());
    apply_baseline(&mut defaults.0, &mut defaults.1);

    let mut global_chorus = 0.0;
    let mut global_reverb = 0.0;
    for record in records.iter().filter(|r| r.is_global()) {
        let inherited = defaults.clone();
        overlay(record, &mut defaults.0, &mut defaults.1, &inherited);
        if let Some(send) = specified(record.chorus_send) {
            global_chorus = send;
        }
        if let Some(send) = specified(record.reverb_send) {
            global_reverb = send;
        }
    }

    let mut chorus_sends = Vec::new();
    let mut reverb_sends = Vec::new();

    for (position, record) in records.iter().enumerate() {
        if !record.unmapped.is_empty() {
            log::debug!(
                "{}: unmapped parameters in {}: {}",
                name,
                record.label(),
                record.unmapped.join(", ")
            );
            report.unmapped.push(UnmappedParameters {
                record: position,
                label: record.label(),
                parameters: record.unmapped.clone(),
            });
        }

        let Some(audio) = &record.audio else {
            continue;
        };

        let mut sample = sample_template.clone();
        let mut set = set_template.clone();
        sample.set_modulation_set_index(report.zones);
        overlay(record, &mut sample, &mut set, &defaults);
        sample.set_name(&zone_name(record));

        let payload = match audio {
            AudioSource::Embedded(data) => data.clone(),
            AudioSource::File(path) => match resolver.resolve(path) {
                Some(found) => fs::read(&found)?,
                None => {
                    log::warn!("{}", Error::MissingSampleFile(path.clone()));
                    report.missing_samples.push(path.clone());
                    Vec::new()
                }
            },
        };

        if let Some(send) = specified(record.chorus_send) {
            chorus_sends.push(send);
        }
        if let Some(send) = specified(record.reverb_send) {
            reverb_sends.push(send);
        }

        doc.push_zone(sample, set, payload);
        report.zones += 1;
    }

    write_send(doc, CHORUS_SEND, mean(&chorus_sends) + global_chorus);
    write_send(doc, REVERB_SEND, mean(&reverb_sends) + global_reverb);

    if options.expand_keymap {
        expand_keymap(doc.samples_mut());
    }

    Ok(report)
}

/// Values every zone starts from before global records are applied.
fn apply_baseline(sample: &mut Sample, set: &mut ModulationSet) {
    set.set_cutoff(default_cutoff_unit());
    set.set_attack(0.0);
    set.set_hold(0.0);
    set.set_decay(0.0);
    set.set_sustain(1.0);
    set.set_release(0.0);

    sample.set_panning(0.5);
    sample.set_transpose(0);
    sample.set_fine_tune(0);
    sample.set_base_note(60);
    sample.set_note_range(0, 119);
    sample.set_velocity_range(0, 127);
}

/// Write each parameter of `record` onto the pair, falling back to the value
/// in `defaults` when the record leaves it unspecified.
fn overlay(
    record: &ZoneRecord,
    sample: &mut Sample,
    set: &mut ModulationSet,
    defaults: &(Sample, ModulationSet),
) {
    let (default_sample, default_set) = defaults;

    sample.set_loop_mode(record.loop_mode.unwrap_or_else(|| default_sample.loop_mode()));
    sample.set_loop_release(
        record
            .loop_on_release
            .unwrap_or_else(|| default_sample.loop_release()),
    );
    if let Some(start) = record.loop_start.or_else(|| default_sample.loop_start()) {
        sample.set_loop_start(start);
    }
    if let Some(end) = record.loop_end.or_else(|| default_sample.loop_end()) {
        sample.set_loop_end(end);
    }

    if let Some(panning) = pan_to_panning(record.pan).or_else(|| default_sample.panning()) {
        sample.set_panning(panning);
    }
    if let Some(transpose) = record
        .transpose
        .filter(|t| *t != 0)
        .or_else(|| default_sample.transpose())
    {
        sample.set_transpose(transpose);
    }
    if let Some(fine) = cents_to_finetune(record.fine_tune_cents)
        .or_else(|| cents_to_finetune(record.pitch_correction_cents))
        .or_else(|| default_sample.fine_tune())
    {
        sample.set_fine_tune(fine);
    }
    if let Some(volume) = decibel_to_volume_unit(record.volume_db).or_else(|| default_sample.volume()) {
        sample.set_volume(volume);
    }

    if let Some(note) = record
        .base_note
        .filter(|n| *n != 0)
        .or_else(|| default_sample.base_note())
    {
        sample.set_base_note(note);
    }
    let (start, end) = record
        .key_range
        .unwrap_or_else(|| (default_sample.note_start(), default_sample.note_end()));
    sample.set_note_range(start, end);
    let (start, end) = record
        .velocity_range
        .unwrap_or_else(|| (default_sample.velocity_start(), default_sample.velocity_end()));
    sample.set_velocity_range(start, end);

    if let Some(attack) = seconds_to_envelope_unit(record.attack).or_else(|| default_set.attack()) {
        set.set_attack(attack);
    }
    if let Some(hold) = seconds_to_envelope_unit(record.hold).or_else(|| default_set.hold()) {
        set.set_hold(hold);
    }
    if let Some(decay) = seconds_to_envelope_unit(record.decay).or_else(|| default_set.decay()) {
        set.set_decay(decay);
    }
    if let Some(release) = seconds_to_envelope_unit(record.release).or_else(|| default_set.release()) {
        set.set_release(release);
    }
    if let Some(sustain) = specified(record.sustain_level.map(|l| l.clamp(0.0, 1.0)))
        .or_else(|| default_set.sustain())
    {
        set.set_sustain(sustain);
    }
    if let Some(cutoff) = frequency_to_cutoff_unit(record.cutoff_hz).or_else(|| default_set.cutoff()) {
        set.set_cutoff(cutoff);
    }
    set.set_filter_type(record.filter_type.unwrap_or_else(|| default_set.filter_type()));
}

fn zone_name(record: &ZoneRecord) -> String {
    if let Some(name) = &record.name {
        return name.clone();
    }
    match &record.audio {
        Some(AudioSource::File(path)) => path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default(),
        _ => String::new(),
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn write_send(doc: &mut InstrumentDocument, property: &str, value: f64) {
    if !doc.set_global_property(property, value) {
        log::debug!("Template has no '{}' property, send level dropped", property);
    }
}
