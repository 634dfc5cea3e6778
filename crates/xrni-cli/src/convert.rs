//! The `sfz` command: SFZ files to XRNI instruments.

use crate::{for_each_file, ConvertArgs};
use anyhow::{Context, Result};
use std::path::Path;
use xrni_core::{ConversionPipeline, ConversionReport, ConvertConfig};
use xrni_sfz::{read_zone_records, CaseInsensitiveResolver};

pub fn run(args: ConvertArgs, config: ConvertConfig) -> Result<()> {
    let config = configure(&args, config);
    let resolver = CaseInsensitiveResolver;
    let pipeline = ConversionPipeline::new(config.template_source(), &resolver)
        .with_options(config.convert_options());

    for_each_file(&args.files, "convert", |file| {
        log::info!("Reading instrument from '{}'", file.display());
        convert_file(&pipeline, file, &config)
    })
}

fn convert_file(
    pipeline: &ConversionPipeline<'_>,
    file: &Path,
    config: &ConvertConfig,
) -> Result<()> {
    let name = instrument_name(file)?;
    let records = read_zone_records(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    if records.iter().all(|record| record.is_global()) {
        log::warn!("{} has no playable regions", file.display());
    }

    let destination = config.output_dir().join(format!("{}.xrni", name));
    let report = pipeline.convert(&name, &records, &destination)?;
    log_report(&name, &report, config.show_unused);

    Ok(())
}

/// Command line options take precedence over the configuration file.
pub(crate) fn configure(args: &ConvertArgs, mut config: ConvertConfig) -> ConvertConfig {
    if let Some(template) = &args.template {
        config.template = template.clone();
    }
    if let Some(output_dir) = &args.output_dir {
        config.output_dir = Some(output_dir.clone());
    }
    config.expand_keymap &= !args.no_expand;
    config.overwrite |= args.force;
    config.show_unused |= args.show_unused;
    config
}

pub(crate) fn log_report(name: &str, report: &ConversionReport, show_unused: bool) {
    if show_unused {
        for unmapped in &report.unmapped {
            log::info!(
                "  unused in {}: {}",
                unmapped.label,
                unmapped.parameters.join(", ")
            );
        }
    }
    if !report.missing_samples.is_empty() {
        log::warn!(
            "{}: {} samples not found, saved as empty",
            name,
            report.missing_samples.len()
        );
    }
}

/// Instrument name derived from the SFZ file name, without extension.
fn instrument_name(file: &Path) -> Result<String> {
    file.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .with_context(|| format!("Cannot derive an instrument name from {}", file.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use xrni_core::InstrumentDocument;

    fn args(files: Vec<PathBuf>, output_dir: &Path) -> ConvertArgs {
        ConvertArgs {
            files,
            output_dir: Some(output_dir.to_path_buf()),
            template: None,
            no_expand: false,
            force: false,
            show_unused: true,
        }
    }

    #[test]
    fn test_instrument_name() {
        assert_eq!(
            instrument_name(Path::new("libs/Grand Piano.sfz")).unwrap(),
            "Grand Piano"
        );
    }

    #[test]
    fn test_converts_sfz_with_case_mismatched_sample() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("kick.wav"), b"RIFF\0\0\0\0WAVE").unwrap();
        let sfz = dir.path().join("drums.sfz");
        fs::write(&sfz, "<region> sample=KICK.wav key=36 cutoff=5000\n").unwrap();

        run(args(vec![sfz], dir.path()), ConvertConfig::default()).unwrap();

        let doc = InstrumentDocument::load(dir.path().join("drums.xrni")).unwrap();
        assert_eq!(doc.name(), Some("drums"));
        assert_eq!(doc.samples().len(), 1);
        assert_eq!(doc.payloads()[0], b"RIFF\0\0\0\0WAVE".to_vec());
    }

    #[test]
    fn test_failed_file_does_not_stop_batch() {
        let dir = TempDir::new().unwrap();
        let good = dir.path().join("good.sfz");
        fs::write(&good, "<region> sample=missing.wav\n").unwrap();
        let broken = dir.path().join("broken.sfz");
        fs::write(&broken, "<region sample=x.wav\n").unwrap();

        let result = run(
            args(vec![broken, good], dir.path()),
            ConvertConfig::default(),
        );

        assert!(result.is_err());
        assert!(dir.path().join("good.xrni").exists());
        assert!(!dir.path().join("broken.xrni").exists());
    }
}
