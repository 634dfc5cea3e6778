//! The `sf2` command: every instrument of a SoundFont 2 bank to its own
//! XRNI instrument.

use crate::convert::{configure, log_report};
use crate::{for_each_file, ConvertArgs};
use anyhow::{Context, Result};
use std::path::Path;
use xrni_core::bank::instrument_records;
use xrni_core::{ConversionPipeline, ConvertConfig, ExactResolver, SoundFont};

pub fn run(args: ConvertArgs, config: ConvertConfig) -> Result<()> {
    let config = configure(&args, config);
    // Bank zones carry their audio, nothing is resolved on disk.
    let resolver = ExactResolver;
    let pipeline = ConversionPipeline::new(config.template_source(), &resolver)
        .with_options(config.convert_options());

    for_each_file(&args.files, "convert", |file| {
        log::info!("Reading bank from '{}'", file.display());
        convert_bank(&pipeline, file, &config)
    })
}

/// Convert each instrument of the bank. A failing instrument is logged and
/// the rest of the bank is still converted.
fn convert_bank(
    pipeline: &ConversionPipeline<'_>,
    file: &Path,
    config: &ConvertConfig,
) -> Result<()> {
    let bank =
        SoundFont::open(file).with_context(|| format!("Failed to read {}", file.display()))?;
    if bank.instruments.is_empty() {
        log::warn!("{} has no instruments", file.display());
    }

    let mut failed = 0;
    for (index, instrument) in bank.instruments.iter().enumerate() {
        log::info!("Converting '{}'", instrument.name);
        let records = instrument_records(&instrument.zones);
        let destination = config
            .output_dir()
            .join(output_name(index, &instrument.name));
        match pipeline.convert(&instrument.name, &records, &destination) {
            Ok(report) => log_report(&instrument.name, &report, config.show_unused),
            Err(err) => {
                log::error!("Failed to convert '{}': {:#}", instrument.name, err);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!(
            "{} of {} instruments failed",
            failed,
            bank.instruments.len()
        );
    }
    Ok(())
}

/// `{index}_{name}.xrni`, with path separators and wildcards replaced.
fn output_name(index: usize, name: &str) -> String {
    let safe: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | '"' | '?' | '*' | ':' => '_',
            c => c,
        })
        .collect();
    format!("{}_{}.xrni", index, safe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use xrni_core::InstrumentDocument;

    const BANK: &[u8] = include_bytes!("../../xrni-core/tests/data/two-instruments.sf2");

    fn args(files: Vec<PathBuf>, output_dir: &Path) -> ConvertArgs {
        ConvertArgs {
            files,
            output_dir: Some(output_dir.to_path_buf()),
            template: None,
            no_expand: false,
            force: false,
            show_unused: false,
        }
    }

    #[test]
    fn test_output_name() {
        assert_eq!(output_name(0, "Piano"), "0_Piano.xrni");
        assert_eq!(output_name(12, "Pad/Soft?"), "12_Pad_Soft_.xrni");
    }

    #[test]
    fn test_converts_every_instrument() {
        let dir = TempDir::new().unwrap();
        let bank = dir.path().join("bank.sf2");
        fs::write(&bank, BANK).unwrap();

        run(args(vec![bank], dir.path()), ConvertConfig::default()).unwrap();

        let lead = InstrumentDocument::load(dir.path().join("0_Lead.xrni")).unwrap();
        assert_eq!(lead.name(), Some("Lead"));
        assert_eq!(lead.samples().len(), 1);
        assert_eq!(lead.samples()[0].name(), Some("Sine"));
        assert!(lead.payloads()[0].starts_with(b"RIFF"));
        assert_eq!(&lead.payloads()[0][8..12], b"WAVE");

        let pad = InstrumentDocument::load(dir.path().join("1_Pad_Soft.xrni")).unwrap();
        assert_eq!(pad.name(), Some("Pad/Soft"));
        assert_eq!(pad.samples().len(), 1);
    }

    #[test]
    fn test_existing_output_is_kept_without_force() {
        let dir = TempDir::new().unwrap();
        let bank = dir.path().join("bank.sf2");
        fs::write(&bank, BANK).unwrap();
        let existing = dir.path().join("0_Lead.xrni");
        fs::write(&existing, b"keep").unwrap();

        let result = run(args(vec![bank], dir.path()), ConvertConfig::default());

        assert!(result.is_err());
        assert_eq!(fs::read(&existing).unwrap(), b"keep".to_vec());
        assert!(dir.path().join("1_Pad_Soft.xrni").exists());
    }

    #[test]
    fn test_invalid_bank_fails() {
        let dir = TempDir::new().unwrap();
        let bank = dir.path().join("broken.sf2");
        fs::write(&bank, b"RIFF\x04\0\0\0WAVE").unwrap();

        assert!(run(args(vec![bank], dir.path()), ConvertConfig::default()).is_err());
    }
}
