//! The `reencode` command: compress instrument samples with flac or oggenc.

use crate::encode::ProcessEncoder;
use crate::{for_each_file, ReencodeArgs};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use xrni_core::{reencode_payloads, AudioEncoder, ConvertConfig, Encoding, InstrumentDocument};

pub fn run(args: ReencodeArgs, config: ConvertConfig) -> Result<()> {
    let encoding = args.encoding.unwrap_or(config.encoding);
    let output_dir = args.output_dir.or(config.output_dir);
    let selection = (!args.samples.is_empty()).then_some(args.samples.as_slice());

    for_each_file(&args.files, "re-encode", |file| {
        log::info!("Re-encoding samples from '{}'", file.display());
        let destination = output_path(file, output_dir.as_deref(), encoding)?;
        reencode_file(
            file,
            &destination,
            &ProcessEncoder,
            encoding,
            selection,
            config.overwrite,
        )?;
        log::info!("Saved {}", destination.display());
        Ok(())
    })
}

fn reencode_file(
    file: &Path,
    destination: &Path,
    encoder: &dyn AudioEncoder,
    encoding: Encoding,
    selection: Option<&[usize]>,
    overwrite: bool,
) -> Result<()> {
    let mut doc = InstrumentDocument::load(file)
        .with_context(|| format!("Failed to load {}", file.display()))?;
    let count = reencode_payloads(&mut doc, encoder, encoding, selection);
    log::debug!("{}: {} samples re-encoded", file.display(), count);
    doc.save(destination, overwrite, false)?;
    Ok(())
}

/// `{stem}.{encoding}.xrni`, in `output_dir` or next to the input.
fn output_path(file: &Path, output_dir: Option<&Path>, encoding: Encoding) -> Result<PathBuf> {
    let stem = file
        .file_stem()
        .with_context(|| format!("Not a file name: {}", file.display()))?
        .to_string_lossy();
    let dir = output_dir.unwrap_or_else(|| file.parent().unwrap_or_else(|| Path::new("")));
    Ok(dir.join(format!("{}.{}.xrni", stem, encoding)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use xrni_core::TemplateSource;

    struct UppercaseEncoder;

    impl AudioEncoder for UppercaseEncoder {
        fn encode(&self, payload: &[u8], _encoding: Encoding) -> xrni_core::Result<Vec<u8>> {
            Ok(payload.to_ascii_uppercase())
        }
    }

    #[test]
    fn test_output_path() {
        assert_eq!(
            output_path(Path::new("kits/drums.xrni"), None, Encoding::Flac).unwrap(),
            PathBuf::from("kits/drums.flac.xrni")
        );
        assert_eq!(
            output_path(Path::new("kits/drums.xrni"), Some(Path::new("out")), Encoding::Ogg)
                .unwrap(),
            PathBuf::from("out/drums.ogg.xrni")
        );
    }

    #[test]
    fn test_reencode_file_writes_new_instrument() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("drums.xrni");
        let mut doc = InstrumentDocument::new_from_template(&TemplateSource::default()).unwrap();
        let (sample, set) = doc.templates().map(|(s, m)| (s.clone(), m.clone())).unwrap();
        doc.push_zone(sample, set, b"riff-data".to_vec());
        doc.save(&source, false, false).unwrap();

        let destination = output_path(&source, None, Encoding::Flac).unwrap();
        reencode_file(
            &source,
            &destination,
            &UppercaseEncoder,
            Encoding::Flac,
            None,
            false,
        )
        .unwrap();

        let encoded = InstrumentDocument::load(&destination).unwrap();
        assert_eq!(encoded.payloads()[0], b"RIFF-DATA".to_vec());
        let original = InstrumentDocument::load(&source).unwrap();
        assert_eq!(original.payloads()[0], b"riff-data".to_vec());
    }
}
