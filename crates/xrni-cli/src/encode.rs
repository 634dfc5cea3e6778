//! Audio encoding through the `flac` and `oggenc` command line tools.

use std::fs;
use std::path::Path;
use std::process::Command;
use xrni_core::{AudioEncoder, Encoding, Error, Result};

/// Encodes payloads by running an external encoder on temporary files.
#[derive(Debug, Default)]
pub struct ProcessEncoder;

impl ProcessEncoder {
    fn command(encoding: Encoding, input: &Path, output: &Path) -> Result<Command> {
        let program = match encoding {
            Encoding::Flac => "flac",
            Encoding::Ogg => "oggenc",
            Encoding::None => {
                return Err(encoding_error(encoding, "no encoder for raw payloads"));
            }
        };
        let binary = which::which(program).map_err(|_| {
            encoding_error(encoding, &format!("{} not found in PATH", program))
        })?;

        let mut cmd = Command::new(binary);
        match encoding {
            // flac <in> -f -o <out>
            Encoding::Flac => cmd.arg(input).arg("-f").arg("-o").arg(output),
            // oggenc <in> -o <out>
            _ => cmd.arg(input).arg("-o").arg(output),
        };
        Ok(cmd)
    }
}

impl AudioEncoder for ProcessEncoder {
    fn encode(&self, payload: &[u8], encoding: Encoding) -> Result<Vec<u8>> {
        if encoding == Encoding::None {
            return Ok(payload.to_vec());
        }

        let temp_dir = tempfile::tempdir()?;
        let input = temp_dir.path().join("input.wav");
        let output = temp_dir.path().join(format!("output.{}", encoding.extension()));
        fs::write(&input, payload)?;

        let result = Self::command(encoding, &input, &output)?.output()?;
        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            log::debug!("{} encoder output: {}", encoding, stderr);
            return Err(encoding_error(
                encoding,
                &format!("encoder failed with exit code {:?}", result.status.code()),
            ));
        }

        let encoded = fs::read(&output)?;
        if encoded.is_empty() {
            return Err(encoding_error(encoding, "encoder produced no output"));
        }
        Ok(encoded)
    }
}

fn encoding_error(encoding: Encoding, message: &str) -> Error {
    Error::Encoding {
        encoding: encoding.to_string(),
        message: message.to_string(),
    }
}
