//! Payload re-encoding through an injected encoder.

use crate::document::InstrumentDocument;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target format for sample payloads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// Keep payloads as they are.
    #[default]
    None,
    Flac,
    Ogg,
}

impl Encoding {
    /// File extension of the encoded format.
    pub fn extension(self) -> &'static str {
        match self {
            Encoding::None => "wav",
            Encoding::Flac => "flac",
            Encoding::Ogg => "ogg",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Encoding::None => write!(f, "none"),
            Encoding::Flac => write!(f, "flac"),
            Encoding::Ogg => write!(f, "ogg"),
        }
    }
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(Encoding::None),
            "flac" => Ok(Encoding::Flac),
            "ogg" | "vorbis" => Ok(Encoding::Ogg),
            other => Err(format!("unknown encoding '{}'", other)),
        }
    }
}

/// Turns a raw audio payload into the requested format.
pub trait AudioEncoder {
    /// Encode `payload`, failing with [`Error::Encoding`](crate::Error::Encoding).
    fn encode(&self, payload: &[u8], encoding: Encoding) -> Result<Vec<u8>>;
}

/// Re-encode the document's payloads.
///
/// With `selection`, only the listed payload indices are touched; indices
/// past the end are logged and skipped. A payload whose encoding fails is
/// kept unchanged. Returns the number of payloads re-encoded.
pub fn reencode_payloads(
    doc: &mut InstrumentDocument,
    encoder: &dyn AudioEncoder,
    encoding: Encoding,
    selection: Option<&[usize]>,
) -> usize {
    if encoding == Encoding::None {
        return 0;
    }

    let count = doc.payloads().len();
    let indices: Vec<usize> = match selection {
        Some(selected) => selected.to_vec(),
        None => (0..count).collect(),
    };

    let mut encoded = 0;
    for idx in indices {
        let Some(payload) = doc.payloads_mut().get_mut(idx) else {
            log::error!(
                "Failed to convert sample {}: instrument has {} samples",
                idx,
                count
            );
            continue;
        };
        match encoder.encode(payload, encoding) {
            Ok(data) => {
                log::debug!(
                    "Sample {}: {} -> {} bytes as {}",
                    idx,
                    payload.len(),
                    data.len(),
                    encoding
                );
                *payload = data;
                encoded += 1;
            }
            Err(err) => log::warn!("Keeping sample {} unchanged: {}", idx, err),
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::TemplateSource;
    use crate::error::Error;

    /// Prefixes payloads with a marker, refusing empty ones.
    struct MarkingEncoder;

    impl AudioEncoder for MarkingEncoder {
        fn encode(&self, payload: &[u8], encoding: Encoding) -> Result<Vec<u8>> {
            if payload.is_empty() {
                return Err(Error::Encoding {
                    encoding: encoding.to_string(),
                    message: "empty input".to_string(),
                });
            }
            let mut out = b"fLaC\0\0\0\x22".to_vec();
            out.extend_from_slice(payload);
            Ok(out)
        }
    }

    fn document(payloads: &[&[u8]]) -> InstrumentDocument {
        let mut doc = InstrumentDocument::new_from_template(&TemplateSource::default()).unwrap();
        for (idx, payload) in payloads.iter().enumerate() {
            let (sample, set) = doc.templates().unwrap();
            let (mut sample, set) = (sample.clone(), set.clone());
            sample.set_modulation_set_index(idx);
            doc.push_zone(sample, set, payload.to_vec());
        }
        doc
    }

    #[test]
    fn test_reencode_all() {
        let mut doc = document(&[b"RIFFa", b"RIFFb"]);
        let count = reencode_payloads(&mut doc, &MarkingEncoder, Encoding::Flac, None);
        assert_eq!(count, 2);
        assert!(doc.payloads().iter().all(|p| p.starts_with(b"fLaC")));
    }

    #[test]
    fn test_reencode_selection_skips_out_of_range() {
        let mut doc = document(&[b"RIFFa", b"RIFFb"]);
        let count = reencode_payloads(&mut doc, &MarkingEncoder, Encoding::Flac, Some(&[1, 7]));
        assert_eq!(count, 1);
        assert_eq!(doc.payloads()[0], b"RIFFa".to_vec());
        assert!(doc.payloads()[1].starts_with(b"fLaC"));
    }

    #[test]
    fn test_failed_encoding_keeps_original() {
        let mut doc = document(&[b"", b"RIFFb"]);
        let count = reencode_payloads(&mut doc, &MarkingEncoder, Encoding::Ogg, None);
        assert_eq!(count, 1);
        assert!(doc.payloads()[0].is_empty());
    }

    #[test]
    fn test_encoding_names() {
        assert_eq!("FLAC".parse::<Encoding>(), Ok(Encoding::Flac));
        assert_eq!(Encoding::Ogg.to_string(), "ogg");
        assert_eq!(Encoding::Flac.extension(), "flac");
        assert!("mp3".parse::<Encoding>().is_err());
    }
}
