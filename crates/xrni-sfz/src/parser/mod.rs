//! SFZ parser
//!
//! Type-safe parser for SFZ format files.

use std::fs;
use std::path::Path;

mod error;
pub mod opcodes;
mod parse;
pub mod path_utils;
mod types;

pub use error::Error;
pub use opcodes::{is_recognized, FilterKind, LoopMode, Note, OpcodeValue, SfzOpcodes};
pub use path_utils::{combine_sample_path, normalize_path};
pub use types::{SfzFile, SfzSection, SfzSectionType};

pub type Result<T> = std::result::Result<T, Error>;

/// Parse an SFZ file from a string
pub fn parse_sfz_str(content: &str) -> Result<SfzFile> {
    parse::parse_sfz(content)
}

/// Parse an SFZ file from a file path
///
/// The canonical path is kept in [`SfzFile::source_file`] so that relative
/// sample paths resolve against the file's directory.
pub fn parse_sfz_file<P: AsRef<Path>>(path: P) -> Result<SfzFile> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)?;
    let mut sfz = parse_sfz_str(&content)?;

    let absolute_path = fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    sfz.source_file = Some(absolute_path);
    Ok(sfz)
}
