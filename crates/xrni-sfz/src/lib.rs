//! SFZ instrument support for xrni.
//!
//! - SFZ file parsing with `<master>`/`<group>` inheritance
//! - Typed opcode access
//! - Mapping of regions to [`xrni_core::ZoneRecord`]s
//! - A case-insensitive sample resolver
//!
//! # Example
//!
//! ```no_run
//! use xrni_core::{ConversionPipeline, TemplateSource};
//! use xrni_sfz::{read_zone_records, CaseInsensitiveResolver};
//!
//! let records = read_zone_records("piano.sfz")?;
//! let pipeline = ConversionPipeline::new(TemplateSource::default(), &CaseInsensitiveResolver);
//! pipeline.convert("piano", &records, "piano.xrni".as_ref())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod parser;
pub mod records;
pub mod resolver;

pub use parser::{
    parse_sfz_file, parse_sfz_str, Error, SfzFile, SfzOpcodes, SfzSection, SfzSectionType,
};
pub use records::{read_zone_records, section_record, zone_records};
pub use resolver::CaseInsensitiveResolver;
