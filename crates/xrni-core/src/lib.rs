//! # xrni-core
//!
//! Model and conversion pipeline for zip+XML sampler instruments (`.xrni`).
//!
//! An [`InstrumentDocument`] is either loaded from a container or created
//! from a template. Source readers turn their zones into [`ZoneRecord`]s,
//! which the [`ConversionPipeline`] overlays onto the template, expands to
//! cover the keyboard and saves with duplicate modulation sets merged.
//!
//! ```no_run
//! use xrni_core::{ConversionPipeline, ExactResolver, TemplateSource, ZoneRecord};
//!
//! # fn records() -> Vec<ZoneRecord> { Vec::new() }
//! let pipeline = ConversionPipeline::new(TemplateSource::default(), &ExactResolver);
//! let report = pipeline.convert("Piano", &records(), "Piano.xrni".as_ref())?;
//! println!("{} zones", report.zones);
//! # Ok::<(), xrni_core::Error>(())
//! ```

pub mod bank;
pub mod cleanup;
pub mod config;
pub mod convert;
pub mod document;
pub mod encoder;
pub mod error;
pub mod keymap;
pub mod sample;
pub mod soundfont;
pub mod transforms;
pub mod tree;
pub mod zone;

pub use cleanup::cleanup;
pub use config::ConvertConfig;
pub use convert::{
    convert, ConversionPipeline, ConversionReport, ConvertOptions, ExactResolver, SampleResolver,
    UnmappedParameters,
};
pub use document::{InstrumentDocument, TemplateSource};
pub use encoder::{reencode_payloads, AudioEncoder, Encoding};
pub use error::{Error, Result};
pub use keymap::expand_keymap;
pub use sample::{FilterType, LoopMode, ModulationSet, OverlapMode, Sample};
pub use soundfont::{BankInstrument, SoundFont};
pub use tree::{equals, Element};
pub use zone::{AudioSource, ZoneRecord};
