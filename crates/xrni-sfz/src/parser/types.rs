use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::parser::path_utils::resolve_absolute_path;

/// A parsed SFZ file
///
/// # SFZ Hierarchy
///
/// - `<control>`: instrument-wide settings such as `default_path`
/// - `<global>`: defaults for every region
/// - `<master>`: settings shared by the groups that follow
/// - `<group>`: settings shared by the regions that follow
/// - `<region>`: one playable sample
///
/// # Inheritance
///
/// Regions already carry the opcodes of their enclosing `<master>` and
/// `<group>`, with the more specific section winning. `<global>` opcodes are
/// *not* copied down: they stay on [`SfzFile::global`] so that converters can
/// treat them as instrument defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SfzFile {
    /// `<global>` section, merged if the file declares several
    pub global: Option<SfzSection>,

    /// `<control>` section
    pub control: Option<SfzSection>,

    /// `<master>` sections in file order
    pub masters: Vec<SfzSection>,

    /// `<group>` sections in file order
    pub groups: Vec<SfzSection>,

    /// `<region>` sections in file order, with inherited opcodes applied
    pub regions: Vec<SfzSection>,

    /// `<curve>` sections
    pub curves: Vec<SfzSection>,

    /// `<effect>` sections
    pub effects: Vec<SfzSection>,

    /// Source file path if loaded from disk
    ///
    /// This is used to resolve relative paths to samples.
    pub source_file: Option<PathBuf>,
}

impl SfzFile {
    /// Creates a new empty SFZ file structure
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if this SFZ file contains at least one region
    pub fn has_regions(&self) -> bool {
        !self.regions.is_empty()
    }

    /// Get the default path from the control section if available
    ///
    /// ```text
    /// <control>
    /// default_path=samples/piano/
    /// ```
    pub fn get_default_path(&self) -> Option<&str> {
        self.control
            .as_ref()
            .and_then(|ctrl| ctrl.get_opcode_str("default_path"))
    }

    /// Resolve a section's `sample` opcode to a path
    ///
    /// Relative samples are combined with `default_path` and then with the
    /// directory of the SFZ file, when known.
    pub fn resolve_absolute_sample_path(&self, section: &SfzSection) -> Option<PathBuf> {
        let sample_path = section.get_opcode_str("sample")?;
        Some(resolve_absolute_path(
            sample_path,
            self.get_default_path(),
            self.source_file.as_deref(),
        ))
    }
}

/// Types of SFZ sections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SfzSectionType {
    Global,
    Control,
    Master,
    Group,
    Region,
    Curve,
    Effect,
}

impl SfzSectionType {
    /// Returns the section type for a header name (without angle brackets)
    pub fn from_header(header: &str) -> Option<Self> {
        match header.trim().to_lowercase().as_str() {
            "global" => Some(Self::Global),
            "control" => Some(Self::Control),
            "master" => Some(Self::Master),
            "group" => Some(Self::Group),
            "region" => Some(Self::Region),
            "curve" => Some(Self::Curve),
            "effect" => Some(Self::Effect),
            _ => None,
        }
    }

    /// Returns the section header as written in an SFZ file
    pub fn header_str(&self) -> &'static str {
        match self {
            Self::Global => "<global>",
            Self::Control => "<control>",
            Self::Master => "<master>",
            Self::Group => "<group>",
            Self::Region => "<region>",
            Self::Curve => "<curve>",
            Self::Effect => "<effect>",
        }
    }
}

/// A section of an SFZ file: its type and `opcode=value` pairs
#[derive(Debug, Clone, PartialEq)]
pub struct SfzSection {
    /// The type of section (global, region, etc.)
    pub section_type: SfzSectionType,

    /// Opcodes in name order
    pub opcodes: BTreeMap<String, String>,

    /// Line of the section header (1-based)
    pub line: usize,
}

impl SfzSection {
    /// Creates a new empty section
    pub fn new(section_type: SfzSectionType) -> Self {
        Self {
            section_type,
            opcodes: BTreeMap::new(),
            line: 0,
        }
    }

    /// Adds an opcode to this section, replacing any previous value
    pub fn add_opcode(&mut self, name: String, value: String) {
        self.opcodes.insert(name, value);
    }

    /// Gets an opcode value as a string slice if it exists
    pub fn get_opcode_str(&self, name: &str) -> Option<&str> {
        self.opcodes.get(name).map(|s| s.as_str())
    }

    /// Copy every opcode of `parent` that this section does not define
    pub fn inherit_from(&mut self, parent: &SfzSection) {
        for (name, value) in &parent.opcodes {
            self.opcodes
                .entry(name.clone())
                .or_insert_with(|| value.clone());
        }
    }
}
