//! The instrument document: header fields, keyzones, modulation sets and raw
//! audio payloads, persisted as a zip container.
//!
//! # Container layout
//!
//! ```text
//! Instrument.xml                  the instrument description
//! SampleData/Sample00 Name.flac   one entry per payload, in sample order
//! SampleData/Sample01 Name.wav
//! ```
//!
//! On load, `Sample` and `ModulationSet` elements are detached from the XML
//! tree into typed collections. On save they are written back into
//! `SampleGenerator/Samples` and `SampleGenerator/ModulationSets`.

use crate::cleanup;
use crate::error::{Error, Result};
use crate::sample::{ModulationSet, OverlapMode, Sample};
use crate::tree::Element;
use include_dir::{include_dir, Dir};
use std::fs::File;
use std::io::{self, Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// Bundled instrument templates, looked up by file name.
static TEMPLATES: Dir = include_dir!("$CARGO_MANIFEST_DIR/data");

/// File name of the bundled empty instrument.
pub const DEFAULT_TEMPLATE: &str = "default.xrni";

const INSTRUMENT_XML: &str = "Instrument.xml";
const SAMPLE_DATA: &str = "SampleData";

const SAMPLES_PATH: &[&str] = &["SampleGenerator", "Samples"];
const MODULATION_SETS_PATH: &[&str] = &["SampleGenerator", "ModulationSets"];
const OVERLAP_PATH: &[&str] = &["SampleGenerator", "KeyzoneOverlappingMode"];
const GLOBAL_PROPERTIES: &str = "GlobalProperties";

/// Where a new document's template comes from.
///
/// The path is tried on the filesystem first; if nothing is there, a bundled
/// template with the same file name is used instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TemplateSource {
    pub path: PathBuf,
}

impl TemplateSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for TemplateSource {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE)
    }
}

/// An instrument held in memory.
#[derive(Clone, Debug, PartialEq)]
pub struct InstrumentDocument {
    root: Element,
    samples: Vec<Sample>,
    modulation_sets: Vec<ModulationSet>,
    payloads: Vec<Vec<u8>>,
    templates: Option<(Sample, ModulationSet)>,
}

impl InstrumentDocument {
    /// Load an instrument container from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("Loading instrument {}", path.display());
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    /// Load an instrument container from any seekable reader.
    pub fn from_reader<R: Read + Seek>(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;

        let xml = {
            let mut entry = archive.by_name(INSTRUMENT_XML).map_err(|err| match err {
                zip::result::ZipError::FileNotFound => {
                    Error::Format(format!("missing {} entry", INSTRUMENT_XML))
                }
                other => Error::Zip(other),
            })?;
            let mut xml = Vec::new();
            entry.read_to_end(&mut xml)?;
            xml
        };

        let mut names: Vec<String> = archive
            .file_names()
            .filter(|name| name.starts_with(SAMPLE_DATA) && !name.ends_with('/'))
            .map(str::to_string)
            .collect();
        names.sort();

        let mut payloads = Vec::with_capacity(names.len());
        for name in &names {
            let mut entry = archive.by_name(name)?;
            let mut data = Vec::new();
            entry.read_to_end(&mut data)?;
            payloads.push(data);
        }

        let mut root = Element::parse(&xml)?;
        let samples = root
            .path_mut(SAMPLES_PATH)
            .map(|container| container.take_children("Sample"))
            .unwrap_or_default()
            .into_iter()
            .map(Sample)
            .collect();
        let modulation_sets = root
            .path_mut(MODULATION_SETS_PATH)
            .map(|container| container.take_children("ModulationSet"))
            .unwrap_or_default()
            .into_iter()
            .map(ModulationSet)
            .collect();

        Ok(Self {
            root,
            samples,
            modulation_sets,
            payloads,
            templates: None,
        })
    }

    /// Create an empty document from a template container.
    ///
    /// The template's first sample and modulation set become the templates
    /// that conversion clones for each zone. All samples, modulation sets and
    /// payloads of the template are then dropped.
    pub fn new_from_template(source: &TemplateSource) -> Result<Self> {
        let mut doc = if source.path.is_file() {
            Self::load(&source.path)?
        } else {
            let bundled = source
                .path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| TEMPLATES.get_file(name))
                .ok_or_else(|| Error::MissingTemplate(source.path.clone()))?;
            log::debug!("Using bundled template {}", bundled.path().display());
            Self::from_reader(Cursor::new(bundled.contents()))?
        };

        if doc.samples.is_empty() || doc.modulation_sets.is_empty() {
            return Err(Error::Format(format!(
                "template {} has no sample/modulation set pair",
                source.path.display()
            )));
        }

        let sample = doc.samples.swap_remove(0);
        let modulation_set = doc.modulation_sets.swap_remove(0);
        doc.templates = Some((sample, modulation_set));
        doc.samples.clear();
        doc.modulation_sets.clear();
        doc.payloads.clear();
        Ok(doc)
    }

    /// Write the container to `path`.
    ///
    /// Runs [`cleanup`](Self::cleanup) first unless `cleanup` is false. If the
    /// destination exists and `overwrite` is false, fails with
    /// [`Error::Conflict`] without touching the filesystem. The container is
    /// written to a temporary file next to the destination and renamed into
    /// place, so a failed save never leaves a partial file behind.
    pub fn save(&mut self, path: impl AsRef<Path>, overwrite: bool, cleanup: bool) -> Result<()> {
        let path = path.as_ref();

        if cleanup {
            self.cleanup();
        }

        if path.exists() && !overwrite {
            log::error!(
                "Destination file {} exists and overwrite was not forced",
                path.display()
            );
            return Err(Error::Conflict(path.to_path_buf()));
        }

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir)?;
        self.write_to(tmp.as_file_mut())?;
        tmp.as_file_mut().flush()?;

        if overwrite {
            tmp.persist(path).map_err(|err| Error::Io(err.error))?;
        } else {
            tmp.persist_noclobber(path).map_err(|err| {
                if err.error.kind() == io::ErrorKind::AlreadyExists {
                    Error::Conflict(path.to_path_buf())
                } else {
                    Error::Io(err.error)
                }
            })?;
        }

        log::debug!("Saved instrument {}", path.display());
        Ok(())
    }

    /// Serialize the container into `writer` as it currently stands.
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<()> {
        let mut zip = ZipWriter::new(writer);
        let options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        zip.start_file(INSTRUMENT_XML, options)?;
        zip.write_all(&self.to_element().to_xml()?)?;

        for (idx, payload) in self.payloads.iter().enumerate() {
            let name = payload_entry_name(idx, self.payloads.len(), self.sample_name(idx), payload);
            zip.start_file(name.as_str(), options)?;
            zip.write_all(payload)?;
        }

        zip.finish()?;
        Ok(())
    }

    /// Full XML tree with samples and modulation sets re-inserted.
    pub fn to_element(&self) -> Element {
        let mut root = self.root.clone();
        insert_collection(
            &mut root,
            SAMPLES_PATH,
            self.samples.iter().map(|s| s.element().clone()),
        );
        insert_collection(
            &mut root,
            MODULATION_SETS_PATH,
            self.modulation_sets.iter().map(|m| m.element().clone()),
        );
        root
    }

    /// Clamp note ranges and merge structurally equal modulation sets.
    /// Merge duplicate modulation sets and clamp note ranges.
    pub fn cleanup(&mut self) {
        cleanup::cleanup(&mut self.samples, &mut self.modulation_sets);
    }

    fn sample_name(&self, idx: usize) -> &str {
        self.samples
            .get(idx)
            .and_then(|s| s.name())
            .unwrap_or_default()
    }

    /// Instrument name.
    pub fn name(&self) -> Option<&str> {
        self.root.text_at(&["Name"])
    }

    /// Set the instrument name.
    pub fn set_name(&mut self, name: &str) {
        self.root.set_value_at(&["Name"], name);
    }

    /// Comment lines joined with newlines, or `None` if the instrument has no
    /// comment block.
    pub fn comment(&self) -> Option<String> {
        let comments = self.root.path(&[GLOBAL_PROPERTIES, "Comments"])?;
        let lines: Vec<&str> = comments
            .children_named("Comment")
            .map(|c| c.text.as_str())
            .collect();
        Some(lines.join("\n"))
    }

    /// Replace the comment, storing one element per line.
    pub fn set_comment(&mut self, comment: &str) {
        let comments = self.root.path_or_insert(&[GLOBAL_PROPERTIES, "Comments"]);
        comments.remove_children("Comment");
        comments.children.extend(
            comment
                .split('\n')
                .map(|line| Element::with_text("Comment", line)),
        );
    }

    /// Append `text` as new lines after the existing comment.
    pub fn append_comment(&mut self, text: &str) {
        let comment = match self.comment() {
            Some(existing) => format!("{}\n{}", existing, text),
            None => text.to_string(),
        };
        self.set_comment(&comment);
    }

    /// Remove the comment block entirely.
    pub fn remove_comment(&mut self) {
        if let Some(props) = self.root.child_mut(GLOBAL_PROPERTIES) {
            props.remove_children("Comments");
        }
    }

    /// Tags in document order. Duplicates are kept.
    pub fn tags(&self) -> Vec<String> {
        self.root
            .path(&[GLOBAL_PROPERTIES, "Tags"])
            .map(|tags| tags.children_named("Tag").map(|t| t.text.clone()).collect())
            .unwrap_or_default()
    }

    /// Add a tag after the existing ones.
    pub fn append_tag(&mut self, tag: &str) {
        self.root
            .path_or_insert(&[GLOBAL_PROPERTIES, "Tags"])
            .children
            .push(Element::with_text("Tag", tag));
    }

    /// Remove the first tag equal to `tag`. Returns whether one was removed.
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let Some(tags) = self.root.path_mut(&[GLOBAL_PROPERTIES, "Tags"]) else {
            return false;
        };
        match tags
            .children
            .iter()
            .position(|t| t.tag == "Tag" && t.text == tag)
        {
            Some(pos) => {
                tags.children.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Remove all tags.
    pub fn clear_tags(&mut self) {
        if let Some(props) = self.root.child_mut(GLOBAL_PROPERTIES) {
            props.remove_children("Tags");
        }
    }

    /// How overlapping keyzones are played.
    pub fn overlap_mode(&self) -> Option<OverlapMode> {
        self.root.value_at(OVERLAP_PATH)
    }

    /// Set how overlapping keyzones are played.
    pub fn set_overlap_mode(&mut self, mode: OverlapMode) {
        self.root.set_value_at(OVERLAP_PATH, mode);
    }

    /// Value of the global property whose `Name` is `name`.
    pub fn global_property(&self, name: &str) -> Option<f64> {
        fn find<'a>(el: &'a Element, name: &str) -> Option<&'a Element> {
            el.children.iter().find_map(|child| {
                if child.text_at(&["Name"]) == Some(name) {
                    Some(child)
                } else {
                    find(child, name)
                }
            })
        }
        find(self.root.child(GLOBAL_PROPERTIES)?, name)?.value_at(&["Value"])
    }

    /// Set the value of the global property whose `Name` is `name`.
    ///
    /// Returns false, changing nothing, if no such property exists.
    pub fn set_global_property(&mut self, name: &str, value: f64) -> bool {
        let Some(props) = self.root.child_mut(GLOBAL_PROPERTIES) else {
            return false;
        };
        match props.find_descendant_mut(&|el: &Element| el.text_at(&["Name"]) == Some(name)) {
            Some(property) => {
                property.set_value_at(&["Value"], value);
                true
            }
            None => false,
        }
    }

    /// Keyzones in document order.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn samples_mut(&mut self) -> &mut Vec<Sample> {
        &mut self.samples
    }

    /// Modulation sets, referenced by index from the keyzones.
    pub fn modulation_sets(&self) -> &[ModulationSet] {
        &self.modulation_sets
    }

    pub fn modulation_sets_mut(&mut self) -> &mut Vec<ModulationSet> {
        &mut self.modulation_sets
    }

    /// Audio payloads, one per keyzone.
    pub fn payloads(&self) -> &[Vec<u8>] {
        &self.payloads
    }

    pub fn payloads_mut(&mut self) -> &mut Vec<Vec<u8>> {
        &mut self.payloads
    }

    /// Sample and modulation set templates extracted by
    /// [`new_from_template`](Self::new_from_template).
    pub fn templates(&self) -> Option<(&Sample, &ModulationSet)> {
        self.templates.as_ref().map(|(s, m)| (s, m))
    }

    /// Append one keyzone with its modulation set and audio payload.
    pub fn push_zone(&mut self, sample: Sample, modulation_set: ModulationSet, payload: Vec<u8>) {
        self.samples.push(sample);
        self.modulation_sets.push(modulation_set);
        self.payloads.push(payload);
    }
}

fn insert_collection(root: &mut Element, path: &[&str], items: impl ExactSizeIterator<Item = Element>) {
    if items.len() == 0 && root.path(path).is_none() {
        return;
    }
    root.path_or_insert(path).children.extend(items);
}

/// Guess a payload's file extension from its leading bytes.
///
/// A payload must be longer than its signature to count as flac or ogg;
/// anything else, including empty payloads, is stored as wav.
pub fn audio_extension(payload: &[u8]) -> &'static str {
    const FLAC: &[u8; 8] = b"fLaC\0\0\0\x22";
    const OGG: &[u8; 3] = b"Ogg";
    if payload.len() > FLAC.len() && payload[..FLAC.len()] == FLAC[..] {
        "flac"
    } else if payload.len() > OGG.len() && payload[..OGG.len()] == OGG[..] {
        "ogg"
    } else {
        "wav"
    }
}

/// Archive entry name for payload `idx` of `count`.
///
/// Indices are zero-padded to at least two digits, and wider when there are
/// more than 100 payloads, so that name order equals index order.
fn payload_entry_name(idx: usize, count: usize, sample_name: &str, payload: &[u8]) -> String {
    let width = count.saturating_sub(1).to_string().len().max(2);
    format!(
        "{}/Sample{:0width$} {}.{}",
        SAMPLE_DATA,
        idx,
        sample_name,
        audio_extension(payload),
        width = width
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::FilterType;
    use tempfile::TempDir;

    fn template() -> InstrumentDocument {
        InstrumentDocument::new_from_template(&TemplateSource::default()).unwrap()
    }

    fn zone(doc: &InstrumentDocument, name: &str, attack: f64) -> (Sample, ModulationSet) {
        let (sample, set) = doc.templates().unwrap();
        let mut sample = sample.clone();
        let mut set = set.clone();
        sample.set_name(name);
        set.set_attack(attack);
        (sample, set)
    }

    #[test]
    fn test_bundled_template_is_empty_with_templates() {
        let doc = template();
        assert!(doc.samples().is_empty());
        assert!(doc.modulation_sets().is_empty());
        assert!(doc.payloads().is_empty());
        assert!(doc.templates().is_some());
    }

    #[test]
    fn test_missing_template() {
        let source = TemplateSource::new("/nonexistent/no-such-template.xrni");
        match InstrumentDocument::new_from_template(&source) {
            Err(Error::MissingTemplate(path)) => assert_eq!(path, source.path),
            other => panic!("expected MissingTemplate, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_template_from_filesystem_takes_precedence() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_TEMPLATE);

        let mut custom = template();
        custom.set_name("Custom Template");
        let (sample, set) = zone(&custom, "Seed", 0.5);
        custom.push_zone(sample, set, b"RIFF".to_vec());
        custom.save(&path, false, false).unwrap();

        let doc = InstrumentDocument::new_from_template(&TemplateSource::new(&path)).unwrap();
        assert_eq!(doc.name(), Some("Custom Template"));
        assert_eq!(doc.templates().unwrap().0.name(), Some("Seed"));
        assert!(doc.payloads().is_empty());
    }

    #[test]
    fn test_load_without_instrument_xml_is_format_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.xrni");
        {
            let file = File::create(&path).unwrap();
            let mut zip = ZipWriter::new(file);
            zip.start_file("SampleData/Sample00 a.wav", SimpleFileOptions::default())
                .unwrap();
            zip.write_all(b"RIFF").unwrap();
            zip.finish().unwrap();
        }
        assert!(matches!(
            InstrumentDocument::load(&path),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("piano.xrni");

        let mut doc = template();
        doc.set_name("Piano");
        doc.set_overlap_mode(OverlapMode::Cycle);
        let (mut s1, m1) = zone(&doc, "C3", 0.1);
        let (mut s2, mut m2) = zone(&doc, "C4", 0.1);
        s1.set_modulation_set_index(0);
        s2.set_modulation_set_index(1);
        m2.set_filter_type(FilterType::CleanLp);
        doc.push_zone(s1, m1, b"RIFF....WAVE".to_vec());
        doc.push_zone(s2, m2, b"fLaC\0\0\0\x22rest".to_vec());

        doc.save(&path, false, false).unwrap();
        let loaded = InstrumentDocument::load(&path).unwrap();

        assert_eq!(loaded.name(), Some("Piano"));
        assert_eq!(loaded.overlap_mode(), Some(OverlapMode::Cycle));
        assert_eq!(loaded.samples(), doc.samples());
        assert_eq!(loaded.modulation_sets(), doc.modulation_sets());
        assert_eq!(loaded.payloads(), doc.payloads());
        assert_eq!(loaded.to_element(), doc.to_element());
    }

    #[test]
    fn test_payload_entries_named_by_index_and_format() {
        let mut doc = template();
        for (idx, payload) in [b"OggS".to_vec(), b"RIFF".to_vec()].into_iter().enumerate() {
            let (mut sample, set) = zone(&doc, &format!("Zone{}", idx), 0.0);
            sample.set_modulation_set_index(idx);
            doc.push_zone(sample, set, payload);
        }

        let mut buf = Cursor::new(Vec::new());
        doc.write_to(&mut buf).unwrap();
        let archive = ZipArchive::new(Cursor::new(buf.into_inner())).unwrap();
        let mut names: Vec<&str> = archive.file_names().collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "Instrument.xml",
                "SampleData/Sample00 Zone0.ogg",
                "SampleData/Sample01 Zone1.wav"
            ]
        );
    }

    #[test]
    fn test_payload_index_widens_past_two_digits() {
        assert_eq!(
            payload_entry_name(7, 150, "x", b"RIFF"),
            "SampleData/Sample007 x.wav"
        );
        assert_eq!(
            payload_entry_name(7, 100, "x", b"RIFF"),
            "SampleData/Sample07 x.wav"
        );
    }

    #[test]
    fn test_audio_extension() {
        assert_eq!(audio_extension(b"fLaC\0\0\0\x22...."), "flac");
        assert_eq!(audio_extension(b"OggS...."), "ogg");
        assert_eq!(audio_extension(b"RIFF....WAVE"), "wav");
        assert_eq!(audio_extension(b""), "wav");
    }

    #[test]
    fn test_audio_extension_needs_more_than_signature() {
        assert_eq!(audio_extension(b"fLaC\0\0\0\x22"), "wav");
        assert_eq!(audio_extension(b"fLaC"), "wav");
        assert_eq!(audio_extension(b"Ogg"), "wav");
        assert_eq!(audio_extension(b"Og"), "wav");
        assert_eq!(audio_extension(b"OggS"), "ogg");
    }

    #[test]
    fn test_whitespace_text_survives_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("spaced.xrni");

        let mut doc = template();
        doc.set_name(" ");
        doc.set_comment("a\n   \nb");
        doc.append_tag(" ");
        doc.save(&path, false, false).unwrap();

        let loaded = InstrumentDocument::load(&path).unwrap();
        assert_eq!(loaded.name(), Some(" "));
        assert_eq!(loaded.comment().as_deref(), Some("a\n   \nb"));
        assert_eq!(loaded.tags(), vec![" "]);
        assert_eq!(loaded.to_element(), doc.to_element());
    }

    #[test]
    fn test_save_conflict_leaves_destination_untouched() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("existing.xrni");
        std::fs::write(&path, b"previous contents").unwrap();

        let mut doc = template();
        match doc.save(&path, false, true) {
            Err(Error::Conflict(p)) => assert_eq!(p, path),
            other => panic!("expected Conflict, got {:?}", other),
        }
        assert_eq!(std::fs::read(&path).unwrap(), b"previous contents");
        // No temporary file left behind
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

        doc.save(&path, true, true).unwrap();
        assert!(InstrumentDocument::load(&path).is_ok());
    }

    #[test]
    fn test_comment_lines() {
        let mut doc = template();
        assert_eq!(doc.comment(), None);

        doc.set_comment("first line\nsecond line");
        assert_eq!(doc.comment().as_deref(), Some("first line\nsecond line"));
        assert_eq!(
            doc.root
                .path(&["GlobalProperties", "Comments"])
                .unwrap()
                .children_named("Comment")
                .count(),
            2
        );

        doc.append_comment("third");
        assert_eq!(
            doc.comment().as_deref(),
            Some("first line\nsecond line\nthird")
        );

        doc.remove_comment();
        assert_eq!(doc.comment(), None);
    }

    #[test]
    fn test_tags() {
        let mut doc = template();
        assert!(doc.tags().is_empty());

        doc.append_tag("piano");
        doc.append_tag("bright");
        doc.append_tag("piano");
        assert_eq!(doc.tags(), vec!["piano", "bright", "piano"]);

        assert!(doc.remove_tag("piano"));
        assert_eq!(doc.tags(), vec!["bright", "piano"]);
        assert!(!doc.remove_tag("missing"));

        doc.clear_tags();
        assert!(doc.tags().is_empty());
    }

    #[test]
    fn test_global_property_lookup_by_name() {
        let mut doc = template();
        assert!(doc.set_global_property(crate::convert::REVERB_SEND, 12.5));
        assert_eq!(doc.global_property(crate::convert::REVERB_SEND), Some(12.5));
        assert!(!doc.set_global_property("No Such Property", 1.0));
        assert_eq!(doc.global_property("No Such Property"), None);
    }
}
