use crate::parser::error::Error;
use crate::parser::types::{SfzFile, SfzSection, SfzSectionType};

/// Result type alias for parser functions
type Result<T> = std::result::Result<T, Error>;

/// Parse an SFZ file from a string
///
/// # SFZ File Format
///
/// 1. **Section headers**: enclosed in angle brackets, like `<region>`
/// 2. **Opcodes**: `name=value` pairs, several per line allowed
/// 3. **Comments**: everything after `//` on a line
///
/// Headers and opcodes may share a line (`<region> sample=a.wav key=60`).
/// Values may contain spaces: a value runs until the next `name=` token, so
/// `sample=Grand Piano C4.wav lokey=60` yields the file `Grand Piano C4.wav`.
///
/// Unknown section headers are skipped together with their opcodes.
pub fn parse_sfz(content: &str) -> Result<SfzFile> {
    let mut builder = Builder::default();

    for (idx, raw_line) in content.lines().enumerate() {
        let line_no = idx + 1;
        let line = strip_comment(raw_line);
        let mut rest = line.trim_start();

        while !rest.is_empty() {
            let column = line.len() - rest.len() + 1;
            if let Some(after) = rest.strip_prefix('<') {
                let end = after.find('>').ok_or_else(|| Error::ParseAt {
                    line: line_no,
                    column,
                    message: "unterminated section header".to_string(),
                })?;
                builder.open_section(&after[..end], line_no);
                rest = after[end + 1..].trim_start();
            } else {
                let end = rest.find('<').unwrap_or(rest.len());
                builder.add_opcodes(&rest[..end], line_no);
                rest = rest[end..].trim_start();
            }
        }
    }

    Ok(builder.finish())
}

fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(pos) => &line[..pos],
        None => line,
    }
}

/// Split `a=1 b=two words c=3` into name/value pairs.
fn split_opcodes(text: &str) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = Vec::new();
    for token in text.split_whitespace() {
        match token.split_once('=') {
            Some((name, value)) if !name.is_empty() => {
                pairs.push((name.to_string(), value.to_string()));
            }
            _ => {
                if let Some((_, value)) = pairs.last_mut() {
                    value.push(' ');
                    value.push_str(token);
                }
            }
        }
    }
    pairs
}

#[derive(Default)]
struct Builder {
    sfz: SfzFile,
    current: Option<SfzSection>,
    master: Option<SfzSection>,
    group: Option<SfzSection>,
}

impl Builder {
    fn open_section(&mut self, header: &str, line: usize) {
        self.close_section();
        match SfzSectionType::from_header(header) {
            Some(section_type) => {
                let mut section = SfzSection::new(section_type);
                section.line = line;
                self.current = Some(section);
            }
            None => log::warn!("Skipping unknown section <{}> at line {}", header.trim(), line),
        }
    }

    fn add_opcodes(&mut self, text: &str, line: usize) {
        let pairs = split_opcodes(text);
        match self.current.as_mut() {
            Some(section) => {
                for (name, value) in pairs {
                    section.add_opcode(name, value);
                }
            }
            None if !pairs.is_empty() => {
                log::debug!("Ignoring opcodes outside a known section at line {}", line)
            }
            None => {}
        }
    }

    fn close_section(&mut self) {
        let Some(mut section) = self.current.take() else {
            return;
        };

        match section.section_type {
            SfzSectionType::Global => merge_into(&mut self.sfz.global, section),
            SfzSectionType::Control => merge_into(&mut self.sfz.control, section),
            SfzSectionType::Master => {
                self.group = None;
                self.master = Some(section.clone());
                self.sfz.masters.push(section);
            }
            SfzSectionType::Group => {
                if let Some(master) = &self.master {
                    section.inherit_from(master);
                }
                self.group = Some(section.clone());
                self.sfz.groups.push(section);
            }
            SfzSectionType::Region => {
                if let Some(group) = &self.group {
                    section.inherit_from(group);
                }
                if let Some(master) = &self.master {
                    section.inherit_from(master);
                }
                self.sfz.regions.push(section);
            }
            SfzSectionType::Curve => self.sfz.curves.push(section),
            SfzSectionType::Effect => self.sfz.effects.push(section),
        }
    }

    fn finish(mut self) -> SfzFile {
        self.close_section();
        self.sfz
    }
}

fn merge_into(slot: &mut Option<SfzSection>, section: SfzSection) {
    match slot {
        Some(existing) => existing.opcodes.extend(section.opcodes),
        None => *slot = Some(section),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_sfz() {
        let content = r#"
        <control>
        default_path=samples/piano/

        <global>
        volume=0

        <region>
        sample=piano_C3.wav
        key=60
        "#;

        let sfz = parse_sfz(content).expect("Failed to parse SFZ");

        assert_eq!(sfz.get_default_path(), Some("samples/piano/"));
        assert_eq!(sfz.global.as_ref().unwrap().get_opcode_str("volume"), Some("0"));
        assert_eq!(sfz.regions.len(), 1);

        let region = &sfz.regions[0];
        assert_eq!(region.get_opcode_str("sample"), Some("piano_C3.wav"));
        assert_eq!(region.get_opcode_str("key"), Some("60"));
        // Global opcodes stay on the global section
        assert_eq!(region.get_opcode_str("volume"), None);
    }

    #[test]
    fn test_inline_headers_and_multiple_opcodes() {
        let content = "<group> lovel=0 hivel=63\n<region> sample=a.wav lokey=36 hikey=47 // low\n<region>sample=b.wav key=48";
        let sfz = parse_sfz(content).unwrap();

        assert_eq!(sfz.regions.len(), 2);
        assert_eq!(sfz.regions[0].get_opcode_str("hikey"), Some("47"));
        assert_eq!(sfz.regions[0].get_opcode_str("hivel"), Some("63"));
        assert_eq!(sfz.regions[1].get_opcode_str("sample"), Some("b.wav"));
        assert_eq!(sfz.regions[1].line, 3);
    }

    #[test]
    fn test_values_with_spaces() {
        let sfz = parse_sfz("<region> sample=Grand Piano C4.wav lokey=60").unwrap();
        assert_eq!(
            sfz.regions[0].get_opcode_str("sample"),
            Some("Grand Piano C4.wav")
        );
        assert_eq!(sfz.regions[0].get_opcode_str("lokey"), Some("60"));
    }

    #[test]
    fn test_more_specific_section_wins() {
        let content = r#"
        <master> volume=-12 pan=10
        <group> volume=-6
        <region> sample=a.wav
        <region> sample=b.wav volume=-3
        <master> volume=-1
        <region> sample=c.wav
        "#;
        let sfz = parse_sfz(content).unwrap();

        let volumes: Vec<_> = sfz
            .regions
            .iter()
            .map(|r| r.get_opcode_str("volume"))
            .collect();
        assert_eq!(volumes, vec![Some("-6"), Some("-3"), Some("-1")]);
        assert_eq!(sfz.regions[0].get_opcode_str("pan"), Some("10"));
        // A new master ends the previous group
        assert_eq!(sfz.regions[2].get_opcode_str("pan"), None);
    }

    #[test]
    fn test_unknown_section_is_skipped() {
        let sfz = parse_sfz("<midi> foo=1\n<region> sample=a.wav").unwrap();
        assert_eq!(sfz.regions.len(), 1);
        assert_eq!(sfz.regions[0].get_opcode_str("foo"), None);
    }

    #[test]
    fn test_unterminated_header() {
        match parse_sfz("\n  <region sample=a.wav") {
            Err(Error::ParseAt { line, column, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(column, 3);
            }
            other => panic!("expected ParseAt, got {:?}", other),
        }
    }
}
