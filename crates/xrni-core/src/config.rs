//! Conversion settings loaded from a TOML file.
//!
//! Every key is optional:
//!
//! ```toml
//! template = "default.xrni"
//! output_dir = "converted"
//! expand_keymap = true
//! show_unused = false
//! overwrite = false
//! encoding = "flac"
//! ```

use crate::convert::ConvertOptions;
use crate::document::{TemplateSource, DEFAULT_TEMPLATE};
use crate::encoder::Encoding;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings shared by the conversion and maintenance commands
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// Template instrument; bundled templates are found by file name
    pub template: PathBuf,
    /// Where converted instruments are written (current directory if unset)
    pub output_dir: Option<PathBuf>,
    /// Stretch keyzones to cover the whole keyboard
    pub expand_keymap: bool,
    /// Report source parameters that could not be converted
    pub show_unused: bool,
    /// Replace existing instruments
    pub overwrite: bool,
    /// Target format when re-encoding payloads
    pub encoding: Encoding,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            template: PathBuf::from(DEFAULT_TEMPLATE),
            output_dir: None,
            expand_keymap: true,
            show_unused: false,
            overwrite: false,
            encoding: Encoding::Flac,
        }
    }
}

impl ConvertConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file not found at {}",
                path.display()
            )));
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: ConvertConfig = toml::from_str(content)?;
        Ok(config)
    }

    pub fn template_source(&self) -> TemplateSource {
        TemplateSource::new(&self.template)
    }

    pub fn convert_options(&self) -> ConvertOptions {
        ConvertOptions {
            expand_keymap: self.expand_keymap,
            overwrite: self.overwrite,
        }
    }

    /// Output directory, defaulting to the current one
    pub fn output_dir(&self) -> &Path {
        self.output_dir.as_deref().unwrap_or_else(|| Path::new(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = ConvertConfig::default();
        assert_eq!(config.template, PathBuf::from("default.xrni"));
        assert!(config.expand_keymap);
        assert!(!config.overwrite);
        assert_eq!(config.encoding, Encoding::Flac);
        assert_eq!(config.output_dir(), Path::new(""));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ConvertConfig::from_toml(
            r#"
            output_dir = "out"
            expand_keymap = false
            encoding = "ogg"
            "#,
        )
        .unwrap();

        assert_eq!(config.output_dir(), Path::new("out"));
        assert!(!config.expand_keymap);
        assert_eq!(config.encoding, Encoding::Ogg);
        assert_eq!(config.template, PathBuf::from(DEFAULT_TEMPLATE));
        assert!(!config.convert_options().expand_keymap);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        assert!(matches!(
            ConvertConfig::from_toml("expand_keymap = \"sometimes\""),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("xrni.toml");
        fs::write(&path, "overwrite = true\ntemplate = \"custom.xrni\"\n").unwrap();

        let config = ConvertConfig::load(&path).unwrap();
        assert!(config.overwrite);
        assert_eq!(config.template_source().path, PathBuf::from("custom.xrni"));

        assert!(ConvertConfig::load(dir.path().join("missing.toml")).is_err());
    }
}
