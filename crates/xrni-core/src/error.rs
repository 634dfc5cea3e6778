//! Error types for xrni-core.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for xrni-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading, converting or saving an instrument
#[derive(Debug, Error)]
pub enum Error {
    /// The container could be opened but is not a usable instrument.
    ///
    /// Raised when the archive has no `Instrument.xml` entry, or when a
    /// template lacks the sample/modulation set pair it is expected to carry.
    #[error("Invalid instrument container: {0}")]
    Format(String),

    /// The destination exists and overwriting was not requested
    #[error("Destination {} exists and overwrite was not forced", .0.display())]
    Conflict(PathBuf),

    /// Neither the template file nor a bundled resource of that name exists
    #[error("Instrument template not found: {}", .0.display())]
    MissingTemplate(PathBuf),

    /// A zone references a sample file that could not be located
    #[error("Sample file not found: {}", .0.display())]
    MissingSampleFile(PathBuf),

    /// The external audio encoder failed
    #[error("Audio encoding to {encoding} failed: {message}")]
    Encoding {
        /// Target encoding name
        encoding: String,
        /// What went wrong
        message: String,
    },

    /// XML parse or write error
    #[error("XML error: {0}")]
    Xml(String),

    /// WAV export of bank samples failed
    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    /// Zip archive error
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::Xml(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}
