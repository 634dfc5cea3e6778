use std::io;
use thiserror::Error;

/// Errors that can occur during SFZ parsing
///
/// Opcode lookups fail with [`Error::MissingOpcode`] or
/// [`Error::InvalidOpcodeValue`]; callers that treat absent or malformed
/// opcodes as "use the default" simply discard these.
#[derive(Error, Debug)]
pub enum Error {
    /// Input/Output error when reading files
    #[error("IO error: {0}")]
    IO(#[from] io::Error),

    /// Parse error for general syntax problems
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid opcode value for a particular type
    ///
    /// For example `key=foo`, where a note number or name is expected.
    #[error("Invalid value '{0}' for type {1}")]
    InvalidOpcodeValue(String, String),

    /// Missing opcode
    #[error("Opcode '{0}' not found")]
    MissingOpcode(String),

    /// Detailed parse error with line and column information
    #[error("Failed to parse SFZ at line {line}, column {column}: {message}")]
    ParseAt {
        /// Line number where the error occurred (1-based)
        line: usize,
        /// Column position where the error occurred (1-based)
        column: usize,
        /// Error message describing the problem
        message: String,
    },
}
