//! Error types for tardiff

use thiserror::Error;

/// Main error type for tardiff operations
#[derive(Error, Debug)]
pub enum TarDiffError {
    #[error("malformed tar archive: {0}")]
    MalformedTar(String),

    #[error("unexpected end of input: {0}")]
    UnexpectedEndOfInput(String),

    #[error("unsupported delta version: expected magic {expected_magic:?} version {expected_version}, got magic {actual_magic:?} version {actual_version}")]
    UnsupportedDeltaVersion {
        expected_magic: &'static [u8],
        expected_version: u8,
        actual_magic: Vec<u8>,
        actual_version: u8,
    },

    #[error("unknown opcode tag: {0:#x}")]
    UnknownOpcode(u8),

    #[error("data source could not resolve reference {reference}: {detail}")]
    DataSourceMiss { reference: String, detail: String },

    #[error("bsdiff control stream inconsistent: {0}")]
    BsdiffFailure(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid option: {0}")]
    InvalidOption(String),
}

/// Result type alias for tardiff operations
pub type Result<T> = std::result::Result<T, TarDiffError>;
