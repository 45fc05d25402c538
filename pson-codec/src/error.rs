//! Codec error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while encoding or decoding PSON.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("illegal type at offset {offset}: {tag:#04x}")]
    MalformedTag { tag: u8, offset: usize },

    #[error("buffer underrun at offset {offset}: need {needed} bytes, {remaining} remaining")]
    Underrun {
        needed: usize,
        remaining: usize,
        offset: usize,
    },

    #[error("invalid varint at offset {offset}")]
    InvalidVarint { offset: usize },

    #[error("invalid UTF-8 in string at offset {offset}")]
    InvalidUtf8 { offset: usize },

    #[error("dictionary index {index} out of range (dictionary holds {len}) at offset {offset}")]
    DictionaryIndexOutOfRange {
        index: u32,
        len: usize,
        offset: usize,
    },

    #[error("nesting depth exceeds limit of {max}")]
    DepthLimitExceeded { max: usize },

    #[error("length too large for the wire format: {len}")]
    LengthTooLarge { len: usize },

    #[error("dictionary is full")]
    DictionaryFull,

    #[error("trailing data after value: {remaining} bytes")]
    TrailingBytes { remaining: usize },

    #[error("unsupported value: {0}")]
    UnsupportedValue(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CodecError {
    /// Returns whether this error was caused by a corrupt or hostile byte stream
    /// rather than by the caller's input.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            CodecError::MalformedTag { .. }
                | CodecError::Underrun { .. }
                | CodecError::InvalidVarint { .. }
                | CodecError::InvalidUtf8 { .. }
                | CodecError::DictionaryIndexOutOfRange { .. }
                | CodecError::TrailingBytes { .. }
        )
    }
}

/// Errors raised while loading codec configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to parse {0}: {1}")]
    Parse(PathBuf, String),

    #[error("invalid dictionary file {0}: {1}")]
    Dictionary(PathBuf, String),

    #[error("invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
