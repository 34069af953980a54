//! Error types for encoding.

use std::io;

use thiserror::Error;

use crate::runner::ToolError;
use crate::scan::ScanError;

/// Errors from building or running an encode.
#[derive(Error, Debug)]
pub enum EncodeError {
    /// Standard-definition title with a display aspect we cannot map.
    #[error("Title {title}: unsupported display aspect '{aspect}'")]
    UnsupportedAspect { title: u32, aspect: String },

    /// The encoder printed an unrecoverable error.
    #[error("Title {title}: encoder error: {message}")]
    EncodeFatal {
        title: u32,
        message: String,
        line: String,
    },

    /// The encoder finished with a non-zero result.
    #[error("Title {title}: encoder finished with code {code}")]
    EncodeFailed { title: u32, code: i32 },

    /// The analyzer produced fewer measurements than files.
    #[error("Loudness analysis returned {found} value(s) for {expected} track(s)")]
    GainAnalysis { expected: usize, found: usize },

    #[error("Unreadable loudness value in '{line}'")]
    GainParse { line: String },

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Scan(#[from] ScanError),
}

impl EncodeError {
    pub fn unsupported_aspect(title: u32, aspect: impl Into<String>) -> Self {
        Self::UnsupportedAspect {
            title,
            aspect: aspect.into(),
        }
    }

    pub fn fatal(title: u32, message: impl Into<String>, line: impl Into<String>) -> Self {
        Self::EncodeFatal {
            title,
            message: message.into(),
            line: line.into(),
        }
    }

    pub fn failed(title: u32, code: i32) -> Self {
        Self::EncodeFailed { title, code }
    }

    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Fatal encoder errors stop the rest of the batch.
    pub fn halts_batch(&self) -> bool {
        matches!(self, Self::EncodeFatal { .. })
    }
}

/// Result type for encode operations.
pub type EncodeResult<T> = Result<T, EncodeError>;
