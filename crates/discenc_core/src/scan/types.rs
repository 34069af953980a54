//! Types for scan parsing and the title catalog.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::models::Title;
use crate::runner::ToolError;

/// Errors from scanning a source.
#[derive(Error, Debug)]
pub enum ScanError {
    /// No dialect marker found anywhere in the probe output.
    #[error("Unrecognized scan output: no disc or container marker found")]
    UnrecognizedDialect,

    /// A numeric field inside a recognized line could not be parsed.
    #[error("Malformed {field} on scan line {line_number}: '{line}'")]
    ParseField {
        line_number: usize,
        field: String,
        line: String,
    },

    #[error("No title with number {user_number}")]
    UnknownTitle { user_number: u32 },

    /// Title has no usable video dimensions.
    #[error("Title {number} has no valid video stream")]
    InvalidTitle { number: u32 },

    #[error("Probe failed: {0}")]
    Tool(#[from] ToolError),

    #[error("Scan cache error at {}: {source}", path.display())]
    Cache {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ScanError {
    pub fn parse_field(line_number: usize, field: impl Into<String>, line: &str) -> Self {
        Self::ParseField {
            line_number,
            field: field.into(),
            line: line.to_string(),
        }
    }

    pub fn unknown_title(user_number: u32) -> Self {
        Self::UnknownTitle { user_number }
    }

    pub fn invalid_title(number: u32) -> Self {
        Self::InvalidTitle { number }
    }

    pub fn cache(path: &Path, source: io::Error) -> Self {
        Self::Cache {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result type for scan operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Output dialect of the probe tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Optical disc (DVD/BD structure).
    Disc,
    /// Directory of container files.
    Directory,
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::Disc => write!(f, "disc"),
            Dialect::Directory => write!(f, "directory"),
        }
    }
}

/// Which stream list the parser is currently filling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamFlag {
    #[default]
    None,
    Audio,
    Subtitle,
}

/// Result of parsing one probe output.
#[derive(Debug, Clone, Serialize)]
pub struct ParsedScan {
    pub dialect: Dialect,
    /// Title count announced by the probe (directory sources: titles found).
    pub num_titles: u32,
    pub titles: BTreeMap<u32, Title>,
    /// Non-fatal oddities met while parsing.
    pub warnings: Vec<String>,
}

impl ParsedScan {
    /// Rewrite title paths relative to the source directory.
    pub fn relativize_paths(&mut self, source: &Path) {
        for title in self.titles.values_mut() {
            if let Ok(relative) = title.relative_path.strip_prefix(source) {
                title.relative_path = relative.to_path_buf();
            }
        }
    }
}
