//! Source scanning.
//!
//! Runs the probe tool against a disc or a directory of container files,
//! parses its output into [`Title`](crate::models::Title)s and keeps them in
//! a [`ScanCatalog`].

mod catalog;
mod directory;
mod disc;
mod parser;
mod types;

#[cfg(test)]
pub(crate) mod fixtures;

pub use catalog::{cache_path, ScanCatalog};
pub use parser::{detect_dialect, parse_scan_output};
pub use types::{Dialect, ParsedScan, ScanError, ScanResult, StreamFlag};
