//! discenc core - scan-and-transcode pipeline for discs and container directories
//!
//! This crate holds all pipeline logic with zero UI dependencies: probe
//! output parsing, track selection, encoder command building, loudness
//! normalization, encoder supervision and post-encode track naming.

pub mod config;
pub mod encode;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod runner;
pub mod scan;
pub mod select;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
