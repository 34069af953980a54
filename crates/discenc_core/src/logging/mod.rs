//! Logging infrastructure for the scan-and-transcode pipeline.
//!
//! This module provides:
//! - Per-job loggers with file + callback dual output
//! - Compact mode that keeps tool chatter out of the log unless a job fails
//! - Tail buffer for error diagnosis
//! - Integration with the `tracing` ecosystem
//!
//! Components that work on behalf of a job (encoder, gain pipeline, track
//! renamer) receive an `Arc<JobLogger>` at construction. Code that runs
//! outside a job (scan parsing, catalog loading) logs through `tracing`.
//!
//! # Example
//!
//! ```no_run
//! use discenc_core::logging::{JobLogger, LogConfig};
//!
//! let logger = JobLogger::new("title_02", "/path/to/logs", LogConfig::default(), None).unwrap();
//!
//! logger.phase("Encode");
//! logger.command("HandBrakeCLI --encoder x264 ...");
//! logger.success("Job completed");
//! ```

mod job_logger;
mod types;

pub use job_logger::JobLogger;
pub use types::{GuiLogCallback, LogConfig, LogLevel, MessagePrefix};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize global tracing subscriber for application-wide logging.
///
/// Respects `RUST_LOG` and falls back to `default_level`. Should be called
/// once at application startup.
pub fn init_tracing(default_level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_to_filter_str(default_level)));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_thread_ids(false))
        .with(filter)
        .init();
}

/// Initialize tracing for tests (only logs warnings and above).
#[cfg(test)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}

fn level_to_filter_str(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Trace => "trace",
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warn => "warn",
        LogLevel::Error => "error",
    }
}
