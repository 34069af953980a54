//! Batch driver.
//!
//! Runs a queue of [`EncodeJob`](crate::models::EncodeJob)s against one
//! scanned source, one job at a time, and collects a [`BatchReport`].
//!
//! # Example
//!
//! ```ignore
//! use discenc_core::orchestrator::QueueProcessor;
//!
//! let catalog = ScanCatalog::scan(&source, &settings, runner.as_ref())?;
//! let processor = QueueProcessor::new(settings, runner, log_dir, work_dir);
//! let report = processor.process_queue(&catalog, &jobs, |_| None);
//! println!("{} complete, {} failed", report.completed(), report.failed());
//! ```

mod errors;
mod queue_processor;

pub use errors::{BatchError, BatchResult};
pub use queue_processor::{BatchReport, JobResult, QueueProcessor};
