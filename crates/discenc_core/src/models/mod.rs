//! Data models for discenc.
//!
//! This module contains the core data structures used throughout the pipeline:
//! - Enums for subtitle kinds, track types, job status
//! - Media structures (titles, audio and subtitle streams, crop)
//! - Job structures (track selections, encode jobs)

mod enums;
mod jobs;
mod media;

// Re-export all public types
pub use enums::{JobStatus, SubtitleKind, TrackType};
pub use jobs::{EncodeJob, TrackRequest, TrackSelection};
pub use media::{AudioStream, Crop, Stream, SubtitleStream, Title, UNMATCHED_NATIVE_ID};
