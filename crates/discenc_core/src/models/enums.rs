//! Core enums used throughout the pipeline.

use serde::{Deserialize, Serialize};

/// Kind of a subtitle stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubtitleKind {
    /// DVD bitmap subtitles.
    Vobsub,
    /// Line-21 closed captions carried in the video stream.
    ClosedCaption,
    /// Blu-ray bitmap subtitles.
    Pgs,
    #[default]
    Unknown,
}

impl SubtitleKind {
    /// Bitmap subtitles can be burned in and scanned for forced captions.
    pub fn is_picture_based(&self) -> bool {
        matches!(self, SubtitleKind::Vobsub | SubtitleKind::Pgs)
    }

    /// Map a probe listing tag (`VOBSUB`, `CC`, `PGS`, ...) to a kind.
    pub fn from_listing_tag(tag: &str) -> Self {
        match tag.to_ascii_uppercase().as_str() {
            "VOBSUB" => SubtitleKind::Vobsub,
            "CC" | "CC608" | "CC708" => SubtitleKind::ClosedCaption,
            "PGS" => SubtitleKind::Pgs,
            _ => SubtitleKind::Unknown,
        }
    }

    /// Map a container codec name (`dvd_subtitle`, `hdmv_pgs_subtitle`, ...) to a kind.
    pub fn from_codec_name(codec: &str) -> Self {
        match codec {
            "dvd_subtitle" | "dvdsub" => SubtitleKind::Vobsub,
            "hdmv_pgs_subtitle" | "pgssub" => SubtitleKind::Pgs,
            "eia_608" | "cc_dec" => SubtitleKind::ClosedCaption,
            _ => SubtitleKind::Unknown,
        }
    }
}

impl std::fmt::Display for SubtitleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubtitleKind::Vobsub => write!(f, "vobsub"),
            SubtitleKind::ClosedCaption => write!(f, "closed-caption"),
            SubtitleKind::Pgs => write!(f, "pgs"),
            SubtitleKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// Type of media track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackType {
    Video,
    Audio,
    Subtitles,
}

impl std::fmt::Display for TrackType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackType::Video => write!(f, "video"),
            TrackType::Audio => write!(f, "audio"),
            TrackType::Subtitles => write!(f, "subtitles"),
        }
    }
}

/// Status of a job in the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JobStatus {
    #[default]
    Pending,
    Processing,
    Complete,
    Failed,
    /// Skipped because an earlier job halted the batch.
    NotRun,
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Pending => write!(f, "Pending"),
            JobStatus::Processing => write!(f, "Processing"),
            JobStatus::Complete => write!(f, "Complete"),
            JobStatus::Failed => write!(f, "Failed"),
            JobStatus::NotRun => write!(f, "Not run"),
        }
    }
}
