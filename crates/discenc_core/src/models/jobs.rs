//! Job-related data structures (track selections, encode jobs).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// One requested track and an optional name for this job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackRequest {
    /// Track order as listed by the probe.
    pub track_number: u32,
    /// Empty means "keep the stream's own name".
    #[serde(default)]
    pub override_name: String,
}

impl TrackRequest {
    pub fn new(track_number: u32, override_name: impl Into<String>) -> Self {
        Self {
            track_number,
            override_name: override_name.into(),
        }
    }
}

/// Ordered list of requested tracks of one type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrackSelection {
    requests: Vec<TrackRequest>,
}

impl TrackSelection {
    /// Empty selection (the default policy applies).
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(track_number, override_name)` pairs.
    pub fn from_pairs<S: Into<String>>(pairs: impl IntoIterator<Item = (u32, S)>) -> Self {
        Self {
            requests: pairs
                .into_iter()
                .map(|(number, name)| TrackRequest::new(number, name))
                .collect(),
        }
    }

    pub fn push(&mut self, track_number: u32, override_name: impl Into<String>) {
        self.requests
            .push(TrackRequest::new(track_number, override_name));
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackRequest> {
        self.requests.iter()
    }
}

/// One title to encode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodeJob {
    /// User-facing title number.
    pub user_number: u32,
    #[serde(default)]
    pub audio: TrackSelection,
    #[serde(default)]
    pub subtitles: TrackSelection,
    pub output: PathBuf,
    #[serde(default)]
    pub is_bonus_feature: bool,
    /// Per-job target width for high-definition titles.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width_override: Option<u32>,
    /// Container title; defaults to the output file stem.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_title: Option<String>,
}

impl EncodeJob {
    pub fn new(user_number: u32, output: impl Into<PathBuf>) -> Self {
        Self {
            user_number,
            audio: TrackSelection::new(),
            subtitles: TrackSelection::new(),
            output: output.into(),
            is_bonus_feature: false,
            width_override: None,
            container_title: None,
        }
    }

    pub fn with_audio(mut self, audio: TrackSelection) -> Self {
        self.audio = audio;
        self
    }

    pub fn with_subtitles(mut self, subtitles: TrackSelection) -> Self {
        self.subtitles = subtitles;
        self
    }

    pub fn bonus(mut self) -> Self {
        self.is_bonus_feature = true;
        self
    }

    pub fn with_width(mut self, width: u32) -> Self {
        self.width_override = Some(width);
        self
    }

    pub fn with_container_title(mut self, title: impl Into<String>) -> Self {
        self.container_title = Some(title.into());
        self
    }

    /// Name used for the job's log file.
    pub fn name(&self) -> String {
        match self.output.file_stem() {
            Some(stem) => format!("title_{:02}_{}", self.user_number, stem.to_string_lossy()),
            None => format!("title_{:02}", self.user_number),
        }
    }

    /// Effective container title.
    pub fn effective_container_title(&self) -> String {
        self.container_title
            .clone()
            .unwrap_or_else(|| file_stem(&self.output))
    }

    /// Whether the output is a Matroska file.
    pub fn is_matroska_output(&self) -> bool {
        self.output
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("mkv"))
            .unwrap_or(false)
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}
