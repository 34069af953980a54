//! Media-related data structures (titles and their streams).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::enums::SubtitleKind;

/// Native id of a stream that was never matched to a player track.
pub const UNMATCHED_NATIVE_ID: i32 = -1;

/// Fields shared by audio and subtitle streams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stream {
    /// 1-based position within its track-type list.
    pub order: u32,
    /// Underlying player track index, `-1` when never matched.
    pub native_id: i32,
    /// Language code (ISO 639-2).
    #[serde(default = "default_lang")]
    pub language_code: String,
    /// Raw 3-letter tag as reported by the probe.
    #[serde(default)]
    pub three_cc: String,
    #[serde(default)]
    pub name: String,
}

fn default_lang() -> String {
    "unknown".to_string()
}

impl Stream {
    /// Create a stream at the given order with no native id.
    pub fn new(order: u32) -> Self {
        Self {
            order,
            native_id: UNMATCHED_NATIVE_ID,
            language_code: default_lang(),
            three_cc: String::new(),
            name: String::new(),
        }
    }

    /// Set the native id.
    pub fn with_native_id(mut self, native_id: i32) -> Self {
        self.native_id = native_id;
        self
    }

    /// Set the language code and the raw tag together.
    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        let lang = lang.into();
        self.three_cc = lang.clone();
        self.language_code = lang;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Whether the stream was matched to a player track.
    pub fn is_matched(&self) -> bool {
        self.native_id >= 0
    }
}

/// An audio stream of a title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioStream {
    #[serde(flatten)]
    pub stream: Stream,
    #[serde(default)]
    pub sample_rate_hz: u32,
    #[serde(default)]
    pub bitrate_bps: u32,
    #[serde(default)]
    pub codec: String,
}

impl AudioStream {
    pub fn new(stream: Stream) -> Self {
        Self {
            stream,
            sample_rate_hz: 0,
            bitrate_bps: 0,
            codec: String::new(),
        }
    }
}

/// A subtitle stream of a title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleStream {
    #[serde(flatten)]
    pub stream: Stream,
    #[serde(default)]
    pub kind: SubtitleKind,
}

impl SubtitleStream {
    pub fn new(stream: Stream, kind: SubtitleKind) -> Self {
        Self { stream, kind }
    }

    pub fn is_closed_caption(&self) -> bool {
        self.kind == SubtitleKind::ClosedCaption
    }

    /// Picture-based subtitles and forced tracks can be burned in.
    pub fn is_burnable(&self) -> bool {
        self.kind.is_picture_based() || self.stream.name.to_lowercase().contains("forced")
    }
}

/// Crop edges in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crop {
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}

impl Crop {
    pub fn new(top: u32, bottom: u32, left: u32, right: u32) -> Self {
        Self {
            top,
            bottom,
            left,
            right,
        }
    }

    /// Parse `T:B:L:R` or `T/B/L/R`.
    pub fn parse(value: &str) -> Option<Self> {
        let parts: Vec<u32> = value
            .trim()
            .split(|c| c == ':' || c == '/')
            .map(|p| p.trim().parse().ok())
            .collect::<Option<Vec<_>>>()?;

        match parts.as_slice() {
            [top, bottom, left, right] => Some(Self::new(*top, *bottom, *left, *right)),
            _ => None,
        }
    }

    /// The `--crop` argument form.
    pub fn to_arg(&self) -> String {
        format!("{}:{}:{}:{}", self.top, self.bottom, self.left, self.right)
    }
}

impl std::fmt::Display for Crop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}/{}", self.top, self.bottom, self.left, self.right)
    }
}

/// One playable program of a source: a disc title or a container file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Title {
    /// Probe-assigned number.
    pub number: u32,
    /// Stable number recovered from on-disk naming; defaults to `number`.
    pub user_number: u32,
    #[serde(default)]
    pub is_main_feature: bool,
    /// File of this title relative to the source directory (empty for discs).
    #[serde(default)]
    pub relative_path: PathBuf,
    /// Disc only, `-1` otherwise.
    pub video_title_set: i32,
    #[serde(default)]
    pub duration_minutes: u32,
    #[serde(default)]
    pub pixel_width: u32,
    #[serde(default)]
    pub pixel_height: u32,
    /// Pixel aspect as reported, e.g. `"32/27"`.
    #[serde(default)]
    pub pixel_aspect: String,
    /// Display aspect as reported, e.g. `"1.78"` or `"16x9"`.
    #[serde(default)]
    pub display_aspect: String,
    #[serde(default)]
    pub frame_rate: f64,
    /// Detected crop, all zeros when none was detected.
    #[serde(default)]
    pub autocrop: Crop,
    #[serde(default)]
    pub audio_streams: Vec<AudioStream>,
    #[serde(default)]
    pub subtitle_streams: Vec<SubtitleStream>,
}

impl Title {
    /// Create an empty title with the given probe number.
    pub fn new(number: u32) -> Self {
        Self {
            number,
            user_number: number,
            is_main_feature: false,
            relative_path: PathBuf::new(),
            video_title_set: -1,
            duration_minutes: 0,
            pixel_width: 0,
            pixel_height: 0,
            pixel_aspect: String::new(),
            display_aspect: String::new(),
            frame_rate: 0.0,
            autocrop: Crop::default(),
            audio_streams: Vec::new(),
            subtitle_streams: Vec::new(),
        }
    }

    /// A title without a known width is never encoded.
    pub fn is_valid(&self) -> bool {
        self.pixel_width > 0
    }

    /// The foreign-audio scan only works on bitmap subtitles.
    pub fn supports_subtitle_scan(&self) -> bool {
        self.subtitle_streams
            .iter()
            .any(|s| s.kind.is_picture_based())
    }

    /// Whether this title is a file inside a source directory.
    pub fn is_file_title(&self) -> bool {
        !self.relative_path.as_os_str().is_empty()
    }

    /// File a tool should open for this title: the title's own file inside a
    /// source directory, the source itself for discs.
    pub fn input_path(&self, source: &Path) -> PathBuf {
        if self.is_file_title() {
            source.join(&self.relative_path)
        } else {
            source.to_path_buf()
        }
    }

    /// Title number to pass along with [`Title::input_path`]; a file opened on
    /// its own always holds a single title.
    pub fn input_title_number(&self) -> u32 {
        if self.is_file_title() {
            1
        } else {
            self.number
        }
    }

    pub fn has_streams(&self) -> bool {
        !self.audio_streams.is_empty() || !self.subtitle_streams.is_empty()
    }

    pub fn audio_by_order(&self, order: u32) -> Option<&AudioStream> {
        self.audio_streams.iter().find(|a| a.stream.order == order)
    }

    pub fn subtitle_by_order(&self, order: u32) -> Option<&SubtitleStream> {
        self.subtitle_streams.iter().find(|s| s.stream.order == order)
    }

    /// The closed-caption stream, if the title carries one.
    pub fn closed_caption(&self) -> Option<&SubtitleStream> {
        self.subtitle_streams.iter().find(|s| s.is_closed_caption())
    }

    /// Next free audio order.
    pub fn next_audio_order(&self) -> u32 {
        self.audio_streams
            .iter()
            .map(|a| a.stream.order)
            .max()
            .unwrap_or(0)
            + 1
    }

    /// Next free subtitle order.
    pub fn next_subtitle_order(&self) -> u32 {
        self.subtitle_streams
            .iter()
            .map(|s| s.stream.order)
            .max()
            .unwrap_or(0)
            + 1
    }

    /// Drop unmatched streams and renumber audio from 1.
    ///
    /// Closed captions survive without a native id; subtitle orders are kept
    /// so selections still match the probe listing.
    pub fn clean_streams(&mut self) {
        self.audio_streams.retain(|a| a.stream.is_matched());
        for (index, audio) in self.audio_streams.iter_mut().enumerate() {
            audio.stream.order = index as u32 + 1;
        }

        self.subtitle_streams
            .retain(|s| s.is_closed_caption() || s.stream.is_matched());
    }

    /// Short description for logs.
    pub fn display_name(&self) -> String {
        let main = if self.is_main_feature { " (main feature)" } else { "" };
        format!(
            "Title {} [{}x{}, {} min]{}",
            self.user_number, self.pixel_width, self.pixel_height, self.duration_minutes, main
        )
    }
}
