//! Probe output parsing.
//!
//! The probe prints an unstructured log whose shape depends on the source:
//! optical discs produce one dialect, directories of container files another.
//! [`detect_dialect`] sniffs the dialect from marker lines, then the matching
//! step function from [`REGISTRY`] is applied to every line with an explicit
//! [`ParserState`] carrying the cross-line context.
//!
//! Summary lines (`+ title N:`, `+ size: ...`, track listings) are shared by
//! both dialects and handled here.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::types::{Dialect, ParsedScan, ScanError, ScanResult, StreamFlag};
use super::{directory, disc};
use crate::models::{AudioStream, Crop, Stream, SubtitleKind, SubtitleStream, Title};

static TIMESTAMP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[\d{2}:\d{2}:\d{2}\]\s?").expect("Valid regex"));

static BOUNDARY_PREVIEW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^scan: (?:scanning title|decoding previews for title) (\d+)")
        .expect("Valid regex")
});

static BOUNDARY_SUMMARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+ title (\d+):").expect("Valid regex"));

static MAIN_FEATURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+ Main Feature").expect("Valid regex"));

static VTS_SUMMARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+ vts (\d+), ttn (\d+)").expect("Valid regex"));

static DURATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+ duration: (\d+):(\d+):(\d+)").expect("Valid regex"));

static SIZE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\+ size: (\d+)x(\d+), pixel aspect: (\d+)/(\d+), display aspect: ([\w.:]+), ([\d.]+) fps",
    )
    .expect("Valid regex")
});

static AUTOCROP_SUMMARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+ autocrop: (\d+)/(\d+)/(\d+)/(\d+)").expect("Valid regex")
});

static SECTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+ (chapters|audio tracks|subtitle tracks):").expect("Valid regex")
});

static AUDIO_LISTING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+ (\d+), (.*?) \(iso639-2: (\w+)\), (\d+)Hz(?:, (\d+)bps)?")
        .expect("Valid regex")
});

static SUBTITLE_LISTING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\+ (\d+), (.*?) \(iso639-2: (\w+)\)(?: \((\w+)\)\((\w+)\))?")
        .expect("Valid regex")
});

static CODEC_IN_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(([^)]+)\)").expect("Valid regex"));

/// A dialect's marker test, line step and post-parse hook.
pub(crate) struct DialectEntry {
    pub dialect: Dialect,
    pub is_marker: fn(&str) -> bool,
    pub step: fn(&mut ParserState, &Line<'_>) -> ScanResult<()>,
    pub finish: fn(&mut ParserState),
}

/// Dialects in detection order.
pub(crate) const REGISTRY: [DialectEntry; 2] = [
    DialectEntry {
        dialect: Dialect::Disc,
        is_marker: disc::is_marker,
        step: disc::step,
        finish: disc::finish,
    },
    DialectEntry {
        dialect: Dialect::Directory,
        is_marker: directory::is_marker,
        step: directory::step,
        finish: directory::finish,
    },
];

/// One normalized input line with its 1-based position.
pub(crate) struct Line<'a> {
    pub number: usize,
    pub text: &'a str,
}

impl Line<'_> {
    /// Parse capture group `index` as a number, failing with `ParseField`.
    pub fn num<T: FromStr>(&self, caps: &Captures<'_>, index: usize, field: &str) -> ScanResult<T> {
        caps.get(index)
            .and_then(|m| m.as_str().parse().ok())
            .ok_or_else(|| ScanError::parse_field(self.number, field, self.text))
    }

    /// Like [`Line::num`] but an absent group yields `None`.
    pub fn opt_num<T: FromStr>(
        &self,
        caps: &Captures<'_>,
        index: usize,
        field: &str,
    ) -> ScanResult<Option<T>> {
        match caps.get(index) {
            Some(_) => self.num(caps, index, field).map(Some),
            None => Ok(None),
        }
    }
}

/// A container input announced by the probe whose streams are not yet
/// attached to a title.
#[derive(Debug, Clone, Default)]
pub(crate) struct PendingInput {
    pub path: String,
    pub audio: Vec<AudioStream>,
    pub subtitles: Vec<SubtitleStream>,
}

/// Cross-line parsing context.
#[derive(Debug)]
pub(crate) struct ParserState {
    pub titles: BTreeMap<u32, Title>,
    pub num_titles: u32,
    /// Key into `titles`.
    pub current_title: Option<u32>,
    pub flag: StreamFlag,
    /// Order of the stream being refined (disc only).
    pub current_stream: Option<u32>,
    /// Directory only.
    pub pending_input: Option<PendingInput>,
    pub seen_marker: bool,
    pub warnings: Vec<String>,
}

impl ParserState {
    pub fn new() -> Self {
        Self {
            titles: BTreeMap::new(),
            num_titles: 0,
            current_title: None,
            flag: StreamFlag::None,
            current_stream: None,
            pending_input: None,
            seen_marker: false,
            warnings: Vec::new(),
        }
    }

    /// Make title `number` current, creating it if needed.
    pub fn enter_title(&mut self, number: u32) {
        self.titles
            .entry(number)
            .or_insert_with(|| Title::new(number));
        self.current_title = Some(number);
        self.flag = StreamFlag::None;
        self.current_stream = None;
    }

    pub fn current_title_mut(&mut self) -> Option<&mut Title> {
        let number = self.current_title?;
        self.titles.get_mut(&number)
    }

    pub fn warn(&mut self, line_number: usize, message: impl Into<String>) {
        self.warnings
            .push(format!("line {}: {}", line_number, message.into()));
    }
}

/// Strip an optional `[HH:MM:SS] ` prefix and surrounding whitespace.
pub(crate) fn normalize_line(raw: &str) -> &str {
    let trimmed = raw.trim();
    match TIMESTAMP.find(trimmed) {
        Some(m) => trimmed[m.end()..].trim_start(),
        None => trimmed,
    }
}

/// Find the dialect of a probe output by its marker lines.
pub fn detect_dialect(raw_text: &str) -> Option<Dialect> {
    raw_text.lines().map(normalize_line).find_map(|line| {
        REGISTRY
            .iter()
            .find(|entry| (entry.is_marker)(line))
            .map(|entry| entry.dialect)
    })
}

/// Parse a complete probe output into titles.
pub fn parse_scan_output(raw_text: &str) -> ScanResult<ParsedScan> {
    let dialect = detect_dialect(raw_text).ok_or(ScanError::UnrecognizedDialect)?;
    let entry = REGISTRY
        .iter()
        .find(|entry| entry.dialect == dialect)
        .ok_or(ScanError::UnrecognizedDialect)?;

    let mut state = ParserState::new();
    for (index, raw) in raw_text.lines().enumerate() {
        let text = normalize_line(raw);
        if text.is_empty() {
            continue;
        }
        (entry.step)(&mut state, &Line {
            number: index + 1,
            text,
        })?;
    }

    (entry.finish)(&mut state);
    for title in state.titles.values_mut() {
        title.clean_streams();
    }

    Ok(ParsedScan {
        dialect,
        num_titles: state.num_titles,
        titles: state.titles,
        warnings: state.warnings,
    })
}

/// Title number of a boundary line (preview pass or summary form).
pub(crate) fn title_boundary(line: &Line<'_>) -> ScanResult<Option<u32>> {
    match BOUNDARY_PREVIEW
        .captures(line.text)
        .or_else(|| BOUNDARY_SUMMARY.captures(line.text))
    {
        Some(caps) => line.num(&caps, 1, "title number").map(Some),
        None => Ok(None),
    }
}

/// Apply a summary line shared by both dialects.
///
/// Returns whether the line was recognized.
pub(crate) fn apply_summary(state: &mut ParserState, line: &Line<'_>) -> ScanResult<bool> {
    if let Some(caps) = SECTION.captures(line.text) {
        state.flag = match &caps[1] {
            "audio tracks" => StreamFlag::Audio,
            "subtitle tracks" => StreamFlag::Subtitle,
            _ => StreamFlag::None,
        };
        state.current_stream = None;
        return Ok(true);
    }

    let flag = state.flag;
    let Some(title) = state.current_title_mut() else {
        return Ok(false);
    };

    if MAIN_FEATURE.is_match(line.text) {
        title.is_main_feature = true;
    } else if let Some(caps) = VTS_SUMMARY.captures(line.text) {
        title.video_title_set = line.num(&caps, 1, "video title set")?;
    } else if let Some(caps) = DURATION.captures(line.text) {
        let hours: u32 = line.num(&caps, 1, "duration hours")?;
        let minutes: u32 = line.num(&caps, 2, "duration minutes")?;
        title.duration_minutes = hours * 60 + minutes;
    } else if let Some(caps) = SIZE.captures(line.text) {
        title.pixel_width = line.num(&caps, 1, "width")?;
        title.pixel_height = line.num(&caps, 2, "height")?;
        let par_x: u32 = line.num(&caps, 3, "pixel aspect")?;
        let par_y: u32 = line.num(&caps, 4, "pixel aspect")?;
        title.pixel_aspect = format!("{}/{}", par_x, par_y);
        title.display_aspect = caps[5].to_string();
        title.frame_rate = line.num(&caps, 6, "frame rate")?;
    } else if let Some(caps) = AUTOCROP_SUMMARY.captures(line.text) {
        title.autocrop = crop_from(line, &caps, 1)?;
    } else if flag == StreamFlag::Audio && AUDIO_LISTING.is_match(line.text) {
        apply_audio_listing(title, line)?;
    } else if flag == StreamFlag::Subtitle && SUBTITLE_LISTING.is_match(line.text) {
        apply_subtitle_listing(title, line)?;
    } else {
        return Ok(false);
    }

    Ok(true)
}

/// Four crop edges starting at capture group `first`.
pub(crate) fn crop_from(line: &Line<'_>, caps: &Captures<'_>, first: usize) -> ScanResult<Crop> {
    Ok(Crop::new(
        line.num(caps, first, "autocrop")?,
        line.num(caps, first + 1, "autocrop")?,
        line.num(caps, first + 2, "autocrop")?,
        line.num(caps, first + 3, "autocrop")?,
    ))
}

fn apply_audio_listing(title: &mut Title, line: &Line<'_>) -> ScanResult<()> {
    let Some(caps) = AUDIO_LISTING.captures(line.text) else {
        return Ok(());
    };
    let order: u32 = line.num(&caps, 1, "audio track number")?;
    let name = caps[2].trim().to_string();
    let lang = caps[3].to_string();
    let rate: u32 = line.num(&caps, 4, "sample rate")?;
    let bitrate: Option<u32> = line.opt_num(&caps, 5, "bitrate")?;

    let index = match title
        .audio_streams
        .iter()
        .position(|a| a.stream.order == order)
    {
        Some(index) => index,
        None => {
            title.audio_streams.push(AudioStream::new(Stream::new(order)));
            title.audio_streams.len() - 1
        }
    };

    let audio = &mut title.audio_streams[index];
    if audio.codec.is_empty() {
        if let Some(codec) = CODEC_IN_NAME.captures(&name) {
            audio.codec = codec[1].to_lowercase();
        }
    }
    if audio.stream.three_cc.is_empty() {
        audio.stream.three_cc = lang.clone();
    }
    audio.stream.language_code = lang;
    audio.stream.name = name;
    audio.sample_rate_hz = rate;
    if let Some(bitrate) = bitrate {
        audio.bitrate_bps = bitrate;
    }
    Ok(())
}

fn apply_subtitle_listing(title: &mut Title, line: &Line<'_>) -> ScanResult<()> {
    let Some(caps) = SUBTITLE_LISTING.captures(line.text) else {
        return Ok(());
    };
    let order: u32 = line.num(&caps, 1, "subtitle track number")?;
    let name = caps[2].trim().to_string();
    let lang = caps[3].to_string();

    let mut kind = caps
        .get(5)
        .map(|m| SubtitleKind::from_listing_tag(m.as_str()))
        .unwrap_or_default();
    if name.eq_ignore_ascii_case("closed captions") {
        kind = SubtitleKind::ClosedCaption;
    }

    let index = match title
        .subtitle_streams
        .iter()
        .position(|s| s.stream.order == order)
    {
        Some(index) => index,
        None => {
            // Closed captions have no native id and survive cleanup anyway
            title
                .subtitle_streams
                .push(SubtitleStream::new(Stream::new(order), kind));
            title.subtitle_streams.len() - 1
        }
    };

    let subtitle = &mut title.subtitle_streams[index];
    if kind != SubtitleKind::Unknown {
        subtitle.kind = kind;
    }
    if subtitle.stream.three_cc.is_empty() {
        subtitle.stream.three_cc = lang.clone();
    }
    subtitle.stream.language_code = lang;
    subtitle.stream.name = name;
    Ok(())
}
