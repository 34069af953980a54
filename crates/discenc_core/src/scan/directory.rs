//! Directory-of-containers dialect.
//!
//! For every file the probe's demuxer dumps an `Input #N, ..., from 'PATH':`
//! header followed by one `Stream #0.K` line per stream. Those streams are
//! held as a pending input until the next title boundary, where the title
//! adopts them.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use super::parser::{self, Line, ParserState, PendingInput};
use super::types::{ScanError, ScanResult};
use crate::models::{AudioStream, Stream, SubtitleKind, SubtitleStream, Title};

static MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^Input #\d+, .+, from '(.*)':\s*$").expect("Valid regex"));

static STREAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Stream #\d+[.:](\d+)(?:\[0x[0-9a-fA-F]+\])?(?:\((\w+)\))?: (Audio|Subtitle): (.*)$")
        .expect("Valid regex")
});

static STREAM_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+ stream: (.+)$").expect("Valid regex"));

/// `02 - Pilot.mkv`
static PREFIX_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)[ ._-]").expect("Valid regex"));

/// `Show_t03.mkv`
static SUFFIX_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\d](\d+)\.[A-Za-z0-9]+$").expect("Valid regex"));

/// A stream line parsed into either kind.
enum RawStream {
    Audio(AudioStream),
    Subtitle(SubtitleStream),
}

pub(crate) fn is_marker(line: &str) -> bool {
    MARKER.is_match(line)
}

pub(crate) fn step(state: &mut ParserState, line: &Line<'_>) -> ScanResult<()> {
    if let Some(caps) = MARKER.captures(line.text) {
        state.seen_marker = true;
        if let Some(stale) = state.pending_input.take() {
            state.warn(
                line.number,
                format!("input '{}' was never attached to a title", stale.path),
            );
        }
        state.pending_input = Some(PendingInput {
            path: caps[1].to_string(),
            ..PendingInput::default()
        });
        return Ok(());
    }

    if !state.seen_marker {
        return Ok(());
    }

    if let Some(number) = parser::title_boundary(line)? {
        state.enter_title(number);
        if let Some(input) = state.pending_input.take() {
            adopt(state, number, input, line.number);
        }
        return Ok(());
    }

    if let Some(caps) = STREAM_PATH.captures(line.text) {
        let path = caps[1].trim().to_string();
        if let Some(title) = state.current_title_mut() {
            title.relative_path = path.into();
        }
        return Ok(());
    }

    if parser::apply_summary(state, line)? {
        return Ok(());
    }

    let Some(raw) = parse_stream(line)? else {
        return Ok(());
    };

    if let Some(input) = state.pending_input.as_mut() {
        match raw {
            RawStream::Audio(mut audio) => {
                audio.stream.order = input.audio.len() as u32 + 1;
                input.audio.push(audio);
            }
            RawStream::Subtitle(mut subtitle) => {
                subtitle.stream.order = input.subtitles.len() as u32 + 1;
                input.subtitles.push(subtitle);
            }
        }
    } else if let Some(number) = state.current_title {
        let mut warnings = Vec::new();
        if let Some(title) = state.titles.get_mut(&number) {
            merge_stream(title, raw, &mut warnings);
        }
        for warning in warnings {
            state.warn(line.number, warning);
        }
    }

    Ok(())
}

pub(crate) fn finish(state: &mut ParserState) {
    if let Some(stale) = state.pending_input.take() {
        state
            .warnings
            .push(format!("input '{}' was never attached to a title", stale.path));
    }

    for title in state.titles.values_mut() {
        title.user_number = user_number_for(title);
    }
    state.num_titles = state.titles.len() as u32;
}

/// Attach a pending input's streams to title `number`.
///
/// The first input a title sees is canonical; later ones only refine
/// streams with a known native id.
fn adopt(state: &mut ParserState, number: u32, input: PendingInput, line_number: usize) {
    let mut warnings = Vec::new();
    if let Some(title) = state.titles.get_mut(&number) {
        if !title.is_file_title() {
            title.relative_path = input.path.clone().into();
        }

        if title.has_streams() {
            for audio in input.audio {
                merge_stream(title, RawStream::Audio(audio), &mut warnings);
            }
            for subtitle in input.subtitles {
                merge_stream(title, RawStream::Subtitle(subtitle), &mut warnings);
            }
        } else {
            title.audio_streams = input.audio;
            title.subtitle_streams = input.subtitles;
        }
    }

    for warning in warnings {
        state.warn(line_number, warning);
    }
}

/// Match a stream into a title by native id, synthesizing it when unknown.
fn merge_stream(title: &mut Title, raw: RawStream, warnings: &mut Vec<String>) {
    match raw {
        RawStream::Audio(audio) => {
            let native_id = audio.stream.native_id;
            if let Some(existing) = title
                .audio_streams
                .iter_mut()
                .find(|a| a.stream.native_id == native_id)
            {
                if !audio.codec.is_empty() {
                    existing.codec = audio.codec;
                }
                if audio.sample_rate_hz > 0 {
                    existing.sample_rate_hz = audio.sample_rate_hz;
                }
                if audio.bitrate_bps > 0 {
                    existing.bitrate_bps = audio.bitrate_bps;
                }
                if existing.stream.three_cc.is_empty() {
                    existing.stream.three_cc = audio.stream.three_cc;
                }
            } else {
                let order = title.next_audio_order();
                warnings.push(format!(
                    "title {}: audio stream {} not in first input, added as track {}",
                    title.number, native_id, order
                ));
                let mut audio = audio;
                audio.stream.order = order;
                title.audio_streams.push(audio);
            }
        }
        RawStream::Subtitle(subtitle) => {
            let native_id = subtitle.stream.native_id;
            if let Some(existing) = title
                .subtitle_streams
                .iter_mut()
                .find(|s| s.stream.native_id == native_id)
            {
                if subtitle.kind != SubtitleKind::Unknown {
                    existing.kind = subtitle.kind;
                }
            } else {
                let order = title.next_subtitle_order();
                warnings.push(format!(
                    "title {}: subtitle stream {} not in first input, added as track {}",
                    title.number, native_id, order
                ));
                let mut subtitle = subtitle;
                subtitle.stream.order = order;
                title.subtitle_streams.push(subtitle);
            }
        }
    }
}

fn parse_stream(line: &Line<'_>) -> ScanResult<Option<RawStream>> {
    let Some(caps) = STREAM.captures(line.text) else {
        return Ok(None);
    };

    let native_id: i32 = line.num(&caps, 1, "stream index")?;
    let mut stream = Stream::new(0).with_native_id(native_id);
    if let Some(lang) = caps.get(2) {
        stream = stream.with_lang(lang.as_str());
    }
    let details = &caps[4];

    if &caps[3] == "Subtitle" {
        let codec = details
            .split([',', ' '])
            .next()
            .unwrap_or_default();
        return Ok(Some(RawStream::Subtitle(SubtitleStream::new(
            stream,
            SubtitleKind::from_codec_name(codec),
        ))));
    }

    let mut audio = AudioStream::new(stream);
    for (index, part) in details.split(", ").enumerate() {
        let part = part.trim();
        if index == 0 {
            audio.codec = part
                .split([' ', '('])
                .next()
                .unwrap_or_default()
                .to_string();
        } else if let Some(rate) = part.strip_suffix(" Hz") {
            audio.sample_rate_hz = rate
                .trim()
                .parse()
                .map_err(|_| ScanError::parse_field(line.number, "sample rate", line.text))?;
        } else if let Some((kbps, _)) = part.split_once(" kb/s") {
            audio.bitrate_bps = kbps
                .trim()
                .parse::<u32>()
                .ok()
                .and_then(|kbps| kbps.checked_mul(1000))
                .ok_or_else(|| ScanError::parse_field(line.number, "bitrate", line.text))?;
        }
    }

    Ok(Some(RawStream::Audio(audio)))
}

/// Stable number from the title's file name, else the probe number.
fn user_number_for(title: &Title) -> u32 {
    let Some(file_name) = Path::new(&title.relative_path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
    else {
        return title.number;
    };

    PREFIX_NUMBER
        .captures(&file_name)
        .or_else(|| SUFFIX_NUMBER.captures(&file_name))
        .and_then(|caps| caps[1].parse().ok())
        .unwrap_or(title.number)
}
