//! Optical disc dialect.
//!
//! The probe first walks every title in a preview pass (`scan: ...` lines),
//! which is where player track ids show up, then prints a summary per title
//! (`+ ...` lines) with the canonical track listings.

use std::sync::LazyLock;

use regex::Regex;

use super::parser::{self, Line, ParserState};
use super::types::{ScanError, ScanResult, StreamFlag};
use crate::models::{AudioStream, Stream, SubtitleKind, SubtitleStream, UNMATCHED_NATIVE_ID};

static MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^scan: (DVD|BD) has (\d+) title").expect("Valid regex"));

static VTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^scan: vts=(\d+), ttn=(\d+)").expect("Valid regex"));

static CHECKING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^scan: checking (audio|subtitle) (\d+)").expect("Valid regex")
});

static STREAM_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^scan: id=0x([0-9a-fA-F]+)(?:, lang=[^,]*)?(?:, 3cc=(\w+))?")
        .expect("Valid regex")
});

static AUDIO_PREVIEW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^scan: audio 0x([0-9a-fA-F]+): ([^,]+), rate=(\d+)Hz, bitrate=(\d+)")
        .expect("Valid regex")
});

static PREVIEWS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^scan: \d+ previews, (\d+)x(\d+), ([\d.]+) fps, autocrop = (\d+)/(\d+)/(\d+)/(\d+)",
    )
    .expect("Valid regex")
});

/// Player subtitle ids start at this private-stream offset.
const SUBTITLE_ID_BASE: i32 = 0x20;

pub(crate) fn is_marker(line: &str) -> bool {
    MARKER.is_match(line)
}

pub(crate) fn step(state: &mut ParserState, line: &Line<'_>) -> ScanResult<()> {
    if let Some(caps) = MARKER.captures(line.text) {
        state.seen_marker = true;
        state.num_titles = line.num(&caps, 2, "title count")?;
        return Ok(());
    }

    if !state.seen_marker {
        return Ok(());
    }

    if let Some(number) = parser::title_boundary(line)? {
        state.enter_title(number);
        return Ok(());
    }

    if parser::apply_summary(state, line)? {
        return Ok(());
    }

    if let Some(caps) = CHECKING.captures(line.text) {
        let order: u32 = line.num(&caps, 2, "track number")?;
        let is_audio = &caps[1] == "audio";
        let Some(title) = state.current_title_mut() else {
            return Ok(());
        };

        if is_audio {
            if title.audio_by_order(order).is_none() {
                title.audio_streams.push(AudioStream::new(Stream::new(order)));
            }
        } else if title.subtitle_by_order(order).is_none() {
            title
                .subtitle_streams
                .push(SubtitleStream::new(Stream::new(order), SubtitleKind::Unknown));
        }

        state.flag = if is_audio {
            StreamFlag::Audio
        } else {
            StreamFlag::Subtitle
        };
        state.current_stream = Some(order);
    } else if let Some(caps) = STREAM_ID.captures(line.text) {
        let raw_id = player_id(line, &caps[1])?;
        let three_cc = caps.get(2).map(|m| m.as_str().to_string());
        let (flag, current) = (state.flag, state.current_stream);
        let (Some(order), Some(title)) = (current, state.current_title_mut()) else {
            return Ok(());
        };

        let (stream, native_id) = match flag {
            StreamFlag::Audio => (
                title
                    .audio_streams
                    .iter_mut()
                    .find(|a| a.stream.order == order)
                    .map(|a| &mut a.stream),
                raw_id,
            ),
            StreamFlag::Subtitle => (
                title
                    .subtitle_streams
                    .iter_mut()
                    .find(|s| s.stream.order == order)
                    .map(|s| &mut s.stream),
                subtitle_native_id(raw_id),
            ),
            StreamFlag::None => (None, raw_id),
        };

        if let Some(stream) = stream {
            stream.native_id = native_id;
            if let Some(three_cc) = three_cc {
                stream.language_code = three_cc.clone();
                stream.three_cc = three_cc;
            }
        }
    } else if let Some(caps) = AUDIO_PREVIEW.captures(line.text) {
        let native_id = player_id(line, &caps[1])?;
        let codec = caps[2].trim().to_string();
        let rate: u32 = line.num(&caps, 3, "sample rate")?;
        let bitrate: u32 = line.num(&caps, 4, "bitrate")?;
        let Some(title) = state.current_title_mut() else {
            return Ok(());
        };

        let title_number = title.number;
        let mut synthesized = None;
        let index = match title
            .audio_streams
            .iter()
            .position(|a| a.stream.native_id == native_id)
        {
            Some(index) => index,
            None => {
                let order = title.next_audio_order();
                title
                    .audio_streams
                    .push(AudioStream::new(Stream::new(order).with_native_id(native_id)));
                synthesized = Some(order);
                title.audio_streams.len() - 1
            }
        };

        let audio = &mut title.audio_streams[index];
        audio.codec = codec;
        audio.sample_rate_hz = rate;
        audio.bitrate_bps = bitrate;

        if let Some(order) = synthesized {
            state.warn(
                line.number,
                format!(
                    "title {}: audio 0x{} was never checked, added as track {}",
                    title_number, &caps[1], order
                ),
            );
        }
    } else if let Some(caps) = VTS.captures(line.text) {
        let vts: i32 = line.num(&caps, 1, "video title set")?;
        if let Some(title) = state.current_title_mut() {
            title.video_title_set = vts;
        }
    } else if let Some(caps) = PREVIEWS.captures(line.text) {
        let width: u32 = line.num(&caps, 1, "width")?;
        let height: u32 = line.num(&caps, 2, "height")?;
        let frame_rate: f64 = line.num(&caps, 3, "frame rate")?;
        let autocrop = parser::crop_from(line, &caps, 4)?;
        if let Some(title) = state.current_title_mut() {
            title.pixel_width = width;
            title.pixel_height = height;
            title.frame_rate = frame_rate;
            title.autocrop = autocrop;
        }
    }

    Ok(())
}

pub(crate) fn finish(_state: &mut ParserState) {}

/// Player track id from a probe stream id.
///
/// DVD private streams print as `0xHHbd`; the player knows them by `HH`.
fn player_id(line: &Line<'_>, hex: &str) -> ScanResult<i32> {
    let value = i64::from_str_radix(hex, 16)
        .ok()
        .filter(|v| *v <= i64::from(i32::MAX))
        .ok_or_else(|| ScanError::parse_field(line.number, "stream id", line.text))?;

    let id = if hex.len() == 4 && hex.to_ascii_lowercase().ends_with("bd") {
        value >> 8
    } else {
        value
    };
    Ok(id as i32)
}

/// Subtitle ids count from the subpicture base; anything below it is unmatched.
fn subtitle_native_id(raw_id: i32) -> i32 {
    match raw_id - SUBTITLE_ID_BASE {
        id if id < 0 => UNMATCHED_NATIVE_ID,
        id => id,
    }
}
