//! Loudness normalization.
//!
//! Each selected audio stream is decoded to a temporary WAV file by the
//! extractor, then all files go to the analyzer in one run. The analyzer
//! prints one `dB` line per file in argument order, which is mapped back to
//! the track it came from.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempPath;

use super::errors::{EncodeError, EncodeResult};
use crate::config::ToolSettings;
use crate::logging::JobLogger;
use crate::models::Title;
use crate::runner::{ToolCommand, ToolRunner};
use crate::select::SelectedAudio;

/// Gain in dB per audio track order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackGains {
    by_track: BTreeMap<u32, f64>,
}

impl TrackGains {
    pub fn from_pairs(pairs: impl IntoIterator<Item = (u32, f64)>) -> Self {
        Self {
            by_track: pairs.into_iter().collect(),
        }
    }

    pub fn gain_for(&self, track: u32) -> Option<f64> {
        self.by_track.get(&track).copied()
    }

    /// Gains for `tracks` in that order; tracks without a measurement get 0 dB.
    pub fn in_order(&self, tracks: &[u32]) -> Vec<f64> {
        tracks
            .iter()
            .map(|t| self.gain_for(*t).unwrap_or(0.0))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.by_track.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_track.is_empty()
    }
}

/// Decoded audio waiting for analysis.
///
/// The two vectors are parallel: index `i` is the `i`-th submitted track.
#[derive(Default)]
struct PendingAnalysis {
    ordered_temp_paths: Vec<TempPath>,
    track_number_for_index: Vec<u32>,
}

impl PendingAnalysis {
    fn push(&mut self, track: u32, path: TempPath) {
        self.track_number_for_index.push(track);
        self.ordered_temp_paths.push(path);
    }

    fn len(&self) -> usize {
        self.ordered_temp_paths.len()
    }

    /// Delete the decoded files, ignoring failures.
    fn cleanup(self) {
        for path in self.ordered_temp_paths {
            let path_display = path.display().to_string();
            if let Err(e) = path.close() {
                tracing::debug!("Could not remove {}: {}", path_display, e);
            }
        }
    }
}

/// Extraction plus analysis for one job.
pub struct GainPipeline<'a> {
    extractor: String,
    analyzer: String,
    runner: &'a dyn ToolRunner,
    logger: Arc<JobLogger>,
    work_dir: PathBuf,
}

impl<'a> GainPipeline<'a> {
    pub fn new(
        tools: &ToolSettings,
        runner: &'a dyn ToolRunner,
        logger: Arc<JobLogger>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            extractor: tools.extractor.clone(),
            analyzer: tools.gain_analyzer.clone(),
            runner,
            logger,
            work_dir: work_dir.into(),
        }
    }

    /// Measure the gain for every track in `audio`.
    ///
    /// Decoded files are removed before returning, on success or failure.
    pub fn compute_gains(
        &self,
        source: &Path,
        title: &Title,
        audio: &[SelectedAudio],
    ) -> EncodeResult<TrackGains> {
        if audio.is_empty() {
            return Ok(TrackGains::default());
        }

        self.logger.phase("Loudness Analysis");

        let mut pending = PendingAnalysis::default();
        let result = self
            .extract_all(source, title, audio, &mut pending)
            .and_then(|()| self.analyze(&pending));
        pending.cleanup();

        let gains = result?;
        for (track, gain) in &gains.by_track {
            self.logger
                .info(&format!("Audio track {}: gain {:.2} dB", track, gain));
        }
        Ok(gains)
    }

    fn extract_all(
        &self,
        source: &Path,
        title: &Title,
        audio: &[SelectedAudio],
        pending: &mut PendingAnalysis,
    ) -> EncodeResult<()> {
        for selected in audio {
            let temp = tempfile::Builder::new()
                .prefix("gain_")
                .suffix(".wav")
                .tempfile_in(&self.work_dir)
                .map_err(|e| EncodeError::io("creating temporary audio file", e))?
                .into_temp_path();

            let cmd = self.extract_command(source, title, selected, &temp);
            pending.push(selected.order(), temp);

            self.logger.command(&cmd.display());
            let output = self.runner.run_checked(&cmd)?;
            for line in output.stderr.lines() {
                self.logger.output_line(line, true);
            }
        }
        Ok(())
    }

    fn extract_command(
        &self,
        source: &Path,
        title: &Title,
        selected: &SelectedAudio,
        target: &Path,
    ) -> ToolCommand {
        let cmd = ToolCommand::new(&self.extractor);
        let cmd = if title.is_file_title() {
            cmd.arg(title.input_path(source).to_string_lossy())
        } else {
            cmd.arg(format!("dvd://{}", title.number))
                .arg("-dvd-device")
                .arg(source.to_string_lossy())
        };

        cmd.arg("-aid")
            .arg(selected.stream.stream.native_id.to_string())
            .args(["-vc", "null", "-vo", "null", "-ao"])
            .arg(format!("pcm:fast:file={}", target.display()))
    }

    fn analyze(&self, pending: &PendingAnalysis) -> EncodeResult<TrackGains> {
        let cmd = ToolCommand::new(&self.analyzer).args(
            pending
                .ordered_temp_paths
                .iter()
                .map(|p| p.to_string_lossy().into_owned()),
        );

        self.logger.command(&cmd.display());
        let output = self.runner.run_checked(&cmd)?;

        let mut measurements = Vec::with_capacity(pending.len());
        for line in output.stdout.lines().chain(output.stderr.lines()) {
            self.logger.output_line(line, false);
            if let Some(gain) = parse_gain_line(line)? {
                measurements.push(gain);
            }
        }

        if measurements.len() < pending.len() {
            return Err(EncodeError::GainAnalysis {
                expected: pending.len(),
                found: measurements.len(),
            });
        }

        Ok(TrackGains::from_pairs(
            pending
                .track_number_for_index
                .iter()
                .copied()
                .zip(measurements),
        ))
    }
}

/// The number in front of `dB`, for lines that carry one.
fn parse_gain_line(line: &str) -> EncodeResult<Option<f64>> {
    let Some(pos) = line.find("dB") else {
        return Ok(None);
    };

    line[..pos]
        .split_whitespace()
        .next_back()
        .and_then(|token| token.parse::<f64>().ok())
        .map(Some)
        .ok_or_else(|| EncodeError::GainParse {
            line: line.trim().to_string(),
        })
}
