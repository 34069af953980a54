//! Post-encode track naming.
//!
//! The encoder writes audio and subtitle tracks in the order of the plan, so
//! container track ids follow from the plan alone: video is track 1, audio
//! tracks come next, then soft subtitles.

use std::path::Path;
use std::sync::Arc;

use super::command::EncodePlan;
use super::errors::EncodeResult;
use crate::logging::JobLogger;
use crate::runner::{ToolCommand, ToolRunner};

/// One container track to name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackName {
    pub track_id: u32,
    pub name: String,
}

/// Container track ids and names for `plan`.
pub fn track_names(plan: &EncodePlan) -> Vec<TrackName> {
    let audio_count = plan.audio.len() as u32;

    let audio = plan.audio.iter().enumerate().map(|(i, a)| TrackName {
        track_id: 2 + i as u32,
        name: a.name.clone(),
    });
    let subtitles = plan.subtitles.iter().enumerate().map(|(j, s)| TrackName {
        track_id: 2 + audio_count + j as u32,
        name: s.name.clone(),
    });

    audio.chain(subtitles).collect()
}

pub struct TrackRenamer<'a> {
    tool: String,
    runner: &'a dyn ToolRunner,
    logger: Arc<JobLogger>,
}

impl<'a> TrackRenamer<'a> {
    pub fn new(tool: impl Into<String>, runner: &'a dyn ToolRunner, logger: Arc<JobLogger>) -> Self {
        Self {
            tool: tool.into(),
            runner,
            logger,
        }
    }

    /// Set the container title, then every track name.
    pub fn apply(&self, output: &Path, plan: &EncodePlan, container_title: &str) -> EncodeResult<()> {
        self.logger.phase("Track Names");

        self.edit(output, "info", &format!("title={}", container_title))?;
        for track in track_names(plan) {
            self.edit(
                output,
                &format!("track:{}", track.track_id),
                &format!("name={}", track.name),
            )?;
        }
        Ok(())
    }

    fn edit(&self, output: &Path, selector: &str, property: &str) -> EncodeResult<()> {
        let cmd = ToolCommand::new(&self.tool)
            .arg(output.to_string_lossy())
            .args(["-e", selector, "-s", property]);

        self.logger.command(&cmd.display());
        let result = self.runner.run_checked(&cmd)?;
        for line in result.stdout.lines() {
            self.logger.output_line(line, false);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogConfig;
    use crate::models::{AudioStream, Crop, Stream, SubtitleKind, SubtitleStream};
    use crate::runner::scripted::{ScriptedResponse, ScriptedRunner};
    use crate::select::{SelectedAudio, SelectedSubtitle};
    use tempfile::tempdir;

    fn plan() -> EncodePlan {
        EncodePlan {
            title_number: 1,
            width: Some(1920),
            bitrate: 4500,
            crop: Crop::default(),
            burn_in: true,
            audio: vec![
                SelectedAudio {
                    stream: AudioStream::new(Stream::new(3).with_native_id(130)),
                    name: "Main".to_string(),
                },
                SelectedAudio {
                    stream: AudioStream::new(Stream::new(1).with_native_id(128)),
                    name: "Commentary 1 (eng)".to_string(),
                },
            ],
            subtitles: vec![SelectedSubtitle {
                stream: SubtitleStream::new(
                    Stream::new(2).with_native_id(33),
                    SubtitleKind::Vobsub,
                ),
                name: "English".to_string(),
            }],
        }
    }

    #[test]
    fn track_ids_follow_plan_order() {
        let names = track_names(&plan());
        let ids: Vec<(u32, &str)> = names.iter().map(|t| (t.track_id, t.name.as_str())).collect();
        assert_eq!(
            ids,
            vec![(2, "Main"), (3, "Commentary 1 (eng)"), (4, "English")]
        );
    }

    #[test]
    fn sets_title_before_track_names() {
        let dir = tempdir().unwrap();
        let logger =
            Arc::new(JobLogger::new("rename", dir.path(), LogConfig::default(), None).unwrap());
        let runner = ScriptedRunner::new();

        TrackRenamer::new("mkvpropedit", &runner, logger)
            .apply(Path::new("/out/Movie.mkv"), &plan(), "Movie")
            .unwrap();

        let calls = runner.calls_to("mkvpropedit");
        assert_eq!(calls.len(), 4);
        assert_eq!(
            calls[0].arg_list(),
            &["/out/Movie.mkv", "-e", "info", "-s", "title=Movie"]
        );
        assert_eq!(
            calls[3].arg_list(),
            &["/out/Movie.mkv", "-e", "track:4", "-s", "name=English"]
        );
    }

    #[test]
    fn editor_failure_stops_renaming() {
        let dir = tempdir().unwrap();
        let logger =
            Arc::new(JobLogger::new("rename", dir.path(), LogConfig::default(), None).unwrap());
        let runner = ScriptedRunner::new();
        runner.respond(
            "mkvpropedit",
            ScriptedResponse::ok().stderr(["Error: not a Matroska file"]).exit_code(2),
        );

        let result = TrackRenamer::new("mkvpropedit", &runner, logger).apply(
            Path::new("/out/Movie.mkv"),
            &plan(),
            "Movie",
        );

        assert!(result.is_err());
        assert_eq!(runner.calls_to("mkvpropedit").len(), 1);
    }
}
