//! Encoder run and supervision.
//!
//! The encoder's stdout and stderr are drained by two reader threads that
//! send complete lines over channels. The supervising thread polls both
//! channels and the child on a fixed interval and is the only owner of the
//! [`OutputMonitor`].

use std::io::{self, BufRead, BufReader, Read};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use super::command::{EncodeCommand, EncodeCommandBuilder};
use super::errors::{EncodeError, EncodeResult};
use super::gain::GainPipeline;
use super::monitor::{MonitorEvent, OutputMonitor};
use super::options::EncodeOptions;
use super::rename::TrackRenamer;
use crate::config::{SelectionSettings, ToolSettings};
use crate::logging::JobLogger;
use crate::models::{EncodeJob, Title};
use crate::runner::{ChildProcess, ToolCommand, ToolRunner};
use crate::select::{MissingTrackWarning, TrackSelector};

/// Everything one job's encoder needs.
pub struct EncoderContext {
    pub options: EncodeOptions,
    pub tools: ToolSettings,
    pub selection: SelectionSettings,
    /// Log the encoder tokens one option per line.
    pub show_options_pretty: bool,
    pub runner: Arc<dyn ToolRunner>,
    pub logger: Arc<JobLogger>,
    /// Disc image or directory the title was scanned from.
    pub source: PathBuf,
    /// Directory for temporary files.
    pub work_dir: PathBuf,
}

/// A built encoder command plus what selection had to skip.
#[derive(Debug, Clone)]
pub struct BuiltEncode {
    pub command: EncodeCommand,
    pub warnings: Vec<MissingTrackWarning>,
}

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct EncodeOutcome {
    pub output: PathBuf,
    /// Full encoder argument list, input and output included.
    pub tokens: Vec<String>,
    pub warnings: Vec<MissingTrackWarning>,
    pub dry_run: bool,
    pub renamed: bool,
    /// Configuration the encoder reported for its last pass.
    pub final_configuration: Vec<String>,
}

/// What the supervisor saw.
#[derive(Debug, Default)]
struct SupervisedRun {
    exit_code: i32,
    work_result: Option<i32>,
    final_configuration: Vec<String>,
}

pub struct Encoder {
    ctx: EncoderContext,
}

impl Encoder {
    pub fn new(ctx: EncoderContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &EncoderContext {
        &self.ctx
    }

    /// Select tracks and build the encoder arguments for `title`.
    ///
    /// With normalization on, loudness analysis runs first and the gains are
    /// passed to the encoder. A dry run skips the analysis.
    pub fn build(&self, job: &EncodeJob, title: &Title) -> EncodeResult<BuiltEncode> {
        let selector = TrackSelector::new(&self.ctx.selection);
        let audio = selector.resolve_audio(title, &job.audio);
        let subtitles = selector.resolve_subtitles(title, &job.subtitles);

        let mut warnings = audio.warnings;
        warnings.extend(subtitles.warnings);
        for warning in &warnings {
            self.ctx.logger.warn(&warning.to_string());
        }

        let builder = EncodeCommandBuilder::new(&self.ctx.options).width_override(job.width_override);
        // Validates the title before any extraction work
        let command = builder.build(title, &audio.tracks, &subtitles.tracks, job.is_bonus_feature)?;

        if !self.ctx.options.normalize || audio.tracks.is_empty() {
            return Ok(BuiltEncode { command, warnings });
        }
        if self.ctx.options.dry_run {
            self.ctx.logger.info("Dry run, loudness analysis skipped");
            return Ok(BuiltEncode { command, warnings });
        }

        let gains = GainPipeline::new(
            &self.ctx.tools,
            self.ctx.runner.as_ref(),
            Arc::clone(&self.ctx.logger),
            &self.ctx.work_dir,
        )
        .compute_gains(&self.ctx.source, title, &audio.tracks)?;

        let command = builder
            .gains(Some(&gains))
            .build(title, &audio.tracks, &subtitles.tracks, job.is_bonus_feature)?;
        Ok(BuiltEncode { command, warnings })
    }

    /// Encode `title` into `job.output`, then name the output's tracks.
    pub fn run(&self, job: &EncodeJob, title: &Title) -> EncodeResult<EncodeOutcome> {
        let built = self.build(job, title)?;
        self.execute(job, title, built)
    }

    /// Run an already built encode.
    pub fn execute(
        &self,
        job: &EncodeJob,
        title: &Title,
        built: BuiltEncode,
    ) -> EncodeResult<EncodeOutcome> {
        let logger = &self.ctx.logger;
        logger.phase(&format!("Encode {}", title.display_name()));

        let tokens = self.full_tokens(job, title, &built.command);
        let cmd = ToolCommand::new(&self.ctx.tools.encoder).args(tokens.iter().cloned());

        logger.command(&cmd.display());
        if self.ctx.show_options_pretty {
            logger.log_command_pretty(&self.ctx.tools.encoder, &tokens);
        }

        if self.ctx.options.dry_run {
            logger.info("Dry run, encoder not started");
            return Ok(EncodeOutcome {
                output: job.output.clone(),
                tokens,
                warnings: built.warnings,
                dry_run: true,
                renamed: false,
                final_configuration: Vec::new(),
            });
        }

        if let Some(parent) = job.output.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| EncodeError::io("creating output directory", e))?;
        }

        let child = self.ctx.runner.spawn(&cmd)?;
        let run = match self.supervise(title.number, child) {
            Ok(run) => run,
            Err(e) => {
                logger.show_tail("encoder output");
                return Err(e);
            }
        };

        let code = match run.work_result {
            Some(code) if code != 0 => code,
            _ => run.exit_code,
        };
        if code != 0 {
            logger.show_tail("encoder output");
            return Err(EncodeError::failed(title.number, code));
        }
        logger.success(&format!("Encoded {}", job.output.display()));

        let renamed = job.is_matroska_output();
        if renamed {
            TrackRenamer::new(
                &self.ctx.tools.metadata_editor,
                self.ctx.runner.as_ref(),
                Arc::clone(logger),
            )
            .apply(&job.output, &built.command.plan, &job.effective_container_title())?;
        }

        Ok(EncodeOutcome {
            output: job.output.clone(),
            tokens,
            warnings: built.warnings,
            dry_run: false,
            renamed,
            final_configuration: run.final_configuration,
        })
    }

    fn full_tokens(&self, job: &EncodeJob, title: &Title, command: &EncodeCommand) -> Vec<String> {
        let mut tokens = command.tokens.clone();
        tokens.push("-i".to_string());
        tokens.push(title.input_path(&self.ctx.source).to_string_lossy().into_owned());
        tokens.push("-t".to_string());
        tokens.push(title.input_title_number().to_string());
        tokens.push("-o".to_string());
        tokens.push(job.output.to_string_lossy().into_owned());
        tokens
    }

    fn supervise(&self, title: u32, mut child: Box<dyn ChildProcess>) -> EncodeResult<SupervisedRun> {
        let logger = &self.ctx.logger;
        let poll = Duration::from_millis(self.ctx.options.poll_interval_ms.max(1));

        let (out_rx, out_reader) = spawn_reader(child.take_stdout());
        let (err_rx, err_reader) = spawn_reader(child.take_stderr());

        let mut monitor = OutputMonitor::new(title);
        let mut run = SupervisedRun::default();
        let mut exit_code = None;
        let mut out_open = true;
        let mut err_open = true;

        let failure = loop {
            let mut received = false;

            let mut error = None;
            while err_open {
                match err_rx.try_recv() {
                    Ok(line) => {
                        received = true;
                        logger.output_line(&line, true);
                        match monitor.feed(&line) {
                            Ok(events) => self.handle_events(&monitor, events, &mut run),
                            Err(e) => {
                                error = Some(e);
                                break;
                            }
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => err_open = false,
                }
            }
            if error.is_some() {
                break error;
            }

            while out_open {
                match out_rx.try_recv() {
                    Ok(line) => {
                        received = true;
                        logger.output_line(&line, false);
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => out_open = false,
                }
            }

            if exit_code.is_none() {
                match child.try_wait() {
                    Ok(code) => exit_code = code,
                    Err(e) => break Some(e.into()),
                }
            }
            if exit_code.is_some() && !out_open && !err_open {
                break None;
            }
            if !received {
                thread::sleep(poll);
            }
        };

        if let Some(error) = failure {
            logger.error(&error.to_string());
            for line in monitor.final_configuration() {
                logger.info(&format!("final pass: {}", line));
            }
            if let Err(e) = child.terminate() {
                logger.warn(&format!("Could not terminate encoder: {}", e));
            }
            drain(&out_rx, logger, false);
            drain(&err_rx, logger, true);
            join_reader(out_reader);
            join_reader(err_reader);
            if let Err(e) = child.wait() {
                logger.warn(&format!("Could not reap encoder: {}", e));
            }
            return Err(error);
        }

        join_reader(out_reader);
        join_reader(err_reader);
        run.exit_code = exit_code.unwrap_or(-1);
        Ok(run)
    }

    fn handle_events(&self, monitor: &OutputMonitor, events: Vec<MonitorEvent>, run: &mut SupervisedRun) {
        let logger = &self.ctx.logger;
        for event in events {
            match event {
                MonitorEvent::JobCount { expected } => {
                    logger.debug(&format!("Encoder will run {} pass(es)", expected));
                }
                MonitorEvent::JobStarted { job } => {
                    logger.info(&format!(
                        "Encoder pass {}/{} started",
                        job,
                        monitor.expected_jobs()
                    ));
                }
                MonitorEvent::FinalConfiguration(lines) => {
                    for line in &lines {
                        logger.debug(line);
                    }
                    run.final_configuration = lines;
                }
                MonitorEvent::PassCompleted { job } => {
                    logger.info(&format!("Encoder pass {} finished", job));
                }
                MonitorEvent::WorkResult { code } => {
                    run.work_result = Some(code);
                }
            }
        }
    }
}

/// Start a thread sending each line of `pipe` over a channel.
///
/// Carriage returns end a line too, so progress updates arrive one by one.
fn spawn_reader(pipe: Option<Box<dyn Read + Send>>) -> (Receiver<String>, Option<JoinHandle<()>>) {
    let (tx, rx) = mpsc::channel();
    let Some(pipe) = pipe else {
        return (rx, None);
    };

    let handle = thread::spawn(move || {
        let mut reader = BufReader::new(pipe);
        let mut line = Vec::new();
        loop {
            let available = match reader.fill_buf() {
                Ok([]) => break,
                Ok(buf) => buf,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            };
            let line_end = available.iter().position(|&b| b == b'\r' || b == b'\n');
            let (used, complete) = match line_end {
                Some(end) => {
                    line.extend_from_slice(&available[..end]);
                    (end + 1, true)
                }
                None => {
                    line.extend_from_slice(available);
                    (available.len(), false)
                }
            };
            reader.consume(used);
            if complete && !send_line(&tx, &mut line) {
                return;
            }
        }
        send_line(&tx, &mut line);
    });
    (rx, Some(handle))
}

/// Send the buffered line unless it is blank. False once the receiver is gone.
fn send_line(tx: &Sender<String>, line: &mut Vec<u8>) -> bool {
    let text = String::from_utf8_lossy(line).into_owned();
    line.clear();
    if text.trim().is_empty() {
        return true;
    }
    tx.send(text).is_ok()
}

/// Log whatever the readers still send until they finish.
fn drain(rx: &Receiver<String>, logger: &JobLogger, is_stderr: bool) {
    while let Ok(line) = rx.recv() {
        logger.output_line(&line, is_stderr);
    }
}

fn join_reader(handle: Option<JoinHandle<()>>) {
    if let Some(handle) = handle {
        if handle.join().is_err() {
            tracing::warn!("Encoder output reader panicked");
        }
    }
}
