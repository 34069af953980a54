//! Queue processor for running encode jobs against a scanned source.
//!
//! Jobs run strictly one after another. A failing job is recorded and the
//! batch moves on, except after a fatal encoder error, which stops the
//! remaining queue.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use super::errors::{BatchError, BatchResult};
use crate::config::Settings;
use crate::encode::{EncodeOptions, EncodeOutcome, Encoder, EncoderContext};
use crate::logging::{GuiLogCallback, JobLogger, LogConfig};
use crate::models::{EncodeJob, JobStatus};
use crate::runner::ToolRunner;
use crate::scan::ScanCatalog;

/// Result of processing a single job.
#[derive(Debug, Clone, Serialize)]
pub struct JobResult {
    /// Job name, also the log file name.
    pub name: String,
    pub user_number: u32,
    pub status: JobStatus,
    /// Output file, if the job completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    /// Requested tracks the title did not have.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl JobResult {
    /// Create a completed result.
    pub fn complete(job: &EncodeJob, outcome: &EncodeOutcome) -> Self {
        Self {
            name: job.name(),
            user_number: job.user_number,
            status: JobStatus::Complete,
            output: Some(outcome.output.clone()),
            warnings: outcome.warnings.iter().map(ToString::to_string).collect(),
            error: None,
        }
    }

    /// Create a failed result, keeping any selection warnings.
    pub fn failed(job: &EncodeJob, error: &BatchError) -> Self {
        Self {
            name: job.name(),
            user_number: job.user_number,
            status: JobStatus::Failed,
            output: None,
            warnings: error.warnings().iter().map(ToString::to_string).collect(),
            error: Some(error.to_string()),
        }
    }

    /// Create a result for a job skipped after the batch halted.
    pub fn not_run(job: &EncodeJob) -> Self {
        Self {
            name: job.name(),
            user_number: job.user_number,
            status: JobStatus::NotRun,
            output: None,
            warnings: Vec::new(),
            error: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == JobStatus::Complete
    }
}

/// Results of one batch, in queue order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub results: Vec<JobResult>,
    /// Set when a fatal encoder error stopped the queue.
    pub halted: bool,
}

impl BatchReport {
    fn count(&self, status: JobStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    pub fn completed(&self) -> usize {
        self.count(JobStatus::Complete)
    }

    pub fn failed(&self) -> usize {
        self.count(JobStatus::Failed)
    }

    pub fn not_run(&self) -> usize {
        self.count(JobStatus::NotRun)
    }

    pub fn all_succeeded(&self) -> bool {
        self.results.iter().all(JobResult::is_success)
    }
}

/// Runs encode jobs for one scanned source.
///
/// # Example
///
/// ```ignore
/// let processor = QueueProcessor::new(settings, Arc::new(SystemRunner::new()), log_dir, work_dir);
/// let report = processor.process_queue(&catalog, &jobs, |_| None);
/// ```
pub struct QueueProcessor {
    settings: Settings,
    /// Options with crop precedence from the config file; derived from
    /// `settings` when not supplied.
    options: Option<EncodeOptions>,
    runner: Arc<dyn ToolRunner>,
    log_dir: PathBuf,
    work_dir: PathBuf,
}

impl QueueProcessor {
    /// Create a new queue processor.
    ///
    /// # Arguments
    /// * `settings` - Application settings
    /// * `runner` - Runs every external tool
    /// * `log_dir` - Directory for job log files
    /// * `work_dir` - Directory for job temporary files
    pub fn new(
        settings: Settings,
        runner: Arc<dyn ToolRunner>,
        log_dir: impl Into<PathBuf>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            settings,
            options: None,
            runner,
            log_dir: log_dir.into(),
            work_dir: work_dir.into(),
        }
    }

    /// Use `options` instead of deriving them from the settings.
    pub fn with_encode_options(mut self, options: EncodeOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// One job per title at least `min_time` minutes long.
    ///
    /// Outputs go to the output folder as `title_NN.mkv`. When the source has
    /// a main feature, every other title is a bonus feature.
    pub fn candidate_jobs(&self, catalog: &ScanCatalog) -> Vec<EncodeJob> {
        let has_main = catalog.main_feature().is_some();
        let output_dir = Path::new(&self.settings.paths.output_folder);

        catalog
            .titles_at_least(self.settings.scan.min_time)
            .into_iter()
            .filter(|t| t.is_valid())
            .map(|t| {
                let job = EncodeJob::new(
                    t.user_number,
                    output_dir.join(format!("title_{:02}.mkv", t.user_number)),
                );
                if has_main && !t.is_main_feature {
                    job.bonus()
                } else {
                    job
                }
            })
            .collect()
    }

    /// Process jobs sequentially.
    ///
    /// # Arguments
    /// * `catalog` - Scanned source the jobs refer to
    /// * `jobs` - Jobs in queue order
    /// * `log_callback_factory` - Creates a log callback per job name
    pub fn process_queue<F>(
        &self,
        catalog: &ScanCatalog,
        jobs: &[EncodeJob],
        log_callback_factory: F,
    ) -> BatchReport
    where
        F: Fn(&str) -> Option<GuiLogCallback>,
    {
        let mut report = BatchReport::default();

        for (i, job) in jobs.iter().enumerate() {
            if report.halted {
                report.results.push(JobResult::not_run(job));
                continue;
            }

            tracing::info!("Processing job {}/{}: {}", i + 1, jobs.len(), job.name());

            let callback = log_callback_factory(&job.name());
            let result = match self.process_job(catalog, job, callback) {
                Ok(outcome) => JobResult::complete(job, &outcome),
                Err(e) => {
                    tracing::error!("{}", e);
                    if e.halts_batch() {
                        tracing::warn!(
                            "Stopping queue after fatal encoder error; {} job(s) not run",
                            jobs.len() - i - 1
                        );
                        report.halted = true;
                    }
                    JobResult::failed(job, &e)
                }
            };
            report.results.push(result);
        }

        tracing::info!(
            "Batch finished: {} complete, {} failed, {} not run",
            report.completed(),
            report.failed(),
            report.not_run()
        );
        report
    }

    /// Process a single job.
    pub fn process_job(
        &self,
        catalog: &ScanCatalog,
        job: &EncodeJob,
        callback: Option<GuiLogCallback>,
    ) -> BatchResult<EncodeOutcome> {
        let name = job.name();

        let logger = JobLogger::new(&name, &self.log_dir, self.log_config(), callback)
            .map(Arc::new)
            .map_err(|e| BatchError::setup_failed(&name, format!("creating logger: {}", e)))?;

        let options = match &self.options {
            Some(options) => options.clone(),
            None => EncodeOptions::from_settings(&self.settings, &[])
                .map_err(|e| BatchError::setup_failed(&name, e.to_string()))?,
        };

        let job_work_dir = self.work_dir.join(&name);
        std::fs::create_dir_all(&job_work_dir).map_err(|e| {
            BatchError::setup_failed(&name, format!("creating work directory: {}", e))
        })?;

        logger.info(&format!("Starting job: {}", name));
        logger.info(&format!("Source: {}", catalog.source().display()));

        let mut warnings = Vec::new();
        let result = catalog
            .get_by_user_number(job.user_number)
            .map_err(Into::into)
            .and_then(|title| {
                let encoder = Encoder::new(EncoderContext {
                    options,
                    tools: self.settings.tools.clone(),
                    selection: self.settings.selection.clone(),
                    show_options_pretty: self.settings.logging.show_options_pretty,
                    runner: Arc::clone(&self.runner),
                    logger: Arc::clone(&logger),
                    source: catalog.source().to_path_buf(),
                    work_dir: job_work_dir.clone(),
                });
                let built = encoder.build(job, title)?;
                warnings.clone_from(&built.warnings);
                encoder.execute(job, title, built)
            });

        if let Err(e) = std::fs::remove_dir_all(&job_work_dir) {
            tracing::debug!("Could not remove {}: {}", job_work_dir.display(), e);
        }

        match result {
            Ok(outcome) => {
                logger.success(&format!("Job completed: {}", outcome.output.display()));
                Ok(outcome)
            }
            Err(e) => {
                logger.error(&format!("Job failed: {}", e));
                Err(BatchError::job_failed(&name, job.user_number, e).with_warnings(warnings))
            }
        }
    }

    fn log_config(&self) -> LogConfig {
        let logging = &self.settings.logging;
        LogConfig {
            level: logging.level,
            compact: logging.compact,
            error_tail: logging.error_tail as usize,
            ..LogConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TrackSelection;
    use crate::runner::scripted::{ScriptedResponse, ScriptedRunner};
    use crate::scan::fixtures::{DIRECTORY_SCAN, DVD_SCAN};
    use tempfile::{tempdir, TempDir};

    const SUCCESS_STDERR: [&str; 4] = [
        "1 job(s) to process",
        "starting job",
        "reader: done",
        "libhb: work result = 0",
    ];

    fn directory_catalog() -> ScanCatalog {
        ScanCatalog::from_scan_output(Path::new("/media/show"), DIRECTORY_SCAN).unwrap()
    }

    fn processor(dir: &TempDir, runner: &ScriptedRunner) -> QueueProcessor {
        let mut settings = Settings::default();
        settings.encode.poll_interval_ms = 1;
        QueueProcessor::new(
            settings,
            Arc::new(runner.clone()),
            dir.path().join("logs"),
            dir.path().join("work"),
        )
    }

    fn value_after<'t>(tokens: &'t [String], flag: &str) -> Option<&'t str> {
        tokens
            .iter()
            .position(|t| t == flag)
            .and_then(|i| tokens.get(i + 1))
            .map(|s| s.as_str())
    }

    #[test]
    fn directory_title_encodes_and_renames() {
        let dir = tempdir().unwrap();
        let runner = ScriptedRunner::new();
        runner.respond("HandBrakeCLI", ScriptedResponse::ok().stderr(SUCCESS_STDERR));

        let catalog = directory_catalog();
        let job = EncodeJob::new(2, dir.path().join("out/Pilot.mkv"))
            .with_audio(TrackSelection::from_pairs([(1, "Main")]));

        let report = processor(&dir, &runner).process_queue(&catalog, &[job], |_| None);

        assert!(report.all_succeeded(), "{:?}", report);

        let encode = &runner.calls_to("HandBrakeCLI")[0];
        let tokens = encode.arg_list();
        assert_eq!(value_after(tokens, "-a"), Some("1"));
        assert_eq!(value_after(tokens, "-A"), Some("Main"));
        assert_eq!(value_after(tokens, "-i"), Some("/media/show/02 - Pilot.mkv"));
        assert_eq!(value_after(tokens, "-t"), Some("1"));

        let renames = runner.calls_to("mkvpropedit");
        assert!(renames
            .iter()
            .any(|c| c.arg_list().iter().any(|a| a == "name=Main")));
        assert_eq!(renames[0].arg_list()[4], "title=Pilot");

        // Job work directory is removed afterwards
        assert!(!dir.path().join("work").join(report.results[0].name.as_str()).exists());
    }

    #[test]
    fn unknown_title_is_recorded_and_batch_continues() {
        let dir = tempdir().unwrap();
        let runner = ScriptedRunner::new();
        runner.respond("HandBrakeCLI", ScriptedResponse::ok().stderr(SUCCESS_STDERR));

        let catalog = directory_catalog();
        let jobs = [
            EncodeJob::new(3, dir.path().join("missing.mkv")),
            EncodeJob::new(2, dir.path().join("Pilot.mkv")),
        ];

        let report = processor(&dir, &runner).process_queue(&catalog, &jobs, |_| None);

        assert_eq!(report.results[0].status, JobStatus::Failed);
        assert!(report.results[0]
            .error
            .as_deref()
            .unwrap_or_default()
            .contains("3"));
        assert_eq!(report.results[1].status, JobStatus::Complete);
        assert!(!report.halted);
    }

    #[test]
    fn unsupported_aspect_fails_only_its_job() {
        let dir = tempdir().unwrap();
        let runner = ScriptedRunner::new();
        runner.respond("HandBrakeCLI", ScriptedResponse::ok().stderr(SUCCESS_STDERR));

        // Title 1 becomes SD with an aspect the builder does not know
        let text = DIRECTORY_SCAN.replacen("display aspect: 1.33", "display aspect: 2.35", 1);
        let catalog = ScanCatalog::from_scan_output(Path::new("/media/show"), &text).unwrap();
        let jobs = [
            EncodeJob::new(1, dir.path().join("Opening.mkv")),
            EncodeJob::new(2, dir.path().join("Pilot.mkv")),
        ];

        let report = processor(&dir, &runner).process_queue(&catalog, &jobs, |_| None);

        assert_eq!(report.failed(), 1);
        assert_eq!(report.completed(), 1);
        assert!(report.results[0]
            .error
            .as_deref()
            .unwrap_or_default()
            .contains("2.35"));
    }

    #[test]
    fn failed_job_keeps_missing_track_warnings() {
        let dir = tempdir().unwrap();
        let runner = ScriptedRunner::new();
        runner.respond("HandBrakeCLI", ScriptedResponse::ok().exit_code(1));

        let catalog = directory_catalog();
        let job = EncodeJob::new(2, dir.path().join("Pilot.mkv"))
            .with_audio(TrackSelection::from_pairs([(1, "Main"), (9, "")]));

        let report = processor(&dir, &runner).process_queue(&catalog, &[job], |_| None);

        let result = &report.results[0];
        assert_eq!(result.status, JobStatus::Failed);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.error.is_some());
    }

    #[test]
    fn fatal_error_halts_queue() {
        let dir = tempdir().unwrap();
        let runner = ScriptedRunner::new();
        runner.respond(
            "HandBrakeCLI",
            ScriptedResponse::ok().stderr(["1 job(s) to process", "starting job", "ERROR: out of memory"]),
        );

        let catalog = directory_catalog();
        let jobs = [
            EncodeJob::new(2, dir.path().join("Pilot.mkv")),
            EncodeJob::new(1, dir.path().join("Opening.mkv")),
            EncodeJob::new(7, dir.path().join("Extras.mkv")),
        ];

        let report = processor(&dir, &runner).process_queue(&catalog, &jobs, |_| None);

        assert!(report.halted);
        assert_eq!(report.failed(), 1);
        assert_eq!(report.not_run(), 2);
        assert_eq!(runner.calls_to("HandBrakeCLI").len(), 1);
        assert_eq!(runner.terminations(), 1);
    }

    #[test]
    fn missing_encoder_fails_job_without_halting() {
        let dir = tempdir().unwrap();
        let runner = ScriptedRunner::new();
        runner.missing("HandBrakeCLI");

        let catalog = directory_catalog();
        let jobs = [
            EncodeJob::new(2, dir.path().join("Pilot.mkv")),
            EncodeJob::new(1, dir.path().join("Opening.mkv")),
        ];

        let report = processor(&dir, &runner).process_queue(&catalog, &jobs, |_| None);

        assert_eq!(report.failed(), 2);
        assert!(!report.halted);
    }

    #[test]
    fn callback_receives_job_log() {
        let dir = tempdir().unwrap();
        let runner = ScriptedRunner::new();
        runner.respond("HandBrakeCLI", ScriptedResponse::ok().stderr(SUCCESS_STDERR));
        let lines = Arc::new(parking_lot::Mutex::new(Vec::<String>::new()));

        let catalog = directory_catalog();
        let job = EncodeJob::new(2, dir.path().join("Pilot.mkv"));
        let sink = Arc::clone(&lines);
        processor(&dir, &runner).process_queue(&catalog, &[job], move |_| {
            let sink = Arc::clone(&sink);
            Some(Box::new(move |line: &str| sink.lock().push(line.to_string())) as GuiLogCallback)
        });

        assert!(lines.lock().iter().any(|l| l.contains("Starting job: title_02_Pilot")));
    }

    #[test]
    fn candidate_jobs_follow_min_time() {
        let dir = tempdir().unwrap();
        let runner = ScriptedRunner::new();
        let catalog =
            ScanCatalog::from_scan_output(Path::new("/discs/MOVIE.iso"), DVD_SCAN).unwrap();

        let mut processor = processor(&dir, &runner);
        processor.settings.scan.min_time = 10;
        let jobs = processor.candidate_jobs(&catalog);

        assert_eq!(jobs.len(), 1);
        assert!(!jobs[0].is_bonus_feature);
        assert!(jobs[0].output.ends_with("title_01.mkv"));
    }

    #[test]
    fn report_serializes_status() {
        let job = EncodeJob::new(4, "/out/Bloopers.mkv");
        let report = BatchReport {
            results: vec![JobResult::not_run(&job)],
            halted: true,
        };

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"halted\":true"));
        assert!(!json.contains("\"error\""));
    }
}
