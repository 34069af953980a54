//! Encoder output monitor.
//!
//! Pure state machine fed one stderr line at a time by the encoder's
//! supervisor. It tracks which pass is running, keeps the job configuration
//! of the final pass for diagnostics, reports the work result and turns
//! encoder error lines into [`EncodeError::EncodeFatal`].

use std::sync::LazyLock;

use regex::Regex;

use super::errors::{EncodeError, EncodeResult};

static JOB_COUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+) job\(s\) to process").expect("Valid regex"));

static TIMESTAMP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[\d{2}:\d{2}:\d{2}\]\s?").expect("Valid regex"));

static WORK_RESULT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"work result = (-?\d+)").expect("Valid regex"));

const ERROR_PREFIXES: [&str; 2] = ["x264 [error]:", "ERROR:"];

const STATS_FILE_FAILURE: &str = "could not be written";

const DISK_SPACE_HINT: &str =
    "the encoder could not write its stats file; check free disk space in the working directory";

/// Where the monitor is within the encoder's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    AwaitingJobCount,
    BetweenJobs,
    InConfigurationBlock,
}

/// Something the supervisor may want to act on or log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    JobCount { expected: u32 },
    JobStarted { job: u32 },
    /// Configuration of the last pass, one line per entry.
    FinalConfiguration(Vec<String>),
    PassCompleted { job: u32 },
    /// Result of the whole run; `0` is success.
    WorkResult { code: i32 },
}

#[derive(Debug, Clone)]
pub struct OutputMonitor {
    title: u32,
    expected_jobs: u32,
    current_job: u32,
    parse_state: ParseState,
    configuration_buffer: Vec<String>,
    final_configuration: Vec<String>,
}

impl OutputMonitor {
    pub fn new(title: u32) -> Self {
        Self {
            title,
            expected_jobs: 0,
            current_job: 0,
            parse_state: ParseState::AwaitingJobCount,
            configuration_buffer: Vec::new(),
            final_configuration: Vec::new(),
        }
    }

    pub fn state(&self) -> ParseState {
        self.parse_state
    }

    pub fn expected_jobs(&self) -> u32 {
        self.expected_jobs
    }

    pub fn current_job(&self) -> u32 {
        self.current_job
    }

    /// Whether the running pass is the last one.
    pub fn is_final_pass(&self) -> bool {
        self.current_job > 0 && self.current_job == self.expected_jobs
    }

    /// Configuration of the final pass, once its block has ended.
    ///
    /// Kept after an error line so it can be reported with the failure.
    pub fn final_configuration(&self) -> &[String] {
        &self.final_configuration
    }

    /// Process one line of encoder stderr.
    pub fn feed(&mut self, line: &str) -> EncodeResult<Vec<MonitorEvent>> {
        let mut events = Vec::new();
        let untimed = TIMESTAMP.replace(line, "");

        if untimed.starts_with("reader: done") {
            if self.parse_state == ParseState::InConfigurationBlock {
                self.end_configuration_block(&mut events);
            }
            self.parse_state = ParseState::BetweenJobs;
            events.push(MonitorEvent::PassCompleted {
                job: self.current_job,
            });
            return Ok(events);
        }

        if self.parse_state == ParseState::InConfigurationBlock {
            if TIMESTAMP.is_match(line) {
                self.configuration_buffer.push(untimed.into_owned());
                return Ok(events);
            }
            self.end_configuration_block(&mut events);
            self.parse_state = ParseState::BetweenJobs;
        }

        self.check_error(line)?;

        if let Some(code) = WORK_RESULT
            .captures(line)
            .and_then(|caps| caps[1].parse::<i32>().ok())
        {
            events.push(MonitorEvent::WorkResult { code });
            return Ok(events);
        }

        match self.parse_state {
            ParseState::AwaitingJobCount => {
                if let Some(expected) = JOB_COUNT
                    .captures(line)
                    .and_then(|caps| caps[1].parse::<u32>().ok())
                {
                    self.expected_jobs = expected;
                    self.parse_state = ParseState::BetweenJobs;
                    events.push(MonitorEvent::JobCount { expected });
                }
            }
            ParseState::BetweenJobs => {
                if line.contains("starting job") {
                    self.current_job += 1;
                    events.push(MonitorEvent::JobStarted {
                        job: self.current_job,
                    });
                } else if line.contains("job configuration:") {
                    self.parse_state = ParseState::InConfigurationBlock;
                }
            }
            ParseState::InConfigurationBlock => {}
        }

        Ok(events)
    }

    fn end_configuration_block(&mut self, events: &mut Vec<MonitorEvent>) {
        let buffer = std::mem::take(&mut self.configuration_buffer);
        if self.current_job == self.expected_jobs {
            self.final_configuration.clone_from(&buffer);
            events.push(MonitorEvent::FinalConfiguration(buffer));
        }
    }

    fn check_error(&self, line: &str) -> EncodeResult<()> {
        let trimmed = line.trim_start();
        if !ERROR_PREFIXES.iter().any(|p| trimmed.starts_with(p)) {
            return Ok(());
        }

        let explanation = trimmed
            .split_once(": ")
            .map(|(_, rest)| rest.trim())
            .unwrap_or(trimmed);

        let message = if explanation.contains(STATS_FILE_FAILURE) {
            format!("{} ({})", explanation, DISK_SPACE_HINT)
        } else {
            explanation.to_string()
        };

        Err(EncodeError::fatal(self.title, message, line))
    }
}
