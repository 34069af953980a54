//! Error types for batch processing.
//!
//! Errors carry context that chains through layers:
//! Job → Encode → Tool → Detail

use thiserror::Error;

use crate::encode::EncodeError;
use crate::select::MissingTrackWarning;

/// A job failure with its job context.
#[derive(Error, Debug)]
pub enum BatchError {
    /// Encoding the job's title failed.
    #[error("Job '{job_name}' (title {user_number}) failed: {source}")]
    JobFailed {
        job_name: String,
        user_number: u32,
        #[source]
        source: EncodeError,
        /// Requested tracks the title did not have, if selection ran.
        warnings: Vec<MissingTrackWarning>,
    },

    /// Failed to set up the job (logger, directories, options).
    #[error("Job '{job_name}' setup failed: {message}")]
    SetupFailed { job_name: String, message: String },
}

impl BatchError {
    pub fn job_failed(job_name: impl Into<String>, user_number: u32, source: EncodeError) -> Self {
        Self::JobFailed {
            job_name: job_name.into(),
            user_number,
            source,
            warnings: Vec::new(),
        }
    }

    /// Attach the selection warnings gathered before the failure.
    pub fn with_warnings(mut self, gathered: Vec<MissingTrackWarning>) -> Self {
        if let Self::JobFailed { warnings, .. } = &mut self {
            *warnings = gathered;
        }
        self
    }

    pub fn warnings(&self) -> &[MissingTrackWarning] {
        match self {
            Self::JobFailed { warnings, .. } => warnings,
            Self::SetupFailed { .. } => &[],
        }
    }

    pub fn setup_failed(job_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SetupFailed {
            job_name: job_name.into(),
            message: message.into(),
        }
    }

    /// Whether the remaining jobs must not run.
    pub fn halts_batch(&self) -> bool {
        match self {
            Self::JobFailed { source, .. } => source.halts_batch(),
            Self::SetupFailed { .. } => false,
        }
    }
}

/// Result type for batch operations.
pub type BatchResult<T> = Result<T, BatchError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TrackType;
    use crate::scan::ScanError;

    #[test]
    fn only_fatal_encoder_errors_halt() {
        let fatal = BatchError::job_failed("t", 1, EncodeError::fatal(1, "boom", "ERROR: boom"));
        let unknown = BatchError::job_failed("t", 9, ScanError::unknown_title(9).into());
        let setup = BatchError::setup_failed("t", "no space");

        assert!(fatal.halts_batch());
        assert!(!unknown.halts_batch());
        assert!(!setup.halts_batch());
    }

    #[test]
    fn warnings_attach_to_job_failures_only() {
        let warning = MissingTrackWarning {
            title: 2,
            track_type: TrackType::Audio,
            track_number: 9,
        };

        let failed = BatchError::job_failed("t", 2, EncodeError::failed(2, 1))
            .with_warnings(vec![warning.clone()]);
        let setup = BatchError::setup_failed("t", "no space").with_warnings(vec![warning.clone()]);

        assert_eq!(failed.warnings(), &[warning]);
        assert!(setup.warnings().is_empty());
    }

    #[test]
    fn message_names_job_and_title() {
        let err = BatchError::job_failed("title_02_Pilot", 2, EncodeError::failed(5, 3));
        let message = err.to_string();
        assert!(message.contains("title_02_Pilot"));
        assert!(message.contains("title 2"));
        assert!(message.contains("code 3"));
    }
}
