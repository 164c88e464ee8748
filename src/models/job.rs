use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::models::result::AnalysisResult;

/// Shown when an upload fails without a server-provided message.
pub const UPLOAD_FAILED_MESSAGE: &str = "Failed to upload video. Please try again.";

/// Shown when status polling fails after the job was accepted.
pub const POLLING_FAILED_MESSAGE: &str = "Failed to load analysis results. Please try again.";

/// Shown when the service reports a failed analysis without a reason.
pub const ANALYSIS_FAILED_MESSAGE: &str = "An unknown error occurred during analysis.";

/// Opaque analysis identifier assigned by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle status of an analysis job. Variants are declared in
/// lifecycle order so `Ord` reflects forward progress.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Uploading,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Forward-only transition: a terminal status is final and an earlier
    /// status never replaces a later one.
    pub fn advance(self, next: JobStatus) -> JobStatus {
        if self.is_terminal() {
            self
        } else {
            self.max(next)
        }
    }
}

/// Client-side view of one server-side analysis job.
///
/// `result` is present only when completed and `error` only when failed;
/// the mutators keep both invariants.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisJob {
    id: JobId,
    status: JobStatus,
    progress: u8,
    status_message: String,
    error: Option<String>,
    result: Option<AnalysisResult>,
    updated_at: DateTime<Utc>,
}

impl AnalysisJob {
    /// A freshly accepted job, before the first status query.
    pub fn accepted(id: JobId) -> Self {
        Self {
            id,
            status: JobStatus::Pending,
            progress: 0,
            status_message: String::new(),
            error: None,
            result: None,
            updated_at: Utc::now(),
        }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn progress(&self) -> u8 {
        self.progress
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn into_result(self) -> Option<AnalysisResult> {
        self.result
    }

    /// Apply a non-terminal status report. Terminal reports go through
    /// [`complete`](Self::complete) or [`fail`](Self::fail).
    pub(crate) fn record_progress(&mut self, status: JobStatus, progress: u8, message: String) {
        if self.status.is_terminal() {
            return;
        }
        let next = self.status.advance(status);
        if next.is_terminal() {
            return;
        }
        self.status = next;
        self.progress = progress.min(100);
        self.status_message = message;
        self.updated_at = Utc::now();
    }

    pub(crate) fn complete(&mut self, result: AnalysisResult, message: String) {
        if self.status.is_terminal() {
            return;
        }
        self.status = JobStatus::Completed;
        self.progress = 100;
        self.status_message = message;
        self.result = Some(result);
        self.updated_at = Utc::now();
    }

    pub(crate) fn fail(&mut self, reason: Option<String>, message: String) {
        if self.status.is_terminal() {
            return;
        }
        self.status = JobStatus::Failed;
        self.status_message = message;
        self.error = Some(
            reason
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| ANALYSIS_FAILED_MESSAGE.to_string()),
        );
        self.updated_at = Utc::now();
    }
}

/// Why a job ended in the failed state. Messages are user facing.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum JobError {
    #[error("Failed to upload video. Please try again.")]
    Network(String),

    #[error("{message}")]
    Server { status: Option<u16>, message: String },

    #[error("Failed to load analysis results. Please try again.")]
    Polling(String),

    #[error("{0}")]
    AnalysisFailure(String),

    #[error("Analysis did not finish within {} seconds", .0.as_secs())]
    Timeout(Duration),
}

impl JobError {
    /// Build a server error, falling back to the generic upload message
    /// when the server sent nothing usable.
    pub fn server(status: Option<u16>, message: Option<String>) -> Self {
        let message = message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| UPLOAD_FAILED_MESSAGE.to_string());
        JobError::Server { status, message }
    }

    /// Technical detail for logs; the `Display` text is for users.
    pub fn detail(&self) -> String {
        match self {
            JobError::Network(detail) | JobError::Polling(detail) => detail.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_never_regresses() {
        assert_eq!(JobStatus::Processing.advance(JobStatus::Pending), JobStatus::Processing);
        assert_eq!(JobStatus::Pending.advance(JobStatus::Processing), JobStatus::Processing);
        assert_eq!(JobStatus::Completed.advance(JobStatus::Failed), JobStatus::Completed);
        assert_eq!(JobStatus::Failed.advance(JobStatus::Processing), JobStatus::Failed);
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(JobStatus::Processing.to_string(), "processing");
        assert_eq!("completed".parse::<JobStatus>().unwrap(), JobStatus::Completed);
        let parsed: JobStatus = serde_json::from_str("\"failed\"").unwrap();
        assert_eq!(parsed, JobStatus::Failed);
    }

    #[test]
    fn test_failed_job_carries_error_and_no_result() {
        let mut job = AnalysisJob::accepted(JobId::new("a1"));
        job.record_progress(JobStatus::Processing, 40, "Analyzing body motion".into());
        job.fail(None, String::new());

        assert_eq!(job.status(), JobStatus::Failed);
        assert_eq!(job.error(), Some(ANALYSIS_FAILED_MESSAGE));
        assert!(job.result().is_none());
        assert_eq!(job.progress(), 40);
    }

    #[test]
    fn test_terminal_job_ignores_later_reports() {
        let mut job = AnalysisJob::accepted(JobId::new("a2"));
        job.complete(AnalysisResult::default(), "done".into());
        job.record_progress(JobStatus::Processing, 10, "late".into());
        job.fail(Some("late failure".into()), String::new());

        assert_eq!(job.status(), JobStatus::Completed);
        assert_eq!(job.progress(), 100);
        assert!(job.error().is_none());
        assert!(job.result().is_some());
    }

    #[test]
    fn test_server_error_fallback_message() {
        let err = JobError::server(Some(500), Some("  ".into()));
        assert_eq!(err.to_string(), UPLOAD_FAILED_MESSAGE);

        let err = JobError::server(Some(413), Some("Video too long".into()));
        assert_eq!(err.to_string(), "Video too long");
    }
}
