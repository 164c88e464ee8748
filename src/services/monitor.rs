use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::Stream;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::ClientConfig;
use crate::models::job::{AnalysisJob, JobError, JobId, JobStatus};
use crate::services::client::{AnalysisApi, ApiError};

/// One item of a monitor's snapshot sequence.
pub type MonitorEvent = Result<AnalysisJob, JobError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Delay before the first query and between queries.
    pub interval: Duration,
    /// Stop with [`JobError::Timeout`] once polling has lasted this long.
    pub max_duration: Option<Duration>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(3000),
            max_duration: None,
        }
    }
}

impl From<&ClientConfig> for MonitorConfig {
    fn from(config: &ClientConfig) -> Self {
        Self {
            interval: config.poll_interval(),
            max_duration: config.max_poll_duration(),
        }
    }
}

/// Polls job status on a fixed interval until the job reaches a terminal state.
pub struct ProcessingMonitor<A> {
    api: Arc<A>,
    config: MonitorConfig,
}

impl<A: AnalysisApi> ProcessingMonitor<A> {
    pub fn new(api: Arc<A>, config: MonitorConfig) -> Self {
        Self { api, config }
    }

    /// Start watching `job_id` with a private cancellation token and tracker.
    pub fn watch(&self, job_id: JobId) -> MonitorHandle {
        self.watch_with(job_id, CancellationToken::new(), TaskTracker::new())
    }

    /// Start watching `job_id`, spawning the poll task on `tracker`.
    ///
    /// The sequence ends after the first completed or failed snapshot, after
    /// a polling error, or when `cancel` fires. No query is issued after any
    /// of those.
    pub fn watch_with(
        &self,
        job_id: JobId,
        cancel: CancellationToken,
        tracker: TaskTracker,
    ) -> MonitorHandle {
        let (tx, rx) = mpsc::channel(8);

        tracing::info!(
            job_id = %job_id,
            interval_ms = self.config.interval.as_millis() as u64,
            max_duration_secs = self.config.max_duration.map(|d| d.as_secs()),
            "Watching analysis job"
        );

        tracker.spawn(poll_until_terminal(
            Arc::clone(&self.api),
            job_id.clone(),
            self.config,
            cancel.clone(),
            tx,
        ));

        MonitorHandle {
            job_id,
            cancel,
            tracker,
            snapshots: ReceiverStream::new(rx),
        }
    }
}

/// Lazy sequence of [`AnalysisJob`] snapshots produced by a running monitor.
///
/// Dropping the handle cancels the poll task.
pub struct MonitorHandle {
    job_id: JobId,
    cancel: CancellationToken,
    tracker: TaskTracker,
    snapshots: ReceiverStream<MonitorEvent>,
}

impl MonitorHandle {
    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Stop the timer. Idempotent.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Stop the timer and wait until the poll task has exited.
    pub async fn stop(self) {
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }
}

impl Stream for MonitorHandle {
    type Item = MonitorEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.snapshots).poll_next(cx)
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn poll_until_terminal<A: AnalysisApi>(
    api: Arc<A>,
    job_id: JobId,
    config: MonitorConfig,
    cancel: CancellationToken,
    tx: mpsc::Sender<MonitorEvent>,
) {
    let mut job = AnalysisJob::accepted(job_id);
    let started = Instant::now();
    let mut ticker = interval_at(started + config.interval, config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut polls: u64 = 0;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let event = match config.max_duration {
            Some(limit) if started.elapsed() >= limit => {
                tracing::warn!(job_id = %job.id(), polls, limit_secs = limit.as_secs(), "Polling limit reached");
                Err(JobError::Timeout(limit))
            }
            _ => {
                polls += 1;
                metrics::counter!("analysis_status_polls_total").increment(1);
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    event = poll_once(api.as_ref(), &mut job) => event,
                }
            }
        };

        let terminal = match &event {
            Ok(snapshot) => snapshot.status().is_terminal(),
            Err(_) => true,
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            sent = tx.send(event) => {
                if sent.is_err() {
                    tracing::debug!(job_id = %job.id(), "Snapshot receiver dropped");
                    break;
                }
            }
        }

        if terminal {
            tracing::info!(job_id = %job.id(), status = %job.status(), polls, "Monitor finished");
            return;
        }
    }

    tracing::debug!(job_id = %job.id(), polls, "Monitor stopped");
}

/// One poll tick: query status, and fetch the full result on completion.
async fn poll_once<A: AnalysisApi>(api: &A, job: &mut AnalysisJob) -> MonitorEvent {
    let report = api
        .status(job.id())
        .await
        .map_err(|e| polling_error(job.id(), e))?;

    if report.status < job.status() {
        tracing::warn!(
            job_id = %job.id(),
            current = %job.status(),
            reported = %report.status,
            "Ignoring status regression"
        );
        return Ok(job.clone());
    }

    match job.status().advance(report.status) {
        JobStatus::Completed => {
            let result = api
                .results(job.id())
                .await
                .map_err(|e| polling_error(job.id(), e))?;
            job.complete(result, report.status_message);
        }
        JobStatus::Failed => {
            tracing::warn!(job_id = %job.id(), reason = ?report.error, "Analysis failed on the server");
            job.fail(report.error, report.status_message);
        }
        status => {
            tracing::debug!(job_id = %job.id(), status = %status, progress = report.progress, "Status update");
            job.record_progress(status, report.progress, report.status_message);
        }
    }

    Ok(job.clone())
}

fn polling_error(job_id: &JobId, err: ApiError) -> JobError {
    tracing::error!(job_id = %job_id, error = %err, "Status query failed");
    JobError::Polling(err.to_string())
}
