use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::StreamExt;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::config::ClientConfig;
use crate::models::job::{JobError, JobId, JobStatus};
use crate::models::result::AnalysisResult;
use crate::models::video::VideoFile;
use crate::services::client::AnalysisApi;
use crate::services::monitor::{MonitorConfig, ProcessingMonitor};
use crate::services::preview::PreviewRegistry;
use crate::services::scoring::{self, ScoreSummary};
use crate::services::upload::{ProgressCallback, UploadError, UploadOptions, UploadSession};
use crate::services::validation::{self, ValidationError};

/// Observable state of the current job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    /// No job. `rejected` holds the inline error when the last selected
    /// file failed validation.
    Idle { rejected: Option<ValidationError> },
    Validating,
    Uploading { progress: u8 },
    Processing { job_id: JobId, progress: u8, message: String },
    Completed { job_id: JobId, result: AnalysisResult, summary: ScoreSummary },
    Failed { job_id: Option<JobId>, error: JobError },
}

impl Default for JobState {
    fn default() -> Self {
        JobState::Idle { rejected: None }
    }
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed { .. } | JobState::Failed { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            JobState::Idle { .. } => "idle",
            JobState::Validating => "validating",
            JobState::Uploading { .. } => "uploading",
            JobState::Processing { .. } => "processing",
            JobState::Completed { .. } => "completed",
            JobState::Failed { .. } => "failed",
        }
    }
}

/// Per-job settings the controller hands to the upload and the monitor.
#[derive(Debug, Clone, Default)]
pub struct JobSettings {
    pub monitor: MonitorConfig,
    pub target_fps: Option<u32>,
    pub upload_timeout: Option<Duration>,
}

impl From<&ClientConfig> for JobSettings {
    fn from(config: &ClientConfig) -> Self {
        Self {
            monitor: MonitorConfig::from(config),
            target_fps: config.target_fps,
            upload_timeout: config.upload_timeout(),
        }
    }
}

/// Cancellation scope of one job: the upload and the monitor task.
struct ActiveJob {
    cancel: CancellationToken,
    tasks: TaskTracker,
}

impl ActiveJob {
    fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
            tasks: TaskTracker::new(),
        }
    }

    fn shutdown(&self) {
        self.cancel.cancel();
        self.tasks.close();
    }
}

/// Writes the shared state on behalf of one job generation. Writes from a
/// superseded generation are dropped.
#[derive(Clone)]
struct Publisher {
    generation: u64,
    current: Arc<AtomicU64>,
    state: Arc<watch::Sender<JobState>>,
}

impl Publisher {
    fn publish(&self, next: JobState) -> bool {
        self.state.send_if_modified(|state| {
            if self.current.load(Ordering::SeqCst) != self.generation {
                return false;
            }
            *state = next;
            true
        })
    }

    /// Raise upload progress; ignored once the job has left `Uploading`.
    fn upload_progress(&self, progress: u8) {
        self.state.send_if_modified(|state| {
            if self.current.load(Ordering::SeqCst) != self.generation {
                return false;
            }
            match state {
                JobState::Uploading { progress: current } if progress > *current => {
                    *current = progress;
                    true
                }
                _ => false,
            }
        });
    }
}

/// Drives a video through validation, upload and processing, publishing
/// each step as a [`JobState`].
///
/// At most one job is active. Starting another one cancels the previous job
/// and waits for its monitor to stop before uploading.
pub struct JobController<A> {
    api: Arc<A>,
    previews: PreviewRegistry,
    settings: JobSettings,
    state: Arc<watch::Sender<JobState>>,
    generation: Arc<AtomicU64>,
    active: Mutex<Option<ActiveJob>>,
}

impl<A: AnalysisApi> JobController<A> {
    pub fn new(api: Arc<A>, settings: JobSettings) -> Self {
        let (state, _) = watch::channel(JobState::default());
        Self {
            api,
            previews: PreviewRegistry::new(),
            settings,
            state: Arc::new(state),
            generation: Arc::new(AtomicU64::new(0)),
            active: Mutex::new(None),
        }
    }

    pub fn with_previews(mut self, previews: PreviewRegistry) -> Self {
        self.previews = previews;
        self
    }

    pub fn previews(&self) -> &PreviewRegistry {
        &self.previews
    }

    /// Receiver for presentation collaborators.
    pub fn subscribe(&self) -> watch::Receiver<JobState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> JobState {
        self.state.borrow().clone()
    }

    /// Run `file` through the whole flow and return the state the job ended
    /// in. A cancelled job ends in `Idle`.
    pub async fn analyze(&self, file: VideoFile) -> JobState {
        let job = ActiveJob::new();
        let cancel = job.cancel.clone();
        let tasks = job.tasks.clone();
        let (previous, publisher) = self.replace_active(Some(job));

        if let Some(previous) = previous {
            tracing::info!("Cancelling previous analysis job");
            previous.shutdown();
            previous.tasks.wait().await;
        }

        publisher.publish(JobState::Validating);
        if let Err(rejected) = validation::validate(&file) {
            tracing::info!(file = %file.name, error = %rejected, "Video rejected");
            let state = JobState::Idle {
                rejected: Some(rejected),
            };
            publisher.publish(state.clone());
            return state;
        }

        publisher.publish(JobState::Uploading { progress: 0 });
        let progress_publisher = publisher.clone();
        let on_progress: ProgressCallback =
            Arc::new(move |progress| progress_publisher.upload_progress(progress));

        let options = UploadOptions {
            target_fps: self.settings.target_fps,
            on_progress: Some(on_progress),
            timeout: self.settings.upload_timeout,
        };

        let upload = UploadSession::new(Arc::clone(&self.api), self.previews.clone());
        let job_id = match upload.submit(&file, options, &cancel).await {
            Ok(job_id) => job_id,
            Err(UploadError::Cancelled) => return JobState::default(),
            Err(UploadError::TimedOut(limit)) => {
                let error = JobError::Network(format!("upload timed out after {:?}", limit));
                return self.fail(&publisher, None, error);
            }
            Err(UploadError::Api(e)) => return self.fail(&publisher, None, e.into()),
        };
        drop(file);

        publisher.publish(JobState::Processing {
            job_id: job_id.clone(),
            progress: 0,
            message: String::new(),
        });

        let monitor = ProcessingMonitor::new(Arc::clone(&self.api), self.settings.monitor);
        let mut snapshots = monitor.watch_with(job_id.clone(), cancel.child_token(), tasks);

        while let Some(event) = snapshots.next().await {
            let snapshot = match event {
                Ok(snapshot) => snapshot,
                Err(error) => return self.fail(&publisher, Some(job_id), error),
            };

            match snapshot.status() {
                JobStatus::Completed => {
                    let Some(result) = snapshot.into_result() else {
                        let error = JobError::Polling("completed job carried no result".to_string());
                        return self.fail(&publisher, Some(job_id), error);
                    };
                    let summary = scoring::summarize(&result);
                    tracing::info!(
                        job_id = %job_id,
                        overall = summary.overall,
                        tier = %summary.tier,
                        "Analysis completed"
                    );
                    metrics::counter!("analysis_jobs_completed").increment(1);

                    let state = JobState::Completed {
                        job_id,
                        result,
                        summary,
                    };
                    publisher.publish(state.clone());
                    return state;
                }
                JobStatus::Failed => {
                    let reason = snapshot.error().unwrap_or_default().to_string();
                    return self.fail(&publisher, Some(job_id), JobError::AnalysisFailure(reason));
                }
                _ => {
                    publisher.publish(JobState::Processing {
                        job_id: job_id.clone(),
                        progress: snapshot.progress(),
                        message: snapshot.status_message().to_string(),
                    });
                }
            }
        }

        tracing::debug!(job_id = %job_id, "Analysis job cancelled while processing");
        JobState::default()
    }

    /// Abort whatever is in flight and return to `Idle`. Safe to call at any
    /// time, any number of times.
    pub fn cancel(&self) {
        let (previous, publisher) = self.replace_active(None);
        if let Some(previous) = previous {
            tracing::info!("Cancelling analysis job");
            previous.shutdown();
        }
        publisher.publish(JobState::default());
    }

    /// Like [`cancel`](Self::cancel), but also waits for the monitor task to exit.
    pub async fn reset(&self) {
        let (previous, publisher) = self.replace_active(None);
        if let Some(previous) = previous {
            previous.shutdown();
            previous.tasks.wait().await;
        }
        publisher.publish(JobState::default());
    }

    /// Swap the active job and start a new state generation.
    fn replace_active(&self, next: Option<ActiveJob>) -> (Option<ActiveJob>, Publisher) {
        let mut active = self.lock_active();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let previous = std::mem::replace(&mut *active, next);

        let publisher = Publisher {
            generation,
            current: Arc::clone(&self.generation),
            state: Arc::clone(&self.state),
        };
        (previous, publisher)
    }

    fn lock_active(&self) -> MutexGuard<'_, Option<ActiveJob>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fail(&self, publisher: &Publisher, job_id: Option<JobId>, error: JobError) -> JobState {
        tracing::warn!(
            job_id = job_id.as_ref().map(|id| id.as_str()),
            error = %error,
            detail = %error.detail(),
            "Analysis job failed"
        );
        metrics::counter!("analysis_jobs_failed").increment(1);

        let state = JobState::Failed { job_id, error };
        publisher.publish(state.clone());
        state
    }
}

impl<A> Drop for JobController<A> {
    fn drop(&mut self) {
        if let Some(active) = self.active.get_mut().unwrap_or_else(PoisonError::into_inner).take() {
            active.shutdown();
        }
    }
}
