use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::models::job::JobId;
use crate::models::video::VideoFile;
use crate::services::client::{AnalysisApi, ApiError};
use crate::services::preview::PreviewRegistry;

/// Receives whole percentages (0-100) as an upload advances.
pub type ProgressCallback = Arc<dyn Fn(u8) + Send + Sync>;

/// Converts transferred byte counts into non-decreasing percentages.
///
/// Clones share the same counters, so the request body stream and the
/// session observe one progression.
#[derive(Clone)]
pub struct ProgressTracker {
    inner: Arc<TrackerInner>,
}

struct TrackerInner {
    total: u64,
    sent: AtomicU64,
    reported: AtomicU8,
    callback: Option<ProgressCallback>,
}

impl ProgressTracker {
    pub fn new(total: u64, callback: Option<ProgressCallback>) -> Self {
        Self {
            inner: Arc::new(TrackerInner {
                total,
                sent: AtomicU64::new(0),
                reported: AtomicU8::new(0),
                callback,
            }),
        }
    }

    /// A tracker that reports nowhere.
    pub fn silent(total: u64) -> Self {
        Self::new(total, None)
    }

    /// Record `bytes` more handed to the transport.
    pub fn advance(&self, bytes: u64) {
        let sent = self.inner.sent.fetch_add(bytes, Ordering::SeqCst) + bytes;
        self.report(percent_of(sent, self.inner.total));
    }

    /// Mark the transfer complete.
    pub fn finish(&self) {
        self.report(100);
    }

    /// Highest percentage reported so far.
    pub fn percent(&self) -> u8 {
        self.inner.reported.load(Ordering::SeqCst)
    }

    fn start(&self) {
        if let Some(callback) = &self.inner.callback {
            callback(0);
        }
    }

    fn report(&self, percent: u8) {
        let previous = self.inner.reported.fetch_max(percent, Ordering::SeqCst);
        if percent > previous {
            if let Some(callback) = &self.inner.callback {
                callback(percent);
            }
        }
    }
}

/// Rounded percentage, matching how browsers report upload progress.
fn percent_of(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    let sent = sent.min(total) as u128;
    let total = total as u128;
    ((sent * 100 + total / 2) / total) as u8
}

/// Per-submission settings.
#[derive(Clone, Default)]
pub struct UploadOptions {
    pub target_fps: Option<u32>,
    pub on_progress: Option<ProgressCallback>,
    pub timeout: Option<Duration>,
}

/// Transfers one validated file to the analysis service.
pub struct UploadSession<A> {
    api: Arc<A>,
    previews: PreviewRegistry,
}

impl<A: AnalysisApi> UploadSession<A> {
    pub fn new(api: Arc<A>, previews: PreviewRegistry) -> Self {
        Self { api, previews }
    }

    /// Upload `file` and return the job id the service assigned.
    ///
    /// Cancelling `cancel` drops the in-flight request. The file's preview is
    /// held for the duration of the call and released on every exit path.
    /// Failures are returned as-is; nothing is retried.
    pub async fn submit(
        &self,
        file: &VideoFile,
        options: UploadOptions,
        cancel: &CancellationToken,
    ) -> Result<JobId, UploadError> {
        let preview = self.previews.acquire(file);
        let tracker = ProgressTracker::new(file.size(), options.on_progress);
        tracker.start();

        tracing::info!(
            file = %file.name,
            size = file.size(),
            mime_type = %file.mime_type,
            target_fps = ?options.target_fps,
            preview = %preview.handle(),
            "Uploading video for analysis"
        );
        metrics::counter!("analysis_uploads_total").increment(1);

        let started = Instant::now();
        let transfer = self.api.upload(file, options.target_fps, tracker.clone());

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!(file = %file.name, sent_percent = tracker.percent(), "Upload cancelled");
                return Err(UploadError::Cancelled);
            }
            outcome = async {
                match options.timeout {
                    Some(limit) => match tokio::time::timeout(limit, transfer).await {
                        Ok(result) => result.map_err(UploadError::from),
                        Err(_) => Err(UploadError::TimedOut(limit)),
                    },
                    None => transfer.await.map_err(UploadError::from),
                }
            } => outcome,
        };

        match outcome {
            Ok(job_id) => {
                tracker.finish();
                metrics::histogram!("analysis_upload_seconds").record(started.elapsed().as_secs_f64());
                tracing::info!(
                    job_id = %job_id,
                    upload_ms = started.elapsed().as_millis() as u64,
                    "Upload accepted"
                );
                Ok(job_id)
            }
            Err(e) => {
                metrics::counter!("analysis_uploads_failed").increment(1);
                tracing::warn!(file = %file.name, error = %e, "Upload failed");
                Err(e)
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Upload cancelled")]
    Cancelled,

    #[error("Upload timed out after {} seconds", .0.as_secs())]
    TimedOut(Duration),

    #[error(transparent)]
    Api(#[from] ApiError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recording() -> (ProgressCallback, Arc<Mutex<Vec<u8>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: ProgressCallback = Arc::new(move |p: u8| sink.lock().unwrap().push(p));
        (callback, seen)
    }

    #[test]
    fn test_percent_rounding() {
        assert_eq!(percent_of(0, 1000), 0);
        assert_eq!(percent_of(4, 1000), 0);
        assert_eq!(percent_of(5, 1000), 1);
        assert_eq!(percent_of(999, 1000), 100);
        assert_eq!(percent_of(1000, 1000), 100);
        assert_eq!(percent_of(2000, 1000), 100);
        assert_eq!(percent_of(0, 0), 100);
    }

    #[test]
    fn test_tracker_reports_increasing_values_once() {
        let (callback, seen) = recording();
        let tracker = ProgressTracker::new(400, Some(callback));

        tracker.start();
        tracker.advance(100);
        tracker.advance(0);
        tracker.advance(100);
        tracker.advance(200);
        tracker.finish();

        assert_eq!(*seen.lock().unwrap(), vec![0, 25, 50, 100]);
        assert_eq!(tracker.percent(), 100);
    }

    #[test]
    fn test_clones_share_progress() {
        let (callback, seen) = recording();
        let tracker = ProgressTracker::new(10, Some(callback));
        let body_side = tracker.clone();

        body_side.advance(5);
        tracker.advance(1);
        tracker.finish();

        assert_eq!(*seen.lock().unwrap(), vec![50, 60, 100]);
    }
}
