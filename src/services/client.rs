use std::future::Future;
use std::time::Duration;

use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::models::job::{JobError, JobId};
use crate::models::responses::{
    ErrorBody, ScoreReport, StatusResponse, SubmitResponse, SystemTestResponse,
};
use crate::models::result::AnalysisResult;
use crate::models::video::VideoFile;
use crate::services::upload::ProgressTracker;
use crate::services::validation::ValidationError;

/// Size of each upload body chunk; progress is reported per chunk.
const UPLOAD_CHUNK_BYTES: usize = 64 * 1024;

/// The remote analysis service, as seen by the upload and polling code.
///
/// Injected into [`UploadSession`](crate::services::upload::UploadSession),
/// [`ProcessingMonitor`](crate::services::monitor::ProcessingMonitor) and
/// [`JobController`](crate::services::controller::JobController) so tests
/// can substitute a scripted service.
pub trait AnalysisApi: Send + Sync + 'static {
    /// `POST /api/analyze-body-motion`
    fn upload(
        &self,
        file: &VideoFile,
        target_fps: Option<u32>,
        progress: ProgressTracker,
    ) -> impl Future<Output = Result<JobId, ApiError>> + Send;

    /// `GET /api/analysis/{id}/status`
    fn status(&self, job_id: &JobId) -> impl Future<Output = Result<StatusResponse, ApiError>> + Send;

    /// `GET /api/analysis/{id}/results`
    fn results(&self, job_id: &JobId) -> impl Future<Output = Result<AnalysisResult, ApiError>> + Send;

    /// `GET /api/analysis/{id}/score`
    fn score(&self, job_id: &JobId) -> impl Future<Output = Result<ScoreReport, ApiError>> + Send;

    /// `GET /api/analysis/{id}/detailed-feedback`
    fn detailed_feedback(
        &self,
        job_id: &JobId,
    ) -> impl Future<Output = Result<serde_json::Value, ApiError>> + Send;

    /// `GET /api/summary`
    fn summary(&self) -> impl Future<Output = Result<serde_json::Value, ApiError>> + Send;

    /// `GET /api/test`
    fn system_test(&self) -> impl Future<Output = Result<SystemTestResponse, ApiError>> + Send;
}

/// reqwest-backed client for the analysis service.
#[derive(Debug, Clone)]
pub struct HttpAnalysisClient {
    http: Client,
    base_url: Url,
    request_timeout: Duration,
}

impl HttpAnalysisClient {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self, ApiError> {
        let base_url = base_url.into();
        let base_url = Url::parse(&base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or(ApiError::InvalidBaseUrl(base_url))?;

        let http = Client::builder()
            .user_agent(concat!("video-analysis-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url,
            request_timeout,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        Self::new(&config.api_base_url, config.request_timeout())
    }

    /// `{base}/api/{segments...}`, each segment percent-encoded so ids
    /// cannot change the path or add a query.
    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let request = self.http.get(self.url(segments)?).timeout(self.request_timeout);
        read_json(send(request).await?).await
    }
}

impl AnalysisApi for HttpAnalysisClient {
    async fn upload(
        &self,
        file: &VideoFile,
        target_fps: Option<u32>,
        progress: ProgressTracker,
    ) -> Result<JobId, ApiError> {
        let data = file.shared_data();
        let length = data.len() as u64;

        let chunks = futures::stream::iter((0..data.len()).step_by(UPLOAD_CHUNK_BYTES)).map(
            move |start| {
                let end = (start + UPLOAD_CHUNK_BYTES).min(data.len());
                let chunk = data[start..end].to_vec();
                progress.advance(chunk.len() as u64);
                Ok::<_, std::io::Error>(chunk)
            },
        );

        let video = Part::stream_with_length(reqwest::Body::wrap_stream(chunks), length)
            .file_name(file.name.clone())
            .mime_str(&file.mime_type)
            .map_err(|_| ApiError::InvalidContentType(file.mime_type.clone()))?;

        let mut form = Form::new().part("video", video);
        if let Some(fps) = target_fps {
            form = form.text("target_fps", fps.to_string());
        }

        let request = self.http.post(self.url(&["analyze-body-motion"])?).multipart(form);
        let submitted: SubmitResponse = read_json(send(request).await?).await?;

        Ok(JobId::new(submitted.analysis_id))
    }

    async fn status(&self, job_id: &JobId) -> Result<StatusResponse, ApiError> {
        self.get_json(&["analysis", job_id.as_str(), "status"]).await
    }

    async fn results(&self, job_id: &JobId) -> Result<AnalysisResult, ApiError> {
        self.get_json(&["analysis", job_id.as_str(), "results"]).await
    }

    async fn score(&self, job_id: &JobId) -> Result<ScoreReport, ApiError> {
        self.get_json(&["analysis", job_id.as_str(), "score"]).await
    }

    async fn detailed_feedback(&self, job_id: &JobId) -> Result<serde_json::Value, ApiError> {
        self.get_json(&["analysis", job_id.as_str(), "detailed-feedback"]).await
    }

    async fn summary(&self) -> Result<serde_json::Value, ApiError> {
        self.get_json(&["summary"]).await
    }

    async fn system_test(&self) -> Result<SystemTestResponse, ApiError> {
        self.get_json(&["test"]).await
    }
}

/// Send a request, turning non-success statuses into [`ApiError::Server`]
/// with the service's `{ "error": ... }` message when it sent one.
async fn send(request: RequestBuilder) -> Result<Response, ApiError> {
    let response = request.send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.bytes().await.unwrap_or_default();
    let message = serde_json::from_slice::<ErrorBody>(&body)
        .map(|b| b.error)
        .ok()
        .filter(|m| !m.trim().is_empty());

    Err(ApiError::Server {
        status: status.as_u16(),
        message,
    })
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let body = response.bytes().await?;
    serde_json::from_slice(&body).map_err(ApiError::Decode)
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Analysis service returned {status}: {}", message.as_deref().unwrap_or("no details"))]
    Server { status: u16, message: Option<String> },

    #[error("Failed to parse analysis service response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid analysis service URL: {0}")]
    InvalidBaseUrl(String),

    #[error("Invalid video content type: {0:?}")]
    InvalidContentType(String),
}

impl From<ApiError> for JobError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Transport(e) => JobError::Network(e.to_string()),
            ApiError::Server { status, message } => JobError::server(Some(status), message),
            ApiError::Decode(_) | ApiError::InvalidBaseUrl(_) => JobError::server(None, None),
            ApiError::InvalidContentType(mime_type) => JobError::Server {
                status: None,
                message: ValidationError::InvalidType { mime_type }.to_string(),
            },
        }
    }
}
