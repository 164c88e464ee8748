//! Test helpers: a scripted in-memory service and a fake HTTP service

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tokio::time::Instant;

use video_analysis_client::models::responses::{ScoreReport, StatusResponse, SystemTestResponse};
use video_analysis_client::services::upload::ProgressTracker;
use video_analysis_client::{AnalysisApi, AnalysisResult, ApiError, JobId, VideoFile};

use crate::fixtures;

/// What the scripted service does with the next upload.
#[derive(Debug, Clone)]
pub enum UploadScript {
    Accept(&'static str),
    Reject { status: u16, message: Option<&'static str> },
    /// Never answers; only cancellation ends the call.
    Hang,
}

/// One scripted status answer; `Err` carries an HTTP status code.
pub type StatusScript = Result<StatusResponse, u16>;

/// In-memory [`AnalysisApi`] driven by per-call scripts.
///
/// Status queues repeat their last entry once exhausted. Every status query
/// is recorded with the (possibly paused) tokio clock.
#[derive(Default)]
pub struct ScriptedApi {
    uploads: Mutex<VecDeque<UploadScript>>,
    statuses: Mutex<HashMap<String, VecDeque<StatusScript>>>,
    results: Mutex<HashMap<String, AnalysisResult>>,
    status_calls: Mutex<Vec<(String, Instant)>>,
    upload_calls: AtomicUsize,
    results_calls: AtomicUsize,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upload_script(self, script: UploadScript) -> Self {
        self.uploads.lock().unwrap().push_back(script);
        self
    }

    pub fn statuses(self, job: &str, script: Vec<StatusScript>) -> Self {
        self.statuses
            .lock()
            .unwrap()
            .insert(job.to_string(), script.into());
        self
    }

    pub fn result(self, job: &str, result: AnalysisResult) -> Self {
        self.results.lock().unwrap().insert(job.to_string(), result);
        self
    }

    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub fn results_calls(&self) -> usize {
        self.results_calls.load(Ordering::SeqCst)
    }

    /// Instants of every status query for `job`, in order.
    pub fn status_calls_for(&self, job: &str) -> Vec<Instant> {
        self.status_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == job)
            .map(|(_, at)| *at)
            .collect()
    }

    pub fn status_call_count(&self) -> usize {
        self.status_calls.lock().unwrap().len()
    }
}

impl AnalysisApi for ScriptedApi {
    async fn upload(
        &self,
        file: &VideoFile,
        _target_fps: Option<u32>,
        progress: ProgressTracker,
    ) -> Result<JobId, ApiError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        let script = self
            .uploads
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(UploadScript::Accept("job-1"));

        let half = file.size() / 2;
        progress.advance(half);
        tokio::task::yield_now().await;

        match script {
            UploadScript::Accept(id) => {
                progress.advance(file.size() - half);
                Ok(JobId::new(id))
            }
            UploadScript::Reject { status, message } => Err(ApiError::Server {
                status,
                message: message.map(str::to_string),
            }),
            UploadScript::Hang => std::future::pending().await,
        }
    }

    async fn status(&self, job_id: &JobId) -> Result<StatusResponse, ApiError> {
        self.status_calls
            .lock()
            .unwrap()
            .push((job_id.to_string(), Instant::now()));

        let next = {
            let mut statuses = self.statuses.lock().unwrap();
            statuses.get_mut(job_id.as_str()).and_then(|queue| {
                if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().cloned()
                }
            })
        };

        match next {
            Some(Ok(report)) => Ok(report),
            Some(Err(status)) => Err(ApiError::Server {
                status,
                message: Some("Internal server error".to_string()),
            }),
            None => Err(ApiError::Server {
                status: 404,
                message: Some("Analysis not found".to_string()),
            }),
        }
    }

    async fn results(&self, job_id: &JobId) -> Result<AnalysisResult, ApiError> {
        self.results_calls.fetch_add(1, Ordering::SeqCst);
        self.results
            .lock()
            .unwrap()
            .get(job_id.as_str())
            .cloned()
            .ok_or(ApiError::Server {
                status: 404,
                message: Some("Results not found".to_string()),
            })
    }

    async fn score(&self, job_id: &JobId) -> Result<ScoreReport, ApiError> {
        Ok(ScoreReport {
            analysis_id: Some(job_id.to_string()),
            overall_score: Some(7.0),
            grade: Some("B".to_string()),
            ..Default::default()
        })
    }

    async fn detailed_feedback(&self, job_id: &JobId) -> Result<serde_json::Value, ApiError> {
        Ok(json!({ "analysisId": job_id.as_str(), "detailed_feedback": {} }))
    }

    async fn summary(&self) -> Result<serde_json::Value, ApiError> {
        Ok(json!({ "total_analyses": 0 }))
    }

    async fn system_test(&self) -> Result<SystemTestResponse, ApiError> {
        Ok(SystemTestResponse {
            status: "ok".to_string(),
            message: None,
            version: None,
            features: Default::default(),
        })
    }
}

/// A multipart field as the fake service received it.
#[derive(Debug, Clone)]
pub struct ReceivedField {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub len: usize,
    pub text: Option<String>,
}

/// Shared state of the fake HTTP service.
#[derive(Default)]
pub struct FakeService {
    pub uploads: Mutex<Vec<Vec<ReceivedField>>>,
    status_polls: Mutex<HashMap<String, u32>>,
    status_ids: Mutex<Vec<String>>,
    next_id: AtomicUsize,
}

impl FakeService {
    pub fn received(&self) -> Vec<Vec<ReceivedField>> {
        self.uploads.lock().unwrap().clone()
    }

    /// Decoded job ids of every status request, in order.
    pub fn status_ids(&self) -> Vec<String> {
        self.status_ids.lock().unwrap().clone()
    }
}

/// Start the fake analysis service on an ephemeral port and return its
/// origin.
///
/// Status by job id:
/// - `done-*`: processing on the first query, completed afterwards
/// - `failed-*`: failed with a reason
/// - `missing`: 404 with an error body
/// - `broken`: 200 with a body that is not JSON
/// - anything else: processing forever
///
/// Uploads of a file named `reject.mp4` are refused with a 400. Score and
/// detailed feedback exist for `done-*` jobs only.
pub async fn spawn_fake_service() -> (String, Arc<FakeService>) {
    let state = Arc::new(FakeService::default());

    let app = Router::new()
        .route("/api/analyze-body-motion", post(fake_upload))
        .route("/api/analysis/{id}/status", get(fake_status))
        .route("/api/analysis/{id}/results", get(fake_results))
        .route("/api/analysis/{id}/score", get(fake_score))
        .route("/api/analysis/{id}/detailed-feedback", get(fake_feedback))
        .route("/api/summary", get(fake_summary))
        .route("/api/test", get(fake_system_test))
        .with_state(Arc::clone(&state));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake service");
    let addr: SocketAddr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("fake service");
    });

    (format!("http://{}", addr), state)
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

async fn fake_upload(State(state): State<Arc<FakeService>>, mut multipart: Multipart) -> Response {
    let mut fields = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(_) => return error_response(StatusCode::BAD_REQUEST, "Malformed upload"),
        };
        let text = if file_name.is_none() {
            String::from_utf8(bytes.to_vec()).ok()
        } else {
            None
        };
        fields.push(ReceivedField {
            name,
            file_name,
            content_type,
            len: bytes.len(),
            text,
        });
    }

    let video = fields.iter().find(|f| f.name == "video").cloned();
    state.uploads.lock().unwrap().push(fields);

    let Some(video) = video else {
        return error_response(StatusCode::BAD_REQUEST, "No video file provided");
    };
    if video.file_name.as_deref() == Some("reject.mp4") {
        return error_response(StatusCode::BAD_REQUEST, "Video format not supported");
    }

    let n = state.next_id.fetch_add(1, Ordering::SeqCst) + 1;
    Json(json!({ "analysisId": format!("done-{}", n) })).into_response()
}

async fn fake_status(State(state): State<Arc<FakeService>>, Path(id): Path<String>) -> Response {
    state.status_ids.lock().unwrap().push(id.clone());
    let polls = {
        let mut polls = state.status_polls.lock().unwrap();
        let count = polls.entry(id.clone()).or_insert(0);
        *count += 1;
        *count
    };

    if id == "missing" {
        return error_response(StatusCode::NOT_FOUND, "Analysis not found");
    }
    if id == "broken" {
        return (StatusCode::OK, "<html>oops</html>").into_response();
    }
    if id.starts_with("failed-") {
        return Json(json!({
            "status": "failed",
            "progress": 30,
            "statusMessage": "Analysis failed",
            "error": "Could not detect a person in the video"
        }))
        .into_response();
    }
    if id.starts_with("done-") && polls > 1 {
        return Json(json!({
            "status": "completed",
            "progress": 100,
            "statusMessage": "Analysis complete"
        }))
        .into_response();
    }

    Json(json!({
        "status": "processing",
        "progress": 45,
        "statusMessage": "Analyzing body motion..."
    }))
    .into_response()
}

async fn fake_results(Path(id): Path<String>) -> Response {
    if id.starts_with("done-") {
        Json(fixtures::sample_result_json()).into_response()
    } else {
        error_response(StatusCode::NOT_FOUND, "Results not found")
    }
}

async fn fake_score(Path(id): Path<String>) -> Response {
    if !id.starts_with("done-") {
        return error_response(StatusCode::NOT_FOUND, "Analysis not found");
    }
    Json(json!({
        "analysisId": id,
        "overall_score": 7.4,
        "grade": "B",
        "category_scores": { "body_motion": 7.5, "audio": 7.2 },
        "strengths": ["Confident delivery"],
        "improvement_areas": ["Pacing"],
        "suggestions": ["Pause between sections"],
        "evaluation_timestamp": "2026-10-18T09:30:00Z",
        "filename": "rehearsal.mp4"
    }))
    .into_response()
}

async fn fake_feedback(Path(id): Path<String>) -> Response {
    if !id.starts_with("done-") {
        return error_response(StatusCode::NOT_FOUND, "Analysis not found");
    }
    Json(json!({
        "analysisId": id,
        "detailed_feedback": { "body_motion": "Stable stance" },
        "improvement_suggestions": ["Look at the camera"],
        "overall_evaluation": "Good"
    }))
    .into_response()
}

async fn fake_summary() -> Response {
    Json(json!({ "total_analyses": 3, "average_score": 7.1 })).into_response()
}

async fn fake_system_test() -> Response {
    Json(json!({
        "status": "ok",
        "message": "API is working",
        "version": "1.0.0",
        "features": { "body_motion": true, "audio": true }
    }))
    .into_response()
}
