//! Test fixtures: sample videos and analysis documents

#![allow(dead_code)]

use serde_json::{json, Value};
use video_analysis_client::models::responses::StatusResponse;
use video_analysis_client::{AnalysisResult, JobStatus, VideoFile};

/// A small video payload with a declared MP4 type.
pub fn sample_video(size: usize) -> VideoFile {
    VideoFile::new("rehearsal.mp4", "video/mp4", vec![7u8; size])
}

/// A file the validator must reject.
pub fn slide_deck() -> VideoFile {
    VideoFile::new("slides.pdf", "application/pdf", vec![1u8; 64])
}

/// Results document shaped like the service's completed analysis.
///
/// Contributing sub-scores: 8.0, 7.0, 6.0, 7.5, 8.5 (expression is zero
/// and excluded), so the overall score is 7.4.
pub fn sample_result_json() -> Value {
    json!({
        "status": "completed",
        "videoUrl": "/uploads/rehearsal.mp4",
        "body_motion": { "stability_score": 8.0, "dominant_direction": "left" },
        "head_motion": { "stability_score": 7.0, "dominant_direction": "center" },
        "hand_motion": { "engagement_score": 6.0, "gesture_count": 14 },
        "audio": { "clarity_score": 7.5, "speech_rate": 138 },
        "content": { "structure_score": 8.5, "key_points": 4 },
        "disfluency": { "filler_words_per_minute": 2.5, "filler_words_count": 11 },
        "expression": { "engagement_score": 0, "dominant_emotion": "neutral" }
    })
}

pub const SAMPLE_OVERALL: f64 = 7.4;

pub fn sample_result() -> AnalysisResult {
    serde_json::from_value(sample_result_json()).expect("fixture parses")
}

pub fn pending() -> StatusResponse {
    status(JobStatus::Pending, 0, "Queued")
}

pub fn processing(progress: u8, message: &str) -> StatusResponse {
    status(JobStatus::Processing, progress, message)
}

pub fn completed() -> StatusResponse {
    status(JobStatus::Completed, 100, "Analysis complete")
}

pub fn failed(error: Option<&str>) -> StatusResponse {
    StatusResponse {
        error: error.map(str::to_string),
        ..status(JobStatus::Failed, 60, "Analysis failed")
    }
}

fn status(status: JobStatus, progress: u8, message: &str) -> StatusResponse {
    StatusResponse {
        status,
        progress,
        status_message: message.to_string(),
        error: None,
    }
}
