use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::job::JobStatus;
use crate::models::lenient;

/// Response after submitting a video for analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    #[serde(rename = "analysisId")]
    pub analysis_id: String,
}

/// Response for `GET /api/analysis/{id}/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: JobStatus,

    #[serde(default)]
    pub progress: u8,

    #[serde(default, rename = "statusMessage")]
    pub status_message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Error body the service sends with non-success responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Response for `GET /api/test`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemTestResponse {
    pub status: String,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub version: Option<String>,

    #[serde(default)]
    pub features: serde_json::Map<String, serde_json::Value>,
}

/// Response for `GET /api/analysis/{id}/score`: the service's own grading
/// of a completed analysis.
///
/// Shown as reported; the client's score aggregation does not read it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreReport {
    #[serde(
        default,
        rename = "analysisId",
        deserialize_with = "lenient::value",
        skip_serializing_if = "Option::is_none"
    )]
    pub analysis_id: Option<String>,

    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub overall_score: Option<f64>,

    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,

    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub category_scores: Option<Map<String, Value>>,

    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub strengths: Option<Vec<String>>,

    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub improvement_areas: Option<Vec<String>>,

    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,

    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub evaluation_timestamp: Option<String>,

    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
