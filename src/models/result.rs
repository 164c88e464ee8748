use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};

use crate::models::job::JobStatus;
use crate::models::lenient;

/// Analysis facets reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Facet {
    BodyMotion,
    HeadMotion,
    HandMotion,
    Audio,
    Content,
    Disfluency,
    Expression,
}

/// Completed analysis document returned by `GET /api/analysis/{id}/results`.
///
/// Every facet is optional, and so is every field inside a facet. A field
/// of an unexpected JSON type is treated as absent, and an absent sub-score
/// is excluded from aggregation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub status: Option<JobStatus>,

    #[serde(
        default,
        rename = "videoUrl",
        deserialize_with = "lenient::value",
        skip_serializing_if = "Option::is_none"
    )]
    pub video_url: Option<String>,

    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub body_motion: Option<MotionFacet>,

    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub head_motion: Option<MotionFacet>,

    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub hand_motion: Option<HandMotionFacet>,

    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioFacet>,

    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub content: Option<ContentFacet>,

    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub disfluency: Option<DisfluencyFacet>,

    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub expression: Option<ExpressionFacet>,

    /// Facets or top-level fields this client does not model.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Body and head motion share one shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionFacet {
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub stability_score: Option<f64>,

    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub dominant_direction: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HandMotionFacet {
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub engagement_score: Option<f64>,

    #[serde(default, deserialize_with = "lenient::count", skip_serializing_if = "Option::is_none")]
    pub gesture_count: Option<u32>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioFacet {
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub clarity_score: Option<f64>,

    /// Words per minute.
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub speech_rate: Option<f64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContentFacet {
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub structure_score: Option<f64>,

    #[serde(default, deserialize_with = "lenient::count", skip_serializing_if = "Option::is_none")]
    pub key_points: Option<u32>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisfluencyFacet {
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub filler_words_per_minute: Option<f64>,

    #[serde(default, deserialize_with = "lenient::count", skip_serializing_if = "Option::is_none")]
    pub filler_words_count: Option<u32>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpressionFacet {
    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub engagement_score: Option<f64>,

    #[serde(default, deserialize_with = "lenient::value", skip_serializing_if = "Option::is_none")]
    pub dominant_emotion: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
