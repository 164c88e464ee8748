//! Presentation video analysis client
//!
//! This library submits a presentation video to a remote analysis service,
//! tracks the job through upload and server-side processing, and reduces
//! the per-facet results (body motion, speech, content, expression,
//! disfluency) to one overall score.

pub mod config;
pub mod models;
pub mod services;

pub use config::ClientConfig;
pub use models::job::{AnalysisJob, JobError, JobId, JobStatus};
pub use models::result::AnalysisResult;
pub use models::video::VideoFile;
pub use services::client::{AnalysisApi, ApiError, HttpAnalysisClient};
pub use services::controller::{JobController, JobSettings, JobState};
