use serde::Serialize;
use strum::{Display, EnumString};

use crate::models::result::{AnalysisResult, Facet};

/// Upper bound of every sub-score and of the overall score.
pub const MAX_SCORE: f64 = 10.0;

/// Speech rate band (words per minute) considered optimal.
pub const OPTIMAL_SPEECH_RATE: (f64, f64) = (120.0, 160.0);

/// Qualitative band of an overall score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ScoreTier {
    Excellent,
    Good,
    Average,
    Poor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SpeechPace {
    BelowOptimal,
    Optimal,
    AboveOptimal,
}

/// A sub-score that took part in the overall mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FacetScore {
    pub facet: Facet,
    pub metric: &'static str,
    pub score: f64,
}

/// Everything the results view shows beside the per-facet details.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoreSummary {
    pub overall: f64,
    pub tier: ScoreTier,
    pub breakdown: Vec<FacetScore>,
    pub dominant_direction: String,
    pub speech_rate: Option<f64>,
    pub speech_pace: Option<SpeechPace>,
    pub filler_words: u32,
    pub strongest_area: &'static str,
}

impl ScoreSummary {
    /// Human-readable key insights, one per line.
    pub fn insights(&self) -> Vec<String> {
        let mut lines = vec![
            format!("Your presentation had an overall score of {}/10", self.overall),
            format!("Your dominant body position was facing {}", self.dominant_direction),
        ];

        if let Some(rate) = self.speech_rate {
            lines.push(format!(
                "Your speech pace was {} words per minute (optimal is {}-{})",
                rate, OPTIMAL_SPEECH_RATE.0, OPTIMAL_SPEECH_RATE.1
            ));
        }

        lines.push(format!(
            "You used {} filler words throughout your presentation",
            self.filler_words
        ));
        lines.push(format!("Your strongest area: {}", self.strongest_area));
        lines
    }
}

/// Sub-scores that feed the overall score, in display order. Absent,
/// zero, negative and non-finite values are dropped.
pub fn breakdown(result: &AnalysisResult) -> Vec<FacetScore> {
    let candidates = [
        (
            Facet::BodyMotion,
            "stability_score",
            result.body_motion.as_ref().and_then(|f| f.stability_score),
        ),
        (
            Facet::HeadMotion,
            "stability_score",
            result.head_motion.as_ref().and_then(|f| f.stability_score),
        ),
        (
            Facet::HandMotion,
            "engagement_score",
            result.hand_motion.as_ref().and_then(|f| f.engagement_score),
        ),
        (
            Facet::Audio,
            "clarity_score",
            result.audio.as_ref().and_then(|f| f.clarity_score),
        ),
        (
            Facet::Content,
            "structure_score",
            result.content.as_ref().and_then(|f| f.structure_score),
        ),
        (
            Facet::Expression,
            "engagement_score",
            result.expression.as_ref().and_then(|f| f.engagement_score),
        ),
    ];

    candidates
        .into_iter()
        .filter_map(|(facet, metric, score)| {
            score
                .filter(|s| s.is_finite() && *s > 0.0)
                .map(|score| FacetScore { facet, metric, score })
        })
        .collect()
}

/// Mean of the contributing sub-scores, rounded to one decimal place.
/// Returns 0 when nothing contributes.
pub fn overall_score(result: &AnalysisResult) -> f64 {
    let scores: Vec<f64> = breakdown(result).iter().map(|s| s.score).collect();
    mean_rounded(&scores)
}

fn mean_rounded(scores: &[f64]) -> f64 {
    if scores.is_empty() {
        return 0.0;
    }
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    ((mean * 10.0).round() / 10.0).clamp(0.0, MAX_SCORE)
}

pub fn score_tier(score: f64) -> ScoreTier {
    if score >= 8.0 {
        ScoreTier::Excellent
    } else if score >= 6.0 {
        ScoreTier::Good
    } else if score >= 4.0 {
        ScoreTier::Average
    } else {
        ScoreTier::Poor
    }
}

pub fn speech_pace(words_per_minute: f64) -> SpeechPace {
    let (low, high) = OPTIMAL_SPEECH_RATE;
    if words_per_minute < low {
        SpeechPace::BelowOptimal
    } else if words_per_minute > high {
        SpeechPace::AboveOptimal
    } else {
        SpeechPace::Optimal
    }
}

pub fn summarize(result: &AnalysisResult) -> ScoreSummary {
    let breakdown = breakdown(result);
    let overall = mean_rounded(&breakdown.iter().map(|s| s.score).collect::<Vec<_>>());

    let speech_rate = result
        .audio
        .as_ref()
        .and_then(|a| a.speech_rate)
        .filter(|r| r.is_finite() && *r > 0.0);

    let structure = result.content.as_ref().and_then(|c| c.structure_score);
    let expression = result.expression.as_ref().and_then(|e| e.engagement_score);
    // Ties and missing content scores favour facial expressions.
    let strongest_area = match (structure, expression) {
        (Some(s), Some(e)) if s > e => "Content Structure",
        (Some(_), None) => "Content Structure",
        _ => "Facial Expressions",
    };

    ScoreSummary {
        overall,
        tier: score_tier(overall),
        breakdown,
        dominant_direction: result
            .body_motion
            .as_ref()
            .and_then(|b| b.dominant_direction.clone())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| "center".to_string()),
        speech_rate,
        speech_pace: speech_rate.map(speech_pace),
        filler_words: result
            .disfluency
            .as_ref()
            .and_then(|d| d.filler_words_count)
            .unwrap_or(0),
        strongest_area,
    }
}
