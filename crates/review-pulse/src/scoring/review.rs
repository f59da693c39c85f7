//! Review Scorer: turns one raw review into a single bounded weighted-impact
//! number, with a full audit trail of the five component weights.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{Review, ReviewId};
use super::explain::{FormulaStep, ReviewScoreExplain, SentimentExplain};
use super::parameters::{
    EngagementSettings, ParameterVersion, SentimentBlendSettings, SourceWeightSettings,
};
use super::providers::{
    ConfidenceRules, ProviderError, ReviewContext, RuleError, SentimentProvider, SentimentRequest,
};

/// The five component weights and their product for one review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewScoreResult {
    pub review_id: ReviewId,
    pub sentiment: f64,
    pub time_weight: f64,
    pub source_weight: f64,
    pub engagement_weight: f64,
    pub confidence_weight: f64,
    pub weighted_impact: f64,
    pub explain: ReviewScoreExplain,
}

/// Upstream failures while scoring a single review. These propagate and fail
/// the whole run: partial scoring would corrupt the theme aggregates.
#[derive(Debug, thiserror::Error)]
pub enum ReviewScoreError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Rules(#[from] RuleError),
}

/// Blend a star rating into the text sentiment when configured, reclamping
/// to [-1, 1]. A 3-star rating maps to neutral.
pub fn blend_sentiment(
    text_score: f64,
    star_rating: Option<u8>,
    settings: &SentimentBlendSettings,
) -> (f64, bool) {
    match star_rating {
        Some(rating) if settings.enabled => {
            let star_score = (f64::from(rating) - 3.0) / 2.0;
            let weight = settings.star_weight;
            let blended = text_score * (1.0 - weight) + star_score * weight;
            (blended.clamp(-1.0, 1.0), true)
        }
        _ => (text_score.clamp(-1.0, 1.0), false),
    }
}

/// Exponential time decay: 1.0 for a review dated today, 0.5 at one
/// half-life, never reaching zero. Future-dated reviews decay as if posted
/// today.
pub fn time_weight(posted_on: NaiveDate, as_of: NaiveDate, half_life_days: f64) -> f64 {
    let elapsed_days = (as_of - posted_on).num_days().max(0) as f64;
    let lambda = std::f64::consts::LN_2 / half_life_days;
    (-lambda * elapsed_days).exp()
}

/// Configured per-source weight clamped to the global bounds. Sources missing
/// from the table start from a raw weight of 1.0.
pub fn source_weight(source: super::domain::ReviewSource, settings: &SourceWeightSettings) -> f64 {
    let raw = settings.weights.get(&source).copied().unwrap_or(1.0);
    raw.clamp(settings.min_weight, settings.max_weight)
}

/// Sublinear engagement boost, capped so viral outliers cannot dominate.
/// Disabled sources score a neutral 1.0.
pub fn engagement_weight(
    source: super::domain::ReviewSource,
    engagement_total: u32,
    settings: &EngagementSettings,
) -> f64 {
    let enabled = settings.enabled.get(&source).copied().unwrap_or(false);
    if !enabled {
        return 1.0;
    }

    let raw = 1.0 + (1.0 + f64::from(engagement_total)).ln();
    raw.min(settings.weight_cap)
}

/// Score one review against a pinned parameter version as of a reference
/// date. The result's sign always follows the blended sentiment; the
/// magnitude reflects how much the review should move its themes.
pub fn score_review(
    review: &Review,
    version: &ParameterVersion,
    as_of: NaiveDate,
    sentiment_provider: &dyn SentimentProvider,
    rules: &dyn ConfidenceRules,
) -> Result<ReviewScoreResult, ReviewScoreError> {
    let analysis = sentiment_provider.analyze(&SentimentRequest {
        content: review.content.clone(),
        language: review.language.clone(),
        business_type: Some("restaurant".to_string()),
        star_rating: review.star_rating,
    })?;

    let params = &version.parameters;
    let (sentiment, blend_applied) =
        blend_sentiment(analysis.score, review.star_rating, &params.sentiment_blend);

    let w_time = time_weight(review.posted_on, as_of, params.decay.half_life_days);
    let w_source = source_weight(review.source, &params.source_weights);
    let w_engagement =
        engagement_weight(review.source, review.engagement.total(), &params.engagement);

    let judgment = rules.evaluate_confidence(&ReviewContext {
        content_length: review.content.chars().count(),
        duplicate_similarity: review.duplicate_similarity,
        language: review.language.clone(),
        engagement_total: review.engagement.total(),
    })?;
    let w_confidence = judgment.score.clamp(0.0, 1.0);

    let weighted_impact = sentiment * w_time * w_source * w_engagement * w_confidence;

    let elapsed_days = (as_of - review.posted_on).num_days().max(0) as f64;
    let steps = vec![
        FormulaStep::new(
            "sentiment_blend",
            &[
                ("text_score", analysis.score),
                ("star_weight", params.sentiment_blend.star_weight),
                ("blend_applied", if blend_applied { 1.0 } else { 0.0 }),
            ],
            sentiment,
        ),
        FormulaStep::new(
            "time_decay",
            &[
                ("elapsed_days", elapsed_days),
                ("half_life_days", params.decay.half_life_days),
            ],
            w_time,
        ),
        FormulaStep::new(
            "source_weight",
            &[
                ("min_weight", params.source_weights.min_weight),
                ("max_weight", params.source_weights.max_weight),
            ],
            w_source,
        ),
        FormulaStep::new(
            "engagement_weight",
            &[
                ("engagement_total", f64::from(review.engagement.total())),
                ("weight_cap", params.engagement.weight_cap),
            ],
            w_engagement,
        ),
        FormulaStep::new("confidence_weight", &[("rule_score", judgment.score)], w_confidence),
        FormulaStep::new(
            "weighted_impact",
            &[
                ("sentiment", sentiment),
                ("time_weight", w_time),
                ("source_weight", w_source),
                ("engagement_weight", w_engagement),
                ("confidence_weight", w_confidence),
            ],
            weighted_impact,
        ),
    ];

    Ok(ReviewScoreResult {
        review_id: review.id.clone(),
        sentiment,
        time_weight: w_time,
        source_weight: w_source,
        engagement_weight: w_engagement,
        confidence_weight: w_confidence,
        weighted_impact,
        explain: ReviewScoreExplain {
            sentiment: SentimentExplain {
                provider: analysis.provider,
                model_version: analysis.model_version,
                text_score: analysis.score,
                provider_confidence: analysis.confidence,
                category: analysis.category,
                star_rating: review.star_rating,
                blend_applied,
                blended_score: sentiment,
            },
            confidence_trace: judgment.explain,
            steps,
            parameter_version_id: version.id.clone(),
        },
    })
}
