use serde::{Deserialize, Serialize};

use super::domain::{ConfidenceLevel, SentimentLabel};
use super::explain::RuleTrace;

/// Request sent to the sentiment classifier for one review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentRequest {
    pub content: String,
    pub language: Option<String>,
    pub business_type: Option<String>,
    pub star_rating: Option<u8>,
}

/// Classifier verdict for one review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentAnalysis {
    /// Text sentiment in [-1, 1].
    pub score: f64,
    /// Classifier confidence in [0, 1].
    pub confidence: f64,
    pub category: SentimentLabel,
    pub model_version: String,
    pub provider: String,
}

/// Narrow interface to the external NLP sentiment classifier. The engine
/// treats it as a black box identified by its model-version string.
pub trait SentimentProvider: Send + Sync {
    fn analyze(&self, request: &SentimentRequest) -> Result<SentimentAnalysis, ProviderError>;

    /// Batch variant. Results must preserve per-item attribution and order;
    /// the default implementation analyzes sequentially.
    fn analyze_batch(
        &self,
        requests: &[SentimentRequest],
    ) -> Result<Vec<SentimentAnalysis>, ProviderError> {
        requests.iter().map(|request| self.analyze(request)).collect()
    }

    fn model_version(&self) -> String;
}

/// Review metadata handed to the confidence-rule evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewContext {
    pub content_length: usize,
    pub duplicate_similarity: Option<f64>,
    pub language: Option<String>,
    pub engagement_total: u32,
}

/// Scalar confidence weight plus the trace behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceJudgment {
    /// Weight in [0, 1].
    pub score: f64,
    pub explain: RuleTrace,
}

/// Pre/post window facts handed to the sufficiency evaluator for a FixScore.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SufficiencyContext {
    pub pre_review_count: u32,
    pub post_review_count: u32,
    pub pre_sentiment: f64,
    pub post_sentiment: f64,
    pub delta_s: f64,
    pub min_reviews_for_inference: u32,
}

/// Categorical sufficiency verdict for a before/after measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SufficiencyJudgment {
    pub level: ConfidenceLevel,
    /// Confidence in [0, 1]. Zero means the measurement carries no evidence.
    pub score: f64,
    pub explain: RuleTrace,
}

/// External rule evaluator for review confidence and FixScore sufficiency.
/// The engine consumes only the returned scalars and their traces.
pub trait ConfidenceRules: Send + Sync {
    fn evaluate_confidence(&self, context: &ReviewContext) -> Result<ConfidenceJudgment, RuleError>;

    fn evaluate_sufficiency(
        &self,
        context: &SufficiencyContext,
    ) -> Result<SufficiencyJudgment, RuleError>;

    fn rule_set_version(&self) -> String;
}

/// Failure from the sentiment provider. Always fatal for the enclosing run.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("sentiment provider unavailable: {0}")]
    Unavailable(String),
    #[error("sentiment provider rejected request: {0}")]
    Rejected(String),
}

/// Failure from the rule evaluator. Always fatal for the enclosing run.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("confidence rules unavailable: {0}")]
    Unavailable(String),
    #[error("confidence rule evaluation failed: {0}")]
    Evaluation(String),
}
