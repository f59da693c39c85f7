//! Deterministic Scoring & Impact Engine.
//!
//! A pipeline of pure, explainable formulas: one review becomes a bounded
//! weighted-impact number, many reviews become per-theme health scores with a
//! severity ranking, a completed corrective action gets a before/after
//! FixScore, and theme health translates into estimated revenue/footfall
//! impact with a calibrated confidence grade. The sentiment classifier,
//! confidence rules, parameter versions, and record store are injected
//! collaborators behind narrow traits.

pub mod domain;
pub mod economic;
pub mod explain;
pub mod fixscore;
pub mod parameters;
pub mod providers;
pub mod recommend;
pub mod repository;
pub mod review;
pub mod router;
pub mod service;
pub mod theme;

#[cfg(test)]
mod tests;

pub use domain::{
    BusinessBaseline, ChannelMetrics, ConfidenceGrade, ConfidenceLevel, EconomicImpactSnapshot,
    EngagementCounters, FixScore, ImpactDriver, ImpactRange, Recommendation,
    RecommendationEconomicImpact, RecommendationId, RecommendationSeverity, RecommendationStatus,
    Review, ReviewId, ReviewScore, ReviewSource, ReviewThemeLink, ScoreRun, ScoreRunId,
    ScoreRunStatus, SentimentLabel, TaskId, TenantId, Theme, ThemeCategory, ThemeId, ThemeScore,
};
pub use parameters::{
    ParameterError, ParameterSource, ParameterVersion, ParameterVersionStatus, ScoringParameters,
};
pub use providers::{
    ConfidenceJudgment, ConfidenceRules, ProviderError, ReviewContext, RuleError,
    SentimentAnalysis, SentimentProvider, SentimentRequest, SufficiencyContext,
    SufficiencyJudgment,
};
pub use repository::{RepositoryError, ScoringRepository};
pub use router::scoring_router;
pub use service::{
    EconomicBatchOutcome, FixScoreRequest, ScoreRunOptions, ScoreRunSummary, ScoringService,
    ScoringServiceError,
};
