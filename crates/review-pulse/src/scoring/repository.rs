use super::domain::{
    BusinessBaseline, ChannelMetrics, EconomicImpactSnapshot, FixScore, Recommendation,
    RecommendationEconomicImpact, RecommendationId, Review, ReviewId, ReviewScore, ReviewThemeLink,
    ScoreRun, ScoreRunId, Theme, ThemeId, ThemeScore, TenantId,
};
use super::fixscore::DateWindow;

/// Storage abstraction for the engine. Implementations only need atomic
/// create/update semantics and date-range filtering; no storage engine is
/// assumed.
pub trait ScoringRepository: Send + Sync {
    fn reviews_in_window(
        &self,
        tenant_id: &TenantId,
        window: DateWindow,
    ) -> Result<Vec<Review>, RepositoryError>;

    fn theme_links_for_reviews(
        &self,
        tenant_id: &TenantId,
        review_ids: &[ReviewId],
    ) -> Result<Vec<ReviewThemeLink>, RepositoryError>;

    fn find_theme(&self, theme_id: &ThemeId) -> Result<Option<Theme>, RepositoryError>;

    /// Idempotency lookup: a COMPLETED run for the same tenant, period, and
    /// parameter version short-circuits re-execution.
    fn find_completed_run(
        &self,
        tenant_id: &TenantId,
        period_start: chrono::NaiveDate,
        period_end: chrono::NaiveDate,
        parameter_version_id: &str,
    ) -> Result<Option<ScoreRun>, RepositoryError>;

    fn find_run(&self, run_id: &ScoreRunId) -> Result<Option<ScoreRun>, RepositoryError>;

    /// Persist a completed run and all of its aggregates as a single logical
    /// transaction. A failed call must leave no partial ThemeScore rows
    /// visible as complete.
    fn insert_run_results(
        &self,
        run: ScoreRun,
        review_scores: Vec<ReviewScore>,
        theme_scores: Vec<ThemeScore>,
        recommendations: Vec<Recommendation>,
    ) -> Result<(), RepositoryError>;

    /// Record a run that aborted before producing aggregates.
    fn record_failed_run(&self, run: ScoreRun) -> Result<(), RepositoryError>;

    fn theme_score(
        &self,
        theme_id: &ThemeId,
        run_id: &ScoreRunId,
    ) -> Result<Option<ThemeScore>, RepositoryError>;

    fn open_recommendation_for_theme(
        &self,
        theme_id: &ThemeId,
    ) -> Result<Option<Recommendation>, RepositoryError>;

    fn find_recommendation(
        &self,
        id: &RecommendationId,
    ) -> Result<Option<Recommendation>, RepositoryError>;

    fn insert_fix_score(&self, fix_score: FixScore) -> Result<(), RepositoryError>;

    fn insert_economic_impact(
        &self,
        impact: RecommendationEconomicImpact,
    ) -> Result<(), RepositoryError>;

    fn insert_economic_snapshot(
        &self,
        snapshot: EconomicImpactSnapshot,
    ) -> Result<(), RepositoryError>;

    fn business_baseline(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Option<BusinessBaseline>, RepositoryError>;

    fn channel_metrics(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Option<ChannelMetrics>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
