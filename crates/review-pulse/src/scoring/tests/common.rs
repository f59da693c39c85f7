use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;

use crate::scoring::domain::{
    BusinessBaseline, ChannelMetrics, EconomicImpactSnapshot, EngagementCounters, FixScore,
    Recommendation, RecommendationEconomicImpact, RecommendationId, Review, ReviewId, ReviewScore,
    ReviewSource, ReviewThemeLink, ScoreRun, ScoreRunId, ScoreRunStatus, SentimentLabel, TenantId,
    Theme, ThemeCategory, ThemeId, ThemeScore,
};
use crate::scoring::fixscore::DateWindow;
use crate::scoring::parameters::{
    ParameterError, ParameterSource, ParameterVersion, ScoringParameters,
};
use crate::scoring::providers::{
    ConfidenceJudgment, ConfidenceRules, ProviderError, ReviewContext, RuleError,
    SentimentAnalysis, SentimentProvider, SentimentRequest, SufficiencyContext,
    SufficiencyJudgment,
};
use crate::scoring::repository::{RepositoryError, ScoringRepository};
use crate::scoring::ConfidenceLevel;
use crate::scoring::explain::RuleTrace;
use crate::scoring::service::ScoringService;

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn tenant() -> TenantId {
    TenantId("bella-notte".to_string())
}

pub(super) fn service_theme() -> Theme {
    Theme {
        id: ThemeId("theme-service".to_string()),
        tenant_id: tenant(),
        name: "Slow service".to_string(),
        category: ThemeCategory::Service,
    }
}

pub(super) fn review(id: &str, content: &str, posted_on: NaiveDate) -> Review {
    Review {
        id: ReviewId(id.to_string()),
        tenant_id: tenant(),
        content: content.to_string(),
        star_rating: None,
        posted_on,
        source: ReviewSource::Google,
        engagement: EngagementCounters::default(),
        duplicate_similarity: None,
        language: Some("en".to_string()),
    }
}

pub(super) fn link(review_id: &str, theme_id: &str, label: SentimentLabel) -> ReviewThemeLink {
    ReviewThemeLink {
        review_id: ReviewId(review_id.to_string()),
        theme_id: ThemeId(theme_id.to_string()),
        label,
        confidence: 0.9,
    }
}

/// Sentiment provider scripted per review content. Unknown content scores
/// neutral so tests control every input explicitly.
#[derive(Default, Clone)]
pub(super) struct ScriptedSentiment {
    scores: Arc<Mutex<HashMap<String, f64>>>,
}

impl ScriptedSentiment {
    pub(super) fn with_score(self, content: &str, score: f64) -> Self {
        self.scores
            .lock()
            .expect("sentiment mutex poisoned")
            .insert(content.to_string(), score);
        self
    }
}

impl SentimentProvider for ScriptedSentiment {
    fn analyze(&self, request: &SentimentRequest) -> Result<SentimentAnalysis, ProviderError> {
        let score = self
            .scores
            .lock()
            .expect("sentiment mutex poisoned")
            .get(&request.content)
            .copied()
            .unwrap_or(0.0);

        let category = if score > 0.1 {
            SentimentLabel::Positive
        } else if score < -0.1 {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        };

        Ok(SentimentAnalysis {
            score,
            confidence: 0.95,
            category,
            model_version: "scripted-v1".to_string(),
            provider: "scripted".to_string(),
        })
    }

    fn model_version(&self) -> String {
        "scripted-v1".to_string()
    }
}

/// Provider that always fails, to exercise whole-run failure semantics.
pub(super) struct UnavailableSentiment;

impl SentimentProvider for UnavailableSentiment {
    fn analyze(&self, _request: &SentimentRequest) -> Result<SentimentAnalysis, ProviderError> {
        Err(ProviderError::Unavailable("classifier offline".to_string()))
    }

    fn model_version(&self) -> String {
        "unavailable".to_string()
    }
}

/// Confidence rules with a fixed review confidence and a count-threshold
/// sufficiency verdict.
#[derive(Clone)]
pub(super) struct ThresholdRules {
    pub(super) review_confidence: f64,
    pub(super) sufficiency_confidence: f64,
}

impl Default for ThresholdRules {
    fn default() -> Self {
        Self {
            review_confidence: 1.0,
            sufficiency_confidence: 0.9,
        }
    }
}

impl ConfidenceRules for ThresholdRules {
    fn evaluate_confidence(
        &self,
        _context: &ReviewContext,
    ) -> Result<ConfidenceJudgment, RuleError> {
        Ok(ConfidenceJudgment {
            score: self.review_confidence,
            explain: RuleTrace {
                reason_code: "FIXED".to_string(),
                applied_rule: None,
            },
        })
    }

    fn evaluate_sufficiency(
        &self,
        context: &SufficiencyContext,
    ) -> Result<SufficiencyJudgment, RuleError> {
        let sufficient = context.pre_review_count >= context.min_reviews_for_inference
            && context.post_review_count >= context.min_reviews_for_inference;

        if sufficient {
            Ok(SufficiencyJudgment {
                level: ConfidenceLevel::High,
                score: self.sufficiency_confidence,
                explain: RuleTrace {
                    reason_code: "ENOUGH_REVIEWS".to_string(),
                    applied_rule: Some("count_threshold".to_string()),
                },
            })
        } else {
            Ok(SufficiencyJudgment {
                level: ConfidenceLevel::InsufficientData,
                score: 0.0,
                explain: RuleTrace {
                    reason_code: "TOO_FEW_REVIEWS".to_string(),
                    applied_rule: Some("count_threshold".to_string()),
                },
            })
        }
    }

    fn rule_set_version(&self) -> String {
        "rules-test-v1".to_string()
    }
}

#[derive(Default)]
struct RepositoryState {
    reviews: Vec<Review>,
    links: Vec<ReviewThemeLink>,
    themes: HashMap<ThemeId, Theme>,
    runs: HashMap<ScoreRunId, ScoreRun>,
    review_scores: Vec<ReviewScore>,
    theme_scores: Vec<ThemeScore>,
    recommendations: HashMap<RecommendationId, Recommendation>,
    fix_scores: Vec<FixScore>,
    impacts: Vec<RecommendationEconomicImpact>,
    snapshots: Vec<EconomicImpactSnapshot>,
    baseline: Option<BusinessBaseline>,
    channel: Option<ChannelMetrics>,
}

/// In-memory record store so the service module can be exercised in
/// isolation.
#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    state: Arc<Mutex<RepositoryState>>,
}

impl MemoryRepository {
    pub(super) fn seed_review(&self, review: Review) {
        self.lock().reviews.push(review);
    }

    pub(super) fn seed_link(&self, link: ReviewThemeLink) {
        self.lock().links.push(link);
    }

    pub(super) fn seed_theme(&self, theme: Theme) {
        self.lock().themes.insert(theme.id.clone(), theme);
    }

    pub(super) fn seed_recommendation(&self, recommendation: Recommendation) {
        self.lock()
            .recommendations
            .insert(recommendation.id.clone(), recommendation);
    }

    pub(super) fn seed_baseline(&self, baseline: BusinessBaseline) {
        self.lock().baseline = Some(baseline);
    }

    pub(super) fn seed_channel(&self, channel: ChannelMetrics) {
        self.lock().channel = Some(channel);
    }

    pub(super) fn runs(&self) -> Vec<ScoreRun> {
        self.lock().runs.values().cloned().collect()
    }

    pub(super) fn theme_scores(&self) -> Vec<ThemeScore> {
        self.lock().theme_scores.clone()
    }

    pub(super) fn review_scores(&self) -> Vec<ReviewScore> {
        self.lock().review_scores.clone()
    }

    pub(super) fn recommendations(&self) -> Vec<Recommendation> {
        self.lock().recommendations.values().cloned().collect()
    }

    pub(super) fn fix_scores(&self) -> Vec<FixScore> {
        self.lock().fix_scores.clone()
    }

    pub(super) fn impacts(&self) -> Vec<RecommendationEconomicImpact> {
        self.lock().impacts.clone()
    }

    pub(super) fn snapshots(&self) -> Vec<EconomicImpactSnapshot> {
        self.lock().snapshots.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RepositoryState> {
        self.state.lock().expect("repository mutex poisoned")
    }
}

impl ScoringRepository for MemoryRepository {
    fn reviews_in_window(
        &self,
        tenant_id: &TenantId,
        window: DateWindow,
    ) -> Result<Vec<Review>, RepositoryError> {
        Ok(self
            .lock()
            .reviews
            .iter()
            .filter(|review| &review.tenant_id == tenant_id && window.contains(review.posted_on))
            .cloned()
            .collect())
    }

    fn theme_links_for_reviews(
        &self,
        _tenant_id: &TenantId,
        review_ids: &[ReviewId],
    ) -> Result<Vec<ReviewThemeLink>, RepositoryError> {
        Ok(self
            .lock()
            .links
            .iter()
            .filter(|link| review_ids.contains(&link.review_id))
            .cloned()
            .collect())
    }

    fn find_theme(&self, theme_id: &ThemeId) -> Result<Option<Theme>, RepositoryError> {
        Ok(self.lock().themes.get(theme_id).cloned())
    }

    fn find_completed_run(
        &self,
        tenant_id: &TenantId,
        period_start: NaiveDate,
        period_end: NaiveDate,
        parameter_version_id: &str,
    ) -> Result<Option<ScoreRun>, RepositoryError> {
        Ok(self
            .lock()
            .runs
            .values()
            .find(|run| {
                &run.tenant_id == tenant_id
                    && run.period_start == period_start
                    && run.period_end == period_end
                    && run.parameter_version_id == parameter_version_id
                    && run.status == ScoreRunStatus::Completed
            })
            .cloned())
    }

    fn find_run(&self, run_id: &ScoreRunId) -> Result<Option<ScoreRun>, RepositoryError> {
        Ok(self.lock().runs.get(run_id).cloned())
    }

    fn insert_run_results(
        &self,
        run: ScoreRun,
        review_scores: Vec<ReviewScore>,
        theme_scores: Vec<ThemeScore>,
        recommendations: Vec<Recommendation>,
    ) -> Result<(), RepositoryError> {
        let mut state = self.lock();
        if state.runs.contains_key(&run.id) {
            return Err(RepositoryError::Conflict);
        }
        state.runs.insert(run.id.clone(), run);
        state.review_scores.extend(review_scores);
        state.theme_scores.extend(theme_scores);
        for recommendation in recommendations {
            state
                .recommendations
                .insert(recommendation.id.clone(), recommendation);
        }
        Ok(())
    }

    fn record_failed_run(&self, run: ScoreRun) -> Result<(), RepositoryError> {
        self.lock().runs.insert(run.id.clone(), run);
        Ok(())
    }

    fn theme_score(
        &self,
        theme_id: &ThemeId,
        run_id: &ScoreRunId,
    ) -> Result<Option<ThemeScore>, RepositoryError> {
        Ok(self
            .lock()
            .theme_scores
            .iter()
            .find(|score| &score.theme_id == theme_id && &score.score_run_id == run_id)
            .cloned())
    }

    fn open_recommendation_for_theme(
        &self,
        theme_id: &ThemeId,
    ) -> Result<Option<Recommendation>, RepositoryError> {
        Ok(self
            .lock()
            .recommendations
            .values()
            .find(|rec| &rec.theme_id == theme_id && rec.status.is_unresolved())
            .cloned())
    }

    fn find_recommendation(
        &self,
        id: &RecommendationId,
    ) -> Result<Option<Recommendation>, RepositoryError> {
        Ok(self.lock().recommendations.get(id).cloned())
    }

    fn insert_fix_score(&self, fix_score: FixScore) -> Result<(), RepositoryError> {
        self.lock().fix_scores.push(fix_score);
        Ok(())
    }

    fn insert_economic_impact(
        &self,
        impact: RecommendationEconomicImpact,
    ) -> Result<(), RepositoryError> {
        self.lock().impacts.push(impact);
        Ok(())
    }

    fn insert_economic_snapshot(
        &self,
        snapshot: EconomicImpactSnapshot,
    ) -> Result<(), RepositoryError> {
        self.lock().snapshots.push(snapshot);
        Ok(())
    }

    fn business_baseline(
        &self,
        _tenant_id: &TenantId,
    ) -> Result<Option<BusinessBaseline>, RepositoryError> {
        Ok(self.lock().baseline.clone())
    }

    fn channel_metrics(
        &self,
        _tenant_id: &TenantId,
    ) -> Result<Option<ChannelMetrics>, RepositoryError> {
        Ok(self.lock().channel.clone())
    }
}

/// Repository whose economic-impact insert always fails, for exercising
/// per-item skip counting in the batch.
#[derive(Default, Clone)]
pub(super) struct BrokenImpactStore {
    pub(super) inner: MemoryRepository,
}

impl ScoringRepository for BrokenImpactStore {
    fn reviews_in_window(
        &self,
        tenant_id: &TenantId,
        window: DateWindow,
    ) -> Result<Vec<Review>, RepositoryError> {
        self.inner.reviews_in_window(tenant_id, window)
    }

    fn theme_links_for_reviews(
        &self,
        tenant_id: &TenantId,
        review_ids: &[ReviewId],
    ) -> Result<Vec<ReviewThemeLink>, RepositoryError> {
        self.inner.theme_links_for_reviews(tenant_id, review_ids)
    }

    fn find_theme(&self, theme_id: &ThemeId) -> Result<Option<Theme>, RepositoryError> {
        self.inner.find_theme(theme_id)
    }

    fn find_completed_run(
        &self,
        tenant_id: &TenantId,
        period_start: NaiveDate,
        period_end: NaiveDate,
        parameter_version_id: &str,
    ) -> Result<Option<ScoreRun>, RepositoryError> {
        self.inner
            .find_completed_run(tenant_id, period_start, period_end, parameter_version_id)
    }

    fn find_run(&self, run_id: &ScoreRunId) -> Result<Option<ScoreRun>, RepositoryError> {
        self.inner.find_run(run_id)
    }

    fn insert_run_results(
        &self,
        run: ScoreRun,
        review_scores: Vec<ReviewScore>,
        theme_scores: Vec<ThemeScore>,
        recommendations: Vec<Recommendation>,
    ) -> Result<(), RepositoryError> {
        self.inner
            .insert_run_results(run, review_scores, theme_scores, recommendations)
    }

    fn record_failed_run(&self, run: ScoreRun) -> Result<(), RepositoryError> {
        self.inner.record_failed_run(run)
    }

    fn theme_score(
        &self,
        theme_id: &ThemeId,
        run_id: &ScoreRunId,
    ) -> Result<Option<ThemeScore>, RepositoryError> {
        self.inner.theme_score(theme_id, run_id)
    }

    fn open_recommendation_for_theme(
        &self,
        theme_id: &ThemeId,
    ) -> Result<Option<Recommendation>, RepositoryError> {
        self.inner.open_recommendation_for_theme(theme_id)
    }

    fn find_recommendation(
        &self,
        id: &RecommendationId,
    ) -> Result<Option<Recommendation>, RepositoryError> {
        self.inner.find_recommendation(id)
    }

    fn insert_fix_score(&self, fix_score: FixScore) -> Result<(), RepositoryError> {
        self.inner.insert_fix_score(fix_score)
    }

    fn insert_economic_impact(
        &self,
        _impact: RecommendationEconomicImpact,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("impact table offline".to_string()))
    }

    fn insert_economic_snapshot(
        &self,
        snapshot: EconomicImpactSnapshot,
    ) -> Result<(), RepositoryError> {
        self.inner.insert_economic_snapshot(snapshot)
    }

    fn business_baseline(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Option<BusinessBaseline>, RepositoryError> {
        self.inner.business_baseline(tenant_id)
    }

    fn channel_metrics(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Option<ChannelMetrics>, RepositoryError> {
        self.inner.channel_metrics(tenant_id)
    }
}

/// Parameter source with a single active version.
pub(super) struct StaticParameters {
    version: ParameterVersion,
}

impl StaticParameters {
    pub(super) fn new(version: ParameterVersion) -> Self {
        Self { version }
    }
}

impl ParameterSource for StaticParameters {
    fn active_version(&self) -> Result<ParameterVersion, ParameterError> {
        Ok(self.version.clone())
    }

    fn version_by_id(&self, id: &str) -> Result<ParameterVersion, ParameterError> {
        if self.version.id == id {
            Ok(self.version.clone())
        } else {
            Err(ParameterError::UnknownVersion(id.to_string()))
        }
    }
}

/// Parameter source with no active version, for missing-version failures.
pub(super) struct NoParameters;

impl ParameterSource for NoParameters {
    fn active_version(&self) -> Result<ParameterVersion, ParameterError> {
        Err(ParameterError::NoActiveVersion)
    }

    fn version_by_id(&self, id: &str) -> Result<ParameterVersion, ParameterError> {
        Err(ParameterError::UnknownVersion(id.to_string()))
    }
}

pub(super) fn active_version() -> ParameterVersion {
    ParameterVersion::draft("params-v1", date(2025, 1, 1), ScoringParameters::standard())
        .activate()
        .expect("standard parameters validate")
}

pub(super) type TestService =
    ScoringService<MemoryRepository, ScriptedSentiment, ThresholdRules, StaticParameters>;

pub(super) fn build_service(
    sentiment: ScriptedSentiment,
) -> (Arc<TestService>, MemoryRepository) {
    let repository = MemoryRepository::default();
    let service = ScoringService::new(
        Arc::new(repository.clone()),
        Arc::new(sentiment),
        Arc::new(ThresholdRules::default()),
        Arc::new(StaticParameters::new(active_version())),
    );
    (Arc::new(service), repository)
}
