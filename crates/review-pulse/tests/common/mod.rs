#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use review_pulse::scoring::domain::{
    BusinessBaseline, ChannelMetrics, EconomicImpactSnapshot, EngagementCounters, FixScore,
    Recommendation, RecommendationEconomicImpact, RecommendationId, Review, ReviewId, ReviewScore,
    ReviewSource, ScoreRun, ScoreRunId, ScoreRunStatus, SentimentLabel, TenantId, Theme,
    ThemeCategory, ThemeId, ThemeScore,
};
use review_pulse::scoring::explain::RuleTrace;
use review_pulse::scoring::fixscore::DateWindow;
use review_pulse::scoring::{
    ConfidenceJudgment, ConfidenceLevel, ConfidenceRules, ParameterError, ParameterSource,
    ParameterVersion, ProviderError, RepositoryError, ReviewContext, ReviewThemeLink, RuleError,
    ScoringParameters, ScoringRepository, ScoringService, SentimentAnalysis, SentimentProvider,
    SentimentRequest, SufficiencyContext, SufficiencyJudgment,
};

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub fn tenant() -> TenantId {
    TenantId("osteria-verde".to_string())
}

pub fn theme(id: &str, name: &str, category: ThemeCategory) -> Theme {
    Theme {
        id: ThemeId(id.to_string()),
        tenant_id: tenant(),
        name: name.to_string(),
        category,
    }
}

pub fn review(id: &str, content: &str, posted_on: NaiveDate) -> Review {
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

pub fn link(review_id: &str, theme_id: &str, label: SentimentLabel) -> ReviewThemeLink {
    ReviewThemeLink {
        review_id: ReviewId(review_id.to_string()),
        theme_id: ThemeId(theme_id.to_string()),
        label,
        confidence: 0.9,
    }
}

/// Sentiment stub keyed by review content.
#[derive(Default, Clone)]
pub struct StubSentiment {
    scores: Arc<Mutex<HashMap<String, f64>>>,
}

impl StubSentiment {
    pub fn scoring(self, content: &str, score: f64) -> Self {
        self.scores
            .lock()
            .expect("sentiment mutex poisoned")
            .insert(content.to_string(), score);
        self
    }
}

impl SentimentProvider for StubSentiment {
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
            confidence: 0.9,
            category,
            model_version: "stub-v1".to_string(),
            provider: "stub".to_string(),
        })
    }

    fn model_version(&self) -> String {
        "stub-v1".to_string()
    }
}

/// Rules that trust every review and gate sufficiency on the window floor.
#[derive(Default, Clone)]
pub struct WindowCountRules;

impl ConfidenceRules for WindowCountRules {
    fn evaluate_confidence(&self, _context: &ReviewContext) -> Result<ConfidenceJudgment, RuleError> {
        Ok(ConfidenceJudgment {
            score: 1.0,
            explain: RuleTrace {
                reason_code: "TRUSTED".to_string(),
                applied_rule: None,
            },
        })
    }

    fn evaluate_sufficiency(
        &self,
        context: &SufficiencyContext,
    ) -> Result<SufficiencyJudgment, RuleError> {
        let floor = context.min_reviews_for_inference;
        if context.pre_review_count >= floor && context.post_review_count >= floor {
            Ok(SufficiencyJudgment {
                level: ConfidenceLevel::High,
                score: 0.9,
                explain: RuleTrace {
                    reason_code: "ENOUGH_REVIEWS".to_string(),
                    applied_rule: Some("window_floor".to_string()),
                },
            })
        } else {
            Ok(SufficiencyJudgment {
                level: ConfidenceLevel::InsufficientData,
                score: 0.0,
                explain: RuleTrace {
                    reason_code: "TOO_FEW_REVIEWS".to_string(),
                    applied_rule: Some("window_floor".to_string()),
                },
            })
        }
    }

    fn rule_set_version(&self) -> String {
        "window-rules-v1".to_string()
    }
}

#[derive(Default)]
struct Records {
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

/// Repository fake that records everything the engine persists.
#[derive(Default, Clone)]
pub struct RecordingRepository {
    records: Arc<Mutex<Records>>,
}

impl RecordingRepository {
    pub fn seed_theme(&self, theme: Theme) {
        self.lock().themes.insert(theme.id.clone(), theme);
    }

    pub fn seed_review(&self, review: Review) {
        self.lock().reviews.push(review);
    }

    pub fn seed_link(&self, link: ReviewThemeLink) {
        self.lock().links.push(link);
    }

    pub fn seed_baseline(&self, baseline: BusinessBaseline) {
        self.lock().baseline = Some(baseline);
    }

    pub fn seed_channel(&self, channel: ChannelMetrics) {
        self.lock().channel = Some(channel);
    }

    pub fn runs(&self) -> Vec<ScoreRun> {
        self.lock().runs.values().cloned().collect()
    }

    pub fn review_scores(&self) -> Vec<ReviewScore> {
        self.lock().review_scores.clone()
    }

    pub fn theme_scores(&self) -> Vec<ThemeScore> {
        self.lock().theme_scores.clone()
    }

    pub fn recommendations(&self) -> Vec<Recommendation> {
        self.lock().recommendations.values().cloned().collect()
    }

    pub fn fix_scores(&self) -> Vec<FixScore> {
        self.lock().fix_scores.clone()
    }

    pub fn impacts(&self) -> Vec<RecommendationEconomicImpact> {
        self.lock().impacts.clone()
    }

    pub fn snapshots(&self) -> Vec<EconomicImpactSnapshot> {
        self.lock().snapshots.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Records> {
        self.records.lock().expect("records mutex poisoned")
    }
}

impl ScoringRepository for RecordingRepository {
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
        let mut records = self.lock();
        if records.runs.contains_key(&run.id) {
            return Err(RepositoryError::Conflict);
        }
        records.runs.insert(run.id.clone(), run);
        records.review_scores.extend(review_scores);
        records.theme_scores.extend(theme_scores);
        for recommendation in recommendations {
            records
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

/// Parameter source with a single frozen version.
pub struct SingleVersionSource {
    version: ParameterVersion,
}

impl ParameterSource for SingleVersionSource {
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

pub type Engine =
    ScoringService<RecordingRepository, StubSentiment, WindowCountRules, SingleVersionSource>;

pub fn build_engine(sentiment: StubSentiment) -> (Arc<Engine>, RecordingRepository) {
    let repository = RecordingRepository::default();
    let version = ParameterVersion::draft(
        "standard-v1",
        date(2025, 1, 1),
        ScoringParameters::standard(),
    )
    .activate()
    .expect("standard parameters validate");

    let engine = ScoringService::new(
        Arc::new(repository.clone()),
        Arc::new(sentiment),
        Arc::new(WindowCountRules),
        Arc::new(SingleVersionSource { version }),
    );

    (Arc::new(engine), repository)
}
