use chrono::NaiveDate;
use metrics_exporter_prometheus::PrometheusHandle;
use review_pulse::scoring::domain::{
    BusinessBaseline, ChannelMetrics, ConfidenceLevel, EconomicImpactSnapshot, FixScore,
    Recommendation, RecommendationEconomicImpact, RecommendationId, Review, ReviewId, ReviewScore,
    ScoreRun, ScoreRunId, ScoreRunStatus, SentimentLabel, TenantId, Theme, ThemeId, ThemeScore,
};
use review_pulse::scoring::explain::RuleTrace;
use review_pulse::scoring::fixscore::DateWindow;
use review_pulse::scoring::{
    ConfidenceJudgment, ConfidenceRules, ParameterError, ParameterSource, ParameterVersion,
    ProviderError, RepositoryError, ReviewContext, ReviewThemeLink, RuleError, ScoringParameters,
    ScoringRepository, SentimentAnalysis, SentimentProvider, SentimentRequest, SufficiencyContext,
    SufficiencyJudgment,
};
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
struct ScoringStore {
    reviews: Vec<Review>,
    theme_links: Vec<ReviewThemeLink>,
    themes: HashMap<ThemeId, Theme>,
    runs: HashMap<ScoreRunId, ScoreRun>,
    review_scores: Vec<ReviewScore>,
    theme_scores: Vec<ThemeScore>,
    recommendations: HashMap<RecommendationId, Recommendation>,
    fix_scores: Vec<FixScore>,
    impacts: Vec<RecommendationEconomicImpact>,
    snapshots: Vec<EconomicImpactSnapshot>,
    baselines: HashMap<TenantId, BusinessBaseline>,
    channel_metrics: HashMap<TenantId, ChannelMetrics>,
}

/// In-memory record store backing the service until a database lands.
#[derive(Default, Clone)]
pub(crate) struct InMemoryScoringRepository {
    store: Arc<Mutex<ScoringStore>>,
}

impl InMemoryScoringRepository {
    pub(crate) fn seed_theme(&self, theme: Theme) {
        self.lock().themes.insert(theme.id.clone(), theme);
    }

    pub(crate) fn seed_review(&self, review: Review, links: Vec<ReviewThemeLink>) {
        let mut store = self.lock();
        store.reviews.push(review);
        store.theme_links.extend(links);
    }

    pub(crate) fn seed_baseline(&self, tenant_id: TenantId, baseline: BusinessBaseline) {
        self.lock().baselines.insert(tenant_id, baseline);
    }

    pub(crate) fn seed_channel_metrics(&self, tenant_id: TenantId, metrics: ChannelMetrics) {
        self.lock().channel_metrics.insert(tenant_id, metrics);
    }

    pub(crate) fn theme_scores_for_run(&self, run_id: &ScoreRunId) -> Vec<ThemeScore> {
        self.lock()
            .theme_scores
            .iter()
            .filter(|score| &score.score_run_id == run_id)
            .cloned()
            .collect()
    }

    pub(crate) fn recommendations(&self) -> Vec<Recommendation> {
        self.lock().recommendations.values().cloned().collect()
    }

    pub(crate) fn impacts(&self) -> Vec<RecommendationEconomicImpact> {
        self.lock().impacts.clone()
    }

    pub(crate) fn snapshots(&self) -> Vec<EconomicImpactSnapshot> {
        self.lock().snapshots.clone()
    }

    pub(crate) fn theme_name(&self, theme_id: &ThemeId) -> String {
        self.lock()
            .themes
            .get(theme_id)
            .map(|theme| theme.name.clone())
            .unwrap_or_else(|| theme_id.0.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ScoringStore> {
        self.store.lock().expect("scoring store mutex poisoned")
    }
}

impl ScoringRepository for InMemoryScoringRepository {
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
            .theme_links
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
        let mut store = self.lock();
        if store.runs.contains_key(&run.id) {
            return Err(RepositoryError::Conflict);
        }
        store.runs.insert(run.id.clone(), run);
        store.review_scores.extend(review_scores);
        store.theme_scores.extend(theme_scores);
        for recommendation in recommendations {
            store
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
        tenant_id: &TenantId,
    ) -> Result<Option<BusinessBaseline>, RepositoryError> {
        Ok(self.lock().baselines.get(tenant_id).cloned())
    }

    fn channel_metrics(
        &self,
        tenant_id: &TenantId,
    ) -> Result<Option<ChannelMetrics>, RepositoryError> {
        Ok(self.lock().channel_metrics.get(tenant_id).cloned())
    }
}

const POSITIVE_WORDS: &[&str] = &[
    "amazing",
    "attentive",
    "delicious",
    "excellent",
    "fantastic",
    "friendly",
    "fresh",
    "great",
    "improved",
    "lovely",
    "perfect",
    "prompt",
    "spotless",
    "tasty",
    "wonderful",
];

const NEGATIVE_WORDS: &[&str] = &[
    "awful",
    "bland",
    "cold",
    "dirty",
    "disappointing",
    "dreadful",
    "filthy",
    "overpriced",
    "rude",
    "slow",
    "stale",
    "terrible",
    "underwhelming",
    "waited",
    "worst",
];

/// Keyword-lexicon sentiment classifier. Stands in for the hosted NLP model
/// so the service runs self-contained.
#[derive(Default, Clone)]
pub(crate) struct LexiconSentimentProvider;

impl SentimentProvider for LexiconSentimentProvider {
    fn analyze(&self, request: &SentimentRequest) -> Result<SentimentAnalysis, ProviderError> {
        let lowered = request.content.to_lowercase();
        let mut positive = 0usize;
        let mut negative = 0usize;
        for token in lowered.split(|c: char| !c.is_alphanumeric()) {
            if token.is_empty() {
                continue;
            }
            if POSITIVE_WORDS.contains(&token) {
                positive += 1;
            } else if NEGATIVE_WORDS.contains(&token) {
                negative += 1;
            }
        }

        let hits = positive + negative;
        let score = if hits == 0 {
            0.0
        } else {
            (positive as f64 - negative as f64) / hits as f64
        };

        let category = if score > 0.1 {
            SentimentLabel::Positive
        } else if score < -0.1 {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        };

        Ok(SentimentAnalysis {
            score,
            confidence: (0.5 + 0.1 * hits as f64).min(0.95),
            category,
            model_version: self.model_version(),
            provider: "lexicon".to_string(),
        })
    }

    fn model_version(&self) -> String {
        "lexicon-v1".to_string()
    }
}

/// Heuristic confidence and sufficiency rules applied until the managed rule
/// engine is wired in.
#[derive(Clone)]
pub(crate) struct HeuristicConfidenceRules {
    pub(crate) duplicate_threshold: f64,
    pub(crate) short_content_length: usize,
}

impl Default for HeuristicConfidenceRules {
    fn default() -> Self {
        Self {
            duplicate_threshold: 0.9,
            short_content_length: 20,
        }
    }
}

impl ConfidenceRules for HeuristicConfidenceRules {
    fn evaluate_confidence(&self, context: &ReviewContext) -> Result<ConfidenceJudgment, RuleError> {
        if context
            .duplicate_similarity
            .is_some_and(|similarity| similarity >= self.duplicate_threshold)
        {
            return Ok(ConfidenceJudgment {
                score: 0.0,
                explain: RuleTrace {
                    reason_code: "DUPLICATE_CONTENT".to_string(),
                    applied_rule: Some("duplicate_similarity".to_string()),
                },
            });
        }

        if context.content_length < self.short_content_length {
            return Ok(ConfidenceJudgment {
                score: 0.6,
                explain: RuleTrace {
                    reason_code: "SHORT_CONTENT".to_string(),
                    applied_rule: Some("content_length".to_string()),
                },
            });
        }

        if context
            .language
            .as_deref()
            .is_some_and(|language| !language.eq_ignore_ascii_case("en"))
        {
            return Ok(ConfidenceJudgment {
                score: 0.8,
                explain: RuleTrace {
                    reason_code: "NON_PRIMARY_LANGUAGE".to_string(),
                    applied_rule: Some("language".to_string()),
                },
            });
        }

        Ok(ConfidenceJudgment {
            score: 1.0,
            explain: RuleTrace {
                reason_code: "BASELINE".to_string(),
                applied_rule: None,
            },
        })
    }

    fn evaluate_sufficiency(
        &self,
        context: &SufficiencyContext,
    ) -> Result<SufficiencyJudgment, RuleError> {
        let floor = context.min_reviews_for_inference;
        let both_meet =
            context.pre_review_count >= floor && context.post_review_count >= floor;

        if !both_meet {
            return Ok(SufficiencyJudgment {
                level: ConfidenceLevel::InsufficientData,
                score: 0.0,
                explain: RuleTrace {
                    reason_code: "TOO_FEW_REVIEWS".to_string(),
                    applied_rule: Some("window_review_floor".to_string()),
                },
            });
        }

        let strong = context.pre_review_count >= floor * 2 && context.post_review_count >= floor * 2;
        if strong {
            Ok(SufficiencyJudgment {
                level: ConfidenceLevel::High,
                score: 0.9,
                explain: RuleTrace {
                    reason_code: "BOTH_WINDOWS_STRONG".to_string(),
                    applied_rule: Some("window_review_floor".to_string()),
                },
            })
        } else {
            Ok(SufficiencyJudgment {
                level: ConfidenceLevel::Medium,
                score: 0.7,
                explain: RuleTrace {
                    reason_code: "BOTH_WINDOWS_ADEQUATE".to_string(),
                    applied_rule: Some("window_review_floor".to_string()),
                },
            })
        }
    }

    fn rule_set_version(&self) -> String {
        "heuristic-v1".to_string()
    }
}

/// Parameter store holding the shipped standard version. Version management
/// endpoints come later; the id stays pinned into every persisted artifact.
pub(crate) struct StandardParameterStore {
    active: ParameterVersion,
}

impl Default for StandardParameterStore {
    fn default() -> Self {
        let created_on =
            NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid parameter epoch date");
        let active = ParameterVersion::draft("standard-v1", created_on, ScoringParameters::standard())
            .activate()
            .expect("standard parameters validate");
        Self { active }
    }
}

impl ParameterSource for StandardParameterStore {
    fn active_version(&self) -> Result<ParameterVersion, ParameterError> {
        Ok(self.active.clone())
    }

    fn version_by_id(&self, id: &str) -> Result<ParameterVersion, ParameterError> {
        if self.active.id == id {
            Ok(self.active.clone())
        } else {
            Err(ParameterError::UnknownVersion(id.to_string()))
        }
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
