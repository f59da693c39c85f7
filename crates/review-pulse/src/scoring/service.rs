use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::domain::{
    EconomicImpactSnapshot, FixScore, ImpactRange, Recommendation, RecommendationId,
    RecommendationStatus, ReviewId, ReviewScore, ScoreRun, ScoreRunId, ScoreRunStatus, TenantId,
    ThemeId, ThemeScore,
};
use super::economic::{assess, ThemeEconomicInput};
use super::fixscore::{
    baseline_window_candidates, measure, post_window_candidates, DateWindow, FixMeasurement,
    WindowCandidate,
};
use super::parameters::{ParameterError, ParameterSource, ParameterVersion};
use super::providers::{
    ConfidenceRules, ProviderError, RuleError, SentimentProvider, SufficiencyContext,
};
use super::recommend::classify;
use super::repository::{RepositoryError, ScoringRepository};
use super::review::{score_review, ReviewScoreError, ReviewScoreResult};
use super::theme::{aggregate_theme, apply_negative_volume_adjustment, ThemeAnalysis, ThemeMention};

/// Longest period a single scoring run may cover, in days.
const MAX_PERIOD_DAYS: i64 = 365;

static ID_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Identifiers embed the wall-clock millisecond alongside an in-process
/// sequence, so a restarted process never reissues an id already persisted
/// by an earlier one.
fn next_id(prefix: &str) -> String {
    let sequence = ID_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let millis = Utc::now().timestamp_millis();
    format!("{prefix}-{millis:x}-{sequence:04x}")
}

fn next_run_id() -> ScoreRunId {
    ScoreRunId(next_id("run"))
}

fn next_fix_score_id() -> String {
    next_id("fix")
}

fn next_recommendation_id() -> RecommendationId {
    RecommendationId(next_id("rec"))
}

/// Caller-supplied knobs for one scoring run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreRunOptions {
    /// Reference date for time decay; defaults to the period end.
    pub as_of: Option<NaiveDate>,
    /// Pin a specific parameter version instead of resolving the active one.
    pub parameter_version_id: Option<String>,
}

/// Result summary for a scoring run, also reconstructed verbatim when an
/// idempotent re-run short-circuits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRunSummary {
    pub score_run_id: ScoreRunId,
    pub reviews_processed: u32,
    pub themes_processed: u32,
    pub parameter_version_id: String,
    pub rule_set_version_id: String,
    pub sentiment_model_version: String,
    pub duration_ms: u64,
}

impl ScoreRunSummary {
    fn from_run(run: &ScoreRun) -> Self {
        Self {
            score_run_id: run.id.clone(),
            reviews_processed: run.reviews_processed,
            themes_processed: run.themes_processed,
            parameter_version_id: run.parameter_version_id.clone(),
            rule_set_version_id: run.rule_set_version_id.clone(),
            sentiment_model_version: run.sentiment_model_version.clone(),
            duration_ms: run.duration_ms,
        }
    }
}

/// Request to measure a corrective action's effectiveness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixScoreRequest {
    pub tenant_id: TenantId,
    pub theme_id: ThemeId,
    pub task_id: Option<super::domain::TaskId>,
    pub score_run_id: ScoreRunId,
    /// Completion date of the corrective task; defaults to today.
    pub action_date: Option<NaiveDate>,
    /// Evaluation date; defaults to today. Exposed so measurements replay
    /// deterministically.
    pub today: Option<NaiveDate>,
}

/// Outcome of an economic-impact batch. Per-item failures are counted, not
/// fatal: each item is independently re-computable later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EconomicBatchOutcome {
    pub calculated: u32,
    pub skipped: u32,
}

/// Error raised by the scoring service.
#[derive(Debug, thiserror::Error)]
pub enum ScoringServiceError {
    #[error("invalid scoring period: {reason}")]
    InvalidPeriod { reason: String },
    #[error("no active parameter version")]
    NoActiveParameters,
    #[error(transparent)]
    Parameters(ParameterError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error(transparent)]
    Rules(#[from] RuleError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("score run {0} not found")]
    UnknownRun(String),
    #[error("theme {0} not found")]
    UnknownTheme(String),
}

impl From<ReviewScoreError> for ScoringServiceError {
    fn from(value: ReviewScoreError) -> Self {
        match value {
            ReviewScoreError::Provider(err) => Self::Provider(err),
            ReviewScoreError::Rules(err) => Self::Rules(err),
        }
    }
}

impl From<ParameterError> for ScoringServiceError {
    fn from(value: ParameterError) -> Self {
        match value {
            ParameterError::NoActiveVersion => Self::NoActiveParameters,
            other => Self::Parameters(other),
        }
    }
}

/// Service composing the record store, the sentiment provider, the confidence
/// rules, and the parameter source into the scoring pipeline.
pub struct ScoringService<R, S, C, P> {
    repository: Arc<R>,
    sentiment: Arc<S>,
    rules: Arc<C>,
    parameters: Arc<P>,
}

impl<R, S, C, P> ScoringService<R, S, C, P>
where
    R: ScoringRepository + 'static,
    S: SentimentProvider + 'static,
    C: ConfidenceRules + 'static,
    P: ParameterSource + 'static,
{
    pub fn new(repository: Arc<R>, sentiment: Arc<S>, rules: Arc<C>, parameters: Arc<P>) -> Self {
        Self {
            repository,
            sentiment,
            rules,
            parameters,
        }
    }

    /// Execute one scoring run over a tenant's period: score every review,
    /// aggregate per theme, classify recommendations, and persist the whole
    /// result atomically. Re-running a completed (tenant, period, version)
    /// combination returns the prior summary without recomputing.
    pub fn execute_score_run(
        &self,
        tenant_id: &TenantId,
        period_start: NaiveDate,
        period_end: NaiveDate,
        options: ScoreRunOptions,
    ) -> Result<ScoreRunSummary, ScoringServiceError> {
        validate_period(period_start, period_end)?;

        let version = self.resolve_version(options.parameter_version_id.as_deref())?;

        if let Some(existing) = self.repository.find_completed_run(
            tenant_id,
            period_start,
            period_end,
            &version.id,
        )? {
            info!(
                tenant = %tenant_id.0,
                run = %existing.id.0,
                "score run already completed for period; returning prior results"
            );
            return Ok(ScoreRunSummary::from_run(&existing));
        }

        let started = Instant::now();
        let as_of = options.as_of.unwrap_or(period_end);
        let run_id = next_run_id();
        let rule_set_version_id = self.rules.rule_set_version();
        let sentiment_model_version = self.sentiment.model_version();

        let reviews = self.repository.reviews_in_window(
            tenant_id,
            DateWindow {
                start: period_start,
                end: period_end,
            },
        )?;

        let mut results: HashMap<ReviewId, ReviewScoreResult> =
            HashMap::with_capacity(reviews.len());
        for review in &reviews {
            match score_review(review, &version, as_of, &*self.sentiment, &*self.rules) {
                Ok(result) => {
                    results.insert(review.id.clone(), result);
                }
                Err(err) => {
                    // Partial scoring would corrupt every downstream
                    // aggregate, so the run fails as a whole.
                    self.repository.record_failed_run(ScoreRun {
                        id: run_id.clone(),
                        tenant_id: tenant_id.clone(),
                        period_start,
                        period_end,
                        parameter_version_id: version.id.clone(),
                        rule_set_version_id: rule_set_version_id.clone(),
                        sentiment_model_version: sentiment_model_version.clone(),
                        status: ScoreRunStatus::Failed,
                        reviews_processed: 0,
                        themes_processed: 0,
                        duration_ms: started.elapsed().as_millis() as u64,
                    })?;
                    warn!(
                        tenant = %tenant_id.0,
                        run = %run_id.0,
                        review = %review.id.0,
                        error = %err,
                        "scoring run aborted on upstream provider failure"
                    );
                    return Err(err.into());
                }
            }
        }

        let review_ids: Vec<ReviewId> = results.keys().cloned().collect();
        let links = self
            .repository
            .theme_links_for_reviews(tenant_id, &review_ids)?;

        let mut recommendations = Vec::new();
        let mut theme_scores = Vec::new();
        for (theme_id, theme_links) in super::domain::group_links_by_theme(&links) {
            let mentions: Vec<ThemeMention> = theme_links
                .iter()
                .filter_map(|link| {
                    results.get(&link.review_id).map(|result| ThemeMention {
                        weighted_impact: result.weighted_impact,
                        label: link.label,
                    })
                })
                .collect();

            let analysis = aggregate_theme(&mentions);
            let score_0_10 = if version.parameters.negative_volume_adjustment {
                apply_negative_volume_adjustment(&analysis)
            } else {
                analysis.score_0_10
            };

            if let Some(severity) =
                classify(score_0_10, analysis.mention_count, &version.parameters.severity_tiers)
            {
                if self
                    .repository
                    .open_recommendation_for_theme(&theme_id)?
                    .is_none()
                {
                    let title = match self.repository.find_theme(&theme_id)? {
                        Some(theme) => format!("Address recurring {} complaints", theme.name),
                        None => format!("Address recurring complaints for theme {}", theme_id.0),
                    };
                    recommendations.push(Recommendation {
                        id: next_recommendation_id(),
                        tenant_id: tenant_id.clone(),
                        theme_id: theme_id.clone(),
                        severity,
                        status: RecommendationStatus::Open,
                        title,
                        created_on: as_of,
                    });
                }
            }

            theme_scores.push(ThemeScore {
                theme_id,
                score_run_id: run_id.clone(),
                mention_count: analysis.mention_count,
                positive_count: analysis.positive_count,
                neutral_count: analysis.neutral_count,
                negative_count: analysis.negative_count,
                sum_weighted_impact: analysis.sum_weighted_impact,
                sum_abs_weighted_impact: analysis.sum_abs_weighted_impact,
                sentiment: analysis.sentiment,
                score_0_10,
                severity: analysis.severity,
            });
        }

        let review_scores: Vec<ReviewScore> = results
            .into_values()
            .map(|result| ReviewScore {
                review_id: result.review_id,
                score_run_id: run_id.clone(),
                sentiment: result.sentiment,
                time_weight: result.time_weight,
                source_weight: result.source_weight,
                engagement_weight: result.engagement_weight,
                confidence_weight: result.confidence_weight,
                weighted_impact: result.weighted_impact,
                explain: result.explain,
            })
            .collect();

        let run = ScoreRun {
            id: run_id.clone(),
            tenant_id: tenant_id.clone(),
            period_start,
            period_end,
            parameter_version_id: version.id.clone(),
            rule_set_version_id,
            sentiment_model_version,
            status: ScoreRunStatus::Completed,
            reviews_processed: review_scores.len() as u32,
            themes_processed: theme_scores.len() as u32,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        let summary = ScoreRunSummary::from_run(&run);

        self.repository.insert_run_results(
            run,
            review_scores,
            theme_scores,
            recommendations,
        )?;

        info!(
            tenant = %tenant_id.0,
            run = %summary.score_run_id.0,
            reviews = summary.reviews_processed,
            themes = summary.themes_processed,
            parameter_version = %summary.parameter_version_id,
            duration_ms = summary.duration_ms,
            "score run completed"
        );

        Ok(summary)
    }

    /// Measure a corrective action's effect on a theme by re-aggregating two
    /// time windows with the run's pinned parameter version, then persist the
    /// measurement.
    pub fn compute_and_persist_fix_score(
        &self,
        request: FixScoreRequest,
    ) -> Result<(String, FixMeasurement), ScoringServiceError> {
        let run = self
            .repository
            .find_run(&request.score_run_id)?
            .ok_or_else(|| ScoringServiceError::UnknownRun(request.score_run_id.0.clone()))?;
        let version = self.parameters.version_by_id(&run.parameter_version_id)?;

        let today = request.today.unwrap_or_else(|| Utc::now().date_naive());
        let action_date = request.action_date.unwrap_or(today);
        let settings = &version.parameters.fix_score;

        let (pre_candidate, pre) = self.windowed_theme_analysis(
            &request.tenant_id,
            &request.theme_id,
            &baseline_window_candidates(action_date, settings),
            &version,
        )?;
        let (post_candidate, post) = self.windowed_theme_analysis(
            &request.tenant_id,
            &request.theme_id,
            &post_window_candidates(action_date, today, settings),
            &version,
        )?;

        let delta_s = super::fixscore::clamp_delta(pre.sentiment, post.sentiment);
        let judgment = self.rules.evaluate_sufficiency(&SufficiencyContext {
            pre_review_count: pre.mention_count,
            post_review_count: post.mention_count,
            pre_sentiment: pre.sentiment,
            post_sentiment: post.sentiment,
            delta_s,
            min_reviews_for_inference: settings.min_reviews_for_inference,
        })?;

        let measurement = measure(
            pre_candidate,
            &pre,
            post_candidate,
            &post,
            judgment,
            &version.id,
            &run.rule_set_version_id,
        );

        let id = next_fix_score_id();
        self.repository.insert_fix_score(FixScore {
            id: id.clone(),
            tenant_id: request.tenant_id.clone(),
            theme_id: request.theme_id.clone(),
            task_id: request.task_id,
            score_run_id: request.score_run_id,
            baseline_sentiment: measurement.baseline_sentiment,
            current_sentiment: measurement.current_sentiment,
            delta_s: measurement.delta_s,
            pre_review_count: measurement.pre_review_count,
            post_review_count: measurement.post_review_count,
            confidence: measurement.confidence,
            confidence_level: measurement.confidence_level,
            value: measurement.value,
            explain: measurement.explain.clone(),
        })?;

        info!(
            tenant = %request.tenant_id.0,
            theme = %request.theme_id.0,
            fix_score = %id,
            value = measurement.value,
            confidence = measurement.confidence,
            "fix score measured"
        );

        Ok((id, measurement))
    }

    /// Translate a batch of recommendations into economic impact rows plus a
    /// run-scoped snapshot. Individual failures are logged and counted as
    /// skipped.
    pub fn calculate_and_persist_economic_impacts(
        &self,
        tenant_id: &TenantId,
        recommendation_ids: &[RecommendationId],
        score_run_id: &ScoreRunId,
    ) -> Result<EconomicBatchOutcome, ScoringServiceError> {
        let run = self
            .repository
            .find_run(score_run_id)?
            .ok_or_else(|| ScoringServiceError::UnknownRun(score_run_id.0.clone()))?;
        let version = self.parameters.version_by_id(&run.parameter_version_id)?;
        let baseline = self.repository.business_baseline(tenant_id)?;
        let channel = self.repository.channel_metrics(tenant_id)?;

        let mut calculated = 0u32;
        let mut skipped = 0u32;
        let mut suppressed = 0u32;
        let mut revenue_at_risk_bounds: Option<(f64, f64)> = None;
        let mut revenue_upside_bounds: Option<(f64, f64)> = None;
        let mut footfall_at_risk_bounds: Option<(f64, f64)> = None;
        let mut footfall_upside_bounds: Option<(f64, f64)> = None;

        for recommendation_id in recommendation_ids {
            let impact = match self.assess_recommendation(
                tenant_id,
                recommendation_id,
                score_run_id,
                &version,
                baseline.as_ref(),
                channel.as_ref(),
            ) {
                Ok(impact) => impact,
                Err(err) => {
                    warn!(
                        tenant = %tenant_id.0,
                        recommendation = %recommendation_id.0,
                        error = %err,
                        "skipping economic impact for recommendation"
                    );
                    skipped += 1;
                    continue;
                }
            };

            let revenue_at_risk = impact.revenue_at_risk;
            let revenue_upside = impact.revenue_upside;
            let footfall_at_risk = impact.footfall_at_risk;
            let footfall_upside = impact.footfall_upside;

            // A persistence failure is as per-item as an assessment failure:
            // the row is independently re-computable, so the batch goes on.
            match self.repository.insert_economic_impact(impact) {
                Ok(()) => {
                    if revenue_at_risk.is_none() {
                        suppressed += 1;
                    }
                    accumulate(&mut revenue_at_risk_bounds, revenue_at_risk);
                    accumulate(&mut revenue_upside_bounds, revenue_upside);
                    accumulate(&mut footfall_at_risk_bounds, footfall_at_risk);
                    accumulate(&mut footfall_upside_bounds, footfall_upside);
                    calculated += 1;
                }
                Err(err) => {
                    warn!(
                        tenant = %tenant_id.0,
                        recommendation = %recommendation_id.0,
                        error = %err,
                        "failed to persist economic impact for recommendation"
                    );
                    skipped += 1;
                }
            }
        }

        self.repository.insert_economic_snapshot(EconomicImpactSnapshot {
            tenant_id: tenant_id.clone(),
            score_run_id: score_run_id.clone(),
            recommendations_assessed: calculated,
            recommendations_suppressed: suppressed,
            total_revenue_at_risk: revenue_at_risk_bounds
                .map(|(min, max)| ImpactRange::from_bounds(min, max)),
            total_revenue_upside: revenue_upside_bounds
                .map(|(min, max)| ImpactRange::from_bounds(min, max)),
            total_footfall_at_risk: footfall_at_risk_bounds
                .map(|(min, max)| ImpactRange::from_bounds(min, max)),
            total_footfall_upside: footfall_upside_bounds
                .map(|(min, max)| ImpactRange::from_bounds(min, max)),
            generated_on: Utc::now().date_naive(),
        })?;

        info!(
            tenant = %tenant_id.0,
            run = %score_run_id.0,
            calculated,
            skipped,
            "economic impact batch finished"
        );

        Ok(EconomicBatchOutcome { calculated, skipped })
    }

    fn assess_recommendation(
        &self,
        tenant_id: &TenantId,
        recommendation_id: &RecommendationId,
        score_run_id: &ScoreRunId,
        version: &ParameterVersion,
        baseline: Option<&super::domain::BusinessBaseline>,
        channel: Option<&super::domain::ChannelMetrics>,
    ) -> Result<super::domain::RecommendationEconomicImpact, ScoringServiceError> {
        let recommendation = self
            .repository
            .find_recommendation(recommendation_id)?
            .ok_or(RepositoryError::NotFound)?;

        if &recommendation.tenant_id != tenant_id {
            return Err(RepositoryError::NotFound.into());
        }

        let theme = self
            .repository
            .find_theme(&recommendation.theme_id)?
            .ok_or_else(|| ScoringServiceError::UnknownTheme(recommendation.theme_id.0.clone()))?;

        let theme_score = self
            .repository
            .theme_score(&recommendation.theme_id, score_run_id)?;

        let input = match &theme_score {
            Some(score) => ThemeEconomicInput {
                category: theme.category,
                severity: recommendation.severity,
                mention_count: score.mention_count,
                negative_count: score.negative_count,
                neutral_count: score.neutral_count,
                sentiment: score.sentiment,
                score_0_10: Some(score.score_0_10),
            },
            None => ThemeEconomicInput {
                category: theme.category,
                severity: recommendation.severity,
                mention_count: 0,
                negative_count: 0,
                neutral_count: 0,
                sentiment: 0.0,
                score_0_10: None,
            },
        };

        let assessment = assess(
            &input,
            baseline,
            channel,
            &version.parameters.economic,
            &version.id,
        );

        Ok(super::domain::RecommendationEconomicImpact {
            recommendation_id: recommendation.id,
            score_run_id: score_run_id.clone(),
            revenue_at_risk: assessment.revenue_at_risk,
            revenue_upside: assessment.revenue_upside,
            footfall_at_risk: assessment.footfall_at_risk,
            footfall_upside: assessment.footfall_upside,
            driver: assessment.driver,
            driver_confidence: assessment.driver_confidence,
            grade: assessment.grade,
            data_quality: assessment.data_quality,
            explain: assessment.explain,
        })
    }

    fn resolve_version(
        &self,
        pinned: Option<&str>,
    ) -> Result<ParameterVersion, ScoringServiceError> {
        let version = match pinned {
            Some(id) => self.parameters.version_by_id(id)?,
            None => self.parameters.active_version()?,
        };
        Ok(version)
    }

    /// Aggregate one theme over the first window candidate that yields any
    /// reviews; the last candidate is used (possibly empty) when every
    /// fallback comes up dry.
    fn windowed_theme_analysis(
        &self,
        tenant_id: &TenantId,
        theme_id: &ThemeId,
        candidates: &[WindowCandidate],
        version: &ParameterVersion,
    ) -> Result<(WindowCandidate, ThemeAnalysis), ScoringServiceError> {
        let mut selected = (
            *candidates.last().expect("window plans are never empty"),
            ThemeAnalysis::empty(),
        );

        for candidate in candidates {
            let reviews = self.repository.reviews_in_window(tenant_id, candidate.window)?;
            let review_ids: Vec<ReviewId> = reviews.iter().map(|review| review.id.clone()).collect();
            let links = self
                .repository
                .theme_links_for_reviews(tenant_id, &review_ids)?;

            let mut mentions = Vec::new();
            for link in links.iter().filter(|link| &link.theme_id == theme_id) {
                let review = reviews
                    .iter()
                    .find(|review| review.id == link.review_id)
                    .expect("link returned for fetched review");
                let result = score_review(
                    review,
                    version,
                    candidate.window.end,
                    &*self.sentiment,
                    &*self.rules,
                )?;
                mentions.push(ThemeMention {
                    weighted_impact: result.weighted_impact,
                    label: link.label,
                });
            }

            if !mentions.is_empty() {
                return Ok((*candidate, aggregate_theme(&mentions)));
            }

            selected = (*candidate, ThemeAnalysis::empty());
        }

        Ok(selected)
    }
}

fn validate_period(period_start: NaiveDate, period_end: NaiveDate) -> Result<(), ScoringServiceError> {
    if period_start >= period_end {
        return Err(ScoringServiceError::InvalidPeriod {
            reason: format!("period start {period_start} is not before end {period_end}"),
        });
    }

    if period_end - period_start > Duration::days(MAX_PERIOD_DAYS) {
        return Err(ScoringServiceError::InvalidPeriod {
            reason: format!("period spans more than {MAX_PERIOD_DAYS} days"),
        });
    }

    Ok(())
}

fn accumulate(bounds: &mut Option<(f64, f64)>, range: Option<ImpactRange>) {
    if let Some(range) = range {
        let (min, max) = bounds.unwrap_or((0.0, 0.0));
        *bounds = Some((min + range.min, max + range.max));
    }
}
