use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::explain::{EconomicImpactExplain, FixScoreExplain, ReviewScoreExplain};

/// Identifier wrapper for tenants (one restaurant group per tenant).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TenantId(pub String);

/// Identifier wrapper for imported reviews.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReviewId(pub String);

/// Identifier wrapper for extracted themes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ThemeId(pub String);

/// Identifier wrapper for corrective tasks tracked outside the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub String);

/// Identifier wrapper for recommendations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecommendationId(pub String);

/// Identifier wrapper for scoring runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScoreRunId(pub String);

/// Platforms a review can originate from. Unknown platforms map to `Other`
/// and receive the default raw source weight before clamping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ReviewSource {
    Google,
    Yelp,
    TripAdvisor,
    Facebook,
    DirectFeedback,
    Other,
}

impl ReviewSource {
    pub const fn label(self) -> &'static str {
        match self {
            ReviewSource::Google => "google",
            ReviewSource::Yelp => "yelp",
            ReviewSource::TripAdvisor => "tripadvisor",
            ReviewSource::Facebook => "facebook",
            ReviewSource::DirectFeedback => "direct_feedback",
            ReviewSource::Other => "other",
        }
    }
}

/// Per-link sentiment label produced by the theme-extraction step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

impl SentimentLabel {
    pub const fn label(self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Neutral => "neutral",
            SentimentLabel::Negative => "negative",
        }
    }
}

/// Engagement counters attached to a review by its source platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementCounters {
    pub likes: u32,
    pub replies: u32,
    pub helpful: u32,
}

impl EngagementCounters {
    pub fn total(&self) -> u32 {
        self.likes
            .saturating_add(self.replies)
            .saturating_add(self.helpful)
    }
}

/// An imported customer review. Immutable scoring input; the engine never
/// mutates these records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub tenant_id: TenantId,
    pub content: String,
    pub star_rating: Option<u8>,
    pub posted_on: NaiveDate,
    pub source: ReviewSource,
    pub engagement: EngagementCounters,
    pub duplicate_similarity: Option<f64>,
    pub language: Option<String>,
}

/// Theme categories observed in the restaurant review corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ThemeCategory {
    Food,
    Service,
    Value,
    Ambiance,
    Cleanliness,
    Other,
}

impl ThemeCategory {
    pub const fn label(self) -> &'static str {
        match self {
            ThemeCategory::Food => "food",
            ThemeCategory::Service => "service",
            ThemeCategory::Value => "value",
            ThemeCategory::Ambiance => "ambiance",
            ThemeCategory::Cleanliness => "cleanliness",
            ThemeCategory::Other => "other",
        }
    }
}

/// A theme a tenant's reviews are tagged into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Theme {
    pub id: ThemeId,
    pub tenant_id: TenantId,
    pub name: String,
    pub category: ThemeCategory,
}

/// Association between a review and a theme, produced by theme extraction
/// upstream of this engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewThemeLink {
    pub review_id: ReviewId,
    pub theme_id: ThemeId,
    pub label: SentimentLabel,
    pub confidence: f64,
}

/// Persisted per-(review, run) score. Append-only: a review accrues one of
/// these per scoring run it participates in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewScore {
    pub review_id: ReviewId,
    pub score_run_id: ScoreRunId,
    pub sentiment: f64,
    pub time_weight: f64,
    pub source_weight: f64,
    pub engagement_weight: f64,
    pub confidence_weight: f64,
    pub weighted_impact: f64,
    pub explain: ReviewScoreExplain,
}

/// Persisted per-(theme, run) aggregate, derived entirely from the run's
/// review scores. Never edited directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeScore {
    pub theme_id: ThemeId,
    pub score_run_id: ScoreRunId,
    pub mention_count: u32,
    pub positive_count: u32,
    pub neutral_count: u32,
    pub negative_count: u32,
    pub sum_weighted_impact: f64,
    pub sum_abs_weighted_impact: f64,
    pub sentiment: f64,
    pub score_0_10: f64,
    pub severity: f64,
}

/// Categorical confidence judgment attached to estimates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
    InsufficientData,
}

impl ConfidenceLevel {
    pub const fn label(self) -> &'static str {
        match self {
            ConfidenceLevel::High => "high",
            ConfidenceLevel::Medium => "medium",
            ConfidenceLevel::Low => "low",
            ConfidenceLevel::InsufficientData => "insufficient_data",
        }
    }
}

/// One before/after effectiveness measurement for a corrective action.
/// Re-measurement creates a new record rather than updating this one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixScore {
    pub id: String,
    pub tenant_id: TenantId,
    pub theme_id: ThemeId,
    pub task_id: Option<TaskId>,
    pub score_run_id: ScoreRunId,
    pub baseline_sentiment: f64,
    pub current_sentiment: f64,
    pub delta_s: f64,
    pub pre_review_count: u32,
    pub post_review_count: u32,
    pub confidence: f64,
    pub confidence_level: ConfidenceLevel,
    pub value: f64,
    pub explain: FixScoreExplain,
}

/// Severity grade assigned to an actionable recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecommendationSeverity {
    Critical,
    High,
    Medium,
    Low,
}

impl RecommendationSeverity {
    pub const fn label(self) -> &'static str {
        match self {
            RecommendationSeverity::Critical => "critical",
            RecommendationSeverity::High => "high",
            RecommendationSeverity::Medium => "medium",
            RecommendationSeverity::Low => "low",
        }
    }
}

/// Lifecycle of a recommendation. The engine only decides whether one should
/// exist and at what severity; task completion drives the transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecommendationStatus {
    Open,
    InProgress,
    Resolved,
    Dismissed,
}

impl RecommendationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            RecommendationStatus::Open => "open",
            RecommendationStatus::InProgress => "in_progress",
            RecommendationStatus::Resolved => "resolved",
            RecommendationStatus::Dismissed => "dismissed",
        }
    }

    /// Whether the recommendation still counts against the one-open-per-theme
    /// rule.
    pub const fn is_unresolved(self) -> bool {
        matches!(
            self,
            RecommendationStatus::Open | RecommendationStatus::InProgress
        )
    }

    /// Guarded state machine: OPEN -> IN_PROGRESS -> RESOLVED | DISMISSED.
    /// OPEN may also be dismissed directly.
    pub fn transition(self, next: RecommendationStatus) -> Result<RecommendationStatus, StatusTransitionError> {
        let allowed = matches!(
            (self, next),
            (RecommendationStatus::Open, RecommendationStatus::InProgress)
                | (RecommendationStatus::Open, RecommendationStatus::Dismissed)
                | (RecommendationStatus::InProgress, RecommendationStatus::Resolved)
                | (RecommendationStatus::InProgress, RecommendationStatus::Dismissed)
        );

        if allowed {
            Ok(next)
        } else {
            Err(StatusTransitionError {
                from: self,
                to: next,
            })
        }
    }
}

/// Rejected recommendation status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot transition recommendation from {} to {}", .from.label(), .to.label())]
pub struct StatusTransitionError {
    pub from: RecommendationStatus,
    pub to: RecommendationStatus,
}

/// Theme-linked, severity-graded suggestion surfaced to operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: RecommendationId,
    pub tenant_id: TenantId,
    pub theme_id: ThemeId,
    pub severity: RecommendationSeverity,
    pub status: RecommendationStatus,
    pub title: String,
    pub created_on: NaiveDate,
}

/// Numeric range reported for monetary and footfall estimates.
/// `mid` is always the arithmetic midpoint of `min` and `max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactRange {
    pub min: f64,
    pub mid: f64,
    pub max: f64,
}

impl ImpactRange {
    /// Build a range from two bounds in either order.
    pub fn from_bounds(a: f64, b: f64) -> Self {
        let (min, max) = if a <= b { (a, b) } else { (b, a) };
        Self {
            min,
            mid: (min + max) / 2.0,
            max,
        }
    }

    pub fn scaled(&self, factor: f64) -> Self {
        Self::from_bounds(self.min * factor, self.max * factor)
    }
}

/// Which part of the customer funnel a theme's health primarily affects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImpactDriver {
    Acquisition,
    Conversion,
    Retention,
}

impl ImpactDriver {
    pub const fn label(self) -> &'static str {
        match self {
            ImpactDriver::Acquisition => "acquisition",
            ImpactDriver::Conversion => "conversion",
            ImpactDriver::Retention => "retention",
        }
    }
}

/// Calibrated trust grade for an economic estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceGrade {
    High,
    Medium,
    Low,
    InsufficientData,
}

impl ConfidenceGrade {
    pub const fn label(self) -> &'static str {
        match self {
            ConfidenceGrade::High => "high",
            ConfidenceGrade::Medium => "medium",
            ConfidenceGrade::Low => "low",
            ConfidenceGrade::InsufficientData => "insufficient_data",
        }
    }
}

/// Per-recommendation economic translation. Monetary fields are `None` when
/// data quality is below the suppression threshold: "unknown" is never
/// reported as zero impact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationEconomicImpact {
    pub recommendation_id: RecommendationId,
    pub score_run_id: ScoreRunId,
    pub revenue_at_risk: Option<ImpactRange>,
    pub revenue_upside: Option<ImpactRange>,
    pub footfall_at_risk: Option<ImpactRange>,
    pub footfall_upside: Option<ImpactRange>,
    pub driver: ImpactDriver,
    pub driver_confidence: f64,
    pub grade: ConfidenceGrade,
    pub data_quality: f64,
    pub explain: EconomicImpactExplain,
}

/// Run-scoped rollup of economic impact across a tenant's recommendations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomicImpactSnapshot {
    pub tenant_id: TenantId,
    pub score_run_id: ScoreRunId,
    pub recommendations_assessed: u32,
    pub recommendations_suppressed: u32,
    pub total_revenue_at_risk: Option<ImpactRange>,
    pub total_revenue_upside: Option<ImpactRange>,
    pub total_footfall_at_risk: Option<ImpactRange>,
    pub total_footfall_upside: Option<ImpactRange>,
    pub generated_on: NaiveDate,
}

/// Operator-supplied baseline metrics for the economic layer. Every field is
/// optional; completeness feeds the data-quality score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BusinessBaseline {
    pub covers_per_month: Option<f64>,
    pub average_spend: Option<f64>,
    pub seat_capacity: Option<u32>,
    pub turns_per_service: Option<f64>,
    pub services_per_day: Option<u32>,
    pub days_open_per_week: Option<u32>,
}

impl BusinessBaseline {
    /// Fraction of baseline fields the operator has supplied.
    pub fn completeness(&self) -> f64 {
        let provided = [
            self.covers_per_month.is_some(),
            self.average_spend.is_some(),
            self.seat_capacity.is_some(),
            self.turns_per_service.is_some(),
            self.services_per_day.is_some(),
            self.days_open_per_week.is_some(),
        ]
        .iter()
        .filter(|present| **present)
        .count();

        provided as f64 / 6.0
    }
}

/// Discovery-channel metrics (profile views, clicks) for footfall estimates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelMetrics {
    pub monthly_profile_views: Option<f64>,
    pub click_through_rate: Option<f64>,
    pub click_to_visit_rate: Option<f64>,
}

/// Lifecycle of a scoring run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreRunStatus {
    Running,
    Completed,
    Failed,
}

impl ScoreRunStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ScoreRunStatus::Running => "running",
            ScoreRunStatus::Completed => "completed",
            ScoreRunStatus::Failed => "failed",
        }
    }
}

/// One invocation of the engine over a tenant's scoring period. Pins the
/// exact parameter and rule-set versions used so every derived number is
/// reproducible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRun {
    pub id: ScoreRunId,
    pub tenant_id: TenantId,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub parameter_version_id: String,
    pub rule_set_version_id: String,
    pub sentiment_model_version: String,
    pub status: ScoreRunStatus,
    pub reviews_processed: u32,
    pub themes_processed: u32,
    pub duration_ms: u64,
}

/// Pairing of reviews and theme links grouped for aggregation.
pub(crate) fn group_links_by_theme(
    links: &[ReviewThemeLink],
) -> BTreeMap<ThemeId, Vec<&ReviewThemeLink>> {
    let mut grouped: BTreeMap<ThemeId, Vec<&ReviewThemeLink>> = BTreeMap::new();
    for link in links {
        grouped.entry(link.theme_id.clone()).or_default().push(link);
    }
    grouped
}
