use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{RecommendationSeverity, ReviewSource, ThemeCategory};

/// Time-decay controls for the review scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecaySettings {
    pub half_life_days: f64,
}

/// Per-source weight table plus the global clamp applied after lookup.
/// Sources absent from the table score with a raw weight of 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceWeightSettings {
    pub weights: BTreeMap<ReviewSource, f64>,
    pub min_weight: f64,
    pub max_weight: f64,
}

/// Engagement scoring controls. Sources not present in `enabled` are treated
/// as disabled and score a neutral 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementSettings {
    pub enabled: BTreeMap<ReviewSource, bool>,
    pub weight_cap: f64,
}

/// Whether and how much to blend a star rating into the text sentiment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentBlendSettings {
    pub enabled: bool,
    pub star_weight: f64,
}

/// Window lengths and inference thresholds for FixScore measurements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixScoreSettings {
    pub pre_window_days: u32,
    pub post_window_days: u32,
    pub min_reviews_for_inference: u32,
}

/// One value per recommendation severity grade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeverityTable {
    pub critical: f64,
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

impl SeverityTable {
    pub fn get(&self, severity: RecommendationSeverity) -> f64 {
        match severity {
            RecommendationSeverity::Critical => self.critical,
            RecommendationSeverity::High => self.high,
            RecommendationSeverity::Medium => self.medium,
            RecommendationSeverity::Low => self.low,
        }
    }
}

/// Tunable economic parameters for the impact calculator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomicSettings {
    /// Revenue change per rating point, as a [min, max] fraction.
    pub revenue_elasticity_min: f64,
    pub revenue_elasticity_max: f64,
    /// Discovery-click change per rating point, as a [min, max] fraction.
    pub click_elasticity_min: f64,
    pub click_elasticity_max: f64,
    /// Fraction of discovery clicks that convert into a visit.
    pub click_to_visit_rate: f64,
    /// Estimated rating points at stake per severity grade.
    pub rating_impact: SeverityTable,
    /// Fraction of the theoretical ceiling attributed per severity grade.
    pub severity_multiplier: SeverityTable,
    /// Relative economic weight of each theme category.
    pub theme_weights: BTreeMap<ThemeCategory, f64>,
    /// Minimum mention volume before ROI figures are considered meaningful.
    pub min_mentions_for_roi: u32,
    /// Data-quality score below which monetary outputs are suppressed.
    pub suppression_threshold: f64,
    /// Data-quality thresholds for the HIGH / MEDIUM / LOW confidence grades.
    pub grade_high_threshold: f64,
    pub grade_medium_threshold: f64,
    pub grade_low_threshold: f64,
}

/// One recommendation tier: a theme qualifies when its 0-10 score is below
/// `max_score` and its mention count is at least `min_mentions`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierRule {
    pub max_score: f64,
    pub min_mentions: u32,
}

/// The four classification tiers, tested CRITICAL down to LOW.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeverityTiers {
    pub critical: TierRule,
    pub high: TierRule,
    pub medium: TierRule,
    pub low: TierRule,
}

impl SeverityTiers {
    /// Tiers in evaluation order, most urgent first.
    pub fn ordered(&self) -> [(RecommendationSeverity, TierRule); 4] {
        [
            (RecommendationSeverity::Critical, self.critical),
            (RecommendationSeverity::High, self.high),
            (RecommendationSeverity::Medium, self.medium),
            (RecommendationSeverity::Low, self.low),
        ]
    }
}

/// Complete tunable parameter document for one scoring run. Versioned and
/// immutable once referenced by a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringParameters {
    pub decay: DecaySettings,
    pub source_weights: SourceWeightSettings,
    pub engagement: EngagementSettings,
    pub sentiment_blend: SentimentBlendSettings,
    pub fix_score: FixScoreSettings,
    pub economic: EconomicSettings,
    pub severity_tiers: SeverityTiers,
    /// Optional quadratic penalty on the negative-mention ratio applied to
    /// the 0-10 score as a post-processing step. Off by default.
    pub negative_volume_adjustment: bool,
}

impl ScoringParameters {
    /// Baseline parameter set used for new tenants and demos.
    pub fn standard() -> Self {
        let mut weights = BTreeMap::new();
        weights.insert(ReviewSource::Google, 1.0);
        weights.insert(ReviewSource::Yelp, 0.9);
        weights.insert(ReviewSource::TripAdvisor, 0.9);
        weights.insert(ReviewSource::Facebook, 0.8);
        weights.insert(ReviewSource::DirectFeedback, 1.1);

        let mut enabled = BTreeMap::new();
        enabled.insert(ReviewSource::Google, true);
        enabled.insert(ReviewSource::Yelp, true);
        enabled.insert(ReviewSource::TripAdvisor, true);
        enabled.insert(ReviewSource::Facebook, true);
        enabled.insert(ReviewSource::DirectFeedback, false);

        let mut theme_weights = BTreeMap::new();
        theme_weights.insert(ThemeCategory::Food, 1.0);
        theme_weights.insert(ThemeCategory::Service, 0.9);
        theme_weights.insert(ThemeCategory::Cleanliness, 0.8);
        theme_weights.insert(ThemeCategory::Value, 0.7);
        theme_weights.insert(ThemeCategory::Ambiance, 0.6);
        theme_weights.insert(ThemeCategory::Other, 0.5);

        Self {
            decay: DecaySettings {
                half_life_days: 90.0,
            },
            source_weights: SourceWeightSettings {
                weights,
                min_weight: 0.5,
                max_weight: 1.5,
            },
            engagement: EngagementSettings {
                enabled,
                weight_cap: 3.0,
            },
            sentiment_blend: SentimentBlendSettings {
                enabled: true,
                star_weight: 0.3,
            },
            fix_score: FixScoreSettings {
                pre_window_days: 90,
                post_window_days: 60,
                min_reviews_for_inference: 5,
            },
            economic: EconomicSettings {
                revenue_elasticity_min: 0.05,
                revenue_elasticity_max: 0.09,
                click_elasticity_min: 0.02,
                click_elasticity_max: 0.05,
                click_to_visit_rate: 0.3,
                rating_impact: SeverityTable {
                    critical: 0.5,
                    high: 0.3,
                    medium: 0.15,
                    low: 0.05,
                },
                severity_multiplier: SeverityTable {
                    critical: 1.0,
                    high: 0.7,
                    medium: 0.4,
                    low: 0.2,
                },
                theme_weights,
                min_mentions_for_roi: 5,
                suppression_threshold: 0.3,
                grade_high_threshold: 0.75,
                grade_medium_threshold: 0.5,
                grade_low_threshold: 0.3,
            },
            severity_tiers: SeverityTiers {
                critical: TierRule {
                    max_score: 2.0,
                    min_mentions: 10,
                },
                high: TierRule {
                    max_score: 3.5,
                    min_mentions: 7,
                },
                medium: TierRule {
                    max_score: 5.0,
                    min_mentions: 5,
                },
                low: TierRule {
                    max_score: 6.0,
                    min_mentions: 3,
                },
            },
            negative_volume_adjustment: false,
        }
    }

    /// Check the structural invariants every version must satisfy before it
    /// can be activated.
    pub fn validate(&self) -> Result<(), ParameterError> {
        if self.decay.half_life_days <= 0.0 {
            return Err(ParameterError::Invalid(
                "decay half-life must be positive".to_string(),
            ));
        }

        if self.source_weights.min_weight > self.source_weights.max_weight {
            return Err(ParameterError::Invalid(format!(
                "source weight clamp min {} exceeds max {}",
                self.source_weights.min_weight, self.source_weights.max_weight
            )));
        }

        if self.engagement.weight_cap < 1.0 {
            return Err(ParameterError::Invalid(
                "engagement weight cap must be at least 1.0".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&self.sentiment_blend.star_weight) {
            return Err(ParameterError::Invalid(
                "sentiment blend weight must lie in [0, 1]".to_string(),
            ));
        }

        let economic = &self.economic;
        if economic.revenue_elasticity_min > economic.revenue_elasticity_max {
            return Err(ParameterError::Invalid(
                "revenue elasticity min exceeds max".to_string(),
            ));
        }
        if economic.click_elasticity_min > economic.click_elasticity_max {
            return Err(ParameterError::Invalid(
                "click elasticity min exceeds max".to_string(),
            ));
        }
        if !(economic.grade_low_threshold <= economic.grade_medium_threshold
            && economic.grade_medium_threshold <= economic.grade_high_threshold)
        {
            return Err(ParameterError::Invalid(
                "confidence grade thresholds must be ordered low <= medium <= high".to_string(),
            ));
        }

        for (severity, rule) in self.severity_tiers.ordered() {
            if !(0.0..=10.0).contains(&rule.max_score) {
                return Err(ParameterError::Invalid(format!(
                    "{} tier score ceiling {} outside [0, 10]",
                    severity.label(),
                    rule.max_score
                )));
            }
            if rule.min_mentions == 0 {
                return Err(ParameterError::Invalid(format!(
                    "{} tier requires a mention floor of at least 1",
                    severity.label()
                )));
            }
        }

        Ok(())
    }
}

/// Lifecycle of a parameter version. Drafts are editable; activation freezes
/// the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterVersionStatus {
    Draft,
    Active,
    Retired,
}

/// Immutable, versioned parameter document. Every computed artifact stores
/// the exact version id it used.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterVersion {
    pub id: String,
    pub status: ParameterVersionStatus,
    pub created_on: NaiveDate,
    pub parameters: ScoringParameters,
}

impl ParameterVersion {
    pub fn draft(id: impl Into<String>, created_on: NaiveDate, parameters: ScoringParameters) -> Self {
        Self {
            id: id.into(),
            status: ParameterVersionStatus::Draft,
            created_on,
            parameters,
        }
    }

    /// Validate and freeze a draft. The caller is responsible for atomically
    /// retiring the previously active version.
    pub fn activate(mut self) -> Result<Self, ParameterError> {
        if self.status != ParameterVersionStatus::Draft {
            return Err(ParameterError::NotDraft {
                id: self.id.clone(),
            });
        }
        self.parameters.validate()?;
        self.status = ParameterVersionStatus::Active;
        Ok(self)
    }
}

/// Source of parameter versions. "Active" is resolved exactly once per run
/// and pinned; it is never re-read mid-computation.
pub trait ParameterSource: Send + Sync {
    fn active_version(&self) -> Result<ParameterVersion, ParameterError>;
    fn version_by_id(&self, id: &str) -> Result<ParameterVersion, ParameterError>;
}

/// Errors raised by parameter validation and lookup.
#[derive(Debug, thiserror::Error)]
pub enum ParameterError {
    #[error("invalid scoring parameters: {0}")]
    Invalid(String),
    #[error("parameter version {id} is not a draft")]
    NotDraft { id: String },
    #[error("no active parameter version")]
    NoActiveVersion,
    #[error("unknown parameter version {0}")]
    UnknownVersion(String),
    #[error("parameter store unavailable: {0}")]
    Unavailable(String),
}
