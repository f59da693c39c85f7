//! Economic Impact Calculator: converts theme-level health into estimated
//! revenue and footfall ranges with a calibrated confidence grade.
//!
//! Below the data-quality suppression threshold monetary outputs are `None`,
//! not zero. "Unknown" must stay distinguishable from "no impact".

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{
    BusinessBaseline, ChannelMetrics, ConfidenceGrade, ImpactDriver, ImpactRange,
    RecommendationSeverity, ThemeCategory,
};
use super::explain::{DataQualityBreakdown, EconomicImpactExplain, FormulaStep};
use super::parameters::EconomicSettings;

const WEEKS_PER_MONTH: f64 = 4.33;

/// Theme-level facts the calculator consumes for one recommendation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeEconomicInput {
    pub category: ThemeCategory,
    pub severity: RecommendationSeverity,
    pub mention_count: u32,
    pub negative_count: u32,
    pub neutral_count: u32,
    pub sentiment: f64,
    pub score_0_10: Option<f64>,
}

/// Economic translation for one recommendation, ready to persist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomicAssessment {
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

/// Weighted blend of input availability: baseline completeness 40%, mention
/// volume relative to the configured minimum 30%, theme-score availability
/// 20%, channel metrics 10%.
pub fn data_quality(
    input: &ThemeEconomicInput,
    baseline: Option<&BusinessBaseline>,
    channel: Option<&ChannelMetrics>,
    settings: &EconomicSettings,
) -> DataQualityBreakdown {
    let baseline_completeness = baseline.map(BusinessBaseline::completeness).unwrap_or(0.0);

    let mention_volume = if settings.min_mentions_for_roi == 0 {
        1.0
    } else {
        (f64::from(input.mention_count) / f64::from(settings.min_mentions_for_roi)).min(1.0)
    };

    let theme_score_availability = if input.score_0_10.is_some() { 1.0 } else { 0.0 };

    let channel_availability = channel
        .map(|metrics| {
            let provided = [
                metrics.monthly_profile_views.is_some(),
                metrics.click_through_rate.is_some(),
                metrics.click_to_visit_rate.is_some(),
            ]
            .iter()
            .filter(|present| **present)
            .count();
            provided as f64 / 3.0
        })
        .unwrap_or(0.0);

    let score = 0.4 * baseline_completeness
        + 0.3 * mention_volume
        + 0.2 * theme_score_availability
        + 0.1 * channel_availability;

    DataQualityBreakdown {
        baseline_completeness,
        mention_volume,
        theme_score_availability,
        channel_availability,
        score,
    }
}

/// Monthly covers: reported directly, or estimated from seating capacity and
/// service cadence when the operator has not supplied the figure.
pub fn monthly_covers(baseline: &BusinessBaseline) -> Option<(f64, bool)> {
    if let Some(covers) = baseline.covers_per_month {
        return Some((covers, false));
    }

    let seats = f64::from(baseline.seat_capacity?);
    let turns = baseline.turns_per_service?;
    let services = f64::from(baseline.services_per_day?);
    let days = f64::from(baseline.days_open_per_week?);

    Some((seats * turns * services * days * WEEKS_PER_MONTH, true))
}

/// Monthly revenue estimate: covers x average spend. `None` when neither the
/// direct figure nor a capacity-based estimate is computable.
pub fn monthly_revenue(baseline: &BusinessBaseline) -> Option<(f64, bool)> {
    let spend = baseline.average_spend?;
    let (covers, estimated) = monthly_covers(baseline)?;
    Some((covers * spend, estimated))
}

/// Upside scaling: how prevalent and how well-evidenced the problem is. The
/// non-positive ratio captures prevalence; the log-volume ratio discounts
/// thin evidence.
pub fn mention_scale_factor(input: &ThemeEconomicInput) -> f64 {
    if input.mention_count == 0 {
        return 0.0;
    }

    let non_positive = input.negative_count + input.neutral_count;
    let ratio = f64::from(non_positive) / f64::from(input.mention_count);
    let volume = (1.0 + f64::from(non_positive)).ln() / (1.0 + f64::from(input.mention_count)).ln();

    (ratio * volume).clamp(0.0, 1.0)
}

/// Funnel stage most affected by a theme category, with a severity-based
/// confidence adjustment.
pub fn impact_driver(
    category: ThemeCategory,
    severity: RecommendationSeverity,
) -> (ImpactDriver, f64) {
    let driver = match category {
        ThemeCategory::Food | ThemeCategory::Value | ThemeCategory::Other => {
            ImpactDriver::Conversion
        }
        ThemeCategory::Service => ImpactDriver::Retention,
        ThemeCategory::Ambiance | ThemeCategory::Cleanliness => ImpactDriver::Acquisition,
    };

    let confidence = match severity {
        RecommendationSeverity::Critical | RecommendationSeverity::High => 0.8,
        RecommendationSeverity::Medium => 0.7,
        RecommendationSeverity::Low => 0.65,
    };

    (driver, confidence)
}

/// Map a data-quality score onto the categorical grade thresholds.
pub fn confidence_grade(data_quality: f64, settings: &EconomicSettings) -> ConfidenceGrade {
    if data_quality >= settings.grade_high_threshold {
        ConfidenceGrade::High
    } else if data_quality >= settings.grade_medium_threshold {
        ConfidenceGrade::Medium
    } else if data_quality >= settings.grade_low_threshold {
        ConfidenceGrade::Low
    } else {
        ConfidenceGrade::InsufficientData
    }
}

/// Translate one recommendation's theme health into economic ranges.
pub fn assess(
    input: &ThemeEconomicInput,
    baseline: Option<&BusinessBaseline>,
    channel: Option<&ChannelMetrics>,
    settings: &EconomicSettings,
    parameter_version_id: &str,
) -> EconomicAssessment {
    let quality = data_quality(input, baseline, channel, settings);
    let (driver, driver_confidence) = impact_driver(input.category, input.severity);
    let grade = confidence_grade(quality.score, settings);

    let mut inputs = BTreeMap::new();
    inputs.insert("mention_count".to_string(), f64::from(input.mention_count));
    inputs.insert("negative_count".to_string(), f64::from(input.negative_count));
    inputs.insert("neutral_count".to_string(), f64::from(input.neutral_count));
    inputs.insert("sentiment".to_string(), input.sentiment);
    if let Some(score) = input.score_0_10 {
        inputs.insert("score_0_10".to_string(), score);
    }

    let mut steps = Vec::new();
    let mut caveats = Vec::new();

    if baseline.is_none() {
        caveats.push("No business baseline metrics supplied; estimates rely on defaults".to_string());
    }
    if input.mention_count < settings.min_mentions_for_roi {
        caveats.push(format!(
            "Only {} mention(s) observed, below the {} required for reliable ROI figures",
            input.mention_count, settings.min_mentions_for_roi
        ));
    }
    if channel.is_none() {
        caveats.push("No channel metrics supplied; footfall conversion uses configured defaults".to_string());
    }

    let suppressed = quality.score < settings.suppression_threshold;
    if suppressed {
        caveats.push(format!(
            "Data quality {:.2} below threshold {:.2}; monetary estimates withheld",
            quality.score, settings.suppression_threshold
        ));
    }

    let theme_weight = settings
        .theme_weights
        .get(&input.category)
        .copied()
        .unwrap_or(0.5);
    let rating_impact = settings.rating_impact.get(input.severity);
    let severity_multiplier = settings.severity_multiplier.get(input.severity);
    let scale = mention_scale_factor(input);

    inputs.insert("theme_weight".to_string(), theme_weight);
    inputs.insert("rating_impact".to_string(), rating_impact);
    inputs.insert("severity_multiplier".to_string(), severity_multiplier);

    steps.push(FormulaStep::new(
        "mention_scale_factor",
        &[
            (
                "non_positive_mentions",
                f64::from(input.negative_count + input.neutral_count),
            ),
            ("mention_count", f64::from(input.mention_count)),
        ],
        scale,
    ));

    let revenue = baseline.and_then(monthly_revenue);
    let covers = baseline.and_then(monthly_covers);

    if let Some((_, estimated)) = revenue {
        if estimated {
            caveats.push(
                "Monthly revenue estimated from seating capacity rather than reported covers"
                    .to_string(),
            );
        }
    } else {
        caveats.push("Monthly revenue not computable from supplied baseline".to_string());
    }

    let revenue_at_risk = if suppressed {
        None
    } else {
        revenue.map(|(monthly, _)| {
            let factor = rating_impact * theme_weight * severity_multiplier;
            let low = monthly * settings.revenue_elasticity_min * factor;
            let high = monthly * settings.revenue_elasticity_max * factor;
            steps.push(FormulaStep::new(
                "revenue_at_risk",
                &[
                    ("monthly_revenue", monthly),
                    ("elasticity_min", settings.revenue_elasticity_min),
                    ("elasticity_max", settings.revenue_elasticity_max),
                    ("rating_impact", rating_impact),
                    ("theme_weight", theme_weight),
                    ("severity_multiplier", severity_multiplier),
                ],
                (low + high) / 2.0,
            ));
            ImpactRange::from_bounds(low, high)
        })
    };

    let revenue_upside = revenue_at_risk.map(|range| {
        let scaled = range.scaled(scale);
        steps.push(FormulaStep::new(
            "revenue_upside",
            &[("at_risk_mid", range.mid), ("mention_scale_factor", scale)],
            scaled.mid,
        ));
        scaled
    });

    let click_to_visit = channel
        .and_then(|metrics| metrics.click_to_visit_rate)
        .unwrap_or(settings.click_to_visit_rate);

    let footfall_at_risk = if suppressed {
        None
    } else {
        covers.map(|(monthly_covers, _)| {
            let factor = rating_impact * theme_weight * severity_multiplier * click_to_visit;
            let low = monthly_covers * settings.click_elasticity_min * factor;
            let high = monthly_covers * settings.click_elasticity_max * factor;
            steps.push(FormulaStep::new(
                "footfall_at_risk",
                &[
                    ("monthly_covers", monthly_covers),
                    ("click_elasticity_min", settings.click_elasticity_min),
                    ("click_elasticity_max", settings.click_elasticity_max),
                    ("click_to_visit_rate", click_to_visit),
                    ("rating_impact", rating_impact),
                    ("theme_weight", theme_weight),
                    ("severity_multiplier", severity_multiplier),
                ],
                (low + high) / 2.0,
            ));
            ImpactRange::from_bounds(low, high)
        })
    };

    let footfall_upside = footfall_at_risk.map(|range| {
        let scaled = range.scaled(scale);
        steps.push(FormulaStep::new(
            "footfall_upside",
            &[("at_risk_mid", range.mid), ("mention_scale_factor", scale)],
            scaled.mid,
        ));
        scaled
    });

    EconomicAssessment {
        revenue_at_risk,
        revenue_upside,
        footfall_at_risk,
        footfall_upside,
        driver,
        driver_confidence,
        grade,
        data_quality: quality.score,
        explain: EconomicImpactExplain {
            inputs,
            data_quality: quality,
            driver,
            steps,
            caveats,
            parameter_version_id: parameter_version_id.to_string(),
        },
    }
}
