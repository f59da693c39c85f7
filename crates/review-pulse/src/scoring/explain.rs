//! Typed explain payloads.
//!
//! Operators are shown the numbers this engine produces and must be able to
//! audit how each one was derived, so every calculation layer emits a
//! strongly-typed payload that serializes as a pure projection of the
//! computation. Nothing in here is recomputed at display time.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::domain::{ConfidenceLevel, ImpactDriver, SentimentLabel};

/// One named formula application: the numeric inputs that went in and the
/// number that came out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormulaStep {
    pub label: String,
    pub inputs: BTreeMap<String, f64>,
    pub result: f64,
}

impl FormulaStep {
    pub fn new(label: &str, inputs: &[(&str, f64)], result: f64) -> Self {
        Self {
            label: label.to_string(),
            inputs: inputs
                .iter()
                .map(|(name, value)| (name.to_string(), *value))
                .collect(),
            result,
        }
    }
}

/// Trace returned by the external confidence-rule evaluator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleTrace {
    pub reason_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_rule: Option<String>,
}

/// How the base sentiment for a review was obtained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentExplain {
    pub provider: String,
    pub model_version: String,
    pub text_score: f64,
    pub provider_confidence: f64,
    pub category: SentimentLabel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub star_rating: Option<u8>,
    pub blend_applied: bool,
    pub blended_score: f64,
}

/// Full audit trail for one review's weighted impact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewScoreExplain {
    pub sentiment: SentimentExplain,
    pub confidence_trace: RuleTrace,
    pub steps: Vec<FormulaStep>,
    pub parameter_version_id: String,
}

/// Aggregation summary for one window of a FixScore measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodAnalysis {
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub policy: String,
    pub review_count: u32,
    pub positive_count: u32,
    pub neutral_count: u32,
    pub negative_count: u32,
    pub sentiment: f64,
    pub score_0_10: f64,
}

/// Sufficiency judgment trace for a FixScore measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SufficiencyExplain {
    pub level: ConfidenceLevel,
    pub score: f64,
    pub trace: RuleTrace,
}

/// Full audit trail for one FixScore measurement. A FixScore must be
/// re-derivable byte-for-byte from this payload plus the pinned versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixScoreExplain {
    pub pre: PeriodAnalysis,
    pub post: PeriodAnalysis,
    pub delta_s: f64,
    pub sufficiency: SufficiencyExplain,
    pub steps: Vec<FormulaStep>,
    pub parameter_version_id: String,
    pub rule_set_version_id: String,
}

/// Weighted factor breakdown behind a data-quality score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQualityBreakdown {
    pub baseline_completeness: f64,
    pub mention_volume: f64,
    pub theme_score_availability: f64,
    pub channel_availability: f64,
    pub score: f64,
}

/// Full audit trail for one recommendation's economic translation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomicImpactExplain {
    pub inputs: BTreeMap<String, f64>,
    pub data_quality: DataQualityBreakdown,
    pub driver: ImpactDriver,
    pub steps: Vec<FormulaStep>,
    pub caveats: Vec<String>,
    pub parameter_version_id: String,
}
