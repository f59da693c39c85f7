//! FixScore Engine: measures whether a completed corrective action moved a
//! theme's sentiment, gated by data sufficiency.
//!
//! Window selection is an explicit ordered list of fallback policies tried in
//! sequence. Each candidate carries a policy tag that ends up in the explain
//! payload, so the widening is auditable and testable in isolation.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::domain::ConfidenceLevel;
use super::explain::{FixScoreExplain, FormulaStep, PeriodAnalysis, SufficiencyExplain};
use super::parameters::FixScoreSettings;
use super::providers::SufficiencyJudgment;
use super::theme::ThemeAnalysis;

/// Inclusive date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Named fallback policy a window candidate was produced by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WindowPolicy {
    ConfiguredBaseline,
    YearLookbackBaseline,
    ConfiguredPost,
    PostExtendedToToday,
}

impl WindowPolicy {
    pub const fn label(self) -> &'static str {
        match self {
            WindowPolicy::ConfiguredBaseline => "configured_baseline",
            WindowPolicy::YearLookbackBaseline => "year_lookback_baseline",
            WindowPolicy::ConfiguredPost => "configured_post",
            WindowPolicy::PostExtendedToToday => "post_extended_to_today",
        }
    }
}

/// A window plus the policy that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowCandidate {
    pub policy: WindowPolicy,
    pub window: DateWindow,
}

/// Baseline ("pre") window candidates, most specific first: the configured
/// window (never shorter than 90 days) ending the day before the action
/// date, then a 365-day lookback so a too-narrow configuration does not
/// report "no data" when older reviews exist.
pub fn baseline_window_candidates(
    action_date: NaiveDate,
    settings: &FixScoreSettings,
) -> Vec<WindowCandidate> {
    let pre_end = action_date - Duration::days(1);
    let pre_days = i64::from(settings.pre_window_days.max(90));

    let mut candidates = vec![WindowCandidate {
        policy: WindowPolicy::ConfiguredBaseline,
        window: DateWindow {
            start: pre_end - Duration::days(pre_days - 1),
            end: pre_end,
        },
    }];

    if pre_days < 365 {
        candidates.push(WindowCandidate {
            policy: WindowPolicy::YearLookbackBaseline,
            window: DateWindow {
                start: pre_end - Duration::days(364),
                end: pre_end,
            },
        });
    }

    candidates
}

/// Post-action window candidates: the configured window (never shorter than
/// 60 days) starting at the action date, then the same window extended to
/// today so measurement keeps accumulating evidence.
pub fn post_window_candidates(
    action_date: NaiveDate,
    today: NaiveDate,
    settings: &FixScoreSettings,
) -> Vec<WindowCandidate> {
    let post_days = i64::from(settings.post_window_days.max(60));
    let configured_end = action_date + Duration::days(post_days - 1);

    let mut candidates = vec![WindowCandidate {
        policy: WindowPolicy::ConfiguredPost,
        window: DateWindow {
            start: action_date,
            end: configured_end,
        },
    }];

    if today > configured_end {
        candidates.push(WindowCandidate {
            policy: WindowPolicy::PostExtendedToToday,
            window: DateWindow {
                start: action_date,
                end: today,
            },
        });
    }

    candidates
}

/// Sentiment shift between the two windows, clamped to [-2, 2].
pub fn clamp_delta(pre_sentiment: f64, post_sentiment: f64) -> f64 {
    (post_sentiment - pre_sentiment).clamp(-2.0, 2.0)
}

/// The FixScore formula. Review-count growth is logarithmic for the same
/// sub-linearity rationale as theme severity. Zero confidence or zero
/// reviews yields exactly zero: insufficient evidence never produces a
/// nonzero claim.
pub fn calculate_fix_score_value(delta_s: f64, review_count: u32, confidence: f64) -> f64 {
    if review_count == 0 || confidence == 0.0 {
        return 0.0;
    }
    delta_s * (1.0 + f64::from(review_count)).ln() * confidence
}

/// One completed measurement, ready to persist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixMeasurement {
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

/// Assemble a measurement from the two window aggregations and the external
/// sufficiency judgment.
pub fn measure(
    pre_candidate: WindowCandidate,
    pre: &ThemeAnalysis,
    post_candidate: WindowCandidate,
    post: &ThemeAnalysis,
    judgment: SufficiencyJudgment,
    parameter_version_id: &str,
    rule_set_version_id: &str,
) -> FixMeasurement {
    let delta_s = clamp_delta(pre.sentiment, post.sentiment);
    let total_reviews = pre.mention_count + post.mention_count;
    let confidence = judgment.score.clamp(0.0, 1.0);
    let value = calculate_fix_score_value(delta_s, total_reviews, confidence);

    let steps = vec![
        FormulaStep::new(
            "delta_s",
            &[
                ("pre_sentiment", pre.sentiment),
                ("post_sentiment", post.sentiment),
            ],
            delta_s,
        ),
        FormulaStep::new(
            "fix_score",
            &[
                ("delta_s", delta_s),
                ("total_review_count", f64::from(total_reviews)),
                ("confidence", confidence),
            ],
            value,
        ),
    ];

    FixMeasurement {
        baseline_sentiment: pre.sentiment,
        current_sentiment: post.sentiment,
        delta_s,
        pre_review_count: pre.mention_count,
        post_review_count: post.mention_count,
        confidence,
        confidence_level: judgment.level,
        value,
        explain: FixScoreExplain {
            pre: period_analysis(pre_candidate, pre),
            post: period_analysis(post_candidate, post),
            delta_s,
            sufficiency: SufficiencyExplain {
                level: judgment.level,
                score: judgment.score,
                trace: judgment.explain,
            },
            steps,
            parameter_version_id: parameter_version_id.to_string(),
            rule_set_version_id: rule_set_version_id.to_string(),
        },
    }
}

fn period_analysis(candidate: WindowCandidate, analysis: &ThemeAnalysis) -> PeriodAnalysis {
    PeriodAnalysis {
        window_start: candidate.window.start,
        window_end: candidate.window.end,
        policy: candidate.policy.label().to_string(),
        review_count: analysis.mention_count,
        positive_count: analysis.positive_count,
        neutral_count: analysis.neutral_count,
        negative_count: analysis.negative_count,
        sentiment: analysis.sentiment,
        score_0_10: analysis.score_0_10,
    }
}
