//! Theme Aggregator: rolls review-level weighted impacts into a theme-level
//! sentiment, a 0-10 score, and a severity rank.

use serde::{Deserialize, Serialize};

use super::domain::SentimentLabel;

/// One review's contribution to a theme: its weighted impact and the
/// sentiment label the theme-extraction step attached to the link.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThemeMention {
    pub weighted_impact: f64,
    pub label: SentimentLabel,
}

/// Aggregated health metrics for one theme over one period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThemeAnalysis {
    pub mention_count: u32,
    pub positive_count: u32,
    pub neutral_count: u32,
    pub negative_count: u32,
    pub sum_weighted_impact: f64,
    pub sum_abs_weighted_impact: f64,
    /// Magnitude-weighted net sentiment in [-1, 1].
    pub sentiment: f64,
    /// Linear rescale of sentiment onto [0, 10].
    pub score_0_10: f64,
    /// Volume-adjusted negativity rank, zero for non-negative themes.
    pub severity: f64,
}

impl ThemeAnalysis {
    pub fn empty() -> Self {
        Self {
            mention_count: 0,
            positive_count: 0,
            neutral_count: 0,
            negative_count: 0,
            sum_weighted_impact: 0.0,
            sum_abs_weighted_impact: 0.0,
            sentiment: 0.0,
            score_0_10: 5.0,
            severity: 0.0,
        }
    }
}

/// Aggregate a theme's mentions for one period.
///
/// The sentiment ratio is insensitive to overall volume: three strongly
/// negative mentions can equal thirty. Aggregation is a pair of sums, so the
/// result is invariant under permutation of the input.
pub fn aggregate_theme(mentions: &[ThemeMention]) -> ThemeAnalysis {
    if mentions.is_empty() {
        return ThemeAnalysis::empty();
    }

    let mut positive_count = 0u32;
    let mut neutral_count = 0u32;
    let mut negative_count = 0u32;
    let mut sum = 0.0f64;
    let mut sum_abs = 0.0f64;

    for mention in mentions {
        match mention.label {
            SentimentLabel::Positive => positive_count += 1,
            SentimentLabel::Neutral => neutral_count += 1,
            SentimentLabel::Negative => negative_count += 1,
        }
        sum += mention.weighted_impact;
        sum_abs += mention.weighted_impact.abs();
    }

    let sentiment = if sum_abs == 0.0 { 0.0 } else { sum / sum_abs };
    let mention_count = mentions.len() as u32;

    ThemeAnalysis {
        mention_count,
        positive_count,
        neutral_count,
        negative_count,
        sum_weighted_impact: sum,
        sum_abs_weighted_impact: sum_abs,
        sentiment,
        score_0_10: score_from_sentiment(sentiment),
        severity: severity(sentiment, mention_count),
    }
}

/// Linear rescale: -1 maps to 0, 0 to 5, +1 to 10, clamped to [0, 10].
pub fn score_from_sentiment(sentiment: f64) -> f64 {
    (5.0 * (sentiment + 1.0)).clamp(0.0, 10.0)
}

/// Only negative themes rank; severity grows sublinearly with volume so a
/// single harsh outlier review never outranks a recurring complaint pattern.
pub fn severity(sentiment: f64, mention_count: u32) -> f64 {
    sentiment.min(0.0).abs() * (1.0 + f64::from(mention_count)).ln()
}

/// Optional, explicitly-versioned post-processing step: a quadratic penalty
/// on the negative-mention ratio. Applied only when the parameter version
/// enables it, so runs always record which score variant they produced.
pub fn apply_negative_volume_adjustment(analysis: &ThemeAnalysis) -> f64 {
    if analysis.mention_count == 0 {
        return analysis.score_0_10;
    }

    let negative_ratio =
        f64::from(analysis.negative_count) / f64::from(analysis.mention_count);
    let penalty = 2.0 * negative_ratio * negative_ratio;
    (analysis.score_0_10 - penalty).clamp(0.0, 10.0)
}
