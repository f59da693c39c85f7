//! Recommendation Classifier: a thin rule layer deciding whether a theme
//! warrants an actionable recommendation and at what severity.

use super::domain::RecommendationSeverity;
use super::parameters::SeverityTiers;

/// Classify a theme against the four severity tiers, tested CRITICAL down to
/// LOW; first match wins. A theme qualifies for a tier when its 0-10 score is
/// below the tier's ceiling and its mention count meets the tier's floor.
/// Themes that clear every ceiling, or lack mentions at every tier, yield no
/// recommendation.
pub fn classify(
    score_0_10: f64,
    mention_count: u32,
    tiers: &SeverityTiers,
) -> Option<RecommendationSeverity> {
    tiers
        .ordered()
        .into_iter()
        .find(|(_, rule)| score_0_10 < rule.max_score && mention_count >= rule.min_mentions)
        .map(|(severity, _)| severity)
}
