mod common;

use common::*;
use review_pulse::scoring::domain::{
    RecommendationSeverity, RecommendationStatus, ScoreRunStatus, SentimentLabel, ThemeCategory,
};
use review_pulse::scoring::{ScoreRunOptions, ScoringServiceError};

fn seed_theme_reviews(
    repository: &RecordingRepository,
    theme_id: &str,
    prefix: &str,
    content: &str,
    label: SentimentLabel,
    count: usize,
) {
    for index in 0..count {
        let id = format!("{prefix}-{index}");
        repository.seed_review(review(&id, content, date(2025, 5, 18)));
        repository.seed_link(link(&id, theme_id, label));
    }
}

#[test]
fn score_run_scores_every_review_and_opens_recommendations() {
    let sentiment = StubSentiment::default()
        .scoring("the dining room smelled awful", -0.85)
        .scoring("wonderful fresh pasta", 0.8);
    let (engine, repository) = build_engine(sentiment);

    repository.seed_theme(theme("t-clean", "Dining room hygiene", ThemeCategory::Cleanliness));
    repository.seed_theme(theme("t-food", "Fresh pasta", ThemeCategory::Food));
    seed_theme_reviews(
        &repository,
        "t-clean",
        "dirty",
        "the dining room smelled awful",
        SentimentLabel::Negative,
        8,
    );
    seed_theme_reviews(
        &repository,
        "t-food",
        "pasta",
        "wonderful fresh pasta",
        SentimentLabel::Positive,
        5,
    );

    let summary = engine
        .execute_score_run(
            &tenant(),
            date(2025, 5, 1),
            date(2025, 6, 1),
            ScoreRunOptions::default(),
        )
        .expect("run completes");

    assert_eq!(summary.reviews_processed, 13);
    assert_eq!(summary.themes_processed, 2);
    assert_eq!(summary.parameter_version_id, "standard-v1");

    let runs = repository.runs();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, ScoreRunStatus::Completed);

    // Each review score carries its full audit trail.
    let review_scores = repository.review_scores();
    assert_eq!(review_scores.len(), 13);
    for score in &review_scores {
        assert_eq!(score.explain.parameter_version_id, "standard-v1");
        assert!(!score.explain.steps.is_empty());
        assert!((-1.0..=1.0).contains(&score.sentiment));
    }

    let theme_scores = repository.theme_scores();
    assert_eq!(theme_scores.len(), 2);
    let hygiene = theme_scores
        .iter()
        .find(|score| score.theme_id.0 == "t-clean")
        .expect("hygiene theme scored");
    // Uniformly negative mentions pin the theme at the floor.
    assert_eq!(hygiene.sentiment, -1.0);
    assert_eq!(hygiene.score_0_10, 0.0);
    assert!(hygiene.severity > 0.0);

    let pasta = theme_scores
        .iter()
        .find(|score| score.theme_id.0 == "t-food")
        .expect("food theme scored");
    assert_eq!(pasta.sentiment, 1.0);
    assert_eq!(pasta.score_0_10, 10.0);
    assert_eq!(pasta.severity, 0.0);

    // Only the failing theme opens a recommendation: 8 mentions clears the
    // HIGH floor but not the CRITICAL one.
    let recommendations = repository.recommendations();
    assert_eq!(recommendations.len(), 1);
    assert_eq!(recommendations[0].severity, RecommendationSeverity::High);
    assert_eq!(recommendations[0].status, RecommendationStatus::Open);
    assert_eq!(recommendations[0].theme_id.0, "t-clean");
    assert!(recommendations[0].title.contains("Dining room hygiene"));
}

#[test]
fn rerun_of_the_same_period_is_idempotent() {
    let sentiment = StubSentiment::default().scoring("the dining room smelled awful", -0.85);
    let (engine, repository) = build_engine(sentiment);
    repository.seed_theme(theme("t-clean", "Dining room hygiene", ThemeCategory::Cleanliness));
    seed_theme_reviews(
        &repository,
        "t-clean",
        "dirty",
        "the dining room smelled awful",
        SentimentLabel::Negative,
        5,
    );

    let first = engine
        .execute_score_run(
            &tenant(),
            date(2025, 5, 1),
            date(2025, 6, 1),
            ScoreRunOptions::default(),
        )
        .expect("first run completes");
    let second = engine
        .execute_score_run(
            &tenant(),
            date(2025, 5, 1),
            date(2025, 6, 1),
            ScoreRunOptions::default(),
        )
        .expect("second run short-circuits");

    assert_eq!(first.score_run_id, second.score_run_id);
    assert_eq!(repository.runs().len(), 1);
    assert_eq!(repository.review_scores().len(), 5);

    // A different period is a different run.
    let third = engine
        .execute_score_run(
            &tenant(),
            date(2025, 4, 1),
            date(2025, 6, 1),
            ScoreRunOptions::default(),
        )
        .expect("third run completes");
    assert_ne!(third.score_run_id, first.score_run_id);
    assert_eq!(repository.runs().len(), 2);
}

#[test]
fn a_run_with_no_reviews_still_completes() {
    let (engine, repository) = build_engine(StubSentiment::default());

    let summary = engine
        .execute_score_run(
            &tenant(),
            date(2025, 5, 1),
            date(2025, 6, 1),
            ScoreRunOptions::default(),
        )
        .expect("empty run completes");

    assert_eq!(summary.reviews_processed, 0);
    assert_eq!(summary.themes_processed, 0);
    assert_eq!(repository.runs()[0].status, ScoreRunStatus::Completed);
    assert!(repository.recommendations().is_empty());
}

#[test]
fn invalid_periods_never_reach_the_repository() {
    let (engine, repository) = build_engine(StubSentiment::default());

    let err = engine
        .execute_score_run(
            &tenant(),
            date(2025, 6, 1),
            date(2025, 6, 1),
            ScoreRunOptions::default(),
        )
        .expect_err("degenerate period rejected");
    assert!(matches!(err, ScoringServiceError::InvalidPeriod { .. }));
    assert!(repository.runs().is_empty());
}
