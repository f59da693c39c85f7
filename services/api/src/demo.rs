use crate::infra::{
    HeuristicConfidenceRules, InMemoryScoringRepository, LexiconSentimentProvider,
    StandardParameterStore,
};
use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use review_pulse::error::AppError;
use review_pulse::scoring::domain::{
    BusinessBaseline, ChannelMetrics, EngagementCounters, ImpactRange, Review, ReviewId,
    ReviewSource, ReviewThemeLink, SentimentLabel, TenantId, Theme, ThemeCategory, ThemeId,
};
use review_pulse::scoring::{FixScoreRequest, ScoreRunOptions, ScoringService};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Override the evaluation date (defaults to today).
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Completion date of the simulated service fix (defaults to 70 days
    /// before the evaluation date).
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) action_date: Option<NaiveDate>,
    /// Skip the economic impact portion of the demo.
    #[arg(long)]
    pub(crate) skip_impact: bool,
}

type DemoService = ScoringService<
    InMemoryScoringRepository,
    LexiconSentimentProvider,
    HeuristicConfidenceRules,
    StandardParameterStore,
>;

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    let action_date = args.action_date.unwrap_or(today - Duration::days(70));
    let tenant = TenantId("trattoria-demo".to_string());

    let repository = Arc::new(InMemoryScoringRepository::default());
    let service: Arc<DemoService> = Arc::new(ScoringService::new(
        repository.clone(),
        Arc::new(LexiconSentimentProvider),
        Arc::new(HeuristicConfidenceRules::default()),
        Arc::new(StandardParameterStore::default()),
    ));

    seed_demo_tenant(&repository, &tenant, today);

    println!("Review scoring demo for {}", tenant.0);
    println!(
        "Evaluation date {today} | simulated service fix completed {action_date}"
    );

    let period_start = today - Duration::days(119);
    let summary = service
        .execute_score_run(&tenant, period_start, today, ScoreRunOptions::default())
        .map_err(AppError::from)?;

    println!(
        "\nScore run {} over {period_start}..{today}",
        summary.score_run_id.0
    );
    println!(
        "- {} reviews scored across {} themes in {} ms",
        summary.reviews_processed, summary.themes_processed, summary.duration_ms
    );
    println!(
        "- parameters {} | rules {} | sentiment model {}",
        summary.parameter_version_id, summary.rule_set_version_id, summary.sentiment_model_version
    );

    let mut theme_scores = repository.theme_scores_for_run(&summary.score_run_id);
    theme_scores.sort_by(|a, b| {
        b.severity
            .partial_cmp(&a.severity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    println!("\nTheme health (worst first):");
    for score in &theme_scores {
        println!(
            "- {}: {:.1}/10 | sentiment {:+.2} | {} mentions ({}+ / {}~ / {}-) | severity {:.2}",
            repository.theme_name(&score.theme_id),
            score.score_0_10,
            score.sentiment,
            score.mention_count,
            score.positive_count,
            score.neutral_count,
            score.negative_count,
            score.severity
        );
    }

    let recommendations = repository.recommendations();
    if recommendations.is_empty() {
        println!("\nNo theme crossed a recommendation threshold.");
    } else {
        println!("\nRecommendations opened:");
        for recommendation in &recommendations {
            println!(
                "- [{}] {}",
                recommendation.severity.label().to_uppercase(),
                recommendation.title
            );
        }
    }

    let (fix_id, measurement) = service
        .compute_and_persist_fix_score(FixScoreRequest {
            tenant_id: tenant.clone(),
            theme_id: ThemeId("demo-service".to_string()),
            task_id: None,
            score_run_id: summary.score_run_id.clone(),
            action_date: Some(action_date),
            today: Some(today),
        })
        .map_err(AppError::from)?;

    println!("\nFixScore {} for the service fix:", fix_id);
    println!(
        "- baseline window {}..{} ({}): {} reviews, sentiment {:+.2}",
        measurement.explain.pre.window_start,
        measurement.explain.pre.window_end,
        measurement.explain.pre.policy,
        measurement.pre_review_count,
        measurement.baseline_sentiment
    );
    println!(
        "- post window {}..{} ({}): {} reviews, sentiment {:+.2}",
        measurement.explain.post.window_start,
        measurement.explain.post.window_end,
        measurement.explain.post.policy,
        measurement.post_review_count,
        measurement.current_sentiment
    );
    println!(
        "- delta {:+.2} | confidence {} ({:.2}) | FixScore {:.2}",
        measurement.delta_s,
        measurement.confidence_level.label(),
        measurement.confidence,
        measurement.value
    );

    if args.skip_impact {
        return Ok(());
    }

    let recommendation_ids: Vec<_> = recommendations
        .iter()
        .map(|recommendation| recommendation.id.clone())
        .collect();
    let outcome = service
        .calculate_and_persist_economic_impacts(
            &tenant,
            &recommendation_ids,
            &summary.score_run_id,
        )
        .map_err(AppError::from)?;

    println!(
        "\nEconomic impact ({} calculated, {} skipped):",
        outcome.calculated, outcome.skipped
    );
    for impact in repository.impacts() {
        let theme_id = recommendations
            .iter()
            .find(|recommendation| recommendation.id == impact.recommendation_id)
            .map(|recommendation| recommendation.theme_id.clone());
        let name = theme_id
            .map(|id| repository.theme_name(&id))
            .unwrap_or_else(|| impact.recommendation_id.0.clone());

        println!(
            "- {}: driver {} | grade {} | data quality {:.2}",
            name,
            impact.driver.label(),
            impact.grade.label(),
            impact.data_quality
        );
        println!(
            "    revenue at risk {} | upside if fixed {}",
            render_money(impact.revenue_at_risk.as_ref()),
            render_money(impact.revenue_upside.as_ref())
        );
        println!(
            "    covers at risk {} | covers recoverable {}",
            render_covers(impact.footfall_at_risk.as_ref()),
            render_covers(impact.footfall_upside.as_ref())
        );
    }

    if let Some(snapshot) = repository.snapshots().last() {
        println!(
            "\nPortfolio snapshot: {} assessed, {} suppressed",
            snapshot.recommendations_assessed, snapshot.recommendations_suppressed
        );
        println!(
            "- total revenue at risk {} | total upside {}",
            render_money(snapshot.total_revenue_at_risk.as_ref()),
            render_money(snapshot.total_revenue_upside.as_ref())
        );
        println!(
            "- total covers at risk {} | total covers recoverable {}",
            render_covers(snapshot.total_footfall_at_risk.as_ref()),
            render_covers(snapshot.total_footfall_upside.as_ref())
        );
    }

    Ok(())
}

fn render_money(range: Option<&ImpactRange>) -> String {
    match range {
        Some(range) => format!(
            "${:.0}-${:.0}/mo (mid ${:.0})",
            range.min, range.max, range.mid
        ),
        None => "withheld (insufficient data)".to_string(),
    }
}

fn render_covers(range: Option<&ImpactRange>) -> String {
    match range {
        Some(range) => format!("{:.0}-{:.0}/mo", range.min, range.max),
        None => "withheld".to_string(),
    }
}

struct SeedReview {
    days_ago: i64,
    content: &'static str,
    source: ReviewSource,
    star_rating: Option<u8>,
    likes: u32,
    theme: &'static str,
    label: SentimentLabel,
}

fn seed_demo_tenant(repository: &InMemoryScoringRepository, tenant: &TenantId, today: NaiveDate) {
    let themes = [
        ("demo-food", "Signature dishes", ThemeCategory::Food),
        ("demo-service", "Slow table service", ThemeCategory::Service),
        ("demo-value", "Menu pricing", ThemeCategory::Value),
        ("demo-ambiance", "Dining room atmosphere", ThemeCategory::Ambiance),
        ("demo-clean", "Restroom cleanliness", ThemeCategory::Cleanliness),
    ];
    for (id, name, category) in themes {
        repository.seed_theme(Theme {
            id: ThemeId(id.to_string()),
            tenant_id: tenant.clone(),
            name: name.to_string(),
            category,
        });
    }

    let mut seeds = Vec::new();

    // Service complaints before the fix, praise after it.
    for days_ago in [76, 80, 84, 88, 92, 96, 100, 104] {
        seeds.push(SeedReview {
            days_ago,
            content: "Waited forty minutes for mains, service was terrible and slow",
            source: ReviewSource::Google,
            star_rating: Some(2),
            likes: 3,
            theme: "demo-service",
            label: SentimentLabel::Negative,
        });
    }
    for days_ago in [5, 10, 15, 20, 25, 30, 35, 40, 45, 50] {
        seeds.push(SeedReview {
            days_ago,
            content: "Service much improved, the new staff are friendly and prompt",
            source: ReviewSource::Google,
            star_rating: Some(5),
            likes: 1,
            theme: "demo-service",
            label: SentimentLabel::Positive,
        });
    }

    for days_ago in [8, 22, 36, 50, 64, 78, 92] {
        seeds.push(SeedReview {
            days_ago,
            content: "The pasta was delicious and the ingredients tasted fresh",
            source: ReviewSource::Yelp,
            star_rating: Some(5),
            likes: 0,
            theme: "demo-food",
            label: SentimentLabel::Positive,
        });
    }
    for days_ago in [30, 60] {
        seeds.push(SeedReview {
            days_ago,
            content: "Bland risotto this time, honestly disappointing",
            source: ReviewSource::TripAdvisor,
            star_rating: Some(3),
            likes: 0,
            theme: "demo-food",
            label: SentimentLabel::Negative,
        });
    }

    for days_ago in [12, 26, 40] {
        seeds.push(SeedReview {
            days_ago,
            content: "Portions are overpriced and frankly underwhelming for the money",
            source: ReviewSource::Google,
            star_rating: Some(2),
            likes: 5,
            theme: "demo-value",
            label: SentimentLabel::Negative,
        });
    }
    for days_ago in [18, 54, 82] {
        seeds.push(SeedReview {
            days_ago,
            content: "Tasty food although a little overpriced for the neighbourhood",
            source: ReviewSource::Facebook,
            star_rating: Some(4),
            likes: 0,
            theme: "demo-value",
            label: SentimentLabel::Neutral,
        });
    }

    for days_ago in [14, 42, 70, 98, 110] {
        seeds.push(SeedReview {
            days_ago,
            content: "Lovely room, wonderful lighting, a perfect date spot",
            source: ReviewSource::TripAdvisor,
            star_rating: Some(5),
            likes: 2,
            theme: "demo-ambiance",
            label: SentimentLabel::Positive,
        });
    }

    for days_ago in [10, 20, 32, 44, 56, 68] {
        seeds.push(SeedReview {
            days_ago,
            content: "Dirty cutlery and a frankly filthy restroom",
            source: ReviewSource::Google,
            star_rating: Some(1),
            likes: 8,
            theme: "demo-clean",
            label: SentimentLabel::Negative,
        });
    }

    for (index, seed) in seeds.into_iter().enumerate() {
        let review_id = ReviewId(format!("demo-review-{index:03}"));
        repository.seed_review(
            Review {
                id: review_id.clone(),
                tenant_id: tenant.clone(),
                content: seed.content.to_string(),
                star_rating: seed.star_rating,
                posted_on: today - Duration::days(seed.days_ago),
                source: seed.source,
                engagement: EngagementCounters {
                    likes: seed.likes,
                    replies: 0,
                    helpful: 0,
                },
                duplicate_similarity: None,
                language: Some("en".to_string()),
            },
            vec![ReviewThemeLink {
                review_id,
                theme_id: ThemeId(seed.theme.to_string()),
                label: seed.label,
                confidence: 0.9,
            }],
        );
    }

    repository.seed_baseline(
        tenant.clone(),
        BusinessBaseline {
            covers_per_month: Some(3400.0),
            average_spend: Some(38.0),
            seat_capacity: Some(60),
            turns_per_service: Some(1.8),
            services_per_day: Some(2),
            days_open_per_week: Some(6),
        },
    );
    repository.seed_channel_metrics(
        tenant.clone(),
        ChannelMetrics {
            monthly_profile_views: Some(15_000.0),
            click_through_rate: Some(0.045),
            click_to_visit_rate: Some(0.32),
        },
    );
}
