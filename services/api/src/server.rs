use crate::cli::ServeArgs;
use crate::infra::{
    AppState, HeuristicConfidenceRules, InMemoryScoringRepository, LexiconSentimentProvider,
    StandardParameterStore,
};
use crate::routes::with_scoring_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use review_pulse::config::AppConfig;
use review_pulse::error::AppError;
use review_pulse::scoring::ScoringService;
use review_pulse::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = Arc::new(InMemoryScoringRepository::default());
    let sentiment = Arc::new(LexiconSentimentProvider);
    let rules = Arc::new(HeuristicConfidenceRules::default());
    let parameters = Arc::new(StandardParameterStore::default());
    let scoring_service = Arc::new(ScoringService::new(repository, sentiment, rules, parameters));

    let app = with_scoring_routes(scoring_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "scoring engine ready");

    axum::serve(listener, app).await?;
    Ok(())
}
