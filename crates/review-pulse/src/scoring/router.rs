use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;

use super::domain::{RecommendationId, ScoreRunId, TaskId, TenantId, ThemeId};
use super::parameters::ParameterSource;
use super::providers::{ConfidenceRules, SentimentProvider};
use super::repository::{RepositoryError, ScoringRepository};
use super::service::{FixScoreRequest, ScoreRunOptions, ScoringService, ScoringServiceError};

/// Router builder exposing the scoring pipeline to the scheduler/UI layer.
pub fn scoring_router<R, S, C, P>(service: Arc<ScoringService<R, S, C, P>>) -> Router
where
    R: ScoringRepository + 'static,
    S: SentimentProvider + 'static,
    C: ConfidenceRules + 'static,
    P: ParameterSource + 'static,
{
    Router::new()
        .route("/api/v1/scoring/runs", post(score_run_handler::<R, S, C, P>))
        .route(
            "/api/v1/scoring/fix-scores",
            post(fix_score_handler::<R, S, C, P>),
        )
        .route(
            "/api/v1/scoring/economic-impacts",
            post(economic_impact_handler::<R, S, C, P>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct ScoreRunRequest {
    tenant_id: String,
    period_start: NaiveDate,
    period_end: NaiveDate,
    #[serde(default)]
    as_of: Option<NaiveDate>,
    #[serde(default)]
    parameter_version_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FixScoreBody {
    tenant_id: String,
    theme_id: String,
    #[serde(default)]
    task_id: Option<String>,
    score_run_id: String,
    #[serde(default)]
    action_date: Option<NaiveDate>,
    #[serde(default)]
    today: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EconomicImpactBody {
    tenant_id: String,
    recommendation_ids: Vec<String>,
    score_run_id: String,
}

pub(crate) async fn score_run_handler<R, S, C, P>(
    State(service): State<Arc<ScoringService<R, S, C, P>>>,
    axum::Json(request): axum::Json<ScoreRunRequest>,
) -> Response
where
    R: ScoringRepository + 'static,
    S: SentimentProvider + 'static,
    C: ConfidenceRules + 'static,
    P: ParameterSource + 'static,
{
    let outcome = service.execute_score_run(
        &TenantId(request.tenant_id),
        request.period_start,
        request.period_end,
        ScoreRunOptions {
            as_of: request.as_of,
            parameter_version_id: request.parameter_version_id,
        },
    );

    match outcome {
        Ok(summary) => (StatusCode::OK, axum::Json(summary)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn fix_score_handler<R, S, C, P>(
    State(service): State<Arc<ScoringService<R, S, C, P>>>,
    axum::Json(body): axum::Json<FixScoreBody>,
) -> Response
where
    R: ScoringRepository + 'static,
    S: SentimentProvider + 'static,
    C: ConfidenceRules + 'static,
    P: ParameterSource + 'static,
{
    let outcome = service.compute_and_persist_fix_score(FixScoreRequest {
        tenant_id: TenantId(body.tenant_id),
        theme_id: ThemeId(body.theme_id),
        task_id: body.task_id.map(TaskId),
        score_run_id: ScoreRunId(body.score_run_id),
        action_date: body.action_date,
        today: body.today,
    });

    match outcome {
        Ok((id, measurement)) => (
            StatusCode::CREATED,
            axum::Json(json!({ "id": id, "result": measurement })),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn economic_impact_handler<R, S, C, P>(
    State(service): State<Arc<ScoringService<R, S, C, P>>>,
    axum::Json(body): axum::Json<EconomicImpactBody>,
) -> Response
where
    R: ScoringRepository + 'static,
    S: SentimentProvider + 'static,
    C: ConfidenceRules + 'static,
    P: ParameterSource + 'static,
{
    let recommendation_ids: Vec<RecommendationId> = body
        .recommendation_ids
        .into_iter()
        .map(RecommendationId)
        .collect();

    let outcome = service.calculate_and_persist_economic_impacts(
        &TenantId(body.tenant_id),
        &recommendation_ids,
        &ScoreRunId(body.score_run_id),
    );

    match outcome {
        Ok(batch) => (StatusCode::OK, axum::Json(batch)).into_response(),
        Err(err) => error_response(err),
    }
}

fn error_response(err: ScoringServiceError) -> Response {
    let status = match &err {
        ScoringServiceError::InvalidPeriod { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ScoringServiceError::NoActiveParameters | ScoringServiceError::Parameters(_) => {
            StatusCode::CONFLICT
        }
        ScoringServiceError::UnknownRun(_)
        | ScoringServiceError::UnknownTheme(_)
        | ScoringServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        ScoringServiceError::Provider(_)
        | ScoringServiceError::Rules(_)
        | ScoringServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({ "error": err.to_string() });
    (status, axum::Json(payload)).into_response()
}
