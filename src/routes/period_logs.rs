use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use super::AppState;
use crate::error::ApiError;
use crate::models::{NewPeriodLog, PeriodLog, PeriodLogPatch, UserQuery};
use crate::tracker::Logged;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/period-logs", get(list_period_logs).post(log_period))
        .route(
            "/period-logs/:id",
            get(get_period_log)
                .patch(update_period_log)
                .delete(delete_period_log),
        )
        .with_state(state)
}

async fn list_period_logs(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<PeriodLog>>, ApiError> {
    Ok(Json(state.store.list_period_logs(query.user_id).await?))
}

async fn get_period_log(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PeriodLog>, ApiError> {
    state
        .store
        .get_period_log(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("period log"))
}

async fn log_period(
    State(state): State<AppState>,
    Json(body): Json<NewPeriodLog>,
) -> Result<(StatusCode, Json<PeriodLog>), ApiError> {
    match state.tracker.log_period(body).await? {
        Logged::Created(log) => {
            tracing::info!(id = log.id, date = %log.date, "🩸 Period logged");
            Ok((StatusCode::CREATED, Json(log)))
        }
        Logged::Updated(log) => Ok((StatusCode::OK, Json(log))),
    }
}

async fn update_period_log(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<PeriodLogPatch>,
) -> Result<Json<PeriodLog>, ApiError> {
    state
        .tracker
        .update_period_log(id, patch)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("period log"))
}

async fn delete_period_log(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    match state.tracker.delete_period_log(id).await? {
        Some(_) => Ok(StatusCode::NO_CONTENT),
        None => Err(ApiError::NotFound("period log")),
    }
}
