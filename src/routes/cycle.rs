use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::{Duration, NaiveDate};

use super::AppState;
use crate::error::ApiError;
use crate::models::{Cycle, CyclePatch, CycleSummary, UserQuery};

const DEFAULT_CYCLE_LENGTH: i64 = 28;

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/cycle", get(get_cycle_summary))
        .route("/cycles", get(list_cycles))
        .route("/cycles/recompute", post(recompute_cycles))
        .route(
            "/cycles/:id",
            get(get_cycle).patch(update_cycle).delete(delete_cycle),
        )
        .with_state(state)
}

async fn list_cycles(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<Cycle>>, ApiError> {
    Ok(Json(state.store.list_cycles(query.user_id).await?))
}

async fn get_cycle(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Cycle>, ApiError> {
    state
        .store
        .get_cycle(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("cycle"))
}

async fn update_cycle(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<CyclePatch>,
) -> Result<Json<Cycle>, ApiError> {
    state
        .store
        .update_cycle(id, patch)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("cycle"))
}

async fn delete_cycle(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if state.store.delete_cycle(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("cycle"))
    }
}

async fn recompute_cycles(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<Cycle>>, ApiError> {
    if state.tracker.rederive(query.user_id).await?.is_none() {
        tracing::info!(user_id = %query.user_id, "ℹ️ Nothing to derive");
    }
    Ok(Json(state.store.list_cycles(query.user_id).await?))
}

async fn get_cycle_summary(
    State(state): State<AppState>,
    Query(params): Query<UserQuery>,
) -> Result<Json<CycleSummary>, ApiError> {
    let cycles = state.store.list_cycles(params.user_id).await?;
    let today = chrono::Utc::now().naive_utc().date();

    summarize(&cycles, today)
        .map(Json)
        .ok_or(ApiError::NotFound("cycle"))
}

pub fn summarize(cycles: &[Cycle], today: NaiveDate) -> Option<CycleSummary> {
    let latest = cycles.iter().max_by_key(|c| (c.start_date, c.id))?;

    let completed: Vec<i64> = cycles
        .iter()
        .filter_map(|c| c.cycle_length)
        .map(i64::from)
        .collect();
    let expected_length = if completed.is_empty() {
        DEFAULT_CYCLE_LENGTH
    } else {
        // Rounded mean of the completed cycle lengths.
        let total: i64 = completed.iter().sum();
        (total + completed.len() as i64 / 2) / completed.len() as i64
    };

    let cycle_day = (today - latest.start_date).num_days();
    let fertile = latest.start_date + Duration::days(12)..=latest.start_date + Duration::days(16);

    Some(CycleSummary {
        cycle_day,
        in_fertile_window: fertile.contains(&today),
        period_expected_in_days: expected_length - cycle_day,
        start_date: latest.start_date,
    })
}
