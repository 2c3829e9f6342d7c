use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use super::AppState;
use crate::error::ApiError;
use crate::models::{
    is_valid_reminder_time, NewReminder, Reminder, ReminderPatch, ReminderTiming, UserQuery,
};

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/reminders", get(list_reminders).post(create_reminder))
        .route(
            "/reminders/:id",
            get(get_reminder)
                .patch(update_reminder)
                .delete(delete_reminder),
        )
        .with_state(state)
}

fn check_time(time: &str) -> Result<(), ApiError> {
    if is_valid_reminder_time(time) {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "Invalid time '{time}' (expected HH:MM)"
        )))
    }
}

fn check_timing(timing: &ReminderTiming) -> Result<(), ApiError> {
    if i32::try_from(timing.days).is_ok() {
        Ok(())
    } else {
        Err(ApiError::BadRequest(format!(
            "Invalid timing: {} days is too far out",
            timing.days
        )))
    }
}

async fn list_reminders(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<Vec<Reminder>>, ApiError> {
    Ok(Json(state.store.list_reminders(query.user_id).await?))
}

async fn get_reminder(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<Reminder>, ApiError> {
    state
        .store
        .get_reminder(id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("reminder"))
}

async fn create_reminder(
    State(state): State<AppState>,
    Json(body): Json<NewReminder>,
) -> Result<(StatusCode, Json<Reminder>), ApiError> {
    check_time(&body.time)?;
    check_timing(&body.timing)?;
    let reminder = state.store.create_reminder(body).await?;
    tracing::info!(id = reminder.id, kind = reminder.kind.as_str(), "⏰ Reminder created");
    Ok((StatusCode::CREATED, Json(reminder)))
}

async fn update_reminder(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(patch): Json<ReminderPatch>,
) -> Result<Json<Reminder>, ApiError> {
    if let Some(time) = &patch.time {
        check_time(time)?;
    }
    if let Some(timing) = &patch.timing {
        check_timing(timing)?;
    }
    state
        .store
        .update_reminder(id, patch)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("reminder"))
}

async fn delete_reminder(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if state.store.delete_reminder(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("reminder"))
    }
}
