use axum::{
    extract::{Query, State},
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;

use super::AppState;
use crate::error::ApiError;
use crate::models::{Cycle, UserQuery};

#[derive(Debug, Serialize, PartialEq)]
pub struct CycleStat {
    cycle_number: i32,
    period_length: i32,
    cycle_length: Option<i32>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct CycleStatsResponse {
    average_period_length: f64,
    average_cycle_length: f64,
    cycle_stats: Vec<CycleStat>,
}

pub async fn get_cycle_stats(
    State(state): State<AppState>,
    Query(query): Query<UserQuery>,
) -> Result<Json<CycleStatsResponse>, ApiError> {
    let cycles = state.store.list_cycles(query.user_id).await?;
    Ok(Json(compute_stats(cycles)))
}

pub fn compute_stats(mut cycles: Vec<Cycle>) -> CycleStatsResponse {
    cycles.sort_by_key(|c| (c.start_date, c.id));

    let mut total_period = 0i64;
    let mut total_cycle = 0i64;
    let mut completed = 0usize;
    let mut stats = Vec::with_capacity(cycles.len());

    for (i, cycle) in cycles.iter().enumerate() {
        total_period += i64::from(cycle.period_length);
        if let Some(len) = cycle.cycle_length {
            total_cycle += i64::from(len);
            completed += 1;
        }

        stats.push(CycleStat {
            cycle_number: (i + 1) as i32,
            period_length: cycle.period_length,
            cycle_length: cycle.cycle_length,
        });
    }

    let average = |total: i64, count: usize| {
        if count > 0 {
            total as f64 / count as f64
        } else {
            0.0
        }
    };

    CycleStatsResponse {
        average_period_length: average(total_period, stats.len()),
        average_cycle_length: average(total_cycle, completed),
        cycle_stats: stats,
    }
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/cycle-stats", get(get_cycle_stats))
        .with_state(state)
}
