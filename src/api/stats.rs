//! Statistics endpoints

use axum::{extract::Query, extract::State, Json};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    error::AppResult,
    models::{StatisticsReport, ViolationEntry},
};

/// Query for the violations ranking
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ViolationsQuery {
    /// Sort by overdue count ascending (default) or descending
    #[serde(default = "default_ascending")]
    pub ascending: bool,
}

fn default_ascending() -> bool {
    true
}

/// Get sales, rental and per-category statistics
#[utoipa::path(
    get,
    path = "/stats",
    tag = "stats",
    responses(
        (status = 200, description = "Library statistics", body = StatisticsReport)
    )
)]
pub async fn get_stats(State(state): State<crate::AppState>) -> AppResult<Json<StatisticsReport>> {
    Ok(Json(state.services.stats.statistics().await?))
}

/// Get users ranked by overdue loans
#[utoipa::path(
    get,
    path = "/stats/violations",
    tag = "stats",
    params(ViolationsQuery),
    responses(
        (status = 200, description = "Users with overdue loans", body = Vec<ViolationEntry>)
    )
)]
pub async fn get_violations(
    State(state): State<crate::AppState>,
    Query(query): Query<ViolationsQuery>,
) -> AppResult<Json<Vec<ViolationEntry>>> {
    Ok(Json(state.services.stats.violations(query.ascending).await?))
}
