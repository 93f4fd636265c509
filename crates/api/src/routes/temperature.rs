//! Temperature Routes

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;
use tracing::debug;

use crate::dates::parse_iso_date;
use crate::{ApiError, ServiceContext};
use storage::{TemperatureObservation, TemperatureSummary};

/// Temperature observations of the most active station over the last
/// twelve months of the dataset
pub async fn get_tobs(
    State(ctx): State<Arc<ServiceContext>>,
) -> Result<Json<Vec<TemperatureObservation>>, ApiError> {
    metrics::counter!("climate_api_requests_total", "route" => "tobs").increment(1);

    let observations = ctx
        .store
        .temperatures_for_station(
            &ctx.constants.most_active_station,
            ctx.constants.one_year_ago,
        )
        .await?;
    Ok(Json(observations))
}

/// `[min, avg, max]` temperature from `start` onwards
pub async fn get_summary_from(
    State(ctx): State<Arc<ServiceContext>>,
    Path(start): Path<String>,
) -> Result<Json<TemperatureSummary>, ApiError> {
    metrics::counter!("climate_api_requests_total", "route" => "summary_from").increment(1);

    let start = parse_iso_date(&start)?;
    let summary = ctx.store.temperature_summary(start, None).await?;
    if summary.is_empty() {
        debug!("No temperatures on or after {}", start);
    }
    Ok(Json(summary))
}

/// `[min, avg, max]` temperature between `start` and `end`, both inclusive
pub async fn get_summary_between(
    State(ctx): State<Arc<ServiceContext>>,
    Path((start, end)): Path<(String, String)>,
) -> Result<Json<TemperatureSummary>, ApiError> {
    metrics::counter!("climate_api_requests_total", "route" => "summary_between").increment(1);

    let start = parse_iso_date(&start)?;
    let end = parse_iso_date(&end)?;
    let summary = ctx.store.temperature_summary(start, Some(end)).await?;
    if summary.is_empty() {
        debug!("No temperatures between {} and {}", start, end);
    }
    Ok(Json(summary))
}
