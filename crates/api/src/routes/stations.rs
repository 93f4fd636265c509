//! Station Routes

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::{ApiError, ServiceContext};
use storage::StationRecord;

/// List every station
pub async fn get_stations(
    State(ctx): State<Arc<ServiceContext>>,
) -> Result<Json<Vec<StationRecord>>, ApiError> {
    metrics::counter!("climate_api_requests_total", "route" => "stations").increment(1);

    let stations = ctx.store.stations().await?;
    Ok(Json(stations))
}
