//! Precipitation Routes

use axum::{extract::State, Json};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::dates::format_iso_date;
use crate::{ApiError, ServiceContext};
use storage::PrecipitationRecord;

/// Precipitation keyed by ISO date
pub type PrecipitationByDate = BTreeMap<String, f64>;

/// Precipitation over the last twelve months of the dataset
pub async fn get_precipitation(
    State(ctx): State<Arc<ServiceContext>>,
) -> Result<Json<PrecipitationByDate>, ApiError> {
    metrics::counter!("climate_api_requests_total", "route" => "precipitation").increment(1);

    let rows = ctx
        .store
        .precipitation_since(ctx.constants.one_year_ago)
        .await?;
    Ok(Json(by_date(rows)))
}

/// One entry per date; a later row replaces an earlier one on the same date.
fn by_date(rows: impl IntoIterator<Item = PrecipitationRecord>) -> PrecipitationByDate {
    rows.into_iter()
        .map(|r| (format_iso_date(r.date), r.precipitation))
        .collect()
}
