//! Record Shapes

use chrono::NaiveDate;
use serde::{Serialize, Serializer};

/// ISO calendar date format used for storage and for JSON output
pub(crate) const DATE_FORMAT: &str = "%Y-%m-%d";

/// Weather monitoring station
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StationRecord {
    pub station_id: String,
    pub name: String,
}

/// One dated observation at a station
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRecord {
    pub station_id: String,
    pub date: NaiveDate,
    /// Precipitation reading, absent when unmeasured
    pub precipitation: Option<f64>,
    /// Temperature reading, absent when unmeasured
    pub temperature: Option<f64>,
}

/// Precipitation reading on a given day
#[derive(Debug, Clone, PartialEq)]
pub struct PrecipitationRecord {
    pub date: NaiveDate,
    pub precipitation: f64,
}

/// Temperature observation on a given day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemperatureObservation {
    #[serde(serialize_with = "serialize_date")]
    pub date: NaiveDate,
    pub temperature: f64,
}

/// Minimum, average and maximum temperature over a date range.
///
/// All three are `None` when no non-null temperature falls in the range.
/// Serializes as `[min, avg, max]`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TemperatureSummary {
    pub min: Option<f64>,
    pub avg: Option<f64>,
    pub max: Option<f64>,
}

impl TemperatureSummary {
    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.avg.is_none() && self.max.is_none()
    }
}

impl Serialize for TemperatureSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.min, self.avg, self.max).serialize(serializer)
    }
}

/// Values computed once from the dataset when the service starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedConstants {
    /// Latest measurement date in the dataset
    pub most_recent_date: NaiveDate,
    /// `most_recent_date` minus 365 days
    pub one_year_ago: NaiveDate,
    /// Station with the most measurement rows
    pub most_active_station: String,
}

fn serialize_date<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&date.format(DATE_FORMAT))
}
