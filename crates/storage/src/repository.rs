//! Repository Implementation

use crate::records::DATE_FORMAT;
use crate::{
    DerivedConstants, PrecipitationRecord, StationRecord, StorageError, TemperatureObservation,
    TemperatureSummary,
};
use chrono::{Days, NaiveDate};
use serde::Deserialize;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Sqlite;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// Relations the service reads from
const STATION_RELATION: &str = "station";
const MEASUREMENT_RELATION: &str = "measurement";

/// Window covered by the "last 12 months" routes
const ONE_YEAR: Days = Days::new(365);

/// Data source configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the SQLite file
    pub path: PathBuf,
    /// Upper bound on concurrently open read connections
    pub max_connections: u32,
    /// How long a request waits for a free connection
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("Resources/hawaii.sqlite"),
            max_connections: 5,
            acquire_timeout_secs: 5,
        }
    }
}

/// Read-only access to stations and measurements
#[derive(Debug, Clone)]
pub struct WeatherStore {
    pool: SqlitePool,
}

impl WeatherStore {
    /// Open the dataset read-only and check that both relations exist
    pub async fn open(config: &DatabaseConfig) -> Result<Self, StorageError> {
        info!("Opening weather dataset at {}", config.path.display());

        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .read_only(true)
            .create_if_missing(false);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
            .connect_with(options)
            .await
            .map_err(|e| {
                StorageError::Unavailable(format!("{}: {}", config.path.display(), e))
            })?;

        let store = Self::from_pool(pool);
        store.check_relations().await?;
        Ok(store)
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Close every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// Scoped connection for a single query. Dropping the guard hands the
    /// connection back to the pool, whether the query succeeded or not.
    async fn session(&self) -> Result<PoolConnection<Sqlite>, StorageError> {
        Ok(self.pool.acquire().await?)
    }

    async fn check_relations(&self) -> Result<(), StorageError> {
        let mut conn = self.session().await?;

        for relation in [STATION_RELATION, MEASUREMENT_RELATION] {
            let (found,): (i64,) = sqlx::query_as(
                "SELECT COUNT(*) FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?",
            )
            .bind(relation)
            .fetch_one(&mut *conn)
            .await?;

            if found == 0 {
                return Err(StorageError::MissingRelation(relation));
            }
            debug!("Found relation {}", relation);
        }

        Ok(())
    }

    /// Compute the most recent date, the date one year before it, and the
    /// station with the most measurement rows.
    ///
    /// Count ties go to the lowest station identifier.
    pub async fn derive_constants(&self) -> Result<DerivedConstants, StorageError> {
        let mut conn = self.session().await?;

        let (latest,): (Option<String>,) = sqlx::query_as("SELECT MAX(date) FROM measurement")
            .fetch_one(&mut *conn)
            .await?;
        let most_recent_date = parse_stored_date(&latest.ok_or(StorageError::EmptyDataset)?)?;

        let one_year_ago = most_recent_date
            .checked_sub_days(ONE_YEAR)
            .ok_or_else(|| StorageError::InvalidDate {
                value: most_recent_date.to_string(),
                reason: "no date one year earlier".to_string(),
            })?;

        let most_active: Option<(String,)> = sqlx::query_as(
            "SELECT station FROM measurement \
             GROUP BY station \
             ORDER BY COUNT(*) DESC, station ASC \
             LIMIT 1",
        )
        .fetch_optional(&mut *conn)
        .await?;
        let (most_active_station,) = most_active.ok_or(StorageError::EmptyDataset)?;

        Ok(DerivedConstants {
            most_recent_date,
            one_year_ago,
            most_active_station,
        })
    }

    /// Non-null precipitation readings on or after `since`, in date order.
    /// Rows sharing a date keep their insertion order.
    pub async fn precipitation_since(
        &self,
        since: NaiveDate,
    ) -> Result<Vec<PrecipitationRecord>, StorageError> {
        let mut conn = self.session().await?;

        let rows: Vec<(String, f64)> = sqlx::query_as(
            "SELECT date, prcp FROM measurement \
             WHERE prcp IS NOT NULL AND date >= ? \
             ORDER BY date, rowid",
        )
        .bind(format_date(since))
        .fetch_all(&mut *conn)
        .await?;

        debug!("Fetched {} precipitation rows since {}", rows.len(), since);

        rows.into_iter()
            .map(|(date, precipitation)| {
                Ok(PrecipitationRecord {
                    date: parse_stored_date(&date)?,
                    precipitation,
                })
            })
            .collect()
    }

    /// All stations in storage order
    pub async fn stations(&self) -> Result<Vec<StationRecord>, StorageError> {
        let mut conn = self.session().await?;

        let rows: Vec<(String, String)> =
            sqlx::query_as("SELECT station, name FROM station ORDER BY rowid")
                .fetch_all(&mut *conn)
                .await?;

        Ok(rows
            .into_iter()
            .map(|(station_id, name)| StationRecord { station_id, name })
            .collect())
    }

    /// Non-null temperature readings for one station on or after `since`,
    /// in date order. Duplicate dates are kept.
    pub async fn temperatures_for_station(
        &self,
        station_id: &str,
        since: NaiveDate,
    ) -> Result<Vec<TemperatureObservation>, StorageError> {
        let mut conn = self.session().await?;

        let rows: Vec<(String, f64)> = sqlx::query_as(
            "SELECT date, tobs FROM measurement \
             WHERE station = ? AND tobs IS NOT NULL AND date >= ? \
             ORDER BY date, rowid",
        )
        .bind(station_id)
        .bind(format_date(since))
        .fetch_all(&mut *conn)
        .await?;

        debug!(
            "Fetched {} temperature rows for {} since {}",
            rows.len(),
            station_id,
            since
        );

        rows.into_iter()
            .map(|(date, temperature)| {
                Ok(TemperatureObservation {
                    date: parse_stored_date(&date)?,
                    temperature,
                })
            })
            .collect()
    }

    /// Min, average and max temperature for `start <= date`, and
    /// `date <= end` when an end is given. Both bounds are inclusive.
    pub async fn temperature_summary(
        &self,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> Result<TemperatureSummary, StorageError> {
        let mut conn = self.session().await?;

        let (min, avg, max): (Option<f64>, Option<f64>, Option<f64>) = match end {
            Some(end) => {
                sqlx::query_as(
                    "SELECT CAST(MIN(tobs) AS REAL), AVG(tobs), CAST(MAX(tobs) AS REAL) \
                     FROM measurement WHERE date >= ? AND date <= ?",
                )
                .bind(format_date(start))
                .bind(format_date(end))
                .fetch_one(&mut *conn)
                .await?
            }
            None => {
                sqlx::query_as(
                    "SELECT CAST(MIN(tobs) AS REAL), AVG(tobs), CAST(MAX(tobs) AS REAL) \
                     FROM measurement WHERE date >= ?",
                )
                .bind(format_date(start))
                .fetch_one(&mut *conn)
                .await?
            }
        };

        Ok(TemperatureSummary { min, avg, max })
    }

    /// Number of station rows
    pub async fn station_count(&self) -> Result<i64, StorageError> {
        let mut conn = self.session().await?;
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM station")
            .fetch_one(&mut *conn)
            .await?;
        Ok(count)
    }

    /// Number of measurement rows
    pub async fn measurement_count(&self) -> Result<i64, StorageError> {
        let mut conn = self.session().await?;
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM measurement")
            .fetch_one(&mut *conn)
            .await?;
        Ok(count)
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn parse_stored_date(value: &str) -> Result<NaiveDate, StorageError> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|e| StorageError::InvalidDate {
        value: value.to_string(),
        reason: e.to_string(),
    })
}
