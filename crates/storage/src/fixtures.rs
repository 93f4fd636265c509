//! Test Fixtures
//!
//! Writes a small, fixed weather dataset into a temporary SQLite file laid
//! out like the production dataset. Three stations, ten measurements between
//! 2016-08-01 and 2017-08-23.

use crate::records::DATE_FORMAT;
use crate::{DatabaseConfig, MeasurementRecord, StationRecord, StorageError};
use chrono::NaiveDate;
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::{Connection, Executor};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const WAIKIKI: &str = "USC00519397";
pub const KANEOHE: &str = "USC00513117";
pub const WAIHEE: &str = "USC00519281";

const SCHEMA: &str = "\
CREATE TABLE station (
    id INTEGER PRIMARY KEY,
    station TEXT,
    name TEXT,
    latitude FLOAT,
    longitude FLOAT,
    elevation FLOAT
);
CREATE TABLE measurement (
    id INTEGER PRIMARY KEY,
    station TEXT,
    date TEXT,
    prcp FLOAT,
    tobs FLOAT
);";

/// Seeded database living in a temporary directory.
///
/// The directory is removed when the fixture is dropped, so keep it alive
/// for as long as a store reads from it.
pub struct FixtureDatabase {
    _dir: TempDir,
    path: PathBuf,
}

impl FixtureDatabase {
    /// Database holding [`stations`] and [`measurements`]
    pub async fn seeded() -> Result<Self, StorageError> {
        Self::with_rows(&stations(), &measurements()).await
    }

    /// Production schema with the given rows
    pub async fn with_rows(
        stations: &[StationRecord],
        measurements: &[MeasurementRecord],
    ) -> Result<Self, StorageError> {
        let fixture = Self::with_schema(SCHEMA).await?;
        let mut conn = fixture.connect().await?;

        for station in stations {
            sqlx::query("INSERT INTO station (station, name) VALUES (?, ?)")
                .bind(&station.station_id)
                .bind(&station.name)
                .execute(&mut conn)
                .await?;
        }

        for m in measurements {
            sqlx::query("INSERT INTO measurement (station, date, prcp, tobs) VALUES (?, ?, ?, ?)")
                .bind(&m.station_id)
                .bind(m.date.format(DATE_FORMAT).to_string())
                .bind(m.precipitation)
                .bind(m.temperature)
                .execute(&mut conn)
                .await?;
        }

        conn.close().await?;
        Ok(fixture)
    }

    /// Empty database created from arbitrary DDL
    pub async fn with_schema(ddl: &str) -> Result<Self, StorageError> {
        let dir = tempfile::tempdir().map_err(|e| StorageError::Unavailable(e.to_string()))?;
        let fixture = Self {
            path: dir.path().join("weather.sqlite"),
            _dir: dir,
        };

        let mut conn = fixture.connect().await?;
        conn.execute(ddl).await?;
        conn.close().await?;

        Ok(fixture)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Configuration pointing at this database
    pub fn config(&self) -> DatabaseConfig {
        DatabaseConfig {
            path: self.path.clone(),
            ..Default::default()
        }
    }

    async fn connect(&self) -> Result<SqliteConnection, StorageError> {
        let options = SqliteConnectOptions::new()
            .filename(&self.path)
            .create_if_missing(true);
        Ok(SqliteConnection::connect_with(&options).await?)
    }
}

pub fn stations() -> Vec<StationRecord> {
    [
        (WAIKIKI, "WAIKIKI 717.2, HI US"),
        (KANEOHE, "KANEOHE 838.1, HI US"),
        (WAIHEE, "WAIHEE 837.5, HI US"),
    ]
    .into_iter()
    .map(|(id, name)| StationRecord {
        station_id: id.to_string(),
        name: name.to_string(),
    })
    .collect()
}

pub fn measurements() -> Vec<MeasurementRecord> {
    vec![
        measurement(WAIHEE, ymd(2016, 8, 1), Some(0.08), Some(77.0)),
        measurement(WAIHEE, ymd(2016, 8, 23), Some(1.79), Some(77.0)),
        measurement(WAIKIKI, ymd(2016, 8, 23), Some(0.02), Some(81.0)),
        measurement(KANEOHE, ymd(2016, 12, 15), None, Some(66.0)),
        measurement(WAIHEE, ymd(2017, 1, 1), Some(0.29), Some(62.0)),
        measurement(WAIKIKI, ymd(2017, 1, 1), Some(0.05), Some(66.0)),
        measurement(WAIHEE, ymd(2017, 5, 10), Some(0.1), None),
        measurement(KANEOHE, ymd(2017, 5, 10), None, Some(75.0)),
        measurement(WAIHEE, ymd(2017, 8, 23), Some(0.45), Some(76.0)),
        measurement(WAIKIKI, ymd(2017, 8, 23), Some(0.01), Some(81.0)),
    ]
}

pub fn measurement(
    station_id: &str,
    date: NaiveDate,
    precipitation: Option<f64>,
    temperature: Option<f64>,
) -> MeasurementRecord {
    MeasurementRecord {
        station_id: station_id.to_string(),
        date,
        precipitation,
        temperature,
    }
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid fixture date")
}
