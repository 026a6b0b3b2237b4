use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::{collections::BTreeMap, path::Path};

use crate::{model::WeatherRecord, normalize::normalize_extended_table};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS weather_data (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    city_id         INTEGER NOT NULL UNIQUE,
    city            TEXT    NOT NULL,
    temperature     REAL    NOT NULL,
    feels_like      REAL    NOT NULL,
    average         REAL,
    location        TEXT,
    "current_time"  TEXT,
    latest_report   TEXT,
    visibility      TEXT,
    pressure        TEXT,
    humidity        TEXT,
    dew_point       TEXT,
    updated_at      TEXT    NOT NULL
);
CREATE INDEX IF NOT EXISTS weather_data_city ON weather_data (city);
"#;

// `current_time` is an SQLite keyword and must stay quoted.
const COLUMNS: &str = r#"city_id, city, temperature, feels_like, average,
    location, "current_time", latest_report, visibility, pressure, humidity, dew_point,
    updated_at"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    Merged { applied: usize, ignored: Vec<String> },
    NoBaseRecord,
    EmptyTable,
}

/// Single-table store of [`WeatherRecord`]s keyed by city id.
#[derive(Debug)]
pub struct WeatherStore {
    conn: Connection,
}

impl WeatherStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        Self::bootstrap(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::bootstrap(conn)
    }

    fn bootstrap(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("Failed to create weather_data schema")?;
        Ok(Self { conn })
    }

    /// Insert a row for `city_id`, or overwrite the base fields of the existing one.
    /// Extended fields of an existing row are left as they are.
    pub fn upsert_weather(
        &self,
        city_id: i64,
        city_name: &str,
        temperature: f64,
        feels_like: f64,
        average: Option<f64>,
    ) -> Result<UpsertOutcome> {
        let outcome = if self.exists(city_id)? {
            UpsertOutcome::Updated
        } else {
            UpsertOutcome::Inserted
        };

        self.conn
            .execute(
                "INSERT INTO weather_data (city_id, city, temperature, feels_like, average, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT (city_id) DO UPDATE SET
                     city = excluded.city,
                     temperature = excluded.temperature,
                     feels_like = excluded.feels_like,
                     average = excluded.average,
                     updated_at = excluded.updated_at",
                params![city_id, city_name, temperature, feels_like, average, Utc::now()],
            )
            .with_context(|| format!("Failed to upsert weather data for city_id {city_id}"))?;

        match outcome {
            UpsertOutcome::Inserted => {
                tracing::info!("Data for city with city_id {city_id} inserted.")
            }
            UpsertOutcome::Updated => {
                tracing::info!("Data for city with city_id {city_id} updated.")
            }
        }

        Ok(outcome)
    }

    /// Merge scraped fields onto an existing record. A missing base record or
    /// an empty table is reported through the outcome, not as an error.
    pub fn merge_extended(
        &self,
        city_id: i64,
        table: &BTreeMap<String, String>,
    ) -> Result<MergeOutcome> {
        if !self.exists(city_id)? {
            tracing::warn!("No existing data found for city with city_id {city_id}.");
            return Ok(MergeOutcome::NoBaseRecord);
        }

        if table.is_empty() {
            tracing::warn!("No extended data provided for city with city_id {city_id}.");
            return Ok(MergeOutcome::EmptyTable);
        }

        let data = normalize_extended_table(table);

        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to start extended-data transaction")?;

        for (field, value) in &data.fields {
            let sql = format!(
                "UPDATE weather_data SET \"{}\" = ?1, updated_at = ?2 WHERE city_id = ?3",
                field.column()
            );
            tx.execute(&sql, params![value, Utc::now(), city_id])
                .with_context(|| format!("Failed to update {field} for city_id {city_id}"))?;
        }

        tx.commit().context("Failed to commit extended data")?;

        tracing::info!("Extended data for city with city_id {city_id} updated.");

        Ok(MergeOutcome::Merged {
            applied: data.fields.len(),
            ignored: data.ignored,
        })
    }

    pub fn get_by_city_id(&self, city_id: i64) -> Result<Option<WeatherRecord>> {
        self.conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM weather_data WHERE city_id = ?1"),
                params![city_id],
                map_row,
            )
            .optional()
            .with_context(|| format!("Failed to read weather data for city_id {city_id}"))
    }

    /// First record (in insertion order) whose city name matches exactly.
    pub fn get_by_city_name(&self, city_name: &str) -> Result<Option<WeatherRecord>> {
        self.conn
            .query_row(
                &format!("SELECT {COLUMNS} FROM weather_data WHERE city = ?1 ORDER BY id LIMIT 1"),
                params![city_name],
                map_row,
            )
            .optional()
            .with_context(|| format!("Failed to read weather data for city '{city_name}'"))
    }

    pub fn all(&self) -> Result<Vec<WeatherRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {COLUMNS} FROM weather_data ORDER BY city, city_id"))
            .context("Failed to prepare weather data listing")?;

        let rows = stmt
            .query_map([], map_row)
            .context("Failed to list weather data")?;

        rows.collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read weather data row")
    }

    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM weather_data", [], |row| row.get(0))
            .context("Failed to count weather data")?;

        usize::try_from(count).context("Row count out of range")
    }

    fn exists(&self, city_id: i64) -> Result<bool> {
        self.conn
            .query_row(
                "SELECT 1 FROM weather_data WHERE city_id = ?1",
                params![city_id],
                |_| Ok(()),
            )
            .optional()
            .map(|found| found.is_some())
            .with_context(|| format!("Failed to look up city_id {city_id}"))
    }
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<WeatherRecord> {
    Ok(WeatherRecord {
        city_id: row.get(0)?,
        city_name: row.get(1)?,
        temperature: row.get(2)?,
        feels_like: row.get(3)?,
        average_temperature: row.get(4)?,
        location: row.get(5)?,
        current_time: row.get(6)?,
        latest_report: row.get(7)?,
        visibility: row.get(8)?,
        pressure: row.get(9)?,
        humidity: row.get(10)?,
        dew_point: row.get(11)?,
        updated_at: row.get(12)?,
    })
}
