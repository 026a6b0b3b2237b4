use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One stored row: the base weather fields from the API plus the optional
/// fields merged in from the scraped page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub city_id: i64,
    pub city_name: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub average_temperature: Option<f64>,

    pub location: Option<String>,
    pub current_time: Option<String>,
    pub latest_report: Option<String>,
    pub visibility: Option<String>,
    pub pressure: Option<String>,
    pub humidity: Option<String>,
    pub dew_point: Option<String>,

    pub updated_at: DateTime<Utc>,
}

impl WeatherRecord {
    pub fn extended(&self, field: ExtendedField) -> Option<&str> {
        let value = match field {
            ExtendedField::Location => &self.location,
            ExtendedField::CurrentTime => &self.current_time,
            ExtendedField::LatestReport => &self.latest_report,
            ExtendedField::Visibility => &self.visibility,
            ExtendedField::Pressure => &self.pressure,
            ExtendedField::Humidity => &self.humidity,
            ExtendedField::DewPoint => &self.dew_point,
        };
        value.as_deref()
    }
}

/// Fields that only the scraped page provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ExtendedField {
    Location,
    CurrentTime,
    LatestReport,
    Visibility,
    Pressure,
    Humidity,
    DewPoint,
}

impl ExtendedField {
    pub const fn all() -> &'static [ExtendedField] {
        &[
            ExtendedField::Location,
            ExtendedField::CurrentTime,
            ExtendedField::LatestReport,
            ExtendedField::Visibility,
            ExtendedField::Pressure,
            ExtendedField::Humidity,
            ExtendedField::DewPoint,
        ]
    }

    /// Map a display label from the scraped table to its field.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Location" => Some(Self::Location),
            "Current Time" => Some(Self::CurrentTime),
            "Latest Report" => Some(Self::LatestReport),
            "Visibility" => Some(Self::Visibility),
            "Pressure" => Some(Self::Pressure),
            "Humidity" => Some(Self::Humidity),
            "Dew Point" => Some(Self::DewPoint),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Location => "Location",
            Self::CurrentTime => "Current Time",
            Self::LatestReport => "Latest Report",
            Self::Visibility => "Visibility",
            Self::Pressure => "Pressure",
            Self::Humidity => "Humidity",
            Self::DewPoint => "Dew Point",
        }
    }

    /// Column name in the `weather_data` table.
    pub fn column(&self) -> &'static str {
        match self {
            Self::Location => "location",
            Self::CurrentTime => "current_time",
            Self::LatestReport => "latest_report",
            Self::Visibility => "visibility",
            Self::Pressure => "pressure",
            Self::Humidity => "humidity",
            Self::DewPoint => "dew_point",
        }
    }
}

impl std::fmt::Display for ExtendedField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Extended fields recognised in a scraped table, plus the labels that were
/// dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtendedData {
    pub fields: BTreeMap<ExtendedField, String>,
    pub ignored: Vec<String>,
}

/// The four temperatures every usable payload must carry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureFields {
    pub temperature: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
}

/// Normalized result of one current-weather fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityWeather {
    pub city_id: i64,
    pub city_name: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub average: f64,
}
