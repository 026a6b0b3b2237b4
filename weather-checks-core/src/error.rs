use thiserror::Error;

use crate::normalize::NormalizeError;

/// A check that ran to completion but whose expectation did not hold.
///
/// Transport, SQL and configuration failures are plain `anyhow` errors; this
/// type is what callers downcast to when they need to tell a failed check
/// apart from a broken environment.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CheckError {
    #[error("expected status 200 for {city}, got {status}")]
    Status { city: String, status: u16 },

    #[error("weather payload for {city} is unusable: {source}")]
    Normalize {
        city: String,
        #[source]
        source: NormalizeError,
    },

    #[error("weather payload for {city} is not valid JSON: {reason}")]
    InvalidJson { city: String, reason: String },

    #[error("no stored record for city_id {city_id}")]
    MissingRecord { city_id: i64 },

    #[error("expected the record for city_id {expected}, read city_id {actual}")]
    WrongRecord { expected: i64, actual: i64 },

    #[error("{field} verification failed for city_id {city_id}: expected {expected}, stored {actual:?}")]
    Mismatch {
        city_id: i64,
        field: &'static str,
        expected: f64,
        actual: Option<f64>,
    },

    #[error("expected data for {expected} cities but got {got}. Attempts made: {attempts}")]
    NotEnoughCities {
        expected: usize,
        got: usize,
        attempts: usize,
    },

    #[error("no city name found in page heading {heading:?}")]
    Heading { heading: Option<String> },
}
