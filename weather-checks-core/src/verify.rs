use crate::{
    error::CheckError,
    model::{CityWeather, WeatherRecord},
};

pub const TOLERANCE: f64 = 1e-6;

/// Absolute tolerance near zero, relative above magnitude 1.
pub fn approx_eq(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() <= TOLERANCE * expected.abs().max(1.0)
}

fn check(city_id: i64, field: &'static str, expected: f64, actual: Option<f64>) -> Result<(), CheckError> {
    match actual {
        Some(actual) if approx_eq(actual, expected) => Ok(()),
        _ => Err(CheckError::Mismatch { city_id, field, expected, actual }),
    }
}

/// Stored temperature and feels-like must match what was fetched.
pub fn verify_temperatures(
    record: &WeatherRecord,
    temperature: f64,
    feels_like: f64,
) -> Result<(), CheckError> {
    check(record.city_id, "temperature", temperature, Some(record.temperature))?;
    check(record.city_id, "feels_like", feels_like, Some(record.feels_like))
}

/// Full comparison of a stored record against the fetch that produced it.
pub fn verify_record(record: &WeatherRecord, expected: &CityWeather) -> Result<(), CheckError> {
    if record.city_id != expected.city_id {
        return Err(CheckError::WrongRecord {
            expected: expected.city_id,
            actual: record.city_id,
        });
    }
    verify_temperatures(record, expected.temperature, expected.feels_like)?;
    check(record.city_id, "average", expected.average, record.average_temperature)
}
